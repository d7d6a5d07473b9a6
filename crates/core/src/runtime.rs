use crate::{
    Command, Notice,
    decision::Decision,
    error::SpeechError,
    playback::{self, PlaybackEvent, PlaybackHandle},
    speech::{SpeechOutput, Utterance},
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{Receiver, Sender};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AvatarState {
    Idle,
    Speaking,
    Listening,
}

/// Everything the presentation layer needs to render, in the order it happened.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum PresentationEvent {
    Notice(Notice),
    Avatar(AvatarState),
    MouthShape(u8),
    Completed(Decision),
}

/// Executes the session's commands: speaks questions, cancels playback and forwards
/// notices to the presentation layer.
pub struct SpeechRuntime<S: SpeechOutput + ?Sized> {
    speech: Arc<S>,
    events: Sender<PresentationEvent>,
    synth_timeout: Duration,
    playback: Option<PlaybackHandle>,
}

impl<S: SpeechOutput + ?Sized + 'static> SpeechRuntime<S> {
    pub fn new(speech: Arc<S>, events: Sender<PresentationEvent>, synth_timeout: Duration) -> Self {
        Self {
            speech,
            events,
            synth_timeout,
            playback: None,
        }
    }

    /// Processes commands until the session side of the channel is closed.
    ///
    /// Commands that arrive while a question is still being synthesized are read
    /// straight away; anything other than a notice abandons that synthesis.
    pub async fn run(mut self, mut commands: Receiver<Command>) {
        let mut next = None;
        loop {
            let command = match next.take() {
                Some(command) => command,
                None => match commands.recv().await {
                    Some(command) => command,
                    None => break,
                },
            };
            match command {
                Command::Speak { text, language } => {
                    tracing::info!("COMMAND RECEIVED: Speak: '{}'", text);
                    self.stop_playback().await;
                    next = self.speak_interruptible(&text, &language, &mut commands).await;
                }
                other => self.handle(other).await,
            }
        }
        self.stop_playback().await;
        tracing::debug!("Command channel closed, speech runtime stopped");
    }

    pub async fn handle(&mut self, command: Command) {
        match command {
            Command::Speak { text, language } => {
                tracing::info!("COMMAND RECEIVED: Speak: '{}'", text);
                self.stop_playback().await;
                let result = synthesize_bounded(&*self.speech, &text, &language, self.synth_timeout).await;
                self.on_synthesized(result).await;
            }
            Command::CancelSpeech => {
                tracing::debug!("COMMAND RECEIVED: Cancel speech");
                self.stop_playback().await;
            }
            Command::Notice(notice) => self.publish(PresentationEvent::Notice(notice)).await,
            Command::SessionComplete(decision) => {
                tracing::info!(
                    "COMMAND RECEIVED: Session complete ({:?}, score {})",
                    decision.outcome,
                    decision.score
                );
                self.stop_playback().await;
                self.publish(PresentationEvent::Completed(decision)).await;
            }
        }
    }

    /// Synthesizes `text` while still listening for commands. Returns the command that
    /// interrupted the synthesis, if any, so the caller can handle it next.
    async fn speak_interruptible(
        &mut self,
        text: &str,
        language: &str,
        commands: &mut Receiver<Command>,
    ) -> Option<Command> {
        let speech = self.speech.clone();
        let synthesis = synthesize_bounded(&*speech, text, language, self.synth_timeout);
        tokio::pin!(synthesis);

        let result = loop {
            tokio::select! {
                biased;
                command = commands.recv() => match command {
                    Some(Command::Notice(notice)) => {
                        self.publish(PresentationEvent::Notice(notice)).await;
                    }
                    Some(command) => {
                        tracing::debug!("Synthesis abandoned for '{}'", text);
                        return Some(command);
                    }
                    None => return None,
                },
                result = &mut synthesis => break result,
            }
        };
        self.on_synthesized(result).await;
        None
    }

    async fn on_synthesized(&mut self, result: Result<Utterance, SpeechError>) {
        match result {
            Ok(utterance) => {
                tracing::debug!(
                    "Playing {} visemes alongside {} bytes of audio",
                    utterance.visemes.len(),
                    utterance.audio.len()
                );
                let events = self.events.clone();
                self.playback = Some(playback::play(utterance.visemes, move |event| {
                    let update = match event {
                        PlaybackEvent::Started => PresentationEvent::Avatar(AvatarState::Speaking),
                        PlaybackEvent::Viseme(v) => PresentationEvent::MouthShape(v.code),
                        PlaybackEvent::Finished => PresentationEvent::Avatar(AvatarState::Idle),
                    };
                    // Mouth updates are best effort; a slow renderer just skips frames.
                    if let Err(e) = events.try_send(update) {
                        tracing::trace!("Dropped presentation update: {}", e);
                    }
                }));
            }
            Err(e) => {
                // The question is already on screen; continue text-only.
                tracing::warn!("Speech output failed, continuing without audio: {}", e);
                self.publish(PresentationEvent::Notice(Notice::warning(
                    "Audio Unavailable",
                    "The question could not be spoken. Please read it on screen.",
                )))
                .await;
            }
        }
    }

    async fn stop_playback(&mut self) {
        if let Some(handle) = self.playback.take() {
            if !handle.is_finished() {
                handle.cancel().await;
                self.publish(PresentationEvent::Avatar(AvatarState::Idle)).await;
            }
        }
    }

    async fn publish(&self, event: PresentationEvent) {
        if let Err(e) = self.events.send(event).await {
            tracing::warn!("Presentation layer is gone, dropping event: {:?}", e.0);
        }
    }
}

async fn synthesize_bounded<S: SpeechOutput + ?Sized>(
    speech: &S,
    text: &str,
    language: &str,
    limit: Duration,
) -> Result<Utterance, SpeechError> {
    match tokio::time::timeout(limit, speech.synthesize(text, language)).await {
        Ok(result) => result,
        Err(_) => Err(SpeechError::Timeout(limit)),
    }
}
