//! Line-oriented driver that stands in for the interview's graphical front end.
//!
//! Each stdin line is one input: a typed answer, or a `:command`. Session commands
//! flow to the speech runtime; results of each turn are written to `out`.

use anyhow::Result;
use bytes::Bytes;
use interview_core::decision::Decision;
use interview_core::error::SpeechError;
use interview_core::language::locale_tag;
use interview_core::question_bank::QuestionBank;
use interview_core::runtime::{AvatarState, PresentationEvent};
use interview_core::session::{Advance, InterviewSession, Phase};
use interview_core::speech::{CapturedAudio, Transcriber};
use interview_core::NoticeLevel;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::{Receiver, Sender};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Answer(String),
    Audio(PathBuf),
    End,
    Restart,
    Quit,
    Empty,
}

pub fn parse_line(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    match line.split_once(char::is_whitespace) {
        Some((":audio", path)) if !path.trim().is_empty() => Input::Audio(PathBuf::from(path.trim())),
        _ => match line {
            ":end" => Input::End,
            ":restart" => Input::Restart,
            ":quit" | ":q" => Input::Quit,
            _ => Input::Answer(line.to_string()),
        },
    }
}

/// Maps a recording's file extension to the MIME type sent with it.
pub fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
        .as_deref()
    {
        Some("webm") => "audio/webm",
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("ogg") => "audio/ogg",
        Some("m4a") => "audio/mp4",
        _ => "application/octet-stream",
    }
}

pub struct Console<T: Transcriber + ?Sized> {
    session: InterviewSession,
    bank: QuestionBank,
    transcriber: Arc<T>,
    transcribe_timeout: Duration,
    events: Option<Sender<PresentationEvent>>,
}

impl<T: Transcriber + ?Sized> Console<T> {
    pub fn new(
        session: InterviewSession,
        bank: QuestionBank,
        transcriber: Arc<T>,
        transcribe_timeout: Duration,
    ) -> Self {
        Self {
            session,
            bank,
            transcriber,
            transcribe_timeout,
            events: None,
        }
    }

    /// Publishes the avatar's listening state while a recording is transcribed.
    pub fn with_presentation(mut self, events: Sender<PresentationEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn session(&self) -> &InterviewSession {
        &self.session
    }

    /// Starts the interview and processes input lines until `:quit` or end of input.
    pub async fn run<R, W>(&mut self, input: R, out: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        self.begin(out).await?;

        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            match parse_line(&line) {
                Input::Empty => continue,
                Input::Quit => break,
                Input::Answer(text) => self.answer(text, out).await?,
                Input::Audio(path) => self.audio(&path, out).await?,
                Input::End => match self.session.end().await {
                    Ok(decision) => write_decision(out, &decision).await?,
                    Err(e) => writeln(out, &format!("! {e}")).await?,
                },
                Input::Restart => {
                    self.session.restart().await;
                    self.begin(out).await?;
                }
            }
        }

        tracing::info!("Console input closed");
        Ok(())
    }

    async fn begin<W: AsyncWrite + Unpin>(&mut self, out: &mut W) -> Result<()> {
        self.session.start(&self.bank).await?;
        let snapshot = self.session.snapshot();
        writeln(
            out,
            &format!(
                "Interview for '{}' ({}). Answer each question on one line; :end finishes early.",
                snapshot.context.job_profile,
                locale_tag(&snapshot.language)
            ),
        )
        .await?;
        if let Some(question) = snapshot.current_question {
            writeln(out, &format!("Q1: {question}")).await?;
        }
        Ok(())
    }

    async fn answer<W: AsyncWrite + Unpin>(&mut self, text: String, out: &mut W) -> Result<()> {
        if self.session.phase() != Phase::Active {
            return writeln(out, "The interview is over. Type :restart or :quit.").await;
        }
        let turn = self.session.submit_answer(text).await?;
        writeln(
            out,
            &format!("  score {} ({})", turn.score.score, turn.score.feedback),
        )
        .await?;
        match turn.advance {
            Advance::Asked(question) => {
                let number = self.session.context().current_question_index + 1;
                writeln(out, &format!("Q{number}: {question}")).await
            }
            Advance::Completed(decision) => write_decision(out, &decision).await,
        }
    }

    async fn audio<W: AsyncWrite + Unpin>(&mut self, path: &Path, out: &mut W) -> Result<()> {
        if self.session.phase() != Phase::Active {
            return writeln(out, "The interview is over. Type :restart or :quit.").await;
        }
        let language = self.session.context().language.clone();
        self.avatar(AvatarState::Listening).await;
        let transcript = self.transcribe(path, &language).await;
        self.avatar(AvatarState::Idle).await;
        match transcript {
            Ok(text) => {
                writeln(out, &format!("  heard: \"{text}\"")).await?;
                self.answer(text, out).await
            }
            Err(reason) => {
                self.session.transcription_failed(&reason).await?;
                writeln(out, "  could not transcribe that recording, please answer again").await
            }
        }
    }

    async fn avatar(&self, state: AvatarState) {
        if let Some(events) = &self.events {
            if events.send(PresentationEvent::Avatar(state)).await.is_err() {
                tracing::debug!("Presentation layer is gone, avatar stays {:?}", state);
            }
        }
    }

    async fn transcribe(&self, path: &Path, language: &str) -> Result<String, String> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        let audio = CapturedAudio {
            bytes: Bytes::from(bytes),
            content_type: content_type_for(path).to_string(),
            file_name: path
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or("answer")
                .to_string(),
        };

        let result = match tokio::time::timeout(
            self.transcribe_timeout,
            self.transcriber.transcribe(audio, language),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(SpeechError::Timeout(self.transcribe_timeout)),
        };
        result.map_err(|e| e.to_string())
    }
}

async fn write_decision<W: AsyncWrite + Unpin>(out: &mut W, decision: &Decision) -> Result<()> {
    writeln(
        out,
        &format!(
            "Decision: {:?} (score {}, {} responses)",
            decision.outcome, decision.score, decision.responses_considered
        ),
    )
    .await?;
    writeln(out, &format!("  {}", decision.reasoning)).await
}

async fn writeln<W: AsyncWrite + Unpin>(out: &mut W, line: &str) -> Result<()> {
    out.write_all(line.as_bytes()).await?;
    out.write_all(b"\n").await?;
    out.flush().await?;
    Ok(())
}

/// Renders presentation events as log lines until the runtime shuts down.
pub async fn present(mut events: Receiver<PresentationEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            PresentationEvent::Notice(notice) => match notice.level {
                NoticeLevel::Info => tracing::info!("[{}] {}", notice.title, notice.message),
                NoticeLevel::Warning => tracing::warn!("[{}] {}", notice.title, notice.message),
                NoticeLevel::Error => tracing::error!("[{}] {}", notice.title, notice.message),
            },
            PresentationEvent::Avatar(state) => match state {
                AvatarState::Speaking => tracing::debug!("Interviewer speaking"),
                AvatarState::Idle | AvatarState::Listening => tracing::debug!("Interviewer {:?}", state),
            },
            PresentationEvent::MouthShape(code) => tracing::trace!("Mouth shape {}", code),
            PresentationEvent::Completed(decision) => tracing::info!(
                "Interview complete: {:?} with score {}",
                decision.outcome,
                decision.score
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use interview_core::Command;
    use interview_core::decision::Outcome;
    use interview_core::session::SessionConfig;
    use mockall::mock;
    use std::io::Write;
    use tokio::sync::mpsc;

    mock! {
        pub Stt {}

        #[async_trait]
        impl Transcriber for Stt {
            async fn transcribe(&self, audio: CapturedAudio, language: &str) -> Result<String, SpeechError>;
        }
    }

    fn console(transcriber: MockStt, profile: &str) -> (Console<MockStt>, mpsc::Receiver<Command>) {
        let (command_tx, command_rx) = mpsc::channel(256);
        let mut session = InterviewSession::new(
            SessionConfig {
                seed: Some(3),
                ..SessionConfig::default()
            },
            command_tx,
        );
        session.select_profile(profile).unwrap();
        let console = Console::new(
            session,
            QuestionBank::builtin(),
            Arc::new(transcriber),
            Duration::from_secs(5),
        );
        (console, command_rx)
    }

    async fn run(console: &mut Console<MockStt>, script: &str) -> String {
        let mut out = Vec::new();
        console.run(script.as_bytes(), &mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("   "), Input::Empty);
        assert_eq!(parse_line(":end"), Input::End);
        assert_eq!(parse_line(" :restart "), Input::Restart);
        assert_eq!(parse_line(":quit"), Input::Quit);
        assert_eq!(
            parse_line(":audio  answers/one.webm"),
            Input::Audio(PathBuf::from("answers/one.webm"))
        );
        assert_eq!(parse_line(":audio"), Input::Answer(":audio".to_string()));
        assert_eq!(
            parse_line("  I like Rust  "),
            Input::Answer("I like Rust".to_string())
        );
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(Path::new("a.webm")), "audio/webm");
        assert_eq!(content_type_for(Path::new("a.MP3")), "audio/mpeg");
        assert_eq!(content_type_for(Path::new("noext")), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_typed_answers_run_the_interview_to_a_decision() {
        let (mut console, _commands) = console(MockStt::new(), "Sales Manager");
        let answer = "I closed enterprise deals by building pipeline discipline and coaching every rep on negotiation weekly";
        let script = format!("{answer}\n\n{answer}\n{answer}\n{answer}\n{answer}\n:quit\n");

        let output = run(&mut console, &script).await;

        assert!(output.contains("Interview for 'Sales Manager' (en-US)"));
        assert!(output.contains("Q1: "));
        assert!(output.contains("Q5: "));
        assert!(output.contains("Decision: Accept"));
        assert_eq!(console.session().phase(), Phase::Complete);
        assert_eq!(console.session().context().candidate_responses.len(), 5);
    }

    #[tokio::test]
    async fn test_end_then_answer_is_refused() {
        let (mut console, _commands) = console(MockStt::new(), "Software Engineer");

        let output = run(&mut console, "short answer\n:end\nanother\n").await;

        assert!(output.contains("Decision: Reject (score"));
        assert!(output.contains("The interview is over"));
        let decision = console.session().decision().unwrap();
        assert_eq!(decision.outcome, Outcome::Reject);
        assert_eq!(decision.responses_considered, 1);
    }

    #[tokio::test]
    async fn test_restart_begins_a_fresh_interview() {
        let (mut console, _commands) = console(MockStt::new(), "Software Engineer");

        let output = run(&mut console, "first\n:restart\n").await;

        assert_eq!(output.matches("Q1: ").count(), 2);
        assert_eq!(console.session().phase(), Phase::Active);
        assert!(console.session().context().candidate_responses.is_empty());
        assert_eq!(console.session().context().job_profile, "Software Engineer");
    }

    #[tokio::test]
    async fn test_audio_answer_is_transcribed_and_submitted() {
        let mut file = tempfile::Builder::new().suffix(".webm").tempfile().unwrap();
        file.write_all(b"fake audio").unwrap();

        let mut stt = MockStt::new();
        stt.expect_transcribe()
            .withf(|audio, language| {
                audio.content_type == "audio/webm" && audio.bytes.len() == 10 && language == "en"
            })
            .returning(|_, _| Ok("I have shipped React and Node services".to_string()))
            .once();
        let (mut console, _commands) = console(stt, "Software Engineer");

        let output = run(&mut console, &format!(":audio {}\n", file.path().display())).await;

        assert!(output.contains("heard: \"I have shipped React and Node services\""));
        assert_eq!(
            console.session().context().candidate_responses,
            vec!["I have shipped React and Node services".to_string()]
        );
    }

    #[tokio::test]
    async fn test_failed_transcription_keeps_the_question_open() {
        let mut file = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        file.write_all(b"noise").unwrap();

        let mut stt = MockStt::new();
        stt.expect_transcribe()
            .returning(|_, _| Err(SpeechError::EmptyTranscript));
        let (mut console, mut commands) = console(stt, "Software Engineer");

        let output = run(&mut console, &format!(":audio {}\n", file.path().display())).await;

        assert!(output.contains("could not transcribe"));
        assert!(console.session().context().candidate_responses.is_empty());
        assert_eq!(console.session().phase(), Phase::Active);

        let mut saw_failure = false;
        while let Ok(command) = commands.try_recv() {
            if let Command::Notice(notice) = command {
                saw_failure |= notice.title == "Transcription Failed";
            }
        }
        assert!(saw_failure);
    }

    #[tokio::test]
    async fn test_avatar_listens_while_a_recording_is_transcribed() {
        let mut file = tempfile::Builder::new().suffix(".webm").tempfile().unwrap();
        file.write_all(b"fake audio").unwrap();

        let mut stt = MockStt::new();
        stt.expect_transcribe()
            .returning(|_, _| Ok("I build services".to_string()));
        let (console, _commands) = console(stt, "Software Engineer");
        let (events_tx, mut events_rx) = mpsc::channel(16);
        let mut console = console.with_presentation(events_tx);

        run(&mut console, &format!("typed answer\n:audio {}\n", file.path().display())).await;
        drop(console);

        let mut states = Vec::new();
        while let Some(event) = events_rx.recv().await {
            if let PresentationEvent::Avatar(state) = event {
                states.push(state);
            }
        }
        assert_eq!(states, vec![AvatarState::Listening, AvatarState::Idle]);
    }

    #[tokio::test]
    async fn test_missing_recording_is_a_transcription_failure() {
        let mut stt = MockStt::new();
        stt.expect_transcribe().never();
        let (mut console, _commands) = console(stt, "Software Engineer");

        let output = run(&mut console, ":audio /definitely/not/here.webm\n").await;

        assert!(output.contains("could not transcribe"));
        assert!(console.session().context().candidate_responses.is_empty());
    }
}
