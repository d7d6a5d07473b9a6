use crate::viseme::{VisemeEvent, total_duration};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};

/// Progress reported to the playback callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackEvent {
    Started,
    Viseme(VisemeEvent),
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Finished,
    Cancelled,
}

/// Handle to a running viseme playback. Dropping it cancels the playback.
pub struct PlaybackHandle {
    cancel: oneshot::Sender<()>,
    task: JoinHandle<PlaybackOutcome>,
}

impl PlaybackHandle {
    /// Stops playback. Once this returns the callback will not be invoked again.
    pub async fn cancel(self) -> PlaybackOutcome {
        let _ = self.cancel.send(());
        self.task.await.unwrap_or(PlaybackOutcome::Cancelled)
    }

    /// Waits for playback to run to completion.
    pub async fn finished(self) -> PlaybackOutcome {
        let PlaybackHandle { cancel, task } = self;
        let outcome = task.await.unwrap_or(PlaybackOutcome::Cancelled);
        drop(cancel);
        outcome
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Fires each viseme at its offset relative to the start of playback.
pub fn play<F>(events: Vec<VisemeEvent>, mut on_event: F) -> PlaybackHandle
where
    F: FnMut(PlaybackEvent) + Send + 'static,
{
    let (cancel, mut cancelled) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        let start = Instant::now();
        let end = start + total_duration(&events);
        on_event(PlaybackEvent::Started);

        for event in events {
            tokio::select! {
                biased;
                _ = &mut cancelled => return PlaybackOutcome::Cancelled,
                _ = sleep_until(start + event.offset) => on_event(PlaybackEvent::Viseme(event)),
            }
        }
        tokio::select! {
            biased;
            _ = &mut cancelled => return PlaybackOutcome::Cancelled,
            _ = sleep_until(end) => {}
        }
        on_event(PlaybackEvent::Finished);
        PlaybackOutcome::Finished
    });
    PlaybackHandle { cancel, task }
}
