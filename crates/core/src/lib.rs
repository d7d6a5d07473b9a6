pub mod decision;
pub mod error;
pub mod language;
pub mod playback;
pub mod question_bank;
pub mod runtime;
pub mod scoring;
pub mod session;
pub mod speech;
pub mod transcript;
pub mod viseme;

use decision::Decision;
use serde::Serialize;

/// Represents commands that the interview session issues to the runtime.
///
/// The session decides *what* happens next; the runtime carries out the side
/// effects (speaking, cancelling playback, showing notices).
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Speak the given question text in the given language.
    Speak { text: String, language: String },
    /// Stop any speech output that is still playing.
    CancelSpeech,
    /// Show a non-blocking message to the user.
    Notice(Notice),
    /// The interview reached its terminal state.
    SessionComplete(Decision),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A user-visible, non-blocking message (the toast of a graphical front end).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, title, message)
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, title, message)
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, title, message)
    }

    fn new(level: NoticeLevel, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            message: message.into(),
        }
    }
}
