use crate::session::Phase;

/// Errors returned by the interview session when an input cannot be applied.
///
/// Every variant leaves the session exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("'{action}' is not allowed while the interview is in the {phase:?} phase")]
    Rejected { action: &'static str, phase: Phase },
    #[error("A job profile must be selected before the interview can start")]
    EmptyProfile,
    #[error("No questions are available for job profile '{0}'")]
    NoQuestions(String),
    #[error("Unsupported interview language: {0}")]
    UnsupportedLanguage(String),
    #[error("Invalid interview settings: {0}")]
    InvalidConfig(#[from] ThresholdError),
}

/// A scoring or decision threshold set that cannot produce a score in 0..=100.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ThresholdError {
    #[error("{name}: lower bound {low} is above upper bound {high}")]
    Inverted { name: &'static str, low: f64, high: f64 },
    #[error("{name} must be a finite number between 0 and 100, got {value}")]
    OutOfRange { name: &'static str, value: f64 },
}

/// Errors raised while building a question bank.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BankError {
    #[error("Default profile '{0}' is not present in the question bank")]
    MissingDefault(String),
    #[error("Default profile '{0}' has no questions")]
    EmptyDefault(String),
}

/// Failures of the external speech collaborators (synthesis and transcription).
#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("Speech gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Speech gateway responded with status {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("Transcription produced no text")]
    EmptyTranscript,
    #[error("Speech step timed out after {0:?}")]
    Timeout(std::time::Duration),
}
