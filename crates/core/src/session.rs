use crate::{
    Command, Notice,
    decision::{Decision, DecisionConfig, Outcome, decide},
    error::{SessionError, ThresholdError},
    language,
    question_bank::{Lookup, Question, QuestionBank, normalize_profile},
    scoring::{ResponseScore, ScoringConfig, score_response},
    transcript::{Role, Transcript, TranscriptEntry},
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::Sender;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Setup,
    Active,
    Complete,
}

/// Running state of one interview: who is being interviewed and what they said so far.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterviewContext {
    pub job_profile: String,
    pub candidate_responses: Vec<String>,
    pub current_question_index: usize,
    pub language: String,
}

impl InterviewContext {
    pub fn new(job_profile: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            job_profile: job_profile.into(),
            candidate_responses: Vec::new(),
            current_question_index: 0,
            language: language.into(),
        }
    }

    /// Records a completed turn. The index always equals the number of answers afterwards.
    pub fn record_answer(&mut self, answer: String) {
        self.candidate_responses.push(answer);
        self.current_question_index = self.candidate_responses.len();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub scoring: ScoringConfig,
    pub decision: DecisionConfig,
    /// Seed for the decision jitter. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), ThresholdError> {
        self.scoring.validate()?;
        self.decision.validate()
    }
}

/// What happened after an answer was accepted.
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    /// The next question was asked; carries the text as spoken.
    Asked(String),
    /// The question sequence ran out and the interview is complete.
    Completed(Decision),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub score: ResponseScore,
    pub advance: Advance,
}

/// Read-only view handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub job_profile: String,
    pub language: String,
    pub context: InterviewContext,
    pub transcript: Vec<TranscriptEntry>,
    pub current_question: Option<String>,
    pub scores: Vec<ResponseScore>,
    pub decision: Option<Decision>,
}

/// Drives one interview from setup through the question/answer turns to the final decision.
///
/// The session never performs side effects itself: speech, cancellation and notices
/// are sent as [`Command`]s to whatever runtime owns the receiving end of `command_tx`.
pub struct InterviewSession {
    phase: Phase,
    job_profile: String,
    language: String,
    context: InterviewContext,
    questions: Vec<Question>,
    keywords: Vec<String>,
    current_question: Option<Question>,
    transcript: Transcript,
    scores: Vec<ResponseScore>,
    decision: Option<Decision>,
    config: SessionConfig,
    rng: StdRng,
    command_tx: Sender<Command>,
}

impl InterviewSession {
    pub fn new(config: SessionConfig, command_tx: Sender<Command>) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            phase: Phase::Setup,
            job_profile: String::new(),
            language: language::DEFAULT_LANGUAGE.to_string(),
            context: InterviewContext::new("", language::DEFAULT_LANGUAGE),
            questions: Vec::new(),
            keywords: Vec::new(),
            current_question: None,
            transcript: Transcript::new(),
            scores: Vec::new(),
            decision: None,
            config,
            rng,
            command_tx,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn context(&self) -> &InterviewContext {
        &self.context
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.current_question.as_ref()
    }

    pub fn scores(&self) -> &[ResponseScore] {
        &self.scores
    }

    pub fn decision(&self) -> Option<&Decision> {
        self.decision.as_ref()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            job_profile: self.job_profile.clone(),
            language: self.language.clone(),
            context: self.context.clone(),
            transcript: self.transcript.entries().to_vec(),
            current_question: self
                .current_question
                .as_ref()
                .map(|q| q.text_for(&self.language).to_string()),
            scores: self.scores.clone(),
            decision: self.decision.clone(),
        }
    }

    pub fn select_profile(&mut self, profile: &str) -> Result<(), SessionError> {
        self.require(Phase::Setup, "select profile")?;
        self.job_profile = normalize_profile(profile).to_string();
        tracing::debug!("Job profile selected: '{}'", self.job_profile);
        Ok(())
    }

    pub fn select_language(&mut self, code: &str) -> Result<(), SessionError> {
        self.require(Phase::Setup, "select language")?;
        if !language::is_supported(code) {
            return Err(SessionError::UnsupportedLanguage(code.to_string()));
        }
        self.language = code.to_string();
        tracing::debug!("Interview language selected: '{}'", self.language);
        Ok(())
    }

    /// Leaves `Setup`, resolving the question sequence from `bank` and asking question #0.
    pub async fn start(&mut self, bank: &QuestionBank) -> Result<(), SessionError> {
        self.require(Phase::Setup, "start")?;
        self.config.validate()?;
        let profile = self.job_profile.trim().to_string();
        if profile.is_empty() {
            return Err(SessionError::EmptyProfile);
        }

        let lookup = bank.questions(&profile);
        let fallback_notice = match lookup {
            Lookup::Found(_) => None,
            Lookup::Fallback {
                requested,
                default_profile,
                ..
            } => {
                tracing::warn!(
                    "No questions for profile '{}'; using the '{}' sequence instead",
                    requested,
                    default_profile
                );
                Some(Notice::info(
                    "Default Questions",
                    format!("No questions found for '{requested}'. Using '{default_profile}' questions."),
                ))
            }
        };
        if lookup.questions().is_empty() {
            return Err(SessionError::NoQuestions(profile));
        }

        self.questions = lookup.questions().to_vec();
        self.keywords = bank.keywords(&profile).to_vec();
        self.context = InterviewContext::new(profile, self.language.clone());
        self.transcript = Transcript::new();
        self.scores.clear();
        self.decision = None;
        self.phase = Phase::Active;
        tracing::info!(
            "Interview started for '{}' in '{}' with {} questions",
            self.context.job_profile,
            self.language,
            self.questions.len()
        );

        if let Some(notice) = fallback_notice {
            self.emit(Command::Notice(notice)).await;
        }
        self.emit(Command::Notice(Notice::info(
            "Interview Started",
            "The AI interviewer will ask you questions. Good luck!",
        )))
        .await;
        self.ask(0).await;
        Ok(())
    }

    /// Accepts the candidate's transcribed answer, scores it and moves to the next question.
    pub async fn submit_answer(&mut self, answer: impl Into<String>) -> Result<Turn, SessionError> {
        self.require(Phase::Active, "submit answer")?;
        let Some(question) = self.current_question.clone() else {
            return Err(SessionError::Rejected {
                action: "submit answer",
                phase: self.phase,
            });
        };
        let answer = answer.into();

        self.transcript.append(Role::Candidate, answer.clone());
        let score = score_response(
            &question,
            &answer,
            &self.context,
            &self.keywords,
            &self.config.scoring,
        );
        self.context.record_answer(answer);
        self.scores.push(score.clone());
        tracing::info!(
            "Answer {} of {} recorded (score {})",
            self.context.current_question_index,
            self.questions.len(),
            score.score
        );

        let advance = self.advance().await;
        Ok(Turn { score, advance })
    }

    /// Ends the interview early with whatever answers were collected. Never fails from `Active`.
    pub async fn end(&mut self) -> Result<Decision, SessionError> {
        self.require(Phase::Active, "end")?;
        tracing::info!(
            "Interview ended manually after {} answers",
            self.context.candidate_responses.len()
        );
        Ok(self.finish().await)
    }

    /// Returns to `Setup`, keeping the profile and language selection.
    pub async fn restart(&mut self) {
        if self.phase == Phase::Active {
            self.emit(Command::CancelSpeech).await;
        }
        self.phase = Phase::Setup;
        self.context = InterviewContext::new(self.job_profile.clone(), self.language.clone());
        self.questions.clear();
        self.keywords.clear();
        self.current_question = None;
        self.transcript = Transcript::new();
        self.scores.clear();
        self.decision = None;
        tracing::info!("Interview session reset to setup");
    }

    /// Reports that the last answer could not be transcribed; asks the candidate to retry.
    pub async fn transcription_failed(&mut self, reason: &str) -> Result<(), SessionError> {
        self.require(Phase::Active, "report transcription failure")?;
        tracing::warn!("Transcription failed: {}", reason);
        self.emit(Command::Notice(Notice::warning(
            "Transcription Failed",
            "We couldn't process your response. Please try answering again.",
        )))
        .await;
        Ok(())
    }

    async fn advance(&mut self) -> Advance {
        let index = self.context.current_question_index;
        if index < self.questions.len() {
            Advance::Asked(self.ask(index).await)
        } else {
            Advance::Completed(self.finish().await)
        }
    }

    async fn ask(&mut self, index: usize) -> String {
        let question = self.questions[index].clone();
        let text = question.text_for(&self.language).to_string();
        self.transcript.append(Role::Interviewer, text.clone());
        self.current_question = Some(question);
        tracing::debug!("Asking question #{}: {}", index, text);
        self.emit(Command::Speak {
            text: text.clone(),
            language: self.language.clone(),
        })
        .await;
        text
    }

    async fn finish(&mut self) -> Decision {
        // Stop playback before the phase changes so nothing is spoken after completion.
        self.emit(Command::CancelSpeech).await;

        let decision = decide(&self.context, &self.config.decision, &mut self.rng);
        self.phase = Phase::Complete;
        self.current_question = None;
        self.decision = Some(decision.clone());

        let summary = match decision.outcome {
            Outcome::Accept => "Result: Accepted",
            Outcome::Reject => "Result: Thank you for your time",
        };
        self.emit(Command::Notice(Notice::info("Interview Complete", summary)))
            .await;
        self.emit(Command::SessionComplete(decision.clone())).await;
        decision
    }

    fn require(&self, phase: Phase, action: &'static str) -> Result<(), SessionError> {
        if self.phase == phase {
            Ok(())
        } else {
            tracing::debug!("Rejected '{}' in {:?} phase", action, self.phase);
            Err(SessionError::Rejected {
                action,
                phase: self.phase,
            })
        }
    }

    async fn emit(&self, command: Command) {
        if let Err(e) = self.command_tx.send(command).await {
            tracing::warn!("Runtime is gone, dropping command: {:?}", e.0);
        }
    }
}
