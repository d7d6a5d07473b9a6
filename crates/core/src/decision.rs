use crate::error::ThresholdError;
use crate::scoring::word_count;
use crate::session::InterviewContext;
use rand::Rng;
use serde::{Deserialize, Serialize};

const STRENGTHS: &[&str] = &[
    "Clear communication skills",
    "Relevant technical background",
    "Professional demeanor",
    "Problem-solving approach",
];

const IMPROVEMENTS: &[&str] = &[
    "Provide more specific examples",
    "Elaborate on technical implementations",
    "Discuss measurable outcomes",
    "Share more project details",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Accept,
    Reject,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub outcome: Outcome,
    pub score: u8,
    pub reasoning: String,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub responses_considered: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    pub floor: f64,
    pub ceiling: f64,
    pub points_per_word: f64,
    pub accept_threshold: u8,
    /// Upper bound of the random bonus added to the score. Zero keeps decisions reproducible.
    pub jitter_max: f64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            floor: 35.0,
            ceiling: 95.0,
            points_per_word: 3.0,
            accept_threshold: 70,
            jitter_max: 0.0,
        }
    }
}

impl DecisionConfig {
    pub fn validate(&self) -> Result<(), ThresholdError> {
        for (name, value) in [
            ("floor", self.floor),
            ("ceiling", self.ceiling),
            ("points_per_word", self.points_per_word),
            ("jitter_max", self.jitter_max),
        ] {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(ThresholdError::OutOfRange { name, value });
            }
        }
        if self.floor > self.ceiling {
            return Err(ThresholdError::Inverted {
                name: "decision score",
                low: self.floor,
                high: self.ceiling,
            });
        }
        Ok(())
    }
}

/// Average word count per answer; zero when nothing has been answered.
pub fn average_word_count(responses: &[String]) -> f64 {
    if responses.is_empty() {
        return 0.0;
    }
    let total: usize = responses.iter().map(|r| word_count(r)).sum();
    total as f64 / responses.len() as f64
}

/// Produces the final outcome from every answer collected so far.
pub fn decide<R: Rng + ?Sized>(
    context: &InterviewContext,
    config: &DecisionConfig,
    rng: &mut R,
) -> Decision {
    let average = average_word_count(&context.candidate_responses);
    let jitter = if config.jitter_max > 0.0 {
        rng.gen_range(0.0..config.jitter_max)
    } else {
        0.0
    };
    let raw = config.floor + average * config.points_per_word + jitter;
    let score = raw.max(config.floor).min(config.ceiling).round().clamp(0.0, 100.0) as u8;
    let outcome = if score >= config.accept_threshold {
        Outcome::Accept
    } else {
        Outcome::Reject
    };

    tracing::info!(
        profile = %context.job_profile,
        responses = context.candidate_responses.len(),
        average_words = average,
        score,
        ?outcome,
        "Final decision computed"
    );

    let (strength_count, improvement_count) = match outcome {
        Outcome::Accept => (3, 1),
        Outcome::Reject => (2, 2),
    };

    Decision {
        outcome,
        score,
        reasoning: reasoning(outcome, &context.job_profile),
        strengths: STRENGTHS[..strength_count].iter().map(|s| s.to_string()).collect(),
        improvements: IMPROVEMENTS[..improvement_count]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        responses_considered: context.candidate_responses.len(),
    }
}

fn reasoning(outcome: Outcome, job_profile: &str) -> String {
    match outcome {
        Outcome::Accept => format!(
            "Strong candidate with good communication skills and relevant experience for the {job_profile} position. Demonstrated technical knowledge and provided thoughtful responses to behavioral questions."
        ),
        Outcome::Reject => format!(
            "While the candidate shows potential, responses lacked sufficient detail and specific examples required for the {job_profile} role. Would benefit from more hands-on experience."
        ),
    }
}
