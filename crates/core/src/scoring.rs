use crate::error::ThresholdError;
use crate::question_bank::Question;
use crate::session::InterviewContext;
use serde::{Deserialize, Serialize};

/// Tunable weights for per-answer scoring. The defaults reproduce the demo heuristics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub points_per_word: u32,
    pub keyword_bonus: u32,
    pub min_score: u8,
    pub max_score: u8,
    /// Lower bounds of the feedback bands, highest first.
    pub excellent_from: u8,
    pub good_from: u8,
    pub adequate_from: u8,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            points_per_word: 2,
            keyword_bonus: 20,
            min_score: 20,
            max_score: 100,
            excellent_from: 80,
            good_from: 60,
            adequate_from: 40,
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), ThresholdError> {
        if self.max_score > 100 {
            return Err(ThresholdError::OutOfRange {
                name: "max_score",
                value: self.max_score as f64,
            });
        }
        if self.min_score > self.max_score {
            return Err(ThresholdError::Inverted {
                name: "score",
                low: self.min_score as f64,
                high: self.max_score as f64,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseScore {
    pub score: u8,
    pub feedback: String,
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Case-insensitive substring match against any of the keywords.
pub fn contains_keyword(text: &str, keywords: &[String]) -> bool {
    let lower = text.to_lowercase();
    keywords
        .iter()
        .any(|k| !k.is_empty() && lower.contains(&k.to_lowercase()))
}

/// Scores one answer from its length and whether it mentions a profile keyword.
pub fn score_response(
    question: &Question,
    answer: &str,
    context: &InterviewContext,
    keywords: &[String],
    config: &ScoringConfig,
) -> ResponseScore {
    let words = word_count(answer) as u64;
    let bonus = if contains_keyword(answer, keywords) {
        config.keyword_bonus as u64
    } else {
        0
    };
    let raw = words.saturating_mul(config.points_per_word as u64) + bonus;
    // max/min rather than clamp: an inverted pair settles on max_score instead of panicking.
    let score = raw
        .max(config.min_score as u64)
        .min(config.max_score.min(100) as u64) as u8;

    tracing::debug!(
        profile = %context.job_profile,
        category = ?question.category,
        words,
        keyword_hit = bonus > 0,
        score,
        "Scored candidate response"
    );

    ResponseScore {
        score,
        feedback: feedback_for(score, config).to_string(),
    }
}

fn feedback_for(score: u8, config: &ScoringConfig) -> &'static str {
    if score >= config.excellent_from {
        "Excellent response! You demonstrated strong knowledge and provided specific examples."
    } else if score >= config.good_from {
        "Good response with relevant information. Could benefit from more specific examples."
    } else if score >= config.adequate_from {
        "Adequate response but could use more detail and specific examples to strengthen your answer."
    } else {
        "Response could be improved with more specific details and examples relevant to the role."
    }
}
