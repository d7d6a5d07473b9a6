use crate::error::BankError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_PROFILE: &str = "Software Engineer";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Technical,
    Behavioral,
    Experience,
    Closing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    pub category: Category,
    pub difficulty: Difficulty,
    // language code -> translated text
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub translations: HashMap<String, String>,
}

impl Question {
    pub fn new(text: impl Into<String>, category: Category, difficulty: Difficulty) -> Self {
        Self {
            text: text.into(),
            category,
            difficulty,
            translations: HashMap::new(),
        }
    }

    pub fn with_translation(mut self, language: &str, text: impl Into<String>) -> Self {
        self.translations.insert(language.to_string(), text.into());
        self
    }

    /// The text to ask in `language`, falling back to the base text.
    pub fn text_for(&self, language: &str) -> &str {
        self.translations
            .get(language)
            .map(String::as_str)
            .unwrap_or(&self.text)
    }
}

/// Questions and relevance keywords for a single job profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileQuestions {
    pub questions: Vec<Question>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Result of a profile lookup. A fallback is a distinct outcome so callers can log it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<'a> {
    Found(&'a [Question]),
    Fallback {
        requested: &'a str,
        default_profile: &'a str,
        questions: &'a [Question],
    },
}

impl<'a> Lookup<'a> {
    pub fn questions(&self) -> &'a [Question] {
        match self {
            Lookup::Found(questions) => questions,
            Lookup::Fallback { questions, .. } => questions,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Lookup::Fallback { .. })
    }
}

/// Read-only mapping from job profile name to its ordered question sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionBank {
    profiles: HashMap<String, ProfileQuestions>,
    default_profile: String,
}

impl QuestionBank {
    /// Builds a bank, checking that the default profile exists and has at least one question.
    pub fn new(
        profiles: HashMap<String, ProfileQuestions>,
        default_profile: impl Into<String>,
    ) -> Result<Self, BankError> {
        let default_profile = default_profile.into();
        match profiles.get(&default_profile) {
            None => return Err(BankError::MissingDefault(default_profile)),
            Some(p) if p.questions.is_empty() => {
                return Err(BankError::EmptyDefault(default_profile));
            }
            Some(_) => {}
        }
        Ok(Self {
            profiles,
            default_profile,
        })
    }

    pub fn default_profile(&self) -> &str {
        &self.default_profile
    }

    pub fn profiles(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn questions<'a>(&'a self, profile: &'a str) -> Lookup<'a> {
        if let Some(found) = self.profiles.get(profile) {
            return Lookup::Found(&found.questions);
        }
        Lookup::Fallback {
            requested: profile,
            default_profile: &self.default_profile,
            questions: &self.default_entry().questions,
        }
    }

    /// Keywords for `profile`, or the default profile's keywords when it has none.
    pub fn keywords(&self, profile: &str) -> &[String] {
        match self.profiles.get(profile) {
            Some(p) if !p.keywords.is_empty() => &p.keywords,
            _ => &self.default_entry().keywords,
        }
    }

    /// Adds or replaces a profile. Replacing the default with an empty sequence is refused.
    pub fn insert(&mut self, profile: impl Into<String>, entry: ProfileQuestions) -> Result<(), BankError> {
        let profile = profile.into();
        if profile == self.default_profile && entry.questions.is_empty() {
            return Err(BankError::EmptyDefault(profile));
        }
        self.profiles.insert(profile, entry);
        Ok(())
    }

    fn default_entry(&self) -> &ProfileQuestions {
        // presence checked in `new` and `insert`
        &self.profiles[&self.default_profile]
    }

    /// The bank shipped with the demo: two profiles and their keyword sets.
    pub fn builtin() -> Self {
        use Category::*;
        use Difficulty::*;

        let software = ProfileQuestions {
            questions: vec![
                Question::new(
                    "Tell me about yourself and your experience in software development.",
                    Experience,
                    Easy,
                )
                .with_translation(
                    "hi",
                    "अपने बारे में और सॉफ्टवेयर डेवलपमेंट में अपने अनुभव के बारे में बताएं।",
                ),
                Question::new(
                    "How do you approach debugging a complex issue in a production system?",
                    Technical,
                    Medium,
                )
                .with_translation(
                    "hi",
                    "आप प्रोडक्शन सिस्टम में एक जटिल समस्या को डिबग करने के लिए कैसे पहुंचते हैं?",
                ),
                Question::new(
                    "Describe a challenging project you worked on and how you overcame the obstacles.",
                    Behavioral,
                    Medium,
                ),
                Question::new(
                    "What's your experience with modern JavaScript frameworks like React or Vue?",
                    Technical,
                    Medium,
                ),
                Question::new(
                    "How do you stay updated with the latest technology trends?",
                    Behavioral,
                    Easy,
                ),
                Question::new(
                    "Do you have any questions about the role or our company?",
                    Closing,
                    Easy,
                ),
            ],
            keywords: to_strings(&[
                "javascript",
                "react",
                "node",
                "typescript",
                "api",
                "database",
                "code",
                "development",
            ]),
        };

        let sales = ProfileQuestions {
            questions: vec![
                Question::new(
                    "Tell me about your sales experience and biggest achievements.",
                    Experience,
                    Easy,
                ),
                Question::new(
                    "How do you handle rejection and maintain motivation in sales?",
                    Behavioral,
                    Medium,
                ),
                Question::new(
                    "Describe your approach to building and managing a sales pipeline.",
                    Technical,
                    Medium,
                ),
                Question::new(
                    "How do you handle difficult customers or challenging negotiations?",
                    Behavioral,
                    Hard,
                ),
                Question::new(
                    "What CRM tools have you used and how do you leverage data in sales?",
                    Technical,
                    Medium,
                ),
            ],
            keywords: to_strings(&[
                "sales",
                "customer",
                "revenue",
                "target",
                "negotiation",
                "pipeline",
                "crm",
                "client",
            ]),
        };

        let profiles = HashMap::from([
            (DEFAULT_PROFILE.to_string(), software),
            ("Sales Manager".to_string(), sales),
        ]);
        Self {
            profiles,
            default_profile: DEFAULT_PROFILE.to_string(),
        }
    }
}

impl Default for QuestionBank {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Drops a " - <specialization>" suffix, e.g. "Software Engineer - Full Stack".
pub fn normalize_profile(profile: &str) -> &str {
    profile.split(" - ").next().unwrap_or(profile).trim()
}

fn to_strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_profile_is_found() {
        let bank = QuestionBank::builtin();
        let lookup = bank.questions("Sales Manager");
        assert!(!lookup.is_fallback());
        assert_eq!(lookup.questions().len(), 5);
        assert_eq!(
            lookup.questions()[0].text,
            "Tell me about your sales experience and biggest achievements."
        );
    }

    #[test]
    fn test_unknown_profile_falls_back_to_default_sequence() {
        let bank = QuestionBank::builtin();
        let lookup = bank.questions("Unknown Profile");
        match lookup {
            Lookup::Fallback {
                requested,
                default_profile,
                questions,
            } => {
                assert_eq!(requested, "Unknown Profile");
                assert_eq!(default_profile, DEFAULT_PROFILE);
                assert_eq!(questions, bank.questions(DEFAULT_PROFILE).questions());
            }
            Lookup::Found(_) => panic!("Expected a fallback lookup"),
        }
    }

    #[test]
    fn test_keywords_fall_back_to_default_profile() {
        let bank = QuestionBank::builtin();
        assert!(bank.keywords("Sales Manager").contains(&"crm".to_string()));
        assert!(bank.keywords("Astronaut").contains(&"react".to_string()));
    }

    #[test]
    fn test_new_rejects_missing_or_empty_default() {
        let err = QuestionBank::new(HashMap::new(), "Chef").unwrap_err();
        assert_eq!(err, BankError::MissingDefault("Chef".to_string()));

        let profiles = HashMap::from([("Chef".to_string(), ProfileQuestions::default())]);
        let err = QuestionBank::new(profiles, "Chef").unwrap_err();
        assert_eq!(err, BankError::EmptyDefault("Chef".to_string()));
    }

    #[test]
    fn test_insert_refuses_to_empty_the_default() {
        let mut bank = QuestionBank::builtin();
        assert!(bank.insert(DEFAULT_PROFILE, ProfileQuestions::default()).is_err());
        assert!(bank.insert("Chef", ProfileQuestions::default()).is_ok());
        assert!(bank.questions("Chef").questions().is_empty());
    }

    #[test]
    fn test_text_for_uses_translation_when_present() {
        let bank = QuestionBank::builtin();
        let first = &bank.questions(DEFAULT_PROFILE).questions()[0];
        assert_ne!(first.text_for("hi"), first.text);
        assert_eq!(first.text_for("es"), first.text);
    }

    #[test]
    fn test_normalize_profile() {
        assert_eq!(normalize_profile("Software Engineer - Full Stack"), "Software Engineer");
        assert_eq!(normalize_profile("Sales Manager"), "Sales Manager");
        assert_eq!(normalize_profile("  "), "");
    }

    #[test]
    fn test_profile_deserializes_from_json() {
        let json = r#"{
            "questions": [
                { "text": "Why cooking?", "category": "experience", "difficulty": "easy" }
            ],
            "keywords": ["knife"]
        }"#;
        let entry: ProfileQuestions = serde_json::from_str(json).unwrap();
        assert_eq!(entry.questions[0].category, Category::Experience);
        assert!(entry.questions[0].translations.is_empty());
        assert_eq!(entry.keywords, vec!["knife".to_string()]);
    }
}
