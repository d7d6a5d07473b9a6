use anyhow::{Context, Result};
use interview_core::question_bank::{ProfileQuestions, QuestionBank};
use std::fs;
use std::path::Path;

/// Merges every `<profile>.json` file in `dir_path` into `bank`.
///
/// The file stem is the profile name. A file for an existing profile replaces it.
pub fn load_bank(dir_path: &Path, mut bank: QuestionBank) -> Result<QuestionBank> {
    for entry in fs::read_dir(dir_path)
        .with_context(|| format!("Failed to read question bank directory: {}", dir_path.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("json") {
            let profile = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem for question file")?
                .to_string();

            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read question file: {}", path.display()))?;
            let questions: ProfileQuestions = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse question file: {}", path.display()))?;

            tracing::debug!("Loaded {} questions for '{}'", questions.questions.len(), profile);
            bank.insert(profile, questions)?;
        }
    }

    Ok(bank)
}
