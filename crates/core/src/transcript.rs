use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Interviewer,
    Candidate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptEntry {
    pub seq: u64,
    pub role: Role,
    pub text: String,
    pub at: DateTime<Utc>,
}

/// Append-only conversation log. Entries are strictly ordered by `seq` and by `at`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, role: Role, text: impl Into<String>) -> &TranscriptEntry {
        self.append_at(role, text, Utc::now())
    }

    /// Appends with an explicit clock reading. A reading that does not move past the
    /// previous entry is bumped by one microsecond so ordering stays strict.
    pub fn append_at(
        &mut self,
        role: Role,
        text: impl Into<String>,
        now: DateTime<Utc>,
    ) -> &TranscriptEntry {
        let (seq, at) = match self.entries.last() {
            Some(last) if now <= last.at => (last.seq + 1, last.at + Duration::microseconds(1)),
            Some(last) => (last.seq + 1, now),
            None => (0, now),
        };
        self.entries.push(TranscriptEntry {
            seq,
            role,
            text: text.into(),
            at,
        });
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_are_strictly_increasing_even_with_a_stalled_clock() {
        let mut transcript = Transcript::new();
        let t0 = Utc::now();
        transcript.append_at(Role::Interviewer, "Question one?", t0);
        transcript.append_at(Role::Candidate, "Answer one.", t0);
        transcript.append_at(Role::Interviewer, "Question two?", t0 - Duration::seconds(5));

        let entries = transcript.entries();
        assert_eq!(entries.len(), 3);
        for pair in entries.windows(2) {
            assert!(pair[1].seq > pair[0].seq);
            assert!(pair[1].at > pair[0].at);
        }
        assert_eq!(entries[2].text, "Question two?");
    }

    #[test]
    fn test_append_with_advancing_clock_keeps_reading() {
        let mut transcript = Transcript::new();
        let t0 = Utc::now();
        let t1 = t0 + Duration::seconds(2);
        transcript.append_at(Role::Interviewer, "Hello?", t0);
        let entry = transcript.append_at(Role::Candidate, "Hi.", t1);
        assert_eq!(entry.at, t1);
        assert_eq!(entry.seq, 1);
    }
}
