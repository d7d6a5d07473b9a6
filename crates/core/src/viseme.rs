use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Mouth shape codes. `SILENCE` is used for inter-word pauses.
pub const SILENCE: u8 = 0;
const BILABIAL: u8 = 1;
const LABIODENTAL: u8 = 2;
const APPROXIMANT: u8 = 3;
const ALVEOLAR: u8 = 4;
const OPEN_VOWEL: u8 = 5;
const FRONT_VOWEL: u8 = 6;
const ROUNDED_VOWEL: u8 = 7;
const VELAR: u8 = 8;
const OTHER: u8 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VisemeEvent {
    #[serde(with = "millis")]
    pub offset: Duration,
    pub code: u8,
    #[serde(with = "millis")]
    pub duration: Duration,
}

impl VisemeEvent {
    pub fn end(&self) -> Duration {
        self.offset + self.duration
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisemeConfig {
    pub char_ms: u64,
    pub pause_ms: u64,
    /// Random extra time per character, up to this many milliseconds. Zero disables it.
    pub jitter_ms: u64,
}

impl Default for VisemeConfig {
    fn default() -> Self {
        Self {
            char_ms: 100,
            pause_ms: 80,
            jitter_ms: 0,
        }
    }
}

/// Mouth shape for a single character.
pub fn mouth_shape(c: char) -> u8 {
    match c.to_ascii_lowercase() {
        'm' | 'b' | 'p' => BILABIAL,
        'f' | 'v' => LABIODENTAL,
        't' | 'd' | 'n' | 'l' | 's' | 'z' => ALVEOLAR,
        'h' | 'r' | 'j' => APPROXIMANT,
        'a' => OPEN_VOWEL,
        'e' | 'i' | 'y' => FRONT_VOWEL,
        'o' | 'u' | 'w' => ROUNDED_VOWEL,
        'k' | 'g' | 'c' | 'q' | 'x' => VELAR,
        c if c.is_whitespace() => SILENCE,
        _ => OTHER,
    }
}

/// Walks `text` word by word, emitting one timed code per character and a silent
/// pause between words. Offsets are contiguous: each event starts where the previous ends.
pub fn generate_visemes<R: Rng + ?Sized>(
    text: &str,
    config: &VisemeConfig,
    rng: &mut R,
) -> Vec<VisemeEvent> {
    let mut events = Vec::new();
    let mut offset = Duration::ZERO;

    for (index, word) in text.split_whitespace().enumerate() {
        if index > 0 && config.pause_ms > 0 {
            let duration = Duration::from_millis(config.pause_ms);
            events.push(VisemeEvent {
                offset,
                code: SILENCE,
                duration,
            });
            offset += duration;
        }
        for c in word.chars() {
            let jitter = if config.jitter_ms > 0 {
                rng.gen_range(0..=config.jitter_ms)
            } else {
                0
            };
            let duration = Duration::from_millis(config.char_ms + jitter);
            events.push(VisemeEvent {
                offset,
                code: mouth_shape(c),
                duration,
            });
            offset += duration;
        }
    }
    events
}

pub fn total_duration(events: &[VisemeEvent]) -> Duration {
    events.last().map(VisemeEvent::end).unwrap_or_default()
}

mod millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_events_are_contiguous_and_ordered() {
        let mut rng = StdRng::seed_from_u64(3);
        let config = VisemeConfig {
            jitter_ms: 200,
            ..VisemeConfig::default()
        };
        let events = generate_visemes("Tell me about yourself", &config, &mut rng);
        assert!(!events.is_empty());
        assert_eq!(events[0].offset, Duration::ZERO);
        for pair in events.windows(2) {
            assert_eq!(pair[1].offset, pair[0].end());
        }
    }

    #[test]
    fn test_duration_is_proportional_to_characters_plus_pauses() {
        let mut rng = StdRng::seed_from_u64(0);
        let events = generate_visemes("hi  there", &VisemeConfig::default(), &mut rng);
        // 7 characters and one pause
        assert_eq!(events.len(), 8);
        assert_eq!(total_duration(&events), Duration::from_millis(7 * 100 + 80));
        assert_eq!(events[2].code, SILENCE);
    }

    #[test]
    fn test_codes_are_a_function_of_the_character() {
        let mut rng = StdRng::seed_from_u64(0);
        let events = generate_visemes("Mom", &VisemeConfig::default(), &mut rng);
        let codes: Vec<u8> = events.iter().map(|e| e.code).collect();
        assert_eq!(codes, vec![BILABIAL, ROUNDED_VOWEL, BILABIAL]);
        assert!(codes.iter().all(|c| *c <= 9));
        assert_eq!(mouth_shape('?'), OTHER);
    }

    #[test]
    fn test_empty_text_has_no_events() {
        let mut rng = StdRng::seed_from_u64(0);
        let events = generate_visemes("   ", &VisemeConfig::default(), &mut rng);
        assert!(events.is_empty());
        assert_eq!(total_duration(&events), Duration::ZERO);
    }
}
