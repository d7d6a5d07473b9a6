use crate::error::SpeechError;
use crate::viseme::{VisemeConfig, VisemeEvent, generate_visemes};
use async_trait::async_trait;
use bytes::Bytes;
#[cfg(test)]
use mockall::automock;
use rand::SeedableRng;
use rand::rngs::StdRng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Size of the silent placeholder returned when no real audio is produced.
pub const PLACEHOLDER_AUDIO_LEN: usize = 1024;

/// Synthesized speech: playable audio plus the mouth shapes to animate alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub audio: Bytes,
    pub content_type: String,
    pub visemes: Vec<VisemeEvent>,
}

/// A recorded answer handed to a transcription step.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedAudio {
    pub bytes: Bytes,
    pub content_type: String,
    pub file_name: String,
}

// The speech traits are the seams between the interview and whichever speech vendor
// sits behind the gateway. Offline implementations keep the interview usable without one.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SpeechOutput: Send + Sync {
    async fn synthesize(&self, text: &str, language: &str) -> Result<Utterance, SpeechError>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: CapturedAudio, language: &str) -> Result<String, SpeechError>;
}

/// Offline speech output: silent placeholder audio with generated visemes.
pub struct PlaceholderSpeech {
    visemes: VisemeConfig,
    rng: Mutex<StdRng>,
}

impl PlaceholderSpeech {
    pub fn new(visemes: VisemeConfig, seed: u64) -> Self {
        Self {
            visemes,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

#[async_trait]
impl SpeechOutput for PlaceholderSpeech {
    async fn synthesize(&self, text: &str, language: &str) -> Result<Utterance, SpeechError> {
        tracing::debug!("Placeholder TTS for '{}' in {}", text, language);
        let visemes = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            generate_visemes(text, &self.visemes, &mut *rng)
        };
        Ok(Utterance {
            audio: Bytes::from(vec![0u8; PLACEHOLDER_AUDIO_LEN]),
            content_type: "audio/wav".to_string(),
            visemes,
        })
    }
}

#[derive(Debug, Serialize)]
struct TtsRequest<'a> {
    text: &'a str,
    language: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    voice_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct SttResponse {
    text: String,
}

/// Speech output backed by the speech gateway, which holds the vendor credential.
pub struct GatewaySpeech {
    client: Client,
    base_url: String,
    voice_id: Option<String>,
    visemes: VisemeConfig,
    rng: Mutex<StdRng>,
}

impl GatewaySpeech {
    pub fn new(base_url: impl Into<String>, voice_id: Option<String>, visemes: VisemeConfig, seed: u64) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            voice_id,
            visemes,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

#[async_trait]
impl SpeechOutput for GatewaySpeech {
    async fn synthesize(&self, text: &str, language: &str) -> Result<Utterance, SpeechError> {
        let body = TtsRequest {
            text,
            language,
            voice_id: self.voice_id.as_deref(),
        };
        let resp = self
            .client
            .post(format!("{}/v1/tts", self.base_url))
            .json(&body)
            .send()
            .await?;
        let resp = check_status(resp).await?;

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("audio/mpeg")
            .to_string();
        let audio = resp.bytes().await?;
        tracing::debug!("Gateway returned {} bytes of {}", audio.len(), content_type);

        let visemes = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            generate_visemes(text, &self.visemes, &mut *rng)
        };
        Ok(Utterance {
            audio,
            content_type,
            visemes,
        })
    }
}

/// Transcription backed by the speech gateway.
pub struct GatewayTranscriber {
    client: Client,
    base_url: String,
}

impl GatewayTranscriber {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Transcriber for GatewayTranscriber {
    async fn transcribe(&self, audio: CapturedAudio, language: &str) -> Result<String, SpeechError> {
        let part = reqwest::multipart::Part::bytes(audio.bytes.to_vec())
            .file_name(audio.file_name)
            .mime_str(&audio.content_type)?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("language", language.to_string());

        let resp = self
            .client
            .post(format!("{}/v1/stt", self.base_url))
            .multipart(form)
            .send()
            .await?;
        let resp = check_status(resp).await?;
        let parsed = resp.json::<SttResponse>().await?;
        non_empty(parsed.text)
    }
}

const CANNED_TRANSCRIPTS: &[&str] = &[
    "I have 5 years of experience in full-stack development, primarily working with React and Node.js.",
    "Yes, I'm familiar with TypeScript and have used it in several production projects.",
    "I believe my problem-solving skills and ability to work in agile environments make me a good fit.",
    "I'm passionate about creating user-friendly applications and staying updated with the latest technologies.",
    "My greatest strength is my ability to break down complex problems into manageable solutions.",
];

/// Offline transcription that cycles through a fixed set of answers.
#[derive(Default)]
pub struct CannedTranscriber {
    next: AtomicUsize,
}

impl CannedTranscriber {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Transcriber for CannedTranscriber {
    async fn transcribe(&self, audio: CapturedAudio, language: &str) -> Result<String, SpeechError> {
        if audio.bytes.is_empty() {
            return Err(SpeechError::EmptyTranscript);
        }
        tracing::debug!(
            "Canned STT for {} bytes of {} in {}",
            audio.bytes.len(),
            audio.content_type,
            language
        );
        let i = self.next.fetch_add(1, Ordering::Relaxed) % CANNED_TRANSCRIPTS.len();
        Ok(CANNED_TRANSCRIPTS[i].to_string())
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, SpeechError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp.text().await.unwrap_or_default();
    Err(SpeechError::Upstream {
        status: status.as_u16(),
        message,
    })
}

fn non_empty(text: String) -> Result<String, SpeechError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(SpeechError::EmptyTranscript)
    } else {
        Ok(trimmed.to_string())
    }
}
