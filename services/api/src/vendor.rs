use crate::error::ApiError;
use async_trait::async_trait;
use bytes::Bytes;
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

const XI_API_KEY_HEADER: &str = "xi-api-key";
pub const DEFAULT_TTS_MODEL: &str = "eleven_multilingual_v2";
pub const STT_MODEL: &str = "scribe_v1";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub use_speaker_boost: bool,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.8,
            style: 0.0,
            use_speaker_boost: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    pub voice_id: String,
    pub name: String,
    #[serde(default)]
    pub preview_url: Option<String>,
}

/// A recording forwarded for transcription.
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    pub bytes: Bytes,
    pub file_name: String,
    pub content_type: String,
}

/// The speech vendor behind the gateway. Only this process ever holds its credential.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SpeechVendor: Send + Sync {
    async fn synthesize(&self, text: &str, voice_id: &str, language: Option<String>) -> Result<Bytes, ApiError>;
    async fn transcribe(&self, recording: Recording, language: Option<String>) -> Result<String, ApiError>;
    async fn voices(&self) -> Result<Vec<Voice>, ApiError>;
}

#[derive(Serialize)]
struct TtsBody<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: &'a VoiceSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    language_code: Option<&'a str>,
}

impl<'a> TtsBody<'a> {
    fn new(text: &'a str, model_id: &'a str, voice_settings: &'a VoiceSettings, language: Option<&'a str>) -> Self {
        // Only the v2.5 models accept an enforced language; the others reject the field
        // and detect the language from the text.
        let language_code = language.filter(|_| enforces_language(model_id));
        Self {
            text,
            model_id,
            voice_settings,
            language_code,
        }
    }
}

pub fn enforces_language(model_id: &str) -> bool {
    model_id.ends_with("_v2_5")
}

#[derive(Deserialize)]
struct SttBody {
    text: String,
}

#[derive(Deserialize)]
struct VoicesBody {
    voices: Vec<Voice>,
}

pub struct ElevenLabsClient {
    inner: Client,
    api_key: SecretString,
    base_url: String,
    tts_model: String,
    voice_settings: VoiceSettings,
}

impl ElevenLabsClient {
    pub fn new(api_key: SecretString, base_url: impl Into<String>, tts_model: impl Into<String>) -> Self {
        Self {
            inner: Client::new(),
            api_key,
            base_url: base_url.into(),
            tts_model: tts_model.into(),
            voice_settings: VoiceSettings::default(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path)
    }
}

#[async_trait]
impl SpeechVendor for ElevenLabsClient {
    async fn synthesize(&self, text: &str, voice_id: &str, language: Option<String>) -> Result<Bytes, ApiError> {
        let body = TtsBody::new(text, &self.tts_model, &self.voice_settings, language.as_deref());
        let resp = self
            .inner
            .post(self.url(&format!("text-to-speech/{voice_id}")))
            .header(XI_API_KEY_HEADER, self.api_key.expose_secret())
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&body)
            .send()
            .await?;
        let audio = check_status(resp).await?.bytes().await?;
        tracing::debug!("Vendor synthesized {} bytes for voice {}", audio.len(), voice_id);
        Ok(audio)
    }

    async fn transcribe(&self, recording: Recording, language: Option<String>) -> Result<String, ApiError> {
        let size = recording.bytes.len();
        let part = reqwest::multipart::Part::bytes(recording.bytes.to_vec())
            .file_name(recording.file_name)
            .mime_str(&recording.content_type)?;
        let mut form = reqwest::multipart::Form::new()
            .text("model_id", STT_MODEL)
            .part("file", part);
        if let Some(language) = language {
            form = form.text("language_code", language);
        }

        let resp = self
            .inner
            .post(self.url("speech-to-text"))
            .header(XI_API_KEY_HEADER, self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await?;
        let parsed = check_status(resp).await?.json::<SttBody>().await?;
        tracing::debug!("Vendor transcribed {} bytes into {} chars", size, parsed.text.len());
        Ok(parsed.text)
    }

    async fn voices(&self) -> Result<Vec<Voice>, ApiError> {
        let resp = self
            .inner
            .get(self.url("voices"))
            .header(XI_API_KEY_HEADER, self.api_key.expose_secret())
            .send()
            .await?;
        Ok(check_status(resp).await?.json::<VoicesBody>().await?.voices)
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp.text().await.unwrap_or_default();
    Err(ApiError::Upstream {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tts_body_carries_model_and_voice_settings() {
        let settings = VoiceSettings::default();
        let body = TtsBody::new("Hello", DEFAULT_TTS_MODEL, &settings, Some("hi"));
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["model_id"], "eleven_multilingual_v2");
        assert_eq!(value["voice_settings"]["stability"], 0.5);
        assert_eq!(value["voice_settings"]["style"], 0.0);
        assert_eq!(value["voice_settings"]["use_speaker_boost"], true);
        // multilingual_v2 rejects an enforced language
        assert!(value.get("language_code").is_none());
    }

    #[test]
    fn test_tts_body_enforces_language_on_v2_5_models() {
        let settings = VoiceSettings::default();
        let value = serde_json::to_value(TtsBody::new("Hola", "eleven_turbo_v2_5", &settings, Some("es"))).unwrap();
        assert_eq!(value["language_code"], "es");

        let value = serde_json::to_value(TtsBody::new("Hola", "eleven_turbo_v2_5", &settings, None)).unwrap();
        assert!(value.get("language_code").is_none());
        assert!(!enforces_language(DEFAULT_TTS_MODEL));
    }

    #[test]
    fn test_voices_body_tolerates_extra_fields() {
        let raw = r#"{ "voices": [
            { "voice_id": "v1", "name": "Interview", "category": "premade" },
            { "voice_id": "v2", "name": "Other", "preview_url": "https://example.com/p.mp3" }
        ] }"#;
        let parsed: VoicesBody = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.voices.len(), 2);
        assert_eq!(parsed.voices[0].preview_url, None);
        assert_eq!(parsed.voices[1].name, "Other");
    }
}
