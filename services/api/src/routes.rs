use crate::error::ApiError;
use crate::vendor::{Recording, SpeechVendor, Voice};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
};
use bytes::Bytes;
use interview_core::language;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

/// Recordings larger than this are rejected before they reach the vendor.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub vendor: Arc<dyn SpeechVendor>,
    pub default_voice_id: Option<String>,
    pub upstream_timeout: Duration,
}

#[derive(Debug, Deserialize)]
pub struct TtsRequest {
    pub text: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub voice_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SttResponse {
    pub text: String,
}

pub fn router(state: AppState) -> Router {
    // Permissive CORS so a browser front end on another origin can call the gateway.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/v1/tts", post(text_to_speech))
        .route("/v1/stt", post(speech_to_text))
        .route("/v1/voices", get(list_voices))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn text_to_speech(
    State(state): State<AppState>,
    Json(req): Json<TtsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let text = req.text.trim();
    if text.is_empty() {
        return Err(ApiError::Validation("text must not be empty".to_string()));
    }
    let language = checked_language(req.language)?;
    let voice_id = req
        .voice_id
        .or_else(|| state.default_voice_id.clone())
        .ok_or(ApiError::NoVoice)?;
    tracing::info!(
        "TTS request: {} chars, language {}, voice {}",
        text.len(),
        language.as_deref().map(language::locale_tag).unwrap_or("auto"),
        voice_id
    );

    let audio = bounded(
        state.upstream_timeout,
        state.vendor.synthesize(text, &voice_id, language),
    )
    .await?;
    Ok(([(header::CONTENT_TYPE, "audio/mpeg")], audio))
}

async fn speech_to_text(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SttResponse>, ApiError> {
    let mut recording = None;
    let mut language = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(e.to_string()))?
    {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("recording").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes: Bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(e.to_string()))?;
                recording = Some(Recording {
                    bytes,
                    file_name,
                    content_type,
                });
            }
            Some("language") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Validation(e.to_string()))?;
                language = Some(value);
            }
            other => tracing::debug!("Ignoring multipart field {:?}", other),
        }
    }

    let language = checked_language(language)?;
    let recording = recording.ok_or_else(|| ApiError::Validation("missing 'file' field".to_string()))?;
    if recording.bytes.is_empty() {
        return Err(ApiError::Validation("recording is empty".to_string()));
    }
    tracing::info!(
        "STT request: {} bytes of {}, language {}",
        recording.bytes.len(),
        recording.content_type,
        language.as_deref().unwrap_or("auto")
    );

    let text = bounded(state.upstream_timeout, state.vendor.transcribe(recording, language)).await?;
    let text = text.trim();
    if text.is_empty() {
        return Err(ApiError::EmptyTranscript);
    }
    Ok(Json(SttResponse {
        text: text.to_string(),
    }))
}

/// Blank means "let the vendor detect it"; anything else must be an interview language.
fn checked_language(language: Option<String>) -> Result<Option<String>, ApiError> {
    match language.map(|l| l.trim().to_ascii_lowercase()) {
        None => Ok(None),
        Some(code) if code.is_empty() => Ok(None),
        Some(code) if language::is_supported(&code) => Ok(Some(code)),
        Some(code) => Err(ApiError::Validation(format!("unsupported language '{code}'"))),
    }
}

async fn list_voices(State(state): State<AppState>) -> Result<Json<Vec<Voice>>, ApiError> {
    let voices = bounded(state.upstream_timeout, state.vendor.voices()).await?;
    Ok(Json(voices))
}

async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, ApiError>>,
) -> Result<T, ApiError> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| ApiError::Timeout(limit))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vendor::MockSpeechVendor;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    const BOUNDARY: &str = "gateway-test-boundary";

    fn app(vendor: MockSpeechVendor) -> Router {
        router(AppState {
            vendor: Arc::new(vendor),
            default_voice_id: Some("default-voice".to_string()),
            upstream_timeout: Duration::from_secs(2),
        })
    }

    fn tts(body: serde_json::Value) -> Request<Body> {
        Request::post("/v1/tts")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn stt(file: Option<&[u8]>, language: Option<&str>) -> Request<Body> {
        let mut body = Vec::new();
        if let Some(language) = language {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"language\"\r\n\r\n{language}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some(file) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"answer.webm\"\r\nContent-Type: audio/webm\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(file);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::post("/v1/stt")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(MockSpeechVendor::new())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_tts_returns_audio_with_default_voice() {
        let mut vendor = MockSpeechVendor::new();
        vendor
            .expect_synthesize()
            .withf(|text, voice, language| {
                text == "Tell me about yourself."
                    && voice == "default-voice"
                    && language.as_deref() == Some("en")
            })
            .returning(|_, _, _| Ok(Bytes::from_static(b"ID3mp3")))
            .once();

        let response = app(vendor)
            .oneshot(tts(serde_json::json!({ "text": "  Tell me about yourself. ", "language": "en" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"ID3mp3");
    }

    #[tokio::test]
    async fn test_tts_rejects_empty_text() {
        let mut vendor = MockSpeechVendor::new();
        vendor.expect_synthesize().never();

        let response = app(vendor)
            .oneshot(tts(serde_json::json!({ "text": "   ", "language": "en" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_tts_forwards_the_interview_language() {
        let mut vendor = MockSpeechVendor::new();
        vendor
            .expect_synthesize()
            .withf(|_, _, language| language.as_deref() == Some("hi"))
            .returning(|_, _, _| Ok(Bytes::from_static(b"ID3")))
            .once();
        let response = app(vendor)
            .oneshot(tts(serde_json::json!({ "text": "Namaste", "language": " HI " })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let mut vendor = MockSpeechVendor::new();
        vendor
            .expect_synthesize()
            .withf(|_, _, language| language.is_none())
            .returning(|_, _, _| Ok(Bytes::from_static(b"ID3")))
            .once();
        let response = app(vendor)
            .oneshot(tts(serde_json::json!({ "text": "Hi", "language": "" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unsupported_language_is_rejected() {
        let mut vendor = MockSpeechVendor::new();
        vendor.expect_synthesize().never();
        vendor.expect_transcribe().never();
        let app = app(vendor);

        let response = app
            .clone()
            .oneshot(tts(serde_json::json!({ "text": "Hi", "language": "klingon" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app.oneshot(stt(Some(b"webm"), Some("xx"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_tts_requires_a_voice() {
        let state = AppState {
            vendor: Arc::new(MockSpeechVendor::new()),
            default_voice_id: None,
            upstream_timeout: Duration::from_secs(2),
        };
        let response = router(state)
            .oneshot(tts(serde_json::json!({ "text": "Hi" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_vendor_error_is_not_leaked() {
        let mut vendor = MockSpeechVendor::new();
        vendor.expect_synthesize().returning(|_, _, _| {
            Err(ApiError::Upstream {
                status: 401,
                message: "invalid xi-api-key sk_secret".to_string(),
            })
        });

        let response = app(vendor)
            .oneshot(tts(serde_json::json!({ "text": "Hi", "voice_id": "v2" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await.to_string();
        assert!(!body.contains("sk_secret"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_vendor_times_out() {
        struct Stalled;

        #[async_trait::async_trait]
        impl SpeechVendor for Stalled {
            async fn synthesize(
                &self,
                _text: &str,
                _voice_id: &str,
                _language: Option<String>,
            ) -> Result<Bytes, ApiError> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(Bytes::new())
            }
            async fn transcribe(&self, _recording: Recording, _language: Option<String>) -> Result<String, ApiError> {
                unreachable!()
            }
            async fn voices(&self) -> Result<Vec<Voice>, ApiError> {
                unreachable!()
            }
        }

        let state = AppState {
            vendor: Arc::new(Stalled),
            default_voice_id: Some("v".to_string()),
            upstream_timeout: Duration::from_secs(2),
        };
        let response = router(state)
            .oneshot(tts(serde_json::json!({ "text": "Hi" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn test_stt_forwards_recording_and_language() {
        let mut vendor = MockSpeechVendor::new();
        vendor
            .expect_transcribe()
            .withf(|recording, language| {
                recording.bytes.as_ref() == b"webm-bytes"
                    && recording.file_name == "answer.webm"
                    && recording.content_type == "audio/webm"
                    && language.as_deref() == Some("hi")
            })
            .returning(|_, _| Ok("  I enjoy building APIs \n".to_string()))
            .once();

        let response = app(vendor)
            .oneshot(stt(Some(b"webm-bytes"), Some("hi")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["text"], "I enjoy building APIs");
    }

    #[tokio::test]
    async fn test_stt_validation_and_empty_transcript() {
        let response = app(MockSpeechVendor::new())
            .oneshot(stt(None, Some("en")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app(MockSpeechVendor::new())
            .oneshot(stt(Some(b""), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let mut vendor = MockSpeechVendor::new();
        vendor.expect_transcribe().returning(|_, _| Ok("   ".to_string()));
        let response = app(vendor).oneshot(stt(Some(b"noise"), None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_voices_are_listed() {
        let mut vendor = MockSpeechVendor::new();
        vendor.expect_voices().returning(|| {
            Ok(vec![Voice {
                voice_id: "v1".to_string(),
                name: "Professional Interview Voice".to_string(),
                preview_url: None,
            }])
        });

        let response = app(vendor)
            .oneshot(Request::get("/v1/voices").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body[0]["voice_id"], "v1");
        assert_eq!(body[0]["name"], "Professional Interview Voice");
    }
}
