//! HTTP API server for integration with other systems.
//!
//! Accepts audio uploads or YouTube URLs and returns the transcript and study
//! notes, either as one JSON response or as a Server-Sent Events stream of
//! progress notices.

use crate::audio_source::{content_type_for_path, AudioInput, AudioPayload, FALLBACK_CONTENT_TYPE};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::{FailureKind, NotewiseError};
use crate::pipeline::{NotesPipeline, NotesReport};
use crate::progress::{ChannelReporter, PipelineEvent, RecordingReporter};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::AbortHandle;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Shared application state.
struct AppState {
    pipeline: NotesPipeline,
}

/// Run the HTTP API server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    let credentials = match preflight::check(Operation::Serve, &settings, None) {
        Ok(credentials) => credentials,
        Err(e) => {
            Output::error(&format!("{}", e));
            Output::info("Run 'notewise doctor' for detailed diagnostics.");
            return Err(e.into());
        }
    };
    if let Err(e) = preflight::check_tool("yt-dlp") {
        Output::warning(&format!("{}. POST /notes/url will not work.", e));
    }

    let pipeline = NotesPipeline::from_settings(&settings, &credentials)?;
    let state = Arc::new(AppState { pipeline });
    let app = router(state, settings.audio.max_audio_bytes);

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    Output::header("Notewise API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Upload audio", "POST /notes");
    Output::kv("YouTube URL", "POST /notes/url");
    Output::kv("Upload (SSE)", "POST /notes/stream");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/notes", post(notes_upload))
        .route("/notes/url", post(notes_url))
        .route("/notes/stream", post(notes_stream))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct UploadParams {
    /// Display name of the uploaded file, used for logs and format hints
    name: Option<String>,
}

#[derive(Deserialize)]
struct UrlRequest {
    /// YouTube URL or video ID
    url: String,
}

#[derive(Serialize)]
struct NotesResponse {
    #[serde(flatten)]
    report: NotesReport,
    events: Vec<PipelineEvent>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl From<&NotewiseError> for ErrorResponse {
    fn from(e: &NotewiseError) -> Self {
        match e {
            NotewiseError::Transcription(t) => Self {
                error: e.to_string(),
                kind: Some(t.kind),
                detail: Some(t.detail.clone()),
            },
            _ => Self {
                error: e.to_string(),
                kind: None,
                detail: None,
            },
        }
    }
}

fn error_status(e: &NotewiseError) -> StatusCode {
    match e {
        NotewiseError::Transcription(_) => StatusCode::BAD_GATEWAY,
        NotewiseError::SourceUnavailable(_) | NotewiseError::ToolNotFound(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        NotewiseError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(e: &NotewiseError) -> Response {
    (error_status(e), Json(ErrorResponse::from(e))).into_response()
}

/// Build a payload from a raw upload.
///
/// A missing or generic content type falls back to the file name's
/// extension, then to [`FALLBACK_CONTENT_TYPE`].
fn upload_payload(
    headers: &HeaderMap,
    name: Option<String>,
    body: Bytes,
) -> Result<AudioPayload, NotewiseError> {
    let declared = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or_default().trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty() && v != "application/octet-stream");

    let content_type = match declared {
        Some(declared) if declared.starts_with("audio/") || declared.starts_with("video/") => {
            declared
        }
        Some(declared) => {
            return Err(NotewiseError::InvalidInput(format!(
                "Unsupported content type: {}",
                declared
            )))
        }
        None => name
            .as_deref()
            .and_then(|n| content_type_for_path(Path::new(n)))
            .unwrap_or(FALLBACK_CONTENT_TYPE)
            .to_string(),
    };

    Ok(AudioPayload::new(body.to_vec(), content_type, name))
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn run_request(state: &AppState, input: AudioInput) -> Response {
    let progress = RecordingReporter::new();
    match state.pipeline.run(input, &progress).await {
        Ok(run) => Json(NotesResponse {
            report: run.report(),
            events: progress.events(),
        })
        .into_response(),
        Err(e) => {
            warn!("Request failed: {}", e);
            error_response(&e)
        }
    }
}

async fn notes_upload(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UploadParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match upload_payload(&headers, params.name, body) {
        Ok(payload) => run_request(&state, AudioInput::Upload(payload)).await,
        Err(e) => error_response(&e),
    }
}

async fn notes_url(State(state): State<Arc<AppState>>, Json(req): Json<UrlRequest>) -> Response {
    // Never treat request input as a server-side path.
    run_request(&state, AudioInput::Remote(req.url.trim().to_string())).await
}

/// Aborts the pipeline task when the event stream is dropped.
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

enum StreamState {
    Progress {
        events: mpsc::UnboundedReceiver<PipelineEvent>,
        done: oneshot::Receiver<Result<NotesReport, NotewiseError>>,
        _task: AbortOnDrop,
    },
    Finished,
}

fn json_event<T: Serialize>(name: &str, value: &T) -> Event {
    Event::default()
        .event(name)
        .json_data(value)
        .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()))
}

async fn notes_stream(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UploadParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let payload = match upload_payload(&headers, params.name, body) {
        Ok(payload) => payload,
        Err(e) => return error_response(&e),
    };

    let (tx, events) = mpsc::unbounded_channel();
    let (done_tx, done) = oneshot::channel();

    let task = tokio::spawn(async move {
        let reporter = ChannelReporter::new(tx);
        let result = state
            .pipeline
            .run(AudioInput::Upload(payload), &reporter)
            .await;
        // Close the progress channel before the final message.
        drop(reporter);
        let _ = done_tx.send(result.map(|run| run.report()));
    });

    let initial = StreamState::Progress {
        events,
        done,
        _task: AbortOnDrop(task.abort_handle()),
    };

    let stream = futures::stream::unfold(initial, |state| async move {
        match state {
            StreamState::Progress {
                mut events,
                done,
                _task,
            } => match events.recv().await {
                Some(event) => Some((
                    Ok::<_, Infallible>(json_event("progress", &event)),
                    StreamState::Progress {
                        events,
                        done,
                        _task,
                    },
                )),
                None => {
                    let event = match done.await {
                        Ok(Ok(report)) => json_event("result", &report),
                        Ok(Err(e)) => json_event("error", &ErrorResponse::from(&e)),
                        Err(_) => Event::default()
                            .event("error")
                            .data("pipeline task ended unexpectedly"),
                    };
                    Some((Ok(event), StreamState::Finished))
                }
            },
            StreamState::Finished => None,
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_source::{AudioResolver, AudioSource};
    use crate::config::{NotesSettings, Prompts};
    use crate::notes::NotesGenerator;
    use crate::testing::{ScriptedSummarizer, ScriptedTranscriber};
    use crate::transcription::{RetryPolicy, TranscriptionClient};
    use async_trait::async_trait;
    use std::time::Duration;

    struct FixedRemote;

    #[async_trait]
    impl AudioSource for FixedRemote {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn can_handle(&self, locator: &str) -> bool {
            locator.starts_with("https://youtu.be/")
        }

        async fn fetch(&self, _locator: &str) -> crate::error::Result<AudioPayload> {
            Ok(AudioPayload::new(vec![1u8; 16], "audio/webm", Some("video.webm".into())))
        }
    }

    fn pipeline(
        transcriber: Arc<ScriptedTranscriber>,
        summarizer: Arc<ScriptedSummarizer>,
    ) -> NotesPipeline {
        NotesPipeline::with_components(
            AudioResolver::with_remote(Box::new(FixedRemote), 1024),
            TranscriptionClient::new(
                transcriber,
                RetryPolicy {
                    default_wait: Duration::from_millis(10),
                    max_wait: Duration::from_secs(1),
                },
            ),
            NotesGenerator::new(summarizer, Prompts::default(), &NotesSettings::default()),
        )
    }

    fn hello_pipeline() -> NotesPipeline {
        pipeline(
            Arc::new(ScriptedTranscriber::new(vec![ScriptedTranscriber::text("hello world")])),
            Arc::new(ScriptedSummarizer::replying("## Summary\n- hello")),
        )
    }

    async fn spawn(pipeline: NotesPipeline) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(Arc::new(AppState { pipeline }), 1024);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn upload(base: &str, path: &str, content_type: &str) -> reqwest::RequestBuilder {
        reqwest::Client::new()
            .post(format!("{}{}", base, path))
            .header("content-type", content_type)
            .body(vec![7u8; 10])
    }

    #[test]
    fn test_upload_content_type_resolution() {
        let mut headers = HeaderMap::new();
        let payload = upload_payload(&headers, Some("talk.flac".into()), Bytes::from_static(b"x")).unwrap();
        assert_eq!(payload.content_type(), "audio/flac");

        headers.insert(CONTENT_TYPE, "application/octet-stream".parse().unwrap());
        let payload = upload_payload(&headers, None, Bytes::from_static(b"x")).unwrap();
        assert_eq!(payload.content_type(), FALLBACK_CONTENT_TYPE);

        headers.insert(CONTENT_TYPE, "audio/wav; rate=16000".parse().unwrap());
        let payload = upload_payload(&headers, None, Bytes::from_static(b"x")).unwrap();
        assert_eq!(payload.content_type(), "audio/wav");

        headers.insert(CONTENT_TYPE, "application/json".parse().unwrap());
        let err = upload_payload(&headers, None, Bytes::from_static(b"{}")).unwrap_err();
        assert!(matches!(err, NotewiseError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_health() {
        let base = spawn(hello_pipeline()).await;
        let body: serde_json::Value = reqwest::get(format!("{}/health", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_upload_returns_transcript_and_notes() {
        let base = spawn(hello_pipeline()).await;
        let response = upload(&base, "/notes?name=hello.wav", "audio/wav")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["source"], "hello.wav");
        assert_eq!(body["transcript"], "hello world");
        assert_eq!(body["empty_transcript"], false);
        assert_eq!(body["notes"]["content"], "## Summary\n- hello");
        assert!(body["notes_error"].is_null());
        let events: Vec<&str> = body["events"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|e| e["event"].as_str())
            .collect();
        assert_eq!(events.first(), Some(&"fetching_audio"));
        assert!(events.contains(&"audio_ready"));
        assert_eq!(events.last(), Some(&"notes_ready"));
    }

    #[tokio::test]
    async fn test_transcription_failure_is_bad_gateway() {
        let base = spawn(pipeline(
            Arc::new(ScriptedTranscriber::new(vec![
                ScriptedTranscriber::loading(None),
                ScriptedTranscriber::loading(None),
            ])),
            Arc::new(ScriptedSummarizer::replying("unused")),
        ))
        .await;

        let response = upload(&base, "/notes", "audio/mpeg").send().await.unwrap();
        assert_eq!(response.status(), 502);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["kind"], "backend_error");
        assert!(body["detail"].as_str().unwrap().contains("still loading"));
    }

    #[tokio::test]
    async fn test_summarization_failure_still_returns_transcript() {
        let base = spawn(pipeline(
            Arc::new(ScriptedTranscriber::new(vec![ScriptedTranscriber::text("hello world")])),
            Arc::new(ScriptedSummarizer::failing("quota exceeded")),
        ))
        .await;

        let response = upload(&base, "/notes", "audio/wav").send().await.unwrap();
        assert_eq!(response.status(), 200);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["transcript"], "hello world");
        assert!(body["notes"].is_null());
        assert_eq!(body["notes_error"], "quota exceeded");
    }

    #[tokio::test]
    async fn test_non_audio_upload_is_bad_request() {
        let base = spawn(hello_pipeline()).await;
        let response = upload(&base, "/notes", "text/plain").send().await.unwrap();
        assert_eq!(response.status(), 400);
    }

    #[tokio::test]
    async fn test_url_endpoint() {
        let base = spawn(hello_pipeline()).await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{}/notes/url", base))
            .json(&serde_json::json!({"url": "https://youtu.be/dQw4w9WgXcQ"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["source"], "video.webm");

        let response = client
            .post(format!("{}/notes/url", base))
            .json(&serde_json::json!({"url": "/etc/passwd"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
    }

    #[tokio::test]
    async fn test_stream_emits_progress_then_result() {
        let base = spawn(pipeline(
            Arc::new(ScriptedTranscriber::new(vec![
                ScriptedTranscriber::loading(Some(Duration::from_millis(20))),
                ScriptedTranscriber::text("hello world"),
            ])),
            Arc::new(ScriptedSummarizer::replying("notes")),
        ))
        .await;

        let text = upload(&base, "/notes/stream", "audio/wav")
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap()
            .replace("event: ", "event:");

        assert!(text.contains("event:progress"));
        assert!(text.contains("\"event\":\"model_loading\""));
        let result_at = text.find("event:result").unwrap();
        assert!(text[result_at..].contains("hello world"));
        assert!(!text.contains("event:error"));
    }
}
