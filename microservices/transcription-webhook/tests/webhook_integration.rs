//! Integration tests for the transcription webhook
//!
//! Drives the router with `oneshot`, runs the background pipeline against
//! an in-memory task tool, and plays CloudTalk with a throwaway axum server.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use callbridge_core::{CallId, CallbridgeError, RetryPolicy, ServiceConfig};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use transcription_webhook::cloudtalk::{CallProvider, CallRecord, CloudTalkClient, Recording};
use transcription_webhook::config::{BridgeConfig, ClickUpConfig, CloudTalkConfig, SpeechToTextConfig};
use transcription_webhook::reconciler::ReconcileOutcome;
use transcription_webhook::stt::{SpeechToText, WhisperClient};
use transcription_webhook::tasks::{CustomField, NewTask, Task, TaskTool, TaskToolConnector, TaskToolError};
use transcription_webhook::transcript::Provenance;
use transcription_webhook::{create_router, AppState, Pipeline};

// ============================================
// Test doubles
// ============================================

/// CloudTalk stand-in that counts every call made to it
#[derive(Default)]
struct CountingProvider {
    configured: bool,
    find_call_delay: Duration,
    calls: AtomicU32,
}

#[async_trait]
impl CallProvider for CountingProvider {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn find_call(&self, _call_id: &CallId) -> callbridge_core::Result<Option<CallRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.find_call_delay).await;
        Ok(None)
    }

    async fn lookup_call_uuid(&self, _call_id: &CallId) -> callbridge_core::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CallbridgeError::NotFound("no uuid".into()))
    }

    async fn fetch_transcription(&self, _id: &str) -> callbridge_core::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CallbridgeError::NotFound("not ready".into()))
    }

    async fn download_recording(&self, _call_id: &CallId, _link: Option<&str>) -> callbridge_core::Result<Recording> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CallbridgeError::NotFound("no recording".into()))
    }
}

#[derive(Default)]
struct Board {
    tasks: Vec<Task>,
    sessions: AtomicU32,
    created: Mutex<Vec<NewTask>>,
    field_writes: Mutex<Vec<(String, String)>>,
}

struct BoardTool(Arc<Board>);

#[async_trait]
impl TaskTool for BoardTool {
    async fn list_tasks(&self, _list_id: &str) -> Result<Vec<Task>, TaskToolError> {
        Ok(self.0.tasks.clone())
    }

    async fn create_task(&self, task: &NewTask) -> Result<String, TaskToolError> {
        self.0.created.lock().push(task.clone());
        Ok("task-new".into())
    }

    fn supports_field_updates(&self) -> bool {
        true
    }

    async fn set_custom_field(&self, task_id: &str, field_id: &str, _value: &str) -> Result<(), TaskToolError> {
        self.0
            .field_writes
            .lock()
            .push((task_id.to_string(), field_id.to_string()));
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), TaskToolError> {
        Ok(())
    }
}

struct BoardConnector(Arc<Board>);

#[async_trait]
impl TaskToolConnector for BoardConnector {
    async fn connect(&self) -> Result<Box<dyn TaskTool>, TaskToolError> {
        self.0.sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(BoardTool(Arc::clone(&self.0))))
    }
}

// ============================================
// Helpers
// ============================================

fn bridge_config(scratch: &Path, base_url: &str, credentials: bool) -> BridgeConfig {
    BridgeConfig {
        service: ServiceConfig {
            service_name: "transcription-webhook".into(),
            host: "127.0.0.1".into(),
            http_port: 0,
            scratch_dir: scratch.to_path_buf(),
            http_timeout_secs: 5,
        },
        cloudtalk: CloudTalkConfig {
            api_key: credentials.then(|| "key".to_string()),
            api_secret: credentials.then(|| "secret".to_string()),
            base_url: base_url.to_string(),
            analytics_url: base_url.to_string(),
        },
        speech: SpeechToTextConfig {
            api_key: None,
            base_url: "http://127.0.0.1:9".into(),
            model: "whisper-1".into(),
        },
        clickup: ClickUpConfig {
            api_key: Some("pk_test".into()),
            list_id: Some("list-1".into()),
            mcp_command: "node".into(),
            mcp_args: vec![],
            default_status: "lead necontactat".into(),
            phone_field_id: None,
            tool_timeout: Duration::from_secs(5),
        },
        transcript_retry: RetryPolicy::constant(3, Duration::from_millis(5)),
    }
}

fn pipeline(scratch: &Path, provider: Arc<CountingProvider>, board: Arc<Board>) -> Arc<Pipeline> {
    let config = bridge_config(scratch, "http://127.0.0.1:9", provider.configured);
    Arc::new(Pipeline::new(&config, provider, None, Arc::new(BoardConnector(board))))
}

fn phone_task(id: &str, phone: &str) -> Task {
    let field = |id: &str, name: &str, value: Option<Value>| CustomField {
        id: id.into(),
        name: name.into(),
        value,
    };
    Task {
        id: id.into(),
        name: "Existing".into(),
        custom_fields: vec![
            field("f-phone", "Phone Number", Some(json!(phone))),
            field("f-transcript", "Transcript", None),
            field("f-proposal", "Proposal", None),
        ],
    }
}

async fn post_webhook(app: &Router, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/cloudtalk/transcription")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// ============================================
// Receiver
// ============================================

#[tokio::test]
async fn test_missing_phone_is_rejected_without_downstream_work() {
    let scratch = tempfile::tempdir().unwrap();
    let board = Arc::new(Board::default());
    let pipeline = pipeline(scratch.path(), Arc::new(CountingProvider::default()), board.clone());
    let app = create_router(AppState::new(pipeline.clone()));

    let (status, body) = post_webhook(&app, json!({"call_id": "5", "transcription": "hi"})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Missing phone number"}));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(board.sessions.load(Ordering::SeqCst), 0);
    assert_eq!(pipeline.metrics().value("webhooks_rejected"), Some(1.0));
}

#[tokio::test]
async fn test_too_short_phone_is_rejected() {
    let scratch = tempfile::tempdir().unwrap();
    let board = Arc::new(Board::default());
    let pipeline = pipeline(scratch.path(), Arc::new(CountingProvider::default()), board.clone());
    let app = create_router(AppState::new(pipeline));

    let (status, body) = post_webhook(&app, json!({"call_id": "5", "external_number": "12"})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Missing phone number"}));
}

#[tokio::test]
async fn test_valid_phone_is_acknowledged_without_provider_lookup() {
    let scratch = tempfile::tempdir().unwrap();
    let provider = Arc::new(CountingProvider {
        configured: true,
        find_call_delay: Duration::from_secs(2),
        ..Default::default()
    });
    let pipeline = pipeline(scratch.path(), provider.clone(), Arc::new(Board::default()));

    // No transcript and no recording link: the lookup belongs to the background run.
    let event = tokio::time::timeout(
        Duration::from_millis(500),
        pipeline.accept(json!({"call_id": "5", "external_number": "+40766695835"})),
    )
    .await
    .expect("accept waited on the provider")
    .unwrap();

    assert_eq!(event.phone_number.as_deref(), Some("+40766695835"));
    assert!(!event.details_fetched);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_background_run_fetches_call_details() {
    let scratch = tempfile::tempdir().unwrap();
    let provider = Arc::new(CountingProvider {
        configured: true,
        ..Default::default()
    });
    let pipeline = pipeline(scratch.path(), provider.clone(), Arc::new(Board::default()));

    let event = pipeline
        .accept(json!({"call_id": "5", "external_number": "+40766695835"}))
        .await
        .unwrap();
    let report = pipeline.process(uuid::Uuid::new_v4(), event).await;

    // find_call, then uuid lookup and three transcription polls
    assert_eq!(report.provenance, Provenance::Unavailable);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn test_non_object_body_is_rejected() {
    let scratch = tempfile::tempdir().unwrap();
    let pipeline = pipeline(scratch.path(), Arc::new(CountingProvider::default()), Arc::new(Board::default()));
    let app = create_router(AppState::new(pipeline));

    let (status, body) = post_webhook(&app, json!(["not", "an", "object"])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid payload"));
}

#[tokio::test]
async fn test_accepted_webhook_runs_in_background() {
    let scratch = tempfile::tempdir().unwrap();
    let board = Arc::new(Board::default());
    let pipeline = pipeline(scratch.path(), Arc::new(CountingProvider::default()), board.clone());
    let app = create_router(AppState::new(pipeline));

    let (status, body) = post_webhook(
        &app,
        json!({"call_id": 123, "external_number": "0040766695835", "transcription": "hello"}),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["success"], true);
    assert_eq!(body["callId"], "123");
    assert_eq!(body["phoneNumber"], "0040766695835");

    // The background run files the call as a new task.
    tokio::time::timeout(Duration::from_secs(5), async {
        while board.created.lock().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(board.created.lock()[0].name, "New Caller");
    assert!(scratch.path().join("webhook_logs").is_dir());
}

#[tokio::test]
async fn test_health_and_stats() {
    let scratch = tempfile::tempdir().unwrap();
    let pipeline = pipeline(scratch.path(), Arc::new(CountingProvider::default()), Arc::new(Board::default()));
    let app = create_router(AppState::new(pipeline));

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let health: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(health["status"], "ok");

    let response = app
        .oneshot(Request::builder().uri("/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let stats: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(stats["metrics"].as_array().unwrap().iter().any(|m| m["name"] == "webhooks_received"));
}

// ============================================
// Pipeline scenarios
// ============================================

#[tokio::test]
async fn test_inline_transcript_makes_no_provider_calls() {
    let scratch = tempfile::tempdir().unwrap();
    let provider = Arc::new(CountingProvider {
        configured: true,
        ..Default::default()
    });
    let board = Arc::new(Board::default());
    let pipeline = pipeline(scratch.path(), provider.clone(), board.clone());

    let event = pipeline
        .accept(json!({"call_id": "123", "external_number": "0040766695835", "transcription": "hello"}))
        .await
        .unwrap();
    let report = pipeline.process(uuid::Uuid::new_v4(), event).await;

    assert_eq!(report.provenance, Provenance::Inline);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);

    let snapshot: Value = serde_json::from_slice(
        &std::fs::read(scratch.path().join("transcripts/transcript_123.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(snapshot["transcript"], "hello");
    assert_eq!(snapshot["client"], "Unknown");
    assert!(scratch.path().join("proposals/proposal_123.md").is_file());
}

#[tokio::test]
async fn test_placeholder_keeps_recording_link() {
    let scratch = tempfile::tempdir().unwrap();
    let provider = Arc::new(CountingProvider::default());
    let pipeline = pipeline(scratch.path(), provider.clone(), Arc::new(Board::default()));

    let event = pipeline
        .accept(json!({
            "call_id": "77",
            "external_number": "+40711000000",
            "transcription": "",
            "recording_link": "https://cdn.example/77.mp3"
        }))
        .await
        .unwrap();
    let report = pipeline.process(uuid::Uuid::new_v4(), event).await;

    assert_eq!(report.provenance, Provenance::Unavailable);
    let proposal = std::fs::read_to_string(scratch.path().join("proposals/proposal_77.md")).unwrap();
    assert!(proposal.contains("[Transcript not available, backup link: https://cdn.example/77.mp3]"));
}

#[tokio::test]
async fn test_matching_task_is_updated_not_duplicated() {
    let scratch = tempfile::tempdir().unwrap();
    let board = Arc::new(Board {
        tasks: vec![phone_task("other", "+1 555 0100"), phone_task("t-ana", "0040766695835")],
        ..Default::default()
    });
    let pipeline = pipeline(scratch.path(), Arc::new(CountingProvider::default()), board.clone());

    let event = pipeline
        .accept(json!({"call_id": "9", "external_number": "+40766695835", "transcription": "quote please"}))
        .await
        .unwrap();
    let report = pipeline.process(uuid::Uuid::new_v4(), event).await;

    assert!(report.succeeded());
    assert!(matches!(report.outcome, Some(ReconcileOutcome::Updated { ref task_id, .. }) if task_id == "t-ana"));
    assert!(board.created.lock().is_empty());
    assert_eq!(
        *board.field_writes.lock(),
        vec![
            ("t-ana".to_string(), "f-transcript".to_string()),
            ("t-ana".to_string(), "f-proposal".to_string()),
        ]
    );

    let results: Vec<_> = std::fs::read_dir(scratch.path().join("webhook_logs"))
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with("result_9_"))
        .collect();
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn test_unknown_caller_creates_named_task() {
    let scratch = tempfile::tempdir().unwrap();
    let board = Arc::new(Board {
        tasks: vec![phone_task("other", "+1 555 0100")],
        ..Default::default()
    });
    let pipeline = pipeline(scratch.path(), Arc::new(CountingProvider::default()), board.clone());

    let event = pipeline
        .accept(json!({
            "call_id": "10",
            "external_number": "+40766695835",
            "transcription": "hi",
            "contact": {"name": "Ana Pop"}
        }))
        .await
        .unwrap();
    let report = pipeline.process(uuid::Uuid::new_v4(), event).await;

    assert!(matches!(report.outcome, Some(ReconcileOutcome::Created { ref name, .. }) if name == "Ana Pop"));
    let created = board.created.lock();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].status, "lead necontactat");
    assert!(board.field_writes.lock().is_empty());
}

#[tokio::test]
async fn test_missing_list_id_starts_no_tool_session() {
    let scratch = tempfile::tempdir().unwrap();
    let board = Arc::new(Board::default());
    let mut config = bridge_config(scratch.path(), "http://127.0.0.1:9", false);
    config.clickup.list_id = None;
    let pipeline = Pipeline::new(
        &config,
        Arc::new(CountingProvider::default()),
        None,
        Arc::new(BoardConnector(board.clone())),
    );

    let event = pipeline
        .accept(json!({"call_id": "11", "external_number": "+40766695835", "transcription": "hi"}))
        .await
        .unwrap();
    let report = pipeline.process(uuid::Uuid::new_v4(), event).await;

    assert!(!report.succeeded());
    assert!(report.error.unwrap().contains("CLICKUP_LIST_ID"));
    assert_eq!(board.sessions.load(Ordering::SeqCst), 0);
}

// ============================================
// CloudTalk client against a fake API
// ============================================

#[derive(Default)]
struct FakeCloudTalk {
    transcription_polls: AtomicU32,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers.contains_key(header::AUTHORIZATION)
}

async fn spawn_fake_cloudtalk() -> (String, Arc<FakeCloudTalk>) {
    let state = Arc::new(FakeCloudTalk::default());
    let polls = state.clone();

    let app = Router::new()
        .route(
            "/calls/index.json",
            get(|| async {
                axum::Json(json!({"responseData": {"data": [{
                    "Contact": {"name": "Ana", "contact_numbers": ["0040766695835"]},
                    "Cdr": {"recording_link": "https://cdn/1.mp3", "uuid": "u-1"}
                }]}}))
            }),
        )
        .route(
            "/conversation-intelligence/transcription/u-1.json",
            get(move || {
                let polls = polls.clone();
                async move {
                    let attempt = polls.transcription_polls.fetch_add(1, Ordering::SeqCst) + 1;
                    if attempt < 3 {
                        (StatusCode::NOT_FOUND, axum::Json(json!({"error": "not ready"})))
                    } else {
                        (StatusCode::OK, axum::Json(json!({"text": "Agent: ready"})))
                    }
                }
            }),
        )
        .route(
            "/conversation-intelligence/transcription/denied.json",
            get(|| async { (StatusCode::FORBIDDEN, "forbidden") }),
        )
        .route(
            "/private/1.mp3",
            get(|headers: HeaderMap| async move {
                if authorized(&headers) {
                    ([(header::CONTENT_TYPE, "audio/mpeg")], Bytes::from_static(b"ID3audio")).into_response()
                } else {
                    ([(header::CONTENT_TYPE, "text/html")], "login page").into_response()
                }
            }),
        )
        .route(
            "/calls/7",
            get(|| async { axum::Json(json!({"uuid": "", "call_uuid": "real-uuid"})) }),
        )
        .route(
            "/calls/42/recording.mp3",
            get(|| async { (StatusCode::NOT_FOUND, "missing") }),
        )
        .route(
            "/calls/42/recording",
            get(|| async { ([(header::CONTENT_TYPE, "application/octet-stream")], Bytes::from_static(b"raw")) }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), state)
}

fn cloudtalk_client(base_url: &str, credentials: bool) -> CloudTalkClient {
    let scratch = std::env::temp_dir();
    let config = bridge_config(&scratch, base_url, credentials);
    CloudTalkClient::new(reqwest::Client::new(), &config.cloudtalk)
}

#[tokio::test]
async fn test_call_details_are_parsed() {
    let (base_url, _) = spawn_fake_cloudtalk().await;
    let client = cloudtalk_client(&base_url, true);

    let record = client.find_call(&CallId::new("1")).await.unwrap().unwrap();
    assert_eq!(record.phone_number.as_deref(), Some("0040766695835"));
    assert_eq!(record.caller_name.as_deref(), Some("Ana"));
    assert_eq!(record.call_uuid.as_deref(), Some("u-1"));
}

#[tokio::test]
async fn test_call_uuid_lookup_passes_over_blank_uuid() {
    let (base_url, _) = spawn_fake_cloudtalk().await;
    let client = cloudtalk_client(&base_url, true);

    let uuid = client.lookup_call_uuid(&CallId::new("7")).await.unwrap();
    assert_eq!(uuid, "real-uuid");
}

#[tokio::test]
async fn test_enrichment_recovers_phone_before_ack() {
    let (base_url, _) = spawn_fake_cloudtalk().await;
    let scratch = tempfile::tempdir().unwrap();
    let config = bridge_config(scratch.path(), &base_url, true);
    let provider = Arc::new(CloudTalkClient::new(reqwest::Client::new(), &config.cloudtalk));
    let board = Arc::new(Board::default());
    let pipeline = Arc::new(Pipeline::new(&config, provider, None, Arc::new(BoardConnector(board.clone()))));
    let app = create_router(AppState::new(pipeline));

    let (status, body) = post_webhook(&app, json!({"call_id": "1"})).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["callId"], "1");
    assert_eq!(body["phoneNumber"], "0040766695835");

    tokio::time::timeout(Duration::from_secs(5), async {
        while board.created.lock().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(board.created.lock()[0].name, "Ana");
}

#[tokio::test]
async fn test_transcription_polling_retries_until_ready() {
    let (base_url, fake) = spawn_fake_cloudtalk().await;
    let provider = Arc::new(cloudtalk_client(&base_url, true));
    let resolver = transcription_webhook::transcript::TranscriptResolver::new(
        provider,
        None,
        RetryPolicy::constant(5, Duration::from_millis(5)),
    );

    let event = transcription_webhook::event::CallEvent::from_payload(json!({
        "call_id": "1",
        "call_uuid": "u-1",
        "external_number": "+40766695835"
    }))
    .unwrap();
    let resolved = resolver.resolve(&event).await;

    assert_eq!(resolved.provenance, Provenance::ProviderApi);
    assert_eq!(resolved.text, "Agent: ready");
    assert_eq!(fake.transcription_polls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_forbidden_transcription_is_not_retried() {
    let (base_url, _) = spawn_fake_cloudtalk().await;
    let client = cloudtalk_client(&base_url, true);

    let err = client.fetch_transcription("denied").await.unwrap_err();
    assert!(matches!(err, CallbridgeError::Upstream { status: 403, .. }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_recording_candidates_fall_through_to_audio() {
    let (base_url, _) = spawn_fake_cloudtalk().await;
    let client = cloudtalk_client(&base_url, true);
    let link = format!("{}/private/1.mp3", base_url);

    let recording = client.download_recording(&CallId::new("42"), Some(&link)).await.unwrap();
    assert_eq!(recording.source, link);
    assert_eq!(recording.content_type, "audio/mpeg");
    assert_eq!(&recording.bytes[..], b"ID3audio");

    // Without the link the API routes are tried in order.
    let recording = client.download_recording(&CallId::new("42"), None).await.unwrap();
    assert_eq!(recording.source, format!("{}/calls/42/recording", base_url));
    assert_eq!(recording.content_type, "application/octet-stream");
}

#[tokio::test]
async fn test_recording_without_credentials_only_tries_link() {
    let (base_url, _) = spawn_fake_cloudtalk().await;
    let client = cloudtalk_client(&base_url, false);
    let link = format!("{}/private/1.mp3", base_url);

    let err = client.download_recording(&CallId::new("42"), Some(&link)).await.unwrap_err();
    assert!(matches!(err, CallbridgeError::Protocol(_)));
}

// ============================================
// Speech-to-text against a fake API
// ============================================

#[derive(Default)]
struct CapturedUpload {
    headers: Mutex<Option<HeaderMap>>,
    body: Mutex<Bytes>,
}

async fn spawn_fake_whisper(reply: Value) -> (String, Arc<CapturedUpload>) {
    let captured = Arc::new(CapturedUpload::default());
    let sink = captured.clone();

    let app = Router::new().route(
        "/audio/transcriptions",
        axum::routing::post(move |headers: HeaderMap, body: Bytes| {
            let sink = sink.clone();
            let reply = reply.clone();
            async move {
                *sink.headers.lock() = Some(headers);
                *sink.body.lock() = body;
                axum::Json(reply)
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), captured)
}

fn whisper_client(base_url: &str) -> WhisperClient {
    let config = SpeechToTextConfig {
        api_key: Some("sk-test".into()),
        base_url: base_url.to_string(),
        model: "whisper-1".into(),
    };
    WhisperClient::from_config(reqwest::Client::new(), &config).unwrap()
}

fn mp3_recording() -> Recording {
    Recording {
        bytes: Bytes::from_static(b"ID3audio"),
        content_type: "audio/mpeg".into(),
        source: "https://cdn/1.mp3".into(),
    }
}

#[tokio::test]
async fn test_whisper_upload_is_multipart_with_bearer_auth() {
    let (base_url, captured) = spawn_fake_whisper(json!({"text": " hello "})).await;

    let text = whisper_client(&base_url).transcribe(&mp3_recording()).await.unwrap();
    assert_eq!(text, "hello");

    let headers = captured.headers.lock().clone().unwrap();
    assert_eq!(headers[header::AUTHORIZATION], "Bearer sk-test");
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("multipart/form-data; boundary="));

    let body = String::from_utf8_lossy(&captured.body.lock()).into_owned();
    assert!(body.contains("name=\"model\""));
    assert!(body.contains("whisper-1"));
    assert!(body.contains("name=\"response_format\""));
    assert!(body.contains("json"));
    assert!(body.contains("filename=\"recording.mp3\""));
    assert!(body.contains("ID3audio"));
}

#[tokio::test]
async fn test_whisper_blank_text_is_an_error() {
    let (base_url, _) = spawn_fake_whisper(json!({"text": "   "})).await;

    let err = whisper_client(&base_url).transcribe(&mp3_recording()).await.unwrap_err();
    assert!(matches!(err, CallbridgeError::NotFound(_)));
}
