//! Integration tests for the download module.
//!
//! These tests drive a full transfer against a mock HTTP server: response
//! metadata and body come in through reqwest, notifications go out through a
//! real dispatcher, and the filesystem outcome is checked on disk.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fetcher_core::{
    ChannelDispatcher, DownloadController, InlineDispatcher, TransferError, TransferObserver,
    spawn_from_response,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ==================== Helper Functions ====================

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[derive(Debug)]
enum Event {
    Length(Option<u64>),
    Progress(f32),
    Result(Result<PathBuf, TransferError>),
}

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<Event>>,
}

impl RecordingObserver {
    fn has_result(&self) -> bool {
        self.events
            .lock()
            .unwrap()
            .iter()
            .any(|event| matches!(event, Event::Result(_)))
    }

    fn fractions(&self) -> Vec<f32> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                Event::Progress(fraction) => Some(*fraction),
                _ => None,
            })
            .collect()
    }
}

impl TransferObserver for RecordingObserver {
    fn on_length(&self, declared_length: Option<u64>) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Length(declared_length));
    }

    fn on_progress(&self, fraction: f32) {
        self.events.lock().unwrap().push(Event::Progress(fraction));
    }

    fn on_result(&self, result: Result<PathBuf, TransferError>) {
        self.events.lock().unwrap().push(Event::Result(result));
    }
}

/// Waits until the observer has received its terminal notification.
///
/// Needed with [`ChannelDispatcher`]: the worker task finishes before the
/// consumer task has necessarily drained the posted notifications.
async fn wait_for_result(observer: &RecordingObserver) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !observer.has_result() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for result delivery"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Mounts a GET mock serving `body` at `route` and returns its URL.
async fn serve_body(server: &MockServer, route: &str, body: Vec<u8>) -> String {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
    format!("{}{route}", server.uri())
}

// ==================== Ungated Transfers ====================

#[tokio::test]
async fn test_http_download_commits_final_file() {
    init_tracing();
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let dest = temp_dir.path().join("dl");
    let body = vec![0x42u8; 10240];
    let url = serve_body(&mock_server, "/a.bin", body.clone()).await;

    let controller = Arc::new(DownloadController::new());
    let observer = Arc::new(RecordingObserver::default());
    let response = reqwest::get(&url).await.unwrap();
    assert_eq!(response.content_length(), Some(10240));

    let handle = spawn_from_response(
        response,
        &dest,
        "a.bin",
        Arc::clone(&controller),
        Arc::clone(&observer) as _,
        Arc::new(ChannelDispatcher::spawn()),
    );
    handle.join().await;
    wait_for_result(&observer).await;

    let final_path = dest.join("a.bin");
    assert_eq!(std::fs::read(&final_path).unwrap(), body);
    assert!(!dest.join("a.bin.tmp").exists(), "temp file must be gone");

    let events = observer.events.lock().unwrap();
    assert!(
        matches!(events.first(), Some(Event::Length(Some(10240)))),
        "length must be announced first, got: {:?}",
        events.first()
    );
    assert!(matches!(events.last(), Some(Event::Result(Ok(p))) if *p == final_path));
}

#[tokio::test]
async fn test_progress_fractions_are_non_decreasing_and_end_at_one() {
    init_tracing();
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let url = serve_body(&mock_server, "/steady.bin", vec![7u8; 64 * 1024]).await;

    let controller = Arc::new(DownloadController::new());
    let observer = Arc::new(RecordingObserver::default());
    let response = reqwest::get(&url).await.unwrap();

    let handle = spawn_from_response(
        response,
        temp_dir.path(),
        "steady.bin",
        Arc::clone(&controller),
        Arc::clone(&observer) as _,
        Arc::new(ChannelDispatcher::spawn()),
    );
    handle.join().await;
    wait_for_result(&observer).await;

    let fractions = observer.fractions();
    assert!(!fractions.is_empty(), "expected at least one progress event");
    for pair in fractions.windows(2) {
        assert!(pair[0] <= pair[1], "fractions must be non-decreasing");
    }
    assert!((fractions.last().unwrap() - 1.0).abs() < f32::EPSILON);
}

#[tokio::test]
async fn test_ungated_transfer_needs_no_resume_or_cancel() {
    init_tracing();
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let url = serve_body(&mock_server, "/free.bin", b"no gate here".to_vec()).await;

    let controller = Arc::new(DownloadController::new());
    let observer = Arc::new(RecordingObserver::default());
    let response = reqwest::get(&url).await.unwrap();

    // No resume() or cancel() anywhere: streaming must begin on its own.
    let handle = spawn_from_response(
        response,
        temp_dir.path(),
        "free.bin",
        Arc::clone(&controller),
        Arc::clone(&observer) as _,
        Arc::new(InlineDispatcher),
    );
    handle.join().await;

    assert_eq!(
        std::fs::read(temp_dir.path().join("free.bin")).unwrap(),
        b"no gate here"
    );
}

#[tokio::test]
async fn test_existing_final_file_is_replaced_over_http() {
    init_tracing();
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("a.bin"), b"stale contents").unwrap();
    let url = serve_body(&mock_server, "/a.bin", b"fresh contents".to_vec()).await;

    let controller = Arc::new(DownloadController::new());
    let observer = Arc::new(RecordingObserver::default());
    let response = reqwest::get(&url).await.unwrap();

    let handle = spawn_from_response(
        response,
        temp_dir.path(),
        "a.bin",
        Arc::clone(&controller),
        Arc::clone(&observer) as _,
        Arc::new(InlineDispatcher),
    );
    handle.join().await;

    assert_eq!(
        std::fs::read(temp_dir.path().join("a.bin")).unwrap(),
        b"fresh contents"
    );
}

// ==================== Gated Transfers ====================

#[tokio::test]
async fn test_gated_transfer_parks_until_resume() {
    init_tracing();
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let dest = temp_dir.path().join("dl");
    let url = serve_body(&mock_server, "/held.bin", vec![1u8; 4096]).await;

    let controller = Arc::new(DownloadController::new());
    controller.set_hold(true);
    let observer = Arc::new(RecordingObserver::default());
    let response = reqwest::get(&url).await.unwrap();

    let handle = spawn_from_response(
        response,
        &dest,
        "held.bin",
        Arc::clone(&controller),
        Arc::clone(&observer) as _,
        Arc::new(ChannelDispatcher::spawn()),
    );

    // While parked: the length has been announced but nothing is on disk.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!dest.exists(), "no byte may be written before resume()");
    assert!(!observer.has_result());

    handle.resume();
    handle.join().await;
    wait_for_result(&observer).await;

    assert_eq!(std::fs::metadata(dest.join("held.bin")).unwrap().len(), 4096);
}

#[tokio::test]
async fn test_gated_cancel_reports_user_cancelled_and_leaves_no_files() {
    init_tracing();
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let dest = temp_dir.path().join("dl");
    let url = serve_body(&mock_server, "/doomed.bin", vec![1u8; 4096]).await;

    let controller = Arc::new(DownloadController::new());
    controller.set_hold(true);
    let observer = Arc::new(RecordingObserver::default());
    let response = reqwest::get(&url).await.unwrap();

    let handle = spawn_from_response(
        response,
        &dest,
        "doomed.bin",
        Arc::clone(&controller),
        Arc::clone(&observer) as _,
        Arc::new(ChannelDispatcher::spawn()),
    );

    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.cancel();
    handle.join().await;
    wait_for_result(&observer).await;

    assert!(!dest.exists(), "cancelled transfer must leave no files");
    let events = observer.events.lock().unwrap();
    assert!(matches!(
        events.last(),
        Some(Event::Result(Err(TransferError::Cancelled)))
    ));
}

#[tokio::test]
async fn test_cancel_armed_before_spawn_wins_over_resume() {
    init_tracing();
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let dest = temp_dir.path().join("dl");
    let url = serve_body(&mock_server, "/raced.bin", vec![1u8; 4096]).await;

    let controller = Arc::new(DownloadController::new());
    controller.set_hold(true);
    // Arm-before-wait: both calls land before the worker exists.
    controller.cancel();
    controller.resume();
    let observer = Arc::new(RecordingObserver::default());
    let response = reqwest::get(&url).await.unwrap();

    let handle = spawn_from_response(
        response,
        &dest,
        "raced.bin",
        Arc::clone(&controller),
        Arc::clone(&observer) as _,
        Arc::new(InlineDispatcher),
    );
    handle.join().await;

    assert!(!dest.exists());
    let events = observer.events.lock().unwrap();
    assert!(matches!(
        events.last(),
        Some(Event::Result(Err(TransferError::Cancelled)))
    ));
}
