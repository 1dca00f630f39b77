use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use triage_engine::{
    BackendErrorKind, BackendSettings, IngestError, IngestEvent, IngestSettings, IngestSink,
    IngestionTracker, ProgressReport, ReqwestBackend,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct TestSink {
    events: Mutex<Vec<IngestEvent>>,
}

impl TestSink {
    fn take(&self) -> Vec<IngestEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl IngestSink for TestSink {
    fn emit(&self, event: IngestEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn tracker_for(server: &MockServer, max_poll_failures: u32) -> IngestionTracker {
    let backend = ReqwestBackend::new(BackendSettings {
        base_url: server.uri(),
        ..BackendSettings::default()
    })
    .unwrap();
    IngestionTracker::new(
        Arc::new(backend),
        IngestSettings {
            poll_interval: Duration::from_millis(20),
            max_poll_failures,
        },
    )
}

fn sample_files(dir: &TempDir, count: usize) -> Vec<PathBuf> {
    (0..count)
        .map(|index| {
            let file = dir.path().join(format!("shot-{index}.png"));
            fs::write(&file, [0x89, b'P', b'N', b'G']).unwrap();
            file
        })
        .collect()
}

async fn mount_accepting_upload(server: &MockServer, total_files: u32) {
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "total_files": total_files
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn empty_selection_is_refused_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let sink = Arc::new(TestSink::default());
    let result = tracker_for(&server, 3).start(Vec::new(), sink);

    assert!(matches!(result, Err(IngestError::NoFilesSelected)));
}

#[tokio::test]
async fn unreadable_file_is_reported_without_upload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let sink = Arc::new(TestSink::default());
    let handle = tracker_for(&server, 3)
        .start(vec![PathBuf::from("/definitely/missing.png")], sink.clone())
        .unwrap();
    tokio::time::timeout(Duration::from_secs(2), handle.wait())
        .await
        .unwrap();

    match sink.take().as_slice() {
        [IngestEvent::Unreadable { message }] => {
            assert!(message.contains("/definitely/missing.png"), "{message}");
        }
        other => panic!("unexpected events {other:?}"),
    }
}

#[tokio::test]
async fn polls_until_completed() {
    let server = MockServer::start().await;
    mount_accepting_upload(&server, 2).await;
    Mock::given(method("GET"))
        .and(path("/api/upload-progress"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "in_progress": true,
            "processed": 1,
            "total": 2
        })))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/upload-progress"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "in_progress": false,
            "processed": 2,
            "total": 2
        })))
        .with_priority(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let sink = Arc::new(TestSink::default());
    let handle = tracker_for(&server, 3)
        .start(sample_files(&dir, 2), sink.clone())
        .unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle.wait())
        .await
        .expect("loop ends after completion");

    let events = sink.take();
    assert_eq!(events[0], IngestEvent::Accepted { total_files: 2 });
    let progress: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            IngestEvent::Progress { report, .. } => Some(*report),
            _ => None,
        })
        .collect();
    assert_eq!(
        progress,
        vec![
            ProgressReport {
                processed: 1,
                total: 2,
                completed: false
            };
            2
        ]
    );
    assert!(matches!(
        events.last(),
        Some(IngestEvent::Finished { report, .. }) if report.processed == 2 && report.completed
    ));
}

#[tokio::test]
async fn zero_total_ticks_are_not_reported() {
    let server = MockServer::start().await;
    mount_accepting_upload(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/upload-progress"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "completed": false,
            "processed": 0,
            "total": 0
        })))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/upload-progress"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "completed": true,
            "processed": 1,
            "total": 1
        })))
        .with_priority(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let sink = Arc::new(TestSink::default());
    let handle = tracker_for(&server, 3)
        .start(sample_files(&dir, 1), sink.clone())
        .unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle.wait())
        .await
        .unwrap();

    let events = sink.take();
    assert_eq!(events.len(), 2);
    assert!(matches!(events[1], IngestEvent::Finished { .. }));
}

#[tokio::test]
async fn submit_timeout_skips_polling() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(504))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/upload-progress"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let sink = Arc::new(TestSink::default());
    let handle = tracker_for(&server, 3)
        .start(sample_files(&dir, 1), sink.clone())
        .unwrap();
    handle.wait().await;

    assert_eq!(sink.take(), vec![IngestEvent::TimedOutPossiblyAccepted]);
}

#[tokio::test]
async fn client_error_on_submit_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "No valid image files found"})),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let sink = Arc::new(TestSink::default());
    let handle = tracker_for(&server, 3)
        .start(sample_files(&dir, 1), sink.clone())
        .unwrap();
    handle.wait().await;

    match sink.take().as_slice() {
        [IngestEvent::Rejected(err)] => {
            assert_eq!(err.kind, BackendErrorKind::HttpStatus(400));
            assert_eq!(err.message, "No valid image files found");
        }
        other => panic!("unexpected events {other:?}"),
    }
}

#[tokio::test]
async fn repeated_poll_failures_end_the_loop() {
    let server = MockServer::start().await;
    mount_accepting_upload(&server, 3).await;
    Mock::given(method("GET"))
        .and(path("/api/upload-progress"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let sink = Arc::new(TestSink::default());
    let handle = tracker_for(&server, 3)
        .start(sample_files(&dir, 1), sink.clone())
        .unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle.wait())
        .await
        .unwrap();

    let events = sink.take();
    assert_eq!(events.len(), 2);
    assert!(matches!(events[1], IngestEvent::Failed(_)));
}

#[tokio::test]
async fn starting_again_cancels_previous_loop() {
    let server = MockServer::start().await;
    mount_accepting_upload(&server, 5).await;
    Mock::given(method("GET"))
        .and(path("/api/upload-progress"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "in_progress": true,
            "processed": 1,
            "total": 5
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let tracker = tracker_for(&server, 3);
    let first = tracker
        .start(sample_files(&dir, 1), Arc::new(TestSink::default()))
        .unwrap();
    let second = tracker
        .start(sample_files(&dir, 1), Arc::new(TestSink::default()))
        .unwrap();

    tokio::time::timeout(Duration::from_secs(2), first.wait())
        .await
        .expect("first loop cancelled");
    assert!(!second.is_finished());

    tracker.stop();
    tokio::time::timeout(Duration::from_secs(2), second.wait())
        .await
        .expect("second loop stopped");
}

#[tokio::test]
async fn handle_stop_ends_loop() {
    let server = MockServer::start().await;
    mount_accepting_upload(&server, 5).await;
    Mock::given(method("GET"))
        .and(path("/api/upload-progress"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "in_progress": true,
            "processed": 0,
            "total": 5
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let handle = tracker_for(&server, 3)
        .start(sample_files(&dir, 1), Arc::new(TestSink::default()))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;

    handle.stop();
    tokio::time::timeout(Duration::from_secs(2), async {
        while !handle.is_finished() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("loop observed cancellation");
}

#[tokio::test]
async fn stop_right_after_start_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let sink = Arc::new(TestSink::default());
    let tracker = tracker_for(&server, 3);
    let handle = tracker
        .start(sample_files(&dir, 3), sink.clone())
        .unwrap();
    tracker.stop();

    tokio::time::timeout(Duration::from_secs(2), handle.wait())
        .await
        .expect("cancelled before reading");
    assert!(sink.take().is_empty());
}
