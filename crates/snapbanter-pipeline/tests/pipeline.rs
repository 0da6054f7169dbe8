//! End-to-end tests for the submit → persist → generate → reconcile pipeline.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use snapbanter::{Banter, Excerpt, GenerationError, LocalImageStore, FAILED_TEXT};
use snapbanter_pipeline::config::EndpointSettings;
use snapbanter_pipeline::types::FAILURE_ALERT;
use snapbanter_pipeline::{
    BanterGenerator, EndpointClient, ImageUploader, InlineUploader, PipelineError, PipelineResult,
    UploadOrchestrator,
};

// ─────────────────────── helpers ───────────────────────

fn write_capture(dir: &Path, name: &str) -> String {
    let path = dir.join(name);
    image::RgbImage::from_pixel(8, 8, image::Rgb([200, 120, 40]))
        .save(&path)
        .unwrap();
    path.display().to_string()
}

fn excerpts(lines: &[&str]) -> Vec<Excerpt> {
    lines.iter().map(|l| Excerpt::new(*l)).collect()
}

struct PassThrough;

#[async_trait]
impl ImageUploader for PassThrough {
    async fn upload(&self, persisted_ref: &str, _id: &str) -> PipelineResult<String> {
        Ok(persisted_ref.to_string())
    }
}

struct BrokenBucket;

#[async_trait]
impl ImageUploader for BrokenBucket {
    async fn upload(&self, _persisted_ref: &str, _id: &str) -> PipelineResult<String> {
        Err(PipelineError::Upload("bucket returned 503".into()))
    }
}

/// Records the references it was asked about and answers with a fixed result.
struct Scripted {
    result: Result<Vec<&'static str>, u16>,
    seen: std::sync::Mutex<Vec<String>>,
}

impl Scripted {
    fn ok(lines: Vec<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(lines),
            seen: Default::default(),
        })
    }

    fn failing(status: u16) -> Arc<Self> {
        Arc::new(Self {
            result: Err(status),
            seen: Default::default(),
        })
    }

    fn calls(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl BanterGenerator for Scripted {
    async fn generate(&self, image_ref: &str) -> Result<Vec<Excerpt>, GenerationError> {
        self.seen.lock().unwrap().push(image_ref.to_string());
        match &self.result {
            Ok(lines) => Ok(excerpts(lines)),
            Err(status) => Err(GenerationError::Remote {
                status: *status,
                message: "upstream unavailable".into(),
            }),
        }
    }
}

/// First call parks until released; later calls answer immediately.
#[derive(Default)]
struct Gated {
    calls: AtomicUsize,
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl BanterGenerator for Gated {
    async fn generate(&self, _image_ref: &str) -> Result<Vec<Excerpt>, GenerationError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(excerpts(&["slow one", "slow two", "slow three"]))
        } else {
            Ok(excerpts(&["fast one", "fast two", "fast three"]))
        }
    }
}

async fn open(
    dir: &Path,
    uploader: Arc<dyn ImageUploader>,
    generator: Arc<dyn BanterGenerator>,
) -> Arc<UploadOrchestrator> {
    Arc::new(UploadOrchestrator::open(dir.join("data"), uploader, generator).await)
}

// ─────────────────────── scenarios ───────────────────────

#[tokio::test]
async fn successful_submission_persists_image_and_settles() {
    let dir = tempfile::tempdir().unwrap();
    let capture = write_capture(dir.path(), "capture.jpg");
    let generator = Scripted::ok(vec!["Cat supervisor.", "Desk chaos, curated.", "Peak Tuesday."]);
    let orch = open(dir.path(), Arc::new(PassThrough), generator.clone()).await;

    let banter = assert_ok!(orch.submit(&capture).await);

    let expected_path = orch.store().image_path(&banter.id);
    assert!(expected_path.exists());
    assert_eq!(banter.image_uri, expected_path.display().to_string());
    assert_eq!(banter.excerpts.len(), 3);
    assert!(!banter.is_generating);

    // The generator saw the persisted copy, not the transient capture.
    assert_eq!(generator.calls(), vec![banter.image_uri.clone()]);

    assert_eq!(orch.cache().snapshot(), vec![banter]);
}

#[tokio::test]
async fn failed_generation_marks_entry_and_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let capture = write_capture(dir.path(), "capture.jpg");
    let orch = open(dir.path(), Arc::new(PassThrough), Scripted::failing(500)).await;

    let err = assert_err!(orch.submit(&capture).await);
    assert!(matches!(err, PipelineError::Generation(GenerationError::Remote { status: 500, .. })));
    assert!(err.is_submission_failure());
    assert_eq!(err.user_message(), FAILURE_ALERT);

    let entries = orch.cache().snapshot();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].is_failed());
    assert_eq!(entries[0].excerpts, excerpts(&[FAILED_TEXT]));
    assert!(Path::new(&entries[0].image_uri).exists());
}

#[tokio::test]
async fn upload_failure_skips_generation() {
    let dir = tempfile::tempdir().unwrap();
    let capture = write_capture(dir.path(), "capture.jpg");
    let generator = Scripted::ok(vec!["never", "shown", "here"]);
    let orch = open(dir.path(), Arc::new(BrokenBucket), generator.clone()).await;

    let err = assert_err!(orch.submit(&capture).await);
    assert!(matches!(err, PipelineError::Upload(_)), "got: {err}");
    assert!(generator.calls().is_empty());

    let entry = &orch.cache().snapshot()[0];
    assert!(!entry.is_generating);
    assert_eq!(entry.excerpts[0].text, FAILED_TEXT);
}

#[tokio::test]
async fn concurrent_submissions_reconcile_independently() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_capture(dir.path(), "a.jpg");
    let second = write_capture(dir.path(), "b.jpg");
    let generator = Arc::new(Gated::default());
    let orch = open(dir.path(), Arc::new(PassThrough), generator.clone()).await;

    let slow = orch.spawn_submit(first);
    generator.entered.notified().await;

    let fast = assert_ok!(orch.spawn_submit(second).await.unwrap());

    // B settled while A is still outstanding.
    let mid = orch.cache().snapshot();
    assert_eq!(mid.len(), 2);
    assert_eq!(mid[0].id, fast.id);
    assert!(!mid[0].is_generating);
    assert!(mid[1].is_generating);

    generator.release.notify_one();
    let slow = assert_ok!(slow.await.unwrap());

    let settled = orch.cache().snapshot();
    assert_eq!(
        settled.iter().map(|b| b.id.as_str()).collect::<Vec<_>>(),
        [fast.id.as_str(), slow.id.as_str()]
    );
    assert_eq!(settled[0].excerpts[0].text, "fast one");
    assert_eq!(settled[1].excerpts[0].text, "slow one");
    assert!(settled.iter().all(|b| !b.is_generating));
}

#[tokio::test]
async fn flushed_cache_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let capture = write_capture(dir.path(), "capture.jpg");
    let generator = Scripted::ok(vec!["one", "two", "three"]);

    let orch = open(dir.path(), Arc::new(PassThrough), generator.clone()).await;
    let banter = assert_ok!(orch.submit(&capture).await);
    orch.cache().flush().await;

    let on_disk = assert_ok!(LocalImageStore::new(dir.path().join("data")).read_banters().await);
    assert_eq!(on_disk, vec![banter.clone()]);

    let reopened = open(dir.path(), Arc::new(PassThrough), generator).await;
    let hydrated: Vec<Banter> = reopened.cache().snapshot();
    assert_eq!(hydrated, vec![banter]);
}

#[tokio::test]
async fn endpoint_round_trip_with_inline_upload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/functions/v1/generate-banter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "excerpts": ["Golden hour, zero effort.", "Lens flare of destiny.", "Orange you glad?"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let capture = write_capture(dir.path(), "capture.jpg");
    let client = EndpointClient::new(EndpointSettings {
        url: format!("{}/functions/v1/generate-banter", server.uri()),
        api_key: None,
        timeout: None,
    })
    .unwrap();
    let orch = open(dir.path(), Arc::new(InlineUploader), Arc::new(client)).await;

    let banter = assert_ok!(orch.submit(&capture).await);
    assert_eq!(banter.excerpts[1].text, "Lens flare of destiny.");

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let image_url = body["image_url"].as_str().unwrap();
    assert!(image_url.starts_with("data:image/jpeg;base64,"), "got: {image_url}");
}
