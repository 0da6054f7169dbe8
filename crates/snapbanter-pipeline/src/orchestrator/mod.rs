//! Upload orchestrator: the single entry point for "user submitted a photo".
//!
//! Each submission runs `Submitted → Persisting → Generating → {Succeeded | Failed}`.
//! The optimistic placeholder is inserted as soon as the capture has a local
//! reference, before any network work, and [`UploadOrchestrator::reconcile`]
//! is the only place that settles it.

pub mod state;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use snapbanter::{Banter, BanterCache, BanterPatch, LocalImageStore};

use crate::generation::BanterGenerator;
use crate::types::{PipelineError, PipelineResult};
use crate::upload::ImageUploader;

pub use state::{GenerationOutcome, SubmissionState};

/// Composes the local store, the uploader, the generator, and the cache.
#[derive(Clone)]
pub struct UploadOrchestrator {
    store: Arc<LocalImageStore>,
    cache: BanterCache,
    uploader: Arc<dyn ImageUploader>,
    generator: Arc<dyn BanterGenerator>,
}

impl UploadOrchestrator {
    pub fn new(
        store: Arc<LocalImageStore>,
        cache: BanterCache,
        uploader: Arc<dyn ImageUploader>,
        generator: Arc<dyn BanterGenerator>,
    ) -> Self {
        Self {
            store,
            cache,
            uploader,
            generator,
        }
    }

    /// Open the store under `data_dir`, hydrate the cache from it, and wire everything up.
    pub async fn open(
        data_dir: impl Into<PathBuf>,
        uploader: Arc<dyn ImageUploader>,
        generator: Arc<dyn BanterGenerator>,
    ) -> Self {
        let store = Arc::new(LocalImageStore::new(data_dir));
        tracing::info!("Opening banter store: {}", store.root().display());
        let banters = store.load_banters().await;
        tracing::info!(count = banters.len(), "Hydrated banter cache");
        let cache = BanterCache::with_banters(banters, store.clone());
        Self::new(store, cache, uploader, generator)
    }

    pub fn cache(&self) -> &BanterCache {
        &self.cache
    }

    pub fn store(&self) -> &LocalImageStore {
        &self.store
    }

    /// Run one submission to its terminal state.
    ///
    /// Returns the settled banter on success. On failure the cache entry is
    /// already marked failed and the error is returned for the caller to alert on.
    ///
    /// Once the placeholder is inserted, generation and reconciliation run on
    /// their own task, so dropping this future still settles the entry.
    pub async fn submit(&self, source_ref: &str) -> PipelineResult<Banter> {
        let mut tracker = Tracker::new(Uuid::new_v4().to_string());

        tracker.advance(SubmissionState::Persisting);
        let persisted = self.store.ensure_image_persisted(source_ref, &tracker.id).await;
        self.cache
            .insert_optimistic(Banter::pending(&tracker.id, &persisted, Utc::now()))?;

        let this = self.clone();
        tokio::spawn(async move {
            tracker.advance(SubmissionState::Generating);
            let outcome = this.generate(&tracker.id, &persisted).await;

            tracker.advance(outcome.terminal_state());
            this.reconcile(&tracker.id, outcome)
        })
        .await
        .map_err(|e| PipelineError::Task(e.to_string()))?
    }

    /// Run [`submit`](Self::submit) on its own task. Dropping the handle does not cancel it.
    pub fn spawn_submit(self: &Arc<Self>, source_ref: impl Into<String>) -> JoinHandle<PipelineResult<Banter>> {
        let this = Arc::clone(self);
        let source_ref = source_ref.into();
        tokio::spawn(async move { this.submit(&source_ref).await })
    }

    async fn generate(&self, id: &str, persisted: &str) -> GenerationOutcome {
        let reference = match self.uploader.upload(persisted, id).await {
            Ok(reference) => reference,
            Err(e) => return GenerationOutcome::Failure(e),
        };

        self.generator
            .generate(&reference)
            .await
            .map_err(PipelineError::from)
            .into()
    }

    /// Apply the terminal cache update for `id`. Always flips `is_generating` off.
    pub fn reconcile(&self, id: &str, outcome: GenerationOutcome) -> PipelineResult<Banter> {
        match outcome {
            GenerationOutcome::Success(excerpts) => {
                let banter = self.cache.update(id, BanterPatch::succeeded(excerpts))?;
                tracing::info!(id, excerpts = banter.excerpts.len(), "Banter generated");
                Ok(banter)
            }
            GenerationOutcome::Failure(err) => {
                tracing::warn!(id, "Banter generation failed: {err}");
                if let Err(e) = self.cache.update(id, BanterPatch::failed()) {
                    tracing::error!(id, "Failed to mark banter as failed: {e}");
                }
                Err(err)
            }
        }
    }
}

/// Logs each step of one submission and checks it follows the lifecycle.
struct Tracker {
    id: String,
    state: SubmissionState,
}

impl Tracker {
    fn new(id: String) -> Self {
        tracing::debug!(id = %id, state = %SubmissionState::Submitted, "Submission started");
        Self {
            id,
            state: SubmissionState::Submitted,
        }
    }

    fn advance(&mut self, next: SubmissionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {next}",
            self.state
        );
        tracing::debug!(id = %self.id, from = %self.state, to = %next, "Submission transition");
        self.state = next;
    }
}
