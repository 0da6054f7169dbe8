//! SnapBanter pipeline — persist a capture, show an optimistic placeholder,
//! generate banter remotely, and reconcile the result.

pub mod config;
pub mod generation;
pub mod orchestrator;
pub mod server;
pub mod types;
pub mod upload;

pub use config::resolve_data_dir;
pub use generation::{BanterGenerator, CompletionClient, EndpointClient};
pub use orchestrator::{GenerationOutcome, SubmissionState, UploadOrchestrator};
pub use types::{PipelineError, PipelineResult};
pub use upload::{BucketUploader, ImageUploader, InlineUploader};
