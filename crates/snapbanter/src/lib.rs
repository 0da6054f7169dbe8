//! SnapBanter — core library for captured-image banters: data model, local image
//! store, optimistic cache, and the excerpt parsing contract.

pub mod cache;
pub mod capture;
pub mod excerpts;
pub mod storage;
pub mod types;

pub use cache::{BanterCache, BanterSink};
pub use capture::{encode_data_url, inspect_capture, is_remote_reference, is_supported_format, read_data_url, CaptureInfo};
pub use excerpts::{parse_excerpts, MAX_EXCERPTS, MIN_EXCERPTS};
pub use storage::LocalImageStore;
pub use types::*;
