//! The generate-banter endpoint: request validation plus the HTTP server.

#[cfg(feature = "server")]
pub mod http;
pub mod validate;

#[cfg(feature = "server")]
pub use http::{router, EndpointServer};
pub use validate::{validate_request, INVALID_JSON, MISSING_IMAGE_URL};
