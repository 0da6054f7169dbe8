//! Pipeline data types: errors and the generate-banter wire format.

pub mod error;
pub mod request;
pub mod response;

pub use error::*;
pub use request::*;
pub use response::*;
