//! HTTP protocol layer module
//!
//! Converts between hyper's request/response types and the dispatcher's owned
//! `IncomingRequest`/`Reply`, and maps file extensions to content types.

pub mod mime;
pub mod request;
pub mod response;

// Re-export commonly used types
pub use request::{read_body, IncomingRequest};
pub use response::{build_response, Reply};
