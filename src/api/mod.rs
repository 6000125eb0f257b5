//! Backend REST API: HTTP client, error classification, response envelope
//! and the raw/normalized entity types.

pub mod api_types;
pub mod client;
pub mod envelope;
pub mod error;
pub mod types;

pub use client::HttpClient;
pub use envelope::{Envelope, PaginationState};
pub use error::{ApiError, ErrorKind, ErrorMessages};
