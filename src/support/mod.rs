//! Shared building blocks: the response envelope, timestamps and node identity.

pub mod datetime;
pub mod endpoint;
pub mod response;

pub use endpoint::NodeIdentity;
pub use response::{ApiResponse, RestApiCode};
