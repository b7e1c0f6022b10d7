//! Client for the third-party comic-generation service.
//!
//! [`ComicGenerator`] is the seam the background worker calls through.
//! [`api::ComicApi`] is the real HTTP implementation and
//! [`retry::Retrying`] is an optional backoff decorator around any
//! generator.

pub mod api;
pub mod retry;

use async_trait::async_trait;
use serde_json::value::RawValue;

pub use api::{ComicApi, ComicApiError};
pub use retry::{RetryPolicy, Retrying};

/// Something that turns a request payload into a generated comic.
///
/// The payload and the returned value are both opaque JSON, passed along
/// as the exact text that was received.
#[async_trait]
pub trait ComicGenerator: Send + Sync {
    async fn generate(&self, payload: &RawValue) -> Result<Box<RawValue>, ComicApiError>;
}
