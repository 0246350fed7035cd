//! # Transport Layer
//!
//! The [`Transport`] trait is the only thing the data layer knows about the
//! network: it takes a [`RequestDescriptor`] and returns the decoded JSON
//! body, or one of `Network`, `Http` or `Serialization` errors.
//!
//! ## Implementations
//!
//! - [`http::HttpTransport`]: production client on top of `reqwest`
//!   - Resolves descriptor paths against a base URL
//!   - Optional simulated latency before each request
//!
//! - [`memory::InMemoryBackend`]: in-process REST collections for testing
//!   - Server-side id assignment, filtering by query parameters
//!   - Request log, failure injection, and a gate that holds requests open
//!
//! Transports never retry. Whatever they return is what the caller sees.

use crate::endpoints::RequestDescriptor;
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

pub mod http;
pub mod memory;

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Sends one request and returns its JSON body (`Null` when empty).
    async fn execute(&self, request: &RequestDescriptor) -> Result<Value>;
}
