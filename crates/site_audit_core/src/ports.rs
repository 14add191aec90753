//! crates/site_audit_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like HTTP clients,
//! LLM vendors or databases.

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{AnalysisRun, FetchedPage};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for persistence operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Why a page could not be retrieved. Any of these aborts the whole analysis.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Invalid URL '{0}': {1}")]
    InvalidUrl(String, String),
    #[error("Host unreachable: {0}")]
    Unreachable(String),
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    #[error("Unexpected HTTP status {0}")]
    Status(u16),
    #[error("Content type '{0}' is not HTML")]
    NotHtml(String),
    #[error("Response exceeds the {0} byte limit")]
    TooLarge(u64),
    #[error("Could not decode response body: {0}")]
    Decode(String),
}

/// Failure of the external generation service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("Generation service unreachable: {0}")]
    Unreachable(String),
    #[error("Generation service timed out after {0:?}")]
    Timeout(Duration),
    #[error("Generation service returned unparsable content: {0}")]
    Unparsable(String),
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Retrieves the HTML for an already-normalized absolute URL.
    async fn fetch_page(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Sends a system instruction and a user prompt, returning the raw reply text.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, GenerationError>;
}

#[async_trait]
pub trait AnalysisStore: Send + Sync {
    async fn save_analysis(&self, run: &AnalysisRun) -> PortResult<()>;

    async fn get_analysis(&self, id: Uuid) -> PortResult<AnalysisRun>;

    /// Most recent runs for a URL, newest first.
    async fn list_analyses_for_url(&self, url: &str, limit: usize) -> PortResult<Vec<AnalysisRun>>;
}
