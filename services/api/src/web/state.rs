//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use site_audit_core::ports::AnalysisStore;
use site_audit_core::Pipeline;
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Pipeline,
    pub store: Arc<dyn AnalysisStore>,
    pub config: Arc<Config>,
}
