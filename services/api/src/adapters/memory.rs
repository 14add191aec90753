//! services/api/src/adapters/memory.rs
//!
//! An in-process `AnalysisStore`, used when no `DATABASE_URL` is configured
//! and by the integration tests. Contents are lost on restart.

use std::collections::HashMap;

use async_trait::async_trait;
use site_audit_core::domain::AnalysisRun;
use site_audit_core::ports::{AnalysisStore, PortError, PortResult};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryStore {
    runs: RwLock<HashMap<Uuid, AnalysisRun>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AnalysisStore for MemoryStore {
    async fn save_analysis(&self, run: &AnalysisRun) -> PortResult<()> {
        self.runs.write().await.insert(run.id, run.clone());
        Ok(())
    }

    async fn get_analysis(&self, id: Uuid) -> PortResult<AnalysisRun> {
        self.runs
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Analysis {} not found", id)))
    }

    async fn list_analyses_for_url(&self, url: &str, limit: usize) -> PortResult<Vec<AnalysisRun>> {
        let runs = self.runs.read().await;
        let mut matching: Vec<AnalysisRun> = runs
            .values()
            .filter(|r| r.requested_url == url || r.final_url.as_deref() == Some(url))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matching.truncate(limit);
        Ok(matching)
    }
}
