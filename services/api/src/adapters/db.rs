//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `AnalysisStore` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use site_audit_core::domain::AnalysisRun;
use site_audit_core::ports::{AnalysisStore, PortError, PortResult};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `AnalysisStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

/// The run itself is stored whole as JSONB; the other columns exist for lookups.
#[derive(FromRow)]
struct AnalysisRecord {
    payload: Json<AnalysisRun>,
}

impl AnalysisRecord {
    fn to_domain(self) -> AnalysisRun {
        self.payload.0
    }
}

fn state_label(run: &AnalysisRun) -> String {
    serde_json::to_value(&run.state)
        .ok()
        .and_then(|v| v.get("state").and_then(|s| s.as_str()).map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string())
}

//=========================================================================================
// `AnalysisStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AnalysisStore for DbAdapter {
    async fn save_analysis(&self, run: &AnalysisRun) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO analyses (id, requested_url, final_url, state, payload, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (id) DO UPDATE SET \
                final_url = EXCLUDED.final_url, \
                state = EXCLUDED.state, \
                payload = EXCLUDED.payload",
        )
        .bind(run.id)
        .bind(&run.requested_url)
        .bind(&run.final_url)
        .bind(state_label(run))
        .bind(Json(run))
        .bind(run.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn get_analysis(&self, id: Uuid) -> PortResult<AnalysisRun> {
        let record = sqlx::query_as::<_, AnalysisRecord>(
            "SELECT payload FROM analyses WHERE id = $1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("Analysis {} not found", id)),
            _ => PortError::Unexpected(e.to_string()),
        })?;
        Ok(record.to_domain())
    }

    async fn list_analyses_for_url(&self, url: &str, limit: usize) -> PortResult<Vec<AnalysisRun>> {
        let records = sqlx::query_as::<_, AnalysisRecord>(
            "SELECT payload FROM analyses \
             WHERE requested_url = $1 OR final_url = $1 \
             ORDER BY created_at DESC LIMIT $2",
        )
        .bind(url)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(records.into_iter().map(AnalysisRecord::to_domain).collect())
    }
}
