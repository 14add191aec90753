//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::{
    fetch_error, generation_error, packaging_error, port_error, score_error, HttpError,
};
use crate::web::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use site_audit_core::domain::{AnalysisRun, Category, Fix, FixContext, ScoreResult, ServerType};
use site_audit_core::fetch::normalize_url;
use site_audit_core::{packager, RunOptions, Stage};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        create_analysis_handler,
        list_analyses_handler,
        get_analysis_handler,
        score_handler,
        fixes_handler,
        bundle_handler,
    ),
    components(
        schemas(
            HealthResponse,
            AnalyzeRequest,
            AnalysisBody,
            AnalysisList,
            ScoreRequest,
            ScoreBody,
            FixesRequest,
            FixesBody,
            BundleRequest,
        )
    ),
    tags(
        (name = "Site Audit API", description = "Fetch a page, score it for SEO, speed and content, and generate fixes.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
}

/// Request body for a full analysis run.
#[derive(Deserialize, ToSchema)]
pub struct AnalyzeRequest {
    pub url: String,
    /// Also generate fixes for every category.
    #[serde(default)]
    pub fixes: bool,
    /// `nginx` (default), `apache`/`htaccess` or `node`.
    #[serde(default)]
    pub server_type: Option<String>,
    #[serde(default)]
    pub target_keyword: Option<String>,
}

/// A full analysis run, including partial results and failure markers.
#[derive(Serialize, ToSchema)]
#[schema(value_type = Object)]
pub struct AnalysisBody(pub AnalysisRun);

/// Default and maximum page size for run listings.
pub const DEFAULT_LIST_LIMIT: usize = 20;
pub const MAX_LIST_LIMIT: usize = 100;

fn default_list_limit() -> usize {
    DEFAULT_LIST_LIMIT
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Requested or final URL of the runs, as submitted.
    pub url: String,
    /// At most this many runs, newest first (capped at 100).
    #[serde(default = "default_list_limit")]
    pub limit: usize,
}

#[derive(Serialize, ToSchema)]
#[schema(value_type = Vec<Object>)]
pub struct AnalysisList(pub Vec<AnalysisRun>);

#[derive(Deserialize, ToSchema)]
pub struct ScoreRequest {
    pub url: String,
}

#[derive(Serialize, ToSchema)]
#[schema(value_type = Object)]
pub struct ScoreBody(pub ScoreResult);

#[derive(Deserialize, ToSchema)]
pub struct FixesRequest {
    pub url: String,
    /// `seo`, `speed` or `content`.
    pub category: String,
    /// Issue names, in the order fixes should be returned.
    pub issues: Vec<String>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub context: FixContext,
}

#[derive(Serialize, ToSchema)]
#[schema(value_type = Vec<Object>)]
pub struct FixesBody(pub Vec<Fix>);

#[derive(Deserialize, ToSchema)]
pub struct BundleRequest {
    pub url: String,
    #[serde(default)]
    pub server_type: Option<String>,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub seo: Vec<Fix>,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub speed: Vec<Fix>,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub content: Vec<Fix>,
}

//=========================================================================================
// Request Parsing Helpers
//=========================================================================================

fn parse_server_type(raw: Option<&str>) -> Result<ServerType, HttpError> {
    match raw {
        None => Ok(ServerType::default()),
        Some(s) => s
            .parse::<ServerType>()
            .map_err(|e| (StatusCode::BAD_REQUEST, e)),
    }
}

fn parse_category(raw: &str) -> Result<Category, HttpError> {
    raw.parse::<Category>()
        .map_err(|e| (StatusCode::BAD_REQUEST, e))
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Liveness check.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Run the whole pipeline for a URL.
///
/// The run is stored and returned even when a stage fails; a fetch failure
/// is reported as 502 with the failed run as the body.
#[utoipa::path(
    post,
    path = "/analyses",
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Analysis finished (possibly with category failures)", body = AnalysisBody),
        (status = 400, description = "Invalid URL or server type"),
        (status = 502, description = "The page could not be fetched", body = AnalysisBody)
    )
)]
pub async fn create_analysis_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<AnalyzeRequest>,
) -> Result<impl IntoResponse, HttpError> {
    normalize_url(&payload.url).map_err(|e| fetch_error(&e))?;
    let options = RunOptions {
        generate_fixes: payload.fixes,
        server_type: parse_server_type(payload.server_type.as_deref())?,
        target_keyword: payload.target_keyword,
    };

    let run = app_state.pipeline.run(&payload.url, &options).await;
    if let Err(e) = app_state.store.save_analysis(&run).await {
        error!("Failed to store analysis {}: {:?}", run.id, e);
    }
    info!(run_id = %run.id, state = ?run.state, "Analysis finished");

    let status = match run.failures.first() {
        Some(failure) if failure.stage == Stage::Fetch => StatusCode::BAD_GATEWAY,
        _ => StatusCode::OK,
    };
    Ok((status, Json(AnalysisBody(run))))
}

/// List stored runs for a URL, newest first.
#[utoipa::path(
    get,
    path = "/analyses",
    params(ListQuery),
    responses(
        (status = 200, description = "Matching runs, newest first", body = AnalysisList),
        (status = 500, description = "The store failed")
    )
)]
pub async fn list_analyses_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let limit = query.limit.min(MAX_LIST_LIMIT);
    let runs = app_state
        .store
        .list_analyses_for_url(query.url.trim(), limit)
        .await
        .map_err(|e| {
            error!("Failed to list analyses for {}: {:?}", query.url, e);
            port_error(&e)
        })?;
    Ok(Json(AnalysisList(runs)))
}

/// Load a stored analysis run.
#[utoipa::path(
    get,
    path = "/analyses/{id}",
    params(("id" = Uuid, Path, description = "The analysis id.")),
    responses(
        (status = 200, description = "The stored run", body = AnalysisBody),
        (status = 404, description = "Unknown analysis id")
    )
)]
pub async fn get_analysis_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let run = app_state.store.get_analysis(id).await.map_err(|e| {
        if !matches!(e, site_audit_core::PortError::NotFound(_)) {
            error!("Failed to load analysis {}: {:?}", id, e);
        }
        port_error(&e)
    })?;
    Ok(Json(AnalysisBody(run)))
}

/// Fetch a URL and score a single category.
#[utoipa::path(
    post,
    path = "/score/{category}",
    request_body = ScoreRequest,
    params(("category" = String, Path, description = "`seo`, `speed` or `content`.")),
    responses(
        (status = 200, description = "The category score", body = ScoreBody),
        (status = 400, description = "Invalid URL or category"),
        (status = 502, description = "The page could not be fetched")
    )
)]
pub async fn score_handler(
    State(app_state): State<Arc<AppState>>,
    Path(category): Path<String>,
    Json(payload): Json<ScoreRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let category = parse_category(&category)?;
    let pipeline = &app_state.pipeline;

    let page = pipeline.fetch(&payload.url).await.map_err(|e| {
        error!("Failed to fetch {}: {}", payload.url, e);
        fetch_error(&e)
    })?;
    let document = pipeline.extract(&page);
    let result = pipeline
        .score(category, &document, Some(&page.timing))
        .map_err(|e| score_error(&e))?;
    Ok(Json(ScoreBody(result)))
}

/// Generate fixes for a list of issues, returned in the same order.
#[utoipa::path(
    post,
    path = "/fixes",
    request_body = FixesRequest,
    responses(
        (status = 200, description = "One fix per issue", body = FixesBody),
        (status = 400, description = "Invalid category"),
        (status = 502, description = "The generation service failed for every issue")
    )
)]
pub async fn fixes_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<FixesRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let category = parse_category(&payload.category)?;
    let fixes = app_state
        .pipeline
        .generate_fixes(&payload.url, category, &payload.issues, &payload.context)
        .await
        .map_err(|e| {
            error!("Fix generation failed for {}: {}", payload.url, e);
            generation_error(&e)
        })?;
    Ok(Json(FixesBody(fixes)))
}

/// Package fixes into a downloadable ZIP bundle.
#[utoipa::path(
    post,
    path = "/bundle",
    request_body = BundleRequest,
    responses(
        (status = 200, description = "The ZIP archive", content_type = "application/zip", body = Vec<u8>),
        (status = 400, description = "Invalid server type"),
        (status = 500, description = "A fix was filed under the wrong category, or the archive failed")
    )
)]
pub async fn bundle_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<BundleRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let server_type = parse_server_type(payload.server_type.as_deref())?;
    let bundle = app_state
        .pipeline
        .package(
            &payload.url,
            server_type,
            &payload.seo,
            &payload.speed,
            &payload.content,
            Utc::now(),
        )
        .map_err(|e| {
            error!("Failed to package fixes for {}: {}", payload.url, e);
            packaging_error(&e)
        })?;
    let bytes = packager::to_zip(&bundle).map_err(|e| packaging_error(&e))?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"site-fixes.zip\"",
            ),
        ],
        bytes,
    ))
}
