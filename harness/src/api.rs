//! Read API (§6): the REST surface named in the spec — target CRUD,
//! incident listing, availability, and latest check result — nothing more.
//! The source system's broader admin UI (bulk import, dashboards,
//! notification-channel management) is out of scope.
//!
//! `ApiError`/`ApiResult` are grounded on `dispatcher.rs`'s own
//! typed-error-to-status mapping; query shapes are grounded on
//! `original_source/app/api/schemas/sites.py` and
//! `app/services/status_history.py::latest`.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::availability;
use crate::models::{CheckResult, Incident, Target};

pub struct AppState {
    pub pool: PgPool,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/targets", get(list_targets).post(create_target))
        .route(
            "/v1/targets/:id",
            get(get_target).patch(update_target).delete(delete_target),
        )
        .route("/v1/targets/:id/incidents", get(list_incidents))
        .route("/v1/targets/:id/latest", get(latest_check_result))
        .route("/v1/targets/:id/availability", get(target_availability))
        .with_state(state)
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn unprocessable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: message.into(),
        }
    }

    fn internal<E: std::fmt::Display>(err: E) -> Self {
        tracing::error!(error = %err, "api internal error");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "internal error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct TargetCreate {
    name: String,
    url: String,
    #[serde(default = "default_check_interval_sec")]
    check_interval_sec: i32,
    #[serde(default = "default_timeout_ms")]
    timeout_ms: i32,
    #[serde(default)]
    retry_count: i32,
    #[serde(default)]
    retry_backoff_ms: i32,
    #[serde(default = "default_sla_target")]
    sla_target: i32,
    #[serde(default = "default_true")]
    is_active: bool,
}

fn default_check_interval_sec() -> i32 {
    60
}
fn default_timeout_ms() -> i32 {
    5000
}
fn default_sla_target() -> i32 {
    999
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
struct TargetUpdate {
    name: Option<String>,
    url: Option<String>,
    check_interval_sec: Option<i32>,
    timeout_ms: Option<i32>,
    retry_count: Option<i32>,
    retry_backoff_ms: Option<i32>,
    sla_target: Option<i32>,
    is_active: Option<bool>,
}

async fn list_targets(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Target>>> {
    let targets = sqlx::query_as::<_, Target>("SELECT * FROM targets ORDER BY created_at")
        .fetch_all(&state.pool)
        .await
        .map_err(ApiError::internal)?;
    Ok(Json(targets))
}

async fn create_target(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TargetCreate>,
) -> ApiResult<(StatusCode, Json<Target>)> {
    if req.check_interval_sec < 1 || req.timeout_ms < 1 || req.retry_count < 0 {
        return Err(ApiError::unprocessable("invalid target parameters"));
    }

    let target = sqlx::query_as::<_, Target>(
        r#"
        INSERT INTO targets (name, url, check_interval_sec, timeout_ms, retry_count,
                              retry_backoff_ms, sla_target, is_active)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(req.name)
    .bind(req.url)
    .bind(req.check_interval_sec)
    .bind(req.timeout_ms)
    .bind(req.retry_count)
    .bind(req.retry_backoff_ms)
    .bind(req.sla_target)
    .bind(req.is_active)
    .fetch_one(&state.pool)
    .await
    .map_err(ApiError::internal)?;

    sqlx::query(
        "INSERT INTO scheduler_state (target_id, next_run_at) VALUES ($1, now())
         ON CONFLICT (target_id) DO NOTHING",
    )
    .bind(target.id)
    .execute(&state.pool)
    .await
    .map_err(ApiError::internal)?;

    Ok((StatusCode::CREATED, Json(target)))
}

async fn get_target(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Target>> {
    let target = sqlx::query_as::<_, Target>("SELECT * FROM targets WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(|| ApiError::not_found("target not found"))?;
    Ok(Json(target))
}

async fn update_target(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<TargetUpdate>,
) -> ApiResult<Json<Target>> {
    let existing = sqlx::query_as::<_, Target>("SELECT * FROM targets WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(|| ApiError::not_found("target not found"))?;

    let target = sqlx::query_as::<_, Target>(
        r#"
        UPDATE targets SET
            name = $2, url = $3, check_interval_sec = $4, timeout_ms = $5,
            retry_count = $6, retry_backoff_ms = $7, sla_target = $8, is_active = $9,
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(req.name.unwrap_or(existing.name))
    .bind(req.url.unwrap_or(existing.url))
    .bind(req.check_interval_sec.unwrap_or(existing.check_interval_sec))
    .bind(req.timeout_ms.unwrap_or(existing.timeout_ms))
    .bind(req.retry_count.unwrap_or(existing.retry_count))
    .bind(req.retry_backoff_ms.unwrap_or(existing.retry_backoff_ms))
    .bind(req.sla_target.unwrap_or(existing.sla_target))
    .bind(req.is_active.unwrap_or(existing.is_active))
    .fetch_one(&state.pool)
    .await
    .map_err(ApiError::internal)?;

    Ok(Json(target))
}

async fn delete_target(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let result = sqlx::query("DELETE FROM targets WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await
        .map_err(ApiError::internal)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("target not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    offset: Option<i64>,
    limit: Option<i64>,
}

async fn list_incidents(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Vec<Incident>>> {
    let incidents = sqlx::query_as::<_, Incident>(
        r#"
        SELECT * FROM incidents
        WHERE target_id = $1
        ORDER BY start_ts DESC
        OFFSET $2 LIMIT $3
        "#,
    )
    .bind(id)
    .bind(page.offset.unwrap_or(0))
    .bind(page.limit.unwrap_or(100))
    .fetch_all(&state.pool)
    .await
    .map_err(ApiError::internal)?;

    Ok(Json(incidents))
}

async fn latest_check_result(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CheckResult>> {
    let result = sqlx::query_as::<_, CheckResult>(
        "SELECT * FROM check_results WHERE target_id = $1 ORDER BY checked_at DESC LIMIT 1",
    )
    .bind(id)
    .fetch_optional(&state.pool)
    .await
    .map_err(ApiError::internal)?
    .ok_or_else(|| ApiError::not_found("no check results yet"))?;

    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
struct AvailabilityQuery {
    window_hours: Option<i64>,
    assume_unknown_as_down: Option<bool>,
}

#[derive(Debug, Serialize)]
struct AvailabilityResponse {
    #[serde(flatten)]
    window: availability::UptimeWindow,
}

async fn target_availability(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> ApiResult<Json<AvailabilityResponse>> {
    let window = availability::uptime_window(
        &state.pool,
        id,
        query.window_hours.unwrap_or(24),
        None,
        query.assume_unknown_as_down.unwrap_or(true),
    )
    .await
    .map_err(ApiError::internal)?;

    Ok(Json(AvailabilityResponse { window }))
}
