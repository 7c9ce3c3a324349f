//! Row types for the five entities of §3, one `sqlx::FromRow` struct each.
//!
//! Grounded on `original_source/app/db/models.py`'s SQLAlchemy models —
//! same fields, same invariants, no ORM layer: hand-written SQL in
//! `scheduler.rs`/`incidents.rs`/`availability.rs`/`api.rs` plus
//! `sqlx::migrate!` for schema (see `migrate.rs`), matching the teacher's
//! own approach and the spec's Non-goal on ORM/migration framework detail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uptime_core::Status;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Target {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub check_interval_sec: i32,
    pub timeout_ms: i32,
    pub retry_count: i32,
    pub retry_backoff_ms: i32,
    pub sla_target: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CheckResult {
    pub id: Uuid,
    pub target_id: Uuid,
    pub status: Status,
    pub http_status: Option<i32>,
    pub latency_ms: Option<i32>,
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Incident {
    pub id: Uuid,
    pub target_id: Uuid,
    pub start_ts: DateTime<Utc>,
    pub end_ts: Option<DateTime<Utc>>,
    pub last_status: Status,
    pub resolved: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SchedulerState {
    pub id: Uuid,
    pub target_id: Uuid,
    pub next_run_at: DateTime<Utc>,
    pub lease_owner: Option<String>,
    pub lease_expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct NotificationChannel {
    pub id: Uuid,
    #[sqlx(rename = "type")]
    pub channel_type: String,
    pub config: serde_json::Value,
    pub is_active: bool,
}
