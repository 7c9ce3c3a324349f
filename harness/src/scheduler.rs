//! C2: Scheduler / Lease Manager.
//!
//! `acquire` is grounded on `trace_core::lite::pgqueue::PgQueue::receive`'s
//! `FOR UPDATE SKIP LOCKED` CTE + `UPDATE ... RETURNING` shape, adapted from
//! a generic message queue to leasing `scheduler_state` rows. The
//! ensure/acquire/complete split and the "advance from `checked_at`, not
//! from `next_run_at`" drift-absorbing rule come from
//! `original_source/app/workers/runner.py::_acquire_jobs` /
//! `_persist_result`.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::{SchedulerState, Target};

/// A target paired with the scheduler row currently leased for it.
#[derive(Debug, Clone)]
pub struct LeasedWork {
    pub scheduler_id: Uuid,
    pub target: Target,
}

/// Inserts a `scheduler_state` row (due immediately) for every active
/// target that doesn't already have one. Idempotent: running it twice
/// leaves scheduling state untouched for targets already tracked.
pub async fn ensure_entries(pool: &PgPool) -> uptime_core::Result<u64> {
    let result = sqlx::query(
        r#"
        INSERT INTO scheduler_state (target_id, next_run_at)
        SELECT t.id, now()
        FROM targets t
        LEFT JOIN scheduler_state s ON s.target_id = t.id
        WHERE t.is_active AND s.id IS NULL
        "#,
    )
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Leases up to `limit` due, unleased-or-lease-expired targets for
/// `worker_id`, using `SKIP LOCKED` so concurrent callers always receive
/// disjoint sets (§6, I2).
#[derive(sqlx::FromRow)]
struct AcquiredRow {
    scheduler_id: Uuid,
    id: Uuid,
    name: String,
    url: String,
    check_interval_sec: i32,
    timeout_ms: i32,
    retry_count: i32,
    retry_backoff_ms: i32,
    sla_target: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

pub async fn acquire(
    pool: &PgPool,
    limit: i64,
    worker_id: &str,
    lease_timeout_sec: f64,
) -> uptime_core::Result<Vec<LeasedWork>> {
    let rows: Vec<AcquiredRow> = sqlx::query_as(
        r#"
        WITH due AS (
            SELECT s.id
            FROM scheduler_state s
            JOIN targets t ON t.id = s.target_id
            WHERE t.is_active
              AND s.next_run_at <= now()
              AND (s.lease_owner IS NULL OR s.lease_expires_at <= now())
            ORDER BY s.next_run_at
            LIMIT $1
            FOR UPDATE OF s SKIP LOCKED
        )
        UPDATE scheduler_state AS s
        SET lease_owner = $2,
            lease_expires_at = now() + ($3::text || ' seconds')::interval
        FROM due, targets t
        WHERE s.id = due.id AND t.id = s.target_id
        RETURNING s.id AS scheduler_id, t.id, t.name, t.url, t.check_interval_sec, t.timeout_ms,
                  t.retry_count, t.retry_backoff_ms, t.sla_target, t.is_active,
                  t.created_at, t.updated_at
        "#,
    )
    .bind(limit)
    .bind(worker_id)
    .bind(lease_timeout_sec)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| LeasedWork {
            scheduler_id: row.scheduler_id,
            target: Target {
                id: row.id,
                name: row.name,
                url: row.url,
                check_interval_sec: row.check_interval_sec,
                timeout_ms: row.timeout_ms,
                retry_count: row.retry_count,
                retry_backoff_ms: row.retry_backoff_ms,
                sla_target: row.sla_target,
                is_active: row.is_active,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
        })
        .collect())
}

/// Releases the lease held on `scheduler_id` and advances `next_run_at` to
/// `checked_at + check_interval_sec`, not from the row's previous
/// `next_run_at` — so a worker that falls behind catches up instead of
/// scheduling a burst of overdue runs.
///
/// Takes `tx` rather than a pool: §4.2 requires the CheckResult write, the
/// incident transition, and this lease release to commit atomically, so a
/// crash between them never leaves a lease held past its work while the
/// incident state has already moved on.
pub async fn complete(
    tx: &mut Transaction<'_, Postgres>,
    scheduler_id: Uuid,
    checked_at: DateTime<Utc>,
    check_interval_sec: i32,
) -> Result<(), sqlx::Error> {
    let next_run_at = checked_at + ChronoDuration::seconds(check_interval_sec as i64);

    sqlx::query(
        r#"
        UPDATE scheduler_state
        SET lease_owner = NULL,
            lease_expires_at = NULL,
            next_run_at = $2
        WHERE id = $1
        "#,
    )
    .bind(scheduler_id)
    .bind(next_run_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
