//! C3: Incident Tracker.
//!
//! Grounded on `original_source/app/workers/runner.py::_update_incident`
//! for the HEALTHY/FAILING transition table, and
//! `app/services/incidents.py` for the create/close/get_open shapes. The
//! source system relies on SQLAlchemy's unit-of-work + a `FOR UPDATE
//! SKIP LOCKED` read of the open incident inside the same transaction as
//! the check-result insert; here that's one explicit `sqlx` transaction
//! per check, matching I1 (at most one open incident per target) via the
//! partial unique index in `migrations/`.

use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};
use uptime_core::Status;
use uuid::Uuid;

use crate::models::Incident;

/// What happened to the target's incident state as a result of one check.
#[derive(Debug, Clone)]
pub enum Transition {
    /// Target went from healthy (no open incident) to failing.
    Opened(Incident),
    /// Target was already failing and failed again; incident continues.
    StillFailing(Incident),
    /// Target recovered; the open incident is now resolved.
    Closed(Incident),
    /// Target was healthy and stayed healthy. No incident touched.
    NoChange,
}

/// Applies one check's outcome to the target's incident state within `tx`.
///
/// Must run after the `check_results` insert and before the transaction
/// commits, so a crash between the two never leaves an orphaned result
/// with no corresponding incident update.
pub async fn apply_transition(
    tx: &mut Transaction<'_, Postgres>,
    target_id: Uuid,
    status: Status,
    checked_at: DateTime<Utc>,
) -> Result<Transition, sqlx::Error> {
    let open: Option<Incident> = sqlx::query_as(
        r#"
        SELECT id, target_id, start_ts, end_ts, last_status, resolved
        FROM incidents
        WHERE target_id = $1 AND NOT resolved
        FOR UPDATE SKIP LOCKED
        "#,
    )
    .bind(target_id)
    .fetch_optional(&mut **tx)
    .await?;

    let transition = match (status, open) {
        (Status::Down, None) => {
            let incident: Incident = sqlx::query_as(
                r#"
                INSERT INTO incidents (target_id, start_ts, end_ts, last_status, resolved)
                VALUES ($1, $2, NULL, $3, FALSE)
                RETURNING id, target_id, start_ts, end_ts, last_status, resolved
                "#,
            )
            .bind(target_id)
            .bind(checked_at)
            .bind(Status::Down)
            .fetch_one(&mut **tx)
            .await?;

            Transition::Opened(incident)
        }
        (Status::Down, Some(mut incident)) => {
            sqlx::query("UPDATE incidents SET last_status = $2 WHERE id = $1")
                .bind(incident.id)
                .bind(Status::Down)
                .execute(&mut **tx)
                .await?;
            incident.last_status = Status::Down;
            Transition::StillFailing(incident)
        }
        (Status::Up, Some(mut incident)) => {
            sqlx::query(
                r#"
                UPDATE incidents
                SET end_ts = $2, last_status = $3, resolved = TRUE
                WHERE id = $1
                "#,
            )
            .bind(incident.id)
            .bind(checked_at)
            .bind(Status::Up)
            .execute(&mut **tx)
            .await?;
            incident.end_ts = Some(checked_at);
            incident.last_status = Status::Up;
            incident.resolved = true;
            Transition::Closed(incident)
        }
        (Status::Up, None) => Transition::NoChange,
    };

    Ok(transition)
}
