//! C4: Availability / SLA Engine.
//!
//! Grounded on `original_source/app/services/metrics.py::
//! MetricsService.uptime_window` for the windowed walk and tail
//! attribution, but the baseline selection follows the variant `spec.md`
//! §4.4/§9(b) prefers over the original source's own behavior: when there
//! is no pre-window sample `P` but the in-window set `S` is non-empty, the
//! baseline is seeded from `S[0]` itself and iteration starts from the
//! *second* element, so the time before the first in-window sample is not
//! attributed to either uptime or downtime. The `assume_unknown_as_down`
//! policy only applies when there is neither a `P` nor any in-window
//! sample at all.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use uptime_core::Status;

#[derive(Debug, Clone, serde::Serialize)]
pub struct UptimeWindow {
    pub target_id: Uuid,
    pub window_hours: i64,
    pub uptime_seconds: f64,
    pub downtime_seconds: f64,
    pub availability: Option<f64>,
    pub sample_count: i64,
    pub from_ts: DateTime<Utc>,
    pub to_ts: DateTime<Utc>,
    pub sla_target_per_mille: Option<i32>,
    pub sla_met: Option<bool>,
}

#[derive(sqlx::FromRow)]
struct StatusRow {
    status: Status,
    checked_at: DateTime<Utc>,
}

/// Computes availability for `target_id` over the trailing `window_hours`.
///
/// `assume_unknown_as_down` only matters when there is neither a
/// pre-window sample nor any in-window sample at all (§4.4): when true,
/// the whole window is presumed DOWN; when false, availability is
/// reported unknown (`None`) rather than guessed. Whenever at least one
/// in-window sample exists, it seeds the baseline itself regardless of
/// this flag.
pub async fn uptime_window(
    pool: &PgPool,
    target_id: Uuid,
    window_hours: i64,
    sla_target_per_mille: Option<i32>,
    assume_unknown_as_down: bool,
) -> uptime_core::Result<UptimeWindow> {
    let now = Utc::now();
    let window_start = now - ChronoDuration::hours(window_hours);

    let sla_target_per_mille = match sla_target_per_mille {
        Some(v) => Some(v),
        None => sqlx::query_scalar::<_, i32>("SELECT sla_target FROM targets WHERE id = $1")
            .bind(target_id)
            .fetch_optional(pool)
            .await?,
    };

    let previous: Option<StatusRow> = sqlx::query_as(
        r#"
        SELECT status, checked_at FROM check_results
        WHERE target_id = $1 AND checked_at < $2
        ORDER BY checked_at DESC
        LIMIT 1
        "#,
    )
    .bind(target_id)
    .bind(window_start)
    .fetch_optional(pool)
    .await?;

    let checks: Vec<StatusRow> = sqlx::query_as(
        r#"
        SELECT status, checked_at FROM check_results
        WHERE target_id = $1 AND checked_at >= $2
        ORDER BY checked_at ASC
        "#,
    )
    .bind(target_id)
    .bind(window_start)
    .fetch_all(pool)
    .await?;

    let sample_count = checks.len() as i64;

    if previous.is_none() && checks.is_empty() && !assume_unknown_as_down {
        return Ok(UptimeWindow {
            target_id,
            window_hours,
            uptime_seconds: 0.0,
            downtime_seconds: 0.0,
            availability: None,
            sample_count: 0,
            from_ts: window_start,
            to_ts: now,
            sla_target_per_mille,
            sla_met: None,
        });
    }

    let (mut current_status, mut current_ts, rest) = match (&previous, checks.split_first()) {
        (Some(p), _) => (p.status, window_start, checks.as_slice()),
        (None, Some((first, rest))) => (first.status, first.checked_at, rest),
        (None, None) => (Status::Down, window_start, checks.as_slice()),
    };
    let mut uptime_seconds = 0.0_f64;
    let mut downtime_seconds = 0.0_f64;

    for check in rest {
        if check.checked_at < current_ts {
            continue;
        }
        let delta = (check.checked_at - current_ts).num_milliseconds() as f64 / 1000.0;
        if delta > 0.0 {
            if current_status == Status::Up {
                uptime_seconds += delta;
            } else {
                downtime_seconds += delta;
            }
        }
        current_status = check.status;
        current_ts = check.checked_at;
    }

    let tail = (now - current_ts).num_milliseconds() as f64 / 1000.0;
    if tail > 0.0 {
        if current_status == Status::Up {
            uptime_seconds += tail;
        } else {
            downtime_seconds += tail;
        }
    }

    let total = uptime_seconds + downtime_seconds;
    let availability = if total > 0.0 {
        Some(uptime_seconds / total)
    } else {
        None
    };

    let sla_met = match (sla_target_per_mille, availability) {
        (Some(target), Some(avail)) => Some(avail >= (target as f64 / 1000.0)),
        _ => None,
    };

    Ok(UptimeWindow {
        target_id,
        window_hours,
        uptime_seconds,
        downtime_seconds,
        availability,
        sample_count,
        from_ts: window_start,
        to_ts: now,
        sla_target_per_mille,
        sla_met,
    })
}
