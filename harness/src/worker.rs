//! Main probe loop.
//!
//! Fuses the teacher's `harness/src/worker.rs` poll/select!/shutdown shape
//! with `original_source/app/workers/runner.py::run_forever`'s
//! acquire-batch/run-concurrently/persist cycle. Concurrency is bounded by a
//! `tokio::sync::Semaphore` rather than the source system's unbounded
//! `asyncio.gather`, matching §6's fixed-size worker-pool requirement.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::MonitorConfig;
use crate::constants::INCIDENT_CONTENTION_RETRIES;
use crate::incidents::{self, Transition};
use crate::models::Target;
use crate::probe::{self, CheckRequest};
use crate::scheduler::{self, LeasedWork};
use uptime_core::{AlertEvent, Notifier};

pub async fn run(
    pool: PgPool,
    config: Arc<MonitorConfig>,
    notifiers: Vec<Arc<dyn Notifier>>,
) -> anyhow::Result<()> {
    let worker_id = format!("worker-{}", Uuid::new_v4());
    let http_client = Client::new();
    let semaphore = Arc::new(tokio::sync::Semaphore::new(config.checker_concurrency));
    let poll_interval = Duration::from_secs_f64(config.poll_interval_sec);

    scheduler::ensure_entries(&pool).await?;

    tracing::info!(
        event = "worker_started",
        worker_id = %worker_id,
        concurrency = config.checker_concurrency,
        "probe worker started"
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!(event = "worker_shutdown", "worker shutting down");
                return Ok(());
            }
            work = scheduler::acquire(&pool, config.fetch_batch_size, &worker_id, config.lease_timeout_sec) => {
                let batch = work?;
                if batch.is_empty() {
                    tokio::time::sleep(poll_interval).await;
                    continue;
                }

                let mut tasks = Vec::with_capacity(batch.len());
                for leased in batch {
                    let pool = pool.clone();
                    let client = http_client.clone();
                    let notifiers = notifiers.clone();
                    let permit = semaphore.clone().acquire_owned().await.expect("semaphore closed");

                    tasks.push(tokio::spawn(async move {
                        let _permit = permit;
                        if let Err(err) = run_one(&pool, &client, &notifiers, leased).await {
                            tracing::warn!(event = "job_failed", error = %err, "probe job failed");
                        }
                    }));
                }

                for task in tasks {
                    let _ = task.await;
                }
            }
        }
    }
}

async fn run_one(
    pool: &PgPool,
    client: &Client,
    notifiers: &[Arc<dyn Notifier>],
    leased: LeasedWork,
) -> anyhow::Result<()> {
    let req = CheckRequest::from(&leased.target);
    let result = probe::run_check(client, &req).await;

    let alert = persist_with_retry(pool, leased.scheduler_id, &leased.target, &result).await?;

    if let Some(event) = alert {
        crate::notifier::dispatch(notifiers, &event).await;
    }

    Ok(())
}

/// Inserts the check result, applies the incident transition, and releases
/// the scheduler lease in one transaction (§4.2: the result write, the
/// incident update, and the lease release/`next_run_at` advance must
/// commit atomically, or a crash between them can leave a lease held past
/// its work while the incident state has already moved on). Retries on a
/// unique-violation of the open-incident index (two concurrent workers
/// racing to open an incident for the same target after a `SKIP LOCKED`
/// false negative), bounded to `INCIDENT_CONTENTION_RETRIES` attempts
/// (§4.3).
async fn persist_with_retry(
    pool: &PgPool,
    scheduler_id: Uuid,
    target: &Target,
    result: &crate::models::CheckResult,
) -> anyhow::Result<Option<AlertEvent>> {
    let mut attempt = 0;
    loop {
        match persist_once(pool, scheduler_id, target, result).await {
            Ok(alert) => return Ok(alert),
            Err(err) => {
                let is_unique_violation = err
                    .as_database_error()
                    .map(|e| e.is_unique_violation())
                    .unwrap_or(false);
                attempt += 1;
                if !is_unique_violation || attempt >= INCIDENT_CONTENTION_RETRIES {
                    return Err(err.into());
                }
                tracing::debug!(
                    event = "incident_contention_retry",
                    target_id = %target.id,
                    attempt,
                    "retrying incident transition after contention"
                );
            }
        }
    }
}

async fn persist_once(
    pool: &PgPool,
    scheduler_id: Uuid,
    target: &Target,
    result: &crate::models::CheckResult,
) -> Result<Option<AlertEvent>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO check_results (target_id, status, http_status, latency_ms, error, checked_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(target.id)
    .bind(result.status)
    .bind(result.http_status)
    .bind(result.latency_ms)
    .bind(&result.error)
    .bind(result.checked_at)
    .execute(&mut *tx)
    .await?;

    let transition =
        incidents::apply_transition(&mut tx, target.id, result.status, result.checked_at).await?;

    scheduler::complete(
        &mut tx,
        scheduler_id,
        result.checked_at,
        target.check_interval_sec,
    )
    .await?;

    let alert = match transition {
        Transition::Opened(incident) => Some(AlertEvent {
            target_id: target.id,
            target_name: target.name.clone(),
            url: target.url.clone(),
            status: result.status,
            previous_status: None,
            incident_id: Some(incident.id),
            checked_at: result.checked_at,
            started_at: Some(incident.start_ts),
            ended_at: None,
            error: result.error.clone(),
        }),
        Transition::Closed(incident) => Some(AlertEvent {
            target_id: target.id,
            target_name: target.name.clone(),
            url: target.url.clone(),
            status: result.status,
            previous_status: Some(uptime_core::Status::Down),
            incident_id: Some(incident.id),
            checked_at: result.checked_at,
            started_at: Some(incident.start_ts),
            ended_at: incident.end_ts,
            error: None,
        }),
        Transition::StillFailing(_) | Transition::NoChange => None,
    };

    tx.commit().await?;

    Ok(alert)
}
