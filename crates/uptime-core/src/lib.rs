//! Shared contracts for the uptime monitor core.
//!
//! This crate plays the same role `trace-core` plays for the dispatch
//! harness it was adapted from: a small set of cross-binary contracts
//! (here, just the notifier capability and the error/status types that
//! flow through it), with all business logic and I/O living in the
//! binary crate that consumes it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error {
    inner: anyhow::Error,
}

impl Error {
    pub fn msg(message: impl Into<String>) -> Self {
        Self {
            inner: anyhow::anyhow!(message.into()),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source()
    }
}

impl From<anyhow::Error> for Error {
    fn from(value: anyhow::Error) -> Self {
        Self { inner: value }
    }
}

impl From<sqlx::Error> for Error {
    fn from(value: sqlx::Error) -> Self {
        Self {
            inner: anyhow::Error::from(value),
        }
    }
}

/// Up/down classification of a single probe, per §3 of the spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "status_enum", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Up,
    Down,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Up => write!(f, "UP"),
            Status::Down => write!(f, "DOWN"),
        }
    }
}

/// Payload handed to every registered [`Notifier`] on an incident transition.
///
/// Carries both the old and new status so an adapter can render "recovered"
/// vs. "down" messages without re-querying the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEvent {
    pub target_id: Uuid,
    pub target_name: String,
    pub url: String,
    pub status: Status,
    pub previous_status: Option<Status>,
    pub incident_id: Option<Uuid>,
    pub checked_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// A capability that can deliver an [`AlertEvent`] somewhere external.
///
/// Replaces the duck-typed notifier wiring of the source system (§9):
/// adapters are registered in an explicit ordered list and called
/// sequentially. A failing adapter must not prevent the rest of the
/// registry from running, and must never propagate back into the
/// transaction that produced the event — see `harness::notifier`.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, event: &AlertEvent) -> Result<()>;
}
