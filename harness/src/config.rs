use clap::Parser;

/// Monitor configuration.
///
/// Idiomatic Rust notes:
/// - Prefer explicit types over loosely-typed maps for config.
/// - Parse once at startup; pass `&MonitorConfig` through.
/// - Avoid global mutable state.
#[derive(Parser, Debug, Clone)]
pub struct MonitorConfig {
    /// Postgres connection string. Must support row-level locking with
    /// SKIP LOCKED semantics (§6).
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Per-worker in-flight probe ceiling.
    #[arg(long, env = "CHECKER_CONCURRENCY", default_value_t = 20)]
    pub checker_concurrency: usize,

    /// Idle-poll delay (seconds) when no work is due.
    #[arg(long, env = "POLL_INTERVAL_SEC", default_value_t = 1.0)]
    pub poll_interval_sec: f64,

    /// Lifetime (seconds) of an acquired scheduler lease.
    #[arg(long, env = "LEASE_TIMEOUT_SEC", default_value_t = 30.0)]
    pub lease_timeout_sec: f64,

    /// Maximum rows per `acquire()` call.
    #[arg(long, env = "FETCH_BATCH_SIZE", default_value_t = 100)]
    pub fetch_batch_size: i64,

    /// REST API bind address (the read layer of §6).
    #[arg(long, env = "API_BIND", default_value = "0.0.0.0:8080")]
    pub api_bind: String,

    #[arg(long, env = "TELEGRAM_BOT_TOKEN")]
    pub telegram_bot_token: Option<String>,

    #[arg(long, env = "TELEGRAM_CHAT_ID")]
    pub telegram_chat_id: Option<String>,

    #[arg(long, env = "TELEGRAM_PARSE_MODE", default_value = "Markdown")]
    pub telegram_parse_mode: String,
}

impl MonitorConfig {
    /// Parse config from environment only (no CLI parsing).
    ///
    /// We intentionally parse from a single fake argv element so clap
    /// doesn't try to interpret the binary's subcommand flags here.
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self::parse_from(["uptime-monitor"]))
    }
}
