use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

mod api;
mod availability;
mod config;
mod constants;
mod incidents;
mod migrate;
mod models;
mod notifier;
mod probe;
mod scheduler;
mod worker;

#[derive(Parser, Debug)]
#[command(name = "uptime-monitor")]
#[command(about = "HTTP uptime monitor: scheduler, prober, and read API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run database migrations.
    Migrate,

    /// Run the probe worker loop (scheduler + executor + incident tracker).
    Worker,

    /// Run the read-only REST API.
    Api,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = config::MonitorConfig::from_env().context("load monitor config")?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&cfg.database_url)
        .await
        .context("connect to database")?;

    match cli.command {
        Command::Migrate => migrate::run(&pool).await,
        Command::Worker => {
            let notifiers = notifier::build(&cfg);
            worker::run(pool, Arc::new(cfg), notifiers).await
        }
        Command::Api => {
            let state = Arc::new(api::AppState { pool });
            let router = api::build_router(state);
            let listener = tokio::net::TcpListener::bind(&cfg.api_bind)
                .await
                .with_context(|| format!("bind api on {}", cfg.api_bind))?;
            tracing::info!(event = "api_started", bind = %cfg.api_bind, "read api started");
            axum::serve(listener, router).await.context("serve api")
        }
    }
}
