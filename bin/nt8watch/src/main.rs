use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use common::{Config, APP_NAME};
use matcher::PatternSet;
use monitor::StatusMonitor;
use notify::Mailer;
use publish::SupabasePublisher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let config_path =
        std::env::var("NT8WATCH_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let cfg = Config::load(Path::new(&config_path));
    info!(
        config = %config_path,
        log_dir = %cfg.watch.log_dir.display(),
        snapshot = %cfg.watch.status_json_path.display(),
        "{APP_NAME} starting"
    );

    // ── Patterns ──────────────────────────────────────────────────────────────
    let patterns =
        PatternSet::compile(&cfg.patterns).context("Failed to compile status patterns")?;

    // ── Collaborators ─────────────────────────────────────────────────────────
    let publisher = Arc::new(SupabasePublisher::from_config(&cfg.supabase));
    let mut monitor =
        StatusMonitor::new(cfg.watch.clone(), patterns).with_publisher(publisher);
    if cfg.watch.email_on_change {
        let mailer = Mailer::from_config(&cfg.email).context("Invalid email configuration")?;
        monitor = monitor.with_notifier(Arc::new(mailer));
    }

    // ── Run ───────────────────────────────────────────────────────────────────
    tokio::spawn(monitor.run());

    info!("Monitor started. Waiting for shutdown signal.");
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting.");
    Ok(())
}
