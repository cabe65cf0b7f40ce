//! Executable entry point: wires [`realtime_core`]'s Push and Store engines
//! to [`realtime_client_api`]'s fixed HTTP surface and serves it.

mod config_file;

use anyhow::Context;
use clap::Parser;
use config_file::FileConfig;
use realtime_client_api::{router, AppState};
use realtime_core::{Config, PushCore, StoreCore};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// A single realtime push/store instance.
///
/// Configuration is layered: compiled-in defaults < `--config` TOML file <
/// these flags. A flag left unset falls through to the file, then to the
/// default; `db_path` alone has no default and must come from one of the
/// two.
#[derive(Parser, Debug)]
#[command(name = "realtime-standalone", version, about)]
struct Options {
    /// Optional TOML file supplying any of the settings below.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:8080")]
    listen_addr: SocketAddr,

    /// Directory holding one durable store per domain.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Seconds of heartbeat silence before a client is implicitly disconnected.
    #[arg(long)]
    client_timeout: Option<u64>,

    /// Seconds a `/receive` call blocks before returning an empty body.
    #[arg(long)]
    receive_timeout: Option<u64>,

    /// Seconds between liveness sweeps of every active domain's subscribers.
    #[arg(long)]
    check_period: Option<u64>,

    /// URL prefix for the Push (long-poll) endpoints.
    #[arg(long)]
    comet_prefix: Option<String>,

    /// URL prefix for the Store (key-value) endpoints.
    #[arg(long)]
    store_prefix: Option<String>,
}

/// Merges `opts` over `file` over the compiled-in defaults from
/// [`Config::new`], then validates the result.
fn build_config(opts: &Options, file: FileConfig) -> anyhow::Result<Config> {
    let db_path = opts
        .db_path
        .clone()
        .or(file.db_path)
        .context("db_path must be set via --db-path or the config file")?;

    let mut config = Config::new(db_path);
    if let Some(secs) = opts.client_timeout.or(file.client_timeout) {
        config = config.with_client_timeout(Duration::from_secs(secs));
    }
    if let Some(secs) = opts.receive_timeout.or(file.receive_timeout) {
        config = config.with_receive_timeout(Duration::from_secs(secs));
    }
    if let Some(secs) = opts.check_period.or(file.check_period) {
        config = config.with_check_period(Duration::from_secs(secs));
    }
    if let Some(prefix) = opts.comet_prefix.clone().or(file.comet_prefix) {
        config = config.with_comet_prefix(prefix);
    }
    if let Some(prefix) = opts.store_prefix.clone().or(file.store_prefix) {
        config = config.with_store_prefix(prefix);
    }
    config.validate().map_err(anyhow::Error::msg)?;
    Ok(config)
}

fn configure_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    configure_tracing();

    let opts = Options::parse();
    let file = match &opts.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let config = build_config(&opts, file)?;

    let push = Arc::new(PushCore::new(config.client_timeout, config.receive_timeout, config.hooks.clone()));
    let store = StoreCore::new(push.clone(), &config);
    let app = router(&config, AppState { push, store: store.clone() });

    let listener = tokio::net::TcpListener::bind(opts.listen_addr)
        .await
        .with_context(|| format!("failed to bind to {}", opts.listen_addr))?;
    tracing::info!(addr = %opts.listen_addr, db_path = %config.db_path.display(), "realtime-standalone listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("shutting down domain workers");
    store.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received SIGINT, shutting down");
        }
        _ = async {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{signal, SignalKind};
                let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
                sigterm.recv().await;
            }
            #[cfg(not(unix))]
            std::future::pending::<()>().await;
        } => {
            tracing::info!("received SIGTERM, shutting down");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Options::command().debug_assert();
    }

    #[test]
    fn db_path_is_required_from_cli_or_file() {
        let opts = Options::try_parse_from(["realtime-standalone"]).unwrap();
        let err = build_config(&opts, FileConfig::default()).unwrap_err();
        assert!(err.to_string().contains("db_path"));
    }

    #[test]
    fn cli_flags_win_over_the_file() {
        let opts = Options::try_parse_from(["realtime-standalone", "--db-path", "/tmp/a", "--client-timeout", "45"]).unwrap();
        let file = FileConfig {
            db_path: Some("/tmp/b".into()),
            client_timeout: Some(10),
            ..Default::default()
        };
        let config = build_config(&opts, file).unwrap();
        assert_eq!(config.db_path, std::path::Path::new("/tmp/a"));
        assert_eq!(config.client_timeout, Duration::from_secs(45));
    }

    #[test]
    fn file_fills_in_what_the_cli_leaves_unset() {
        let opts = Options::try_parse_from(["realtime-standalone"]).unwrap();
        let file = FileConfig {
            db_path: Some("/tmp/b".into()),
            receive_timeout: Some(5),
            ..Default::default()
        };
        let config = build_config(&opts, file).unwrap();
        assert_eq!(config.db_path, std::path::Path::new("/tmp/b"));
        assert_eq!(config.receive_timeout, Duration::from_secs(5));
        assert_eq!(config.client_timeout, Duration::from_secs(60));
    }

    #[test]
    fn parses_documented_defaults_when_unset() {
        let opts = Options::try_parse_from(["realtime-standalone", "--db-path", "/tmp/db"]).unwrap();
        let config = build_config(&opts, FileConfig::default()).unwrap();
        assert_eq!(config.client_timeout, Duration::from_secs(60));
        assert_eq!(config.receive_timeout, Duration::from_secs(20));
        assert_eq!(config.check_period, Duration::from_secs(60));
        assert_eq!(config.comet_prefix, "/comet");
        assert_eq!(config.store_prefix, "/dictionary");
    }
}
