use api::state::{AppState, build_store};
use services::scheduler::{AutoLockPoller, RetentionSweeper};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tracing_appender::rolling;
use util::config;

#[tokio::main]
async fn main() {
    // Load configuration and initialize logging
    let _log_guard = init_logging(&config::log_file(), &config::log_level());

    // Compose the store and services
    let store = match build_store(config::store_backend(), &config::database_path()).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Failed to open the realtime store: {e}");
            std::process::exit(1);
        }
    };
    let app_state = AppState::from_config(store);

    // Background jobs
    spawn_background_jobs(&app_state);

    let app = api::app(app_state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config::host(), config::port())
        .parse()
        .expect("Invalid address");

    tracing::info!(
        "Starting {} ({}) on http://{}",
        config::project_name(),
        config::env(),
        addr
    );

    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app,
    )
    .await
    .expect("Server crashed");
}

fn init_logging(log_file: &str, log_level: &str) -> tracing_appender::non_blocking::WorkerGuard {
    use std::fs;
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    fs::create_dir_all("logs").ok();

    let file_appender = rolling::daily("logs", log_file);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true);

    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_target(true)
        .with_thread_ids(true);

    let env_filter = EnvFilter::try_new(log_level)
        .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_LEVEL));

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer);

    if config::log_to_stdout() {
        registry.with(stdout_layer).init();
    } else {
        registry.init();
    }

    guard
}

fn spawn_background_jobs(app_state: &AppState) {
    AutoLockPoller::new(
        app_state.lifecycle().clone(),
        Arc::new(app_state.enrollment().clone()),
        Duration::from_secs(config::auto_lock_poll_seconds().max(1)),
    )
    .spawn();

    RetentionSweeper::new(
        app_state.lifecycle().clone(),
        config::retention_days(),
        Duration::from_secs(config::retention_sweep_minutes().max(1) * 60),
    )
    .spawn();
}
