use std::net::SocketAddr;
use std::sync::Arc;

use benchyard_core::provisioning::{ProvisionerCredentials, TerraformProvisioner};
use benchyard_github::{CommentNotifier, GitHubApi, GitHubConfig};
use benchyard_runner::jobs::lifecycle_scheduler;
use benchyard_runner::{RunLifecycle, RunnerConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use benchyard_api::config::ServerConfig;
use benchyard_api::router::build_app_router;
use benchyard_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "benchyard_api=debug,benchyard_runner=debug,benchyard_core=debug,tower_http=debug"
                    .into()
            }),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    let runner_config = RunnerConfig::from_env();
    tracing::info!(
        storage_dir = %runner_config.storage_dir.display(),
        tick_secs = runner_config.tick_interval.as_secs(),
        "Loaded runner configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = benchyard_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    benchyard_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    benchyard_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Notifications ---
    let notifier = Arc::new(CommentNotifier::new(
        pool.clone(),
        GitHubApi::new(GitHubConfig::from_env()),
    ));

    // --- Run lifecycle ---
    let provisioner = TerraformProvisioner::new(
        runner_config.terraform_bin.clone(),
        ProvisionerCredentials::from_env(),
    );
    let extraction_cancel = CancellationToken::new();
    let lifecycle = Arc::new(
        RunLifecycle::new(
            pool.clone(),
            provisioner,
            Arc::clone(&notifier),
            runner_config.storage_dir.clone(),
        )
        .with_cancellation(extraction_cancel.clone()),
    );
    let scheduler = lifecycle_scheduler(lifecycle, runner_config.tick_interval).start();
    tracing::info!("Run scheduler started");

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        notifier,
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // A tick in progress finishes its provisioning step; only extraction
    // is abortable.
    extraction_cancel.cancel();
    scheduler.shutdown().await;
    tracing::info!("Run scheduler stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT, starting graceful shutdown"),
        () = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}
