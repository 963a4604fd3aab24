use clap::Parser;
use healthwatch::db::services::{SeaOrmCheckRepository, init_schema_with_retry};
use healthwatch::monitor::probe::HttpProber;
use healthwatch::monitor::scheduler::{CycleOutcome, PollScheduler};
use healthwatch::monitor::state::MonitorState;
use healthwatch::monitor::targets::TargetRegistry;
use healthwatch::server::config::MonitorConfig;
use healthwatch::version::VERSION;
use healthwatch::web::{AppState, create_axum_router};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

fn init_logging(log_dir: &str) {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily(log_dir, "monitor.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sea_orm=warn,sqlx::query=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler.");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler.");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received.");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if std::env::args().any(|arg| arg == "--version") {
        println!("Monitor version: {VERSION}");
        return Ok(());
    }

    let args = Args::parse();

    // Configuration decides where logs go, so it is read before logging starts.
    let config = match MonitorConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load monitor configuration: {e}");
            return Err(e.into());
        }
    };

    init_logging(&config.log_dir);
    info!(version = VERSION, "Starting monitor.");

    // --- Database Pool Setup ---
    // Lazy so a database that is still booting is handled by the schema retry below.
    let mut opt = ConnectOptions::new(config.database_url.clone());
    opt.max_connections(config.max_db_connections)
        .connect_lazy(true)
        .sqlx_logging(false);
    let db_pool: Arc<DatabaseConnection> = Arc::new(Database::connect(opt).await?);

    let repository = Arc::new(SeaOrmCheckRepository::new(db_pool.clone()));
    if !init_schema_with_retry(
        repository.as_ref(),
        config.db_init_attempts,
        config.db_init_backoff,
    )
    .await
    {
        warn!("Monitor is running without a confirmed database schema.");
    }

    // --- Poll Scheduler Setup ---
    let targets = TargetRegistry::new(config.targets.clone());
    for target in targets.iter() {
        info!(service = %target.name, url = %target.url, "Monitoring target.");
    }
    let prober = Arc::new(HttpProber::new(config.probe_timeout)?);
    let state = Arc::new(MonitorState::new(targets.clone(), repository.clone()));
    let scheduler = Arc::new(PollScheduler::new(state, prober, config.poll_interval));

    // The first cycle completes before the API starts answering.
    if let CycleOutcome::Completed { checked } = scheduler.poll_all().await {
        info!(checked, "Initial poll cycle finished.");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poll_task = tokio::spawn(scheduler.clone().run(shutdown_rx));

    // --- Axum HTTP Server Setup ---
    let app = create_axum_router(AppState {
        repository: repository.clone(),
        targets,
        display_offset: config.display_offset,
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(address = %config.bind_addr, "Status API listening.");

    let serve_result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // Stop polling before the pool goes away.
    if shutdown_tx.send(true).is_err() {
        warn!("Poll scheduler already stopped.");
    }
    if let Err(e) = poll_task.await {
        error!(error = %e, "Poll scheduler task failed.");
    }
    // The router, scheduler and repository all hold the pool; release them first.
    drop(scheduler);
    drop(repository);
    match Arc::try_unwrap(db_pool) {
        Ok(db) => {
            if let Err(e) = db.close().await {
                error!(error = %e, "Failed to close database pool.");
            }
        }
        Err(_) => warn!("Database pool still in use at shutdown; leaving it to drop."),
    }

    serve_result?;
    info!("Monitor stopped.");
    Ok(())
}
