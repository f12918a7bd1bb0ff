use anyhow::{Context, Result};
use axum::serve;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use storefront_auth::core::config::Config;
use storefront_auth::core::startup::apply_wal_operations;
use storefront_auth::core::state::AppState;
use storefront_auth::core::{routes, tracing_init};
use storefront_auth::security::rate_limiter::RateLimiter;
use storefront_auth::services::bootstrap::{provision_super_admin, BootstrapOutcome};
use storefront_auth::utils::time::current_timestamp;
use storefront_auth::wal::wal::Wal;
use tokio::net::TcpListener;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{debug, error, info, Level};

enum Command {
    Serve,
    Bootstrap,
}

fn main() -> Result<()> {
    let mut args: Vec<String> = env::args().skip(1).collect();

    let command = if args.first().map(String::as_str) == Some("bootstrap") {
        args.remove(0);
        Command::Bootstrap
    } else {
        Command::Serve
    };

    let config_path = args
        .first()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    // Load and validate configuration
    let config = Config::from_file(&config_path).context(format!(
        "Failed to load configuration from '{}'. \
        If this is your first run, copy config.example.toml to config.toml and adjust the values.",
        config_path.display()
    ))?;

    tracing_init::init_tracing(&config.logging)?;

    let state = load_state(config.clone())?;

    match command {
        Command::Bootstrap => run_bootstrap(&state, &config),
        Command::Serve => {
            // Build Tokio runtime with configured number of threads
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(config.server.num_threads)
                .enable_all()
                .build()
                .context("Failed to build Tokio runtime")?;

            runtime.block_on(async_main(state, config, config_path))
        }
    }
}

/// Open the WAL and rebuild the stores from it
fn load_state(config: Config) -> Result<AppState> {
    let wal = Wal::new(config.storage.wal_path.clone()).context("Failed to initialize WAL")?;
    info!(wal_path = %wal.path().display(), "WAL initialized");

    let state = AppState::new(config, wal);

    let operations = state.wal.replay().context("Failed to replay WAL")?;
    apply_wal_operations(&state, &operations);

    Ok(state)
}

fn run_bootstrap(state: &AppState, config: &Config) -> Result<()> {
    match provision_super_admin(state, &config.bootstrap)? {
        BootstrapOutcome::Created(user) => {
            info!(user_id = %user.id, email = %user.email, "Super admin provisioned");
        }
        BootstrapOutcome::AlreadyProvisioned => {
            info!("Super admin already present, nothing to do");
        }
    }
    Ok(())
}

async fn async_main(state: AppState, config: Config, config_path: PathBuf) -> Result<()> {
    info!(
        config_path = %config_path.display(),
        host = %config.server.host,
        port = config.server.port,
        num_threads = config.server.num_threads,
        log_level = %config.logging.level,
        log_format = %config.logging.format,
        users = state.users.len(),
        tokens = state.tokens.len(),
        "Storefront auth service starting"
    );

    spawn_cleanup_task(Arc::clone(&state.login_limiter), 60);

    // Build the router with middleware
    let app = routes::build_router(Arc::new(state)).layer(
        ServiceBuilder::new().layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        ),
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .context(format!("Failed to bind TCP listener to {}", addr))?;

    info!(address = %addr, "Listening");

    serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Shutting down gracefully");

    Ok(())
}

/// Periodically drop expired login-attempt windows
fn spawn_cleanup_task(limiter: Arc<RateLimiter<String>>, cleanup_interval: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(cleanup_interval));

        loop {
            interval.tick().await;

            let before = limiter.len();
            limiter.cleanup_old_entries(current_timestamp());
            debug!(
                removed = before.saturating_sub(limiter.len()),
                remaining = limiter.len(),
                "Login limiter cleanup completed"
            );
        }
    });
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Shutdown signal received, starting graceful shutdown");
}
