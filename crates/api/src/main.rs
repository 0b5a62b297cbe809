use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tollgate_api::auth::jwt::CredentialIssuer;
use tollgate_api::auth::oauth::{GoogleOAuthConfig, GoogleOAuthProvider};
use tollgate_api::auth::orchestrator::LoginOrchestrator;
use tollgate_api::auth::password::Argon2Encrypter;
use tollgate_api::config::ServerConfig;
use tollgate_api::router::build_app_router;
use tollgate_api::state::AppState;
use tollgate_cache::{OneTimeStateStore, RedisCache, RevocationBlacklist};
use tollgate_core::cache::CacheStore;
use tollgate_core::store::TransactionCoordinator;
use tollgate_db::PgCoordinator;

const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tollgate_api=debug,tower_http=debug".into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    let pool = tollgate_db::create_pool(&database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connection pool created");

    tollgate_db::health_check(&pool)
        .await
        .context("Database health check failed")?;

    tollgate_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    let store: Arc<dyn TransactionCoordinator> = Arc::new(PgCoordinator::new(pool));

    // --- Cache ---
    let redis_url = std::env::var("REDIS_URL").unwrap_or_else(|_| DEFAULT_REDIS_URL.into());
    let cache: Arc<dyn CacheStore> = Arc::new(
        RedisCache::connect(&redis_url)
            .await
            .context("Failed to connect to Redis")?,
    );
    cache.ping().await.context("Redis health check failed")?;
    tracing::info!("Redis connection established");

    // --- Login orchestrator ---
    let mut orchestrator = LoginOrchestrator::new(
        Arc::clone(&store),
        CredentialIssuer::new(config.jwt.clone()),
        RevocationBlacklist::new(Arc::clone(&cache)),
        OneTimeStateStore::new(Arc::clone(&cache), config.auth.oauth_state_ttl()),
        Arc::new(Argon2Encrypter),
        config.auth.session_policy(),
    );
    match GoogleOAuthConfig::from_env() {
        Some(google) => {
            let provider =
                GoogleOAuthProvider::new(google).context("Failed to set up Google login")?;
            orchestrator = orchestrator.with_provider(Arc::new(provider));
            tracing::info!("Google login enabled");
        }
        None => tracing::info!("Google login disabled (GOOGLE_* not set)"),
    }

    // --- App state ---
    let shutdown = CancellationToken::new();
    let state = AppState {
        config: Arc::new(config.clone()),
        auth: Arc::new(orchestrator),
        store,
        cache,
        shutdown: shutdown.clone(),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().context("Invalid HOST address")?,
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    let drain_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown, drain_timeout))
    .await
    .context("Server error")?;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Once the signal arrives, in-flight requests get `drain_timeout` to finish
/// before `shutdown` is cancelled, which aborts their store and cache calls.
async fn shutdown_signal(shutdown: CancellationToken, drain_timeout: Duration) {
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
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }

    tokio::spawn(async move {
        tokio::time::sleep(drain_timeout).await;
        tracing::warn!("Drain timeout elapsed, cancelling in-flight requests");
        shutdown.cancel();
    });
}
