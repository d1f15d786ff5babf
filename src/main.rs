use role_gate::{
    AppState,
    auth::CredentialMode,
    config::{AppConfig, Env},
    create_router,
};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration (failing fast on a bad policy), initializes logging and
/// serves the gated router.
#[tokio::main]
async fn main() {
    // 1. Configuration
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging filter, RUST_LOG wins when set.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "role_gate=debug,tower_http=info,axum=info".into());

    // 3. Pretty logs locally, JSON in production.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Gate starting in {:?} mode", config.env);
    tracing::info!(
        protected_areas = config.policy.protected().entries().len(),
        matcher_patterns = config.policy.matcher().len(),
        credential_mode = ?config.credentials.mode,
        "Gate policy loaded"
    );
    if config.env == Env::Production && config.credentials.mode == CredentialMode::Cookie {
        tracing::warn!(
            "Role claims are read from unsigned cookies; set GATE_CREDENTIAL_MODE=bearer_jwt to verify them"
        );
    }

    // 4. Router and server
    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState::new(config));

    let listener = TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("FATAL: failed to bind {bind_addr}: {e}"));

    tracing::info!("Listening on {}", bind_addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server terminated");
    }
}
