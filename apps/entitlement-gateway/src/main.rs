//! Entitlement Gateway Binary
//!
//! Starts the gateway: authorizes every configured subscriber token,
//! issues the single reference data request, and distributes entitled
//! securities until the stream ends or the process is interrupted.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin entitlement-gateway
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `GATEWAY_TOKENS`: Comma-separated subscriber tokens
//!
//! ## Optional
//! - `GATEWAY_SECURITIES`: Comma-separated securities (default: "MSFT US Equity")
//! - `GATEWAY_HOST`: Upstream host (default: localhost)
//! - `GATEWAY_PORT`: Upstream port (default: 8194)
//! - `GATEWAY_AUTH_TIMEOUT_SECS`: Per-token authorization timeout (default: 10)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;

use entitlement_gateway::infrastructure::telemetry;
use entitlement_gateway::{
    APIAUTH_SERVICE, AuthorizationWorkflow, ConfigError, Distributor, EventClassifier,
    GatewayConfig, IdentityRegistry, LogSink, REFDATA_SERVICE, RequestDispatcher, SessionConfig,
    UpstreamSession, WsSession,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("entitlement-gateway {}", env!("CARGO_PKG_VERSION"));

    load_dotenv();
    telemetry::init();

    let config = match GatewayConfig::from_env() {
        Ok(config) => config,
        Err(ConfigError::MissingTokens) => {
            tracing::error!("no tokens were specified");
            return Ok(());
        }
    };
    log_config(&config);

    let shutdown_token = CancellationToken::new();
    spawn_shutdown_watcher(shutdown_token.clone());

    let session_config = SessionConfig::new(&config.host, config.port);
    let session = match WsSession::connect(session_config, shutdown_token.clone()).await {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(error = %e, "failed to start session");
            return Ok(());
        }
    };

    // Teardown is guaranteed on every exit path, including mid-authorization
    // and mid-processing.
    let result = run(&session, &config, &shutdown_token).await;
    session.stop().await;

    tracing::info!("gateway stopped");
    result
}

/// Open services, authorize subscribers, request data, and distribute
/// until the stream ends or the run is cancelled.
async fn run(
    session: &WsSession,
    config: &GatewayConfig,
    shutdown_token: &CancellationToken,
) -> anyhow::Result<()> {
    for service in [APIAUTH_SERVICE, REFDATA_SERVICE] {
        if let Err(e) = session.open_service(service).await {
            tracing::error!(service, error = %e, "failed to open service");
            return Ok(());
        }
    }

    let registry = Arc::new(IdentityRegistry::new());
    let workflow = AuthorizationWorkflow::with_timeout(session, config.auth_timeout);

    let any_authorized = tokio::select! {
        result = workflow.authorize_all(&config.tokens, &registry) => result?,
        () = shutdown_token.cancelled() => {
            tracing::info!("interrupted during authorization");
            return Ok(());
        }
    };

    if !any_authorized {
        tracing::warn!("no token was authorized; not requesting data");
        return Ok(());
    }

    RequestDispatcher::new(session)
        .send_reference_data_request(&config.securities)
        .await?;

    let classifier = EventClassifier::new(Distributor::new(registry, LogSink));

    loop {
        tokio::select! {
            () = shutdown_token.cancelled() => {
                tracing::info!("interrupt received, stopping");
                return Ok(());
            }
            event = session.next_event() => {
                let Some(event) = event else {
                    tracing::warn!("session event stream ended");
                    return Ok(());
                };
                classifier.handle(&event);
            }
        }
    }
}

/// Cancel the shutdown token on SIGINT or SIGTERM.
fn spawn_shutdown_watcher(shutdown_token: CancellationToken) {
    tokio::spawn(async move {
        await_shutdown_signal().await;
        shutdown_token.cancel();
    });
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Log the parsed configuration. Token values are never logged.
fn log_config(config: &GatewayConfig) {
    tracing::info!(
        host = %config.host,
        port = config.port,
        securities = ?config.securities,
        subscribers = config.tokens.len(),
        auth_timeout_secs = config.auth_timeout.as_secs(),
        "Configuration loaded"
    );
}
