//! Tracing Initialization
//!
//! Structured logging setup for the gateway binary.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Log filter directives (default: `info`)

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Default filter when `RUST_LOG` is not set.
const DEFAULT_DIRECTIVES: &str = "info,entitlement_gateway=info";

/// Initialize the tracing subscriber.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
