//! Configuration loading for the gateway.

mod settings;

pub use settings::{
    ConfigError, DEFAULT_AUTH_TIMEOUT, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_SECURITY,
    GatewayConfig,
};
