//! Infrastructure layer - Adapters and external integrations.

/// Configuration loading.
pub mod config;

/// Tracing initialization.
pub mod telemetry;

/// WebSocket upstream session.
pub mod upstream;
