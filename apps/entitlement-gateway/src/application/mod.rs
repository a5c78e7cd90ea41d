//! Application layer - Use cases and port definitions.

/// Session port consumed by the services.
pub mod ports;

/// Authorization, dispatch, and classification services.
pub mod services;
