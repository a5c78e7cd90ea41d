//! Application services wiring the domain to the session port.

/// Per-token authorization workflow.
pub mod authorize;

/// Event routing over the shared stream.
pub mod classify;

/// One-shot reference data request dispatch.
pub mod dispatch;
