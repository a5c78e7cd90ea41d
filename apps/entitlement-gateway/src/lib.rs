#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Entitlement Gateway - Multi-Identity Data Distribution
//!
//! A gateway service that authorizes a set of subscriber tokens against an
//! upstream authorization service, issues a single reference data request
//! over one shared session using its own credentials, and re-checks each
//! subscriber's entitlements per returned security before announcing
//! delivery.
//!
//! # Layers (inside -> outside)
//!
//! - **Domain**: Core types and entitlement logic
//!   - `identity`: Tokens, identities, and the registry
//!   - `event`: Typed session events and messages
//!   - `entitlement`: Per-subscriber evaluation and outcome reporting
//!   - `request`: Upstream request types
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: The session capability consumed by the services
//!   - `services`: Authorization workflow, request dispatch, event routing
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `upstream`: WebSocket session with correlation-keyed demultiplexing
//!   - `config`: Environment-based configuration
//!   - `telemetry`: Structured logging setup
//!
//! # Data Flow
//!
//! ```text
//!            tokens                       securities
//!              |                               |
//!              v                               v
//!      +---------------+  identities +------------------+
//!      | Authorization |------------>|     Request      |
//!      |   Workflow    |  registry   |    Dispatcher    |
//!      +---------------+             +------------------+
//!              ^                               |
//!              ^                               v
//!              |  dedicated queues      shared stream
//!      +-----------------------------------------------+
//!      |              Upstream Session (WS)            |
//!      +-----------------------------------------------+
//!                                              |
//!                                              v
//!                                     +----------------+
//!                                     |   Classifier   |
//!                                     +----------------+
//!                                              |
//!                                              v
//!                                     +----------------+
//!                                     |  Distributor   |--> outcomes
//!                                     +----------------+
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core types and entitlement logic.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::entitlement::{
    DistributionError, DistributionOutcome, DistributionSink, Distributor, LogSink,
};
pub use domain::event::{
    CorrelationId, Event, EventType, Message, MessageContents, ResponseError, SecurityRecord,
};
pub use domain::identity::{
    AuthorizationState, Eid, Identity, IdentityRegistry, RegistryEntry, ServiceName, Token,
};
pub use domain::request::{
    APIAUTH_SERVICE, AuthorizationRequest, REFDATA_SERVICE, ReferenceDataRequest,
};

// Application services
pub use application::ports::{EventQueue, SessionError, UpstreamSession};
pub use application::services::authorize::AuthorizationWorkflow;
pub use application::services::classify::EventClassifier;
pub use application::services::dispatch::RequestDispatcher;

// Infrastructure
pub use infrastructure::config::{ConfigError, GatewayConfig};
pub use infrastructure::upstream::{JsonCodec, RequestFrame, SessionConfig, WsSession};
