//! Subscriber Identity Types
//!
//! Domain types for the subscribers the gateway distributes data to.
//! A subscriber starts as an opaque bearer [`Token`], is exchanged for an
//! [`Identity`] by the authorization workflow, and is tracked for the
//! lifetime of the session by the [`IdentityRegistry`].
//!
//! # Design
//!
//! The registry keeps exactly one entry per supplied token, in token input
//! order, whether or not authorization succeeded. Positional subscriber
//! numbering ("User 1", "User 2", ...) derives from the registry index, so
//! insertion order must be stable and reproducible. Identities are never
//! mutated after authorization completes.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;

// =============================================================================
// Types
// =============================================================================

/// An entitlement identifier attached to a security record.
///
/// EIDs are opaque to the gateway: they are compared for membership against
/// an identity's granted set and otherwise only reported in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Eid(pub u32);

impl std::fmt::Display for Eid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of an upstream service (e.g. `//feed/refdata`).
pub type ServiceName = String;

// =============================================================================
// Token
// =============================================================================

/// Opaque bearer credential identifying one prospective subscriber.
///
/// Tokens are issued out-of-band and exchanged for an [`Identity`] through
/// the authorization workflow. The `Debug` implementation redacts the value
/// for safe logging.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    /// Create a token from its raw value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the raw token value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Token").field(&"[REDACTED]").finish()
    }
}

// =============================================================================
// Identity
// =============================================================================

/// An authenticated subscriber principal.
///
/// Holds the entitlement grants returned by the authorization service,
/// keyed by owning service. Immutable after creation; the only operations
/// the gateway performs against an identity are the two entitlement checks
/// below.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    grants: HashMap<ServiceName, HashSet<Eid>>,
}

impl Identity {
    /// Build an identity from the grants carried in an authorization
    /// success message.
    #[must_use]
    pub fn from_grants(grants: HashMap<ServiceName, Vec<Eid>>) -> Self {
        Self {
            grants: grants
                .into_iter()
                .map(|(service, eids)| (service, eids.into_iter().collect()))
                .collect(),
        }
    }

    /// Check whether this identity holds every entitlement in `eids` under
    /// `service`.
    #[must_use]
    pub fn has_entitlements(&self, service: &str, eids: &[Eid]) -> bool {
        self.grants
            .get(service)
            .is_some_and(|granted| eids.iter().all(|eid| granted.contains(eid)))
    }

    /// The entries of `eids` this identity is missing under `service`, in
    /// the order they were requested.
    #[must_use]
    pub fn failed_entitlements(&self, service: &str, eids: &[Eid]) -> Vec<Eid> {
        match self.grants.get(service) {
            Some(granted) => eids
                .iter()
                .filter(|eid| !granted.contains(eid))
                .copied()
                .collect(),
            None => eids.to_vec(),
        }
    }
}

// =============================================================================
// Registry Entries
// =============================================================================

/// Outcome of the authorization exchange for one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationState {
    /// The token authorized successfully and produced an identity.
    Authorized(Identity),
    /// The token failed authorization; no identity is available.
    Failed,
}

/// One registry slot: the supplied token plus its authorization outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    token: Token,
    state: AuthorizationState,
}

impl RegistryEntry {
    /// Create an entry for a token that authorized successfully.
    #[must_use]
    pub const fn authorized(token: Token, identity: Identity) -> Self {
        Self {
            token,
            state: AuthorizationState::Authorized(identity),
        }
    }

    /// Create an entry for a token that failed authorization.
    #[must_use]
    pub const fn unauthorized(token: Token) -> Self {
        Self {
            token,
            state: AuthorizationState::Failed,
        }
    }

    /// The token this entry was created for.
    #[must_use]
    pub const fn token(&self) -> &Token {
        &self.token
    }

    /// Whether authorization succeeded for this entry.
    #[must_use]
    pub const fn is_authorized(&self) -> bool {
        matches!(self.state, AuthorizationState::Authorized(_))
    }

    /// The identity, if authorization succeeded.
    ///
    /// Unauthorized entries have no identity; entitlement checks must never
    /// be invoked for them.
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        match &self.state {
            AuthorizationState::Authorized(identity) => Some(identity),
            AuthorizationState::Failed => None,
        }
    }
}

// =============================================================================
// Identity Registry
// =============================================================================

/// Ordered registry of subscriber entries for the lifetime of a session.
///
/// Appended to only by the authorization workflow and read by the
/// entitlement distributor. The lock keeps a parallelized workflow sound;
/// the sequential workflow never contends on it.
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    entries: RwLock<Vec<RegistryEntry>>,
}

impl IdentityRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. Entries must be pushed in token input order.
    pub fn push(&self, entry: RegistryEntry) {
        self.entries.write().push(entry);
    }

    /// Number of entries (one per processed token).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the registry holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Number of entries whose authorization succeeded.
    #[must_use]
    pub fn authorized_count(&self) -> usize {
        self.entries
            .read()
            .iter()
            .filter(|entry| entry.is_authorized())
            .count()
    }

    /// Snapshot of all entries in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<RegistryEntry> {
        self.entries.read().clone()
    }
}

// =============================================================================
// Tests
// =============================================================================
