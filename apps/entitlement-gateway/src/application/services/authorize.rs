//! Authorization Workflow
//!
//! Exchanges each supplied token for an identity through a correlated
//! request/response against the authorization service. Tokens are
//! processed strictly sequentially: one token's exchange completes,
//! including its blocking wait, before the next request is submitted, so
//! registry insertion order always matches token input order.
//!
//! Per-token failures (bad token, revoked token, timeout) are recorded and
//! logged but never retried; the workflow continues with the remaining
//! tokens. Only an unreachable authorization service fails the whole
//! workflow.

use std::time::Duration;

use crate::application::ports::{SessionError, UpstreamSession};
use crate::domain::event::{CorrelationId, Event, EventType, MessageContents};
use crate::domain::identity::{Identity, IdentityRegistry, RegistryEntry, Token};
use crate::domain::request::AuthorizationRequest;

/// Default bound on the per-token blocking wait.
pub const AUTH_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs the per-token authorization exchanges against a session.
pub struct AuthorizationWorkflow<'a> {
    session: &'a dyn UpstreamSession,
    timeout: Duration,
}

impl<'a> AuthorizationWorkflow<'a> {
    /// Create a workflow with the default per-token timeout.
    #[must_use]
    pub const fn new(session: &'a dyn UpstreamSession) -> Self {
        Self {
            session,
            timeout: AUTH_TIMEOUT,
        }
    }

    /// Create a workflow with a custom per-token timeout.
    #[must_use]
    pub const fn with_timeout(session: &'a dyn UpstreamSession, timeout: Duration) -> Self {
        Self { session, timeout }
    }

    /// Authorize every token, appending one registry entry per token in
    /// input order. Returns whether at least one token authorized
    /// successfully; if none did, no data request should be issued.
    ///
    /// # Errors
    ///
    /// Returns an error when the authorization service is unreachable;
    /// this is fatal and leaves already-processed entries in the registry.
    pub async fn authorize_all(
        &self,
        tokens: &[Token],
        registry: &IdentityRegistry,
    ) -> Result<bool, SessionError> {
        let mut any_authorized = false;

        for (index, token) in tokens.iter().enumerate() {
            let user = index + 1;
            let correlation = CorrelationId::from_token(token);
            let request = AuthorizationRequest::new(token.clone());

            let mut queue = self
                .session
                .send_authorization_request(request, correlation)
                .await?;

            let entry = match queue.next_event(self.timeout).await {
                Some(event)
                    if matches!(
                        event.event_type,
                        EventType::Response | EventType::RequestStatus
                    ) =>
                {
                    Self::resolve(user, token, &event)
                }
                Some(event) => {
                    tracing::warn!(
                        user,
                        event_type = ?event.event_type,
                        "unexpected event while awaiting authorization"
                    );
                    RegistryEntry::unauthorized(token.clone())
                }
                None => {
                    tracing::warn!(
                        user,
                        timeout_ms = self.timeout.as_millis(),
                        "authorization timed out"
                    );
                    RegistryEntry::unauthorized(token.clone())
                }
            };

            any_authorized |= entry.is_authorized();
            registry.push(entry);
        }

        Ok(any_authorized)
    }

    /// Turn the terminating event for one token into a registry entry.
    fn resolve(user: usize, token: &Token, event: &Event) -> RegistryEntry {
        let identity = event
            .messages
            .iter()
            .find_map(|message| match &message.contents {
                MessageContents::AuthorizationSuccess { entitlements } => {
                    Some(Identity::from_grants(entitlements.clone()))
                }
                _ => None,
            });

        match identity {
            Some(identity) => {
                tracing::info!(user, "authorization success");
                RegistryEntry::authorized(token.clone(), identity)
            }
            None => {
                tracing::warn!(user, failure_event = ?event, "authorization failed");
                RegistryEntry::unauthorized(token.clone())
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
