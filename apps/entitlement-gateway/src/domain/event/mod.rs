//! Session Event Model
//!
//! Typed events delivered asynchronously by the upstream session. Every
//! event is an ordered, finite sequence of messages sharing an event type
//! tag; every message carries its correlation ids and a closed set of
//! possible contents, discriminated by `messageType` on the wire.
//!
//! # Event Categories
//!
//! ## Status
//! - `SESSION_STATUS`: session lifecycle (started, terminated)
//! - `SERVICE_STATUS`: service open results
//! - `REQUEST_STATUS`: request-level failures
//! - `AUTHORIZATION_STATUS`: asynchronous authorization notices
//!
//! ## Data
//! - `RESPONSE`: final response to a request
//! - `PARTIAL_RESPONSE`: intermediate response chunk, same schema
//!
//! # Wire Format (JSON)
//!
//! One event per WebSocket text frame:
//!
//! ```json
//! {
//!   "eventType": "RESPONSE",
//!   "timestamp": "2025-11-04T14:30:00Z",
//!   "messages": [{
//!     "correlationIds": [],
//!     "messageType": "ReferenceDataResponse",
//!     "service": "//feed/refdata",
//!     "securityData": [
//!       {"security": "MSFT US Equity", "eidData": [101], "fieldData": {"PX_LAST": 412.5}}
//!     ]
//!   }]
//! }
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identity::{Eid, ServiceName, Token};

// =============================================================================
// Correlation
// =============================================================================

/// Caller-chosen tag linking an asynchronous request to its resulting
/// events.
///
/// During authorization the correlation id is derived from the token, the
/// one value guaranteed unique among concurrently outstanding requests of
/// that kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Create a correlation id from an arbitrary value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Derive the correlation id for a token's authorization request.
    #[must_use]
    pub fn from_token(token: &Token) -> Self {
        Self(token.value().to_string())
    }

    /// Get the raw correlation value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Event Type
// =============================================================================

/// Type tag shared by all messages of one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// Session lifecycle status.
    SessionStatus,
    /// Service open status.
    ServiceStatus,
    /// Request-level status.
    RequestStatus,
    /// Asynchronous authorization status.
    AuthorizationStatus,
    /// Final response to a request.
    Response,
    /// Intermediate response chunk.
    PartialResponse,
}

impl EventType {
    /// Whether this is a status category (terminal: log only).
    #[must_use]
    pub const fn is_status(&self) -> bool {
        matches!(
            self,
            Self::SessionStatus
                | Self::ServiceStatus
                | Self::RequestStatus
                | Self::AuthorizationStatus
        )
    }

    /// Whether this is a data category routed to distribution.
    #[must_use]
    pub const fn is_data(&self) -> bool {
        matches!(self, Self::Response | Self::PartialResponse)
    }
}

// =============================================================================
// Message Contents
// =============================================================================

/// Top-level error element inside a response message.
///
/// A message carrying one is terminal for that message only: it is logged
/// and skipped without aborting the surrounding event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseError {
    /// Error category reported by the upstream service.
    pub category: String,
    /// Human-readable error description.
    pub message: String,
}

impl std::fmt::Display for ResponseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.category, self.message)
    }
}

/// One security inside a reference data response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityRecord {
    /// Ticker string, e.g. `MSFT US Equity`.
    pub security: String,

    /// Entitlement ids gating this record. Absent or empty means the
    /// record is unrestricted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub eid_data: Vec<Eid>,

    /// Requested field values, carried opaquely and never inspected.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub field_data: serde_json::Map<String, serde_json::Value>,
}

impl SecurityRecord {
    /// Whether this record may be distributed without any entitlement
    /// check.
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.eid_data.is_empty()
    }
}

/// Closed set of message payloads, discriminated by `messageType`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "messageType")]
pub enum MessageContents {
    /// Session is up.
    SessionStarted,

    /// Session ended; no further events will be delivered.
    #[serde(rename_all = "camelCase")]
    SessionTerminated {
        /// Why the session ended.
        #[serde(default)]
        reason: String,
    },

    /// A service open succeeded.
    #[serde(rename_all = "camelCase")]
    ServiceOpened {
        /// The opened service.
        service: ServiceName,
    },

    /// A service open failed.
    #[serde(rename_all = "camelCase")]
    ServiceOpenFailure {
        /// The service that failed to open.
        service: ServiceName,
        /// Failure description.
        #[serde(default)]
        reason: String,
    },

    /// A submitted request failed at the request level.
    #[serde(rename_all = "camelCase")]
    RequestFailure {
        /// Failure description.
        #[serde(default)]
        reason: String,
    },

    /// Authorization succeeded; carries the granted entitlements.
    #[serde(rename_all = "camelCase")]
    AuthorizationSuccess {
        /// Granted entitlement ids, keyed by owning service.
        #[serde(default)]
        entitlements: HashMap<ServiceName, Vec<Eid>>,
    },

    /// Authorization failed for this request's token.
    #[serde(rename_all = "camelCase")]
    AuthorizationFailure {
        /// Failure description.
        #[serde(default)]
        reason: String,
    },

    /// Reference data response payload.
    #[serde(rename_all = "camelCase")]
    ReferenceDataResponse {
        /// Service that produced the data; entitlement checks are made
        /// against it.
        service: ServiceName,
        /// Top-level error, mutually exclusive with usable security data.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        response_error: Option<ResponseError>,
        /// Securities in delivery order.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        security_data: Vec<SecurityRecord>,
    },
}

impl MessageContents {
    /// The wire discriminant for this payload.
    #[must_use]
    pub const fn message_type(&self) -> &'static str {
        match self {
            Self::SessionStarted => "SessionStarted",
            Self::SessionTerminated { .. } => "SessionTerminated",
            Self::ServiceOpened { .. } => "ServiceOpened",
            Self::ServiceOpenFailure { .. } => "ServiceOpenFailure",
            Self::RequestFailure { .. } => "RequestFailure",
            Self::AuthorizationSuccess { .. } => "AuthorizationSuccess",
            Self::AuthorizationFailure { .. } => "AuthorizationFailure",
            Self::ReferenceDataResponse { .. } => "ReferenceDataResponse",
        }
    }
}

// =============================================================================
// Message and Event
// =============================================================================

/// One unit of an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Correlation ids of the request(s) this message answers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub correlation_ids: Vec<CorrelationId>,

    /// Typed payload, tagged by `messageType` on the wire.
    #[serde(flatten)]
    pub contents: MessageContents,
}

impl Message {
    /// Create a message with no correlation ids.
    #[must_use]
    pub const fn new(contents: MessageContents) -> Self {
        Self {
            correlation_ids: Vec::new(),
            contents,
        }
    }

    /// Create a message answering one correlated request.
    #[must_use]
    pub fn correlated(correlation: CorrelationId, contents: MessageContents) -> Self {
        Self {
            correlation_ids: vec![correlation],
            contents,
        }
    }

    /// Whether this message carries the designated authorization success
    /// tag.
    #[must_use]
    pub const fn is_authorization_success(&self) -> bool {
        matches!(self.contents, MessageContents::AuthorizationSuccess { .. })
    }
}

/// An ordered, finite sequence of messages sharing a type tag.
///
/// Produced asynchronously by the session, consumed exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Type tag shared by all messages of this event.
    pub event_type: EventType,

    /// Production time at the upstream service, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    /// Messages in delivery order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Message>,
}

impl Event {
    /// Create an event from its messages.
    #[must_use]
    pub const fn new(event_type: EventType, messages: Vec<Message>) -> Self {
        Self {
            event_type,
            timestamp: None,
            messages,
        }
    }

    /// Correlation ids carried by any message of this event.
    pub fn correlation_ids(&self) -> impl Iterator<Item = &CorrelationId> {
        self.messages
            .iter()
            .flat_map(|message| message.correlation_ids.iter())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_categories() {
        assert!(EventType::SessionStatus.is_status());
        assert!(EventType::ServiceStatus.is_status());
        assert!(EventType::RequestStatus.is_status());
        assert!(EventType::AuthorizationStatus.is_status());
        assert!(!EventType::Response.is_status());

        assert!(EventType::Response.is_data());
        assert!(EventType::PartialResponse.is_data());
        assert!(!EventType::SessionStatus.is_data());
    }

    #[test]
    fn event_type_wire_tags() {
        let json = serde_json::to_string(&EventType::PartialResponse).unwrap();
        assert_eq!(json, r#""PARTIAL_RESPONSE""#);

        let parsed: EventType = serde_json::from_str(r#""AUTHORIZATION_STATUS""#).unwrap();
        assert_eq!(parsed, EventType::AuthorizationStatus);
    }

    #[test]
    fn authorization_success_round_trip() {
        let mut entitlements = HashMap::new();
        entitlements.insert("//feed/refdata".to_string(), vec![Eid(101), Eid(102)]);

        let message = Message::correlated(
            CorrelationId::new("tokA"),
            MessageContents::AuthorizationSuccess { entitlements },
        );
        let event = Event::new(EventType::Response, vec![message]);

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""messageType":"AuthorizationSuccess""#));
        assert!(json.contains(r#""correlationIds":["tokA"]"#));

        let parsed: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn reference_data_response_decodes_security_data() {
        let json = r#"{
            "eventType": "RESPONSE",
            "messages": [{
                "messageType": "ReferenceDataResponse",
                "service": "//feed/refdata",
                "securityData": [
                    {"security": "MSFT US Equity", "eidData": [101, 102]},
                    {"security": "IBM US Equity"}
                ]
            }]
        }"#;

        let event: Event = serde_json::from_str(json).unwrap();
        assert_eq!(event.event_type, EventType::Response);

        let MessageContents::ReferenceDataResponse {
            service,
            response_error,
            security_data,
        } = &event.messages[0].contents
        else {
            panic!("expected ReferenceDataResponse");
        };
        assert_eq!(service, "//feed/refdata");
        assert!(response_error.is_none());
        assert_eq!(security_data.len(), 2);
        assert_eq!(security_data[0].eid_data, vec![Eid(101), Eid(102)]);
        assert!(!security_data[0].is_unrestricted());
        assert!(security_data[1].is_unrestricted());
    }

    #[test]
    fn response_error_decodes() {
        let json = r#"{
            "eventType": "RESPONSE",
            "messages": [{
                "messageType": "ReferenceDataResponse",
                "service": "//feed/refdata",
                "responseError": {"category": "RESPONSE_ERROR", "message": "limit reached"}
            }]
        }"#;

        let event: Event = serde_json::from_str(json).unwrap();
        let MessageContents::ReferenceDataResponse { response_error, .. } =
            &event.messages[0].contents
        else {
            panic!("expected ReferenceDataResponse");
        };
        let error = response_error.as_ref().unwrap();
        assert_eq!(error.category, "RESPONSE_ERROR");
        assert_eq!(error.to_string(), "RESPONSE_ERROR: limit reached");
    }

    #[test]
    fn correlation_id_derives_from_token() {
        let token = Token::new("tokA");
        assert_eq!(CorrelationId::from_token(&token).value(), "tokA");
    }

    #[test]
    fn event_correlation_ids_flatten_messages() {
        let event = Event::new(
            EventType::AuthorizationStatus,
            vec![
                Message::correlated(CorrelationId::new("a"), MessageContents::SessionStarted),
                Message::correlated(CorrelationId::new("b"), MessageContents::SessionStarted),
            ],
        );
        let ids: Vec<&str> = event.correlation_ids().map(CorrelationId::value).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn message_type_accessor_matches_wire_tag() {
        let contents = MessageContents::AuthorizationFailure {
            reason: "bad token".to_string(),
        };
        assert_eq!(contents.message_type(), "AuthorizationFailure");

        let json = serde_json::to_string(&Message::new(contents)).unwrap();
        assert!(json.contains(r#""messageType":"AuthorizationFailure""#));
    }
}
