//! Upstream Wire Frames
//!
//! Client-to-server frames for the upstream session protocol. Each frame
//! is one JSON object per WebSocket text message, discriminated by `op`.
//! Server-to-client frames are [`Event`](crate::domain::event::Event)
//! objects and are decoded by the codec directly.
//!
//! # Wire Format (JSON)
//!
//! ```json
//! {"op": "openService", "service": "//feed/apiauth"}
//! {"op": "authorize", "service": "//feed/apiauth", "token": "...", "correlationId": "..."}
//! {"op": "request", "service": "//feed/refdata", "operation": "ReferenceDataRequest",
//!  "securities": ["MSFT US Equity"], "fields": ["PX_LAST", "DS002"], "returnEids": true}
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::event::CorrelationId;
use crate::domain::identity::ServiceName;
use crate::domain::request::{AuthorizationRequest, ReferenceDataRequest};

/// Operation name for the reference data request.
pub const REFERENCE_DATA_OPERATION: &str = "ReferenceDataRequest";

/// A client-to-server frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum RequestFrame {
    /// Open a named service.
    #[serde(rename_all = "camelCase")]
    OpenService {
        /// The service to open.
        service: ServiceName,
    },

    /// Authorize one token; the terminating event carries the same
    /// correlation id back.
    #[serde(rename_all = "camelCase")]
    Authorize {
        /// Authorization service name.
        service: ServiceName,
        /// Raw token value.
        token: String,
        /// Correlation id chosen by the requester.
        correlation_id: String,
    },

    /// Submit a data request on the shared stream.
    #[serde(rename_all = "camelCase")]
    Request {
        /// Data service name.
        service: ServiceName,
        /// Operation name understood by the service.
        operation: String,
        /// Security identifiers to resolve.
        securities: Vec<String>,
        /// Fields to return per security.
        fields: Vec<String>,
        /// Whether to attach entitlement metadata to every record.
        return_eids: bool,
    },
}

impl RequestFrame {
    /// Frame opening a service.
    #[must_use]
    pub fn open_service(service: &str) -> Self {
        Self::OpenService {
            service: service.to_string(),
        }
    }

    /// Frame carrying one token's authorization request.
    #[must_use]
    pub fn authorize(
        service: &str,
        request: &AuthorizationRequest,
        correlation: &CorrelationId,
    ) -> Self {
        Self::Authorize {
            service: service.to_string(),
            token: request.token.value().to_string(),
            correlation_id: correlation.value().to_string(),
        }
    }

    /// Frame carrying the reference data request.
    #[must_use]
    pub fn reference_data(service: &str, request: &ReferenceDataRequest) -> Self {
        Self::Request {
            service: service.to_string(),
            operation: REFERENCE_DATA_OPERATION.to_string(),
            securities: request.securities.clone(),
            fields: request.fields.clone(),
            return_eids: request.return_eids,
        }
    }
}
