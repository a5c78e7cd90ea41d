//! Upstream Request Types
//!
//! The two request shapes the gateway submits: one authorization request
//! per token, and exactly one reference data request for the whole run.

use super::identity::Token;

/// Authorization service name.
pub const APIAUTH_SERVICE: &str = "//feed/apiauth";

/// Reference data service name.
pub const REFDATA_SERVICE: &str = "//feed/refdata";

/// Fields requested for every security.
pub const REFDATA_FIELDS: [&str; 2] = ["PX_LAST", "DS002"];

/// Request exchanging one token for an identity.
///
/// Submitted through a dedicated per-request event queue, never the shared
/// stream.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// The token being authorized.
    pub token: Token,
}

impl AuthorizationRequest {
    /// Create an authorization request for a token.
    #[must_use]
    pub const fn new(token: Token) -> Self {
        Self { token }
    }
}

/// The single data request of a run.
///
/// Submitted on the shared stream using the gateway's own session
/// credentials, never a subscriber identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceDataRequest {
    /// Security identifiers to resolve.
    pub securities: Vec<String>,
    /// Fields to return per security.
    pub fields: Vec<String>,
    /// Ask the service to attach entitlement metadata to every record.
    pub return_eids: bool,
}

impl ReferenceDataRequest {
    /// Build the standard request for the configured securities:
    /// fixed field list, entitlement metadata requested.
    #[must_use]
    pub fn for_securities(securities: Vec<String>) -> Self {
        Self {
            securities,
            fields: REFDATA_FIELDS.iter().map(ToString::to_string).collect(),
            return_eids: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_data_request_defaults() {
        let request = ReferenceDataRequest::for_securities(vec!["MSFT US Equity".to_string()]);
        assert_eq!(request.securities, vec!["MSFT US Equity"]);
        assert_eq!(request.fields, vec!["PX_LAST", "DS002"]);
        assert!(request.return_eids);
    }
}
