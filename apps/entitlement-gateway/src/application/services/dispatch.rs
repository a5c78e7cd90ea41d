//! Upstream Request Dispatcher
//!
//! Builds and submits the single reference data request of a run on the
//! shared session stream, using the gateway's own credentials. Only ever
//! invoked after the authorization workflow reported at least one
//! successful identity.

use crate::application::ports::{SessionError, UpstreamSession};
use crate::domain::request::ReferenceDataRequest;

/// Issues the one-shot reference data request.
pub struct RequestDispatcher<'a> {
    session: &'a dyn UpstreamSession,
}

impl<'a> RequestDispatcher<'a> {
    /// Create a dispatcher over a session.
    #[must_use]
    pub const fn new(session: &'a dyn UpstreamSession) -> Self {
        Self { session }
    }

    /// Submit the reference data request for the configured securities,
    /// asking the service to attach entitlement metadata to every record.
    ///
    /// # Errors
    ///
    /// A submission failure (service not open, session closed) is fatal
    /// and aborts the run.
    pub async fn send_reference_data_request(
        &self,
        securities: &[String],
    ) -> Result<(), SessionError> {
        let request = ReferenceDataRequest::for_securities(securities.to_vec());

        tracing::info!(
            securities = ?request.securities,
            fields = ?request.fields,
            "sending reference data request using gateway credentials"
        );

        self.session.send_request(request).await
    }
}
