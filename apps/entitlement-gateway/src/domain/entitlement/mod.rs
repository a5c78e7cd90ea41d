//! Entitlement Evaluation and Distribution
//!
//! For each security in a response message, decides per subscriber whether
//! delivery is permitted and reports the outcome through a sink.
//!
//! # Design
//!
//! - Securities are evaluated in delivery order; subscribers in registry
//!   insertion order. Subscriber numbering is positional (1-based) and must
//!   stay stable and reproducible across a run.
//! - A record with no entitlement ids is unrestricted: it is announced for
//!   every registry entry with no check performed.
//! - Entitlement checks are only ever invoked against authorized entries;
//!   unauthorized entries are excluded.
//! - No decision is cached: every record is re-evaluated from scratch.
//!
//! The distributor depends only on the [`DistributionSink`] capability, not
//! on any concrete output; production wires in [`LogSink`], tests collect
//! outcomes in memory.

use std::sync::Arc;

use super::event::{ResponseError, SecurityRecord};
use super::identity::{Eid, IdentityRegistry, RegistryEntry};

// =============================================================================
// Outcomes
// =============================================================================

/// Per-(security, subscriber) distribution decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DistributionOutcome {
    /// The subscriber is entitled; the record is deliverable to them.
    Distributed {
        /// 1-based registry position of the subscriber.
        subscriber: usize,
        /// Ticker of the distributed record.
        ticker: String,
    },
    /// The subscriber is not entitled. An expected, frequent outcome, not
    /// an error.
    Denied {
        /// 1-based registry position of the subscriber.
        subscriber: usize,
        /// Ticker of the withheld record.
        ticker: String,
        /// Entitlements the subscriber is missing, in requested order.
        /// Diagnostic only; never used to infer content.
        failed_eids: Vec<Eid>,
    },
}

/// Failure local to one response message.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DistributionError {
    /// The message carried a top-level error element.
    #[error("response error: {0}")]
    ResponseError(ResponseError),

    /// A security record could not be evaluated.
    #[error("malformed security record at index {index}: {reason}")]
    MalformedRecord {
        /// Position of the record within the message.
        index: usize,
        /// What was wrong with it.
        reason: String,
    },
}

/// Capability for reporting distribution outcomes and contained errors.
pub trait DistributionSink: Send + Sync {
    /// Report one distribution decision.
    fn outcome(&self, outcome: DistributionOutcome);

    /// Report an error that was contained at message level.
    fn error(&self, error: &DistributionError);
}

/// Sink that reports through structured logging.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl DistributionSink for LogSink {
    fn outcome(&self, outcome: DistributionOutcome) {
        match outcome {
            DistributionOutcome::Distributed { subscriber, ticker } => {
                tracing::info!(user = subscriber, ticker = %ticker, "subscriber is entitled to data");
            }
            DistributionOutcome::Denied {
                subscriber,
                ticker,
                failed_eids,
            } => {
                tracing::warn!(
                    user = subscriber,
                    ticker = %ticker,
                    failed_eids = ?failed_eids,
                    "subscriber is not entitled to data"
                );
            }
        }
    }

    fn error(&self, error: &DistributionError) {
        tracing::error!(error = %error, "response message skipped");
    }
}

// =============================================================================
// Distributor
// =============================================================================

/// Evaluates response payloads against the identity registry and reports
/// per-subscriber outcomes.
pub struct Distributor<S> {
    registry: Arc<IdentityRegistry>,
    sink: S,
}

impl<S: DistributionSink> Distributor<S> {
    /// Create a distributor over a registry and an outcome sink.
    pub const fn new(registry: Arc<IdentityRegistry>, sink: S) -> Self {
        Self { registry, sink }
    }

    /// The outcome sink, for reporting errors contained outside the
    /// distributor itself.
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    /// Evaluate every security of one response message, in delivery order.
    ///
    /// # Errors
    ///
    /// Returns an error for a record that cannot be evaluated; the caller
    /// contains it at event level.
    pub fn distribute_message(
        &self,
        service: &str,
        securities: &[SecurityRecord],
    ) -> Result<(), DistributionError> {
        tracing::debug!(count = securities.len(), "processing securities");

        for (index, security) in securities.iter().enumerate() {
            if security.security.is_empty() {
                return Err(DistributionError::MalformedRecord {
                    index,
                    reason: "empty security identifier".to_string(),
                });
            }
            self.distribute_security(service, security);
        }

        Ok(())
    }

    /// Evaluate one security against every registry entry in insertion
    /// order.
    fn distribute_security(&self, service: &str, security: &SecurityRecord) {
        let entries = self.registry.snapshot();

        if security.is_unrestricted() {
            // No entitlement metadata: deliverable to every supplied token,
            // no check invoked.
            for (position, _) in entries.iter().enumerate() {
                self.sink.outcome(DistributionOutcome::Distributed {
                    subscriber: position + 1,
                    ticker: security.security.clone(),
                });
            }
            return;
        }

        for (position, entry) in entries.iter().enumerate() {
            self.evaluate_entry(service, security, position, entry);
        }
    }

    fn evaluate_entry(
        &self,
        service: &str,
        security: &SecurityRecord,
        position: usize,
        entry: &RegistryEntry,
    ) {
        // Unauthorized entries never reach an entitlement check.
        let Some(identity) = entry.identity() else {
            return;
        };

        if identity.has_entitlements(service, &security.eid_data) {
            self.sink.outcome(DistributionOutcome::Distributed {
                subscriber: position + 1,
                ticker: security.security.clone(),
            });
        } else {
            self.sink.outcome(DistributionOutcome::Denied {
                subscriber: position + 1,
                ticker: security.security.clone(),
                failed_eids: identity.failed_entitlements(service, &security.eid_data),
            });
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use parking_lot::Mutex;

    use super::*;
    use crate::domain::identity::{Identity, ServiceName, Token};

    /// Sink collecting outcomes and errors for assertions.
    #[derive(Default)]
    struct RecordingSink {
        outcomes: Mutex<Vec<DistributionOutcome>>,
        errors: Mutex<Vec<String>>,
    }

    impl DistributionSink for RecordingSink {
        fn outcome(&self, outcome: DistributionOutcome) {
            self.outcomes.lock().push(outcome);
        }

        fn error(&self, error: &DistributionError) {
            self.errors.lock().push(error.to_string());
        }
    }

    const SERVICE: &str = "//feed/refdata";

    fn identity_with(eids: &[u32]) -> Identity {
        let mut grants: HashMap<ServiceName, Vec<Eid>> = HashMap::new();
        grants.insert(SERVICE.to_string(), eids.iter().copied().map(Eid).collect());
        Identity::from_grants(grants)
    }

    fn security(ticker: &str, eids: &[u32]) -> SecurityRecord {
        SecurityRecord {
            security: ticker.to_string(),
            eid_data: eids.iter().copied().map(Eid).collect(),
            field_data: serde_json::Map::new(),
        }
    }

    fn distributor_with(
        entries: Vec<RegistryEntry>,
    ) -> Distributor<Arc<RecordingSink>> {
        let registry = Arc::new(IdentityRegistry::new());
        for entry in entries {
            registry.push(entry);
        }
        Distributor::new(registry, Arc::new(RecordingSink::default()))
    }

    impl DistributionSink for Arc<RecordingSink> {
        fn outcome(&self, outcome: DistributionOutcome) {
            self.as_ref().outcome(outcome);
        }

        fn error(&self, error: &DistributionError) {
            self.as_ref().error(error);
        }
    }

    #[test]
    fn unrestricted_security_distributed_to_all_without_check() {
        // Entries that would fail any check: empty grants and a failed
        // authorization. Both receiving `Distributed` proves no check ran.
        let distributor = distributor_with(vec![
            RegistryEntry::authorized(Token::new("tokA"), identity_with(&[])),
            RegistryEntry::unauthorized(Token::new("tokB")),
        ]);

        distributor
            .distribute_message(SERVICE, &[security("MSFT US Equity", &[])])
            .unwrap();

        let outcomes = distributor.sink().outcomes.lock();
        assert_eq!(
            *outcomes,
            vec![
                DistributionOutcome::Distributed {
                    subscriber: 1,
                    ticker: "MSFT US Equity".to_string(),
                },
                DistributionOutcome::Distributed {
                    subscriber: 2,
                    ticker: "MSFT US Equity".to_string(),
                },
            ]
        );
    }

    #[test]
    fn restricted_security_evaluated_per_identity_in_registry_order() {
        let distributor = distributor_with(vec![
            RegistryEntry::authorized(Token::new("tokA"), identity_with(&[101, 102])),
            RegistryEntry::authorized(Token::new("tokB"), identity_with(&[101])),
            RegistryEntry::authorized(Token::new("tokC"), identity_with(&[101, 102])),
        ]);

        distributor
            .distribute_message(SERVICE, &[security("MSFT US Equity", &[101, 102])])
            .unwrap();

        let outcomes = distributor.sink().outcomes.lock();
        assert_eq!(outcomes.len(), 3);
        assert_eq!(
            outcomes[0],
            DistributionOutcome::Distributed {
                subscriber: 1,
                ticker: "MSFT US Equity".to_string(),
            }
        );
        assert_eq!(
            outcomes[1],
            DistributionOutcome::Denied {
                subscriber: 2,
                ticker: "MSFT US Equity".to_string(),
                failed_eids: vec![Eid(102)],
            }
        );
        assert_eq!(
            outcomes[2],
            DistributionOutcome::Distributed {
                subscriber: 3,
                ticker: "MSFT US Equity".to_string(),
            }
        );
    }

    #[test]
    fn denied_outcome_reports_ordered_failed_eids() {
        let distributor = distributor_with(vec![RegistryEntry::authorized(
            Token::new("tokA"),
            identity_with(&[102]),
        )]);

        distributor
            .distribute_message(SERVICE, &[security("IBM US Equity", &[103, 102, 101])])
            .unwrap();

        let outcomes = distributor.sink().outcomes.lock();
        assert_eq!(
            *outcomes,
            vec![DistributionOutcome::Denied {
                subscriber: 1,
                ticker: "IBM US Equity".to_string(),
                failed_eids: vec![Eid(103), Eid(101)],
            }]
        );
    }

    #[test]
    fn unauthorized_entry_excluded_from_restricted_evaluation() {
        let distributor = distributor_with(vec![
            RegistryEntry::authorized(Token::new("tokA"), identity_with(&[101])),
            RegistryEntry::unauthorized(Token::new("tokB")),
        ]);

        distributor
            .distribute_message(SERVICE, &[security("MSFT US Equity", &[101])])
            .unwrap();

        // tokB produced no outcome at all: it never reached a check.
        let outcomes = distributor.sink().outcomes.lock();
        assert_eq!(
            *outcomes,
            vec![DistributionOutcome::Distributed {
                subscriber: 1,
                ticker: "MSFT US Equity".to_string(),
            }]
        );
    }

    #[test]
    fn securities_evaluated_in_delivery_order() {
        let distributor = distributor_with(vec![RegistryEntry::authorized(
            Token::new("tokA"),
            identity_with(&[101]),
        )]);

        distributor
            .distribute_message(
                SERVICE,
                &[security("FIRST", &[101]), security("SECOND", &[101])],
            )
            .unwrap();

        let outcomes = distributor.sink().outcomes.lock();
        let tickers: Vec<&str> = outcomes
            .iter()
            .map(|outcome| match outcome {
                DistributionOutcome::Distributed { ticker, .. }
                | DistributionOutcome::Denied { ticker, .. } => ticker.as_str(),
            })
            .collect();
        assert_eq!(tickers, vec!["FIRST", "SECOND"]);
    }

    #[test]
    fn malformed_record_stops_message_with_error() {
        let distributor = distributor_with(vec![RegistryEntry::authorized(
            Token::new("tokA"),
            identity_with(&[101]),
        )]);

        let result = distributor.distribute_message(
            SERVICE,
            &[security("GOOD", &[101]), security("", &[101])],
        );

        assert!(matches!(
            result,
            Err(DistributionError::MalformedRecord { index: 1, .. })
        ));
        // The record before the malformed one was still evaluated.
        assert_eq!(distributor.sink().outcomes.lock().len(), 1);
    }

    #[test]
    fn wrong_service_denies_with_all_eids_failed() {
        let distributor = distributor_with(vec![RegistryEntry::authorized(
            Token::new("tokA"),
            identity_with(&[101]),
        )]);

        distributor
            .distribute_message("//feed/other", &[security("MSFT US Equity", &[101])])
            .unwrap();

        let outcomes = distributor.sink().outcomes.lock();
        assert_eq!(
            *outcomes,
            vec![DistributionOutcome::Denied {
                subscriber: 1,
                ticker: "MSFT US Equity".to_string(),
                failed_eids: vec![Eid(101)],
            }]
        );
    }
}
