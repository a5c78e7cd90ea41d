//! Event Classifier
//!
//! Pure routing over the shared event stream: status events are logged and
//! terminal; response events are iterated message by message into the
//! distributor. Classifier activity never tears down the dispatch loop —
//! a malformed message is contained at event level and processing of
//! subsequent events continues.

use crate::domain::entitlement::{DistributionError, DistributionSink, Distributor};
use crate::domain::event::{Event, Message, MessageContents};

/// Routes each inbound event to status logging or distribution.
pub struct EventClassifier<S> {
    distributor: Distributor<S>,
}

impl<S: DistributionSink> EventClassifier<S> {
    /// Create a classifier feeding the given distributor.
    pub const fn new(distributor: Distributor<S>) -> Self {
        Self { distributor }
    }

    /// Handle one event from the shared stream. Never panics and never
    /// propagates an error.
    pub fn handle(&self, event: &Event) {
        if event.event_type.is_status() {
            log_status(event);
            return;
        }
        self.process_response_event(event);
    }

    /// Iterate a response event's messages into the distributor.
    fn process_response_event(&self, event: &Event) {
        for message in &event.messages {
            let MessageContents::ReferenceDataResponse {
                service,
                response_error,
                security_data,
            } = &message.contents
            else {
                tracing::trace!(
                    message_type = message.contents.message_type(),
                    "ignoring non-data message in response event"
                );
                continue;
            };

            // A top-level error element is terminal for this message only.
            if let Some(error) = response_error {
                self.distributor
                    .sink()
                    .error(&DistributionError::ResponseError(error.clone()));
                continue;
            }

            if let Err(error) = self.distributor.distribute_message(service, security_data) {
                // Contained at event level: the rest of this event is
                // abandoned, the stream keeps flowing.
                self.distributor.sink().error(&error);
                return;
            }
        }
    }
}

/// Log a status event in full, including correlators, the way the
/// upstream reported it.
fn log_status(event: &Event) {
    for message in &event.messages {
        log_status_message(event, message);
    }
}

fn log_status_message(event: &Event, message: &Message) {
    tracing::info!(
        event_type = ?event.event_type,
        message_type = message.contents.message_type(),
        correlators = ?message.correlation_ids,
        contents = ?message.contents,
        "status event"
    );
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use parking_lot::Mutex;
    use test_case::test_case;

    use super::*;
    use crate::domain::entitlement::DistributionOutcome;
    use crate::domain::event::{EventType, ResponseError, SecurityRecord};
    use crate::domain::identity::{
        Eid, Identity, IdentityRegistry, RegistryEntry, ServiceName, Token,
    };

    const SERVICE: &str = "//feed/refdata";

    #[derive(Default)]
    struct RecordingSink {
        outcomes: Mutex<Vec<DistributionOutcome>>,
        errors: Mutex<Vec<String>>,
    }

    impl DistributionSink for Arc<RecordingSink> {
        fn outcome(&self, outcome: DistributionOutcome) {
            self.outcomes.lock().push(outcome);
        }

        fn error(&self, error: &DistributionError) {
            self.errors.lock().push(error.to_string());
        }
    }

    fn classifier_with_one_subscriber() -> (EventClassifier<Arc<RecordingSink>>, Arc<RecordingSink>)
    {
        let mut grants: HashMap<ServiceName, Vec<Eid>> = HashMap::new();
        grants.insert(SERVICE.to_string(), vec![Eid(101)]);

        let registry = Arc::new(IdentityRegistry::new());
        registry.push(RegistryEntry::authorized(
            Token::new("tokA"),
            Identity::from_grants(grants),
        ));

        let sink = Arc::new(RecordingSink::default());
        let classifier = EventClassifier::new(Distributor::new(registry, Arc::clone(&sink)));
        (classifier, sink)
    }

    fn security(ticker: &str, eids: &[u32]) -> SecurityRecord {
        SecurityRecord {
            security: ticker.to_string(),
            eid_data: eids.iter().copied().map(Eid).collect(),
            field_data: serde_json::Map::new(),
        }
    }

    fn data_message(securities: Vec<SecurityRecord>) -> Message {
        Message::new(MessageContents::ReferenceDataResponse {
            service: SERVICE.to_string(),
            response_error: None,
            security_data: securities,
        })
    }

    fn error_message() -> Message {
        Message::new(MessageContents::ReferenceDataResponse {
            service: SERVICE.to_string(),
            response_error: Some(ResponseError {
                category: "RESPONSE_ERROR".to_string(),
                message: "daily limit reached".to_string(),
            }),
            security_data: Vec::new(),
        })
    }

    #[test_case(EventType::SessionStatus ; "session status")]
    #[test_case(EventType::ServiceStatus ; "service status")]
    #[test_case(EventType::RequestStatus ; "request status")]
    #[test_case(EventType::AuthorizationStatus ; "authorization status")]
    fn status_events_are_terminal(event_type: EventType) {
        let (classifier, sink) = classifier_with_one_subscriber();
        let event = Event::new(
            event_type,
            vec![Message::new(MessageContents::SessionStarted)],
        );

        classifier.handle(&event);

        assert!(sink.outcomes.lock().is_empty());
        assert!(sink.errors.lock().is_empty());
    }

    #[test_case(EventType::Response ; "final response")]
    #[test_case(EventType::PartialResponse ; "partial response")]
    fn data_events_reach_distribution(event_type: EventType) {
        let (classifier, sink) = classifier_with_one_subscriber();
        let event = Event::new(
            event_type,
            vec![data_message(vec![security("MSFT US Equity", &[101])])],
        );

        classifier.handle(&event);

        assert_eq!(
            *sink.outcomes.lock(),
            vec![DistributionOutcome::Distributed {
                subscriber: 1,
                ticker: "MSFT US Equity".to_string(),
            }]
        );
    }

    #[test]
    fn response_error_message_skipped_but_siblings_processed() {
        let (classifier, sink) = classifier_with_one_subscriber();
        let event = Event::new(
            EventType::Response,
            vec![
                error_message(),
                data_message(vec![security("IBM US Equity", &[101])]),
            ],
        );

        classifier.handle(&event);

        assert_eq!(sink.errors.lock().len(), 1);
        assert_eq!(
            *sink.outcomes.lock(),
            vec![DistributionOutcome::Distributed {
                subscriber: 1,
                ticker: "IBM US Equity".to_string(),
            }]
        );
    }

    #[test]
    fn evaluation_error_contained_at_event_level() {
        let (classifier, sink) = classifier_with_one_subscriber();

        // First message carries a malformed record: the rest of this event
        // is abandoned...
        let bad_event = Event::new(
            EventType::Response,
            vec![
                data_message(vec![security("", &[101])]),
                data_message(vec![security("MSFT US Equity", &[101])]),
            ],
        );
        classifier.handle(&bad_event);

        assert_eq!(sink.errors.lock().len(), 1);
        assert!(sink.outcomes.lock().is_empty());

        // ...while subsequent events keep processing normally.
        let next_event = Event::new(
            EventType::Response,
            vec![data_message(vec![security("IBM US Equity", &[101])])],
        );
        classifier.handle(&next_event);

        assert_eq!(sink.outcomes.lock().len(), 1);
    }

    #[test]
    fn non_data_message_in_response_event_is_ignored() {
        let (classifier, sink) = classifier_with_one_subscriber();
        let event = Event::new(
            EventType::Response,
            vec![
                Message::new(MessageContents::SessionStarted),
                data_message(vec![security("MSFT US Equity", &[101])]),
            ],
        );

        classifier.handle(&event);

        assert_eq!(sink.outcomes.lock().len(), 1);
        assert!(sink.errors.lock().is_empty());
    }
}
