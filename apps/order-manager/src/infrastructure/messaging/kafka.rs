//! Kafka event publisher.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication, TopicResult};
use rdkafka::client::DefaultClientContext;
use rdkafka::config::ClientConfig;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;

use crate::application::ports::{EventPublishError, EventPublisherPort};
use crate::config::MessagingConfig;

/// Publisher backed by an rdkafka `FutureProducer`.
///
/// `message.timeout.ms` bounds delivery, so a send never waits longer than
/// the configured timeout.
pub struct KafkaEventPublisher {
    producer: FutureProducer,
    timeout_ms: u64,
}

impl KafkaEventPublisher {
    /// Create the producer. Does not contact the brokers yet.
    ///
    /// # Errors
    ///
    /// Returns [`EventPublishError::ConnectionError`] if the client config is
    /// rejected.
    pub fn new(config: &MessagingConfig) -> Result<Self, EventPublishError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", config.brokers.join(","))
            .set("message.timeout.ms", config.send_timeout_ms.to_string())
            .set("acks", "all")
            .set("enable.idempotence", "true")
            .create()
            .map_err(|e| EventPublishError::ConnectionError {
                message: e.to_string(),
            })?;

        tracing::info!(brokers = ?config.brokers, "Created Kafka producer");
        Ok(Self {
            producer,
            timeout_ms: config.send_timeout_ms,
        })
    }

    /// Create the events topic unless it already exists.
    ///
    /// # Errors
    ///
    /// Returns [`EventPublishError::ConnectionError`] if the admin request
    /// fails and [`EventPublishError::PublishFailed`] if the broker refuses
    /// to create the topic.
    pub async fn ensure_events_topic(
        config: &MessagingConfig,
    ) -> Result<TopicStatus, EventPublishError> {
        let admin: AdminClient<DefaultClientContext> = ClientConfig::new()
            .set("bootstrap.servers", config.brokers.join(","))
            .create()
            .map_err(|e| EventPublishError::ConnectionError {
                message: e.to_string(),
            })?;

        let topic = NewTopic::new(
            &config.events_topic,
            config.topic_partitions,
            TopicReplication::Fixed(config.topic_replication),
        );
        let options = AdminOptions::new()
            .operation_timeout(Some(Duration::from_millis(config.send_timeout_ms)));

        let results = admin
            .create_topics([&topic], &options)
            .await
            .map_err(|e| EventPublishError::ConnectionError {
                message: e.to_string(),
            })?;

        let mut status = TopicStatus::AlreadyExists;
        for result in results {
            status = topic_status(result)?;
        }
        tracing::info!(topic = %config.events_topic, ?status, "Kafka events topic ready");
        Ok(status)
    }
}

/// Outcome of [`KafkaEventPublisher::ensure_events_topic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicStatus {
    /// The topic was created.
    Created,
    /// The topic was already there.
    AlreadyExists,
}

fn topic_status(result: TopicResult) -> Result<TopicStatus, EventPublishError> {
    match result {
        Ok(_) => Ok(TopicStatus::Created),
        Err((_, RDKafkaErrorCode::TopicAlreadyExists)) => Ok(TopicStatus::AlreadyExists),
        Err((topic, code)) => Err(EventPublishError::PublishFailed {
            message: format!("failed to create topic '{topic}': {code}"),
        }),
    }
}

#[async_trait]
impl EventPublisherPort for KafkaEventPublisher {
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> Result<(), EventPublishError> {
        let record = FutureRecord::to(topic).key(key).payload(payload);
        let queue_timeout = Timeout::After(Duration::from_millis(self.timeout_ms));

        match self.producer.send(record, queue_timeout).await {
            Ok(_) => Ok(()),
            Err((e, _)) => Err(map_kafka_error(&e, self.timeout_ms)),
        }
    }
}

fn map_kafka_error(error: &KafkaError, timeout_ms: u64) -> EventPublishError {
    match error.rdkafka_error_code() {
        Some(RDKafkaErrorCode::MessageTimedOut | RDKafkaErrorCode::QueueFull) => {
            EventPublishError::Timeout { timeout_ms }
        }
        Some(RDKafkaErrorCode::AllBrokersDown | RDKafkaErrorCode::BrokerTransportFailure) => {
            EventPublishError::ConnectionError {
                message: error.to_string(),
            }
        }
        Some(RDKafkaErrorCode::MessageSizeTooLarge) => EventPublishError::SerializationError {
            message: error.to_string(),
        },
        _ => EventPublishError::PublishFailed {
            message: error.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn kind(error: &EventPublishError) -> &'static str {
        match error {
            EventPublishError::ConnectionError { .. } => "connection",
            EventPublishError::Timeout { .. } => "timeout",
            EventPublishError::SerializationError { .. } => "serialization",
            EventPublishError::PublishFailed { .. } => "failed",
        }
    }

    #[test_case(RDKafkaErrorCode::MessageTimedOut, "timeout" ; "delivery timeout")]
    #[test_case(RDKafkaErrorCode::QueueFull, "timeout" ; "local queue full")]
    #[test_case(RDKafkaErrorCode::AllBrokersDown, "connection" ; "brokers down")]
    #[test_case(RDKafkaErrorCode::BrokerTransportFailure, "connection" ; "transport failure")]
    #[test_case(RDKafkaErrorCode::MessageSizeTooLarge, "serialization" ; "oversized message")]
    #[test_case(RDKafkaErrorCode::UnknownTopicOrPartition, "failed" ; "unknown topic")]
    fn production_errors_are_classified(code: RDKafkaErrorCode, expected: &str) {
        let error = map_kafka_error(&KafkaError::MessageProduction(code), 5000);
        assert_eq!(kind(&error), expected);
    }

    #[test]
    fn timeout_carries_the_configured_bound() {
        let error = map_kafka_error(
            &KafkaError::MessageProduction(RDKafkaErrorCode::MessageTimedOut),
            1500,
        );
        assert_eq!(error, EventPublishError::Timeout { timeout_ms: 1500 });
    }

    #[test]
    fn errors_without_a_code_are_publish_failures() {
        let error = map_kafka_error(&KafkaError::Canceled, 5000);
        assert_eq!(kind(&error), "failed");
    }

    #[test_case(Ok("order-events".to_string()), Ok(TopicStatus::Created) ; "created")]
    #[test_case(
        Err(("order-events".to_string(), RDKafkaErrorCode::TopicAlreadyExists)),
        Ok(TopicStatus::AlreadyExists)
        ; "already exists"
    )]
    fn topic_creation_tolerates_existing_topic(
        result: TopicResult,
        expected: Result<TopicStatus, EventPublishError>,
    ) {
        assert_eq!(topic_status(result), expected);
    }

    #[test]
    fn other_topic_errors_are_reported() {
        let result = topic_status(Err((
            "order-events".to_string(),
            RDKafkaErrorCode::TopicAuthorizationFailed,
        )));

        match result {
            Err(EventPublishError::PublishFailed { message }) => {
                assert!(message.contains("order-events"));
            }
            other => panic!("expected PublishFailed, got {other:?}"),
        }
    }
}
