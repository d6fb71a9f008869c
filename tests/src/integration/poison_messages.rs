//! # Poison Messages
//!
//! `[default, poison_message]`: permanent failures are dead-lettered by the
//! inner behaviour, everything else reaches the default behaviour.

#[cfg(test)]
mod tests {
    use crate::fixtures::{
        build, eventually, message_context, quick_intake, subscriber, Job, ScriptedHandler,
        SUBSCRIBER,
    };
    use courier_subscriber::{
        BehaviourKind, Disposition, FailureClassifier, MessageSource, PipelineBuilder,
        PipelineDefinition, Pipelines,
    };
    use shared_bus::{
        DeadLetterReason, EventPublisher, FixedCorrelationId, InMemoryTopic, Subscription,
        SubscriptionOptions, TopicPublisher,
    };
    use shared_types::{Event, Message, MESSAGE_TYPE_PROPERTY, NULL_CORRELATION_ID};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::watch;

    fn pipelines(handler: &Arc<ScriptedHandler>) -> Pipelines {
        let classifier = FailureClassifier::new(["SamplePermanent"], ["SampleTransient"])
            .unwrap()
            .with_malformed_payload_permanent();
        build(
            PipelineBuilder::new(PipelineDefinition::new(
                vec![BehaviourKind::Default, BehaviourKind::PoisonMessage],
                vec![BehaviourKind::Default],
            ))
            .with_handlers(handler.registry())
            .with_classifier(Arc::new(classifier)),
        )
    }

    fn topic() -> (InMemoryTopic, Subscription) {
        let topic = InMemoryTopic::with_options(
            "courier",
            SubscriptionOptions {
                lock_duration: Duration::from_secs(60),
                max_delivery_count: 10,
            },
        );
        let subscription = topic.subscribe(SUBSCRIBER);
        (topic, subscription)
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failures_are_dead_lettered_with_properties() {
        let (topic, subscription) = topic();
        let publisher = TopicPublisher::new(topic)
            .with_correlation_ids(Arc::new(FixedCorrelationId(None)));

        let handler = ScriptedHandler::new();
        handler.fail_job(2, "SamplePermanent");
        handler.fail_job(3, "SampleTransient");
        for id in 1..=3 {
            publisher.publish(&Job { id }).await.unwrap();
        }
        publisher
            .publish_message(
                Message::new(b"{\"id\":".to_vec())
                    .with_user_property(MESSAGE_TYPE_PROPERTY, Job::MESSAGE_TYPE),
            )
            .await;

        let subscriber = subscriber(&subscription, &pipelines(&handler), quick_intake());
        let (tx, rx) = watch::channel(false);
        let listening = tokio::spawn(async move { subscriber.listen(rx).await });
        assert!(
            eventually(Duration::from_secs(5), || subscription.dead_letters().len() == 2
                && handler.calls() == 3)
            .await
        );
        tx.send(true).unwrap();
        let summary = listening.await.unwrap();

        assert_eq!(summary.completed, 1);
        assert_eq!(summary.dead_lettered, 2);
        assert_eq!(summary.left_for_redelivery, 1);

        for dead in subscription.dead_letters() {
            assert_eq!(dead.reason, DeadLetterReason::Requested);
            assert_eq!(dead.message.message_type(), Some(Job::MESSAGE_TYPE));
            assert_eq!(dead.message.correlation_id(), None);
            assert_eq!(dead.message.correlation_id_or_null(), NULL_CORRELATION_ID);
        }
        // the transient one is still locked, waiting for redelivery
        assert_eq!(subscription.locked_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_is_redelivered() {
        let (topic, subscription) = topic();
        let publisher = TopicPublisher::new(topic);
        let handler = ScriptedHandler::new();
        handler.fail_with(Some("SampleTransient"));
        let pipelines = pipelines(&handler);

        publisher.publish(&Job { id: 1 }).await.unwrap();
        let mut batch = subscription.receive_batch(1, Duration::ZERO).await.unwrap();
        let mut ctx = message_context(batch.remove(0), &subscription);
        pipelines.message.invoke(&mut ctx).await.unwrap();

        assert_eq!(ctx.disposition(), Some(Disposition::LeftForRedelivery));
        assert_ne!(ctx.correlation_id(), NULL_CORRELATION_ID);
        assert!(subscription.dead_letters().is_empty());

        tokio::time::advance(Duration::from_secs(61)).await;
        let again = subscription.receive_batch(1, Duration::ZERO).await.unwrap();
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].delivery_count(), 2);
        assert_eq!(again[0].correlation_id(), ctx.message().correlation_id());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_properties_use_fallbacks() {
        let (topic, subscription) = topic();
        topic.send(Message::new(b"{}".to_vec()));
        let handler = ScriptedHandler::new();
        let pipelines = pipelines(&handler);

        let mut batch = subscription.receive_batch(1, Duration::ZERO).await.unwrap();
        let mut ctx = message_context(batch.remove(0), &subscription);
        assert_eq!(ctx.message_type(), "Unknown Message Type");
        assert_eq!(ctx.correlation_id(), "null");

        // no handler for an untyped message: unclassified, left for redelivery
        pipelines.message.invoke(&mut ctx).await.unwrap();
        assert_eq!(ctx.disposition(), Some(Disposition::LeftForRedelivery));
        assert_eq!(handler.calls(), 0);
    }
}
