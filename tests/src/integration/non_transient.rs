//! # Non-Transient Failure Handling
//!
//! `[non_transient_failure]` as the only message behaviour: it settles every
//! message itself, dead-lettering permanent failures and leaving the rest
//! for the transport's redelivery policy.

#[cfg(test)]
mod tests {
    use crate::fixtures::{build, eventually, quick_intake, subscriber, Job, ScriptedHandler, SUBSCRIBER};
    use courier_subscriber::{
        BehaviourKind, FailureClassifier, PipelineBuilder, PipelineDefinition, Pipelines,
    };
    use shared_bus::{DeadLetterReason, InMemoryTopic, SubscriptionOptions, TopicPublisher};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::watch;

    fn pipelines(handler: &Arc<ScriptedHandler>) -> Pipelines {
        let classifier = FailureClassifier::new(["SamplePermanent"], ["SampleTransient"]).unwrap();
        build(
            PipelineBuilder::new(PipelineDefinition::new(
                vec![BehaviourKind::NonTransientFailure],
                vec![BehaviourKind::Default],
            ))
            .with_handlers(handler.registry())
            .with_classifier(Arc::new(classifier)),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_permanent_failures_are_dead_lettered() {
        let topic = InMemoryTopic::with_options(
            "courier",
            SubscriptionOptions {
                lock_duration: Duration::from_secs(60),
                max_delivery_count: 10,
            },
        );
        let subscription = topic.subscribe(SUBSCRIBER);
        let publisher = TopicPublisher::new(topic);

        let handler = ScriptedHandler::new();
        handler.fail_job(1, "SamplePermanent");
        handler.fail_job(2, "SampleTransient");
        handler.fail_job(3, "Mystery");
        for id in 0..4 {
            publisher.publish(&Job { id }).await.unwrap();
        }

        let subscriber = subscriber(&subscription, &pipelines(&handler), quick_intake());
        let (tx, rx) = watch::channel(false);
        let listening = tokio::spawn(async move { subscriber.listen(rx).await });
        assert!(eventually(Duration::from_secs(5), || handler.calls() == 4).await);
        tx.send(true).unwrap();
        let summary = listening.await.unwrap();

        assert_eq!(summary.completed, 1);
        assert_eq!(summary.dead_lettered, 1);
        assert_eq!(summary.left_for_redelivery, 2);

        let dead = subscription.dead_letters();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].message.decode::<Job>().unwrap(), Job { id: 1 });
        assert_eq!(subscription.locked_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_dead_letters_after_max_deliveries() {
        let topic = InMemoryTopic::with_options(
            "courier",
            SubscriptionOptions {
                lock_duration: Duration::from_secs(1),
                max_delivery_count: 3,
            },
        );
        let subscription = topic.subscribe(SUBSCRIBER);
        TopicPublisher::new(topic)
            .publish(&Job { id: 7 })
            .await
            .unwrap();

        let handler = ScriptedHandler::new();
        handler.fail_with(Some("SampleTransient"));
        let subscriber = subscriber(&subscription, &pipelines(&handler), quick_intake());
        let (tx, rx) = watch::channel(false);
        let listening = tokio::spawn(async move { subscriber.listen(rx).await });

        assert!(eventually(Duration::from_secs(10), || subscription.dead_letters().len() == 1).await);
        tx.send(true).unwrap();
        let summary = listening.await.unwrap();

        assert_eq!(handler.calls(), 3);
        assert_eq!(summary.messages, 3);
        assert_eq!(summary.left_for_redelivery, 3);
        assert_eq!(summary.dead_lettered, 0);

        let dead = subscription.dead_letters();
        assert_eq!(dead[0].reason, DeadLetterReason::MaxDeliveryCountExceeded);
        assert_eq!(dead[0].message.delivery_count(), 3);
    }
}
