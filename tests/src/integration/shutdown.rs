//! # Graceful Shutdown
//!
//! Intake stops as soon as shutdown is signalled; every batch already in
//! flight runs to completion and is settled.

#[cfg(test)]
mod tests {
    use crate::fixtures::{build, subscriber, Job, ScriptedHandler, SUBSCRIBER};
    use courier_subscriber::{IntakeConfig, ListenSummary, PipelineBuilder, PipelineDefinition};
    use shared_bus::{InMemoryTopic, TopicPublisher};
    use std::time::Duration;
    use tokio::sync::watch;

    fn intake() -> IntakeConfig {
        IntakeConfig {
            batch_size: 4,
            receive_wait_ms: 100,
            max_concurrent_batches: 2,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_messages_finish_and_intake_stops() {
        let topic = InMemoryTopic::new("courier");
        let subscription = topic.subscribe(SUBSCRIBER);
        let publisher = TopicPublisher::new(topic);
        for id in 0..6 {
            publisher.publish(&Job { id }).await.unwrap();
        }

        let handler = ScriptedHandler::with_delay(Duration::from_secs(2));
        let pipelines = build(
            PipelineBuilder::new(PipelineDefinition::default()).with_handlers(handler.registry()),
        );
        let subscriber = subscriber(&subscription, &pipelines, intake());

        let (tx, rx) = watch::channel(false);
        let listening = tokio::spawn(async move { subscriber.listen(rx).await });

        tokio::time::sleep(Duration::from_millis(500)).await;
        tx.send(true).unwrap();
        for id in 6..9 {
            publisher.publish(&Job { id }).await.unwrap();
        }
        let summary = listening.await.unwrap();

        assert_eq!(summary.batches, 2);
        assert_eq!(summary.completed, 6);
        assert_eq!(handler.calls(), 6);
        assert_eq!(subscription.locked_count(), 0);
        assert_eq!(subscription.active_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_sender_stops_listening() {
        let topic = InMemoryTopic::new("courier");
        let subscription = topic.subscribe(SUBSCRIBER);
        let handler = ScriptedHandler::new();
        let pipelines = build(
            PipelineBuilder::new(PipelineDefinition::default()).with_handlers(handler.registry()),
        );
        let subscriber = subscriber(&subscription, &pipelines, intake());

        let (tx, rx) = watch::channel(false);
        drop(tx);
        let summary = subscriber.listen(rx).await;
        assert_eq!(summary, ListenSummary::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_topic_ends_listening() {
        let topic = InMemoryTopic::new("courier");
        let subscription = topic.subscribe(SUBSCRIBER);
        TopicPublisher::new(topic.clone())
            .publish(&Job { id: 1 })
            .await
            .unwrap();

        let handler = ScriptedHandler::new();
        let pipelines = build(
            PipelineBuilder::new(PipelineDefinition::default()).with_handlers(handler.registry()),
        );
        let subscriber = subscriber(&subscription, &pipelines, intake());

        let (_tx, rx) = watch::channel(false);
        let listening = tokio::spawn(async move { subscriber.listen(rx).await });
        tokio::time::sleep(Duration::from_millis(300)).await;
        topic.close();
        let summary = listening.await.unwrap();

        assert_eq!(summary.completed, 1);
    }
}
