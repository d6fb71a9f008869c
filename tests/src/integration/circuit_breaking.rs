//! # Circuit Breaking
//!
//! A breaker shared by both scopes, tripping on `ExternalProviderOffline`
//! with a 30 second test interval.
//!
//! ```text
//! Closed ──offline──► Open ──29s: rejected──► Open ──31s: probe ok──► Closed
//! ```

#[cfg(test)]
mod tests {
    use crate::fixtures::{build, message_context, CountingMonitor, Job, ScriptedHandler, SUBSCRIBER};
    use courier_subscriber::{
        BatchContext, CircuitBreaker, CircuitBreakerOptions, CircuitState, Disposition,
        MessageSource, PipelineBuilder, PipelineDefinition, Pipelines,
    };
    use shared_bus::{InMemoryTopic, Subscription, SubscriptionOptions, TopicPublisher};
    use std::sync::Arc;
    use std::time::Duration;

    const OFFLINE: &str = "ExternalProviderOffline";

    struct Rig {
        subscription: Subscription,
        publisher: TopicPublisher,
        handler: Arc<ScriptedHandler>,
        breaker: Arc<CircuitBreaker>,
        monitor: Arc<CountingMonitor>,
        pipelines: Pipelines,
    }

    impl Rig {
        fn new() -> Self {
            let topic = InMemoryTopic::with_options(
                "courier",
                SubscriptionOptions {
                    lock_duration: Duration::from_secs(600),
                    max_delivery_count: 100,
                },
            );
            let subscription = topic.subscribe(SUBSCRIBER);
            let monitor = Arc::new(CountingMonitor::default());
            let breaker = Arc::new(
                CircuitBreaker::new(
                    CircuitBreakerOptions::trip_on_kinds(Duration::from_secs(30), [OFFLINE])
                        .with_monitor(monitor.clone()),
                )
                .unwrap(),
            );
            let handler = ScriptedHandler::new();
            let pipelines = build(
                PipelineBuilder::new(PipelineDefinition::default_with_circuit_breaker())
                    .with_handlers(handler.registry())
                    .with_circuit_breaker(Arc::clone(&breaker)),
            );

            Self {
                subscription,
                publisher: TopicPublisher::new(topic),
                handler,
                breaker,
                monitor,
                pipelines,
            }
        }

        /// Publish one job and run it through the message pipeline.
        async fn process(&self, id: u64) -> Disposition {
            self.publisher.publish(&Job { id }).await.unwrap();
            let mut batch = self
                .subscription
                .receive_batch(1, Duration::ZERO)
                .await
                .unwrap();
            let mut ctx = message_context(batch.remove(0), &self.subscription);
            self.pipelines.message.invoke(&mut ctx).await.unwrap();
            ctx.disposition().unwrap()
        }

        /// Publish jobs and run them as one batch through the batch pipeline.
        async fn process_batch(&self, ids: std::ops::Range<u64>) -> Vec<Disposition> {
            for id in ids.clone() {
                self.publisher.publish(&Job { id }).await.unwrap();
            }
            let messages = self
                .subscription
                .receive_batch(ids.count(), Duration::ZERO)
                .await
                .unwrap();
            let mut ctx = BatchContext::new(
                messages,
                Arc::new(self.subscription.clone()),
                Arc::from(SUBSCRIBER),
            );
            self.pipelines.batch.invoke(&mut ctx).await.unwrap();
            ctx.dispositions().to_vec()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejects_until_test_interval_then_probe_closes() {
        let rig = Rig::new();
        rig.handler.fail_with(Some(OFFLINE));

        assert_eq!(rig.process(1).await, Disposition::LeftForRedelivery);
        assert_eq!(rig.breaker.state(), CircuitState::Open);
        assert_eq!(rig.monitor.counts(), (1, 0, 0));

        // provider back, but the interval has not elapsed
        rig.handler.fail_with(None);
        tokio::time::advance(Duration::from_secs(29)).await;
        assert_eq!(rig.process(2).await, Disposition::LeftForRedelivery);
        assert_eq!(rig.handler.calls(), 1);
        assert_eq!(rig.breaker.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(rig.process(3).await, Disposition::Completed);
        assert_eq!(rig.handler.calls(), 2);
        assert_eq!(rig.breaker.state(), CircuitState::Closed);
        assert_eq!(rig.monitor.counts(), (1, 1, 1));

        // neither failed message was acknowledged or dead-lettered
        assert_eq!(rig.subscription.locked_count(), 2);
        assert!(rig.subscription.dead_letters().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_probe_reopens() {
        let rig = Rig::new();
        rig.handler.fail_with(Some(OFFLINE));
        rig.process(1).await;

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(rig.process(2).await, Disposition::LeftForRedelivery);
        assert_eq!(rig.handler.calls(), 2);
        assert_eq!(rig.breaker.state(), CircuitState::Open);
        assert_eq!(rig.monitor.counts(), (2, 1, 0));

        rig.handler.fail_with(None);
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(rig.process(3).await, Disposition::Completed);
        assert_eq!(rig.monitor.counts(), (2, 2, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_failures_do_not_trip() {
        let rig = Rig::new();
        rig.handler.fail_with(Some("SampleTransient"));

        for id in 0..5 {
            assert_eq!(rig.process(id).await, Disposition::LeftForRedelivery);
        }
        assert_eq!(rig.handler.calls(), 5);
        assert_eq!(rig.breaker.state(), CircuitState::Closed);
        assert_eq!(rig.monitor.counts(), (0, 0, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_circuit_rejects_whole_batch() {
        let rig = Rig::new();
        rig.handler.fail_with(Some(OFFLINE));
        rig.process(0).await;

        for id in 1..=3 {
            rig.publisher.publish(&Job { id }).await.unwrap();
        }
        let messages = rig
            .subscription
            .receive_batch(10, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(messages.len(), 3);

        let mut ctx = BatchContext::new(
            messages,
            Arc::new(rig.subscription.clone()),
            Arc::from(SUBSCRIBER),
        );
        rig.pipelines.batch.invoke(&mut ctx).await.unwrap();

        assert_eq!(ctx.dispositions(), [Disposition::LeftForRedelivery; 3]);
        assert_eq!(rig.handler.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_probe_reaching_failing_provider_reopens() {
        let rig = Rig::new();
        rig.handler.fail_with(Some(OFFLINE));

        assert_eq!(rig.process_batch(0..1).await, [Disposition::LeftForRedelivery]);
        assert_eq!(rig.handler.calls(), 1);
        assert_eq!(rig.monitor.counts(), (1, 0, 0));

        // still offline when the interval has passed
        tokio::time::advance(Duration::from_secs(31)).await;
        let dispositions = rig.process_batch(1..4).await;

        assert_eq!(dispositions, [Disposition::LeftForRedelivery; 3]);
        assert_eq!(rig.handler.calls(), 2);
        assert_eq!(rig.breaker.state(), CircuitState::Open);
        assert_eq!(rig.monitor.counts(), (2, 1, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_probe_closes_after_interval() {
        let rig = Rig::new();
        rig.handler.fail_with(Some(OFFLINE));
        rig.process_batch(0..1).await;

        rig.handler.fail_with(None);
        tokio::time::advance(Duration::from_secs(29)).await;
        assert_eq!(rig.process_batch(1..2).await, [Disposition::LeftForRedelivery]);
        assert_eq!(rig.handler.calls(), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(rig.process_batch(2..3).await, [Disposition::Completed]);
        assert_eq!(rig.handler.calls(), 2);
        assert_eq!(rig.breaker.state(), CircuitState::Closed);
        assert_eq!(rig.monitor.counts(), (1, 1, 1));

        // closed again: whole batches reach the handler
        assert_eq!(rig.process_batch(3..6).await, [Disposition::Completed; 3]);
        assert_eq!(rig.handler.calls(), 5);
    }
}
