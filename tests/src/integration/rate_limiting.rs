//! # Rate Limiting
//!
//! Throughput ceiling of the message-scope and batch-scope limiter. These
//! run on the wall clock: the limiter does not follow tokio's paused time.

#[cfg(test)]
mod tests {
    use crate::fixtures::{build, eventually, subscriber, Job, ScriptedHandler, SUBSCRIBER};
    use courier_subscriber::{
        BehaviourKind, IntakeConfig, PipelineBuilder, PipelineDefinition, RateLimiter,
        RateLimiterConfiguration,
    };
    use shared_bus::{InMemoryTopic, TopicPublisher};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::watch;

    async fn run_limited(
        definition: PipelineDefinition,
        permits_per_second: u32,
        jobs: u64,
        intake: IntakeConfig,
    ) -> Arc<ScriptedHandler> {
        let topic = InMemoryTopic::new("courier");
        let subscription = topic.subscribe(SUBSCRIBER);
        let publisher = TopicPublisher::new(topic);
        for id in 0..jobs {
            publisher.publish(&Job { id }).await.unwrap();
        }

        let handler = ScriptedHandler::new();
        let limiter =
            Arc::new(RateLimiter::new(RateLimiterConfiguration::new(permits_per_second)).unwrap());
        let pipelines = build(
            PipelineBuilder::new(definition)
                .with_handlers(handler.registry())
                .with_rate_limiter(limiter),
        );
        let subscriber = subscriber(&subscription, &pipelines, intake);

        let (tx, rx) = watch::channel(false);
        let listening = tokio::spawn(async move { subscriber.listen(rx).await });
        let all_handled = eventually(Duration::from_secs(30), || {
            handler.calls() as u64 == jobs
        })
        .await;
        tx.send(true).unwrap();
        let summary = listening.await.unwrap();

        assert!(all_handled, "handled {} of {jobs}", handler.calls());
        assert_eq!(summary.completed, jobs);
        handler
    }

    /// No `window` (minus jitter) contains more than `limit` starts.
    fn assert_ceiling(handler: &ScriptedHandler, limit: usize) {
        let mut started = handler.started();
        started.sort();
        for pair in started.windows(limit + 1) {
            let span = pair[limit].duration_since(pair[0]);
            assert!(
                span >= Duration::from_millis(950),
                "{} calls within {span:?}",
                limit + 1
            );
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_message_scope_caps_throughput() {
        let definition = PipelineDefinition::new(
            vec![BehaviourKind::Default, BehaviourKind::RateLimiter],
            vec![BehaviourKind::Default],
        );
        let intake = IntakeConfig {
            batch_size: 16,
            receive_wait_ms: 50,
            max_concurrent_batches: 4,
        };

        let handler = run_limited(definition, 32, 200, intake).await;

        let started = handler.started();
        let first = started.iter().min().copied().unwrap();
        let last = started.iter().max().copied().unwrap();
        // 199 intervals of 1/32s
        assert!(last.duration_since(first) >= Duration::from_secs(6));
        assert_ceiling(&handler, 32);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_batch_scope_limits_batch_intake() {
        let definition = PipelineDefinition::new(
            vec![BehaviourKind::Default],
            vec![BehaviourKind::RateLimiter, BehaviourKind::Default],
        );
        let intake = IntakeConfig {
            batch_size: 1,
            receive_wait_ms: 50,
            max_concurrent_batches: 4,
        };

        let handler = run_limited(definition, 4, 9, intake).await;

        let mut started = handler.started();
        started.sort();
        assert!(started[8].duration_since(started[0]) >= Duration::from_millis(1900));
        assert_ceiling(&handler, 4);
    }
}
