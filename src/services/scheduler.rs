use chrono::Utc;
use colored::Colorize;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

use crate::csv_logger::{log_submission, SubmissionRecord};
use crate::relay::{
    OracleRequest, PriceSource, PriceWriter, RelayStats, RequestOutcome, RequestQueue,
    RequestState, RetryEngine,
};

// Macro for timestamped colored output
macro_rules! tprintln {
    ($($arg:tt)*) => {{
        println!("{} {}",
            chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string().bright_black(),
            format!($($arg)*)
        );
    }};
}

/// State left behind when the scheduler stops
#[derive(Debug, Clone)]
pub struct SchedulerReport {
    pub stats: RelayStats,
    /// Requests still queued (lost, nothing is persisted)
    pub pending: usize,
}

/// Batch scheduler service
///
/// Owns the request queue. Requests arrive over the ingestion channel and are
/// drained on a fixed timer, at most `chunk_size` per tick, each one relayed
/// to completion before the next is dequeued.
pub struct BatchScheduler<P, W> {
    pub queue: RequestQueue,
    pub request_rx: mpsc::UnboundedReceiver<OracleRequest>,
    pub engine: RetryEngine<P, W>,
    pub chunk_size: usize,
    pub poll_interval: Duration,
    pub submission_log: Option<String>,
}

impl<P: PriceSource, W: PriceWriter> BatchScheduler<P, W> {
    pub fn new(
        request_rx: mpsc::UnboundedReceiver<OracleRequest>,
        engine: RetryEngine<P, W>,
        chunk_size: usize,
        poll_interval: Duration,
    ) -> Self {
        Self {
            queue: RequestQueue::new(),
            request_rx,
            engine,
            chunk_size,
            poll_interval,
            submission_log: None,
        }
    }

    pub fn with_submission_log(mut self, path: Option<String>) -> Self {
        self.submission_log = path;
        self
    }

    /// Move requests already waiting in the channel to the back of the queue
    pub fn absorb_arrivals(&mut self) -> usize {
        let mut absorbed = 0;
        while let Ok(request) = self.request_rx.try_recv() {
            self.queue.push(request);
            absorbed += 1;
        }
        absorbed
    }

    /// Relay at most `chunk_size` requests from the front of the queue
    pub async fn tick(&mut self) -> Vec<RequestOutcome> {
        let mut outcomes = Vec::new();

        while outcomes.len() < self.chunk_size {
            self.absorb_arrivals();
            let Some(request) = self.queue.pop() else {
                break;
            };

            let outcome = self.engine.process(request).await;
            self.record(&outcome);
            outcomes.push(outcome);
        }

        if !outcomes.is_empty() {
            debug!(
                "[SCHEDULER] Tick relayed {} request(s), {} still queued",
                outcomes.len(),
                self.queue.len()
            );
        }

        outcomes
    }

    /// Tick on the timer until `shutdown` completes.
    ///
    /// Ticks run inside this loop, so two ticks never overlap. A tick in
    /// progress at shutdown is abandoned.
    pub async fn run<F>(mut self, shutdown: F) -> SchedulerReport
    where
        F: Future<Output = ()>,
    {
        let mut interval_timer = interval(self.poll_interval);
        interval_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tokio::pin!(shutdown);
        let mut ingest_open = true;

        loop {
            tokio::select! {
                _ = &mut shutdown => break,

                received = self.request_rx.recv(), if ingest_open => match received {
                    Some(request) => self.queue.push(request),
                    None => {
                        warn!("[SCHEDULER] Request channel closed, draining remaining queue only");
                        ingest_open = false;
                    }
                },

                _ = interval_timer.tick() => {
                    tokio::select! {
                        _ = self.tick() => {}
                        _ = &mut shutdown => break,
                    }
                }
            }
        }

        self.absorb_arrivals();
        SchedulerReport {
            stats: self.engine.stats().clone(),
            pending: self.queue.len(),
        }
    }

    fn record(&self, outcome: &RequestOutcome) {
        let writeback = match &outcome.writeback_error {
            None => "✓".green().bold(),
            Some(_) => "✗ writeback failed".red().bold(),
        };

        match outcome.state {
            RequestState::Submitted => tprintln!(
                "{} Request {} | price {} | attempts {} | {}",
                "[RELAY]".bright_green().bold(),
                outcome.request,
                outcome.submitted_value.to_string().cyan(),
                outcome.attempts,
                writeback
            ),
            _ => tprintln!(
                "{} Request {} | price unavailable after {} attempt(s), sentinel sent | {}",
                "[RELAY]".yellow().bold(),
                outcome.request,
                outcome.failed_attempts,
                writeback
            ),
        }

        if let Some(path) = &self.submission_log {
            let record = SubmissionRecord::from_outcome(Utc::now(), outcome);
            if let Err(e) = log_submission(path, &record) {
                warn!("[SCHEDULER] Failed to log submission: {:#}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::retry::tests::{RecordingWriter, ScriptedSource};
    use crate::relay::OracleEvent;
    use crate::services::event_ingest::forward_events;
    use ethers::types::{Address, U256};
    use futures_util::stream;

    fn request(id: u64) -> OracleRequest {
        OracleRequest::new(U256::from(id), Address::from_low_u64_be(id))
    }

    fn scheduler(
        source: ScriptedSource,
        writer: RecordingWriter,
        chunk_size: usize,
    ) -> (
        mpsc::UnboundedSender<OracleRequest>,
        BatchScheduler<ScriptedSource, RecordingWriter>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = RetryEngine::new(source, writer, 5);
        (tx, BatchScheduler::new(rx, engine, chunk_size, Duration::from_millis(2000)))
    }

    #[tokio::test]
    async fn test_tick_drains_at_most_chunk_size() {
        let (_tx, mut scheduler) = scheduler(
            ScriptedSource::succeeding_after(0, "2000.00000000"),
            RecordingWriter::default(),
            3,
        );
        for id in 0..7 {
            scheduler.queue.push(request(id));
        }

        let outcomes = scheduler.tick().await;
        assert_eq!(outcomes.len(), 3);
        assert_eq!(scheduler.queue.len(), 4);
    }

    #[tokio::test]
    async fn test_tick_drains_short_queue_and_empty_is_noop() {
        let writer = RecordingWriter::default();
        let (_tx, mut scheduler) = scheduler(
            ScriptedSource::succeeding_after(0, "2000.00000000"),
            writer.clone(),
            3,
        );
        scheduler.queue.push(request(1));
        scheduler.queue.push(request(2));

        assert_eq!(scheduler.tick().await.len(), 2);
        assert!(scheduler.queue.is_empty());

        assert!(scheduler.tick().await.is_empty());
        assert_eq!(writer.submissions().len(), 2);
    }

    #[tokio::test]
    async fn test_ingested_requests_are_relayed_fifo() {
        let writer = RecordingWriter::default();
        let (tx, mut scheduler) = scheduler(
            ScriptedSource::succeeding_after(0, "2000.00000000"),
            writer.clone(),
            3,
        );

        let events: Vec<Result<OracleEvent, String>> = (10..13)
            .map(|id| Ok(OracleEvent::PriceRequested(request(id))))
            .collect();
        forward_events(stream::iter(events), &tx).await;

        assert_eq!(scheduler.absorb_arrivals(), 3);
        assert_eq!(scheduler.queue.len(), 3);

        scheduler.tick().await;
        let ids: Vec<U256> = writer.submissions().iter().map(|(_, _, id)| *id).collect();
        assert_eq!(ids, vec![U256::from(10u64), U256::from(11u64), U256::from(12u64)]);
    }

    #[tokio::test]
    async fn test_writeback_failure_does_not_requeue_or_stop_tick() {
        let writer = RecordingWriter::failing();
        let (_tx, mut scheduler) = scheduler(
            ScriptedSource::succeeding_after(0, "2000.00000000"),
            writer.clone(),
            3,
        );
        for id in 0..4 {
            scheduler.queue.push(request(id));
        }

        let outcomes = scheduler.tick().await;
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().all(|o| o.writeback_error.is_some()));
        assert_eq!(scheduler.queue.len(), 1);

        let outcomes = scheduler.tick().await;
        assert_eq!(outcomes.len(), 1);
        assert!(scheduler.queue.is_empty());
        assert_eq!(writer.submissions().len(), 4);
        assert_eq!(scheduler.engine.stats().writeback_failures, 4);
    }

    #[tokio::test]
    async fn test_failing_feed_falls_back_per_request() {
        let source = ScriptedSource::always_failing();
        let writer = RecordingWriter::default();
        let (_tx, mut scheduler) = scheduler(source.clone(), writer.clone(), 3);
        scheduler.queue.push(request(1));
        scheduler.queue.push(request(2));

        let outcomes = scheduler.tick().await;
        assert!(outcomes.iter().all(|o| o.state == RequestState::FallbackSubmitted));
        assert_eq!(source.calls(), 10);
        assert!(writer.submissions().iter().all(|(_, price, _)| price.is_zero()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_ticks_until_shutdown() {
        let writer = RecordingWriter::default();
        let (tx, scheduler) = scheduler(
            ScriptedSource::succeeding_after(0, "2000.00000000"),
            writer.clone(),
            3,
        );
        for id in 0..5 {
            tx.send(request(id)).unwrap();
        }

        // Ticks at 0ms and 2000ms
        let report = scheduler
            .run(tokio::time::sleep(Duration::from_millis(3000)))
            .await;

        assert_eq!(report.stats.processed, 5);
        assert_eq!(report.pending, 0);
        assert_eq!(writer.submissions().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_leaves_pending_requests() {
        let writer = RecordingWriter::default();
        let (tx, scheduler) = scheduler(
            ScriptedSource::succeeding_after(0, "2000.00000000"),
            writer.clone(),
            1,
        );
        for id in 0..5 {
            tx.send(request(id)).unwrap();
        }

        let report = scheduler
            .run(tokio::time::sleep(Duration::from_millis(2500)))
            .await;

        assert_eq!(report.stats.processed, 2);
        assert_eq!(report.pending, 3);
    }
}
