//! Buffered click and geo reporting.
//!
//! Reports are accepted into memory and written in batches by a background
//! task, either once the buffer grows past `report_size` or once
//! `report_timeout_ms` has passed since the last flush.

use crate::config::ReportConfig;
use crate::db::{Database, GeoRecord, StatisticsRecord};
use crate::error::ServiceError;
use crate::metrics;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("{0} reporter is closed")]
    Closed(&'static str),
}

/// Destination for flushed batches.
#[async_trait]
pub trait ReportSink<T>: Send + Sync {
    async fn save_all(&self, items: Vec<T>) -> Result<(), ServiceError>;
}

pub struct BatchReporter<T> {
    kind: &'static str,
    buffer: Mutex<Vec<T>>,
    last_flush: Mutex<Instant>,
    closed: AtomicBool,
    sink: Arc<dyn ReportSink<T>>,
    config: ReportConfig,
}

impl<T: Send + 'static> BatchReporter<T> {
    pub fn new(kind: &'static str, sink: Arc<dyn ReportSink<T>>, config: ReportConfig) -> Arc<Self> {
        Arc::new(Self {
            kind,
            buffer: Mutex::new(Vec::with_capacity(config.report_size)),
            last_flush: Mutex::new(Instant::now()),
            closed: AtomicBool::new(false),
            sink,
            config,
        })
    }

    /// Queue one record for the next flush.
    pub fn report(&self, item: T) -> Result<(), ReportError> {
        let mut buffer = self.buffer.lock();
        if self.closed.load(Ordering::Acquire) {
            return Err(ReportError::Closed(self.kind));
        }
        buffer.push(item);
        metrics::set_report_buffered(self.kind, buffer.len());
        Ok(())
    }

    pub fn buffered(&self) -> usize {
        self.buffer.lock().len()
    }

    fn should_flush(&self) -> bool {
        let len = self.buffer.lock().len();
        len > self.config.report_size
            || self.last_flush.lock().elapsed() > Duration::from_millis(self.config.report_timeout_ms)
    }

    fn drain(&self) -> Vec<T> {
        let batch = std::mem::take(&mut *self.buffer.lock());
        *self.last_flush.lock() = Instant::now();
        metrics::set_report_buffered(self.kind, 0);
        batch
    }

    /// Refuse further reports and take what is left. Both happen under the
    /// buffer lock, so an accepted report is always in the returned batch.
    fn close(&self) -> Vec<T> {
        let batch = {
            let mut buffer = self.buffer.lock();
            self.closed.store(true, Ordering::Release);
            std::mem::take(&mut *buffer)
        };
        metrics::set_report_buffered(self.kind, 0);
        batch
    }

    /// Save whatever is buffered. A failed batch is logged and dropped.
    ///
    /// Returns the number of records persisted.
    pub async fn flush(&self) -> usize {
        let batch = self.drain();
        self.save(batch).await
    }

    async fn save(&self, batch: Vec<T>) -> usize {
        if batch.is_empty() {
            return 0;
        }
        let len = batch.len();
        match self.sink.save_all(batch).await {
            Ok(()) => {
                metrics::record_report_flushed(self.kind, len);
                debug!(kind = self.kind, count = len, "Report batch saved");
                len
            }
            Err(e) => {
                metrics::record_report_failure(self.kind);
                error!(kind = self.kind, count = len, error = %e, "Report batch dropped");
                0
            }
        }
    }

    /// Run the flush loop until `shutdown`, then flush one last time.
    pub fn spawn(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        let reporter = Arc::clone(self);
        tokio::spawn(async move {
            let delay = Duration::from_millis(reporter.config.scheduled_delay_ms);
            let poll = Duration::from_millis(reporter.config.poll_interval_ms);

            let mut running = tokio::select! {
                _ = shutdown.cancelled() => false,
                _ = tokio::time::sleep(delay) => true,
            };
            info!(kind = reporter.kind, "Report flusher started");

            while running {
                if reporter.should_flush() {
                    reporter.flush().await;
                }
                running = tokio::select! {
                    _ = shutdown.cancelled() => false,
                    _ = tokio::time::sleep(poll) => true,
                };
            }

            let saved = reporter.save(reporter.close()).await;
            info!(kind = reporter.kind, saved, "Report flusher stopped");
        })
    }
}

/// Writes click statistics to the `statistics` table.
pub struct StatisticsSink {
    db: Database,
}

impl StatisticsSink {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ReportSink<StatisticsRecord> for StatisticsSink {
    async fn save_all(&self, items: Vec<StatisticsRecord>) -> Result<(), ServiceError> {
        self.db.statistics().insert_batch(&items).await?;
        Ok(())
    }
}

/// Writes geo rows to the `geo` table.
pub struct GeoSink {
    db: Database,
}

impl GeoSink {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ReportSink<GeoRecord> for GeoSink {
    async fn save_all(&self, items: Vec<GeoRecord>) -> Result<(), ServiceError> {
        self.db.geo().insert_batch(&items).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbError;

    #[derive(Default)]
    struct CollectingSink {
        batches: Mutex<Vec<Vec<u32>>>,
    }

    #[async_trait]
    impl ReportSink<u32> for CollectingSink {
        async fn save_all(&self, items: Vec<u32>) -> Result<(), ServiceError> {
            self.batches.lock().push(items);
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl ReportSink<u32> for FailingSink {
        async fn save_all(&self, _items: Vec<u32>) -> Result<(), ServiceError> {
            Err(ServiceError::Db(DbError::InvalidTimestamp("test")))
        }
    }

    fn config(report_size: usize, report_timeout_ms: u64) -> ReportConfig {
        ReportConfig {
            scheduled_delay_ms: 0,
            report_timeout_ms,
            poll_interval_ms: 10,
            report_size,
        }
    }

    async fn wait_for(mut done: impl FnMut() -> bool) {
        for _ in 0..200 {
            if done() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test]
    async fn flushes_when_buffer_exceeds_size() {
        let sink = Arc::new(CollectingSink::default());
        let reporter = BatchReporter::<u32>::new("test", sink.clone(), config(2, 60_000));
        let shutdown = CancellationToken::new();
        let handle = reporter.spawn(shutdown.clone());

        for i in 0..3 {
            reporter.report(i).unwrap();
        }
        wait_for(|| !sink.batches.lock().is_empty()).await;
        assert_eq!(sink.batches.lock()[0], vec![0, 1, 2]);

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn small_batches_wait_for_timeout() {
        let sink = Arc::new(CollectingSink::default());
        let reporter = BatchReporter::<u32>::new("test", sink.clone(), config(100, 50));
        let shutdown = CancellationToken::new();
        let handle = reporter.spawn(shutdown.clone());

        reporter.report(7).unwrap();
        wait_for(|| !sink.batches.lock().is_empty()).await;
        assert_eq!(sink.batches.lock()[0], vec![7]);
        assert_eq!(reporter.buffered(), 0);

        shutdown.cancel();
        handle.await.unwrap();
        // Empty buffers never reach the sink.
        assert_eq!(sink.batches.lock().len(), 1);
    }

    #[tokio::test]
    async fn failed_batch_is_dropped() {
        let reporter = BatchReporter::<u32>::new("test", Arc::new(FailingSink), config(100, 60_000));
        reporter.report(1).unwrap();
        reporter.report(2).unwrap();

        assert_eq!(reporter.flush().await, 0);
        assert_eq!(reporter.buffered(), 0);
    }

    #[tokio::test]
    async fn shutdown_flushes_and_closes() {
        let sink = Arc::new(CollectingSink::default());
        let reporter = BatchReporter::<u32>::new("test", sink.clone(), config(100, 60_000));
        let shutdown = CancellationToken::new();
        let handle = reporter.spawn(shutdown.clone());

        reporter.report(1).unwrap();
        reporter.report(2).unwrap();
        shutdown.cancel();
        handle.await.unwrap();

        assert_eq!(*sink.batches.lock(), vec![vec![1, 2]]);
        assert!(matches!(reporter.report(3), Err(ReportError::Closed("test"))));
    }

    #[tokio::test]
    async fn close_takes_every_accepted_report() {
        let sink = Arc::new(CollectingSink::default());
        let reporter = BatchReporter::<u32>::new("test", sink, config(100, 60_000));
        reporter.report(1).unwrap();
        reporter.report(2).unwrap();

        assert_eq!(reporter.close(), vec![1, 2]);
        assert!(matches!(reporter.report(3), Err(ReportError::Closed("test"))));
        assert_eq!(reporter.buffered(), 0);
    }

    #[tokio::test]
    async fn statistics_batch_with_existing_id_keeps_other_reports() {
        let db = crate::db::memory().await;
        let reporter = BatchReporter::<StatisticsRecord>::new(
            "statistics",
            Arc::new(StatisticsSink::new(db.clone())),
            config(100, 60_000),
        );
        let click = |id| StatisticsRecord {
            id,
            link_id: 1,
            ip: "198.51.100.1".into(),
            user_agent: "test".into(),
            referer: "".into(),
            clicked_at: crate::support::datetime::now(),
        };

        reporter.report(click(Some(1))).unwrap();
        assert_eq!(reporter.flush().await, 1);

        for _ in 0..10 {
            reporter.report(click(None)).unwrap();
        }
        reporter.report(click(Some(1))).unwrap();
        assert_eq!(reporter.flush().await, 11);
        assert_eq!(db.statistics().list().await.unwrap().len(), 11);
    }

    #[tokio::test]
    async fn statistics_sink_writes_rows() {
        let db = crate::db::memory().await;
        let sink = StatisticsSink::new(db.clone());
        sink.save_all(vec![StatisticsRecord {
            id: None,
            link_id: 1,
            ip: "198.51.100.1".into(),
            user_agent: "test".into(),
            referer: "".into(),
            clicked_at: crate::support::datetime::now(),
        }])
        .await
        .unwrap();
        assert_eq!(db.statistics().list().await.unwrap().len(), 1);
    }
}
