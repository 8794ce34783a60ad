//! The per-worker claim/request/record loop.

use std::any::Any;
use std::future::{poll_fn, Future};
use std::panic::AssertUnwindSafe;
use std::pin::pin;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use futures::{FutureExt, StreamExt};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::RequestError;
use crate::record::WorkItemRecord;
use crate::session::SessionShared;
use crate::sink::LengthCounter;
use crate::transport::RequestClient;

/// Counters a worker reports when its loop ends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkerStats {
    pub worker_id: usize,
    /// Work items this worker executed.
    pub completed: usize,
    /// Of those, how many recorded a failure.
    pub failed: usize,
    /// Iterations that finished without suspending and were followed by an
    /// explicit yield.
    pub forced_yields: usize,
}

/// One execution context, bound to a single client for its whole life.
///
/// A worker counts itself in `running_workers` from construction until it is
/// dropped, so a task aborted before its first poll is still accounted for.
pub(crate) struct Worker<C> {
    id: usize,
    client: Arc<C>,
    shared: Arc<SessionShared>,
    origin: Instant,
}

impl<C: RequestClient> Worker<C> {
    pub(crate) fn new(
        id: usize,
        client: Arc<C>,
        shared: Arc<SessionShared>,
        origin: Instant,
    ) -> Self {
        shared.running_workers.fetch_add(1, Ordering::AcqRel);
        Self {
            id,
            client,
            shared,
            origin,
        }
    }

    /// Claim and execute work items until the supply runs out or `cancel`
    /// fires. Cancellation is only observed between items.
    pub(crate) async fn run(self, cancel: CancellationToken) -> WorkerStats {
        let mut stats = WorkerStats {
            worker_id: self.id,
            ..WorkerStats::default()
        };

        debug!(worker_id = self.id, "Worker started");

        loop {
            if cancel.is_cancelled() {
                debug!(worker_id = self.id, "Worker observed cancellation");
                break;
            }

            let Some(index) = self.shared.distributor.claim_next() else {
                break;
            };

            let mut item = InFlight::begin(&self.shared, index, self.origin);
            let mut suspended = false;
            let outcome = {
                let mut execution = pin!(AssertUnwindSafe(self.execute()).catch_unwind());
                poll_fn(|cx| {
                    let poll = execution.as_mut().poll(cx);
                    if poll.is_pending() {
                        suspended = true;
                    }
                    poll
                })
                .await
            };
            let (content_length, failure) = outcome.unwrap_or_else(|payload| {
                let reason = format!("request panicked: {}", panic_message(payload.as_ref()));
                (0, Some(RequestError::Transport(reason)))
            });

            if let Some(err) = &failure {
                trace!(worker_id = self.id, index, error = %err, "Request failed");
                stats.failed += 1;
            }
            item.complete(content_length, failure);
            drop(item);
            stats.completed += 1;

            // An item that never suspended would let this task run forever
            // on a cooperative scheduler; hand the thread back.
            if !suspended {
                stats.forced_yields += 1;
                tokio::task::yield_now().await;
            }
        }

        debug!(
            worker_id = self.id,
            completed = stats.completed,
            failed = stats.failed,
            forced_yields = stats.forced_yields,
            "Worker finished"
        );

        stats
    }

    /// Issue the request and drain its body through a [`LengthCounter`].
    ///
    /// Returns the bytes read and the failure, if any. Bytes read before a
    /// failure are still reported.
    async fn execute(&self) -> (u64, Option<RequestError>) {
        let mut response = match self.client.get(&self.shared.request).await {
            Ok(response) => response,
            Err(err) => return (0, Some(err)),
        };

        let mut sink = LengthCounter::new();
        while let Some(chunk) = response.body.next().await {
            let written = match chunk {
                Ok(bytes) => sink.write_all(&bytes).await,
                Err(err) => return (sink.len(), Some(err)),
            };
            if let Err(err) = written {
                return (sink.len(), Some(RequestError::Body(err.to_string())));
            }
        }

        let failure = (!response.is_success()).then(|| RequestError::Status(response.status));
        (sink.len(), failure)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

/// A claimed work item whose record is finalized on drop.
///
/// The record starts out as an abort failure, so an item whose future is
/// dropped midway (task abort) is still published and counted.
struct InFlight<'a> {
    shared: &'a SessionShared,
    index: usize,
    origin: Instant,
    record: WorkItemRecord,
}

impl<'a> InFlight<'a> {
    fn begin(shared: &'a SessionShared, index: usize, origin: Instant) -> Self {
        shared.active.fetch_add(1, Ordering::Relaxed);
        let record = WorkItemRecord {
            start_instant: origin.elapsed().as_secs_f64(),
            end_instant: 0.0,
            content_length: 0,
            failure: Some(RequestError::Transport("request aborted".to_string())),
        };
        Self {
            shared,
            index,
            origin,
            record,
        }
    }

    fn complete(&mut self, content_length: u64, failure: Option<RequestError>) {
        self.record.content_length = content_length;
        self.record.failure = failure;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut record = std::mem::take(&mut self.record);
        record.end_instant = self
            .origin
            .elapsed()
            .as_secs_f64()
            .max(record.start_instant);
        self.shared.active.fetch_sub(1, Ordering::Relaxed);
        if !self.shared.results.publish(self.index, record) {
            debug!(index = self.index, "Work item record was already published");
        }
    }
}

impl<C> Drop for Worker<C> {
    fn drop(&mut self) {
        self.shared.running_workers.fetch_sub(1, Ordering::AcqRel);
    }
}
