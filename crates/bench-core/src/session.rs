//! Benchmark session: owns the clients, the result buffer and the counters,
//! and launches the workers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use reqwest::Url;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::aggregate::Summary;
use crate::distributor::WorkDistributor;
use crate::error::{BenchError, Result};
use crate::http::ReqwestClient;
use crate::record::{ResultBuffer, WorkItemRecord};
use crate::transport::{GetRequest, ProtocolVersion, RequestClient, TransportSettings};
use crate::worker::{Worker, WorkerStats};

/// Inputs needed to build a [`BenchSession`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub uri: String,
    /// Number of workers, each with its own client.
    pub concurrency: usize,
    pub total_requests: usize,
    pub transport: TransportSettings,
}

impl SessionConfig {
    pub fn new(uri: impl Into<String>, concurrency: usize, total_requests: usize) -> Self {
        Self {
            uri: uri.into(),
            concurrency,
            total_requests,
            transport: TransportSettings::default(),
        }
    }

    pub fn keep_alive(mut self, keep_alive: bool) -> Self {
        self.transport.keep_alive = keep_alive;
        self
    }

    pub fn protocol(mut self, protocol: ProtocolVersion) -> Self {
        self.transport.protocol = protocol;
        self
    }

    pub fn transport(mut self, transport: TransportSettings) -> Self {
        self.transport = transport;
        self
    }

    fn validate(&self) -> Result<Url> {
        if self.concurrency == 0 {
            return Err(BenchError::config("concurrency must be > 0"));
        }
        if self.total_requests == 0 {
            return Err(BenchError::config("total request count must be > 0"));
        }
        Url::parse(&self.uri).map_err(|e| BenchError::InvalidUri {
            uri: self.uri.clone(),
            reason: e.to_string(),
        })
    }
}

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NotStarted,
    Running,
    Completed,
}

/// State shared between the session and its workers.
#[derive(Debug)]
pub(crate) struct SessionShared {
    pub(crate) request: GetRequest,
    pub(crate) distributor: WorkDistributor,
    pub(crate) results: ResultBuffer,
    /// Requests currently in flight.
    pub(crate) active: AtomicUsize,
    pub(crate) running_workers: AtomicUsize,
}

/// Non-blocking progress snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress<'a> {
    /// Finalized records, in index order.
    pub processed: Vec<&'a WorkItemRecord>,
    /// Requests currently in flight.
    pub active: usize,
}

/// One benchmark run against one target.
///
/// Owns one client per worker. Every client is released when the session is
/// closed or dropped; a failing release is logged and the rest still run.
pub struct BenchSession<C: RequestClient = ReqwestClient> {
    clients: Vec<Arc<C>>,
    shared: Arc<SessionShared>,
    started_at: OnceLock<Instant>,
}

impl BenchSession<ReqwestClient> {
    /// Build a session with one `reqwest` client per worker.
    pub fn new(config: SessionConfig) -> Result<Self> {
        Self::connect(config, |worker, settings| {
            ReqwestClient::new(settings)
                .map_err(|e| BenchError::client_build(worker, e.to_string()))
        })
    }
}

impl<C: RequestClient> BenchSession<C> {
    /// Build a session, creating the client for worker `i` with `make_client`.
    ///
    /// If any client fails to build, the ones already created are released
    /// before the error is returned.
    pub fn connect<F>(config: SessionConfig, mut make_client: F) -> Result<Self>
    where
        F: FnMut(usize, &TransportSettings) -> Result<C>,
    {
        let uri = config.validate()?;

        let mut clients = Vec::with_capacity(config.concurrency);
        for worker in 0..config.concurrency {
            match make_client(worker, &config.transport) {
                Ok(client) => clients.push(Arc::new(client)),
                Err(err) => {
                    release_all(&mut clients);
                    return Err(err);
                }
            }
        }

        let shared = SessionShared {
            request: GetRequest {
                uri,
                protocol: config.transport.protocol,
                keep_alive: config.transport.keep_alive,
            },
            distributor: WorkDistributor::new(config.total_requests),
            results: ResultBuffer::new(config.total_requests),
            active: AtomicUsize::new(0),
            running_workers: AtomicUsize::new(0),
        };

        Ok(Self {
            clients,
            shared: Arc::new(shared),
            started_at: OnceLock::new(),
        })
    }

    /// Start the clock and launch every worker on the current tokio runtime.
    ///
    /// Workers stop claiming new items once `cancel` fires; items already
    /// claimed run to completion.
    pub fn run(&self, cancel: CancellationToken) -> Result<CompletionHandle> {
        let origin = Instant::now();
        if self.started_at.set(origin).is_err() {
            return Err(BenchError::AlreadyStarted);
        }

        info!(
            uri = %self.shared.request.uri,
            workers = self.clients.len(),
            requests = self.shared.results.len(),
            keep_alive = self.shared.request.keep_alive,
            protocol = %self.shared.request.protocol,
            "Starting benchmark"
        );

        // Count every worker before any task can observe the counter.
        let workers: Vec<_> = self
            .clients
            .iter()
            .enumerate()
            .map(|(id, client)| Worker::new(id, client.clone(), self.shared.clone(), origin))
            .collect();

        let handles = workers
            .into_iter()
            .map(|worker| tokio::spawn(worker.run(cancel.clone())))
            .collect();

        Ok(CompletionHandle {
            workers: handles,
            shared: self.shared.clone(),
        })
    }

    pub fn state(&self) -> SessionState {
        if self.started_at.get().is_none() {
            SessionState::NotStarted
        } else if self.shared.running_workers.load(Ordering::Acquire) > 0 {
            SessionState::Running
        } else {
            SessionState::Completed
        }
    }

    /// Finalized records; safe to call while workers run.
    pub fn processed_view(&self) -> Vec<&WorkItemRecord> {
        self.shared.results.processed_view()
    }

    /// Requests currently in flight.
    pub fn active_count(&self) -> usize {
        self.shared.active.load(Ordering::Relaxed)
    }

    pub fn progress(&self) -> Progress<'_> {
        Progress {
            processed: self.processed_view(),
            active: self.active_count(),
        }
    }

    /// Full result buffer, indexed by work item.
    pub fn results(&self) -> &ResultBuffer {
        &self.shared.results
    }

    pub fn concurrency(&self) -> usize {
        self.clients.len()
    }

    pub fn total_requests(&self) -> usize {
        self.shared.results.len()
    }

    /// Aggregate every finalized record.
    pub fn summary(&self) -> Summary {
        Summary::from_buffer(&self.shared.results)
    }

    /// Release all clients. Equivalent to dropping the session.
    pub fn close(self) {}
}

impl<C: RequestClient> Drop for BenchSession<C> {
    fn drop(&mut self) {
        release_all(&mut self.clients);
    }
}

/// Release clients last-created first, swallowing individual failures.
fn release_all<C: RequestClient>(clients: &mut Vec<Arc<C>>) {
    while let Some(client) = clients.pop() {
        let worker = clients.len();
        if let Err(err) = client.release() {
            warn!(worker_id = worker, error = %err, "Failed to release client");
        }
    }
}

/// Resolves once every worker has stopped claiming work.
#[derive(Debug)]
pub struct CompletionHandle {
    workers: Vec<JoinHandle<WorkerStats>>,
    shared: Arc<SessionShared>,
}

impl CompletionHandle {
    pub fn is_finished(&self) -> bool {
        self.workers.iter().all(JoinHandle::is_finished)
    }

    /// Wait for every worker and return their stats in worker order.
    ///
    /// All workers are awaited even when one of them failed; the first
    /// failure is returned once none of them is running.
    pub async fn wait(self) -> Result<Vec<WorkerStats>> {
        let mut stats = Vec::with_capacity(self.workers.len());
        let mut first_failure = None;
        for handle in self.workers {
            match handle.await {
                Ok(worker) => stats.push(worker),
                Err(err) => {
                    warn!(error = %err, "Worker task failed");
                    first_failure.get_or_insert(BenchError::WorkerFailed(err.to_string()));
                }
            }
        }

        if let Some(err) = first_failure {
            return Err(err);
        }

        info!(
            processed = self.shared.results.processed(),
            requests = self.shared.results.len(),
            "Benchmark completed"
        );

        Ok(stats)
    }

    /// Abort every worker. In-flight items are recorded as aborted failures.
    pub fn abort(&self) {
        for handle in &self.workers {
            handle.abort();
        }
    }
}
