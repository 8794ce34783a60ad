//! Concurrent HTTP load-generation engine.
//!
//! A [`BenchSession`] owns one request-issuing client per worker and a
//! preallocated [`ResultBuffer`] with one slot per planned request. When run,
//! every worker repeatedly claims the next index from a shared
//! [`WorkDistributor`], issues one GET, measures the body with a
//! [`LengthCounter`] and publishes a [`WorkItemRecord`]. The only shared
//! mutable state on the hot path is a handful of atomic counters.
//!
//! ```ignore
//! use bench_core::{BenchSession, SessionConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let session = BenchSession::new(SessionConfig::new("http://localhost:8080/", 8, 10_000))?;
//! let handle = session.run(CancellationToken::new())?;
//! handle.wait().await?;
//! println!("{:.1} req/s", session.summary().request_rate);
//! ```

pub mod aggregate;
pub mod distributor;
pub mod error;
pub mod http;
pub mod record;
pub mod session;
pub mod sink;
pub mod transport;
mod worker;

pub use aggregate::{LatencyStats, Summary};
pub use distributor::WorkDistributor;
pub use error::{BenchError, ReleaseError, RequestError, Result};
pub use http::ReqwestClient;
pub use record::{ResultBuffer, WorkItemRecord};
pub use session::{BenchSession, CompletionHandle, Progress, SessionConfig, SessionState};
pub use sink::LengthCounter;
pub use transport::{
    BodyStream, GetRequest, ProtocolVersion, RequestClient, Response, TransportSettings,
};
pub use worker::WorkerStats;
