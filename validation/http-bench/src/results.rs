//! Results of a single benchmark run.

use bench_core::{ProtocolVersion, Summary, WorkerStats};
use serde::Serialize;

/// Everything reported for one run: what was asked, what happened.
#[derive(Debug, Clone, Serialize)]
pub struct RunResults {
    pub timestamp: String,
    pub config_name: String,
    pub uri: String,
    pub concurrency: usize,
    pub requests: usize,
    pub keep_alive: bool,
    pub protocol_version: ProtocolVersion,
    /// True when the run was interrupted before every request was issued.
    pub cancelled: bool,
    /// Wall-clock time from launch to the last worker stopping.
    pub wall_secs: f64,
    pub summary: Summary,
    pub workers: Vec<WorkerStats>,
}

impl RunResults {
    /// Requests that were never issued because the run was cancelled.
    pub fn skipped(&self) -> usize {
        self.requests.saturating_sub(self.summary.processed)
    }

    /// Percentage of processed requests that succeeded.
    pub fn success_percent(&self) -> f64 {
        if self.summary.processed == 0 {
            return 0.0;
        }
        self.summary.success_count as f64 / self.summary.processed as f64 * 100.0
    }

    /// Explicit yields across all workers.
    pub fn forced_yields(&self) -> usize {
        self.workers.iter().map(|w| w.forced_yields).sum()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use bench_core::WorkItemRecord;

    pub(crate) fn sample_results(records: &[WorkItemRecord]) -> RunResults {
        RunResults {
            timestamp: "2026-01-01T00:00:00+00:00".to_string(),
            config_name: "sample".to_string(),
            uri: "http://127.0.0.1:8080/".to_string(),
            concurrency: 2,
            requests: 4,
            keep_alive: true,
            protocol_version: ProtocolVersion::Http11,
            cancelled: false,
            wall_secs: 1.5,
            summary: Summary::from_records(records),
            workers: vec![
                WorkerStats {
                    worker_id: 0,
                    completed: 2,
                    failed: 0,
                    forced_yields: 1,
                },
                WorkerStats {
                    worker_id: 1,
                    completed: 2,
                    failed: 1,
                    forced_yields: 2,
                },
            ],
        }
    }

    pub(crate) fn success(start: f64, end: f64, len: u64) -> WorkItemRecord {
        WorkItemRecord {
            start_instant: start,
            end_instant: end,
            content_length: len,
            failure: None,
        }
    }

    #[test]
    fn test_skipped_and_success_percent() {
        let records = [success(0.0, 1.0, 10), success(0.5, 1.5, 10)];
        let results = sample_results(&records);

        assert_eq!(results.skipped(), 2);
        assert_eq!(results.success_percent(), 100.0);
        assert_eq!(results.forced_yields(), 3);
    }

    #[test]
    fn test_success_percent_with_nothing_processed() {
        let results = sample_results(&[]);
        assert_eq!(results.success_percent(), 0.0);
        assert_eq!(results.skipped(), 4);
    }
}
