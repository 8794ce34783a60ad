//! Single-pass statistics over finalized work-item records.

use std::collections::BTreeMap;

use hdrhistogram::Histogram;
use serde::Serialize;

use crate::record::{ResultBuffer, WorkItemRecord};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Aggregate outcome of a run.
///
/// The window, rate and throughput only consider successful requests. With
/// no successes, or a zero-length window, `request_rate` and
/// `throughput_mbps` are NaN or infinite; they are never clamped.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    /// Records aggregated (successes plus errors).
    pub processed: usize,
    pub success_count: usize,
    pub error_count: usize,
    /// Earliest start over successes; +inf when there are none.
    pub min_start: f64,
    /// Latest end over successes; 0 when there are none.
    pub max_end: f64,
    pub elapsed_secs: f64,
    /// Body bytes over successes.
    pub total_bytes: u64,
    /// Successful requests per second.
    pub request_rate: f64,
    /// MiB per second over successes.
    pub throughput_mbps: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency: Option<LatencyStats>,
    /// Error counts keyed by [`RequestError::kind`](crate::RequestError::kind).
    pub errors_by_kind: BTreeMap<String, usize>,
}

/// Latency distribution of successful requests, in milliseconds.
#[derive(Debug, Clone, Serialize)]
pub struct LatencyStats {
    pub min_ms: f64,
    pub mean_ms: f64,
    pub p50_ms: f64,
    pub p90_ms: f64,
    pub p99_ms: f64,
    pub max_ms: f64,
}

impl LatencyStats {
    fn from_histogram(histogram: &Histogram<u64>) -> Option<Self> {
        if histogram.is_empty() {
            return None;
        }
        let ms = |us: u64| us as f64 / 1000.0;
        Some(Self {
            min_ms: ms(histogram.min()),
            mean_ms: histogram.mean() / 1000.0,
            p50_ms: ms(histogram.value_at_quantile(0.50)),
            p90_ms: ms(histogram.value_at_quantile(0.90)),
            p99_ms: ms(histogram.value_at_quantile(0.99)),
            max_ms: ms(histogram.max()),
        })
    }
}

impl Summary {
    /// Aggregate every finalized record in `buffer`.
    pub fn from_buffer(buffer: &ResultBuffer) -> Self {
        Self::from_records(buffer.iter_finalized().map(|(_, record)| record))
    }

    /// Aggregate `records` in one pass.
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a WorkItemRecord>,
    {
        let mut processed = 0;
        let mut success_count = 0;
        let mut min_start = f64::INFINITY;
        let mut max_end = 0.0_f64;
        let mut total_bytes = 0u64;
        let mut errors_by_kind = BTreeMap::new();
        // Latency in microseconds; auto-resizing, so recording cannot overflow.
        let mut histogram = Histogram::<u64>::new(3).ok();

        for record in records {
            processed += 1;
            match &record.failure {
                None => {
                    success_count += 1;
                    min_start = min_start.min(record.start_instant);
                    max_end = max_end.max(record.end_instant);
                    total_bytes += record.content_length;
                    if let Some(histogram) = histogram.as_mut() {
                        let micros = (record.duration_secs() * 1_000_000.0).round() as u64;
                        histogram.record(micros).ok();
                    }
                }
                Some(err) => {
                    *errors_by_kind.entry(err.kind().to_string()).or_insert(0) += 1;
                }
            }
        }

        let elapsed_secs = max_end - min_start;
        let (request_rate, throughput_mbps) = if success_count == 0 {
            (f64::NAN, f64::NAN)
        } else {
            (
                success_count as f64 / elapsed_secs,
                total_bytes as f64 / BYTES_PER_MB / elapsed_secs,
            )
        };

        Self {
            processed,
            success_count,
            error_count: processed - success_count,
            min_start,
            max_end,
            elapsed_secs,
            total_bytes,
            request_rate,
            throughput_mbps,
            latency: histogram.as_ref().and_then(LatencyStats::from_histogram),
            errors_by_kind,
        }
    }

    /// Whether rate and throughput are finite numbers.
    pub fn rates_defined(&self) -> bool {
        self.request_rate.is_finite() && self.throughput_mbps.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RequestError;
    use test_utils::assert_approx_eq;

    fn ok(start: f64, end: f64, bytes: u64) -> WorkItemRecord {
        WorkItemRecord {
            start_instant: start,
            end_instant: end,
            content_length: bytes,
            failure: None,
        }
    }

    fn failed(start: f64, end: f64, err: RequestError) -> WorkItemRecord {
        WorkItemRecord {
            start_instant: start,
            end_instant: end,
            content_length: 0,
            failure: Some(err),
        }
    }

    #[test]
    fn test_all_successful() {
        let records = vec![ok(0.0, 0.5, 1024 * 1024), ok(0.5, 1.0, 1024 * 1024)];
        let summary = Summary::from_records(&records);

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.success_count, 2);
        assert_eq!(summary.error_count, 0);
        assert_approx_eq!(summary.elapsed_secs, 1.0, 1e-12);
        assert_approx_eq!(summary.request_rate, 2.0, 1e-12);
        assert_approx_eq!(summary.throughput_mbps, 2.0, 1e-12);
        assert!(summary.rates_defined());
        assert!(summary.errors_by_kind.is_empty());

        let latency = summary.latency.unwrap();
        assert_approx_eq!(latency.p50_ms, 500.0, 1.0);
        assert_approx_eq!(latency.max_ms, 500.0, 1.0);
    }

    #[test]
    fn test_window_ignores_failures() {
        let records = vec![
            ok(1.0, 2.0, 100),
            failed(0.0, 10.0, RequestError::Status(500)),
            ok(1.5, 3.0, 100),
        ];
        let summary = Summary::from_records(&records);

        assert_eq!(summary.success_count, 2);
        assert_eq!(summary.error_count, 1);
        assert_eq!(summary.min_start, 1.0);
        assert_eq!(summary.max_end, 3.0);
        assert_eq!(summary.total_bytes, 200);
        assert_approx_eq!(summary.request_rate, 1.0, 1e-12);
        assert_eq!(summary.errors_by_kind.get("status"), Some(&1));
    }

    #[test]
    fn test_no_successes_reports_undefined_rates() {
        let records: Vec<_> = (0..4)
            .map(|i| failed(i as f64, i as f64 + 0.1, RequestError::Connect("refused".into())))
            .collect();
        let summary = Summary::from_records(&records);

        assert_eq!(summary.success_count, 0);
        assert_eq!(summary.error_count, 4);
        assert_eq!(summary.min_start, f64::INFINITY);
        assert_eq!(summary.max_end, 0.0);
        assert!(summary.request_rate.is_nan());
        assert!(summary.throughput_mbps.is_nan());
        assert!(!summary.rates_defined());
        assert!(summary.latency.is_none());
        assert_eq!(summary.errors_by_kind.get("connect"), Some(&4));
    }

    #[test]
    fn test_zero_window_is_not_clamped() {
        let records = vec![ok(2.0, 2.0, 0)];
        let summary = Summary::from_records(&records);

        assert_eq!(summary.success_count, 1);
        assert_eq!(summary.elapsed_secs, 0.0);
        assert_eq!(summary.request_rate, f64::INFINITY);
        assert!(summary.throughput_mbps.is_nan());
    }

    #[test]
    fn test_empty_input() {
        let summary = Summary::from_records(std::iter::empty::<&WorkItemRecord>());
        assert_eq!(summary.processed, 0);
        assert!(summary.request_rate.is_nan());
    }

    #[test]
    fn test_non_finite_values_serialize_as_null() {
        let summary = Summary::from_records(std::iter::empty::<&WorkItemRecord>());
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json["request_rate"].is_null());
        assert!(json["min_start"].is_null());
        assert!(json.get("latency").is_none());
    }

    #[test]
    fn test_from_buffer_uses_finalized_slots_only() {
        let buffer = ResultBuffer::new(3);
        buffer.publish(0, ok(0.0, 1.0, 10));
        buffer.publish(2, failed(0.0, 1.0, RequestError::Timeout("1s".into())));

        let summary = Summary::from_buffer(&buffer);
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.success_count, 1);
        assert_eq!(summary.errors_by_kind.get("timeout"), Some(&1));
    }
}
