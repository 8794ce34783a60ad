//! Results reporting and formatting.
//!
//! Undefined rates are printed as they are: `NaN` when nothing succeeded and
//! `inf` when every success shares one instant. JSON writes them as `null`.

use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};

use crate::results::RunResults;

/// Formats run results for output.
pub struct ResultsReport;

impl ResultsReport {
    /// Format results as a console table.
    pub fn format_table(results: &RunResults) -> String {
        let summary = &results.summary;
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![format!("Benchmark Results: {}", results.config_name)]);

        table.add_row(vec!["Target:", &results.uri]);
        table.add_row(vec![
            "Connection:",
            &format!(
                "KeepAlive = {}; HTTP {}",
                results.keep_alive, results.protocol_version
            ),
        ]);
        table.add_row(vec!["Concurrency:", &format!("{}", results.concurrency)]);
        table.add_row(vec!["Wall time:", &format!("{:.2}s", results.wall_secs)]);
        if results.cancelled {
            table.add_row(vec![
                "Cancelled:",
                &format!("{} requests not issued", results.skipped()),
            ]);
        }

        table.add_row(vec!["", ""]);
        table.add_row(vec![
            "Requests:",
            &format!("{} / {}", summary.processed, results.requests),
        ]);
        table.add_row(vec!["Successful:", &format!("{}", summary.success_count)]);
        table.add_row(vec!["Errors:", &format!("{}", summary.error_count)]);
        for (kind, count) in &summary.errors_by_kind {
            table.add_row(vec![format!("  {}", kind), format!("{}", count)]);
        }
        table.add_row(vec![
            "Success Rate:",
            &format!("{:.1}%", results.success_percent()),
        ]);

        table.add_row(vec!["", ""]);
        table.add_row(vec!["Elapsed:", &format!("{:.3}s", summary.elapsed_secs)]);
        table.add_row(vec![
            "Requests/sec:",
            &format!("{:.2}", summary.request_rate),
        ]);
        table.add_row(vec![
            "Throughput:",
            &format!("{:.2} MB/s", summary.throughput_mbps),
        ]);
        table.add_row(vec!["Bytes:", &format!("{}", summary.total_bytes)]);

        if let Some(latency) = &summary.latency {
            table.add_row(vec!["", ""]);
            table.add_row(vec!["Latency (ms)", "min / mean / p50 / p90 / p99 / max"]);
            table.add_row(vec![
                "",
                &format!(
                    "{:.1} / {:.1} / {:.1} / {:.1} / {:.1} / {:.1}",
                    latency.min_ms,
                    latency.mean_ms,
                    latency.p50_ms,
                    latency.p90_ms,
                    latency.p99_ms,
                    latency.max_ms
                ),
            ]);
        }

        table.to_string()
    }

    /// Format results as JSON.
    pub fn format_json(results: &RunResults) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(results)?)
    }

    /// Format results as CSV row.
    pub fn format_csv(results: &RunResults) -> String {
        let summary = &results.summary;
        let (p50, p99) = summary
            .latency
            .as_ref()
            .map_or((f64::NAN, f64::NAN), |l| (l.p50_ms, l.p99_ms));
        format!(
            "{},{},{},{},{},{},{},{},{},{:.3},{:.2},{:.2},{:.1},{:.1}",
            results.timestamp,
            results.config_name,
            results.concurrency,
            results.requests,
            results.keep_alive,
            results.protocol_version,
            summary.success_count,
            summary.error_count,
            summary.total_bytes,
            summary.elapsed_secs,
            summary.request_rate,
            summary.throughput_mbps,
            p50,
            p99
        )
    }

    /// CSV header row.
    pub fn csv_header() -> &'static str {
        "timestamp,config,concurrency,requests,keep_alive,protocol,success,errors,bytes,elapsed,rps,mbps,p50,p99"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::tests::{sample_results, success};
    use bench_core::{RequestError, WorkItemRecord};

    fn failure() -> WorkItemRecord {
        WorkItemRecord {
            start_instant: 0.0,
            end_instant: 0.1,
            content_length: 0,
            failure: Some(RequestError::Connect("refused".into())),
        }
    }

    #[test]
    fn test_table_contains_headline_numbers() {
        let records = [success(0.0, 1.0, 1024 * 1024), success(1.0, 2.0, 1024 * 1024)];
        let table = ResultsReport::format_table(&sample_results(&records));

        assert!(table.contains("Benchmark Results: sample"));
        assert!(table.contains("KeepAlive = true; HTTP 1.1"));
        assert!(table.contains("2 / 4"));
        assert!(table.contains("1.00 MB/s"));
        assert!(table.contains("Latency (ms)"));
        assert!(!table.contains("Cancelled:"));
    }

    #[test]
    fn test_table_shows_nan_rates_and_error_kinds() {
        let records = [failure(), failure()];
        let mut results = sample_results(&records);
        results.cancelled = true;
        let table = ResultsReport::format_table(&results);

        assert!(table.contains("NaN"));
        assert!(table.contains("connect"));
        assert!(table.contains("2 requests not issued"));
        assert!(!table.contains("Latency (ms)"));
    }

    #[test]
    fn test_json_writes_null_for_undefined_rates() {
        let records = [failure()];
        let json = ResultsReport::format_json(&sample_results(&records)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert!(value["summary"]["request_rate"].is_null());
        assert!(value["summary"]["throughput_mbps"].is_null());
        assert_eq!(value["summary"]["errors_by_kind"]["connect"], 1);
        assert_eq!(value["protocol_version"], "1.1");
        assert_eq!(value["workers"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_csv_matches_header() {
        let records = [success(0.0, 0.0, 10)];
        let row = ResultsReport::format_csv(&sample_results(&records));
        let header = ResultsReport::csv_header();

        assert_eq!(row.split(',').count(), header.split(',').count());
        assert!(row.contains(",inf,"));
    }
}
