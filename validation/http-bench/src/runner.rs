//! Benchmark orchestration: build the session, watch it, collect results.

use std::time::{Duration, Instant};

use anyhow::Context;
use bench_core::{BenchSession, SessionState};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::BenchConfig;
use crate::results::RunResults;

/// Runs one benchmark and reports progress while it goes.
pub struct LoadRunner {
    config: BenchConfig,
    progress_interval: Duration,
    quiet: bool,
}

impl LoadRunner {
    /// Create a new load runner. Progress is polled once per second.
    pub fn new(config: BenchConfig) -> Self {
        Self {
            config,
            progress_interval: Duration::from_secs(1),
            quiet: false,
        }
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Suppress the banner and progress bar.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Run the benchmark until every request is processed or `cancel` fires.
    ///
    /// Cancellation stops new requests from being issued; the results cover
    /// whatever was processed.
    pub async fn run(&self, cancel: CancellationToken) -> anyhow::Result<RunResults> {
        self.config.validate()?;

        let session = BenchSession::new(self.config.session_config())
            .context("Failed to create benchmark session")?;

        if !self.quiet {
            println!(
                "KeepAlive = {}; HTTP {}",
                self.config.keep_alive, self.config.protocol_version
            );
        }

        let pb = self.progress_bar()?;
        let started = Instant::now();
        let handle = session.run(cancel.clone())?;

        let mut ticker = tokio::time::interval(self.progress_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let processed = session.results().processed();
            let active = session.active_count();
            pb.set_position(processed as u64);
            pb.set_message(format!("active: {}", active));
            debug!(processed, active, "Progress");
            if session.state() == SessionState::Completed {
                break;
            }
        }

        let workers = handle.wait().await?;
        let wall_secs = started.elapsed().as_secs_f64();
        let summary = session.summary();
        pb.set_position(summary.processed as u64);
        pb.finish_with_message("Complete!");
        session.close();

        Ok(RunResults {
            timestamp: chrono::Utc::now().to_rfc3339(),
            config_name: self.config.name.clone(),
            uri: self.config.uri.clone(),
            concurrency: self.config.concurrency,
            requests: self.config.requests,
            keep_alive: self.config.keep_alive,
            protocol_version: self.config.protocol_version,
            cancelled: cancel.is_cancelled() && summary.processed < self.config.requests,
            wall_secs,
            summary,
            workers,
        })
    }

    fn progress_bar(&self) -> anyhow::Result<ProgressBar> {
        if self.quiet {
            return Ok(ProgressBar::hidden());
        }
        let pb = ProgressBar::new(self.config.requests as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
                .context("Invalid progress bar template")?
                .progress_chars("##-"),
        );
        Ok(pb)
    }
}
