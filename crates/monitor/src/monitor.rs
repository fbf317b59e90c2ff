use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use tracing::{debug, error, info, warn};

use common::config::WatchConfig;
use common::{ChangeNotifier, ChangePublisher, StrategyStatus, APP_NAME};
use matcher::PatternSet;
use tailer::{newest_log_file, read_tail, LogTailer, DEFAULT_BACKFILL_BYTES};

use crate::snapshot::{write_snapshot, Snapshot};
use crate::table::StatusTable;

/// The reconciliation loop: reads lines from the tailer, runs them through
/// the matcher/completer pipeline, diffs against the status table, and on
/// each observable change rewrites the snapshot and hands the change to the
/// collaborators.
///
/// Owns the table and the snapshot file exclusively; there is exactly one
/// writer, so no locking is needed. Collaborator calls are best-effort:
/// failures are logged and the loop moves on.
pub struct StatusMonitor {
    watch: WatchConfig,
    patterns: PatternSet,
    tailer: LogTailer,
    table: StatusTable,
    publisher: Option<Arc<dyn ChangePublisher>>,
    notifier: Option<Arc<dyn ChangeNotifier>>,
    /// Set only on successful email delivery; the cooldown window is
    /// measured from here, not from the last change.
    last_email_sent: Option<Instant>,
}

impl StatusMonitor {
    pub fn new(watch: WatchConfig, patterns: PatternSet) -> Self {
        let tailer = LogTailer::new(
            watch.log_dir.clone(),
            Duration::from_secs_f64(watch.poll_interval_secs),
        );
        Self {
            watch,
            patterns,
            tailer,
            table: StatusTable::new(),
            publisher: None,
            notifier: None,
            last_email_sent: None,
        }
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn ChangePublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn ChangeNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Run the monitor: one backfill pass, then live tailing forever.
    /// Call from `tokio::spawn`; terminates only with the process.
    pub async fn run(mut self) {
        info!(
            log_dir = %self.watch.log_dir.display(),
            snapshot = %self.watch.status_json_path.display(),
            "Watching platform logs"
        );

        self.backfill();

        loop {
            let line = self.tailer.next_line().await;
            if line.is_empty() {
                continue;
            }
            self.process_line(&line).await;
        }
    }

    /// Seed the table from the tail of the current newest log file and write
    /// one snapshot immediately, so external consumers get a correct picture
    /// without waiting for the next live event. Failures here are logged,
    /// never fatal.
    fn backfill(&mut self) {
        if let Some(latest) = newest_log_file(&self.watch.log_dir) {
            for line in read_tail(&latest, DEFAULT_BACKFILL_BYTES) {
                if line.is_empty() {
                    continue;
                }
                if let Some(status) = self.parse_line(&line, false) {
                    self.table.apply(status);
                }
            }
        }

        match write_snapshot(&self.watch.status_json_path, &Snapshot::of(&self.table)) {
            Ok(()) => info!(strategies = self.table.len(), "Initial status snapshot written"),
            Err(e) => error!(error = %e, "Failed to write initial snapshot"),
        }
    }

    /// Filter, match, and complete one line into a keyable record.
    fn parse_line(&self, line: &str, live: bool) -> Option<StrategyStatus> {
        if !self.line_allowed(line) {
            return None;
        }
        // Most log lines are not status lines; a non-match is silent.
        let mut parsed = self.patterns.match_line(line)?;
        self.patterns.complete(line, &mut parsed);

        if parsed.name.is_empty() {
            // Backfill replays a large tail; only live lines warrant a warning.
            if live {
                warn!(line = %line, "Could not determine strategy name from line");
            } else {
                debug!(line = %line, "Could not determine strategy name from line");
            }
            return None;
        }
        Some(parsed.into())
    }

    /// Allow-list filter: with a non-empty configured list, the line must
    /// contain at least one substring, case-insensitively.
    fn line_allowed(&self, line: &str) -> bool {
        if self.watch.match_strategies.is_empty() {
            return true;
        }
        let low = line.to_lowercase();
        self.watch
            .match_strategies
            .iter()
            .any(|s| low.contains(&s.to_lowercase()))
    }

    async fn process_line(&mut self, line: &str) {
        let Some(status) = self.parse_line(line, true) else {
            return;
        };

        if !self.table.apply(status.clone()) {
            return;
        }

        info!(
            name = %status.name,
            instrument = %status.instrument,
            enabled = status.enabled,
            connection = %status.connection,
            "Strategy status change"
        );

        match write_snapshot(&self.watch.status_json_path, &Snapshot::of(&self.table)) {
            Ok(()) => info!(strategies = self.table.len(), "Status snapshot updated"),
            Err(e) => error!(error = %e, "Failed to write status snapshot"),
        }

        if let Some(publisher) = &self.publisher {
            if let Err(e) = publisher.publish(&status).await {
                error!(error = %e, "Failed to publish status change");
            }
        }

        if self.watch.email_on_change {
            self.maybe_email(&status).await;
        }
    }

    /// Send a change email unless one went out within the cooldown window.
    async fn maybe_email(&mut self, status: &StrategyStatus) {
        let Some(notifier) = &self.notifier else {
            return;
        };

        let cooldown = Duration::from_secs(self.watch.cooldown_min * 60);
        if let Some(sent) = self.last_email_sent {
            if sent.elapsed() <= cooldown {
                return;
            }
        }

        let state = if status.enabled { "ENABLED" } else { "DISABLED" };
        let subject = format!("[{APP_NAME}] Change: {} {state}", status.name);
        let body = format!(
            "{} Strategy status changed\n\
             Name: {}\n\
             Instrument: {}\n\
             Enabled: {}\n\
             Connection: {}\n\
             Log: {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            status.name,
            status.instrument,
            status.enabled,
            status.connection,
            self.tailer
                .current_path()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        );

        match notifier.notify(&subject, &body).await {
            Ok(()) => self.last_email_sent = Some(Instant::now()),
            Err(e) => error!(error = %e, "Failed to send change email"),
        }
    }
}
