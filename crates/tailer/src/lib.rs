use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

/// Default byte bound for the startup backfill read, keeping the cost of a
/// huge log file bounded.
pub const DEFAULT_BACKFILL_BYTES: u64 = 2_000_000;

/// Newest platform log file in `dir` by modification time.
///
/// Files named `log*.txt` are preferred; when none exist, any `log*` file
/// qualifies. Returns `None` for an empty or unreadable directory.
pub fn newest_log_file(dir: &Path) -> Option<PathBuf> {
    newest_matching(dir, |name| name.starts_with("log") && name.ends_with(".txt"))
        .or_else(|| newest_matching(dir, |name| name.starts_with("log")))
}

fn newest_matching(dir: &Path, matches: impl Fn(&str) -> bool) -> Option<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "Log directory not readable");
            return None;
        }
    };
    entries
        .flatten()
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter(|e| e.file_name().to_str().map(&matches).unwrap_or(false))
        .filter_map(|e| {
            let mtime = e.metadata().ok()?.modified().ok()?;
            Some((mtime, e.path()))
        })
        .max_by_key(|(mtime, _)| *mtime)
        .map(|(_, path)| path)
}

/// Last lines of a file, bounded to the final `max_bytes` bytes. Decoded
/// lossily; any read error yields an empty list.
pub fn read_tail(path: &Path, max_bytes: u64) -> Vec<String> {
    fn inner(path: &Path, max_bytes: u64) -> std::io::Result<Vec<String>> {
        let mut file = File::open(path)?;
        let size = file.metadata()?.len();
        file.seek(SeekFrom::Start(size.saturating_sub(max_bytes)))?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        Ok(String::from_utf8_lossy(&data)
            .lines()
            .map(str::to_string)
            .collect())
    }
    inner(path, max_bytes).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "Failed to read log tail");
        Vec::new()
    })
}

/// Rotation-aware tail over the newest log file in a directory.
///
/// `next_line` is an effectively infinite line source: it polls for new
/// data, transparently switches to a newer file when one appears (opened at
/// end-of-file, so neither old-file history nor the new file's pre-existing
/// content is replayed), and sleeps one poll interval whenever there is
/// nothing to read. File-open errors are transient and retried next tick.
pub struct LogTailer {
    log_dir: PathBuf,
    poll_interval: Duration,
    current: Option<PathBuf>,
    reader: Option<BufReader<File>>,
    /// Bytes of a line whose trailing newline has not arrived yet.
    pending: Vec<u8>,
}

impl LogTailer {
    pub fn new(log_dir: impl Into<PathBuf>, poll_interval: Duration) -> Self {
        Self {
            log_dir: log_dir.into(),
            poll_interval,
            current: None,
            reader: None,
            pending: Vec::new(),
        }
    }

    /// Path of the file currently being tailed, if any.
    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    /// Next appended line, with trailing newline/carriage-return stripped.
    /// Empty lines are passed through; the caller filters them.
    pub async fn next_line(&mut self) -> String {
        loop {
            self.open_latest();

            let Some(reader) = self.reader.as_mut() else {
                tokio::time::sleep(self.poll_interval).await;
                continue;
            };

            let mut buf = Vec::new();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => {
                    tokio::time::sleep(self.poll_interval).await;
                }
                Ok(_) if buf.ends_with(b"\n") => {
                    self.pending.append(&mut buf);
                    let line = String::from_utf8_lossy(&self.pending)
                        .trim_end_matches(['\r', '\n'])
                        .to_string();
                    self.pending.clear();
                    return line;
                }
                Ok(_) => {
                    // Partial line at EOF; hold it until the writer finishes.
                    self.pending.append(&mut buf);
                    tokio::time::sleep(self.poll_interval).await;
                }
                Err(e) => {
                    warn!(error = %e, "Log read failed; retrying");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }

    /// Switch to the newest log file when it differs from the open one.
    fn open_latest(&mut self) {
        let Some(latest) = newest_log_file(&self.log_dir) else {
            return;
        };
        if self.current.as_deref() == Some(latest.as_path()) {
            return;
        }
        match File::open(&latest) {
            Ok(mut file) => {
                if let Err(e) = file.seek(SeekFrom::End(0)) {
                    warn!(path = %latest.display(), error = %e, "Seek to end failed");
                    return;
                }
                info!(path = %latest.display(), "Tailing log file");
                self.pending.clear();
                self.reader = Some(BufReader::new(file));
                self.current = Some(latest);
            }
            Err(e) => {
                // Transient: the platform may still be creating the file.
                warn!(path = %latest.display(), error = %e, "Failed to open log file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;
    use tokio::time::timeout;

    const POLL: Duration = Duration::from_millis(10);
    const WAIT: Duration = Duration::from_millis(800);

    fn append(path: &Path, content: &str) {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    // Ensure distinguishable mtimes on filesystems with coarse resolution.
    fn settle() {
        std::thread::sleep(Duration::from_millis(50));
    }

    #[test]
    fn newest_prefers_txt_suffix() {
        let dir = tempfile::tempdir().unwrap();
        append(&dir.path().join("log.20250101.txt"), "a\n");
        settle();
        append(&dir.path().join("log.20250102.txt"), "b\n");
        settle();
        append(&dir.path().join("log.raw"), "c\n"); // newest, but not .txt

        let newest = newest_log_file(dir.path()).unwrap();
        assert_eq!(newest, dir.path().join("log.20250102.txt"));
    }

    #[test]
    fn newest_falls_back_to_any_log_prefix() {
        let dir = tempfile::tempdir().unwrap();
        append(&dir.path().join("log.20250101"), "a\n");
        append(&dir.path().join("trace.txt"), "ignored\n");

        let newest = newest_log_file(dir.path()).unwrap();
        assert_eq!(newest, dir.path().join("log.20250101"));
    }

    #[test]
    fn newest_is_none_without_candidates() {
        let dir = tempfile::tempdir().unwrap();
        append(&dir.path().join("trace.txt"), "ignored\n");
        assert!(newest_log_file(dir.path()).is_none());
    }

    #[test]
    fn read_tail_is_bounded_and_lossy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        append(&path, "first\nsecond\nthird\n");

        let lines = read_tail(&path, 1024);
        assert_eq!(lines, vec!["first", "second", "third"]);

        // Bound smaller than the file: only trailing bytes survive.
        let lines = read_tail(&path, 6);
        assert_eq!(lines.last().unwrap(), "third");
        assert!(lines.len() <= 2);

        assert!(read_tail(&dir.path().join("missing.txt"), 1024).is_empty());
    }

    #[tokio::test]
    async fn tailer_yields_only_newly_appended_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("log.20250101.txt");
        append(&log, "history before open\n");

        let mut tailer = LogTailer::new(dir.path(), POLL);

        // First poll opens the file at end-of-file; pre-existing content is
        // never yielded, so this times out.
        assert!(timeout(Duration::from_millis(100), tailer.next_line())
            .await
            .is_err());

        append(&log, "fresh line\r\n");
        let line = timeout(WAIT, tailer.next_line()).await.unwrap();
        assert_eq!(line, "fresh line");
    }

    #[tokio::test]
    async fn rotation_switches_without_replaying() {
        let dir = tempfile::tempdir().unwrap();
        let old_log = dir.path().join("log.20250101.txt");
        append(&old_log, "old history\n");

        let mut tailer = LogTailer::new(dir.path(), POLL);
        let _ = timeout(Duration::from_millis(100), tailer.next_line()).await;
        assert_eq!(tailer.current_path().unwrap(), old_log);

        // Rotate: a newer file appears with pre-existing content.
        settle();
        let new_log = dir.path().join("log.20250102.txt");
        append(&new_log, "preexisting in new file\n");

        // Give the tailer a poll tick to switch; the new file's existing
        // content must not be emitted.
        assert!(timeout(Duration::from_millis(150), tailer.next_line())
            .await
            .is_err());
        assert_eq!(tailer.current_path().unwrap(), new_log);

        // Lines appended to the old file after rotation are never read.
        append(&old_log, "stale write to old file\n");
        append(&new_log, "live line\n");

        let line = timeout(WAIT, tailer.next_line()).await.unwrap();
        assert_eq!(line, "live line");
    }

    #[tokio::test]
    async fn partial_lines_are_buffered_until_complete() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("log.txt");
        append(&log, "");

        let mut tailer = LogTailer::new(dir.path(), POLL);
        let _ = timeout(Duration::from_millis(100), tailer.next_line()).await;

        append(&log, "half a ");
        assert!(timeout(Duration::from_millis(100), tailer.next_line())
            .await
            .is_err());

        append(&log, "line\n");
        let line = timeout(WAIT, tailer.next_line()).await.unwrap();
        assert_eq!(line, "half a line");
    }
}
