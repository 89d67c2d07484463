//! Per-attempt log.
//!
//! Every provider call and every fallback to the local estimator produces
//! one line in a plain text file:
//!
//! ```text
//! [2026-03-01T12:00:00.123Z] provider=here outcome=success distance_km=3.412 duration_min=9.00 elapsed_ms=184
//! [2026-03-01T12:00:00.301Z] provider=tomtom outcome=failure error="HTTP 503: unavailable" elapsed_ms=95
//! ```
//!
//! The log is best-effort. A write that fails is reported through
//! `tracing` and dropped; it never affects resolution.

use chrono::{DateTime, SecondsFormat, Utc};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use georoute_core::{RouteLeg, LOCAL_ESTIMATOR_NAME};

use crate::providers::ProviderError;

/// What happened on one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Failure,

    /// Provider answered but found no drivable route
    NoRoute,

    /// Every provider was skipped or failed; the local estimator answered
    Fallback,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Success => "success",
            AttemptOutcome::Failure => "failure",
            AttemptOutcome::NoRoute => "no_route",
            AttemptOutcome::Fallback => "fallback",
        }
    }
}

/// One line of the attempt log.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    pub timestamp: DateTime<Utc>,
    pub provider: String,
    pub outcome: AttemptOutcome,
    pub leg: Option<RouteLeg>,
    pub error: Option<String>,
    pub elapsed: Duration,
}

impl AttemptRecord {
    pub fn success(provider: impl Into<String>, leg: RouteLeg, elapsed: Duration) -> Self {
        Self {
            timestamp: Utc::now(),
            provider: provider.into(),
            outcome: AttemptOutcome::Success,
            leg: Some(leg),
            error: None,
            elapsed,
        }
    }

    pub fn failure(provider: impl Into<String>, error: &ProviderError, elapsed: Duration) -> Self {
        let outcome = if error.is_no_route() {
            AttemptOutcome::NoRoute
        } else {
            AttemptOutcome::Failure
        };
        Self {
            timestamp: Utc::now(),
            provider: provider.into(),
            outcome,
            leg: None,
            error: Some(error.to_string()),
            elapsed,
        }
    }

    pub fn fallback(leg: RouteLeg) -> Self {
        Self {
            timestamp: Utc::now(),
            provider: LOCAL_ESTIMATOR_NAME.to_string(),
            outcome: AttemptOutcome::Fallback,
            leg: Some(leg),
            error: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Render as a single log line, without the trailing newline.
    pub fn format_line(&self) -> String {
        let mut line = format!(
            "[{}] provider={} outcome={}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.provider.replace(' ', "_"),
            self.outcome.as_str()
        );
        if let Some(leg) = &self.leg {
            line.push_str(&format!(
                " distance_km={:.3} duration_min={:.2}",
                leg.distance_km, leg.duration_minutes
            ));
        }
        if let Some(error) = &self.error {
            let flat = error.replace(['\n', '\r'], " ").replace('"', "'");
            line.push_str(&format!(" error=\"{}\"", flat));
        }
        line.push_str(&format!(" elapsed_ms={}", self.elapsed.as_millis()));
        line
    }
}

/// Destination for attempt records.
pub trait AttemptSink: Send + Sync {
    /// Record one attempt. Must not block for long and must not fail.
    fn record(&self, record: &AttemptRecord);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAttemptLog;

impl AttemptSink for NullAttemptLog {
    fn record(&self, _record: &AttemptRecord) {}
}

/// Append-only text file.
///
/// `record` only formats the line and queues it. A dedicated writer thread
/// owns the file: it opens it on first write, keeps it open, and reopens on
/// the next line after a failure. Dropping the log drains the queue.
#[derive(Debug)]
pub struct FileAttemptLog {
    path: PathBuf,
    lines: Option<UnboundedSender<String>>,
    writer: Option<JoinHandle<()>>,
}

impl FileAttemptLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (tx, rx) = mpsc::unbounded_channel();

        let writer_path = path.clone();
        let spawned = thread::Builder::new()
            .name("georoute-attempt-log".to_string())
            .spawn(move || write_lines(&writer_path, rx));

        match spawned {
            Ok(handle) => Self {
                path,
                lines: Some(tx),
                writer: Some(handle),
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Cannot start attempt log writer");
                Self {
                    path,
                    lines: None,
                    writer: None,
                }
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn write_lines(path: &Path, mut rx: UnboundedReceiver<String>) {
    let mut file: Option<File> = None;

    while let Some(line) = rx.blocking_recv() {
        if file.is_none() {
            match OpenOptions::new().create(true).append(true).open(path) {
                Ok(opened) => file = Some(opened),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Cannot open attempt log");
                    continue;
                }
            }
        }

        if let Some(handle) = file.as_mut() {
            if let Err(e) = writeln!(handle, "{}", line) {
                tracing::warn!(path = %path.display(), error = %e, "Attempt log write failed");
                file = None;
            }
        }
    }
}

impl AttemptSink for FileAttemptLog {
    fn record(&self, record: &AttemptRecord) {
        if let Some(lines) = &self.lines {
            // Only fails once the writer is gone
            let _ = lines.send(record.format_line());
        }
    }
}

impl Drop for FileAttemptLog {
    fn drop(&mut self) {
        self.lines.take();
        if let Some(writer) = self.writer.take() {
            let _ = writer.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed(mut record: AttemptRecord) -> AttemptRecord {
        record.timestamp = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        record
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("georoute-{}-{}.log", name, std::process::id()))
    }

    #[test]
    fn test_success_line() {
        let leg = RouteLeg {
            distance_km: 3.4127,
            duration_minutes: 9.0,
        };
        let line = fixed(AttemptRecord::success("here", leg, Duration::from_millis(184)))
            .format_line();
        assert_eq!(
            line,
            "[2026-03-01T12:00:00.000Z] provider=here outcome=success distance_km=3.413 duration_min=9.00 elapsed_ms=184"
        );
    }

    #[test]
    fn test_failure_line_quotes_error() {
        let err = ProviderError::Http {
            status: 503,
            message: "upstream \"down\"\nretry later".to_string(),
        };
        let line = fixed(AttemptRecord::failure("tomtom", &err, Duration::from_millis(95)))
            .format_line();
        assert!(line.contains("outcome=failure"));
        assert!(line.contains("error=\"HTTP 503: upstream 'down' retry later\""));
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_no_route_outcome() {
        let err = ProviderError::NoRoute("ZERO_RESULTS".to_string());
        let record = AttemptRecord::failure("google", &err, Duration::ZERO);
        assert_eq!(record.outcome, AttemptOutcome::NoRoute);
        assert!(record.format_line().contains("outcome=no_route"));
    }

    #[test]
    fn test_fallback_line_names_estimator() {
        let leg = RouteLeg {
            distance_km: 3.35,
            duration_minutes: 11.7,
        };
        let line = AttemptRecord::fallback(leg).format_line();
        assert!(line.contains("provider=Local_Estimator outcome=fallback"));
    }

    #[test]
    fn test_file_log_appends_lines() {
        let path = temp_path("append");
        let _ = std::fs::remove_file(&path);

        let log = FileAttemptLog::new(&path);
        let leg = RouteLeg {
            distance_km: 1.0,
            duration_minutes: 2.0,
        };
        log.record(&AttemptRecord::success("osrm", leg, Duration::from_millis(10)));
        log.record(&AttemptRecord::fallback(leg));
        drop(log);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("provider=osrm"));
        assert!(lines[1].contains("outcome=fallback"));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_unwritable_path_is_swallowed() {
        let log = FileAttemptLog::new("/nonexistent-dir/georoute/attempts.log");
        let leg = RouteLeg {
            distance_km: 1.0,
            duration_minutes: 2.0,
        };
        // Must not panic
        log.record(&AttemptRecord::fallback(leg));
        log.record(&AttemptRecord::fallback(leg));
        drop(log);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_records_from_concurrent_tasks_all_land() {
        let path = temp_path("concurrent");
        let _ = std::fs::remove_file(&path);

        let log = std::sync::Arc::new(FileAttemptLog::new(&path));
        let leg = RouteLeg {
            distance_km: 1.0,
            duration_minutes: 2.0,
        };
        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let log = log.clone();
                tokio::spawn(async move {
                    for _ in 0..25 {
                        log.record(&AttemptRecord::success(
                            format!("p{i}"),
                            leg,
                            Duration::from_millis(1),
                        ));
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }
        drop(std::sync::Arc::try_unwrap(log).unwrap());

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 200);
        assert!(content.lines().all(|l| l.contains("outcome=success")));

        let _ = std::fs::remove_file(&path);
    }
}
