//! Polling-wait loop with a live single-line spinner display.
//!
//! Drives a wait against some external job: a caller-supplied poll function
//! fetches the job's status on a configured cadence, and between polls a
//! spinner frame plus the elapsed time since the status last changed is
//! redrawn in place on the current console line. E.g:
//!
//! ```text
//! / Status: InProgress - AnalyzingData [Since: 10m 33s]
//! ```
//!
//! A new line is started (with the `Since` timer reset) every time the
//! stringified status changes. There is no limit on line length, but the
//! rendered status must not contain newlines.

use std::fmt::Display;
use std::io::{self, Write};
use std::thread;
use std::time::{Duration, Instant};

use crate::elapsed::humanize;

const SPINNER_FRAMES: [char; 4] = ['/', '-', '\\', '|'];

/// Errors from a polling wait
#[derive(Debug, thiserror::Error)]
pub enum WaitError<E> {
    #[error("maximum wait time exceeded: {}", humanize(*.0))]
    Timeout(Duration),
    #[error(transparent)]
    Job(E),
    #[error("failed to write progress line: {0}")]
    Io(#[from] io::Error),
}

/// Configuration for a polling wait: frame rate, poll cadence, and an
/// optional cap on total wall-clock time.
///
/// A `spinner_interval` that divides 1s evenly produces nicer-looking
/// updates, since the elapsed display has 1s resolution.
#[derive(Debug, Clone)]
pub struct Spinner {
    spinner_interval: Duration,
    poll_interval: Duration,
    timeout: Option<Duration>,
}

impl Default for Spinner {
    fn default() -> Self {
        Self {
            spinner_interval: Duration::from_millis(500),
            poll_interval: Duration::from_secs(30),
            timeout: None,
        }
    }
}

impl Spinner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sleep between animation frames (default 500ms).
    pub fn spinner_interval(mut self, interval: Duration) -> Self {
        self.spinner_interval = interval;
        self
    }

    /// Set the minimum elapsed time between calls to the poll function
    /// (default 30s).
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Fail the wait with [`WaitError::Timeout`] once this much wall-clock
    /// time has passed (default: wait forever).
    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    /// Poll until `is_finished` reports completion, rendering progress to
    /// stdout, and return the final status.
    ///
    /// Statuses are displayed via their [`Display`] form; use
    /// [`wait_with`](Self::wait_with) to supply a custom stringifier.
    /// Errors from `poll` or `is_finished` propagate unmodified.
    pub fn wait<S, E>(
        &self,
        poll: impl FnMut() -> Result<S, E>,
        is_finished: impl FnMut(&S) -> Result<bool, E>,
    ) -> Result<S, WaitError<E>>
    where
        S: Display,
    {
        let mut out = io::stdout().lock();
        self.wait_to(&mut out, poll, is_finished, |status| status.to_string())
    }

    /// Like [`wait`](Self::wait), with an explicit status stringifier.
    pub fn wait_with<S, E>(
        &self,
        poll: impl FnMut() -> Result<S, E>,
        is_finished: impl FnMut(&S) -> Result<bool, E>,
        render: impl FnMut(&S) -> String,
    ) -> Result<S, WaitError<E>> {
        let mut out = io::stdout().lock();
        self.wait_to(&mut out, poll, is_finished, render)
    }

    /// The fully general form: render progress to any writer.
    pub fn wait_to<W, S, E>(
        &self,
        out: &mut W,
        mut poll: impl FnMut() -> Result<S, E>,
        mut is_finished: impl FnMut(&S) -> Result<bool, E>,
        mut render: impl FnMut(&S) -> String,
    ) -> Result<S, WaitError<E>>
    where
        W: Write,
    {
        let mut status = poll().map_err(WaitError::Job)?;
        let mut status_str = render(&status);

        let started = Instant::now();
        let mut status_changed = started;
        let mut last_poll = started;
        let mut frame = 0;
        let mut max_len = 0;

        writeln!(out, "Initial status: {}", status_str)?;
        while !is_finished(&status).map_err(WaitError::Job)? {
            let now = Instant::now();
            if let Some(limit) = self.timeout {
                if now.duration_since(started) >= limit {
                    return Err(WaitError::Timeout(limit));
                }
            }
            if now.duration_since(last_poll) >= self.poll_interval {
                let next = poll().map_err(WaitError::Job)?;
                last_poll = now;
                let next_str = render(&next);
                if next_str == status_str {
                    write!(out, "\r")?;
                } else {
                    writeln!(out)?;
                    status_changed = now;
                }
                status = next;
                status_str = next_str;
            } else {
                write!(out, "\r")?;
            }

            frame = (frame + 1) % SPINNER_FRAMES.len();
            // Whole-second resolution is plenty for a wait indicator
            let since = Duration::from_secs(now.duration_since(status_changed).as_secs());
            let line = format!(
                "{} Status: {} [Since: {}]",
                SPINNER_FRAMES[frame],
                status_str,
                humanize(since)
            );
            max_len = max_len.max(line.len());
            // Pad to the longest line written so far, so shorter text fully
            // overwrites longer text when redrawing in place
            write!(out, "{:<1$}", line, max_len)?;
            out.flush()?;
            thread::sleep(self.spinner_interval);
        }
        writeln!(out)?;
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug, PartialEq)]
    struct JobFailed;

    impl std::fmt::Display for JobFailed {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "job failed")
        }
    }

    impl std::error::Error for JobFailed {}

    fn fast_spinner() -> Spinner {
        Spinner::new()
            .spinner_interval(Duration::from_millis(1))
            .poll_interval(Duration::from_millis(5))
    }

    #[test]
    fn test_finished_on_first_check_polls_once() {
        let polls = Cell::new(0);
        let mut out = Vec::new();

        let status = fast_spinner()
            .wait_to(
                &mut out,
                || {
                    polls.set(polls.get() + 1);
                    Ok::<_, JobFailed>("Complete")
                },
                |_| Ok(true),
                |s| s.to_string(),
            )
            .unwrap();

        assert_eq!(status, "Complete");
        assert_eq!(polls.get(), 1);
        let rendered = String::from_utf8(out).unwrap();
        assert_eq!(rendered, "Initial status: Complete\n\n");
    }

    #[test]
    fn test_poll_error_propagates() {
        let mut out = Vec::new();
        let err = fast_spinner()
            .wait_to(
                &mut out,
                || Err::<&str, _>(JobFailed),
                |_| Ok(true),
                |s| s.to_string(),
            )
            .unwrap_err();
        assert!(matches!(err, WaitError::Job(JobFailed)));
    }

    #[test]
    fn test_is_finished_error_propagates() {
        let mut out = Vec::new();
        let err = fast_spinner()
            .wait_to(
                &mut out,
                || Ok("InProgress"),
                |_| Err(JobFailed),
                |s| s.to_string(),
            )
            .unwrap_err();
        assert!(matches!(err, WaitError::Job(JobFailed)));
    }

    #[test]
    fn test_timeout_carries_configured_limit() {
        let limit = Duration::from_millis(20);
        let mut out = Vec::new();

        let started = Instant::now();
        let err = fast_spinner()
            .timeout(limit)
            .wait_to(
                &mut out,
                || Ok::<_, JobFailed>("InProgress"),
                |_| Ok(false),
                |s| s.to_string(),
            )
            .unwrap_err();
        let elapsed = started.elapsed();

        match err {
            WaitError::Timeout(carried) => assert_eq!(carried, limit),
            other => panic!("expected timeout, got {:?}", other),
        }
        assert!(elapsed >= limit);
    }

    #[test]
    fn test_poll_interval_limits_poll_rate() {
        let polls = Cell::new(0);
        let mut out = Vec::new();

        // Finish after the second real poll; with a 20ms poll interval and a
        // 1ms frame interval, the many frames in between must not poll.
        fast_spinner()
            .poll_interval(Duration::from_millis(20))
            .wait_to(
                &mut out,
                || {
                    polls.set(polls.get() + 1);
                    Ok::<_, JobFailed>("InProgress")
                },
                |_| Ok(polls.get() >= 2),
                |s| s.to_string(),
            )
            .unwrap();

        assert_eq!(polls.get(), 2);
    }

    #[test]
    fn test_status_change_starts_new_line_and_resets_since() {
        let polls = Cell::new(0);
        let mut out = Vec::new();

        fast_spinner()
            .wait_to(
                &mut out,
                || {
                    polls.set(polls.get() + 1);
                    Ok::<_, JobFailed>(if polls.get() < 2 { "Queued" } else { "Running" })
                },
                |s| Ok(*s == "Running"),
                |s| s.to_string(),
            )
            .unwrap();

        let rendered = String::from_utf8(out).unwrap();
        assert!(rendered.starts_with("Initial status: Queued\n"));
        // The change to "Running" opens a fresh line with a reset timer
        let last_line = rendered.trim_end().rsplit('\n').next().unwrap();
        assert!(last_line.contains("Status: Running"), "got: {last_line:?}");
        assert!(last_line.contains("[Since: 0s]"), "got: {last_line:?}");
    }

    #[test]
    fn test_lines_padded_to_longest_seen() {
        let polls = Cell::new(0);
        let mut out = Vec::new();

        // Status shrinks from a long string to a short one without the
        // rendered text changing lines in between polls.
        fast_spinner()
            .wait_to(
                &mut out,
                || {
                    polls.set(polls.get() + 1);
                    Ok::<_, JobFailed>(if polls.get() < 2 { "LongRunningPhase" } else { "Ok" })
                },
                |s| Ok(*s == "Ok"),
                |s| s.to_string(),
            )
            .unwrap();

        let rendered = String::from_utf8(out).unwrap();
        let lengths: Vec<usize> = rendered
            .trim_end()
            .lines()
            .skip(1) // initial status line is unpadded
            .map(|line| line.rsplit('\r').next().unwrap().len())
            .collect();
        assert!(!lengths.is_empty());
        // Every redraw is padded out to the widest line written so far
        let widest = *lengths.iter().max().unwrap();
        assert!(lengths.iter().all(|&len| len == widest), "lengths: {lengths:?}");
    }
}
