use std::fmt;
use std::time::{Duration, Instant};

use crate::channel::ProgressSender;
use crate::events::{ProgressEvent, ProgressStage};

/// Counts completed items of one job and emits the matching events.
///
/// Methods take `&mut self` so a job has exactly one place that records
/// completions, which keeps `completed` monotonic on the wire.
#[derive(Debug)]
pub struct JobTracker {
    total: usize,
    completed: usize,
    failed: usize,
    cancelled: bool,
    started_at: Instant,
    sender: ProgressSender,
}

impl JobTracker {
    pub fn new(total: usize, sender: ProgressSender) -> Self {
        Self {
            total,
            completed: 0,
            failed: 0,
            cancelled: false,
            started_at: Instant::now(),
            sender,
        }
    }

    pub fn start(&mut self, status: impl Into<String>) {
        self.started_at = Instant::now();
        self.emit(ProgressStage::Started, None, status.into());
    }

    /// Record one finished item.
    pub fn complete(&mut self, subject: impl Into<String>, status: impl Into<String>) {
        self.completed = (self.completed + 1).min(self.total);
        self.emit(ProgressStage::Item, Some(subject.into()), status.into());
    }

    /// Record one finished item whose work failed.
    pub fn fail(&mut self, subject: impl Into<String>, status: impl Into<String>) {
        self.failed += 1;
        self.complete(subject, status);
    }

    pub fn cancel(&mut self, status: impl Into<String>) {
        self.cancelled = true;
        self.emit(ProgressStage::Cancelled, None, status.into());
    }

    pub fn finish(&mut self, status: impl Into<String>) {
        self.emit(ProgressStage::Finished, None, status.into());
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Items per second, once at least one item is done.
    pub fn speed(&self) -> Option<f64> {
        let secs = self.elapsed().as_secs_f64();
        if self.completed == 0 || secs <= 0.0 {
            return None;
        }
        Some(self.completed as f64 / secs)
    }

    pub fn estimated_time_remaining(&self) -> Option<Duration> {
        let speed = self.speed()?;
        let remaining = self.total.saturating_sub(self.completed) as f64;
        Some(Duration::from_secs_f64(remaining / speed))
    }

    pub fn report(&self) -> JobStatisticsReport {
        JobStatisticsReport {
            total_jobs: self.total,
            completed_jobs: self.completed,
            failure_count: self.failed,
            is_cancelled: self.cancelled,
            elapsed_time: self.elapsed(),
            estimated_time_remaining: self.estimated_time_remaining(),
            progress_speed: self.speed(),
        }
    }

    fn emit(&self, stage: ProgressStage, subject: Option<String>, status: String) {
        self.sender.send(ProgressEvent {
            stage,
            completed: self.completed,
            total: self.total,
            subject,
            status,
        });
    }
}

/// Snapshot of a job's counters and timing.
#[derive(Debug, Clone)]
pub struct JobStatisticsReport {
    pub total_jobs: usize,
    pub completed_jobs: usize,
    pub failure_count: usize,
    pub is_cancelled: bool,
    pub elapsed_time: Duration,
    pub estimated_time_remaining: Option<Duration>,
    pub progress_speed: Option<f64>,
}

impl JobStatisticsReport {
    pub fn progress_percentage(&self) -> f64 {
        if self.total_jobs == 0 {
            100.0
        } else {
            self.completed_jobs as f64 * 100.0 / self.total_jobs as f64
        }
    }
}

impl fmt::Display for JobStatisticsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Millisecond precision is plenty for a human reading the summary.
        let elapsed = Duration::from_millis(self.elapsed_time.as_millis() as u64);
        write!(
            f,
            "{:.1}% complete ({}/{} items, {} failed) in {}",
            self.progress_percentage(),
            self.completed_jobs,
            self.total_jobs,
            self.failure_count,
            humantime::format_duration(elapsed)
        )?;
        if let Some(speed) = self.progress_speed {
            write!(f, ", {:.2} items/s", speed)?;
        }
        if self.is_cancelled {
            write!(f, " (cancelled)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::progress_channel;

    #[tokio::test]
    async fn test_events_carry_counts() {
        let (sender, mut stream) = progress_channel();
        let mut tracker = JobTracker::new(2, sender);

        tracker.start("starting");
        tracker.complete("a", "done a");
        tracker.fail("b", "b failed");
        tracker.finish("all done");

        let started = stream.next_event().await.unwrap();
        assert_eq!(started.stage, ProgressStage::Started);
        assert_eq!(started.completed, 0);

        let first = stream.next_event().await.unwrap();
        assert_eq!(first.completed, 1);
        assert_eq!(first.subject.as_deref(), Some("a"));

        let second = stream.next_event().await.unwrap();
        assert_eq!(second.completed, 2);
        assert_eq!(second.status, "b failed");

        let finished = stream.next_event().await.unwrap();
        assert!(finished.is_terminal());
        assert_eq!(finished.fraction(), 1.0);

        assert_eq!(tracker.failed(), 1);
    }

    #[test]
    fn test_completed_never_exceeds_total() {
        let mut tracker = JobTracker::new(1, ProgressSender::disabled());
        tracker.complete("a", "");
        tracker.complete("a", "");
        assert_eq!(tracker.completed(), 1);
    }

    #[test]
    fn test_report_display() {
        let mut tracker = JobTracker::new(4, ProgressSender::disabled());
        tracker.complete("a", "");
        tracker.cancel("stop");
        let report = tracker.report();
        assert_eq!(report.progress_percentage(), 25.0);
        let text = report.to_string();
        assert!(text.starts_with("25.0% complete (1/4 items, 0 failed)"), "{}", text);
        assert!(text.ends_with("(cancelled)"), "{}", text);
    }

    #[test]
    fn test_no_estimate_before_first_item() {
        let tracker = JobTracker::new(3, ProgressSender::disabled());
        assert!(tracker.speed().is_none());
        assert!(tracker.estimated_time_remaining().is_none());
    }
}
