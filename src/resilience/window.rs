//! Rolling window of call outcomes.
//!
//! A fixed ring of buckets, each covering `window / bucket_count` of time.
//! The bucket for an instant is found by arithmetic on its offset from the
//! window origin; nothing ages buckets in the background. Every bucket
//! remembers the absolute slot it was last written for, so a reused bucket is
//! zeroed before it is written and stale buckets are skipped when totals are
//! read.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

/// What happened to a single call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Success,
    Failure,
    Timeout,
    Rejection,
}

/// Outcome counts, per bucket or summed over the window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WindowStats {
    #[serde(rename = "successful")]
    pub successes: u64,
    #[serde(rename = "failed")]
    pub failures: u64,
    #[serde(rename = "rejected")]
    pub rejections: u64,
    #[serde(rename = "timeout")]
    pub timeouts: u64,
}

impl WindowStats {
    fn add(&mut self, kind: CallKind) {
        match kind {
            CallKind::Success => self.successes += 1,
            CallKind::Failure => self.failures += 1,
            CallKind::Timeout => self.timeouts += 1,
            CallKind::Rejection => self.rejections += 1,
        }
    }

    fn merge(&mut self, other: &WindowStats) {
        self.successes += other.successes;
        self.failures += other.failures;
        self.timeouts += other.timeouts;
        self.rejections += other.rejections;
    }

    /// Calls that actually reached the upstream.
    pub fn executed(&self) -> u64 {
        self.successes + self.failures + self.timeouts
    }

    /// Failures and timeouts, the numerator of the error rate.
    pub fn errors(&self) -> u64 {
        self.failures + self.timeouts
    }

    /// Error rate in percent; 0 when nothing was executed.
    pub fn error_percentage(&self) -> f64 {
        match self.executed() {
            0 => 0.0,
            total => self.errors() as f64 * 100.0 / total as f64,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Bucket {
    slot: u64,
    stats: WindowStats,
}

/// Time-bucketed counters covering a trailing window.
#[derive(Debug)]
pub struct RollingWindow {
    buckets: Vec<Bucket>,
    bucket_width: Duration,
    origin: Instant,
}

impl RollingWindow {
    /// Create a window of `bucket_count` buckets spanning `window`, starting at `origin`.
    pub fn new(window: Duration, bucket_count: usize, origin: Instant) -> Self {
        let bucket_count = bucket_count.max(1);
        let bucket_width = (window / bucket_count as u32).max(Duration::from_millis(1));
        Self {
            buckets: vec![Bucket::default(); bucket_count],
            bucket_width,
            origin,
        }
    }

    fn slot_at(&self, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(self.origin).as_nanos();
        (elapsed / self.bucket_width.as_nanos()) as u64
    }

    /// Count one call in the bucket for `now`.
    pub fn record(&mut self, now: Instant, kind: CallKind) {
        let slot = self.slot_at(now);
        let len = self.buckets.len() as u64;
        let bucket = &mut self.buckets[(slot % len) as usize];
        if bucket.slot != slot {
            *bucket = Bucket {
                slot,
                stats: WindowStats::default(),
            };
        }
        bucket.stats.add(kind);
    }

    /// Sum of every bucket still inside the window at `now`.
    pub fn totals(&self, now: Instant) -> WindowStats {
        let slot = self.slot_at(now);
        let len = self.buckets.len() as u64;
        self.buckets
            .iter()
            .filter(|bucket| slot.saturating_sub(bucket.slot) < len)
            .fold(WindowStats::default(), |mut acc, bucket| {
                acc.merge(&bucket.stats);
                acc
            })
    }

    /// Zero every bucket.
    pub fn clear(&mut self) {
        self.buckets.fill(Bucket::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(origin: Instant) -> RollingWindow {
        // 10 buckets of 1s each.
        RollingWindow::new(Duration::from_secs(10), 10, origin)
    }

    #[test]
    fn test_totals_sum_live_buckets() {
        let origin = Instant::now();
        let mut w = window(origin);

        w.record(origin, CallKind::Success);
        w.record(origin + Duration::from_millis(1500), CallKind::Failure);
        w.record(origin + Duration::from_millis(2500), CallKind::Timeout);
        w.record(origin + Duration::from_millis(2600), CallKind::Rejection);

        let totals = w.totals(origin + Duration::from_secs(3));
        assert_eq!(totals.successes, 1);
        assert_eq!(totals.failures, 1);
        assert_eq!(totals.timeouts, 1);
        assert_eq!(totals.rejections, 1);
        assert_eq!(totals.executed(), 3);
        assert_eq!(totals.errors(), 2);
    }

    #[test]
    fn test_buckets_age_out() {
        let origin = Instant::now();
        let mut w = window(origin);

        w.record(origin, CallKind::Failure);
        w.record(origin + Duration::from_secs(5), CallKind::Success);

        // Slot 0 is still inside the 10-slot window at slot 9.
        assert_eq!(w.totals(origin + Duration::from_millis(9_900)).failures, 1);

        // At slot 10 the first bucket has expired, the second has not.
        let later = w.totals(origin + Duration::from_secs(10));
        assert_eq!(later.failures, 0);
        assert_eq!(later.successes, 1);

        // Everything has expired a full window after the last write.
        assert_eq!(w.totals(origin + Duration::from_secs(16)), WindowStats::default());
    }

    #[test]
    fn test_reused_bucket_is_zeroed_before_write() {
        let origin = Instant::now();
        let mut w = window(origin);

        w.record(origin, CallKind::Failure);
        w.record(origin, CallKind::Failure);
        // Same ring index, one full revolution later.
        w.record(origin + Duration::from_secs(10), CallKind::Success);

        let totals = w.totals(origin + Duration::from_secs(10));
        assert_eq!(totals.failures, 0);
        assert_eq!(totals.successes, 1);
    }

    #[test]
    fn test_clear() {
        let origin = Instant::now();
        let mut w = window(origin);
        w.record(origin, CallKind::Failure);
        w.record(origin, CallKind::Success);

        w.clear();
        assert_eq!(w.totals(origin), WindowStats::default());
    }

    #[test]
    fn test_error_percentage() {
        let stats = WindowStats {
            successes: 4,
            failures: 5,
            timeouts: 1,
            rejections: 7,
        };
        assert_eq!(stats.error_percentage(), 60.0);
        assert_eq!(WindowStats::default().error_percentage(), 0.0);
    }
}
