use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::scn::Scn;

/// Health counters for the mining task.
///
/// Written by the mining thread and the emission worker, read by the
/// management surface. All fields are plain atomics so reads never contend
/// with the hot path; a snapshot is not a consistent cut and does not need
/// to be.
#[derive(Debug, Default)]
pub struct ReplicationMetrics {
    active_transactions: AtomicU64,
    captured_dml: AtomicU64,
    committed_transactions: AtomicU64,
    committed_dml: AtomicU64,
    rolled_back_transactions: AtomicU64,
    abandoned_transactions: AtomicU64,
    oldest_scn: AtomicU64,
    committed_scn: AtomicU64,
    current_scn: AtomicU64,
    lag_ms: AtomicU64,
    time_skew_ms: AtomicI64,
    batch_size: AtomicU64,
    sleep_ms: AtomicU64,
    log_switches: AtomicU64,
    warnings: AtomicU64,
    errors: AtomicU64,
    network_problems: AtomicU64,
}

impl ReplicationMetrics {
    pub fn set_active_transactions(&self, count: usize) {
        self.active_transactions
            .store(count as u64, Ordering::Relaxed);
    }

    pub fn increment_captured_dml(&self) {
        self.captured_dml.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_committed_transactions(&self) {
        self.committed_transactions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_committed_dml(&self, count: usize) {
        self.committed_dml.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn increment_rolled_back_transactions(&self) {
        self.rolled_back_transactions
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_abandoned_transactions(&self) {
        self.abandoned_transactions.fetch_add(1, Ordering::Relaxed);
    }

    /// The smallest first SCN still buffered, or unset when nothing is.
    pub fn set_oldest_scn(&self, scn: Option<Scn>) {
        self.oldest_scn
            .store(scn.unwrap_or(Scn::ZERO).as_u64(), Ordering::Relaxed);
    }

    pub fn set_committed_scn(&self, scn: Scn) {
        self.committed_scn.store(scn.as_u64(), Ordering::Relaxed);
    }

    pub fn set_current_scn(&self, scn: Scn) {
        self.current_scn.store(scn.as_u64(), Ordering::Relaxed);
    }

    /// Clock difference between this host and the database, subtracted from
    /// every lag observation. Negative when the database clock is ahead.
    pub fn set_time_skew_ms(&self, skew_ms: i64) {
        self.time_skew_ms.store(skew_ms, Ordering::Relaxed);
    }

    pub fn observe_change_lag(&self, change_time: DateTime<Utc>) {
        let skew = self.time_skew_ms.load(Ordering::Relaxed);
        let lag = (Utc::now() - change_time).num_milliseconds() - skew;
        self.lag_ms.store(lag.max(0) as u64, Ordering::Relaxed);
    }

    pub fn set_batch_size(&self, batch_size: u64) {
        self.batch_size.store(batch_size, Ordering::Relaxed);
    }

    pub fn set_sleep_ms(&self, sleep_ms: u64) {
        self.sleep_ms.store(sleep_ms, Ordering::Relaxed);
    }

    pub fn increment_log_switches(&self) {
        self.log_switches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_warnings(&self) {
        self.warnings.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_network_problems(&self) {
        self.network_problems.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            active_transactions: self.active_transactions.load(Ordering::Relaxed),
            captured_dml: self.captured_dml.load(Ordering::Relaxed),
            committed_transactions: self.committed_transactions.load(Ordering::Relaxed),
            committed_dml: self.committed_dml.load(Ordering::Relaxed),
            rolled_back_transactions: self.rolled_back_transactions.load(Ordering::Relaxed),
            abandoned_transactions: self.abandoned_transactions.load(Ordering::Relaxed),
            oldest_scn: self.oldest_scn.load(Ordering::Relaxed),
            committed_scn: self.committed_scn.load(Ordering::Relaxed),
            current_scn: self.current_scn.load(Ordering::Relaxed),
            lag_ms: self.lag_ms.load(Ordering::Relaxed),
            time_skew_ms: self.time_skew_ms.load(Ordering::Relaxed),
            batch_size: self.batch_size.load(Ordering::Relaxed),
            sleep_ms: self.sleep_ms.load(Ordering::Relaxed),
            log_switches: self.log_switches.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            network_problems: self.network_problems.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub active_transactions: u64,
    pub captured_dml: u64,
    pub committed_transactions: u64,
    pub committed_dml: u64,
    pub rolled_back_transactions: u64,
    pub abandoned_transactions: u64,
    pub oldest_scn: u64,
    pub committed_scn: u64,
    pub current_scn: u64,
    pub lag_ms: u64,
    pub time_skew_ms: i64,
    pub batch_size: u64,
    pub sleep_ms: u64,
    pub log_switches: u64,
    pub warnings: u64,
    pub errors: u64,
    pub network_problems: u64,
}

/// Logs a warning and bumps the warning counter in one step, so every
/// warning is visible on the management surface.
macro_rules! warn_counted {
    ($metrics:expr, $($arg:tt)+) => {{
        ::log::warn!($($arg)+);
        $metrics.increment_warnings();
    }};
}

/// Logs an error and bumps the error counter in one step.
macro_rules! error_counted {
    ($metrics:expr, $($arg:tt)+) => {{
        ::log::error!($($arg)+);
        $metrics.increment_errors();
    }};
}

pub(crate) use error_counted;
pub(crate) use warn_counted;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_counters() {
        let metrics = ReplicationMetrics::default();
        metrics.set_active_transactions(3);
        metrics.increment_captured_dml();
        metrics.increment_captured_dml();
        metrics.increment_committed_dml(5);
        metrics.set_committed_scn(Scn::new(77));
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.active_transactions, 3);
        assert_eq!(snapshot.captured_dml, 2);
        assert_eq!(snapshot.committed_dml, 5);
        assert_eq!(snapshot.committed_scn, 77);
    }

    #[test]
    fn lag_subtracts_clock_skew() {
        let metrics = ReplicationMetrics::default();
        // Database clock 10 minutes behind this host: without correction a
        // fresh change would look 10 minutes old.
        metrics.set_time_skew_ms(600_000);
        metrics.observe_change_lag(Utc::now() - chrono::Duration::milliseconds(600_000));
        assert!(metrics.snapshot().lag_ms < 60_000);
    }

    #[test]
    fn counted_log_helpers_bump_counters() {
        let metrics = ReplicationMetrics::default();
        warn_counted!(metrics, "warning {}", 1);
        warn_counted!(metrics, "warning {}", 2);
        error_counted!(metrics, "error");
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.warnings, 2);
        assert_eq!(snapshot.errors, 1);
    }
}
