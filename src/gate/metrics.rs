// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::_prelude::*;

/// Counters describing how admissions were resolved.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	attempts: AtomicU64,
	successes: AtomicU64,
	failures: AtomicU64,
	follower_waits: AtomicU64,
	degraded: AtomicU64,
}
impl RefreshMetrics {
	/// Refresh cycles started.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Refresh cycles that installed new credentials.
	pub fn successes(&self) -> u64 {
		self.successes.load(Ordering::Relaxed)
	}

	/// Refresh cycles that ended in a published failure.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	/// Admissions that waited on a closed pause gate.
	pub fn follower_waits(&self) -> u64 {
		self.follower_waits.load(Ordering::Relaxed)
	}

	/// Protected admissions dispatched without usable credentials and without a refresh.
	pub fn degraded(&self) -> u64 {
		self.degraded.load(Ordering::Relaxed)
	}

	/// Point-in-time copy of every counter.
	pub fn snapshot(&self) -> RefreshMetricsSnapshot {
		RefreshMetricsSnapshot {
			attempts: self.attempts(),
			successes: self.successes(),
			failures: self.failures(),
			follower_waits: self.follower_waits(),
			degraded: self.degraded(),
		}
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.successes.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_follower_wait(&self) {
		self.follower_waits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_degraded(&self) {
		self.degraded.fetch_add(1, Ordering::Relaxed);
	}
}

/// Serializable copy of [`RefreshMetrics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RefreshMetricsSnapshot {
	/// Refresh cycles started.
	pub attempts: u64,
	/// Refresh cycles that installed new credentials.
	pub successes: u64,
	/// Refresh cycles that failed.
	pub failures: u64,
	/// Admissions that waited on a refresh.
	pub follower_waits: u64,
	/// Admissions dispatched in degraded mode.
	pub degraded: u64,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn snapshot_reflects_recorded_events() {
		let metrics = RefreshMetrics::default();

		metrics.record_attempt();
		metrics.record_attempt();
		metrics.record_success();
		metrics.record_failure();
		metrics.record_follower_wait();
		metrics.record_degraded();

		let snapshot = metrics.snapshot();

		assert_eq!(
			snapshot,
			RefreshMetricsSnapshot {
				attempts: 2,
				successes: 1,
				failures: 1,
				follower_waits: 1,
				degraded: 1,
			}
		);
		assert_eq!(
			serde_json::to_value(snapshot).expect("Snapshot should serialize.")["follower_waits"],
			1
		);
	}
}
