//! Broadcastable pause signal shared by every admission of a gate.

// crates.io
use tokio::sync::watch;
// self
use crate::_prelude::*;

/// Boolean signal that holds admissions back while a refresh is in flight.
///
/// Reopening releases every waiter at once; no ordering is guaranteed between them.
#[derive(Clone, Debug)]
pub struct PauseGate(Arc<watch::Sender<bool>>);
impl PauseGate {
	/// Creates an open gate.
	pub fn open() -> Self {
		let (sender, _) = watch::channel(false);

		Self(Arc::new(sender))
	}

	/// Returns `true` while the gate is closed.
	pub fn is_paused(&self) -> bool {
		*self.0.borrow()
	}

	/// Closes the gate.
	pub fn close(&self) {
		self.0.send_replace(true);
	}

	/// Opens the gate, releasing all current waiters.
	pub fn reopen(&self) {
		self.0.send_replace(false);
	}

	/// Registers a waiter that resolves once the gate is open.
	pub fn waiter(&self) -> PauseWaiter {
		PauseWaiter(self.0.subscribe())
	}
}
impl Default for PauseGate {
	fn default() -> Self {
		Self::open()
	}
}

/// Handle returned by [`PauseGate::waiter`].
#[derive(Debug)]
pub struct PauseWaiter(watch::Receiver<bool>);
impl PauseWaiter {
	/// Resolves once the gate this waiter was taken from is open.
	///
	/// Also resolves if that gate is dropped, so callers never wait on a replaced gate.
	pub async fn released(mut self) {
		let _ = self.0.wait_for(|paused| !*paused).await;
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::time::Duration as StdDuration;
	// crates.io
	use tokio::time;
	// self
	use super::*;

	#[tokio::test]
	async fn waiters_resolve_only_after_reopen() {
		let gate = PauseGate::open();

		gate.close();

		assert!(gate.is_paused());

		let waiter = tokio::spawn(gate.waiter().released());

		time::sleep(StdDuration::from_millis(20)).await;

		assert!(!waiter.is_finished());

		gate.reopen();

		time::timeout(StdDuration::from_secs(1), waiter)
			.await
			.expect("Waiter should be released after reopening.")
			.expect("Waiter task should not panic.");
	}

	#[tokio::test]
	async fn waiters_on_an_open_gate_resolve_immediately() {
		let gate = PauseGate::open();

		time::timeout(StdDuration::from_secs(1), gate.waiter().released())
			.await
			.expect("Open gates should not block.");
	}

	#[tokio::test]
	async fn dropping_the_gate_releases_waiters() {
		let gate = PauseGate::open();

		gate.close();

		let waiter = gate.waiter();

		drop(gate);

		time::timeout(StdDuration::from_secs(1), waiter.released())
			.await
			.expect("Dropped gates should release their waiters.");
	}
}
