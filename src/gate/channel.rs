//! Multi-subscriber channel carrying refresh failures.

// crates.io
use futures_core::Stream;
use tokio::sync::broadcast::{
	self,
	error::{RecvError, TryRecvError},
};
// self
use crate::{_prelude::*, error::RefreshFailure};

/// Broadcasts every refresh failure to all current subscribers.
#[derive(Clone, Debug)]
pub struct ErrorChannel(broadcast::Sender<RefreshFailure>);
impl ErrorChannel {
	/// Failures buffered per subscriber before the oldest are dropped.
	pub const CAPACITY: usize = 16;

	/// Creates a channel without subscribers.
	pub fn new() -> Self {
		let (sender, _) = broadcast::channel(Self::CAPACITY);

		Self(sender)
	}

	/// Publishes `failure`, returning how many subscribers received it.
	pub fn publish(&self, failure: RefreshFailure) -> usize {
		self.0.send(failure).unwrap_or(0)
	}

	/// Subscribes to failures published from now on.
	pub fn subscribe(&self) -> ErrorSubscription {
		ErrorSubscription(self.0.subscribe())
	}

	/// Number of live subscriptions.
	pub fn subscriber_count(&self) -> usize {
		self.0.receiver_count()
	}
}
impl Default for ErrorChannel {
	fn default() -> Self {
		Self::new()
	}
}

/// Receiving half of an [`ErrorChannel`].
#[derive(Debug)]
pub struct ErrorSubscription(broadcast::Receiver<RefreshFailure>);
impl ErrorSubscription {
	/// Waits for the next failure; `None` once the channel is gone.
	///
	/// Failures dropped because this subscriber lagged are skipped.
	pub async fn next(&mut self) -> Option<RefreshFailure> {
		loop {
			match self.0.recv().await {
				Ok(failure) => return Some(failure),
				Err(RecvError::Lagged(_)) => continue,
				Err(RecvError::Closed) => return None,
			}
		}
	}

	/// Returns an already published failure without waiting.
	pub fn try_next(&mut self) -> Option<RefreshFailure> {
		loop {
			match self.0.try_recv() {
				Ok(failure) => return Some(failure),
				Err(TryRecvError::Lagged(_)) => continue,
				Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
			}
		}
	}

	/// Converts the subscription into a [`Stream`].
	pub fn into_stream(self) -> impl Stream<Item = RefreshFailure> + 'static + Send {
		let mut subscription = self;

		async_stream::stream! {
			while let Some(failure) = subscription.next().await {
				yield failure;
			}
		}
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use futures_util::StreamExt;
	// self
	use super::*;

	fn failure(status: u16) -> RefreshFailure {
		RefreshFailure::new(Error::RefreshRejected { status })
	}

	#[tokio::test]
	async fn subscribers_only_see_later_failures() {
		let channel = ErrorChannel::new();

		assert_eq!(channel.publish(failure(500)), 0);

		let mut first = channel.subscribe();
		let mut second = channel.subscribe();

		assert_eq!(channel.publish(failure(503)), 2);

		for subscription in [&mut first, &mut second] {
			let received = subscription.next().await.expect("Failure should be delivered.");

			assert!(matches!(received.cause(), Error::RefreshRejected { status: 503 }));
		}

		assert!(first.try_next().is_none());
	}

	#[tokio::test]
	async fn lagging_subscribers_skip_dropped_failures() {
		let channel = ErrorChannel::new();
		let mut subscription = channel.subscribe();

		for status in 0..(ErrorChannel::CAPACITY as u16 + 4) {
			channel.publish(failure(status));
		}

		let received = subscription.try_next().expect("Newest failures should remain.");

		assert!(matches!(received.cause(), Error::RefreshRejected { status: 4 }));
	}

	#[tokio::test]
	async fn streams_end_when_the_channel_is_dropped() {
		let channel = ErrorChannel::new();
		let stream = channel.subscribe().into_stream();

		channel.publish(failure(502));
		drop(channel);

		let collected = stream.collect::<Vec<_>>().await;

		assert_eq!(collected.len(), 1);
	}
}
