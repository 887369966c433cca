//! Optional observability helpers for gate operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `sigv4_broker.op` with the `op` (operation)
//!   and `stage` (call site) fields, plus `warn` events for non-fatal persistence failures.
//! - Enable `metrics` to increment the `sigv4_broker_op_total` counter for every
//!   attempt/success/failure (labeled by `op` + `outcome`), the `sigv4_broker_admission_total`
//!   counter labeled by admission `path`, and `sigv4_broker_persistence_failure_total`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
	/// A request admission through [`Gate::admit`](crate::gate::Gate::admit).
	Admission,
	/// A refresh cycle led by one admission.
	Refresh,
	/// An explicit identity exchange via [`Gate::sign_in`](crate::gate::Gate::sign_in).
	SignIn,
	/// Seeding the store from persistence via [`Gate::restore`](crate::gate::Gate::restore).
	Restore,
}
impl OperationKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationKind::Admission => "admission",
			OperationKind::Refresh => "refresh",
			OperationKind::SignIn => "sign_in",
			OperationKind::Restore => "restore",
		}
	}
}
impl Display for OperationKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// Entry to a gate operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl Outcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Outcome::Attempt => "attempt",
			Outcome::Success => "success",
			Outcome::Failure => "failure",
		}
	}
}
impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Route an admission took through the gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AdmissionPath {
	/// Destination is not protected; forwarded untouched.
	Passthrough,
	/// Credentials were valid; signed and forwarded.
	Direct,
	/// Waited for another admission's refresh before re-evaluating.
	Follower,
	/// Led a refresh cycle.
	Leader,
	/// Credentials were unusable and no refresh request was available.
	Degraded,
}
impl AdmissionPath {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			AdmissionPath::Passthrough => "passthrough",
			AdmissionPath::Direct => "direct",
			AdmissionPath::Follower => "follower",
			AdmissionPath::Leader => "leader",
			AdmissionPath::Degraded => "degraded",
		}
	}
}
impl Display for AdmissionPath {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn labels_are_stable() {
		assert_eq!(OperationKind::SignIn.to_string(), "sign_in");
		assert_eq!(Outcome::Failure.as_str(), "failure");
		assert_eq!(AdmissionPath::Degraded.to_string(), "degraded");
	}
}
