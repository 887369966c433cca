// self
use crate::{
	obs::{AdmissionPath, OperationKind, Outcome},
	store::StoreError,
};

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_outcome(kind: OperationKind, outcome: Outcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"sigv4_broker_op_total",
			"op" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records the route an admission took (when enabled).
pub fn record_admission(path: AdmissionPath) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("sigv4_broker_admission_total", "path" => path.as_str()).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = path;
	}
}

/// Records a persistence failure that was swallowed by the gate.
pub fn record_persistence_failure(operation: &'static str, error: &StoreError) {
	let _ = (operation, error);

	#[cfg(feature = "tracing")]
	{
		tracing::warn!(operation, %error, "credential persistence failed");
	}
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("sigv4_broker_persistence_failure_total", "operation" => operation)
			.increment(1);
	}
}
