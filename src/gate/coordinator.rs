//! Single-flight refresh orchestration.
//!
//! The first admission that finds the credentials unusable becomes the leader: under the
//! coordination lock it flips [`RefreshState`] to `Refreshing` and closes the pause gate, then
//! runs one refresh request plus identity exchange. Success installs the new set before the
//! gate reopens. Failure reopens the old gate, swaps in a fresh one, publishes the failure and
//! fails only the leader's own request.

// self
use crate::{
	_prelude::*,
	auth::{CredentialSet, IdentityParams, IdentityToken},
	error::{ConfigError, RefreshFailure},
	gate::{Gate, Hooks, PauseGate},
	hooks::RefreshRequest,
	obs::{self, AdmissionPath, OperationKind, OperationSpan, Outcome},
	store::PersistedIdentity,
	transport::{self, EventStream, HttpRequest, Transport},
};

/// Refresh lifecycle of a gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshState {
	/// No refresh is in flight.
	Idle,
	/// A leader admission is refreshing; other admissions wait.
	Refreshing,
}

#[derive(Debug)]
pub(crate) struct Coordination {
	pub(crate) state: RefreshState,
	pub(crate) pause: PauseGate,
}
impl Coordination {
	pub(crate) fn new() -> Self {
		Self { state: RefreshState::Idle, pause: PauseGate::open() }
	}

	fn begin(&mut self) {
		self.state = RefreshState::Refreshing;
		self.pause.close();
	}

	fn finish(&mut self, replace_gate: bool) {
		self.state = RefreshState::Idle;
		self.pause.reopen();

		if replace_gate {
			self.pause = PauseGate::open();
		}
	}
}

/// Exclusive right to run the current refresh cycle.
///
/// Dropping an unreleased lease resets the cycle as if it had failed, so an abandoned leader
/// never strands its followers.
#[derive(Debug)]
pub(crate) struct RefreshLease {
	coordination: Arc<Mutex<Coordination>>,
	armed: bool,
}
impl RefreshLease {
	/// Starts a cycle; the caller must hold the coordination lock.
	pub(crate) fn begin(
		coordination: &Arc<Mutex<Coordination>>,
		locked: &mut Coordination,
	) -> Self {
		locked.begin();

		Self { coordination: coordination.clone(), armed: true }
	}

	fn complete(mut self) {
		self.armed = false;
		self.coordination.lock().finish(false);
	}

	fn abort(mut self) {
		self.armed = false;
		self.coordination.lock().finish(true);
	}
}
impl Drop for RefreshLease {
	fn drop(&mut self) {
		if self.armed {
			self.coordination.lock().finish(true);
		}
	}
}

impl<T> Gate<T>
where
	T: ?Sized + Transport,
{
	/// Runs the refresh cycle owned by `lease`, then dispatches the leader's `request`.
	pub(crate) async fn lead_refresh(
		&self,
		lease: RefreshLease,
		request: HttpRequest,
	) -> Result<EventStream> {
		const KIND: OperationKind = OperationKind::Refresh;

		let hooks = self.hooks.read().clone();
		let refresh = hooks.refresh_request.as_ref().and_then(|provider| provider.refresh_request());
		let Some(refresh) = refresh else {
			lease.complete();
			self.metrics.record_degraded();
			obs::record_admission(AdmissionPath::Degraded);

			let credentials = self.credentials.get();

			return self.dispatch_signed(request, credentials.as_deref());
		};
		let span = OperationSpan::new(KIND, "lead_refresh");

		obs::record_admission(AdmissionPath::Leader);
		obs::record_outcome(KIND, Outcome::Attempt);
		self.metrics.record_attempt();

		match span.instrument(self.run_refresh(refresh, &hooks)).await {
			Ok(credentials) => {
				lease.complete();
				self.metrics.record_success();
				obs::record_outcome(KIND, Outcome::Success);

				self.dispatch_signed(request, Some(&*credentials))
			},
			Err(error) => {
				let failure = RefreshFailure::new(error);

				lease.abort();
				self.metrics.record_failure();
				obs::record_outcome(KIND, Outcome::Failure);
				self.errors.publish(failure.clone());

				if let Some(handler) = &hooks.error_handler {
					handler.on_refresh_error(&failure);
				}

				Err(failure.into())
			},
		}
	}

	async fn run_refresh(
		&self,
		refresh: RefreshRequest,
		hooks: &Hooks,
	) -> Result<Arc<CredentialSet>> {
		let handler = hooks.refresh_handler.as_ref().ok_or(ConfigError::MissingRefreshHandler)?;
		let request = refresh.into_http_request(&self.config)?;
		let request = self.signer.prepare(request, None, &self.config)?;
		let response = transport::terminal_response(self.transport.dispatch(request)).await?;

		if !response.status.is_success() {
			return Err(Error::RefreshRejected { status: response.status.as_u16() });
		}

		let token = handler.on_refresh(&response)?;
		let credentials = self.exchange.exchange(&token).await?;

		Ok(self.install(&token, credentials).await)
	}

	/// Stores `credentials` and persists them next to the parameters derived from `token`.
	///
	/// Persistence failures are recorded and swallowed; the in-memory store stays authoritative.
	pub(crate) async fn install(
		&self,
		token: &IdentityToken,
		credentials: CredentialSet,
	) -> Arc<CredentialSet> {
		let installed = self.credentials.set(credentials);

		if let Some(persistence) = &self.persistence {
			let identity = PersistedIdentity {
				params: IdentityParams::from(token),
				credentials: (*installed).clone(),
			};

			if let Err(e) = persistence.save(identity).await {
				obs::record_persistence_failure("save", &e);
			}
		}

		installed
	}
}
