//! Refresh-gated request admission.
//!
//! A [`Gate`] sits between callers and a [`Transport`]. Requests to unprotected hosts pass
//! through untouched. Protected requests are signed with the current credentials, or wait while
//! a single leader admission refreshes them. All clones of a gate share one credential store,
//! one refresh state, one pause gate and one error channel.

mod channel;
mod coordinator;
mod metrics;
mod pause;

pub use channel::*;
pub use coordinator::RefreshState;
pub use metrics::{RefreshMetrics, RefreshMetricsSnapshot};
pub use pause::*;

// self
use crate::{
	_prelude::*,
	auth::{CredentialSet, IdentityToken},
	config::Config,
	exchange::CredentialExchange,
	hooks::{RefreshErrorHandler, RefreshRequestProvider, RefreshResultHandler},
	obs::{self, AdmissionPath, OperationKind, OperationSpan, Outcome},
	sign::{RequestSigner, SignerAdapter},
	store::{CredentialPersistence, CredentialStore},
	transport::{EventStream, HttpRequest, Transport},
};
#[cfg(feature = "reqwest")]
use crate::{error::ConfigError, exchange::CognitoExchange, transport::ReqwestTransport};
use coordinator::{Coordination, RefreshLease};

#[cfg(feature = "reqwest")]
/// Gate specialized for the crate's default reqwest transport and Cognito exchange.
pub type ReqwestGate = Gate<ReqwestTransport>;

#[derive(Clone, Default)]
struct Hooks {
	refresh_request: Option<Arc<dyn RefreshRequestProvider>>,
	refresh_handler: Option<Arc<dyn RefreshResultHandler>>,
	error_handler: Option<Arc<dyn RefreshErrorHandler>>,
}

// Outcome of evaluating one admission under the coordination lock.
enum Step {
	Dispatched(Result<EventStream>),
	Wait(HttpRequest, PauseWaiter),
	Lead(HttpRequest, RefreshLease),
}

/// Refresh-gated signing front door for a transport.
///
/// Cloning is cheap; clones share every piece of coordination state.
pub struct Gate<T>
where
	T: ?Sized + Transport,
{
	transport: Arc<T>,
	config: Arc<Config>,
	credentials: Arc<CredentialStore>,
	signer: SignerAdapter,
	exchange: Arc<dyn CredentialExchange>,
	persistence: Option<Arc<dyn CredentialPersistence>>,
	hooks: Arc<RwLock<Hooks>>,
	coordination: Arc<Mutex<Coordination>>,
	errors: ErrorChannel,
	metrics: Arc<RefreshMetrics>,
	expiry_offset: Duration,
}
impl<T> Gate<T>
where
	T: ?Sized + Transport,
{
	/// Creates a gate over the caller-provided transport and exchange.
	///
	/// The gate signs with [`SigV4Signer`](crate::sign::SigV4Signer), has no persistence, and
	/// treats credentials as expired exactly at their expiry instant.
	pub fn with_transport(
		config: impl Into<Arc<Config>>,
		transport: impl Into<Arc<T>>,
		exchange: impl 'static + CredentialExchange,
	) -> Self {
		Self {
			transport: transport.into(),
			config: config.into(),
			credentials: Default::default(),
			signer: SignerAdapter::default(),
			exchange: Arc::new(exchange),
			persistence: None,
			hooks: Default::default(),
			coordination: Arc::new(Mutex::new(Coordination::new())),
			errors: ErrorChannel::new(),
			metrics: Default::default(),
			expiry_offset: Duration::ZERO,
		}
	}

	/// Replaces the request signer.
	pub fn with_signer(mut self, signer: impl 'static + RequestSigner) -> Self {
		self.signer = SignerAdapter::new(Arc::new(signer));

		self
	}

	/// Attaches a persistence backend.
	pub fn with_persistence(mut self, persistence: impl 'static + CredentialPersistence) -> Self {
		self.persistence = Some(Arc::new(persistence));

		self
	}

	/// Treats credentials as expired `offset` before their expiry instant.
	pub fn with_expiry_offset(mut self, offset: Duration) -> Self {
		self.expiry_offset = if offset.is_negative() { Duration::ZERO } else { offset };

		self
	}

	/// Sets the refresh request provider.
	pub fn with_refresh_request(self, provider: impl 'static + RefreshRequestProvider) -> Self {
		self.set_refresh_request_provider(provider);

		self
	}

	/// Sets the refresh result handler.
	pub fn with_refresh_handler(self, handler: impl 'static + RefreshResultHandler) -> Self {
		self.set_refresh_result_handler(handler);

		self
	}

	/// Sets the refresh error handler.
	pub fn with_refresh_error_handler(self, handler: impl 'static + RefreshErrorHandler) -> Self {
		self.set_refresh_error_handler(handler);

		self
	}

	/// Replaces the refresh request provider for every clone of this gate.
	pub fn set_refresh_request_provider(&self, provider: impl 'static + RefreshRequestProvider) {
		self.hooks.write().refresh_request = Some(Arc::new(provider));
	}

	/// Removes the refresh request provider; expired credentials are then used as-is.
	pub fn clear_refresh_request_provider(&self) {
		self.hooks.write().refresh_request = None;
	}

	/// Replaces the refresh result handler for every clone of this gate.
	pub fn set_refresh_result_handler(&self, handler: impl 'static + RefreshResultHandler) {
		self.hooks.write().refresh_handler = Some(Arc::new(handler));
	}

	/// Replaces the refresh error handler for every clone of this gate.
	pub fn set_refresh_error_handler(&self, handler: impl 'static + RefreshErrorHandler) {
		self.hooks.write().error_handler = Some(Arc::new(handler));
	}

	/// Shared configuration.
	pub fn config(&self) -> &Arc<Config> {
		&self.config
	}

	/// Credential store backing this gate.
	pub fn credentials(&self) -> &CredentialStore {
		&self.credentials
	}

	/// Refresh counters.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Current refresh state.
	pub fn refresh_state(&self) -> RefreshState {
		self.coordination.lock().state
	}

	/// Returns `true` while admissions are held back.
	pub fn is_paused(&self) -> bool {
		self.coordination.lock().pause.is_paused()
	}

	/// Channel on which refresh failures are published.
	pub fn error_channel(&self) -> &ErrorChannel {
		&self.errors
	}

	/// Subscribes to refresh failures published from now on.
	pub fn subscribe_errors(&self) -> ErrorSubscription {
		self.errors.subscribe()
	}

	/// Admits `request`, returning the transport's event stream.
	///
	/// Unprotected destinations are dispatched unchanged. Protected ones are signed with
	/// usable credentials, wait for an in-flight refresh, or lead a new refresh cycle. Only the
	/// leader of a failed cycle receives [`Error::Refresh`]; admissions that waited on it
	/// proceed with whatever the store holds afterwards.
	///
	/// After a failed refresh those followers are signed with the previous set even when it is
	/// already expired, leaving the rejection to the service.
	pub async fn admit(&self, request: HttpRequest) -> Result<EventStream> {
		const KIND: OperationKind = OperationKind::Admission;

		if !self.config.is_protected(&request.url) {
			obs::record_admission(AdmissionPath::Passthrough);

			return Ok(self.transport.dispatch(request));
		}

		let span = OperationSpan::new(KIND, "admit");

		obs::record_outcome(KIND, Outcome::Attempt);

		let result = span.instrument(self.admit_protected(request)).await;

		match &result {
			Ok(_) => obs::record_outcome(KIND, Outcome::Success),
			Err(_) => obs::record_outcome(KIND, Outcome::Failure),
		}

		result
	}

	/// Exchanges `token` and installs the resulting credentials outside of any request.
	pub async fn sign_in(&self, token: IdentityToken) -> Result<Arc<CredentialSet>> {
		const KIND: OperationKind = OperationKind::SignIn;

		let span = OperationSpan::new(KIND, "sign_in");

		obs::record_outcome(KIND, Outcome::Attempt);

		let result = span
			.instrument(async {
				let credentials = self.exchange.exchange(&token).await?;

				Ok(self.install(&token, credentials).await)
			})
			.await;

		match &result {
			Ok(_) => obs::record_outcome(KIND, Outcome::Success),
			Err(_) => obs::record_outcome(KIND, Outcome::Failure),
		}

		result
	}

	/// Clears the credential store and the persistence backend.
	pub async fn sign_out(&self) -> Result<()> {
		self.credentials.clear();

		if let Some(persistence) = &self.persistence {
			persistence.clear().await?;
		}

		Ok(())
	}

	/// Seeds the credential store from persistence.
	///
	/// Expired sets are restored as-is and refreshed by the next protected admission. Returns
	/// whether anything was restored.
	pub async fn restore(&self) -> Result<bool> {
		const KIND: OperationKind = OperationKind::Restore;

		let Some(persistence) = &self.persistence else {
			return Ok(false);
		};
		let span = OperationSpan::new(KIND, "restore");

		obs::record_outcome(KIND, Outcome::Attempt);

		let result = span
			.instrument(async {
				let Some(identity) = persistence.load().await? else {
					return Ok(false);
				};

				self.credentials.set(identity.credentials);

				Ok(true)
			})
			.await;

		match &result {
			Ok(_) => obs::record_outcome(KIND, Outcome::Success),
			Err(_) => obs::record_outcome(KIND, Outcome::Failure),
		}

		result
	}

	async fn admit_protected(&self, request: HttpRequest) -> Result<EventStream> {
		let mut request = request;
		let mut waited = false;

		loop {
			match self.step(request, waited) {
				Step::Dispatched(result) => return result,
				Step::Lead(leader, lease) => return self.lead_refresh(lease, leader).await,
				Step::Wait(pending, waiter) => {
					if !waited {
						self.metrics.record_follower_wait();
					}

					waited = true;
					request = pending;

					waiter.released().await;
				},
			}
		}
	}

	// Signing and dispatch happen under the coordination lock, so no request signed with
	// superseded credentials leaves after a refresh cycle has reopened the gate.
	fn step(&self, request: HttpRequest, waited: bool) -> Step {
		let mut coordination = self.coordination.lock();

		if coordination.state == RefreshState::Refreshing {
			return Step::Wait(request, coordination.pause.waiter());
		}

		let credentials = self.credentials.get();
		let usable =
			credentials.as_ref().is_some_and(|set| !set.is_expired(self.expiry_offset));

		if !usable && !waited && self.hooks.read().refresh_request.is_some() {
			return Step::Lead(request, RefreshLease::begin(&self.coordination, &mut coordination));
		}

		let path = match (waited, usable) {
			(true, _) => AdmissionPath::Follower,
			(false, true) => AdmissionPath::Direct,
			(false, false) => AdmissionPath::Degraded,
		};

		if path == AdmissionPath::Degraded {
			self.metrics.record_degraded();
		}

		obs::record_admission(path);

		Step::Dispatched(self.dispatch_signed(request, credentials.as_deref()))
	}

	fn dispatch_signed(
		&self,
		request: HttpRequest,
		credentials: Option<&CredentialSet>,
	) -> Result<EventStream> {
		let request = self.signer.prepare(request, credentials, &self.config)?;

		Ok(self.transport.dispatch(request))
	}
}
#[cfg(feature = "reqwest")]
impl Gate<ReqwestTransport> {
	/// Creates a gate that dispatches through reqwest and exchanges identities with Cognito in
	/// the configured region.
	pub fn new(config: Config) -> Result<Self, ConfigError> {
		let exchange = CognitoExchange::new(config.region())?;

		Ok(Self::with_transport(config, ReqwestTransport::default(), exchange))
	}
}
impl<T> Clone for Gate<T>
where
	T: ?Sized + Transport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			config: self.config.clone(),
			credentials: self.credentials.clone(),
			signer: self.signer.clone(),
			exchange: self.exchange.clone(),
			persistence: self.persistence.clone(),
			hooks: self.hooks.clone(),
			coordination: self.coordination.clone(),
			errors: self.errors.clone(),
			metrics: self.metrics.clone(),
			expiry_offset: self.expiry_offset,
		}
	}
}
impl<T> Debug for Gate<T>
where
	T: ?Sized + Transport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Gate")
			.field("config", &self.config)
			.field("refresh_state", &self.refresh_state())
			.field("credentials_present", &self.credentials.get().is_some())
			.field("persistence", &self.persistence.is_some())
			.field("expiry_offset", &self.expiry_offset)
			.finish()
	}
}
