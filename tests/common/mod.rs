#![allow(dead_code)]

// std
use std::{
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration as StdDuration,
};
// crates.io
use parking_lot::Mutex;
use time::{Duration, OffsetDateTime};
// self
use sigv4_broker::{
	auth::{CredentialSet, IdentityId, IdentityToken},
	config::{Config, ExactHost},
	error::{ExchangeError, TransportError},
	exchange::{CredentialExchange, ExchangeFuture},
	gate::Gate,
	hooks::{JsonRefreshResultHandler, RefreshRequest},
	http::{StatusCode, header::AUTHORIZATION},
	transport::{EventStream, HttpRequest, HttpResponse, Transport, TransportEvent},
	url::Url,
};

pub const API_HOST: &str = "api.test";
pub const BASE_URL: &str = "https://api.test/prod";
pub const REFRESH_PATH: &str = "/auth/refresh";
pub const API_KEY: &str = "key-1";
pub const IDENTITY: &str = "eu-west-1:identity";

/// How the scripted refresh endpoint answers.
#[derive(Clone, Copy, Debug)]
pub enum RefreshOutcome {
	Token,
	Status(u16),
	NetworkError,
}

/// Transport that records every dispatched request and scripts the refresh endpoint.
///
/// Non-refresh requests always answer `200 ok`.
pub struct ScriptedTransport {
	requests: Mutex<Vec<HttpRequest>>,
	refresh_calls: AtomicUsize,
	refresh_delay: StdDuration,
	refresh_outcome: Mutex<RefreshOutcome>,
}
impl ScriptedTransport {
	pub fn new(refresh_delay: StdDuration) -> Arc<Self> {
		Arc::new(Self {
			requests: Mutex::new(Vec::new()),
			refresh_calls: AtomicUsize::new(0),
			refresh_delay,
			refresh_outcome: Mutex::new(RefreshOutcome::Token),
		})
	}

	pub fn set_refresh_outcome(&self, outcome: RefreshOutcome) {
		*self.refresh_outcome.lock() = outcome;
	}

	pub fn refresh_calls(&self) -> usize {
		self.refresh_calls.load(Ordering::SeqCst)
	}

	pub fn refresh_requests(&self) -> Vec<HttpRequest> {
		self.requests.lock().iter().filter(|r| is_refresh(r)).cloned().collect()
	}

	pub fn api_requests(&self) -> Vec<HttpRequest> {
		self.requests.lock().iter().filter(|r| !is_refresh(r)).cloned().collect()
	}
}
impl Transport for ScriptedTransport {
	fn dispatch(&self, request: HttpRequest) -> EventStream {
		let refresh = is_refresh(&request);

		self.requests.lock().push(request);

		if !refresh {
			return Box::pin(async_stream::stream! {
				yield Ok::<_, TransportError>(TransportEvent::Sent);
				yield Ok(TransportEvent::Response(HttpResponse::new(StatusCode::OK, "ok")));
			});
		}

		let call = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
		let delay = self.refresh_delay;
		let outcome = *self.refresh_outcome.lock();

		Box::pin(async_stream::stream! {
			yield Ok::<_, TransportError>(TransportEvent::Sent);

			tokio::time::sleep(delay).await;

			match outcome {
				RefreshOutcome::Token => {
					let body = format!(r#"{{"IdentityId":"{IDENTITY}","Token":"open-id-{call}"}}"#);

					yield Ok(TransportEvent::Response(HttpResponse::new(StatusCode::OK, body)));
				},
				RefreshOutcome::Status(status) => {
					let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);

					yield Ok(TransportEvent::Response(HttpResponse::new(status, "")));
				},
				RefreshOutcome::NetworkError => {
					yield Err(TransportError::network(std::io::Error::other("connection refused")));
				},
			}
		})
	}
}

fn is_refresh(request: &HttpRequest) -> bool {
	request.url.path().ends_with(REFRESH_PATH)
}

/// Exchange that mints a numbered credential set per call.
#[derive(Clone, Default)]
pub struct StaticExchange {
	calls: Arc<AtomicUsize>,
	tokens: Arc<Mutex<Vec<String>>>,
}
impl StaticExchange {
	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn tokens(&self) -> Vec<String> {
		self.tokens.lock().clone()
	}
}
impl CredentialExchange for StaticExchange {
	fn exchange<'a>(&'a self, token: &'a IdentityToken) -> ExchangeFuture<'a> {
		Box::pin(async move {
			let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

			self.tokens.lock().push(token.token.expose().to_owned());

			CredentialSet::builder(token.identity_id.clone())
				.access_key_id(format!("ASIAFRESH{call}"))
				.secret_access_key(format!("secret-{call}"))
				.session_token(format!("session-{call}"))
				.expires_in(Duration::hours(1))
				.build()
				.map_err(|e| ExchangeError::InvalidCredentials { reason: e.to_string() })
		})
	}
}

pub fn config() -> Config {
	Config::new("eu-west-1")
		.with_base_url(BASE_URL)
		.with_api_key(API_KEY)
		.with_host_matcher(ExactHost::new(API_HOST))
}

/// Gate wired with the scripted refresh endpoint and the JSON refresh handler.
pub fn refreshing_gate(
	transport: &Arc<ScriptedTransport>,
	exchange: &StaticExchange,
) -> Gate<ScriptedTransport> {
	Gate::with_transport(config(), transport.clone(), exchange.clone())
		.with_refresh_request(|| Some(RefreshRequest::post(REFRESH_PATH)))
		.with_refresh_handler(JsonRefreshResultHandler)
}

pub fn credentials(access_key_id: &str, expire_time: OffsetDateTime) -> CredentialSet {
	CredentialSet::builder(IdentityId::new(IDENTITY).expect("Identity fixture should be valid."))
		.access_key_id(access_key_id)
		.secret_access_key("stale-secret")
		.expire_time(expire_time)
		.build()
		.expect("Credential fixture should build.")
}

pub fn api_request(path: &str) -> HttpRequest {
	HttpRequest::get(
		Url::parse(&format!("{BASE_URL}{path}")).expect("API request URL should parse."),
	)
}

/// Access key id named in the request's `Authorization` header, if signed.
pub fn signing_key_id(request: &HttpRequest) -> Option<String> {
	let header = request.headers.get(AUTHORIZATION)?.to_str().ok()?;
	let credential = header.split("Credential=").nth(1)?;

	credential.split('/').next().map(str::to_owned)
}
