//! Gate configuration: region, API key, base URL, and the protected-host predicate.
//!
//! A [`Config`] is built once and shared as `Arc<Config>` between the gate, the signer
//! adapter, and the API client. The API key and base URL stay mutable after construction so
//! applications can rotate keys or switch stages without rebuilding the gate.

// self
use crate::{_prelude::*, error::ConfigError};

/// Decides which request destinations are subject to refresh gating and signing.
pub trait HostMatcher
where
	Self: Send + Sync,
{
	/// Returns `true` when requests to `url` must be signed.
	fn matches(&self, url: &Url) -> bool;
}
impl<F> HostMatcher for F
where
	F: Send + Sync + Fn(&Url) -> bool,
{
	fn matches(&self, url: &Url) -> bool {
		self(url)
	}
}

/// Matches `https://{api}.execute-api.{region}.amazonaws.com` destinations.
#[derive(Clone, Copy, Debug, Default)]
pub struct ApiGatewayHosts;
impl HostMatcher for ApiGatewayHosts {
	fn matches(&self, url: &Url) -> bool {
		const MARKER: &str = ".execute-api.";

		if url.scheme() != "https" {
			return false;
		}

		let Some(host) = url.host_str() else {
			return false;
		};
		let Some(idx) = host.find(MARKER).filter(|idx| *idx > 0) else {
			return false;
		};
		let rest = &host[idx + MARKER.len()..];

		rest.find(".amazonaws.com").is_some_and(|idx| idx > 0)
	}
}

/// Matches a single host name (case-insensitive), optionally pinned to a port.
#[derive(Clone, Debug)]
pub struct ExactHost {
	host: String,
	port: Option<u16>,
}
impl ExactHost {
	/// Matches any port on `host`.
	pub fn new(host: impl Into<String>) -> Self {
		Self { host: host.into().to_ascii_lowercase(), port: None }
	}

	/// Restricts the matcher to `port`.
	pub fn with_port(mut self, port: u16) -> Self {
		self.port = Some(port);

		self
	}
}
impl HostMatcher for ExactHost {
	fn matches(&self, url: &Url) -> bool {
		let host_matches =
			url.host_str().is_some_and(|host| host.eq_ignore_ascii_case(&self.host));
		let port_matches = self.port.is_none_or(|port| url.port_or_known_default() == Some(port));

		host_matches && port_matches
	}
}

/// Shared configuration read by the gate and the signer adapter.
pub struct Config {
	region: String,
	service: String,
	api_key: RwLock<Option<String>>,
	base_url: RwLock<Option<String>>,
	host_matcher: Arc<dyn HostMatcher>,
}
impl Config {
	/// Service name used in the SigV4 credential scope for API Gateway.
	pub const EXECUTE_API: &'static str = "execute-api";

	/// Creates a configuration for `region` that protects API Gateway hosts.
	pub fn new(region: impl Into<String>) -> Self {
		Self {
			region: region.into(),
			service: Self::EXECUTE_API.into(),
			api_key: RwLock::new(None),
			base_url: RwLock::new(None),
			host_matcher: Arc::new(ApiGatewayHosts),
		}
	}

	/// Sets the initial API key.
	pub fn with_api_key(self, api_key: impl Into<String>) -> Self {
		self.set_api_key(Some(api_key.into()));

		self
	}

	/// Sets the initial base URL.
	pub fn with_base_url(self, base_url: impl Into<String>) -> Self {
		self.set_base_url(Some(base_url.into()));

		self
	}

	/// Replaces the protected-host predicate.
	pub fn with_host_matcher(mut self, matcher: impl 'static + HostMatcher) -> Self {
		self.host_matcher = Arc::new(matcher);

		self
	}

	/// Overrides the SigV4 service name (defaults to `execute-api`).
	pub fn with_service(mut self, service: impl Into<String>) -> Self {
		self.service = service.into();

		self
	}

	/// Region used in the SigV4 credential scope.
	pub fn region(&self) -> &str {
		&self.region
	}

	/// Service used in the SigV4 credential scope.
	pub fn service(&self) -> &str {
		&self.service
	}

	/// Current API key, if any.
	pub fn api_key(&self) -> Option<String> {
		self.api_key.read().clone()
	}

	/// Replaces (or clears) the API key.
	pub fn set_api_key(&self, api_key: Option<String>) {
		*self.api_key.write() = api_key;
	}

	/// Current base URL, if any.
	pub fn base_url(&self) -> Option<String> {
		self.base_url.read().clone()
	}

	/// Replaces (or clears) the base URL.
	pub fn set_base_url(&self, base_url: Option<String>) {
		*self.base_url.write() = base_url;
	}

	/// Returns `true` when requests to `url` must pass through the gate.
	pub fn is_protected(&self, url: &Url) -> bool {
		self.host_matcher.matches(url)
	}

	/// Resolves `path` against the base URL.
	///
	/// Absolute URLs are returned unchanged. Otherwise the base URL loses a trailing slash,
	/// the path gains a leading one, and the two are concatenated.
	pub fn resolve_url(&self, path: &str) -> Result<Url, ConfigError> {
		if let Ok(url) = Url::parse(path) {
			return Ok(url);
		}

		let base =
			self.base_url().ok_or_else(|| ConfigError::MissingBaseUrl { path: path.into() })?;
		let joined = join_url(&base, path);

		Url::parse(&joined).map_err(|source| ConfigError::invalid_url(joined, source))
	}
}
impl Debug for Config {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Config")
			.field("region", &self.region)
			.field("service", &self.service)
			.field("api_key_set", &self.api_key.read().is_some())
			.field("base_url", &*self.base_url.read())
			.finish()
	}
}

fn join_url(base: &str, path: &str) -> String {
	let base = base.strip_suffix('/').unwrap_or(base);

	if path.starts_with('/') { format!("{base}{path}") } else { format!("{base}/{path}") }
}
