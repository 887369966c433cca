//! Strategy hooks that drive a refresh cycle.
//!
//! - [`RefreshRequestProvider`] describes the request that yields a fresh identity token.
//! - [`RefreshResultHandler`] turns that request's response into an [`IdentityToken`].
//! - [`RefreshErrorHandler`] observes refresh failures.
//!
//! Every hook has a blanket implementation for matching closures.

// crates.io
use http::{HeaderMap, HeaderName, HeaderValue, Method};
// self
use crate::{
	_prelude::*,
	auth::IdentityToken,
	config::Config,
	error::{ConfigError, RefreshFailure},
	transport::{HttpRequest, HttpResponse},
};

/// Supplies the refresh request, or `None` when no refresh is currently possible.
pub trait RefreshRequestProvider
where
	Self: Send + Sync,
{
	/// Describes the next refresh request.
	fn refresh_request(&self) -> Option<RefreshRequest>;
}
impl<F> RefreshRequestProvider for F
where
	F: Send + Sync + Fn() -> Option<RefreshRequest>,
{
	fn refresh_request(&self) -> Option<RefreshRequest> {
		self()
	}
}

/// Derives an identity token from the refresh response.
pub trait RefreshResultHandler
where
	Self: Send + Sync,
{
	/// Interprets the terminal refresh response.
	fn on_refresh(&self, response: &HttpResponse) -> Result<IdentityToken>;
}
impl<F> RefreshResultHandler for F
where
	F: Send + Sync + Fn(&HttpResponse) -> Result<IdentityToken>,
{
	fn on_refresh(&self, response: &HttpResponse) -> Result<IdentityToken> {
		self(response)
	}
}

/// Observes refresh failures after they were published on the error channel.
pub trait RefreshErrorHandler
where
	Self: Send + Sync,
{
	/// Called once per failed refresh cycle.
	fn on_refresh_error(&self, failure: &RefreshFailure);
}
impl<F> RefreshErrorHandler for F
where
	F: Send + Sync + Fn(&RefreshFailure),
{
	fn on_refresh_error(&self, failure: &RefreshFailure) {
		self(failure)
	}
}

/// Parses `{ "IdentityId": ..., "Token": ... }` refresh responses.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonRefreshResultHandler;
impl RefreshResultHandler for JsonRefreshResultHandler {
	fn on_refresh(&self, response: &HttpResponse) -> Result<IdentityToken> {
		response.json().map_err(|e| Error::RefreshResponse {
			reason: format!("field `{}` is invalid: {}", e.path(), e.inner()),
		})
	}
}

/// Request that yields a fresh identity token.
#[derive(Clone, Debug)]
pub struct RefreshRequest {
	/// HTTP method.
	pub method: Method,
	/// Path resolved against the configured base URL, or an absolute URL.
	pub path: String,
	/// Extra headers.
	pub headers: HeaderMap,
	/// Optional JSON body.
	pub body: Option<serde_json::Value>,
}
impl RefreshRequest {
	/// Creates a body-less request.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), headers: HeaderMap::new(), body: None }
	}

	/// Shorthand for a `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// Attaches a JSON body.
	pub fn with_body(mut self, body: serde_json::Value) -> Self {
		self.body = Some(body);

		self
	}

	/// Adds (or replaces) a header.
	pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, ConfigError> {
		let header_name = HeaderName::try_from(name)
			.map_err(|_| ConfigError::InvalidHeader { name: name.into() })?;
		let header_value = HeaderValue::try_from(value)
			.map_err(|_| ConfigError::InvalidHeader { name: name.into() })?;

		self.headers.insert(header_name, header_value);

		Ok(self)
	}

	/// Resolves the URL and encodes the body.
	pub fn into_http_request(self, config: &Config) -> Result<HttpRequest, ConfigError> {
		let url = config.resolve_url(&self.path)?;
		let mut request = HttpRequest::new(self.method, url);

		request.headers = self.headers;

		match self.body {
			Some(body) => request.with_json(&body),
			None => Ok(request),
		}
	}
}
