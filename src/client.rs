//! Base-URL aware client that routes every request through a [`Gate`].

// crates.io
use http::Method;
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	gate::Gate,
	transport::{self, EventStream, HttpRequest, HttpResponse, Transport},
};
#[cfg(feature = "reqwest")] use crate::transport::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestApiClient = ApiClient<ReqwestTransport>;

/// Builds requests relative to the configured base URL and admits them through a gate.
pub struct ApiClient<T>
where
	T: ?Sized + Transport,
{
	gate: Gate<T>,
}
impl<T> ApiClient<T>
where
	T: ?Sized + Transport,
{
	/// Wraps `gate`.
	pub fn new(gate: Gate<T>) -> Self {
		Self { gate }
	}

	/// Gate used for every request.
	pub fn gate(&self) -> &Gate<T> {
		&self.gate
	}

	/// Builds a request for `path` resolved against the base URL (absolute URLs pass through).
	pub fn request(&self, method: Method, path: &str) -> Result<HttpRequest, ConfigError> {
		Ok(HttpRequest::new(method, self.gate.config().resolve_url(path)?))
	}

	/// Shorthand for a `GET` request.
	pub fn get(&self, path: &str) -> Result<HttpRequest, ConfigError> {
		self.request(Method::GET, path)
	}

	/// Shorthand for a `POST` request carrying `body` as JSON.
	pub fn post_json<B>(&self, path: &str, body: &B) -> Result<HttpRequest, ConfigError>
	where
		B: ?Sized + Serialize,
	{
		self.request(Method::POST, path)?.with_json(body)
	}

	/// Admits `request`, returning every lifecycle event.
	pub async fn send(&self, request: HttpRequest) -> Result<EventStream> {
		self.gate.admit(request).await
	}

	/// Admits `request` and waits for its terminal response.
	pub async fn send_for_response(&self, request: HttpRequest) -> Result<HttpResponse> {
		let events = self.gate.admit(request).await?;

		Ok(transport::terminal_response(events).await?)
	}
}
impl<T> Clone for ApiClient<T>
where
	T: ?Sized + Transport,
{
	fn clone(&self) -> Self {
		Self { gate: self.gate.clone() }
	}
}
impl<T> Debug for ApiClient<T>
where
	T: ?Sized + Transport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient").field("gate", &self.gate).finish()
	}
}
