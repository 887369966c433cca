//! Request signing contracts and the adapter that prepares protected requests.
//!
//! [`SignerAdapter`] owns header preparation (content negotiation, API key, host stripping) and
//! delegates the cryptography to a [`RequestSigner`]. The default signer is [`SigV4Signer`].

pub mod sigv4;

pub use sigv4::SigV4Signer;

// crates.io
use http::{
	HeaderMap, HeaderName, HeaderValue, Method,
	header::{ACCEPT, CONTENT_TYPE, HOST},
};
// self
use crate::{
	_prelude::*,
	auth::CredentialSet,
	config::Config,
	error::{ConfigError, SigningError},
	transport::HttpRequest,
};

const APPLICATION_JSON: &str = "application/json";
const X_API_KEY: &str = "x-api-key";

/// Signing inputs borrowed from the request being prepared.
#[derive(Clone, Copy, Debug)]
pub struct SigningRequest<'a> {
	/// Service name used in the credential scope.
	pub service: &'a str,
	/// Region used in the credential scope.
	pub region: &'a str,
	/// HTTP method.
	pub method: &'a Method,
	/// Destination URL (host, path, and query are signed).
	pub url: &'a Url,
	/// Headers that will be sent with the request.
	pub headers: &'a HeaderMap,
	/// Raw body (empty when the request has none).
	pub body: &'a [u8],
}

/// Produces authentication headers for a request.
///
/// Implementations must be deterministic for identical inputs and must not perform I/O.
pub trait RequestSigner
where
	Self: Send + Sync,
{
	/// Returns the headers to merge into the request (for SigV4: `host`, `x-amz-date`,
	/// `authorization`, and `x-amz-security-token` when a session token exists).
	fn sign(
		&self,
		request: &SigningRequest<'_>,
		credentials: &CredentialSet,
	) -> Result<HeaderMap, SigningError>;
}

/// Prepares protected requests before they reach the transport.
#[derive(Clone)]
pub struct SignerAdapter {
	signer: Arc<dyn RequestSigner>,
}
impl SignerAdapter {
	/// Wraps the provided signer.
	pub fn new(signer: Arc<dyn RequestSigner>) -> Self {
		Self { signer }
	}

	/// Adds content negotiation and API key headers, signs when `credentials` are present, and
	/// strips any `host` header.
	///
	/// Headers returned by the signer replace same-named request headers; every other request
	/// header is kept.
	pub fn prepare(
		&self,
		mut request: HttpRequest,
		credentials: Option<&CredentialSet>,
		config: &Config,
	) -> Result<HttpRequest> {
		request.headers.entry(ACCEPT).or_insert(HeaderValue::from_static(APPLICATION_JSON));
		request.headers.entry(CONTENT_TYPE).or_insert(HeaderValue::from_static(APPLICATION_JSON));

		if let Some(api_key) = config.api_key() {
			let value = HeaderValue::try_from(api_key)
				.map_err(|_| ConfigError::InvalidHeader { name: X_API_KEY.into() })?;

			request.headers.insert(HeaderName::from_static(X_API_KEY), value);
		}

		if let Some(credentials) = credentials {
			let signed = self.signer.sign(
				&SigningRequest {
					service: config.service(),
					region: config.region(),
					method: &request.method,
					url: &request.url,
					headers: &request.headers,
					body: request.body_bytes(),
				},
				credentials,
			)?;

			for (name, value) in signed.iter() {
				request.headers.insert(name.clone(), value.clone());
			}
		}

		request.headers.remove(HOST);

		Ok(request)
	}
}
impl Default for SignerAdapter {
	fn default() -> Self {
		Self::new(Arc::new(SigV4Signer))
	}
}
impl Debug for SignerAdapter {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("SignerAdapter(..)")
	}
}
