//! Crate-level error types shared across the gate, signer, exchange, and stores.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Persistence-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, truncated response stream).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Identity exchange failure.
	#[error(transparent)]
	Exchange(#[from] ExchangeError),
	/// Request signing failure; only the request being signed is affected.
	#[error(transparent)]
	Signing(#[from] SigningError),
	/// The refresh cycle triggered by this admission failed.
	#[error(transparent)]
	Refresh(#[from] RefreshFailure),

	/// Refresh endpoint answered with a non-success status.
	#[error("Refresh endpoint responded with HTTP {status}.")]
	RefreshRejected {
		/// HTTP status code returned by the refresh endpoint.
		status: u16,
	},
	/// Refresh-result handler could not derive an identity token from the response.
	#[error("Refresh response could not be interpreted: {reason}.")]
	RefreshResponse {
		/// Handler-supplied reason string.
		reason: String,
	},
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// A URL could not be parsed.
	#[error("URL `{value}` is invalid.")]
	InvalidUrl {
		/// Offending input.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A relative path was used while no base URL is configured.
	#[error("Path `{path}` is relative but no base URL is configured.")]
	MissingBaseUrl {
		/// Offending path.
		path: String,
	},
	/// A header name or value is not valid HTTP.
	#[error("Header `{name}` is invalid.")]
	InvalidHeader {
		/// Offending header name.
		name: String,
	},
	/// A request body could not be serialized.
	#[error("Request body could not be serialized.")]
	BodySerialization(#[source] serde_json::Error),
	/// A refresh request was issued but no result handler is configured.
	#[error("A refresh request is configured but no refresh-result handler is set.")]
	MissingRefreshHandler,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}

	pub(crate) fn invalid_url(value: impl Into<String>, source: url::ParseError) -> Self {
		Self::InvalidUrl { value: value.into(), source }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO, protocol).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while dispatching the request.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The event stream ended before a terminal response arrived.
	#[error("Transport event stream ended without a terminal response.")]
	Incomplete,
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Identity exchange failures.
#[derive(Debug, ThisError)]
pub enum ExchangeError {
	/// The identity service rejected the identity token.
	#[error("Identity exchange was rejected ({kind}): {message}.")]
	Rejected {
		/// Service-supplied error type (e.g. `NotAuthorizedException`).
		kind: String,
		/// Service-supplied message.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// The identity service could not be reached.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// The identity service responded with a payload that could not be parsed.
	#[error("Identity exchange returned a malformed payload.")]
	Parse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// The exchange returned credentials that cannot be represented.
	#[error("Identity exchange returned invalid credentials: {reason}.")]
	InvalidCredentials {
		/// Description of the invalid field.
		reason: String,
	},
}

/// Signing failures; these never affect refresh coordination.
#[derive(Debug, ThisError)]
pub enum SigningError {
	/// Request URL has no host component.
	#[error("Request URL `{url}` has no host.")]
	MissingHost {
		/// Offending URL.
		url: String,
	},
	/// A header value is not valid visible ASCII.
	#[error("Header `{name}` carries a value that cannot be signed.")]
	UnsignableHeader {
		/// Offending header name.
		name: String,
	},
	/// The signer produced a header that is not valid HTTP.
	#[error("Signer produced an invalid `{name}` header.")]
	InvalidSignedHeader {
		/// Offending header name.
		name: String,
	},
	/// The signing key could not be initialized.
	#[error("Signing key could not be initialized.")]
	InvalidKey,
	/// Timestamp formatting failed.
	#[error("Signing timestamp could not be formatted.")]
	Timestamp(#[from] time::error::Format),
}

/// Shared handle to the error that ended a refresh cycle.
///
/// The same value is published on the gate's error channel and returned to the leader
/// admission, so it is cheap to clone.
#[derive(Clone, Debug, ThisError)]
#[error("Credential refresh failed: {0}")]
pub struct RefreshFailure(#[source] Arc<Error>);
impl RefreshFailure {
	/// Wraps the error that ended a refresh cycle.
	pub fn new(error: Error) -> Self {
		Self(Arc::new(error))
	}

	/// Returns the underlying error.
	pub fn cause(&self) -> &Error {
		&self.0
	}
}
