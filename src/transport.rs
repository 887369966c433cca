//! Transport primitives: requests, response lifecycle events, and the [`Transport`] contract.
//!
//! A transport turns a fully headered [`HttpRequest`] into a lazy [`EventStream`]. The stream
//! yields intermediate lifecycle events ([`TransportEvent::Sent`], upload/download progress,
//! [`TransportEvent::ResponseHeader`]) and ends with exactly one terminal item: either
//! [`TransportEvent::Response`] or an `Err`. Nothing is sent until the stream is polled.
//!
//! The gate only inspects the terminal item of its own refresh requests; every other stream is
//! handed back to the caller untouched.

// crates.io
use futures_core::Stream;
use futures_util::StreamExt;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
};

/// Boxed, lazily evaluated stream of response lifecycle events.
pub type EventStream =
	Pin<Box<dyn Stream<Item = Result<TransportEvent, TransportError>> + 'static + Send>>;

/// Contract for HTTP stacks the gate dispatches through.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can back many gate
/// clones, and the returned streams must own whatever they need so callers can poll them after
/// the gate call returns.
pub trait Transport
where
	Self: 'static + Send + Sync,
{
	/// Dispatches `request`, returning its lifecycle events.
	fn dispatch(&self, request: HttpRequest) -> EventStream;
}

/// Outbound request as seen by the gate and the signer.
#[derive(Clone, Debug)]
pub struct HttpRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute destination URL.
	pub url: Url,
	/// Request headers.
	pub headers: HeaderMap,
	/// Raw request body.
	pub body: Option<Vec<u8>>,
}
impl HttpRequest {
	/// Creates a body-less request.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, headers: HeaderMap::new(), body: None }
	}

	/// Shorthand for a `GET` request.
	pub fn get(url: Url) -> Self {
		Self::new(Method::GET, url)
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

	/// Attaches a raw body.
	pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = Some(body.into());

		self
	}

	/// Serializes `body` as JSON and attaches it.
	pub fn with_json<T>(self, body: &T) -> Result<Self, ConfigError>
	where
		T: ?Sized + Serialize,
	{
		let bytes = serde_json::to_vec(body).map_err(ConfigError::BodySerialization)?;

		Ok(self.with_body(bytes))
	}

	/// Body bytes, or an empty slice.
	pub fn body_bytes(&self) -> &[u8] {
		self.body.as_deref().unwrap_or_default()
	}
}

/// Terminal response of a dispatched request.
#[derive(Clone, Debug)]
pub struct HttpResponse {
	/// Response status.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Response body.
	pub body: Vec<u8>,
}
impl HttpResponse {
	/// Creates a response with empty headers.
	pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
		Self { status, headers: HeaderMap::new(), body: body.into() }
	}

	/// Deserializes the body as JSON, reporting the failing path on error.
	pub fn json<T>(&self) -> Result<T, serde_path_to_error::Error<serde_json::Error>>
	where
		T: for<'de> Deserialize<'de>,
	{
		let mut deserializer = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut deserializer)
	}
}

/// Response lifecycle event.
#[derive(Clone, Debug)]
pub enum TransportEvent {
	/// The request left the process.
	Sent,
	/// Upload progress.
	UploadProgress {
		/// Bytes sent so far.
		loaded: u64,
		/// Total bytes, when known.
		total: Option<u64>,
	},
	/// Status line and headers arrived.
	ResponseHeader {
		/// Response status.
		status: StatusCode,
		/// Response headers.
		headers: HeaderMap,
	},
	/// Download progress.
	DownloadProgress {
		/// Bytes received so far.
		loaded: u64,
		/// Total bytes, when known.
		total: Option<u64>,
	},
	/// Terminal event carrying the full response.
	Response(HttpResponse),
}
impl TransportEvent {
	/// Returns `true` for the terminal [`TransportEvent::Response`].
	pub fn is_terminal(&self) -> bool {
		matches!(self, Self::Response(_))
	}
}

/// Drains `events` until the terminal item, discarding intermediate events.
pub async fn terminal_response(mut events: EventStream) -> Result<HttpResponse, TransportError> {
	while let Some(event) = events.next().await {
		if let TransportEvent::Response(response) = event? {
			return Ok(response);
		}
	}

	Err(TransportError::Incomplete)
}

/// Reqwest-backed [`Transport`].
///
/// Responses with any status are delivered as [`TransportEvent::Response`]; only network
/// failures become `Err` items.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Builds a client that gives up on requests after `timeout`.
	pub fn with_timeout(timeout: std::time::Duration) -> Result<Self, ConfigError> {
		Ok(Self(ReqwestClient::builder().timeout(timeout).build()?))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl Transport for ReqwestTransport {
	fn dispatch(&self, request: HttpRequest) -> EventStream {
		Box::pin(reqwest_events(self.0.clone(), request))
	}
}

#[cfg(feature = "reqwest")]
fn reqwest_events(
	client: ReqwestClient,
	request: HttpRequest,
) -> impl Stream<Item = Result<TransportEvent, TransportError>> + 'static + Send {
	async_stream::try_stream! {
		let upload = request.body.as_ref().map(|body| body.len() as u64);
		let mut builder = client.request(request.method, request.url).headers(request.headers);

		if let Some(body) = request.body {
			builder = builder.body(body);
		}

		yield TransportEvent::Sent;

		let response = builder.send().await.map_err(TransportError::network)?;

		if let Some(loaded) = upload {
			yield TransportEvent::UploadProgress { loaded, total: Some(loaded) };
		}

		let status = response.status();
		let headers = response.headers().to_owned();
		let total = response.content_length();

		yield TransportEvent::ResponseHeader { status, headers: headers.clone() };

		let body = response.bytes().await.map_err(TransportError::network)?.to_vec();

		yield TransportEvent::DownloadProgress { loaded: body.len() as u64, total };
		yield TransportEvent::Response(HttpResponse { status, headers, body });
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use futures_util::stream;
	// self
	use super::*;

	fn events(items: Vec<Result<TransportEvent, TransportError>>) -> EventStream {
		Box::pin(stream::iter(items))
	}

	#[tokio::test]
	async fn terminal_response_skips_intermediate_events() {
		let stream = events(vec![
			Ok(TransportEvent::Sent),
			Ok(TransportEvent::ResponseHeader { status: StatusCode::OK, headers: HeaderMap::new() }),
			Ok(TransportEvent::Response(HttpResponse::new(StatusCode::OK, "done"))),
		]);
		let response =
			terminal_response(stream).await.expect("Terminal response should be returned.");

		assert_eq!(response.body, b"done");
	}

	#[tokio::test]
	async fn terminal_response_reports_truncated_streams() {
		let err = terminal_response(events(vec![Ok(TransportEvent::Sent)]))
			.await
			.expect_err("Streams without a terminal event should fail.");

		assert!(matches!(err, TransportError::Incomplete));

		let err = terminal_response(events(vec![Err(TransportError::Incomplete)]))
			.await
			.expect_err("Transport errors should propagate.");

		assert!(matches!(err, TransportError::Incomplete));
	}

	#[test]
	fn request_builders_validate_headers_and_encode_json() {
		let url = Url::parse("https://api.example.com/a").expect("Fixture URL should parse.");
		let request = HttpRequest::get(url.clone())
			.with_header("x-trace", "abc")
			.expect("Valid header should be accepted.")
			.with_json(&serde_json::json!({ "a": 1 }))
			.expect("JSON body should serialize.");

		assert_eq!(request.headers["x-trace"], "abc");
		assert_eq!(request.body_bytes(), br#"{"a":1}"#);
		assert!(HttpRequest::get(url).with_header("bad header", "x").is_err());
	}

	#[test]
	fn response_json_reports_failing_path() {
		#[derive(Debug, Deserialize)]
		struct Body {
			#[allow(dead_code)]
			count: u32,
		}

		let response = HttpResponse::new(StatusCode::OK, r#"{"count":"x"}"#);
		let err = response.json::<Body>().expect_err("Mistyped field should fail.");

		assert_eq!(err.path().to_string(), "count");
	}
}
