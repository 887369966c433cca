//! Identity-token to temporary-credential exchange.

// crates.io
use http::{HeaderValue, Method, header::CONTENT_TYPE};
// self
use crate::{
	_prelude::*,
	auth::{CredentialSet, IdentityId, IdentityParams, IdentityToken},
	error::{ConfigError, ExchangeError},
	transport::{self, HttpRequest, HttpResponse, Transport},
};
#[cfg(feature = "reqwest")] use crate::transport::ReqwestTransport;

/// Boxed future returned by [`CredentialExchange`] implementations.
pub type ExchangeFuture<'a> =
	Pin<Box<dyn Future<Output = Result<CredentialSet, ExchangeError>> + 'a + Send>>;

/// Turns an identity token into a temporary credential set.
pub trait CredentialExchange
where
	Self: Send + Sync,
{
	/// Performs the exchange.
	fn exchange<'a>(&'a self, token: &'a IdentityToken) -> ExchangeFuture<'a>;
}

/// Cognito `GetCredentialsForIdentity` exchange over the JSON 1.1 protocol.
#[derive(Clone)]
pub struct CognitoExchange {
	endpoint: Url,
	transport: Arc<dyn Transport>,
}
impl CognitoExchange {
	const TARGET: &'static str = "AWSCognitoIdentityService.GetCredentialsForIdentity";
	const CONTENT_TYPE: &'static str = "application/x-amz-json-1.1";

	/// Targets the regional Cognito endpoint through a default reqwest transport.
	#[cfg(feature = "reqwest")]
	pub fn new(region: &str) -> Result<Self, ConfigError> {
		Ok(Self::with_transport(Self::regional_endpoint(region)?, ReqwestTransport::default()))
	}

	/// Targets `endpoint` through `transport`.
	pub fn with_transport(endpoint: Url, transport: impl Transport) -> Self {
		Self { endpoint, transport: Arc::new(transport) }
	}

	/// `https://cognito-identity.{region}.amazonaws.com/`.
	pub fn regional_endpoint(region: &str) -> Result<Url, ConfigError> {
		let endpoint = format!("https://cognito-identity.{region}.amazonaws.com/");

		Url::parse(&endpoint).map_err(|source| ConfigError::invalid_url(endpoint, source))
	}

	/// Endpoint the exchange posts to.
	pub fn endpoint(&self) -> &Url {
		&self.endpoint
	}

	fn build_request(&self, token: &IdentityToken) -> Result<HttpRequest, ExchangeError> {
		let mut request = HttpRequest::new(Method::POST, self.endpoint.clone())
			.with_json(&IdentityParams::from(token))
			.map_err(|e| ExchangeError::InvalidCredentials { reason: e.to_string() })?;

		request.headers.insert("x-amz-target", HeaderValue::from_static(Self::TARGET));
		request.headers.insert(CONTENT_TYPE, HeaderValue::from_static(Self::CONTENT_TYPE));

		Ok(request)
	}
}
impl CredentialExchange for CognitoExchange {
	fn exchange<'a>(&'a self, token: &'a IdentityToken) -> ExchangeFuture<'a> {
		Box::pin(async move {
			let request = self.build_request(token)?;
			let response = transport::terminal_response(self.transport.dispatch(request)).await?;

			parse_credentials(token, &response)
		})
	}
}
impl Debug for CognitoExchange {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CognitoExchange").field("endpoint", &self.endpoint.as_str()).finish()
	}
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CredentialsResponse {
	identity_id: Option<String>,
	credentials: CognitoCredentials,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CognitoCredentials {
	access_key_id: String,
	secret_key: String,
	session_token: Option<String>,
	expiration: f64,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
	#[serde(rename = "__type")]
	kind: Option<String>,
	#[serde(alias = "Message")]
	message: Option<String>,
}

fn parse_credentials(
	token: &IdentityToken,
	response: &HttpResponse,
) -> Result<CredentialSet, ExchangeError> {
	if !response.status.is_success() {
		let error = serde_json::from_slice::<ServiceError>(&response.body).ok();
		let kind = error
			.as_ref()
			.and_then(|e| e.kind.as_deref())
			.map(|kind| kind.rsplit('#').next().unwrap_or(kind).to_owned())
			.unwrap_or_else(|| "UnknownError".into());
		let message = error.and_then(|e| e.message).unwrap_or_default();

		return Err(ExchangeError::Rejected {
			kind,
			message,
			status: Some(response.status.as_u16()),
		});
	}

	let raw =
		response.json::<serde_json::Value>().map_err(|source| ExchangeError::Parse { source })?;
	let parsed: CredentialsResponse = serde_path_to_error::deserialize(&raw)
		.map_err(|source| ExchangeError::Parse { source })?;
	let identity_id = match parsed.identity_id {
		Some(id) => IdentityId::new(id)
			.map_err(|e| ExchangeError::InvalidCredentials { reason: e.to_string() })?,
		None => token.identity_id.clone(),
	};
	let expire_time = epoch_seconds(parsed.credentials.expiration)?;
	let mut builder = CredentialSet::builder(identity_id)
		.access_key_id(parsed.credentials.access_key_id)
		.secret_access_key(parsed.credentials.secret_key)
		.expire_time(expire_time)
		.raw(raw);

	if let Some(session_token) = parsed.credentials.session_token {
		builder = builder.session_token(session_token);
	}

	builder.build().map_err(|e| ExchangeError::InvalidCredentials { reason: e.to_string() })
}

// Cognito reports expirations as fractional epoch seconds.
fn epoch_seconds(value: f64) -> Result<OffsetDateTime, ExchangeError> {
	let seconds = value.trunc();
	let nanos = ((value - seconds) * 1_000_000_000.).round() as i64;

	OffsetDateTime::from_unix_timestamp(seconds as i64)
		.map(|instant| instant + Duration::nanoseconds(nanos))
		.map_err(|e| ExchangeError::InvalidCredentials { reason: e.to_string() })
}

#[cfg(test)]
mod tests {
	// crates.io
	use http::StatusCode;
	use time::macros;
	// self
	use super::*;

	fn token() -> IdentityToken {
		IdentityToken::new(
			IdentityId::new("eu-west-1:abc").expect("Identity fixture should be valid."),
			"open-id",
		)
	}

	#[test]
	fn successful_payload_becomes_credential_set() {
		let response = HttpResponse::new(
			StatusCode::OK,
			r#"{
				"IdentityId": "eu-west-1:abc",
				"Credentials": {
					"AccessKeyId": "ASIAEXAMPLE",
					"SecretKey": "secret",
					"SessionToken": "session",
					"Expiration": 1735693200
				}
			}"#,
		);
		let set = parse_credentials(&token(), &response).expect("Payload should parse.");

		assert_eq!(set.access_key_id.as_ref(), "ASIAEXAMPLE");
		assert_eq!(set.secret_access_key.expose(), "secret");
		assert_eq!(set.session_token.as_ref().map(|s| s.expose()), Some("session"));
		assert_eq!(set.expire_time, macros::datetime!(2025-01-01 01:00 UTC));
		assert!(set.raw.is_some());
	}

	#[test]
	fn service_errors_become_rejections() {
		let response = HttpResponse::new(
			StatusCode::BAD_REQUEST,
			r#"{"__type":"com.amazon#NotAuthorizedException","message":"Token expired"}"#,
		);
		let err = parse_credentials(&token(), &response).expect_err("Rejections should fail.");

		match err {
			ExchangeError::Rejected { kind, message, status } => {
				assert_eq!(kind, "NotAuthorizedException");
				assert_eq!(message, "Token expired");
				assert_eq!(status, Some(400));
			},
			other => panic!("Unexpected error: {other:?}"),
		}
	}

	#[test]
	fn malformed_payloads_report_the_failing_path() {
		let response = HttpResponse::new(
			StatusCode::OK,
			r#"{"Credentials":{"AccessKeyId":"A","SecretKey":"s","Expiration":"soon"}}"#,
		);
		let err = parse_credentials(&token(), &response).expect_err("Bad expiry should fail.");

		match err {
			ExchangeError::Parse { source } =>
				assert_eq!(source.path().to_string(), "Credentials.Expiration"),
			other => panic!("Unexpected error: {other:?}"),
		}
	}

	#[test]
	fn request_carries_json_protocol_headers() {
		let exchange = CognitoExchange::with_transport(
			CognitoExchange::regional_endpoint("eu-west-1").expect("Endpoint should build."),
			NeverTransport,
		);
		let request = exchange.build_request(&token()).expect("Request should build.");

		assert_eq!(request.url.as_str(), "https://cognito-identity.eu-west-1.amazonaws.com/");
		assert_eq!(request.headers["x-amz-target"], CognitoExchange::TARGET);
		assert_eq!(request.headers[CONTENT_TYPE], "application/x-amz-json-1.1");

		let body: serde_json::Value =
			serde_json::from_slice(request.body_bytes()).expect("Body should be JSON.");

		assert_eq!(body["Logins"]["cognito-identity.amazonaws.com"], "open-id");
	}

	struct NeverTransport;
	impl Transport for NeverTransport {
		fn dispatch(&self, _: HttpRequest) -> transport::EventStream {
			Box::pin(futures_util::stream::empty())
		}
	}
}
