//! Demonstrates a refresh-gated API client: the first call refreshes the identity token,
//! exchanges it for temporary credentials, and signs the request; the second call reuses them.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use time::{Duration, OffsetDateTime};
use url::Url;
// self
use sigv4_broker::{
	client::ApiClient,
	config::{Config, ExactHost},
	exchange::CognitoExchange,
	gate::{Gate, ReqwestGate},
	hooks::{JsonRefreshResultHandler, RefreshRequest},
	reqwest::Client,
	transport::ReqwestTransport,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let refresh_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"IdentityId":"eu-west-1:demo","Token":"demo-open-id"}"#);
		})
		.await;
	let expiration = (OffsetDateTime::now_utc() + Duration::hours(1)).unix_timestamp();
	let identity_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/identity");
			then.status(200).header("content-type", "application/x-amz-json-1.1").body(format!(
				r#"{{"IdentityId":"eu-west-1:demo","Credentials":{{"AccessKeyId":"ASIADEMO","SecretKey":"demo-secret","SessionToken":"demo-session","Expiration":{expiration}}}}}"#
			));
		})
		.await;
	let api_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/widgets").header_exists("authorization");
			then.status(200).header("content-type", "application/json").body(r#"["sprocket"]"#);
		})
		.await;
	let config = Config::new("eu-west-1")
		.with_base_url(server.base_url())
		.with_api_key("demo-key")
		.with_host_matcher(ExactHost::new("127.0.0.1"));
	// The mock server presents a self-signed certificate.
	let client = Client::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.timeout(std::time::Duration::from_secs(10))
		.build()?;
	let transport = ReqwestTransport::with_client(client);
	let exchange =
		CognitoExchange::with_transport(Url::parse(&server.url("/identity"))?, transport.clone());
	let gate: ReqwestGate = Gate::with_transport(config, transport, exchange)
		.with_refresh_request(|| Some(RefreshRequest::post("/auth/refresh")))
		.with_refresh_handler(JsonRefreshResultHandler)
		.with_expiry_offset(Duration::minutes(5));
	let client = ApiClient::new(gate);

	for _ in 0..2 {
		let response = client.send_for_response(client.get("/widgets")?).await?;

		println!("Widgets: {}.", String::from_utf8_lossy(&response.body));
	}

	refresh_mock.assert_async().await;
	identity_mock.assert_async().await;
	api_mock.assert_calls_async(2).await;

	Ok(())
}
