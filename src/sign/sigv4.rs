//! AWS Signature Version 4 (HMAC-SHA256) header signing.
//!
//! ```text
//! CanonicalRequest = Method \n CanonicalURI \n CanonicalQuery \n CanonicalHeaders \n
//!                    SignedHeaders \n HexSha256(Payload)
//! StringToSign     = "AWS4-HMAC-SHA256" \n AmzDate \n Scope \n HexSha256(CanonicalRequest)
//! SigningKey       = HMAC(HMAC(HMAC(HMAC("AWS4" + Secret, Date), Region), Service), "aws4_request")
//! ```

// crates.io
use hmac::{Hmac, Mac};
use http::{HeaderMap, HeaderName, HeaderValue, header::AUTHORIZATION};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};
use sha2::{Digest, Sha256};
use time::{UtcOffset, format_description::BorrowedFormatItem, macros};
// self
use crate::{
	_prelude::*,
	auth::CredentialSet,
	error::SigningError,
	sign::{RequestSigner, SigningRequest},
};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const X_AMZ_DATE: &str = "x-amz-date";
const X_AMZ_SECURITY_TOKEN: &str = "x-amz-security-token";
const AMZ_DATE: &[BorrowedFormatItem<'static>] =
	macros::format_description!("[year][month][day]T[hour][minute][second]Z");
const SCOPE_DATE: &[BorrowedFormatItem<'static>] =
	macros::format_description!("[year][month][day]");
// Unreserved characters stay literal; everything else is percent-encoded.
const URI_ENCODE: &AsciiSet =
	&NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');
// Headers that proxies and clients routinely rewrite.
const UNSIGNED_HEADERS: [&str; 7] = [
	"authorization",
	"connection",
	"expect",
	"presigned-expires",
	"range",
	"user-agent",
	"x-amzn-trace-id",
];

/// Default [`RequestSigner`] implementing AWS Signature Version 4.
#[derive(Clone, Copy, Debug, Default)]
pub struct SigV4Signer;
impl SigV4Signer {
	/// Signs `request` as of `instant`.
	pub fn sign_at(
		&self,
		request: &SigningRequest<'_>,
		credentials: &CredentialSet,
		instant: OffsetDateTime,
	) -> Result<HeaderMap, SigningError> {
		let instant = instant.to_offset(UtcOffset::UTC);
		let amz_date = instant.format(AMZ_DATE)?;
		let date = instant.format(SCOPE_DATE)?;
		let host = host_header(request.url)?;
		let mut canonical = canonical_headers(request.headers)?;

		canonical.insert("host".into(), host.clone());
		canonical.insert(X_AMZ_DATE.into(), amz_date.clone());

		if let Some(token) = &credentials.session_token {
			canonical.insert(X_AMZ_SECURITY_TOKEN.into(), token.expose().to_owned());
		}

		let signed_headers = canonical.keys().map(String::as_str).collect::<Vec<_>>().join(";");
		let canonical_request = format!(
			"{}\n{}\n{}\n{}\n{}\n{}",
			request.method.as_str(),
			canonical_uri(request.url),
			canonical_query(request.url),
			canonical.iter().map(|(name, value)| format!("{name}:{value}\n")).collect::<String>(),
			signed_headers,
			hex_sha256(request.body),
		);
		let scope = format!("{date}/{}/{}/aws4_request", request.region, request.service);
		let string_to_sign =
			format!("{ALGORITHM}\n{amz_date}\n{scope}\n{}", hex_sha256(canonical_request.as_bytes()));
		let key = signing_key(
			credentials.secret_access_key.expose(),
			&date,
			request.region,
			request.service,
		)?;
		let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes())?);
		let authorization = format!(
			"{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
			credentials.access_key_id.as_ref(),
		);
		let mut headers = HeaderMap::new();

		headers.insert(http::header::HOST, header_value("host", host)?);
		headers.insert(HeaderName::from_static(X_AMZ_DATE), header_value(X_AMZ_DATE, amz_date)?);

		if let Some(token) = &credentials.session_token {
			headers.insert(
				HeaderName::from_static(X_AMZ_SECURITY_TOKEN),
				header_value(X_AMZ_SECURITY_TOKEN, token.expose().to_owned())?,
			);
		}

		headers.insert(AUTHORIZATION, header_value("authorization", authorization)?);

		Ok(headers)
	}
}
impl RequestSigner for SigV4Signer {
	fn sign(
		&self,
		request: &SigningRequest<'_>,
		credentials: &CredentialSet,
	) -> Result<HeaderMap, SigningError> {
		self.sign_at(request, credentials, OffsetDateTime::now_utc())
	}
}

fn host_header(url: &Url) -> Result<String, SigningError> {
	let host = url.host_str().ok_or_else(|| SigningError::MissingHost { url: url.to_string() })?;

	Ok(match url.port() {
		Some(port) => format!("{host}:{port}"),
		None => host.to_owned(),
	})
}

fn canonical_headers(headers: &HeaderMap) -> Result<BTreeMap<String, String>, SigningError> {
	let mut canonical = BTreeMap::<String, String>::new();

	for (name, value) in headers {
		let name = name.as_str();

		if name == "host" || UNSIGNED_HEADERS.contains(&name) {
			continue;
		}

		let value = value
			.to_str()
			.map_err(|_| SigningError::UnsignableHeader { name: name.to_owned() })?;
		let value = value.split_whitespace().collect::<Vec<_>>().join(" ");

		canonical
			.entry(name.to_owned())
			.and_modify(|existing| {
				existing.push(',');
				existing.push_str(&value);
			})
			.or_insert(value);
	}

	Ok(canonical)
}

fn canonical_uri(url: &Url) -> String {
	let path = url.path();

	if path.is_empty() || path == "/" {
		return "/".into();
	}

	path.split('/').map(uri_encode).collect::<Vec<_>>().join("/")
}

fn canonical_query(url: &Url) -> String {
	let mut pairs = url
		.query_pairs()
		.map(|(name, value)| (uri_encode(&name), uri_encode(&value)))
		.collect::<Vec<_>>();

	pairs.sort();

	pairs.into_iter().map(|(name, value)| format!("{name}={value}")).collect::<Vec<_>>().join("&")
}

fn uri_encode(value: &str) -> String {
	percent_encoding::utf8_percent_encode(value, URI_ENCODE).to_string()
}

fn hex_sha256(data: &[u8]) -> String {
	hex::encode(Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, SigningError> {
	let mut mac = HmacSha256::new_from_slice(key).map_err(|_| SigningError::InvalidKey)?;

	mac.update(data);

	Ok(mac.finalize().into_bytes().to_vec())
}

fn signing_key(
	secret: &str,
	date: &str,
	region: &str,
	service: &str,
) -> Result<Vec<u8>, SigningError> {
	let date_key = hmac_sha256(format!("AWS4{secret}").as_bytes(), date.as_bytes())?;
	let region_key = hmac_sha256(&date_key, region.as_bytes())?;
	let service_key = hmac_sha256(&region_key, service.as_bytes())?;

	hmac_sha256(&service_key, b"aws4_request")
}

fn header_value(name: &str, value: String) -> Result<HeaderValue, SigningError> {
	HeaderValue::try_from(value)
		.map_err(|_| SigningError::InvalidSignedHeader { name: name.to_owned() })
}
