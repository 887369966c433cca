//! Immutable temporary credential sets and their builder.

// self
use crate::{
	_prelude::*,
	auth::{AccessKeyId, IdentityId, IdentifierError, Secret},
};

/// Errors produced by [`CredentialSetBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum CredentialSetBuilderError {
	/// Issued when no access key id was provided.
	#[error("Access key id is required.")]
	MissingAccessKeyId,
	/// Issued when no secret access key was provided.
	#[error("Secret access key is required.")]
	MissingSecretAccessKey,
	/// Issued when no expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expire_time or expires_in.")]
	MissingExpiry,
	/// Issued when the access key id fails validation.
	#[error(transparent)]
	InvalidAccessKeyId(#[from] IdentifierError),
}

/// Temporary credential set obtained from an identity exchange.
///
/// Values are never mutated in place; the credential store swaps whole sets.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialSet {
	/// Identity the credentials were issued for.
	pub identity_id: IdentityId,
	/// Access key id used in the SigV4 credential scope.
	pub access_key_id: AccessKeyId,
	/// Secret access key used to derive signing keys.
	pub secret_access_key: Secret,
	/// Session token sent as `x-amz-security-token`, when issued.
	pub session_token: Option<Secret>,
	/// Instant after which the credentials must not be used.
	pub expire_time: OffsetDateTime,
	/// Raw exchange payload, kept for persistence and diagnostics.
	pub raw: Option<serde_json::Value>,
}
impl CredentialSet {
	/// Returns a builder for the provided identity.
	pub fn builder(identity_id: IdentityId) -> CredentialSetBuilder {
		CredentialSetBuilder::new(identity_id)
	}

	/// Returns `true` when `expire_time < instant + offset`.
	///
	/// A deadline past the representable range counts as expired.
	pub fn is_expired_at(&self, instant: OffsetDateTime, offset: Duration) -> bool {
		instant.checked_add(offset).is_none_or(|deadline| self.expire_time < deadline)
	}

	/// Checks expiry against the current UTC clock.
	pub fn is_expired(&self, offset: Duration) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc(), offset)
	}

	/// Remaining lifetime relative to `instant` (negative once expired).
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		self.expire_time - instant
	}
}
impl Debug for CredentialSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialSet")
			.field("identity_id", &self.identity_id)
			.field("access_key_id", &self.access_key_id)
			.field("secret_access_key", &"<redacted>")
			.field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
			.field("expire_time", &self.expire_time)
			.field("raw_present", &self.raw.is_some())
			.finish()
	}
}

/// Builder for [`CredentialSet`].
#[derive(Clone, Debug)]
pub struct CredentialSetBuilder {
	identity_id: IdentityId,
	access_key_id: Option<String>,
	secret_access_key: Option<Secret>,
	session_token: Option<Secret>,
	issued_at: Option<OffsetDateTime>,
	expire_time: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
	raw: Option<serde_json::Value>,
}
impl CredentialSetBuilder {
	fn new(identity_id: IdentityId) -> Self {
		Self {
			identity_id,
			access_key_id: None,
			secret_access_key: None,
			session_token: None,
			issued_at: None,
			expire_time: None,
			expires_in: None,
			raw: None,
		}
	}

	/// Provides the access key id.
	pub fn access_key_id(mut self, value: impl Into<String>) -> Self {
		self.access_key_id = Some(value.into());

		self
	}

	/// Provides the secret access key.
	pub fn secret_access_key(mut self, value: impl Into<String>) -> Self {
		self.secret_access_key = Some(Secret::new(value));

		self
	}

	/// Provides the session token.
	pub fn session_token(mut self, value: impl Into<String>) -> Self {
		self.session_token = Some(Secret::new(value));

		self
	}

	/// Sets the instant relative expiries are computed from (defaults to now).
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expire_time(mut self, instant: OffsetDateTime) -> Self {
		self.expire_time = Some(instant);

		self
	}

	/// Sets a relative expiry duration.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Attaches the raw exchange payload.
	pub fn raw(mut self, raw: serde_json::Value) -> Self {
		self.raw = Some(raw);

		self
	}

	/// Consumes the builder and produces a [`CredentialSet`].
	pub fn build(self) -> Result<CredentialSet, CredentialSetBuilderError> {
		let access_key_id = AccessKeyId::new(
			self.access_key_id.ok_or(CredentialSetBuilderError::MissingAccessKeyId)?,
		)?;
		let secret_access_key =
			self.secret_access_key.ok_or(CredentialSetBuilderError::MissingSecretAccessKey)?;
		let expire_time = match (self.expire_time, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) => self.issued_at.unwrap_or_else(OffsetDateTime::now_utc) + delta,
			(None, None) => return Err(CredentialSetBuilderError::MissingExpiry),
		};

		Ok(CredentialSet {
			identity_id: self.identity_id,
			access_key_id,
			secret_access_key,
			session_token: self.session_token,
			expire_time,
			raw: self.raw,
		})
	}
}
