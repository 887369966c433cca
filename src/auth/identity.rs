//! Identity assertions handed to the credential exchange.

// self
use crate::{
	_prelude::*,
	auth::{IdentityId, Secret},
};

/// Login provider key used for developer-authenticated Cognito identities.
pub const COGNITO_LOGIN_PROVIDER: &str = "cognito-identity.amazonaws.com";

/// Identity id plus login token, as produced by a refresh-result handler.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IdentityToken {
	/// Identity the token was minted for.
	pub identity_id: IdentityId,
	/// OpenID token accepted by the identity service.
	pub token: Secret,
}
impl IdentityToken {
	/// Creates a new identity token.
	pub fn new(identity_id: IdentityId, token: impl Into<String>) -> Self {
		Self { identity_id, token: Secret::new(token) }
	}
}

/// Parameters sent to the identity service and persisted next to the exchange result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IdentityParams {
	/// Identity the credentials are requested for.
	pub identity_id: IdentityId,
	/// Login provider name to token map.
	pub logins: BTreeMap<String, Secret>,
}
impl From<&IdentityToken> for IdentityParams {
	fn from(token: &IdentityToken) -> Self {
		Self {
			identity_id: token.identity_id.clone(),
			logins: BTreeMap::from([(COGNITO_LOGIN_PROVIDER.to_owned(), token.token.clone())]),
		}
	}
}
