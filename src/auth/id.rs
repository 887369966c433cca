//! Strongly typed identifiers for identities and access keys.
//!
//! Both kinds reject empty values, whitespace, and anything longer than
//! [`IDENTIFIER_MAX_LEN`] bytes. Each kind adds its own shape check on top.

// std
use std::{borrow::Borrow, ops::Deref, str::FromStr};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal, $shape:path) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				validate($kind, view, $shape)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				validate($kind, &value, $shape)?;

				Ok(Self(value))
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
	};
}

/// Longest identifier accepted, in bytes.
pub const IDENTIFIER_MAX_LEN: usize = 128;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier.
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier.
		kind: &'static str,
	},
	/// The identifier exceeded the allowed length.
	#[error("{kind} identifier exceeds {max} bytes.")]
	TooLong {
		/// Kind of identifier.
		kind: &'static str,
		/// Maximum permitted length.
		max: usize,
	},
	/// The identifier does not have the shape its kind requires.
	#[error("{kind} identifier must look like {expected}.")]
	Malformed {
		/// Kind of identifier.
		kind: &'static str,
		/// Human-readable description of the expected shape.
		expected: &'static str,
	},
}

def_id! {
	IdentityId,
	"Identity pool identity (`{region}:{id}`, e.g. `us-east-1:4f1c...`).",
	"Identity",
	identity_shape
}
def_id! {
	AccessKeyId,
	"Access key identifier of a temporary credential set.",
	"AccessKey",
	access_key_shape
}

fn validate(
	kind: &'static str,
	view: &str,
	shape: fn(&str) -> Option<&'static str>,
) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}
	if let Some(expected) = shape(view) {
		return Err(IdentifierError::Malformed { kind, expected });
	}

	Ok(())
}

// Identity ids are `{region}:{id}` with both halves present.
fn identity_shape(view: &str) -> Option<&'static str> {
	match view.split_once(':') {
		Some((region, id)) if !region.is_empty() && !id.is_empty() => None,
		_ => Some("`{region}:{id}`"),
	}
}

fn access_key_shape(view: &str) -> Option<&'static str> {
	(!view.bytes().all(|b| b.is_ascii_alphanumeric())).then_some("ASCII letters and digits")
}

#[cfg(test)]
mod tests {
	// std
	use std::collections::HashMap;
	// self
	use super::*;

	#[test]
	fn identity_ids_need_region_and_id() {
		let identity = IdentityId::new("us-east-1:4f1c-9a").expect("Identity should be valid.");

		assert_eq!(identity.as_ref(), "us-east-1:4f1c-9a");
		assert_eq!(format!("{identity:?}"), "Identity(us-east-1:4f1c-9a)");
		assert!(matches!(
			IdentityId::new("us-east-1"),
			Err(IdentifierError::Malformed { kind: "Identity", .. })
		));
		assert!(IdentityId::new(":4f1c").is_err());
		assert!(IdentityId::new("us-east-1:").is_err());
		assert!(IdentityId::new("us-east-1: 4f1c").is_err(), "Whitespace must be rejected.");
	}

	#[test]
	fn access_keys_are_alphanumeric() {
		assert!(AccessKeyId::new("ASIAEXAMPLE123").is_ok());
		assert_eq!(AccessKeyId::new(""), Err(IdentifierError::Empty { kind: "AccessKey" }));
		assert!(matches!(AccessKeyId::new("ASIA-1"), Err(IdentifierError::Malformed { .. })));
		assert!(matches!(
			AccessKeyId::new("A".repeat(IDENTIFIER_MAX_LEN + 1)),
			Err(IdentifierError::TooLong { max: IDENTIFIER_MAX_LEN, .. })
		));
	}

	#[test]
	fn deserialization_runs_the_same_checks() {
		let key: AccessKeyId = serde_json::from_str("\"ASIAEXAMPLE\"")
			.expect("Access key should deserialize successfully.");

		assert_eq!(key.as_ref(), "ASIAEXAMPLE");
		assert!(serde_json::from_str::<AccessKeyId>("\"with space\"").is_err());
		assert!(serde_json::from_str::<IdentityId>("\"no-separator\"").is_err());
	}

	#[test]
	fn borrow_supports_str_lookup() {
		let map: HashMap<IdentityId, u8> = HashMap::from_iter([(
			IdentityId::new("us-east-1:abc").expect("Identity used for lookup should be valid."),
			7_u8,
		)]);

		assert_eq!(map.get("us-east-1:abc"), Some(&7));
	}
}
