//! Signed claim payloads and the HS256 encode/decode pair.
//!
//! Decoding walks the retained verification keys newest-first. A signature
//! mismatch moves on to the next key; a structurally valid but expired token
//! fails immediately, because expiry is a property of the claims rather than of
//! whichever key signed them.

// crates.io
use jsonwebtoken::{
	Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind,
};
// self
use crate::{_prelude::*, error::AuthError, session::{SessionRecord, TokenSecret}};

/// Claim set embedded in every issued session token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
	/// External user identifier (`sub` from the provider).
	pub user_id: String,
	/// Local employee record id, when the directory resolved one.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub employee_id: Option<i64>,
	/// National/employee identifier.
	pub national_id: String,
	/// External session identifier (`sid` from the provider).
	pub session_id: String,
	/// Expiry as a unix timestamp.
	pub exp: i64,
}
impl SessionClaims {
	/// Builds the claim set for a freshly created record.
	pub fn for_record(record: &SessionRecord) -> Self {
		Self {
			user_id: record.user_id.to_string(),
			employee_id: record.employee.map(|employee| employee.0),
			national_id: record.national_id.to_string(),
			session_id: record.session_id.to_string(),
			exp: record.expires_at().unix_timestamp(),
		}
	}

	/// Signs the claims with the provided key (HS256).
	pub fn encode(&self, key: &TokenSecret) -> Result<String, AuthError> {
		jsonwebtoken::encode(
			&Header::new(Algorithm::HS256),
			self,
			&EncodingKey::from_secret(key.expose().as_bytes()),
		)
		.map_err(|source| AuthError::Signing { source })
	}

	/// Verifies the token against the retained keys, newest first.
	///
	/// Signature mismatches fall through to the next key; a valid-but-expired
	/// token short-circuits with [`AuthError::ExpiredToken`]; exhausting every
	/// key without a structurally valid signature yields
	/// [`AuthError::InvalidToken`].
	pub fn decode_with_keys(token: &str, keys: &[TokenSecret]) -> Result<Self, AuthError> {
		let validation = strict_validation();

		for key in keys {
			match jsonwebtoken::decode::<Self>(
				token,
				&DecodingKey::from_secret(key.expose().as_bytes()),
				&validation,
			) {
				Ok(data) => return Ok(data.claims),
				Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) =>
					return Err(AuthError::ExpiredToken),
				Err(_) => continue,
			}
		}

		Err(AuthError::InvalidToken)
	}
}

fn strict_validation() -> Validation {
	let mut validation = Validation::new(Algorithm::HS256);

	// Exact expiry, and no audience claim to check.
	validation.leeway = 0;
	validation.validate_aud = false;

	validation
}
