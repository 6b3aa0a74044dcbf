//! Broker-level error taxonomy shared across the keyring, session, identity, and webhook layers.

// self
use crate::_prelude::*;

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical broker error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Credential or token rejection.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// Missing or malformed request fields.
	#[error(transparent)]
	Validation(#[from] ValidationError),
	/// Failure reported by an external HTTP dependency.
	#[error(transparent)]
	Upstream(#[from] UpstreamError),
	/// Webhook delivery failure; persisted on the notification rather than raised past the engine.
	#[error(transparent)]
	Delivery(#[from] DeliveryError),

	/// Session record absent or already inactive.
	#[error("Session record not found.")]
	NotFound,
}
impl Error {
	/// Maps the error onto the HTTP status code the boundary layer should answer with.
	///
	/// Upstream failures propagate the provider's status when one was observed; everything
	/// unexpected collapses to 500 so no error ever leaves the boundary unhandled.
	pub fn http_status(&self) -> u16 {
		match self {
			Self::Auth(_) | Self::NotFound => 401,
			Self::Validation(_) => 400,
			Self::Upstream(UpstreamError::Status { status, .. }) => *status,
			Self::Upstream(_) | Self::Storage(_) | Self::Delivery(_) => 500,
		}
	}
}

/// Credential and token failures raised while exchanging, verifying, or signing.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// No `Authorization` header accompanied the exchange request.
	#[error("Missing Authorization header")]
	MissingAuthorization,
	/// The identity provider rejected the inbound credential.
	#[error("Invalid access token")]
	InvalidAccessToken,
	/// No retained signing key produced a structurally valid signature.
	#[error("Invalid token")]
	InvalidToken,
	/// The signature verified but the embedded expiry has passed.
	#[error("Token has expired")]
	ExpiredToken,
	/// Token encoding failed while signing new claims.
	#[error("Failed to sign session claims.")]
	Signing {
		/// Underlying JWT library failure.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
}

/// Request validation failures surfaced as 400 responses.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ValidationError {
	/// Identity payloads omitted required claims; names follow the fixed
	/// `[session_id, user_id, national_id]` order.
	#[error("Missing fields: {}", fields.join(", "))]
	MissingFields {
		/// Names of the absent claims.
		fields: Vec<&'static str>,
	},
	/// The request body carried no token to verify or revoke.
	#[error("Missing token")]
	MissingToken,
	/// An identity payload carried a syntactically invalid identifier value.
	#[error("Invalid {field}: {source}")]
	InvalidField {
		/// Name of the offending claim.
		field: &'static str,
		/// Underlying identifier validation failure.
		#[source]
		source: crate::ids::IdentifierError,
	},
}

/// Failures reported by external HTTP dependencies (identity provider, webhook targets).
#[derive(Debug, ThisError)]
pub enum UpstreamError {
	/// The dependency answered with a non-2xx status.
	#[error("{message}")]
	Status {
		/// Endpoint label for diagnostics.
		endpoint: &'static str,
		/// HTTP status returned upstream.
		status: u16,
		/// Short description propagated to the caller.
		message: String,
	},
	/// Transport-level failure (DNS, TCP, TLS, timeout).
	#[error("{source}")]
	Transport {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The dependency answered 2xx but the JSON body could not be decoded.
	#[error("Upstream returned a malformed payload.")]
	Payload {
		/// Structured parsing failure including the JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status of the malformed response, when known.
		status: Option<u16>,
	},
}
impl UpstreamError {
	/// Wraps a transport-specific network error.
	pub fn transport(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Transport { source: Box::new(src) }
	}
}
impl From<ReqwestError> for UpstreamError {
	fn from(e: ReqwestError) -> Self {
		Self::transport(e)
	}
}

/// Webhook send failures recorded on the notification before the status transition.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum DeliveryError {
	/// The target answered outside the accepted 200/201/202 set.
	#[error("HTTP {status}: {body}")]
	Http {
		/// Status returned by the webhook target.
		status: u16,
		/// Response body preview persisted for inspection.
		body: String,
	},
	/// The request never completed (connection, TLS, or timeout failure).
	#[error("{message}")]
	Transport {
		/// Transport failure text persisted for inspection.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::StoreError;

	#[test]
	fn missing_fields_joins_names_in_order() {
		let err = ValidationError::MissingFields { fields: vec!["session_id", "national_id"] };

		assert_eq!(err.to_string(), "Missing fields: session_id, national_id");
	}

	#[test]
	fn http_status_mapping_covers_taxonomy() {
		assert_eq!(Error::from(AuthError::InvalidToken).http_status(), 401);
		assert_eq!(Error::from(AuthError::ExpiredToken).http_status(), 401);
		assert_eq!(Error::NotFound.http_status(), 401);
		assert_eq!(Error::from(ValidationError::MissingToken).http_status(), 400);
		assert_eq!(
			Error::from(UpstreamError::Status {
				endpoint: "introspection",
				status: 503,
				message: "Auth error".into(),
			})
			.http_status(),
			503,
		);
		assert_eq!(
			Error::from(StoreError::Backend { message: "db down".into() }).http_status(),
			500,
		);
	}

	#[test]
	fn store_error_keeps_source_chain() {
		let store_error = StoreError::Backend { message: "database unreachable".into() };
		let broker_error: Error = store_error.into();

		assert!(matches!(broker_error, Error::Storage(_)));
		assert!(broker_error.to_string().contains("database unreachable"));
	}
}
