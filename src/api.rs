//! Transport-agnostic endpoint surface.
//!
//! Hosts embed [`SecurityApi`] behind their own HTTP framework; every method
//! returns an [`ApiResponse`] holding the status code and the JSON body to
//! write, so no error from the layers below ever escapes as a panic or an
//! unmapped failure.

// self
use crate::{
	_prelude::*,
	error::ValidationError,
	identity::IdentityExchange,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	session::SessionService,
};

/// A ready-to-serialize endpoint answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiResponse {
	/// HTTP status code the host should answer with.
	pub status: u16,
	/// JSON body the host should write.
	pub body: serde_json::Value,
}
impl ApiResponse {
	fn ok(body: serde_json::Value) -> Self {
		Self { status: 200, body }
	}

	fn error(status: u16, message: String) -> Self {
		Self { status, body: serde_json::json!({ "error": message }) }
	}
}
impl From<Error> for ApiResponse {
	fn from(e: Error) -> Self {
		// Callers must not learn whether a token is unknown or merely revoked.
		let message = match &e {
			Error::NotFound => "Invalid token".into(),
			_ => e.to_string(),
		};

		Self::error(e.http_status(), message)
	}
}

/// The three employee-self-service endpoints.
#[derive(Debug)]
pub struct SecurityApi {
	exchange: IdentityExchange,
	sessions: Arc<SessionService>,
}
impl SecurityApi {
	/// Creates the endpoint surface over an exchange flow and session service.
	pub fn new(exchange: IdentityExchange, sessions: Arc<SessionService>) -> Self {
		Self { exchange, sessions }
	}

	/// `GET /api/erp/jwt2_token` - exchanges the inbound credential for a session token.
	pub async fn token(&self, authorization: Option<&str>) -> ApiResponse {
		match self.exchange.exchange(authorization).await {
			Ok(record) => {
				let token =
					record.token.as_ref().map(|secret| secret.expose().to_owned());

				ApiResponse::ok(serde_json::json!({ "jwt2_token": token }))
			},
			Err(e) => e.into(),
		}
	}

	/// `POST /api/erp/token/verify` - validates a session token.
	pub async fn verify(&self, body: &serde_json::Value) -> ApiResponse {
		const KIND: FlowKind = FlowKind::Verify;

		let span = FlowSpan::new(KIND, "verify");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async {
				let token = extract_token(body)?;

				self.sessions.verify(token).await
			})
			.await;

		match result {
			Ok(_) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Success);

				ApiResponse::ok(serde_json::json!({ "valid": true }))
			},
			Err(e) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);

				e.into()
			},
		}
	}

	/// `POST /api/erp/logout` - revokes the session bound to the token.
	pub async fn logout(&self, body: &serde_json::Value) -> ApiResponse {
		const KIND: FlowKind = FlowKind::Logout;

		let span = FlowSpan::new(KIND, "logout");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async {
				let token = extract_token(body)?;

				self.sessions.revoke(token).await
			})
			.await;

		match result {
			Ok(()) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Success);

				ApiResponse::ok(serde_json::json!({ "success": true }))
			},
			Err(e) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);

				e.into()
			},
		}
	}
}

fn extract_token(body: &serde_json::Value) -> Result<&str> {
	body.get("token")
		.and_then(serde_json::Value::as_str)
		.filter(|token| !token.is_empty())
		.ok_or_else(|| ValidationError::MissingToken.into())
}
