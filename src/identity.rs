//! Identity-provider exchange flow.
//!
//! The flow performs two provider calls — token introspection and user-info —
//! extracts the `sub`/`sid`/`poi_num` claims, and hands them to the session
//! service for signing. Provider failures map straight onto the error taxonomy:
//! a provider 401 becomes [`AuthError::InvalidAccessToken`], any other non-2xx
//! keeps the upstream status, and transport failures surface as 500s. No retry
//! is attempted; the caller sees the first failure.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	error::{AuthError, UpstreamError, ValidationError},
	http::{EssHttpClient, IDENTITY_TIMEOUT},
	ids::{ExternalSessionId, ExternalUserId, NationalId},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	session::{IssueRequest, SessionRecord, SessionService},
};

/// Validated identity-provider endpoint descriptor.
///
/// The two endpoints authenticate differently — introspection takes the tenant
/// as a query parameter, user-info as a header — which is a quirk of the
/// upstream gateway rather than a choice made here.
#[derive(Clone)]
pub struct IdentityProvider {
	/// Token-introspection endpoint (POST).
	pub introspection: Url,
	/// User-info endpoint (GET).
	pub userinfo: Url,
	/// Tenant identifier forwarded with every call.
	pub tenant_id: String,
	/// Gateway API key forwarded with every call.
	pub api_key: String,
}
impl IdentityProvider {
	/// Returns a builder for constructing validated descriptors.
	pub fn builder() -> IdentityProviderBuilder {
		IdentityProviderBuilder::default()
	}
}
impl Debug for IdentityProvider {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("IdentityProvider")
			.field("introspection", &self.introspection.as_str())
			.field("userinfo", &self.userinfo.as_str())
			.field("tenant_id", &self.tenant_id)
			.field("api_key", &"<redacted>")
			.finish()
	}
}

/// Errors produced by [`IdentityProviderBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum IdentityProviderError {
	/// A required endpoint URL was not supplied.
	#[error("Descriptor is missing the {endpoint} endpoint.")]
	MissingEndpoint {
		/// Endpoint label (introspection, userinfo).
		endpoint: &'static str,
	},
	/// The tenant id or API key was empty.
	#[error("Descriptor field `{field}` cannot be empty.")]
	EmptyField {
		/// Field label.
		field: &'static str,
	},
}

/// Builder for [`IdentityProvider`].
#[derive(Clone, Debug, Default)]
pub struct IdentityProviderBuilder {
	introspection: Option<Url>,
	userinfo: Option<Url>,
	tenant_id: Option<String>,
	api_key: Option<String>,
}
impl IdentityProviderBuilder {
	/// Sets the token-introspection endpoint.
	pub fn introspection_endpoint(mut self, url: Url) -> Self {
		self.introspection = Some(url);

		self
	}

	/// Sets the user-info endpoint.
	pub fn userinfo_endpoint(mut self, url: Url) -> Self {
		self.userinfo = Some(url);

		self
	}

	/// Sets the tenant identifier.
	pub fn tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
		self.tenant_id = Some(tenant_id.into());

		self
	}

	/// Sets the gateway API key.
	pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
		self.api_key = Some(api_key.into());

		self
	}

	/// Consumes the builder and produces a validated descriptor.
	pub fn build(self) -> Result<IdentityProvider, IdentityProviderError> {
		let introspection = self
			.introspection
			.ok_or(IdentityProviderError::MissingEndpoint { endpoint: "introspection" })?;
		let userinfo =
			self.userinfo.ok_or(IdentityProviderError::MissingEndpoint { endpoint: "userinfo" })?;
		let tenant_id = self
			.tenant_id
			.filter(|value| !value.is_empty())
			.ok_or(IdentityProviderError::EmptyField { field: "tenant_id" })?;
		let api_key = self
			.api_key
			.filter(|value| !value.is_empty())
			.ok_or(IdentityProviderError::EmptyField { field: "api_key" })?;

		Ok(IdentityProvider { introspection, userinfo, tenant_id, api_key })
	}
}

/// Claims extracted from the introspection response.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct IntrospectionPayload {
	/// External user identifier.
	#[serde(default)]
	pub sub: Option<String>,
	/// External session identifier.
	#[serde(default)]
	pub sid: Option<String>,
}

/// Claims extracted from the user-info response.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct UserInfoPayload {
	/// National/employee identifier.
	#[serde(default)]
	pub poi_num: Option<String>,
}

/// HTTP client for the identity provider's two endpoints.
#[derive(Clone, Debug)]
pub struct IdentityClient {
	http: EssHttpClient,
	provider: IdentityProvider,
}
impl IdentityClient {
	/// Creates a client over the provided transport and descriptor.
	pub fn new(http: EssHttpClient, provider: IdentityProvider) -> Self {
		Self { http, provider }
	}

	/// Introspects the inbound credential, returning the provider's claim payload.
	pub async fn introspect(&self, authorization: &str) -> Result<IntrospectionPayload> {
		let response = self
			.http
			.post(self.provider.introspection.clone())
			.query(&[
				("tenant_id", self.provider.tenant_id.as_str()),
				("apikey", self.provider.api_key.as_str()),
			])
			.header("Authorization", authorization)
			.timeout(IDENTITY_TIMEOUT)
			.send()
			.await
			.map_err(UpstreamError::from)?;

		read_payload(response, "introspection").await
	}

	/// Fetches the user-info payload for the inbound credential.
	pub async fn userinfo(&self, authorization: &str) -> Result<UserInfoPayload> {
		let response = self
			.http
			.get(self.provider.userinfo.clone())
			.query(&[("apikey", self.provider.api_key.as_str())])
			.header("Authorization", authorization)
			.header("tenant-id", self.provider.tenant_id.as_str())
			.timeout(IDENTITY_TIMEOUT)
			.send()
			.await
			.map_err(UpstreamError::from)?;

		read_payload(response, "userinfo").await
	}
}

/// Orchestrates the credential-for-token exchange.
#[derive(Debug)]
pub struct IdentityExchange {
	client: IdentityClient,
	sessions: Arc<SessionService>,
}
impl IdentityExchange {
	/// Creates an exchange flow over the provided client and session service.
	pub fn new(client: IdentityClient, sessions: Arc<SessionService>) -> Self {
		Self { client, sessions }
	}

	/// Exchanges an inbound authorization credential for a signed session record.
	pub async fn exchange(&self, authorization: Option<&str>) -> Result<SessionRecord> {
		const KIND: FlowKind = FlowKind::Exchange;

		let span = FlowSpan::new(KIND, "exchange");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let authorization =
					authorization.ok_or(AuthError::MissingAuthorization)?;
				let introspection = self.client.introspect(authorization).await?;
				let userinfo = self.client.userinfo(authorization).await?;
				let request = build_issue_request(&introspection, &userinfo)?;

				self.sessions.issue(request).await
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}
}

fn build_issue_request(
	introspection: &IntrospectionPayload,
	userinfo: &UserInfoPayload,
) -> Result<IssueRequest> {
	let session_id = present(introspection.sid.as_deref());
	let user_id = present(introspection.sub.as_deref());
	let national_id = present(userinfo.poi_num.as_deref());
	// Reported in a fixed order so callers can rely on the message shape.
	let missing: Vec<_> = [
		("session_id", session_id),
		("user_id", user_id),
		("national_id", national_id),
	]
	.into_iter()
	.filter_map(|(name, value)| value.is_none().then_some(name))
	.collect();

	if !missing.is_empty() {
		return Err(ValidationError::MissingFields { fields: missing }.into());
	}

	let session_id = ExternalSessionId::new(session_id.unwrap_or_default())
		.map_err(|source| ValidationError::InvalidField { field: "session_id", source })?;
	let user_id = ExternalUserId::new(user_id.unwrap_or_default())
		.map_err(|source| ValidationError::InvalidField { field: "user_id", source })?;
	let national_id = NationalId::new(national_id.unwrap_or_default())
		.map_err(|source| ValidationError::InvalidField { field: "national_id", source })?;

	Ok(IssueRequest::new(user_id, session_id, national_id))
}

fn present(value: Option<&str>) -> Option<&str> {
	value.filter(|view| !view.is_empty())
}

async fn read_payload<T>(response: reqwest::Response, endpoint: &'static str) -> Result<T>
where
	T: DeserializeOwned,
{
	let status = response.status();

	if status.as_u16() == 401 {
		return Err(AuthError::InvalidAccessToken.into());
	}
	if !status.is_success() {
		return Err(UpstreamError::Status {
			endpoint,
			status: status.as_u16(),
			message: "Auth error".into(),
		}
		.into());
	}

	let bytes = response.bytes().await.map_err(UpstreamError::from)?;
	let mut deserializer = serde_json::Deserializer::from_slice(&bytes);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| UpstreamError::Payload { source, status: Some(status.as_u16()) }.into())
}
