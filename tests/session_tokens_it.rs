// self
use ess_broker::{
	_preludet::*,
	api::SecurityApi,
	identity::{IdentityClient, IdentityExchange, IdentityProvider},
	keyring::PARAM_SIGNING_KEY_TIME,
	session::IssueRequest,
	store::ConfigStore,
};

fn issue_request(suffix: &str) -> IssueRequest {
	IssueRequest::new(
		ExternalUserId::new(format!("user-{suffix}"))
			.expect("User identifier should be valid for session tests."),
		ExternalSessionId::new(format!("sid-{suffix}"))
			.expect("Session identifier should be valid for session tests."),
		NationalId::new(format!("100{suffix}"))
			.expect("National identifier should be valid for session tests."),
	)
}

fn build_api(sessions: &TestSessions) -> SecurityApi {
	// The provider endpoints are never called by verify/logout.
	let provider = IdentityProvider::builder()
		.introspection_endpoint(
			Url::parse("https://idp.invalid/verify").expect("Fixture URL should parse."),
		)
		.userinfo_endpoint(
			Url::parse("https://idp.invalid/userinfo").expect("Fixture URL should parse."),
		)
		.tenant_id("91")
		.api_key("unused")
		.build()
		.expect("Provider descriptor should build successfully.");
	let client = IdentityClient::new(test_http_client(), provider);
	let exchange = IdentityExchange::new(client, sessions.service.clone());

	SecurityApi::new(exchange, sessions.service.clone())
}

#[tokio::test]
async fn verify_acknowledges_a_live_token() {
	let sessions = build_test_sessions();
	let api = build_api(&sessions);
	let record = sessions
		.service
		.issue(issue_request("1"))
		.await
		.expect("Issuing a session should succeed.");
	let token = record.token.as_ref().expect("An issued record carries a token.").expose();
	let response = api.verify(&serde_json::json!({ "token": token })).await;

	assert_eq!(response.status, 200);
	assert_eq!(response.body, serde_json::json!({ "valid": true }));
}

#[tokio::test]
async fn verify_rejects_garbage_and_absent_tokens() {
	let sessions = build_test_sessions();
	let api = build_api(&sessions);
	let missing = api.verify(&serde_json::json!({})).await;

	assert_eq!(missing.status, 400);
	assert_eq!(missing.body["error"], "Missing token");

	let garbage = api.verify(&serde_json::json!({ "token": "not-a-jwt" })).await;

	assert_eq!(garbage.status, 401);
	assert_eq!(garbage.body["error"], "Invalid token");
}

#[tokio::test]
async fn logout_invalidates_the_token_for_subsequent_verification() {
	let sessions = build_test_sessions();
	let api = build_api(&sessions);
	let record = sessions
		.service
		.issue(issue_request("2"))
		.await
		.expect("Issuing a session should succeed.");
	let token = record
		.token
		.as_ref()
		.expect("An issued record carries a token.")
		.expose()
		.to_owned();
	let logout = api.logout(&serde_json::json!({ "token": token })).await;

	assert_eq!(logout.status, 200);
	assert_eq!(logout.body["success"], true);

	let verify = api.verify(&serde_json::json!({ "token": token })).await;

	assert_eq!(verify.status, 401, "A revoked token must no longer verify.");

	let logout_again = api.logout(&serde_json::json!({ "token": token })).await;

	assert_eq!(logout_again.status, 401);
	assert_eq!(logout_again.body["error"], "Invalid token");
}

#[tokio::test]
async fn expired_tokens_are_reported_as_expired_not_invalid() {
	let sessions = build_test_sessions();
	let api = build_api(&sessions);
	let record = sessions
		.service
		.issue(issue_request("3").with_ttl_minutes(-5))
		.await
		.expect("Issuing an already-expired session should still succeed.");
	let token = record.token.as_ref().expect("An issued record carries a token.").expose();
	let response = api.verify(&serde_json::json!({ "token": token })).await;

	assert_eq!(response.status, 401);
	assert_eq!(response.body["error"], "Token has expired");
}

#[tokio::test]
async fn tokens_survive_a_signing_key_rotation() {
	let sessions = build_test_sessions();
	let record = sessions
		.service
		.issue(issue_request("4"))
		.await
		.expect("Issuing a session should succeed.");
	let token = record
		.token
		.as_ref()
		.expect("An issued record carries a token.")
		.expose()
		.to_owned();
	// Backdate the rotation instant so the next access rotates in a new key.
	let stale = (OffsetDateTime::now_utc() - Duration::hours(25)).unix_timestamp();

	sessions
		.config
		.set_param(PARAM_SIGNING_KEY_TIME, stale.to_string())
		.await
		.expect("Parameter set should succeed.");

	let rotated = sessions
		.service
		.issue(issue_request("5"))
		.await
		.expect("Issuing after rotation should succeed.");

	assert_ne!(
		rotated.token.as_ref().expect("An issued record carries a token.").expose(),
		token,
	);

	let claims = sessions
		.service
		.verify(&token)
		.await
		.expect("A token signed with a retained key should keep verifying.");

	assert_eq!(claims.session_id, "sid-4");
}

#[tokio::test]
async fn reissuing_for_the_same_person_deactivates_the_previous_session() {
	let sessions = build_test_sessions();
	let first = sessions
		.service
		.issue(issue_request("6"))
		.await
		.expect("Issuing a session should succeed.");
	let second = sessions
		.service
		.issue(issue_request("6"))
		.await
		.expect("Reissuing a session should succeed.");
	let records = sessions.store.records();
	let active: Vec<_> = records.iter().filter(|record| record.active).collect();

	assert_eq!(records.len(), 2);
	assert_eq!(active.len(), 1);
	assert_eq!(active[0].id, second.id);
	assert_ne!(first.id, second.id);

	let first_token = first.token.as_ref().expect("An issued record carries a token.").expose();
	let err = sessions
		.service
		.verify(first_token)
		.await
		.expect_err("A deactivated session's token must not verify.");

	assert_eq!(err.to_string(), "Invalid token");
}
