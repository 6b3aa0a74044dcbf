// crates.io
use httpmock::prelude::*;
// self
use ess_broker::{
	_preludet::*,
	api::SecurityApi,
	identity::{IdentityClient, IdentityExchange, IdentityProvider},
};

const TENANT_ID: &str = "91";
const API_KEY: &str = "gateway-key";
const AUTHORIZATION: &str = "Bearer upstream-credential";

fn build_provider(server: &MockServer) -> IdentityProvider {
	IdentityProvider::builder()
		.introspection_endpoint(
			Url::parse(&server.url("/verify"))
				.expect("Mock introspection endpoint should parse successfully."),
		)
		.userinfo_endpoint(
			Url::parse(&server.url("/userinfo"))
				.expect("Mock userinfo endpoint should parse successfully."),
		)
		.tenant_id(TENANT_ID)
		.api_key(API_KEY)
		.build()
		.expect("Provider descriptor should build successfully.")
}

fn build_api(server: &MockServer) -> (SecurityApi, TestSessions) {
	let sessions = build_test_sessions();
	let client = IdentityClient::new(test_http_client(), build_provider(server));
	let exchange = IdentityExchange::new(client, sessions.service.clone());
	let api = SecurityApi::new(exchange, sessions.service.clone());

	(api, sessions)
}

#[tokio::test]
async fn exchange_issues_a_verifiable_token() {
	let server = MockServer::start_async().await;
	let (api, sessions) = build_api(&server);
	let introspection = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/verify")
				.query_param("tenant_id", TENANT_ID)
				.query_param("apikey", API_KEY)
				.header("authorization", AUTHORIZATION);
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"sub\":\"user-1\",\"sid\":\"sid-1\",\"active\":true}");
		})
		.await;
	let userinfo = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/userinfo")
				.query_param("apikey", API_KEY)
				.header("authorization", AUTHORIZATION)
				.header("tenant-id", TENANT_ID);
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"poi_num\":\"100\",\"name\":\"A. Example\"}");
		})
		.await;
	let response = api.token(Some(AUTHORIZATION)).await;

	assert_eq!(response.status, 200);

	let token = response.body["jwt2_token"]
		.as_str()
		.expect("Token endpoint should answer with a jwt2_token string.")
		.to_owned();
	let claims = sessions
		.service
		.verify(&token)
		.await
		.expect("A freshly issued token should verify successfully.");

	assert_eq!(claims.user_id, "user-1");
	assert_eq!(claims.session_id, "sid-1");
	assert_eq!(claims.national_id, "100");

	introspection.assert_async().await;
	userinfo.assert_async().await;
}

#[tokio::test]
async fn missing_authorization_is_rejected_without_calling_the_provider() {
	let server = MockServer::start_async().await;
	let (api, _sessions) = build_api(&server);
	let response = api.token(None).await;

	assert_eq!(response.status, 401);
	assert_eq!(response.body["error"], "Missing Authorization header");
}

#[tokio::test]
async fn provider_401_maps_to_an_invalid_access_token() {
	let server = MockServer::start_async().await;
	let (api, _sessions) = build_api(&server);
	let introspection = server
		.mock_async(|when, then| {
			when.method(POST).path("/verify");
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_token\"}");
		})
		.await;
	let response = api.token(Some(AUTHORIZATION)).await;

	assert_eq!(response.status, 401);
	assert_eq!(response.body["error"], "Invalid access token");

	introspection.assert_async().await;
}

#[tokio::test]
async fn provider_outage_propagates_the_upstream_status() {
	let server = MockServer::start_async().await;
	let (api, _sessions) = build_api(&server);

	server
		.mock_async(|when, then| {
			when.method(POST).path("/verify");
			then.status(503).body("upstream unavailable");
		})
		.await;

	let response = api.token(Some(AUTHORIZATION)).await;

	assert_eq!(response.status, 503);
	assert_eq!(response.body["error"], "Auth error");
}

#[tokio::test]
async fn absent_national_id_names_only_that_field() {
	let server = MockServer::start_async().await;
	let (api, sessions) = build_api(&server);

	server
		.mock_async(|when, then| {
			when.method(POST).path("/verify");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"sub\":\"user-1\",\"sid\":\"sid-1\"}");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/userinfo");
			then.status(200).header("content-type", "application/json").body("{}");
		})
		.await;

	let response = api.token(Some(AUTHORIZATION)).await;

	assert_eq!(response.status, 400);
	assert_eq!(response.body["error"], "Missing fields: national_id");
	assert!(
		sessions.store.records().is_empty(),
		"No session record should be created for an incomplete identity.",
	);
}

#[tokio::test]
async fn empty_claims_are_reported_in_a_fixed_order() {
	let server = MockServer::start_async().await;
	let (api, _sessions) = build_api(&server);

	server
		.mock_async(|when, then| {
			when.method(POST).path("/verify");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"sub\":\"\",\"sid\":\"\"}");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/userinfo");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"poi_num\":\"\"}");
		})
		.await;

	let response = api.token(Some(AUTHORIZATION)).await;

	assert_eq!(response.status, 400);
	assert_eq!(response.body["error"], "Missing fields: session_id, user_id, national_id");
}

#[tokio::test]
async fn known_employee_is_bound_to_the_issued_session() {
	let server = MockServer::start_async().await;
	let (api, sessions) = build_api(&server);

	sessions.directory.insert(
		NationalId::new("100").expect("National identifier should be valid."),
		EmployeeId(42),
	);
	server
		.mock_async(|when, then| {
			when.method(POST).path("/verify");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"sub\":\"user-1\",\"sid\":\"sid-1\"}");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/userinfo");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"poi_num\":\"100\"}");
		})
		.await;

	let response = api.token(Some(AUTHORIZATION)).await;

	assert_eq!(response.status, 200);

	let records = sessions.store.records();

	assert_eq!(records.len(), 1);
	assert_eq!(records[0].employee, Some(EmployeeId(42)));
}
