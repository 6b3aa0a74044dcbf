//! Session token issuance, verification, revocation, and expiry sweeping.

pub mod claims;
pub mod record;
pub mod secret;

pub use claims::*;
pub use record::*;
pub use secret::*;

// self
use crate::{
	_prelude::*,
	directory::EmployeeDirectory,
	ids::{ExternalSessionId, ExternalUserId, NationalId},
	keyring::KeyRing,
	store::SessionStore,
};

/// Parameters for minting a new session token.
#[derive(Clone, Debug)]
pub struct IssueRequest {
	/// External user identifier (`sub`).
	pub user_id: ExternalUserId,
	/// External session identifier (`sid`).
	pub session_id: ExternalSessionId,
	/// National/employee identifier the session is keyed on.
	pub national_id: NationalId,
	/// Token lifetime in minutes.
	pub ttl_minutes: i64,
}
impl IssueRequest {
	/// Creates a request with the default 5-minute lifetime.
	pub fn new(
		user_id: ExternalUserId,
		session_id: ExternalSessionId,
		national_id: NationalId,
	) -> Self {
		Self { user_id, session_id, national_id, ttl_minutes: DEFAULT_TTL_MINUTES }
	}

	/// Overrides the token lifetime.
	pub fn with_ttl_minutes(mut self, ttl_minutes: i64) -> Self {
		self.ttl_minutes = ttl_minutes;

		self
	}
}

/// Issues, verifies, and revokes signed session tokens.
///
/// The service owns the keyring, the session repository, and the employee
/// directory so callers only deal in tokens and claims. Issuance for a given
/// national id runs under a singleflight guard: the deactivate-then-create pair
/// that maintains the single-active-session invariant must not interleave for
/// the same identity.
pub struct SessionService {
	store: Arc<dyn SessionStore>,
	keyring: Arc<KeyRing>,
	directory: Arc<dyn EmployeeDirectory>,
	issue_guards: Mutex<HashMap<NationalId, Arc<AsyncMutex<()>>>>,
}
impl SessionService {
	/// Creates a service over the provided collaborators.
	pub fn new(
		store: Arc<dyn SessionStore>,
		keyring: Arc<KeyRing>,
		directory: Arc<dyn EmployeeDirectory>,
	) -> Self {
		Self { store, keyring, directory, issue_guards: Mutex::new(HashMap::new()) }
	}

	/// Mints a signed session token, displacing any prior active session for the
	/// same national id.
	///
	/// A national id unknown to the directory still gets a token — the employee
	/// reference is simply left unset. Blocking unknown users here would lock out
	/// staff whose directory rows lag behind the identity provider.
	pub async fn issue(&self, request: IssueRequest) -> Result<SessionRecord> {
		let guard = self.issue_guard(&request.national_id);
		let _singleflight = guard.lock().await;
		let employee = self.directory.find_by_national_id(&request.national_id).await?;

		if let Some(mut existing) =
			self.store.find_active_by_national_id(&request.national_id).await?
		{
			existing.deactivate();
			self.store.save(existing).await?;
		}

		let mut record = SessionRecord::create(
			request.user_id,
			request.session_id,
			request.national_id,
			employee,
			request.ttl_minutes,
		);
		let key = self.keyring.active_key().await?;
		let token = SessionClaims::for_record(&record).encode(&key)?;

		record.token = Some(TokenSecret::new(token));
		self.store.save(record.clone()).await?;

		Ok(record)
	}

	/// Verifies a token against the retained keys and the live record state.
	///
	/// Cryptographic validity alone is not enough: a revoked or displaced record
	/// invalidates its token immediately, which is what makes logout effective
	/// before the expiry lapses.
	pub async fn verify(&self, token: &str) -> Result<SessionClaims> {
		let keys = self.keyring.verification_keys().await?;
		let claims = SessionClaims::decode_with_keys(token, &keys)?;

		match self.store.find_by_token(token).await? {
			Some(mut record) if record.active => {
				record.touch(OffsetDateTime::now_utc());
				self.store.save(record).await?;

				Ok(claims)
			},
			_ => Err(crate::error::AuthError::InvalidToken.into()),
		}
	}

	/// Revokes the session holding this token: deactivates the record and clears
	/// the token string. Absent or already-inactive records fail with
	/// [`Error::NotFound`](crate::error::Error::NotFound).
	pub async fn revoke(&self, token: &str) -> Result<()> {
		match self.store.find_by_token(token).await? {
			Some(mut record) if record.active => {
				record.revoke();
				self.store.save(record).await?;

				Ok(())
			},
			_ => Err(Error::NotFound),
		}
	}

	/// Deactivates every active record past its expiry; returns the swept count.
	/// Intended to run from the host's scheduler.
	pub async fn sweep_expired(&self) -> Result<usize> {
		Ok(self.store.deactivate_expired(OffsetDateTime::now_utc()).await?)
	}

	fn issue_guard(&self, national_id: &NationalId) -> Arc<AsyncMutex<()>> {
		let mut guards = self.issue_guards.lock();

		guards.entry(national_id.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}
}
impl Debug for SessionService {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionService").finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::*;

	fn issue_request(national_id: &str) -> IssueRequest {
		IssueRequest::new(
			ExternalUserId::new("user-1").expect("User id fixture should be valid."),
			ExternalSessionId::new("sid-1").expect("Session id fixture should be valid."),
			NationalId::new(national_id).expect("National id fixture should be valid."),
		)
	}

	#[tokio::test]
	async fn issuing_twice_leaves_one_active_record() {
		let stack = build_test_sessions();

		stack
			.service
			.issue(issue_request("100"))
			.await
			.expect("First issuance should succeed.");
		stack
			.service
			.issue(issue_request("100"))
			.await
			.expect("Second issuance should succeed.");

		let records = stack.store.records();
		let active: Vec<_> = records.iter().filter(|record| record.active).collect();

		assert_eq!(records.len(), 2);
		assert_eq!(active.len(), 1, "Exactly one record may stay active per national id.");
	}

	#[tokio::test]
	async fn unknown_employee_still_receives_a_token() {
		let stack = build_test_sessions();
		let record = stack
			.service
			.issue(issue_request("999"))
			.await
			.expect("Issuance must not block on unknown employees.");

		assert!(record.employee.is_none());
		assert!(record.token.is_some());
	}

	#[tokio::test]
	async fn known_employee_is_bound_to_the_record() {
		let stack = build_test_sessions();

		stack.directory.insert(
			NationalId::new("100").expect("National id fixture should be valid."),
			EmployeeId(7),
		);

		let record = stack
			.service
			.issue(issue_request("100"))
			.await
			.expect("Issuance should succeed.");

		assert_eq!(record.employee, Some(EmployeeId(7)));
	}

	#[tokio::test]
	async fn verify_round_trip_and_revocation() {
		let stack = build_test_sessions();
		let record =
			stack.service.issue(issue_request("100")).await.expect("Issuance should succeed.");
		let token = record.token.as_ref().expect("Issued record should carry a token.").expose();
		let claims =
			stack.service.verify(token).await.expect("A fresh token should verify.");

		assert_eq!(claims.national_id, "100");

		stack.service.revoke(token).await.expect("Revocation should succeed.");

		let err = stack
			.service
			.verify(token)
			.await
			.expect_err("A revoked token must no longer verify.");

		assert!(matches!(err, Error::Auth(crate::error::AuthError::InvalidToken)));
	}

	#[tokio::test]
	async fn revoking_twice_reports_not_found() {
		let stack = build_test_sessions();
		let record =
			stack.service.issue(issue_request("100")).await.expect("Issuance should succeed.");
		let token = record
			.token
			.as_ref()
			.expect("Issued record should carry a token.")
			.expose()
			.to_owned();

		stack.service.revoke(&token).await.expect("First revocation should succeed.");

		let err = stack
			.service
			.revoke(&token)
			.await
			.expect_err("Second revocation must fail.");

		assert!(matches!(err, Error::NotFound));
	}

	#[tokio::test]
	async fn expired_token_reports_expiry_not_invalidity() {
		let stack = build_test_sessions();
		let record = stack
			.service
			.issue(issue_request("100").with_ttl_minutes(-5))
			.await
			.expect("Issuance should succeed even with an elapsed lifetime.");
		let token = record.token.as_ref().expect("Issued record should carry a token.").expose();
		let err = stack
			.service
			.verify(token)
			.await
			.expect_err("An expired token must be rejected.");

		assert!(matches!(err, Error::Auth(crate::error::AuthError::ExpiredToken)));
	}

	#[tokio::test]
	async fn sweep_deactivates_overdue_sessions() {
		let stack = build_test_sessions();

		stack
			.service
			.issue(issue_request("100").with_ttl_minutes(-5))
			.await
			.expect("Issuance should succeed.");
		stack
			.service
			.issue(issue_request("200"))
			.await
			.expect("Issuance should succeed.");

		let swept = stack.service.sweep_expired().await.expect("Sweep should succeed.");

		assert_eq!(swept, 1);

		let active =
			stack.store.records().iter().filter(|record| record.active).count();

		assert_eq!(active, 1);
	}
}
