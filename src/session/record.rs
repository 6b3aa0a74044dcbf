//! Persisted session token records and their lifecycle helpers.

// self
use crate::{
	_prelude::*,
	ids::{EmployeeId, ExternalSessionId, ExternalUserId, NationalId, SessionRecordId},
	session::secret::TokenSecret,
};

/// Default token lifetime in minutes, matching the entity's `expiry_time_interval` default.
pub const DEFAULT_TTL_MINUTES: i64 = 5;

/// Session token record binding an external identity to a local employee.
///
/// Records are soft-archived: logout and the expiry sweep flip `active` off and
/// (for logout) clear the token string, but nothing is ever deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
	/// Storage key for this record.
	pub id: SessionRecordId,
	/// External session identifier (`sid`) from the identity provider.
	pub session_id: ExternalSessionId,
	/// External user identifier (`sub`) from the identity provider.
	pub user_id: ExternalUserId,
	/// National/employee identifier the session is keyed on.
	pub national_id: NationalId,
	/// Owning employee reference; unset when the directory had no match at issuance.
	pub employee: Option<EmployeeId>,
	/// Signed token string; set exactly once at creation and cleared on logout.
	pub token: Option<TokenSecret>,
	/// Soft-archive flag; at most one active record per national id.
	pub active: bool,
	/// Creation instant.
	pub created_at: OffsetDateTime,
	/// Instant of the most recent successful verification.
	pub last_used: OffsetDateTime,
	/// Token lifetime in minutes; `expires_at` derives from it.
	pub expiry_minutes: i64,
}
impl SessionRecord {
	/// Creates a fresh active record stamped with the current clock; the token is
	/// attached by the session service after signing.
	pub fn create(
		user_id: ExternalUserId,
		session_id: ExternalSessionId,
		national_id: NationalId,
		employee: Option<EmployeeId>,
		expiry_minutes: i64,
	) -> Self {
		let now = OffsetDateTime::now_utc();

		Self {
			id: SessionRecordId::random(),
			session_id,
			user_id,
			national_id,
			employee,
			token: None,
			active: true,
			created_at: now,
			last_used: now,
			expiry_minutes,
		}
	}

	/// Derived expiry instant: `created_at` plus the configured lifetime.
	pub fn expires_at(&self) -> OffsetDateTime {
		self.created_at + Duration::minutes(self.expiry_minutes)
	}

	/// Returns `true` if the record has expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at()
	}

	/// Returns `true` if the record is expired relative to the current clock.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}

	/// Deactivates the record without touching the token string (new-session displacement).
	pub fn deactivate(&mut self) {
		self.active = false;
	}

	/// Logout transition: deactivates and clears the token string.
	pub fn revoke(&mut self) {
		self.active = false;
		self.token = None;
	}

	/// Stamps a successful verification.
	pub fn touch(&mut self, instant: OffsetDateTime) {
		self.last_used = instant;
	}
}
