//! Rotating symmetric signing-key management.
//!
//! Keys are persisted in the host's configuration parameter store as an ordered
//! JSON list (newest first) plus a rotation timestamp, matching the two-parameter
//! layout the surrounding platform already uses. Rotation is lazy: the first read
//! after the interval elapses generates a fresh key, prepends it, and truncates
//! the list to the retention window so tokens signed just before a rotation keep
//! verifying.

// self
use crate::{_prelude::*, ids, session::TokenSecret, store::ConfigStore};

/// Parameter key holding the JSON-encoded key list, newest first.
pub const PARAM_SIGNING_KEYS: &str = "ess.signing_keys";
/// Parameter key holding the last rotation instant as a unix-timestamp string.
pub const PARAM_SIGNING_KEY_TIME: &str = "ess.signing_key_time";

const ROTATION_INTERVAL: Duration = Duration::hours(24);
const MAX_RETAINED_KEYS: usize = 3;
const KEY_ENTROPY_BYTES: usize = 64;

/// Ordered signing-key snapshot loaded from the parameter store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SigningKeySet {
	/// Retained secrets, newest first.
	pub keys: Vec<String>,
	/// Instant of the last rotation, when one was recorded and parsable.
	pub rotated_at: Option<OffsetDateTime>,
}
impl SigningKeySet {
	/// Whether the set must rotate at `now`: no keys yet, no usable timestamp, or
	/// the rotation interval has elapsed.
	pub fn is_stale_at(&self, now: OffsetDateTime) -> bool {
		if self.keys.is_empty() {
			return true;
		}

		match self.rotated_at {
			Some(instant) => now - instant > ROTATION_INTERVAL,
			None => true,
		}
	}

	fn parse(keys_json: Option<String>, rotated_at_raw: Option<String>) -> Self {
		// Corrupt state is treated as empty so the next access regenerates it.
		let keys = keys_json
			.as_deref()
			.and_then(|raw| serde_json::from_str::<Vec<String>>(raw).ok())
			.unwrap_or_default();
		let rotated_at = rotated_at_raw
			.as_deref()
			.and_then(|raw| raw.trim().parse::<i64>().ok())
			.and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok());

		Self { keys, rotated_at }
	}
}

/// Injected key-management service exposing explicit get/rotate operations.
pub struct KeyRing {
	config: Arc<dyn ConfigStore>,
	// Serializes the read-rotate-write section within this process; cross-process
	// races at the rotation boundary remain the store's concern.
	rotation_guard: AsyncMutex<()>,
}
impl KeyRing {
	/// Creates a keyring over the provided parameter store.
	pub fn new(config: Arc<dyn ConfigStore>) -> Self {
		Self { config, rotation_guard: AsyncMutex::new(()) }
	}

	/// Returns the newest key, rotating first if the retained set is stale.
	pub async fn active_key(&self) -> Result<TokenSecret> {
		self.active_key_at(OffsetDateTime::now_utc()).await
	}

	/// [`active_key`](Self::active_key) evaluated against an explicit instant.
	pub async fn active_key_at(&self, now: OffsetDateTime) -> Result<TokenSecret> {
		let keys = self.keys_at(now).await?;

		// `keys_at` never returns an empty list; rotation seeds the first key.
		Ok(TokenSecret::new(keys.into_iter().next().unwrap_or_default()))
	}

	/// Returns every retained key newest-first, rotating first if stale.
	pub async fn verification_keys(&self) -> Result<Vec<TokenSecret>> {
		self.verification_keys_at(OffsetDateTime::now_utc()).await
	}

	/// [`verification_keys`](Self::verification_keys) evaluated against an explicit instant.
	pub async fn verification_keys_at(&self, now: OffsetDateTime) -> Result<Vec<TokenSecret>> {
		Ok(self.keys_at(now).await?.into_iter().map(TokenSecret::new).collect())
	}

	async fn keys_at(&self, now: OffsetDateTime) -> Result<Vec<String>> {
		let _rotation = self.rotation_guard.lock().await;
		let mut set = self.load().await?;

		if set.is_stale_at(now) {
			set.keys.insert(0, ids::random_urlsafe(KEY_ENTROPY_BYTES));
			set.keys.truncate(MAX_RETAINED_KEYS);
			self.persist(&set.keys, now).await?;
		}

		Ok(set.keys)
	}

	async fn load(&self) -> Result<SigningKeySet> {
		let keys_json = self.config.get_param(PARAM_SIGNING_KEYS).await?;
		let rotated_at_raw = self.config.get_param(PARAM_SIGNING_KEY_TIME).await?;

		Ok(SigningKeySet::parse(keys_json, rotated_at_raw))
	}

	async fn persist(&self, keys: &[String], now: OffsetDateTime) -> Result<()> {
		let serialized = serde_json::to_string(keys).map_err(|e| {
			crate::store::StoreError::Serialization {
				message: format!("Failed to serialize signing keys: {e}"),
			}
		})?;

		self.config.set_param(PARAM_SIGNING_KEYS, serialized).await?;
		self.config
			.set_param(PARAM_SIGNING_KEY_TIME, now.unix_timestamp().to_string())
			.await?;

		Ok(())
	}
}
impl Debug for KeyRing {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("KeyRing").field("keys", &"<redacted>").finish()
	}
}
