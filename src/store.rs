//! Storage contracts and built-in implementations for broker records.
//!
//! The host platform owns the real record store; the broker only depends on the
//! trait surface here. `memory` covers tests and demos, `file` persists the
//! configuration parameters (signing-key material) between restarts.

pub mod file;
pub mod memory;

pub use file::FileConfigStore;
pub use memory::{
	MemoryConfigStore, MemoryNotificationStore, MemorySessionStore, MemoryWebhookRoutes,
};

// self
use crate::{
	_prelude::*,
	ids::{NationalId, NotificationId},
	session::SessionRecord,
	webhook::WebhookNotification,
};

/// Boxed future returned by every storage contract.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Persisted key-value configuration parameters (signing keys live here).
pub trait ConfigStore
where
	Self: Send + Sync,
{
	/// Returns the parameter value stored under `key`, if any.
	fn get_param<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>>;

	/// Stores (or replaces) the parameter value under `key`.
	fn set_param<'a>(&'a self, key: &'a str, value: String) -> StoreFuture<'a, ()>;
}

/// Repository of session token records, replacing the host ORM's filter queries
/// with typed lookups.
pub trait SessionStore
where
	Self: Send + Sync,
{
	/// Persists or replaces a record keyed by its record id.
	fn save(&self, record: SessionRecord) -> StoreFuture<'_, ()>;

	/// Fetches the single `active = true` record for the national id, if present.
	fn find_active_by_national_id<'a>(
		&'a self,
		national_id: &'a NationalId,
	) -> StoreFuture<'a, Option<SessionRecord>>;

	/// Fetches the record currently holding the provided token string.
	fn find_by_token<'a>(&'a self, token: &'a str) -> StoreFuture<'a, Option<SessionRecord>>;

	/// Deactivates every active record whose expiry instant has passed; returns the count.
	fn deactivate_expired(&self, now: OffsetDateTime) -> StoreFuture<'_, usize>;
}

/// Repository of webhook notifications advanced by the delivery engine.
pub trait NotificationStore
where
	Self: Send + Sync,
{
	/// Persists or replaces a notification keyed by its id.
	fn save(&self, notification: WebhookNotification) -> StoreFuture<'_, ()>;

	/// Fetches a notification by id.
	fn fetch<'a>(
		&'a self,
		id: &'a NotificationId,
	) -> StoreFuture<'a, Option<WebhookNotification>>;
}

/// Read-only lookup of delivery targets: one active URL per event type.
pub trait WebhookRoutes
where
	Self: Send + Sync,
{
	/// Resolves the configured target URL for the event type, if any.
	fn url_for<'a>(&'a self, event_type: &'a str) -> StoreFuture<'a, Option<Url>>;
}

/// Error type produced by storage contract implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
