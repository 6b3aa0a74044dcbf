//! Thread-safe in-memory store implementations for local development and tests.

// self
use crate::{
	_prelude::*,
	ids::{NationalId, NotificationId},
	session::SessionRecord,
	store::{ConfigStore, NotificationStore, SessionStore, StoreFuture, WebhookRoutes},
	webhook::WebhookNotification,
};

type ParamMap = Arc<RwLock<HashMap<String, String>>>;

/// In-process configuration parameter store.
#[derive(Clone, Debug, Default)]
pub struct MemoryConfigStore(ParamMap);
impl ConfigStore for MemoryConfigStore {
	fn get_param<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().get(key).cloned()) })
	}

	fn set_param<'a>(&'a self, key: &'a str, value: String) -> StoreFuture<'a, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().insert(key.to_owned(), value);

			Ok(())
		})
	}
}

/// In-process session record repository backing tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemorySessionStore(Arc<RwLock<Vec<SessionRecord>>>);
impl MemorySessionStore {
	/// Snapshot of every stored record, in insertion order.
	pub fn records(&self) -> Vec<SessionRecord> {
		self.0.read().clone()
	}

	fn upsert(records: &mut Vec<SessionRecord>, record: SessionRecord) {
		match records.iter_mut().find(|existing| existing.id == record.id) {
			Some(existing) => *existing = record,
			None => records.push(record),
		}
	}
}
impl SessionStore for MemorySessionStore {
	fn save(&self, record: SessionRecord) -> StoreFuture<'_, ()> {
		let records = self.0.clone();

		Box::pin(async move {
			Self::upsert(&mut records.write(), record);

			Ok(())
		})
	}

	fn find_active_by_national_id<'a>(
		&'a self,
		national_id: &'a NationalId,
	) -> StoreFuture<'a, Option<SessionRecord>> {
		let records = self.0.clone();

		Box::pin(async move {
			Ok(records
				.read()
				.iter()
				.find(|record| record.active && &record.national_id == national_id)
				.cloned())
		})
	}

	fn find_by_token<'a>(&'a self, token: &'a str) -> StoreFuture<'a, Option<SessionRecord>> {
		let records = self.0.clone();

		Box::pin(async move {
			Ok(records
				.read()
				.iter()
				.find(|record| {
					record.token.as_ref().is_some_and(|secret| secret.expose() == token)
				})
				.cloned())
		})
	}

	fn deactivate_expired(&self, now: OffsetDateTime) -> StoreFuture<'_, usize> {
		let records = self.0.clone();

		Box::pin(async move {
			let mut guard = records.write();
			let mut swept = 0;

			for record in guard.iter_mut() {
				if record.active && record.is_expired_at(now) {
					record.active = false;
					swept += 1;
				}
			}

			Ok(swept)
		})
	}
}

/// In-process webhook notification repository.
#[derive(Clone, Debug, Default)]
pub struct MemoryNotificationStore(Arc<RwLock<HashMap<NotificationId, WebhookNotification>>>);
impl MemoryNotificationStore {
	/// Snapshot of every stored notification.
	pub fn records(&self) -> Vec<WebhookNotification> {
		self.0.read().values().cloned().collect()
	}
}
impl NotificationStore for MemoryNotificationStore {
	fn save(&self, notification: WebhookNotification) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().insert(notification.id.clone(), notification);

			Ok(())
		})
	}

	fn fetch<'a>(
		&'a self,
		id: &'a NotificationId,
	) -> StoreFuture<'a, Option<WebhookNotification>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().get(id).cloned()) })
	}
}

/// In-process event-type → URL route table.
#[derive(Clone, Debug, Default)]
pub struct MemoryWebhookRoutes(Arc<RwLock<HashMap<String, Url>>>);
impl MemoryWebhookRoutes {
	/// Registers (or replaces) the delivery target for an event type.
	pub fn set_route(&self, event_type: impl Into<String>, url: Url) {
		self.0.write().insert(event_type.into(), url);
	}
}
impl WebhookRoutes for MemoryWebhookRoutes {
	fn url_for<'a>(&'a self, event_type: &'a str) -> StoreFuture<'a, Option<Url>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().get(event_type).cloned()) })
	}
}
