//! Webhook notification model and delivery engine.
//!
//! Every outbound event is persisted as a [`WebhookNotification`] before the
//! first send attempt, so the record survives transport failures and can be
//! retried later. Delivery failures are recorded on the notification rather
//! than returned as errors; only storage faults propagate to the caller.

pub mod delivery;
pub mod notification;

pub use delivery::*;
pub use notification::*;

// self
use crate::_prelude::*;

/// Lifecycle states of a webhook notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
	/// Created but not yet attempted.
	Pending,
	/// Accepted by the receiver.
	Sent,
	/// Exhausted its retry budget.
	Failed,
	/// Failed, with retry budget remaining.
	Retry,
}
impl DeliveryStatus {
	/// Returns a stable label suitable for persistence or logging.
	pub const fn as_str(self) -> &'static str {
		match self {
			DeliveryStatus::Pending => "pending",
			DeliveryStatus::Sent => "sent",
			DeliveryStatus::Failed => "failed",
			DeliveryStatus::Retry => "retry",
		}
	}
}
impl Display for DeliveryStatus {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Input for creating a webhook notification.
#[derive(Clone, Debug)]
pub struct NotificationRequest {
	/// Event type this notification carries, e.g. `employee.updated`.
	pub event_type: String,
	/// Source model name the event refers to.
	pub model_name: String,
	/// Source record identifier within the model.
	pub record_id: i64,
	/// Explicit destination; resolved from the route table when absent.
	pub url: Option<Url>,
	/// Extra headers forwarded with the POST.
	pub headers: BTreeMap<String, String>,
	/// JSON payload posted to the receiver.
	pub payload: serde_json::Value,
}
impl NotificationRequest {
	/// Creates a request with an empty header set and a null payload.
	pub fn new(
		event_type: impl Into<String>,
		model_name: impl Into<String>,
		record_id: i64,
	) -> Self {
		Self {
			event_type: event_type.into(),
			model_name: model_name.into(),
			record_id,
			url: None,
			headers: BTreeMap::new(),
			payload: serde_json::Value::Null,
		}
	}

	/// Sets an explicit destination URL, bypassing route resolution.
	pub fn with_url(mut self, url: Url) -> Self {
		self.url = Some(url);

		self
	}

	/// Adds a header forwarded with the delivery POST.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into(), value.into());

		self
	}

	/// Sets the JSON payload.
	pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
		self.payload = payload;

		self
	}
}
