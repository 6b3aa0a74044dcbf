//! Persisted notification records and their status transitions.

// self
use crate::{
	_prelude::*,
	ids::NotificationId,
	webhook::{DeliveryStatus, NotificationRequest},
};

/// Default retry budget for a notification.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// A persisted webhook notification and its delivery state.
///
/// `retry_count` never exceeds `max_retries`; once the budget is exhausted the
/// status becomes [`DeliveryStatus::Failed`] and further automatic attempts
/// stop until an operator resets the record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WebhookNotification {
	/// Unique notification identifier.
	pub id: NotificationId,
	/// Event type this notification carries.
	pub event_type: String,
	/// Source model name the event refers to.
	pub model_name: String,
	/// Source record identifier within the model.
	pub record_id: i64,
	/// Destination URL.
	pub url: Url,
	/// JSON payload posted to the receiver.
	pub payload: serde_json::Value,
	/// Extra headers forwarded with the POST.
	pub headers: BTreeMap<String, String>,
	/// Current delivery state.
	pub status: DeliveryStatus,
	/// Attempts consumed so far.
	pub retry_count: u32,
	/// Retry budget.
	pub max_retries: u32,
	/// Instant of the successful delivery, if any.
	pub sent_date: Option<OffsetDateTime>,
	/// Last failure description, if any.
	pub error_message: Option<String>,
	/// Creation instant.
	pub created_at: OffsetDateTime,
}
impl WebhookNotification {
	/// Creates a pending notification from a request and its resolved URL.
	pub fn create(request: NotificationRequest, url: Url) -> Self {
		Self {
			id: NotificationId::random(),
			event_type: request.event_type,
			model_name: request.model_name,
			record_id: request.record_id,
			url,
			payload: request.payload,
			headers: request.headers,
			status: DeliveryStatus::Pending,
			retry_count: 0,
			max_retries: DEFAULT_MAX_RETRIES,
			sent_date: None,
			error_message: None,
			created_at: OffsetDateTime::now_utc(),
		}
	}

	/// Marks the notification as accepted by the receiver.
	pub fn mark_sent(&mut self, now: OffsetDateTime) {
		self.status = DeliveryStatus::Sent;
		self.sent_date = Some(now);
		self.error_message = None;
	}

	/// Records a failed attempt, consuming one unit of the retry budget.
	pub fn record_failure(&mut self, message: String) {
		self.error_message = Some(message);

		if self.retry_count < self.max_retries {
			self.retry_count += 1;
			self.status = if self.retry_count < self.max_retries {
				DeliveryStatus::Retry
			} else {
				DeliveryStatus::Failed
			};
		} else {
			self.status = DeliveryStatus::Failed;
		}
	}

	/// Resets the delivery state so the notification can be re-sent.
	///
	/// Only notifications that have actually failed are eligible; returns
	/// `false` for pending or sent records and leaves them untouched.
	pub fn reset_for_retry(&mut self) -> bool {
		if !matches!(self.status, DeliveryStatus::Failed | DeliveryStatus::Retry) {
			return false;
		}

		self.retry_count = 0;
		self.status = DeliveryStatus::Pending;
		self.error_message = None;

		true
	}

	/// Returns whether the retry budget still allows an automatic attempt.
	pub fn can_attempt(&self) -> bool {
		matches!(self.status, DeliveryStatus::Pending | DeliveryStatus::Retry)
	}
}
