//! Delivery engine advancing notifications through the retry state machine.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::{
	_prelude::*,
	error::DeliveryError,
	http::{EssHttpClient, WEBHOOK_TIMEOUT},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::{NotificationStore, WebhookRoutes},
	webhook::{DeliveryStatus, NotificationRequest, WebhookNotification},
};

/// Response statuses the receiver may answer with to acknowledge a delivery.
pub const ACCEPTED_STATUSES: [u16; 3] = [200, 201, 202];

/// Thread-safe counters for delivery attempts.
#[derive(Debug, Default)]
pub struct DeliveryMetrics {
	attempts: AtomicU64,
	sent: AtomicU64,
	failed: AtomicU64,
}
impl DeliveryMetrics {
	/// Returns the total number of delivery attempts.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of deliveries acknowledged by the receiver.
	pub fn sent(&self) -> u64 {
		self.sent.load(Ordering::Relaxed)
	}

	/// Returns the number of failed attempts.
	pub fn failed(&self) -> u64 {
		self.failed.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_sent(&self) {
		self.sent.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failed(&self) {
		self.failed.fetch_add(1, Ordering::Relaxed);
	}
}

/// Posts notifications to their receivers and persists the outcome.
///
/// A failed attempt is not an error from the engine's point of view: the
/// failure lands on the notification record and the call returns the new
/// [`DeliveryStatus`]. Only storage faults propagate as `Err`.
pub struct DeliveryEngine {
	http: EssHttpClient,
	store: Arc<dyn NotificationStore>,
	routes: Arc<dyn WebhookRoutes>,
	metrics: Arc<DeliveryMetrics>,
}
impl DeliveryEngine {
	/// Creates an engine over the provided transport, store, and route table.
	pub fn new(
		http: EssHttpClient,
		store: Arc<dyn NotificationStore>,
		routes: Arc<dyn WebhookRoutes>,
	) -> Self {
		Self { http, store, routes, metrics: Arc::new(DeliveryMetrics::default()) }
	}

	/// Returns the engine's delivery counters.
	pub fn metrics(&self) -> &Arc<DeliveryMetrics> {
		&self.metrics
	}

	/// Persists a pending notification for the given request and destination.
	pub async fn create_notification(
		&self,
		request: NotificationRequest,
		url: Url,
	) -> Result<WebhookNotification> {
		let notification = WebhookNotification::create(request, url);

		self.store.save(notification.clone()).await?;

		Ok(notification)
	}

	/// Attempts delivery of a notification and persists the resulting state.
	///
	/// Sent and exhausted-failed notifications are terminal: the call returns
	/// their current status without issuing a request, so a settled record can
	/// never move backwards through the state machine.
	pub async fn send(&self, notification: &mut WebhookNotification) -> Result<DeliveryStatus> {
		const KIND: FlowKind = FlowKind::Delivery;

		if !notification.can_attempt() {
			return Ok(notification.status);
		}

		let span = FlowSpan::new(KIND, "send");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.metrics.record_attempt();

		let outcome = span.instrument(self.post(notification)).await;

		match outcome {
			Ok(now) => {
				notification.mark_sent(now);
				self.metrics.record_sent();
				obs::record_flow_outcome(KIND, FlowOutcome::Success);
			},
			Err(e) => {
				notification.record_failure(e.to_string());
				self.metrics.record_failed();
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
			},
		}

		self.store.save(notification.clone()).await?;

		Ok(notification.status)
	}

	/// Resets a failed notification and re-attempts delivery.
	///
	/// Pending and sent notifications are left untouched; the call returns
	/// their current status without issuing a request.
	pub async fn retry(&self, notification: &mut WebhookNotification) -> Result<DeliveryStatus> {
		if !notification.reset_for_retry() {
			return Ok(notification.status);
		}

		self.store.save(notification.clone()).await?;
		self.send(notification).await
	}

	/// Creates and delivers a notification, resolving the destination from the
	/// route table when the request does not carry one.
	///
	/// Returns `Ok(None)` when no route is configured for the event type; no
	/// record is persisted in that case.
	pub async fn send_notification(
		&self,
		request: NotificationRequest,
	) -> Result<Option<WebhookNotification>> {
		let url = match request.url.clone() {
			Some(url) => url,
			None => match self.routes.url_for(&request.event_type).await? {
				Some(url) => url,
				None => {
					#[cfg(feature = "tracing")]
					tracing::warn!(
						event_type = request.event_type,
						"no webhook route configured, dropping notification",
					);

					return Ok(None);
				},
			},
		};
		let mut notification = self.create_notification(request, url).await?;

		self.send(&mut notification).await?;

		Ok(Some(notification))
	}

	async fn post(&self, notification: &WebhookNotification) -> Result<OffsetDateTime, DeliveryError> {
		let mut request = self
			.http
			.post(notification.url.clone())
			.json(&notification.payload)
			.timeout(WEBHOOK_TIMEOUT);

		for (name, value) in &notification.headers {
			request = request.header(name, value);
		}

		let response = request
			.send()
			.await
			.map_err(|e| DeliveryError::Transport { message: e.to_string() })?;
		let status = response.status().as_u16();

		if ACCEPTED_STATUSES.contains(&status) {
			Ok(OffsetDateTime::now_utc())
		} else {
			let body = response.text().await.unwrap_or_default();

			Err(DeliveryError::Http { status, body })
		}
	}
}
impl Debug for DeliveryEngine {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DeliveryEngine").field("metrics", &self.metrics).finish_non_exhaustive()
	}
}
