//! Transport primitives shared by the identity client and the webhook engine.
//!
//! Both callers hold one [`EssHttpClient`] and apply their own per-request
//! timeout: identity-provider calls get a single short attempt whose failure is
//! surfaced straight to the caller, while webhook deliveries tolerate slower
//! subscribers before failure handling takes over.

// std
use std::{ops::Deref, time::Duration as StdDuration};
// self
use crate::_prelude::*;

/// Timeout applied to each identity-provider call (introspection, user-info).
pub const IDENTITY_TIMEOUT: StdDuration = StdDuration::from_secs(10);
/// Timeout applied to each webhook delivery attempt.
pub const WEBHOOK_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// The broker never follows redirects implicitly and never retries at the
/// transport layer; retry bookkeeping belongs to the webhook state machine and
/// identity calls are deliberately single-shot.
#[derive(Clone, Default)]
pub struct EssHttpClient(pub ReqwestClient);
impl EssHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
impl AsRef<ReqwestClient> for EssHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl Deref for EssHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl Debug for EssHttpClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("EssHttpClient").finish_non_exhaustive()
	}
}
