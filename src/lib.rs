//! Employee-self-service security broker: rotating-key session tokens, identity-provider
//! exchange, and bounded-retry webhook delivery for ERP hosts.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod api;
pub mod directory;
pub mod error;
pub mod http;
pub mod identity;
pub mod ids;
pub mod keyring;
pub mod obs;
pub mod session;
pub mod store;
pub mod webhook;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;
	pub use crate::ids::{
		EmployeeId, ExternalSessionId, ExternalUserId, NationalId, NotificationId,
		SessionRecordId,
	};

	// self
	use crate::{
		directory::{EmployeeDirectory, MemoryDirectory},
		http::EssHttpClient,
		keyring::KeyRing,
		session::SessionService,
		store::{
			ConfigStore, MemoryConfigStore, MemoryNotificationStore, MemorySessionStore,
			MemoryWebhookRoutes, NotificationStore, SessionStore, WebhookRoutes,
		},
		webhook::DeliveryEngine,
	};

	/// An in-memory session stack with handles to every backing store.
	#[derive(Debug)]
	pub struct TestSessions {
		/// The session service under test.
		pub service: Arc<SessionService>,
		/// Session records backend.
		pub store: Arc<MemorySessionStore>,
		/// Employee directory backend.
		pub directory: Arc<MemoryDirectory>,
		/// Key ring shared with the service.
		pub keyring: Arc<KeyRing>,
		/// Configuration backend holding the signing-key parameters.
		pub config: Arc<MemoryConfigStore>,
	}

	/// An in-memory delivery stack with handles to every backing store.
	#[derive(Debug)]
	pub struct TestDelivery {
		/// The delivery engine under test.
		pub engine: DeliveryEngine,
		/// Notification records backend.
		pub notifications: Arc<MemoryNotificationStore>,
		/// Route table backend.
		pub routes: Arc<MemoryWebhookRoutes>,
	}

	/// Builds an HTTP client that accepts the self-signed certificates produced by `httpmock`
	/// during tests.
	pub fn test_http_client() -> EssHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		EssHttpClient::with_client(client)
	}

	/// Constructs a [`SessionService`] backed entirely by in-memory stores.
	pub fn build_test_sessions() -> TestSessions {
		let config = Arc::new(MemoryConfigStore::default());
		let keyring = Arc::new(KeyRing::new(config.clone() as Arc<dyn ConfigStore>));
		let store = Arc::new(MemorySessionStore::default());
		let directory = Arc::new(MemoryDirectory::default());
		let service = Arc::new(SessionService::new(
			store.clone() as Arc<dyn SessionStore>,
			keyring.clone(),
			directory.clone() as Arc<dyn EmployeeDirectory>,
		));

		TestSessions { service, store, directory, keyring, config }
	}

	/// Constructs a [`DeliveryEngine`] backed entirely by in-memory stores.
	pub fn build_test_delivery() -> TestDelivery {
		let notifications = Arc::new(MemoryNotificationStore::default());
		let routes = Arc::new(MemoryWebhookRoutes::default());
		let engine = DeliveryEngine::new(
			test_http_client(),
			notifications.clone() as Arc<dyn NotificationStore>,
			routes.clone() as Arc<dyn WebhookRoutes>,
		);

		TestDelivery { engine, notifications, routes }
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use httpmock as _;
