//! Employee directory lookup seam.
//!
//! The host platform owns the employee table; the broker only needs to resolve a
//! national id to an employee reference at issuance time. A missing employee is
//! not an error at this layer — the session service issues the token anyway and
//! leaves the reference unset.

// self
use crate::{
	_prelude::*,
	ids::{EmployeeId, NationalId},
	store::{StoreError, StoreFuture},
};

/// Lookup contract implemented by the host's employee store.
pub trait EmployeeDirectory
where
	Self: Send + Sync,
{
	/// Resolves a national id to the matching employee reference, if any.
	fn find_by_national_id<'a>(
		&'a self,
		national_id: &'a NationalId,
	) -> StoreFuture<'a, Option<EmployeeId>>;
}

/// In-process directory backing tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryDirectory(Arc<RwLock<HashMap<NationalId, EmployeeId>>>);
impl MemoryDirectory {
	/// Registers an employee under the provided national id.
	pub fn insert(&self, national_id: NationalId, employee: EmployeeId) {
		self.0.write().insert(national_id, employee);
	}
}
impl EmployeeDirectory for MemoryDirectory {
	fn find_by_national_id<'a>(
		&'a self,
		national_id: &'a NationalId,
	) -> StoreFuture<'a, Option<EmployeeId>> {
		let map = self.0.clone();

		Box::pin(async move { Ok::<_, StoreError>(map.read().get(national_id).copied()) })
	}
}
