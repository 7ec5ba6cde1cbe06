//! Draft store double shared by the session, writer and autosave tests.

use async_trait::async_trait;
use ordering_drafts::implementations::local::LocalDraftStore;
use ordering_drafts::{DraftStoreError, DraftStoreInterface};
use ordering_storage::implementations::memory::MemoryStorage;
use ordering_storage::StorageService;
use ordering_types::{Submission, SubmissionPatch};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, MutexGuard};

/// Local draft store that records every call and can be told to fail.
pub(crate) struct ScriptedDraftStore {
	inner: LocalDraftStore,
	calls: Mutex<Vec<String>>,
	gate: AsyncMutex<()>,
	pub(crate) fail_create: AtomicBool,
	pub(crate) fail_writes: AtomicBool,
}

impl ScriptedDraftStore {
	pub(crate) fn new() -> Self {
		Self {
			inner: LocalDraftStore::new(Arc::new(StorageService::new(Box::new(
				MemoryStorage::new(),
			)))),
			calls: Mutex::new(Vec::new()),
			gate: AsyncMutex::new(()),
			fail_create: AtomicBool::new(false),
			fail_writes: AtomicBool::new(false),
		}
	}

	/// Calls made so far, e.g. `["create", "update_step:1"]`.
	pub(crate) fn calls(&self) -> Vec<String> {
		self.calls.lock().unwrap().clone()
	}

	/// Blocks every store call until the returned guard is dropped.
	pub(crate) async fn hold(&self) -> MutexGuard<'_, ()> {
		self.gate.lock().await
	}

	pub(crate) async fn create_draft(&self, owner_id: &str) -> Submission {
		self.create(owner_id).await.unwrap()
	}

	pub(crate) async fn get_draft(&self, id: &str) -> Submission {
		self.inner.get(id).await.unwrap()
	}

	async fn enter(&self, call: String) {
		self.calls.lock().unwrap().push(call);
		let _pass = self.gate.lock().await;
	}

	fn check_writes(&self) -> Result<(), DraftStoreError> {
		if self.fail_writes.load(Ordering::SeqCst) {
			return Err(DraftStoreError::Storage("503 Service Unavailable".into()));
		}
		Ok(())
	}
}

#[async_trait]
impl DraftStoreInterface for ScriptedDraftStore {
	async fn create(&self, owner_id: &str) -> Result<Submission, DraftStoreError> {
		self.enter("create".into()).await;
		if self.fail_create.load(Ordering::SeqCst) {
			return Err(DraftStoreError::Storage("connection reset".into()));
		}
		self.inner.create(owner_id).await
	}

	async fn get(&self, id: &str) -> Result<Submission, DraftStoreError> {
		self.inner.get(id).await
	}

	async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Submission>, DraftStoreError> {
		self.inner.list_by_owner(owner_id).await
	}

	async fn update_step(
		&self,
		id: &str,
		step: u8,
		patch: &SubmissionPatch,
	) -> Result<Submission, DraftStoreError> {
		self.enter(format!("update_step:{}", step)).await;
		self.check_writes()?;
		self.inner.update_step(id, step, patch).await
	}

	async fn update(&self, id: &str, patch: &SubmissionPatch) -> Result<Submission, DraftStoreError> {
		self.enter("update".into()).await;
		self.check_writes()?;
		self.inner.update(id, patch).await
	}

	async fn submit(&self, id: &str, terms_accepted: bool) -> Result<Submission, DraftStoreError> {
		self.enter("submit".into()).await;
		self.check_writes()?;
		self.inner.submit(id, terms_accepted).await
	}

	async fn delete(&self, id: &str) -> Result<(), DraftStoreError> {
		self.enter("delete".into()).await;
		self.inner.delete(id).await
	}
}
