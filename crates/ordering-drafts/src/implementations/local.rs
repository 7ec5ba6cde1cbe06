//! Local draft store backed by the storage service.
//!
//! Submissions live under the `submissions` namespace; each owner has an
//! index entry under `submissions_by_owner` listing their submission ids.

use crate::{DraftStoreError, DraftStoreFactory, DraftStoreInterface, DraftStoreRegistry};
use async_trait::async_trait;
use chrono::Utc;
use ordering_storage::{StorageError, StorageService};
use ordering_types::{
	ConfigSchema, ImplementationRegistry, Schema, StorageKey, Submission, SubmissionPatch,
	ValidationError, LAST_STEP,
};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Draft store that persists submissions through a [`StorageService`].
pub struct LocalDraftStore {
	storage: Arc<StorageService>,
	/// Serializes read-modify-write cycles so concurrent writers cannot lose updates.
	write_lock: Mutex<()>,
}

impl LocalDraftStore {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self {
			storage,
			write_lock: Mutex::new(()),
		}
	}

	async fn load(&self, id: &str) -> Result<Submission, DraftStoreError> {
		self.storage
			.retrieve(StorageKey::Submissions.as_str(), id)
			.await
			.map_err(|e| match e {
				StorageError::NotFound => DraftStoreError::NotFound(id.to_string()),
				other => DraftStoreError::Storage(other.to_string()),
			})
	}

	async fn save(&self, submission: &Submission) -> Result<(), DraftStoreError> {
		self.storage
			.store(StorageKey::Submissions.as_str(), &submission.id, submission)
			.await
			.map_err(|e| DraftStoreError::Storage(e.to_string()))
	}

	async fn owner_index(&self, owner_id: &str) -> Result<Vec<String>, DraftStoreError> {
		self.storage
			.retrieve_optional(StorageKey::SubmissionsByOwner.as_str(), owner_id)
			.await
			.map(Option::unwrap_or_default)
			.map_err(|e| DraftStoreError::Storage(e.to_string()))
	}

	async fn save_owner_index(&self, owner_id: &str, ids: &[String]) -> Result<(), DraftStoreError> {
		self.storage
			.store(StorageKey::SubmissionsByOwner.as_str(), owner_id, &ids)
			.await
			.map_err(|e| DraftStoreError::Storage(e.to_string()))
	}

	/// Loads a draft, applies `mutate`, stamps the save time and persists it.
	async fn modify_draft<F>(&self, id: &str, mutate: F) -> Result<Submission, DraftStoreError>
	where
		F: FnOnce(&mut Submission),
	{
		let _guard = self.write_lock.lock().await;
		let mut submission = self.load(id).await?;
		if !submission.is_draft {
			return Err(DraftStoreError::AlreadySubmitted(id.to_string()));
		}

		mutate(&mut submission);

		let now = Utc::now();
		submission.updated_at = now;
		submission.last_saved_at = Some(now);
		self.save(&submission).await?;
		Ok(submission)
	}
}

#[async_trait]
impl DraftStoreInterface for LocalDraftStore {
	async fn create(&self, owner_id: &str) -> Result<Submission, DraftStoreError> {
		if owner_id.trim().is_empty() {
			return Err(DraftStoreError::Rejected("Owner id is required".into()));
		}

		let _guard = self.write_lock.lock().await;
		let submission = Submission::new_draft(uuid::Uuid::new_v4().to_string(), owner_id, Utc::now());
		self.save(&submission).await?;

		let mut ids = self.owner_index(owner_id).await?;
		ids.push(submission.id.clone());
		self.save_owner_index(owner_id, &ids).await?;

		Ok(submission)
	}

	async fn get(&self, id: &str) -> Result<Submission, DraftStoreError> {
		self.load(id).await
	}

	async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Submission>, DraftStoreError> {
		let mut submissions = Vec::new();
		for id in self.owner_index(owner_id).await? {
			match self.load(&id).await {
				Ok(submission) => submissions.push(submission),
				Err(DraftStoreError::NotFound(_)) => {
					tracing::debug!(submission_id = %id, "Skipping stale index entry");
				},
				Err(e) => return Err(e),
			}
		}
		submissions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
		Ok(submissions)
	}

	async fn update_step(
		&self,
		id: &str,
		step: u8,
		patch: &SubmissionPatch,
	) -> Result<Submission, DraftStoreError> {
		if step > LAST_STEP {
			return Err(DraftStoreError::Rejected(format!("Unknown step {}", step)));
		}
		self.modify_draft(id, |submission| {
			submission.apply_patch(patch);
			submission.record_step_completed(step);
		})
		.await
	}

	async fn update(&self, id: &str, patch: &SubmissionPatch) -> Result<Submission, DraftStoreError> {
		self.modify_draft(id, |submission| submission.apply_patch(patch))
			.await
	}

	async fn submit(&self, id: &str, terms_accepted: bool) -> Result<Submission, DraftStoreError> {
		if !terms_accepted {
			return Err(DraftStoreError::Rejected(
				"Terms and conditions must be accepted".into(),
			));
		}
		let submission = self
			.modify_draft(id, |submission| {
				submission.terms_accepted = true;
				submission.is_draft = false;
				submission.submitted_at = Some(Utc::now());
			})
			.await?;
		Ok(submission)
	}

	async fn delete(&self, id: &str) -> Result<(), DraftStoreError> {
		let _guard = self.write_lock.lock().await;
		let submission = self.load(id).await?;

		self.storage
			.remove(StorageKey::Submissions.as_str(), id)
			.await
			.map_err(|e| DraftStoreError::Storage(e.to_string()))?;

		let mut ids = self.owner_index(&submission.owner_id).await?;
		ids.retain(|existing| existing != id);
		self.save_owner_index(&submission.owner_id, &ids).await
	}
}

/// Configuration schema for the local draft store. No fields.
pub struct LocalDraftStoreSchema;

impl ConfigSchema for LocalDraftStoreSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

/// Factory function to create a local draft store.
pub fn create_draft_store(
	config: &toml::Value,
	storage: Arc<StorageService>,
) -> Result<Box<dyn DraftStoreInterface>, DraftStoreError> {
	LocalDraftStoreSchema
		.validate(config)
		.map_err(|e| DraftStoreError::Configuration(e.to_string()))?;
	Ok(Box::new(LocalDraftStore::new(storage)))
}

/// Registry for the local draft store.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "local";
	type Factory = DraftStoreFactory;

	fn factory() -> Self::Factory {
		create_draft_store
	}
}

impl DraftStoreRegistry for Registry {}
