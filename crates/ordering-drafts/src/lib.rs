//! Submission draft store for the order wizard.
//!
//! The draft store persists in-progress orders keyed by submission id. The
//! production store is a remote API owned by another team; this crate defines
//! the contract the wizard depends on and ships a `local` implementation over
//! [`StorageService`] for development, tests and the CLI.

use async_trait::async_trait;
use ordering_storage::StorageService;
use ordering_types::{ImplementationRegistry, Submission, SubmissionPatch};
use std::sync::Arc;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod local;
}

/// Errors that can occur during draft store operations.
#[derive(Debug, Error)]
pub enum DraftStoreError {
	/// No submission exists with the given id.
	#[error("Submission not found: {0}")]
	NotFound(String),
	/// The submission is no longer a draft and cannot be changed.
	#[error("Submission already submitted: {0}")]
	AlreadySubmitted(String),
	/// The request was refused by the store.
	#[error("Rejected: {0}")]
	Rejected(String),
	/// Error from the underlying storage or transport.
	#[error("Storage error: {0}")]
	Storage(String),
	/// Error that occurs when configuration is invalid.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Contract of the submission draft store.
///
/// These are the only persistence operations the wizard depends on.
/// Transport, authentication headers and URL resolution belong to the
/// implementation.
#[async_trait]
pub trait DraftStoreInterface: Send + Sync {
	/// Creates an empty draft for `owner_id`.
	async fn create(&self, owner_id: &str) -> Result<Submission, DraftStoreError>;

	/// Fetches a submission by id.
	async fn get(&self, id: &str) -> Result<Submission, DraftStoreError>;

	/// Lists an owner's submissions, most recently updated first.
	async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Submission>, DraftStoreError>;

	/// Saves the payload of step `step` and records the step as completed.
	async fn update_step(
		&self,
		id: &str,
		step: u8,
		patch: &SubmissionPatch,
	) -> Result<Submission, DraftStoreError>;

	/// Merges a partial update without completing any step. Used by autosave.
	async fn update(&self, id: &str, patch: &SubmissionPatch)
		-> Result<Submission, DraftStoreError>;

	/// Finalizes the draft.
	async fn submit(&self, id: &str, terms_accepted: bool) -> Result<Submission, DraftStoreError>;

	/// Deletes a submission.
	async fn delete(&self, id: &str) -> Result<(), DraftStoreError>;
}

/// Type alias for draft store factory functions.
///
/// Local implementations persist through the shared storage service; remote
/// ones may ignore it.
pub type DraftStoreFactory =
	fn(&toml::Value, Arc<StorageService>) -> Result<Box<dyn DraftStoreInterface>, DraftStoreError>;

/// Registry trait for draft store implementations.
pub trait DraftStoreRegistry: ImplementationRegistry<Factory = DraftStoreFactory> {}

/// Get all registered draft store implementations as (name, factory) pairs.
pub fn get_all_implementations() -> Vec<(&'static str, DraftStoreFactory)> {
	use implementations::local;

	vec![(local::Registry::NAME, local::Registry::factory())]
}

/// Shared handle to the configured draft store.
///
/// Adds structured logging around every call; the session and the draft
/// writer both hold one.
#[derive(Clone)]
pub struct DraftStoreService {
	backend: Arc<dyn DraftStoreInterface>,
}

impl DraftStoreService {
	pub fn new(backend: Arc<dyn DraftStoreInterface>) -> Self {
		Self { backend }
	}

	pub async fn create(&self, owner_id: &str) -> Result<Submission, DraftStoreError> {
		let submission = self.backend.create(owner_id).await.inspect_err(|e| {
			tracing::warn!(owner_id = %owner_id, error = %e, "Failed to create draft");
		})?;
		tracing::info!(submission_id = %submission.id, owner_id = %owner_id, "Created draft");
		Ok(submission)
	}

	pub async fn get(&self, id: &str) -> Result<Submission, DraftStoreError> {
		self.backend.get(id).await
	}

	pub async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Submission>, DraftStoreError> {
		self.backend.list_by_owner(owner_id).await
	}

	pub async fn update_step(
		&self,
		id: &str,
		step: u8,
		patch: &SubmissionPatch,
	) -> Result<Submission, DraftStoreError> {
		let submission = self.backend.update_step(id, step, patch).await.inspect_err(|e| {
			tracing::warn!(submission_id = %id, step, error = %e, "Step save failed");
		})?;
		tracing::debug!(submission_id = %id, step, "Saved step");
		Ok(submission)
	}

	pub async fn update(
		&self,
		id: &str,
		patch: &SubmissionPatch,
	) -> Result<Submission, DraftStoreError> {
		self.backend.update(id, patch).await
	}

	pub async fn submit(&self, id: &str, terms_accepted: bool) -> Result<Submission, DraftStoreError> {
		let submission = self.backend.submit(id, terms_accepted).await.inspect_err(|e| {
			tracing::warn!(submission_id = %id, error = %e, "Submit failed");
		})?;
		tracing::info!(submission_id = %id, "Submitted order");
		Ok(submission)
	}

	pub async fn delete(&self, id: &str) -> Result<(), DraftStoreError> {
		self.backend.delete(id).await?;
		tracing::info!(submission_id = %id, "Deleted submission");
		Ok(())
	}
}
