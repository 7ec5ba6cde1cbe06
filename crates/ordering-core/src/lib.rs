//! Core of the order wizard.
//!
//! This module ties the pricing, draft and storage crates together into
//! wizard sessions. It holds the stepper state machine, the single-writer
//! queue every draft write goes through, the debounced autosave task and the
//! builder that assembles an [`OrderingEngine`] from configuration.

use ordering_config::Config;
use ordering_drafts::DraftStoreService;
use ordering_pricing::{CatalogService, PromoError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub mod autosave;
pub mod builder;
pub mod event_bus;
pub mod session;
pub mod state;
pub mod writer;

#[cfg(test)]
mod test_support;

pub use builder::{BuilderError, OrderingBuilder, OrderingFactories};
pub use session::SubmissionSession;
pub use state::{StepperState, WizardPhase};
pub use writer::{DraftWriter, WriteError};

/// Errors returned by session operations.
#[derive(Debug, Error)]
pub enum SessionError {
	/// Step payload failed validation. Nothing was sent to the store.
	#[error("Validation error: {0}")]
	Validation(String),
	/// The draft store refused or failed a write.
	#[error("Persistence error: {0}")]
	Persistence(String),
	/// The operation needs a draft and the session has none.
	#[error("No draft is attached to this session")]
	NoDraft,
	/// The wizard is not in a state that allows the operation.
	#[error("Not ready: {0}")]
	NotReady(String),
	#[error("Promo error: {0}")]
	Promo(#[from] PromoError),
}

/// Shared services behind every wizard session.
///
/// Sessions opened from one engine share the draft writer, so writes to a
/// draft are serialized even when two sessions edit it.
#[derive(Clone)]
pub struct OrderingEngine {
	config: Config,
	drafts: DraftStoreService,
	writer: DraftWriter,
	catalog: Arc<CatalogService>,
}

impl OrderingEngine {
	/// Creates an engine. Spawns the draft writer on the current runtime.
	pub fn new(config: Config, drafts: DraftStoreService, catalog: Arc<CatalogService>) -> Self {
		let writer = DraftWriter::spawn(drafts.clone());
		Self {
			config,
			drafts,
			writer,
			catalog,
		}
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn drafts(&self) -> &DraftStoreService {
		&self.drafts
	}

	pub fn catalog(&self) -> &Arc<CatalogService> {
		&self.catalog
	}

	/// Warms the catalog cache. A failure is logged and priced around later.
	pub async fn initialize(&self) {
		if let Err(e) = self.catalog.load_catalog().await {
			tracing::warn!(error = %e, "Catalog not loaded at startup");
		}
	}

	/// Opens a session for the configured customer.
	pub fn open_session(&self) -> SubmissionSession {
		self.open_session_for(self.config.session.owner_id.clone())
	}

	/// Opens a session for `owner_id`, or an unauthenticated one.
	pub fn open_session_for(&self, owner_id: Option<String>) -> SubmissionSession {
		SubmissionSession::new(
			owner_id,
			self.drafts.clone(),
			self.writer.clone(),
			self.catalog.clone(),
			Duration::from_millis(self.config.session.autosave_debounce_ms),
		)
	}
}
