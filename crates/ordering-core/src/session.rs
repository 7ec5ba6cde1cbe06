//! Wizard session.
//!
//! A [`SubmissionSession`] owns everything one customer's pass through the
//! wizard needs: the stepper state, the form values, the applied promo and a
//! subscription to its own event bus. Sessions share nothing mutable, so any
//! number can run side by side; their draft writes meet in the shared
//! [`DraftWriter`].

use crate::autosave::{Autosaver, Snapshot};
use crate::event_bus::EventBus;
use crate::state::{StepperState, WizardPhase};
use crate::writer::DraftWriter;
use crate::SessionError;
use ordering_drafts::DraftStoreService;
use ordering_pricing::{CatalogService, PromoError, QuoteService};
use ordering_types::{
	truncate_id, AutosaveEvent, DraftEvent, InstructionDetails, KeyDetails, OrderParameters,
	PricingBreakdown, PricingEvent, ReviewDetails, SessionEvent, Submission, SubmissionPatch,
	LAST_STEP, STEP_INSTRUCTIONS, STEP_KEY_DETAILS, STEP_REVIEW, STEP_WELCOME,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::TryRecvError};
use validator::Validate;

/// Events buffered per subscriber before the oldest are dropped.
const EVENT_CAPACITY: usize = 256;

/// One customer's pass through the order wizard.
pub struct SubmissionSession {
	/// Signed-in customer. Drafts are only created for signed-in customers.
	owner_id: Option<String>,
	state: StepperState,
	/// Price-relevant form values.
	params: OrderParameters,
	/// Every field edited in this session, as sent by autosave.
	form: SubmissionPatch,
	drafts: DraftStoreService,
	writer: DraftWriter,
	autosaver: Autosaver,
	quotes: QuoteService,
	event_bus: EventBus,
	/// The session's own subscription, drained by `sync_autosave_status`.
	events: broadcast::Receiver<SessionEvent>,
	fallback_reported: bool,
}

impl SubmissionSession {
	/// Creates a session. Must be called inside a tokio runtime.
	pub fn new(
		owner_id: Option<String>,
		drafts: DraftStoreService,
		writer: DraftWriter,
		catalog: Arc<CatalogService>,
		autosave_debounce: Duration,
	) -> Self {
		let event_bus = EventBus::new(EVENT_CAPACITY);
		let events = event_bus.subscribe();
		let autosaver = Autosaver::spawn(writer.clone(), event_bus.clone(), autosave_debounce);

		Self {
			owner_id,
			state: StepperState::new(),
			params: OrderParameters::default(),
			form: SubmissionPatch::default(),
			drafts,
			writer,
			autosaver,
			quotes: QuoteService::new(catalog),
			event_bus,
			events,
			fallback_reported: false,
		}
	}

	pub fn state(&self) -> &StepperState {
		&self.state
	}

	pub fn params(&self) -> &OrderParameters {
		&self.params
	}

	pub fn owner_id(&self) -> Option<&str> {
		self.owner_id.as_deref()
	}

	/// Subscribes to this session's events.
	pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
		self.event_bus.subscribe()
	}

	fn publish(&self, event: SessionEvent) {
		// The session's own subscription keeps the bus open
		self.event_bus.publish(event).ok();
	}

	pub fn go_to_step(&mut self, step: u8) -> bool {
		self.state.go_to_step(step)
	}

	/// Moves forward one step without saving. Leaving the welcome step goes
	/// through [`continue_from_welcome`](Self::continue_from_welcome) instead,
	/// which creates the draft first.
	pub fn next_step(&mut self) {
		if self.state.current_step != STEP_WELCOME {
			self.state.next_step();
		}
	}

	pub fn previous_step(&mut self) {
		self.state.previous_step();
	}

	/// Leaves the welcome step.
	///
	/// For a signed-in customer without a draft, the draft is created first
	/// and the step changes once creation has finished. If creation fails the
	/// wizard still moves on, with the failure recorded in `error`.
	pub async fn continue_from_welcome(&mut self) {
		if self.state.current_step != STEP_WELCOME {
			return;
		}

		if let (Some(owner_id), None) = (self.owner_id.clone(), &self.state.submission_id) {
			self.state.is_loading = true;
			match self.drafts.create(&owner_id).await {
				Ok(submission) => {
					self.state.submission_id = Some(submission.id.clone());
					self.state.error = None;
					self.publish(SessionEvent::Draft(DraftEvent::Created {
						submission_id: submission.id,
					}));
				},
				Err(e) => {
					let error = format!("Could not create a draft: {}", e);
					tracing::error!(owner_id = %owner_id, error = %e, "Continuing without a draft");
					self.state.error = Some(error.clone());
					self.publish(SessionEvent::Draft(DraftEvent::CreationFailed { error }));
				},
			}
			self.state.is_loading = false;
		}

		self.state.complete_step(STEP_WELCOME);
		self.state.next_step();
	}

	pub async fn save_key_details(&mut self, details: &KeyDetails) -> Result<(), SessionError> {
		details
			.validate()
			.map_err(|e| SessionError::Validation(e.to_string()))?;
		self.save_step(STEP_KEY_DETAILS, details.to_patch()).await
	}

	pub async fn save_instructions(&mut self, details: &InstructionDetails) -> Result<(), SessionError> {
		details
			.validate()
			.map_err(|e| SessionError::Validation(e.to_string()))?;
		self.save_step(STEP_INSTRUCTIONS, details.to_patch()).await
	}

	/// Saves the review step.
	///
	/// The review's promo code goes through the same validation as
	/// [`apply_promo`](Self::apply_promo): a new code is applied first and a
	/// refused one fails the save, while an empty code clears the applied one.
	/// The stored code is always the one the price is computed with.
	pub async fn save_review(&mut self, details: &ReviewDetails) -> Result<(), SessionError> {
		details
			.validate()
			.map_err(|e| SessionError::Validation(e.to_string()))?;

		let requested = details
			.promo_code
			.as_deref()
			.map(str::trim)
			.filter(|code| !code.is_empty());
		let applied = self.quotes.applied_promo().map(|promo| promo.code.clone());
		match requested {
			Some(code) if applied.as_deref().is_some_and(|a| a.eq_ignore_ascii_case(code)) => {},
			Some(code) => {
				self.apply_promo(code).await?;
			},
			None if applied.is_some() => {
				self.clear_promo().await;
			},
			None => {},
		}

		let mut patch = details.to_patch();
		patch.promo_code = Some(self.quotes.applied_promo().map(|promo| promo.code.clone()));
		self.save_step(STEP_REVIEW, patch).await
	}

	/// Saves a step's payload and, once the store confirms, completes the step
	/// and moves past it.
	///
	/// The whole form is written, and any autosave still waiting for this
	/// draft is dropped first.
	async fn save_step(&mut self, step: u8, patch: SubmissionPatch) -> Result<(), SessionError> {
		self.form.merge(&patch);
		patch.apply_to_params(&mut self.params);

		let Some(submission_id) = self.state.submission_id.clone() else {
			let error = SessionError::NoDraft;
			self.state.error = Some(error.to_string());
			self.publish(SessionEvent::Draft(DraftEvent::StepSaveFailed {
				submission_id: None,
				step,
				error: error.to_string(),
			}));
			return Err(error);
		};

		self.state.is_saving = true;
		self.state.error = None;
		self.supersede_autosave(&submission_id).await;
		let result = self
			.writer
			.update_step(&submission_id, step, self.form.clone())
			.await;
		self.state.is_saving = false;

		match result {
			Ok(saved) => {
				self.state.complete_step(step);
				self.state.current_step = self
					.state
					.current_step
					.max(step.saturating_add(1))
					.min(LAST_STEP);
				self.state.last_saved_at = saved.last_saved_at;
				self.publish(SessionEvent::Draft(DraftEvent::StepSaved {
					submission_id,
					step,
				}));
				Ok(())
			},
			Err(e) => {
				let error = e.to_string();
				self.state.error = Some(error.clone());
				self.publish(SessionEvent::Draft(DraftEvent::StepSaveFailed {
					submission_id: Some(submission_id),
					step,
					error: error.clone(),
				}));
				Err(SessionError::Persistence(error))
			},
		}
	}

	/// Records edited fields, schedules an autosave and returns the new price.
	pub async fn update_fields(&mut self, patch: SubmissionPatch) -> PricingBreakdown {
		self.form.merge(&patch);
		patch.apply_to_params(&mut self.params);
		self.schedule_autosave();
		self.quote().await
	}

	fn schedule_autosave(&self) {
		if let Some(submission_id) = &self.state.submission_id {
			self.autosaver.push(Snapshot {
				submission_id: submission_id.clone(),
				patch: self.form.clone(),
			});
		}
	}

	async fn supersede_autosave(&self, submission_id: &str) {
		self.autosaver
			.supersede(Snapshot {
				submission_id: submission_id.to_string(),
				patch: self.form.clone(),
			})
			.await;
	}

	/// Prices the current form values.
	pub async fn quote(&mut self) -> PricingBreakdown {
		let quote = self.quotes.quote(&self.params).await;
		if let Some(reason) = quote.fallback_reason {
			if !self.fallback_reported {
				self.fallback_reported = true;
				self.publish(SessionEvent::Pricing(PricingEvent::CatalogFallback { reason }));
			}
		}
		quote.breakdown
	}

	/// Validates and applies a promo code, replacing any applied one.
	///
	/// On failure no promo remains applied.
	pub async fn apply_promo(&mut self, code: &str) -> Result<PricingBreakdown, SessionError> {
		let result = self
			.quotes
			.apply_promo(code)
			.await
			.map(|applied| applied.code.clone());

		match result {
			Ok(code) => {
				self.publish(SessionEvent::Pricing(PricingEvent::PromoApplied { code: code.clone() }));
				Ok(self
					.update_fields(SubmissionPatch {
						promo_code: Some(Some(code)),
						..Default::default()
					})
					.await)
			},
			Err(e) => {
				if let PromoError::Rejected { code, message } = &e {
					self.publish(SessionEvent::Pricing(PricingEvent::PromoRejected {
						code: code.clone(),
						message: message.clone(),
					}));
				}
				self.update_fields(SubmissionPatch {
					promo_code: Some(None),
					..Default::default()
				})
				.await;
				Err(SessionError::Promo(e))
			},
		}
	}

	pub async fn clear_promo(&mut self) -> PricingBreakdown {
		if self.quotes.clear_promo().is_some() {
			self.publish(SessionEvent::Pricing(PricingEvent::PromoCleared));
		}
		self.update_fields(SubmissionPatch {
			promo_code: Some(None),
			..Default::default()
		})
		.await
	}

	/// Finalizes the order and enters payment processing.
	///
	/// Requires every step completed and the terms accepted. The form and the
	/// price breakdown at this moment are stored on the submission.
	pub async fn submit(&mut self, terms_accepted: bool) -> Result<Submission, SessionError> {
		if self.state.phase != WizardPhase::Editing {
			return Err(SessionError::NotReady("Order already submitted".into()));
		}
		if !self.state.all_steps_completed() {
			return Err(SessionError::NotReady(
				"All steps must be completed before submitting".into(),
			));
		}
		if !terms_accepted {
			return Err(SessionError::Validation(
				"Terms and conditions must be accepted".into(),
			));
		}
		let submission_id = self.state.submission_id.clone().ok_or(SessionError::NoDraft)?;

		let breakdown = self.quote().await;
		self.state.is_saving = true;
		self.state.error = None;
		self.supersede_autosave(&submission_id).await;
		let patch = SubmissionPatch {
			pricing_breakdown: Some(breakdown.clone()),
			..self.form.clone()
		};
		let result = self.writer.submit(&submission_id, terms_accepted, patch).await;
		self.state.is_saving = false;

		match result {
			Ok(submission) => {
				self.state.phase = WizardPhase::PaymentProcessing;
				self.state.last_saved_at = submission.last_saved_at;
				tracing::info!(
					submission_id = %truncate_id(&submission_id),
					final_price = %breakdown.final_price,
					"Order submitted"
				);
				self.publish(SessionEvent::Draft(DraftEvent::Submitted {
					submission_id,
					breakdown,
				}));
				Ok(submission)
			},
			Err(e) => {
				let error = e.to_string();
				self.state.error = Some(error.clone());
				Err(SessionError::Persistence(error))
			},
		}
	}

	pub fn mark_payment_complete(&mut self) -> Result<(), SessionError> {
		if self.state.phase != WizardPhase::PaymentProcessing {
			return Err(SessionError::NotReady("No payment in progress".into()));
		}
		self.state.phase = WizardPhase::PaymentComplete;
		Ok(())
	}

	/// Loads a saved draft into this session.
	pub async fn resume_submission(&mut self, submission_id: &str) -> Result<(), SessionError> {
		self.state.is_loading = true;
		let result = self.drafts.get(submission_id).await;
		self.state.is_loading = false;

		let submission = match result {
			Ok(submission) => submission,
			Err(e) => {
				self.state.error = Some(e.to_string());
				return Err(SessionError::Persistence(e.to_string()));
			},
		};
		if let Some(owner_id) = &self.owner_id {
			if &submission.owner_id != owner_id {
				return Err(SessionError::NotReady(
					"Draft belongs to another customer".into(),
				));
			}
		}
		if !submission.is_draft {
			return Err(SessionError::NotReady("Order already submitted".into()));
		}

		self.state = StepperState::from_submission(&submission);
		self.form = submission.to_patch();
		self.params = OrderParameters::default();
		self.form.apply_to_params(&mut self.params);
		self.quotes.clear_promo();

		if let Some(code) = &submission.promo_code {
			if let Err(e) = self.quotes.apply_promo(code).await {
				tracing::info!(
					submission_id = %truncate_id(&submission.id),
					error = %e,
					"Stored promo code no longer applies"
				);
				self.form.promo_code = Some(None);
				self.params.applied_promo_code = None;
			}
		}

		tracing::info!(submission_id = %truncate_id(&submission.id), "Resumed draft");
		self.publish(SessionEvent::Draft(DraftEvent::Resumed {
			submission_id: submission.id,
		}));
		Ok(())
	}

	/// Returns the session to a fresh wizard. Saved drafts are untouched.
	pub fn reset_state(&mut self) {
		self.state.reset();
		self.params = OrderParameters::default();
		self.form = SubmissionPatch::default();
		self.quotes.clear_promo();
	}

	/// Lists the signed-in customer's submissions, most recent first.
	pub async fn list_drafts(&self) -> Result<Vec<Submission>, SessionError> {
		let owner_id = self
			.owner_id
			.as_deref()
			.ok_or_else(|| SessionError::NotReady("Sign in to see saved drafts".into()))?;
		self.drafts
			.list_by_owner(owner_id)
			.await
			.map_err(|e| SessionError::Persistence(e.to_string()))
	}

	/// Deletes a submission. Deleting the session's own draft resets the session.
	pub async fn delete_draft(&mut self, submission_id: &str) -> Result<(), SessionError> {
		self.drafts
			.delete(submission_id)
			.await
			.map_err(|e| SessionError::Persistence(e.to_string()))?;
		if self.state.submission_id.as_deref() == Some(submission_id) {
			self.reset_state();
		}
		Ok(())
	}

	/// Applies autosave outcomes published since the last call.
	///
	/// Only outcomes for the session's current draft are applied.
	pub fn sync_autosave_status(&mut self) {
		loop {
			match self.events.try_recv() {
				Ok(SessionEvent::Autosave(AutosaveEvent::Saved {
					submission_id,
					saved_at,
				})) => {
					if self.state.submission_id.as_deref() == Some(submission_id.as_str()) {
						self.state.last_saved_at = Some(saved_at);
					}
				},
				Ok(_) => {},
				Err(TryRecvError::Lagged(skipped)) => {
					tracing::debug!(skipped, "Session fell behind on events");
				},
				Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
			}
		}
	}
}
