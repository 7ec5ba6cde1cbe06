//! Wizard stepper state machine.
//!
//! Tracks which of the four steps (welcome, key details, instructions,
//! review) the customer is on and which are completed. Forward navigation is
//! gated: a step is reachable only if it is at most one past the highest
//! completed step.

use chrono::{DateTime, Utc};
use ordering_types::{Submission, LAST_STEP, STEP_WELCOME};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Terminal phases entered after the review step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardPhase {
	#[default]
	Editing,
	/// Submitted; waiting for the payment provider.
	PaymentProcessing,
	PaymentComplete,
}

/// Navigation and persistence status of one wizard session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepperState {
	pub current_step: u8,
	pub completed_steps: BTreeSet<u8>,
	pub submission_id: Option<String>,
	pub is_loading: bool,
	pub is_saving: bool,
	pub last_saved_at: Option<DateTime<Utc>>,
	pub error: Option<String>,
	pub phase: WizardPhase,
}

impl StepperState {
	pub fn new() -> Self {
		Self::default()
	}

	/// Rebuilds the state from a persisted submission.
	pub fn from_submission(submission: &Submission) -> Self {
		Self {
			current_step: submission.current_step.min(LAST_STEP),
			completed_steps: submission
				.completed_steps
				.iter()
				.copied()
				.filter(|step| *step <= LAST_STEP)
				.collect(),
			submission_id: Some(submission.id.clone()),
			is_loading: false,
			is_saving: false,
			last_saved_at: submission.last_saved_at,
			error: None,
			phase: if submission.is_draft {
				WizardPhase::Editing
			} else {
				WizardPhase::PaymentProcessing
			},
		}
	}

	/// Highest step that may be shown: one past the highest completed step.
	fn frontier(&self) -> u8 {
		self.completed_steps
			.last()
			.map_or(STEP_WELCOME, |highest| highest.saturating_add(1))
			.min(LAST_STEP)
	}

	pub fn can_navigate_to_step(&self, step: u8) -> bool {
		step <= self.frontier()
	}

	pub fn is_step_completed(&self, step: u8) -> bool {
		self.completed_steps.contains(&step)
	}

	/// Moves to `step` if it is reachable. Returns whether it moved.
	pub fn go_to_step(&mut self, step: u8) -> bool {
		if !self.can_navigate_to_step(step) {
			tracing::debug!(step, current_step = self.current_step, "Navigation blocked");
			return false;
		}
		self.current_step = step;
		true
	}

	pub fn next_step(&mut self) {
		self.current_step = self.current_step.saturating_add(1).min(LAST_STEP);
	}

	pub fn previous_step(&mut self) {
		self.current_step = self.current_step.saturating_sub(1);
	}

	/// Marks `step` as completed. Completing a step twice has no further effect.
	pub fn complete_step(&mut self, step: u8) {
		if step <= LAST_STEP {
			self.completed_steps.insert(step);
		}
	}

	/// Whether every step has been completed.
	pub fn all_steps_completed(&self) -> bool {
		(STEP_WELCOME..=LAST_STEP).all(|step| self.is_step_completed(step))
	}

	pub fn reset(&mut self) {
		*self = Self::default();
	}
}
