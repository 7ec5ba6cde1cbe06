//! Events published by a wizard session.
//!
//! Background work (autosave, catalog fallback) reports through these events
//! instead of mutating the session directly. Consumers subscribe through the
//! session's event bus.

use crate::PricingBreakdown;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Main event type for a wizard session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
	/// Events from the draft lifecycle.
	Draft(DraftEvent),
	/// Events from the autosave channel.
	Autosave(AutosaveEvent),
	/// Events from pricing and promo resolution.
	Pricing(PricingEvent),
}

/// Events related to the draft submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DraftEvent {
	/// A draft was created when leaving the welcome step.
	Created { submission_id: String },
	/// Draft creation failed; the wizard continues without a backing draft.
	CreationFailed { error: String },
	/// A step was saved and completed.
	StepSaved { submission_id: String, step: u8 },
	/// A step save failed; the step stays incomplete.
	StepSaveFailed {
		submission_id: Option<String>,
		step: u8,
		error: String,
	},
	/// A draft was loaded back into a session.
	Resumed { submission_id: String },
	/// The draft was finalized.
	Submitted {
		submission_id: String,
		breakdown: PricingBreakdown,
	},
}

/// Events related to background autosave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AutosaveEvent {
	/// A snapshot was written.
	Saved {
		submission_id: String,
		saved_at: DateTime<Utc>,
	},
	/// A snapshot equal to the last written one was dropped.
	Skipped { submission_id: String },
	/// A snapshot write failed. Logged only.
	Failed { submission_id: String, error: String },
}

/// Events related to pricing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PricingEvent {
	/// The remote catalog was unavailable and defaults are in use.
	CatalogFallback { reason: String },
	/// A promo code was validated and applied.
	PromoApplied { code: String },
	/// A promo code was rejected; any previously applied promo was cleared.
	PromoRejected { code: String, message: String },
	/// The applied promo code was removed.
	PromoCleared,
}
