//! State management for wizard sessions.
//!
//! Provides the stepper state machine that gates navigation between the
//! wizard's steps.

pub mod stepper;

pub use stepper::{StepperState, WizardPhase};
