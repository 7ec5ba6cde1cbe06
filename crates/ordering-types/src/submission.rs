//! Draft submission record, partial updates and per-step payloads.
//!
//! A submission is created lazily when the customer leaves the welcome step,
//! mutated by step saves and autosaves, and finalized by submit. Partial
//! writes travel as [`SubmissionPatch`] so autosave and step save share one
//! merge rule.

use crate::{
	AcademicLevel, DeadlineUrgency, OrderParameters, PricingBreakdown, ServiceType, MIN_PAGES,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use validator::Validate;

/// Welcome / authentication step.
pub const STEP_WELCOME: u8 = 0;
/// Key details step: service, level, deadline, pages, sources.
pub const STEP_KEY_DETAILS: u8 = 1;
/// Instructions step: title, instructions, attached documents.
pub const STEP_INSTRUCTIONS: u8 = 2;
/// Review step: extras, promo code, terms.
pub const STEP_REVIEW: u8 = 3;
/// Highest step index of the wizard.
pub const LAST_STEP: u8 = STEP_REVIEW;

/// Reference to a document attached to the instructions. The file itself
/// lives in upload storage; only its handle is kept on the draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
	pub name: String,
	pub url: String,
	#[serde(default)]
	pub size_bytes: Option<u64>,
}

/// An in-progress or submitted order record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
	pub id: String,
	pub owner_id: String,
	pub is_draft: bool,
	pub current_step: u8,
	/// Strictly increasing, no duplicates.
	pub completed_steps: Vec<u8>,
	pub service_type: Option<ServiceType>,
	pub academic_level: Option<AcademicLevel>,
	pub deadline_urgency: Option<DeadlineUrgency>,
	pub subject_area: Option<String>,
	pub number_of_pages: Option<u32>,
	pub number_of_sources: Option<u32>,
	pub title: Option<String>,
	pub instructions: Option<String>,
	#[serde(default)]
	pub documents: Vec<DocumentRef>,
	#[serde(default)]
	pub selected_extras: Vec<String>,
	pub promo_code: Option<String>,
	#[serde(default)]
	pub terms_accepted: bool,
	/// Snapshot taken at submit time.
	pub pricing_breakdown: Option<PricingBreakdown>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	pub last_saved_at: Option<DateTime<Utc>>,
	pub submitted_at: Option<DateTime<Utc>>,
}

impl Submission {
	/// Creates an empty draft owned by `owner_id`.
	pub fn new_draft(id: impl Into<String>, owner_id: impl Into<String>, now: DateTime<Utc>) -> Self {
		Self {
			id: id.into(),
			owner_id: owner_id.into(),
			is_draft: true,
			current_step: STEP_KEY_DETAILS,
			completed_steps: vec![STEP_WELCOME],
			service_type: None,
			academic_level: None,
			deadline_urgency: None,
			subject_area: None,
			number_of_pages: None,
			number_of_sources: None,
			title: None,
			instructions: None,
			documents: Vec::new(),
			selected_extras: Vec::new(),
			promo_code: None,
			terms_accepted: false,
			pricing_breakdown: None,
			created_at: now,
			updated_at: now,
			last_saved_at: None,
			submitted_at: None,
		}
	}

	/// Merges a partial update. Absent patch fields leave the record untouched.
	pub fn apply_patch(&mut self, patch: &SubmissionPatch) {
		if let Some(value) = patch.service_type {
			self.service_type = Some(value);
		}
		if let Some(value) = patch.academic_level {
			self.academic_level = Some(value);
		}
		if let Some(value) = patch.deadline_urgency {
			self.deadline_urgency = Some(value);
		}
		if let Some(value) = &patch.subject_area {
			self.subject_area = Some(value.clone());
		}
		if let Some(value) = patch.number_of_pages {
			self.number_of_pages = Some(value);
		}
		if let Some(value) = patch.number_of_sources {
			self.number_of_sources = Some(value);
		}
		if let Some(value) = &patch.title {
			self.title = Some(value.clone());
		}
		if let Some(value) = &patch.instructions {
			self.instructions = Some(value.clone());
		}
		if let Some(value) = &patch.documents {
			self.documents = value.clone();
		}
		if let Some(value) = &patch.selected_extras {
			self.selected_extras = value.clone();
		}
		if let Some(value) = &patch.promo_code {
			self.promo_code = value.clone();
		}
		if let Some(value) = patch.terms_accepted {
			self.terms_accepted = value;
		}
		if let Some(value) = &patch.pricing_breakdown {
			self.pricing_breakdown = Some(value.clone());
		}
	}

	/// Records `step` as completed and moves `current_step` past it.
	pub fn record_step_completed(&mut self, step: u8) {
		if let Err(position) = self.completed_steps.binary_search(&step) {
			self.completed_steps.insert(position, step);
		}
		self.current_step = self.current_step.max(step.saturating_add(1)).min(LAST_STEP);
	}

	/// The editable fields of this submission as a patch.
	///
	/// Only fields that are set on the record appear in the patch.
	pub fn to_patch(&self) -> SubmissionPatch {
		SubmissionPatch {
			service_type: self.service_type,
			academic_level: self.academic_level,
			deadline_urgency: self.deadline_urgency,
			subject_area: self.subject_area.clone(),
			number_of_pages: self.number_of_pages,
			number_of_sources: self.number_of_sources,
			title: self.title.clone(),
			instructions: self.instructions.clone(),
			documents: (!self.documents.is_empty()).then(|| self.documents.clone()),
			selected_extras: (!self.selected_extras.is_empty()).then(|| self.selected_extras.clone()),
			promo_code: self.promo_code.clone().map(Some),
			terms_accepted: None,
			pricing_breakdown: None,
		}
	}

	/// Order parameters stored on the draft, if the key details are present.
	pub fn order_parameters(&self) -> Option<OrderParameters> {
		Some(OrderParameters {
			academic_level: self.academic_level?,
			service_type: self.service_type?,
			deadline_urgency: self.deadline_urgency?,
			subject_area: self.subject_area.clone(),
			number_of_pages: self.number_of_pages.unwrap_or(MIN_PAGES),
			number_of_sources: self.number_of_sources.unwrap_or(0),
			selected_extra_ids: self.selected_extras.iter().cloned().collect(),
			applied_promo_code: self.promo_code.clone(),
		})
	}
}

/// Partial update of a submission. Used by autosave and by step saves.
///
/// `promo_code` is doubly optional: `Some(None)` clears the stored code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionPatch {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub service_type: Option<ServiceType>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub academic_level: Option<AcademicLevel>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub deadline_urgency: Option<DeadlineUrgency>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub subject_area: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub number_of_pages: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub number_of_sources: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub title: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub instructions: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub documents: Option<Vec<DocumentRef>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub selected_extras: Option<Vec<String>>,
	/// `Some(None)` clears the stored code; serialized as `null`.
	#[serde(
		default,
		skip_serializing_if = "Option::is_none",
		deserialize_with = "crate::utils::deserialize_double_option"
	)]
	pub promo_code: Option<Option<String>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub terms_accepted: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub pricing_breakdown: Option<PricingBreakdown>,
}

impl SubmissionPatch {
	pub fn is_empty(&self) -> bool {
		self == &SubmissionPatch::default()
	}

	/// Layers `newer` on top of this patch; fields set in `newer` win.
	pub fn merge(&mut self, newer: &SubmissionPatch) {
		merge_field(&mut self.service_type, &newer.service_type);
		merge_field(&mut self.academic_level, &newer.academic_level);
		merge_field(&mut self.deadline_urgency, &newer.deadline_urgency);
		merge_field(&mut self.subject_area, &newer.subject_area);
		merge_field(&mut self.number_of_pages, &newer.number_of_pages);
		merge_field(&mut self.number_of_sources, &newer.number_of_sources);
		merge_field(&mut self.title, &newer.title);
		merge_field(&mut self.instructions, &newer.instructions);
		merge_field(&mut self.documents, &newer.documents);
		merge_field(&mut self.selected_extras, &newer.selected_extras);
		merge_field(&mut self.promo_code, &newer.promo_code);
		merge_field(&mut self.terms_accepted, &newer.terms_accepted);
		merge_field(&mut self.pricing_breakdown, &newer.pricing_breakdown);
	}

	/// Applies the price-relevant fields of this patch to `params`.
	pub fn apply_to_params(&self, params: &mut OrderParameters) {
		if let Some(value) = self.academic_level {
			params.academic_level = value;
		}
		if let Some(value) = self.service_type {
			params.service_type = value;
		}
		if let Some(value) = self.deadline_urgency {
			params.deadline_urgency = value;
		}
		if let Some(value) = &self.subject_area {
			params.subject_area = Some(value.clone());
		}
		if let Some(value) = self.number_of_pages {
			params.number_of_pages = value;
		}
		if let Some(value) = self.number_of_sources {
			params.number_of_sources = value;
		}
		if let Some(value) = &self.selected_extras {
			params.selected_extra_ids = value.iter().cloned().collect();
		}
		if let Some(value) = &self.promo_code {
			params.applied_promo_code = value.clone();
		}
	}
}

fn merge_field<T: Clone>(target: &mut Option<T>, newer: &Option<T>) {
	if let Some(value) = newer {
		*target = Some(value.clone());
	}
}

/// Payload of the key details step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct KeyDetails {
	pub service_type: ServiceType,
	pub academic_level: AcademicLevel,
	pub deadline_urgency: DeadlineUrgency,
	#[validate(length(min = 1, max = 120, message = "Subject area is required"))]
	pub subject_area: String,
	#[validate(range(min = 1, max = 200, message = "Pages must be between 1 and 200"))]
	pub number_of_pages: u32,
	#[validate(range(max = 100, message = "At most 100 sources can be requested"))]
	pub number_of_sources: u32,
}

impl KeyDetails {
	pub fn to_patch(&self) -> SubmissionPatch {
		SubmissionPatch {
			service_type: Some(self.service_type),
			academic_level: Some(self.academic_level),
			deadline_urgency: Some(self.deadline_urgency),
			subject_area: Some(self.subject_area.clone()),
			number_of_pages: Some(self.number_of_pages),
			number_of_sources: Some(self.number_of_sources),
			..Default::default()
		}
	}
}

/// Payload of the instructions step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct InstructionDetails {
	#[validate(length(min = 3, max = 200, message = "Title must be 3 to 200 characters"))]
	pub title: String,
	#[validate(length(
		min = 10,
		max = 20000,
		message = "Instructions must be 10 to 20000 characters"
	))]
	pub instructions: String,
	#[serde(default)]
	#[validate(length(max = 10, message = "At most 10 documents can be attached"))]
	pub documents: Vec<DocumentRef>,
}

impl InstructionDetails {
	pub fn to_patch(&self) -> SubmissionPatch {
		SubmissionPatch {
			title: Some(self.title.clone()),
			instructions: Some(self.instructions.clone()),
			documents: Some(self.documents.clone()),
			..Default::default()
		}
	}
}

/// Payload of the review step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ReviewDetails {
	#[serde(default)]
	pub selected_extras: BTreeSet<String>,
	#[validate(length(min = 1, max = 32, message = "Promo code must be 1 to 32 characters"))]
	pub promo_code: Option<String>,
	#[serde(default)]
	pub terms_accepted: bool,
}

impl ReviewDetails {
	pub fn to_patch(&self) -> SubmissionPatch {
		SubmissionPatch {
			selected_extras: Some(self.selected_extras.iter().cloned().collect()),
			promo_code: Some(self.promo_code.clone()),
			terms_accepted: Some(self.terms_accepted),
			..Default::default()
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn draft() -> Submission {
		Submission::new_draft("sub-1", "owner-1", Utc::now())
	}

	#[test]
	fn test_new_draft_starts_past_welcome() {
		let submission = draft();
		assert!(submission.is_draft);
		assert_eq!(submission.completed_steps, vec![STEP_WELCOME]);
		assert_eq!(submission.current_step, STEP_KEY_DETAILS);
	}

	#[test]
	fn test_record_step_completed_keeps_steps_sorted_and_unique() {
		let mut submission = draft();
		submission.record_step_completed(2);
		submission.record_step_completed(1);
		submission.record_step_completed(2);
		assert_eq!(submission.completed_steps, vec![0, 1, 2]);
		assert_eq!(submission.current_step, 3);

		submission.record_step_completed(3);
		assert_eq!(submission.current_step, LAST_STEP);
	}

	#[test]
	fn test_patch_only_touches_present_fields() {
		let mut submission = draft();
		submission.title = Some("Kept".into());
		submission.promo_code = Some("SAVE10".into());

		submission.apply_patch(&SubmissionPatch {
			number_of_pages: Some(4),
			..Default::default()
		});
		assert_eq!(submission.number_of_pages, Some(4));
		assert_eq!(submission.title.as_deref(), Some("Kept"));
		assert_eq!(submission.promo_code.as_deref(), Some("SAVE10"));

		submission.apply_patch(&SubmissionPatch {
			promo_code: Some(None),
			..Default::default()
		});
		assert_eq!(submission.promo_code, None);
	}

	#[test]
	fn test_cleared_promo_survives_json() {
		let clear = SubmissionPatch {
			promo_code: Some(None),
			..Default::default()
		};
		let json = serde_json::to_string(&clear).unwrap();
		assert_eq!(json, r#"{"promo_code":null}"#);
		assert_eq!(serde_json::from_str::<SubmissionPatch>(&json).unwrap(), clear);

		let untouched: SubmissionPatch = serde_json::from_str("{}").unwrap();
		assert_eq!(untouched.promo_code, None);

		let mut submission = draft();
		submission.promo_code = Some("SAVE10".into());
		submission.apply_patch(&serde_json::from_str(&json).unwrap());
		assert_eq!(submission.promo_code, None);
	}

	#[test]
	fn test_order_parameters_require_key_details() {
		let mut submission = draft();
		assert!(submission.order_parameters().is_none());

		submission.apply_patch(
			&KeyDetails {
				service_type: ServiceType::Editing,
				academic_level: AcademicLevel::Masters,
				deadline_urgency: DeadlineUrgency::Days5,
				subject_area: "History".into(),
				number_of_pages: 3,
				number_of_sources: 1,
			}
			.to_patch(),
		);
		let params = submission.order_parameters().unwrap();
		assert_eq!(params.service_type, ServiceType::Editing);
		assert_eq!(params.number_of_pages, 3);
	}

	#[test]
	fn test_key_details_validation() {
		let details = KeyDetails {
			service_type: ServiceType::Writing,
			academic_level: AcademicLevel::Undergraduate,
			deadline_urgency: DeadlineUrgency::Days7,
			subject_area: String::new(),
			number_of_pages: 0,
			number_of_sources: 0,
		};
		let err = details.validate().unwrap_err();
		let message = err.to_string();
		assert!(message.contains("subject_area"));
		assert!(message.contains("number_of_pages"));
	}

	#[test]
	fn test_instructions_validation_accepts_reasonable_input() {
		let details = InstructionDetails {
			title: "The causes of the First World War".into(),
			instructions: "Use at least three primary sources.".into(),
			documents: Vec::new(),
		};
		assert!(details.validate().is_ok());
	}

	#[test]
	fn test_merge_layers_newer_fields() {
		let mut form = SubmissionPatch {
			title: Some("First".into()),
			number_of_pages: Some(2),
			..Default::default()
		};
		form.merge(&SubmissionPatch {
			number_of_pages: Some(5),
			promo_code: Some(None),
			..Default::default()
		});
		assert_eq!(form.title.as_deref(), Some("First"));
		assert_eq!(form.number_of_pages, Some(5));
		assert_eq!(form.promo_code, Some(None));
	}

	#[test]
	fn test_submission_patch_round_trips_into_params() {
		let mut submission = draft();
		submission.academic_level = Some(AcademicLevel::Masters);
		submission.number_of_pages = Some(3);
		submission.selected_extras = vec!["top-writer".into()];

		let mut params = OrderParameters::default();
		submission.to_patch().apply_to_params(&mut params);
		assert_eq!(params.academic_level, AcademicLevel::Masters);
		assert_eq!(params.number_of_pages, 3);
		assert!(params.selected_extra_ids.contains("top-writer"));
		assert_eq!(params.service_type, ServiceType::Writing);
	}
}
