//! Order parameters and the enums that drive pricing.
//!
//! Each enum carries its wire name (`as_str`), a parser (`FromStr`) and an
//! iterator over every variant so default tables can be checked for totality.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Error returned when parsing an enum from an unknown wire name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {kind}: {value}")]
pub struct UnknownVariant {
	pub kind: &'static str,
	pub value: String,
}

/// Academic level of the requested work. Drives the base per-page price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AcademicLevel {
	#[serde(rename = "high-school")]
	HighSchool,
	#[serde(rename = "undergraduate")]
	Undergraduate,
	#[serde(rename = "masters")]
	Masters,
	#[serde(rename = "phd")]
	Phd,
}

impl AcademicLevel {
	/// Returns the wire name of the level.
	pub fn as_str(&self) -> &'static str {
		match self {
			AcademicLevel::HighSchool => "high-school",
			AcademicLevel::Undergraduate => "undergraduate",
			AcademicLevel::Masters => "masters",
			AcademicLevel::Phd => "phd",
		}
	}

	/// Returns an iterator over all levels.
	pub fn all() -> impl Iterator<Item = Self> {
		[Self::HighSchool, Self::Undergraduate, Self::Masters, Self::Phd].into_iter()
	}
}

impl FromStr for AcademicLevel {
	type Err = UnknownVariant;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::all()
			.find(|level| level.as_str() == s)
			.ok_or_else(|| UnknownVariant {
				kind: "academic level",
				value: s.to_string(),
			})
	}
}

impl fmt::Display for AcademicLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Kind of work requested, each priced relative to full writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ServiceType {
	#[serde(rename = "writing")]
	Writing,
	#[serde(rename = "rewriting")]
	Rewriting,
	#[serde(rename = "editing")]
	Editing,
	#[serde(rename = "proofreading")]
	Proofreading,
	#[serde(rename = "problem-solving")]
	ProblemSolving,
}

impl ServiceType {
	/// Returns the wire name of the service.
	pub fn as_str(&self) -> &'static str {
		match self {
			ServiceType::Writing => "writing",
			ServiceType::Rewriting => "rewriting",
			ServiceType::Editing => "editing",
			ServiceType::Proofreading => "proofreading",
			ServiceType::ProblemSolving => "problem-solving",
		}
	}

	/// Returns an iterator over all services.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Writing,
			Self::Rewriting,
			Self::Editing,
			Self::Proofreading,
			Self::ProblemSolving,
		]
		.into_iter()
	}
}

impl FromStr for ServiceType {
	type Err = UnknownVariant;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::all()
			.find(|service| service.as_str() == s)
			.ok_or_else(|| UnknownVariant {
				kind: "service type",
				value: s.to_string(),
			})
	}
}

impl fmt::Display for ServiceType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Named turnaround tier with an associated price multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeadlineUrgency {
	#[serde(rename = "6h")]
	Hours6,
	#[serde(rename = "12h")]
	Hours12,
	#[serde(rename = "24h")]
	Hours24,
	#[serde(rename = "48h")]
	Hours48,
	#[serde(rename = "3d")]
	Days3,
	#[serde(rename = "5d")]
	Days5,
	#[serde(rename = "7d")]
	Days7,
	#[serde(rename = "14d")]
	Days14,
}

impl DeadlineUrgency {
	/// Returns the wire name of the tier.
	pub fn as_str(&self) -> &'static str {
		match self {
			DeadlineUrgency::Hours6 => "6h",
			DeadlineUrgency::Hours12 => "12h",
			DeadlineUrgency::Hours24 => "24h",
			DeadlineUrgency::Hours48 => "48h",
			DeadlineUrgency::Days3 => "3d",
			DeadlineUrgency::Days5 => "5d",
			DeadlineUrgency::Days7 => "7d",
			DeadlineUrgency::Days14 => "14d",
		}
	}

	/// Turnaround of the tier in hours.
	pub fn hours(&self) -> u32 {
		match self {
			DeadlineUrgency::Hours6 => 6,
			DeadlineUrgency::Hours12 => 12,
			DeadlineUrgency::Hours24 => 24,
			DeadlineUrgency::Hours48 => 48,
			DeadlineUrgency::Days3 => 72,
			DeadlineUrgency::Days5 => 120,
			DeadlineUrgency::Days7 => 168,
			DeadlineUrgency::Days14 => 336,
		}
	}

	/// Returns an iterator over all tiers, most urgent first.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Hours6,
			Self::Hours12,
			Self::Hours24,
			Self::Hours48,
			Self::Days3,
			Self::Days5,
			Self::Days7,
			Self::Days14,
		]
		.into_iter()
	}
}

impl FromStr for DeadlineUrgency {
	type Err = UnknownVariant;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::all()
			.find(|tier| tier.as_str() == s)
			.ok_or_else(|| UnknownVariant {
				kind: "deadline urgency",
				value: s.to_string(),
			})
	}
}

impl fmt::Display for DeadlineUrgency {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Minimum number of pages an order may have.
pub const MIN_PAGES: u32 = 1;

/// The mutable fields that drive the price of an order.
///
/// Owned by the active step form and mirrored into the draft submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderParameters {
	pub academic_level: AcademicLevel,
	pub service_type: ServiceType,
	pub deadline_urgency: DeadlineUrgency,
	pub subject_area: Option<String>,
	pub number_of_pages: u32,
	pub number_of_sources: u32,
	#[serde(default)]
	pub selected_extra_ids: BTreeSet<String>,
	pub applied_promo_code: Option<String>,
}

impl OrderParameters {
	/// Returns a copy with page and source counts clamped to their minima.
	///
	/// The pricing engine assumes clamped input; callers run this first.
	pub fn clamped(&self) -> Self {
		Self {
			number_of_pages: self.number_of_pages.max(MIN_PAGES),
			..self.clone()
		}
	}
}

impl Default for OrderParameters {
	fn default() -> Self {
		Self {
			academic_level: AcademicLevel::Undergraduate,
			service_type: ServiceType::Writing,
			deadline_urgency: DeadlineUrgency::Days7,
			subject_area: None,
			number_of_pages: MIN_PAGES,
			number_of_sources: 0,
			selected_extra_ids: BTreeSet::new(),
			applied_promo_code: None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_wire_names_round_trip_through_from_str() {
		for level in AcademicLevel::all() {
			assert_eq!(level.as_str().parse::<AcademicLevel>().unwrap(), level);
		}
		for service in ServiceType::all() {
			assert_eq!(service.as_str().parse::<ServiceType>().unwrap(), service);
		}
		for tier in DeadlineUrgency::all() {
			assert_eq!(tier.as_str().parse::<DeadlineUrgency>().unwrap(), tier);
		}
	}

	#[test]
	fn test_serde_uses_wire_names() {
		let json = serde_json::to_string(&AcademicLevel::HighSchool).unwrap();
		assert_eq!(json, "\"high-school\"");
		let tier: DeadlineUrgency = serde_json::from_str("\"48h\"").unwrap();
		assert_eq!(tier, DeadlineUrgency::Hours48);
	}

	#[test]
	fn test_unknown_variant_error() {
		let err = "36h".parse::<DeadlineUrgency>().unwrap_err();
		assert_eq!(err.to_string(), "Unknown deadline urgency: 36h");
	}

	#[test]
	fn test_clamped_raises_pages_to_minimum() {
		let params = OrderParameters {
			number_of_pages: 0,
			..Default::default()
		};
		assert_eq!(params.clamped().number_of_pages, 1);

		let params = OrderParameters {
			number_of_pages: 7,
			..Default::default()
		};
		assert_eq!(params.clamped().number_of_pages, 7);
	}
}
