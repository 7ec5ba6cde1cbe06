//! Storage-related types.

use std::str::FromStr;

/// Namespaces of persisted collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Draft and submitted order records, keyed by submission id.
	Submissions,
	/// Index from owner id to that owner's submission ids.
	SubmissionsByOwner,
}

impl StorageKey {
	/// Returns the string representation of the storage key.
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Submissions => "submissions",
			StorageKey::SubmissionsByOwner => "submissions_by_owner",
		}
	}

	/// Returns an iterator over all StorageKey variants.
	pub fn all() -> impl Iterator<Item = Self> {
		[Self::Submissions, Self::SubmissionsByOwner].into_iter()
	}
}

impl FromStr for StorageKey {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::all().find(|key| key.as_str() == s).ok_or(())
	}
}

impl From<StorageKey> for &'static str {
	fn from(key: StorageKey) -> Self {
		key.as_str()
	}
}
