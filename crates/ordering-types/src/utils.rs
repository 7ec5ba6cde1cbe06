//! Helper utilities shared across the workspace.

use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::hash::Hash;
use std::str::FromStr;

/// Current UNIX timestamp in seconds, or 0 if the clock is before the epoch.
pub fn current_timestamp() -> u64 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.map(|d| d.as_secs())
		.unwrap_or(0)
}

/// Shortens an identifier for log output: first 8 characters followed by "..".
pub fn truncate_id(id: &str) -> String {
	if id.chars().count() <= 8 {
		id.to_string()
	} else {
		let prefix: String = id.chars().take(8).collect();
		format!("{}..", prefix)
	}
}

/// Deserializes a string-keyed map, keeping only entries whose key parses.
pub fn deserialize_known_keys<'de, D, K, V>(
	deserializer: D,
) -> Result<HashMap<K, V>, D::Error>
where
	D: Deserializer<'de>,
	K: FromStr + Eq + Hash,
	V: Deserialize<'de>,
{
	let raw: HashMap<String, V> = HashMap::deserialize(deserializer)?;
	Ok(raw
		.into_iter()
		.filter_map(|(key, value)| key.parse().ok().map(|key| (key, value)))
		.collect())
}

/// Deserializes a field that tells an absent value apart from `null`.
///
/// Pair with `#[serde(default)]`: an absent field stays `None`, an explicit
/// `null` becomes `Some(None)`.
pub fn deserialize_double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
	D: Deserializer<'de>,
	T: Deserialize<'de>,
{
	Option::<T>::deserialize(deserializer).map(Some)
}
