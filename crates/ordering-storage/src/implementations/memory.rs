//! In-memory storage backend.
//!
//! Data lives in a map behind a read-write lock and is lost on restart.
//! Used for tests and for sessions that do not need to survive the process.

use crate::{StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use ordering_types::{ConfigSchema, ImplementationRegistry, Schema, ValidationError};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Storage backend holding every value in process memory.
#[derive(Default)]
pub struct MemoryStorage {
	entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of stored keys.
	pub async fn len(&self) -> usize {
		self.entries.read().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.entries.read().await.is_empty()
	}
}

#[async_trait]
impl StorageInterface for MemoryStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		self.entries
			.read()
			.await
			.get(key)
			.cloned()
			.ok_or(StorageError::NotFound)
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		self.entries.write().await.insert(key.to_owned(), value);
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		self.entries.write().await.remove(key);
		Ok(())
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		Ok(self.entries.read().await.contains_key(key))
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryStorageSchema)
	}
}

/// Configuration schema for MemoryStorage. No fields.
pub struct MemoryStorageSchema;

impl ConfigSchema for MemoryStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

/// Factory function to create a memory storage backend from configuration.
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	MemoryStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;
	Ok(Box::new(MemoryStorage::new()))
}

/// Registry for the memory storage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_set_get_delete() {
		let storage = MemoryStorage::new();
		let key = "submissions:abc";

		storage.set_bytes(key, br#"{"id":"abc"}"#.to_vec()).await.unwrap();
		assert_eq!(storage.get_bytes(key).await.unwrap(), br#"{"id":"abc"}"#.to_vec());
		assert_eq!(storage.len().await, 1);

		storage.delete(key).await.unwrap();
		assert!(storage.is_empty().await);
		assert!(matches!(
			storage.get_bytes(key).await,
			Err(StorageError::NotFound)
		));
		// Deleting again is fine
		storage.delete(key).await.unwrap();
	}

	#[tokio::test]
	async fn test_set_replaces_value() {
		let storage = MemoryStorage::new();
		storage.set_bytes("submissions:abc", b"1".to_vec()).await.unwrap();
		storage.set_bytes("submissions:abc", b"2".to_vec()).await.unwrap();
		assert_eq!(storage.get_bytes("submissions:abc").await.unwrap(), b"2".to_vec());
		assert_eq!(storage.len().await, 1);
	}

	#[test]
	fn test_factory_accepts_empty_table() {
		let config = toml::Value::Table(toml::map::Map::new());
		assert!(create_storage(&config).is_ok());
	}
}
