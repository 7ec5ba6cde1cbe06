//! Loader for configurations split across several files.
//!
//! The main file may name other files in `include`, as a string or an array
//! of strings, relative to the main file. Each included file contributes its
//! top-level sections. A section defined in two files is an error, as is a
//! file read twice.

use crate::{resolve_env_vars, Config, ConfigError};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Reads a main configuration file together with its includes.
pub struct ConfigLoader {
	base_dir: PathBuf,
	/// Canonical paths of every file read so far.
	seen: HashSet<PathBuf>,
	/// File that contributed each top-level section.
	owners: HashMap<String, PathBuf>,
}

impl ConfigLoader {
	pub fn new(base_dir: impl AsRef<Path>) -> Self {
		Self {
			base_dir: base_dir.as_ref().to_path_buf(),
			seen: HashSet::new(),
			owners: HashMap::new(),
		}
	}

	/// Loads `path` and everything it includes into one [`Config`].
	pub async fn load_config(&mut self, path: impl AsRef<Path>) -> Result<Config, ConfigError> {
		let main_path = self.locate(path.as_ref())?;
		let mut root = self.read_table(&main_path).await?;
		let includes = take_includes(&mut root)?;
		self.claim_sections(&root, &main_path)?;

		for include in &includes {
			let include_path = self.locate(include)?;
			let table = self.read_table(&include_path).await?;
			self.claim_sections(&table, &include_path)?;
			root.extend(table);
		}

		tracing::debug!(
			path = %main_path.display(),
			included = includes.len(),
			"Loaded configuration files"
		);

		let merged = toml::to_string(&toml::Value::Table(root))
			.map_err(|e| ConfigError::Parse(format!("Cannot re-serialize merged config: {}", e)))?;
		merged.parse()
	}

	/// Reads a file exactly once, resolves environment variables and parses it.
	async fn read_table(&mut self, path: &Path) -> Result<toml::Table, ConfigError> {
		let canonical = tokio::fs::canonicalize(path).await?;
		if !self.seen.insert(canonical.clone()) {
			return Err(ConfigError::Validation(format!(
				"{} is included more than once",
				canonical.display()
			)));
		}

		let content = resolve_env_vars(&tokio::fs::read_to_string(path).await?)?;
		Ok(toml::from_str(&content)?)
	}

	/// Records which file owns each section of `table`.
	fn claim_sections(&mut self, table: &toml::Table, path: &Path) -> Result<(), ConfigError> {
		for section in table.keys() {
			if let Some(owner) = self.owners.get(section) {
				return Err(ConfigError::Validation(format!(
					"Section '{}' is defined in both {} and {}",
					section,
					owner.display(),
					path.display()
				)));
			}
			self.owners.insert(section.clone(), path.to_path_buf());
		}
		Ok(())
	}

	fn locate(&self, path: &Path) -> Result<PathBuf, ConfigError> {
		let located = self.base_dir.join(path);
		if !located.exists() {
			return Err(ConfigError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("Configuration file not found: {}", located.display()),
			)));
		}
		Ok(located)
	}
}

/// Removes `include` from the root table and returns the listed paths.
fn take_includes(root: &mut toml::Table) -> Result<Vec<PathBuf>, ConfigError> {
	let invalid = || ConfigError::Validation("include must be a path or a list of paths".into());
	match root.remove("include") {
		None => Ok(Vec::new()),
		Some(toml::Value::String(path)) => Ok(vec![PathBuf::from(path)]),
		Some(toml::Value::Array(paths)) => paths
			.iter()
			.map(|path| path.as_str().map(PathBuf::from).ok_or_else(invalid))
			.collect(),
		Some(_) => Err(invalid()),
	}
}
