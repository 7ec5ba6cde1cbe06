//! Configuration validation for implementation-specific sections.
//!
//! Every storage backend, draft store and catalog source receives its own raw
//! TOML section. Before building, the section is checked against a [`Schema`]
//! so a typo surfaces as a named field error instead of a silent default.

use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during validation.
#[derive(Debug, Error)]
pub enum ValidationError {
	/// A required field is missing.
	#[error("Missing required field: {0}")]
	MissingField(String),
	/// A field has an invalid value.
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	/// A field has the wrong type.
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
	/// The section could not be deserialized.
	#[error("Failed to deserialize config: {0}")]
	DeserializationError(String),
}

/// Expected type of a configuration field.
#[derive(Debug)]
pub enum FieldType {
	String,
	/// Integer with optional inclusive bounds.
	Integer { min: Option<i64>, max: Option<i64> },
	Boolean,
	/// Decimal amount, written either as a TOML number or a string such as "2.50".
	Decimal { min: Option<Decimal> },
	/// Array whose elements all have the inner type.
	Array(Box<FieldType>),
	/// Nested table with its own schema.
	Table(Schema),
	/// Table with arbitrary keys whose values all have the inner type.
	Map(Box<FieldType>),
}

/// Custom check run after the type check. Returns the error message on failure.
pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

/// A named field in a schema.
pub struct Field {
	pub name: String,
	pub field_type: FieldType,
	pub validator: Option<FieldValidator>,
}

impl std::fmt::Debug for Field {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Field")
			.field("name", &self.name)
			.field("field_type", &self.field_type)
			.field("validator", &self.validator.is_some())
			.finish()
	}
}

impl Field {
	/// Creates a field without a custom validator.
	///
	/// # Arguments
	///
	/// * `name` - Key of the field in its TOML table
	/// * `field_type` - Type the value must have
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			validator: None,
		}
	}

	/// Adds a custom validator to this field.
	///
	/// The validator runs only after the type check has passed.
	///
	/// # Arguments
	///
	/// * `validator` - Receives the field value and returns the error message
	///   when the value is not acceptable
	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}

	fn check(&self, value: &toml::Value) -> Result<(), ValidationError> {
		validate_field_type(&self.name, value, &self.field_type)?;
		if let Some(validator) = &self.validator {
			validator(value).map_err(|message| ValidationError::InvalidValue {
				field: self.name.clone(),
				message,
			})?;
		}
		Ok(())
	}
}

/// Required and optional fields of a TOML table.
#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	/// Creates a schema.
	///
	/// # Arguments
	///
	/// * `required` - Fields that must be present
	/// * `optional` - Fields that are checked only when present
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Validates a TOML value against this schema.
	///
	/// Required fields must be present; optional fields are checked only when
	/// present. Nested tables are validated recursively and their errors carry
	/// the dotted path of the field.
	///
	/// # Arguments
	///
	/// * `config` - The section to check; must be a TOML table
	///
	/// # Returns
	///
	/// * `Ok(())` if every present field is acceptable
	/// * `Err(ValidationError)` naming the first field that is not
	///
	/// # Errors
	///
	/// Returns an error if:
	/// - `config` is not a table
	/// - A required field is missing
	/// - A field has the wrong type, or a decimal or integer is out of bounds
	/// - A custom validator refuses the value
	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config
			.as_table()
			.ok_or_else(|| mismatch("root", "table", config))?;

		for field in &self.required {
			let value = table
				.get(&field.name)
				.ok_or_else(|| ValidationError::MissingField(field.name.clone()))?;
			field.check(value)?;
		}

		for field in &self.optional {
			if let Some(value) = table.get(&field.name) {
				field.check(value)?;
			}
		}

		Ok(())
	}
}

fn mismatch(field: &str, expected: &str, value: &toml::Value) -> ValidationError {
	ValidationError::TypeMismatch {
		field: field.to_string(),
		expected: expected.to_string(),
		actual: value.type_str().to_string(),
	}
}

/// Reads a decimal written as a TOML number or string.
///
/// # Returns
///
/// * `Some(Decimal)` for an integer, a float or a string holding a number
/// * `None` for any other value, or a string that does not parse
pub fn toml_decimal(value: &toml::Value) -> Option<Decimal> {
	match value {
		toml::Value::String(s) => Decimal::from_str(s.trim()).ok(),
		toml::Value::Integer(i) => Some(Decimal::from(*i)),
		toml::Value::Float(f) => Decimal::from_str(&f.to_string()).ok(),
		_ => None,
	}
}

fn prefix_field(parent: &str, err: ValidationError) -> ValidationError {
	match err {
		ValidationError::MissingField(f) => ValidationError::MissingField(format!("{}.{}", parent, f)),
		ValidationError::InvalidValue { field, message } => ValidationError::InvalidValue {
			field: format!("{}.{}", parent, field),
			message,
		},
		ValidationError::TypeMismatch {
			field,
			expected,
			actual,
		} => ValidationError::TypeMismatch {
			field: format!("{}.{}", parent, field),
			expected,
			actual,
		},
		other => other,
	}
}

/// Checks that `value` has the expected type.
///
/// Arrays and maps check each element; nested tables are validated against
/// their schema.
///
/// # Arguments
///
/// * `field_name` - Name used in error messages
/// * `value` - The value to check
/// * `expected_type` - The type the value must have
///
/// # Returns
///
/// * `Ok(())` if the value has the expected type
/// * `Err(ValidationError)` describing the mismatch
fn validate_field_type(
	field_name: &str,
	value: &toml::Value,
	expected_type: &FieldType,
) -> Result<(), ValidationError> {
	match expected_type {
		FieldType::String => {
			if !value.is_str() {
				return Err(mismatch(field_name, "string", value));
			}
		},
		FieldType::Integer { min, max } => {
			let int_val = value
				.as_integer()
				.ok_or_else(|| mismatch(field_name, "integer", value))?;
			if let Some(min_val) = min.filter(|min_val| int_val < *min_val) {
				return Err(ValidationError::InvalidValue {
					field: field_name.to_string(),
					message: format!("Value {} is less than minimum {}", int_val, min_val),
				});
			}
			if let Some(max_val) = max.filter(|max_val| int_val > *max_val) {
				return Err(ValidationError::InvalidValue {
					field: field_name.to_string(),
					message: format!("Value {} is greater than maximum {}", int_val, max_val),
				});
			}
		},
		FieldType::Boolean => {
			if !value.is_bool() {
				return Err(mismatch(field_name, "boolean", value));
			}
		},
		FieldType::Decimal { min } => {
			let amount = toml_decimal(value).ok_or_else(|| mismatch(field_name, "decimal", value))?;
			if let Some(min_val) = min.filter(|min_val| amount < *min_val) {
				return Err(ValidationError::InvalidValue {
					field: field_name.to_string(),
					message: format!("Value {} is less than minimum {}", amount, min_val),
				});
			}
		},
		FieldType::Array(inner_type) => {
			let array = value
				.as_array()
				.ok_or_else(|| mismatch(field_name, "array", value))?;
			for (i, item) in array.iter().enumerate() {
				validate_field_type(&format!("{}[{}]", field_name, i), item, inner_type)?;
			}
		},
		FieldType::Table(schema) => {
			schema
				.validate(value)
				.map_err(|e| prefix_field(field_name, e))?;
		},
		FieldType::Map(inner_type) => {
			let table = value
				.as_table()
				.ok_or_else(|| mismatch(field_name, "table", value))?;
			for (key, item) in table {
				validate_field_type(&format!("{}.{}", field_name, key), item, inner_type)?;
			}
		},
	}

	Ok(())
}

/// A configuration schema that can validate a TOML section.
///
/// Every implementation exposes one through its `config_schema` method so the
/// section can be checked before the implementation is built.
pub trait ConfigSchema: Send + Sync {
	/// Validates `config`, returning the first problem found.
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}

#[cfg(test)]
mod tests {
	use super::*;
	use rust_decimal_macros::dec;

	fn schema() -> Schema {
		Schema::new(
			vec![Field::new("path", FieldType::String)],
			vec![
				Field::new(
					"debounce_ms",
					FieldType::Integer {
						min: Some(0),
						max: Some(60_000),
					},
				),
				Field::new(
					"prices",
					FieldType::Map(Box::new(FieldType::Decimal {
						min: Some(Decimal::ZERO),
					})),
				),
			],
		)
	}

	#[test]
	fn test_missing_required_field() {
		let config: toml::Value = toml::from_str("debounce_ms = 10").unwrap();
		let err = schema().validate(&config).unwrap_err();
		assert!(matches!(err, ValidationError::MissingField(f) if f == "path"));
	}

	#[test]
	fn test_integer_bounds() {
		let config: toml::Value = toml::from_str("path = \"x\"\ndebounce_ms = 70000").unwrap();
		assert!(matches!(
			schema().validate(&config),
			Err(ValidationError::InvalidValue { .. })
		));
	}

	#[test]
	fn test_decimal_map_accepts_strings_and_numbers() {
		let config: toml::Value =
			toml::from_str("path = \"x\"\n[prices]\nphd = \"30.00\"\nmasters = 25").unwrap();
		assert!(schema().validate(&config).is_ok());

		let config: toml::Value = toml::from_str("path = \"x\"\n[prices]\nphd = \"-1\"").unwrap();
		let err = schema().validate(&config).unwrap_err();
		assert!(err.to_string().contains("prices.phd"));
	}

	#[test]
	fn test_toml_decimal() {
		assert_eq!(
			toml_decimal(&toml::Value::String("2.50".into())),
			Some(dec!(2.50))
		);
		assert_eq!(toml_decimal(&toml::Value::Integer(3)), Some(dec!(3)));
		assert_eq!(toml_decimal(&toml::Value::Float(1.5)), Some(dec!(1.5)));
		assert_eq!(toml_decimal(&toml::Value::Boolean(true)), None);
	}
}
