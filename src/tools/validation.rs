//! The typed input-validation descriptor described in `spec.md` §9
//! ("Dynamic input validation"): re-expresses a tool's JSON-schema-shaped
//! input contract as a small per-field constraint list plus a validator
//! that produces either the parsed arguments or a flat list of
//! human-readable errors.

use serde_json::Value;

/// The JSON type a field's value must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind
{
	String,
	Integer,
	Number,
	Boolean,
	Object,
	Array,
}

impl FieldKind
{
	fn matches(self, value: &Value) -> bool
	{
		match self {
			Self::String => value.is_string(),
			Self::Integer => value.as_i64().is_some() || value.as_u64().is_some(),
			Self::Number => value.is_number(),
			Self::Boolean => value.is_boolean(),
			Self::Object => value.is_object(),
			Self::Array => value.is_array(),
		}
	}

	fn name(self) -> &'static str
	{
		match self {
			Self::String => "string",
			Self::Integer => "integer",
			Self::Number => "number",
			Self::Boolean => "boolean",
			Self::Object => "object",
			Self::Array => "array",
		}
	}
}

/// One field of a tool's input schema.
///
/// `pattern` is a predicate rather than a compiled regex: every concrete
/// use in this crate (bare identifiers, dotted identifiers) is a simple
/// character-class check, and a predicate avoids pulling in a regex
/// engine for that.
#[derive(Clone, Copy)]
pub struct FieldSchema
{
	pub name: &'static str,
	pub kind: FieldKind,
	pub required: bool,
	pub enum_values: Option<&'static [&'static str]>,
	pub minimum: Option<f64>,
	pub maximum: Option<f64>,
	pub pattern: Option<(&'static str, fn(&str) -> bool)>,
}

impl FieldSchema
{
	/// A required field with no further constraints beyond its [`FieldKind`].
	#[must_use]
	pub const fn required(name: &'static str, kind: FieldKind) -> Self
	{
		Self {
			name,
			kind,
			required: true,
			enum_values: None,
			minimum: None,
			maximum: None,
			pattern: None,
		}
	}

	/// An optional field with no further constraints beyond its
	/// [`FieldKind`].
	#[must_use]
	pub const fn optional(name: &'static str, kind: FieldKind) -> Self
	{
		Self { required: false, ..Self::required(name, kind) }
	}

	#[must_use]
	pub const fn with_enum(mut self, values: &'static [&'static str]) -> Self
	{
		self.enum_values = Some(values);
		self
	}

	#[must_use]
	pub const fn with_range(mut self, minimum: f64, maximum: f64) -> Self
	{
		self.minimum = Some(minimum);
		self.maximum = Some(maximum);
		self
	}

	#[must_use]
	pub const fn with_pattern(mut self, description: &'static str, predicate: fn(&str) -> bool) -> Self
	{
		self.pattern = Some((description, predicate));
		self
	}
}

impl std::fmt::Debug for FieldSchema
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
	{
		f.debug_struct("FieldSchema")
			.field("name", &self.name)
			.field("kind", &self.kind)
			.field("required", &self.required)
			.finish_non_exhaustive()
	}
}

/// A tool's full input schema: an ordered list of field constraints.
pub type InputSchema = &'static [FieldSchema];

/// Validates `arguments` against `schema`.
///
/// On success, returns `arguments` unchanged — callers index into it by
/// field name, same as the source's validation-library pattern, just
/// without re-allocating into per-tool typed structs none of the ~190
/// external tool bodies this core doesn't own would agree on anyway.
///
/// On failure, returns every violated constraint as a human-readable
/// message, not just the first — so a client correcting its call can fix
/// every field in one round trip.
pub fn validate(schema: InputSchema, arguments: &Value) -> Result<Value, Vec<String>>
{
	let mut errors = Vec::new();
	let object = arguments.as_object();

	for field in schema {
		let value = object.and_then(|map| map.get(field.name));

		let Some(value) = value else {
			if field.required {
				errors.push(format!("missing required field `{}`", field.name));
			}
			continue;
		};

		if !field.kind.matches(value) {
			errors.push(format!(
				"field `{}` must be of type {}",
				field.name,
				field.kind.name()
			));
			continue;
		}

		if let Some(allowed) = field.enum_values {
			let as_str = value.as_str().unwrap_or_default();
			if !allowed.contains(&as_str) {
				errors.push(format!(
					"field `{}` must be one of {:?}",
					field.name, allowed
				));
			}
		}

		if let (Some(min), Some(max)) = (field.minimum, field.maximum) {
			if let Some(number) = value.as_f64() {
				if number < min || number > max {
					errors.push(format!(
						"field `{}` must be between {min} and {max}",
						field.name
					));
				}
			}
		}

		if let Some((description, predicate)) = field.pattern {
			if let Some(text) = value.as_str() {
				if !predicate(text) {
					errors.push(format!("field `{}` must match {description}", field.name));
				}
			}
		}
	}

	if errors.is_empty() { Ok(arguments.clone()) } else { Err(errors) }
}

#[cfg(test)]
mod tests
{
	use super::*;

	const SCHEMA: InputSchema = &[
		FieldSchema::required("table", FieldKind::String),
		FieldSchema::optional("limit", FieldKind::Integer).with_range(1.0, 1000.0),
		FieldSchema::optional("mode", FieldKind::String).with_enum(&["fast", "safe"]),
	];

	#[test]
	fn accepts_well_formed_arguments()
	{
		let arguments = serde_json::json!({ "table": "users", "limit": 10, "mode": "safe" });
		assert!(validate(SCHEMA, &arguments).is_ok());
	}

	#[test]
	fn reports_every_violation_at_once()
	{
		let arguments = serde_json::json!({ "limit": 5000, "mode": "bogus" });
		let errors = validate(SCHEMA, &arguments).unwrap_err();

		assert_eq!(errors.len(), 3);
		assert!(errors.iter().any(|e| e.contains("missing required field `table`")));
		assert!(errors.iter().any(|e| e.contains("between 1 and 1000")));
		assert!(errors.iter().any(|e| e.contains("must be one of")));
	}

	#[test]
	fn rejects_wrong_type()
	{
		let arguments = serde_json::json!({ "table": 123 });
		let errors = validate(SCHEMA, &arguments).unwrap_err();
		assert!(errors.iter().any(|e| e.contains("must be of type string")));
	}
}
