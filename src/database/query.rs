//! Helpers for building and binding SQL statements dynamically.
//!
//! Tool handlers receive loosely-typed invocation arguments and need to
//! bind them as query parameters without ever interpolating them into the
//! SQL text. [`Param`] is the type-erased value tool handlers bind;
//! [`bind_params`] and [`IdentifierExt`] are the two safe ways a handler
//! is allowed to get a caller-controlled value into a statement.

use std::fmt;

use derive_more::{Display, Error};
use sqlx::Arguments;
use sqlx::mysql::MySqlArguments;

/// A type-erased bind parameter.
///
/// This exists because tool handlers work with loosely-typed JSON-ish
/// invocation arguments; `Param` is the narrow waist between "whatever a
/// validated tool input produced" and `sqlx`'s statically-typed
/// [`Encode`][sqlx::Encode] machinery.
#[derive(Debug, Clone, PartialEq, derive_more::From)]
pub enum Param
{
	/// SQL `NULL`.
	Null,

	/// A boolean, encoded as `TINYINT(1)`.
	Bool(bool),

	/// A signed integer.
	I64(i64),

	/// An unsigned integer (e.g. an auto-increment id read back as a
	/// parameter for a later statement).
	U64(u64),

	/// A floating-point value.
	F64(f64),

	/// Text.
	String(String),

	/// A pre-serialized JSON document, bound via the `JSON` column type.
	Json(serde_json::Value),
}

impl From<&str> for Param
{
	fn from(value: &str) -> Self
	{
		Self::String(value.to_owned())
	}
}

/// Binds a slice of [`Param`]s onto a fresh [`MySqlArguments`], in order.
#[must_use]
pub fn bind_params(params: &[Param]) -> MySqlArguments
{
	let mut args = MySqlArguments::default();

	for param in params {
		match param {
			Param::Null => args.add(Option::<i64>::None).expect("binding NULL never fails"),
			Param::Bool(value) => args.add(value).expect("binding bool never fails"),
			Param::I64(value) => args.add(value).expect("binding i64 never fails"),
			Param::U64(value) => {
				args.add(i64::try_from(*value).unwrap_or(i64::MAX)).expect("binding u64 never fails");
			},
			Param::F64(value) => args.add(value).expect("binding f64 never fails"),
			Param::String(value) => args.add(value).expect("binding string never fails"),
			Param::Json(value) => {
				args.add(sqlx::types::Json(value)).expect("binding json never fails");
			},
		}
	}

	args
}

/// A validated SQL identifier (table, column, index, schema, savepoint, or
/// event name).
///
/// Construction is the only way to get one of these, and construction
/// checks the identifier against `^[A-Za-z_][A-Za-z0-9_]*$` (or the
/// qualified `id(.id)?` shape via [`Identifier::qualified`]). Tool
/// handlers interpolate `Identifier`s directly into SQL text; they never
/// interpolate a raw caller-provided string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier(String);

/// A caller-provided name failed identifier validation.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
#[display("invalid identifier: {_0:?}")]
pub struct InvalidIdentifier(pub String);

impl Identifier
{
	/// Validates `name` against `^[A-Za-z_][A-Za-z0-9_]*$`.
	pub fn new(name: impl Into<String>) -> Result<Self, InvalidIdentifier>
	{
		let name = name.into();

		if is_valid_bare_identifier(&name) { Ok(Self(name)) } else { Err(InvalidIdentifier(name)) }
	}

	/// Validates a qualified `schema.table`-style name against
	/// `^id(\.id)?$`, where each `id` independently satisfies
	/// [`Identifier::new`]'s rule.
	pub fn qualified(name: impl Into<String>) -> Result<Self, InvalidIdentifier>
	{
		let name = name.into();
		let valid = match name.split_once('.') {
			Some((schema, table)) => {
				is_valid_bare_identifier(schema) && is_valid_bare_identifier(table)
			},
			None => is_valid_bare_identifier(&name),
		};

		if valid { Ok(Self(name)) } else { Err(InvalidIdentifier(name)) }
	}

	/// The validated identifier text, safe to interpolate into SQL.
	#[must_use]
	pub fn as_str(&self) -> &str
	{
		&self.0
	}
}

impl fmt::Display for Identifier
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
	{
		f.write_str(&self.0)
	}
}

fn is_valid_bare_identifier(name: &str) -> bool
{
	let mut chars = name.chars();

	match chars.next() {
		Some(first) if first.is_ascii_alphabetic() || first == '_' => {},
		_ => return false,
	}

	chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Escapes a caller-provided string for safe use inside a `LIKE` pattern
/// that will itself be interpolated (rather than bound) into a `SHOW …
/// LIKE` statement, per `spec.md` §4.4.
///
/// Escapes `\`, `%`, and `_` with a backslash, then wraps the value in
/// single quotes, doubling any embedded single quote. Callers should
/// still prefer binding as a parameter wherever the statement's shape
/// allows it; this exists only for the small set of server statements
/// that cannot be parameterized at all.
#[must_use]
pub fn escape_like_literal(raw: &str) -> String
{
	let mut escaped = String::with_capacity(raw.len() + 2);
	escaped.push('\'');

	for c in raw.chars() {
		match c {
			'\\' | '%' | '_' => {
				escaped.push('\\');
				escaped.push(c);
			},
			'\'' => escaped.push_str("''"),
			other => escaped.push(other),
		}
	}

	escaped.push('\'');
	escaped
}

#[cfg(test)]
mod tests
{
	use super::*;

	#[test]
	fn accepts_valid_identifiers()
	{
		assert!(Identifier::new("users").is_ok());
		assert!(Identifier::new("_internal").is_ok());
		assert!(Identifier::new("col1").is_ok());
	}

	#[test]
	fn rejects_injection_attempts()
	{
		assert!(Identifier::new("users; DROP TABLE t").is_err());
		assert!(Identifier::new("users`").is_err());
		assert!(Identifier::new("").is_err());
		assert!(Identifier::new("1users").is_err());
	}

	#[test]
	fn qualified_accepts_dotted_pairs()
	{
		assert!(Identifier::qualified("db.table").is_ok());
		assert!(Identifier::qualified("id").is_ok());
		assert!(Identifier::qualified("db.table; --").is_err());
		assert!(Identifier::qualified("a.b.c").is_err());
	}

	#[test]
	fn escapes_like_metacharacters()
	{
		assert_eq!(escape_like_literal("50%_off"), "'50\\%\\_off'");
		assert_eq!(escape_like_literal("O'Brien"), "'O''Brien'");
	}
}
