//! The scope hierarchy: `full` ⇒ everything, `admin` ⇒ read+write,
//! `write` ⇒ read, plus the `db:<name>` / `table:<db>:<name>` patterns.

use std::fmt;

/// A single OAuth scope, parsed from one space-delimited token of the
/// JWT `scope` claim (or of a tool's `requiredScopes` list).
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Scope
{
	Read,
	Write,
	Admin,
	Full,
	Db(String),
	Table(String, String),
}

impl Scope
{
	/// Parses one scope token.
	///
	/// Accepts the closed literals `read`/`write`/`admin`/`full`, plus the
	/// `db:<name>` and `table:<db>:<name>` patterns. Anything else is
	/// rejected — an unrecognized scope string should never silently grant
	/// nothing; it's a configuration error.
	pub fn parse(raw: &str) -> Result<Self, String>
	{
		match raw {
			"read" => Ok(Self::Read),
			"write" => Ok(Self::Write),
			"admin" => Ok(Self::Admin),
			"full" => Ok(Self::Full),
			other => {
				if let Some(table) = other.strip_prefix("table:") {
					let (db, name) = table
						.split_once(':')
						.ok_or_else(|| format!("malformed table scope: {other:?}"))?;

					return Ok(Self::Table(db.to_owned(), name.to_owned()));
				}

				if let Some(db) = other.strip_prefix("db:") {
					return Ok(Self::Db(db.to_owned()));
				}

				Err(format!("unrecognized scope: {other:?}"))
			},
		}
	}

	/// Parses a space-delimited scope string (the JWT `scope` claim shape)
	/// into a set of [`Scope`]s. Unparseable tokens are skipped rather
	/// than failing the whole claim — a forward-compatible unknown scope
	/// string shouldn't invalidate an otherwise-valid token.
	#[must_use]
	pub fn parse_space_delimited(raw: &str) -> Vec<Self>
	{
		raw.split_whitespace().filter_map(|token| Self::parse(token).ok()).collect()
	}

	/// Whether `self` (something the caller *has*) dominates `required`
	/// (something a tool *demands*) under the hierarchy in `spec.md`
	/// §4.6: `full` dominates everything; `admin` dominates `read` and
	/// `write`; `write` dominates `read`; `db:<x>` dominates any
	/// `table:<x>:*`; otherwise two scopes dominate only if equal.
	#[must_use]
	pub fn dominates(&self, required: &Self) -> bool
	{
		if self == required {
			return true;
		}

		match self {
			Self::Full => true,
			Self::Admin => matches!(required, Self::Read | Self::Write),
			Self::Write => matches!(required, Self::Read),
			Self::Db(db) => match required {
				Self::Db(other) => db == other,
				Self::Table(other_db, _) => db == other_db,
				_ => false,
			},
			_ => false,
		}
	}
}

impl fmt::Display for Scope
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
	{
		match self {
			Self::Read => f.write_str("read"),
			Self::Write => f.write_str("write"),
			Self::Admin => f.write_str("admin"),
			Self::Full => f.write_str("full"),
			Self::Db(name) => write!(f, "db:{name}"),
			Self::Table(db, table) => write!(f, "table:{db}:{table}"),
		}
	}
}

impl TryFrom<String> for Scope
{
	type Error = String;

	fn try_from(value: String) -> Result<Self, Self::Error>
	{
		Self::parse(&value)
	}
}

impl From<Scope> for String
{
	fn from(scope: Scope) -> Self
	{
		scope.to_string()
	}
}

/// Returns whether any scope in `held` dominates `required`.
#[must_use]
pub fn has_scope(held: &[Scope], required: &Scope) -> bool
{
	held.iter().any(|scope| scope.dominates(required))
}

/// Returns whether any scope in `held` dominates any entry of `required`.
#[must_use]
pub fn has_any_scope(held: &[Scope], required: &[Scope]) -> bool
{
	required.iter().any(|scope| has_scope(held, scope))
}

/// Returns whether, for every entry of `required`, some scope in `held`
/// dominates it.
#[must_use]
pub fn has_all_scopes(held: &[Scope], required: &[Scope]) -> bool
{
	required.iter().all(|scope| has_scope(held, scope))
}

/// Renders a scope list back into the space-delimited wire format, used
/// when reporting `requiredScopes` on an `insufficient_scope` error.
#[must_use]
pub fn to_space_delimited(scopes: &[Scope]) -> String
{
	scopes.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests
{
	use super::*;

	#[test]
	fn full_dominates_everything()
	{
		let full = [Scope::Full];

		for required in [
			Scope::Read,
			Scope::Write,
			Scope::Admin,
			Scope::Full,
			Scope::Db("app".to_owned()),
			Scope::Table("app".to_owned(), "users".to_owned()),
		] {
			assert!(has_scope(&full, &required));
		}
	}

	#[test]
	fn admin_dominates_read_and_write()
	{
		let admin = [Scope::Admin];
		assert!(has_scope(&admin, &Scope::Read));
		assert!(has_scope(&admin, &Scope::Write));
		assert!(!has_scope(&admin, &Scope::Full));
	}

	#[test]
	fn write_dominates_read_but_not_the_reverse()
	{
		let write = [Scope::Write];
		assert!(has_scope(&write, &Scope::Read));

		let read = [Scope::Read];
		assert!(!has_scope(&read, &Scope::Write));
	}

	#[test]
	fn db_scope_dominates_its_own_tables()
	{
		let db = [Scope::Db("app".to_owned())];
		assert!(has_scope(&db, &Scope::Table("app".to_owned(), "users".to_owned())));
		assert!(!has_scope(&db, &Scope::Table("other".to_owned(), "users".to_owned())));
	}

	#[test]
	fn parses_space_delimited_claim()
	{
		let scopes = Scope::parse_space_delimited("read write db:app");
		assert_eq!(scopes, vec![
			Scope::Read,
			Scope::Write,
			Scope::Db("app".to_owned())
		]);
	}

	#[test]
	fn unknown_scope_tokens_are_skipped_not_fatal()
	{
		let scopes = Scope::parse_space_delimited("read bogus write");
		assert_eq!(scopes, vec![Scope::Read, Scope::Write]);
	}
}
