//! The crate-wide error type.
//!
//! Every error that escapes a suspension point (database, auth) is
//! translated once into one of the [`Error`] kinds before it reaches the
//! tool dispatcher. See `spec.md` §7 for the propagation policy.

use std::fmt;

use derive_more::{Display, Error};

use crate::auth::AuthError;

/// A crate-wide `Result` alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The fixed set of error kinds produced by the core.
///
/// Raw driver text is sanitized before it ends up in any of these variants:
/// the leading `Query failed: ` / `Execute failed: ` prefixes are stripped,
/// and parameter values are never attached (only the SQL text itself, for
/// the [`Error::Query`] variant).
#[derive(Debug, Display, Error)]
pub enum Error
{
	/// The pool is not initialized, exhausted, or unhealthy.
	#[display("{_0}")]
	Connection(ConnectionError),

	/// The driver reported a syntactic/semantic SQL failure.
	#[display("query error: {message}")]
	Query
	{
		/// Sanitized driver message.
		message: String,

		/// The SQL that was executed (never the bound parameter values).
		sql: String,
	},

	/// `begin`/`commit`/`rollback` failed, or the handle was unknown.
	#[display("transaction error: {_0}")]
	Transaction(String),

	/// User input failed schema or identifier validation.
	#[display("validation error: {_0}")]
	Validation(String),

	/// A lookup (tool name, table, event, user, …) returned nothing.
	#[display("not found: {_0}")]
	NotFound(String),

	/// Token missing/invalid/expired/signature/claims/scope.
	#[display("{_0}")]
	Auth(AuthError),

	/// Auth-server metadata or JWKS could not be retrieved.
	#[display("discovery error: {_0}")]
	Discovery(String),
}

impl Error
{
	/// Fixed message used by every operation issued after [`shutdown`].
	///
	/// [`shutdown`]: crate::database::ConnectionPool::shutdown
	pub const NOT_CONNECTED: &'static str = "Not connected";

	/// Builds the canonical "pool is closed" error.
	#[must_use]
	pub fn not_connected() -> Self
	{
		Self::Connection(ConnectionError::NotConnected)
	}

	/// Builds a [`Error::Query`] from a raw driver message and the SQL that
	/// produced it, stripping the known `… failed: ` prefixes.
	#[must_use]
	pub fn query(raw_message: impl AsRef<str>, sql: impl Into<String>) -> Self
	{
		Self::Query { message: sanitize_driver_message(raw_message.as_ref()), sql: sql.into() }
	}

	/// Builds a [`Error::NotFound`], always including the identifier asked
	/// for, per spec §7 ("missing-entity errors always include the
	/// identifier asked for").
	#[must_use]
	pub fn not_found(identifier: impl fmt::Display) -> Self
	{
		Self::NotFound(identifier.to_string())
	}

	/// Builds a [`Error::Validation`].
	#[must_use]
	pub fn validation(reason: impl fmt::Display) -> Self
	{
		Self::Validation(reason.to_string())
	}
}

/// Errors specific to the [connection pool][crate::database::ConnectionPool].
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionError
{
	/// The pool was asked to do something after [`shutdown`][1] completed.
	///
	/// [1]: crate::database::ConnectionPool::shutdown
	#[display("Not connected")]
	NotConnected,

	/// [`acquire_timeout`][1] elapsed before a connection became available.
	///
	/// [1]: crate::config::Config::pool_acquire_timeout
	#[display("timed out waiting for a connection")]
	AcquireTimeout,

	/// The pool could not establish even its minimum connection count.
	#[display("failed to establish a database connection: {_0}")]
	Unhealthy(String),
}

impl From<sqlx::Error> for ConnectionError
{
	fn from(error: sqlx::Error) -> Self
	{
		match error {
			sqlx::Error::PoolTimedOut => Self::AcquireTimeout,
			sqlx::Error::PoolClosed => Self::NotConnected,
			other => Self::Unhealthy(sanitize_driver_message(&other.to_string())),
		}
	}
}

impl From<ConnectionError> for Error
{
	fn from(error: ConnectionError) -> Self
	{
		Self::Connection(error)
	}
}

impl From<AuthError> for Error
{
	fn from(error: AuthError) -> Self
	{
		Self::Auth(error)
	}
}

/// Strips the leading `Query failed: ` / `Execute failed: ` prefixes some
/// callers attach to driver messages before they reach us, and nothing
/// else — the rest of the driver message is surfaced as-is since it never
/// contains parameter values (those are sent out-of-band in the binary
/// protocol, not interpolated into the message).
#[must_use]
pub(crate) fn sanitize_driver_message(message: &str) -> String
{
	for prefix in ["Query failed: ", "Execute failed: "] {
		if let Some(stripped) = message.strip_prefix(prefix) {
			return stripped.to_owned();
		}
	}

	message.to_owned()
}

/// Centralizes the substring checks used to reclassify a driver error as a
/// "missing entity" condition, per the design note in `spec.md` §9
/// ("Sanitization of driver error messages").
#[must_use]
pub fn classify_missing_entity(message: &str) -> bool
{
	const MARKERS: [&str; 3] = ["doesn't exist", "Unknown table", "Unknown event"];

	MARKERS.iter().any(|marker| message.contains(marker))
}

/// Centralizes the substring checks used to detect a duplicate-key /
/// duplicate-name condition reported by the driver.
#[must_use]
pub fn classify_duplicate(message: &str) -> bool
{
	const MARKERS: [&str; 2] = ["Duplicate key name", "Duplicate column name"];

	MARKERS.iter().any(|marker| message.contains(marker))
}

#[cfg(test)]
mod tests
{
	use super::*;

	#[test]
	fn strips_known_prefixes()
	{
		assert_eq!(sanitize_driver_message("Query failed: syntax error"), "syntax error");
		assert_eq!(sanitize_driver_message("Execute failed: deadlock"), "deadlock");
		assert_eq!(sanitize_driver_message("no prefix here"), "no prefix here");
	}

	#[test]
	fn classifies_missing_entity_markers()
	{
		assert!(classify_missing_entity("Table 'db.t' doesn't exist"));
		assert!(classify_missing_entity("Unknown table 't'"));
		assert!(classify_missing_entity("Unknown event 'e'"));
		assert!(!classify_missing_entity("syntax error near 'SELECT'"));
	}

	#[test]
	fn classifies_duplicate_markers()
	{
		assert!(classify_duplicate("Duplicate key name 'idx_foo'"));
		assert!(classify_duplicate("Duplicate column name 'id'"));
		assert!(!classify_duplicate("Table already has that column"));
	}
}
