//! A single borrowed connection.

use sqlx::MySqlConnection;
use sqlx::pool::PoolConnection;

/// A connection on loan from a [`ConnectionPool`][super::ConnectionPool].
///
/// Dropping it returns the connection to the pool. It carries no query
/// state of its own — the text/prepared dispatch logic lives in
/// [`QueryExecutor`][super::QueryExecutor], which borrows the raw
/// connection through [`Connection::as_raw()`] for the duration of a
/// single statement.
#[must_use]
#[derive(Debug)]
pub struct Connection
{
	inner: PoolConnection<sqlx::MySql>,
}

impl Connection
{
	/// Wraps a connection just acquired from the pool.
	pub(super) fn from_pooled(inner: PoolConnection<sqlx::MySql>) -> Self
	{
		Self { inner }
	}

	/// Borrows the underlying driver connection.
	pub fn as_raw(&mut self) -> &mut MySqlConnection
	{
		&mut self.inner
	}

	/// Consumes this handle, returning the raw pooled connection — used by
	/// the transaction manager to take ownership of a borrowed connection
	/// for the lifetime of a transaction handle.
	pub(super) fn into_pooled(self) -> PoolConnection<sqlx::MySql>
	{
		self.inner
	}
}
