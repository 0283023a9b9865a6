//! The transaction map: UUID-keyed handles pinned to a single connection.

use std::sync::Arc;

use dashmap::DashMap;
use sqlx::pool::PoolConnection;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::ConnectionPool;
use super::connection::Connection;
use super::executor::{QueryResult, run_dual_mode};
use super::query::{Identifier, Param, bind_params};
use crate::error::{Error, Result};

/// Opaque handle returned by [`TransactionManager::begin()`].
///
/// Carries no connection state itself — it is just the map key. The
/// connection it's pinned to lives in the manager's active map for as
/// long as the handle is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct TransactionHandle(Uuid);

impl std::fmt::Display for TransactionHandle
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
	{
		std::fmt::Display::fmt(&self.0, f)
	}
}

/// The closed set of isolation levels a transaction may request.
///
/// Validated *before* string interpolation — the level never reaches the
/// driver as anything but one of these fixed literals, per `spec.md`
/// §4.3 ("the level is not parameterizable").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel
{
	ReadUncommitted,
	ReadCommitted,
	RepeatableRead,
	Serializable,
}

impl IsolationLevel
{
	/// Parses the exact SQL keyword spelling (e.g. `"REPEATABLE READ"`),
	/// case-sensitively, against the closed set from `spec.md` §4.3.
	pub fn parse(raw: &str) -> Result<Self>
	{
		match raw {
			"READ UNCOMMITTED" => Ok(Self::ReadUncommitted),
			"READ COMMITTED" => Ok(Self::ReadCommitted),
			"REPEATABLE READ" => Ok(Self::RepeatableRead),
			"SERIALIZABLE" => Ok(Self::Serializable),
			other => Err(Error::Transaction(format!("invalid isolation level: {other:?}"))),
		}
	}

	/// The exact SQL keyword spelling this level is interpolated as.
	#[must_use]
	pub fn as_sql(self) -> &'static str
	{
		match self {
			Self::ReadUncommitted => "READ UNCOMMITTED",
			Self::ReadCommitted => "READ COMMITTED",
			Self::RepeatableRead => "REPEATABLE READ",
			Self::Serializable => "SERIALIZABLE",
		}
	}
}

/// Structured outcome of [`TransactionManager::execute_atomic()`] when the
/// statement list was empty: the spec requires this case return
/// `{success: false, reason}` without ever opening a transaction.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AtomicOutcome
{
	pub success: bool,
	pub reason: Option<String>,
	pub results: Vec<QueryResult>,
}

/// Owns the set of live transaction handles and their pinned connections.
///
/// Cloning shares the same underlying map and pool (cheap, `Arc`-backed)
/// — per `spec.md`'s note that the adapter is the map's sole owner,
/// there should only ever be one logical instance per running gateway.
#[derive(Clone)]
pub struct TransactionManager
{
	pool: ConnectionPool,
	active: Arc<DashMap<TransactionHandle, Arc<Mutex<PoolConnection<sqlx::MySql>>>>>,
}

impl std::fmt::Debug for TransactionManager
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
	{
		f.debug_struct("TransactionManager")
			.field("active_count", &self.active.len())
			.finish_non_exhaustive()
	}
}

impl TransactionManager
{
	/// Builds an empty transaction map bound to `pool`.
	#[must_use]
	pub fn new(pool: ConnectionPool) -> Self
	{
		Self { pool, active: Arc::new(DashMap::new()) }
	}

	/// Borrows a connection, optionally sets the isolation level, issues
	/// `BEGIN`, and mints a new handle. On any step's failure the borrowed
	/// connection is released and a `transaction` error is returned.
	#[tracing::instrument(level = "debug", skip(self), err(level = "debug"))]
	pub async fn begin(&self, isolation: Option<IsolationLevel>) -> Result<TransactionHandle>
	{
		let mut conn: Connection = self.pool.borrow().await?;

		if let Err(error) = self.set_isolation_and_begin(conn.as_raw(), isolation).await {
			drop(conn);
			return Err(error);
		}

		let handle = TransactionHandle(Uuid::new_v4());
		self.active.insert(handle, Arc::new(Mutex::new(conn.into_pooled())));

		tracing::debug!(%handle, "transaction started");

		Ok(handle)
	}

	async fn set_isolation_and_begin(
		&self,
		conn: &mut sqlx::MySqlConnection,
		isolation: Option<IsolationLevel>,
	) -> Result<()>
	{
		use sqlx::Executor;

		if let Some(level) = isolation {
			let sql = format!("SET TRANSACTION ISOLATION LEVEL {}", level.as_sql());
			conn.execute(sql.as_str())
				.await
				.map_err(|error| Error::Transaction(error.to_string()))?;
		}

		conn.execute("BEGIN").await.map_err(|error| Error::Transaction(error.to_string()))?;

		Ok(())
	}

	/// Issues `COMMIT` and releases the connection in every case —
	/// success or driver failure — removing the handle from the map.
	#[tracing::instrument(level = "debug", skip(self), err(level = "debug"))]
	pub async fn commit(&self, handle: &TransactionHandle) -> Result<()>
	{
		self.finish(handle, "COMMIT").await
	}

	/// Issues `ROLLBACK` and releases the connection in every case,
	/// removing the handle from the map.
	#[tracing::instrument(level = "debug", skip(self), err(level = "debug"))]
	pub async fn rollback(&self, handle: &TransactionHandle) -> Result<()>
	{
		self.finish(handle, "ROLLBACK").await
	}

	async fn finish(&self, handle: &TransactionHandle, sql: &'static str) -> Result<()>
	{
		use sqlx::Executor;

		let Some((_, lock)) = self.active.remove(handle) else {
			return Err(Error::Transaction(format!("unknown transaction handle: {handle}")));
		};

		let outcome = {
			let mut conn = lock.lock().await;
			conn.execute(sql).await
		};

		// `lock` (the last `Arc` reference, since the map entry is already
		// removed) drops here either way, releasing the connection back to
		// the pool regardless of whether `COMMIT`/`ROLLBACK` succeeded.
		drop(lock);

		outcome.map(|_| ()).map_err(|error| Error::Transaction(error.to_string()))
	}

	/// Runs `sql` on the connection pinned to `handle`, using the same
	/// dual-mode dispatch as the top-level [`QueryExecutor`][super::QueryExecutor].
	#[tracing::instrument(level = "trace", skip(self, args), err(level = "debug"))]
	pub async fn execute_on_connection(
		&self,
		handle: &TransactionHandle,
		sql: &str,
		args: Option<&sqlx::mysql::MySqlArguments>,
	) -> Result<QueryResult>
	{
		let Some(lock) = self.active.get(handle).map(|entry| Arc::clone(&entry)) else {
			return Err(Error::Transaction(format!("unknown transaction handle: {handle}")));
		};

		let mut conn = lock.lock().await;
		run_dual_mode(&mut conn, sql, args).await
	}

	/// Issues a `SAVEPOINT`, validating `name` against the strict
	/// identifier regex before interpolation.
	pub async fn savepoint(&self, handle: &TransactionHandle, name: &str) -> Result<()>
	{
		self.run_savepoint_command(handle, "SAVEPOINT", name).await
	}

	/// Issues a `RELEASE SAVEPOINT`, validating `name` first.
	pub async fn release_savepoint(&self, handle: &TransactionHandle, name: &str) -> Result<()>
	{
		self.run_savepoint_command(handle, "RELEASE SAVEPOINT", name).await
	}

	/// Issues a `ROLLBACK TO SAVEPOINT`, validating `name` first.
	pub async fn rollback_to_savepoint(&self, handle: &TransactionHandle, name: &str) -> Result<()>
	{
		self.run_savepoint_command(handle, "ROLLBACK TO SAVEPOINT", name).await
	}

	async fn run_savepoint_command(
		&self,
		handle: &TransactionHandle,
		command: &str,
		name: &str,
	) -> Result<()>
	{
		let identifier =
			Identifier::new(name).map_err(|error| Error::validation(error.to_string()))?;

		let sql = format!("{command} {}", identifier.as_str());
		self.execute_on_connection(handle, &sql, None).await.map(|_| ())
	}

	/// Begins a transaction, runs each statement on it in order, and
	/// commits. On any statement's failure, rolls back and reports the
	/// whole set as failed. An empty statement list returns a structured
	/// failure without ever opening a transaction.
	#[tracing::instrument(level = "debug", skip(self, statements), err(level = "debug"))]
	pub async fn execute_atomic(
		&self,
		statements: &[(String, Vec<Param>)],
		isolation: Option<IsolationLevel>,
	) -> Result<AtomicOutcome>
	{
		if statements.is_empty() {
			return Ok(AtomicOutcome {
				success: false,
				reason: Some("no statements to execute".to_owned()),
				results: Vec::new(),
			});
		}

		let handle = self.begin(isolation).await?;
		let mut results = Vec::with_capacity(statements.len());

		for (sql, params) in statements {
			let args = (!params.is_empty()).then(|| bind_params(params));

			match self.execute_on_connection(&handle, sql, args.as_ref()).await {
				Ok(result) => results.push(result),
				Err(error) => {
					let _ = self.rollback(&handle).await;
					return Err(Error::Transaction(format!(
						"statement set rolled back: {error}"
					)));
				},
			}
		}

		self.commit(&handle).await?;

		Ok(AtomicOutcome { success: true, reason: None, results })
	}

	/// The number of currently-live handles.
	#[must_use]
	pub fn active_count(&self) -> usize
	{
		self.active.len()
	}

	/// Shutdown obligation from `spec.md` §4.3: roll back every live
	/// handle (ignoring individual failures, beyond logging them), then
	/// release its connection.
	#[tracing::instrument(level = "debug", skip(self))]
	pub async fn drain(&self)
	{
		let handles: Vec<TransactionHandle> =
			self.active.iter().map(|entry| *entry.key()).collect();

		for handle in handles {
			if let Err(error) = self.rollback(&handle).await {
				tracing::warn!(%handle, %error, "failed to roll back transaction during shutdown");
			}
		}
	}
}

#[cfg(test)]
mod tests
{
	use super::*;

	#[test]
	fn isolation_level_allowlist_rejects_unknown_strings()
	{
		assert!(IsolationLevel::parse("NOT A LEVEL").is_err());
		assert!(matches!(
			IsolationLevel::parse("REPEATABLE READ"),
			Ok(IsolationLevel::RepeatableRead)
		));
	}

	#[test]
	fn isolation_level_round_trips_exact_sql_spelling()
	{
		for level in [
			IsolationLevel::ReadUncommitted,
			IsolationLevel::ReadCommitted,
			IsolationLevel::RepeatableRead,
			IsolationLevel::Serializable,
		] {
			assert_eq!(IsolationLevel::parse(level.as_sql()).unwrap(), level);
		}
	}
}
