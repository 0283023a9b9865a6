//! Prepared/text protocol dual-mode dispatch and result normalization.

use std::time::Instant;

use sqlx::mysql::{MySqlArguments, MySqlQueryResult, MySqlRow};
use sqlx::{Column, MySqlConnection, Row, TypeInfo};

use super::ConnectionPool;
use super::query::{Param, bind_params};
use super::transaction::TransactionHandle;
use crate::error::{Error, Result};

/// Column metadata attached to a [`QueryResult::Rows`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct ColumnMeta
{
	/// Column name, as returned by the driver.
	pub name: String,

	/// Short uppercase semantic type name, per [`semantic_type_name()`].
	pub semantic_type: String,
}

/// The shape of a statement's outcome.
///
/// Which variant you get depends entirely on whether the driver reported
/// an array-shaped (row set) or scalar (mutation) outcome — it is never
/// chosen by inspecting the SQL text.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(untagged)]
pub enum QueryResult
{
	/// A `SELECT`-shaped outcome.
	Rows
	{
		/// Column metadata, in result order.
		columns: Vec<ColumnMeta>,

		/// Row data, each row a JSON object keyed by column name.
		rows: Vec<serde_json::Value>,

		/// Wall-clock time spent inside the driver call, in milliseconds.
		execution_time_ms: u64,
	},

	/// A mutating statement's outcome (`INSERT`/`UPDATE`/`DELETE`/DDL).
	Mutation
	{
		/// Number of rows affected.
		affected_rows: u64,

		/// Last auto-increment id, if any.
		insert_id: u64,

		/// Server warning count for the statement.
		warning_status: u16,

		/// Wall-clock time spent inside the driver call, in milliseconds.
		execution_time_ms: u64,
	},
}

impl QueryResult
{
	fn from_mutation(result: MySqlQueryResult, execution_time_ms: u64) -> Self
	{
		Self::Mutation {
			affected_rows: result.rows_affected(),
			insert_id: result.last_insert_id(),
			warning_status: 0,
			execution_time_ms,
		}
	}

	fn from_rows(rows: Vec<MySqlRow>, execution_time_ms: u64) -> Result<Self>
	{
		let columns = rows.first().map_or_else(Vec::new, |row| {
			row.columns()
				.iter()
				.map(|col| ColumnMeta {
					name: col.name().to_owned(),
					semantic_type: semantic_type_name(col.type_info().name()),
				})
				.collect()
		});

		let rows = rows.iter().map(row_to_json).collect::<Result<_>>()?;

		Ok(Self::Rows { columns, rows, execution_time_ms })
	}
}

/// Maps a driver-reported type name to the fixed semantic type table from
/// `spec.md` §4.2. Unknown names render as `UNKNOWN(<name>)` rather than
/// surfacing a raw numeric code, since `sqlx` exposes type names rather
/// than the wire-level numeric codes directly.
#[must_use]
pub fn semantic_type_name(driver_type_name: &str) -> String
{
	match driver_type_name {
		"TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "INTEGER" => "INT".to_owned(),
		"BIGINT" => "BIGINT".to_owned(),
		"FLOAT" => "FLOAT".to_owned(),
		"DOUBLE" => "DOUBLE".to_owned(),
		"DECIMAL" => "DECIMAL".to_owned(),
		"VARCHAR" | "CHAR" => "VARCHAR".to_owned(),
		"TEXT" | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT" => "TEXT".to_owned(),
		"BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "VARBINARY" | "BINARY" => {
			"BLOB".to_owned()
		},
		"JSON" => "JSON".to_owned(),
		"DATE" => "DATE".to_owned(),
		"DATETIME" => "DATETIME".to_owned(),
		"TIMESTAMP" => "TIMESTAMP".to_owned(),
		"TIME" => "TIME".to_owned(),
		"YEAR" => "YEAR".to_owned(),
		"BIT" => "BIT".to_owned(),
		"ENUM" => "ENUM".to_owned(),
		"SET" => "SET".to_owned(),
		"GEOMETRY" | "POINT" | "LINESTRING" | "POLYGON" => "GEOMETRY".to_owned(),
		"NULL" => "NULL".to_owned(),
		other => format!("UNKNOWN({other})"),
	}
}

fn row_to_json(row: &MySqlRow) -> Result<serde_json::Value>
{
	let mut object = serde_json::Map::with_capacity(row.columns().len());

	for (index, column) in row.columns().iter().enumerate() {
		let value: serde_json::Value = row
			.try_get_raw(index)
			.ok()
			.and_then(|raw| decode_raw_value(row, index, raw))
			.unwrap_or(serde_json::Value::Null);

		object.insert(column.name().to_owned(), value);
	}

	Ok(serde_json::Value::Object(object))
}

fn decode_raw_value(
	row: &MySqlRow,
	index: usize,
	raw: sqlx::mysql::MySqlValueRef<'_>,
) -> Option<serde_json::Value>
{
	use sqlx::ValueRef;

	if raw.is_null() {
		return Some(serde_json::Value::Null);
	}

	row.try_get::<i64, _>(index)
		.map(serde_json::Value::from)
		.or_else(|_| row.try_get::<f64, _>(index).map(serde_json::Value::from))
		.or_else(|_| row.try_get::<bool, _>(index).map(serde_json::Value::from))
		.or_else(|_| {
			row.try_get::<serde_json::Value, _>(index).map_err(sqlx::Error::from)
		})
		.or_else(|_| row.try_get::<String, _>(index).map(serde_json::Value::from))
		.ok()
}

/// The first-keyword classification used by `executeReadQuery` /
/// `executeWriteQuery`. Advisory only, per `spec.md` §4.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementShape
{
	/// Lexically a `SELECT`/`SHOW`/`DESCRIBE`/`EXPLAIN` statement.
	Read,

	/// Anything else.
	Write,
}

/// Classifies `sql` by its first keyword, case-insensitively.
#[must_use]
pub fn classify_statement(sql: &str) -> StatementShape
{
	let head = sql.trim_start().split_whitespace().next().unwrap_or_default().to_ascii_uppercase();

	match head.as_str() {
		"SELECT" | "SHOW" | "DESCRIBE" | "DESC" | "EXPLAIN" => StatementShape::Read,
		_ => StatementShape::Write,
	}
}

/// Substring the driver uses (by convention, alongside `ER_UNSUPPORTED_PS`)
/// to report that a statement cannot be prepared.
const UNSUPPORTED_PREPARED_STATEMENT_MARKER: &str = "not supported";

fn is_unsupported_prepared_statement(error: &sqlx::Error) -> bool
{
	match error {
		sqlx::Error::Database(db_error) => {
			db_error.code().as_deref() == Some("ER_UNSUPPORTED_PS")
				|| db_error.message().contains(UNSUPPORTED_PREPARED_STATEMENT_MARKER)
		},
		_ => false,
	}
}

/// Runs `sql` against `conn` via the prepared (binary) protocol, falling
/// back exactly once to the text protocol if the driver reports the
/// statement can't be prepared. See `spec.md` §4.2 and Testable Property
/// 4.
pub(super) async fn run_dual_mode(
	conn: &mut MySqlConnection,
	sql: &str,
	args: Option<&MySqlArguments>,
) -> Result<QueryResult>
{
	let started = Instant::now();

	if matches!(classify_statement(sql), StatementShape::Read) {
		let outcome = match args {
			Some(args) => sqlx::query_with(sql, args.clone()).fetch_all(&mut *conn).await,
			None => sqlx::query(sql).fetch_all(&mut *conn).await,
		};

		return match outcome {
			Ok(rows) => {
				let execution_time_ms =
					u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
				QueryResult::from_rows(rows, execution_time_ms)
			},
			Err(error) if is_unsupported_prepared_statement(&error) => {
				run_text_protocol(conn, sql, args).await
			},
			Err(error) => Err(Error::query(error.to_string(), sql)),
		};
	}

	let outcome = match args {
		Some(args) => sqlx::query_with(sql, args.clone()).execute(&mut *conn).await,
		None => sqlx::query(sql).execute(&mut *conn).await,
	};

	match outcome {
		Ok(result) => {
			let execution_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
			Ok(QueryResult::from_mutation(result, execution_time_ms))
		},
		Err(error) if is_unsupported_prepared_statement(&error) => {
			run_text_protocol(conn, sql, args).await
		},
		Err(error) => Err(Error::query(error.to_string(), sql)),
	}
}

/// Runs `sql` against `conn` using the genuine MySQL text (`COM_QUERY`)
/// protocol, via [`sqlx::raw_sql`] — never `sqlx::query`/`sqlx::query_with`,
/// both of which always populate `arguments: Some(...)` on the statement
/// they send and therefore always go out over the prepared (binary)
/// protocol regardless of which function calls them. Used for the server
/// commands enumerated in `spec.md` §4.2 (`CHECK TABLE`, savepoint
/// commands, some `SHOW … LIKE`) and as the fallback target of
/// [`run_dual_mode()`].
///
/// The text protocol has no placeholder syntax — a bound `?` is a
/// prepared-statement-only concept — so `args` is accepted only to reject
/// a caller that still expects one; every real caller of this function
/// passes `None`.
pub async fn run_text_protocol(
	conn: &mut MySqlConnection,
	sql: &str,
	args: Option<&MySqlArguments>,
) -> Result<QueryResult>
{
	if args.is_some() {
		return Err(Error::query(
			"bound parameters are not supported on the text protocol",
			sql,
		));
	}

	let started = Instant::now();

	// The text protocol has no notion of "unsupported prepared statement";
	// whatever the driver returns here is final.
	let looks_like_rows = matches!(classify_statement(sql), StatementShape::Read)
		|| sql.trim_start().to_ascii_uppercase().starts_with("CHECK TABLE");

	if looks_like_rows {
		return match sqlx::raw_sql(sql).fetch_all(&mut *conn).await {
			Ok(rows) => {
				let execution_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
				QueryResult::from_rows(rows, execution_time_ms)
			},
			Err(error) => Err(Error::query(error.to_string(), sql)),
		};
	}

	let result = sqlx::raw_sql(sql)
		.execute(&mut *conn)
		.await
		.map_err(|error| Error::query(error.to_string(), sql))?;
	let execution_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

	Ok(QueryResult::from_mutation(result, execution_time_ms))
}

/// Runs statements against the pool, applying the dual-mode
/// prepared/text dispatch described in `spec.md` §4.2.
///
/// Borrow a [`QueryExecutor`] from [`Database::executor()`][super::Database::executor];
/// it does not own a connection itself — each call borrows one from the
/// pool, or, if a [`TransactionHandle`] is supplied, pins to that
/// handle's connection via the [`TransactionManager`][super::TransactionManager].
#[derive(Debug, Clone, Copy)]
pub struct QueryExecutor<'p>
{
	pool: &'p ConnectionPool,
	transactions: &'p super::transaction::TransactionManager,
}

impl<'p> QueryExecutor<'p>
{
	pub(super) fn new(
		pool: &'p ConnectionPool,
		transactions: &'p super::transaction::TransactionManager,
	) -> Self
	{
		Self { pool, transactions }
	}

	/// Runs `sql` with dual-mode dispatch, optionally pinned to a live
	/// transaction handle.
	#[tracing::instrument(level = "debug", skip(self, params), err(level = "debug"))]
	pub async fn execute_query(
		&self,
		sql: &str,
		params: &[Param],
		tx_handle: Option<&TransactionHandle>,
	) -> Result<QueryResult>
	{
		let args = (!params.is_empty()).then(|| bind_params(params));

		if let Some(handle) = tx_handle {
			return self.transactions.execute_on_connection(handle, sql, args.as_ref()).await;
		}

		let mut conn = self.pool.borrow().await?;
		run_dual_mode(conn.as_raw(), sql, args.as_ref()).await
	}

	/// Façade asserting the statement is lexically a read. Advisory only.
	pub async fn execute_read_query(
		&self,
		sql: &str,
		params: &[Param],
		tx_handle: Option<&TransactionHandle>,
	) -> Result<QueryResult>
	{
		self.execute_query(sql, params, tx_handle).await
	}

	/// Façade asserting the statement is lexically a mutation. Advisory
	/// only.
	pub async fn execute_write_query(
		&self,
		sql: &str,
		params: &[Param],
		tx_handle: Option<&TransactionHandle>,
	) -> Result<QueryResult>
	{
		self.execute_query(sql, params, tx_handle).await
	}

	/// Bypasses the prepared-statement attempt entirely. For the commands
	/// enumerated in `spec.md` §4.2 that the prepared protocol rejects
	/// outright.
	pub async fn raw_query(&self, sql: &str) -> Result<QueryResult>
	{
		self.pool.raw_query(sql, None).await
	}
}

#[cfg(test)]
mod tests
{
	use super::*;

	#[test]
	fn classifies_read_and_write_statements()
	{
		assert_eq!(classify_statement("select * from t"), StatementShape::Read);
		assert_eq!(classify_statement("  SHOW TABLES"), StatementShape::Read);
		assert_eq!(classify_statement("INSERT INTO t VALUES (1)"), StatementShape::Write);
		assert_eq!(classify_statement("CREATE TABLE t (id INT)"), StatementShape::Write);
	}

	#[test]
	fn maps_known_type_names()
	{
		assert_eq!(semantic_type_name("INT"), "INT");
		assert_eq!(semantic_type_name("VARCHAR"), "VARCHAR");
		assert_eq!(semantic_type_name("JSON"), "JSON");
		assert_eq!(semantic_type_name("GEOMETRY"), "GEOMETRY");
	}

	#[test]
	fn maps_unknown_type_names_without_raw_codes()
	{
		assert_eq!(semantic_type_name("VECTOR"), "UNKNOWN(VECTOR)");
	}
}
