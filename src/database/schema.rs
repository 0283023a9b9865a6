//! Reads table/column/index metadata out of `information_schema` and
//! `SHOW INDEX`, with a per-database cache invalidated on DDL.

use std::collections::HashMap;
use std::sync::Arc;

use sqlx::Row;
use tokio::sync::RwLock;

use super::ConnectionPool;
use crate::error::Result;

/// One column of a [`TableInfo`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, sqlx::FromRow)]
pub struct ColumnInfo
{
	#[sqlx(rename = "COLUMN_NAME")]
	pub name: String,

	#[sqlx(rename = "DATA_TYPE")]
	pub data_type: String,

	#[sqlx(rename = "IS_NULLABLE")]
	is_nullable_raw: String,

	#[sqlx(rename = "COLUMN_KEY")]
	pub column_key: String,

	#[sqlx(rename = "COLUMN_DEFAULT")]
	pub column_default: Option<String>,

	#[sqlx(rename = "EXTRA")]
	pub extra: String,
}

impl ColumnInfo
{
	/// Whether the column accepts `NULL`.
	#[must_use]
	pub fn is_nullable(&self) -> bool
	{
		self.is_nullable_raw.eq_ignore_ascii_case("YES")
	}
}

/// A single index, with its columns in ordinal order.
///
/// `information_schema.STATISTICS` (and `SHOW INDEX`) return one row per
/// indexed column; composite indexes are reconstructed here by grouping
/// same-named rows together.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct IndexInfo
{
	pub name: String,
	pub unique: bool,
	pub columns: Vec<String>,
}

/// Table and column metadata for one table.
///
/// A table that does not exist is represented as a `TableInfo` with an
/// empty `columns` list (per `spec.md` §4.5) rather than as an `Option` or
/// an error — callers check `columns.is_empty()`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TableInfo
{
	pub name: String,
	pub columns: Vec<ColumnInfo>,
	pub indexes: Vec<IndexInfo>,
}

impl TableInfo
{
	/// `spec.md` §4.5 / Scenario D: a missing table is a `TableInfo` with
	/// no columns, which handlers translate into `{exists: false}`.
	#[must_use]
	pub fn exists(&self) -> bool
	{
		!self.columns.is_empty()
	}
}

/// Per-database table-info cache. `clear()` is called by the dispatcher
/// whenever a schema-mutating handler (`CREATE TABLE`, `DROP TABLE`,
/// `CREATE INDEX`, `ALTER TABLE`) succeeds.
#[derive(Clone, Debug, Default)]
pub struct SchemaCache
{
	tables: Arc<RwLock<HashMap<(String, String), TableInfo>>>,
}

impl SchemaCache
{
	/// An empty cache.
	#[must_use]
	pub fn new() -> Self
	{
		Self::default()
	}

	async fn get(&self, database: &str, table: &str) -> Option<TableInfo>
	{
		self.tables.read().await.get(&(database.to_owned(), table.to_owned())).cloned()
	}

	async fn put(&self, database: &str, table: &str, info: TableInfo)
	{
		self.tables.write().await.insert((database.to_owned(), table.to_owned()), info);
	}

	/// Invalidates every cached entry. Schema changes are rare enough, and
	/// hard enough to scope precisely (an `ALTER TABLE … RENAME` affects
	/// more than one key), that a full clear is the simplest correct
	/// policy.
	pub async fn clear(&self)
	{
		self.tables.write().await.clear();
	}
}

/// Reads table/column/index metadata from `information_schema` and
/// `SHOW INDEX`, caching results per `(database, table)` pair.
#[derive(Clone, Debug)]
pub struct SchemaIntrospector
{
	pool: ConnectionPool,
	cache: SchemaCache,
}

impl SchemaIntrospector
{
	/// Builds an introspector over `pool` with an empty cache.
	#[must_use]
	pub fn new(pool: ConnectionPool) -> Self
	{
		Self { pool, cache: SchemaCache::new() }
	}

	/// The shared cache, so the dispatcher can call `clear()` on DDL.
	#[must_use]
	pub fn cache(&self) -> &SchemaCache
	{
		&self.cache
	}

	/// Describes `table` in `database`, reading through the cache.
	///
	/// A missing table is represented by a `TableInfo` with an empty
	/// `columns` list rather than an error (`spec.md` §4.5, Scenario D).
	#[tracing::instrument(level = "debug", skip(self), err(level = "debug"))]
	pub async fn describe_table(&self, database: &str, table: &str) -> Result<TableInfo>
	{
		if let Some(cached) = self.cache.get(database, table).await {
			return Ok(cached);
		}

		let columns = self.fetch_columns(database, table).await?;
		let indexes = if columns.is_empty() { Vec::new() } else { self.fetch_indexes(database, table).await? };

		let info = TableInfo { name: table.to_owned(), columns, indexes };
		self.cache.put(database, table, info.clone()).await;

		Ok(info)
	}

	async fn fetch_columns(&self, database: &str, table: &str) -> Result<Vec<ColumnInfo>>
	{
		let pool = self.pool.raw();

		let columns = sqlx::query_as::<_, ColumnInfo>(
			"SELECT COLUMN_NAME, DATA_TYPE, IS_NULLABLE, COLUMN_KEY, COLUMN_DEFAULT, EXTRA \
			 FROM information_schema.COLUMNS \
			 WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? \
			 ORDER BY ORDINAL_POSITION",
		)
		.bind(database)
		.bind(table)
		.fetch_all(pool)
		.await
		.map_err(|error| crate::error::Error::query(error.to_string(), "information_schema.COLUMNS"))?;

		Ok(columns)
	}

	async fn fetch_indexes(&self, database: &str, table: &str) -> Result<Vec<IndexInfo>>
	{
		let pool = self.pool.raw();

		let rows = sqlx::query(
			"SELECT INDEX_NAME, NON_UNIQUE, COLUMN_NAME \
			 FROM information_schema.STATISTICS \
			 WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? \
			 ORDER BY INDEX_NAME, SEQ_IN_INDEX",
		)
		.bind(database)
		.bind(table)
		.fetch_all(pool)
		.await
		.map_err(|error| crate::error::Error::query(error.to_string(), "information_schema.STATISTICS"))?;

		let mut indexes: Vec<IndexInfo> = Vec::new();

		for row in rows {
			let index_name: String = row.try_get("INDEX_NAME").unwrap_or_default();
			let non_unique: i64 = row.try_get("NON_UNIQUE").unwrap_or(1);
			let column_name: String = row.try_get("COLUMN_NAME").unwrap_or_default();

			match indexes.iter_mut().find(|index| index.name == index_name) {
				Some(existing) => existing.columns.push(column_name),
				None => indexes.push(IndexInfo {
					name: index_name,
					unique: non_unique == 0,
					columns: vec![column_name],
				}),
			}
		}

		Ok(indexes)
	}
}

#[cfg(test)]
mod tests
{
	use super::*;

	#[tokio::test]
	async fn cache_round_trips_and_clears()
	{
		let cache = SchemaCache::new();
		let info = TableInfo { name: "users".to_owned(), columns: Vec::new(), indexes: Vec::new() };

		cache.put("app", "users", info.clone()).await;
		assert_eq!(cache.get("app", "users").await, Some(info));

		cache.clear().await;
		assert_eq!(cache.get("app", "users").await, None);
	}

	#[test]
	fn missing_table_reports_not_exists()
	{
		let info = TableInfo { name: "ghost".to_owned(), columns: Vec::new(), indexes: Vec::new() };
		assert!(!info.exists());
	}
}
