//! A small placeholder tool catalog.
//!
//! The real system exposes roughly 190 tool bodies; per `spec.md` §1 those
//! are an external collaborator, not part of this core. This module gives
//! [`ToolRegistry`][super::ToolRegistry] a handful of representative tools
//! — one per major pattern (raw read, parameterized write, transactional,
//! schema-introspecting, schema-mutating) — so `main.rs` has something to
//! register and the dispatch pipeline has something real to exercise.

use std::sync::Arc;

use super::validation::{FieldKind, FieldSchema};
use super::{BoxFuture, ToolAnnotations, ToolCall, ToolDefinition, ToolGroup};
use crate::auth::Scope;
use crate::database::{bind_params, IsolationLevel, Param};
use crate::error::{Error, Result};

/// The full placeholder catalog.
#[must_use]
pub fn demo_tools() -> Vec<ToolDefinition>
{
	vec![mysql_query(), mysql_execute(), mysql_describe_table(), mysql_create_table(), mysql_transfer()]
}

fn mysql_query() -> ToolDefinition
{
	const SCHEMA: super::InputSchema = &[FieldSchema::required("sql", FieldKind::String)];

	ToolDefinition {
		name: "mysql_query",
		group: ToolGroup::Core,
		title: "Run a read-only query",
		description: "Executes a SELECT-shaped statement and returns its rows.",
		input_schema: SCHEMA,
		required_scopes: vec![Scope::Read],
		annotations: ToolAnnotations { read_only_hint: true, idempotent_hint: true, destructive_hint: false },
		handler: Arc::new(|call: ToolCall| -> BoxFuture<Result<serde_json::Value>> {
			Box::pin(async move {
				let sql = call.arguments["sql"].as_str().unwrap_or_default().to_owned();
				let result = call.database.executor().execute_read_query(&sql, &[], None).await?;

				Ok(serde_json::to_value(result).expect("QueryResult serializes"))
			})
		}),
	}
}

fn mysql_execute() -> ToolDefinition
{
	const SCHEMA: super::InputSchema = &[FieldSchema::required("sql", FieldKind::String)];

	ToolDefinition {
		name: "mysql_execute",
		group: ToolGroup::Core,
		title: "Run a mutating statement",
		description: "Executes an INSERT/UPDATE/DELETE-shaped statement.",
		input_schema: SCHEMA,
		required_scopes: vec![Scope::Write],
		annotations: ToolAnnotations { read_only_hint: false, idempotent_hint: false, destructive_hint: false },
		handler: Arc::new(|call: ToolCall| -> BoxFuture<Result<serde_json::Value>> {
			Box::pin(async move {
				let sql = call.arguments["sql"].as_str().unwrap_or_default().to_owned();
				let result = call.database.executor().execute_write_query(&sql, &[], None).await?;

				Ok(serde_json::to_value(result).expect("QueryResult serializes"))
			})
		}),
	}
}

fn mysql_describe_table() -> ToolDefinition
{
	const SCHEMA: super::InputSchema = &[
		FieldSchema::required("database", FieldKind::String),
		FieldSchema::required("table", FieldKind::String),
	];

	ToolDefinition {
		name: "mysql_describe_table",
		group: ToolGroup::Schema,
		title: "Describe a table",
		description: "Reads column and index metadata for one table.",
		input_schema: SCHEMA,
		required_scopes: vec![Scope::Read],
		annotations: ToolAnnotations { read_only_hint: true, idempotent_hint: true, destructive_hint: false },
		handler: Arc::new(|call: ToolCall| -> BoxFuture<Result<serde_json::Value>> {
			Box::pin(async move {
				let database = call.arguments["database"].as_str().unwrap_or_default().to_owned();
				let table = call.arguments["table"].as_str().unwrap_or_default().to_owned();

				let info = call.database.schema().describe_table(&database, &table).await?;

				if !info.exists() {
					return Ok(serde_json::json!({
						"exists": false,
						"table": table,
						"message": format!("Table '{table}' does not exist or has no columns"),
					}));
				}

				Ok(serde_json::json!({ "exists": true, "table": info }))
			})
		}),
	}
}

fn mysql_create_table() -> ToolDefinition
{
	const SCHEMA: super::InputSchema = &[
		FieldSchema::required("table", FieldKind::String)
			.with_pattern("a bare SQL identifier", is_bare_identifier),
		FieldSchema::required("definition", FieldKind::String),
	];

	ToolDefinition {
		name: "mysql_create_table",
		group: ToolGroup::Schema,
		title: "Create a table",
		description: "Issues CREATE TABLE IF NOT EXISTS <table> (<definition>) and invalidates the schema cache.",
		input_schema: SCHEMA,
		required_scopes: vec![Scope::Admin],
		annotations: ToolAnnotations { read_only_hint: false, idempotent_hint: false, destructive_hint: true },
		handler: Arc::new(|call: ToolCall| -> BoxFuture<Result<serde_json::Value>> {
			Box::pin(async move {
				let table = call.arguments["table"].as_str().unwrap_or_default();
				let identifier = crate::database::Identifier::new(table)
					.map_err(|error| Error::validation(error.to_string()))?;
				let definition = call.arguments["definition"].as_str().unwrap_or_default();

				let sql = format!("CREATE TABLE IF NOT EXISTS {identifier} ({definition})");
				call.database.pool().raw_query(&sql, None).await?;
				call.database.schema().cache().clear().await;

				Ok(serde_json::json!({ "success": true, "table": table }))
			})
		}),
	}
}

fn mysql_transfer() -> ToolDefinition
{
	const SCHEMA: super::InputSchema = &[
		FieldSchema::required("from_account", FieldKind::Integer),
		FieldSchema::required("to_account", FieldKind::Integer),
		FieldSchema::required("amount", FieldKind::Number),
	];

	ToolDefinition {
		name: "mysql_transfer",
		group: ToolGroup::Transactions,
		title: "Transfer between two accounts",
		description: "Demonstrates a two-statement transaction (Scenario A in spec.md §8).",
		input_schema: SCHEMA,
		required_scopes: vec![Scope::Write],
		annotations: ToolAnnotations { read_only_hint: false, idempotent_hint: false, destructive_hint: false },
		handler: Arc::new(|call: ToolCall| -> BoxFuture<Result<serde_json::Value>> {
			Box::pin(async move {
				let from_account = call.arguments["from_account"].as_i64().unwrap_or_default();
				let to_account = call.arguments["to_account"].as_i64().unwrap_or_default();
				let amount = call.arguments["amount"].as_f64().unwrap_or_default();

				let transactions = call.database.transactions();
				let handle = transactions.begin(Some(IsolationLevel::RepeatableRead)).await?;

				let debit_args = bind_params(&[Param::F64(amount), Param::I64(from_account)]);
				let debit = transactions
					.execute_on_connection(
						&handle,
						"UPDATE accounts SET balance = balance - ? WHERE id = ?",
						Some(&debit_args),
					)
					.await;

				let Ok(debit) = debit else {
					transactions.rollback(&handle).await?;
					return Err(debit.unwrap_err());
				};

				let credit_args = bind_params(&[Param::F64(amount), Param::I64(to_account)]);
				let credit = transactions
					.execute_on_connection(
						&handle,
						"UPDATE accounts SET balance = balance + ? WHERE id = ?",
						Some(&credit_args),
					)
					.await;

				let Ok(credit) = credit else {
					transactions.rollback(&handle).await?;
					return Err(credit.unwrap_err());
				};

				transactions.commit(&handle).await?;

				Ok(serde_json::json!({
					"success": true,
					"debit": debit,
					"credit": credit,
				}))
			})
		}),
	}
}

fn is_bare_identifier(text: &str) -> bool
{
	crate::database::Identifier::new(text).is_ok()
}
