//! The tool catalog and its dispatch runtime.
//!
//! See `spec.md` §4.4. The ~190 real tool bodies are an external
//! collaborator (§1 Non-goals); this module owns the registry, the
//! validation descriptor, and the dispatch pipeline, plus a small
//! placeholder catalog exercising each piece.

pub mod catalog;
pub mod dispatcher;
pub mod registry;
pub mod validation;

pub use self::dispatcher::Dispatcher;
pub use self::registry::{Capabilities, ToolRegistry, ToolSummary};
pub use self::validation::{FieldKind, FieldSchema, InputSchema};

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::auth::Scope;
use crate::database::Database;
use crate::error::Result;

/// The closed set of tool groupings from `spec.md` §3. Drives scope
/// mapping and registry layout; not every variant has a placeholder tool
/// in [`catalog`] since the real bodies are out of scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolGroup
{
	Core,
	Json,
	Text,
	Fulltext,
	Performance,
	Optimization,
	Admin,
	Monitoring,
	Backup,
	Replication,
	Partitioning,
	Transactions,
	Spatial,
	Security,
	Cluster,
	Roles,
	Docstore,
	Sysschema,
	Stats,
	Events,
	Schema,
	Shell,
	Router,
	Proxysql,
	Codemode,
}

/// `{readOnlyHint, idempotentHint, destructiveHint}` from `spec.md` §3.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct ToolAnnotations
{
	#[serde(rename = "readOnlyHint")]
	pub read_only_hint: bool,

	#[serde(rename = "idempotentHint")]
	pub idempotent_hint: bool,

	#[serde(rename = "destructiveHint")]
	pub destructive_hint: bool,
}

/// The arguments passed to a tool's handler: the parsed input object, the
/// caller's auth context, and non-owning access to the adapter (`Database`
/// is a cheap `Clone` over `Arc`-backed pool/transaction state, matching
/// §3's "tool handlers hold only non-owning access to the adapter").
pub struct ToolCall
{
	pub arguments: serde_json::Value,
	pub context: crate::auth::AuthContext,
	pub database: Database,
}

/// A boxed, `'static` future — handlers own everything they close over so
/// this doesn't need a lifetime parameter threaded through the registry.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// A tool's handler: a pure async function from a [`ToolCall`] to either a
/// bare JSON result value or a propagated [`Error`][crate::error::Error].
///
/// Expected failures (missing entity, duplicate name, "already exists")
/// are the handler's responsibility to demote into a structured `Ok`
/// value per §7; only truly unexpected failures should be left as `Err`
/// for the dispatcher's generic shaping.
pub type ToolHandler = Arc<dyn Fn(ToolCall) -> BoxFuture<Result<serde_json::Value>> + Send + Sync>;

/// An immutable tool definition, per `spec.md` §3's `ToolDefinition`
/// record.
#[derive(Clone)]
pub struct ToolDefinition
{
	pub name: &'static str,
	pub group: ToolGroup,
	pub title: &'static str,
	pub description: &'static str,
	pub input_schema: InputSchema,
	pub required_scopes: Vec<Scope>,
	pub annotations: ToolAnnotations,
	pub handler: ToolHandler,
}

impl std::fmt::Debug for ToolDefinition
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
	{
		f.debug_struct("ToolDefinition")
			.field("name", &self.name)
			.field("group", &self.group)
			.field("required_scopes", &self.required_scopes)
			.finish_non_exhaustive()
	}
}
