//! The tool registry: built once per adapter, memoized, read-mostly
//! afterwards. See `spec.md` §4.4 and §5 ("the tool-definition list … is
//! initialized once and read many; after initialization they are
//! effectively immutable and require no locking").

use std::collections::HashMap;
use std::sync::Arc;

use super::{ToolAnnotations, ToolDefinition, ToolGroup};
use crate::auth::Scope;

/// Static feature flags describing what the backing MySQL server
/// supports, per `spec.md` §4.4.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct Capabilities
{
	pub json: bool,
	pub fulltext: bool,
	pub geospatial: bool,
	pub transactions: bool,
	pub prepared_statements: bool,
	pub pooling: bool,
	pub partitioning: bool,
	pub replication: bool,
}

impl Default for Capabilities
{
	fn default() -> Self
	{
		Self {
			json: true,
			fulltext: true,
			geospatial: true,
			transactions: true,
			prepared_statements: true,
			pooling: true,
			partitioning: true,
			replication: true,
		}
	}
}

/// The subset of [`ToolDefinition`] exposed by `list()`/capability
/// listing — everything except the handler closure.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolSummary
{
	pub name: &'static str,
	pub title: &'static str,
	pub description: &'static str,
	pub group: ToolGroup,
	#[serde(rename = "requiredScopes")]
	pub required_scopes: Vec<Scope>,
	pub annotations: ToolAnnotations,
}

impl From<&ToolDefinition> for ToolSummary
{
	fn from(tool: &ToolDefinition) -> Self
	{
		Self {
			name: tool.name,
			title: tool.title,
			description: tool.description,
			group: tool.group,
			required_scopes: tool.required_scopes.clone(),
			annotations: tool.annotations,
		}
	}
}

/// The set of registered tools, built once and never mutated.
#[derive(Clone)]
pub struct ToolRegistry
{
	tools: Arc<HashMap<&'static str, ToolDefinition>>,
	capabilities: Capabilities,
}

impl ToolRegistry
{
	/// Builds the registry from a fixed tool list.
	#[must_use]
	pub fn new(tools: Vec<ToolDefinition>, capabilities: Capabilities) -> Self
	{
		let tools = tools.into_iter().map(|tool| (tool.name, tool)).collect();

		Self { tools: Arc::new(tools), capabilities }
	}

	/// Every registered tool's public summary, in no particular order.
	#[must_use]
	pub fn list(&self) -> Vec<ToolSummary>
	{
		self.tools.values().map(ToolSummary::from).collect()
	}

	/// Looks up one tool definition by name.
	#[must_use]
	pub fn get(&self, name: &str) -> Option<&ToolDefinition>
	{
		self.tools.get(name)
	}

	/// The static capability flags for the backing server.
	#[must_use]
	pub fn capabilities(&self) -> Capabilities
	{
		self.capabilities
	}
}

impl std::fmt::Debug for ToolRegistry
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
	{
		f.debug_struct("ToolRegistry")
			.field("tool_count", &self.tools.len())
			.field("capabilities", &self.capabilities)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::tools::{BoxFuture, ToolCall};

	fn noop_tool(name: &'static str) -> ToolDefinition
	{
		ToolDefinition {
			name,
			group: ToolGroup::Core,
			title: "Noop",
			description: "test tool",
			input_schema: &[],
			required_scopes: vec![Scope::Read],
			annotations: ToolAnnotations::default(),
			handler: std::sync::Arc::new(|_: ToolCall| -> BoxFuture<crate::error::Result<serde_json::Value>> {
				Box::pin(async { Ok(serde_json::json!({"success": true})) })
			}),
		}
	}

	#[test]
	fn lookup_and_listing_round_trip()
	{
		let registry =
			ToolRegistry::new(vec![noop_tool("tool_a"), noop_tool("tool_b")], Capabilities::default());

		assert!(registry.get("tool_a").is_some());
		assert!(registry.get("missing").is_none());
		assert_eq!(registry.list().len(), 2);
	}
}
