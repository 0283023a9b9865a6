//! The dispatch pipeline: lookup → validate → scope-gate → invoke → shape
//! errors. See `spec.md` §4.4.

use super::registry::ToolRegistry;
use super::validation::validate;
use super::ToolCall;
use crate::auth::{AuthContext, AuthError, Scope};
use crate::database::Database;
use crate::error::{classify_duplicate, classify_missing_entity, Error};

/// Runs tool invocations against a fixed [`ToolRegistry`] and [`Database`].
#[derive(Clone)]
pub struct Dispatcher
{
	registry: ToolRegistry,
	database: Database,
}

impl Dispatcher
{
	#[must_use]
	pub fn new(registry: ToolRegistry, database: Database) -> Self
	{
		Self { registry, database }
	}

	/// Dispatches one `{name, arguments}` call, per `spec.md` §4.4 and §6.
	///
	/// The only failure mode returned as `Err` is the scope gate
	/// (`AuthError::InsufficientScope`), since that's the one step with its
	/// own fixed HTTP mapping (403) distinct from the generic tool-result
	/// envelope. Everything else — unknown tool, invalid input, handler
	/// errors — is shaped into the `Ok` JSON value per §6's response
	/// shapes (`{success: false, error}` / `{exists: false, …}` /
	/// `{success: false, reason}`).
	///
	/// A correlation id (a ULID, minted fresh for this call) is attached to
	/// the tracing span and to the "handler returned an error" log line, so
	/// a client-visible sanitized message can be traced back to the full
	/// server-side error without putting that detail on the wire.
	#[tracing::instrument(
		level = "debug",
		skip(self, arguments, context),
		fields(tool = name, correlation_id = tracing::field::Empty)
	)]
	pub async fn dispatch(
		&self,
		name: &str,
		arguments: serde_json::Value,
		context: &AuthContext,
	) -> Result<serde_json::Value, AuthError>
	{
		let correlation_id = ulid::Ulid::new();
		tracing::Span::current().record("correlation_id", tracing::field::display(correlation_id));

		let Some(tool) = self.registry.get(name) else {
			return Ok(shape_error(&Error::not_found(name)));
		};

		let arguments = match validate(tool.input_schema, &arguments) {
			Ok(arguments) => arguments,
			Err(errors) => {
				return Ok(serde_json::json!({
					"success": false,
					"error": errors.join("; "),
				}));
			},
		};

		let missing: Vec<Scope> = tool
			.required_scopes
			.iter()
			.filter(|scope| !crate::auth::scope::has_scope(&context.scopes, scope))
			.cloned()
			.collect();

		if !missing.is_empty() {
			return Err(AuthError::InsufficientScope { required: missing });
		}

		let call = ToolCall {
			arguments,
			context: context.clone(),
			database: self.database.clone(),
		};

		match (tool.handler)(call).await {
			Ok(value) => Ok(value),
			Err(error) => {
				tracing::warn!(
					tool = name,
					%correlation_id,
					error = %error,
					"tool handler returned an error"
				);
				Ok(shape_error(&error))
			},
		}
	}
}

impl std::fmt::Debug for Dispatcher
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
	{
		f.debug_struct("Dispatcher").finish_non_exhaustive()
	}
}

/// The generic error-shaping rule from `spec.md` §4.4 point 5 / §7: an
/// error that escaped a handler (rather than being demoted inside it) is
/// classified by the same driver-message markers the core uses elsewhere,
/// then rendered into one of the fixed response shapes.
fn shape_error(error: &Error) -> serde_json::Value
{
	match error {
		Error::Validation(message) => serde_json::json!({
			"success": false,
			"error": message,
		}),
		Error::Query { message, .. } if classify_missing_entity(message) => serde_json::json!({
			"exists": false,
			"error": message,
		}),
		Error::Query { message, .. } if classify_duplicate(message) => serde_json::json!({
			"success": false,
			"reason": message,
		}),
		other => serde_json::json!({
			"success": false,
			"error": other.to_string(),
		}),
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::tools::{BoxFuture, Capabilities, FieldKind, FieldSchema, ToolAnnotations, ToolDefinition, ToolGroup};

	fn echo_tool() -> ToolDefinition
	{
		ToolDefinition {
			name: "echo",
			group: ToolGroup::Core,
			title: "Echo",
			description: "echoes its input back",
			input_schema: &[FieldSchema::required("value", FieldKind::String)],
			required_scopes: vec![Scope::Read],
			annotations: ToolAnnotations::default(),
			handler: std::sync::Arc::new(|call: ToolCall| -> BoxFuture<crate::error::Result<serde_json::Value>> {
				Box::pin(async move { Ok(serde_json::json!({"success": true, "value": call.arguments["value"]})) })
			}),
		}
	}

	fn failing_tool() -> ToolDefinition
	{
		ToolDefinition {
			name: "boom",
			group: ToolGroup::Core,
			title: "Boom",
			description: "always fails with a missing-entity driver message",
			input_schema: &[],
			required_scopes: vec![],
			annotations: ToolAnnotations::default(),
			handler: std::sync::Arc::new(|_: ToolCall| -> BoxFuture<crate::error::Result<serde_json::Value>> {
				Box::pin(async {
					Err(Error::query("Table 'app.ghost' doesn't exist", "SELECT * FROM ghost"))
				})
			}),
		}
	}

	fn dispatcher() -> Dispatcher
	{
		// No real MySQL endpoint is reachable in tests, so only paths that
		// never touch the pool (lookup, validation, scope gate, handlers
		// that don't call the executor) are exercised here.
		let registry = ToolRegistry::new(vec![echo_tool(), failing_tool()], Capabilities::default());

		Dispatcher { registry, database: crate::database::Database::for_test() }
	}

	#[tokio::test]
	async fn unknown_tool_reports_not_found_shape()
	{
		let dispatcher = dispatcher();
		let context = AuthContext::anonymous();

		let result = dispatcher.dispatch("missing", serde_json::json!({}), &context).await.unwrap();
		assert_eq!(result["success"], false);
	}

	#[tokio::test]
	async fn invalid_arguments_report_validation_shape()
	{
		let dispatcher = dispatcher();
		let context = AuthContext { authenticated: true, scopes: vec![Scope::Read], claims: None };

		let result = dispatcher.dispatch("echo", serde_json::json!({}), &context).await.unwrap();
		assert_eq!(result["success"], false);
		assert!(result["error"].as_str().unwrap().contains("value"));
	}

	#[tokio::test]
	async fn missing_scope_is_rejected_before_invocation()
	{
		let dispatcher = dispatcher();
		let context = AuthContext::anonymous();

		let error = dispatcher
			.dispatch("echo", serde_json::json!({"value": "x"}), &context)
			.await
			.unwrap_err();

		assert_eq!(error, AuthError::InsufficientScope { required: vec![Scope::Read] });
	}

	#[tokio::test]
	async fn successful_invocation_returns_handler_value()
	{
		let dispatcher = dispatcher();
		let context = AuthContext { authenticated: true, scopes: vec![Scope::Read], claims: None };

		let result = dispatcher
			.dispatch("echo", serde_json::json!({"value": "hi"}), &context)
			.await
			.unwrap();

		assert_eq!(result["value"], "hi");
	}

	#[tokio::test]
	async fn handler_missing_entity_error_is_shaped()
	{
		let dispatcher = dispatcher();
		let context = AuthContext::anonymous();

		let result = dispatcher.dispatch("boom", serde_json::json!({}), &context).await.unwrap();
		assert_eq!(result["exists"], false);
	}
}
