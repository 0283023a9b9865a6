//! The gateway's bootstrap binary.
//!
//! Thin and non-core, per `SPEC_FULL.md` §1.5: install the panic/error
//! hook, load configuration, bring the database and auth layers up, mount
//! the HTTP surface, and shut down cleanly on signal. Everything with
//! actual behavior lives in the library crate.

use mysql_mcp_gateway::auth::{AuthServerDiscovery, ResourceServerMetadata, TokenValidator};
use mysql_mcp_gateway::config::Config;
use mysql_mcp_gateway::database::Database;
use mysql_mcp_gateway::http::{self, AppState};
use mysql_mcp_gateway::tools::{Capabilities, Dispatcher, ToolRegistry};
use mysql_mcp_gateway::{signal, telemetry};

#[tokio::main]
async fn main() -> color_eyre::Result<()>
{
	color_eyre::install()?;
	telemetry::init();

	if let Err(error) = dotenvy::dotenv() {
		tracing::debug!(%error, "no .env file loaded");
	}

	let config = Config::from_env()?;
	let database = Database::initialize(&config).await?;

	let discovery = AuthServerDiscovery::new(&config);
	let validator = TokenValidator::new(&config, discovery);
	let metadata = ResourceServerMetadata::from_config(&config);

	// The ~190 real tool bodies are an external collaborator (`spec.md`
	// §1 Non-goals); `demo_tools()` exercises every pattern the real
	// catalog would use (raw read, parameterized write, transactional,
	// schema-introspecting, schema-mutating).
	let registry =
		ToolRegistry::new(mysql_mcp_gateway::tools::catalog::demo_tools(), Capabilities::default());
	let dispatcher = Dispatcher::new(registry.clone(), database.clone());

	let router = http::router(AppState::new(metadata, validator, dispatcher, registry));

	let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
	tracing::info!(addr = %config.bind_addr(), "listening");

	axum::serve(listener, router).with_graceful_shutdown(signal::shutdown()).await?;

	tracing::info!("shutting down");
	database.shutdown().await;

	Ok(())
}
