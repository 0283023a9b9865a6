//! Process-wide tracing setup.
//!
//! See `SPEC_FULL.md` §1.2: every suspension point named in `spec.md` §5
//! is `#[tracing::instrument]`'d; this module only owns the one-time
//! subscriber initialization those instrument calls write into.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::UtcTime;

/// Initializes the global tracing subscriber from `RUST_LOG`.
///
/// Defaults to human-readable `.pretty()` output; setting
/// `GATEWAY_LOG_FORMAT=json` switches to structured JSON lines, for
/// deployments that feed logs into something that parses them rather than
/// a terminal.
pub fn init()
{
	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

	let json_output = std::env::var("GATEWAY_LOG_FORMAT").is_ok_and(|format| format == "json");

	if json_output {
		tracing_subscriber::fmt()
			.json()
			.with_timer(UtcTime::rfc_3339())
			.with_env_filter(env_filter)
			.init();
	} else {
		tracing_subscriber::fmt()
			.pretty()
			.with_file(true)
			.with_line_number(true)
			.with_timer(UtcTime::rfc_3339())
			.with_env_filter(env_filter)
			.init();
	}
}
