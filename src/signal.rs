//! OS shutdown-signal handling.
//!
//! Grounded on the teacher's own `signal.rs`: wait for either `ctrl_c` or
//! (on Unix) `SIGTERM`, whichever arrives first, logging which one fired.
//! `main.rs` awaits [`shutdown`] and then drains the transaction map and
//! pool per `spec.md` §4.3's adapter shutdown obligation.

use std::error::Error;

use tokio::signal::ctrl_c;

/// Resolves once the process has been asked to shut down.
pub async fn shutdown()
{
	tokio::select! {
		result = ctrl_c() => match result {
			Ok(()) => tracing::debug!("received SIGINT"),
			Err(error) => {
				tracing::error!(error = &error as &dyn Error, "failed listening for SIGINT");
			},
		},

		() = platform_specific_shutdown() => {},
	}
}

#[cfg(unix)]
async fn platform_specific_shutdown()
{
	use tokio::signal::unix::{signal, SignalKind};

	match signal(SignalKind::terminate()) {
		Ok(mut signal) => match signal.recv().await {
			Some(()) => tracing::debug!("received SIGTERM"),
			None => tracing::warn!("cannot receive more SIGTERM signals"),
		},
		Err(error) => {
			tracing::error!(error = &error as &dyn Error, "failed listening for SIGTERM");
		},
	}
}

#[cfg(not(unix))]
async fn platform_specific_shutdown()
{
	std::future::pending().await
}
