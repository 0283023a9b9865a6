//! RFC 8414 authorization-server metadata discovery, with TTL caching and
//! single-flight refresh.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};
use url::Url;

use super::error::AuthError;
use crate::config::Config;

/// The cached RFC 8414 document, plus when it was fetched.
#[derive(Debug, Clone)]
pub struct AuthServerMetadata
{
	pub issuer: String,
	pub token_endpoint: Url,
	pub authorization_endpoint: Option<Url>,
	pub jwks_uri: Url,
	pub registration_endpoint: Option<Url>,
	pub grant_types_supported: Option<Vec<String>>,
	pub scopes_supported: Option<Vec<String>>,
	fetched_at: Instant,
}

/// The wire shape of `/.well-known/oauth-authorization-server`.
#[derive(Debug, serde::Deserialize)]
struct DiscoveryDocument
{
	issuer: Option<String>,
	token_endpoint: Option<Url>,
	authorization_endpoint: Option<Url>,
	jwks_uri: Option<Url>,
	registration_endpoint: Option<Url>,
	grant_types_supported: Option<Vec<String>>,
	scopes_supported: Option<Vec<String>>,
}

/// Fetches and caches the authorization server's RFC 8414 metadata.
///
/// At most one in-flight fetch per process, per `spec.md` §5 ("Auth and
/// JWKS caches are read-mostly; updates are guarded against stampedes").
#[derive(Clone)]
pub struct AuthServerDiscovery
{
	http: reqwest::Client,
	base_url: Url,
	ttl: Duration,
	cache: Arc<RwLock<Option<AuthServerMetadata>>>,
	refresh_lock: Arc<Mutex<()>>,
	fetch_count: Arc<AtomicU64>,
}

impl AuthServerDiscovery
{
	/// Builds a discovery client over `config`'s authorization server URL
	/// and cache TTL. Performs no network I/O until first use.
	#[must_use]
	pub fn new(config: &Config) -> Self
	{
		Self {
			http: reqwest::Client::new(),
			base_url: config.authorization_server_url().clone(),
			ttl: config.discovery_cache_ttl(),
			cache: Arc::new(RwLock::new(None)),
			refresh_lock: Arc::new(Mutex::new(())),
			fetch_count: Arc::new(AtomicU64::new(0)),
		}
	}

	/// The `jwks_uri` from the current (possibly freshly fetched) metadata.
	#[tracing::instrument(level = "debug", skip(self), err(level = "debug"))]
	pub async fn jwks_uri(&self) -> Result<Url, AuthError>
	{
		Ok(self.ensure_fresh().await?.jwks_uri)
	}

	/// The `issuer` from the current metadata — the value JWTs from this
	/// authorization server are expected to carry in their `iss` claim.
	pub async fn issuer(&self) -> Result<String, AuthError>
	{
		Ok(self.ensure_fresh().await?.issuer)
	}

	/// The `token_endpoint` from the current metadata.
	pub async fn token_endpoint(&self) -> Result<Url, AuthError>
	{
		Ok(self.ensure_fresh().await?.token_endpoint)
	}

	/// The `registration_endpoint`, if the authorization server advertises
	/// one.
	pub async fn registration_endpoint(&self) -> Result<Option<Url>, AuthError>
	{
		Ok(self.ensure_fresh().await?.registration_endpoint)
	}

	/// Whether `grant_type` appears in `grant_types_supported`. Absent
	/// metadata (the field is optional per RFC 8414) is treated as
	/// "unknown", not "unsupported" — callers should not gate solely on
	/// this.
	pub async fn supports_grant_type(&self, grant_type: &str) -> Result<bool, AuthError>
	{
		let metadata = self.ensure_fresh().await?;

		Ok(metadata
			.grant_types_supported
			.as_ref()
			.is_some_and(|grants| grants.iter().any(|grant| grant == grant_type)))
	}

	/// Forces the next access to re-fetch, regardless of TTL.
	pub async fn invalidate_cache(&self)
	{
		*self.cache.write().await = None;
	}

	/// The number of network fetches performed so far. Exposed for tests
	/// exercising the single-flight/TTL behavior (Testable Property 9).
	#[must_use]
	pub fn fetch_count(&self) -> u64
	{
		self.fetch_count.load(Ordering::SeqCst)
	}

	async fn ensure_fresh(&self) -> Result<AuthServerMetadata, AuthError>
	{
		if let Some(metadata) = self.fresh_cached().await {
			return Ok(metadata);
		}

		let _guard = self.refresh_lock.lock().await;

		// Re-check: another task may have refreshed while we waited for the
		// lock.
		if let Some(metadata) = self.fresh_cached().await {
			return Ok(metadata);
		}

		let metadata = self.fetch().await?;
		*self.cache.write().await = Some(metadata.clone());

		Ok(metadata)
	}

	async fn fresh_cached(&self) -> Option<AuthServerMetadata>
	{
		let cached = self.cache.read().await.clone()?;

		(cached.fetched_at.elapsed() < self.ttl).then_some(cached)
	}

	#[tracing::instrument(level = "debug", skip(self), err(level = "warn"))]
	async fn fetch(&self) -> Result<AuthServerMetadata, AuthError>
	{
		let url = self
			.base_url
			.join(".well-known/oauth-authorization-server")
			.map_err(|_| AuthError::AuthServerDiscovery)?;

		let response = self
			.http
			.get(url)
			.send()
			.await
			.map_err(|_| AuthError::AuthServerDiscovery)?
			.error_for_status()
			.map_err(|_| AuthError::AuthServerDiscovery)?;

		let document: DiscoveryDocument =
			response.json().await.map_err(|_| AuthError::AuthServerDiscovery)?;

		let issuer = document.issuer.ok_or(AuthError::AuthServerDiscovery)?;
		let token_endpoint = document.token_endpoint.ok_or(AuthError::AuthServerDiscovery)?;
		let jwks_uri = document.jwks_uri.ok_or(AuthError::AuthServerDiscovery)?;

		self.fetch_count.fetch_add(1, Ordering::SeqCst);

		Ok(AuthServerMetadata {
			issuer,
			token_endpoint,
			authorization_endpoint: document.authorization_endpoint,
			jwks_uri,
			registration_endpoint: document.registration_endpoint,
			grant_types_supported: document.grant_types_supported,
			scopes_supported: document.scopes_supported,
			fetched_at: Instant::now(),
		})
	}
}

impl std::fmt::Debug for AuthServerDiscovery
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
	{
		f.debug_struct("AuthServerDiscovery")
			.field("base_url", &self.base_url.as_str())
			.field("ttl", &self.ttl)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests
{
	use std::net::SocketAddr;

	use axum::Json;
	use axum::routing::get;
	use tokio::net::TcpListener;

	use super::*;

	async fn spawn_mock_discovery_server(fetches: Arc<AtomicU64>) -> SocketAddr
	{
		let router = axum::Router::new().route(
			"/.well-known/oauth-authorization-server",
			get(move || {
				let fetches = Arc::clone(&fetches);

				async move {
					fetches.fetch_add(1, Ordering::SeqCst);

					Json(serde_json::json!({
						"issuer": "https://auth.example",
						"token_endpoint": "https://auth.example/token",
						"jwks_uri": "https://auth.example/jwks.json",
					}))
				}
			}),
		);

		let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock server");
		let addr = listener.local_addr().expect("local addr");

		tokio::spawn(async move {
			axum::serve(listener, router).await.expect("mock server");
		});

		addr
	}

	#[tokio::test]
	async fn caches_within_ttl_and_refetches_after_invalidate()
	{
		let server_fetches = Arc::new(AtomicU64::new(0));
		let addr = spawn_mock_discovery_server(Arc::clone(&server_fetches)).await;

		let discovery = AuthServerDiscovery {
			http: reqwest::Client::new(),
			base_url: format!("http://{addr}/").parse().expect("valid url"),
			ttl: Duration::from_secs(3600),
			cache: Arc::new(RwLock::new(None)),
			refresh_lock: Arc::new(Mutex::new(())),
			fetch_count: Arc::new(AtomicU64::new(0)),
		};

		for _ in 0..5 {
			discovery.jwks_uri().await.expect("discovery succeeds");
		}

		assert_eq!(discovery.fetch_count(), 1);

		discovery.invalidate_cache().await;
		discovery.jwks_uri().await.expect("discovery succeeds");

		assert_eq!(discovery.fetch_count(), 2);
	}
}
