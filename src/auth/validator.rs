//! JWT verification against a remote JWKS, with TTL caching.

use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};

use super::claims::Claims;
use super::discovery::AuthServerDiscovery;
use super::error::AuthError;
use crate::config::Config;

/// One entry of a JWKS `keys` array.
#[derive(Debug, Clone, Deserialize)]
struct Jwk
{
	kty: String,
	kid: Option<String>,
	#[serde(rename = "alg")]
	algorithm: Option<String>,
	n: Option<String>,
	e: Option<String>,
	crv: Option<String>,
	x: Option<String>,
	y: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JwksDocument
{
	keys: Vec<Jwk>,
}

impl Jwk
{
	fn decoding_key(&self) -> Result<DecodingKey, AuthError>
	{
		match self.kty.as_str() {
			"RSA" => {
				let (n, e) = self.n.as_deref().zip(self.e.as_deref()).ok_or(AuthError::JwksFetch)?;

				DecodingKey::from_rsa_components(n, e).map_err(|_| AuthError::JwksFetch)
			},
			"EC" => {
				let (x, y) = self.x.as_deref().zip(self.y.as_deref()).ok_or(AuthError::JwksFetch)?;

				DecodingKey::from_ec_components(x, y).map_err(|_| AuthError::JwksFetch)
			},
			_ => Err(AuthError::JwksFetch),
		}
	}
}

/// Verifies JWTs against the authorization server's published JWKS.
///
/// Holds its own TTL cache of the JWKS document, separate from (but
/// built alongside) [`AuthServerDiscovery`]'s RFC 8414 cache.
#[derive(Clone)]
pub struct TokenValidator
{
	http: reqwest::Client,
	discovery: AuthServerDiscovery,
	audience: String,
	allowed_algorithms: Vec<Algorithm>,
	clock_skew: Duration,
	jwks_ttl: Duration,
	jwks_cache: Arc<RwLock<Option<(Vec<Jwk>, Instant)>>>,
	refresh_lock: Arc<Mutex<()>>,
}

impl TokenValidator
{
	/// Builds a validator sharing `discovery`'s cached authorization
	/// server metadata.
	#[must_use]
	pub fn new(config: &Config, discovery: AuthServerDiscovery) -> Self
	{
		Self {
			http: reqwest::Client::new(),
			discovery,
			audience: config.jwt_audience().to_owned(),
			allowed_algorithms: config.jwt_allowed_algorithms().to_vec(),
			clock_skew: config.jwt_clock_skew(),
			jwks_ttl: config.jwks_cache_ttl(),
			jwks_cache: Arc::new(RwLock::new(None)),
			refresh_lock: Arc::new(Mutex::new(())),
		}
	}

	/// Verifies `token`'s signature and claims, returning the decoded
	/// [`Claims`] on success.
	///
	/// Enforces issuer (against the authorization server's discovered
	/// `issuer`), audience, expiry (with the configured clock-skew
	/// window), and that the token's algorithm is in the configured
	/// allowlist. Errors never carry the JWKS URI, expected issuer, or
	/// other deployment identifiers — only the fixed taxonomy in
	/// [`AuthError`].
	#[tracing::instrument(level = "debug", skip(self, token), err(level = "debug"))]
	pub async fn validate(&self, token: &str) -> Result<Claims, AuthError>
	{
		let header = decode_header(token).map_err(|_| AuthError::InvalidToken)?;

		if !self.allowed_algorithms.contains(&header.alg) {
			return Err(AuthError::InvalidToken);
		}

		let keys = self.jwks().await?;
		let candidates: Vec<&Jwk> = keys
			.iter()
			.filter(|key| {
				header.kid.as_deref().is_none_or(|kid| key.kid.as_deref() == Some(kid))
			})
			.collect();

		if candidates.is_empty() {
			return Err(AuthError::InvalidSignature);
		}

		let issuer = self.discovery.issuer().await?;

		let mut validation = Validation::new(header.alg);
		validation.set_audience(&[&self.audience]);
		validation.set_issuer(&[&issuer]);
		validation.leeway = self.clock_skew.as_secs();
		validation.validate_exp = true;
		validation.validate_nbf = true;

		let mut last_error = AuthError::InvalidSignature;

		for key in candidates {
			let decoding_key = match key.decoding_key() {
				Ok(key) => key,
				Err(error) => {
					last_error = error;
					continue;
				},
			};

			match decode::<Claims>(token, &decoding_key, &validation) {
				Ok(data) => return Ok(data.claims),
				Err(error) => {
					last_error = classify_decode_error(&error);
				},
			}
		}

		Err(last_error)
	}

	async fn jwks(&self) -> Result<Vec<Jwk>, AuthError>
	{
		if let Some(keys) = self.fresh_cached().await {
			return Ok(keys);
		}

		let _guard = self.refresh_lock.lock().await;

		if let Some(keys) = self.fresh_cached().await {
			return Ok(keys);
		}

		let keys = self.fetch_jwks().await?;
		*self.jwks_cache.write().await = Some((keys.clone(), Instant::now()));

		Ok(keys)
	}

	async fn fresh_cached(&self) -> Option<Vec<Jwk>>
	{
		let cached = self.jwks_cache.read().await;
		let (keys, fetched_at) = cached.as_ref()?;

		(fetched_at.elapsed() < self.jwks_ttl).then(|| keys.clone())
	}

	#[tracing::instrument(level = "debug", skip(self), err(level = "warn"))]
	async fn fetch_jwks(&self) -> Result<Vec<Jwk>, AuthError>
	{
		let jwks_uri = self.discovery.jwks_uri().await?;

		let document: JwksDocument = self
			.http
			.get(jwks_uri)
			.send()
			.await
			.map_err(|_| AuthError::JwksFetch)?
			.error_for_status()
			.map_err(|_| AuthError::JwksFetch)?
			.json()
			.await
			.map_err(|_| AuthError::JwksFetch)?;

		Ok(document.keys)
	}
}

impl std::fmt::Debug for TokenValidator
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
	{
		f.debug_struct("TokenValidator").finish_non_exhaustive()
	}
}

fn classify_decode_error(error: &jsonwebtoken::errors::Error) -> AuthError
{
	use jsonwebtoken::errors::ErrorKind;

	match error.kind() {
		ErrorKind::ExpiredSignature => AuthError::TokenExpired,
		ErrorKind::InvalidSignature => AuthError::InvalidSignature,
		ErrorKind::InvalidIssuer | ErrorKind::InvalidAudience | ErrorKind::ImmatureSignature => {
			AuthError::InvalidClaims
		},
		_ => AuthError::InvalidToken,
	}
}

#[cfg(test)]
mod tests
{
	use super::*;

	#[test]
	fn rsa_jwk_without_modulus_fails_cleanly()
	{
		let jwk = Jwk {
			kty: "RSA".to_owned(),
			kid: Some("key-1".to_owned()),
			algorithm: Some("RS256".to_owned()),
			n: None,
			e: None,
			crv: None,
			x: None,
			y: None,
		};

		assert!(matches!(jwk.decoding_key(), Err(AuthError::JwksFetch)));
	}

	#[test]
	fn unsupported_key_type_fails_cleanly()
	{
		let jwk = Jwk {
			kty: "oct".to_owned(),
			kid: None,
			algorithm: None,
			n: None,
			e: None,
			crv: None,
			x: None,
			y: None,
		};

		assert!(matches!(jwk.decoding_key(), Err(AuthError::JwksFetch)));
	}

	#[test]
	fn classifies_expired_and_default_jsonwebtoken_errors()
	{
		use jsonwebtoken::errors::{Error, ErrorKind};

		assert_eq!(
			classify_decode_error(&Error::from(ErrorKind::ExpiredSignature)),
			AuthError::TokenExpired
		);
		assert_eq!(
			classify_decode_error(&Error::from(ErrorKind::InvalidSignature)),
			AuthError::InvalidSignature
		);
		assert_eq!(
			classify_decode_error(&Error::from(ErrorKind::InvalidIssuer)),
			AuthError::InvalidClaims
		);
		assert_eq!(
			classify_decode_error(&Error::from(ErrorKind::InvalidAlgorithmName)),
			AuthError::InvalidToken
		);
	}
}
