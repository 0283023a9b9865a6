//! The auth error taxonomy and its fixed HTTP mapping.
//!
//! See `spec.md` §4.6 and §6: every variant here maps to exactly one HTTP
//! status, and none of them are allowed to leak the JWKS URI, the
//! expected issuer, or other deployment identifiers.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use derive_more::{Display, Error};

use super::scope::{Scope, to_space_delimited};

/// The fixed auth error taxonomy from `spec.md` §4.6.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum AuthError
{
	/// No `Authorization` header, or it didn't carry a `Bearer` token.
	#[display("missing bearer token")]
	TokenMissing,

	/// The token's signature or structure could not be validated.
	#[display("invalid token")]
	InvalidToken,

	/// The token's `exp` claim is in the past (outside clock skew).
	#[display("token expired")]
	TokenExpired,

	/// The token's signature did not verify against any JWKS key.
	#[display("invalid signature")]
	InvalidSignature,

	/// The token's claims failed structural validation (issuer, audience,
	/// `nbf`, …).
	#[display("invalid claims")]
	InvalidClaims,

	/// The caller's scopes do not dominate the tool's required scopes.
	#[display("insufficient scope: requires {}", to_space_delimited(required))]
	InsufficientScope
	{
		required: Vec<Scope>,
	},

	/// RFC 8414 discovery failed (network error, malformed document,
	/// missing `issuer`/`token_endpoint`).
	#[display("authorization server discovery failed")]
	AuthServerDiscovery,

	/// The JWKS document could not be fetched or parsed.
	#[display("failed to fetch signing keys")]
	JwksFetch,

	/// Dynamic client registration failed (informational; no concrete flow
	/// is implemented by the core — see `spec.md` Non-goals).
	#[display("client registration failed")]
	ClientRegistration,
}

impl AuthError
{
	/// The fixed HTTP status this error maps to, per `spec.md` §4.6/§6.
	#[must_use]
	pub fn status_code(&self) -> StatusCode
	{
		match self {
			Self::TokenMissing
			| Self::InvalidToken
			| Self::TokenExpired
			| Self::InvalidSignature
			| Self::InvalidClaims => StatusCode::UNAUTHORIZED,
			Self::InsufficientScope { .. } => StatusCode::FORBIDDEN,
			Self::AuthServerDiscovery | Self::JwksFetch => StatusCode::INTERNAL_SERVER_ERROR,
			Self::ClientRegistration => StatusCode::BAD_REQUEST,
		}
	}

	/// The wire-format `error` code from `spec.md` §6's HTTP mapping.
	#[must_use]
	pub fn error_code(&self) -> &'static str
	{
		match self {
			Self::TokenMissing
			| Self::InvalidToken
			| Self::TokenExpired
			| Self::InvalidSignature
			| Self::InvalidClaims => "invalid_token",
			Self::InsufficientScope { .. } => "insufficient_scope",
			Self::AuthServerDiscovery | Self::JwksFetch => "server_error",
			Self::ClientRegistration => "invalid_client_metadata",
		}
	}
}

impl IntoResponse for AuthError
{
	fn into_response(self) -> Response
	{
		let status = self.status_code();
		let error = self.error_code();

		let body = match &self {
			Self::InsufficientScope { required } => serde_json::json!({
				"error": error,
				"scope": to_space_delimited(required),
			}),
			Self::AuthServerDiscovery | Self::JwksFetch => serde_json::json!({ "error": error }),
			other => serde_json::json!({
				"error": error,
				"error_description": other.to_string(),
			}),
		};

		(status, Json(body)).into_response()
	}
}

#[cfg(test)]
mod tests
{
	use super::*;

	#[test]
	fn maps_token_problems_to_401_invalid_token()
	{
		for error in [
			AuthError::TokenMissing,
			AuthError::InvalidToken,
			AuthError::TokenExpired,
			AuthError::InvalidSignature,
			AuthError::InvalidClaims,
		] {
			assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);
			assert_eq!(error.error_code(), "invalid_token");
		}
	}

	#[test]
	fn maps_insufficient_scope_to_403()
	{
		let error = AuthError::InsufficientScope { required: vec![Scope::Admin] };
		assert_eq!(error.status_code(), StatusCode::FORBIDDEN);
		assert_eq!(error.error_code(), "insufficient_scope");
	}

	#[test]
	fn maps_discovery_and_jwks_failures_to_500()
	{
		assert_eq!(AuthError::AuthServerDiscovery.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
		assert_eq!(AuthError::JwksFetch.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
	}
}
