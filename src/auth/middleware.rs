//! Bearer-token extraction and request-level authentication/authorization.

use super::error::AuthError;
use super::scope::Scope;
use super::validator::TokenValidator;
use super::{AuthContext, AuthRequirement};

/// Pulls the bearer token out of an `Authorization` header value.
///
/// Accepts exactly one space between the case-insensitive `Bearer`
/// keyword and the token; anything else (missing header, wrong scheme,
/// empty token) is `None` rather than an error — callers decide whether
/// that matters via [`AuthRequirement`].
#[must_use]
pub fn extract_bearer_token(header: Option<&str>) -> Option<&str>
{
	let header = header?;
	let (scheme, token) = header.split_once(' ')?;

	if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() || token.contains(' ') {
		return None;
	}

	Some(token)
}

/// Builds an [`AuthContext`] from an `Authorization` header value.
///
/// Never fails: a missing header, a malformed scheme, or a token that
/// fails verification all produce [`AuthContext::anonymous`]. Whether
/// that's acceptable is [`validate_auth`]'s job.
pub async fn create_auth_context(
	authorization_header: Option<&str>,
	validator: &TokenValidator,
) -> AuthContext
{
	let Some(token) = extract_bearer_token(authorization_header) else {
		return AuthContext::anonymous();
	};

	match validator.validate(token).await {
		Ok(claims) => AuthContext::authenticated(claims),
		Err(_) => AuthContext::anonymous(),
	}
}

/// Enforces `requirement` against `context`, raising the specific
/// [`AuthError`] a caller should translate into an HTTP response.
///
/// `requirement.required == false` always passes, even for an anonymous
/// context. Otherwise an anonymous context is [`AuthError::TokenMissing`],
/// and an authenticated one missing a required scope is
/// [`AuthError::InsufficientScope`].
pub fn validate_auth(context: &AuthContext, requirement: &AuthRequirement) -> Result<(), AuthError>
{
	if !requirement.required {
		return Ok(());
	}

	if !context.authenticated {
		return Err(AuthError::TokenMissing);
	}

	let missing: Vec<Scope> = requirement
		.required_scopes
		.iter()
		.filter(|scope| !super::scope::has_scope(&context.scopes, scope))
		.cloned()
		.collect();

	if !missing.is_empty() {
		return Err(AuthError::InsufficientScope { required: missing });
	}

	Ok(())
}

#[cfg(test)]
mod tests
{
	use super::*;

	#[test]
	fn extracts_bearer_token_case_insensitively()
	{
		assert_eq!(extract_bearer_token(Some("Bearer abc123")), Some("abc123"));
		assert_eq!(extract_bearer_token(Some("bearer abc123")), Some("abc123"));
		assert_eq!(extract_bearer_token(Some("BEARER abc123")), Some("abc123"));
	}

	#[test]
	fn rejects_malformed_authorization_headers()
	{
		assert_eq!(extract_bearer_token(None), None);
		assert_eq!(extract_bearer_token(Some("Basic abc123")), None);
		assert_eq!(extract_bearer_token(Some("Bearer")), None);
		assert_eq!(extract_bearer_token(Some("Bearer ")), None);
		assert_eq!(extract_bearer_token(Some("Bearer a b")), None);
	}

	#[test]
	fn no_requirement_passes_even_anonymous()
	{
		let context = AuthContext::anonymous();
		assert!(validate_auth(&context, &AuthRequirement::none()).is_ok());
	}

	#[test]
	fn anonymous_context_fails_when_auth_required()
	{
		let context = AuthContext::anonymous();
		let error = validate_auth(&context, &AuthRequirement::authenticated()).unwrap_err();
		assert_eq!(error, AuthError::TokenMissing);
	}

	#[test]
	fn missing_scope_reports_insufficient_scope()
	{
		let context = AuthContext { authenticated: true, scopes: vec![Scope::Read], claims: None };

		let error =
			validate_auth(&context, &AuthRequirement::with_scopes(vec![Scope::Write])).unwrap_err();

		assert_eq!(error, AuthError::InsufficientScope { required: vec![Scope::Write] });
	}

	#[test]
	fn dominating_scope_satisfies_requirement()
	{
		let context = AuthContext { authenticated: true, scopes: vec![Scope::Admin], claims: None };

		assert!(validate_auth(&context, &AuthRequirement::with_scopes(vec![Scope::Write])).is_ok());
	}
}
