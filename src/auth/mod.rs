//! OAuth 2.0 resource-server authentication and authorization.
//!
//! Covers RFC 9728 protected-resource metadata, RFC 8414 authorization-
//! server discovery, JWT verification against a JWKS, and the scope
//! hierarchy that gates tool invocation. See `spec.md` §4.6.

pub mod claims;
pub mod discovery;
pub mod error;
pub mod middleware;
pub mod resource_server;
pub mod scope;
pub mod validator;

pub use self::claims::Claims;
pub use self::discovery::{AuthServerDiscovery, AuthServerMetadata};
pub use self::error::AuthError;
pub use self::middleware::{create_auth_context, extract_bearer_token, validate_auth};
pub use self::resource_server::ResourceServerMetadata;
pub use self::scope::Scope;
pub use self::validator::TokenValidator;

/// The outcome of attempting to authenticate an inbound request.
///
/// Building this never fails — an absent or malformed token simply
/// produces an unauthenticated context with no scopes. Authorization
/// decisions (whether a given route *requires* authentication) happen
/// downstream, in [`validate_auth`].
#[derive(Debug, Clone)]
pub struct AuthContext
{
	pub authenticated: bool,
	pub scopes: Vec<Scope>,
	pub claims: Option<Claims>,
}

impl AuthContext
{
	/// The context for a request that carried no usable credentials.
	#[must_use]
	pub fn anonymous() -> Self
	{
		Self { authenticated: false, scopes: Vec::new(), claims: None }
	}

	/// The context for a request whose token verified successfully.
	#[must_use]
	pub fn authenticated(claims: Claims) -> Self
	{
		Self { authenticated: true, scopes: claims.scopes.clone(), claims: Some(claims) }
	}

	/// Whether this context's scopes satisfy every scope in `required`.
	#[must_use]
	pub fn satisfies(&self, required: &[Scope]) -> bool
	{
		self::scope::has_all_scopes(&self.scopes, required)
	}
}

/// Requirements a route places on an incoming [`AuthContext`].
#[derive(Debug, Clone, Default)]
pub struct AuthRequirement
{
	pub required: bool,
	pub required_scopes: Vec<Scope>,
}

impl AuthRequirement
{
	/// No authentication required at all.
	#[must_use]
	pub fn none() -> Self
	{
		Self::default()
	}

	/// A valid token is required, but no particular scope.
	#[must_use]
	pub fn authenticated() -> Self
	{
		Self { required: true, required_scopes: Vec::new() }
	}

	/// A valid token carrying (at least) `scopes` is required.
	#[must_use]
	pub fn with_scopes(scopes: Vec<Scope>) -> Self
	{
		Self { required: true, required_scopes: scopes }
	}
}
