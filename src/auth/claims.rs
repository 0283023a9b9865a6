//! The claims extracted from a validated JWT.

use serde::Deserialize;

use super::scope::Scope;

/// The raw claim set as it appears on the wire, before `scope`/`aud` are
/// normalized into [`Claims`]'s shape.
#[derive(Debug, Clone, Deserialize)]
struct RawClaims
{
	sub: String,
	iss: String,
	aud: AudienceClaim,
	exp: u64,
	iat: u64,
	#[serde(default)]
	nbf: Option<u64>,
	#[serde(default)]
	jti: Option<String>,
	#[serde(default)]
	client_id: Option<String>,
	#[serde(default)]
	scope: String,
}

/// `aud` may legally be either a single string or an array of strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum AudienceClaim
{
	Single(String),
	Many(Vec<String>),
}

impl From<AudienceClaim> for Vec<String>
{
	fn from(claim: AudienceClaim) -> Self
	{
		match claim {
			AudienceClaim::Single(value) => vec![value],
			AudienceClaim::Many(values) => values,
		}
	}
}

/// The validated, decoded claim set, per `spec.md` §4.6.
#[derive(Debug, Clone)]
pub struct Claims
{
	/// The subject (`sub`) — typically the end user or service account.
	pub subject: String,

	/// The issuer (`iss`) that signed the token.
	pub issuer: String,

	/// The audience(s) (`aud`) the token was issued for.
	pub audience: Vec<String>,

	/// The scopes parsed from the space-delimited `scope` claim.
	pub scopes: Vec<Scope>,

	/// Issued-at (`iat`), as a Unix timestamp.
	pub issued_at: u64,

	/// Expiry (`exp`), as a Unix timestamp.
	pub expires_at: u64,

	/// Not-before (`nbf`), as a Unix timestamp, if present.
	pub not_before: Option<u64>,

	/// JWT ID (`jti`), if present.
	pub jwt_id: Option<String>,

	/// OAuth client id (`client_id`), if present.
	pub client_id: Option<String>,
}

impl Claims
{
	/// Whether `audience` appears among this token's `aud` values.
	#[must_use]
	pub fn has_audience(&self, audience: &str) -> bool
	{
		self.audience.iter().any(|value| value == audience)
	}
}

impl<'de> Deserialize<'de> for Claims
{
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		let raw = RawClaims::deserialize(deserializer)?;

		Ok(Self {
			subject: raw.sub,
			issuer: raw.iss,
			audience: raw.aud.into(),
			scopes: Scope::parse_space_delimited(&raw.scope),
			issued_at: raw.iat,
			expires_at: raw.exp,
			not_before: raw.nbf,
			jwt_id: raw.jti,
			client_id: raw.client_id,
		})
	}
}

#[cfg(test)]
mod tests
{
	use super::*;

	#[test]
	fn parses_space_delimited_scope_into_typed_scopes()
	{
		let json = serde_json::json!({
			"sub": "user-1",
			"iss": "https://issuer.example",
			"aud": "gateway",
			"exp": 2_000_000_000u64,
			"iat": 1_000_000_000u64,
			"scope": "read write",
		});

		let claims: Claims = serde_json::from_value(json).expect("valid claims");
		assert_eq!(claims.subject, "user-1");
		assert_eq!(claims.scopes, vec![Scope::Read, Scope::Write]);
		assert!(claims.has_audience("gateway"));
	}

	#[test]
	fn accepts_array_shaped_audience()
	{
		let json = serde_json::json!({
			"sub": "user-1",
			"iss": "https://issuer.example",
			"aud": ["gateway", "other"],
			"exp": 2_000_000_000u64,
			"iat": 1_000_000_000u64,
			"scope": "read",
		});

		let claims: Claims = serde_json::from_value(json).expect("valid claims");
		assert_eq!(claims.scopes, vec![Scope::Read]);
		assert!(claims.has_audience("other"));
	}
}
