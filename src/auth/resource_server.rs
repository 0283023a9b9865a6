//! RFC 9728 protected-resource metadata, served at
//! `/.well-known/oauth-protected-resource`.

use url::Url;

use crate::config::Config;

/// The static RFC 9728 document. Built once from [`Config`] at startup;
/// never mutated afterwards.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ResourceServerMetadata
{
	pub resource: Url,

	#[serde(rename = "authorization_servers")]
	pub authorization_servers: Vec<Url>,

	pub scopes_supported: Vec<String>,

	pub bearer_methods_supported: Vec<String>,

	pub resource_documentation: Option<Url>,

	pub resource_signing_alg_values_supported: Vec<String>,
}

impl ResourceServerMetadata
{
	/// Builds the metadata document from [`Config`].
	///
	/// `bearer_methods_supported` defaults to `["header"]`, and
	/// `resource_signing_alg_values_supported` always includes at least
	/// `RS256` and `ES256`, per `spec.md` §4.6.
	#[must_use]
	pub fn from_config(config: &Config) -> Self
	{
		let mut algorithms: Vec<String> =
			config.jwt_allowed_algorithms().iter().map(|alg| format!("{alg:?}")).collect();

		for required in ["RS256", "ES256"] {
			if !algorithms.iter().any(|alg| alg == required) {
				algorithms.push(required.to_owned());
			}
		}

		Self {
			resource: config.resource_identifier().clone(),
			authorization_servers: vec![config.authorization_server_url().clone()],
			scopes_supported: config.scopes_supported().to_vec(),
			bearer_methods_supported: vec!["header".to_owned()],
			resource_documentation: None,
			resource_signing_alg_values_supported: algorithms,
		}
	}

	/// Whether `scope` is one this resource server advertises.
	///
	/// Accepts any literal from `scopes_supported` verbatim, plus the
	/// `db:<name>` and `table:<db>:<name>` patterns regardless of whether
	/// that exact string was listed (those are open-ended by nature).
	#[must_use]
	pub fn is_scope_supported(&self, scope: &str) -> bool
	{
		if self.scopes_supported.iter().any(|supported| supported == scope) {
			return true;
		}

		if let Some(rest) = scope.strip_prefix("table:") {
			return rest.split_once(':').is_some_and(|(db, table)| !db.is_empty() && !table.is_empty());
		}

		if let Some(rest) = scope.strip_prefix("db:") {
			return !rest.is_empty();
		}

		false
	}
}

#[cfg(test)]
mod tests
{
	use super::*;

	fn metadata() -> ResourceServerMetadata
	{
		ResourceServerMetadata {
			resource: "https://gateway.example".parse().unwrap(),
			authorization_servers: vec!["https://auth.example".parse().unwrap()],
			scopes_supported: vec!["read".to_owned(), "write".to_owned()],
			bearer_methods_supported: vec!["header".to_owned()],
			resource_documentation: None,
			resource_signing_alg_values_supported: vec!["RS256".to_owned(), "ES256".to_owned()],
		}
	}

	#[test]
	fn accepts_literal_and_pattern_scopes()
	{
		let metadata = metadata();
		assert!(metadata.is_scope_supported("read"));
		assert!(metadata.is_scope_supported("db:app"));
		assert!(metadata.is_scope_supported("table:app:users"));
		assert!(!metadata.is_scope_supported("nonsense"));
		assert!(!metadata.is_scope_supported("table:app"));
	}
}
