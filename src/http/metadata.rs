//! The RFC 9728 protected-resource metadata route.

use axum::extract::State;
use axum::Json;

use super::AppState;
use crate::auth::ResourceServerMetadata;

/// `GET /.well-known/oauth-protected-resource`.
///
/// Serves the document built once at startup from [`Config`][crate::config::Config]
/// verbatim, per `spec.md` §6.
pub(super) async fn protected_resource(
	State(state): State<AppState>,
) -> Json<ResourceServerMetadata>
{
	Json(state.metadata)
}

#[cfg(test)]
mod tests
{
	use axum::body::Body;
	use axum::http::{Request, StatusCode};
	use tower::ServiceExt;

	use super::super::tests::test_state;
	use super::*;

	#[tokio::test]
	async fn serves_metadata_at_the_well_known_path()
	{
		let state = test_state();
		let router = super::super::router(state.clone());

		let request = Request::builder()
			.uri("/.well-known/oauth-protected-resource")
			.body(Body::empty())
			.expect("valid request");

		let response = router.oneshot(request).await.expect("router responds");
		assert_eq!(response.status(), StatusCode::OK);

		let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body read");
		let document: serde_json::Value = serde_json::from_slice(&body).expect("valid json");

		assert_eq!(document["resource"], state.metadata.resource.as_str());
	}
}
