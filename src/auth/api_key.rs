use crate::error::ToolgateError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Header carrying the shared secret on every request.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Shared-secret check applied to every request
///
/// With no secret configured every request is rejected.
///
/// # Example
///
/// ```rust,ignore
/// use axum::{Router, middleware};
/// use toolgate::auth::ApiKeyGuard;
///
/// let guard = ApiKeyGuard::new("s3cret");
/// let app = Router::new()
///     .route("/search_web", post(search))
///     .layer(middleware::from_fn_with_state(guard, ApiKeyGuard::middleware));
/// ```
#[derive(Clone)]
pub struct ApiKeyGuard {
    secret: Option<Arc<SecretString>>,
}

impl ApiKeyGuard {
    pub fn new(secret: impl Into<SecretString>) -> Self {
        Self {
            secret: Some(Arc::new(secret.into())),
        }
    }

    /// A guard that rejects everything, used when no key is configured.
    pub fn deny_all() -> Self {
        Self { secret: None }
    }

    pub fn from_config(secret: Option<&SecretString>) -> Self {
        match secret {
            Some(secret) => Self::new(secret.expose_secret()),
            None => Self::deny_all(),
        }
    }

    /// Compare a presented key against the configured secret.
    pub fn verify(&self, presented: Option<&str>) -> Result<(), ToolgateError> {
        let (Some(secret), Some(presented)) = (&self.secret, presented) else {
            return Err(ToolgateError::InvalidApiKey);
        };

        if constant_time_compare(secret.expose_secret().as_bytes(), presented.as_bytes()) {
            Ok(())
        } else {
            Err(ToolgateError::InvalidApiKey)
        }
    }

    /// Middleware function rejecting requests without a valid `X-API-Key`
    pub async fn middleware(
        State(guard): State<ApiKeyGuard>,
        request: Request,
        next: Next,
    ) -> Result<Response, ToolgateError> {
        let presented = request
            .headers()
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok());

        if let Err(err) = guard.verify(presented) {
            tracing::warn!(
                target: "toolgate.admission.denied",
                path = %request.uri().path(),
                key_present = presented.is_some(),
                "Rejected request with invalid API key"
            );
            return Err(err);
        }

        Ok(next.run(request).await)
    }
}

impl std::fmt::Debug for ApiKeyGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyGuard")
            .field("configured", &self.secret.is_some())
            .finish()
    }
}

/// Constant-time comparison so response timing does not leak key prefixes.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::StatusCode, middleware, routing::get};
    use tower::ServiceExt;

    #[test]
    fn test_verify_accepts_matching_key() {
        let guard = ApiKeyGuard::new("s3cret");
        assert!(guard.verify(Some("s3cret")).is_ok());
    }

    #[test]
    fn test_verify_rejects_missing_or_wrong_key() {
        let guard = ApiKeyGuard::new("s3cret");
        assert!(matches!(guard.verify(None), Err(ToolgateError::InvalidApiKey)));
        assert!(guard.verify(Some("s3cre")).is_err());
        assert!(guard.verify(Some("s3cret ")).is_err());
        assert!(guard.verify(Some("")).is_err());
    }

    #[test]
    fn test_deny_all_rejects_everything() {
        let guard = ApiKeyGuard::deny_all();
        assert!(guard.verify(None).is_err());
        assert!(guard.verify(Some("")).is_err());
        assert!(guard.verify(Some("anything")).is_err());
    }

    #[test]
    fn test_debug_does_not_leak_secret() {
        let guard = ApiKeyGuard::new("s3cret");
        assert!(!format!("{:?}", guard).contains("s3cret"));
    }

    #[tokio::test]
    async fn test_middleware_gates_requests() {
        let app = Router::new()
            .route("/ping", get(|| async { "pong" }))
            .layer(middleware::from_fn_with_state(
                ApiKeyGuard::new("s3cret"),
                ApiKeyGuard::middleware,
            ));

        let denied = app
            .clone()
            .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(denied.status(), StatusCode::FORBIDDEN);

        let allowed = app
            .oneshot(
                Request::builder()
                    .uri("/ping")
                    .header("X-API-Key", "s3cret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(allowed.status(), StatusCode::OK);
    }
}
