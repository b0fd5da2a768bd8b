//! Session extraction: resolves the `Authorization: Bearer` token through the identity provider.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use crate::{
    error::{AppError, ServiceError},
    integrations::{error::UpstreamError, identity::User},
    state::SharedState,
};

const UNAUTHORIZED: &str = "Unauthorized";
const FORBIDDEN: &str = "Forbidden: Admin access required";

/// Any signed-in user.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

/// Signed-in user holding the `admin` role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolve the caller of a request.
pub async fn authenticate(state: &SharedState, headers: &HeaderMap) -> Result<User, ServiceError> {
    let token = bearer_token(headers).ok_or_else(|| ServiceError::Unauthorized(UNAUTHORIZED.into()))?;

    match state.integrations().identity.me(token.to_string()).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(ServiceError::Unauthorized(UNAUTHORIZED.into())),
        Err(UpstreamError::MissingCredentials { .. }) => Err(ServiceError::Configuration(
            "identity provider not configured".into(),
        )),
        Err(err) => {
            warn!(error = %err, "identity lookup failed");
            Err(err.into())
        }
    }
}

/// Reject non-admin users.
pub fn require_admin(user: User) -> Result<User, ServiceError> {
    if user.is_admin() {
        Ok(user)
    } else {
        Err(ServiceError::Forbidden(FORBIDDEN.into()))
    }
}

impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        Ok(AuthUser(authenticate(state, &parts.headers).await?))
    }
}

impl FromRequestParts<SharedState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let user = authenticate(state, &parts.headers).await?;
        Ok(AdminUser(require_admin(user)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{TestContext, admin, user};
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[tokio::test]
    async fn resolves_known_tokens() {
        let ctx = TestContext::new().await;
        ctx.identity
            .users
            .lock()
            .unwrap()
            .insert("tok".into(), user("fan@example.com"));

        let resolved = authenticate(&ctx.state, &headers("Bearer tok")).await.unwrap();
        assert_eq!(resolved.email, "fan@example.com");

        assert!(matches!(
            authenticate(&ctx.state, &headers("Bearer nope")).await,
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(matches!(
            authenticate(&ctx.state, &HeaderMap::new()).await,
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(matches!(
            authenticate(&ctx.state, &headers("Basic abc")).await,
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[test]
    fn admin_check_uses_role() {
        assert!(require_admin(admin("boss@example.com")).is_ok());
        match require_admin(user("fan@example.com")) {
            Err(ServiceError::Forbidden(message)) => assert_eq!(message, FORBIDDEN),
            other => panic!("unexpected {other:?}"),
        }
    }
}
