use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::debug;
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::AuthError;
use crate::error::ApiError;
use crate::types::Domain;

/// Who is calling, resolved from a verified token
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub principal_id: Uuid,
    pub username: String,
}

/// Context placed by `require_user`; only end users carry it
#[derive(Clone, Debug)]
pub struct AuthUser(pub RequestContext);

/// Context placed by `require_admin`; only admins carry it
#[derive(Clone, Debug)]
pub struct AuthAdmin(pub RequestContext);

/// Gate for end-user routes
pub async fn require_user(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let context = authenticate(&state, Domain::User, request.headers()).await?;
    request.extensions_mut().insert(AuthUser(context));
    Ok(next.run(request).await)
}

/// Gate for admin routes
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let context = authenticate(&state, Domain::Admin, request.headers()).await?;
    request.extensions_mut().insert(AuthAdmin(context));
    Ok(next.run(request).await)
}

async fn authenticate(state: &AppState, domain: Domain, headers: &HeaderMap) -> Result<RequestContext, AuthError> {
    let result = resolve(state, domain, headers).await;
    if let Err(e) = &result {
        debug!("Rejected {} request: {}", domain, e);
    }
    result
}

async fn resolve(state: &AppState, domain: Domain, headers: &HeaderMap) -> Result<RequestContext, AuthError> {
    let token = extract_bearer(headers)?;
    let principal_id = state.tokens.verify(domain, token)?;

    // A valid token for an account that has since been deleted is still rejected
    let principal = state
        .credentials
        .find_by_id(domain, principal_id)
        .await?
        .ok_or(AuthError::UnknownPrincipal)?;

    Ok(RequestContext { principal_id, username: principal.username })
}

/// Extract JWT token from Authorization header
fn extract_bearer(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers.get(AUTHORIZATION).ok_or(AuthError::MissingToken)?;
    let value = value.to_str().map_err(|_| AuthError::MalformedHeader)?;
    let token = value
        .strip_prefix("Bearer ")
        .ok_or(AuthError::MalformedHeader)?
        .trim();
    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }
    Ok(token)
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthAdmin>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Admin authentication required"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn bearer_token_is_extracted() {
        assert_eq!(extract_bearer(&headers("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn missing_or_malformed_header_is_rejected() {
        assert!(matches!(extract_bearer(&HeaderMap::new()), Err(AuthError::MissingToken)));
        assert!(matches!(extract_bearer(&headers("Basic abc")), Err(AuthError::MalformedHeader)));
        assert!(matches!(extract_bearer(&headers("Bearer   ")), Err(AuthError::MissingToken)));
    }
}
