//! Axum extractors for caller identity and path ids
//!
//! Both extractors reject with [`DerlgError`] so that a malformed header or
//! path renders the standard error envelope.

use crate::core::auth::{AuthContext, Role};
use crate::core::error::{AuthError, DerlgError, ValidationError};
use axum::extract::{FromRequestParts, Path};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use uuid::Uuid;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Resolve the caller from the identity headers
///
/// No `X-User-Id` means an anonymous caller. A present but unparsable id or
/// role is rejected rather than downgraded to anonymous.
pub fn auth_from_headers(headers: &HeaderMap) -> Result<AuthContext, DerlgError> {
    let Some(raw_id) = headers.get(USER_ID_HEADER) else {
        return Ok(AuthContext::Anonymous);
    };

    let raw_id = raw_id.to_str().map_err(|_| AuthError::InvalidToken {
        message: "user id header is not valid text".to_string(),
    })?;
    let user_id = Uuid::parse_str(raw_id.trim()).map_err(|_| AuthError::InvalidToken {
        message: format!("'{}' is not a valid user id", raw_id),
    })?;

    let role = match headers.get(USER_ROLE_HEADER) {
        Some(value) => value
            .to_str()
            .map_err(|_| AuthError::InvalidToken {
                message: "role header is not valid text".to_string(),
            })?
            .parse::<Role>()?,
        None => Role::Tourist,
    };

    Ok(AuthContext::user(user_id, role))
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = DerlgError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        auth_from_headers(&parts.headers)
    }
}

/// A single `{id}` path segment parsed as a UUID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathId(pub Uuid);

impl<S> FromRequestParts<S> for PathId
where
    S: Send + Sync,
{
    type Rejection = DerlgError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| ValidationError::InvalidJson {
                message: e.body_text(),
            })?;
        let id = Uuid::parse_str(&raw).map_err(|_| ValidationError::InvalidUuid { value: raw })?;
        Ok(PathId(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_missing_headers_are_anonymous() {
        let headers = HeaderMap::new();
        assert_eq!(auth_from_headers(&headers).unwrap(), AuthContext::Anonymous);
    }

    #[test]
    fn test_user_headers() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_str(&id.to_string()).unwrap());
        headers.insert(USER_ROLE_HEADER, HeaderValue::from_static("super_admin"));

        let ctx = auth_from_headers(&headers).unwrap();
        assert_eq!(ctx.user_id(), Some(id));
        assert!(ctx.is_super_admin());
    }

    #[test]
    fn test_role_defaults_to_tourist() {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_ID_HEADER,
            HeaderValue::from_str(&Uuid::new_v4().to_string()).unwrap(),
        );
        assert!(auth_from_headers(&headers).unwrap().has_role(Role::Tourist));
    }

    #[test]
    fn test_bad_identity_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("42"));
        let err = auth_from_headers(&headers).unwrap_err();
        assert_eq!(err.error_code(), "AUTH_1003");

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_ID_HEADER,
            HeaderValue::from_str(&Uuid::new_v4().to_string()).unwrap(),
        );
        headers.insert(USER_ROLE_HEADER, HeaderValue::from_static("owner"));
        assert!(auth_from_headers(&headers).is_err());
    }
}
