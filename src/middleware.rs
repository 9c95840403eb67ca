use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::database::AppState;
use crate::error::Error;

/// Prefix of development access tokens: `mock-jwt-token-{userId}-{timestamp}`
pub const ACCESS_TOKEN_PREFIX: &str = "mock-jwt-token-";

/// Prefix of development refresh cookies: `mock-refresh-token-{userId}-{timestamp}`
pub const REFRESH_TOKEN_PREFIX: &str = "mock-refresh-token-";

/// Header carrying the administrative key
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Identity resolved for the current request
///
/// Inserted into the request extensions by [`require_user`]; handlers read
/// it with `Extension<AuthUser>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
}

/// Extracts the user id from a token of the form `{prefix}{userId}[-{timestamp}]`
pub fn user_from_token(token: &str, prefix: &str) -> Option<String> {
    let rest = token.strip_prefix(prefix)?;

    let user_id = match rest.rsplit_once('-') {
        Some((user_id, stamp)) if !stamp.is_empty() && stamp.chars().all(|c| c.is_ascii_digit()) => {
            user_id
        }
        _ => rest,
    };

    if user_id.is_empty() {
        None
    } else {
        Some(user_id.to_string())
    }
}

/// Resolves the caller from the bearer token, falling back to the refresh cookie
pub fn resolve_user(headers: &HeaderMap) -> Option<AuthUser> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .and_then(|token| user_from_token(token.trim(), ACCESS_TOKEN_PREFIX));

    let id = bearer.or_else(|| {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|cookies| cookies.split(';'))
            .filter_map(|pair| pair.trim().strip_prefix("refreshToken="))
            .find_map(|token| user_from_token(token, REFRESH_TOKEN_PREFIX))
    })?;

    Some(AuthUser { id })
}

/// Middleware rejecting requests without a resolvable user identity
pub async fn require_user(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, Error> {
    let user = resolve_user(&headers).ok_or(Error::Unauthorized)?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Middleware guarding administrative routes
///
/// When an admin key is configured the request must carry it in the
/// `X-Admin-Key` header. Without a configured key the check is skipped.
pub async fn require_admin(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, Error> {
    if let Some(expected) = state.admin_key.as_deref() {
        let provided = headers
            .get(ADMIN_KEY_HEADER)
            .and_then(|value| value.to_str().ok());

        if provided != Some(expected) {
            tracing::warn!(path = %request.uri().path(), "admin key rejected");
            return Err(Error::Forbidden);
        }
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn token_with_timestamp() {
        assert_eq!(
            user_from_token("mock-jwt-token-u42-1700000000000", ACCESS_TOKEN_PREFIX),
            Some("u42".to_string())
        );
    }

    #[test]
    fn token_without_timestamp_keeps_hyphens() {
        assert_eq!(
            user_from_token("mock-jwt-token-user-abc", ACCESS_TOKEN_PREFIX),
            Some("user-abc".to_string())
        );
    }

    #[test]
    fn foreign_or_empty_tokens() {
        assert_eq!(user_from_token("eyJhbGciOi.x.y", ACCESS_TOKEN_PREFIX), None);
        assert_eq!(user_from_token("mock-jwt-token-", ACCESS_TOKEN_PREFIX), None);
        assert_eq!(user_from_token("mock-jwt-token--123", ACCESS_TOKEN_PREFIX), None);
    }

    #[test]
    fn cookie_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; refreshToken=mock-refresh-token-u7-99"),
        );
        assert_eq!(resolve_user(&headers), Some(AuthUser { id: "u7".into() }));
    }

    #[test]
    fn bearer_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer mock-jwt-token-u1-1"),
        );
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("refreshToken=mock-refresh-token-u2-2"),
        );
        assert_eq!(resolve_user(&headers), Some(AuthUser { id: "u1".into() }));
    }
}
