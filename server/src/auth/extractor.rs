use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::response::Response;

use crate::api::error_response;
use crate::models::User;
use crate::AppState;

use super::db::get_user_from_token;

/// The authenticated caller. Rejects the request with 401 otherwise.
pub struct AuthUser(pub User);

/// Pull the token out of an `Authorization: Bearer <token>` value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    header_value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(header::AUTHORIZATION) else {
            return Err(error_response(
                StatusCode::UNAUTHORIZED,
                "Missing Authorization header",
            ));
        };
        let Some(token) = value.to_str().ok().and_then(bearer_token) else {
            return Err(error_response(
                StatusCode::UNAUTHORIZED,
                "Invalid Authorization header format",
            ));
        };

        match get_user_from_token(&state.pool, token) {
            Some(user) => Ok(AuthUser(user)),
            None => Err(error_response(
                StatusCode::UNAUTHORIZED,
                "Invalid or expired token",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token("Bearer abc123"), Some("abc123"));
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Basic abc123"), None);
        assert_eq!(bearer_token("abc123"), None);
    }
}
