//! Caller identity.
//!
//! The identity check runs as middleware in front of every API route, so an
//! unauthenticated request is answered with 401 before any scheduling work.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dayplan_core::config::ApiToken;

use crate::routes::ApiError;
use crate::state::AppState;

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(pub String);

/// Resolves the caller of a request, if any.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn authenticate(&self, headers: &HeaderMap) -> Option<UserId>;
}

/// Static bearer tokens from configuration.
#[derive(Debug, Clone, Default)]
pub struct TokenIdentityProvider {
    tokens: HashMap<String, String>,
}

impl TokenIdentityProvider {
    pub fn from_tokens(tokens: &[ApiToken]) -> Self {
        Self {
            tokens: tokens
                .iter()
                .filter(|t| !t.token.is_empty())
                .map(|t| (t.token.clone(), t.user_id.clone()))
                .collect(),
        }
    }
}

/// Token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[async_trait]
impl IdentityProvider for TokenIdentityProvider {
    async fn authenticate(&self, headers: &HeaderMap) -> Option<UserId> {
        let token = bearer_token(headers)?;
        self.tokens.get(token).cloned().map(UserId)
    }
}

/// Reject requests without a valid caller; otherwise attach the [`UserId`].
pub async fn require_user(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    match state.identity.authenticate(req.headers()).await {
        Some(user) => {
            tracing::debug!(user = %user.0, path = %req.uri().path(), "authenticated request");
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        None => {
            tracing::info!(path = %req.uri().path(), "rejected unauthenticated request");
            ApiError::Unauthorized.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn provider() -> TokenIdentityProvider {
        TokenIdentityProvider::from_tokens(&[
            ApiToken {
                token: "abc123".into(),
                user_id: "alice".into(),
            },
            ApiToken {
                token: String::new(),
                user_id: "nobody".into(),
            },
        ])
    }

    #[test]
    fn parses_bearer_scheme_case_insensitively() {
        assert_eq!(bearer_token(&headers("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("bearer  abc ")), Some("abc"));
        assert_eq!(bearer_token(&headers("Basic abc")), None);
        assert_eq!(bearer_token(&headers("Bearer")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn known_token_resolves_user() {
        let user = provider().authenticate(&headers("Bearer abc123")).await;
        assert_eq!(user, Some(UserId("alice".into())));
    }

    #[tokio::test]
    async fn unknown_or_empty_token_is_rejected() {
        assert_eq!(provider().authenticate(&headers("Bearer nope")).await, None);
        assert_eq!(provider().authenticate(&headers("Bearer ")).await, None);
    }
}
