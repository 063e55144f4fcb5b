//! Shared-token authentication for scripted clients.

use axum::extract::Query;
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::constant_time_eq;

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

#[derive(Clone)]
pub struct TokenAuth {
    token: String,
}

impl TokenAuth {
    pub fn new(token: String) -> Self {
        Self { token }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Accept `?token=` first, then the `Authorization` header as either
    /// `Bearer <token>` or the bare value.
    pub fn authenticate(&self, headers: &HeaderMap, uri: &Uri) -> Result<(), Response> {
        let presented = query_token(uri).or_else(|| header_token(headers));
        match presented {
            Some(token) if constant_time_eq(&token, &self.token) => Ok(()),
            Some(_) => {
                info!(path = uri.path(), "token rejected");
                Err(unauthorized("invalid token"))
            }
            None => {
                debug!(path = uri.path(), "token missing");
                Err(unauthorized("missing token"))
            }
        }
    }
}

fn query_token(uri: &Uri) -> Option<String> {
    Query::<TokenQuery>::try_from_uri(uri)
        .ok()
        .and_then(|Query(q)| q.token)
        .filter(|t| !t.is_empty())
}

fn header_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
    let token = match raw.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        _ => raw,
    };
    (!token.is_empty()).then(|| token.to_string())
}

fn unauthorized(message: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": message }))).into_response()
}
