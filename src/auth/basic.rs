//! HTTP Basic authentication against a single username/password pair.

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum_extra::headers::{authorization::Basic, Authorization, HeaderMapExt};
use tracing::{debug, info};

use super::constant_time_eq;

pub const REALM: &str = "ServerGo Protected Area";

#[derive(Clone)]
pub struct BasicAuth {
    username: String,
    password: String,
}

impl BasicAuth {
    pub fn new(username: String, password: String) -> Self {
        Self { username, password }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn authenticate(&self, headers: &HeaderMap) -> Result<(), Response> {
        match headers.typed_get::<Authorization<Basic>>() {
            Some(presented) if self.matches(presented.username(), presented.password()) => Ok(()),
            Some(presented) => {
                info!(username = presented.username(), "basic auth rejected");
                Err(challenge())
            }
            None => {
                debug!("basic auth header missing");
                Err(challenge())
            }
        }
    }

    fn matches(&self, username: &str, password: &str) -> bool {
        // Evaluate both so timing does not reveal which half was wrong.
        let user_ok = constant_time_eq(username, &self.username);
        let pass_ok = constant_time_eq(password, &self.password);
        user_ok & pass_ok
    }
}

fn challenge() -> Response {
    let value = format!("Basic realm=\"{REALM}\", charset=\"UTF-8\"");
    let mut response = (
        StatusCode::UNAUTHORIZED,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        "401 Unauthorized",
    )
        .into_response();
    if let Ok(value) = HeaderValue::from_str(&value) {
        response.headers_mut().insert(header::WWW_AUTHENTICATE, value);
    }
    response
}
