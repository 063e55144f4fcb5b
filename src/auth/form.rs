//! Cookie-session authentication behind an HTML login form.
//!
//! The session cookie is `<expiry-unix>.<hex hmac-sha256>`. The key is drawn
//! at startup and never persisted, so restarting the server logs everyone out.
//! There is no server-side session table.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Form, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use cookie::time::Duration as CookieDuration;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, info, warn};

use super::constant_time_eq;
use crate::error::StartupError;
use crate::web_assets;

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "servergo_auth";
pub const SESSION_TTL_SECS: u64 = 3600;

pub const LOGIN_PATH: &str = "/auth/login";
pub const LOGOUT_PATH: &str = "/auth/logout";
pub const LOGIN_CSS_PATH: &str = "/auth/login.css";
pub const LOGIN_JS_PATH: &str = "/auth/login.js";

/// Issues and checks session cookie values.
#[derive(Clone)]
pub struct SessionSigner {
    mac: HmacSha256,
}

impl SessionSigner {
    /// Signer keyed with 32 fresh random bytes.
    pub fn random() -> Result<Self, StartupError> {
        let key: [u8; 32] = rand::random();
        Self::with_key(&key)
    }

    pub fn with_key(key: &[u8]) -> Result<Self, StartupError> {
        let mac = HmacSha256::new_from_slice(key)
            .map_err(|e| StartupError::Configuration(format!("session key rejected: {e}")))?;
        Ok(Self { mac })
    }

    pub fn issue(&self, now: u64) -> String {
        let expiry = now + SESSION_TTL_SECS;
        format!("{expiry}.{}", hex::encode(self.tag(expiry)))
    }

    /// True when the MAC matches and the embedded expiry is still ahead of `now`.
    pub fn verify(&self, value: &str, now: u64) -> bool {
        let Some((expiry, tag)) = value.split_once('.') else {
            return false;
        };
        let (Ok(expiry), Ok(tag)) = (expiry.parse::<u64>(), hex::decode(tag)) else {
            return false;
        };
        let mut mac = self.mac.clone();
        mac.update(expiry.to_string().as_bytes());
        if mac.verify_slice(&tag).is_err() {
            return false;
        }
        expiry > now
    }

    fn tag(&self, expiry: u64) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(expiry.to_string().as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

#[derive(Clone)]
pub struct FormAuth {
    username: String,
    password: String,
    signer: SessionSigner,
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

impl FormAuth {
    pub fn new(username: String, password: String) -> Result<Self, StartupError> {
        Ok(Self {
            username,
            password,
            signer: SessionSigner::random()?,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Let a request through when it carries a live session cookie, otherwise
    /// send the browser to the login page.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<(), Response> {
        if self.has_session(headers) {
            return Ok(());
        }
        debug!("no valid session; redirecting to login");
        Err(found(LOGIN_PATH))
    }

    fn has_session(&self, headers: &HeaderMap) -> bool {
        CookieJar::from_headers(headers)
            .get(SESSION_COOKIE)
            .is_some_and(|c| self.signer.verify(c.value(), unix_now()))
    }

    fn credentials_match(&self, form: &LoginForm) -> bool {
        let user_ok = constant_time_eq(&form.username, &self.username);
        let pass_ok = constant_time_eq(&form.password, &self.password);
        user_ok & pass_ok
    }

    fn session_cookie(&self) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, self.signer.issue(unix_now())))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age(CookieDuration::seconds(SESSION_TTL_SECS as i64))
            .build()
    }
}

/// Login, logout and login-asset routes. None of them sit behind the gate.
pub fn routes(auth: Arc<FormAuth>) -> Router {
    Router::new()
        .route(LOGIN_PATH, get(login_page).post(login_submit))
        .route(LOGOUT_PATH, get(logout))
        .route(LOGIN_CSS_PATH, get(login_css))
        .route(LOGIN_JS_PATH, get(login_js))
        .with_state(auth)
}

async fn login_page(State(auth): State<Arc<FormAuth>>, headers: HeaderMap) -> Response {
    if auth.has_session(&headers) {
        return found("/");
    }
    (
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        web_assets::LOGIN_HTML,
    )
        .into_response()
}

async fn login_submit(
    State(auth): State<Arc<FormAuth>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    if !auth.credentials_match(&form) {
        warn!(username = %form.username, "login failed");
        return found(&format!("{LOGIN_PATH}?error=invalid_credentials"));
    }
    info!(username = %form.username, "login succeeded");
    (jar.add(auth.session_cookie()), found("/")).into_response()
}

async fn logout(jar: CookieJar) -> Response {
    info!("logout");
    // Always emit the removal cookie, even when the request carried none.
    let mut removal = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    removal.make_removal();
    (jar.add(removal), found(LOGIN_PATH)).into_response()
}

async fn login_css() -> Response {
    (
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        web_assets::LOGIN_CSS,
    )
        .into_response()
}

async fn login_js() -> Response {
    (
        [(header::CONTENT_TYPE, "text/javascript; charset=utf-8")],
        web_assets::LOGIN_JS,
    )
        .into_response()
}

/// `302 Found`; `axum::response::Redirect::to` answers 303.
fn found(location: &str) -> Response {
    let mut response = StatusCode::FOUND.into_response();
    if let Ok(value) = header::HeaderValue::from_str(location) {
        response.headers_mut().insert(header::LOCATION, value);
    }
    response
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
