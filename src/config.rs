//! Immutable server configuration, validated once at startup.

use std::fmt;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;
use tracing::warn;

use crate::auth::secret;
use crate::error::StartupError;

/// Which authentication strategy guards the file tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum AuthMode {
    /// No authentication.
    #[default]
    None,
    /// HTTP Basic with a single username/password pair.
    Basic,
    /// Shared token via `?token=` or the `Authorization` header.
    Token,
    /// HTML login form backed by a signed session cookie.
    Form,
}

impl AuthMode {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthMode::None => "none",
            AuthMode::Basic => "basic",
            AuthMode::Token => "token",
            AuthMode::Form => "form",
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication settings with every secret the chosen mode needs filled in.
#[derive(Clone)]
pub struct AuthSettings {
    pub mode: AuthMode,
    pub username: String,
    pub password: String,
    pub token: String,
}

impl AuthSettings {
    /// Build settings for `mode`, generating any secret that was not supplied.
    ///
    /// An absent or empty password (Basic/Form) or token (Token) is replaced by
    /// a random one, so an empty credential never degrades into "no auth".
    pub fn new(
        mode: AuthMode,
        username: String,
        password: Option<String>,
        token: Option<String>,
        login_page: bool,
    ) -> Self {
        let password = match (mode, non_empty(password)) {
            (AuthMode::Basic | AuthMode::Form, None) => secret::generate_password(),
            (_, Some(p)) => p,
            (_, None) => String::new(),
        };
        let token = match (mode, non_empty(token)) {
            (AuthMode::Token, None) => secret::generate_token(),
            (_, Some(t)) => t,
            (_, None) => String::new(),
        };

        match (mode, login_page) {
            (AuthMode::Form, false) => {
                warn!("form authentication requires the login page; enabling it")
            }
            (AuthMode::Form, true) | (_, false) => {}
            (_, true) => warn!(%mode, "login page only applies to form authentication; ignoring"),
        }

        Self {
            mode,
            username,
            password,
            token,
        }
    }

    pub fn none() -> Self {
        Self::new(AuthMode::None, String::new(), None, None, false)
    }
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("mode", &self.mode)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("token", &"<redacted>")
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Everything the server needs to start, constructed once.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface the listener binds to.
    pub bind: IpAddr,
    /// Requested port; `0` asks for automatic selection.
    pub port: u16,
    /// Canonicalised served root. Always an existing directory.
    pub root: PathBuf,
    pub auth: AuthSettings,
    pub dir_listing: bool,
    /// Requested listing theme; unknown names fall back to `default` later.
    pub theme: String,
    /// Per-request deadline; `None` disables it.
    pub request_timeout: Option<Duration>,
}

impl ServerConfig {
    /// Validate `root` and assemble a configuration.
    ///
    /// Fails with [`StartupError::Configuration`] when `root` does not exist or
    /// is not a directory.
    pub fn new(
        root: &Path,
        bind: IpAddr,
        port: u16,
        auth: AuthSettings,
        dir_listing: bool,
        theme: String,
        request_timeout: Option<Duration>,
    ) -> Result<Self, StartupError> {
        let canonical = std::fs::canonicalize(root).map_err(|e| {
            StartupError::Configuration(format!(
                "served directory {} is not accessible: {e}",
                root.display()
            ))
        })?;
        if !canonical.is_dir() {
            return Err(StartupError::Configuration(format!(
                "{} is not a directory",
                canonical.display()
            )));
        }

        Ok(Self {
            bind,
            port,
            root: canonical,
            auth,
            dir_listing,
            theme,
            request_timeout: request_timeout.filter(|d| !d.is_zero()),
        })
    }
}
