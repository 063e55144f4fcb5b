use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Path as UrlPath, Request, State},
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::signal;
use tower::{ServiceBuilder, ServiceExt};
use tower_http::{
    compression::CompressionLayer, services::ServeFile, set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::{debug, error, info, warn};

use crate::auth::{self, form, Authenticator};
use crate::config::{AuthMode, ServerConfig};
use crate::error::{ResolveError, ServeError, StartupError};
use crate::listing;
use crate::port;
use crate::render::{ListingRenderer, TemplateSet, ASSET_PREFIX};
use crate::resolve;
use crate::web_assets;

/// How many times discovery + bind is attempted when the probed port is
/// taken between the probe and the real bind.
const BIND_ATTEMPTS: u32 = 3;

/// Shared, read-only state handed to the file-tree handler.
pub struct AppState {
    /// Canonicalised served root.
    pub root: PathBuf,
    pub dir_listing: bool,
    pub renderer: ListingRenderer,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Assemble the full application.
///
/// Layout:
/// - `/_servergo_assets/**`: embedded theme assets, never gated.
/// - form login routes (form mode only), never gated.
/// - everything else: the file tree behind the authenticator.
pub fn build_app(
    state: Arc<AppState>,
    auth: Arc<Authenticator>,
    request_timeout: Option<Duration>,
) -> Router {
    let files = Router::new()
        .fallback(serve_handler)
        .with_state(state)
        .layer(middleware::from_fn_with_state(
            Arc::clone(&auth),
            auth::require,
        ));

    let mut app = Router::new()
        .route(&format!("{ASSET_PREFIX}/{{*name}}"), get(asset_handler))
        .merge(files);
    if let Some(routes) = auth.routes() {
        app = app.merge(routes);
    }

    with_deadline(app, request_timeout).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(SetResponseHeaderLayer::if_not_present(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ))
            .layer(CompressionLayer::new()),
    )
}

fn with_deadline(app: Router, limit: Option<Duration>) -> Router {
    match limit {
        Some(limit) => app.layer(middleware::from_fn_with_state(limit, deadline)),
        None => app,
    }
}

/// Bound the time until a response is produced; expiry answers 408.
async fn deadline(State(limit): State<Duration>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    match tokio::time::timeout(limit, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            warn!(path = %path, timeout_secs = limit.as_secs(), "request timed out");
            ServeError::Timeout.into_response()
        }
    }
}

async fn asset_handler(UrlPath(name): UrlPath<String>) -> Response {
    match web_assets::listing_asset(&name) {
        Some((body, content_type)) => {
            debug!(asset = %name, "serving embedded asset");
            ([(header::CONTENT_TYPE, content_type)], body).into_response()
        }
        None => ServeError::from(ResolveError::NotFound(name)).into_response(),
    }
}

// ---------------------------------------------------------------------------
// File tree
// ---------------------------------------------------------------------------

async fn serve_handler(State(state): State<Arc<AppState>>, request: Request) -> Response {
    match serve_request(&state, request).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

/// Resolve the request path, then dispatch:
/// 1. file → streamed by `ServeFile` (content type, `Last-Modified`, 304, ranges).
/// 2. directory with `index.html` → that file, after its own containment check.
/// 3. directory, listing enabled → rendered listing.
/// 4. directory, listing disabled → 403.
async fn serve_request(state: &AppState, request: Request) -> Result<Response, ServeError> {
    if !matches!(*request.method(), Method::GET | Method::HEAD) {
        return Err(ServeError::MethodNotAllowed(request.method().clone()));
    }

    let resolved = resolve::resolve(&state.root, request.uri().path()).await?;
    let meta = tokio::fs::metadata(&resolved.path).await?;

    if !meta.is_dir() {
        debug!(path = %resolved.request_path, branch = "file", size = meta.len(), "dispatch");
        return Ok(stream_file(&resolved.path, request).await);
    }

    if let Some(index) = find_index(&state.root, &resolved.path).await? {
        debug!(path = %resolved.request_path, branch = "index", "dispatch");
        return Ok(stream_file(&index, request).await);
    }

    if !state.dir_listing {
        info!(path = %resolved.request_path, reason = "listing-disabled", "dispatch denied");
        return Err(ServeError::ListingDisabled(resolved.request_path));
    }

    debug!(path = %resolved.request_path, branch = "listing", "dispatch");
    let page = listing::read_listing(&state.root, &resolved.path, &resolved.request_path).await?;
    let (body, content_type) = state.renderer.render(&page).map_err(|e| {
        error!(
            theme = state.renderer.theme().name,
            path = %resolved.request_path,
            error = %e,
            "listing render failed"
        );
        e
    })?;

    Ok(([(header::CONTENT_TYPE, content_type)], body).into_response())
}

/// `dir/index.html` when it exists and is a regular file. A missing, dangling
/// or non-file index counts as absent; one that resolves outside the root is
/// forbidden.
async fn find_index(root: &Path, dir: &Path) -> Result<Option<PathBuf>, ServeError> {
    let candidate = dir.join("index.html");
    match tokio::fs::metadata(&candidate).await {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => return Ok(None),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    Ok(Some(resolve::confine(root, &candidate).await?))
}

async fn stream_file(path: &Path, request: Request) -> Response {
    match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    }
}

// ---------------------------------------------------------------------------
// Startup
// ---------------------------------------------------------------------------

/// Discover a port and bind it.
///
/// Discovery only proves the port was free when probed. If the real bind then
/// hits `AddrInUse`, discovery runs again without a preferred port, up to
/// [`BIND_ATTEMPTS`] times in total.
pub fn bind_listener(ip: IpAddr, preferred: u16) -> Result<TcpListener, StartupError> {
    let mut preferred = preferred;
    let mut attempt = 1;
    loop {
        let port = port::find_available_port(ip, preferred)?;
        let addr = SocketAddr::new(ip, port);
        match TcpListener::bind(addr) {
            Ok(listener) => {
                info!(%addr, attempt, "bound listener");
                return Ok(listener);
            }
            Err(e) if e.kind() == io::ErrorKind::AddrInUse && attempt < BIND_ATTEMPTS => {
                warn!(%addr, attempt, "port taken after probe; retrying discovery");
                preferred = 0;
                attempt += 1;
            }
            Err(source) => return Err(StartupError::Bind { addr, source }),
        }
    }
}

/// Address to print for humans; an unspecified bind is reachable on loopback.
fn display_addr(addr: SocketAddr) -> SocketAddr {
    if addr.ip().is_unspecified() {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), addr.port())
    } else {
        addr
    }
}

/// Human-facing startup summary, printed to stdout. Credentials appear here
/// and nowhere else.
pub fn banner(config: &ServerConfig, auth: &Authenticator, theme: &str, addr: SocketAddr) -> String {
    let base = format!("http://{}", display_addr(addr));
    let mut lines = vec![
        "servergo serve".to_string(),
        format!("root:  {}", config.root.display()),
        format!("theme: {theme}"),
        format!("auth:  {}", auth.mode()),
    ];
    if let Some(creds) = auth.credentials() {
        match (auth.mode(), creds.username) {
            (AuthMode::Token, _) => lines.push(format!("token: {}", creds.secret)),
            (_, Some(user)) => {
                lines.push(format!("user:  {user}"));
                lines.push(format!("pass:  {}", creds.secret));
            }
            (_, None) => {}
        }
    }
    let url = match auth.credentials() {
        Some(creds) if auth.mode() == AuthMode::Token => {
            format!("{base}/?token={}", urlencoding::encode(&creds.secret))
        }
        _ => format!("{base}/"),
    };
    lines.push(format!("url:   {url}"));
    if auth.login_page_enabled() {
        lines.push(format!("login: {base}{}", form::LOGIN_PATH));
    }
    lines.join("\n")
}

/// Build every component from `config`, bind, and serve until Ctrl+C.
pub async fn run_serve(config: ServerConfig) -> Result<(), StartupError> {
    let auth = Arc::new(Authenticator::from_settings(&config.auth)?);
    let renderer = ListingRenderer::load(&config.theme, &TemplateSet::embedded())?;
    let theme = renderer.theme().name;

    let std_listener = bind_listener(config.bind, config.port)?;
    std_listener.set_nonblocking(true)?;
    let listener = tokio::net::TcpListener::from_std(std_listener)?;
    let addr = listener.local_addr()?;
    if config.port != 0 && addr.port() != config.port {
        warn!(requested = config.port, actual = addr.port(), "requested port unavailable");
    }

    println!("{}", banner(&config, &auth, theme, addr));
    info!(
        %addr,
        root = %config.root.display(),
        theme,
        auth = %auth.describe(),
        dir_listing = config.dir_listing,
        "listening"
    );

    let state = Arc::new(AppState {
        root: config.root.clone(),
        dir_listing: config.dir_listing,
        renderer,
    });
    let app = build_app(state, auth, config.request_timeout);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("interrupt received; shutting down"),
        Err(e) => {
            // Without a handler there is nothing to wait for; keep serving.
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthSettings;
    use axum::http::{Request, StatusCode};
    use axum_extra::headers::{authorization::Basic, Authorization, HeaderMapExt};
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        root: PathBuf,
    }

    /// root/
    ///   b.txt, a.txt, A/, sub/inner.txt, site/index.html, empty/
    /// ../secret.txt (outside the root)
    fn fixture() -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let base = fs::canonicalize(tmp.path()).unwrap();
        let root = base.join("root");
        fs::create_dir(&root).unwrap();
        fs::write(base.join("secret.txt"), "top secret").unwrap();
        fs::write(root.join("b.txt"), "bee").unwrap();
        fs::write(root.join("a.txt"), "hello world").unwrap();
        fs::create_dir(root.join("A")).unwrap();
        fs::create_dir(root.join("sub")).unwrap();
        fs::write(root.join("sub/inner.txt"), "inner").unwrap();
        fs::create_dir(root.join("site")).unwrap();
        fs::write(root.join("site/index.html"), "<h1>site</h1>").unwrap();
        fs::create_dir(root.join("empty")).unwrap();
        Fixture { _tmp: tmp, root }
    }

    fn app_with(fx: &Fixture, theme: &str, listing: bool, auth: AuthSettings) -> Router {
        let state = Arc::new(AppState {
            root: fx.root.clone(),
            dir_listing: listing,
            renderer: ListingRenderer::load(theme, &TemplateSet::embedded()).unwrap(),
        });
        let auth = Arc::new(Authenticator::from_settings(&auth).unwrap());
        build_app(state, auth, Some(Duration::from_secs(30)))
    }

    fn app(fx: &Fixture) -> Router {
        app_with(fx, "default", true, AuthSettings::none())
    }

    async fn send(app: Router, request: Request<Body>) -> Response {
        app.oneshot(request).await.unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    // --- files ---

    #[tokio::test]
    async fn serves_file_with_content_type_and_nosniff() {
        let fx = fixture();
        let response = send(app(&fx), get("/a.txt")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
        assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert!(response.headers().contains_key(header::LAST_MODIFIED));
        assert_eq!(body_text(response).await, "hello world");
    }

    #[tokio::test]
    async fn missing_file_is_404() {
        let fx = fixture();
        let response = send(app(&fx), get("/nope.txt")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    }

    #[tokio::test]
    async fn encoded_traversal_is_403() {
        let fx = fixture();
        for uri in ["/%2e%2e/secret.txt", "/sub/%2E%2E/%2E%2E/secret.txt", "/..%2fsecret.txt"] {
            let response = send(app(&fx), get(uri)).await;
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "{uri}");
            let body = body_text(response).await;
            assert!(!body.contains("top secret"), "{uri}");
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlink_escape_is_403() {
        let fx = fixture();
        std::os::unix::fs::symlink(fx.root.parent().unwrap(), fx.root.join("escape")).unwrap();
        let response = send(app(&fx), get("/escape/secret.txt")).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinked_index_outside_root_is_403() {
        let fx = fixture();
        fs::create_dir(fx.root.join("trap")).unwrap();
        std::os::unix::fs::symlink(
            fx.root.parent().unwrap().join("secret.txt"),
            fx.root.join("trap/index.html"),
        )
        .unwrap();
        let response = send(app(&fx), get("/trap/")).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn dangling_index_falls_through_to_listing() {
        let fx = fixture();
        fs::create_dir(fx.root.join("d")).unwrap();
        fs::write(fx.root.join("d/data.txt"), "data").unwrap();
        std::os::unix::fs::symlink("../gone.html", fx.root.join("d/index.html")).unwrap();

        let app = app_with(&fx, "json", true, AuthSettings::none());
        let response = send(app, get("/d/")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let value: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        let names: Vec<_> = value["contents"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["data.txt", "index.html"]);
    }

    #[tokio::test]
    async fn directory_named_index_html_is_not_an_index() {
        let fx = fixture();
        fs::create_dir_all(fx.root.join("odd/index.html")).unwrap();
        let response = send(app_with(&fx, "json", true, AuthSettings::none()), get("/odd/")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn listing_hides_target_of_escaping_symlink() {
        let fx = fixture();
        let secret = fx.root.parent().unwrap().join("secret.txt");
        std::os::unix::fs::symlink(&secret, fx.root.join("sub/link")).unwrap();

        let app = app_with(&fx, "json", true, AuthSettings::none());
        let response = send(app, get("/sub/")).await;
        let value: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        let link = value["contents"]
            .as_array()
            .unwrap()
            .iter()
            .find(|e| e["name"] == "link")
            .cloned()
            .unwrap();
        let own = fs::symlink_metadata(fx.root.join("sub/link")).unwrap().len();
        assert_eq!(link["size"], own);
        assert_ne!(link["size"], "top secret".len() as u64);
    }

    #[tokio::test]
    async fn post_is_405() {
        let fx = fixture();
        let request = Request::post("/a.txt").body(Body::empty()).unwrap();
        let response = send(app(&fx), request).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "GET, HEAD");
    }

    #[tokio::test]
    async fn conditional_request_gets_304() {
        let fx = fixture();
        let first = send(app(&fx), get("/a.txt")).await;
        let last_modified = first.headers()[header::LAST_MODIFIED].clone();
        let request = Request::get("/a.txt")
            .header(header::IF_MODIFIED_SINCE, last_modified)
            .body(Body::empty())
            .unwrap();
        let response = send(app(&fx), request).await;
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    }

    // --- directories ---

    #[tokio::test]
    async fn index_html_short_circuits_listing() {
        let fx = fixture();
        let response = send(app(&fx), get("/site/")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "<h1>site</h1>");
    }

    #[tokio::test]
    async fn listing_orders_directories_first() {
        let fx = fixture();
        let response = send(app_with(&fx, "table", true, AuthSettings::none()), get("/")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        let names: Vec<_> = body
            .lines()
            .skip(2)
            .map(|l| l.split_whitespace().next().unwrap())
            .collect();
        assert_eq!(names, ["A", "empty", "site", "sub", "a.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn json_listing_of_subdirectory() {
        let fx = fixture();
        let response = send(app_with(&fx, "json", true, AuthSettings::none()), get("/sub/")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        let value: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(value["path"], "/sub/");
        assert_eq!(value["parent_directory"], "/");
        assert_eq!(value["contents"][0]["name"], "inner.txt");
        assert_eq!(value["contents"][0]["url"], "/sub/inner.txt");
        assert_eq!(value["contents"][0]["size"], 5);
    }

    #[tokio::test]
    async fn html_listing_links_entries() {
        let fx = fixture();
        let response = send(app(&fx), get("/")).await;
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/html; charset=utf-8"
        );
        let body = body_text(response).await;
        assert!(body.contains("href=\"/sub/\""));
        assert!(body.contains("href=\"/a.txt\""));
    }

    #[tokio::test]
    async fn listing_disabled_is_403() {
        let fx = fixture();
        let app = app_with(&fx, "default", false, AuthSettings::none());
        let response = send(app.clone(), get("/empty/")).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        // index.html still wins when listings are off.
        let response = send(app, get("/site/")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    // --- assets ---

    #[tokio::test]
    async fn theme_assets_are_served_and_unknown_ones_404() {
        let fx = fixture();
        let response = send(app(&fx), get("/_servergo_assets/dark.css")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/css; charset=utf-8"
        );
        let response = send(app(&fx), get("/_servergo_assets/nope.css")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn nested_asset_paths_404_without_auth() {
        let fx = fixture();
        let app = app_with(&fx, "default", true, basic_settings());
        let response = send(app, get("/_servergo_assets/x/dark.css")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    // --- deadline ---

    fn slow_router(limit: Option<Duration>) -> Router {
        let slow = Router::new().route(
            "/slow",
            axum::routing::get(|| async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                "finished"
            }),
        );
        with_deadline(slow, limit)
    }

    #[tokio::test]
    async fn stalled_request_gets_408() {
        let response = send(slow_router(Some(Duration::from_millis(20))), get("/slow")).await;
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        assert_eq!(body_text(response).await, "408 Request Timeout");
    }

    #[tokio::test]
    async fn no_deadline_lets_slow_requests_finish() {
        let response = send(slow_router(None), get("/slow")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "finished");
    }

    #[tokio::test]
    async fn fast_request_under_deadline_is_untouched() {
        let response = send(slow_router(Some(Duration::from_secs(10))), get("/slow")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    // --- auth ---

    fn basic_settings() -> AuthSettings {
        AuthSettings::new(AuthMode::Basic, "admin".into(), Some("pw".into()), None, false)
    }

    #[tokio::test]
    async fn basic_auth_gates_files_but_not_assets() {
        let fx = fixture();
        let app = app_with(&fx, "default", true, basic_settings());

        let response = send(app.clone(), get("/a.txt")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));

        let mut request = get("/a.txt");
        request
            .headers_mut()
            .typed_insert(Authorization::basic("admin", "pw"));
        assert_eq!(send(app.clone(), request).await.status(), StatusCode::OK);

        let mut request = get("/missing");
        request
            .headers_mut()
            .typed_insert(Authorization::basic("admin", "pw"));
        assert_eq!(send(app.clone(), request).await.status(), StatusCode::NOT_FOUND);

        let response = send(app, get("/_servergo_assets/listing.js")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn basic_auth_rejects_wrong_password() {
        let fx = fixture();
        let app = app_with(&fx, "default", true, basic_settings());
        let mut request = get("/");
        request
            .headers_mut()
            .typed_insert(Authorization::<Basic>::basic("admin", "wrong"));
        let response = send(app, request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn token_auth_via_query() {
        let fx = fixture();
        let settings = AuthSettings::new(AuthMode::Token, "admin".into(), None, Some("t0k".into()), false);
        let app = app_with(&fx, "default", true, settings);
        assert_eq!(
            send(app.clone(), get("/a.txt?token=t0k")).await.status(),
            StatusCode::OK
        );
        assert_eq!(
            send(app, get("/a.txt?token=bad")).await.status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn form_auth_flow() {
        let fx = fixture();
        let settings = AuthSettings::new(AuthMode::Form, "admin".into(), Some("pw".into()), None, true);
        let app = app_with(&fx, "default", true, settings);

        let response = send(app.clone(), get("/")).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/auth/login");

        let response = send(app.clone(), get("/auth/login")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let login = Request::post("/auth/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("username=admin&password=pw"))
            .unwrap();
        let response = send(app.clone(), login).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        let cookie = set_cookie.split(';').next().unwrap().to_string();

        let request = Request::get("/a.txt")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let response = send(app.clone(), request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "hello world");

        let forged = Request::get("/a.txt")
            .header(header::COOKIE, "servergo_auth=true")
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(app, forged).await.status(), StatusCode::FOUND);
    }

    // --- startup ---

    #[test]
    fn bind_listener_avoids_taken_port() {
        let ip = IpAddr::V4(Ipv4Addr::LOCALHOST);
        let held = TcpListener::bind((ip, 0)).unwrap();
        let taken = held.local_addr().unwrap().port();
        let listener = bind_listener(ip, taken).unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), taken);
    }

    #[test]
    fn banner_shows_token_url() {
        let fx = fixture();
        let settings = AuthSettings::new(AuthMode::Token, "admin".into(), None, Some("abc-123".into()), false);
        let config = ServerConfig::new(
            &fx.root,
            IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            0,
            settings,
            true,
            "dark".into(),
            None,
        )
        .unwrap();
        let auth = Authenticator::from_settings(&config.auth).unwrap();
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080);
        let text = banner(&config, &auth, "dark", addr);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "servergo serve");
        assert!(lines[1].starts_with("root:  "));
        assert!(text.contains("token: abc-123"));
        assert!(text.contains("url:   http://127.0.0.1:8080/?token=abc-123"));
    }
}
