//! Request routing dispatch module
//!
//! Entry point for HTTP request processing. The route table is an explicit
//! `Router` value built at startup and carried in `AppState`; dispatch
//! extracts the page title as a named parameter, and title validation
//! happens in the store before any filesystem access.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::{Method, Request, Response};
use std::convert::Infallible;

use crate::config::{AppState, RoutesConfig};
use crate::handler::pages;
use crate::http;
use crate::logger;

/// What a matched path dispatches to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    /// `GET /view/<title>` - render a page read-only
    View(&'a str),
    /// `GET /edit/<title>` - render the edit form
    Edit(&'a str),
    /// `POST /save/<title>` - persist the submitted form
    Save(&'a str),
    /// Liveness probe
    Liveness,
    /// Readiness probe
    Readiness,
    /// Bundled favicon
    Favicon,
    /// Fallback greeting; carries the path without its leading slash
    Greeting(&'a str),
}

/// Explicit route table, constructed once and passed into the server
/// entry point (no implicit global registration)
pub struct Router {
    page_prefixes: [(&'static str, PageAction); 3],
    health_enabled: bool,
    liveness_path: String,
    readiness_path: String,
    favicon_paths: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageAction {
    View,
    Edit,
    Save,
}

impl Router {
    pub fn new(routes: &RoutesConfig) -> Self {
        Self {
            page_prefixes: [
                ("/view/", PageAction::View),
                ("/edit/", PageAction::Edit),
                ("/save/", PageAction::Save),
            ],
            health_enabled: routes.health.enabled,
            liveness_path: routes.health.liveness_path.clone(),
            readiness_path: routes.health.readiness_path.clone(),
            favicon_paths: routes.favicon_paths.clone(),
        }
    }

    /// Match a request path against the table
    ///
    /// Page prefixes pass the trailing path segment through unchecked; the
    /// store rejects invalid titles before touching the filesystem.
    pub fn match_path<'a>(&self, path: &'a str) -> Route<'a> {
        if self.health_enabled {
            if path == self.liveness_path {
                return Route::Liveness;
            }
            if path == self.readiness_path {
                return Route::Readiness;
            }
        }

        if self.favicon_paths.iter().any(|p| path == p) {
            return Route::Favicon;
        }

        for (prefix, action) in &self.page_prefixes {
            if let Some(title) = path.strip_prefix(prefix) {
                return match action {
                    PageAction::View => Route::View(title),
                    PageAction::Edit => Route::Edit(title),
                    PageAction::Save => Route::Save(title),
                };
            }
        }

        Route::Greeting(path.strip_prefix('/').unwrap_or(path))
    }
}

/// Main entry point for HTTP request handling
pub async fn handle_request(
    req: Request<hyper::body::Incoming>,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let is_head = method == Method::HEAD;

    let access_log = state
        .cached_access_log
        .load(std::sync::atomic::Ordering::Relaxed);
    if access_log {
        logger::log_request(&method, req.uri(), req.version());
    }

    let user_agent = req
        .headers()
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);

    let response = dispatch(req, &method, &path, is_head, &state).await;

    if access_log {
        let mut entry = logger::AccessLogEntry::new(
            peer_addr.ip().to_string(),
            method.to_string(),
            path,
        );
        entry.status = response.status().as_u16();
        entry.body_bytes = response
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        entry.user_agent = user_agent;
        entry.request_time_us =
            u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Route the request and run the matched handler
async fn dispatch(
    req: Request<hyper::body::Incoming>,
    method: &Method,
    path: &str,
    is_head: bool,
    state: &Arc<AppState>,
) -> Response<Full<Bytes>> {
    if *method == Method::OPTIONS {
        return http::build_options_response(state.config.http.enable_cors);
    }

    match state.router.match_path(path) {
        Route::Liveness | Route::Readiness => http::build_health_response("ok"),
        Route::Favicon => pages::serve_favicon(is_head).await,
        // The greeting accepts any method, as the original did
        Route::Greeting(rest) => pages::greet(rest, is_head),
        Route::View(title) => {
            if !matches!(*method, Method::GET | Method::HEAD) {
                return method_not_allowed(method, path, "GET, HEAD");
            }
            pages::view_page(state, title, is_head).await
        }
        Route::Edit(title) => {
            if !matches!(*method, Method::GET | Method::HEAD) {
                return method_not_allowed(method, path, "GET, HEAD");
            }
            pages::edit_page(state, title, is_head).await
        }
        Route::Save(title) => {
            if *method != Method::POST {
                return method_not_allowed(method, path, "POST");
            }
            let body = match read_body(req, state.config.http.max_body_size).await {
                Ok(body) => body,
                Err(response) => return response,
            };
            pages::save_page(state, title, &body).await
        }
    }
}

fn method_not_allowed(method: &Method, path: &str, allow: &str) -> Response<Full<Bytes>> {
    logger::log_warning(&format!("Method not allowed: {method} {path}"));
    http::build_405_response(allow)
}

/// Collect the request body, enforcing the configured size limit
///
/// Checks Content-Length up front, then the collected size again since the
/// header is client-supplied.
async fn read_body(
    req: Request<hyper::body::Incoming>,
    max_body_size: u64,
) -> Result<Bytes, Response<Full<Bytes>>> {
    if let Some(declared) = req
        .headers()
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
    {
        if declared > max_body_size {
            logger::log_warning(&format!(
                "Request body too large: {declared} bytes (max: {max_body_size})"
            ));
            return Err(http::build_413_response());
        }
    }

    let Ok(collected) = req.collect().await else {
        return Err(http::build_400_response("failed to read request body"));
    };
    let body = collected.to_bytes();
    if body.len() as u64 > max_body_size {
        logger::log_warning(&format!(
            "Request body too large: {} bytes (max: {max_body_size})",
            body.len()
        ));
        return Err(http::build_413_response());
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoutesConfig;

    fn test_router() -> Router {
        Router::new(&RoutesConfig::default())
    }

    #[test]
    fn test_match_page_routes() {
        let router = test_router();
        assert_eq!(router.match_path("/view/FrontPage"), Route::View("FrontPage"));
        assert_eq!(router.match_path("/edit/NewPage"), Route::Edit("NewPage"));
        assert_eq!(router.match_path("/save/NewPage"), Route::Save("NewPage"));
    }

    #[test]
    fn test_title_passes_through_unvalidated() {
        // Validation is the store's job; the router only extracts
        let router = test_router();
        assert_eq!(
            router.match_path("/view/../../etc/passwd"),
            Route::View("../../etc/passwd")
        );
        assert_eq!(router.match_path("/view/"), Route::View(""));
    }

    #[test]
    fn test_match_fallback_greeting() {
        let router = test_router();
        assert_eq!(router.match_path("/foo"), Route::Greeting("foo"));
        assert_eq!(router.match_path("/"), Route::Greeting(""));
        // Prefix without trailing slash is not a page route
        assert_eq!(router.match_path("/view"), Route::Greeting("view"));
    }

    #[test]
    fn test_match_health_and_favicon() {
        let router = test_router();
        assert_eq!(router.match_path("/healthz"), Route::Liveness);
        assert_eq!(router.match_path("/readyz"), Route::Readiness);
        assert_eq!(router.match_path("/favicon.ico"), Route::Favicon);
        assert_eq!(router.match_path("/favicon.svg"), Route::Favicon);
    }

    #[test]
    fn test_health_disabled_falls_through() {
        let mut routes = RoutesConfig::default();
        routes.health.enabled = false;
        let router = Router::new(&routes);
        assert_eq!(router.match_path("/healthz"), Route::Greeting("healthz"));
    }
}
