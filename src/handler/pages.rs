//! Wiki page handlers
//!
//! Business logic for the view, edit, and save flows plus the fallback
//! greeting. Every store or template error surfaces as an HTTP status
//! here; nothing is silently discarded.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use tokio::fs;

use crate::config::AppState;
use crate::http;
use crate::logger;
use crate::store::{Page, StoreError};
use crate::template::{EDIT_TEMPLATE, VIEW_TEMPLATE};

const FAVICON_PATH: &str = "static/favicon.svg";

/// Fallback greeting, echoing the path remainder
pub fn greet(rest: &str, is_head: bool) -> Response<Full<Bytes>> {
    http::build_plain_response(format!("Hi, there, I love {rest}!"), is_head)
}

/// `GET /view/<title>`: render a stored page, 404 when it does not exist
pub async fn view_page(state: &AppState, title: &str, is_head: bool) -> Response<Full<Bytes>> {
    match state.store.load(title).await {
        Ok(page) => render(state, VIEW_TEMPLATE, &page, is_head),
        Err(StoreError::NotFound(_)) => http::build_404_response(),
        Err(e @ StoreError::InvalidTitle { .. }) => reject_title(&e),
        Err(e) => internal_error(&e),
    }
}

/// `GET /edit/<title>`: render the edit form
///
/// A missing page is not an error here; the form starts empty so new pages
/// can be created through it.
pub async fn edit_page(state: &AppState, title: &str, is_head: bool) -> Response<Full<Bytes>> {
    let page = match state.store.load(title).await {
        Ok(page) => page,
        Err(StoreError::NotFound(_)) => Page::empty(title),
        Err(e @ StoreError::InvalidTitle { .. }) => return reject_title(&e),
        Err(e) => return internal_error(&e),
    };
    render(state, EDIT_TEMPLATE, &page, is_head)
}

/// `POST /save/<title>`: persist the submitted form body, then redirect to
/// the view page
pub async fn save_page(state: &AppState, title: &str, form_body: &[u8]) -> Response<Full<Bytes>> {
    let fields = match http::parse_form(form_body) {
        Ok(fields) => fields,
        Err(e) => {
            logger::log_warning(&format!("Rejected save of '{title}': {e}"));
            return http::build_400_response(&e.to_string());
        }
    };
    let Some(body) = fields.get("body") else {
        return http::build_400_response("missing 'body' form field");
    };

    let page = Page::new(title, body.as_bytes().to_vec());
    match state.store.save(&page).await {
        Ok(()) => http::build_redirect_response(&format!("/view/{title}")),
        Err(e @ StoreError::InvalidTitle { .. }) => reject_title(&e),
        Err(e) => internal_error(&e),
    }
}

/// Serve the bundled favicon
pub async fn serve_favicon(is_head: bool) -> Response<Full<Bytes>> {
    match fs::read(FAVICON_PATH).await {
        Ok(data) => http::build_favicon_response(data, is_head),
        Err(_) => http::build_404_response(),
    }
}

/// Render a page through a template, mapping render failure to 500
fn render(state: &AppState, template: &str, page: &Page, is_head: bool) -> Response<Full<Bytes>> {
    match state.templates.render_page(template, page) {
        Ok(html) => http::build_html_response(html, is_head),
        Err(e) => internal_error(&e),
    }
}

fn reject_title(err: &StoreError) -> Response<Full<Bytes>> {
    logger::log_warning(&format!("Rejected request: {err}"));
    http::build_400_response(&err.to_string())
}

fn internal_error(err: &impl std::fmt::Display) -> Response<Full<Bytes>> {
    logger::log_error(&err.to_string());
    http::build_500_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use http_body_util::BodyExt;
    use tempfile::{tempdir, TempDir};

    async fn body_text(response: Response<Full<Bytes>>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn test_state() -> (AppState, TempDir) {
        let dir = tempdir().unwrap();
        let data_dir = dir.path().join("pages");
        let tpl_dir = dir.path().join("templates");
        std::fs::create_dir_all(&data_dir).unwrap();
        std::fs::create_dir_all(&tpl_dir).unwrap();
        std::fs::write(tpl_dir.join("view.html"), "view:{{title}}:{{body}}").unwrap();
        std::fs::write(tpl_dir.join("edit.html"), "edit:{{title}}:{{body}}").unwrap();

        let mut config = Config::load_from("no-such-config-file").unwrap();
        config.storage.data_dir = data_dir.to_string_lossy().into_owned();
        config.templates.dir = tpl_dir.to_string_lossy().into_owned();

        (AppState::new(&config).unwrap(), dir)
    }

    #[test]
    fn test_greeting_text() {
        // The two canonical greetings from the original behavior
        let resp = greet("foo", false);
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()["Content-Type"], "text/plain; charset=utf-8");

        let resp = greet("", false);
        assert_eq!(resp.headers()["Content-Length"], "19"); // "Hi, there, I love !"
    }

    #[tokio::test]
    async fn test_greeting_bodies() {
        assert_eq!(body_text(greet("foo", false)).await, "Hi, there, I love foo!");
        assert_eq!(body_text(greet("", false)).await, "Hi, there, I love !");
    }

    #[tokio::test]
    async fn test_view_existing_page() {
        let (state, _dir) = test_state();
        state
            .store
            .save(&Page::new("Home", b"welcome".to_vec()))
            .await
            .unwrap();

        let resp = view_page(&state, "Home", false).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(body_text(resp).await, "view:Home:welcome");
    }

    #[tokio::test]
    async fn test_view_missing_page_is_404() {
        let (state, _dir) = test_state();
        let resp = view_page(&state, "Nope", false).await;
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn test_view_traversal_title_is_400() {
        let (state, _dir) = test_state();
        let resp = view_page(&state, "../../etc/passwd", false).await;
        assert_eq!(resp.status(), 400);
    }

    #[tokio::test]
    async fn test_edit_new_page_renders_empty_form() {
        let (state, _dir) = test_state();
        let resp = edit_page(&state, "NewPage", false).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(body_text(resp).await, "edit:NewPage:");
    }

    #[tokio::test]
    async fn test_edit_existing_page_prefills_form() {
        let (state, _dir) = test_state();
        state
            .store
            .save(&Page::new("Draft", b"old text".to_vec()))
            .await
            .unwrap();

        let resp = edit_page(&state, "Draft", false).await;
        assert_eq!(body_text(resp).await, "edit:Draft:old text");
    }

    #[tokio::test]
    async fn test_save_writes_file_and_redirects() {
        let (state, _dir) = test_state();
        let resp = save_page(&state, "Saved", b"body=hello+wiki").await;
        assert_eq!(resp.status(), 302);
        assert_eq!(resp.headers()["Location"], "/view/Saved");

        let loaded = state.store.load("Saved").await.unwrap();
        assert_eq!(loaded.body, b"hello wiki");
    }

    #[tokio::test]
    async fn test_save_missing_body_field_is_400() {
        let (state, _dir) = test_state();
        let resp = save_page(&state, "X", b"other=1").await;
        assert_eq!(resp.status(), 400);
    }

    #[tokio::test]
    async fn test_save_malformed_form_is_400() {
        let (state, _dir) = test_state();
        let resp = save_page(&state, "X", b"body=%zz").await;
        assert_eq!(resp.status(), 400);
    }

    #[tokio::test]
    async fn test_save_invalid_title_is_400() {
        let (state, _dir) = test_state();
        let resp = save_page(&state, "../escape", b"body=x").await;
        assert_eq!(resp.status(), 400);
    }
}
