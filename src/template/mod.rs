//! Template rendering module
//!
//! Renders the view and edit pages from external HTML templates. Templates
//! are registered once at startup; `dev_mode` re-reads them from disk on
//! every render for template development. Render failures propagate to the
//! handler layer, which answers with HTTP 500.

use std::path::Path;

use handlebars::Handlebars;
use serde_json::json;
use thiserror::Error;

use crate::store::Page;

/// Template name for the read-only page view
pub const VIEW_TEMPLATE: &str = "view";
/// Template name for the edit form
pub const EDIT_TEMPLATE: &str = "edit";

/// Errors from template registration or rendering
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Template file missing or syntactically invalid
    #[error("template registration failed: {0}")]
    Registration(#[from] Box<handlebars::TemplateError>),

    /// Template execution failed
    #[error("template rendering failed: {0}")]
    Render(#[from] handlebars::RenderError),
}

/// Handlebars-backed renderer for the wiki's two templates
///
/// HTML escaping is the engine's automatic escaping; page bodies are
/// otherwise rendered verbatim.
pub struct TemplateEngine {
    registry: Handlebars<'static>,
}

impl TemplateEngine {
    /// Register `view.html` and `edit.html` from the templates directory
    pub fn new(templates_dir: &Path, dev_mode: bool) -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();
        registry.set_dev_mode(dev_mode);

        registry
            .register_template_file(VIEW_TEMPLATE, templates_dir.join("view.html"))
            .map_err(Box::new)?;
        registry
            .register_template_file(EDIT_TEMPLATE, templates_dir.join("edit.html"))
            .map_err(Box::new)?;

        Ok(Self { registry })
    }

    /// Render a page through the named template
    pub fn render_page(&self, template: &str, page: &Page) -> Result<String, TemplateError> {
        let context = json!({
            "title": page.title,
            "body": page.body_text(),
        });
        Ok(self.registry.render(template, &context)?)
    }
}
