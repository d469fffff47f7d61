// Application state module
// Immutable shared state handed to every request task

use std::path::Path;
use std::sync::atomic::AtomicBool;

use super::types::Config;
use crate::handler::Router;
use crate::store::PageStore;
use crate::template::{TemplateEngine, TemplateError};

/// Application state
///
/// Constructed once at startup and shared behind an `Arc`. Nothing here is
/// mutable per-request; the filesystem is the only shared mutable resource.
pub struct AppState {
    pub config: Config,
    pub store: PageStore,
    pub templates: TemplateEngine,
    pub router: Router,

    // Cached config value for fast access on the request path
    pub cached_access_log: AtomicBool,
}

impl AppState {
    /// Build the state: page store, template registry, and route table
    pub fn new(config: &Config) -> Result<Self, TemplateError> {
        let store = PageStore::new(&config.storage.data_dir);
        let templates = TemplateEngine::new(
            Path::new(&config.templates.dir),
            config.templates.dev_mode,
        )?;
        let router = Router::new(&config.routes);

        Ok(Self {
            config: config.clone(),
            store,
            templates,
            router,
            cached_access_log: AtomicBool::new(config.logging.access_log),
        })
    }
}
