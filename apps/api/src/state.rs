use std::sync::Arc;

use crate::analytics::blacklist::SharedBlacklist;
use crate::config::Config;
use crate::taxonomy::store::TaxonomyStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Populated by the background loader; empty until the first load finishes.
    pub taxonomy: Arc<TaxonomyStore>,
    pub blacklist: Arc<SharedBlacklist>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let blacklist = Arc::new(SharedBlacklist::new(config.blacklist()));
        Self {
            config,
            taxonomy: Arc::new(TaxonomyStore::new()),
            blacklist,
        }
    }
}
