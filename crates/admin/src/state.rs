//! Application state shared across handlers.

use std::sync::Arc;

use crate::db::AccountStore;
use crate::services::{LinkLocks, LinkService};

/// Application state shared across all handlers.
///
/// Cheap to clone; everything lives behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<dyn AccountStore>,
    links: LinkService,
}

impl AppState {
    /// Create a new application state over an account store.
    #[must_use]
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        let links = LinkService::new(Arc::clone(&store), Arc::new(LinkLocks::new()));

        Self {
            inner: Arc::new(AppStateInner { store, links }),
        }
    }

    /// Get a reference to the account store.
    #[must_use]
    pub fn store(&self) -> &dyn AccountStore {
        self.inner.store.as_ref()
    }

    /// Get a reference to the link service.
    #[must_use]
    pub fn links(&self) -> &LinkService {
        &self.inner.links
    }

    /// Get a reference to the record lock table.
    #[must_use]
    pub fn locks(&self) -> &LinkLocks {
        self.inner.links.locks()
    }
}
