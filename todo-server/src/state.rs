//! Shared state handed to every handler through `Router::with_state`.

use std::sync::Arc;

use crate::config::Config;
use crate::db::Store;

#[derive(Clone, Debug)]
pub struct AppState {
    pub store: Arc<Store>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: impl Into<Store>, config: Config) -> Self {
        Self {
            store: Arc::new(store.into()),
            config: Arc::new(config),
        }
    }
}
