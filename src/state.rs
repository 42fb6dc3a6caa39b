use crate::notify::Notifier;
use crate::storage::Store;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(store: Store, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store: Arc::new(store),
            notifier,
        }
    }
}
