pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::search::EventSearchStore;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<EventSearchStore>,
}

impl AppState {
    pub fn new(store: Arc<EventSearchStore>) -> Self {
        Self { store }
    }
}
