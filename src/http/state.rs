use std::sync::Arc;

use crate::config::Config;
use crate::dispatcher::CallDispatcher;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<CallDispatcher>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(dispatcher: Arc<CallDispatcher>, config: Arc<Config>) -> Self {
        Self { dispatcher, config }
    }
}
