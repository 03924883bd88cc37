//! Request-processing component.
//!
//! Handlers receive the config store and store handles through
//! [`AppState`]; nothing here reaches for process-wide state.

use std::sync::Arc;

use axum::{routing::get, Router};

use crate::config::ConfigStore;
use crate::resources::{MySqlStore, RedisStore};

/// Dependencies injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ConfigStore>,
    pub mysql: Arc<MySqlStore>,
    pub redis: Arc<RedisStore>,
}

impl AppState {
    pub fn new(config: Arc<ConfigStore>, mysql: Arc<MySqlStore>, redis: Arc<RedisStore>) -> Self {
        Self {
            config,
            mysql,
            redis,
        }
    }
}

/// Build the route table.
pub fn setup_router(state: AppState) -> Router {
    Router::new().route("/", get(index)).with_state(state)
}

async fn index() -> &'static str {
    "Hello World"
}
