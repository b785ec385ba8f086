//! Admin API.
//!
//! ```text
//! GET /admin/status                              → Status
//! GET /admin/statistics                          → Statistics
//! GET /admin/databases/{name}/nodes/{host}/{port} → single node, 404 if unknown
//! ```
//! Every route requires `Authorization: Bearer <api_key>`.

pub mod auth;
pub mod handlers;

use std::sync::Arc;
use axum::{
    routing::get,
    Router,
    middleware,
};
use tower_http::trace::TraceLayer;
use crate::net::Connection;
use crate::replication::DatabaseRegistry;
use self::handlers::*;
use self::auth::admin_auth_middleware;

pub struct AdminState<C> {
    pub registry: Arc<DatabaseRegistry<C>>,
    pub api_key: Arc<str>,
}

impl<C> Clone for AdminState<C> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            api_key: self.api_key.clone(),
        }
    }
}

pub fn setup_admin_router<C: Connection>(state: AdminState<C>) -> Router {
    Router::new()
        .route("/admin/status", get(get_status::<C>))
        .route("/admin/statistics", get(get_statistics::<C>))
        .route("/admin/databases/{database}/nodes/{host}/{port}", get(get_node::<C>))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware::<C>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
