use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use crate::admin::AdminState;
use crate::net::Connection;
use crate::observability::{Statistics, Status};
use crate::replication::{NodeRole, NodeStatistics};

#[derive(Serialize)]
pub struct NodeLookup {
    pub database: String,
    pub node: String,
    pub role: NodeRole,
    #[serde(flatten)]
    pub stats: NodeStatistics,
}

pub async fn get_status<C: Connection>(
    State(state): State<AdminState<C>>,
) -> Json<Status> {
    Json(state.registry.status())
}

pub async fn get_statistics<C: Connection>(
    State(state): State<AdminState<C>>,
) -> Json<Statistics> {
    Json(state.registry.statistics())
}

pub async fn get_node<C: Connection>(
    State(state): State<AdminState<C>>,
    Path((database, host, port)): Path<(String, String, u16)>,
) -> Result<Json<NodeLookup>, StatusCode> {
    let node = state
        .registry
        .use_node(&database, &host, port)
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(NodeLookup {
        database,
        node: node.name().to_string(),
        role: node.role(),
        stats: node.statistics(),
    }))
}
