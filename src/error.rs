use thiserror::Error;

use crate::entity::EntityRef;
use crate::node_graph::NodeGraphError;
use crate::query::QueryError;

/// Failure while turning a recognized drop into a reader node.
#[derive(Debug, Error)]
pub enum DropError {
    #[error("{0} has no frames, movie or file path")]
    NoResolvablePath(EntityRef),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    NodeGraph(#[from] NodeGraphError),
}
