//! Error types

use thiserror::Error;

use crate::engine::{EnginePath, GraphHandle};
use crate::sim::framework::FieldId;

/// Crate result type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by geometry queries and the session state machine.
///
/// An unbound or missing scene entity is not an error: mappings skip it.
#[derive(Debug, Error)]
pub enum Error {
    #[error("geometry has no points")]
    EmptyGeometry,

    #[error("session is already running")]
    AlreadyRunning,

    #[error("session is not running")]
    NotRunning,

    #[error("session is busy with another call")]
    SessionBusy,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("transform for field `{field}` failed: {source}")]
    Transform {
        field: FieldId,
        #[source]
        source: anyhow::Error,
    },
}

/// Errors reported by an [`crate::engine::Engine`] adapter.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown field: {0}")]
    UnknownField(EnginePath),

    #[error("stale or released graph handle: {0}")]
    StaleHandle(GraphHandle),

    #[error("type mismatch at {path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: EnginePath,
        expected: &'static str,
        found: &'static str,
    },

    #[error("solver failure: {0}")]
    Solver(String),
}
