//! Field-mapping framework.
//!
//! This module is domain-agnostic: it binds scene entities to engine fields
//! through per-field transform strategies and runs them in registration
//! order. The soft-tissue rules live in [`crate::sim::tissue`].

pub mod mapping;
pub mod synchronizer;

pub use mapping::{
    Applied, Cadence, EngineTarget, FieldId, FieldMapping, FromEngine, ToEngine,
};
pub use synchronizer::{SceneSynchronizer, SyncReport};
