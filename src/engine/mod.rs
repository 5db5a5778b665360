//! Engine adapter contract.
//!
//! The physics engine is an external collaborator. The synchronization layer
//! only sees a graph of named fields addressed by dot-separated paths
//! (`FEM.FixedROI.BoxROI.box`), a handle identifying one built graph, and an
//! `advance(dt)` call.

pub mod memory;

use std::collections::BTreeMap;
use std::fmt;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

pub use memory::{FieldStore, MemoryEngine};

/// Dot-separated path into the engine object graph. The empty path is the root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnginePath(String);

impl EnginePath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Appends a relative path (which may itself contain dots).
    pub fn join(&self, rel: &str) -> Self {
        match (self.0.is_empty(), rel.is_empty()) {
            (true, _) => Self::new(rel),
            (false, true) => self.clone(),
            (false, false) => Self(format!("{}.{}", self.0, rel)),
        }
    }
}

impl fmt::Display for EnginePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("<root>")
        } else {
            f.write_str(&self.0)
        }
    }
}

impl From<&str> for EnginePath {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for EnginePath {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Engine-side field value.
///
/// Point data uses the engine's dense layout: one row per node, three columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Scalar(f64),
    Vector3([f64; 3]),
    /// `[minX, minY, minZ, maxX, maxY, maxZ]`
    Bounds([f64; 6]),
    Points(Array2<f64>),
    Cells(Vec<Vec<usize>>),
}

impl FieldValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Scalar(_) => "scalar",
            FieldValue::Vector3(_) => "vector3",
            FieldValue::Bounds(_) => "bounds",
            FieldValue::Points(_) => "points",
            FieldValue::Cells(_) => "cells",
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            FieldValue::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_vector3(&self) -> Option<[f64; 3]> {
        match self {
            FieldValue::Vector3(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bounds(&self) -> Option<[f64; 6]> {
        match self {
            FieldValue::Bounds(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_points(&self) -> Option<&Array2<f64>> {
        match self {
            FieldValue::Points(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_cells(&self) -> Option<&[Vec<usize>]> {
        match self {
            FieldValue::Cells(c) => Some(c),
            _ => None,
        }
    }

    /// An empty `0×3` point array.
    pub fn empty_points() -> Self {
        FieldValue::Points(Array2::zeros((0, 3)))
    }
}

/// Identifies one built engine graph. Never reused after release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GraphHandle(u64);

impl GraphHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for GraphHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "graph#{}", self.0)
    }
}

/// Declarative description of the engine graph: every field with its initial value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    pub name: String,
    pub fields: BTreeMap<EnginePath, FieldValue>,
}

impl GraphConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, path: impl Into<EnginePath>, value: FieldValue) -> Self {
        self.fields.insert(path.into(), value);
        self
    }
}

/// Adapter over an external stepped physics engine.
///
/// Every call names the graph it targets; implementations must reject
/// handles that were released (or never issued) with
/// [`EngineError::StaleHandle`].
pub trait Engine {
    fn build_graph(&mut self, config: &GraphConfig) -> Result<GraphHandle, EngineError>;

    fn release_graph(&mut self, graph: GraphHandle) -> Result<(), EngineError>;

    fn write(
        &mut self,
        graph: GraphHandle,
        path: &EnginePath,
        value: FieldValue,
    ) -> Result<(), EngineError>;

    fn read(&self, graph: GraphHandle, path: &EnginePath) -> Result<FieldValue, EngineError>;

    fn exists(&self, graph: GraphHandle, path: &EnginePath) -> bool;

    /// Advances the graph by `dt`. Blocking from the caller's point of view.
    fn advance(&mut self, graph: GraphHandle, dt: f64) -> Result<(), EngineError>;
}
