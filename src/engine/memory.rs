use std::collections::{BTreeMap, HashMap};
use std::mem::discriminant;

use tracing::debug;

use super::{Engine, EnginePath, FieldValue, GraphConfig, GraphHandle};
use crate::error::EngineError;

/// Solver callback invoked on every `advance`.
pub type SolverHook = Box<dyn FnMut(&mut FieldStore, f64) -> anyhow::Result<()>>;

/// Fields of one built graph, plus its simulated time.
#[derive(Debug, Clone, Default)]
pub struct FieldStore {
    fields: BTreeMap<EnginePath, FieldValue>,
    time: f64,
}

impl FieldStore {
    pub fn get(&self, path: &str) -> Option<&FieldValue> {
        self.fields.get(&EnginePath::from(path))
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut FieldValue> {
        self.fields.get_mut(&EnginePath::from(path))
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    fn write(&mut self, path: &EnginePath, value: FieldValue) -> Result<(), EngineError> {
        let slot = self
            .fields
            .get_mut(path)
            .ok_or_else(|| EngineError::UnknownField(path.clone()))?;
        if discriminant(slot) != discriminant(&value) {
            return Err(EngineError::TypeMismatch {
                path: path.clone(),
                expected: slot.type_name(),
                found: value.type_name(),
            });
        }
        *slot = value;
        Ok(())
    }
}

/// In-memory engine: a path-addressed field store per graph.
///
/// Only fields declared in the [`GraphConfig`] exist, and writes must keep the
/// declared value kind. Dynamics are supplied by an optional [`SolverHook`].
/// Without one, `advance` only moves the clock.
#[derive(Default)]
pub struct MemoryEngine {
    graphs: HashMap<GraphHandle, FieldStore>,
    next_id: u64,
    solver: Option<SolverHook>,
    graphs_built: usize,
    advances: usize,
    writes: HashMap<EnginePath, usize>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_solver<F>(mut self, solver: F) -> Self
    where
        F: FnMut(&mut FieldStore, f64) -> anyhow::Result<()> + 'static,
    {
        self.solver = Some(Box::new(solver));
        self
    }

    /// Number of graphs built but not yet released.
    pub fn live_graphs(&self) -> usize {
        self.graphs.len()
    }

    pub fn graphs_built(&self) -> usize {
        self.graphs_built
    }

    pub fn advance_count(&self) -> usize {
        self.advances
    }

    /// Number of successful writes to `path`, across all graphs.
    pub fn write_count(&self, path: &str) -> usize {
        self.writes.get(&EnginePath::from(path)).copied().unwrap_or(0)
    }

    pub fn store(&self, graph: GraphHandle) -> Option<&FieldStore> {
        self.graphs.get(&graph)
    }

    fn graph(&self, graph: GraphHandle) -> Result<&FieldStore, EngineError> {
        self.graphs
            .get(&graph)
            .ok_or(EngineError::StaleHandle(graph))
    }

    fn graph_mut(&mut self, graph: GraphHandle) -> Result<&mut FieldStore, EngineError> {
        self.graphs
            .get_mut(&graph)
            .ok_or(EngineError::StaleHandle(graph))
    }
}

impl Engine for MemoryEngine {
    fn build_graph(&mut self, config: &GraphConfig) -> Result<GraphHandle, EngineError> {
        self.next_id += 1;
        let handle = GraphHandle::new(self.next_id);
        self.graphs.insert(
            handle,
            FieldStore {
                fields: config.fields.clone(),
                time: 0.,
            },
        );
        self.graphs_built += 1;
        debug!(graph = %handle, name = %config.name, fields = config.fields.len(), "graph built");
        Ok(handle)
    }

    fn release_graph(&mut self, graph: GraphHandle) -> Result<(), EngineError> {
        self.graphs
            .remove(&graph)
            .ok_or(EngineError::StaleHandle(graph))?;
        debug!(graph = %graph, "graph released");
        Ok(())
    }

    fn write(
        &mut self,
        graph: GraphHandle,
        path: &EnginePath,
        value: FieldValue,
    ) -> Result<(), EngineError> {
        self.graph_mut(graph)?.write(path, value)?;
        *self.writes.entry(path.clone()).or_default() += 1;
        Ok(())
    }

    fn read(&self, graph: GraphHandle, path: &EnginePath) -> Result<FieldValue, EngineError> {
        self.graph(graph)?
            .fields
            .get(path)
            .cloned()
            .ok_or_else(|| EngineError::UnknownField(path.clone()))
    }

    fn exists(&self, graph: GraphHandle, path: &EnginePath) -> bool {
        self.graphs
            .get(&graph)
            .is_some_and(|store| store.fields.contains_key(path))
    }

    fn advance(&mut self, graph: GraphHandle, dt: f64) -> Result<(), EngineError> {
        let store = self
            .graphs
            .get_mut(&graph)
            .ok_or(EngineError::StaleHandle(graph))?;
        if let Some(solver) = self.solver.as_mut() {
            solver(store, dt).map_err(|e| EngineError::Solver(format!("{e:#}")))?;
        }
        store.time += dt;
        self.advances += 1;
        Ok(())
    }
}
