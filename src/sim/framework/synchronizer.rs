use tracing::{debug, trace};

use super::mapping::{Applied, FieldId, FieldMapping};
use crate::EntityHandle;
use crate::engine::{Engine, FieldValue, GraphHandle};
use crate::error::{Error, Result};
use crate::scene::Scene;

/// Counts of mapping outcomes for one synchronization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub executed: usize,
    pub absent: usize,
    pub latched: usize,
    pub idle: usize,
}

impl SyncReport {
    fn add(&mut self, applied: Applied) {
        match applied {
            Applied::Executed => self.executed += 1,
            Applied::Absent => self.absent += 1,
            Applied::Latched => self.latched += 1,
            Applied::Idle => self.idle += 1,
        }
    }
}

/// Ordered table of field mappings.
///
/// Mappings run in registration order and are never reordered: a mapping that
/// depends on engine state created by another (e.g. per-step writes into a
/// container whose topology is uploaded once) must be registered after it.
#[derive(Debug, Default)]
pub struct SceneSynchronizer {
    mappings: Vec<FieldMapping>,
}

impl SceneSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_mappings(mappings: Vec<FieldMapping>) -> Result<Self> {
        let mut sync = Self::new();
        for m in mappings {
            sync.push(m)?;
        }
        Ok(sync)
    }

    /// Appends a mapping. Field ids must be unique.
    pub fn push(&mut self, mapping: FieldMapping) -> Result<()> {
        if self.get(mapping.id()).is_some() {
            return Err(Error::InvalidConfig(format!(
                "duplicate field mapping `{}`",
                mapping.id()
            )));
        }
        self.mappings.push(mapping);
        Ok(())
    }

    pub fn with_mapping(mut self, mapping: FieldMapping) -> Result<Self> {
        self.push(mapping)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn mappings(&self) -> &[FieldMapping] {
        &self.mappings
    }

    pub fn get(&self, id: &FieldId) -> Option<&FieldMapping> {
        self.mappings.iter().find(|m| m.id() == id)
    }

    pub fn get_mut(&mut self, id: &FieldId) -> Option<&mut FieldMapping> {
        self.mappings.iter_mut().find(|m| m.id() == id)
    }

    /// Rebinds the mapping `id` to another entity (or unbinds it).
    pub fn bind(&mut self, id: &FieldId, entity: Option<EntityHandle>) -> Result<()> {
        let mapping = self
            .get_mut(id)
            .ok_or_else(|| Error::InvalidConfig(format!("unknown field mapping `{id}`")))?;
        mapping.bind(entity);
        Ok(())
    }

    /// Runs every scene → engine transform. Stops at the first failing transform.
    pub fn run_to_engine(
        &mut self,
        scene: &dyn Scene,
        engine: &mut dyn Engine,
        graph: GraphHandle,
    ) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        for m in self.mappings.iter_mut() {
            let applied = m.apply_to_engine(scene, engine, graph)?;
            trace!(field = %m.id(), ?applied, "to engine");
            report.add(applied);
        }
        debug!(?report, "to-engine pass complete");
        Ok(report)
    }

    /// Runs every engine → scene transform. Stops at the first failing transform.
    pub fn run_from_engine(
        &mut self,
        scene: &mut dyn Scene,
        engine: &mut dyn Engine,
        graph: GraphHandle,
    ) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        for m in self.mappings.iter_mut() {
            let applied = m.apply_from_engine(scene, engine, graph)?;
            trace!(field = %m.id(), ?applied, "from engine");
            report.add(applied);
        }
        debug!(?report, "from-engine pass complete");
        Ok(report)
    }

    /// Re-arms every `Once` latch.
    pub fn rearm(&mut self) {
        for m in self.mappings.iter_mut() {
            m.rearm();
        }
    }

    pub fn latch_snapshot(&self) -> Vec<bool> {
        self.mappings.iter().map(FieldMapping::is_latched).collect()
    }

    pub fn restore_latches(&mut self, snapshot: &[bool]) {
        for (m, &latched) in self.mappings.iter_mut().zip(snapshot) {
            m.set_latched(latched);
        }
    }

    /// Current values of recordable mappings that have one, in registration order.
    pub fn recordable_values(&self) -> impl Iterator<Item = (&FieldId, &FieldValue)> {
        self.mappings
            .iter()
            .filter(|m| m.is_recordable())
            .filter_map(|m| m.last_value().map(|v| (m.id(), v)))
    }
}
