use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::EntityHandle;
use crate::engine::{Engine, EnginePath, FieldValue, GraphHandle};
use crate::error::{EngineError, Error, Result};
use crate::scene::{Entity, Scene};

/// Stable identity of a field mapping. Also keys recorded sequences.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(String);

impl FieldId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FieldId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// How often the scene-to-engine transform runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cadence {
    /// First successful invocation per session only.
    Once,
    EveryStep,
}

/// Outcome of applying one mapping in one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Executed,
    /// Unbound, or the bound entity is no longer in the scene.
    Absent,
    /// `Once` mapping that already executed in this session.
    Latched,
    /// No transform for this direction, or the transform touched no field.
    Idle,
}

/// Path capability handed to transforms: fields are addressed relative to
/// the mapping's target node.
pub struct EngineTarget<'a> {
    engine: &'a mut dyn Engine,
    graph: GraphHandle,
    node: &'a EnginePath,
    last: Option<FieldValue>,
    touched: bool,
}

impl<'a> EngineTarget<'a> {
    pub fn new(engine: &'a mut dyn Engine, graph: GraphHandle, node: &'a EnginePath) -> Self {
        Self {
            engine,
            graph,
            node,
            last: None,
            touched: false,
        }
    }

    pub fn node(&self) -> &EnginePath {
        self.node
    }

    pub fn exists(&self, field: &str) -> bool {
        self.engine.exists(self.graph, &self.node.join(field))
    }

    pub fn write(
        &mut self,
        field: &str,
        value: FieldValue,
    ) -> std::result::Result<(), EngineError> {
        self.engine
            .write(self.graph, &self.node.join(field), value.clone())?;
        self.last = Some(value);
        self.touched = true;
        Ok(())
    }

    pub fn read(&mut self, field: &str) -> std::result::Result<FieldValue, EngineError> {
        let value = self.engine.read(self.graph, &self.node.join(field))?;
        self.last = Some(value.clone());
        self.touched = true;
        Ok(value)
    }

    fn finish(self) -> Option<FieldValue> {
        if self.touched { self.last } else { None }
    }
}

/// Scene → engine strategy for one field.
pub trait ToEngine {
    fn to_engine(&mut self, entity: &Entity, target: &mut EngineTarget<'_>) -> anyhow::Result<()>;
}

impl<F> ToEngine for F
where
    F: FnMut(&Entity, &mut EngineTarget<'_>) -> anyhow::Result<()>,
{
    fn to_engine(&mut self, entity: &Entity, target: &mut EngineTarget<'_>) -> anyhow::Result<()> {
        self(entity, target)
    }
}

/// Engine → scene strategy for one field.
pub trait FromEngine {
    fn from_engine(
        &mut self,
        target: &mut EngineTarget<'_>,
        entity: &mut Entity,
    ) -> anyhow::Result<()>;
}

impl<F> FromEngine for F
where
    F: FnMut(&mut EngineTarget<'_>, &mut Entity) -> anyhow::Result<()>,
{
    fn from_engine(
        &mut self,
        target: &mut EngineTarget<'_>,
        entity: &mut Entity,
    ) -> anyhow::Result<()> {
        self(target, entity)
    }
}

/// Binds one (optional) scene entity to one engine node.
///
/// The cadence applies to the scene → engine direction; engine → scene
/// transforms run on every step. A `Once` latch is only consumed by an
/// invocation that actually touched the engine.
pub struct FieldMapping {
    id: FieldId,
    entity: Option<EntityHandle>,
    target: EnginePath,
    cadence: Cadence,
    recordable: bool,
    to_engine: Option<Box<dyn ToEngine>>,
    from_engine: Option<Box<dyn FromEngine>>,
    latched: bool,
    last_value: Option<FieldValue>,
}

impl FieldMapping {
    pub fn new(id: impl Into<FieldId>, target: impl Into<EnginePath>) -> Self {
        Self {
            id: id.into(),
            entity: None,
            target: target.into(),
            cadence: Cadence::EveryStep,
            recordable: false,
            to_engine: None,
            from_engine: None,
            latched: false,
            last_value: None,
        }
    }

    pub fn bound_to(mut self, entity: EntityHandle) -> Self {
        self.entity = Some(entity);
        self
    }

    pub fn with_cadence(mut self, cadence: Cadence) -> Self {
        self.cadence = cadence;
        self
    }

    pub fn with_recording(mut self, recordable: bool) -> Self {
        self.recordable = recordable;
        self
    }

    pub fn to_engine<T: ToEngine + 'static>(mut self, transform: T) -> Self {
        self.to_engine = Some(Box::new(transform));
        self
    }

    pub fn from_engine<T: FromEngine + 'static>(mut self, transform: T) -> Self {
        self.from_engine = Some(Box::new(transform));
        self
    }

    /// Closure form of [`FieldMapping::to_engine`]; pins the closure signature.
    pub fn to_engine_fn<F>(self, f: F) -> Self
    where
        F: FnMut(&Entity, &mut EngineTarget<'_>) -> anyhow::Result<()> + 'static,
    {
        self.to_engine(f)
    }

    /// Closure form of [`FieldMapping::from_engine`].
    pub fn from_engine_fn<F>(self, f: F) -> Self
    where
        F: FnMut(&mut EngineTarget<'_>, &mut Entity) -> anyhow::Result<()> + 'static,
    {
        self.from_engine(f)
    }

    pub fn id(&self) -> &FieldId {
        &self.id
    }

    pub fn entity(&self) -> Option<&EntityHandle> {
        self.entity.as_ref()
    }

    pub fn target(&self) -> &EnginePath {
        &self.target
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    pub fn is_recordable(&self) -> bool {
        self.recordable
    }

    pub fn is_latched(&self) -> bool {
        self.latched
    }

    /// Last value written or read by an executed transform.
    pub fn last_value(&self) -> Option<&FieldValue> {
        self.last_value.as_ref()
    }

    /// Rebinds the mapping. Takes effect on the next invocation.
    pub fn bind(&mut self, entity: Option<EntityHandle>) {
        self.entity = entity;
    }

    /// Makes a `Once` mapping eligible to run again.
    pub fn rearm(&mut self) {
        self.latched = false;
    }

    pub(crate) fn set_latched(&mut self, latched: bool) {
        self.latched = latched;
    }

    pub fn apply_to_engine(
        &mut self,
        scene: &dyn Scene,
        engine: &mut dyn Engine,
        graph: GraphHandle,
    ) -> Result<Applied> {
        let Some(transform) = self.to_engine.as_mut() else {
            return Ok(Applied::Idle);
        };
        if self.cadence == Cadence::Once && self.latched {
            return Ok(Applied::Latched);
        }
        let Some(entity) = self.entity.as_ref().and_then(|h| scene.entity(h)) else {
            self.last_value = None;
            return Ok(Applied::Absent);
        };

        let mut target = EngineTarget::new(engine, graph, &self.target);
        transform
            .to_engine(entity, &mut target)
            .map_err(|source| Error::Transform {
                field: self.id.clone(),
                source,
            })?;

        let Some(value) = target.finish() else {
            trace!(field = %self.id, "to-engine transform touched nothing");
            return Ok(Applied::Idle);
        };
        self.last_value = Some(value);
        if self.cadence == Cadence::Once {
            self.latched = true;
        }
        Ok(Applied::Executed)
    }

    pub fn apply_from_engine(
        &mut self,
        scene: &mut dyn Scene,
        engine: &mut dyn Engine,
        graph: GraphHandle,
    ) -> Result<Applied> {
        let Some(transform) = self.from_engine.as_mut() else {
            return Ok(Applied::Idle);
        };
        let Some(entity) = self.entity.as_ref().and_then(|h| scene.entity_mut(h)) else {
            self.last_value = None;
            return Ok(Applied::Absent);
        };

        let mut target = EngineTarget::new(engine, graph, &self.target);
        transform
            .from_engine(&mut target, entity)
            .map_err(|source| Error::Transform {
                field: self.id.clone(),
                source,
            })?;

        match target.finish() {
            Some(value) => {
                self.last_value = Some(value);
                Ok(Applied::Executed)
            }
            None => Ok(Applied::Idle),
        }
    }
}

impl fmt::Debug for FieldMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldMapping")
            .field("id", &self.id)
            .field("entity", &self.entity)
            .field("target", &self.target)
            .field("cadence", &self.cadence)
            .field("recordable", &self.recordable)
            .field("to_engine", &self.to_engine.is_some())
            .field("from_engine", &self.from_engine.is_some())
            .field("latched", &self.latched)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Point;
    use crate::engine::{GraphConfig, MemoryEngine};
    use crate::scene::{PointMarker, SceneStore};
    use std::cell::Cell;
    use std::rc::Rc;

    fn engine_with_graph() -> (MemoryEngine, GraphHandle) {
        let mut engine = MemoryEngine::new();
        let config =
            GraphConfig::new("t").with_field("sensor.position", FieldValue::Vector3([0.; 3]));
        let graph = engine.build_graph(&config).unwrap();
        (engine, graph)
    }

    fn write_position(
        calls: Rc<Cell<usize>>,
    ) -> impl FnMut(&Entity, &mut EngineTarget<'_>) -> anyhow::Result<()> {
        move |entity, target| {
            calls.set(calls.get() + 1);
            if let Some(p) = entity.as_point().and_then(PointMarker::position) {
                target.write("position", FieldValue::Vector3(p.to_array()))?;
            }
            Ok(())
        }
    }

    #[test]
    fn test_once_latches_after_execution() -> anyhow::Result<()> {
        let (mut engine, graph) = engine_with_graph();
        let mut scene = SceneStore::new();
        let h = scene.add(PointMarker::new(Point::new(1., 2., 3.)));
        let calls = Rc::new(Cell::new(0));
        let mut m = FieldMapping::new("sensor", "sensor")
            .bound_to(h)
            .with_cadence(Cadence::Once)
            .to_engine_fn(write_position(calls.clone()));

        assert_eq!(m.apply_to_engine(&scene, &mut engine, graph)?, Applied::Executed);
        assert_eq!(m.apply_to_engine(&scene, &mut engine, graph)?, Applied::Latched);
        assert_eq!(calls.get(), 1);
        assert_eq!(m.last_value(), Some(&FieldValue::Vector3([1., 2., 3.])));

        m.rearm();
        assert_eq!(m.apply_to_engine(&scene, &mut engine, graph)?, Applied::Executed);
        assert_eq!(calls.get(), 2);
        Ok(())
    }

    #[test]
    fn test_absent_entity_keeps_once_eligible() -> anyhow::Result<()> {
        let (mut engine, graph) = engine_with_graph();
        let mut scene = SceneStore::new();
        let calls = Rc::new(Cell::new(0));
        let mut m = FieldMapping::new("sensor", "sensor")
            .with_cadence(Cadence::Once)
            .to_engine_fn(write_position(calls.clone()));

        // Unbound.
        assert_eq!(m.apply_to_engine(&scene, &mut engine, graph)?, Applied::Absent);
        // Bound to a handle the scene does not know.
        let h = EntityHandle::from("later");
        m.bind(Some(h.clone()));
        assert_eq!(m.apply_to_engine(&scene, &mut engine, graph)?, Applied::Absent);
        assert_eq!(calls.get(), 0);
        assert!(!m.is_latched());

        scene.insert(h, PointMarker::new(Point::origin()));
        assert_eq!(m.apply_to_engine(&scene, &mut engine, graph)?, Applied::Executed);
        assert!(m.is_latched());
        Ok(())
    }

    #[test]
    fn test_untouched_target_does_not_latch() -> anyhow::Result<()> {
        let (mut engine, graph) = engine_with_graph();
        let mut scene = SceneStore::new();
        let h = scene.add(PointMarker::empty());
        let calls = Rc::new(Cell::new(0));
        let mut m = FieldMapping::new("sensor", "sensor")
            .bound_to(h)
            .with_cadence(Cadence::Once)
            .to_engine_fn(write_position(calls.clone()));

        assert_eq!(m.apply_to_engine(&scene, &mut engine, graph)?, Applied::Idle);
        assert!(!m.is_latched());
        assert!(m.last_value().is_none());
        Ok(())
    }

    #[test]
    fn test_transform_error_is_tagged_with_field() {
        let (mut engine, graph) = engine_with_graph();
        let mut scene = SceneStore::new();
        let h = scene.add(PointMarker::new(Point::origin()));
        let mut m = FieldMapping::new("sensor", "sensor")
            .bound_to(h)
            .to_engine_fn(|_entity, target| {
                target.write("missing", FieldValue::Scalar(1.))?;
                Ok(())
            });

        let err = m.apply_to_engine(&scene, &mut engine, graph).unwrap_err();
        match err {
            Error::Transform { field, .. } => assert_eq!(field.as_str(), "sensor"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_from_engine_reads_back() -> anyhow::Result<()> {
        let (mut engine, graph) = engine_with_graph();
        let path = EnginePath::from("sensor.position");
        engine.write(graph, &path, FieldValue::Vector3([4., 5., 6.]))?;
        let mut scene = SceneStore::new();
        let h = scene.add(PointMarker::empty());
        let mut m = FieldMapping::new("sensor", "sensor")
            .bound_to(h.clone())
            .from_engine_fn(|target, entity| {
                let v = target.read("position")?;
                if let (Some(xyz), Some(marker)) = (v.as_vector3(), entity.as_point_mut()) {
                    marker.set_position(Point::from_array(xyz));
                }
                Ok(())
            });

        assert_eq!(m.apply_to_engine(&scene, &mut engine, graph)?, Applied::Idle);
        assert_eq!(m.apply_from_engine(&mut scene, &mut engine, graph)?, Applied::Executed);
        assert_eq!(scene.point(&h).unwrap().position(), Some(Point::new(4., 5., 6.)));
        assert_eq!(m.last_value(), Some(&FieldValue::Vector3([4., 5., 6.])));

        scene.remove(&h);
        assert_eq!(m.apply_from_engine(&mut scene, &mut engine, graph)?, Applied::Absent);
        assert!(m.last_value().is_none());
        Ok(())
    }
}
