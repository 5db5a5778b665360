//! Scene-side entities and the adapter the synchronization layer reads them through.
//!
//! Entities belong to the surrounding application. The core only holds
//! [`EntityHandle`]s and resolves them through a [`Scene`] on every call, so
//! entities may be added, replaced or removed between (or during) sessions.

pub mod markers;
pub mod mesh;
pub mod placement;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::EntityHandle;

pub use markers::{LineMarker, PointMarker, RegionMarker};
pub use mesh::{CellArray, MeshBody};

/// Closed set of scene entity kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Entity {
    Mesh(MeshBody),
    Region(RegionMarker),
    Line(LineMarker),
    Point(PointMarker),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Mesh,
    Region,
    Line,
    Point,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Mesh => "mesh",
            EntityKind::Region => "region marker",
            EntityKind::Line => "line marker",
            EntityKind::Point => "point marker",
        };
        f.write_str(name)
    }
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Mesh(_) => EntityKind::Mesh,
            Entity::Region(_) => EntityKind::Region,
            Entity::Line(_) => EntityKind::Line,
            Entity::Point(_) => EntityKind::Point,
        }
    }

    pub fn as_mesh(&self) -> Option<&MeshBody> {
        match self {
            Entity::Mesh(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_mesh_mut(&mut self) -> Option<&mut MeshBody> {
        match self {
            Entity::Mesh(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_region(&self) -> Option<&RegionMarker> {
        match self {
            Entity::Region(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_line(&self) -> Option<&LineMarker> {
        match self {
            Entity::Line(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_line_mut(&mut self) -> Option<&mut LineMarker> {
        match self {
            Entity::Line(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_point(&self) -> Option<&PointMarker> {
        match self {
            Entity::Point(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_point_mut(&mut self) -> Option<&mut PointMarker> {
        match self {
            Entity::Point(p) => Some(p),
            _ => None,
        }
    }
}

impl From<MeshBody> for Entity {
    fn from(value: MeshBody) -> Self {
        Entity::Mesh(value)
    }
}

impl From<RegionMarker> for Entity {
    fn from(value: RegionMarker) -> Self {
        Entity::Region(value)
    }
}

impl From<LineMarker> for Entity {
    fn from(value: LineMarker) -> Self {
        Entity::Line(value)
    }
}

impl From<PointMarker> for Entity {
    fn from(value: PointMarker) -> Self {
        Entity::Point(value)
    }
}

/// Entity adapter implemented by the surrounding application.
pub trait Scene {
    fn entity(&self, handle: &EntityHandle) -> Option<&Entity>;

    fn entity_mut(&mut self, handle: &EntityHandle) -> Option<&mut Entity>;
}

/// In-memory [`Scene`] keyed by handle.
#[derive(Debug, Default)]
pub struct SceneStore {
    entities: HashMap<EntityHandle, Entity>,
}

impl SceneStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entity under a fresh random handle.
    pub fn add<E: Into<Entity>>(&mut self, entity: E) -> EntityHandle {
        let handle = EntityHandle::new();
        self.entities.insert(handle.clone(), entity.into());
        handle
    }

    /// Inserts or replaces the entity stored under `handle`.
    pub fn insert<E: Into<Entity>>(&mut self, handle: EntityHandle, entity: E) -> Option<Entity> {
        self.entities.insert(handle, entity.into())
    }

    pub fn remove(&mut self, handle: &EntityHandle) -> Option<Entity> {
        self.entities.remove(handle)
    }

    pub fn contains(&self, handle: &EntityHandle) -> bool {
        self.entities.contains_key(handle)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn mesh(&self, handle: &EntityHandle) -> Option<&MeshBody> {
        self.entity(handle).and_then(Entity::as_mesh)
    }

    pub fn region(&self, handle: &EntityHandle) -> Option<&RegionMarker> {
        self.entity(handle).and_then(Entity::as_region)
    }

    pub fn line(&self, handle: &EntityHandle) -> Option<&LineMarker> {
        self.entity(handle).and_then(Entity::as_line)
    }

    pub fn point(&self, handle: &EntityHandle) -> Option<&PointMarker> {
        self.entity(handle).and_then(Entity::as_point)
    }

    pub fn point_mut(&mut self, handle: &EntityHandle) -> Option<&mut PointMarker> {
        self.entity_mut(handle).and_then(Entity::as_point_mut)
    }
}

impl Scene for SceneStore {
    fn entity(&self, handle: &EntityHandle) -> Option<&Entity> {
        self.entities.get(handle)
    }

    fn entity_mut(&mut self, handle: &EntityHandle) -> Option<&mut Entity> {
        self.entities.get_mut(handle)
    }
}
