//! Field transforms that derive engine parameters from scene entities.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::engine::FieldValue;
use crate::geom::bboxes::bbox_to_flat;
use crate::geom::point::convert::{array_to_points, points_to_array, replicate_point};
use crate::geom::query::normalize;
use crate::scene::{Entity, EntityKind, LineMarker, MeshBody, PointMarker, RegionMarker};
use crate::sim::framework::{EngineTarget, FromEngine, ToEngine};

fn wrong_kind(expected: EntityKind, entity: &Entity) -> anyhow::Error {
    anyhow::anyhow!("expected a {expected}, found a {}", entity.kind())
}

fn region(entity: &Entity) -> Result<&RegionMarker> {
    entity.as_region().ok_or_else(|| wrong_kind(EntityKind::Region, entity))
}

fn line(entity: &Entity) -> Result<&LineMarker> {
    entity.as_line().ok_or_else(|| wrong_kind(EntityKind::Line, entity))
}

fn point(entity: &Entity) -> Result<&PointMarker> {
    entity.as_point().ok_or_else(|| wrong_kind(EntityKind::Point, entity))
}

fn mesh(entity: &Entity) -> Result<&MeshBody> {
    entity.as_mesh().ok_or_else(|| wrong_kind(EntityKind::Mesh, entity))
}

/// Region marker → `box = [minX, minY, minZ, maxX, maxY, maxZ]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegionToBox;

impl ToEngine for RegionToBox {
    fn to_engine(&mut self, entity: &Entity, target: &mut EngineTarget<'_>) -> Result<()> {
        let (pmin, pmax) = region(entity)?.corners();
        target.write("box", FieldValue::Bounds(bbox_to_flat(pmin, pmax)))?;
        Ok(())
    }
}

/// Line marker → `gravity`: the line direction scaled to `magnitude`.
///
/// Coincident endpoints give a zero vector. A line with fewer than two
/// control points writes nothing.
#[derive(Debug, Clone, Copy)]
pub struct LineToGravity {
    pub magnitude: f64,
}

impl LineToGravity {
    pub fn new(magnitude: f64) -> Self {
        Self { magnitude }
    }
}

impl ToEngine for LineToGravity {
    fn to_engine(&mut self, entity: &Entity, target: &mut EngineTarget<'_>) -> Result<()> {
        let Some(v) = line(entity)?.vector() else {
            return Ok(());
        };
        let g = normalize(v) * self.magnitude;
        target.write("gravity", FieldValue::Vector3(g.to_array()))?;
        Ok(())
    }
}

/// Engine-side layout of the attachment target position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttachmentLayout {
    /// The position repeated `n` times as an N×3 array.
    Replicated(usize),
    /// A single 3-vector.
    Single,
}

impl AttachmentLayout {
    /// Initial engine value for an attachment field with this layout.
    pub fn initial_value(&self) -> FieldValue {
        match self {
            AttachmentLayout::Replicated(_) => FieldValue::empty_points(),
            AttachmentLayout::Single => FieldValue::Vector3([0.; 3]),
        }
    }
}

impl Default for AttachmentLayout {
    fn default() -> Self {
        AttachmentLayout::Replicated(3)
    }
}

/// Point marker → attachment `position`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointToAttachment {
    pub layout: AttachmentLayout,
}

impl PointToAttachment {
    pub fn new(layout: AttachmentLayout) -> Self {
        Self { layout }
    }
}

impl ToEngine for PointToAttachment {
    fn to_engine(&mut self, entity: &Entity, target: &mut EngineTarget<'_>) -> Result<()> {
        let Some(p) = point(entity)?.position() else {
            return Ok(());
        };
        let value = match self.layout {
            AttachmentLayout::Replicated(n) => FieldValue::Points(replicate_point(p, n.max(1))),
            AttachmentLayout::Single => FieldValue::Vector3(p.to_array()),
        };
        target.write("position", value)?;
        Ok(())
    }
}

/// Mesh → container topology and rest positions. Meant for `Cadence::Once`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeshTopologyUpload;

impl ToEngine for MeshTopologyUpload {
    fn to_engine(&mut self, entity: &Entity, target: &mut EngineTarget<'_>) -> Result<()> {
        let mesh = mesh(entity)?;
        let cells = mesh.checked_cells().context("malformed mesh connectivity")?;
        target.write("Container.tetrahedra", FieldValue::Cells(cells))?;
        target.write("Container.position", FieldValue::Points(points_to_array(mesh.points())))?;
        Ok(())
    }
}

/// Deformed collision positions → mesh point buffer.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeshReadBack;

impl FromEngine for MeshReadBack {
    fn from_engine(&mut self, target: &mut EngineTarget<'_>, entity: &mut Entity) -> Result<()> {
        let kind = entity.kind();
        let Some(mesh) = entity.as_mesh_mut() else {
            bail!("expected a {}, found a {kind}", EntityKind::Mesh);
        };
        let value = target.read("Collision.dofs.position")?;
        let Some(arr) = value.as_points() else {
            bail!("expected points at collision dofs, found {}", value.type_name());
        };
        let points = array_to_points(arr)?;
        mesh.set_points(points).context("malformed deformed geometry")?;
        mesh.mark_modified();
        Ok(())
    }
}
