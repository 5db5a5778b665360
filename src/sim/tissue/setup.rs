//! Default soft-tissue graph, mapping table and sample geometry.

use serde::{Deserialize, Serialize};

use super::rules::{
    AttachmentLayout, LineToGravity, MeshReadBack, MeshTopologyUpload, PointToAttachment,
    RegionToBox,
};
use crate::engine::{EnginePath, FieldValue, GraphConfig};
use crate::scene::{CellArray, MeshBody};
use crate::sim::framework::{Cadence, FieldId, FieldMapping};
use crate::{EntityHandle, Point};

pub const MODEL: &str = "model";
pub const MOVING_POINT: &str = "moving_point";
pub const BOUNDARY_ROI: &str = "boundary_roi";
pub const GRAVITY: &str = "gravity";

pub const FEM_NODE: &str = "FEM";
pub const ATTACH_NODE: &str = "AttachPoint.mouseInteractor";
pub const BOUNDARY_NODE: &str = "FEM.FixedROI.BoxROI";

/// Soft-tissue parameters that shape the graph and the derived fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TissueConfig {
    /// Length of the gravity vector derived from the gravity line.
    pub gravity_magnitude: f64,
    pub attachment_layout: AttachmentLayout,
    pub young_modulus: f64,
    pub poisson_ratio: f64,
    pub total_mass: f64,
}

impl TissueConfig {
    pub fn new() -> Self {
        Self {
            gravity_magnitude: 1.0,
            attachment_layout: AttachmentLayout::default(),
            young_modulus: 1.5,
            poisson_ratio: 0.45,
            total_mass: 1.0,
        }
    }

    /// Engine graph for a tetrahedral FEM body with a fixed box region,
    /// collision dofs and an attachment point.
    pub fn graph_config(&self) -> GraphConfig {
        let fem = EnginePath::from(FEM_NODE);
        let attach = EnginePath::from(ATTACH_NODE);
        let boundary = EnginePath::from(BOUNDARY_NODE);
        GraphConfig::new("soft_tissue")
            .with_field("gravity", FieldValue::Vector3([0.; 3]))
            .with_field(fem.join("Container.position"), FieldValue::empty_points())
            .with_field(fem.join("Container.tetrahedra"), FieldValue::Cells(Vec::new()))
            .with_field(fem.join("mstate.position"), FieldValue::empty_points())
            .with_field(fem.join("FEM.youngModulus"), FieldValue::Scalar(self.young_modulus))
            .with_field(fem.join("FEM.poissonRatio"), FieldValue::Scalar(self.poisson_ratio))
            .with_field(fem.join("mass.totalMass"), FieldValue::Scalar(self.total_mass))
            .with_field(fem.join("Collision.dofs.position"), FieldValue::empty_points())
            .with_field(boundary.join("box"), FieldValue::Bounds([0.; 6]))
            .with_field(attach.join("position"), self.attachment_layout.initial_value())
    }

    /// Mapping table in upload order: model topology first, then the markers.
    pub fn mappings(&self, bindings: &TissueBindings) -> Vec<FieldMapping> {
        let bind = |m: FieldMapping, h: &Option<EntityHandle>| match h {
            Some(h) => m.bound_to(h.clone()),
            None => m,
        };
        vec![
            bind(
                FieldMapping::new(MODEL, FEM_NODE)
                    .with_cadence(Cadence::Once)
                    .with_recording(true)
                    .to_engine(MeshTopologyUpload)
                    .from_engine(MeshReadBack),
                &bindings.model,
            ),
            bind(
                FieldMapping::new(MOVING_POINT, ATTACH_NODE)
                    .with_recording(true)
                    .to_engine(PointToAttachment::new(self.attachment_layout)),
                &bindings.moving_point,
            ),
            bind(
                FieldMapping::new(BOUNDARY_ROI, BOUNDARY_NODE)
                    .with_recording(true)
                    .to_engine(RegionToBox),
                &bindings.boundary_roi,
            ),
            bind(
                FieldMapping::new(GRAVITY, EnginePath::root())
                    .with_recording(true)
                    .to_engine(LineToGravity::new(self.gravity_magnitude)),
                &bindings.gravity,
            ),
        ]
    }
}

impl Default for TissueConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Scene entities driving the default mapping table. Any may be unset.
#[derive(Debug, Clone, Default)]
pub struct TissueBindings {
    pub model: Option<EntityHandle>,
    pub moving_point: Option<EntityHandle>,
    pub boundary_roi: Option<EntityHandle>,
    pub gravity: Option<EntityHandle>,
}

impl TissueBindings {
    /// Pairs of (field id, handle) for rebinding a running session.
    pub fn iter(&self) -> impl Iterator<Item = (FieldId, Option<&EntityHandle>)> {
        [
            (MODEL, &self.model),
            (MOVING_POINT, &self.moving_point),
            (BOUNDARY_ROI, &self.boundary_roi),
            (GRAVITY, &self.gravity),
        ]
        .into_iter()
        .map(|(id, h)| (FieldId::from(id), h.as_ref()))
    }
}

/// Tetrahedral block of `nx × ny × nz` cubes with edge length `spacing`,
/// starting at `origin`. Each cube is split into six tetrahedra along its
/// main diagonal.
pub fn block_mesh(origin: Point, spacing: f64, nx: usize, ny: usize, nz: usize) -> MeshBody {
    let idx = |i: usize, j: usize, k: usize| i + (nx + 1) * (j + (ny + 1) * k);

    let mut points = Vec::with_capacity((nx + 1) * (ny + 1) * (nz + 1));
    for k in 0..=nz {
        for j in 0..=ny {
            for i in 0..=nx {
                points.push(Point::new(
                    origin.x + i as f64 * spacing,
                    origin.y + j as f64 * spacing,
                    origin.z + k as f64 * spacing,
                ));
            }
        }
    }

    // Corner offsets as (di, dj, dk) bit triples; paths run from 000 to 111.
    const PATHS: [[usize; 2]; 6] = [[1, 3], [1, 5], [2, 3], [2, 6], [4, 5], [4, 6]];
    let mut cells = Vec::with_capacity(nx * ny * nz * 6);
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                let corner =
                    |bits: usize| idx(i + (bits & 1), j + ((bits >> 1) & 1), k + (bits >> 2));
                for [a, b] in PATHS {
                    cells.push([corner(0), corner(a), corner(b), corner(7)]);
                }
            }
        }
    }

    MeshBody::new(points, CellArray::from_cells(&cells))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Engine, MemoryEngine};

    #[test]
    fn test_graph_config_builds() -> anyhow::Result<()> {
        let cfg = TissueConfig::new();
        let mut engine = MemoryEngine::new();
        let graph = engine.build_graph(&cfg.graph_config())?;
        let e = |p: &str| engine.exists(graph, &EnginePath::from(p));
        assert!(e("gravity"));
        assert!(e("FEM.Container.tetrahedra"));
        assert!(e("FEM.FixedROI.BoxROI.box"));
        assert!(e("FEM.Collision.dofs.position"));
        assert!(e("AttachPoint.mouseInteractor.position"));
        assert_eq!(
            engine.read(graph, &"FEM.FEM.youngModulus".into())?,
            FieldValue::Scalar(1.5)
        );
        Ok(())
    }

    #[test]
    fn test_single_layout_graph() -> anyhow::Result<()> {
        let cfg = TissueConfig {
            attachment_layout: AttachmentLayout::Single,
            ..TissueConfig::new()
        };
        let graph_config = cfg.graph_config();
        let value = &graph_config.fields[&EnginePath::from("AttachPoint.mouseInteractor.position")];
        assert_eq!(value.type_name(), "vector3");
        Ok(())
    }

    #[test]
    fn test_mapping_table() {
        let bindings = TissueBindings {
            gravity: Some(EntityHandle::from("g")),
            ..Default::default()
        };
        let mappings = TissueConfig::new().mappings(&bindings);
        let ids: Vec<&str> = mappings.iter().map(|m| m.id().as_str()).collect();
        assert_eq!(ids, vec![MODEL, MOVING_POINT, BOUNDARY_ROI, GRAVITY]);
        assert!(mappings.iter().all(FieldMapping::is_recordable));
        assert_eq!(mappings[0].cadence(), Cadence::Once);
        assert!(mappings[3].target().is_root());
        assert_eq!(mappings[3].entity(), Some(&EntityHandle::from("g")));
        assert!(mappings[0].entity().is_none());

        let bound: Vec<_> = bindings.iter().filter(|(_, h)| h.is_some()).collect();
        assert_eq!(bound.len(), 1);
        assert_eq!(bound[0].0, FieldId::from(GRAVITY));
    }

    #[test]
    fn test_block_mesh() -> anyhow::Result<()> {
        let mesh = block_mesh(Point::origin(), 0.5, 2, 1, 3);
        assert_eq!(mesh.point_count(), 3 * 2 * 4);
        let cells = mesh.checked_cells()?;
        assert_eq!(cells.len(), 36);
        assert!(cells.iter().all(|c| c.len() == 4));
        let (pmin, pmax) = mesh.bounds()?;
        assert!(pmin.is_close(&Point::origin()));
        assert!(pmax.is_close(&Point::new(1., 0.5, 1.5)));
        Ok(())
    }

    #[test]
    fn test_config_json() -> anyhow::Result<()> {
        let cfg: TissueConfig = serde_json::from_str(r#"{"gravity_magnitude": 10000.0}"#)?;
        assert_eq!(cfg.gravity_magnitude, 10000.0);
        assert_eq!(cfg.attachment_layout, AttachmentLayout::Replicated(3));
        Ok(())
    }
}
