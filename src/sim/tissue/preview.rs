//! Kinematic preview dynamics for [`crate::engine::MemoryEngine`].
//!
//! Not a physical model: every collision dof outside the fixed box moves by
//! `gravity * dt²` per step, starting from the container rest positions.
//! Dofs inside the box stay where they are. Useful for exercising the
//! read-back path without an external engine.

use anyhow::{Result, bail};

use super::setup::{BOUNDARY_NODE, FEM_NODE};
use crate::Point;
use crate::engine::{EnginePath, FieldStore, FieldValue};
use crate::geom::bboxes::{bbox_from_flat, is_point_inside_bbox};

pub fn kinematic_preview(store: &mut FieldStore, dt: f64) -> Result<()> {
    let fem = EnginePath::from(FEM_NODE);
    let rest_path = fem.join("Container.position");
    let dofs_path = fem.join("Collision.dofs.position");

    let rest = match store.get(rest_path.as_str()) {
        Some(FieldValue::Points(a)) => a.clone(),
        Some(other) => bail!("{rest_path} holds {}, expected points", other.type_name()),
        None => bail!("{rest_path} is missing"),
    };
    let gravity = store
        .get("gravity")
        .and_then(FieldValue::as_vector3)
        .unwrap_or([0.; 3]);
    let fixed_box = store
        .get(EnginePath::from(BOUNDARY_NODE).join("box").as_str())
        .and_then(FieldValue::as_bounds)
        .map(bbox_from_flat);

    let Some(FieldValue::Points(dofs)) = store.get_mut(dofs_path.as_str()) else {
        bail!("{dofs_path} is missing or does not hold points");
    };
    if dofs.dim() != rest.dim() {
        *dofs = rest.clone();
    }

    let sag = gravity.map(|g| g * dt * dt);
    for (mut row, rest_row) in dofs.rows_mut().into_iter().zip(rest.rows()) {
        let p = Point::new(rest_row[0], rest_row[1], rest_row[2]);
        if fixed_box.is_some_and(|(pmin, pmax)| is_point_inside_bbox(p, pmin, pmax)) {
            continue;
        }
        for (x, d) in row.iter_mut().zip(sag) {
            *x += d;
        }
    }

    let deformed = dofs.clone();
    if let Some(FieldValue::Points(mstate)) = store.get_mut(fem.join("mstate.position").as_str()) {
        *mstate = deformed;
    }
    Ok(())
}
