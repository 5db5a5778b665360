use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tissue3d::engine::MemoryEngine;
use tissue3d::scene::placement::{
    linear_path, lower_slab_region, point_marker_nearest, vertical_gravity_line,
};
use tissue3d::scene::SceneStore;
use tissue3d::sim::session::{SessionConfig, SimulationSession};
use tissue3d::sim::tissue::{TissueBindings, TissueConfig, block_mesh, kinematic_preview};
use tissue3d::Point;

const TOTAL_STEPS: usize = 100;

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut args = std::env::args().skip(1);
    let scenario = args.next().unwrap_or_else(|| "gravity".to_string());
    let output = args.next().map(PathBuf::from);

    // Sample body: 4 × 4 × 6 cubes of 10 mm
    let mesh = block_mesh(Point::origin(), 10., 4, 4, 6);
    let mut scene = SceneStore::new();
    let mut bindings = TissueBindings::default();
    let mut tissue = TissueConfig::new();

    let path = match scenario.as_str() {
        "gravity" => {
            bindings.boundary_roi = Some(scene.add(lower_slab_region(&mesh, 1. / 3.)?));
            bindings.gravity = Some(scene.add(vertical_gravity_line(&mesh)?));
            tissue.gravity_magnitude = 10000.;
            None
        }
        "moving-point" => {
            let roi = lower_slab_region(&mesh, 0.1)?;
            let (pmin, pmax) = roi.corners();
            let end = Point::new(
                pmin.x,
                roi.center.y + roi.half_extents[1] / 2.,
                pmax.z + roi.half_extents[2],
            );
            let marker = point_marker_nearest(&mesh, Point::new(20., 20., 200.))?;
            let start = marker.position().context("moving point has no position")?;
            bindings.boundary_roi = Some(scene.add(roi));
            let handle = scene.add(marker);
            bindings.moving_point = Some(handle.clone());
            tissue.gravity_magnitude = 0.;
            Some((handle, linear_path(start, end, TOTAL_STEPS)))
        }
        other => bail!("unknown scenario `{other}` (expected `gravity` or `moving-point`)"),
    };
    bindings.model = Some(scene.add(mesh));

    let config = SessionConfig {
        step_budget: Some(TOTAL_STEPS),
        ..SessionConfig::new()
    };
    let engine = MemoryEngine::new().with_solver(kinematic_preview);
    let mut session = SimulationSession::from_config(engine, &config, tissue.graph_config())?;
    session.configure(
        tissue.mappings(&bindings),
        config.time_increment,
        config.step_budget,
    )?;

    info!(%scenario, steps = TOTAL_STEPS, "running");
    session.start(&scene)?;
    match path {
        Some((handle, positions)) => {
            for p in positions {
                if let Some(marker) = scene.point_mut(&handle) {
                    marker.set_position(p);
                }
                session.step(&mut scene)?;
            }
        }
        None => {
            session.run(&mut scene, TOTAL_STEPS)?;
        }
    }
    session.stop();

    let recorder = session.recorded_sequences();
    for field in recorder.fields() {
        info!(%field, samples = recorder.sequence_for(field).len(), "recorded");
    }
    if let Some(model) = bindings.model.as_ref().and_then(|h| scene.mesh(h)) {
        let (pmin, pmax) = model.bounds()?;
        println!("Deformed bounds: {pmin:.4} .. {pmax:.4} (revision {})", model.revision());
    }
    println!(
        "Simulated {} steps ({:.2}s, stopped: {:?})",
        session.step_index(),
        session.elapsed_time(),
        session.stop_reason()
    );

    if let Some(path) = output {
        recorder.write_json(&path)?;
        println!("Recorded sequences written to {}", path.display());
    }
    Ok(())
}
