use tracing::{debug, info, trace, warn};

use super::config::SessionConfig;
use super::recorder::SequenceRecorder;
use crate::EntityHandle;
use crate::engine::{Engine, GraphConfig, GraphHandle};
use crate::error::{Error, Result};
use crate::scene::Scene;
use crate::sim::framework::{FieldId, FieldMapping, SceneSynchronizer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
}

/// Why the last run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Requested,
    BudgetExhausted,
}

/// Drives one engine through configure → start → step × N → stop → reset.
///
/// The session owns the engine adapter, the mapping table and the recorder.
/// The scene is borrowed per call and never retained. Each `start()` builds a
/// fresh engine graph; `stop()` releases it.
pub struct SimulationSession<E: Engine> {
    engine: E,
    graph_config: GraphConfig,
    sync: SceneSynchronizer,
    recorder: SequenceRecorder,
    phase: Phase,
    graph: Option<GraphHandle>,
    step_index: usize,
    time_increment: f64,
    step_budget: Option<usize>,
    record_interval: usize,
    stop_reason: Option<StopReason>,
}

impl<E: Engine> SimulationSession<E> {
    pub fn new(engine: E, graph_config: GraphConfig) -> Self {
        let defaults = SessionConfig::new();
        Self {
            engine,
            graph_config,
            sync: SceneSynchronizer::new(),
            recorder: SequenceRecorder::new(),
            phase: Phase::Idle,
            graph: None,
            step_index: 0,
            time_increment: defaults.time_increment,
            step_budget: defaults.step_budget,
            record_interval: defaults.record_interval,
            stop_reason: None,
        }
    }

    pub fn from_config(
        engine: E,
        config: &SessionConfig,
        graph_config: GraphConfig,
    ) -> Result<Self> {
        check_time_increment(config.time_increment)?;
        let mut session = Self::new(engine, graph_config);
        session.time_increment = config.time_increment;
        session.step_budget = config.step_budget;
        session.set_record_interval(config.record_interval);
        Ok(session)
    }

    /// Replaces the mapping table and timing. Only allowed while idle.
    pub fn configure(
        &mut self,
        mappings: Vec<FieldMapping>,
        time_increment: f64,
        step_budget: Option<usize>,
    ) -> Result<()> {
        if self.phase == Phase::Running {
            return Err(Error::AlreadyRunning);
        }
        check_time_increment(time_increment)?;
        self.sync = SceneSynchronizer::from_mappings(mappings)?;
        self.time_increment = time_increment;
        self.step_budget = step_budget;
        debug!(
            mappings = self.sync.len(),
            time_increment, ?step_budget, "session configured"
        );
        Ok(())
    }

    pub fn set_record_interval(&mut self, interval: usize) {
        self.record_interval = interval.max(1);
    }

    /// Builds a fresh graph and pushes the whole scene into it.
    ///
    /// On failure the new graph is released and the session stays idle.
    pub fn start(&mut self, scene: &dyn Scene) -> Result<()> {
        if self.phase == Phase::Running {
            return Err(Error::AlreadyRunning);
        }

        let graph = self.engine.build_graph(&self.graph_config)?;
        let latches = self.sync.latch_snapshot();
        self.sync.rearm();

        if let Err(e) = self.sync.run_to_engine(scene, &mut self.engine, graph) {
            self.sync.restore_latches(&latches);
            if let Err(release) = self.engine.release_graph(graph) {
                warn!(%graph, error = %release, "failed to release graph after failed start");
            }
            return Err(e);
        }

        self.recorder.clear();
        self.graph = Some(graph);
        self.step_index = 0;
        self.stop_reason = None;
        self.phase = Phase::Running;
        info!(%graph, dt = self.time_increment, budget = ?self.step_budget, "simulation started");

        if self.step_budget == Some(0) {
            self.halt(StopReason::BudgetExhausted);
        }
        Ok(())
    }

    /// Runs one synchronized engine step.
    ///
    /// On failure `phase` and `step_index` are unchanged and once-latches are
    /// restored, so the step can be retried.
    pub fn step(&mut self, scene: &mut dyn Scene) -> Result<()> {
        let Some(graph) = self.graph.filter(|_| self.phase == Phase::Running) else {
            return Err(Error::NotRunning);
        };

        let latches = self.sync.latch_snapshot();
        if let Err(e) = self.advance_synchronized(scene, graph) {
            self.sync.restore_latches(&latches);
            debug!(step = self.step_index, error = %e, "step failed");
            return Err(e);
        }

        if self.step_index % self.record_interval == 0 {
            for (field, value) in self.sync.recordable_values() {
                self.recorder.record(field, self.step_index, value.clone());
            }
        }
        trace!(step = self.step_index, "step complete");
        self.step_index += 1;

        if self.step_budget.is_some_and(|budget| self.step_index >= budget) {
            self.halt(StopReason::BudgetExhausted);
        }
        Ok(())
    }

    fn advance_synchronized(&mut self, scene: &mut dyn Scene, graph: GraphHandle) -> Result<()> {
        self.sync.run_to_engine(&*scene, &mut self.engine, graph)?;
        self.engine.advance(graph, self.time_increment)?;
        self.sync.run_from_engine(scene, &mut self.engine, graph)?;
        Ok(())
    }

    /// Steps up to `n` times, stopping early if the budget runs out.
    /// Returns the number of steps taken.
    pub fn run(&mut self, scene: &mut dyn Scene, n: usize) -> Result<usize> {
        if self.phase != Phase::Running {
            return Err(Error::NotRunning);
        }
        let mut taken = 0;
        while taken < n && self.phase == Phase::Running {
            self.step(scene)?;
            taken += 1;
        }
        Ok(taken)
    }

    /// Stops the session and releases its graph. No-op when idle.
    pub fn stop(&mut self) {
        if self.phase == Phase::Idle {
            return;
        }
        self.halt(StopReason::Requested);
    }

    fn halt(&mut self, reason: StopReason) {
        if let Some(graph) = self.graph.take() {
            if let Err(e) = self.engine.release_graph(graph) {
                warn!(%graph, error = %e, "failed to release graph");
            }
        }
        self.phase = Phase::Idle;
        self.stop_reason = Some(reason);
        match reason {
            StopReason::Requested => info!(steps = self.step_index, "simulation stopped"),
            StopReason::BudgetExhausted => {
                info!(steps = self.step_index, "step budget exhausted, simulation stopped")
            }
        }
    }

    /// Clears the step counter, recordings and once-latches. Only allowed while idle.
    pub fn reset(&mut self) -> Result<()> {
        if self.phase == Phase::Running {
            return Err(Error::AlreadyRunning);
        }
        self.step_index = 0;
        self.stop_reason = None;
        self.recorder.clear();
        self.sync.rearm();
        info!("simulation reset");
        Ok(())
    }

    /// Rebinds a mapping to another entity. Takes effect on the next pass.
    pub fn bind(&mut self, field: &FieldId, entity: Option<EntityHandle>) -> Result<()> {
        self.sync.bind(field, entity)
    }

    pub fn recorded_sequences(&self) -> &SequenceRecorder {
        &self.recorder
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn elapsed_time(&self) -> f64 {
        self.step_index as f64 * self.time_increment
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    pub fn time_increment(&self) -> f64 {
        self.time_increment
    }

    pub fn step_budget(&self) -> Option<usize> {
        self.step_budget
    }

    /// Handle of the graph built by the current run, if running.
    pub fn graph(&self) -> Option<GraphHandle> {
        self.graph
    }

    pub fn synchronizer(&self) -> &SceneSynchronizer {
        &self.sync
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }
}

fn check_time_increment(dt: f64) -> Result<()> {
    if !dt.is_finite() || dt <= 0.0 {
        return Err(Error::InvalidConfig(format!(
            "time increment must be finite and positive, got {dt}"
        )));
    }
    Ok(())
}
