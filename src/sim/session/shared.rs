use std::cell::RefCell;
use std::rc::Rc;

use super::simulation::{Phase, SimulationSession};
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::scene::Scene;
use crate::sim::framework::FieldMapping;

/// Cloneable driver handle for callers that step a session from callbacks
/// (timers, UI events).
///
/// A call made while another call on the same session is in progress, e.g.
/// from inside a field transform, fails with [`Error::SessionBusy`] and leaves
/// the session untouched.
pub struct SharedSession<E: Engine> {
    inner: Rc<RefCell<SimulationSession<E>>>,
}

impl<E: Engine> Clone for SharedSession<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E: Engine> SharedSession<E> {
    pub fn new(session: SimulationSession<E>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(session)),
        }
    }

    /// Runs `f` with exclusive access to the session.
    pub fn with<R>(&self, f: impl FnOnce(&mut SimulationSession<E>) -> Result<R>) -> Result<R> {
        let mut session = self.inner.try_borrow_mut().map_err(|_| Error::SessionBusy)?;
        f(&mut session)
    }

    /// Runs `f` with shared access to the session.
    pub fn inspect<R>(&self, f: impl FnOnce(&SimulationSession<E>) -> R) -> Result<R> {
        let session = self.inner.try_borrow().map_err(|_| Error::SessionBusy)?;
        Ok(f(&session))
    }

    pub fn configure(
        &self,
        mappings: Vec<FieldMapping>,
        time_increment: f64,
        step_budget: Option<usize>,
    ) -> Result<()> {
        self.with(|s| s.configure(mappings, time_increment, step_budget))
    }

    pub fn start(&self, scene: &dyn Scene) -> Result<()> {
        self.with(|s| s.start(scene))
    }

    pub fn step(&self, scene: &mut dyn Scene) -> Result<()> {
        self.with(|s| s.step(scene))
    }

    pub fn stop(&self) -> Result<()> {
        self.with(|s| {
            s.stop();
            Ok(())
        })
    }

    pub fn reset(&self) -> Result<()> {
        self.with(|s| s.reset())
    }

    pub fn phase(&self) -> Result<Phase> {
        self.inspect(|s| s.phase())
    }

    pub fn step_index(&self) -> Result<usize> {
        self.inspect(|s| s.step_index())
    }
}
