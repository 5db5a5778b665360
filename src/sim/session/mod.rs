pub mod config;
pub mod recorder;
pub mod shared;
pub mod simulation;

pub use config::SessionConfig;
pub use recorder::{Sample, SequenceRecorder};
pub use shared::SharedSession;
pub use simulation::{Phase, SimulationSession, StopReason};
