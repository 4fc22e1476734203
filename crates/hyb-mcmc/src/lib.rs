#![deny(missing_docs)]

//! Simulation control engine for segment CT-HYB: move kernel, progress
//! tracking across a worker pool and measurement dispatch.

/// Worker seed derivation.
pub mod determinism;
/// Engine that drives one Markov chain.
pub mod engine;
/// Metropolis-Hastings kernel and the configuration pair it updates.
pub mod kernel;
/// Measurement channels and the segment observable bank.
pub mod measure;
/// Simulation parameters, YAML loading and validation.
pub mod params;
/// Completion tracking.
pub mod progress;
/// Acceptance diagnostics and startup messages.
pub mod report;
/// Clock and worker pool discovery.
pub mod runtime;
/// Move types and their selection distribution.
pub mod schedule;

pub use engine::SimulationEngine;
pub use kernel::{ChainState, ConfigurationPair, StepOutcome, UpdateKernel};
pub use measure::{MeasurementBank, MeasurementChannels, ObservableSummary, SegmentObservables};
pub use params::SimulationParams;
pub use progress::{Phase, ProgressController};
pub use report::{AcceptanceReport, AcceptanceRow};
pub use runtime::{Clock, ManualClock, RuntimeContext, SystemClock, WorkerPool};
pub use schedule::{MoveSchedule, MoveWeights, UpdateKind};
