//! Analysis tasks over reduced events.
//!
//! A task owns three ordered cut collections (event, track and pair cuts), a scratch
//! [`VarArray`](vars::VarArray) which is refilled for every entity it looks at, and a
//! [`HistogramManager`](histos::HistogramManager) whose histogram classes are filled from that
//! array. The host calls [`init`](task::ReducedAnalysisTask::init) once,
//! [`process`](task::ReducedAnalysisTask::process) per event and
//! [`finish`](task::ReducedAnalysisTask::finish) at the end of the run.

/// Event, track and pair cuts and the owning collections that hold them.
pub mod cuts;
/// Reduced event, track and pair records.
pub mod data;
/// Histogram classes bound to scratch variables.
pub mod histos;
/// A quality-assurance task exercising the full task lifecycle.
pub mod qa;
/// The task base and the trait every task implements.
pub mod task;
/// Named physics variables and the scratch array indexed by them.
pub mod vars;
