//! # evtask
//!
//! Per-event building blocks for collision-data analyses. Nothing in this crate owns an event
//! loop: a host reads events, hands them to the components below one at a time, and collects the
//! filled histograms afterwards.
//!
//! - [`rsn`]: converts reconstructed (full or TPC-only tracking), analysis-object or MC-truth
//!   events into the normalized [`RsnEvent`] record used by resonance analyses.
//! - [`reduced`]: the skeleton of an analysis task over reduced events, with owning event, track
//!   and pair cut collections and a per-event scratch array of named [`Variable`]s.
//! - [`inspector`]: event inspection, including the MC-truth inspector which extracts vertex,
//!   collision geometry and diffractive classification from simulated events.
//!
//! # Example
//!
//! ```
//! use evtask::{data::test_esd_event, RsnEvent, RsnReader, SourceEvent, SourceKind};
//!
//! let reader = RsnReader::new(SourceKind::Esd).check_split(true).reject_fakes(true);
//! let esd = test_esd_event();
//! let mut rsn = RsnEvent::default();
//! reader.fill(&mut rsn, SourceEvent::Esd(&esd), None).unwrap();
//! assert!(rsn.multiplicity() > 0);
//! ```
#![warn(clippy::perf, clippy::style)]
#![allow(clippy::excessive_precision)]

use thiserror::Error;

/// Source event types handed in by the host (reconstructed, analysis-object and MC truth).
pub mod data;
/// Fixed-width histograms and the named output list they are collected into.
pub mod histograms;
/// Event inspection, including MC-truth extraction and diffractive classification.
pub mod inspector;
/// Analysis tasks over reduced events: cuts, variables and histogram classes.
pub mod reduced;
/// Conversion of source events into the resonance-analysis event format.
pub mod rsn;
/// Utility functions, enums, and vector types
pub mod utils;

pub use crate::data::{AodEvent, EsdEvent, McEvent, SourceEvent};
pub use crate::histograms::{Axis, Histogram1D, Histogram2D, OutputList};
pub use crate::inspector::{
    mc::{McEventInspector, McTruthSummary},
    EventInspection, EventInspector, InspectorConfig, Triggers,
};
pub use crate::reduced::{
    cuts::{CutList, EventCut, PairCut, TrackCut},
    task::{ReducedAnalysisTask, ReducedTaskBase},
    vars::{VarArray, Variable},
};
pub use crate::rsn::{
    event::{RsnDaughter, RsnEvent},
    pid::PidWeightsManager,
    reader::RsnReader,
};
pub use crate::utils::enums::{PidDetector, SourceKind, Species};
pub use crate::utils::vectors::{Vec3, Vec4};

pub type EvTaskResult<T> = Result<T, EvTaskError>;

/// The error type used by all `evtask` methods
#[derive(Error, Debug)]
pub enum EvTaskError {
    /// The event handed to a [`RsnReader`] is not of the kind the reader was configured for.
    #[error("Reader configured for {expected} events was given a {found} event")]
    SourceMismatch {
        /// The source kind the reader was configured with
        expected: SourceKind,
        /// A description of the event variant which was passed in
        found: &'static str,
    },
    /// The requested centrality estimator is missing from the event.
    #[error("Centrality estimator \"{estimator}\" is unavailable (quality flag {quality})")]
    CentralityUnavailable {
        /// Name of the estimator which was requested
        estimator: String,
        /// Quality flag reported alongside the failed reading
        quality: u16,
    },
    /// No trigger bits survived the trigger reading step.
    #[error("No triggers fired in this event")]
    NoTriggers,
    /// The event does not have a valid primary vertex.
    #[error("No valid primary vertex")]
    NoVertex,
    /// The primary vertex lies outside of the configured vertex axis.
    #[error("Vertex z = {vz} lies outside of the configured range [{low}, {high})")]
    BadVertex {
        /// The vertex position along the beam axis
        vz: f64,
        /// Lower edge of the vertex axis
        low: f64,
        /// Upper edge of the vertex axis
        high: f64,
    },
    /// An inspector was used before [`EventInspector::setup_for_data`] was called.
    #[error("Inspector \"{name}\" has not been set up with a vertex axis")]
    NotSetUp {
        /// Name of the inspector
        name: String,
    },
    /// An axis was described with no bins or with an empty or non-finite range.
    #[error("Invalid axis with {n_bins} bins over [{min}, {max})")]
    InvalidAxis {
        /// Requested number of bins
        n_bins: usize,
        /// Requested lower edge
        min: f64,
        /// Requested upper edge
        max: f64,
    },
    /// A histogram with the same name already exists in the target list.
    #[error("A histogram named \"{name}\" is already registered")]
    DuplicateHistogram {
        /// The offending name
        name: String,
    },
    /// A histogram (or histogram class) lookup failed.
    #[error("No histogram named \"{name}\"")]
    HistogramNotFound {
        /// Name which failed lookup
        name: String,
    },
    /// An error which occurs when the user tries to parse an invalid string of text, typically
    /// into an enum variant.
    #[error("Failed to parse string: \"{name}\" does not correspond to a valid \"{object}\"!")]
    ParseError {
        /// The string which was parsed
        name: String,
        /// The name of the object it failed to parse into
        object: String,
    },
    /// An error returned by the Rust encoder
    #[error("Encoder error: {0}")]
    EncodeError(#[from] bincode::error::EncodeError),
    /// An error returned by the Rust decoder
    #[error("Decoder error: {0}")]
    DecodeError(#[from] bincode::error::DecodeError),
    /// A custom fallback error for errors too complex or too infrequent to warrant their own error
    /// category.
    #[error("{0}")]
    Custom(String),
}
