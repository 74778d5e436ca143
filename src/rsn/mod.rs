//! Resonance-analysis event format and the reader which fills it.
//!
//! The host owns a [`RsnEvent`](event::RsnEvent) for the lifetime of the job and asks a
//! [`RsnReader`](reader::RsnReader) to refill it from every incoming source event.

/// The normalized event record and its daughter tracks.
pub mod event;
/// Alternative particle-identification weights built from individual detectors.
pub mod pid;
/// Conversion of source events into [`RsnEvent`](event::RsnEvent)s.
pub mod reader;
