//! Event inspection.
//!
//! An inspector reads the trigger bits, primary vertex and centrality of each event and books a
//! few histograms against a vertex axis handed in once through
//! [`EventInspector::setup_for_data`]. The [`EventInspection`] trait carries the steps a
//! specialized inspector may replace, and [`mc::McEventInspector`] builds on it to extract the
//! same quantities from simulated truth.
use std::{fmt::Display, ops::BitOr, str::FromStr};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    data::EsdEvent,
    histograms::{Axis, Histogram1D, OutputList},
    utils::vectors::Vec3,
    EvTaskError, EvTaskResult,
};

/// MC-truth inspection.
pub mod mc;

/// A bit mask of fired triggers.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triggers(u32);

impl Triggers {
    /// Inelastic
    pub const INEL: Triggers = Triggers(0x1);
    /// Inelastic with at least one charged particle at $`|\eta| < 1`$
    pub const INEL_GT0: Triggers = Triggers(0x2);
    /// Non-single-diffractive
    pub const NSD: Triggers = Triggers(0x4);
    /// Empty bunch crossing
    pub const EMPTY: Triggers = Triggers(0x8);
    /// A-side beam only
    pub const A: Triggers = Triggers(0x10);
    /// Both beams
    pub const B: Triggers = Triggers(0x20);
    /// C-side beam only
    pub const C: Triggers = Triggers(0x40);
    /// No beam
    pub const E: Triggers = Triggers(0x80);
    /// Pile-up tagged
    pub const PILEUP: Triggers = Triggers(0x100);
    /// Non-single-diffractive according to MC truth
    pub const MC_NSD: Triggers = Triggers(0x200);
    /// Passed the offline physics selection
    pub const OFFLINE: Triggers = Triggers(0x400);
    /// Satellite collision
    pub const SAT: Triggers = Triggers(0x800);

    /// Every named bit with its label, lowest bit first.
    pub const NAMED: [(Triggers, &'static str); 12] = [
        (Triggers::INEL, "INEL"),
        (Triggers::INEL_GT0, "INEL>0"),
        (Triggers::NSD, "NSD"),
        (Triggers::EMPTY, "Empty"),
        (Triggers::A, "A"),
        (Triggers::B, "B"),
        (Triggers::C, "C"),
        (Triggers::E, "E"),
        (Triggers::PILEUP, "Pileup"),
        (Triggers::MC_NSD, "NSD_MC"),
        (Triggers::OFFLINE, "Offline"),
        (Triggers::SAT, "Satellite"),
    ];

    pub const fn empty() -> Self {
        Triggers(0)
    }
    pub const fn from_bits(bits: u32) -> Self {
        Triggers(bits)
    }
    pub const fn bits(&self) -> u32 {
        self.0
    }
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }
    /// Whether every bit of `other` is set.
    pub const fn contains(&self, other: Triggers) -> bool {
        self.0 & other.0 == other.0
    }
    pub fn insert(&mut self, other: Triggers) {
        self.0 |= other.0;
    }
    pub fn remove(&mut self, other: Triggers) {
        self.0 &= !other.0;
    }
    /// The positions (0-based) of the named bits which are set.
    pub fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        Triggers::NAMED
            .iter()
            .enumerate()
            .filter(|(_, (bit, _))| self.contains(*bit))
            .map(|(i, _)| i)
    }
}

impl BitOr for Triggers {
    type Output = Triggers;

    fn bitor(self, rhs: Self) -> Self::Output {
        Triggers(self.0 | rhs.0)
    }
}

impl Display for Triggers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = Triggers::NAMED
            .iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|(_, name)| *name)
            .collect();
        if names.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", names.join("|"))
        }
    }
}

impl FromStr for Triggers {
    type Err = EvTaskError;

    /// Parse a `|`-separated list of trigger names, as written by [`Display`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("none") {
            return Ok(Triggers::empty());
        }
        s.split('|').try_fold(Triggers::empty(), |acc, part| {
            Triggers::NAMED
                .iter()
                .find(|(_, name)| name.eq_ignore_ascii_case(part.trim()))
                .map(|(bit, _)| acc | *bit)
                .ok_or_else(|| EvTaskError::ParseError {
                    name: part.to_string(),
                    object: "Triggers".to_string(),
                })
        })
    }
}

/// Settings shared by the inspectors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InspectorConfig {
    /// Name of the centrality estimator to read.
    pub centrality_estimator: String,
    /// Vertex axis used by [`EventInspector::setup`].
    pub vertex_axis: Axis,
    /// Centre-of-mass energy in GeV, used when an MC header does not carry one.
    pub sqrt_s: f64,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            centrality_estimator: "V0M".to_string(),
            vertex_axis: Axis::new(10, -10.0, 10.0),
            sqrt_s: 7000.0,
        }
    }
}

impl InspectorConfig {
    pub fn centrality_estimator<N: Into<String>>(mut self, estimator: N) -> Self {
        self.centrality_estimator = estimator.into();
        self
    }
    pub fn vertex_axis(mut self, axis: Axis) -> Self {
        self.vertex_axis = axis;
        self
    }
    pub fn sqrt_s(mut self, sqrt_s: f64) -> Self {
        self.sqrt_s = sqrt_s;
        self
    }
}

/// A centrality percentile together with the estimator's quality flag.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CentralityReading {
    pub percentile: f64,
    pub quality: u16,
}

/// What [`EventInspection::process`] learned about an accepted event.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventSummary {
    pub triggers: Triggers,
    /// 1-based bin of the vertex on the configured axis.
    pub vertex_bin: u16,
    pub ip: Vec3,
    /// Centrality percentile, `-1` when it could not be read.
    pub centrality: f64,
    pub centrality_quality: u16,
}

/// The reconstructed-data inspector.
#[derive(Clone, Debug)]
pub struct EventInspector {
    name: String,
    config: InspectorConfig,
    vertex_axis: Option<Axis>,
    output: OutputList,
}

impl EventInspector {
    pub fn new<N: Into<String>>(name: N, config: InspectorConfig) -> Self {
        let name = name.into();
        Self {
            output: OutputList::new(name.clone()),
            name,
            config,
            vertex_axis: None,
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn config(&self) -> &InspectorConfig {
        &self.config
    }
    pub fn vertex_axis(&self) -> Option<&Axis> {
        self.vertex_axis.as_ref()
    }
    pub fn is_set_up(&self) -> bool {
        self.vertex_axis.is_some()
    }
    pub fn output(&self) -> &OutputList {
        &self.output
    }
    pub fn output_mut(&mut self) -> &mut OutputList {
        &mut self.output
    }
    pub(crate) fn require_axis(&self) -> EvTaskResult<Axis> {
        self.vertex_axis.ok_or_else(|| EvTaskError::NotSetUp {
            name: self.name.clone(),
        })
    }
    /// Book the histograms against `vertex_axis`. Calling this again starts from an empty output
    /// list.
    pub fn setup_for_data(&mut self, vertex_axis: &Axis) -> EvTaskResult<()> {
        info!(
            inspector = %self.name,
            bins = vertex_axis.n_bins(),
            low = vertex_axis.min(),
            high = vertex_axis.max(),
            estimator = %self.config.centrality_estimator,
            "setting up event inspector"
        );
        self.output = OutputList::new(self.name.clone());
        self.vertex_axis = Some(*vertex_axis);
        let n_triggers = Triggers::NAMED.len();
        self.output.add(Histogram1D::new(
            "triggers",
            "Trigger bits",
            Axis::new(n_triggers, -0.5, n_triggers as f64 - 0.5),
        ))?;
        self.output.add(Histogram1D::new(
            "vz_triggered",
            "v_z of triggered events (cm)",
            *vertex_axis,
        ))?;
        self.output.add(Histogram1D::new(
            "vz_accepted",
            "v_z of accepted events (cm)",
            *vertex_axis,
        ))?;
        self.output.add(Histogram1D::new(
            "centrality",
            "Centrality (%)",
            Axis::new(100, 0.0, 100.0),
        ))?;
        Ok(())
    }
    /// Book the histograms against the vertex axis from the configuration.
    pub fn setup(&mut self) -> EvTaskResult<()> {
        let axis = self.config.vertex_axis;
        self.setup_for_data(&axis)
    }
}

/// The steps of event inspection a specialized inspector may replace.
pub trait EventInspection {
    fn core(&self) -> &EventInspector;
    fn core_mut(&mut self) -> &mut EventInspector;

    /// Read the configured centrality estimator.
    fn read_centrality(&self, esd: &EsdEvent) -> EvTaskResult<CentralityReading> {
        let estimator = &self.core().config().centrality_estimator;
        let quality = esd.centrality.as_ref().map(|c| c.quality).unwrap_or(0);
        esd.centrality
            .as_ref()
            .and_then(|c| c.percentile(estimator))
            .map(|percentile| CentralityReading {
                percentile,
                quality,
            })
            .ok_or_else(|| EvTaskError::CentralityUnavailable {
                estimator: estimator.clone(),
                quality,
            })
    }

    /// Whether an event recorded by the fast-only readout partition must be dropped.
    fn check_fast_partition(&self, fast_only: bool) -> bool {
        fast_only
    }

    /// Inspect one reconstructed event, fill the histograms and summarize it.
    fn process(&mut self, esd: &EsdEvent) -> EvTaskResult<EventSummary> {
        let axis = self.core().require_axis()?;
        if self.check_fast_partition(esd.fast_only) {
            debug!(run = esd.run_number, "dropped fast-partition event");
            return Err(EvTaskError::NoTriggers);
        }
        let triggers = Triggers::from_bits(esd.trigger_mask);
        if triggers.is_empty() {
            return Err(EvTaskError::NoTriggers);
        }
        let centrality = match self.read_centrality(esd) {
            Ok(reading) => reading,
            Err(err) => {
                debug!(%err, "falling back to unknown centrality");
                CentralityReading {
                    percentile: -1.0,
                    quality: esd.centrality.as_ref().map(|c| c.quality).unwrap_or(0),
                }
            }
        };
        let output = self.core_mut().output_mut();
        let trigger_histogram = output.h1_mut("triggers")?;
        for position in triggers.positions() {
            trigger_histogram.fill(position as f64);
        }
        let vertex = esd.primary_vertex;
        if !vertex.is_valid() {
            return Err(EvTaskError::NoVertex);
        }
        let vz = vertex.position.z;
        output.h1_mut("vz_triggered")?.fill(vz);
        if !axis.contains(vz) {
            return Err(EvTaskError::BadVertex {
                vz,
                low: axis.min(),
                high: axis.max(),
            });
        }
        output.h1_mut("vz_accepted")?.fill(vz);
        if centrality.percentile >= 0.0 {
            output.h1_mut("centrality")?.fill(centrality.percentile);
        }
        Ok(EventSummary {
            triggers,
            vertex_bin: axis.find_bin(vz) as u16,
            ip: vertex.position,
            centrality: centrality.percentile,
            centrality_quality: centrality.quality,
        })
    }
}

impl EventInspection for EventInspector {
    fn core(&self) -> &EventInspector {
        self
    }
    fn core_mut(&mut self) -> &mut EventInspector {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{test_esd_event, Centrality};
    use approx::assert_relative_eq;

    fn inspector() -> EventInspector {
        let mut inspector = EventInspector::new("inspector", InspectorConfig::default());
        inspector.setup().unwrap();
        inspector
    }

    #[test]
    fn test_trigger_bits() {
        let mut triggers = Triggers::INEL | Triggers::B;
        assert!(triggers.contains(Triggers::INEL));
        assert!(!triggers.contains(Triggers::INEL | Triggers::NSD));
        triggers.insert(Triggers::NSD);
        triggers.remove(Triggers::INEL);
        assert_eq!(triggers.bits(), 0x24);
        assert_eq!(triggers.positions().collect::<Vec<_>>(), vec![2, 5]);
        assert_eq!(triggers.to_string(), "NSD|B");
        assert_eq!("nsd|B".parse::<Triggers>().unwrap(), triggers);
        assert_eq!(Triggers::empty().to_string(), "none");
        assert!("INEL|bogus".parse::<Triggers>().is_err());
    }

    #[test]
    fn test_process_before_setup() {
        let mut inspector = EventInspector::new("inspector", InspectorConfig::default());
        assert!(matches!(
            inspector.process(&test_esd_event()),
            Err(EvTaskError::NotSetUp { .. })
        ));
    }

    #[test]
    fn test_process_event() {
        let mut inspector = inspector();
        let summary = inspector.process(&test_esd_event()).unwrap();
        assert_eq!(summary.triggers, Triggers::INEL | Triggers::INEL_GT0 | Triggers::B);
        assert_eq!(summary.vertex_bin, 6);
        assert_relative_eq!(summary.ip.z, 1.48);
        assert_relative_eq!(summary.centrality, 12.5);
        let output = inspector.output();
        assert_eq!(output.h1("triggers").unwrap().entries(), 3);
        assert_eq!(output.h1("vz_accepted").unwrap().entries(), 1);
        assert_eq!(output.h1("centrality").unwrap().entries(), 1);
    }

    #[test]
    fn test_rejections() {
        let mut inspector = inspector();
        let mut esd = test_esd_event();
        esd.fast_only = true;
        assert!(matches!(
            inspector.process(&esd),
            Err(EvTaskError::NoTriggers)
        ));
        let mut esd = test_esd_event();
        esd.trigger_mask = 0;
        assert!(matches!(
            inspector.process(&esd),
            Err(EvTaskError::NoTriggers)
        ));
        let mut esd = test_esd_event();
        esd.primary_vertex.n_contributors = 0;
        assert!(matches!(inspector.process(&esd), Err(EvTaskError::NoVertex)));
        let mut esd = test_esd_event();
        esd.primary_vertex.position.z = 12.0;
        assert!(matches!(
            inspector.process(&esd),
            Err(EvTaskError::BadVertex { .. })
        ));
        assert_eq!(inspector.output().h1("vz_triggered").unwrap().entries(), 1);
        assert_eq!(inspector.output().h1("vz_accepted").unwrap().entries(), 0);
    }

    #[test]
    fn test_read_centrality() {
        let inspector = EventInspector::new(
            "inspector",
            InspectorConfig::default().centrality_estimator("CL1"),
        );
        let mut esd = test_esd_event();
        esd.centrality = Some(Centrality::new("V0M", 40.0, 3));
        match inspector.read_centrality(&esd) {
            Err(EvTaskError::CentralityUnavailable { estimator, quality }) => {
                assert_eq!(estimator, "CL1");
                assert_eq!(quality, 3);
            }
            other => panic!("unexpected result {:?}", other),
        }
        esd.centrality = Some(Centrality::new("CL1", 40.0, 0));
        let reading = inspector.read_centrality(&esd).unwrap();
        assert_relative_eq!(reading.percentile, 40.0);
    }

    #[test]
    fn test_missing_centrality_is_not_fatal() {
        let mut inspector = inspector();
        let mut esd = test_esd_event();
        esd.centrality = None;
        let summary = inspector.process(&esd).unwrap();
        assert_relative_eq!(summary.centrality, -1.0);
        assert_eq!(inspector.output().h1("centrality").unwrap().entries(), 0);
    }
}
