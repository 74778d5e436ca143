use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    data::{one_hot_pid, AodTrack, EsdTrack, McEvent, SourceEvent},
    rsn::{
        event::{McInfo, RsnDaughter, RsnEvent},
        pid::PidWeightsManager,
    },
    utils::{
        enums::{PidDetector, SourceKind, Species},
        vectors::Vec3,
    },
    EvTaskError, EvTaskResult,
};

/// The accessors the reader needs from a reconstructed track, shared by ESD and AOD tracks.
trait ReconstructedTrack {
    fn label(&self) -> i32;
    fn charge(&self) -> i8;
    /// Fit quality used to pick the survivor among split duplicates (lower is better).
    fn quality_chi2(&self) -> f64;
    /// Momentum under the requested tracking, `None` if that tracking is unavailable.
    fn momentum(&self, tpc_only: bool) -> Option<Vec3>;
    fn pid(&self) -> [f64; Species::COUNT];
    fn detector_pid(&self) -> &[[f64; Species::COUNT]; PidDetector::COUNT];
}

impl ReconstructedTrack for EsdTrack {
    fn label(&self) -> i32 {
        self.label
    }
    fn charge(&self) -> i8 {
        self.charge
    }
    fn quality_chi2(&self) -> f64 {
        self.constrained_chi2
    }
    fn momentum(&self, tpc_only: bool) -> Option<Vec3> {
        if tpc_only {
            self.tpc_inner_momentum
        } else {
            Some(self.momentum)
        }
    }
    fn pid(&self) -> [f64; Species::COUNT] {
        self.pid
    }
    fn detector_pid(&self) -> &[[f64; Species::COUNT]; PidDetector::COUNT] {
        &self.detector_pid
    }
}

impl ReconstructedTrack for AodTrack {
    fn label(&self) -> i32 {
        self.label
    }
    fn charge(&self) -> i8 {
        self.charge
    }
    fn quality_chi2(&self) -> f64 {
        self.chi2_per_ndf
    }
    fn momentum(&self, _tpc_only: bool) -> Option<Vec3> {
        Some(self.momentum)
    }
    fn pid(&self) -> [f64; Species::COUNT] {
        self.pid
    }
    fn detector_pid(&self) -> &[[f64; Species::COUNT]; PidDetector::COUNT] {
        &self.detector_pid
    }
}

/// Fills a [`RsnEvent`] from one of the supported source events.
///
/// The reader does not own the record: the host creates it once and passes it to
/// [`RsnReader::fill`] for every event, which clears and refills it.
///
/// # Examples
///
/// ```
/// use evtask::{data::test_aod_event, RsnEvent, RsnReader, SourceEvent, SourceKind};
///
/// let reader = RsnReader::new(SourceKind::Aod).reject_fakes(true);
/// let mut rsn = RsnEvent::default();
/// reader.fill(&mut rsn, SourceEvent::Aod(&test_aod_event()), None).unwrap();
/// assert!(rsn.tracks().iter().all(|t| t.label >= 0));
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RsnReader {
    source: SourceKind,
    check_split: bool,
    reject_fakes: bool,
    weights_manager: Option<PidWeightsManager>,
}

impl RsnReader {
    /// A reader for `source` events with split checking and fake rejection switched off.
    pub fn new(source: SourceKind) -> Self {
        Self {
            source,
            ..Default::default()
        }
    }
    /// Remove the worse track of every pair sharing an MC label.
    pub fn check_split(mut self, doit: bool) -> Self {
        self.check_split = doit;
        self
    }
    /// Skip tracks with a negative MC label.
    pub fn reject_fakes(mut self, doit: bool) -> Self {
        self.reject_fakes = doit;
        self
    }
    /// Compute PID weights with `manager` instead of using the track's combined PID.
    pub fn weights_manager(mut self, manager: PidWeightsManager) -> Self {
        self.weights_manager = Some(manager);
        self
    }
    pub fn set_source(&mut self, source: SourceKind) {
        self.source = source;
    }
    pub fn set_check_split(&mut self, doit: bool) {
        self.check_split = doit;
    }
    pub fn set_reject_fakes(&mut self, doit: bool) {
        self.reject_fakes = doit;
    }
    pub fn set_weights_manager(&mut self, manager: Option<PidWeightsManager>) {
        self.weights_manager = manager;
    }
    pub fn source(&self) -> SourceKind {
        self.source
    }
    pub fn is_checking_split(&self) -> bool {
        self.check_split
    }
    pub fn is_rejecting_fakes(&self) -> bool {
        self.reject_fakes
    }

    /// Clear `rsn` and fill it from `event`.
    ///
    /// `ref_mc` is the simulated event matching a reconstructed `event`; when given, every
    /// daughter gets the [`McInfo`] of the particle its label points to. It is ignored for MC
    /// sources.
    ///
    /// # Errors
    ///
    /// Returns [`EvTaskError::SourceMismatch`] when the variant of `event` does not match the
    /// configured [`SourceKind`]. In that case `rsn` is left untouched.
    pub fn fill(
        &self,
        rsn: &mut RsnEvent,
        event: SourceEvent<'_>,
        ref_mc: Option<&McEvent>,
    ) -> EvTaskResult<()> {
        match (self.source, event) {
            (SourceKind::Esd, SourceEvent::Esd(esd)) => {
                self.fill_reconstructed(
                    rsn,
                    esd.primary_vertex.position,
                    &esd.tracks,
                    ref_mc,
                    false,
                );
            }
            (SourceKind::EsdTpc, SourceEvent::Esd(esd)) => {
                self.fill_reconstructed(rsn, esd.tpc_vertex.position, &esd.tracks, ref_mc, true);
            }
            (SourceKind::Aod, SourceEvent::Aod(aod)) => {
                self.fill_reconstructed(
                    rsn,
                    aod.primary_vertex.position,
                    &aod.tracks,
                    ref_mc,
                    false,
                );
            }
            (SourceKind::Mc, SourceEvent::Mc(mc)) => self.fill_from_mc(rsn, mc),
            (expected, other) => {
                warn!(
                    expected = %expected,
                    found = other.kind_name(),
                    "source event does not match reader configuration"
                );
                return Err(EvTaskError::SourceMismatch {
                    expected,
                    found: other.kind_name(),
                });
            }
        }
        Ok(())
    }

    /// Flag the tracks to keep: for every group sharing `|label|`, only the one with the lowest
    /// fit $`\chi^2`$ survives (the later track wins a tie).
    fn split_acceptance<T: ReconstructedTrack>(&self, tracks: &[T]) -> Vec<bool> {
        if !self.check_split {
            return vec![true; tracks.len()];
        }
        let mut best: IndexMap<u32, usize> = IndexMap::with_capacity(tracks.len());
        for (index, track) in tracks.iter().enumerate() {
            let best_index = best.entry(track.label().unsigned_abs()).or_insert(index);
            if tracks[*best_index].quality_chi2() >= track.quality_chi2() {
                *best_index = index;
            }
        }
        let mut accept = vec![false; tracks.len()];
        for index in best.into_values() {
            accept[index] = true;
        }
        accept
    }

    fn fill_reconstructed<T: ReconstructedTrack>(
        &self,
        rsn: &mut RsnEvent,
        vertex: Vec3,
        tracks: &[T],
        ref_mc: Option<&McEvent>,
        tpc_only: bool,
    ) {
        rsn.clear();
        rsn.set_primary_vertex(vertex);
        let accept = self.split_acceptance(tracks);
        for (index, track) in tracks.iter().enumerate() {
            if !accept[index] {
                debug!(index, label = track.label(), "rejecting split track");
                continue;
            }
            if self.reject_fakes && track.label() < 0 {
                debug!(index, label = track.label(), "rejecting fake track");
                continue;
            }
            let Some(momentum) = track.momentum(tpc_only) else {
                debug!(index, "track has no TPC-only parameters");
                continue;
            };
            let pid_weights = match &self.weights_manager {
                Some(manager) => manager.combined_weights(momentum.perp(), track.detector_pid()),
                None => track.pid(),
            };
            let mc = ref_mc.and_then(|mc| mc_info(mc, track.label().unsigned_abs() as usize));
            rsn.add_track(RsnDaughter {
                index,
                label: track.label(),
                charge: track.charge(),
                momentum,
                pid_weights,
                mc,
            });
        }
        rsn.make_computations();
    }

    fn fill_from_mc(&self, rsn: &mut RsnEvent, mc: &McEvent) {
        rsn.clear();
        rsn.set_primary_vertex(mc.header.primary_vertex);
        for (index, particle) in mc.final_state_primaries() {
            let charge = particle.charge();
            if charge == 0 {
                continue;
            }
            let pid_weights = Species::from_pdg(particle.pdg)
                .map(one_hot_pid)
                .unwrap_or([0.0; Species::COUNT]);
            rsn.add_track(RsnDaughter {
                index,
                label: index as i32,
                charge,
                momentum: particle.momentum.vec3(),
                pid_weights,
                mc: mc_info(mc, index),
            });
        }
        rsn.make_computations();
    }
}

fn mc_info(mc: &McEvent, label: usize) -> Option<McInfo> {
    let particle = mc.particle(label)?;
    let mother_pdg = particle
        .first_mother
        .and_then(|mother| mc.particle(mother))
        .map_or(0, |mother| mother.pdg);
    Some(McInfo {
        pdg: particle.pdg,
        mother_pdg,
        momentum: particle.momentum,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{test_aod_event, test_esd_event, test_mc_event};
    use approx::assert_relative_eq;

    fn labels(rsn: &RsnEvent) -> Vec<i32> {
        rsn.tracks().iter().map(|t| t.label).collect()
    }

    #[test]
    fn test_fill_esd_keeps_everything_by_default() {
        let esd = test_esd_event();
        let mut rsn = RsnEvent::default();
        RsnReader::new(SourceKind::Esd)
            .fill(&mut rsn, SourceEvent::Esd(&esd), None)
            .unwrap();
        assert_eq!(labels(&rsn), vec![1, 2, 3, 3, -7]);
        assert_eq!(rsn.multiplicity(), 5);
        assert_eq!(rsn.positive(), &[0, 2, 3]);
        assert_eq!(rsn.negative(), &[1, 4]);
        assert_eq!(rsn.primary_vertex(), esd.primary_vertex.position);
        assert!(rsn.tracks().iter().all(|t| t.mc.is_none()));
    }

    #[test]
    fn test_check_split_removes_worse_duplicate() {
        let esd = test_esd_event();
        let mut rsn = RsnEvent::default();
        let reader = RsnReader::new(SourceKind::Esd).check_split(true);
        reader.fill(&mut rsn, SourceEvent::Esd(&esd), None).unwrap();
        assert_eq!(labels(&rsn), vec![1, 2, 3, -7]);
        // the surviving pion is the one with the better chi2
        assert_eq!(rsn.track(2).unwrap().index, 2);
    }

    #[test]
    fn test_split_tie_keeps_later_track() {
        let mut esd = test_esd_event();
        esd.tracks[3].constrained_chi2 = esd.tracks[2].constrained_chi2;
        let mut rsn = RsnEvent::default();
        RsnReader::new(SourceKind::Esd)
            .check_split(true)
            .fill(&mut rsn, SourceEvent::Esd(&esd), None)
            .unwrap();
        let pion: Vec<usize> = rsn
            .tracks()
            .iter()
            .filter(|t| t.label == 3)
            .map(|t| t.index)
            .collect();
        assert_eq!(pion, vec![3]);
    }

    #[test]
    fn test_reject_fakes() {
        let esd = test_esd_event();
        let mut rsn = RsnEvent::default();
        let mut reader = RsnReader::new(SourceKind::Esd).reject_fakes(true);
        reader.fill(&mut rsn, SourceEvent::Esd(&esd), None).unwrap();
        assert!(!labels(&rsn).contains(&-7));
        reader.set_reject_fakes(false);
        reader.fill(&mut rsn, SourceEvent::Esd(&esd), None).unwrap();
        assert!(labels(&rsn).contains(&-7));
    }

    #[test]
    fn test_tpc_only_uses_tpc_parameters() {
        let mut esd = test_esd_event();
        esd.tracks[0].tpc_inner_momentum = None;
        let mut rsn = RsnEvent::default();
        RsnReader::new(SourceKind::EsdTpc)
            .fill(&mut rsn, SourceEvent::Esd(&esd), None)
            .unwrap();
        assert_eq!(labels(&rsn), vec![2, 3, 3, -7]);
        assert_eq!(rsn.primary_vertex(), esd.tpc_vertex.position);
        assert_relative_eq!(
            rsn.tracks()[0].momentum.x,
            esd.tracks[1].momentum.x * 0.99
        );
    }

    #[test]
    fn test_reference_mc_attaches_truth() {
        let esd = test_esd_event();
        let mc = test_mc_event();
        let mut rsn = RsnEvent::default();
        RsnReader::new(SourceKind::Esd)
            .fill(&mut rsn, SourceEvent::Esd(&esd), Some(&mc))
            .unwrap();
        let kaon = rsn.track(0).unwrap().mc.unwrap();
        assert_eq!(kaon.pdg, 321);
        assert_eq!(kaon.mother_pdg, 333);
        let pion = rsn.track(2).unwrap().mc.unwrap();
        assert_eq!(pion.mother_pdg, 0);
        // label -7 points past the end of the stack
        assert!(rsn.track(4).unwrap().mc.is_none());
    }

    #[test]
    fn test_weights_manager_overrides_pid() {
        let esd = test_esd_event();
        let mut rsn = RsnEvent::default();
        let manager = PidWeightsManager::new()
            .use_detector(PidDetector::Tpc, true)
            .use_detector(PidDetector::Tof, true);
        RsnReader::new(SourceKind::Esd)
            .weights_manager(manager)
            .fill(&mut rsn, SourceEvent::Esd(&esd), None)
            .unwrap();
        let weights = rsn.track(0).unwrap().pid_weights;
        assert_relative_eq!(weights[Species::Kaon.index()], 0.6 * 0.8);
        assert_eq!(rsn.track(0).unwrap().most_probable(), Some(Species::Kaon));
    }

    #[test]
    fn test_fill_aod() {
        let aod = test_aod_event();
        let mut rsn = RsnEvent::default();
        RsnReader::new(SourceKind::Aod)
            .check_split(true)
            .reject_fakes(true)
            .fill(&mut rsn, SourceEvent::Aod(&aod), None)
            .unwrap();
        assert_eq!(labels(&rsn), vec![1, 2, 3]);
    }

    #[test]
    fn test_fill_mc() {
        let mc = test_mc_event();
        let mut rsn = RsnEvent::default();
        RsnReader::new(SourceKind::Mc)
            .fill(&mut rsn, SourceEvent::Mc(&mc), None)
            .unwrap();
        assert_eq!(labels(&rsn), vec![1, 2, 3, 4, 5]);
        assert_eq!(rsn.primary_vertex(), mc.header.primary_vertex);
        let kaon = rsn.track(0).unwrap();
        assert_eq!(kaon.most_probable(), Some(Species::Kaon));
        assert_eq!(kaon.mc.unwrap().mother_pdg, 333);
    }

    #[test]
    fn test_fill_mc_keeps_charged_hyperons_and_nuclei() {
        let mut mc = test_mc_event();
        for pdg in [3222, 3334, 1000010020, 3122] {
            let mut particle = mc.particles[3].clone();
            particle.pdg = pdg;
            particle.first_mother = None;
            mc.particles.push(particle);
        }
        let mut rsn = RsnEvent::default();
        RsnReader::new(SourceKind::Mc)
            .fill(&mut rsn, SourceEvent::Mc(&mc), None)
            .unwrap();
        assert_eq!(labels(&rsn), vec![1, 2, 3, 4, 5, 6, 7, 8]);
        let sigma = rsn.track(5).unwrap();
        assert_eq!(sigma.charge, 1);
        assert_eq!(sigma.pid_weights, [0.0; Species::COUNT]);
        assert_eq!(sigma.mc.unwrap().pdg, 3222);
        assert_eq!(rsn.track(6).unwrap().charge, -1);
        assert_eq!(rsn.track(7).unwrap().charge, 1);
    }

    #[test]
    fn test_mismatched_source_leaves_record_untouched() {
        let esd = test_esd_event();
        let mc = test_mc_event();
        let mut rsn = RsnEvent::default();
        RsnReader::new(SourceKind::Esd)
            .fill(&mut rsn, SourceEvent::Esd(&esd), None)
            .unwrap();
        for kind in [SourceKind::Aod, SourceKind::Mc] {
            let result = RsnReader::new(kind).fill(&mut rsn, SourceEvent::Esd(&esd), None);
            assert!(matches!(result, Err(EvTaskError::SourceMismatch { .. })));
        }
        let result = RsnReader::new(SourceKind::EsdTpc).fill(&mut rsn, SourceEvent::Mc(&mc), None);
        assert!(matches!(
            result,
            Err(EvTaskError::SourceMismatch {
                expected: SourceKind::EsdTpc,
                found: "MC"
            })
        ));
        assert_eq!(rsn.multiplicity(), 5);
    }

    #[test]
    fn test_empty_event_is_valid() {
        let mut esd = test_esd_event();
        esd.tracks.clear();
        let mut rsn = RsnEvent::default();
        RsnReader::new(SourceKind::Esd)
            .check_split(true)
            .fill(&mut rsn, SourceEvent::Esd(&esd), None)
            .unwrap();
        assert_eq!(rsn.multiplicity(), 0);
    }
}
