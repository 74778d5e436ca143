use serde::{Deserialize, Serialize};

use crate::utils::enums::{PidDetector, Species};

/// Combines the per-detector PID weights of a track into an alternative set of weights.
///
/// Only detectors which are switched on and whose momentum window contains the track's
/// transverse momentum contribute; the combined weight of a species is the product of their
/// individual weights. With no contributing detector every species gets weight one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PidWeightsManager {
    use_detector: [bool; PidDetector::COUNT],
    pt_range: [(f64, f64); PidDetector::COUNT],
}

impl Default for PidWeightsManager {
    fn default() -> Self {
        Self {
            use_detector: [false; PidDetector::COUNT],
            pt_range: [(0.0, f64::INFINITY); PidDetector::COUNT],
        }
    }
}

impl PidWeightsManager {
    /// A manager with every detector switched off.
    pub fn new() -> Self {
        Self::default()
    }
    /// Switch a detector on or off.
    pub fn use_detector(mut self, detector: PidDetector, use_it: bool) -> Self {
        self.set_use_detector(detector, use_it);
        self
    }
    pub fn set_use_detector(&mut self, detector: PidDetector, use_it: bool) {
        self.use_detector[detector.index()] = use_it;
    }
    /// Restrict a detector to tracks with $`p_T \in [p_{T,\min}, p_{T,\max})`$.
    pub fn detector_range(mut self, detector: PidDetector, pt_min: f64, pt_max: f64) -> Self {
        self.set_detector_range(detector, pt_min, pt_max);
        self
    }
    pub fn set_detector_range(&mut self, detector: PidDetector, pt_min: f64, pt_max: f64) {
        self.pt_range[detector.index()] = (pt_min, pt_max);
    }
    /// Whether `detector` contributes at the given transverse momentum.
    pub fn is_active(&self, detector: PidDetector, pt: f64) -> bool {
        let (pt_min, pt_max) = self.pt_range[detector.index()];
        self.use_detector[detector.index()] && pt >= pt_min && pt < pt_max
    }
    /// The combined weight of one species.
    pub fn weight(
        &self,
        species: Species,
        pt: f64,
        detector_pid: &[[f64; Species::COUNT]; PidDetector::COUNT],
    ) -> f64 {
        PidDetector::ALL
            .iter()
            .filter(|det| self.is_active(**det, pt))
            .map(|det| detector_pid[det.index()][species.index()])
            .product()
    }
    /// The combined weights of every species.
    pub fn combined_weights(
        &self,
        pt: f64,
        detector_pid: &[[f64; Species::COUNT]; PidDetector::COUNT],
    ) -> [f64; Species::COUNT] {
        Species::ALL.map(|species| self.weight(species, pt, detector_pid))
    }
}
