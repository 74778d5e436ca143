use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::utils::{
    enums::{PidDetector, Species},
    vectors::{Vec3, Vec4},
};

/// Track status bit set when the ITS refit succeeded.
pub const STATUS_ITS_REFIT: u32 = 0x4;
/// Track status bit set when the TPC refit succeeded.
pub const STATUS_TPC_REFIT: u32 = 0x40;
/// Track status bit set when the track has a TOF signal.
pub const STATUS_TOF_OUT: u32 = 0x2000;

/// A reconstructed primary vertex.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    /// Vertex position in cm.
    pub position: Vec3,
    /// Number of tracks which contributed to the vertex fit (zero means no vertex was found).
    pub n_contributors: u32,
}

impl Vertex {
    pub fn new(position: Vec3, n_contributors: u32) -> Self {
        Self {
            position,
            n_contributors,
        }
    }
    /// A vertex is usable when at least one track contributed to it.
    pub fn is_valid(&self) -> bool {
        self.n_contributors > 0
    }
}

/// Centrality estimates attached to a reconstructed event.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Centrality {
    /// Percentile per estimator name (`"V0M"`, `"CL1"`, ...).
    pub estimators: IndexMap<String, f64>,
    /// Quality flag of the centrality determination, zero when good.
    pub quality: u16,
}

impl Centrality {
    pub fn new<N: Into<String>>(estimator: N, percentile: f64, quality: u16) -> Self {
        let mut estimators = IndexMap::new();
        estimators.insert(estimator.into(), percentile);
        Self {
            estimators,
            quality,
        }
    }
    pub fn percentile(&self, estimator: &str) -> Option<f64> {
        self.estimators.get(estimator).copied()
    }
}

/// A track of a fully reconstructed event.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EsdTrack {
    /// Momentum from the global (ITS + TPC) fit.
    pub momentum: Vec3,
    /// Momentum at the inner wall of the TPC from the TPC-only fit, if it exists.
    pub tpc_inner_momentum: Option<Vec3>,
    pub charge: i8,
    /// Index of the associated MC particle; negative for fake tracks.
    pub label: i32,
    /// $`\chi^2`$ of the vertex-constrained fit, used to rank split duplicates.
    pub constrained_chi2: f64,
    /// Status bits (see [`STATUS_ITS_REFIT`] and friends).
    pub status: u32,
    /// Combined (Bayesian) PID probabilities per [`Species`].
    pub pid: [f64; Species::COUNT],
    /// Per-detector PID weights, indexed by [`PidDetector`] then [`Species`].
    pub detector_pid: [[f64; Species::COUNT]; PidDetector::COUNT],
}

/// A fully reconstructed event.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EsdEvent {
    pub run_number: u32,
    pub primary_vertex: Vertex,
    /// The vertex reconstructed from TPC-only tracks.
    pub tpc_vertex: Vertex,
    /// Fired trigger bits, already translated to [`Triggers`](crate::inspector::Triggers).
    pub trigger_mask: u32,
    /// Whether the event was read out with the fast (SPD-only) partition.
    pub fast_only: bool,
    pub centrality: Option<Centrality>,
    pub tracks: Vec<EsdTrack>,
}

/// A track of an analysis-object event.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AodTrack {
    pub momentum: Vec3,
    pub charge: i8,
    pub label: i32,
    pub chi2_per_ndf: f64,
    pub pid: [f64; Species::COUNT],
    pub detector_pid: [[f64; Species::COUNT]; PidDetector::COUNT],
}

/// An analysis-object event.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AodEvent {
    pub run_number: u32,
    pub primary_vertex: Vertex,
    pub tracks: Vec<AodTrack>,
}

/// Collision geometry reported by heavy-ion generators.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CollisionGeometry {
    /// Impact parameter in fm.
    pub impact_parameter: f64,
    /// Participating nucleons (projectile + target).
    pub n_participants: i32,
    /// Binary nucleon-nucleon collisions.
    pub n_binary: i32,
    /// Reaction-plane angle in radians.
    pub reaction_plane: f64,
}

/// Generator-level information for a simulated event.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct McHeader {
    /// Generator name as stored in the header (`"Pythia"`, `"Hijing"`, ...).
    pub generator: String,
    /// True interaction point in cm.
    pub primary_vertex: Vec3,
    /// Centre-of-mass energy in GeV.
    pub sqrt_s: f64,
    pub geometry: Option<CollisionGeometry>,
}

/// A particle on the simulation stack.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct McParticle {
    pub pdg: i32,
    /// Generator status code; `1` for final-state particles.
    pub status: i32,
    pub momentum: Vec4,
    pub production_vertex: Vec3,
    /// Stack index of the first mother, if any.
    pub first_mother: Option<usize>,
    /// Whether the particle is a physical primary.
    pub primary: bool,
}

impl McParticle {
    pub fn is_final_state(&self) -> bool {
        self.status == 1
    }
    /// Electric charge in units of $`e`$, truncated toward zero for fractionally charged partons.
    pub fn charge(&self) -> i8 {
        (pdg_three_charge(self.pdg) / 3) as i8
    }
}

// Quark charges in thirds of $`e`$, indexed by quark flavor code minus one.
const QUARK_THREE_CHARGE: [i32; 6] = [-1, 2, -1, 2, -1, 2];

/// Three times the electric charge of the particle with the given Monte Carlo numbering code.
///
/// Leptons and bosons are looked up directly, nuclei (`10LZZZAAAI`) carry `3 Z`, and hadrons
/// are built from the quark content digits. Unknown codes are neutral.
pub fn pdg_three_charge(pdg: i32) -> i32 {
    let code = pdg.unsigned_abs();
    let sign = pdg.signum();
    if code >= 1_000_000_000 {
        return sign * 3 * ((code / 10_000) % 1000) as i32;
    }
    let charge = match code {
        1..=6 => QUARK_THREE_CHARGE[code as usize - 1],
        11 | 13 | 15 | 17 => -3,
        24 | 37 => 3,
        0..=99 => 0,
        _ => {
            let quark = |digit: u32| match digit {
                1..=6 => Some(QUARK_THREE_CHARGE[digit as usize - 1]),
                _ => None,
            };
            let digits = code % 10_000;
            let (n1, n2, n3) = ((digits / 1000) % 10, (digits / 100) % 10, (digits / 10) % 10);
            match (n1, quark(n2), quark(n3)) {
                // Mesons with a leading s or b digit hold that quark as the antiquark.
                (0, Some(q2), Some(q3)) if n2 == 3 || n2 == 5 => q3 - q2,
                (0, Some(q2), Some(q3)) => q2 - q3,
                // Diquarks.
                (_, Some(q2), None) if n3 == 0 => quark(n1).map_or(0, |q1| q1 + q2),
                (_, Some(q2), Some(q3)) => quark(n1).map_or(0, |q1| q1 + q2 + q3),
                _ => 0,
            }
        }
    };
    sign * charge
}

/// A simulated event: the generator header and the particle stack.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct McEvent {
    pub header: McHeader,
    pub particles: Vec<McParticle>,
}

impl McEvent {
    pub fn particle(&self, index: usize) -> Option<&McParticle> {
        self.particles.get(index)
    }
    /// Iterate over the final-state physical primaries.
    pub fn final_state_primaries(&self) -> impl Iterator<Item = (usize, &McParticle)> {
        self.particles
            .iter()
            .enumerate()
            .filter(|(_, p)| p.primary && p.is_final_state())
    }
}

/// The event handed to a [`RsnReader`](crate::rsn::reader::RsnReader), one variant per source
/// representation.
#[derive(Copy, Clone, Debug)]
pub enum SourceEvent<'a> {
    Esd(&'a EsdEvent),
    Aod(&'a AodEvent),
    Mc(&'a McEvent),
}

impl SourceEvent<'_> {
    /// A short name of the variant, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            SourceEvent::Esd(_) => "ESD",
            SourceEvent::Aod(_) => "AOD",
            SourceEvent::Mc(_) => "MC",
        }
    }
}

/// PID weights peaked on a single species.
pub fn one_hot_pid(species: Species) -> [f64; Species::COUNT] {
    let mut pid = [0.0; Species::COUNT];
    pid[species.index()] = 1.0;
    pid
}

/// A small $`pp`$ MC event at $`\sqrt{s} = 7`$ TeV with a $`\phi \to K^+ K^-`$ decay, a pion and
/// two forward protons. Stack layout: `0` $`\phi`$, `1` $`K^+`$, `2` $`K^-`$, `3` $`\pi^+`$,
/// `4`/`5` protons.
pub fn test_mc_event() -> McEvent {
    let k_plus = Vec3::new(0.35, 0.12, 0.40).with_mass(Species::Kaon.mass());
    let k_minus = Vec3::new(-0.05, 0.31, 0.22).with_mass(Species::Kaon.mass());
    let phi = k_plus + k_minus;
    McEvent {
        header: McHeader {
            generator: "Pythia".to_string(),
            primary_vertex: Vec3::new(0.01, -0.02, 1.5),
            sqrt_s: 7000.0,
            geometry: None,
        },
        particles: vec![
            McParticle {
                pdg: 333,
                status: 2,
                momentum: phi,
                production_vertex: Vec3::new(0.01, -0.02, 1.5),
                first_mother: None,
                primary: false,
            },
            McParticle {
                pdg: 321,
                status: 1,
                momentum: k_plus,
                production_vertex: Vec3::new(0.01, -0.02, 1.5),
                first_mother: Some(0),
                primary: true,
            },
            McParticle {
                pdg: -321,
                status: 1,
                momentum: k_minus,
                production_vertex: Vec3::new(0.01, -0.02, 1.5),
                first_mother: Some(0),
                primary: true,
            },
            McParticle {
                pdg: 211,
                status: 1,
                momentum: Vec3::new(0.2, -0.4, -0.3).with_mass(Species::Pion.mass()),
                production_vertex: Vec3::new(0.01, -0.02, 1.5),
                first_mother: None,
                primary: true,
            },
            McParticle {
                pdg: 2212,
                status: 1,
                momentum: Vec3::new(0.1, 0.0, 3200.0).with_mass(Species::Proton.mass()),
                production_vertex: Vec3::new(0.01, -0.02, 1.5),
                first_mother: None,
                primary: true,
            },
            McParticle {
                pdg: 2212,
                status: 1,
                momentum: Vec3::new(-0.1, 0.0, -3100.0).with_mass(Species::Proton.mass()),
                production_vertex: Vec3::new(0.01, -0.02, 1.5),
                first_mother: None,
                primary: true,
            },
        ],
    }
}

/// A reconstructed version of [`test_mc_event`]: the two kaons, the pion, a split duplicate of
/// the pion (worse $`\chi^2`$) and one fake track.
pub fn test_esd_event() -> EsdEvent {
    let mc = test_mc_event();
    let mut pid_kaon = [[0.2; Species::COUNT]; PidDetector::COUNT];
    pid_kaon[PidDetector::Tpc.index()] = [0.05, 0.05, 0.2, 0.6, 0.1];
    pid_kaon[PidDetector::Tof.index()] = [0.0, 0.0, 0.1, 0.8, 0.1];
    let mut pid_pion = [[0.2; Species::COUNT]; PidDetector::COUNT];
    pid_pion[PidDetector::Tpc.index()] = [0.05, 0.05, 0.7, 0.1, 0.1];
    pid_pion[PidDetector::Tof.index()] = [0.0, 0.1, 0.8, 0.1, 0.0];
    let track = |label: i32, charge: i8, chi2: f64, pid, detector_pid| {
        let momentum = if label >= 0 {
            mc.particles[label as usize].momentum.vec3()
        } else {
            Vec3::new(0.6, 0.6, -0.1)
        };
        EsdTrack {
            momentum,
            tpc_inner_momentum: Some(momentum * 0.99),
            charge,
            label,
            constrained_chi2: chi2,
            status: STATUS_ITS_REFIT | STATUS_TPC_REFIT,
            pid,
            detector_pid,
        }
    };
    EsdEvent {
        run_number: 137161,
        primary_vertex: Vertex::new(Vec3::new(0.012, -0.018, 1.48), 24),
        tpc_vertex: Vertex::new(Vec3::new(0.02, -0.01, 1.55), 20),
        trigger_mask: 0x1 | 0x2 | 0x20,
        fast_only: false,
        centrality: Some(Centrality::new("V0M", 12.5, 0)),
        tracks: vec![
            track(1, 1, 1.2, [0.0, 0.0, 0.2, 0.7, 0.1], pid_kaon),
            track(2, -1, 0.9, [0.0, 0.0, 0.3, 0.6, 0.1], pid_kaon),
            track(3, 1, 1.1, [0.0, 0.1, 0.8, 0.1, 0.0], pid_pion),
            track(3, 1, 4.5, [0.0, 0.1, 0.7, 0.2, 0.0], pid_pion),
            track(-7, -1, 2.0, [0.2; Species::COUNT], pid_pion),
        ],
    }
}

/// The analysis-object version of [`test_esd_event`] (same tracks, same labels).
pub fn test_aod_event() -> AodEvent {
    let esd = test_esd_event();
    AodEvent {
        run_number: esd.run_number,
        primary_vertex: esd.primary_vertex,
        tracks: esd
            .tracks
            .iter()
            .map(|t| AodTrack {
                momentum: t.momentum,
                charge: t.charge,
                label: t.label,
                chi2_per_ndf: t.constrained_chi2,
                pid: t.pid,
                detector_pid: t.detector_pid,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mc_event_creation() {
        let mc = test_mc_event();
        assert_eq!(mc.particles.len(), 6);
        assert_eq!(mc.final_state_primaries().count(), 5);
        assert_relative_eq!(
            mc.particles[0].momentum.m(),
            (mc.particles[1].momentum + mc.particles[2].momentum).m()
        );
    }

    #[test]
    fn test_esd_event_creation() {
        let esd = test_esd_event();
        assert_eq!(esd.tracks.len(), 5);
        assert!(esd.primary_vertex.is_valid());
        assert_relative_eq!(esd.centrality.unwrap().percentile("V0M").unwrap(), 12.5);
    }

    #[test]
    fn test_particle_charge() {
        let mc = test_mc_event();
        let charges: Vec<i8> = mc.particles.iter().map(|p| p.charge()).collect();
        assert_eq!(charges, vec![0, 1, -1, 1, 1, 1]);
    }

    #[test]
    fn test_pdg_three_charge() {
        // Leptons, gauge bosons and quarks.
        assert_eq!(pdg_three_charge(11), -3);
        assert_eq!(pdg_three_charge(-13), 3);
        assert_eq!(pdg_three_charge(14), 0);
        assert_eq!(pdg_three_charge(22), 0);
        assert_eq!(pdg_three_charge(-24), -3);
        assert_eq!(pdg_three_charge(2), 2);
        // Mesons.
        assert_eq!(pdg_three_charge(-211), -3);
        assert_eq!(pdg_three_charge(111), 0);
        assert_eq!(pdg_three_charge(310), 0);
        assert_eq!(pdg_three_charge(130), 0);
        assert_eq!(pdg_three_charge(411), 3);
        assert_eq!(pdg_three_charge(431), 3);
        assert_eq!(pdg_three_charge(521), 3);
        assert_eq!(pdg_three_charge(-521), -3);
        assert_eq!(pdg_three_charge(9010221), 0);
        // Baryons.
        assert_eq!(pdg_three_charge(2112), 0);
        assert_eq!(pdg_three_charge(3222), 3);
        assert_eq!(pdg_three_charge(3112), -3);
        assert_eq!(pdg_three_charge(-3122), 0);
        assert_eq!(pdg_three_charge(3312), -3);
        assert_eq!(pdg_three_charge(-3334), 3);
        assert_eq!(pdg_three_charge(2224), 6);
        assert_eq!(pdg_three_charge(4122), 3);
        // Nuclei.
        assert_eq!(pdg_three_charge(1000010020), 3);
        assert_eq!(pdg_three_charge(-1000020030), -6);
        assert_eq!(pdg_three_charge(1000822080), 246);
        // Generator-internal codes.
        assert_eq!(pdg_three_charge(0), 0);
        assert_eq!(pdg_three_charge(990), 0);
    }

    #[test]
    fn test_hyperon_and_nucleus_charge() {
        let particle = |pdg| McParticle {
            pdg,
            status: 1,
            primary: true,
            ..Default::default()
        };
        assert_eq!(particle(3222).charge(), 1);
        assert_eq!(particle(3334).charge(), -1);
        assert_eq!(particle(-3312).charge(), 1);
        assert_eq!(particle(1000010020).charge(), 1);
        assert_eq!(particle(2224).charge(), 2);
        assert_eq!(particle(3122).charge(), 0);
    }

    #[test]
    fn test_source_event_names() {
        let esd = test_esd_event();
        let aod = test_aod_event();
        let mc = test_mc_event();
        assert_eq!(SourceEvent::Esd(&esd).kind_name(), "ESD");
        assert_eq!(SourceEvent::Aod(&aod).kind_name(), "AOD");
        assert_eq!(SourceEvent::Mc(&mc).kind_name(), "MC");
    }
}
