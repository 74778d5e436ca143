use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    utils::{
        enums::Species,
        vectors::{Vec3, Vec4},
    },
    EvTaskError,
};

/// Quality bit: the track passed the ITS refit.
pub const QUALITY_ITS_REFIT: u64 = 1 << 0;
/// Quality bit: the track passed the TPC refit.
pub const QUALITY_TPC_REFIT: u64 = 1 << 1;
/// Quality bit: the track has a hit in the first SPD layer.
pub const QUALITY_SPD_FIRST: u64 = 1 << 2;
/// Quality bit: the track has a matched TOF signal.
pub const QUALITY_TOF_MATCHED: u64 = 1 << 3;
/// Quality bit: the track is flagged as coming from a photon conversion.
pub const QUALITY_CONVERSION: u64 = 1 << 4;

/// A track of a reduced event.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReducedTrack {
    pub momentum: Vec3,
    pub charge: i8,
    /// Bit field of `QUALITY_*` flags.
    pub quality_flags: u64,
    pub tpc_clusters: u16,
    pub dca_xy: f64,
    pub dca_z: f64,
}

impl ReducedTrack {
    pub fn has_flags(&self, flags: u64) -> bool {
        self.quality_flags & flags == flags
    }
}

/// The decay hypothesis of a [`ReducedPair`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PairCandidate {
    /// $`J/\psi \to e^+ e^-`$
    JpsiToEE,
    /// $`\phi \to K^+ K^-`$
    #[default]
    PhiToKK,
    /// $`K_S^0 \to \pi^+ \pi^-`$
    K0sToPiPi,
    /// $`\Lambda \to p \pi^-`$
    LambdaToPPi,
}

impl PairCandidate {
    /// Mass hypotheses of the positive and negative legs.
    pub fn leg_species(&self) -> (Species, Species) {
        match self {
            PairCandidate::JpsiToEE => (Species::Electron, Species::Electron),
            PairCandidate::PhiToKK => (Species::Kaon, Species::Kaon),
            PairCandidate::K0sToPiPi => (Species::Pion, Species::Pion),
            PairCandidate::LambdaToPPi => (Species::Proton, Species::Pion),
        }
    }
    /// A numeric code stored in the pair-type variable.
    pub fn code(&self) -> f64 {
        *self as u8 as f64
    }
}
impl Display for PairCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PairCandidate::JpsiToEE => write!(f, "Jpsi->ee"),
            PairCandidate::PhiToKK => write!(f, "phi->KK"),
            PairCandidate::K0sToPiPi => write!(f, "K0s->pipi"),
            PairCandidate::LambdaToPPi => write!(f, "Lambda->ppi"),
        }
    }
}
impl FromStr for PairCandidate {
    type Err = EvTaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jpsi" | "jpsi->ee" => Ok(Self::JpsiToEE),
            "phi" | "phi->kk" => Ok(Self::PhiToKK),
            "k0s" | "k0s->pipi" => Ok(Self::K0sToPiPi),
            "lambda" | "lambda->ppi" => Ok(Self::LambdaToPPi),
            _ => Err(EvTaskError::ParseError {
                name: s.to_string(),
                object: "PairCandidate".to_string(),
            }),
        }
    }
}

/// A two-track candidate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReducedPair {
    pub candidate: PairCandidate,
    /// Positions of the (positive, negative) legs in the event's track list.
    pub legs: (usize, usize),
    pub p4: Vec4,
    /// Opening angle between the legs in radians.
    pub opening_angle: f64,
}

impl ReducedPair {
    /// Build a candidate from its positive and negative legs.
    pub fn from_legs(
        candidate: PairCandidate,
        legs: (usize, usize),
        positive: &ReducedTrack,
        negative: &ReducedTrack,
    ) -> Self {
        let (species_pos, species_neg) = candidate.leg_species();
        let p4 = positive.momentum.with_mass(species_pos.mass())
            + negative.momentum.with_mass(species_neg.mass());
        let cos = positive.momentum.unit().dot(&negative.momentum.unit());
        Self {
            candidate,
            legs,
            p4,
            opening_angle: cos.clamp(-1.0, 1.0).acos(),
        }
    }
    pub fn mass(&self) -> f64 {
        self.p4.m()
    }
}

/// A reduced event: the event-level quantities and the tracks that survived the reduction.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReducedEvent {
    pub run_number: u32,
    pub vertex: Vec3,
    /// Number of contributors to the vertex fit.
    pub vertex_contributors: u32,
    /// Centrality percentile from the forward scintillators, negative if unavailable.
    pub cent_vzero: f64,
    /// Centrality percentile from the SPD clusters, negative if unavailable.
    pub cent_spd: f64,
    pub tracks: Vec<ReducedTrack>,
    /// Candidates already built when the event was reduced.
    pub pairs: Vec<ReducedPair>,
}

/// A reduced event holding a $`\phi \to K^+ K^-`$ pair, a pion, a conversion electron and a
/// low-quality track.
pub fn test_reduced_event() -> ReducedEvent {
    let good = QUALITY_ITS_REFIT | QUALITY_TPC_REFIT | QUALITY_SPD_FIRST;
    let tracks = vec![
        ReducedTrack {
            momentum: Vec3::new(0.35, 0.12, 0.40),
            charge: 1,
            quality_flags: good | QUALITY_TOF_MATCHED,
            tpc_clusters: 140,
            dca_xy: 0.01,
            dca_z: 0.02,
        },
        ReducedTrack {
            momentum: Vec3::new(-0.05, 0.31, 0.22),
            charge: -1,
            quality_flags: good,
            tpc_clusters: 120,
            dca_xy: -0.02,
            dca_z: 0.01,
        },
        ReducedTrack {
            momentum: Vec3::new(0.9, -1.1, 0.3),
            charge: 1,
            quality_flags: good,
            tpc_clusters: 95,
            dca_xy: 0.05,
            dca_z: -0.03,
        },
        ReducedTrack {
            momentum: Vec3::new(0.2, 0.2, -0.6),
            charge: -1,
            quality_flags: good | QUALITY_CONVERSION,
            tpc_clusters: 110,
            dca_xy: 0.4,
            dca_z: 0.3,
        },
        ReducedTrack {
            momentum: Vec3::new(1.5, 0.1, 0.1),
            charge: -1,
            quality_flags: QUALITY_TPC_REFIT,
            tpc_clusters: 50,
            dca_xy: 1.2,
            dca_z: 2.0,
        },
    ];
    let pairs = vec![ReducedPair::from_legs(
        PairCandidate::PhiToKK,
        (0, 1),
        &tracks[0],
        &tracks[1],
    )];
    ReducedEvent {
        run_number: 244918,
        vertex: Vec3::new(0.07, 0.33, -2.4),
        vertex_contributors: 18,
        cent_vzero: 35.2,
        cent_spd: 36.0,
        tracks,
        pairs,
    }
}
