use std::{
    fmt::Display,
    ops::{Index, IndexMut},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::{
    reduced::data::{ReducedEvent, ReducedPair, ReducedTrack},
    EvTaskError,
};

/// The physics quantities a task can store in its [`VarArray`].
///
/// Event-level variables come first, then track-level, then pair-level ones. The discriminant of
/// each variant is its slot in the array.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variable {
    RunNo,
    VtxX,
    VtxY,
    VtxZ,
    VtxContributors,
    CentVZERO,
    CentSPD,
    NTracksTotal,
    NTracksSelected,
    Pt,
    Eta,
    Phi,
    P,
    Charge,
    TPCncls,
    DcaXY,
    DcaZ,
    PairType,
    Mass,
    PairPt,
    PairRapidity,
    PairEta,
    PairPhi,
    OpeningAngle,
}

impl Variable {
    /// Number of variables, and so the number of slots in a [`VarArray`].
    pub const COUNT: usize = 24;
    /// Every variable, in slot order.
    pub const ALL: [Variable; Variable::COUNT] = [
        Variable::RunNo,
        Variable::VtxX,
        Variable::VtxY,
        Variable::VtxZ,
        Variable::VtxContributors,
        Variable::CentVZERO,
        Variable::CentSPD,
        Variable::NTracksTotal,
        Variable::NTracksSelected,
        Variable::Pt,
        Variable::Eta,
        Variable::Phi,
        Variable::P,
        Variable::Charge,
        Variable::TPCncls,
        Variable::DcaXY,
        Variable::DcaZ,
        Variable::PairType,
        Variable::Mass,
        Variable::PairPt,
        Variable::PairRapidity,
        Variable::PairEta,
        Variable::PairPhi,
        Variable::OpeningAngle,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    /// The name used in histogram titles and when parsing.
    pub fn name(&self) -> &'static str {
        match self {
            Variable::RunNo => "RunNo",
            Variable::VtxX => "VtxX",
            Variable::VtxY => "VtxY",
            Variable::VtxZ => "VtxZ",
            Variable::VtxContributors => "VtxContributors",
            Variable::CentVZERO => "CentVZERO",
            Variable::CentSPD => "CentSPD",
            Variable::NTracksTotal => "NTracksTotal",
            Variable::NTracksSelected => "NTracksSelected",
            Variable::Pt => "Pt",
            Variable::Eta => "Eta",
            Variable::Phi => "Phi",
            Variable::P => "P",
            Variable::Charge => "Charge",
            Variable::TPCncls => "TPCncls",
            Variable::DcaXY => "DcaXY",
            Variable::DcaZ => "DcaZ",
            Variable::PairType => "PairType",
            Variable::Mass => "Mass",
            Variable::PairPt => "PairPt",
            Variable::PairRapidity => "PairRapidity",
            Variable::PairEta => "PairEta",
            Variable::PairPhi => "PairPhi",
            Variable::OpeningAngle => "OpeningAngle",
        }
    }

    /// Unit of the quantity, empty for dimensionless ones.
    pub fn unit(&self) -> &'static str {
        match self {
            Variable::VtxX | Variable::VtxY | Variable::VtxZ | Variable::DcaXY | Variable::DcaZ => {
                "cm"
            }
            Variable::CentVZERO | Variable::CentSPD => "%",
            Variable::Pt | Variable::P | Variable::PairPt => "GeV/c",
            Variable::Mass => "GeV/c^2",
            Variable::Phi | Variable::PairPhi | Variable::OpeningAngle => "rad",
            _ => "",
        }
    }
}
impl Display for Variable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
impl FromStr for Variable {
    type Err = EvTaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variable::ALL
            .into_iter()
            .find(|v| v.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| EvTaskError::ParseError {
                name: s.to_string(),
                object: "Variable".to_string(),
            })
    }
}

/// The per-task scratch array: one `f64` slot per [`Variable`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VarArray([f64; Variable::COUNT]);

impl Default for VarArray {
    fn default() -> Self {
        Self([0.0; Variable::COUNT])
    }
}

impl VarArray {
    /// A zeroed array.
    pub fn new() -> Self {
        Self::default()
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    /// Zero every slot.
    pub fn reset(&mut self) {
        self.0 = [0.0; Variable::COUNT];
    }
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

impl Index<Variable> for VarArray {
    type Output = f64;

    fn index(&self, index: Variable) -> &Self::Output {
        &self.0[index.index()]
    }
}

impl IndexMut<Variable> for VarArray {
    fn index_mut(&mut self, index: Variable) -> &mut Self::Output {
        &mut self.0[index.index()]
    }
}

/// Store the event-level variables of `event`.
pub fn fill_event_info(event: &ReducedEvent, values: &mut VarArray) {
    values[Variable::RunNo] = event.run_number as f64;
    values[Variable::VtxX] = event.vertex.x;
    values[Variable::VtxY] = event.vertex.y;
    values[Variable::VtxZ] = event.vertex.z;
    values[Variable::VtxContributors] = event.vertex_contributors as f64;
    values[Variable::CentVZERO] = event.cent_vzero;
    values[Variable::CentSPD] = event.cent_spd;
    values[Variable::NTracksTotal] = event.tracks.len() as f64;
}

/// Store the track-level variables of `track`.
pub fn fill_track_info(track: &ReducedTrack, values: &mut VarArray) {
    values[Variable::Pt] = track.momentum.perp();
    values[Variable::Eta] = track.momentum.eta();
    values[Variable::Phi] = track.momentum.phi();
    values[Variable::P] = track.momentum.mag();
    values[Variable::Charge] = track.charge as f64;
    values[Variable::TPCncls] = track.tpc_clusters as f64;
    values[Variable::DcaXY] = track.dca_xy;
    values[Variable::DcaZ] = track.dca_z;
}

/// Store the pair-level variables of `pair`.
pub fn fill_pair_info(pair: &ReducedPair, values: &mut VarArray) {
    values[Variable::PairType] = pair.candidate.code();
    values[Variable::Mass] = pair.mass();
    values[Variable::PairPt] = pair.p4.pt();
    values[Variable::PairRapidity] = pair.p4.rapidity();
    values[Variable::PairEta] = pair.p4.eta();
    values[Variable::PairPhi] = pair.p4.phi();
    values[Variable::OpeningAngle] = pair.opening_angle;
}
