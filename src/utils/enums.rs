use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::EvTaskError;

/// The kind of source event a [`RsnReader`](crate::rsn::reader::RsnReader) is configured to read.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    /// Reconstructed events read with the global (ITS + TPC) track parameters.
    #[default]
    Esd,
    /// Reconstructed events read with the TPC-only track parameters and TPC vertex.
    EsdTpc,
    /// Analysis-object events.
    Aod,
    /// Simulated (MC truth) events.
    Mc,
}
impl Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Esd => write!(f, "ESD"),
            SourceKind::EsdTpc => write!(f, "ESD (TPC-only)"),
            SourceKind::Aod => write!(f, "AOD"),
            SourceKind::Mc => write!(f, "MC"),
        }
    }
}
impl FromStr for SourceKind {
    type Err = EvTaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "esd" => Ok(Self::Esd),
            "esdtpc" | "esd-tpc" | "esd tpc" | "tpc" => Ok(Self::EsdTpc),
            "aod" => Ok(Self::Aod),
            "mc" | "truth" | "sim" => Ok(Self::Mc),
            _ => Err(EvTaskError::ParseError {
                name: s.to_string(),
                object: "SourceKind".to_string(),
            }),
        }
    }
}

/// Charged particle species considered for identification, in the conventional ordering of the
/// PID weight arrays.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Species {
    /// $`e^\pm`$
    Electron,
    /// $`\mu^\pm`$
    Muon,
    /// $`\pi^\pm`$
    Pion,
    /// $`K^\pm`$
    Kaon,
    /// $`p`$, $`\bar{p}`$
    Proton,
}

impl Species {
    /// Number of species.
    pub const COUNT: usize = 5;
    /// All species, in array order.
    pub const ALL: [Species; Species::COUNT] = [
        Species::Electron,
        Species::Muon,
        Species::Pion,
        Species::Kaon,
        Species::Proton,
    ];

    /// Position of this species in a PID weight array.
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// The (positive) PDG code of this species.
    pub fn pdg(&self) -> i32 {
        match self {
            Species::Electron => 11,
            Species::Muon => 13,
            Species::Pion => 211,
            Species::Kaon => 321,
            Species::Proton => 2212,
        }
    }

    /// The mass of this species in GeV.
    pub fn mass(&self) -> f64 {
        match self {
            Species::Electron => 0.000510999,
            Species::Muon => 0.105658,
            Species::Pion => 0.13957,
            Species::Kaon => 0.493677,
            Species::Proton => 0.938272,
        }
    }

    /// Look up a species from a PDG code, ignoring its sign.
    pub fn from_pdg(pdg: i32) -> Option<Self> {
        Species::ALL.into_iter().find(|s| s.pdg() == pdg.abs())
    }
}
impl Display for Species {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Species::Electron => write!(f, "electron"),
            Species::Muon => write!(f, "muon"),
            Species::Pion => write!(f, "pion"),
            Species::Kaon => write!(f, "kaon"),
            Species::Proton => write!(f, "proton"),
        }
    }
}
impl FromStr for Species {
    type Err = EvTaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "e" | "electron" => Ok(Self::Electron),
            "mu" | "muon" => Ok(Self::Muon),
            "pi" | "pion" => Ok(Self::Pion),
            "k" | "kaon" => Ok(Self::Kaon),
            "p" | "proton" => Ok(Self::Proton),
            _ => Err(EvTaskError::ParseError {
                name: s.to_string(),
                object: "Species".to_string(),
            }),
        }
    }
}

/// Detectors which contribute particle-identification weights.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PidDetector {
    /// Inner Tracking System
    Its,
    /// Time Projection Chamber
    Tpc,
    /// Transition Radiation Detector
    Trd,
    /// Time Of Flight
    Tof,
    /// High Momentum Particle IDentification
    Hmpid,
}

impl PidDetector {
    /// Number of detectors.
    pub const COUNT: usize = 5;
    /// All detectors, in array order.
    pub const ALL: [PidDetector; PidDetector::COUNT] = [
        PidDetector::Its,
        PidDetector::Tpc,
        PidDetector::Trd,
        PidDetector::Tof,
        PidDetector::Hmpid,
    ];

    /// Position of this detector in per-detector arrays.
    pub fn index(&self) -> usize {
        *self as usize
    }
}
impl Display for PidDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PidDetector::Its => write!(f, "ITS"),
            PidDetector::Tpc => write!(f, "TPC"),
            PidDetector::Trd => write!(f, "TRD"),
            PidDetector::Tof => write!(f, "TOF"),
            PidDetector::Hmpid => write!(f, "HMPID"),
        }
    }
}
impl FromStr for PidDetector {
    type Err = EvTaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "its" => Ok(Self::Its),
            "tpc" => Ok(Self::Tpc),
            "trd" => Ok(Self::Trd),
            "tof" => Ok(Self::Tof),
            "hmpid" => Ok(Self::Hmpid),
            _ => Err(EvTaskError::ParseError {
                name: s.to_string(),
                object: "PidDetector".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_displays() {
        assert_eq!(format!("{}", SourceKind::Esd), "ESD");
        assert_eq!(format!("{}", SourceKind::EsdTpc), "ESD (TPC-only)");
        assert_eq!(format!("{}", Species::Kaon), "kaon");
        assert_eq!(format!("{}", PidDetector::Hmpid), "HMPID");
    }

    #[test]
    fn enum_from_str() {
        assert_eq!("aod".parse::<SourceKind>().unwrap(), SourceKind::Aod);
        assert_eq!("TPC".parse::<SourceKind>().unwrap(), SourceKind::EsdTpc);
        assert_eq!("pi".parse::<Species>().unwrap(), Species::Pion);
        assert_eq!("tof".parse::<PidDetector>().unwrap(), PidDetector::Tof);
        assert!("phos".parse::<PidDetector>().is_err());
    }

    #[test]
    fn species_from_pdg() {
        assert_eq!(Species::from_pdg(-321), Some(Species::Kaon));
        assert_eq!(Species::from_pdg(2212), Some(Species::Proton));
        assert_eq!(Species::from_pdg(22), None);
        for (i, species) in Species::ALL.iter().enumerate() {
            assert_eq!(species.index(), i);
        }
    }
}
