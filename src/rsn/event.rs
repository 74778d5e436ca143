use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::utils::{
    enums::Species,
    vectors::{Vec3, Vec4},
};

/// Truth information attached to a reconstructed daughter.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct McInfo {
    pub pdg: i32,
    /// PDG code of the first mother, `0` when the particle has none.
    pub mother_pdg: i32,
    pub momentum: Vec4,
}

/// One track of a [`RsnEvent`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RsnDaughter {
    /// Position of the track in the source event.
    pub index: usize,
    /// MC label of the track (negative for fakes).
    pub label: i32,
    pub charge: i8,
    /// Three-momentum; the energy depends on the mass hypothesis (see [`RsnDaughter::p4`]).
    pub momentum: Vec3,
    /// PID weights per [`Species`].
    pub pid_weights: [f64; Species::COUNT],
    pub mc: Option<McInfo>,
}

impl RsnDaughter {
    /// The four-momentum under the mass hypothesis of `species`.
    pub fn p4(&self, species: Species) -> Vec4 {
        self.momentum.with_mass(species.mass())
    }
    /// The species with the largest PID weight, or `None` if all weights vanish.
    pub fn most_probable(&self) -> Option<Species> {
        let (index, weight) = self
            .pid_weights
            .iter()
            .copied()
            .enumerate()
            .fold((0, 0.0), |best, (i, w)| if w > best.1 { (i, w) } else { best });
        (weight > 0.0).then(|| Species::ALL[index])
    }
    /// PID weights normalized to unit sum (all zero if the weights vanish).
    pub fn pid_probabilities(&self) -> [f64; Species::COUNT] {
        let total: f64 = self.pid_weights.iter().sum();
        if total <= 0.0 {
            return [0.0; Species::COUNT];
        }
        self.pid_weights.map(|w| w / total)
    }
}

/// The normalized event record used by resonance analyses.
///
/// A [`RsnEvent`] is created once by the host and refilled in place for every event. After
/// filling, [`RsnEvent::make_computations`] derives the multiplicity and the charge-sorted
/// index lists.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RsnEvent {
    primary_vertex: Vec3,
    tracks: Vec<RsnDaughter>,
    positive: Vec<usize>,
    negative: Vec<usize>,
    multiplicity: usize,
}

impl RsnEvent {
    /// Remove every track and reset derived quantities, keeping allocations.
    pub fn clear(&mut self) {
        self.primary_vertex = Vec3::default();
        self.tracks.clear();
        self.positive.clear();
        self.negative.clear();
        self.multiplicity = 0;
    }
    pub fn set_primary_vertex(&mut self, vertex: Vec3) {
        self.primary_vertex = vertex;
    }
    pub fn primary_vertex(&self) -> Vec3 {
        self.primary_vertex
    }
    pub fn add_track(&mut self, track: RsnDaughter) {
        self.tracks.push(track);
    }
    pub fn tracks(&self) -> &[RsnDaughter] {
        &self.tracks
    }
    pub fn track(&self, index: usize) -> Option<&RsnDaughter> {
        self.tracks.get(index)
    }
    /// Number of tracks counted by the last [`RsnEvent::make_computations`].
    pub fn multiplicity(&self) -> usize {
        self.multiplicity
    }
    /// Positions (in [`RsnEvent::tracks`]) of the positive tracks.
    pub fn positive(&self) -> &[usize] {
        &self.positive
    }
    /// Positions (in [`RsnEvent::tracks`]) of the negative tracks.
    pub fn negative(&self) -> &[usize] {
        &self.negative
    }
    /// Recompute multiplicity and the charge-sorted index lists.
    pub fn make_computations(&mut self) {
        self.multiplicity = self.tracks.len();
        self.positive.clear();
        self.negative.clear();
        for (i, track) in self.tracks.iter().enumerate() {
            match track.charge {
                c if c > 0 => self.positive.push(i),
                c if c < 0 => self.negative.push(i),
                _ => {}
            }
        }
    }
}

impl Display for RsnEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "RsnEvent:")?;
        writeln!(f, "  vertex: {}", self.primary_vertex)?;
        writeln!(
            f,
            "  tracks: {} ({} +, {} -)",
            self.multiplicity,
            self.positive.len(),
            self.negative.len()
        )?;
        for track in &self.tracks {
            writeln!(
                f,
                "    #{} label {} q {:+} p {}",
                track.index, track.label, track.charge, track.momentum
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn daughter(charge: i8) -> RsnDaughter {
        RsnDaughter {
            charge,
            momentum: Vec3::new(0.3, 0.4, 0.0),
            pid_weights: [0.0, 0.0, 1.0, 3.0, 0.0],
            ..Default::default()
        }
    }

    #[test]
    fn test_make_computations() {
        let mut event = RsnEvent::default();
        event.add_track(daughter(1));
        event.add_track(daughter(-1));
        event.add_track(daughter(1));
        event.add_track(daughter(0));
        event.make_computations();
        assert_eq!(event.multiplicity(), 4);
        assert_eq!(event.positive(), &[0, 2]);
        assert_eq!(event.negative(), &[1]);
        event.clear();
        assert_eq!(event.multiplicity(), 0);
        assert!(event.tracks().is_empty());
        assert!(event.positive().is_empty());
    }

    #[test]
    fn test_daughter_pid() {
        let d = daughter(1);
        assert_eq!(d.most_probable(), Some(Species::Kaon));
        let probs = d.pid_probabilities();
        assert_relative_eq!(probs[Species::Kaon.index()], 0.75);
        assert_relative_eq!(d.p4(Species::Kaon).m(), Species::Kaon.mass(), epsilon = 1e-9);
        let empty = RsnDaughter::default();
        assert_eq!(empty.most_probable(), None);
        assert_eq!(empty.pid_probabilities(), [0.0; Species::COUNT]);
    }
}
