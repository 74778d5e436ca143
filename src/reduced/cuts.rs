use std::fmt::Debug;

use dyn_clone::DynClone;
use serde::{Deserialize, Serialize};

use crate::reduced::{
    data::{PairCandidate, ReducedEvent, ReducedPair, ReducedTrack},
    vars::{VarArray, Variable},
};

/// A selection over whole events.
///
/// Every cut receives both the entity and the [`VarArray`] the task filled for it, so simple
/// range cuts can work on the array alone. Implementors must be [`Clone`] and registered with
/// `#[typetag::serde]` so cut collections can be cloned and serialized.
#[typetag::serde(tag = "type")]
pub trait EventCut: DynClone + Debug + Send + Sync {
    fn is_selected(&self, event: &ReducedEvent, values: &VarArray) -> bool;
}
dyn_clone::clone_trait_object!(EventCut);

/// A selection over single tracks. See [`EventCut`].
#[typetag::serde(tag = "type")]
pub trait TrackCut: DynClone + Debug + Send + Sync {
    fn is_selected(&self, track: &ReducedTrack, values: &VarArray) -> bool;
}
dyn_clone::clone_trait_object!(TrackCut);

/// A selection over track pairs. See [`EventCut`].
#[typetag::serde(tag = "type")]
pub trait PairCut: DynClone + Debug + Send + Sync {
    fn is_selected(&self, pair: &ReducedPair, values: &VarArray) -> bool;
}
dyn_clone::clone_trait_object!(PairCut);

/// An ordered collection which owns its cuts.
///
/// Each cut is boxed and owned by exactly one list; [`CutList::clear`] and dropping the list
/// release every cut once.
#[derive(Debug, Serialize, Deserialize)]
#[serde(bound(
    serialize = "Box<C>: Serialize",
    deserialize = "Box<C>: Deserialize<'de>"
))]
pub struct CutList<C: ?Sized> {
    cuts: Vec<Box<C>>,
}

impl<C: ?Sized> Default for CutList<C> {
    fn default() -> Self {
        Self { cuts: Vec::new() }
    }
}

impl<C: ?Sized> Clone for CutList<C>
where
    Box<C>: Clone,
{
    fn clone(&self) -> Self {
        Self {
            cuts: self.cuts.clone(),
        }
    }
}

impl<C: ?Sized> CutList<C> {
    pub fn new() -> Self {
        Self::default()
    }
    /// Append a cut, taking ownership of it.
    pub fn add(&mut self, cut: Box<C>) {
        self.cuts.push(cut);
    }
    pub fn len(&self) -> usize {
        self.cuts.len()
    }
    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = &C> {
        self.cuts.iter().map(|cut| cut.as_ref())
    }
    /// Drop every cut in the list.
    pub fn clear(&mut self) {
        self.cuts.clear();
    }
}

impl CutList<dyn EventCut> {
    /// Whether `event` passes every cut (an empty list accepts everything).
    pub fn passes(&self, event: &ReducedEvent, values: &VarArray) -> bool {
        self.iter().all(|cut| cut.is_selected(event, values))
    }
}

impl CutList<dyn TrackCut> {
    /// Whether `track` passes every cut (an empty list accepts everything).
    pub fn passes(&self, track: &ReducedTrack, values: &VarArray) -> bool {
        self.iter().all(|cut| cut.is_selected(track, values))
    }
}

impl CutList<dyn PairCut> {
    /// Whether `pair` passes every cut (an empty list accepts everything).
    pub fn passes(&self, pair: &ReducedPair, values: &VarArray) -> bool {
        self.iter().all(|cut| cut.is_selected(pair, values))
    }
}

/// One interval condition of a [`VarCut`].
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VarRange {
    pub variable: Variable,
    pub low: f64,
    pub high: f64,
    /// Reject values inside `[low, high]` instead of outside.
    pub exclude: bool,
}

impl VarRange {
    pub fn accepts(&self, value: f64) -> bool {
        let inside = value >= self.low && value <= self.high;
        inside != self.exclude
    }
}

/// A cut made of closed intervals on scratch variables, all of which must hold.
///
/// The same cut can serve as an event, track or pair cut since it only reads the [`VarArray`].
///
/// # Examples
///
/// ```
/// use evtask::reduced::cuts::VarCut;
/// use evtask::{VarArray, Variable};
///
/// let cut = VarCut::new("vertex").add_range(Variable::VtxZ, -10.0, 10.0, false);
/// let mut values = VarArray::new();
/// values[Variable::VtxZ] = 12.0;
/// assert!(!cut.passes(&values));
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VarCut {
    name: String,
    ranges: Vec<VarRange>,
}

impl VarCut {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            ranges: Vec::new(),
        }
    }
    /// Require `variable` to lie inside (or, with `exclude`, outside) `[low, high]`.
    pub fn add_range(mut self, variable: Variable, low: f64, high: f64, exclude: bool) -> Self {
        self.ranges.push(VarRange {
            variable,
            low,
            high,
            exclude,
        });
        self
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn ranges(&self) -> &[VarRange] {
        &self.ranges
    }
    pub fn passes(&self, values: &VarArray) -> bool {
        self.ranges
            .iter()
            .all(|range| range.accepts(values[range.variable]))
    }
}

#[typetag::serde]
impl EventCut for VarCut {
    fn is_selected(&self, _event: &ReducedEvent, values: &VarArray) -> bool {
        self.passes(values)
    }
}

#[typetag::serde]
impl TrackCut for VarCut {
    fn is_selected(&self, _track: &ReducedTrack, values: &VarArray) -> bool {
        self.passes(values)
    }
}

#[typetag::serde]
impl PairCut for VarCut {
    fn is_selected(&self, _pair: &ReducedPair, values: &VarArray) -> bool {
        self.passes(values)
    }
}

/// Track cut on quality bits and TPC cluster count.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TrackQualityCut {
    /// Bits which must all be set.
    pub required_flags: u64,
    /// Bits of which none may be set.
    pub forbidden_flags: u64,
    pub min_tpc_clusters: u16,
}

#[typetag::serde]
impl TrackCut for TrackQualityCut {
    fn is_selected(&self, track: &ReducedTrack, _values: &VarArray) -> bool {
        track.has_flags(self.required_flags)
            && track.quality_flags & self.forbidden_flags == 0
            && track.tpc_clusters >= self.min_tpc_clusters
    }
}

/// Pair cut accepting only the listed candidate types.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PairTypeCut {
    pub accepted: Vec<PairCandidate>,
}

#[typetag::serde]
impl PairCut for PairTypeCut {
    fn is_selected(&self, pair: &ReducedPair, _values: &VarArray) -> bool {
        self.accepted.contains(&pair.candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reduced::{
        data::{test_reduced_event, QUALITY_CONVERSION, QUALITY_ITS_REFIT, QUALITY_TPC_REFIT},
        vars::{fill_event_info, fill_track_info},
    };
    use std::sync::Arc;

    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    struct CountedCut {
        #[serde(skip)]
        token: Arc<()>,
    }

    #[typetag::serde]
    impl EventCut for CountedCut {
        fn is_selected(&self, _event: &ReducedEvent, _values: &VarArray) -> bool {
            true
        }
    }

    #[test]
    fn test_var_range() {
        let inside = VarRange {
            variable: Variable::Pt,
            low: 0.15,
            high: 10.0,
            exclude: false,
        };
        assert!(inside.accepts(0.15));
        assert!(inside.accepts(10.0));
        assert!(!inside.accepts(0.1));
        let outside = VarRange {
            exclude: true,
            ..inside
        };
        assert!(!outside.accepts(1.0));
        assert!(outside.accepts(11.0));
    }

    #[test]
    fn test_event_var_cut() {
        let event = test_reduced_event();
        let mut values = VarArray::new();
        fill_event_info(&event, &mut values);
        let mut cuts: CutList<dyn EventCut> = CutList::new();
        assert!(cuts.passes(&event, &values));
        cuts.add(Box::new(
            VarCut::new("vertex").add_range(Variable::VtxZ, -10.0, 10.0, false),
        ));
        assert!(cuts.passes(&event, &values));
        cuts.add(Box::new(
            VarCut::new("central").add_range(Variable::CentVZERO, 0.0, 10.0, false),
        ));
        assert!(!cuts.passes(&event, &values));
        assert_eq!(cuts.len(), 2);
    }

    #[test]
    fn test_track_quality_cut() {
        let event = test_reduced_event();
        let cut = TrackQualityCut {
            required_flags: QUALITY_ITS_REFIT | QUALITY_TPC_REFIT,
            forbidden_flags: QUALITY_CONVERSION,
            min_tpc_clusters: 70,
        };
        let values = VarArray::new();
        let selected: Vec<bool> = event
            .tracks
            .iter()
            .map(|t| cut.is_selected(t, &values))
            .collect();
        assert_eq!(selected, vec![true, true, true, false, false]);
    }

    #[test]
    fn test_track_cut_list_combines_cuts() {
        let event = test_reduced_event();
        let mut cuts: CutList<dyn TrackCut> = CutList::new();
        cuts.add(Box::new(TrackQualityCut {
            required_flags: QUALITY_TPC_REFIT,
            ..Default::default()
        }));
        cuts.add(Box::new(
            VarCut::new("pt").add_range(Variable::Pt, 0.5, 100.0, false),
        ));
        let mut values = VarArray::new();
        let passing: Vec<usize> = event
            .tracks
            .iter()
            .enumerate()
            .filter(|(_, track)| {
                fill_track_info(track, &mut values);
                cuts.passes(track, &values)
            })
            .map(|(i, _)| i)
            .collect();
        assert_eq!(passing, vec![2, 4]);
    }

    #[test]
    fn test_pair_type_cut() {
        let event = test_reduced_event();
        let cut = PairTypeCut {
            accepted: vec![PairCandidate::K0sToPiPi],
        };
        assert!(!cut.is_selected(&event.pairs[0], &VarArray::new()));
        let cut = PairTypeCut {
            accepted: vec![PairCandidate::PhiToKK],
        };
        assert!(cut.is_selected(&event.pairs[0], &VarArray::new()));
    }

    #[test]
    fn test_cut_list_releases_cuts_once() {
        let cut = CountedCut::default();
        let token = cut.token.clone();
        let mut cuts: CutList<dyn EventCut> = CutList::new();
        cuts.add(Box::new(cut.clone()));
        cuts.add(Box::new(cut));
        assert_eq!(Arc::strong_count(&token), 3);
        cuts.clear();
        assert_eq!(Arc::strong_count(&token), 1);
        cuts.add(Box::new(CountedCut {
            token: token.clone(),
        }));
        let copy = cuts.clone();
        assert_eq!(Arc::strong_count(&token), 3);
        drop(cuts);
        drop(copy);
        assert_eq!(Arc::strong_count(&token), 1);
    }

    #[test]
    fn test_cut_list_serde() {
        let mut cuts: CutList<dyn PairCut> = CutList::new();
        cuts.add(Box::new(
            VarCut::new("mass").add_range(Variable::Mass, 1.0, 1.04, false),
        ));
        cuts.add(Box::new(PairTypeCut {
            accepted: vec![PairCandidate::PhiToKK],
        }));
        let bytes = bincode::serde::encode_to_vec(&cuts, bincode::config::standard()).unwrap();
        let (decoded, _): (CutList<dyn PairCut>, usize) =
            bincode::serde::decode_from_slice(&bytes, bincode::config::standard()).unwrap();
        assert_eq!(decoded.len(), 2);
        let event = test_reduced_event();
        let mut values = VarArray::new();
        crate::reduced::vars::fill_pair_info(&event.pairs[0], &mut values);
        assert_eq!(
            decoded.passes(&event.pairs[0], &values),
            cuts.passes(&event.pairs[0], &values)
        );
    }
}
