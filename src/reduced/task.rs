use tracing::debug;

use crate::{
    histograms::OutputList,
    reduced::{
        cuts::{CutList, EventCut, PairCut, TrackCut},
        data::{ReducedEvent, ReducedPair, ReducedTrack},
        histos::HistogramManager,
        vars::VarArray,
    },
    EvTaskResult,
};

/// State shared by every reduced-event analysis task.
///
/// The base owns its cuts: each one is added exactly once and released when the lists are
/// cleared or the base is dropped. The scratch [`VarArray`] starts zeroed.
#[derive(Clone, Debug, Default)]
pub struct ReducedTaskBase {
    name: String,
    title: String,
    values: VarArray,
    event_cuts: CutList<dyn EventCut>,
    track_cuts: CutList<dyn TrackCut>,
    pair_cuts: CutList<dyn PairCut>,
    histograms: HistogramManager,
}

impl ReducedTaskBase {
    pub fn new<N: Into<String>, T: Into<String>>(name: N, title: T) -> Self {
        let name = name.into();
        Self {
            histograms: HistogramManager::new(name.clone()),
            name,
            title: title.into(),
            ..Default::default()
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn title(&self) -> &str {
        &self.title
    }
    pub fn values(&self) -> &VarArray {
        &self.values
    }
    pub fn values_mut(&mut self) -> &mut VarArray {
        &mut self.values
    }
    /// Zero the scratch array.
    pub fn reset_values(&mut self) {
        self.values.reset();
    }
    pub fn add_event_cut(&mut self, cut: Box<dyn EventCut>) {
        debug!(task = %self.name, ?cut, "added event cut");
        self.event_cuts.add(cut);
    }
    pub fn add_track_cut(&mut self, cut: Box<dyn TrackCut>) {
        debug!(task = %self.name, ?cut, "added track cut");
        self.track_cuts.add(cut);
    }
    pub fn add_pair_cut(&mut self, cut: Box<dyn PairCut>) {
        debug!(task = %self.name, ?cut, "added pair cut");
        self.pair_cuts.add(cut);
    }
    pub fn event_cuts(&self) -> &CutList<dyn EventCut> {
        &self.event_cuts
    }
    pub fn track_cuts(&self) -> &CutList<dyn TrackCut> {
        &self.track_cuts
    }
    pub fn pair_cuts(&self) -> &CutList<dyn PairCut> {
        &self.pair_cuts
    }
    /// Release every cut of all three lists.
    pub fn clear_cuts(&mut self) {
        self.event_cuts.clear();
        self.track_cuts.clear();
        self.pair_cuts.clear();
    }
    pub fn histograms(&self) -> &HistogramManager {
        &self.histograms
    }
    pub fn histograms_mut(&mut self) -> &mut HistogramManager {
        &mut self.histograms
    }
    /// Whether `event` passes every event cut, given the current scratch values.
    pub fn event_passes(&self, event: &ReducedEvent) -> bool {
        self.event_cuts.passes(event, &self.values)
    }
    /// Whether `track` passes every track cut, given the current scratch values.
    pub fn track_passes(&self, track: &ReducedTrack) -> bool {
        self.track_cuts.passes(track, &self.values)
    }
    /// Whether `pair` passes every pair cut, given the current scratch values.
    pub fn pair_passes(&self, pair: &ReducedPair) -> bool {
        self.pair_cuts.passes(pair, &self.values)
    }
    /// Fill histogram class `class` from the current scratch values.
    pub fn fill_histogram_class(&mut self, class: &str) -> EvTaskResult<()> {
        self.histograms.fill_histogram_class(class, &self.values)
    }
}

/// An analysis task over reduced events.
///
/// The host calls [`init`](ReducedAnalysisTask::init) once before the first event,
/// [`process`](ReducedAnalysisTask::process) for every event and
/// [`finish`](ReducedAnalysisTask::finish) after the last one; the hooks do nothing unless
/// overridden. The three selection predicates have no generic verdict and must be supplied by
/// each task, usually by delegating to [`ReducedTaskBase::event_passes`] and friends.
pub trait ReducedAnalysisTask {
    fn base(&self) -> &ReducedTaskBase;
    fn base_mut(&mut self) -> &mut ReducedTaskBase;

    fn init(&mut self) -> EvTaskResult<()> {
        Ok(())
    }
    fn process(&mut self, _event: &ReducedEvent) -> EvTaskResult<()> {
        Ok(())
    }
    fn finish(&mut self) -> EvTaskResult<()> {
        Ok(())
    }

    fn is_event_selected(&self, event: &ReducedEvent) -> bool;
    fn is_track_selected(&self, track: &ReducedTrack) -> bool;
    fn is_pair_selected(&self, pair: &ReducedPair) -> bool;

    fn name(&self) -> &str {
        self.base().name()
    }
    /// The task's histograms, named `"{class}/{histogram}"`.
    fn output_list(&self) -> EvTaskResult<OutputList> {
        self.base().histograms().output_list()
    }
}
