use std::f64::consts::PI;

use tracing::{debug, info};

use crate::{
    histograms::Axis,
    reduced::{
        data::{PairCandidate, ReducedEvent, ReducedPair, ReducedTrack},
        task::{ReducedAnalysisTask, ReducedTaskBase},
        vars::{fill_event_info, fill_pair_info, fill_track_info, Variable},
    },
    EvTaskResult,
};

const EVENT_BEFORE_CUTS: &str = "Event_BeforeCuts";
const EVENT_AFTER_CUTS: &str = "Event_AfterCuts";
const TRACK_BEFORE_CUTS: &str = "Track_BeforeCuts";
const TRACK_AFTER_CUTS: &str = "Track_AfterCuts";
const PAIR: &str = "Pair";

/// A quality-assurance task: event, track and pair distributions before and after the cuts.
///
/// Selected tracks are combined into opposite-sign pairs under a single decay hypothesis, and
/// pairs passing the pair cuts fill the `Pair` class.
///
/// # Examples
///
/// ```
/// use evtask::reduced::{data::test_reduced_event, qa::ReducedEventQaTask};
/// use evtask::ReducedAnalysisTask;
///
/// let mut task = ReducedEventQaTask::new("qa");
/// task.init().unwrap();
/// task.process(&test_reduced_event()).unwrap();
/// task.finish().unwrap();
/// assert_eq!(task.events_accepted(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct ReducedEventQaTask {
    base: ReducedTaskBase,
    candidate: PairCandidate,
    events_processed: u64,
    events_accepted: u64,
    tracks_accepted: u64,
    pairs_accepted: u64,
}

impl ReducedEventQaTask {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            base: ReducedTaskBase::new(name, "Reduced event QA"),
            candidate: PairCandidate::default(),
            events_processed: 0,
            events_accepted: 0,
            tracks_accepted: 0,
            pairs_accepted: 0,
        }
    }
    /// Set the decay hypothesis used to build pairs.
    pub fn candidate(mut self, candidate: PairCandidate) -> Self {
        self.candidate = candidate;
        self
    }
    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }
    pub fn events_accepted(&self) -> u64 {
        self.events_accepted
    }
    pub fn tracks_accepted(&self) -> u64 {
        self.tracks_accepted
    }
    pub fn pairs_accepted(&self) -> u64 {
        self.pairs_accepted
    }

    fn book_event_class(&mut self, class: &str) -> EvTaskResult<()> {
        let histos = self.base.histograms_mut();
        histos.add_histogram_class(class)?;
        histos.add_histogram_1d(class, "VtxZ", "", Variable::VtxZ, Axis::new(300, -15.0, 15.0))?;
        histos.add_histogram_2d(
            class,
            "VtxXY",
            "",
            Variable::VtxX,
            Axis::new(100, -1.0, 1.0),
            Variable::VtxY,
            Axis::new(100, -1.0, 1.0),
        )?;
        histos.add_histogram_1d(
            class,
            "CentVZERO",
            "",
            Variable::CentVZERO,
            Axis::new(100, 0.0, 100.0),
        )?;
        histos.add_histogram_2d(
            class,
            "CentVZERO_CentSPD",
            "",
            Variable::CentVZERO,
            Axis::new(100, 0.0, 100.0),
            Variable::CentSPD,
            Axis::new(100, 0.0, 100.0),
        )?;
        histos.add_histogram_1d(
            class,
            "NTracksTotal",
            "",
            Variable::NTracksTotal,
            Axis::new(200, 0.0, 4000.0),
        )?;
        histos.add_histogram_1d(
            class,
            "NTracksSelected",
            "",
            Variable::NTracksSelected,
            Axis::new(200, 0.0, 4000.0),
        )
    }

    fn book_track_class(&mut self, class: &str) -> EvTaskResult<()> {
        let histos = self.base.histograms_mut();
        histos.add_histogram_class(class)?;
        histos.add_histogram_1d(class, "Pt", "", Variable::Pt, Axis::new(200, 0.0, 20.0))?;
        histos.add_histogram_2d(
            class,
            "EtaPhi",
            "",
            Variable::Eta,
            Axis::new(100, -1.0, 1.0),
            Variable::Phi,
            Axis::new(180, -PI, PI),
        )?;
        histos.add_histogram_1d(
            class,
            "TPCncls",
            "",
            Variable::TPCncls,
            Axis::new(160, 0.0, 160.0),
        )?;
        histos.add_histogram_2d(
            class,
            "DcaXY_DcaZ",
            "",
            Variable::DcaXY,
            Axis::new(200, -5.0, 5.0),
            Variable::DcaZ,
            Axis::new(200, -5.0, 5.0),
        )
    }

    fn book_pair_class(&mut self, class: &str) -> EvTaskResult<()> {
        let histos = self.base.histograms_mut();
        histos.add_histogram_class(class)?;
        histos.add_histogram_1d(class, "Mass", "", Variable::Mass, Axis::new(500, 0.0, 5.0))?;
        histos.add_histogram_2d(
            class,
            "Mass_Pt",
            "",
            Variable::Mass,
            Axis::new(500, 0.0, 5.0),
            Variable::PairPt,
            Axis::new(100, 0.0, 10.0),
        )?;
        histos.add_histogram_1d(
            class,
            "Rapidity",
            "",
            Variable::PairRapidity,
            Axis::new(100, -1.5, 1.5),
        )?;
        histos.add_histogram_1d(
            class,
            "OpeningAngle",
            "",
            Variable::OpeningAngle,
            Axis::new(100, 0.0, PI),
        )
    }
}

impl ReducedAnalysisTask for ReducedEventQaTask {
    fn base(&self) -> &ReducedTaskBase {
        &self.base
    }
    fn base_mut(&mut self) -> &mut ReducedTaskBase {
        &mut self.base
    }

    fn init(&mut self) -> EvTaskResult<()> {
        self.book_event_class(EVENT_BEFORE_CUTS)?;
        self.book_event_class(EVENT_AFTER_CUTS)?;
        self.book_track_class(TRACK_BEFORE_CUTS)?;
        self.book_track_class(TRACK_AFTER_CUTS)?;
        self.book_pair_class(PAIR)?;
        info!(
            task = %self.base.name(),
            candidate = %self.candidate,
            event_cuts = self.base.event_cuts().len(),
            track_cuts = self.base.track_cuts().len(),
            pair_cuts = self.base.pair_cuts().len(),
            "initialized"
        );
        Ok(())
    }

    fn process(&mut self, event: &ReducedEvent) -> EvTaskResult<()> {
        self.events_processed += 1;
        self.base.reset_values();
        fill_event_info(event, self.base.values_mut());
        self.base.fill_histogram_class(EVENT_BEFORE_CUTS)?;
        if !self.is_event_selected(event) {
            debug!(run = event.run_number, "event rejected");
            return Ok(());
        }
        self.events_accepted += 1;

        let mut selected = Vec::new();
        for (index, track) in event.tracks.iter().enumerate() {
            fill_track_info(track, self.base.values_mut());
            self.base.fill_histogram_class(TRACK_BEFORE_CUTS)?;
            if self.is_track_selected(track) {
                self.base.fill_histogram_class(TRACK_AFTER_CUTS)?;
                selected.push(index);
            }
        }
        self.tracks_accepted += selected.len() as u64;
        self.base.values_mut()[Variable::NTracksSelected] = selected.len() as f64;
        self.base.fill_histogram_class(EVENT_AFTER_CUTS)?;

        let positive = selected.iter().filter(|i| event.tracks[**i].charge > 0);
        for &pos in positive {
            for &neg in selected.iter().filter(|i| event.tracks[**i].charge < 0) {
                let pair = ReducedPair::from_legs(
                    self.candidate,
                    (pos, neg),
                    &event.tracks[pos],
                    &event.tracks[neg],
                );
                fill_pair_info(&pair, self.base.values_mut());
                if self.is_pair_selected(&pair) {
                    self.base.fill_histogram_class(PAIR)?;
                    self.pairs_accepted += 1;
                }
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> EvTaskResult<()> {
        info!(
            task = %self.base.name(),
            processed = self.events_processed,
            accepted = self.events_accepted,
            tracks = self.tracks_accepted,
            pairs = self.pairs_accepted,
            "finished"
        );
        Ok(())
    }

    fn is_event_selected(&self, event: &ReducedEvent) -> bool {
        self.base.event_passes(event)
    }
    fn is_track_selected(&self, track: &ReducedTrack) -> bool {
        self.base.track_passes(track)
    }
    fn is_pair_selected(&self, pair: &ReducedPair) -> bool {
        self.base.pair_passes(pair)
    }
}
