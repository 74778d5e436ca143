use std::{f64::consts::PI, fmt::Display};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    data::{McEvent, McParticle},
    histograms::{Axis, Histogram1D, Histogram2D},
    inspector::{EventInspection, EventInspector, InspectorConfig, Triggers},
    utils::{
        enums::Species,
        vectors::{Vec3, Vec4},
    },
    EvTaskResult,
};

/// Default upper limit on $`\xi = M^2/s`$ of the dissociated system.
pub const XI_MAX: f64 = 1.0 / 81.0;

/// Impact parameter (fm) at the upper edge of each centrality class of
/// [`GLAUBER_CENTRALITY`], for Pb-Pb collisions.
pub const GLAUBER_B: [f64; 13] = [
    0.0, 3.5, 4.95, 6.98, 8.55, 9.88, 11.0, 12.1, 13.1, 14.0, 14.9, 15.6, 16.3,
];
/// Centrality percentile matching each entry of [`GLAUBER_B`].
pub const GLAUBER_CENTRALITY: [f64; 13] = [
    0.0, 5.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 95.0, 100.0,
];

/// Centrality percentile from the impact parameter by linear interpolation in the Glauber
/// table. Negative impact parameters give `-1` and values past the table give `100`.
pub fn centrality_from_impact_parameter(b: f64) -> f64 {
    if b.is_nan() || b < 0.0 {
        return -1.0;
    }
    let upper = GLAUBER_B.iter().position(|edge| *edge > b);
    match upper {
        None => 100.0,
        Some(0) => 0.0,
        Some(i) => {
            let (b0, b1) = (GLAUBER_B[i - 1], GLAUBER_B[i]);
            let (c0, c1) = (GLAUBER_CENTRALITY[i - 1], GLAUBER_CENTRALITY[i]);
            c0 + (b - b0) * (c1 - c0) / (b1 - b0)
        }
    }
}

/// The open interval of $`\xi`$ values counted as single diffractive.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiffractiveWindow {
    pub xi_min: f64,
    pub xi_max: f64,
}

impl Default for DiffractiveWindow {
    fn default() -> Self {
        Self {
            xi_min: 0.0,
            xi_max: XI_MAX,
        }
    }
}

impl DiffractiveWindow {
    /// Whether `xi` lies strictly between the limits.
    pub fn contains(&self, xi: f64) -> bool {
        xi > self.xi_min && xi < self.xi_max
    }
}

/// Classify a particle list as single diffractive.
///
/// The particles are ordered in rapidity and split at the largest gap. The event is single
/// diffractive when one side is a lone proton and the other side's $`M^2/s`$ lies inside
/// `window`. Fewer than two particles never qualify.
pub fn classify_single_diffractive(
    particles: &[&McParticle],
    sqrt_s: f64,
    window: DiffractiveWindow,
) -> bool {
    if particles.len() < 2 || sqrt_s <= 0.0 {
        return false;
    }
    let mut ordered: Vec<(f64, &McParticle)> = particles
        .iter()
        .map(|p| (p.momentum.rapidity(), *p))
        .filter(|(y, _)| y.is_finite())
        .collect();
    if ordered.len() < 2 {
        return false;
    }
    ordered.sort_by(|a, b| a.0.total_cmp(&b.0));
    let mut split = 1;
    let mut largest_gap = f64::NEG_INFINITY;
    for i in 1..ordered.len() {
        let gap = ordered[i].0 - ordered[i - 1].0;
        if gap > largest_gap {
            largest_gap = gap;
            split = i;
        }
    }
    let (low, high) = ordered.split_at(split);
    let s = sqrt_s * sqrt_s;
    let xi = |side: &[(f64, &McParticle)]| {
        side.iter()
            .map(|(_, p)| p.momentum)
            .sum::<Vec4>()
            .m2()
            / s
    };
    let lone_proton =
        |side: &[(f64, &McParticle)]| side.len() == 1 && side[0].1.pdg == Species::Proton.pdg();
    (lone_proton(low) && window.contains(xi(high)))
        || (lone_proton(high) && window.contains(xi(low)))
}

/// The event generator an MC production was made with.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeneratorKind {
    Pythia,
    Phojet,
    Hijing,
    Dpmjet,
    Epos,
    #[default]
    Unknown,
}

impl GeneratorKind {
    /// Recognize a generator from its header name.
    pub fn from_name(name: &str) -> Self {
        let name = name.to_lowercase();
        if name.contains("pythia") {
            GeneratorKind::Pythia
        } else if name.contains("phojet") {
            GeneratorKind::Phojet
        } else if name.contains("hijing") {
            GeneratorKind::Hijing
        } else if name.contains("dpmjet") {
            GeneratorKind::Dpmjet
        } else if name.contains("epos") {
            GeneratorKind::Epos
        } else {
            GeneratorKind::Unknown
        }
    }
}
impl Display for GeneratorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeneratorKind::Pythia => write!(f, "PYTHIA"),
            GeneratorKind::Phojet => write!(f, "PHOJET"),
            GeneratorKind::Hijing => write!(f, "HIJING"),
            GeneratorKind::Dpmjet => write!(f, "DPMJET"),
            GeneratorKind::Epos => write!(f, "EPOS"),
            GeneratorKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// The truth quantities of one simulated event.
///
/// Geometry fields are `-1` when the generator provides no collision geometry.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct McTruthSummary {
    pub triggers: Triggers,
    /// 1-based vertex bin, `0` outside the configured axis.
    pub vertex_bin: u16,
    pub ip: Vec3,
    /// Impact parameter in fm.
    pub impact_parameter: f64,
    /// Centrality percentile derived from the impact parameter.
    pub centrality: f64,
    pub n_participants: i32,
    pub n_binary: i32,
    /// Reaction-plane angle in radians.
    pub reaction_plane: f64,
}

/// An event inspector which also reads the MC truth of simulated events.
#[derive(Clone, Debug)]
pub struct McEventInspector {
    core: EventInspector,
    generator: GeneratorKind,
    production: String,
}

impl McEventInspector {
    pub fn new<N: Into<String>>(name: N, config: InspectorConfig) -> Self {
        Self {
            core: EventInspector::new(name, config),
            generator: GeneratorKind::Unknown,
            production: String::new(),
        }
    }
    pub fn generator(&self) -> GeneratorKind {
        self.generator
    }
    pub fn production(&self) -> &str {
        &self.production
    }

    /// Book the data histograms and the MC histograms against `vertex_axis`.
    pub fn setup_for_data(&mut self, vertex_axis: &Axis) -> EvTaskResult<()> {
        self.core.setup_for_data(vertex_axis)?;
        let vz = *vertex_axis;
        let xy = Axis::new(100, -1.0, 1.0);
        let b = Axis::new(200, 0.0, 20.0);
        let cent = Axis::new(100, 0.0, 100.0);
        let npart = Axis::new(450, -0.5, 449.5);
        let nbin = Axis::new(400, -0.5, 2999.5);
        let output = self.core.output_mut();
        output.add(Histogram1D::new("vertex_mc", "True v_z (cm)", vz))?;
        output.add(Histogram2D::new("vertex_xy_mc", "True v_x vs v_y (cm)", xy, xy))?;
        output.add(Histogram1D::new(
            "phi_r",
            "Reaction plane angle (rad)",
            Axis::new(100, 0.0, 2.0 * PI),
        ))?;
        output.add(Histogram1D::new("b", "Impact parameter (fm)", b))?;
        output.add(Histogram1D::new(
            "centrality_mc",
            "Centrality from impact parameter (%)",
            cent,
        ))?;
        output.add(Histogram2D::new("b_vs_npart", "b vs N_part", b, npart))?;
        output.add(Histogram2D::new("b_vs_nbin", "b vs N_bin", b, nbin))?;
        output.add(Histogram2D::new("b_vs_cent", "b vs centrality", b, cent))?;
        output.add(Histogram2D::new(
            "vz_comparison",
            "Reconstructed vs true v_z (cm)",
            vz,
            vz,
        ))?;
        output.add(Histogram2D::new(
            "cent_vs_npart",
            "Centrality vs N_part",
            cent,
            npart,
        ))?;
        output.add(Histogram2D::new(
            "cent_vs_nbin",
            "Centrality vs N_bin",
            cent,
            nbin,
        ))?;
        output.add(Histogram2D::new(
            "cent_vs_mc_cent",
            "Reconstructed vs MC centrality",
            cent,
            cent,
        ))?;
        Ok(())
    }

    /// Book the data and MC histograms against the vertex axis of the configuration.
    pub fn setup(&mut self) -> EvTaskResult<()> {
        let axis = self.core.config().vertex_axis;
        self.setup_for_data(&axis)
    }

    /// Extract the truth quantities of `mc` and fill the MC histograms.
    pub fn process_mc(&mut self, mc: &McEvent) -> EvTaskResult<McTruthSummary> {
        let axis = self.core.require_axis()?;
        let ip = mc.header.primary_vertex;
        let vertex_bin = match axis.find_bin(ip.z) {
            bin if bin == 0 || bin > axis.n_bins() => 0,
            bin => bin as u16,
        };
        let (impact_parameter, n_participants, n_binary, reaction_plane) =
            match mc.header.geometry {
                Some(geometry) => (
                    geometry.impact_parameter,
                    geometry.n_participants,
                    geometry.n_binary,
                    geometry.reaction_plane,
                ),
                None => (-1.0, -1, -1, -1.0),
            };
        let centrality = centrality_from_impact_parameter(impact_parameter);

        let mut triggers = Triggers::INEL;
        let charged_central = mc
            .final_state_primaries()
            .any(|(_, p)| p.charge() != 0 && p.momentum.eta().abs() < 1.0);
        if charged_central {
            triggers.insert(Triggers::INEL_GT0);
        }
        if !self.is_single_diffractive(mc, 0.0, XI_MAX) {
            triggers.insert(Triggers::NSD | Triggers::MC_NSD);
        }
        debug!(%triggers, vertex_bin, b = impact_parameter, "processed MC truth");

        let output = self.core.output_mut();
        output.h1_mut("vertex_mc")?.fill(ip.z);
        output.h2_mut("vertex_xy_mc")?.fill(ip.x, ip.y);
        if mc.header.geometry.is_some() {
            output.h1_mut("phi_r")?.fill(reaction_plane);
            output.h1_mut("b")?.fill(impact_parameter);
            output.h1_mut("centrality_mc")?.fill(centrality);
            output
                .h2_mut("b_vs_npart")?
                .fill(impact_parameter, n_participants as f64);
            output
                .h2_mut("b_vs_nbin")?
                .fill(impact_parameter, n_binary as f64);
        }
        Ok(McTruthSummary {
            triggers,
            vertex_bin,
            ip,
            impact_parameter,
            centrality,
            n_participants,
            n_binary,
            reaction_plane,
        })
    }

    /// Histogram reconstructed against true quantities. Always returns `true`.
    #[allow(clippy::too_many_arguments)]
    pub fn compare_results(
        &mut self,
        vz: f64,
        true_vz: f64,
        cent: f64,
        mc_cent: f64,
        b: f64,
        npart: i32,
        nbin: i32,
    ) -> bool {
        let output = self.core.output_mut();
        if let Ok(h) = output.h2_mut("vz_comparison") {
            h.fill(vz, true_vz);
        }
        if let Ok(h) = output.h2_mut("b_vs_cent") {
            h.fill(b, cent);
        }
        if let Ok(h) = output.h2_mut("cent_vs_npart") {
            h.fill(cent, npart as f64);
        }
        if let Ok(h) = output.h2_mut("cent_vs_nbin") {
            h.fill(cent, nbin as f64);
        }
        if let Ok(h) = output.h2_mut("cent_vs_mc_cent") {
            h.fill(cent, mc_cent);
        }
        true
    }

    /// Record which generator produced `mc` and a short production description.
    pub fn read_production_details(&mut self, mc: &McEvent) {
        self.generator = GeneratorKind::from_name(&mc.header.generator);
        let sqrt_s = self.sqrt_s(mc);
        self.production = format!("{} at sqrt(s) = {} GeV", self.generator, sqrt_s);
        info!(
            inspector = %self.core.name(),
            generator = %self.generator,
            header = %mc.header.generator,
            sqrt_s,
            "production details"
        );
    }

    /// Whether `mc` is single diffractive for $`\xi \in (\xi_{\min}, \xi_{\max})`$, using the
    /// primary final-state particles. The usual cut-offs are `0` and [`XI_MAX`].
    pub fn is_single_diffractive(&self, mc: &McEvent, xi_min: f64, xi_max: f64) -> bool {
        let particles: Vec<&McParticle> = mc.final_state_primaries().map(|(_, p)| p).collect();
        classify_single_diffractive(
            &particles,
            self.sqrt_s(mc),
            DiffractiveWindow { xi_min, xi_max },
        )
    }

    fn sqrt_s(&self, mc: &McEvent) -> f64 {
        if mc.header.sqrt_s > 0.0 {
            mc.header.sqrt_s
        } else {
            self.core.config().sqrt_s
        }
    }
}

impl EventInspection for McEventInspector {
    fn core(&self) -> &EventInspector {
        &self.core
    }
    fn core_mut(&mut self) -> &mut EventInspector {
        &mut self.core
    }
    /// Simulated events are never recorded by a separate fast partition.
    fn check_fast_partition(&self, _fast_only: bool) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::{test_esd_event, test_mc_event, CollisionGeometry, McHeader},
        EvTaskError,
    };
    use approx::assert_relative_eq;

    fn particle(pdg: i32, momentum: Vec3, mass: f64) -> McParticle {
        McParticle {
            pdg,
            status: 1,
            momentum: momentum.with_mass(mass),
            production_vertex: Vec3::default(),
            first_mother: None,
            primary: true,
        }
    }

    fn event(particles: Vec<McParticle>) -> McEvent {
        McEvent {
            header: McHeader {
                generator: "PHOJET".to_string(),
                primary_vertex: Vec3::new(0.0, 0.0, 0.5),
                sqrt_s: 7000.0,
                geometry: None,
            },
            particles,
        }
    }

    fn inspector() -> McEventInspector {
        let mut inspector = McEventInspector::new("mc", InspectorConfig::default());
        inspector
            .setup_for_data(&Axis::new(10, -10.0, 10.0))
            .unwrap();
        inspector
    }

    #[test]
    fn test_back_to_back_protons_are_single_diffractive() {
        // Feynman-x 0.95 on both sides at 7 TeV.
        let pz = 0.95 * 7000.0 / 2.0;
        let mc = event(vec![
            particle(2212, Vec3::new(0.0, 0.0, pz), Species::Proton.mass()),
            particle(2212, Vec3::new(0.0, 0.0, -pz), Species::Proton.mass()),
        ]);
        let inspector = McEventInspector::new("mc", InspectorConfig::default());
        assert!(inspector.is_single_diffractive(&mc, 0.0, XI_MAX));
    }

    #[test]
    fn test_dissociated_mass_window() {
        let proton = particle(
            2212,
            Vec3::new(0.0, 0.0, 3000.0),
            Species::Proton.mass(),
        );
        let light = event(vec![
            proton.clone(),
            particle(211, Vec3::new(300.0, 0.0, 0.0), Species::Pion.mass()),
            particle(-211, Vec3::new(-300.0, 0.0, 0.0), Species::Pion.mass()),
        ]);
        let heavy = event(vec![
            proton,
            particle(211, Vec3::new(400.0, 0.0, 0.0), Species::Pion.mass()),
            particle(-211, Vec3::new(-400.0, 0.0, 0.0), Species::Pion.mass()),
        ]);
        let inspector = McEventInspector::new("mc", InspectorConfig::default());
        // M ~ 600 GeV gives xi ~ 0.0073, M ~ 800 GeV gives xi ~ 0.0131.
        assert!(inspector.is_single_diffractive(&light, 0.0, XI_MAX));
        assert!(!inspector.is_single_diffractive(&heavy, 0.0, XI_MAX));
        assert!(inspector.is_single_diffractive(&heavy, 0.0, 0.02));
    }

    #[test]
    fn test_window_boundaries_are_excluded() {
        let window = DiffractiveWindow::default();
        assert!(!window.contains(1.0 / 81.0));
        assert!(window.contains(1.0 / 81.0 - 1e-9));
        assert!(!window.contains(0.0));
        assert!(window.contains(f64::MIN_POSITIVE));
    }

    #[test]
    fn test_non_diffractive_stacks() {
        let inspector = McEventInspector::new("mc", InspectorConfig::default());
        let pions = event(vec![
            particle(211, Vec3::new(0.5, 0.0, 1.0), Species::Pion.mass()),
            particle(-211, Vec3::new(-0.5, 0.1, -1.0), Species::Pion.mass()),
            particle(211, Vec3::new(0.2, 0.3, 0.0), Species::Pion.mass()),
        ]);
        assert!(!inspector.is_single_diffractive(&pions, 0.0, XI_MAX));
        let single = event(vec![particle(
            2212,
            Vec3::new(0.0, 0.0, 3000.0),
            Species::Proton.mass(),
        )]);
        assert!(!inspector.is_single_diffractive(&single, 0.0, XI_MAX));
        assert!(!inspector.is_single_diffractive(&event(vec![]), 0.0, XI_MAX));
    }

    #[test]
    fn test_centrality_from_impact_parameter() {
        assert_relative_eq!(centrality_from_impact_parameter(-1.0), -1.0);
        assert_relative_eq!(centrality_from_impact_parameter(0.0), 0.0);
        assert_relative_eq!(centrality_from_impact_parameter(3.5), 5.0);
        assert_relative_eq!(centrality_from_impact_parameter(1.75), 2.5);
        assert_relative_eq!(centrality_from_impact_parameter(20.0), 100.0);
        let mut last = 0.0;
        for i in 0..170 {
            let c = centrality_from_impact_parameter(i as f64 * 0.1);
            assert!(c >= last);
            last = c;
        }
    }

    #[test]
    fn test_process_mc_requires_setup() {
        let mut inspector = McEventInspector::new("mc", InspectorConfig::default());
        assert!(matches!(
            inspector.process_mc(&test_mc_event()),
            Err(EvTaskError::NotSetUp { .. })
        ));
    }

    #[test]
    fn test_process_mc_without_geometry() {
        let mut inspector = inspector();
        let mc = test_mc_event();
        let summary = inspector.process_mc(&mc).unwrap();
        assert!(summary.triggers.contains(Triggers::INEL | Triggers::INEL_GT0));
        assert_eq!(
            summary.triggers.contains(Triggers::NSD),
            !inspector.is_single_diffractive(&mc, 0.0, XI_MAX)
        );
        assert_eq!(
            summary.triggers.contains(Triggers::NSD),
            summary.triggers.contains(Triggers::MC_NSD)
        );
        assert_eq!(summary.vertex_bin, 6);
        assert_relative_eq!(summary.ip.z, 1.5);
        assert_relative_eq!(summary.impact_parameter, -1.0);
        assert_relative_eq!(summary.centrality, -1.0);
        assert_eq!(summary.n_participants, -1);
        assert_eq!(summary.n_binary, -1);
        let output = inspector.core().output();
        assert_eq!(output.h1("vertex_mc").unwrap().entries(), 1);
        assert_eq!(output.h1("b").unwrap().entries(), 0);
    }

    #[test]
    fn test_setup_books_mc_histograms_from_config() {
        let config = InspectorConfig::default().vertex_axis(Axis::new(20, -20.0, 20.0));
        let mut inspector = McEventInspector::new("mc", config);
        inspector.setup().unwrap();
        assert_eq!(inspector.core().vertex_axis().map(|a| a.n_bins()), Some(20));
        let summary = inspector.process_mc(&test_mc_event()).unwrap();
        assert_eq!(summary.vertex_bin, 11);
        let output = inspector.core().output();
        assert_eq!(output.h1("vertex_mc").unwrap().entries(), 1);
        assert!(output.h1("triggers").is_ok());
        inspector.setup().unwrap();
        let output = inspector.core().output();
        assert_eq!(output.h1("vertex_mc").unwrap().entries(), 0);
    }

    #[test]
    fn test_charged_hyperon_sets_inel_gt0() {
        let mut inspector = inspector();
        let sigma = particle(3222, Vec3::new(1.0, 0.0, 0.12), 1.18937);
        assert_relative_eq!(sigma.momentum.eta(), 0.12f64.asinh(), epsilon = 1e-12);
        let summary = inspector.process_mc(&event(vec![sigma])).unwrap();
        assert!(summary.triggers.contains(Triggers::INEL | Triggers::INEL_GT0));
        let lambda = particle(3122, Vec3::new(1.0, 0.0, 0.12), 1.11568);
        let summary = inspector.process_mc(&event(vec![lambda])).unwrap();
        assert!(summary.triggers.contains(Triggers::INEL));
        assert!(!summary.triggers.contains(Triggers::INEL_GT0));
    }

    #[test]
    fn test_process_mc_with_geometry() {
        let mut inspector = inspector();
        let mut mc = test_mc_event();
        mc.header.primary_vertex.z = 25.0;
        mc.header.geometry = Some(CollisionGeometry {
            impact_parameter: 3.5,
            n_participants: 380,
            n_binary: 1600,
            reaction_plane: 1.2,
        });
        let summary = inspector.process_mc(&mc).unwrap();
        assert_eq!(summary.vertex_bin, 0);
        assert_relative_eq!(summary.centrality, 5.0);
        assert_eq!(summary.n_participants, 380);
        assert_relative_eq!(summary.reaction_plane, 1.2);
        let output = inspector.core().output();
        assert_eq!(output.h1("b").unwrap().entries(), 1);
        assert_eq!(output.h2("b_vs_npart").unwrap().entries(), 1);
    }

    #[test]
    fn test_compare_results() {
        let mut inspector = inspector();
        assert!(inspector.compare_results(1.48, 1.5, 12.5, 11.0, 4.0, 350, 1400));
        let output = inspector.core().output();
        assert_eq!(output.h2("vz_comparison").unwrap().entries(), 1);
        assert_eq!(output.h2("cent_vs_mc_cent").unwrap().entries(), 1);
        let mut unset = McEventInspector::new("mc", InspectorConfig::default());
        assert!(unset.compare_results(0.0, 0.0, 0.0, 0.0, 0.0, 0, 0));
    }

    #[test]
    fn test_production_details() {
        let mut inspector = McEventInspector::new("mc", InspectorConfig::default().sqrt_s(900.0));
        let mut mc = test_mc_event();
        mc.header.generator = "Pythia6 Perugia0".to_string();
        mc.header.sqrt_s = 0.0;
        inspector.read_production_details(&mc);
        assert_eq!(inspector.generator(), GeneratorKind::Pythia);
        assert_eq!(inspector.production(), "PYTHIA at sqrt(s) = 900 GeV");
    }

    #[test]
    fn test_reconstructed_processing_ignores_fast_partition() {
        let mut inspector = inspector();
        let mut esd = test_esd_event();
        esd.fast_only = true;
        let summary = inspector.process(&esd).unwrap();
        assert_eq!(summary.vertex_bin, 6);
        assert_eq!(inspector.core().vertex_axis().map(|a| a.n_bins()), Some(10));
    }
}
