//! Nutrient/YAN dosing: target nitrogen from must gravity and yeast
//! demand, greedy allocation across the enabled nutrient sources, and
//! Go-Ferm rehydration sizing.

use serde::{Deserialize, Serialize};

use crate::Provenance;
use crate::units::sg_to_brix;

/// Yeast nitrogen requirement, from the yeast catalog.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NitrogenRequirement {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl NitrogenRequirement {
    /// Multiplier applied to sugar g/L to get the YAN target.
    pub fn multiplier(self) -> f64 {
        match self {
            NitrogenRequirement::VeryLow | NitrogenRequirement::Low => 0.75,
            NitrogenRequirement::Medium => 0.9,
            NitrogenRequirement::High => 1.25,
            NitrogenRequirement::VeryHigh => 1.8,
        }
    }
}

/// The four nutrient sources, in allocation priority order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NutrientSource {
    FermaidO,
    FermaidK,
    Dap,
    Other,
}

/// Priority order used by the greedy allocator. Organic nitrogen first,
/// inorganic last.
pub const SOURCE_ORDER: [NutrientSource; 4] = [
    NutrientSource::FermaidO,
    NutrientSource::FermaidK,
    NutrientSource::Dap,
    NutrientSource::Other,
];

impl NutrientSource {
    pub fn index(self) -> usize {
        match self {
            NutrientSource::FermaidO => 0,
            NutrientSource::FermaidK => 1,
            NutrientSource::Dap => 2,
            NutrientSource::Other => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            NutrientSource::FermaidO => "Fermaid O",
            NutrientSource::FermaidK => "Fermaid K",
            NutrientSource::Dap => "DAP",
            NutrientSource::Other => "Other",
        }
    }

    /// Nominal YAN contribution in ppm per g/L dosed.
    pub fn default_yan_ppm_per_g_l(self) -> f64 {
        match self {
            NutrientSource::FermaidO => 40.0,
            NutrientSource::FermaidK => 100.0,
            NutrientSource::Dap => 210.0,
            NutrientSource::Other => 100.0,
        }
    }

    /// Fallback dosing cap in g/L, used by the custom schedule and for
    /// sources the preset table doesn't tier.
    pub fn default_max_g_l(self) -> f64 {
        match self {
            NutrientSource::FermaidO => 0.6,
            NutrientSource::FermaidK => 0.5,
            NutrientSource::Dap => 0.96,
            NutrientSource::Other => 0.5,
        }
    }
}

/// Rehydration nutrient choice.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoFerm {
    None,
    Classic,
    Protect,
    SterolFlash,
}

impl GoFerm {
    /// Grams of product per gram of yeast.
    pub fn grams_per_yeast_gram(self) -> f64 {
        match self {
            GoFerm::Classic | GoFerm::Protect => 1.25,
            GoFerm::SterolFlash => 1.2,
            GoFerm::None => 0.0,
        }
    }

    /// Milliliters of rehydration water per gram of product.
    pub fn water_ml_per_gram(self) -> f64 {
        match self {
            GoFerm::Classic | GoFerm::Protect => 20.0,
            GoFerm::SterolFlash => 10.0,
            GoFerm::None => 0.0,
        }
    }
}

/// Per-source settings held on the recipe.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceLine {
    pub enabled: bool,
    /// Nominal ppm YAN per g/L dosed.
    pub yan_ppm_per_g_l: f64,
    /// Dosing cap in g/L.
    pub max_g_l: f64,
    /// User-entered ppm for manual mode.
    pub provided_ppm: f64,
    pub provided_provenance: Provenance,
}

impl SourceLine {
    fn new(source: NutrientSource) -> Self {
        SourceLine {
            enabled: false,
            yan_ppm_per_g_l: source.default_yan_ppm_per_g_l(),
            max_g_l: source.default_max_g_l(),
            provided_ppm: 0.0,
            provided_provenance: Provenance::Default,
        }
    }
}

/// Nutrient inputs held on the recipe.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NutrientState {
    /// Indexed by [`NutrientSource::index`].
    pub sources: [SourceLine; 4],
    /// How many split additions the total is divided over (1..=4).
    pub additions: u8,
    pub go_ferm: GoFerm,
    pub yeast_g: f64,
    pub yeast_g_provenance: Provenance,
    /// Subtracted from the computed target (YAN already in the must).
    pub offset_ppm: f64,
    pub offset_provenance: Provenance,
    pub requirement: NitrogenRequirement,
    /// Manual mode: the user supplies provided ppm per source directly.
    pub adjust_allowed: bool,
    /// Whether the per-source caps still track the schedule presets.
    pub caps_provenance: Provenance,
}

impl Default for NutrientState {
    fn default() -> Self {
        let mut sources = SOURCE_ORDER.map(SourceLine::new);
        sources[NutrientSource::FermaidO.index()].enabled = true;
        NutrientState {
            sources,
            additions: 1,
            go_ferm: GoFerm::Classic,
            yeast_g: 0.0,
            yeast_g_provenance: Provenance::Default,
            offset_ppm: 0.0,
            offset_provenance: Provenance::Default,
            requirement: NitrogenRequirement::Medium,
            adjust_allowed: false,
            caps_provenance: Provenance::Default,
        }
    }
}

/// Dosing schedule implied by the enabled-source subset. Presets look
/// up default caps; anything involving "Other" (or nothing) is custom.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Schedule {
    Tosna,
    OAndK,
    OAndDap,
    KAndDap,
    OKDap,
    KOnly,
    DapOnly,
    Custom,
}

impl Schedule {
    pub fn label(self) -> &'static str {
        match self {
            Schedule::Tosna => "TOSNA (Fermaid O only)",
            Schedule::OAndK => "Fermaid O & K",
            Schedule::OAndDap => "Fermaid O & DAP",
            Schedule::KAndDap => "Fermaid K & DAP",
            Schedule::OKDap => "Fermaid O & K & DAP",
            Schedule::KOnly => "Fermaid K only",
            Schedule::DapOnly => "DAP only",
            Schedule::Custom => "Custom",
        }
    }
}

impl NutrientState {
    pub fn source(&self, source: NutrientSource) -> &SourceLine {
        &self.sources[source.index()]
    }

    pub fn source_mut(&mut self, source: NutrientSource) -> &mut SourceLine {
        &mut self.sources[source.index()]
    }

    /// Effective ppm-per-g/L for a source. Fermaid O's organic nitrogen
    /// is worth 4x nominal when the yeast is rehydrated on a Go-Ferm
    /// product, 3x when pitched without one.
    pub fn effective_yan_ppm_per_g_l(&self, source: NutrientSource) -> f64 {
        let base = self.source(source).yan_ppm_per_g_l;
        if source == NutrientSource::FermaidO {
            let factor = if self.go_ferm == GoFerm::None { 3.0 } else { 4.0 };
            base * factor
        } else {
            base
        }
    }

    pub fn schedule(&self) -> Schedule {
        let on = |s: NutrientSource| self.source(s).enabled;
        match (
            on(NutrientSource::FermaidO),
            on(NutrientSource::FermaidK),
            on(NutrientSource::Dap),
            on(NutrientSource::Other),
        ) {
            (true, false, false, false) => Schedule::Tosna,
            (true, true, false, false) => Schedule::OAndK,
            (true, false, true, false) => Schedule::OAndDap,
            (false, true, true, false) => Schedule::KAndDap,
            (true, true, true, false) => Schedule::OKDap,
            (false, true, false, false) => Schedule::KOnly,
            (false, false, true, false) => Schedule::DapOnly,
            _ => Schedule::Custom,
        }
    }

    /// Apply the schedule's preset caps for the given OG. Fermaid O
    /// caps tier with gravity; the custom schedule keeps the fixed
    /// per-source defaults.
    pub fn apply_schedule_caps(&mut self, og: f64) {
        let schedule = self.schedule();
        for source in SOURCE_ORDER {
            self.source_mut(source).max_g_l = preset_max_g_l(schedule, source, og);
        }
    }
}

/// Fermaid O dosing tier by OG: bigger musts carry more organic
/// nutrient before the cap bites.
fn fermaid_o_tier_g_l(og: f64) -> f64 {
    if og <= 1.08 {
        1.2
    } else if og <= 1.11 {
        1.8
    } else {
        2.5
    }
}

/// Default cap for one source under a schedule preset.
pub fn preset_max_g_l(schedule: Schedule, source: NutrientSource, og: f64) -> f64 {
    match (schedule, source) {
        (Schedule::Custom, s) => s.default_max_g_l(),
        (Schedule::Tosna, NutrientSource::FermaidO) => fermaid_o_tier_g_l(og),
        (Schedule::OAndK | Schedule::OAndDap | Schedule::OKDap, NutrientSource::FermaidO) => {
            // blends lean on the partner source for the top end
            fermaid_o_tier_g_l(og) / 2.0
        }
        (_, s) => s.default_max_g_l(),
    }
}

/// Approximate dissolved sugar in g/L for a must at `og`.
/// Brix is g sugar per 100 g solution; solution mass per liter is
/// og x 1000 g.
pub fn sugar_g_per_l(og: f64) -> f64 {
    10.0 * sg_to_brix(og) * og
}

/// Target YAN in ppm for a must and yeast demand, less the offset the
/// user reports as already present.
pub fn target_yan_ppm(og: f64, requirement: NitrogenRequirement, offset_ppm: f64) -> f64 {
    (sugar_g_per_l(og) * requirement.multiplier() - offset_ppm).round().max(0.0)
}

/// Full allocation result for display.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Allocation {
    pub target_yan_ppm: f64,
    /// ppm YAN supplied, by source order.
    pub ppm: [f64; 4],
    /// Total grams dosed, by source order.
    pub grams: [f64; 4],
    /// Grams per split addition, by source order.
    pub grams_per_addition: [f64; 4],
    /// Target YAN not covered by any source. A warning, not an error.
    /// Negative in manual mode when the provided doses overshoot.
    pub remaining_yan_ppm: f64,
    pub go_ferm_g: f64,
    pub go_ferm_water_ml: f64,
}

/// Allocate the YAN target across the enabled sources for a batch of
/// `liters`, in fixed priority order, each source capped at its g/L
/// limit. Manual mode takes the user's provided ppm at face value.
pub fn allocate(state: &NutrientState, og: f64, liters: f64) -> Allocation {
    let target = target_yan_ppm(og, state.requirement, state.offset_ppm);
    let additions = f64::from(state.additions.clamp(1, 4));

    let mut out = Allocation {
        target_yan_ppm: target,
        go_ferm_g: state.yeast_g * state.go_ferm.grams_per_yeast_gram(),
        ..Default::default()
    };
    out.go_ferm_water_ml = out.go_ferm_g * state.go_ferm.water_ml_per_gram();

    let mut remaining = target;
    for source in SOURCE_ORDER {
        let i = source.index();
        let line = state.source(source);
        if !line.enabled {
            continue;
        }
        let per_g_l = state.effective_yan_ppm_per_g_l(source);
        if per_g_l <= 0.0 {
            continue;
        }
        let ppm = if state.adjust_allowed {
            line.provided_ppm
        } else {
            let cap_ppm = per_g_l * line.max_g_l;
            remaining.min(cap_ppm).max(0.0)
        };
        out.ppm[i] = ppm;
        out.grams[i] = ppm / per_g_l * liters;
        out.grams_per_addition[i] = out.grams[i] / additions;
        remaining -= ppm;
    }
    // Manual mode keeps the signed remainder so over-provision shows
    // up instead of reading as fully covered.
    out.remaining_yan_ppm = if state.adjust_allowed { remaining } else { remaining.max(0.0) };
    out
}

/// Default yeast pitch in grams for a batch: per-gallon rate stepped up
/// with starting gravity. Only written to state while the field's
/// provenance is still [`Provenance::Default`].
pub fn default_yeast_g(us_gallons: f64, og: f64) -> f64 {
    let per_gallon = if og >= 1.125 {
        4.0
    } else if og > 1.1 {
        3.0
    } else {
        2.0
    };
    us_gallons * per_gallon
}

/* ===========================
Unit tests
=========================== */

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn single_source_state(source: NutrientSource) -> NutrientState {
        let mut state = NutrientState::default();
        for s in SOURCE_ORDER {
            state.source_mut(s).enabled = s == source;
        }
        state
    }

    #[test]
    fn test_target_yan_medium_demand() {
        // 1.1 must: ~237.8 g/L sugar x 0.9
        let t = target_yan_ppm(1.1, NitrogenRequirement::Medium, 0.0);
        assert_relative_eq!(t, (sugar_g_per_l(1.1) * 0.9).round(), epsilon = 1e-9);
        assert!(t > 200.0 && t < 250.0);
    }

    #[test]
    fn test_offset_subtracts_and_floors_at_zero() {
        let base = target_yan_ppm(1.05, NitrogenRequirement::Medium, 0.0);
        assert_relative_eq!(
            target_yan_ppm(1.05, NitrogenRequirement::Medium, 25.0),
            base - 25.0,
            epsilon = 1e-9
        );
        assert_eq!(target_yan_ppm(1.05, NitrogenRequirement::Medium, 10_000.0), 0.0);
    }

    #[test]
    fn test_single_source_with_headroom_takes_everything() {
        let mut state = single_source_state(NutrientSource::Dap);
        state.source_mut(NutrientSource::Dap).max_g_l = 100.0; // cap far above target
        let a = allocate(&state, 1.1, 19.0);

        assert_relative_eq!(a.ppm[NutrientSource::Dap.index()], a.target_yan_ppm, epsilon = 1e-9);
        assert_eq!(a.remaining_yan_ppm, 0.0);
        assert_relative_eq!(
            a.grams[NutrientSource::Dap.index()],
            a.target_yan_ppm / 210.0 * 19.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_no_sources_leaves_full_target_remaining() {
        let mut state = NutrientState::default();
        for s in SOURCE_ORDER {
            state.source_mut(s).enabled = false;
        }
        let a = allocate(&state, 1.1, 19.0);
        assert_eq!(a.grams, [0.0; 4]);
        assert_eq!(a.remaining_yan_ppm, a.target_yan_ppm);
    }

    #[test]
    fn test_overflow_rolls_to_next_source() {
        let mut state = NutrientState::default();
        state.source_mut(NutrientSource::FermaidO).enabled = true;
        state.source_mut(NutrientSource::FermaidO).max_g_l = 0.1; // tiny cap
        state.source_mut(NutrientSource::Dap).enabled = true;
        state.source_mut(NutrientSource::Dap).max_g_l = 100.0;

        let a = allocate(&state, 1.1, 19.0);
        let o = NutrientSource::FermaidO.index();
        let dap = NutrientSource::Dap.index();

        // O takes exactly its cap (40 x 4 x 0.1 = 16 ppm), DAP the rest
        assert_relative_eq!(a.ppm[o], 16.0, epsilon = 1e-9);
        assert_relative_eq!(a.ppm[dap], a.target_yan_ppm - 16.0, epsilon = 1e-9);
        assert_eq!(a.remaining_yan_ppm, 0.0);
    }

    #[test]
    fn test_fermaid_o_factor_drops_without_go_ferm() {
        let mut state = single_source_state(NutrientSource::FermaidO);
        state.go_ferm = GoFerm::Classic;
        assert_relative_eq!(
            state.effective_yan_ppm_per_g_l(NutrientSource::FermaidO),
            160.0,
            epsilon = 1e-9
        );
        state.go_ferm = GoFerm::None;
        assert_relative_eq!(
            state.effective_yan_ppm_per_g_l(NutrientSource::FermaidO),
            120.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_manual_mode_takes_provided_ppm() {
        let mut state = single_source_state(NutrientSource::FermaidK);
        state.adjust_allowed = true;
        state.source_mut(NutrientSource::FermaidK).provided_ppm = 80.0;

        let a = allocate(&state, 1.1, 10.0);
        let k = NutrientSource::FermaidK.index();
        assert_relative_eq!(a.grams[k], 80.0 / 100.0 * 10.0, epsilon = 1e-9);
        assert_relative_eq!(a.remaining_yan_ppm, a.target_yan_ppm - 80.0, epsilon = 1e-9);
    }

    #[test]
    fn test_manual_over_provision_goes_negative() {
        let mut state = single_source_state(NutrientSource::FermaidK);
        state.adjust_allowed = true;
        state.source_mut(NutrientSource::FermaidK).provided_ppm = 500.0;

        let a = allocate(&state, 1.1, 10.0);
        assert!(a.remaining_yan_ppm < 0.0);
        assert_relative_eq!(a.remaining_yan_ppm, a.target_yan_ppm - 500.0, epsilon = 1e-9);
    }

    #[test]
    fn test_split_additions_divide_grams() {
        let mut state = single_source_state(NutrientSource::Dap);
        state.source_mut(NutrientSource::Dap).max_g_l = 100.0;
        state.additions = 4;
        let a = allocate(&state, 1.1, 19.0);
        let i = NutrientSource::Dap.index();
        assert_relative_eq!(a.grams_per_addition[i] * 4.0, a.grams[i], epsilon = 1e-12);
    }

    #[test]
    fn test_go_ferm_sizing() {
        let mut state = NutrientState::default();
        state.yeast_g = 10.0;

        state.go_ferm = GoFerm::Classic;
        let a = allocate(&state, 1.1, 19.0);
        assert_relative_eq!(a.go_ferm_g, 12.5, epsilon = 1e-9);
        assert_relative_eq!(a.go_ferm_water_ml, 250.0, epsilon = 1e-9);

        state.go_ferm = GoFerm::SterolFlash;
        let a = allocate(&state, 1.1, 19.0);
        assert_relative_eq!(a.go_ferm_g, 12.0, epsilon = 1e-9);
        assert_relative_eq!(a.go_ferm_water_ml, 120.0, epsilon = 1e-9);

        state.go_ferm = GoFerm::None;
        let a = allocate(&state, 1.1, 19.0);
        assert_eq!(a.go_ferm_g, 0.0);
        assert_eq!(a.go_ferm_water_ml, 0.0);
    }

    #[test]
    fn test_default_yeast_tiers() {
        assert_relative_eq!(default_yeast_g(5.0, 1.05), 10.0, epsilon = 1e-9);
        assert_relative_eq!(default_yeast_g(5.0, 1.1), 10.0, epsilon = 1e-9); // boundary stays low
        assert_relative_eq!(default_yeast_g(5.0, 1.11), 15.0, epsilon = 1e-9);
        assert_relative_eq!(default_yeast_g(5.0, 1.125), 20.0, epsilon = 1e-9);
    }

    #[test]
    fn test_schedule_from_selection() {
        let state = single_source_state(NutrientSource::FermaidO);
        assert_eq!(state.schedule(), Schedule::Tosna);

        let mut state = single_source_state(NutrientSource::FermaidK);
        state.source_mut(NutrientSource::Dap).enabled = true;
        assert_eq!(state.schedule(), Schedule::KAndDap);

        let mut state = NutrientState::default();
        state.source_mut(NutrientSource::Other).enabled = true;
        assert_eq!(state.schedule(), Schedule::Custom);
    }

    #[test]
    fn test_tosna_caps_tier_with_gravity() {
        let mut state = single_source_state(NutrientSource::FermaidO);
        state.apply_schedule_caps(1.07);
        let low = state.source(NutrientSource::FermaidO).max_g_l;
        state.apply_schedule_caps(1.12);
        let high = state.source(NutrientSource::FermaidO).max_g_l;
        assert!(high > low);
        assert_relative_eq!(low, 1.2, epsilon = 1e-12);
        assert_relative_eq!(high, 2.5, epsilon = 1e-12);
    }
}
