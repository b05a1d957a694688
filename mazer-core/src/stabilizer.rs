//! Stabilizer dosing: sorbate, sulfite, and campden amounts for a
//! finished batch.

use serde::{Deserialize, Serialize};

use crate::units::LITERS_PER_US_GAL;

/// Target free SO2 (ppm) by must pH, one entry per 0.1 pH from 2.9 to
/// 3.9. Readings outside the table clamp to the end entries.
const TARGET_PPM_BY_PH: [f64; 11] =
    [11.0, 13.0, 16.0, 21.0, 26.0, 32.0, 39.0, 50.0, 63.0, 98.0, 123.0];

const TABLE_PH_MIN: f64 = 2.9;

/// pH assumed when the maker is not tracking pH.
pub const DEFAULT_PH: f64 = 3.6;

/// Which metabisulfite salt is being weighed out.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SulfiteSalt {
    Potassium,
    Sodium,
}

/// Stabilizer inputs held on the recipe.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StabilizerState {
    pub adding: bool,
    pub tracking_ph: bool,
    pub ph_reading: f64,
    pub salt: SulfiteSalt,
}

impl Default for StabilizerState {
    fn default() -> Self {
        StabilizerState {
            adding: false,
            tracking_ph: false,
            ph_reading: DEFAULT_PH,
            salt: SulfiteSalt::Potassium,
        }
    }
}

/// Computed doses. All zero when stabilizers are not requested.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct StabilizerDoses {
    pub target_ppm: f64,
    pub sorbate_g: f64,
    pub sulfite_g: f64,
    pub campden_tablets: f64,
}

/// Target free SO2 ppm for a pH reading, rounded to the nearest 0.1 pH
/// and clamped to the table range.
pub fn target_ppm(ph: f64) -> f64 {
    let idx = ((ph - TABLE_PH_MIN) * 10.0).round();
    let idx = idx.clamp(0.0, (TARGET_PPM_BY_PH.len() - 1) as f64) as usize;
    TARGET_PPM_BY_PH[idx]
}

/// Potassium sorbate grams for a batch.
pub fn sorbate_g(liters: f64, abv_percent: f64) -> f64 {
    ((-abv_percent * 25.0 + 400.0) / 0.75) * (liters / 1000.0)
}

/// Metabisulfite grams to hit the target ppm.
pub fn sulfite_g(liters: f64, ppm: f64, salt: SulfiteSalt) -> f64 {
    let divisor = match salt {
        SulfiteSalt::Potassium => 570.0,
        SulfiteSalt::Sodium => 674.0,
    };
    liters * ppm / divisor
}

/// Campden tablets (75 ppm per tablet per US gallon).
pub fn campden_tablets(liters: f64, ppm: f64) -> f64 {
    (ppm / 75.0) * (liters / LITERS_PER_US_GAL)
}

/// All three doses for the batch, or zeros when not stabilizing.
pub fn doses(state: &StabilizerState, liters: f64, abv_percent: f64) -> StabilizerDoses {
    if !state.adding {
        return StabilizerDoses::default();
    }
    let ph = if state.tracking_ph { state.ph_reading } else { DEFAULT_PH };
    let ppm = target_ppm(ph);
    StabilizerDoses {
        target_ppm: ppm,
        sorbate_g: sorbate_g(liters, abv_percent),
        sulfite_g: sulfite_g(liters, ppm, state.salt),
        campden_tablets: campden_tablets(liters, ppm),
    }
}

/* ===========================
Unit tests
=========================== */

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ppm_table_boundaries() {
        assert_eq!(target_ppm(3.6), 50.0);
        assert_eq!(target_ppm(2.5), 11.0);
        assert_eq!(target_ppm(4.5), 123.0);
    }

    #[test]
    fn test_ppm_rounds_to_nearest_tenth() {
        assert_eq!(target_ppm(3.64), 50.0);
        assert_eq!(target_ppm(3.57), 50.0);
        assert_eq!(target_ppm(3.54), 39.0);
    }

    #[test]
    fn test_sorbate_scales_down_with_abv() {
        let low = sorbate_g(19.0, 8.0);
        let high = sorbate_g(19.0, 14.0);
        assert!(high < low);
        // 12% in 19 L: ((−300+400)/0.75) × 0.019
        assert_relative_eq!(sorbate_g(19.0, 12.0), 2.5333333, epsilon = 1e-6);
    }

    #[test]
    fn test_sulfite_salt_divisors() {
        let k = sulfite_g(19.0, 50.0, SulfiteSalt::Potassium);
        let na = sulfite_g(19.0, 50.0, SulfiteSalt::Sodium);
        assert_relative_eq!(k, 19.0 * 50.0 / 570.0, epsilon = 1e-12);
        assert_relative_eq!(na, 19.0 * 50.0 / 674.0, epsilon = 1e-12);
    }

    #[test]
    fn test_campden_one_tablet_per_gallon_at_75ppm() {
        let tablets = campden_tablets(LITERS_PER_US_GAL, 75.0);
        assert_relative_eq!(tablets, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_not_adding_is_all_zeros() {
        let state = StabilizerState::default();
        assert_eq!(doses(&state, 19.0, 12.0), StabilizerDoses::default());
    }

    #[test]
    fn test_untracked_ph_uses_default() {
        let state = StabilizerState { adding: true, ..Default::default() };
        let d = doses(&state, 19.0, 12.0);
        assert_eq!(d.target_ppm, 50.0);
        assert!(d.sulfite_g > 0.0);
    }
}
