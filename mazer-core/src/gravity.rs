//! Blending and alcohol math.
//!
//! Blending works in gravity points ((SG − 1) × 1000 × liters) rather
//! than averaging SG directly: points are roughly proportional to
//! dissolved sugar mass, SG is not.

use crate::units::sg_to_brix;

/// Result of blending ingredient contributions.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Blend {
    pub sg: f64,
    pub liters: f64,
}

/// Blend (SG, liters) pairs into one gravity over the total volume.
/// Zero total volume yields water (SG 1.0) by convention.
pub fn blend(pairs: impl IntoIterator<Item = (f64, f64)>) -> Blend {
    let mut points = 0.0;
    let mut liters = 0.0;
    for (sg, vol) in pairs {
        points += (sg - 1.0) * 1000.0 * vol;
        liters += vol;
    }
    let sg = if liters > 0.0 { points / liters / 1000.0 + 1.0 } else { 1.0 };
    Blend { sg, liters }
}

/// Alcohol by volume (percent) from an OG/FG pair.
/// Uses the corrected approximation rather than plain subtraction;
/// the (1.775 − OG) denominator keeps high-gravity musts honest.
pub fn abv(og: f64, fg: f64) -> f64 {
    (76.08 * (og - fg) / (1.775 - og)) * (fg / 0.794)
}

/// Delle stabilization units: Brix of the finished gravity plus 4.5
/// per percent alcohol. ~73 is the traditional microbial-stability line.
pub fn delle(fg: f64, abv_percent: f64) -> f64 {
    sg_to_brix(fg) + 4.5 * abv_percent
}

/* ===========================
Unit tests
=========================== */

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_equal_volume_blend() {
        let b = blend([(1.100, 1.0), (1.000, 1.0)]);
        assert_relative_eq!(b.sg, 1.050, epsilon = 1e-12);
        assert_relative_eq!(b.liters, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_volume_is_water() {
        let b = blend([]);
        assert_eq!(b.sg, 1.0);
        assert_eq!(b.liters, 0.0);

        let b = blend([(1.2, 0.0)]);
        assert_eq!(b.sg, 1.0);
    }

    #[test]
    fn test_volume_weighting() {
        // 3 L at 1.100 with 1 L of water: 300 points over 4 L
        let b = blend([(1.100, 3.0), (1.000, 1.0)]);
        assert_relative_eq!(b.sg, 1.075, epsilon = 1e-12);
    }

    #[test]
    fn test_abv_dry_finish() {
        let a = abv(1.100, 1.000);
        assert_relative_eq!(a, 14.195, epsilon = 1e-3);
    }

    #[test]
    fn test_abv_zero_attenuation() {
        assert_relative_eq!(abv(1.080, 1.080), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_delle_dry_is_just_abv_term() {
        // FG 1.000 has 0 Brix, so Delle is 4.5 x ABV
        assert_relative_eq!(delle(1.000, 10.0), 45.0, epsilon = 1e-9);
    }
}
