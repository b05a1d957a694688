//! Closed-form target solvers: hit a target OG/volume (or a target
//! backsweetened FG) by solving for ingredient quantities.
//!
//! Infeasible targets (negative water, non-finite gravities) return
//! `None`; the caller leaves state untouched rather than surfacing an
//! error.

use crate::units::brix_to_sg;

fn points(sg: f64, liters: f64) -> f64 {
    (sg - 1.0) * 1000.0 * liters
}

/// Honey and water volumes hitting a target OG at a target volume.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HoneyWaterSplit {
    pub honey_liters: f64,
    pub water_liters: f64,
}

/// Two-component solve: how much honey (at `honey_brix`) and water make
/// `target_liters` of must at `target_og`.
pub fn honey_water_split(
    target_og: f64,
    target_liters: f64,
    honey_brix: f64,
) -> Option<HoneyWaterSplit> {
    let honey_sg = brix_to_sg(honey_brix);
    if !honey_sg.is_finite() || honey_sg <= 1.0 || target_liters <= 0.0 {
        return None;
    }
    let needed = points(target_og, target_liters);
    let honey_liters = needed / ((honey_sg - 1.0) * 1000.0);
    let water_liters = target_liters - honey_liters;
    if !honey_liters.is_finite() || honey_liters < 0.0 || water_liters < 0.0 {
        return None;
    }
    Some(HoneyWaterSplit { honey_liters, water_liters })
}

/// Sweetener volume (liters) that lifts a finished batch from
/// `current_fg` to `target_fg`.
pub fn backsweeten_liters(
    current_fg: f64,
    current_liters: f64,
    target_fg: f64,
    sweetener_sg: f64,
) -> Option<f64> {
    if current_liters <= 0.0 || sweetener_sg <= target_fg {
        return None;
    }
    let liters = (target_fg - current_fg) * current_liters / (sweetener_sg - target_fg);
    if !liters.is_finite() || liters < 0.0 {
        return None;
    }
    Some(liters)
}

/// Volumes apportioning a target OG across several fermentables by
/// user-supplied fractions, with water as the remainder.
#[derive(Clone, Debug, PartialEq)]
pub struct Apportionment {
    /// Liters per fermentable, same order as the input parts.
    pub liters: Vec<f64>,
    pub water_liters: f64,
}

/// Split `target_og` at `target_liters` across fermentables given as
/// (brix, fraction-of-gravity) pairs. Refuses ratios that would need
/// negative water at that OG/volume.
pub fn apportion(
    target_og: f64,
    target_liters: f64,
    parts: &[(f64, f64)],
) -> Option<Apportionment> {
    if target_liters <= 0.0 {
        return None;
    }
    let needed = points(target_og, target_liters);
    let mut liters = Vec::with_capacity(parts.len());
    for &(brix, fraction) in parts {
        let share = needed * fraction;
        if share == 0.0 {
            liters.push(0.0);
            continue;
        }
        let sg = brix_to_sg(brix);
        if !sg.is_finite() || sg <= 1.0 {
            return None;
        }
        let v = share / ((sg - 1.0) * 1000.0);
        if !v.is_finite() || v < 0.0 {
            return None;
        }
        liters.push(v);
    }
    let water_liters = target_liters - liters.iter().sum::<f64>();
    if water_liters < 0.0 {
        return None;
    }
    Some(Apportionment { liters, water_liters })
}

/* ===========================
Unit tests
=========================== */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gravity::blend;
    use crate::units::{LITERS_PER_US_GAL, brix_to_sg};
    use approx::assert_relative_eq;

    const HONEY_BRIX: f64 = 79.6;

    #[test]
    fn test_split_recombines_to_target() {
        let target_liters = 5.0 * LITERS_PER_US_GAL;
        let split = honey_water_split(1.100, target_liters, HONEY_BRIX).unwrap();

        let b = blend([
            (brix_to_sg(HONEY_BRIX), split.honey_liters),
            (1.0, split.water_liters),
        ]);
        assert_relative_eq!(b.sg, 1.100, epsilon = 1e-9);
        assert_relative_eq!(b.liters, target_liters, epsilon = 1e-9);
    }

    #[test]
    fn test_split_rejects_impossible_gravity() {
        // target above the honey's own gravity cannot be blended with water
        assert!(honey_water_split(1.5, 10.0, HONEY_BRIX).is_none());
        // waterish "honey" can't raise gravity at all
        assert!(honey_water_split(1.1, 10.0, 0.0).is_none());
    }

    #[test]
    fn test_backsweeten_recombines_to_target() {
        let sweetener = brix_to_sg(HONEY_BRIX);
        let added = backsweeten_liters(0.996, 19.0, 1.010, sweetener).unwrap();

        let b = blend([(0.996, 19.0), (sweetener, added)]);
        assert_relative_eq!(b.sg, 1.010, epsilon = 1e-9);
    }

    #[test]
    fn test_backsweeten_rejects_degenerate() {
        // already above target: would need negative sweetener
        assert!(backsweeten_liters(1.020, 19.0, 1.010, brix_to_sg(HONEY_BRIX)).is_none());
        // sweetener not denser than the target gravity
        assert!(backsweeten_liters(0.996, 19.0, 1.010, 1.005).is_none());
    }

    #[test]
    fn test_apportion_recombines_to_target() {
        let target_liters = 20.0;
        let parts = [(HONEY_BRIX, 0.7), (25.0, 0.3)];
        let a = apportion(1.090, target_liters, &parts).unwrap();

        let b = blend([
            (brix_to_sg(HONEY_BRIX), a.liters[0]),
            (brix_to_sg(25.0), a.liters[1]),
            (1.0, a.water_liters),
        ]);
        assert_relative_eq!(b.sg, 1.090, epsilon = 1e-9);
        assert_relative_eq!(b.liters, target_liters, epsilon = 1e-9);
    }

    #[test]
    fn test_apportion_rejects_negative_water() {
        // a thin juice carrying most of a big gravity needs more volume
        // than the batch holds
        let parts = [(10.0, 0.9), (HONEY_BRIX, 0.1)];
        assert!(apportion(1.120, 10.0, &parts).is_none());
    }

    #[test]
    fn test_apportion_zero_fraction_gets_zero_volume() {
        let parts = [(HONEY_BRIX, 1.0), (25.0, 0.0)];
        let a = apportion(1.080, 15.0, &parts).unwrap();
        assert_eq!(a.liters[1], 0.0);
    }
}
