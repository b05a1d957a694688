//! Unit conversion tables and gravity/sugar conversions.
//!
//! Every conversion in the workspace goes through the factor tables in
//! this module; no call site carries its own copy of a constant.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::UnitParseError;

/// Kilograms per pound (exact by definition).
pub const KG_PER_LB: f64 = 0.45359237;
/// Kilograms per avoirdupois ounce.
pub const KG_PER_OZ: f64 = 0.028349523125;

/// Liters per US gallon (exact by definition).
pub const LITERS_PER_US_GAL: f64 = 3.785411784;
/// Liters per imperial gallon.
pub const LITERS_PER_IMP_GAL: f64 = 4.54609;

/// Weight unit for ingredient and additive amounts.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    Lb,
    Oz,
    G,
    Kg,
}

impl WeightUnit {
    /// Factor converting one of this unit into kilograms.
    pub fn kg_factor(self) -> f64 {
        match self {
            WeightUnit::Lb => KG_PER_LB,
            WeightUnit::Oz => KG_PER_OZ,
            WeightUnit::G => 0.001,
            WeightUnit::Kg => 1.0,
        }
    }

    pub fn to_kg(self, amount: f64) -> f64 {
        amount * self.kg_factor()
    }

    pub fn from_kg(self, kg: f64) -> f64 {
        kg / self.kg_factor()
    }
}

impl fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WeightUnit::Lb => "lb",
            WeightUnit::Oz => "oz",
            WeightUnit::G => "g",
            WeightUnit::Kg => "kg",
        };
        f.write_str(s)
    }
}

impl FromStr for WeightUnit {
    type Err = UnitParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lb" | "lbs" => Ok(WeightUnit::Lb),
            "oz" => Ok(WeightUnit::Oz),
            "g" => Ok(WeightUnit::G),
            "kg" => Ok(WeightUnit::Kg),
            _ => Err(UnitParseError::new(s)),
        }
    }
}

/// Volume unit for ingredient amounts and batch sizing.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeUnit {
    Gal,
    Liter,
    Ml,
    Qt,
    Pt,
    FlOz,
    ImpGal,
    ImpQt,
    ImpPt,
    ImpFlOz,
}

impl VolumeUnit {
    /// Factor converting one of this unit into liters.
    pub fn liter_factor(self) -> f64 {
        match self {
            VolumeUnit::Gal => LITERS_PER_US_GAL,
            VolumeUnit::Liter => 1.0,
            VolumeUnit::Ml => 0.001,
            VolumeUnit::Qt => LITERS_PER_US_GAL / 4.0,
            VolumeUnit::Pt => LITERS_PER_US_GAL / 8.0,
            VolumeUnit::FlOz => LITERS_PER_US_GAL / 128.0,
            VolumeUnit::ImpGal => LITERS_PER_IMP_GAL,
            VolumeUnit::ImpQt => LITERS_PER_IMP_GAL / 4.0,
            VolumeUnit::ImpPt => LITERS_PER_IMP_GAL / 8.0,
            VolumeUnit::ImpFlOz => LITERS_PER_IMP_GAL / 160.0,
        }
    }

    pub fn to_liters(self, amount: f64) -> f64 {
        amount * self.liter_factor()
    }

    pub fn from_liters(self, liters: f64) -> f64 {
        liters / self.liter_factor()
    }
}

impl fmt::Display for VolumeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VolumeUnit::Gal => "gal",
            VolumeUnit::Liter => "L",
            VolumeUnit::Ml => "mL",
            VolumeUnit::Qt => "qt",
            VolumeUnit::Pt => "pt",
            VolumeUnit::FlOz => "fl oz",
            VolumeUnit::ImpGal => "imp gal",
            VolumeUnit::ImpQt => "imp qt",
            VolumeUnit::ImpPt => "imp pt",
            VolumeUnit::ImpFlOz => "imp fl oz",
        };
        f.write_str(s)
    }
}

impl FromStr for VolumeUnit {
    type Err = UnitParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gal" | "gallon" => Ok(VolumeUnit::Gal),
            "l" | "liter" | "litre" => Ok(VolumeUnit::Liter),
            "ml" => Ok(VolumeUnit::Ml),
            "qt" | "quart" => Ok(VolumeUnit::Qt),
            "pt" | "pint" => Ok(VolumeUnit::Pt),
            "floz" | "fl oz" | "fl_oz" => Ok(VolumeUnit::FlOz),
            "imp gal" | "imp_gal" => Ok(VolumeUnit::ImpGal),
            "imp qt" | "imp_qt" => Ok(VolumeUnit::ImpQt),
            "imp pt" | "imp_pt" => Ok(VolumeUnit::ImpPt),
            "imp floz" | "imp fl oz" | "imp_fl_oz" => Ok(VolumeUnit::ImpFlOz),
            _ => Err(UnitParseError::new(s)),
        }
    }
}

/// Brix from specific gravity, cubic approximation.
/// Accurate over the fermentation range (SG 0.99..1.17).
pub fn sg_to_brix(sg: f64) -> f64 {
    143.254 * sg.powi(3) - 648.670 * sg.powi(2) + 1125.805 * sg - 620.389
}

/// Specific gravity from Brix, cubic approximation anchored to the
/// sucrose density table (1.040 at 10 Bx, 1.1059 at 25 Bx, 1.367 at
/// 79.6 Bx — standard honey).
pub fn brix_to_sg(brix: f64) -> f64 {
    1.0 + 0.0038107938484 * brix + 2.0195527890e-5 * brix.powi(2)
        - 1.2749127305e-7 * brix.powi(3)
}

/// Gravity at which roughly one third of the fermentable sugar remains.
pub fn sugar_break(og: f64) -> f64 {
    (2.0 * (og - 1.0)) / 3.0 + 1.005
}

pub fn celsius_to_fahrenheit(c: f64) -> f64 {
    c * 9.0 / 5.0 + 32.0
}

pub fn fahrenheit_to_celsius(f: f64) -> f64 {
    (f - 32.0) * 5.0 / 9.0
}

/* ===========================
Unit tests
=========================== */
