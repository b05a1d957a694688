//! Calculation core for mead recipe formulation.
//!
//! Everything here is pure: ingredient normalization, gravity blending,
//! ABV/Delle math, stabilizer and nutrient dosing, target solvers, and
//! the recipe state container tying them together. No I/O.

use serde::{Deserialize, Serialize};

pub mod additive;
pub mod error;
pub mod gravity;
pub mod ingredient;
pub mod nutrient;
pub mod recipe;
pub mod solver;
pub mod stabilizer;
pub mod units;

pub use additive::{AdditiveLine, AdditiveUnit, Dimension};
pub use error::{DocumentError, UnitParseError};
pub use gravity::{Blend, abv, blend, delle};
pub use ingredient::{AmountBasis, IngredientLine, NormalizedIngredient};
pub use nutrient::{
    Allocation, GoFerm, NitrogenRequirement, NutrientSource, NutrientState, SOURCE_ORDER,
    Schedule, allocate, default_yeast_g, target_yan_ppm,
};
pub use recipe::{
    DEFAULT_FG, Derived, DocumentV1, DocumentV2, NoteLine, Phase, Recipe, SCHEMA_VERSION,
    UnitDefaults, derive, migrate_v1,
};
pub use solver::{Apportionment, HoneyWaterSplit, apportion, backsweeten_liters, honey_water_split};
pub use stabilizer::{StabilizerDoses, StabilizerState, SulfiteSalt, doses, target_ppm};
pub use units::{VolumeUnit, WeightUnit, brix_to_sg, sg_to_brix, sugar_break};

/// Where a field's current value came from. Auto-computed defaults only
/// overwrite fields still at `Default`; a `UserSet` value is never
/// clobbered by a recompute.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    #[default]
    Default,
    UserSet,
}
