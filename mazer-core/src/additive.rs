//! Miscellaneous additive lines (tannin, pectic enzyme, oak, campden)
//! with dimension-aware unit conversion.
//!
//! Converting 2 g into 2 mL silently would present a nonsense number,
//! so a line tracks which physical dimension its amount was entered in
//! and refuses to reconvert across dimensions: the number is left
//! as-is and the dimension goes Unknown until the user re-enters a
//! value or re-picks a catalog item.

use serde::{Deserialize, Serialize};

/// Physical dimension of an additive amount.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Mass,
    Volume,
    Count,
    Unknown,
}

/// Units an additive amount can be expressed in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdditiveUnit {
    Mg,
    G,
    Kg,
    Oz,
    Lb,
    Ml,
    Liter,
    FlOz,
    Tsp,
    Tbsp,
    Units,
    Tablets,
}

impl AdditiveUnit {
    pub fn dimension(self) -> Dimension {
        match self {
            AdditiveUnit::Mg
            | AdditiveUnit::G
            | AdditiveUnit::Kg
            | AdditiveUnit::Oz
            | AdditiveUnit::Lb => Dimension::Mass,
            AdditiveUnit::Ml
            | AdditiveUnit::Liter
            | AdditiveUnit::FlOz
            | AdditiveUnit::Tsp
            | AdditiveUnit::Tbsp => Dimension::Volume,
            AdditiveUnit::Units | AdditiveUnit::Tablets => Dimension::Count,
        }
    }

    /// Canonical factor within the unit's dimension: grams for mass,
    /// milliliters for volume, 1 for counts.
    fn canonical_factor(self) -> f64 {
        match self {
            AdditiveUnit::Mg => 0.001,
            AdditiveUnit::G => 1.0,
            AdditiveUnit::Kg => 1000.0,
            AdditiveUnit::Oz => 28.349523125,
            AdditiveUnit::Lb => 453.59237,
            AdditiveUnit::Ml => 1.0,
            AdditiveUnit::Liter => 1000.0,
            AdditiveUnit::FlOz => 29.5735295625,
            AdditiveUnit::Tsp => 4.92892159375,
            AdditiveUnit::Tbsp => 14.78676478125,
            AdditiveUnit::Units | AdditiveUnit::Tablets => 1.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AdditiveUnit::Mg => "mg",
            AdditiveUnit::G => "g",
            AdditiveUnit::Kg => "kg",
            AdditiveUnit::Oz => "oz",
            AdditiveUnit::Lb => "lb",
            AdditiveUnit::Ml => "mL",
            AdditiveUnit::Liter => "L",
            AdditiveUnit::FlOz => "fl oz",
            AdditiveUnit::Tsp => "tsp",
            AdditiveUnit::Tbsp => "tbsp",
            AdditiveUnit::Units => "units",
            AdditiveUnit::Tablets => "tablets",
        }
    }
}

/// One additive line of a recipe.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdditiveLine {
    pub name: String,
    /// Catalog item id, `None` for a custom additive.
    pub catalog_id: Option<u32>,
    pub amount: Option<f64>,
    pub unit: AdditiveUnit,
    /// Dimension the current amount is trusted in.
    pub dimension: Dimension,
}

impl AdditiveLine {
    pub fn new(name: impl Into<String>) -> Self {
        AdditiveLine {
            name: name.into(),
            catalog_id: None,
            amount: None,
            unit: AdditiveUnit::G,
            dimension: Dimension::Mass,
        }
    }

    /// User entered an amount: it is trusted in the current unit's
    /// dimension from here on.
    pub fn set_amount(&mut self, amount: Option<f64>) {
        self.amount = amount;
        self.dimension = self.unit.dimension();
    }

    /// Change the display unit. Within the trusted dimension the amount
    /// is reconverted; across dimensions (or while untrusted) the
    /// number is kept verbatim and the dimension goes Unknown.
    pub fn change_unit(&mut self, new_unit: AdditiveUnit) {
        let compatible =
            self.dimension != Dimension::Unknown && new_unit.dimension() == self.dimension;
        if compatible {
            if let Some(amount) = self.amount {
                let canonical = amount * self.unit.canonical_factor();
                self.amount = Some(canonical / new_unit.canonical_factor());
            }
        } else {
            self.dimension = Dimension::Unknown;
        }
        self.unit = new_unit;
    }

    /// Adopt a catalog item: name, suggested amount from its per-liter
    /// dosage, and a freshly trusted dimension.
    pub fn apply_catalog(
        &mut self,
        catalog_id: u32,
        name: impl Into<String>,
        dosage_per_liter: f64,
        dosage_unit: AdditiveUnit,
        batch_liters: f64,
    ) {
        self.catalog_id = Some(catalog_id);
        self.name = name.into();
        self.unit = dosage_unit;
        self.amount = Some(dosage_per_liter * batch_liters);
        self.dimension = dosage_unit.dimension();
    }
}

/* ===========================
Unit tests
=========================== */
