//! Ingredient lines and the normalizer that turns a heterogeneous
//! weight-or-volume amount into canonical (SG, liters, kg).

use serde::{Deserialize, Serialize};

use crate::units::{VolumeUnit, WeightUnit, brix_to_sg};

/// Which of the two amount fields the user is actively editing.
/// The other side is derived and rewritten on every sync.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmountBasis {
    Weight,
    Volume,
}

/// One fermentable line of a recipe.
///
/// `weight` and `volume` are `None` when the user has entered nothing;
/// a blank amount means "skip this line", not zero.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IngredientLine {
    pub name: String,
    /// Catalog item id, `None` for a custom ingredient.
    pub catalog_id: Option<u32>,
    /// Sugar density proxy.
    pub brix: f64,
    pub weight: Option<f64>,
    pub weight_unit: WeightUnit,
    pub volume: Option<f64>,
    pub volume_unit: VolumeUnit,
    pub basis: AmountBasis,
    /// Added during secondary fermentation (backsweetening etc.).
    pub secondary: bool,
}

/// Canonical form of one line.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NormalizedIngredient {
    pub sg: f64,
    pub liters: f64,
    pub kg: f64,
    pub secondary: bool,
}

impl IngredientLine {
    pub fn new(name: impl Into<String>, weight_unit: WeightUnit, volume_unit: VolumeUnit) -> Self {
        IngredientLine {
            name: name.into(),
            catalog_id: None,
            brix: 0.0,
            weight: None,
            weight_unit,
            volume: None,
            volume_unit,
            basis: AmountBasis::Weight,
            secondary: false,
        }
    }

    /// Specific gravity implied by this line's Brix.
    pub fn sg(&self) -> f64 {
        brix_to_sg(self.brix)
    }

    /// Canonical (SG, liters, kg), or `None` when the authoritative
    /// amount is blank.
    pub fn normalize(&self) -> Option<NormalizedIngredient> {
        let sg = self.sg();
        match self.basis {
            AmountBasis::Weight => {
                let kg = self.weight_unit.to_kg(self.weight?);
                let liters = if sg <= 0.0 { 0.0 } else { kg / sg };
                Some(NormalizedIngredient { sg, liters, kg, secondary: self.secondary })
            }
            AmountBasis::Volume => {
                let liters = self.volume_unit.to_liters(self.volume?);
                let kg = liters * sg;
                Some(NormalizedIngredient { sg, liters, kg, secondary: self.secondary })
            }
        }
    }

    /// User typed a weight: weight becomes authoritative, volume is
    /// rewritten from it.
    pub fn set_weight(&mut self, weight: Option<f64>) {
        self.weight = weight;
        self.basis = AmountBasis::Weight;
        self.sync_derived_side();
    }

    /// User typed a volume: volume becomes authoritative, weight is
    /// rewritten from it.
    pub fn set_volume(&mut self, volume: Option<f64>) {
        self.volume = volume;
        self.basis = AmountBasis::Volume;
        self.sync_derived_side();
    }

    /// Brix edits recompute only the non-authoritative side, so the
    /// amount the user actually typed is preserved exactly.
    pub fn set_brix(&mut self, brix: f64) {
        self.brix = brix;
        self.sync_derived_side();
    }

    /// Changing a unit re-expresses the amount on that side without
    /// changing the physical quantity.
    pub fn set_weight_unit(&mut self, unit: WeightUnit) {
        if let Some(w) = self.weight {
            let kg = self.weight_unit.to_kg(w);
            self.weight = Some(unit.from_kg(kg));
        }
        self.weight_unit = unit;
    }

    pub fn set_volume_unit(&mut self, unit: VolumeUnit) {
        if let Some(v) = self.volume {
            let liters = self.volume_unit.to_liters(v);
            self.volume = Some(unit.from_liters(liters));
        }
        self.volume_unit = unit;
    }

    fn sync_derived_side(&mut self) {
        let sg = self.sg();
        match self.basis {
            AmountBasis::Weight => {
                self.volume = self.weight.map(|w| {
                    let kg = self.weight_unit.to_kg(w);
                    let liters = if sg <= 0.0 { 0.0 } else { kg / sg };
                    self.volume_unit.from_liters(liters)
                });
            }
            AmountBasis::Volume => {
                self.weight = self.volume.map(|v| {
                    let liters = self.volume_unit.to_liters(v);
                    self.weight_unit.from_kg(liters * sg)
                });
            }
        }
    }
}

/* ===========================
Unit tests
=========================== */

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn honey_line() -> IngredientLine {
        let mut line = IngredientLine::new("Honey", WeightUnit::Lb, VolumeUnit::Gal);
        line.brix = 79.6;
        line
    }

    #[test]
    fn test_ten_pounds_of_honey() {
        let mut line = honey_line();
        line.set_weight(Some(10.0));

        let n = line.normalize().unwrap();
        assert_relative_eq!(n.sg, 1.367, epsilon = 1e-4);
        assert_relative_eq!(n.kg, 4.5359237, epsilon = 1e-9);
        assert_relative_eq!(n.liters, 3.32, epsilon = 5e-3);
    }

    #[test]
    fn test_weight_round_trip_through_canonical() {
        let mut line = honey_line();
        line.set_weight(Some(10.0));

        let n = line.normalize().unwrap();
        let back = line.weight_unit.from_kg(n.liters * n.sg);
        assert_relative_eq!(back, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_blank_amount_is_skipped() {
        let line = honey_line();
        assert!(line.normalize().is_none());
    }

    #[test]
    fn test_brix_edit_preserves_authoritative_weight() {
        let mut line = honey_line();
        line.set_weight(Some(10.0));
        let volume_before = line.volume.unwrap();

        line.set_brix(40.0);
        assert_eq!(line.weight, Some(10.0));
        // lower sugar density means more volume for the same weight
        assert!(line.volume.unwrap() > volume_before);
    }

    #[test]
    fn test_volume_basis_derives_weight() {
        let mut line = honey_line();
        line.set_volume(Some(1.0)); // 1 gal of honey

        let n = line.normalize().unwrap();
        assert_relative_eq!(n.liters, 3.785411784, epsilon = 1e-9);
        assert_relative_eq!(n.kg, 3.785411784 * n.sg, epsilon = 1e-9);
        assert_relative_eq!(
            line.weight.unwrap(),
            WeightUnit::Lb.from_kg(n.kg),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_unit_change_preserves_quantity() {
        let mut line = honey_line();
        line.set_weight(Some(10.0));
        line.set_weight_unit(WeightUnit::Kg);
        assert_relative_eq!(line.weight.unwrap(), 4.5359237, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_sg_guards_division() {
        let mut line = IngredientLine::new("Weird", WeightUnit::Kg, VolumeUnit::Liter);
        line.brix = 400.0; // far past the cubic's physical range, SG goes negative
        line.set_weight(Some(1.0));
        let n = line.normalize().unwrap();
        assert_eq!(n.liters, 0.0);
    }
}
