//! The recipe state container and its derived view.
//!
//! One `Recipe` owns the whole editing session: ingredient, additive
//! and note lines, nutrient and stabilizer inputs, unit defaults.
//! Mutation happens through named operations, each running through
//! `commit` so the dirty flag tracks unsaved edits; `hydrate` replaces
//! state wholesale without dirtying. `derive` is the single pure
//! function producing every displayed number from current state.

use serde::{Deserialize, Serialize};

use crate::additive::AdditiveLine;
use crate::error::DocumentError;
use crate::gravity::{Blend, abv, blend, delle};
use crate::ingredient::{AmountBasis, IngredientLine};
use crate::nutrient::{Allocation, NutrientState, allocate, default_yeast_g};
use crate::stabilizer::{StabilizerDoses, StabilizerState, doses};
use crate::units::{VolumeUnit, WeightUnit, sugar_break};
use crate::Provenance;

/// Fermentation phase a note belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Primary,
    Secondary,
}

/// Ordered (note, details) pair attached to a phase.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoteLine {
    pub note: String,
    pub details: String,
    pub phase: Phase,
}

/// Units used for new lines and display.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitDefaults {
    pub weight: WeightUnit,
    pub volume: VolumeUnit,
}

impl Default for UnitDefaults {
    fn default() -> Self {
        UnitDefaults { weight: WeightUnit::Lb, volume: VolumeUnit::Gal }
    }
}

/// Expected dry finish when the user hasn't logged a final gravity.
pub const DEFAULT_FG: f64 = 0.996;

/// One recipe-editing session. Single writer; no interior mutability.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    pub ingredients: Vec<IngredientLine>,
    pub additives: Vec<AdditiveLine>,
    pub notes: Vec<NoteLine>,
    pub nutrients: NutrientState,
    pub stabilizers: StabilizerState,
    pub units: UnitDefaults,
    /// Measured or expected final gravity before backsweetening.
    pub fg: f64,
    #[serde(skip)]
    dirty: bool,
}

impl Default for Recipe {
    fn default() -> Self {
        Recipe {
            name: String::new(),
            ingredients: Vec::new(),
            additives: Vec::new(),
            notes: Vec::new(),
            nutrients: NutrientState::default(),
            stabilizers: StabilizerState::default(),
            units: UnitDefaults::default(),
            fg: DEFAULT_FG,
            dirty: false,
        }
    }
}

impl Recipe {
    /// Fresh session with blank factory state.
    pub fn new(name: impl Into<String>) -> Self {
        Recipe { name: name.into(), ..Default::default() }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    fn commit(&mut self, silent: bool) {
        if !silent {
            self.dirty = true;
        }
    }

    /// Append a blank ingredient line in the session's default units.
    pub fn add_ingredient(&mut self, name: impl Into<String>) -> usize {
        self.ingredients
            .push(IngredientLine::new(name, self.units.weight, self.units.volume));
        self.commit(false);
        self.ingredients.len() - 1
    }

    pub fn remove_ingredient(&mut self, index: usize) {
        if index < self.ingredients.len() {
            self.ingredients.remove(index);
            self.commit(false);
        }
    }

    pub fn move_ingredient(&mut self, from: usize, to: usize) {
        if from < self.ingredients.len() && to < self.ingredients.len() && from != to {
            let line = self.ingredients.remove(from);
            self.ingredients.insert(to, line);
            self.commit(false);
        }
    }

    /// Field-level edit of one ingredient line.
    pub fn edit_ingredient(&mut self, index: usize, f: impl FnOnce(&mut IngredientLine)) {
        if let Some(line) = self.ingredients.get_mut(index) {
            f(line);
            self.commit(false);
        }
    }

    pub fn add_additive(&mut self, name: impl Into<String>) -> usize {
        self.additives.push(AdditiveLine::new(name));
        self.commit(false);
        self.additives.len() - 1
    }

    pub fn remove_additive(&mut self, index: usize) {
        if index < self.additives.len() {
            self.additives.remove(index);
            self.commit(false);
        }
    }

    pub fn edit_additive(&mut self, index: usize, f: impl FnOnce(&mut AdditiveLine)) {
        if let Some(line) = self.additives.get_mut(index) {
            f(line);
            self.commit(false);
        }
    }

    pub fn add_note(&mut self, phase: Phase, note: impl Into<String>, details: impl Into<String>) {
        self.notes.push(NoteLine { note: note.into(), details: details.into(), phase });
        self.commit(false);
    }

    pub fn remove_note(&mut self, index: usize) {
        if index < self.notes.len() {
            self.notes.remove(index);
            self.commit(false);
        }
    }

    pub fn set_fg(&mut self, fg: f64) {
        self.fg = fg;
        self.commit(false);
    }

    pub fn set_units(&mut self, units: UnitDefaults) {
        self.units = units;
        self.commit(false);
    }

    /// Explicit user override of the yeast pitch; stops the default
    /// writeback from touching it.
    pub fn set_yeast_g(&mut self, grams: f64) {
        self.nutrients.yeast_g = grams;
        self.nutrients.yeast_g_provenance = Provenance::UserSet;
        self.commit(false);
    }

    pub fn set_offset_ppm(&mut self, ppm: f64) {
        self.nutrients.offset_ppm = ppm;
        self.nutrients.offset_provenance = Provenance::UserSet;
        self.commit(false);
    }

    pub fn edit_nutrients(&mut self, f: impl FnOnce(&mut NutrientState)) {
        f(&mut self.nutrients);
        self.commit(false);
    }

    /// User-set cap: the schedule presets stop rewriting caps after.
    pub fn set_nutrient_cap(&mut self, index: usize, max_g_l: f64) {
        if let Some(line) = self.nutrients.sources.get_mut(index) {
            line.max_g_l = max_g_l;
            self.nutrients.caps_provenance = Provenance::UserSet;
            self.commit(false);
        }
    }

    pub fn edit_stabilizers(&mut self, f: impl FnOnce(&mut StabilizerState)) {
        f(&mut self.stabilizers);
        self.commit(false);
    }

    /// Rewrite the auto-computed defaults that are still at factory
    /// provenance: yeast pitch from batch size and gravity, nutrient
    /// caps from the schedule presets. Silent, so loading a recipe and
    /// refreshing it doesn't mark the session dirty.
    pub fn refresh_defaults(&mut self) {
        let primary = primary_blend(self);
        if self.nutrients.yeast_g_provenance == Provenance::Default {
            let gallons = VolumeUnit::Gal.from_liters(primary.liters);
            self.nutrients.yeast_g = default_yeast_g(gallons, primary.sg);
        }
        if self.nutrients.caps_provenance == Provenance::Default {
            self.nutrients.apply_schedule_caps(primary.sg);
        }
        self.commit(true);
    }

    /// Replace the whole state from a persisted document. Not a user
    /// edit, so the session starts clean.
    pub fn hydrate(&mut self, document: DocumentV2) {
        *self = document.recipe;
        self.dirty = false;
    }

    pub fn to_document(&self) -> DocumentV2 {
        DocumentV2 { version: SCHEMA_VERSION, recipe: self.clone() }
    }
}

/// Everything the display layer reads, recomputed in one pass.
#[derive(Clone, Debug, PartialEq)]
pub struct Derived {
    pub og: f64,
    pub primary_liters: f64,
    /// Volume including secondary additions.
    pub total_liters: f64,
    /// FG after blending secondary additions into the finished batch.
    pub backsweetened_fg: f64,
    pub abv_percent: f64,
    pub delle: f64,
    pub sugar_break: f64,
    pub nutrients: Allocation,
    pub stabilizers: StabilizerDoses,
}

fn primary_blend(recipe: &Recipe) -> Blend {
    blend(
        recipe
            .ingredients
            .iter()
            .filter(|line| !line.secondary)
            .filter_map(|line| line.normalize())
            .map(|n| (n.sg, n.liters)),
    )
}

/// Derive the full read-only bag from current state. Pure; called after
/// every mutation instead of tracking dependencies implicitly.
pub fn derive(recipe: &Recipe) -> Derived {
    let primary = primary_blend(recipe);

    // secondary lines blend into the batch at its finished gravity
    let finished = blend(
        std::iter::once((recipe.fg, primary.liters)).chain(
            recipe
                .ingredients
                .iter()
                .filter(|line| line.secondary)
                .filter_map(|line| line.normalize())
                .map(|n| (n.sg, n.liters)),
        ),
    );

    let abv_percent = abv(primary.sg, recipe.fg);

    Derived {
        og: primary.sg,
        primary_liters: primary.liters,
        total_liters: finished.liters,
        backsweetened_fg: finished.sg,
        abv_percent,
        delle: delle(finished.sg, abv_percent),
        sugar_break: sugar_break(primary.sg),
        nutrients: allocate(&recipe.nutrients, primary.sg, primary.liters),
        stabilizers: doses(&recipe.stabilizers, finished.liters, abv_percent),
    }
}

/* ===========================
Persistence schema
=========================== */

/// Current document schema version.
pub const SCHEMA_VERSION: u32 = 2;

/// Version-2 document: the recipe state verbatim.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentV2 {
    pub version: u32,
    pub recipe: Recipe,
}

/// Version-1 document, as the legacy builder saved it: flat fields,
/// string-typed amounts (blank means "no value"), unit names as text,
/// ad hoc touched booleans.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentV1 {
    pub version: u32,
    pub name: String,
    pub weight_unit: String,
    pub volume_unit: String,
    pub ingredients: Vec<IngredientV1>,
    #[serde(default)]
    pub fg: String,
    #[serde(default)]
    pub yeast_amount: String,
    #[serde(default)]
    pub yeast_touched: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IngredientV1 {
    pub name: String,
    pub brix: f64,
    pub amount: String,
    pub amount_is_volume: bool,
    #[serde(default)]
    pub secondary: bool,
}

fn parse_amount(s: &str) -> Option<f64> {
    // blank or garbage degrades to "no value", never an error
    let s = s.trim();
    if s.is_empty() { None } else { s.parse().ok() }
}

/// Migrate a legacy document into the current schema. Unit names must
/// still parse; everything else degrades the way the engine does.
pub fn migrate_v1(doc: DocumentV1) -> Result<DocumentV2, DocumentError> {
    let weight: WeightUnit = doc.weight_unit.parse()?;
    let volume: VolumeUnit = doc.volume_unit.parse()?;

    let mut recipe = Recipe::new(doc.name);
    recipe.units = UnitDefaults { weight, volume };
    recipe.fg = parse_amount(&doc.fg).unwrap_or(DEFAULT_FG);

    for v1 in doc.ingredients {
        let mut line = IngredientLine::new(v1.name, weight, volume);
        line.secondary = v1.secondary;
        if v1.amount_is_volume {
            line.basis = AmountBasis::Volume;
            line.volume = parse_amount(&v1.amount);
        } else {
            line.basis = AmountBasis::Weight;
            line.weight = parse_amount(&v1.amount);
        }
        line.set_brix(v1.brix); // resync the derived side
        recipe.ingredients.push(line);
    }

    if doc.yeast_touched {
        if let Some(grams) = parse_amount(&doc.yeast_amount) {
            recipe.nutrients.yeast_g = grams;
            recipe.nutrients.yeast_g_provenance = Provenance::UserSet;
        }
    }

    recipe.refresh_defaults();
    Ok(recipe.to_document())
}

/* ===========================
Unit tests
=========================== */
