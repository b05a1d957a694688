use anyhow::{Context, bail};
use chrono::Local;
use clap::{Parser, ValueEnum};
use comfy_table::{Attribute, Cell, ContentArrangement, Table, presets::UTF8_FULL};
use mazer_core::{
    Derived, DocumentError, DocumentV1, DocumentV2, GoFerm, NitrogenRequirement, Phase, Recipe,
    SCHEMA_VERSION, SOURCE_ORDER, SulfiteSalt, VolumeUnit, WeightUnit, backsweeten_liters,
    brix_to_sg, derive, honey_water_split, migrate_v1,
};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

/// Nitrogen demand mirrors mazer-core (derive for Clap).
#[derive(Copy, Clone, Debug, PartialEq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum DemandFlag {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl From<DemandFlag> for NitrogenRequirement {
    fn from(d: DemandFlag) -> Self {
        match d {
            DemandFlag::VeryLow => NitrogenRequirement::VeryLow,
            DemandFlag::Low => NitrogenRequirement::Low,
            DemandFlag::Medium => NitrogenRequirement::Medium,
            DemandFlag::High => NitrogenRequirement::High,
            DemandFlag::VeryHigh => NitrogenRequirement::VeryHigh,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum GoFermFlag {
    None,
    Classic,
    Protect,
    SterolFlash,
}

impl From<GoFermFlag> for GoFerm {
    fn from(g: GoFermFlag) -> Self {
        match g {
            GoFermFlag::None => GoFerm::None,
            GoFermFlag::Classic => GoFerm::Classic,
            GoFermFlag::Protect => GoFerm::Protect,
            GoFermFlag::SterolFlash => GoFerm::SterolFlash,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum SaltFlag {
    Potassium,
    Sodium,
}

impl From<SaltFlag> for SulfiteSalt {
    fn from(s: SaltFlag) -> Self {
        match s {
            SaltFlag::Potassium => SulfiteSalt::Potassium,
            SaltFlag::Sodium => SulfiteSalt::Sodium,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "mazer-cli",
    about = "Calculate a mead recipe sheet: gravity, ABV, nutrients, stabilizers.",
    version
)]
struct Args {
    /// Recipe name
    #[arg(long, default_value = "Traditional mead")]
    name: String,

    /// Honey weight in lb (ignored when --target-og is set)
    #[arg(long, default_value_t = 12.0)]
    honey_lb: f64,

    /// Honey sugar density in Brix
    #[arg(long, default_value_t = 79.6)]
    brix: f64,

    /// Water volume in US gallons (ignored when --target-og is set)
    #[arg(long, default_value_t = 4.0)]
    water_gal: f64,

    /// Expected/measured final gravity
    #[arg(long, default_value_t = 0.996)]
    fg: f64,

    /// Yeast nitrogen demand
    #[arg(long, value_enum, default_value_t = DemandFlag::Medium)]
    demand: DemandFlag,

    /// Rehydration nutrient
    #[arg(long, value_enum, default_value_t = GoFermFlag::Classic)]
    go_ferm: GoFermFlag,

    /// Number of split nutrient additions
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=4))]
    additions: u8,

    /// Override the yeast pitch in grams (default is sized from the batch)
    #[arg(long)]
    yeast_g: Option<f64>,

    /// YAN already present in the must, ppm
    #[arg(long, default_value_t = 0.0)]
    offset: f64,

    /// Compute stabilizer doses
    #[arg(long, default_value_t = false)]
    stabilize: bool,

    /// Measured must pH (stabilizers assume 3.6 without it)
    #[arg(long)]
    ph: Option<f64>,

    /// Metabisulfite salt
    #[arg(long, value_enum, default_value_t = SaltFlag::Potassium)]
    salt: SaltFlag,

    /// Solve honey/water amounts for this OG instead of using
    /// --honey-lb/--water-gal
    #[arg(long)]
    target_og: Option<f64>,

    /// Batch volume in US gallons for --target-og
    #[arg(long, default_value_t = 5.0)]
    target_vol_gal: f64,

    /// Solve a backsweetening honey addition to hit this final gravity
    #[arg(long)]
    sweeten_to: Option<f64>,

    /// Load a recipe document JSON before applying CLI overrides
    #[arg(long)]
    recipe: Option<PathBuf>,

    /// Save the effective recipe document JSON
    #[arg(long)]
    save: Option<PathBuf>,
}

/// Load a recipe document, migrating legacy schema versions.
fn load_recipe(path: &PathBuf) -> anyhow::Result<Recipe> {
    let txt = fs::read_to_string(path)
        .with_context(|| format!("failed to read recipe {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&txt)
        .with_context(|| format!("invalid recipe JSON: {}", path.display()))?;
    let version = value.get("version").and_then(|v| v.as_u64()).unwrap_or(0) as u32;

    let document: DocumentV2 = match version {
        1 => {
            let v1: DocumentV1 = serde_json::from_value(value)
                .with_context(|| format!("malformed v1 recipe: {}", path.display()))?;
            migrate_v1(v1)?
        }
        2 => serde_json::from_value(value)
            .with_context(|| format!("malformed v2 recipe: {}", path.display()))?,
        other => return Err(DocumentError::UnsupportedVersion(other).into()),
    };

    let mut recipe = Recipe::default();
    recipe.hydrate(document);
    Ok(recipe)
}

/// Build a fresh honey-and-water recipe from the quick-batch flags.
fn build_recipe(args: &Args) -> anyhow::Result<Recipe> {
    let mut recipe = Recipe::new(args.name.clone());

    let (honey_lb, water_gal) = if let Some(og) = args.target_og {
        let liters = VolumeUnit::Gal.to_liters(args.target_vol_gal);
        let split = honey_water_split(og, liters, args.brix).with_context(|| {
            format!(
                "cannot hit OG {og:.3} at {:.2} gal with {:.1} Bx honey",
                args.target_vol_gal, args.brix
            )
        })?;
        let honey_kg = split.honey_liters * brix_to_sg(args.brix);
        (
            WeightUnit::Lb.from_kg(honey_kg),
            VolumeUnit::Gal.from_liters(split.water_liters),
        )
    } else {
        (args.honey_lb, args.water_gal)
    };

    let honey = recipe.add_ingredient("Honey");
    let brix = args.brix;
    recipe.edit_ingredient(honey, |line| {
        line.set_brix(brix);
        line.set_weight(Some(honey_lb));
    });
    let water = recipe.add_ingredient("Water");
    recipe.edit_ingredient(water, |line| {
        line.set_volume(Some(water_gal));
    });
    Ok(recipe)
}

/// Apply CLI flags on top of the recipe (CLI wins). A defaults snapshot
/// detects which flags were actually given, so loading a document with
/// bare flags keeps its saved values.
fn apply_overrides(recipe: &mut Recipe, args: &Args) {
    let def = Args::parse_from(["mazer-cli"]);

    macro_rules! given {
        ($field:ident) => {
            args.$field != def.$field
        };
    }

    if given!(fg) {
        recipe.set_fg(args.fg);
    }
    recipe.edit_nutrients(|n| {
        if given!(demand) {
            n.requirement = args.demand.into();
        }
        if given!(go_ferm) {
            n.go_ferm = args.go_ferm.into();
        }
        if given!(additions) {
            n.additions = args.additions;
        }
    });
    if args.offset != 0.0 {
        recipe.set_offset_ppm(args.offset);
    }
    if let Some(grams) = args.yeast_g {
        recipe.set_yeast_g(grams);
    }
    recipe.edit_stabilizers(|s| {
        if args.stabilize {
            s.adding = true;
        }
        if let Some(ph) = args.ph {
            s.tracking_ph = true;
            s.ph_reading = ph;
        }
        if given!(salt) {
            s.salt = args.salt.into();
        }
    });
}

/// Size a secondary honey addition so the finished blend lands on
/// `target_fg`. Solves from the current finished state, so additions
/// already on the recipe are counted.
fn add_backsweetening(recipe: &mut Recipe, target_fg: f64, brix: f64) -> Option<f64> {
    let before = derive(recipe);
    let liters = backsweeten_liters(
        before.backsweetened_fg,
        before.total_liters,
        target_fg,
        brix_to_sg(brix),
    )?;
    let idx = recipe.add_ingredient("Backsweetening honey");
    recipe.edit_ingredient(idx, |line| {
        line.secondary = true;
        line.set_brix(brix);
        line.set_volume(Some(VolumeUnit::Gal.from_liters(liters)));
    });
    Some(liters)
}

fn fmt_g(x: f64) -> String {
    let v = (x * 10.0).round() / 10.0;
    if (v - v.round()).abs() < 1e-9 {
        format!("{:.0} g", v)
    } else {
        format!("{:.1} g", v)
    }
}

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
                .collect::<Vec<_>>(),
        );
    table
}

fn print_ingredients(recipe: &Recipe) {
    let mut table = new_table(&["Ingredient", "Amount", "Volume", "SG", "Stage"]);
    for line in &recipe.ingredients {
        let amount = match line.weight {
            Some(w) => format!("{:.2} {}", w, line.weight_unit),
            None => "-".to_string(),
        };
        let volume = match line.volume {
            Some(v) => format!("{:.2} {}", v, line.volume_unit),
            None => "-".to_string(),
        };
        table.add_row(vec![
            Cell::new(&line.name),
            Cell::new(amount),
            Cell::new(volume),
            Cell::new(format!("{:.3}", line.sg())),
            Cell::new(if line.secondary { "secondary" } else { "primary" }),
        ]);
    }
    println!("\n=== Ingredients ===");
    println!("{table}");
}

fn print_additives(recipe: &Recipe) {
    if recipe.additives.is_empty() {
        return;
    }
    let mut table = new_table(&["Additive", "Amount"]);
    for line in &recipe.additives {
        let amount = match line.amount {
            Some(a) => format!("{:.2} {}", a, line.unit.label()),
            None => "-".to_string(),
        };
        table.add_row(vec![Cell::new(&line.name), Cell::new(amount)]);
    }
    println!("\n=== Additives ===");
    println!("{table}");
}

fn print_notes(recipe: &Recipe) {
    if recipe.notes.is_empty() {
        return;
    }
    println!("\n=== Notes ===");
    for note in &recipe.notes {
        let phase = match note.phase {
            Phase::Primary => "primary",
            Phase::Secondary => "secondary",
        };
        if note.details.is_empty() {
            println!("[{phase}] {}", note.note);
        } else {
            println!("[{phase}] {}: {}", note.note, note.details);
        }
    }
}

fn print_summary(recipe: &Recipe, derived: &Derived) {
    let gal = |liters: f64| VolumeUnit::Gal.from_liters(liters);
    let mut table = new_table(&["Quantity", "Value"]);
    table.add_row(vec![
        Cell::new("Original gravity"),
        Cell::new(format!("{:.3}", derived.og)),
    ]);
    table.add_row(vec![
        Cell::new("Final gravity"),
        Cell::new(format!("{:.3}", recipe.fg)),
    ]);
    if (derived.backsweetened_fg - recipe.fg).abs() > 5e-4 {
        table.add_row(vec![
            Cell::new("Backsweetened FG"),
            Cell::new(format!("{:.3}", derived.backsweetened_fg)),
        ]);
    }
    table.add_row(vec![
        Cell::new("ABV"),
        Cell::new(format!("{:.1} %", derived.abv_percent)),
    ]);
    table.add_row(vec![
        Cell::new("Delle units"),
        Cell::new(format!("{:.0}", derived.delle)),
    ]);
    table.add_row(vec![
        Cell::new("1/3 sugar break"),
        Cell::new(format!("{:.3}", derived.sugar_break)),
    ]);
    table.add_row(vec![
        Cell::new("Primary volume"),
        Cell::new(format!(
            "{:.2} gal ({:.1} L)",
            gal(derived.primary_liters),
            derived.primary_liters
        )),
    ]);
    if derived.total_liters > derived.primary_liters {
        table.add_row(vec![
            Cell::new("Total volume"),
            Cell::new(format!(
                "{:.2} gal ({:.1} L)",
                gal(derived.total_liters),
                derived.total_liters
            )),
        ]);
    }
    println!("\n=== Batch summary ===");
    println!("{table}");
}

fn print_nutrients(recipe: &Recipe, derived: &Derived) {
    let a = &derived.nutrients;
    println!("\n=== Nutrients — {} ===", recipe.nutrients.schedule().label());
    println!(
        "Target YAN: {:.0} ppm | yeast {} | Go-Ferm {} + {:.0} mL water",
        a.target_yan_ppm,
        fmt_g(recipe.nutrients.yeast_g),
        fmt_g(a.go_ferm_g),
        a.go_ferm_water_ml,
    );

    let mut table = new_table(&["Source", "YAN (ppm)", "Total", "Per addition"]);
    for source in SOURCE_ORDER {
        let i = source.index();
        if !recipe.nutrients.sources[i].enabled {
            continue;
        }
        table.add_row(vec![
            Cell::new(source.label()),
            Cell::new(format!("{:.0}", a.ppm[i])),
            Cell::new(fmt_g(a.grams[i])),
            Cell::new(format!(
                "{} × {}",
                recipe.nutrients.additions,
                fmt_g(a.grams_per_addition[i])
            )),
        ]);
    }
    println!("{table}");

    if a.remaining_yan_ppm > 0.5 {
        println!(
            "Warning: {:.0} ppm YAN not covered by the enabled sources.",
            a.remaining_yan_ppm
        );
    } else if a.remaining_yan_ppm < -0.5 {
        println!(
            "Warning: doses exceed the YAN target by {:.0} ppm.",
            -a.remaining_yan_ppm
        );
    }
}

fn print_stabilizers(derived: &Derived) {
    let d = &derived.stabilizers;
    let mut table = new_table(&["Stabilizer", "Amount"]);
    table.add_row(vec![
        Cell::new("Potassium sorbate"),
        Cell::new(fmt_g(d.sorbate_g)),
    ]);
    table.add_row(vec![Cell::new("Metabisulfite"), Cell::new(fmt_g(d.sulfite_g))]);
    table.add_row(vec![
        Cell::new("Campden (alternative)"),
        Cell::new(format!("{:.1} tablets", d.campden_tablets)),
    ]);
    println!(
        "\n=== Stabilizers (target {:.0} ppm free SO2) ===",
        d.target_ppm
    );
    println!("{table}");
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.fg <= 0.0 {
        bail!("fg must be > 0");
    }
    if args.honey_lb < 0.0 || args.water_gal < 0.0 {
        bail!("honey-lb and water-gal must be >= 0");
    }

    let mut recipe = match &args.recipe {
        Some(path) => load_recipe(path)?,
        None => build_recipe(&args)?,
    };
    apply_overrides(&mut recipe, &args);

    // Backsweetening solver: size a secondary honey addition for the
    // requested finished gravity.
    if let Some(target_fg) = args.sweeten_to {
        if add_backsweetening(&mut recipe, target_fg, args.brix).is_none() {
            bail!(
                "cannot backsweeten to {target_fg:.3} with {:.1} Bx honey",
                args.brix
            );
        }
    }

    recipe.refresh_defaults();
    let derived = derive(&recipe);

    println!(
        "\n{} — sheet generated {}",
        recipe.name,
        Local::now().format("%Y-%m-%d %H:%M")
    );
    print_ingredients(&recipe);
    print_additives(&recipe);
    print_summary(&recipe, &derived);
    print_nutrients(&recipe, &derived);
    if derived.stabilizers != Default::default() {
        print_stabilizers(&derived);
    }
    print_notes(&recipe);

    if let Some(path) = &args.save {
        let doc = recipe.to_document();
        debug_assert_eq!(doc.version, SCHEMA_VERSION);
        fs::write(path, serde_json::to_string_pretty(&doc)?)
            .with_context(|| format!("failed to save recipe {}", path.display()))?;
        recipe.mark_saved();
        println!("\nRecipe saved to {}", path.display());
    }

    Ok(())
}

/* ===========================
Unit tests
=========================== */

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// A recipe as a loaded document would carry it: non-default FG,
    /// demand, additions, and stabilizers.
    fn saved_recipe() -> Recipe {
        let mut recipe = Recipe::new("Saved");
        let idx = recipe.add_ingredient("Honey");
        recipe.edit_ingredient(idx, |line| {
            line.set_brix(79.6);
            line.set_weight(Some(12.0));
        });
        let idx = recipe.add_ingredient("Water");
        recipe.edit_ingredient(idx, |line| line.set_volume(Some(4.0)));
        recipe.set_fg(1.004);
        recipe.edit_nutrients(|n| {
            n.requirement = NitrogenRequirement::High;
            n.additions = 3;
        });
        recipe.edit_stabilizers(|s| s.adding = true);
        recipe
    }

    #[test]
    fn test_bare_flags_keep_loaded_values() {
        let mut recipe = saved_recipe();
        let args = Args::parse_from(["mazer-cli"]);
        apply_overrides(&mut recipe, &args);

        assert_eq!(recipe.fg, 1.004);
        assert_eq!(recipe.nutrients.requirement, NitrogenRequirement::High);
        assert_eq!(recipe.nutrients.additions, 3);
        assert!(recipe.stabilizers.adding);
    }

    #[test]
    fn test_given_flags_override_loaded_values() {
        let mut recipe = saved_recipe();
        let args = Args::parse_from(["mazer-cli", "--fg", "0.998", "--demand", "very-high"]);
        apply_overrides(&mut recipe, &args);

        assert_eq!(recipe.fg, 0.998);
        assert_eq!(recipe.nutrients.requirement, NitrogenRequirement::VeryHigh);
        // flags not given keep the loaded values
        assert_eq!(recipe.nutrients.additions, 3);
        assert!(recipe.stabilizers.adding);
    }

    #[test]
    fn test_backsweetening_counts_prior_additions() {
        let mut recipe = saved_recipe();
        recipe.set_fg(0.996);
        add_backsweetening(&mut recipe, 1.005, 79.6).unwrap();
        add_backsweetening(&mut recipe, 1.010, 79.6).unwrap();

        let d = derive(&recipe);
        assert_relative_eq!(d.backsweetened_fg, 1.010, epsilon = 1e-9);
    }
}
