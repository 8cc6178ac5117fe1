//! Plain-Rust halves of the bindings. Errors stay `String` here and become
//! `JsValue` at the boundary, so these run under native `cargo test`.

use visuallie::api::{interleave, Selection};
use visuallie::parabola::fit_parabola_to_depth;
use visuallie::plot::{LevelTables, PlotCfg};
use visuallie::rootsystem::parse_table;
use visuallie::{OrbitKind, Root};

pub fn kind_from_flag(translation: bool) -> OrbitKind {
    if translation {
        OrbitKind::Translation
    } else {
        OrbitKind::Full
    }
}

/// Parabola of `(level, r0, r1)` fitted down to `max_depth`, interleaved.
pub fn parabola_xy(level: i64, r0: i64, r1: i64, max_depth: i64) -> Result<Vec<f64>, String> {
    fit_parabola_to_depth(Root::new(level, r0, r1), level, max_depth)
        .map(|p| interleave(&p.samples))
        .map_err(|e| e.to_string())
}

pub fn tables_from_text(text: &str) -> Result<LevelTables, String> {
    let entries = parse_table(text).map_err(|e| e.to_string())?;
    Ok(LevelTables::from_entries(&entries, PlotCfg::default()))
}

/// Multiplicities of one level as JS numbers; exact up to 2^53.
pub fn level_mults(tables: &LevelTables, level: i64) -> Vec<f64> {
    tables
        .get(level)
        .map(|t| t.mults.iter().map(|&m| m as f64).collect())
        .unwrap_or_default()
}

/// Selection for the root tapped at `index` on `level`; `active` is the radio
/// index (0 = full, 1 = translation).
pub fn tap(
    tables: &LevelTables,
    level: i64,
    index: usize,
    active: usize,
) -> Result<Selection, String> {
    let kind = OrbitKind::try_from(active).map_err(|e| e.to_string())?;
    tables
        .tap(level, index, kind)
        .ok_or_else(|| format!("no root at level {level}, index {index}"))?
        .map_err(|e| e.to_string())
}
