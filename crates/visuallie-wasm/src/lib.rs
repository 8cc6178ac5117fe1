//! wasm-bindgen surface for the root plot page.
//!
//! Notes
//! - Keep bindings thin: numbers in, flat `Vec<f64>` out, points interleaved
//!   as `x0, y0, x1, y1, ...`.
//! - Conversions and error text live in `common` so they can be tested natively.

use wasm_bindgen::prelude::*;

use visuallie::api::{interleave, OrbitCfg};
use visuallie::plot::LevelTables;
use visuallie::Root;

mod common;

fn to_js(err: String) -> JsValue {
    JsValue::from_str(&err)
}

/// Orbit points of `(level, r0, r1)`, interleaved.
#[wasm_bindgen]
pub fn orbit_points(
    level: i64,
    r0: i64,
    r1: i64,
    translation: bool,
    max_depth: i64,
) -> Result<Vec<f64>, JsValue> {
    let kind = common::kind_from_flag(translation);
    visuallie::orbit::try_orbit(Root::new(level, r0, r1), kind, OrbitCfg { max_depth })
        .map(|o| interleave(&o.points()))
        .map_err(|e| to_js(e.to_string()))
}

/// Parabola samples for `(level, r0, r1)` on its own level down to
/// `max_depth`, interleaved. Pass the same bound as to `orbit_points`.
#[wasm_bindgen]
pub fn parabola(level: i64, r0: i64, r1: i64, max_depth: i64) -> Result<Vec<f64>, JsValue> {
    common::parabola_xy(level, r0, r1, max_depth).map_err(to_js)
}

/// Plot tables loaded from `roots.txt` contents.
#[wasm_bindgen]
pub struct RootPlot {
    tables: LevelTables,
}

#[wasm_bindgen]
impl RootPlot {
    #[wasm_bindgen(constructor)]
    pub fn new(roots_txt: &str) -> Result<RootPlot, JsValue> {
        let tables = common::tables_from_text(roots_txt).map_err(to_js)?;
        Ok(RootPlot { tables })
    }

    pub fn max_level(&self) -> i64 {
        self.tables.cfg.max_level
    }

    /// Plot points of one level, interleaved. Empty outside `1..=max_level`.
    pub fn points(&self, level: i64) -> Vec<f64> {
        self.tables
            .get(level)
            .map(|t| interleave(&t.points))
            .unwrap_or_default()
    }

    /// Multiplicities of one level, exact up to 2^53.
    pub fn mults(&self, level: i64) -> Vec<f64> {
        common::level_mults(&self.tables, level)
    }

    /// Orbit points for the root tapped at `index` on `level`; `active` is the
    /// radio index (0 = full, 1 = translation).
    pub fn tap_orbit(&self, level: i64, index: usize, active: usize) -> Result<Vec<f64>, JsValue> {
        let sel = common::tap(&self.tables, level, index, active).map_err(to_js)?;
        Ok(interleave(&sel.points))
    }

    /// Parabola for the tapped root, or an empty array when there is none.
    pub fn tap_parabola(
        &self,
        level: i64,
        index: usize,
        active: usize,
    ) -> Result<Vec<f64>, JsValue> {
        let sel = common::tap(&self.tables, level, index, active).map_err(to_js)?;
        Ok(sel
            .parabola
            .map(|p| interleave(&p.samples))
            .unwrap_or_default())
    }
}
