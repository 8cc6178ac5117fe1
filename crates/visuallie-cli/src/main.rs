use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use polars::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::fmt::SubscriberBuilder;
use visuallie::cfg::{DEFAULT_HEIGHT, MAX_DEPTH};
use visuallie::orbit::{select, OrbitCfg, OrbitKind};
use visuallie::rootsystem::{write_table, RootSystem};
use visuallie::Root;

mod provenance;

use provenance::Payload;

#[derive(Parser)]
#[command(name = "visuallie")]
#[command(about = "Root tables and Weyl orbits of the Feingold-Frenkel algebra")]
struct Cmd {
    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand)]
enum Action {
    /// Construct positive roots up to HEIGHT and write the root table
    Construct {
        #[arg(default_value_t = DEFAULT_HEIGHT, value_parser = parse_height)]
        height: usize,
        #[arg(long, default_value = "data/roots.txt")]
        out: String,
    },
    /// Print the orbit of one root with its parabola as JSON
    Orbit {
        #[arg(long)]
        level: i64,
        #[arg(long, allow_negative_numbers = true)]
        r0: i64,
        #[arg(long, allow_negative_numbers = true)]
        r1: i64,
        /// Use the translation generators instead of the simple reflections
        #[arg(long)]
        translation: bool,
        #[arg(long, default_value_t = MAX_DEPTH)]
        max_depth: i64,
        /// Also write the JSON to this path, with a provenance sidecar
        #[arg(long)]
        out: Option<String>,
    },
    /// Read a root table and log row and per-level counts
    Summary {
        #[arg(long, default_value = "data/roots.txt")]
        input: String,
        /// Also write the JSON to this path, with a provenance sidecar
        #[arg(long)]
        out: Option<String>,
    },
    /// Print a small provenance JSON block
    Report,
}

fn main() -> Result<()> {
    SubscriberBuilder::default().with_target(false).init();
    let cmd = Cmd::parse();
    match cmd.action {
        Action::Construct { height, out } => construct(height, &out).map(|_| ()),
        Action::Orbit {
            level,
            r0,
            r1,
            translation,
            max_depth,
            out,
        } => {
            let kind = if translation {
                OrbitKind::Translation
            } else {
                OrbitKind::Full
            };
            let report = orbit_report(Root::new(level, r0, r1), kind, max_depth)?;
            let text = serde_json::to_string_pretty(&report)?;
            println!("{text}");
            if let Some(out) = out {
                let params = serde_json::json!({
                    "seed": report.seed,
                    "kind": report.kind,
                    "max_depth": report.max_depth
                });
                write_json(&out, &text, Payload::new(params))?;
            }
            Ok(())
        }
        Action::Summary { input, out } => summary(&input, out.as_deref()),
        Action::Report => report(),
    }
}

fn parse_height(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("height must be positive".to_string()),
        Ok(h) => Ok(h),
        Err(e) => Err(format!("invalid height {s:?}: {e}")),
    }
}

/// Build the root system up to `height`, write the table to `out` and its
/// provenance next to it. Returns the table path.
fn construct(height: usize, out: &str) -> Result<PathBuf> {
    tracing::info!(height, out, "construct");
    let start = Instant::now();
    let rs = RootSystem::up_to(height).with_context(|| format!("constructing to height {height}"))?;
    let entries = rs.entries();
    tracing::info!(
        roots = entries.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "root_system_constructed"
    );
    let out_path = Path::new(out);
    write_table(out_path, &entries).with_context(|| format!("writing {out}"))?;
    provenance::write_sidecar(
        out_path,
        Payload::new(serde_json::json!({
            "height": height,
            "roots": entries.len()
        })),
    )?;
    Ok(out_path.to_path_buf())
}

#[derive(Debug, Serialize)]
struct OrbitReport {
    seed: [i64; 3],
    kind: &'static str,
    max_depth: i64,
    orbit: Vec<[i64; 3]>,
    points: Vec<[f64; 2]>,
    parabola: Option<Vec<[f64; 2]>>,
    parabola_error: Option<String>,
}

fn orbit_report(seed: Root, kind: OrbitKind, max_depth: i64) -> Result<OrbitReport> {
    let sel = select(seed, kind, OrbitCfg { max_depth })?;
    tracing::info!(%seed, %kind, max_depth, size = sel.orbit.len(), "orbit");
    let (parabola, parabola_error) = match &sel.parabola {
        Ok(p) => (Some(p.samples.iter().map(|v| [v.x, v.y]).collect()), None),
        Err(e) => (None, Some(e.to_string())),
    };
    Ok(OrbitReport {
        seed: seed.to_array(),
        kind: kind.as_str(),
        max_depth,
        orbit: sel.orbit.iter().map(|r| r.to_array()).collect(),
        points: sel.points.iter().map(|v| [v.x, v.y]).collect(),
        parabola,
        parabola_error,
    })
}

/// Write `text` to `out` (creating parent dirs) and its provenance sidecar.
fn write_json(out: &str, text: &str, payload: Payload) -> Result<PathBuf> {
    let out_path = Path::new(out);
    if let Some(parent) = out_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    std::fs::write(out_path, text).with_context(|| format!("writing {out}"))?;
    provenance::write_sidecar(out_path, payload)
}

/// Number of table rows per level. Columns of the headerless table come in as
/// `column_1..column_4` = level, r0, r1, mult.
fn level_counts(input: &str) -> Result<(usize, BTreeMap<i64, usize>)> {
    let lf = LazyCsvReader::new(input)
        .with_has_header(false)
        .with_infer_schema_length(Some(100))
        .finish()?;
    let df = lf.collect()?;
    tracing::info!(rows = df.height(), cols = df.width(), "root_table_shape");
    let mut counts = BTreeMap::new();
    for level in df.column("column_1")?.i64()?.into_iter().flatten() {
        *counts.entry(level).or_insert(0usize) += 1;
    }
    Ok((df.height(), counts))
}

fn summary(input: &str, out: Option<&str>) -> Result<()> {
    let (rows, counts) = level_counts(input).with_context(|| format!("reading {input}"))?;
    for (level, count) in &counts {
        tracing::info!(level, count, "roots_per_level");
    }
    let obj = serde_json::json!({
        "input": input,
        "rows": rows,
        "per_level": counts
    });
    let text = serde_json::to_string_pretty(&obj)?;
    println!("{text}");
    if let Some(out) = out {
        let payload = Payload::new(serde_json::json!({ "rows": rows })).with_input(input);
        write_json(out, &text, payload)?;
    }
    Ok(())
}

fn report() -> Result<()> {
    let obj = serde_json::json!({
        "code_rev": provenance::current_git_rev(),
        "visuallie": visuallie::VERSION,
        "defaults": {
            "height": DEFAULT_HEIGHT,
            "max_depth": MAX_DEPTH
        }
    });
    println!("{}", serde_json::to_string_pretty(&obj)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use visuallie::rootsystem::read_table;

    #[test]
    fn height_must_be_positive() {
        assert_eq!(parse_height("12"), Ok(12));
        assert!(parse_height("0").is_err());
        assert!(parse_height("-3").is_err());
        assert!(parse_height("abc").is_err());
    }

    #[test]
    fn cli_parses_orbit_with_negative_coordinates() {
        let cmd = Cmd::try_parse_from([
            "visuallie", "orbit", "--level", "3", "--r0", "1", "--r1", "-1", "--translation",
        ])
        .unwrap();
        match cmd.action {
            Action::Orbit {
                level,
                r1,
                translation,
                max_depth,
                ..
            } => {
                assert_eq!((level, r1), (3, -1));
                assert!(translation);
                assert_eq!(max_depth, MAX_DEPTH);
            }
            _ => panic!("expected orbit"),
        }
    }

    #[test]
    fn orbit_report_of_level_one_root() {
        let report = orbit_report(Root::new(1, 0, 0), OrbitKind::Full, 4).unwrap();
        assert_eq!(report.kind, "full");
        assert_eq!(
            report.orbit,
            vec![[1, 0, 0], [1, 1, 0], [1, 1, 2], [1, 4, 2], [1, 4, 6]]
        );
        assert_eq!(report.points.len(), 5);
        assert_eq!(report.points[0], [0.0, 0.0]);
        assert_eq!(report.parabola.as_ref().map(Vec::len), Some(100));
        assert!(report.parabola_error.is_none());
    }

    #[test]
    fn orbit_report_keeps_orbit_without_parabola() {
        let report = orbit_report(Root::new(1, 40, 40), OrbitKind::Full, 30).unwrap();
        assert_eq!(report.orbit, vec![[1, 40, 40]]);
        assert!(report.parabola.is_none());
        assert!(report.parabola_error.is_some());
        assert!(orbit_report(Root::new(0, 1, 1), OrbitKind::Full, 30).is_err());
    }

    #[test]
    fn construct_writes_table_and_sidecar() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("data").join("roots.txt");
        let path = construct(6, out.to_str().unwrap()).unwrap();
        let entries = read_table(&path).unwrap();
        assert_eq!(entries, RootSystem::up_to(6).unwrap().entries());
        assert!(dir.path().join("data").join("roots.provenance.json").exists());
    }

    #[test]
    fn summary_counts_levels() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("roots.txt");
        std::fs::write(&path, "0,0,1,1\n0,1,0,1\n1,0,0,1\n1,1,0,1\n2,3,3,1\n").unwrap();
        let (rows, counts) = level_counts(path.to_str().unwrap()).unwrap();
        assert_eq!(rows, 5);
        assert_eq!(counts.get(&0), Some(&2));
        assert_eq!(counts.get(&1), Some(&2));
        assert_eq!(counts.get(&2), Some(&1));
    }

    #[test]
    fn orbit_json_written_with_sidecar() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("orbit.json");
        let report = orbit_report(Root::new(1, 1, 0), OrbitKind::Translation, 4).unwrap();
        let text = serde_json::to_string(&report).unwrap();
        let params = serde_json::json!({ "kind": report.kind });
        write_json(out.to_str().unwrap(), &text, Payload::new(params)).unwrap();
        let parsed: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&out).unwrap()).unwrap();
        assert_eq!(parsed["kind"], "translation");
        assert!(dir.path().join("orbit.provenance.json").exists());
    }

    #[test]
    fn summary_sidecar_records_its_input() {
        let dir = tempdir().unwrap();
        let table = dir.path().join("roots.txt");
        std::fs::write(&table, "1,0,0,1\n1,1,0,1\n2,3,3,1\n").unwrap();
        let input = table.to_str().unwrap();
        let out = dir.path().join("reports").join("summary.json");
        summary(input, Some(out.to_str().unwrap())).unwrap();
        let written: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&out).unwrap()).unwrap();
        assert_eq!(written["rows"], 3);
        assert_eq!(written["per_level"]["1"], 2);
        let sidecar = dir.path().join("reports").join("summary.provenance.json");
        let prov: serde_json::Value =
            serde_json::from_slice(&std::fs::read(sidecar).unwrap()).unwrap();
        assert_eq!(prov["inputs"], serde_json::json!([input]));
        assert_eq!(prov["params"]["rows"], 3);
    }
}
