//! Runs every `fixtures/*.json` case through both fold strategies.
//!
//! A fixture is `{ "description", "samples": [...], "expected": {...} }` or,
//! for malformed inputs, `"error": "<kind>"` in place of `expected`.
//! Usage: `dev-test-runner [NAME_REGEX]`
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use shape_merge::fold::{merge_all, merge_all_parallel, parse_checked};
use shape_merge::path_de::from_str_with_path;
use shape_merge::{Result as ShapeResult, SchemaNode};

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct Fixture {
    #[serde(default)]
    description: String,
    samples: Vec<Value>,
    expected: Option<SchemaNode>,
    error: Option<String>,
}

fn main() -> ExitCode {
    let filter = match std::env::args().nth(1).map(|src| Regex::new(&src)).transpose() {
        Ok(filter) => filter,
        Err(error) => {
            eprintln!("bad filter: {error}");
            return ExitCode::FAILURE;
        }
    };

    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("fixtures");
    let paths = match fixture_paths(&dir) {
        Ok(paths) => paths,
        Err(error) => {
            eprintln!("cannot list {}: {error}", dir.display());
            return ExitCode::FAILURE;
        }
    };

    let mut failed = 0usize;
    let mut ran = 0usize;
    for path in paths {
        let name = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
        if filter.as_ref().is_some_and(|rx| !rx.is_match(&name)) {
            continue;
        }
        ran += 1;
        match run_fixture(&path) {
            Ok(description) => eprintln!("✅ {name}: {description}"),
            Err(reason) => {
                failed += 1;
                eprintln!("❌ {name}: {reason}");
            }
        }
    }

    eprintln!("—— {ran} fixtures, {failed} failed ——");
    if failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

fn fixture_paths(dir: &Path) -> Result<Vec<PathBuf>, String> {
    let pattern = format!("{}/*.json", dir.display());
    let mut paths = glob::glob(&pattern)
        .map_err(|e| e.to_string())?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())?;
    paths.sort();
    Ok(paths)
}

fn run_fixture(path: &Path) -> Result<String, String> {
    let source = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    let fixture: Fixture = from_str_with_path(&source).map_err(|e| e.to_string())?;

    let sequential = fold(&fixture.samples, false);
    let parallel = fold(&fixture.samples, true);

    for (strategy, outcome) in [("sequential", sequential), ("parallel", parallel)] {
        match (&fixture.expected, &fixture.error, outcome) {
            (Some(expected), None, Ok(actual)) if &actual == expected => {}
            (Some(expected), None, Ok(actual)) => {
                return Err(format!(
                    "{strategy}: expected {}\n   got {}",
                    expected.canonicalize().to_value(),
                    actual.canonicalize().to_value()
                ));
            }
            (None, Some(kind), Err(error)) if error.kind() == kind.as_str() => {}
            (_, _, Err(error)) => return Err(format!("{strategy}: unexpected error: {error}")),
            (None, Some(kind), Ok(_)) => return Err(format!("{strategy}: expected a {kind} error")),
            _ => return Err("fixture needs exactly one of `expected` or `error`".to_string()),
        }
    }
    Ok(fixture.description)
}

fn fold(samples: &[Value], parallel: bool) -> ShapeResult<SchemaNode> {
    let nodes = samples.iter().map(parse_checked).collect::<ShapeResult<Vec<_>>>()?;
    let merged = if parallel { merge_all_parallel(nodes)? } else { merge_all(nodes)? };
    Ok(merged.unwrap_or_default())
}
