//! Fixture runner: builds `fixtures/<name>/index.ts` and diffs the document
//! against `fixtures/<name>/expected.json`.
//!
//! ```text
//! cargo run -p dev-test-runner -- [FILTER-REGEX] [--bless]
//! ```
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};
use colored::Colorize;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use codec_openapi::config::Config;
use codec_openapi::project::{Project, module_id};
use codec_openapi::{BuildOptions, DocumentBuilder, Registry};

/// Optional `fixture.json` next to the entry file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
struct Manifest {
    /// Entry file relative to the fixture directory.
    entry: Option<String>,
    /// Emit every exported codec as a component.
    exports: bool,
    /// The build is expected to report diagnostics.
    expect_diagnostics: bool,
}

enum Outcome {
    Pass,
    Blessed,
    Fail(String),
}

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let de = &mut serde_json::Deserializer::from_slice(&bytes);
    serde_path_to_error::deserialize(de).map_err(|err| {
        anyhow!("{}: at JSON path {} → {}", path.display(), err.path(), err.inner())
    })
}

fn run_fixture(dir: &Path, bless: bool) -> Result<Outcome> {
    let manifest_path = dir.join("fixture.json");
    let manifest: Manifest = if manifest_path.is_file() {
        read_json(&manifest_path)?
    } else {
        Manifest::default()
    };
    let config_path = dir.join("config.json");
    let config = if config_path.is_file() {
        Config::load(&config_path)?
    } else {
        Config::default()
    };

    let mut registry = Registry::with_builtins();
    config.apply(&mut registry)?;

    let entry = dir.join(manifest.entry.as_deref().unwrap_or("index.ts"));
    let project = Project::load(&[&entry])?;
    let options = BuildOptions { info: config.info.clone(), include_exports: manifest.exports };
    let document = DocumentBuilder::new(&project, &registry, options).build(&module_id(&entry));

    if document.is_ok() == manifest.expect_diagnostics {
        let listed: Vec<String> = document.diagnostics.iter().map(ToString::to_string).collect();
        return Ok(Outcome::Fail(format!(
            "expected diagnostics: {}, got [{}]",
            manifest.expect_diagnostics,
            listed.join("; ")
        )));
    }

    let expected_path = dir.join("expected.json");
    if bless {
        let src = serde_json::to_string_pretty(&document.value)?;
        std::fs::write(&expected_path, src + "\n")?;
        return Ok(Outcome::Blessed);
    }
    let expected: Value = read_json(&expected_path)?;
    if expected == document.value {
        Ok(Outcome::Pass)
    } else {
        Ok(Outcome::Fail(format!(
            "--- expected\n{}\n+++ actual\n{}",
            serde_json::to_string_pretty(&expected)?,
            serde_json::to_string_pretty(&document.value)?
        )))
    }
}

fn main() -> ExitCode {
    let mut filter = None;
    let mut bless = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--bless" => bless = true,
            pattern => match Regex::new(pattern) {
                Ok(re) => filter = Some(re),
                Err(error) => {
                    eprintln!("{} invalid filter: {error}", "error:".red().bold());
                    return ExitCode::from(2);
                }
            },
        }
    }

    let mut dirs: Vec<PathBuf> = match std::fs::read_dir(fixtures_dir()) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect(),
        Err(error) => {
            eprintln!("{} {}: {error}", "error:".red().bold(), fixtures_dir().display());
            return ExitCode::from(2);
        }
    };
    dirs.sort();

    let (mut passed, mut failed) = (0usize, 0usize);
    for dir in dirs {
        let name = dir.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
        if filter.as_ref().is_some_and(|re| !re.is_match(&name)) {
            continue;
        }
        match run_fixture(&dir, bless) {
            Ok(Outcome::Pass) => {
                passed += 1;
                println!("{} {name}", "ok".green().bold());
            }
            Ok(Outcome::Blessed) => {
                passed += 1;
                println!("{} {name}", "blessed".cyan().bold());
            }
            Ok(Outcome::Fail(diff)) => {
                failed += 1;
                println!("{} {name}\n{diff}", "FAIL".red().bold());
            }
            Err(error) => {
                failed += 1;
                println!("{} {name}: {error:#}", "ERROR".red().bold());
            }
        }
    }

    println!("\n{passed} passed, {failed} failed");
    if failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}
