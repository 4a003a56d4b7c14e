//! CLI: entry files → OpenAPI documents (or just their codec schemas)
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;
use serde_json::Value;

use codec_openapi::config::Config;
use codec_openapi::document::{BuildOptions, Document, DocumentBuilder};
use codec_openapi::project::{Project, module_id};
use codec_openapi::registry::Registry;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// generate OpenAPI documents from io-ts codec declarations, without running them
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,

    /// more logging on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// build one OpenAPI document per entry file from its exported `apiSpec`s
    Document(DocumentOut),
    /// print the component schemas of the entry files' exported codecs
    Schema(SchemaOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// One or more entry files. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,

    /// JSON config: document info and extra combinators
    #[arg(long)]
    config: Option<PathBuf>,

    /// JQ post-process filter for each produced document.
    #[arg(long)]
    jq_expr: Option<String>,
}

#[derive(clap::Parser, Debug)]
struct DocumentOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// `info.title` (overrides the config)
    #[arg(long)]
    title: Option<String>,

    /// `info.version` (overrides the config)
    #[arg(long)]
    api_version: Option<String>,

    /// `info.description` (overrides the config)
    #[arg(long)]
    description: Option<String>,

    /// also emit every exported codec as a component
    #[arg(long)]
    exports: bool,

    /// output .json file (stdout if omitted); single entry only
    #[arg(short, long, conflicts_with = "out_dir")]
    out: Option<PathBuf>,

    /// write `<entry-stem>.json` per entry into this directory
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

#[derive(clap::Parser, Debug)]
struct SchemaOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// only these components (all exported codecs if omitted)
    #[arg(long, short)]
    name: Vec<String>,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

/// Everything a build needs, loaded once and shared by every entry.
struct Loaded {
    entries: Vec<PathBuf>,
    project: Project,
    registry: Registry,
    config: Config,
}

impl InputSettings {
    fn load(&self) -> Result<Loaded> {
        let entries = resolve_file_path_patterns(&self.input)?;
        let config = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("invalid config {}", path.display()))?,
            None => Config::default(),
        };
        let mut registry = Registry::with_builtins();
        config.apply(&mut registry)?;
        let project = Project::load(&entries)?;
        tracing::info!(
            entries = entries.len(),
            modules = project.module_ids().count(),
            "project loaded"
        );
        Ok(Loaded { entries, project, registry, config })
    }

    fn post_process(&self, value: Value) -> Result<Value> {
        match self.jq_expr.as_ref() {
            None => Ok(value),
            Some(jq_expr) => codec_openapi::jq_exec::post_process(jq_expr, &value)
                .with_context(|| format!("failed to apply jq expression `{jq_expr}`")),
        }
    }
}

impl Loaded {
    /// Independent builds, one per entry, in parallel.
    fn build_all(&self, options: BuildOptions) -> Vec<Document> {
        let builder = DocumentBuilder::new(&self.project, &self.registry, options);
        let ids: Vec<String> = self.entries.iter().map(|p| module_id(p)).collect();
        ids.par_iter().map(|id| builder.build(id)).collect()
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn verbosity(&self) -> u8 {
        self.verbose
    }

    /// `Ok(false)` when some root failed; the documents are still written.
    pub fn run(&self) -> Result<bool> {
        match &self.cmd {
            Command::Document(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(true);
                }
                let settings = &target.input_settings;
                let loaded = settings.load()?;
                if target.out.is_some() && loaded.entries.len() > 1 {
                    bail!(
                        "--out takes a single entry; use --out-dir for {} entries",
                        loaded.entries.len()
                    );
                }

                let mut info = loaded.config.info.clone();
                if target.title.is_some() {
                    info.title = target.title.clone();
                }
                if target.api_version.is_some() {
                    info.version = target.api_version.clone();
                }
                if target.description.is_some() {
                    info.description = target.description.clone();
                }
                let options = BuildOptions { info, include_exports: target.exports };

                let documents = loaded.build_all(options);
                let mut ok = true;
                for document in documents {
                    ok &= report(&document);
                    let value = settings.post_process(document.value)?;
                    let src = serde_json::to_string_pretty(&value)?;
                    match (&target.out, &target.out_dir) {
                        (Some(out), _) => write_output(out, &src)?,
                        (None, Some(dir)) => {
                            write_output(&dir.join(output_name(&document.entry)), &src)?
                        }
                        (None, None) => println!("{src}"),
                    }
                }
                Ok(ok)
            }
            Command::Schema(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(true);
                }
                let settings = &target.input_settings;
                let loaded = settings.load()?;
                let options = BuildOptions {
                    info: loaded.config.info.clone(),
                    include_exports: true,
                };

                let mut ok = true;
                let mut schemas = serde_json::Map::new();
                for document in loaded.build_all(options) {
                    ok &= report(&document);
                    let Value::Object(components) = &document.value["components"]["schemas"] else {
                        continue;
                    };
                    for (name, schema) in components {
                        if target.name.is_empty() || target.name.contains(name) {
                            schemas.insert(name.clone(), schema.clone());
                        }
                    }
                }
                for missing in target.name.iter().filter(|n| !schemas.contains_key(n.as_str())) {
                    eprintln!("{} no exported codec named `{missing}`", "warning:".yellow().bold());
                }

                let value = settings.post_process(Value::Object(schemas))?;
                let src = serde_json::to_string_pretty(&value)?;
                match &target.out {
                    Some(out) => write_output(out, &src)?,
                    None => println!("{src}"),
                }
                Ok(ok)
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// Print every diagnostic; true when there were none.
fn report(document: &Document) -> bool {
    for diagnostic in &document.diagnostics {
        eprintln!(
            "{} {}: {}",
            "error:".red().bold(),
            document.entry.bold(),
            diagnostic
        );
    }
    document.is_ok()
}

fn output_name(entry: &str) -> String {
    let stem = Path::new(entry)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "openapi".to_string());
    format!("{stem}.json")
}

fn write_output(out: &Path, src: &str) -> Result<()> {
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(out, src).with_context(|| format!("failed to write {}", out.display()))
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                // Pattern was explicitly a glob but matched nothing -> surface as an error
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
