//! Minimal CLI: samples → (merged schema | malformed-sample report)
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde_json::Value;

use crate::error::ShapeError;
use crate::fold::{merge_all_parallel, parse_checked, Accumulator};
use crate::shape::SchemaNode;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// merge per-document type samples into one schema, marking sometimes-missing fields as Undefined
#[derive(Parser, Debug)]
#[command(version)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// parse every sample and merge them into one schema
    Merge(MergeOut),
    /// parse every sample and report the malformed ones
    Check(CheckOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/samples)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document.
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns or '-' for stdin
    ///
    /// A document that is a JSON array is read as a sequence of samples.
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Strategy {
    /// strict left-to-right fold
    #[default]
    Sequential,
    /// balanced pairwise reduction on all cores
    Parallel,
}

#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
enum OnInvalid {
    /// stop at the first malformed sample
    #[default]
    Abort,
    /// log the malformed sample and keep going
    Skip,
}

#[derive(clap::Parser, Debug)]
struct MergeOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// previously merged schema to fold the samples into
    #[arg(long)]
    base: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Strategy::Sequential)]
    strategy: Strategy,

    #[arg(long, value_enum, default_value_t = OnInvalid::Abort)]
    on_invalid: OnInvalid,

    /// sort field names and type sets for stable output
    #[arg(long)]
    sorted: bool,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

/// What a `merge` run produced.
#[derive(Debug)]
struct MergeReport {
    schema: SchemaNode,
    /// samples folded in, not counting the base schema
    merged: u64,
    skipped: u64,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// also list the samples that are fine
    #[arg(long)]
    verbose: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    /// Feed every sample of every input to `apply`, in input order.
    fn load_process(&self, mut apply: impl FnMut(Value) -> Result<()>) -> Result<()> {
        let source_paths = resolve_file_path_patterns(&self.input)
            .context("failed to resolve input file paths")?;
        for source_path in source_paths {
            let source_path_str = source_path.to_string_lossy().to_string();
            log::debug!("reading {source_path_str}");
            let source = read_source(&source_path)
                .with_context(|| format!("failed to read source file ({source_path_str})"))?;
            let documents = self
                .documents(&source)
                .with_context(|| format!("failed to parse JSON source file ({source_path_str})"))?;
            for document in documents {
                let document = self.select(document, &source_path_str)?;
                match self.jq_expr.as_ref() {
                    None => for_each_sample(document, &mut apply)?,
                    Some(jq_expr) => {
                        let outputs = crate::jq_exec::run_jaq(jq_expr, &document).with_context(|| {
                            format!("failed to apply jq expression to source file ({source_path_str})")
                        })?;
                        for output in outputs {
                            for_each_sample(output, &mut apply)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn documents(&self, source: &str) -> Result<Vec<Value>> {
        if !self.ndjson {
            return Ok(vec![serde_json::from_str(source)?]);
        }
        source
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line).with_context(|| format!("line {}", i + 1))
            })
            .collect()
    }

    fn select(&self, mut document: Value, source_path_str: &str) -> Result<Value> {
        let Some(pointer) = self.json_pointer.as_ref() else {
            return Ok(document);
        };
        match document.pointer_mut(pointer) {
            Some(selected) => Ok(selected.take()),
            None => bail!("JSON pointer {pointer} selects nothing in ({source_path_str})"),
        }
    }
}

impl OnInvalid {
    fn handle(self, index: u64, error: ShapeError, skipped: &mut u64) -> Result<()> {
        match self {
            Self::Abort => Err(anyhow::Error::new(error).context(format!("sample #{index}"))),
            Self::Skip => {
                log::warn!("skipping sample #{index}: {error}");
                *skipped += 1;
                Ok(())
            }
        }
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }
    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Merge(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(());
                }
                let report = target.merge()?;
                log::info!(
                    "merged {} samples into {} top-level fields ({} skipped)",
                    report.merged,
                    report.schema.len(),
                    report.skipped
                );
                let schema_src = target.render(&report.schema)?;
                write_output(target.out.as_deref(), &schema_src)
            }
            Command::Check(target) => target.check(),
        }
    }
}

impl MergeOut {
    fn merge(&self) -> Result<MergeReport> {
        let base = self.base.as_deref().map(load_schema).transpose()?;
        log::debug!("merging with the {:?} strategy", self.strategy);

        let mut index = 0u64;
        let mut skipped = 0u64;
        let (schema, merged) = match self.strategy {
            Strategy::Sequential => {
                let mut acc = match base {
                    Some(base) => Accumulator::seeded(base).context("invalid base schema")?,
                    None => Accumulator::new(),
                };
                self.input_settings.load_process(|sample| {
                    index += 1;
                    match acc.observe_sample(&sample) {
                        Ok(()) => Ok(()),
                        Err(error) => self.on_invalid.handle(index, error, &mut skipped),
                    }
                })?;
                let merged_samples = acc.samples();
                (acc.finish(), merged_samples)
            }
            Strategy::Parallel => {
                let mut nodes: Vec<SchemaNode> = base.into_iter().collect();
                let seeded = nodes.len() as u64;
                self.input_settings.load_process(|sample| {
                    index += 1;
                    match parse_checked(&sample) {
                        Ok(node) => {
                            nodes.push(node);
                            Ok(())
                        }
                        Err(error) => self.on_invalid.handle(index, error, &mut skipped),
                    }
                })?;
                let merged_samples = nodes.len() as u64 - seeded;
                let merged = merge_all_parallel(nodes).context("invalid base schema")?;
                (merged.unwrap_or_default(), merged_samples)
            }
        };

        Ok(MergeReport { schema, merged, skipped })
    }

    fn render(&self, schema: &SchemaNode) -> Result<String> {
        let src = if self.sorted {
            serde_json::to_string_pretty(&schema.canonicalize())?
        } else {
            serde_json::to_string_pretty(schema)?
        };
        Ok(src)
    }
}

impl CheckOut {
    fn check(&self) -> Result<()> {
        let mut index = 0u64;
        let mut invalid = 0u64;
        self.input_settings.load_process(|sample| {
            index += 1;
            match parse_checked(&sample) {
                Ok(_) if self.verbose => println!("{} sample #{index}", "ok".green()),
                Ok(_) => {}
                Err(error) => {
                    invalid += 1;
                    println!("{} sample #{index}: {error}", "invalid".red().bold());
                }
            }
            Ok(())
        })?;

        if invalid > 0 {
            bail!("{invalid} of {index} samples are malformed");
        }
        println!("{} all {index} samples are well-formed", "ok".green().bold());
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn for_each_sample(document: Value, apply: &mut impl FnMut(Value) -> Result<()>) -> Result<()> {
    match document {
        Value::Array(samples) => samples.into_iter().try_for_each(apply),
        sample => apply(sample),
    }
}

fn read_source(path: &Path) -> std::io::Result<String> {
    if path == Path::new("-") {
        std::io::read_to_string(std::io::stdin())
    } else {
        std::fs::read_to_string(path)
    }
}

fn load_schema(path: &Path) -> Result<SchemaNode> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read schema file ({})", path.display()))?;
    crate::path_de::from_str_with_path::<SchemaNode>(&source)
        .with_context(|| format!("failed to load schema file ({})", path.display()))
}

fn write_output(out: Option<&Path>, src: &str) -> Result<()> {
    let Some(out) = out else {
        println!("{src}");
        return Ok(());
    };
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
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
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{' ))
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
            // Treat as a literal path ('-' included)
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
