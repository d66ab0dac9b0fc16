//! Thin driver CLI: batch JSON → (guards | fixtures | check)
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indexmap::IndexMap;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use guard_oracle::batch::{Batch, BatchOutput, FailurePolicy};
use guard_oracle::codegen::GenConfig;
use guard_oracle::eval::Evaluator;
use guard_oracle::lower;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// generate runtime type guards and their valid/invalid fixtures from resolved type models
#[derive(Parser, Debug)]
#[command(version)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,

    #[command(flatten)]
    gen_settings: GenSettings,

    /// debug-level logging (RUST_LOG overrides)
    #[arg(long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// emit the generated predicate file (statement IR as JSON)
    Guards(GuardsOut),
    /// emit valid/invalid fixtures per root
    Fixtures(FixturesOut),
    /// generate both and run every fixture through its predicate
    Check(CheckArgs),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// One or more batch files. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,

    /// skip (and report) failing roots instead of aborting the batch
    #[arg(long, default_value_t = false)]
    keep_going: bool,
}

#[derive(Args, Debug, Clone)]
struct GenSettings {
    /// recursion ceiling across nested type structure
    #[arg(long, global = true)]
    max_depth: Option<usize>,

    /// omit the trailing structural self-check per object
    #[arg(long, global = true, default_value_t = false)]
    no_self_checks: bool,

    /// module specifier for imported alias types (overrides the batch's `importFrom`)
    #[arg(long, global = true)]
    import_from: Option<String>,
}

#[derive(clap::Parser, Debug)]
struct GuardsOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct FixturesOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct CheckArgs {
    #[command(flatten)]
    input_settings: InputSettings,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl GenSettings {
    /// CLI flag > batch `importFrom` > default.
    fn config_for(&self, batch_import_from: Option<&str>) -> GenConfig {
        let mut config = GenConfig::default();
        if let Some(depth) = self.max_depth {
            config.max_depth = depth;
        }
        config.emit_self_checks = !self.no_self_checks;
        if let Some(from) = self.import_from.as_deref().or(batch_import_from) {
            config.import_from = from.to_string();
        }
        config
    }
}

impl InputSettings {
    /// Run every input batch (one fresh engine per file).
    fn run_batches(&self, gen_settings: &GenSettings, with_fixtures: bool) -> Result<Vec<(PathBuf, BatchOutput)>> {
        let policy = if self.keep_going { FailurePolicy::Skip } else { FailurePolicy::Abort };
        let source_paths = resolve_file_path_patterns(&self.input)?;
        let mut outputs = Vec::with_capacity(source_paths.len());
        for source_path in source_paths {
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read {}", source_path.display()))?;
            let raw = lower::parse_batch(&source)
                .with_context(|| format!("failed to parse batch {}", source_path.display()))?;
            let config = gen_settings.config_for(raw.import_from.as_deref());
            let output = Batch::new(config)
                .policy(policy)
                .with_fixtures(with_fixtures)
                .run_raw(&raw.roots)
                .with_context(|| format!("generation failed for {}", source_path.display()))?;
            for failure in &output.failures {
                eprintln!("{} {}: {failure}", "skipped".yellow(), source_path.display());
            }
            info!(
                input = %source_path.display(),
                roots = raw.roots.len(),
                failures = output.failures.len(),
                "batch done"
            );
            outputs.push((source_path, output));
        }
        Ok(outputs)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    fn init_tracing(&self) {
        let filter = if self.verbose { "debug" } else { "info" };
        tracing_subscriber::registry()
            .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).without_time())
            .init();
    }

    pub fn run(&self) -> Result<ExitCode> {
        self.init_tracing();
        match &self.cmd {
            Command::Guards(target) => {
                let outputs = target.input_settings.run_batches(&self.gen_settings, false)?;
                let rendered = keyed_by_path(outputs, |out| serde_json::to_value(&out.file))?;
                write_output(target.out.as_deref(), &rendered)?;
                Ok(ExitCode::SUCCESS)
            }
            Command::Fixtures(target) => {
                let outputs = target.input_settings.run_batches(&self.gen_settings, true)?;
                let rendered = keyed_by_path(outputs, |out| serde_json::to_value(&out.fixtures))?;
                write_output(target.out.as_deref(), &rendered)?;
                Ok(ExitCode::SUCCESS)
            }
            Command::Check(target) => {
                let outputs = target.input_settings.run_batches(&self.gen_settings, true)?;
                let mut all_sound = true;
                for (path, output) in &outputs {
                    all_sound &= check_batch(path, output)?;
                }
                Ok(if all_sound { ExitCode::SUCCESS } else { ExitCode::FAILURE })
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn check_batch(path: &Path, output: &BatchOutput) -> Result<bool> {
    let evaluator = Evaluator::new(&output.file);
    let mut sound = true;
    for (root, fixtures) in &output.fixtures {
        let predicate = output.config.predicate_name(root);
        let unsound = evaluator
            .unsound(&predicate, fixtures)
            .with_context(|| format!("evaluating {predicate} from {}", path.display()))?;
        if unsound.is_empty() {
            println!(
                "{} {root} ({} valid, {} invalid)",
                "✅".green(),
                fixtures.valid.len(),
                fixtures.invalid.len()
            );
            continue;
        }
        sound = false;
        println!("{} {root}: {} unsound fixture(s)", "❌".red(), unsound.len());
        for case in unsound {
            let verdict = if case.expected { "rejected valid" } else { "accepted invalid" };
            println!("    {} {}", verdict.red(), case.sample.to_json());
        }
    }
    Ok(sound)
}

/// One input renders as its own value; several are keyed by path.
fn keyed_by_path<F>(outputs: Vec<(PathBuf, BatchOutput)>, render: F) -> Result<serde_json::Value>
where
    F: Fn(&BatchOutput) -> serde_json::Result<serde_json::Value>,
{
    if outputs.len() == 1 {
        return Ok(render(&outputs[0].1)?);
    }
    let mut keyed = IndexMap::new();
    for (path, output) in &outputs {
        keyed.insert(path.to_string_lossy().to_string(), render(output)?);
    }
    Ok(serde_json::to_value(keyed)?)
}

fn write_output(out: Option<&Path>, value: &serde_json::Value) -> Result<()> {
    let src = serde_json::to_string_pretty(value)?;
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(out, &src).with_context(|| format!("failed to write {}", out.display()))?;
        }
        None => println!("{src}"),
    }
    Ok(())
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();
    for raw in patterns {
        let pattern = raw.as_ref();
        if !has_glob_chars(pattern) {
            out.push(PathBuf::from(pattern));
            continue;
        }
        let before = out.len();
        for entry in glob::glob(pattern).with_context(|| format!("bad glob pattern: {pattern}"))? {
            out.push(entry?);
        }
        if out.len() == before {
            bail!("glob pattern matched no files: {pattern}");
        }
    }
    Ok(out)
}
