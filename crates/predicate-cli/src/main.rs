// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! predicate: load, optimize, render and evaluate rule sets from JSON files.
//!
//! Rule files map rule names to expressions (`["op", arg, …]`, strings, `null`).
//! Transaction files follow `TransactionFixture`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use predicate_core::{
    ConfigService, Context, LoadReport, PredicateConfig, RuleSet, TransactionFixture,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod file_store;

use file_store::FileConfigStore;

#[derive(Parser, Debug)]
#[command(author, version, about = "Predicate rule-set developer CLI")]
struct Args {
    /// JSON config file with optimizer/loader settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print `name: rendering` for every rule
    Render {
        /// Rule file (JSON object: name -> expression)
        #[arg(long)]
        rules: PathBuf,
        /// Run the optimizer before rendering
        #[arg(long)]
        optimize: bool,
    },
    /// Optimize, then evaluate every rule against one transaction
    Eval {
        /// Rule file (JSON object: name -> expression)
        #[arg(long)]
        rules: PathBuf,
        /// Transaction fixture (JSON)
        #[arg(long)]
        tx: PathBuf,
    },
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = load_config(args.config.as_deref())?;
    let mut out = std::io::stdout().lock();
    match args.cmd {
        Command::Render { rules, optimize } => render(&mut out, config, &rules, optimize),
        Command::Eval { rules, tx } => eval(&mut out, config, &rules, &tx),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<PredicateConfig> {
    let Some(path) = path else {
        return Ok(PredicateConfig::default());
    };
    if !path.exists() {
        anyhow::bail!("config file {} does not exist", path.display());
    }
    let service = ConfigService::new(FileConfigStore::new(path));
    service
        .load_predicate_config()
        .with_context(|| format!("load config {}", path.display()))
}

fn load_rules(config: PredicateConfig, path: &Path) -> Result<(RuleSet, LoadReport)> {
    let bytes = fs::read(path).with_context(|| format!("read rules {}", path.display()))?;
    let mut rules = RuleSet::new(config);
    let report = rules
        .load_json(&bytes)
        .with_context(|| format!("parse rules {}", path.display()))?;
    info!(
        loaded = report.loaded.len(),
        failed = report.failures.len(),
        "rules loaded"
    );
    Ok((rules, report))
}

fn write_failures(out: &mut impl Write, report: &LoadReport) -> Result<bool> {
    for failure in &report.failures {
        writeln!(out, "{}: error: {}", failure.rule, failure.error)?;
    }
    Ok(report.is_clean())
}

fn render(
    out: &mut impl Write,
    config: PredicateConfig,
    rules_path: &Path,
    optimize: bool,
) -> Result<ExitCode> {
    let (mut rules, report) = load_rules(config, rules_path)?;
    if optimize {
        rules.optimize().context("optimize rules")?;
    }
    for (name, rendering) in rules.render() {
        writeln!(out, "{name}: {rendering}")?;
    }
    let clean = write_failures(out, &report)?;
    Ok(if clean {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn eval(
    out: &mut impl Write,
    config: PredicateConfig,
    rules_path: &Path,
    tx_path: &Path,
) -> Result<ExitCode> {
    let (mut rules, report) = load_rules(config, rules_path)?;
    rules.optimize().context("optimize rules")?;

    let tx_bytes = fs::read(tx_path).with_context(|| format!("read transaction {}", tx_path.display()))?;
    let fixture: TransactionFixture = serde_json::from_slice(&tx_bytes)
        .with_context(|| format!("parse transaction {}", tx_path.display()))?;
    let tx = fixture.into_transaction().context("build transaction")?;

    let mut ctx = Context::new(&tx);
    let mut clean = write_failures(out, &report)?;
    for (name, result) in rules.evaluate_all(&mut ctx) {
        match result {
            Ok(value) => writeln!(out, "{name}: {}", value.is_truthy())?,
            Err(err) => {
                clean = false;
                writeln!(out, "{name}: error: {err}")?;
            }
        }
    }
    Ok(if clean {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
