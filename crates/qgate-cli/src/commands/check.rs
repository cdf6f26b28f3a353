//! `qgate check`: aggregate, evaluate, report

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use qgate_config::Config;
use qgate_core::{Summary, SummaryError, Thresholds};
use qgate_engine::{
    Aggregate, BaselinePolicy, BudgetParseError, Decision, GatePolicy, PatternBudget, evaluate,
    render_markdown,
};
use thiserror::Error;

use crate::cli::CheckArgs;

#[derive(Error, Debug)]
pub enum CheckError {
    #[error("{0}")]
    InvalidArgs(String),

    #[error(transparent)]
    Budget(#[from] BudgetParseError),

    #[error("Invalid config: {0:#}")]
    Config(anyhow::Error),

    #[error(transparent)]
    Summary(#[from] SummaryError),

    #[error("Failed to write baseline {}: {source}", path.display())]
    WriteBaseline { path: PathBuf, source: SummaryError },
}

impl CheckError {
    pub fn exit_code(&self) -> u8 {
        match self {
            CheckError::InvalidArgs(_) | CheckError::Budget(_) | CheckError::Config(_) => 1,
            CheckError::Summary(SummaryError::NotFound(_) | SummaryError::Io { .. }) => 2,
            CheckError::Summary(SummaryError::Parse { .. }) => 3,
            CheckError::Summary(SummaryError::Serialization(_)) => 1,
            CheckError::WriteBaseline { .. } => 1,
        }
    }
}

pub fn handle(args: CheckArgs) -> ExitCode {
    match run(&args) {
        Ok(decision) => ExitCode::from(decision.exit_code()),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

/// Flags merged over the config file.
#[derive(Debug)]
struct Settings {
    thresholds: Thresholds,
    budgets: Vec<String>,
    allowed_percent: f64,
    require_full_events: bool,
}

impl Settings {
    fn merge(args: &CheckArgs, config: &Config) -> Result<Self, CheckError> {
        let gate = &config.gate;
        let thresholds = Thresholds {
            max_queries: args.max_queries.or(gate.max_queries),
            max_average_ms: args.max_average_ms.or(gate.max_average_ms),
            max_total_ms: args.max_total_ms.or(gate.max_total_ms),
        };

        for (flag, value) in [
            ("--max-average-ms", args.max_average_ms),
            ("--max-total-ms", args.max_total_ms),
            ("--baseline-allowed-percent", args.baseline_allowed_percent),
        ] {
            if let Some(v) = value.filter(|v| !v.is_finite() || *v < 0.0) {
                return Err(CheckError::InvalidArgs(format!(
                    "{flag} must be a non-negative number, got {v}"
                )));
            }
        }

        let budgets = gate
            .budgets
            .iter()
            .chain(args.budgets.iter())
            .cloned()
            .collect();

        Ok(Self {
            thresholds,
            budgets,
            allowed_percent: args
                .baseline_allowed_percent
                .unwrap_or(gate.baseline_allowed_percent),
            require_full_events: args.require_full_events || gate.require_full_events,
        })
    }
}

fn run(args: &CheckArgs) -> Result<Decision, CheckError> {
    let (config_path, config) =
        Config::resolve(args.config.as_deref()).map_err(CheckError::Config)?;
    if let Some(path) = &config_path {
        tracing::debug!(path = %path.display(), "using config");
    }

    let settings = Settings::merge(args, &config)?;

    // Budgets are validated before any input is touched.
    let budgets = settings
        .budgets
        .iter()
        .map(|spec| PatternBudget::parse(spec))
        .collect::<Result<Vec<_>, _>>()?;

    let summaries = args
        .inputs
        .iter()
        .map(|path| Summary::load(path))
        .collect::<Result<Vec<_>, _>>()?;

    if settings.require_full_events {
        ensure_full_events(&args.inputs, &summaries)?;
    }

    let aggregate = Aggregate::from_summaries(&summaries);
    tracing::info!(
        files = aggregate.file_count,
        queries = aggregate.total_queries,
        "aggregated inputs"
    );

    let baseline = match (&args.baseline, args.write_baseline) {
        (Some(path), true) => {
            write_baseline(&aggregate, path)?;
            None
        }
        (Some(path), false) => Some(BaselinePolicy::new(
            Summary::load(path)?,
            settings.allowed_percent,
        )),
        (None, _) => None,
    };

    let policy = GatePolicy {
        thresholds: settings.thresholds,
        budgets,
        baseline,
    };
    let evaluation = evaluate(&aggregate, &policy);
    let markdown = render_markdown(&aggregate, &evaluation);

    print!("{markdown}");

    if let Some(path) = &args.report {
        write_report(path, &markdown);
    }
    if let Some(path) = args.step_summary.as_deref().filter(|p| !p.as_os_str().is_empty()) {
        append_step_summary(path, &markdown);
    }

    for violation in &evaluation.violations {
        tracing::warn!("{violation}");
    }
    tracing::info!(decision = evaluation.decision.label(), "gate finished");

    Ok(evaluation.decision)
}

fn ensure_full_events(paths: &[PathBuf], summaries: &[Summary]) -> Result<(), CheckError> {
    let sampled: Vec<String> = paths
        .iter()
        .zip(summaries)
        .filter(|(_, s)| s.is_sampled())
        .map(|(p, s)| match s.sample_top() {
            Some(k) => format!("{} (sampleTop={k})", p.display()),
            None => p.display().to_string(),
        })
        .collect();

    if sampled.is_empty() {
        Ok(())
    } else {
        Err(CheckError::InvalidArgs(format!(
            "--require-full-events: sampled input(s): {}",
            sampled.join(", ")
        )))
    }
}

fn write_baseline(aggregate: &Aggregate, path: &Path) -> Result<(), CheckError> {
    aggregate
        .to_baseline()
        .export_to_file(path)
        .map_err(|source| CheckError::WriteBaseline {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::info!(path = %path.display(), "baseline written");
    Ok(())
}

/// Best-effort: a failed write never changes the gate result.
fn write_report(path: &Path, markdown: &str) {
    let result = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or(Ok(()), std::fs::create_dir_all)
        .and_then(|()| std::fs::write(path, markdown));

    if let Err(e) = result {
        tracing::warn!(path = %path.display(), error = %e, "could not write report");
    }
}

/// Best-effort, like `write_report`, but appends.
fn append_step_summary(path: &Path, markdown: &str) {
    let result = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut f| writeln!(f, "{markdown}"));

    if let Err(e) = result {
        tracing::warn!(path = %path.display(), error = %e, "could not append step summary");
    }
}
