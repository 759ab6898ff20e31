//! Command dispatch and configuration resolution for the `callweave` binary.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use callweave::{Composer, ComposerConfig, FilterKind};
use tracing::debug;

use crate::args::{CliArgs, Command};
use crate::{scenarios, shapes};

/// Run one parsed command, writing its report to `out`. Returns the exit code.
pub fn run(args: &CliArgs, out: &mut dyn Write) -> Result<i32> {
    let config = resolve_config(args)?;
    debug!(?config, "driver::run");

    match &args.command {
        Command::Scenarios { filter, list } => {
            if *list {
                for scenario in scenarios::all() {
                    writeln!(out, "{}", scenario.name)?;
                }
                return Ok(0);
            }
            let summary = scenarios::run_all(&config, filter.as_deref(), out)?;
            Ok(i32::from(summary.failed > 0))
        }
        Command::Shapes {
            arity,
            kind,
            format,
        } => {
            let kinds = match kind {
                Some(kind) => vec![kind.to_filter_kind()],
                None => FilterKind::ALL.to_vec(),
            };
            let composer = Composer::with_config(config);
            let report = shapes::build_report(&composer, *arity, &kinds)?;
            shapes::write_report(&report, *format, out)?;
            Ok(i32::from(report.unresolved() > 0))
        }
        Command::Config => {
            serde_json::to_writer_pretty(&mut *out, &config)?;
            writeln!(out)?;
            Ok(0)
        }
    }
}

/// Defaults, then the `--config` file, then the environment, then flags.
pub fn resolve_config(args: &CliArgs) -> Result<ComposerConfig> {
    let base = match &args.config {
        Some(path) => load_config(path)?,
        None => ComposerConfig::default(),
    };
    let mut config = base.apply_env();
    if args.dynamic_shapes {
        config.dynamic_shapes = true;
    }
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<ComposerConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("failed to parse config file {}", path.display()))
}

#[cfg(test)]
#[path = "tests/driver_tests.rs"]
mod tests;
