use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use callweave::FilterKind;

/// CLI arguments for the callweave binary.
#[derive(Parser, Debug)]
#[command(
    name = "callweave",
    version,
    about = "Compose typed callables and inspect their adapter shapes"
)]
pub struct CliArgs {
    /// JSON file with composer settings (`dynamicShapes`, `internTypes`).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Serve arities above the static shape table with the spreading synthesizer.
    #[arg(long = "dynamic-shapes", alias = "dynamicShapes", global = true)]
    pub dynamic_shapes: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the built-in composition scenarios.
    Scenarios {
        /// Only run scenarios whose name contains this text.
        filter: Option<String>,

        /// List scenario names without running them.
        #[arg(long)]
        list: bool,
    },

    /// Resolve adapter shapes for a generic entry type and report them.
    Shapes {
        /// Entry arity (number of `Object` parameters).
        #[arg(long)]
        arity: usize,

        /// Restrict to one adapter kind.
        #[arg(long, value_enum)]
        kind: Option<Kind>,

        /// Report format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Print the effective configuration as JSON.
    Config,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum Kind {
    #[value(alias = "filter")]
    Value,
    Fold,
    Collect,
    Flyby,
}

impl Kind {
    pub fn to_filter_kind(self) -> FilterKind {
        match self {
            Kind::Value => FilterKind::Value,
            Kind::Fold => FilterKind::Fold,
            Kind::Collect => FilterKind::Collect,
            Kind::Flyby => FilterKind::Flyby,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
