//! Adapter shape report for one generic entry arity.

use std::io::Write;

use anyhow::{Context, Result};
use callweave::{Composer, FilterKind, RegistryStats, TypeDescriptor};
use colored::Colorize;
use serde::Serialize;

use crate::args::OutputFormat;

#[derive(Debug, Serialize)]
pub struct ShapeRow {
    pub kind: FilterKind,
    pub position: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ShapeRow {
    pub fn resolved(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeReport {
    pub entry: String,
    pub arity: usize,
    pub synthesizer: Option<&'static str>,
    pub shapes: Vec<ShapeRow>,
    pub stats: RegistryStats,
}

impl ShapeReport {
    pub fn unresolved(&self) -> usize {
        self.shapes.iter().filter(|row| !row.resolved()).count()
    }
}

/// Resolve every legal position of `kinds` over `generic_method_type(arity)`.
pub fn build_report(composer: &Composer, arity: usize, kinds: &[FilterKind]) -> Result<ShapeReport> {
    let entry = TypeDescriptor::generic_method_type(arity)
        .with_context(|| format!("cannot build a generic entry type of arity {arity}"))?;
    let registry = composer.shapes();

    let mut shapes = Vec::new();
    for &kind in kinds {
        for position in (0..=arity).filter(|&p| kind.accepts_position(arity, p)) {
            let row = match registry.shape(&entry, kind, position) {
                Ok(shape) => ShapeRow {
                    kind,
                    position,
                    origin: Some(shape.origin().to_string()),
                    error: None,
                },
                Err(err) => ShapeRow {
                    kind,
                    position,
                    origin: None,
                    error: Some(err.to_string()),
                },
            };
            shapes.push(row);
        }
    }

    Ok(ShapeReport {
        entry: entry.to_string(),
        arity,
        synthesizer: registry.synthesizer_name(),
        shapes,
        stats: registry.stats(),
    })
}

pub fn write_report(report: &ShapeReport, format: OutputFormat, out: &mut dyn Write) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, report)?;
            writeln!(out)?;
        }
        OutputFormat::Text => {
            writeln!(out, "entry {}", report.entry)?;
            writeln!(
                out,
                "synthesizer {}",
                report.synthesizer.unwrap_or("none")
            )?;
            for row in &report.shapes {
                let status = match (&row.origin, &row.error) {
                    (Some(origin), _) => origin.green(),
                    (None, Some(error)) => error.red(),
                    (None, None) => "?".normal(),
                };
                writeln!(out, "{:<8} {:>3}  {status}", row.kind.to_string(), row.position)?;
            }
            writeln!(
                out,
                "{} tables, {} shapes",
                report.stats.tables, report.stats.shapes
            )?;
        }
    }
    Ok(())
}
