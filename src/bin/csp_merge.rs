//! csp-merge command line
//!
//! Reads JSON CSP documents from files, merges them in the order given and
//! prints any of: the provenance table, the merged JSON, the CSP header.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::debug;

use csp_merge::{schema, MergeReport, PolicyDocument, PolicyManager, ReportRow};

/// Exit code when `--fail-on-conflict` is set and the report has errors.
const EXIT_CONFLICT: u8 = 2;

/// Merge JSON Content-Security-Policy documents.
#[derive(Parser, Debug)]
#[command(name = "csp-merge", version, about = "Merge JSON Content-Security-Policy documents")]
struct Cli {
    /// Show the CSP response header
    #[arg(short = 'c', long)]
    csp: bool,

    /// Show the merged JSON CSP document
    #[arg(short = 'j', long)]
    json: bool,

    /// Show a table of where each CSP rule value came from
    #[arg(short = 't', long)]
    table: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    /// Exit with status 2 if any document conflicted with an earlier one
    #[arg(long)]
    fail_on_conflict: bool,

    /// Print the JSON Schema for JSON CSP documents and exit
    #[arg(long)]
    schema: bool,

    /// Log merge decisions to stderr
    #[arg(short = 'v', long)]
    verbose: bool,

    /// JSON CSP documents, merged in the order given
    #[arg(value_name = "FILE", required_unless_present = "schema")]
    files: Vec<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("csp-merge: error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    if cli.schema {
        let schema = schema::json_schema();
        let text = if cli.pretty {
            serde_json::to_string_pretty(&schema)?
        } else {
            serde_json::to_string(&schema)?
        };
        println!("{text}");
        return Ok(ExitCode::SUCCESS);
    }

    let documents = load_documents(&cli.files)?;
    let mut manager = PolicyManager::with_documents(documents);
    let outcome = manager.merge()?;
    let merged = outcome.document();
    let report = outcome.report();

    let show_csp = cli.csp || !(cli.json || cli.table);
    let mut outputs = Vec::new();

    if cli.table {
        outputs.push(render_table(&report.rows(merged)));
    }
    if cli.json {
        outputs.push(if cli.pretty {
            merged.to_json_pretty()?
        } else {
            merged.to_json()?
        });
    }
    if show_csp {
        outputs.push(merged.to_csp_header_value());
    }
    println!("{}", outputs.join("\n"));

    if report.has_errors() {
        warn_conflicts(report);
        if cli.fail_on_conflict {
            return Ok(ExitCode::from(EXIT_CONFLICT));
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn load_documents(files: &[PathBuf]) -> Result<Vec<PolicyDocument>> {
    let mut documents = Vec::with_capacity(files.len());

    for path in files {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let document = PolicyDocument::from_json_str(&text)
            .with_context(|| format!("failed to parse {}", path.display()))?
            .identified_as(path.display().to_string());

        let validation = document.validate();
        if !validation.is_valid() {
            bail!("{} is not a valid JSON CSP document: {validation}", path.display());
        }

        debug!("loaded {} ({} directive(s))", document.id(), document.rules().len());
        documents.push(document);
    }

    Ok(documents)
}

fn warn_conflicts(report: &MergeReport) {
    for entry in report.errors().entries() {
        eprintln!(
            "csp-merge: conflict: {} '{}' from {} was merged out",
            entry.directive,
            entry.value,
            entry.document.id()
        );
    }
}

fn render_table(rows: &[ReportRow]) -> String {
    let header = ["CSP Rule", "Value", "Included", "File(s) it came from"];
    let body: Vec<[String; 4]> = rows
        .iter()
        .map(|row| {
            [
                row.directive.to_string(),
                row.value.clone(),
                row.inclusion.to_string(),
                row.source.to_string(),
            ]
        })
        .collect();

    let mut widths = header.map(str::len);
    for cells in &body {
        for (width, cell) in widths.iter_mut().zip(cells) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let rule = widths
        .iter()
        .map(|w| "-".repeat(w + 2))
        .collect::<Vec<_>>()
        .join("+");
    let rule = format!("+{rule}+");

    let line = |cells: [&str; 4]| {
        let padded: Vec<String> = cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!(" {cell:<width$} "))
            .collect();
        format!("|{}|", padded.join("|"))
    };

    let mut out = vec![rule.clone(), line(header), rule.clone()];
    for cells in &body {
        out.push(line([
            cells[0].as_str(),
            cells[1].as_str(),
            cells[2].as_str(),
            cells[3].as_str(),
        ]));
    }
    out.push(rule);
    out.join("\n")
}
