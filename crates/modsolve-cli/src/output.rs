//! Printing resolution results.

use anyhow::Result;
use console::style;
use serde::Serialize;

use modsolve::{Diagnostic, DiscoveryReport, Graph, Selection, SelectionResult};

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    result: &'a SelectionResult,
    warnings: Vec<String>,
}

pub fn print_json(graph: &Graph, result: &SelectionResult) -> Result<()> {
    let report = JsonReport {
        result,
        warnings: graph.warnings().iter().map(|w| w.to_string()).collect(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

pub fn print_report(graph: &Graph, report: &DiscoveryReport, result: &SelectionResult) {
    for warning in graph.warnings() {
        eprintln!("{} {}", style("Warning:").yellow(), warning);
    }

    println!(
        "{} Scanned {} location(s), found {} candidate(s)",
        style(">").green(),
        report.scanned,
        report.candidates
    );

    match result {
        SelectionResult::Selected(selection) => print_selection(selection),
        SelectionResult::Unsatisfiable(diagnostics) => print_diagnostics(diagnostics),
    }
}

fn print_selection(selection: &Selection) {
    println!(
        "{} Loading {} mod(s)",
        style(">").green().bold(),
        selection.mods().count()
    );

    for entry in selection.entries() {
        match (&entry.provided_by, &entry.origin) {
            (Some(target), _) => println!(
                "  - {} {} {}",
                style(&entry.id).cyan(),
                entry.version,
                style(format!("(provided by {})", target)).dim()
            ),
            (None, Some(origin)) => println!(
                "  - {} {} {}",
                style(&entry.id).cyan(),
                entry.version,
                style(origin).dim()
            ),
            (None, None) => println!("  - {} {}", style(&entry.id).cyan(), entry.version),
        }
    }
}

fn print_diagnostics(diagnostics: &[Diagnostic]) {
    eprintln!(
        "{} No valid set of mods can be loaded ({} problem(s))",
        style("Error:").red().bold(),
        diagnostics.len()
    );

    for (n, diagnostic) in diagnostics.iter().enumerate() {
        eprintln!();
        eprintln!("  {}. {}", n + 1, style(&diagnostic.message).bold());
        for rule in diagnostic.rules.iter().skip(1) {
            eprintln!("     - {}", rule.message);
        }
        if let Some(remedy) = diagnostic.remedy {
            eprintln!("     {} {}", style("Suggestion:").yellow(), remedy.description());
        }
    }
}
