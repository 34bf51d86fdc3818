use std::time::Instant;

use serde::Serialize;

use crate::config::ResolverConfig;
use crate::context::Graph;
use crate::diagnostic::{Diagnostic, DiagnosticBuilder};
use crate::error::{ResolveError, Result};
use crate::option::{LoadOption, OptionId};
use crate::rule::{Assignment, Constraint};
use crate::solver::{LoweredProblem, SolveOutcome};

/// One loaded option of a selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectedOption {
    #[serde(skip)]
    pub option: OptionId,
    pub id: String,
    pub group: String,
    pub version: String,
    /// Canonical `group:id`
    pub identity: String,
    /// Where the candidate came from; `None` for aliases
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    /// Set for provided aliases, naming the option they stand for
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provided_by: Option<String>,
}

/// Options chosen to load, in option order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Selection {
    entries: Vec<SelectedOption>,
}

impl Selection {
    pub fn from_assignment(graph: &Graph, assignment: &Assignment) -> Self {
        let entries = assignment
            .selected()
            .filter_map(|id| graph.option(id).map(|option| (id, option)))
            .map(|(id, option)| {
                let (origin, provided_by) = match option {
                    LoadOption::Mod(m) => (Some(m.candidate.origin.clone()), None),
                    LoadOption::Alias(a) => (None, Some(graph.label(a.target))),
                };
                SelectedOption {
                    option: id,
                    id: option.id().to_string(),
                    group: option.group().to_string(),
                    version: option.version().to_string(),
                    identity: option.identity(),
                    origin,
                    provided_by,
                }
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[SelectedOption] {
        &self.entries
    }

    /// Physical mods only, without aliases.
    pub fn mods(&self) -> impl Iterator<Item = &SelectedOption> {
        self.entries.iter().filter(|e| e.provided_by.is_none())
    }

    pub fn identities(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.identity.as_str()).collect()
    }

    /// Whether a mod is loaded, by bare id or `group:id`.
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn contains_option(&self, option: OptionId) -> bool {
        self.entries.iter().any(|e| e.option == option)
    }

    pub fn get(&self, id: &str) -> Option<&SelectedOption> {
        self.entries
            .iter()
            .find(|e| e.identity == id || e.id == id)
    }

    pub fn version_of(&self, id: &str) -> Option<&str> {
        self.get(id).map(|e| e.version.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of [`resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "result", rename_all = "kebab-case")]
pub enum SelectionResult {
    Selected(Selection),
    Unsatisfiable(Vec<Diagnostic>),
}

impl SelectionResult {
    pub fn is_selected(&self) -> bool {
        matches!(self, SelectionResult::Selected(_))
    }

    pub fn selection(&self) -> Option<&Selection> {
        match self {
            SelectionResult::Selected(selection) => Some(selection),
            SelectionResult::Unsatisfiable(_) => None,
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            SelectionResult::Selected(_) => &[],
            SelectionResult::Unsatisfiable(diagnostics) => diagnostics,
        }
    }
}

/// Choose the options to load from a sealed graph.
///
/// Returns `Err` only when the solver misbehaves; an unsolvable graph is an
/// ordinary [`SelectionResult::Unsatisfiable`].
pub fn resolve(graph: &Graph, config: &ResolverConfig) -> Result<SelectionResult> {
    graph.check_integrity()?;

    let start = Instant::now();
    let problem = LoweredProblem::new(graph);
    let (outcome, stats) = problem.solve_all(config.max_iterations)?;
    log::debug!(
        "Solved {} options in {:?}: {} decisions, {} conflicts, {} learned clauses",
        problem.variables(),
        start.elapsed(),
        stats.decisions,
        stats.conflicts,
        stats.learned
    );

    match outcome {
        SolveOutcome::Satisfied(assignment) => {
            validate(graph, &assignment)?;
            let selection = Selection::from_assignment(graph, &assignment);
            log::info!("Selected {} of {} options", selection.len(), graph.option_count());
            Ok(SelectionResult::Selected(selection))
        }
        SolveOutcome::Unsatisfiable => {
            let diagnostics = DiagnosticBuilder::new(graph, &problem, config).build();
            log::info!("No valid selection, {} conflict(s) found", diagnostics.len());
            Ok(SelectionResult::Unsatisfiable(diagnostics))
        }
        SolveOutcome::Aborted => {
            log::warn!(
                "Gave up after {} iterations; reporting every rule",
                config.max_iterations
            );
            let diagnostic = DiagnosticBuilder::new(graph, &problem, config).fallback();
            Ok(SelectionResult::Unsatisfiable(vec![diagnostic]))
        }
    }
}

/// Check the solver's assignment against every rule of the graph.
fn validate(graph: &Graph, assignment: &Assignment) -> Result<()> {
    for (id, rule) in graph.rules() {
        if !rule.validate(graph, assignment) {
            return Err(ResolveError::InternalSolverFault(format!(
                "selection violates rule #{} ({}): {}",
                id,
                rule.kind(),
                rule.explain(graph).message
            )));
        }
    }
    Ok(())
}
