use super::clause::Clause;
use super::clause_set::ClauseSet;
use super::policy::Policy;
use super::solver::{SolveOutcome, Solver, SolverStats};
use crate::context::Graph;
use crate::error::Result;
use crate::option::{Literal, OptionId};
use crate::rule::{Constraint, RuleId, RuleKind};

/// Clauses of one rule.
#[derive(Debug, Clone)]
struct LoweredRule {
    id: RuleId,
    kind: RuleKind,
    clauses: Vec<Vec<Literal>>,
}

/// Every rule of a graph converted to SAT clauses.
///
/// Lowering happens once; each solve then picks the rules it wants enabled.
/// The diagnostic builder relies on this to re-solve rule subsets cheaply.
#[derive(Debug, Clone)]
pub struct LoweredProblem {
    rules: Vec<LoweredRule>,
    variables: usize,
    order: Vec<OptionId>,
}

impl LoweredProblem {
    pub fn new(graph: &Graph) -> Self {
        let start = std::time::Instant::now();
        let rules: Vec<LoweredRule> = graph
            .rules()
            .map(|(id, rule)| LoweredRule {
                id,
                kind: rule.kind(),
                clauses: rule.lower(graph),
            })
            .collect();

        let clause_count: usize = rules.iter().map(|r| r.clauses.len()).sum();
        log::debug!(
            "Lowered {} rules into {} clauses in {:?}",
            rules.len(),
            clause_count,
            start.elapsed()
        );

        Self {
            rules,
            variables: graph.option_count(),
            order: Policy.decision_order(graph),
        }
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn variables(&self) -> usize {
        self.variables
    }

    pub fn kind(&self, id: RuleId) -> Option<RuleKind> {
        self.rules.get(id.index()).map(|r| r.kind)
    }

    /// All rules of a kind, in registration order.
    pub fn rules_of_kind(&self, kind: RuleKind) -> impl Iterator<Item = RuleId> + '_ {
        self.rules.iter().filter(move |r| r.kind == kind).map(|r| r.id)
    }

    /// Clauses of the rules whose index is set in `enabled`.
    pub fn clause_set(&self, enabled: &[bool]) -> ClauseSet {
        let mut set = ClauseSet::new();
        for rule in &self.rules {
            if !enabled.get(rule.id.index()).copied().unwrap_or(false) {
                continue;
            }
            for literals in &rule.clauses {
                set.add(Clause::from_rule(literals.clone(), rule.id, rule.kind));
            }
        }
        set
    }

    /// Solve with every rule enabled.
    pub fn solve_all(&self, max_iterations: u32) -> Result<(SolveOutcome, SolverStats)> {
        self.solve(&vec![true; self.rules.len()], max_iterations)
    }

    /// Solve with only the rules set in `enabled`.
    pub fn solve(&self, enabled: &[bool], max_iterations: u32) -> Result<(SolveOutcome, SolverStats)> {
        let solver = Solver::new(self.clause_set(enabled), self.variables, &self.order, max_iterations);
        solver.solve()
    }
}
