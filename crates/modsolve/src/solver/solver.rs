use super::clause::Clause;
use super::clause_set::ClauseSet;
use super::decisions::Decisions;
use super::watch_graph::WatchGraph;
use crate::error::{ResolveError, Result};
use crate::option::{Literal, OptionId};
use crate::rule::Assignment;

/// How a solver run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveOutcome {
    /// Every clause holds under this assignment
    Satisfied(Assignment),
    /// No assignment satisfies the clauses
    Unsatisfiable,
    /// The iteration cap was hit first
    Aborted,
}

impl SolveOutcome {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, SolveOutcome::Satisfied(_))
    }
}

/// Counters of one run, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolverStats {
    pub decisions: u32,
    pub conflicts: u32,
    pub learned: usize,
    pub clauses: usize,
}

fn fault(message: impl Into<String>) -> ResolveError {
    ResolveError::InternalSolverFault(message.into())
}

/// CDCL (Conflict-Driven Clause Learning) solver over option variables.
///
/// 1. Assertions are decided at level 0 and propagated
/// 2. The first undecided option in policy order is tried as loaded
/// 3. Unit propagation through the watch graph
/// 4. On conflict: learn a first-UIP clause and backjump
/// 5. A conflict at level 0 means the clauses are unsatisfiable
pub struct Solver {
    clauses: ClauseSet,
    watch_graph: WatchGraph,
    decisions: Decisions,
    /// Positive literals in decision order
    order: Vec<Literal>,
    variables: usize,
    /// Next queue entry to propagate
    propagate_index: usize,
    max_iterations: u32,
    stats: SolverStats,
}

impl Solver {
    pub fn new(clauses: ClauseSet, variables: usize, order: &[OptionId], max_iterations: u32) -> Self {
        let watch_graph = WatchGraph::from_clauses(&clauses);
        let stats = SolverStats {
            clauses: clauses.len(),
            ..Default::default()
        };
        Self {
            clauses,
            watch_graph,
            decisions: Decisions::new(variables),
            order: order.iter().map(|o| o.literal()).collect(),
            variables,
            propagate_index: 0,
            max_iterations,
            stats,
        }
    }

    pub fn solve(mut self) -> Result<(SolveOutcome, SolverStats)> {
        let outcome = self.run()?;
        self.stats.learned = self.clauses.learned_count();
        log::trace!("Solver finished: {:?} ({:?})", outcome.is_satisfied(), self.stats);
        Ok((outcome, self.stats))
    }

    fn run(&mut self) -> Result<SolveOutcome> {
        if !self.process_assertions() || self.propagate().is_err() {
            return Ok(SolveOutcome::Unsatisfiable);
        }

        let mut iterations = 0u32;
        loop {
            let Some(literal) = self.select_next() else {
                return Ok(SolveOutcome::Satisfied(self.assignment()));
            };

            iterations += 1;
            if iterations > self.max_iterations {
                log::warn!("Solver exceeded maximum iterations ({})", self.max_iterations);
                return Ok(SolveOutcome::Aborted);
            }

            self.stats.decisions += 1;
            self.decisions.increment_level();
            self.decisions.decide(literal, None);

            while let Err(conflict) = self.propagate() {
                self.stats.conflicts += 1;
                iterations += 1;
                if iterations > self.max_iterations {
                    log::warn!("Solver exceeded maximum iterations ({})", self.max_iterations);
                    return Ok(SolveOutcome::Aborted);
                }

                if self.decisions.level() == 0 {
                    log::trace!("Conflict at level 0 in clause {}", conflict);
                    return Ok(SolveOutcome::Unsatisfiable);
                }
                self.learn(conflict)?;
            }
        }
    }

    /// Decide every assertion at level 0.
    /// Returns false on an empty clause or contradicting assertions.
    fn process_assertions(&mut self) -> bool {
        if self.clauses.iter().any(|c| c.is_empty()) {
            return false;
        }

        let assertions: Vec<(Literal, u32)> = self
            .clauses
            .assertions()
            .map(|c| (c.literals()[0], c.id()))
            .collect();

        for (literal, id) in assertions {
            if !self.decisions.decide(literal, Some(id)) {
                log::trace!("Assertion {} contradicts an earlier one", literal);
                return false;
            }
        }
        true
    }

    /// Propagate consequences of every decision not yet propagated
    fn propagate(&mut self) -> std::result::Result<(), u32> {
        while self.propagate_index < self.decisions.len() {
            let literal = self.decisions.queue()[self.propagate_index];
            self.propagate_index += 1;
            self.watch_graph
                .propagate(literal, &mut self.clauses, &mut self.decisions)?;
        }
        Ok(())
    }

    fn select_next(&self) -> Option<Literal> {
        self.order
            .iter()
            .copied()
            .find(|&literal| self.decisions.undecided(literal))
    }

    /// Learn from a conflict, backjump, and assert the learned literal.
    fn learn(&mut self, conflict: u32) -> Result<()> {
        let (learned, backtrack_level) = self.analyze(conflict)?;
        log::trace!("Learned {:?}, backjumping to level {}", learned, backtrack_level);

        self.decisions.revert_to_level(backtrack_level);
        self.propagate_index = self.decisions.len();

        let asserting = learned[0];
        let id = self.clauses.add_learned(Clause::learned(learned));
        if let Some(clause) = self.clauses.get(id) {
            self.watch_graph.add_clause(clause);
        }

        if !self.decisions.decide(asserting, Some(id)) {
            return Err(fault(format!(
                "learned literal {} is already false after backjumping",
                asserting
            )));
        }
        Ok(())
    }

    /// First-UIP conflict analysis.
    ///
    /// Returns the learned clause, asserting literal first and the literal
    /// with the highest remaining level second, plus the level to backjump to.
    fn analyze(&self, conflict: u32) -> Result<(Vec<Literal>, u32)> {
        let level = self.decisions.level();
        let queue = self.decisions.queue();
        let mut seen = vec![false; self.variables + 1];
        let mut learned: Vec<Literal> = vec![0];
        let mut counter = 0usize;
        let mut clause_id = conflict;
        let mut pivot: Option<Literal> = None;
        let mut index = queue.len();

        loop {
            let clause = self
                .clauses
                .get(clause_id)
                .ok_or_else(|| fault(format!("clause {} does not exist", clause_id)))?;

            for &literal in clause.literals() {
                if Some(literal) == pivot {
                    continue;
                }
                let var = literal.unsigned_abs() as usize;
                if seen[var] {
                    continue;
                }
                match self.decisions.decision_level(literal) {
                    Some(0) | None => {}
                    Some(l) => {
                        seen[var] = true;
                        if l == level {
                            counter += 1;
                        } else {
                            learned.push(literal);
                        }
                    }
                }
            }

            if counter == 0 {
                return Err(fault(format!("clause {} has no literal at the conflict level", clause_id)));
            }

            // Walk the trail back to the next literal involved in the conflict
            let trail_literal = loop {
                if index == 0 {
                    return Err(fault("conflict analysis ran off the decision queue"));
                }
                index -= 1;
                let candidate = queue[index];
                if seen[candidate.unsigned_abs() as usize] {
                    break candidate;
                }
            };
            seen[trail_literal.unsigned_abs() as usize] = false;
            counter -= 1;

            if counter == 0 {
                learned[0] = -trail_literal;
                break;
            }

            clause_id = self.decisions.reason(trail_literal).ok_or_else(|| {
                fault(format!("literal {} was implied without a reason", trail_literal))
            })?;
            pivot = Some(trail_literal);
        }

        let mut backtrack_level = 0;
        let mut highest = None;
        for (i, &literal) in learned.iter().enumerate().skip(1) {
            let l = self.decisions.decision_level(literal).unwrap_or(0);
            if l > backtrack_level {
                backtrack_level = l;
                highest = Some(i);
            }
        }
        if let Some(i) = highest {
            learned.swap(1, i);
        }

        Ok((learned, backtrack_level))
    }

    fn assignment(&self) -> Assignment {
        let mut selected = vec![false; self.variables];
        for literal in self.decisions.loaded() {
            let option = OptionId::from_literal(literal);
            if let Some(slot) = selected.get_mut(option.index()) {
                *slot = true;
            }
        }
        Assignment::from_selected(selected)
    }
}
