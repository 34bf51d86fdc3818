use super::clause::Clause;
use super::clause_set::ClauseSet;
use super::decisions::Decisions;
use crate::option::Literal;

/// Two-watched literals graph for efficient unit propagation.
///
/// Every clause with two or more literals watches its first two. When a
/// watched literal becomes false, propagation looks for a replacement among
/// the unwatched literals and swaps it into place. If none exists the clause
/// is unit (the other watch is implied) or conflicting (the other watch is
/// false too).
#[derive(Debug, Default)]
pub struct WatchGraph {
    /// Maps literal index -> ids of clauses watching that literal
    watches: Vec<Vec<u32>>,
}

impl WatchGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert literal to index (handles positive and negative literals)
    fn literal_to_index(literal: Literal) -> usize {
        let abs = literal.unsigned_abs() as usize;
        if literal > 0 {
            abs * 2
        } else {
            abs * 2 + 1
        }
    }

    fn get_watches_mut(&mut self, literal: Literal) -> &mut Vec<u32> {
        let idx = Self::literal_to_index(literal);
        if idx >= self.watches.len() {
            self.watches.resize(idx + 1, Vec::new());
        }
        &mut self.watches[idx]
    }

    /// Build the watch graph from a clause set
    pub fn from_clauses(clauses: &ClauseSet) -> Self {
        let mut graph = Self::new();
        for clause in clauses.iter() {
            graph.add_clause(clause);
        }
        graph
    }

    /// Watch the first two literals of a clause. Assertions need no watches.
    pub fn add_clause(&mut self, clause: &Clause) {
        let literals = clause.literals();
        if literals.len() < 2 {
            return;
        }

        let id = clause.id();
        self.get_watches_mut(literals[0]).push(id);
        self.get_watches_mut(literals[1]).push(id);
    }

    /// Get clauses watching a specific literal
    pub fn get_watches(&self, literal: Literal) -> &[u32] {
        self.watches
            .get(Self::literal_to_index(literal))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Visit every clause watching the negation of a literal that just became
    /// true, deciding implied literals along the way.
    ///
    /// Returns the id of a conflicting clause, if any.
    pub fn propagate(
        &mut self,
        literal: Literal,
        clauses: &mut ClauseSet,
        decisions: &mut Decisions,
    ) -> Result<(), u32> {
        let false_literal = -literal;
        let idx = Self::literal_to_index(false_literal);
        if idx >= self.watches.len() {
            return Ok(());
        }

        let watching = std::mem::take(&mut self.watches[idx]);
        let mut kept = Vec::with_capacity(watching.len());
        let mut result = Ok(());
        let mut pending = watching.into_iter();

        while let Some(clause_id) = pending.next() {
            let Some(clause) = clauses.get_mut(clause_id) else {
                continue;
            };
            let literals = clause.literals_mut();

            // Keep the false watch in slot 1
            if literals[0] == false_literal {
                literals.swap(0, 1);
            }
            let other = literals[0];

            if decisions.satisfied(other) {
                kept.push(clause_id);
                continue;
            }

            let replacement = (2..literals.len()).find(|&k| !decisions.conflict(literals[k]));
            if let Some(k) = replacement {
                literals.swap(1, k);
                let new_watch = literals[1];
                self.get_watches_mut(new_watch).push(clause_id);
                continue;
            }

            kept.push(clause_id);
            if decisions.conflict(other) {
                result = Err(clause_id);
                kept.extend(pending.by_ref());
                break;
            }
            decisions.decide(other, Some(clause_id));
        }

        self.watches[idx] = kept;
        result
    }
}
