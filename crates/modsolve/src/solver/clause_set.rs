use std::collections::HashMap;

use super::clause::Clause;

/// Clauses of one solver run.
///
/// Clauses lowered from rules are deduplicated on their literals; the first
/// origin wins. Learned clauses are appended as-is.
#[derive(Debug, Default)]
pub struct ClauseSet {
    clauses: Vec<Clause>,
    /// Hash map for deduplication
    clause_hashes: HashMap<u64, Vec<u32>>,
}

impl ClauseSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a clause to the set, returning its ID.
    /// Returns existing clause's ID if a duplicate exists.
    pub fn add(&mut self, clause: Clause) -> u32 {
        let hash = clause.literal_hash();
        if let Some(ids) = self.clause_hashes.get(&hash) {
            for &id in ids {
                if self.clauses[id as usize].equals_literals(&clause) {
                    return id;
                }
            }
        }

        let id = self.push(clause);
        self.clause_hashes.entry(hash).or_default().push(id);
        id
    }

    /// Add a learned clause without deduplication.
    pub fn add_learned(&mut self, clause: Clause) -> u32 {
        self.push(clause)
    }

    fn push(&mut self, mut clause: Clause) -> u32 {
        let id = self.clauses.len() as u32;
        clause.set_id(id);
        self.clauses.push(clause);
        id
    }

    pub fn get(&self, id: u32) -> Option<&Clause> {
        self.clauses.get(id as usize)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Clause> {
        self.clauses.get_mut(id as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Clause> {
        self.clauses.iter()
    }

    /// Get assertion clauses (single literal clauses)
    pub fn assertions(&self) -> impl Iterator<Item = &Clause> {
        self.clauses.iter().filter(|c| c.is_assertion())
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Number of learned clauses.
    pub fn learned_count(&self) -> usize {
        self.clauses.iter().filter(|c| c.rule_id().is_none()).count()
    }
}
