use std::fmt;
use std::hash::{Hash, Hasher};

use crate::option::Literal;
use crate::rule::{RuleId, RuleKind};

/// Where a clause came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClauseOrigin {
    /// Lowered from a graph rule
    Rule { id: RuleId, kind: RuleKind },
    /// Learned from conflict analysis
    Learned,
}

/// A SAT clause: a disjunction of literals.
///
/// # Examples
///
/// - `[A]` - option A must be loaded (assertion)
/// - `[-A]` - option A must not be loaded
/// - `[-A, B, C]` - if A is loaded, B or C must be loaded
/// - `[-A, -B]` - A and B cannot both be loaded
///
/// The first two literals are the watched ones; propagation reorders
/// literals in place to keep it that way.
#[derive(Clone)]
pub struct Clause {
    literals: Vec<Literal>,
    origin: ClauseOrigin,
    /// Assigned by ClauseSet
    id: u32,
}

impl Clause {
    pub fn new(literals: Vec<Literal>, origin: ClauseOrigin) -> Self {
        Self {
            literals,
            origin,
            id: 0,
        }
    }

    pub fn from_rule(literals: Vec<Literal>, id: RuleId, kind: RuleKind) -> Self {
        Self::new(literals, ClauseOrigin::Rule { id, kind })
    }

    pub fn learned(literals: Vec<Literal>) -> Self {
        Self::new(literals, ClauseOrigin::Learned)
    }

    pub fn set_id(&mut self, id: u32) {
        self.id = id;
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn origin(&self) -> ClauseOrigin {
        self.origin
    }

    /// The graph rule this clause was lowered from.
    pub fn rule_id(&self) -> Option<RuleId> {
        match self.origin {
            ClauseOrigin::Rule { id, .. } => Some(id),
            ClauseOrigin::Learned => None,
        }
    }

    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    pub(crate) fn literals_mut(&mut self) -> &mut [Literal] {
        &mut self.literals
    }

    /// Check if this is an assertion (single literal)
    pub fn is_assertion(&self) -> bool {
        self.literals.len() == 1
    }

    pub fn len(&self) -> usize {
        self.literals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    /// Get a hash of this clause's literals for deduplication
    pub fn literal_hash(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        let mut hasher = DefaultHasher::new();

        let mut sorted = self.literals.clone();
        sorted.sort();
        sorted.hash(&mut hasher);

        hasher.finish()
    }

    /// Check if two clauses have the same literals (regardless of order)
    pub fn equals_literals(&self, other: &Clause) -> bool {
        if self.literals.len() != other.literals.len() {
            return false;
        }

        let mut a = self.literals.clone();
        let mut b = other.literals.clone();
        a.sort();
        b.sort();
        a == b
    }

    fn origin_str(&self) -> &'static str {
        match self.origin {
            ClauseOrigin::Rule { kind, .. } => kind.as_str(),
            ClauseOrigin::Learned => "learned",
        }
    }
}

impl fmt::Debug for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Clause({:?}, {:?})", self.origin, self.literals)
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let literals: Vec<String> = self
            .literals
            .iter()
            .map(|&l| if l > 0 { format!("+{}", l) } else { format!("{}", l) })
            .collect();

        write!(f, "({}) [{}]", self.origin_str(), literals.join(" | "))
    }
}
