use crate::option::Literal;

/// Tracks decisions made during SAT solving.
///
/// Each decision records:
/// - Whether an option is loaded (+) or not loaded (-)
/// - At what decision level it was decided
/// - Which clause forced it (none for free decisions)
///
/// The decision_map stores: 0 = undecided, >0 = loaded at level N-1,
/// <0 = not loaded at level N-1. Level 0 holds assertions and everything
/// they imply.
#[derive(Debug, Default)]
pub struct Decisions {
    /// Indexed by variable (literal magnitude)
    decision_map: Vec<i32>,
    /// Clause that forced each variable, indexed like decision_map
    reasons: Vec<Option<u32>>,
    /// Decided literals in order
    queue: Vec<Literal>,
    /// Queue position where each level above 0 starts
    level_starts: Vec<usize>,
}

impl Decisions {
    /// Tracker for variables `1..=variables`.
    pub fn new(variables: usize) -> Self {
        Self {
            decision_map: vec![0; variables + 1],
            reasons: vec![None; variables + 1],
            queue: Vec::with_capacity(variables),
            level_starts: Vec::new(),
        }
    }

    #[inline]
    fn var(literal: Literal) -> usize {
        literal.unsigned_abs() as usize
    }

    #[inline]
    fn ensure_capacity(&mut self, var: usize) {
        if var >= self.decision_map.len() {
            self.decision_map.resize(var + 1, 0);
            self.reasons.resize(var + 1, None);
        }
    }

    #[inline]
    pub fn level(&self) -> u32 {
        self.level_starts.len() as u32
    }

    /// Open a new decision level
    pub fn increment_level(&mut self) {
        self.level_starts.push(self.queue.len());
    }

    /// Make a decision at the current level
    ///
    /// Returns false if this conflicts with an existing decision
    pub fn decide(&mut self, literal: Literal, reason: Option<u32>) -> bool {
        let var = Self::var(literal);
        self.ensure_capacity(var);

        let existing = self.decision_map[var];
        if existing != 0 {
            return (existing > 0) == (literal > 0);
        }

        // Store level+1 so that level 0 doesn't become 0 (which means undecided)
        let level_value = self.level() as i32 + 1;
        self.decision_map[var] = if literal > 0 { level_value } else { -level_value };
        self.reasons[var] = reason;
        self.queue.push(literal);

        true
    }

    /// Check if a literal is satisfied by current decisions
    #[inline]
    pub fn satisfied(&self, literal: Literal) -> bool {
        match self.decision_map.get(Self::var(literal)) {
            Some(&d) if d != 0 => (d > 0) == (literal > 0),
            _ => false,
        }
    }

    /// Check if a literal conflicts with current decisions
    #[inline]
    pub fn conflict(&self, literal: Literal) -> bool {
        match self.decision_map.get(Self::var(literal)) {
            Some(&d) if d != 0 => (d > 0) != (literal > 0),
            _ => false,
        }
    }

    #[inline]
    pub fn decided(&self, literal: Literal) -> bool {
        self.decision_map
            .get(Self::var(literal))
            .is_some_and(|&d| d != 0)
    }

    #[inline]
    pub fn undecided(&self, literal: Literal) -> bool {
        !self.decided(literal)
    }

    /// Get the decision level of a literal's variable
    pub fn decision_level(&self, literal: Literal) -> Option<u32> {
        match self.decision_map.get(Self::var(literal)) {
            Some(&d) if d != 0 => Some(d.unsigned_abs() - 1),
            _ => None,
        }
    }

    /// Get the clause that forced a decision
    pub fn reason(&self, literal: Literal) -> Option<u32> {
        self.reasons.get(Self::var(literal)).copied().flatten()
    }

    /// Revert all decisions at levels > target_level
    pub fn revert_to_level(&mut self, target_level: u32) {
        let target = target_level as usize;
        if target >= self.level_starts.len() {
            return;
        }

        let cut = self.level_starts[target];
        for literal in self.queue.drain(cut..) {
            let var = literal.unsigned_abs() as usize;
            self.decision_map[var] = 0;
            self.reasons[var] = None;
        }
        self.level_starts.truncate(target);
    }

    /// Variables decided to be loaded
    pub fn loaded(&self) -> impl Iterator<Item = Literal> + '_ {
        self.decision_map
            .iter()
            .enumerate()
            .filter(|(_, &d)| d > 0)
            .map(|(var, _)| var as Literal)
    }

    pub fn queue(&self) -> &[Literal] {
        &self.queue
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decisions_decide() {
        let mut decisions = Decisions::new(3);

        assert!(decisions.decide(1, Some(0)));
        assert!(decisions.satisfied(1));
        assert!(!decisions.satisfied(-1));

        assert!(decisions.decide(-2, Some(1)));
        assert!(decisions.satisfied(-2));
        assert!(decisions.conflict(2));
        assert!(decisions.undecided(3));
    }

    #[test]
    fn test_decisions_conflict() {
        let mut decisions = Decisions::new(1);
        decisions.decide(1, None);

        assert!(!decisions.decide(-1, None));
        assert!(decisions.decide(1, None));
        assert!(decisions.conflict(-1));
        assert!(!decisions.conflict(1));
    }

    #[test]
    fn test_decisions_levels_and_reasons() {
        let mut decisions = Decisions::new(3);
        decisions.decide(1, Some(7));
        assert_eq!(decisions.decision_level(1), Some(0));

        decisions.increment_level();
        decisions.decide(2, None);
        assert_eq!(decisions.decision_level(-2), Some(1));
        assert_eq!(decisions.reason(1), Some(7));
        assert_eq!(decisions.reason(2), None);
    }

    #[test]
    fn test_decisions_revert() {
        let mut decisions = Decisions::new(3);
        decisions.decide(1, None);

        decisions.increment_level();
        decisions.decide(2, None);

        decisions.increment_level();
        decisions.decide(-3, Some(4));

        decisions.revert_to_level(1);
        assert!(decisions.decided(1));
        assert!(decisions.decided(2));
        assert!(decisions.undecided(3));
        assert_eq!(decisions.reason(3), None);
        assert_eq!(decisions.level(), 1);

        decisions.revert_to_level(0);
        assert_eq!(decisions.queue(), &[1]);
        assert_eq!(decisions.level(), 0);
    }

    #[test]
    fn test_decisions_loaded() {
        let mut decisions = Decisions::new(3);
        decisions.decide(1, None);
        decisions.decide(-2, None);
        decisions.decide(3, None);

        let loaded: Vec<_> = decisions.loaded().collect();
        assert_eq!(loaded, vec![1, 3]);
    }
}
