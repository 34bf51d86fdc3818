//! Dependency overrides: user-supplied replacements for the dependency and
//! break clauses of specific candidates, keyed by the candidate's describable
//! origin path.
//!
//! ```json
//! {
//!   "overrides": {
//!     "mods/sodium.jar": {
//!       "depends": [ { "replace": "fabric-api", "with": { "id": "fabric-api", "versions": ">=0.50" } } ],
//!       "breaks": []
//!     }
//!   }
//! }
//! ```

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{ResolveError, Result};
use crate::metadata::{BreakClause, DependencyClause, ModCandidate};

/// One clause swap. `replace` must match a declared clause exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClauseOverride<C> {
    pub replace: C,
    pub with: C,
}

/// Overrides for a single origin path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModOverrides {
    #[serde(default)]
    pub depends: Vec<ClauseOverride<DependencyClause>>,
    #[serde(default)]
    pub breaks: Vec<ClauseOverride<BreakClause>>,
}

/// Clause lists after overrides were applied.
#[derive(Debug, Default)]
pub struct AppliedOverrides {
    pub depends: Vec<DependencyClause>,
    pub breaks: Vec<BreakClause>,
    /// Replacements whose `replace` clause was not declared; they were skipped.
    pub mismatches: Vec<ResolveError>,
}

/// Swap each listed clause in place, keeping declaration order.
fn replace_clauses<C>(
    declared: &[C],
    swaps: &[ClauseOverride<C>],
    candidate: &ModCandidate,
    kind: &'static str,
    mismatches: &mut Vec<ResolveError>,
) -> Vec<C>
where
    C: Clone + PartialEq + std::fmt::Display,
{
    let mut clauses = declared.to_vec();
    for swap in swaps {
        match clauses.iter().position(|c| *c == swap.replace) {
            Some(pos) => clauses[pos] = swap.with.clone(),
            None => mismatches.push(ResolveError::OverrideMismatch {
                path: candidate.origin.clone(),
                identity: candidate.identity(),
                kind,
                clause: swap.replace.to_string(),
            }),
        }
    }
    clauses
}

impl ModOverrides {
    pub fn apply(&self, candidate: &ModCandidate) -> AppliedOverrides {
        let mut mismatches = Vec::new();
        let depends = replace_clauses(&candidate.depends, &self.depends, candidate, "depends", &mut mismatches);
        let breaks = replace_clauses(&candidate.breaks, &self.breaks, candidate, "breaks", &mut mismatches);
        AppliedOverrides {
            depends,
            breaks,
            mismatches,
        }
    }
}

/// All overrides, keyed by describable origin path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overrides {
    #[serde(default)]
    overrides: IndexMap<String, ModOverrides>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load overrides from a JSON file. A missing file means no overrides.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No override file at {}", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let overrides: Overrides =
            serde_json::from_str(&content).map_err(|e| ResolveError::InvalidOverrides {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        log::info!(
            "Loaded dependency overrides for {} path(s) from {}",
            overrides.len(),
            path.display()
        );
        Ok(overrides)
    }

    pub fn insert(&mut self, path: impl Into<String>, entry: ModOverrides) {
        self.overrides.insert(path.into(), entry);
    }

    pub fn get(&self, path: &str) -> Option<&ModOverrides> {
        self.overrides.get(path)
    }

    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}
