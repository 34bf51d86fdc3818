//! Load options: the boolean decision variables of a resolution run.

use std::fmt;
use std::ops::Not;

use serde::{Deserialize, Serialize};

use crate::metadata::{split_qualified, ModCandidate, ProvidedMod};
use crate::version::Version;

/// A literal in SAT terms - positive means "load", negative means "don't load".
pub type Literal = i32;

/// Arena handle of a registered option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionId(u32);

impl OptionId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Solver variable for this option (1-based, so it can be negated).
    pub fn literal(self) -> Literal {
        self.0 as Literal + 1
    }

    pub(crate) fn from_literal(literal: Literal) -> Self {
        Self(literal.unsigned_abs() - 1)
    }

    /// "This option is loaded".
    pub fn positive(self) -> OptionLiteral {
        OptionLiteral {
            option: self,
            negated: false,
        }
    }

    /// "This option is not loaded".
    pub fn negative(self) -> OptionLiteral {
        OptionLiteral {
            option: self,
            negated: true,
        }
    }
}

impl fmt::Display for OptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An option or its negation, as used inside rule clauses.
///
/// Negations are never registered on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OptionLiteral {
    pub option: OptionId,
    pub negated: bool,
}

impl OptionLiteral {
    pub fn literal(self) -> Literal {
        let lit = self.option.literal();
        if self.negated {
            -lit
        } else {
            lit
        }
    }

    /// Whether `selected` (the load state of the option) makes this literal true.
    pub fn holds(self, selected: bool) -> bool {
        selected != self.negated
    }
}

impl Not for OptionLiteral {
    type Output = OptionLiteral;

    fn not(self) -> Self::Output {
        OptionLiteral {
            option: self.option,
            negated: !self.negated,
        }
    }
}

/// A physical mod candidate registered by a discovery source.
#[derive(Debug, Clone)]
pub struct ModOption {
    pub candidate: ModCandidate,
    /// Name of the discovery source that produced it.
    pub source: String,
    pub(crate) discovery_index: u32,
}

/// A provided identity; loading it is the same as loading its target.
#[derive(Debug, Clone)]
pub struct AliasOption {
    /// The candidate this alias stands for. Never owned here.
    pub target: OptionId,
    pub provided: ProvidedMod,
    id: String,
    group: String,
    version: Version,
    target_label: String,
    pub(crate) discovery_index: u32,
}

impl AliasOption {
    pub fn new(target: OptionId, target_candidate: &ModCandidate, provided: ProvidedMod) -> Self {
        let (group, id) = split_qualified(&provided.id);
        let group = group.unwrap_or(target_candidate.group.as_str()).to_string();
        let id = id.to_string();
        let version = provided
            .version
            .clone()
            .unwrap_or_else(|| target_candidate.version.clone());

        Self {
            target,
            id,
            group,
            version,
            target_label: target_candidate.to_string(),
            provided,
            discovery_index: 0,
        }
    }
}

/// A decision variable: one mod or one provided alias.
#[derive(Debug, Clone)]
pub enum LoadOption {
    Mod(ModOption),
    Alias(AliasOption),
}

impl LoadOption {
    /// A candidate from the named discovery source.
    pub fn candidate(source: impl Into<String>, candidate: ModCandidate) -> Self {
        LoadOption::Mod(ModOption {
            candidate,
            source: source.into(),
            discovery_index: 0,
        })
    }

    pub fn id(&self) -> &str {
        match self {
            LoadOption::Mod(m) => &m.candidate.id,
            LoadOption::Alias(a) => &a.id,
        }
    }

    pub fn group(&self) -> &str {
        match self {
            LoadOption::Mod(m) => &m.candidate.group,
            LoadOption::Alias(a) => &a.group,
        }
    }

    pub fn version(&self) -> &Version {
        match self {
            LoadOption::Mod(m) => &m.candidate.version,
            LoadOption::Alias(a) => &a.version,
        }
    }

    /// Canonical `group:id` identity.
    pub fn identity(&self) -> String {
        format!("{}:{}", self.group(), self.id())
    }

    /// Position in discovery order; lower was found first.
    pub fn discovery_index(&self) -> u32 {
        match self {
            LoadOption::Mod(m) => m.discovery_index,
            LoadOption::Alias(a) => a.discovery_index,
        }
    }

    pub(crate) fn set_discovery_index(&mut self, index: u32) {
        match self {
            LoadOption::Mod(m) => m.discovery_index = index,
            LoadOption::Alias(a) => a.discovery_index = index,
        }
    }

    pub fn is_alias(&self) -> bool {
        matches!(self, LoadOption::Alias(_))
    }

    pub fn as_mod(&self) -> Option<&ModOption> {
        match self {
            LoadOption::Mod(m) => Some(m),
            LoadOption::Alias(_) => None,
        }
    }

    pub fn as_alias(&self) -> Option<&AliasOption> {
        match self {
            LoadOption::Alias(a) => Some(a),
            LoadOption::Mod(_) => None,
        }
    }

    /// Short human label, e.g. `sodium@0.4.1`.
    pub fn short_string(&self) -> String {
        match self {
            LoadOption::Mod(m) => m.candidate.to_string(),
            LoadOption::Alias(a) => format!("{}@{} (provided by {})", a.id, a.version, a.target_label),
        }
    }
}

impl fmt::Display for LoadOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_string())
    }
}
