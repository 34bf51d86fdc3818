//! Explaining why a graph has no solution.
//!
//! The builder looks for a minimal set of rules that cannot hold together
//! (deletion-based: drop rules one chunk at a time, keep the drop whenever
//! the rest still conflicts). The highest-priority rule of that set is the
//! primary one; it decides the diagnostic's kind, message and remedy. The
//! primary rule is then relaxed and the search repeats, so independent
//! conflicts are all reported in one run.
//!
//! Every re-solve counts against `max-relaxation-attempts`. Running out
//! produces a single fallback diagnostic listing every rule, with no remedy.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::ResolverConfig;
use crate::context::Graph;
use crate::option::OptionId;
use crate::rule::{Constraint, RuleId, RuleKind};
use crate::solver::{LoweredProblem, SolveOutcome};

/// What the user could do about a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Remedy {
    RemoveMod,
    UpdateMod,
    AddMissingDependency,
    ChangeEnvironment,
}

impl Remedy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Remedy::RemoveMod => "remove-mod",
            Remedy::UpdateMod => "update-mod",
            Remedy::AddMissingDependency => "add-missing-dependency",
            Remedy::ChangeEnvironment => "change-environment",
        }
    }

    /// One-line suggestion for presentation layers.
    pub fn description(&self) -> &'static str {
        match self {
            Remedy::RemoveMod => "Remove one of the mods involved",
            Remedy::UpdateMod => "Update a mod to a compatible version",
            Remedy::AddMissingDependency => "Install the missing dependency",
            Remedy::ChangeEnvironment => "Run in an environment the mod supports",
        }
    }
}

impl fmt::Display for Remedy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message template key plus its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub key: String,
    pub params: IndexMap<String, String>,
}

impl Message {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            params: IndexMap::new(),
        }
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    fn template(&self) -> Option<&'static str> {
        Some(match self.key.as_str() {
            "mandatory" => "{option} is mandatory",
            "disabled" => "{option} is disabled",
            "disabled.environment" => {
                "{option} only runs in a {declared} environment, but this is a {environment} environment"
            }
            "identity-group" => "Only one mod with id '{id}' can be loaded, found {candidates}",
            "dependency" => "{source} requires {requirement}, provided by {candidates}",
            "dependency.missing" => "{source} requires {requirement}, which is missing",
            "dependency.version" => "{source} requires {requirement}, but only {found} is present",
            "break" => "{source} is incompatible with {requirement}, found {conflicting}",
            "provided" => "{alias} is provided by {target}",
            "unresolved" => "{count} rules conflict and no smaller cause could be isolated",
            _ => return None,
        })
    }

    /// English rendering of the template.
    pub fn render(&self) -> String {
        let Some(template) = self.template() else {
            let params: Vec<String> = self.params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            return format!("{} ({})", self.key, params.join(", "));
        };

        let mut text = template.to_string();
        for (name, value) in &self.params {
            text = text.replace(&format!("{{{}}}", name), value);
        }
        text
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Why a single rule exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Explanation {
    pub rule: Option<RuleId>,
    pub kind: RuleKind,
    pub options: Vec<OptionId>,
    /// `group:id` of each involved option, deduplicated
    pub identities: Vec<String>,
    pub message: Message,
    pub remedy: Option<Remedy>,
    /// Requirement text (`id range`) for dependency and break rules
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirement: Option<String>,
}

impl Explanation {
    pub fn new(
        kind: RuleKind,
        graph: &Graph,
        options: Vec<OptionId>,
        message: Message,
        remedy: Option<Remedy>,
    ) -> Self {
        let mut identities: Vec<String> = Vec::new();
        for &option in &options {
            if let Some(o) = graph.option(option) {
                let identity = o.identity();
                if !identities.contains(&identity) {
                    identities.push(identity);
                }
            }
        }

        Self {
            rule: None,
            kind,
            options,
            identities,
            message,
            remedy,
            requirement: None,
        }
    }

    pub fn with_requirement(mut self, requirement: impl Into<String>) -> Self {
        self.requirement = Some(requirement.into());
        self
    }

    pub fn with_rule(mut self, rule: RuleId) -> Self {
        self.rule = Some(rule);
        self
    }
}

/// One independent cause of unsatisfiability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Kind of the primary rule; `None` for the fallback listing
    pub kind: Option<RuleKind>,
    /// Identities of every option involved
    pub options: Vec<String>,
    pub message: Message,
    pub remedy: Option<Remedy>,
    /// The conflicting rules, primary first
    pub rules: Vec<Explanation>,
}

impl Diagnostic {
    fn from_explanations(rules: Vec<Explanation>) -> Option<Self> {
        let primary = rules.first()?;
        let mut options: Vec<String> = Vec::new();
        for identity in rules.iter().flat_map(|r| r.identities.iter()) {
            if !options.contains(identity) {
                options.push(identity.clone());
            }
        }

        Some(Self {
            kind: Some(primary.kind),
            message: primary.message.clone(),
            remedy: primary.remedy,
            options,
            rules,
        })
    }

    /// Whether this is the degraded "everything" report.
    pub fn is_fallback(&self) -> bool {
        self.kind.is_none()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.message)?;
        for rule in self.rules.iter().skip(1) {
            writeln!(f, "  - {}", rule.message)?;
        }
        if let Some(remedy) = self.remedy {
            write!(f, "  Suggestion: {}", remedy.description())?;
        }
        Ok(())
    }
}

/// Finds minimal conflicting rule sets and turns them into diagnostics.
pub struct DiagnosticBuilder<'a> {
    graph: &'a Graph,
    problem: &'a LoweredProblem,
    max_iterations: u32,
    max_attempts: u32,
    attempts: u32,
}

impl<'a> DiagnosticBuilder<'a> {
    pub fn new(graph: &'a Graph, problem: &'a LoweredProblem, config: &ResolverConfig) -> Self {
        Self {
            graph,
            problem,
            max_iterations: config.max_iterations,
            max_attempts: config.max_relaxation_attempts,
            attempts: 0,
        }
    }

    pub fn build(&mut self) -> Vec<Diagnostic> {
        let start = std::time::Instant::now();
        let relaxing = self.relaxable_kinds();

        let diagnostics = match self.find_conflicts() {
            Some(diagnostics) if !diagnostics.is_empty() => diagnostics,
            _ => {
                log::warn!(
                    "Could not isolate a conflict within {} relaxation attempts",
                    self.max_attempts
                );
                vec![self.fallback_with(&relaxing)]
            }
        };

        log::debug!(
            "Built {} diagnostic(s) with {} re-solve(s) in {:?}",
            diagnostics.len(),
            self.attempts,
            start.elapsed()
        );
        diagnostics
    }

    /// Single diagnostic listing every relaxable rule verbatim.
    pub fn fallback(&self) -> Diagnostic {
        self.fallback_with(&[])
    }

    fn fallback_with(&self, relaxing: &[RuleKind]) -> Diagnostic {
        let rules: Vec<Explanation> = self
            .graph
            .rules()
            .filter(|(_, rule)| rule.kind().is_relaxable())
            .map(|(id, rule)| rule.explain(self.graph).with_rule(id))
            .collect();

        let mut options: Vec<String> = Vec::new();
        for identity in rules.iter().flat_map(|r| r.identities.iter()) {
            if !options.contains(identity) {
                options.push(identity.clone());
            }
        }

        let mut message = Message::new("unresolved").param("count", rules.len().to_string());
        if !relaxing.is_empty() {
            let kinds: Vec<&str> = relaxing.iter().map(|k| k.as_str()).collect();
            message = message.param("relaxing", kinds.join(", "));
        }

        Diagnostic {
            kind: None,
            options,
            message,
            remedy: None,
            rules,
        }
    }

    /// `Some(true)` if the enabled rules conflict; `None` once out of budget.
    fn conflicts(&mut self, enabled: &[bool]) -> Option<bool> {
        if self.attempts >= self.max_attempts {
            return None;
        }
        self.attempts += 1;

        match self.problem.solve(enabled, self.max_iterations) {
            Ok((SolveOutcome::Satisfied(_), _)) => Some(false),
            Ok((SolveOutcome::Unsatisfiable, _)) => Some(true),
            Ok((SolveOutcome::Aborted, _)) => None,
            Err(e) => {
                log::warn!("Re-solve failed while building diagnostics: {}", e);
                None
            }
        }
    }

    /// Rule kinds whose complete removal makes the graph solvable.
    fn relaxable_kinds(&mut self) -> Vec<RuleKind> {
        let mut kinds: Vec<RuleKind> = self
            .graph
            .rules()
            .map(|(_, r)| r.kind())
            .filter(RuleKind::is_relaxable)
            .collect();
        kinds.sort_by_key(RuleKind::relaxation_priority);
        kinds.dedup();

        let mut restoring = Vec::new();
        for kind in kinds {
            let enabled: Vec<bool> = self
                .graph
                .rules()
                .map(|(_, rule)| rule.kind() != kind)
                .collect();
            if self.conflicts(&enabled) == Some(false) {
                log::debug!("Relaxing all {} rules restores satisfiability", kind);
                restoring.push(kind);
            }
        }
        restoring
    }

    fn find_conflicts(&mut self) -> Option<Vec<Diagnostic>> {
        let mut enabled = vec![true; self.problem.rule_count()];
        let mut diagnostics = Vec::new();

        while self.conflicts(&enabled)? {
            let core = self.minimize(&enabled)?;
            let primary = *core.first()?;

            let explanations: Vec<Explanation> = core
                .iter()
                .filter_map(|&id| self.graph.rule(id).map(|r| r.explain(self.graph).with_rule(id)))
                .collect();
            diagnostics.extend(Diagnostic::from_explanations(explanations));

            log::debug!(
                "Conflict {} has {} rule(s), relaxing rule #{}",
                diagnostics.len(),
                core.len(),
                primary
            );
            enabled[primary.index()] = false;
        }

        Some(diagnostics)
    }

    /// Shrink the enabled relaxable rules to a minimal conflicting subset,
    /// sorted by relaxation priority.
    fn minimize(&mut self, enabled: &[bool]) -> Option<Vec<RuleId>> {
        let mut core: Vec<RuleId> = self
            .graph
            .rules()
            .filter(|(id, rule)| enabled[id.index()] && rule.kind().is_relaxable())
            .map(|(id, _)| id)
            .collect();
        core.sort_by_key(|&id| (self.priority(id), id));

        // Structural rules are always kept
        let base: Vec<bool> = self
            .graph
            .rules()
            .map(|(id, rule)| enabled[id.index()] && !rule.kind().is_relaxable())
            .collect();

        let mut chunk = (core.len() / 2).max(1);
        loop {
            let mut i = 0;
            while i < core.len() {
                let end = (i + chunk).min(core.len());
                let mut mask = base.clone();
                for (j, id) in core.iter().enumerate() {
                    if j < i || j >= end {
                        mask[id.index()] = true;
                    }
                }

                if self.conflicts(&mask)? {
                    core.drain(i..end);
                } else {
                    i = end;
                }
            }

            if chunk == 1 {
                break;
            }
            chunk /= 2;
        }

        if core.is_empty() {
            None
        } else {
            Some(core)
        }
    }

    fn priority(&self, id: RuleId) -> u8 {
        self.problem
            .kind(id)
            .map(|k| k.relaxation_priority())
            .unwrap_or(u8::MAX)
    }
}
