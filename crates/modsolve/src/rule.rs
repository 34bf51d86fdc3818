//! Rules: named constraints over load options.
//!
//! The set of rule kinds is closed. Each kind is its own struct implementing
//! [`Constraint`]; [`Rule`] is the tagged union the context stores and the
//! solver lowers. Rules only ever hold [`OptionId`]s, and dependency/break
//! targets are looked up against the graph when they are needed, so a rule
//! created before its targets were discovered still sees them.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::context::Graph;
use crate::diagnostic::{Explanation, Message, Remedy};
use crate::metadata::{BreakClause, DependencyClause, EnvironmentTag, ModRequirement};
use crate::option::{Literal, OptionId, OptionLiteral};

/// Arena handle of a registered rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(u32);

impl RuleId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Types of rules produced while building the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleKind {
    /// At most one option per mod id (exactly one if a member is mandatory)
    IdentityGroup,
    /// If the source is loaded, the matching targets must not be
    BreakLink,
    /// If the source is loaded, one matching target must be
    DependencyLink,
    /// Option must not be loaded
    Disabled,
    /// Option must be loaded
    Mandatory,
    /// Alias and target are loaded together
    ProvidedLink,
}

impl RuleKind {
    /// Order in which diagnostics try relaxing rule kinds (lower first).
    pub fn relaxation_priority(&self) -> u8 {
        match self {
            RuleKind::IdentityGroup => 0,
            RuleKind::BreakLink => 1,
            RuleKind::DependencyLink => 2,
            RuleKind::Disabled => 3,
            RuleKind::Mandatory => 4,
            RuleKind::ProvidedLink => 5,
        }
    }

    /// Provided links are structural and never blamed for a conflict.
    pub fn is_relaxable(&self) -> bool {
        !matches!(self, RuleKind::ProvidedLink)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::IdentityGroup => "identity-group",
            RuleKind::BreakLink => "break-link",
            RuleKind::DependencyLink => "dependency-link",
            RuleKind::Disabled => "disabled",
            RuleKind::Mandatory => "mandatory",
            RuleKind::ProvidedLink => "provided-link",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tentative load state for every option of a graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    selected: Vec<bool>,
}

impl Assignment {
    pub fn new(option_count: usize) -> Self {
        Self {
            selected: vec![false; option_count],
        }
    }

    pub fn from_selected(selected: Vec<bool>) -> Self {
        Self { selected }
    }

    pub fn set(&mut self, option: OptionId, selected: bool) {
        if option.index() >= self.selected.len() {
            self.selected.resize(option.index() + 1, false);
        }
        self.selected[option.index()] = selected;
    }

    pub fn is_selected(&self, option: OptionId) -> bool {
        self.selected.get(option.index()).copied().unwrap_or(false)
    }

    pub fn satisfies(&self, literal: OptionLiteral) -> bool {
        literal.holds(self.is_selected(literal.option))
    }

    pub fn selected(&self) -> impl Iterator<Item = OptionId> + '_ {
        self.selected
            .iter()
            .enumerate()
            .filter(|(_, &s)| s)
            .map(|(i, _)| OptionId::from_index(i))
    }
}

/// Capabilities every rule kind provides.
pub trait Constraint {
    fn kind(&self) -> RuleKind;

    /// Options the rule ranges over, resolved against the current graph.
    fn options(&self, graph: &Graph) -> Vec<OptionId>;

    /// Whether the assignment satisfies this rule.
    fn validate(&self, graph: &Graph, assignment: &Assignment) -> bool;

    /// Why this rule exists, for conflict reports.
    fn explain(&self, graph: &Graph) -> Explanation;

    /// CNF clauses (disjunctions of literals) equivalent to this rule.
    fn lower(&self, graph: &Graph) -> Vec<Vec<Literal>>;
}

/// The option must be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MandatoryDefinition {
    pub option: OptionId,
}

impl Constraint for MandatoryDefinition {
    fn kind(&self) -> RuleKind {
        RuleKind::Mandatory
    }

    fn options(&self, _graph: &Graph) -> Vec<OptionId> {
        vec![self.option]
    }

    fn validate(&self, _graph: &Graph, assignment: &Assignment) -> bool {
        assignment.is_selected(self.option)
    }

    fn explain(&self, graph: &Graph) -> Explanation {
        Explanation::new(
            self.kind(),
            graph,
            vec![self.option],
            Message::new("mandatory").param("option", graph.label(self.option)),
            Some(Remedy::RemoveMod),
        )
    }

    fn lower(&self, _graph: &Graph) -> Vec<Vec<Literal>> {
        vec![clause([self.option.positive()])]
    }
}

/// The option must not be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisabledDefinition {
    pub option: OptionId,
    /// Set when the option was disabled for declaring another environment.
    pub declared: Option<EnvironmentTag>,
}

impl Constraint for DisabledDefinition {
    fn kind(&self) -> RuleKind {
        RuleKind::Disabled
    }

    fn options(&self, _graph: &Graph) -> Vec<OptionId> {
        vec![self.option]
    }

    fn validate(&self, _graph: &Graph, assignment: &Assignment) -> bool {
        assignment.satisfies(self.option.negative())
    }

    fn explain(&self, graph: &Graph) -> Explanation {
        let (message, remedy) = match self.declared {
            Some(declared) => (
                Message::new("disabled.environment")
                    .param("option", graph.label(self.option))
                    .param("declared", declared.to_string())
                    .param("environment", graph.environment().to_string()),
                Some(Remedy::ChangeEnvironment),
            ),
            None => (
                Message::new("disabled").param("option", graph.label(self.option)),
                None,
            ),
        };
        Explanation::new(self.kind(), graph, vec![self.option], message, remedy)
    }

    fn lower(&self, _graph: &Graph) -> Vec<Vec<Literal>> {
        vec![clause([self.option.negative()])]
    }
}

/// Uniqueness of a mod id.
///
/// Members are read from the graph's identity index, so candidates that
/// arrive after the definition was created are still covered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityGroupDefinition {
    pub id: String,
}

impl Constraint for IdentityGroupDefinition {
    fn kind(&self) -> RuleKind {
        RuleKind::IdentityGroup
    }

    fn options(&self, graph: &Graph) -> Vec<OptionId> {
        graph.group(&self.id).to_vec()
    }

    fn validate(&self, graph: &Graph, assignment: &Assignment) -> bool {
        let members = graph.group(&self.id);
        let count = members.iter().filter(|&&m| assignment.is_selected(m)).count();
        let has_mandatory = members.iter().any(|&m| graph.is_mandatory(m));
        count <= 1 && (!has_mandatory || count == 1)
    }

    fn explain(&self, graph: &Graph) -> Explanation {
        let members = graph.group(&self.id).to_vec();
        let labels: Vec<String> = members.iter().map(|&m| graph.label(m)).collect();
        Explanation::new(
            self.kind(),
            graph,
            members,
            Message::new("identity-group")
                .param("id", self.id.clone())
                .param("candidates", labels.join(", ")),
            Some(Remedy::RemoveMod),
        )
    }

    fn lower(&self, graph: &Graph) -> Vec<Vec<Literal>> {
        let members = graph.group(&self.id);
        let mut clauses = Vec::new();

        // Pairwise at-most-one
        for (i, &a) in members.iter().enumerate() {
            for &b in &members[i + 1..] {
                clauses.push(clause([a.negative(), b.negative()]));
            }
        }

        if members.iter().any(|&m| graph.is_mandatory(m)) {
            clauses.push(clause(members.iter().map(|m| m.positive())));
        }

        clauses
    }
}

/// Options that switch a requirement off while any of them is loaded.
/// Flatten option literals into a solver clause.
fn clause(literals: impl IntoIterator<Item = OptionLiteral>) -> Vec<Literal> {
    literals.into_iter().map(OptionLiteral::literal).collect()
}

fn unless_targets(graph: &Graph, req: &ModRequirement) -> Vec<OptionId> {
    match &req.unless {
        Some(unless) => graph.matching_any(unless.requirements()),
        None => Vec::new(),
    }
}

/// If `source` is loaded, something satisfying `clause` must be too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyLink {
    pub source: OptionId,
    pub clause: DependencyClause,
}

impl DependencyLink {
    /// Options that satisfy the clause, in discovery order.
    pub fn targets(&self, graph: &Graph) -> Vec<OptionId> {
        graph.matching_any(self.clause.requirements())
    }

    fn satisfiers(&self, graph: &Graph) -> Vec<OptionId> {
        let mut all = self.targets(graph);
        for req in self.clause.requirements() {
            for id in unless_targets(graph, req) {
                if !all.contains(&id) {
                    all.push(id);
                }
            }
        }
        all
    }

    fn remedy(&self, graph: &Graph, targets: &[OptionId]) -> Remedy {
        if targets.is_empty() {
            let any_present = self
                .clause
                .requirements()
                .iter()
                .any(|req| !graph.group(req.mod_id()).is_empty());
            if any_present {
                Remedy::UpdateMod
            } else {
                Remedy::AddMissingDependency
            }
        } else if targets.iter().all(|&t| graph.is_disabled(t)) {
            Remedy::ChangeEnvironment
        } else {
            Remedy::UpdateMod
        }
    }
}

impl Constraint for DependencyLink {
    fn kind(&self) -> RuleKind {
        RuleKind::DependencyLink
    }

    fn options(&self, graph: &Graph) -> Vec<OptionId> {
        let mut options = vec![self.source];
        options.extend(self.satisfiers(graph).into_iter().filter(|&o| o != self.source));
        options
    }

    fn validate(&self, graph: &Graph, assignment: &Assignment) -> bool {
        !assignment.is_selected(self.source)
            || self
                .satisfiers(graph)
                .into_iter()
                .any(|t| assignment.is_selected(t))
    }

    fn explain(&self, graph: &Graph) -> Explanation {
        let targets = self.targets(graph);
        let message = if targets.is_empty() {
            let present: Vec<String> = self
                .clause
                .requirements()
                .iter()
                .flat_map(|req| graph.group(req.mod_id()).iter().map(|&o| graph.label(o)))
                .collect();
            if present.is_empty() {
                Message::new("dependency.missing")
            } else {
                Message::new("dependency.version").param("found", present.join(", "))
            }
        } else {
            let labels: Vec<String> = targets.iter().map(|&t| graph.label(t)).collect();
            Message::new("dependency").param("candidates", labels.join(", "))
        };

        let message = message
            .param("source", graph.label(self.source))
            .param("requirement", self.clause.to_string());
        let remedy = self.remedy(graph, &targets);
        Explanation::new(self.kind(), graph, self.options(graph), message, Some(remedy))
            .with_requirement(self.clause.to_string())
    }

    fn lower(&self, graph: &Graph) -> Vec<Vec<Literal>> {
        let satisfiers = self.satisfiers(graph).into_iter().map(OptionId::positive);
        vec![clause(std::iter::once(self.source.negative()).chain(satisfiers))]
    }
}

/// If `source` is loaded, nothing matching `clause` may be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakLink {
    pub source: OptionId,
    pub clause: BreakClause,
}

impl BreakLink {
    /// Options excluded by each requirement, with the options that lift it.
    fn exclusions(&self, graph: &Graph) -> Vec<(Vec<OptionId>, Vec<OptionId>)> {
        self.clause
            .requirements()
            .iter()
            .map(|req| {
                let targets: Vec<OptionId> = graph
                    .matching(req)
                    .into_iter()
                    .filter(|&t| t != self.source)
                    .collect();
                (targets, unless_targets(graph, req))
            })
            .collect()
    }

    pub fn targets(&self, graph: &Graph) -> Vec<OptionId> {
        let mut all: Vec<OptionId> = Vec::new();
        for (targets, _) in self.exclusions(graph) {
            for t in targets {
                if !all.contains(&t) {
                    all.push(t);
                }
            }
        }
        all
    }
}

impl Constraint for BreakLink {
    fn kind(&self) -> RuleKind {
        RuleKind::BreakLink
    }

    fn options(&self, graph: &Graph) -> Vec<OptionId> {
        let mut options = vec![self.source];
        options.extend(self.targets(graph));
        options
    }

    fn validate(&self, graph: &Graph, assignment: &Assignment) -> bool {
        if !assignment.is_selected(self.source) {
            return true;
        }
        self.exclusions(graph).into_iter().all(|(targets, unless)| {
            unless.iter().any(|&u| assignment.is_selected(u))
                || targets.iter().all(|&t| !assignment.is_selected(t))
        })
    }

    fn explain(&self, graph: &Graph) -> Explanation {
        let labels: Vec<String> = self.targets(graph).iter().map(|&t| graph.label(t)).collect();
        let message = Message::new("break")
            .param("source", graph.label(self.source))
            .param("requirement", self.clause.to_string())
            .param("conflicting", labels.join(", "));
        Explanation::new(self.kind(), graph, self.options(graph), message, Some(Remedy::RemoveMod))
            .with_requirement(self.clause.to_string())
    }

    fn lower(&self, graph: &Graph) -> Vec<Vec<Literal>> {
        let mut clauses = Vec::new();
        for (targets, unless) in self.exclusions(graph) {
            for target in targets {
                let lifted = unless.iter().map(|u| u.positive());
                clauses.push(clause([self.source.negative(), target.negative()].into_iter().chain(lifted)));
            }
        }
        clauses
    }
}

/// An alias and the candidate providing it stand or fall together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvidedLink {
    pub alias: OptionId,
    pub target: OptionId,
}

impl Constraint for ProvidedLink {
    fn kind(&self) -> RuleKind {
        RuleKind::ProvidedLink
    }

    fn options(&self, _graph: &Graph) -> Vec<OptionId> {
        vec![self.alias, self.target]
    }

    fn validate(&self, _graph: &Graph, assignment: &Assignment) -> bool {
        assignment.is_selected(self.alias) == assignment.is_selected(self.target)
    }

    fn explain(&self, graph: &Graph) -> Explanation {
        Explanation::new(
            self.kind(),
            graph,
            vec![self.alias, self.target],
            Message::new("provided")
                .param("alias", graph.label(self.alias))
                .param("target", graph.label(self.target)),
            None,
        )
    }

    fn lower(&self, _graph: &Graph) -> Vec<Vec<Literal>> {
        let alias = self.alias.positive();
        let target = self.target.positive();
        vec![clause([!alias, target]), clause([!target, alias])]
    }
}

/// A constraint registered in the context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    Mandatory(MandatoryDefinition),
    Disabled(DisabledDefinition),
    IdentityGroup(IdentityGroupDefinition),
    Dependency(DependencyLink),
    Break(BreakLink),
    Provided(ProvidedLink),
}

impl Rule {
    pub fn mandatory(option: OptionId) -> Self {
        Rule::Mandatory(MandatoryDefinition { option })
    }

    pub fn disabled(option: OptionId) -> Self {
        Rule::Disabled(DisabledDefinition {
            option,
            declared: None,
        })
    }

    pub fn wrong_environment(option: OptionId, declared: EnvironmentTag) -> Self {
        Rule::Disabled(DisabledDefinition {
            option,
            declared: Some(declared),
        })
    }

    pub fn identity_group(id: impl Into<String>) -> Self {
        Rule::IdentityGroup(IdentityGroupDefinition { id: id.into() })
    }

    pub fn depends(source: OptionId, clause: DependencyClause) -> Self {
        Rule::Dependency(DependencyLink { source, clause })
    }

    pub fn breaks(source: OptionId, clause: BreakClause) -> Self {
        Rule::Break(BreakLink { source, clause })
    }

    pub fn provided(alias: OptionId, target: OptionId) -> Self {
        Rule::Provided(ProvidedLink { alias, target })
    }

    fn as_constraint(&self) -> &dyn Constraint {
        match self {
            Rule::Mandatory(r) => r,
            Rule::Disabled(r) => r,
            Rule::IdentityGroup(r) => r,
            Rule::Dependency(r) => r,
            Rule::Break(r) => r,
            Rule::Provided(r) => r,
        }
    }

    /// Option handles stored directly in the rule (not looked up).
    pub(crate) fn direct_options(&self) -> Vec<OptionId> {
        match self {
            Rule::Mandatory(r) => vec![r.option],
            Rule::Disabled(r) => vec![r.option],
            Rule::IdentityGroup(_) => Vec::new(),
            Rule::Dependency(r) => vec![r.source],
            Rule::Break(r) => vec![r.source],
            Rule::Provided(r) => vec![r.alias, r.target],
        }
    }
}

impl Constraint for Rule {
    fn kind(&self) -> RuleKind {
        self.as_constraint().kind()
    }

    fn options(&self, graph: &Graph) -> Vec<OptionId> {
        self.as_constraint().options(graph)
    }

    fn validate(&self, graph: &Graph, assignment: &Assignment) -> bool {
        self.as_constraint().validate(graph, assignment)
    }

    fn explain(&self, graph: &Graph) -> Explanation {
        self.as_constraint().explain(graph)
    }

    fn lower(&self, graph: &Graph) -> Vec<Vec<Literal>> {
        self.as_constraint().lower(graph)
    }
}

/// Per-kind rule counts, for logging.
pub fn count_by_kind<'a>(rules: impl Iterator<Item = &'a Rule>) -> IndexMap<RuleKind, usize> {
    let mut counts = IndexMap::new();
    for rule in rules {
        *counts.entry(rule.kind()).or_insert(0) += 1;
    }
    counts.sort_keys();
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::metadata::ModCandidate;

    fn graph_with(candidates: Vec<ModCandidate>) -> (Graph, Vec<OptionId>) {
        let mut ctx = Context::default();
        let ids = candidates
            .into_iter()
            .map(|c| ctx.add_candidate("test", c).unwrap())
            .collect();
        (ctx.seal(), ids)
    }

    #[test]
    fn test_mandatory_lowering_and_validation() {
        let (graph, ids) = graph_with(vec![ModCandidate::new("a", "1.0")]);
        let rule = Rule::mandatory(ids[0]);
        assert_eq!(rule.lower(&graph), vec![vec![1]]);

        let mut assignment = Assignment::new(1);
        assert!(!rule.validate(&graph, &assignment));
        assignment.set(ids[0], true);
        assert!(rule.validate(&graph, &assignment));
    }

    #[test]
    fn test_disabled_lowering_and_validation() {
        let (graph, ids) = graph_with(vec![ModCandidate::new("a", "1.0")]);
        let rule = Rule::disabled(ids[0]);
        assert_eq!(rule.lower(&graph), vec![vec![-1]]);

        let mut assignment = Assignment::new(1);
        assert!(assignment.satisfies(ids[0].negative()));
        assert!(rule.validate(&graph, &assignment));
        assignment.set(ids[0], true);
        assert!(!rule.validate(&graph, &assignment));
    }

    #[test]
    fn test_break_unless_lifts_exclusion() {
        let (graph, ids) = graph_with(vec![
            ModCandidate::new("a", "1.0"),
            ModCandidate::new("b", "1.0"),
            ModCandidate::new("c", "1.0"),
        ]);
        let rule = Rule::breaks(
            ids[0],
            BreakClause::Only(ModRequirement::any_version("b").with_unless(DependencyClause::only("c", "*"))),
        );
        assert_eq!(rule.lower(&graph), vec![vec![-1, -2, 3]]);

        let mut assignment = Assignment::new(3);
        assignment.set(ids[0], true);
        assignment.set(ids[1], true);
        assert!(!rule.validate(&graph, &assignment));
        assignment.set(ids[2], true);
        assert!(rule.validate(&graph, &assignment));
    }

    #[test]
    fn test_identity_group_pairwise() {
        let (graph, ids) = graph_with(vec![
            ModCandidate::new("a", "1.0"),
            ModCandidate::new("a", "2.0"),
            ModCandidate::new("a", "3.0"),
        ]);
        let rule = Rule::identity_group("a");
        let clauses = rule.lower(&graph);
        assert_eq!(clauses.len(), 3);
        assert!(clauses.contains(&vec![-1, -2]));
        assert!(clauses.contains(&vec![-2, -3]));

        let mut assignment = Assignment::new(3);
        assignment.set(ids[0], true);
        assert!(rule.validate(&graph, &assignment));
        assignment.set(ids[2], true);
        assert!(!rule.validate(&graph, &assignment));
    }

    #[test]
    fn test_identity_group_with_mandatory_member_requires_one() {
        let (graph, _) = graph_with(vec![
            ModCandidate::new("a", "1.0").mandatory(),
            ModCandidate::new("a", "2.0"),
        ]);
        let rule = Rule::identity_group("a");
        assert!(rule.lower(&graph).contains(&vec![1, 2]));
        assert!(!rule.validate(&graph, &Assignment::new(2)));
    }

    #[test]
    fn test_dependency_targets_filtered_by_range() {
        let (graph, ids) = graph_with(vec![
            ModCandidate::new("a", "1.0"),
            ModCandidate::new("b", "1.0"),
            ModCandidate::new("b", "2.0"),
        ]);
        let rule = DependencyLink {
            source: ids[0],
            clause: DependencyClause::only("b", ">=2"),
        };
        assert_eq!(rule.targets(&graph), vec![ids[2]]);
        assert_eq!(rule.lower(&graph), vec![vec![-1, 3]]);
    }

    #[test]
    fn test_dependency_unless_adds_satisfiers() {
        let (graph, ids) = graph_with(vec![
            ModCandidate::new("a", "1.0"),
            ModCandidate::new("b", "1.0"),
            ModCandidate::new("c", "1.0"),
        ]);
        let clause = DependencyClause::Only(
            ModRequirement::any_version("b").with_unless(DependencyClause::only("c", "*")),
        );
        let rule = Rule::depends(ids[0], clause);
        assert_eq!(rule.lower(&graph), vec![vec![-1, 2, 3]]);

        let mut assignment = Assignment::new(3);
        assignment.set(ids[0], true);
        assignment.set(ids[2], true);
        assert!(rule.validate(&graph, &assignment));
    }

    #[test]
    fn test_missing_dependency_explanation() {
        let (graph, ids) = graph_with(vec![ModCandidate::new("a", "1.0")]);
        let rule = Rule::depends(ids[0], DependencyClause::only("c", ">=1.0"));
        let explanation = rule.explain(&graph);
        assert_eq!(explanation.kind, RuleKind::DependencyLink);
        assert_eq!(explanation.message.key, "dependency.missing");
        assert_eq!(explanation.remedy, Some(Remedy::AddMissingDependency));
        assert_eq!(explanation.requirement.as_deref(), Some("c >=1.0"));
    }

    #[test]
    fn test_outdated_dependency_suggests_update() {
        let (graph, ids) = graph_with(vec![
            ModCandidate::new("a", "1.0"),
            ModCandidate::new("c", "0.5"),
        ]);
        let rule = Rule::depends(ids[0], DependencyClause::only("c", ">=1.0"));
        let explanation = rule.explain(&graph);
        assert_eq!(explanation.message.key, "dependency.version");
        assert_eq!(explanation.remedy, Some(Remedy::UpdateMod));
    }

    #[test]
    fn test_break_all_excludes_every_requirement() {
        let (graph, ids) = graph_with(vec![
            ModCandidate::new("a", "1.0"),
            ModCandidate::new("b", "1.0"),
            ModCandidate::new("c", "1.0"),
        ]);
        let clause = BreakClause::All(vec![
            ModRequirement::any_version("b"),
            ModRequirement::any_version("c"),
        ]);
        let rule = Rule::breaks(ids[0], clause);
        assert_eq!(rule.lower(&graph), vec![vec![-1, -2], vec![-1, -3]]);

        let mut assignment = Assignment::new(3);
        assignment.set(ids[0], true);
        assignment.set(ids[1], true);
        assert!(!rule.validate(&graph, &assignment));
    }

    #[test]
    fn test_break_never_targets_its_source() {
        let (graph, ids) = graph_with(vec![ModCandidate::new("a", "1.0")]);
        let rule = Rule::breaks(ids[0], BreakClause::only("a", "*"));
        assert!(rule.lower(&graph).is_empty());
    }

    #[test]
    fn test_count_by_kind() {
        let rules = vec![
            Rule::identity_group("a"),
            Rule::mandatory(OptionId::from_index(0)),
            Rule::mandatory(OptionId::from_index(1)),
        ];
        let counts = count_by_kind(rules.iter());
        assert_eq!(counts.get(&RuleKind::Mandatory), Some(&2));
        assert_eq!(counts.get(&RuleKind::IdentityGroup), Some(&1));
    }
}
