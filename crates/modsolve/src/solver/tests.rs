//! End-to-end solver tests: graphs built through a `Context`, resolved and
//! checked for the selection or the diagnostics produced.

use crate::config::ResolverConfig;
use crate::context::{Context, Graph};
use crate::diagnostic::{Diagnostic, Remedy};
use crate::metadata::{
    BreakClause, DependencyClause, Environment, EnvironmentTag, ModCandidate, ModRequirement, ProvidedMod,
};
use crate::resolution::{resolve, Selection, SelectionResult};
use crate::rule::RuleKind;

/// Helper to build a graph from candidates registered by one source
fn graph_of(candidates: Vec<ModCandidate>) -> Graph {
    let mut ctx = Context::default();
    for candidate in candidates {
        ctx.add_candidate("test", candidate).unwrap();
    }
    ctx.seal()
}

fn selected(graph: &Graph) -> Selection {
    match resolve(graph, &ResolverConfig::default()).unwrap() {
        SelectionResult::Selected(selection) => selection,
        SelectionResult::Unsatisfiable(diagnostics) => {
            panic!("expected a selection, got {:#?}", diagnostics)
        }
    }
}

fn unsatisfiable(graph: &Graph, config: &ResolverConfig) -> Vec<Diagnostic> {
    match resolve(graph, config).unwrap() {
        SelectionResult::Unsatisfiable(diagnostics) => diagnostics,
        SelectionResult::Selected(selection) => {
            panic!("expected a conflict, got {:?}", selection.identities())
        }
    }
}

#[test]
fn test_mandatory_with_dependency() {
    let graph = graph_of(vec![
        ModCandidate::new("a", "1.0")
            .mandatory()
            .depends_on(DependencyClause::only("b", "*")),
        ModCandidate::new("b", "1.0"),
    ]);

    let selection = selected(&graph);
    assert_eq!(selection.identities(), vec!["unknown:a", "unknown:b"]);
}

#[test]
fn test_missing_dependency() {
    let graph = graph_of(vec![ModCandidate::new("a", "1.0")
        .mandatory()
        .depends_on(DependencyClause::only("c", ">=1.0"))]);

    let diagnostics = unsatisfiable(&graph, &ResolverConfig::default());
    assert_eq!(diagnostics.len(), 1);

    let diagnostic = &diagnostics[0];
    assert_eq!(diagnostic.kind, Some(RuleKind::DependencyLink));
    assert_eq!(diagnostic.remedy, Some(Remedy::AddMissingDependency));
    assert!(diagnostic.options.contains(&"unknown:a".to_string()));
    assert_eq!(diagnostic.message.key, "dependency.missing");
    assert_eq!(diagnostic.message.get("requirement"), Some("c >=1.0"));
    assert_eq!(diagnostic.rules[0].requirement.as_deref(), Some("c >=1.0"));

    // The dependency together with the mandatory flag is the whole story
    let kinds: Vec<RuleKind> = diagnostic.rules.iter().map(|r| r.kind).collect();
    assert_eq!(kinds, vec![RuleKind::DependencyLink, RuleKind::Mandatory]);
}

#[test]
fn test_highest_version_preferred() {
    let graph = graph_of(vec![ModCandidate::new("a", "1.0"), ModCandidate::new("a", "2.0")]);

    let selection = selected(&graph);
    assert_eq!(selection.len(), 1);
    assert_eq!(selection.version_of("a"), Some("2.0"));
}

#[test]
fn test_break_between_mandatory_mods() {
    let graph = graph_of(vec![
        ModCandidate::new("a", "1.0")
            .mandatory()
            .breaks_with(BreakClause::only("b", "*")),
        ModCandidate::new("b", "1.0").mandatory(),
    ]);

    let diagnostics = unsatisfiable(&graph, &ResolverConfig::default());
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, Some(RuleKind::BreakLink));
    assert_eq!(diagnostics[0].remedy, Some(Remedy::RemoveMod));
    assert_eq!(diagnostics[0].options, vec!["unknown:a", "unknown:b"]);
}

#[test]
fn test_break_lifted_by_unless_target() {
    let breaks = BreakClause::Only(ModRequirement::any_version("b").with_unless(DependencyClause::only("c", "*")));

    let graph = graph_of(vec![
        ModCandidate::new("a", "1.0").mandatory().breaks_with(breaks.clone()),
        ModCandidate::new("b", "1.0").mandatory(),
        ModCandidate::new("c", "1.0").mandatory(),
    ]);
    let selection = selected(&graph);
    assert_eq!(selection.identities(), vec!["unknown:a", "unknown:b", "unknown:c"]);

    let graph = graph_of(vec![
        ModCandidate::new("a", "1.0").mandatory().breaks_with(breaks),
        ModCandidate::new("b", "1.0").mandatory(),
    ]);
    let diagnostics = unsatisfiable(&graph, &ResolverConfig::default());
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, Some(RuleKind::BreakLink));
}

#[test]
fn test_missing_dependency_lifted_by_unless_target() {
    let depends = DependencyClause::Only(ModRequirement::any_version("b").with_unless(DependencyClause::only("c", "*")));

    let graph = graph_of(vec![
        ModCandidate::new("a", "1.0").mandatory().depends_on(depends),
        ModCandidate::new("c", "1.0"),
    ]);
    let selection = selected(&graph);
    assert!(selection.contains("a"));
    assert!(selection.contains("c"));
    assert!(!selection.contains("b"));
}

#[test]
fn test_provided_alias_satisfies_dependency() {
    let graph = graph_of(vec![
        ModCandidate::new("a", "1.0").provides(ProvidedMod::new("legacy-a")),
        ModCandidate::new("b", "1.0").depends_on(DependencyClause::only("legacy-a", "*")),
    ]);

    let selection = selected(&graph);
    assert!(selection.contains("a"));
    assert!(selection.contains("b"));
    let alias = selection.get("legacy-a").unwrap();
    assert_eq!(alias.provided_by.as_deref(), Some("a@1.0"));
    assert_eq!(selection.mods().count(), 2);
}

#[test]
fn test_alias_and_target_are_selected_together() {
    let graph = graph_of(vec![
        ModCandidate::new("a", "1.0").provides(ProvidedMod::new("legacy-a")),
        ModCandidate::new("c", "1.0")
            .mandatory()
            .breaks_with(BreakClause::only("legacy-a", "*")),
    ]);

    // Breaking the alias must keep its target out too
    let selection = selected(&graph);
    assert!(!selection.contains("a"));
    assert!(!selection.contains("legacy-a"));
    assert!(selection.contains("c"));
}

#[test]
fn test_at_most_one_per_identity_group() {
    let graph = graph_of(vec![
        ModCandidate::new("a", "1.0"),
        ModCandidate::new("a", "1.5"),
        ModCandidate::new("a", "3.0").with_origin("other.jar"),
        ModCandidate::new("a", "3.0"),
    ]);

    let selection = selected(&graph);
    assert_eq!(selection.len(), 1);
    // Equal versions fall back to discovery order
    assert_eq!(selection.get("a").unwrap().origin.as_deref(), Some("other.jar"));
}

#[test]
fn test_two_mandatory_versions_conflict() {
    let graph = graph_of(vec![
        ModCandidate::new("a", "1.0").mandatory(),
        ModCandidate::new("a", "2.0").mandatory().with_origin("mods/a-2.jar"),
    ]);

    let diagnostics = unsatisfiable(&graph, &ResolverConfig::default());
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, Some(RuleKind::IdentityGroup));
    assert_eq!(diagnostics[0].message.get("id"), Some("a"));
    assert_eq!(diagnostics[0].remedy, Some(Remedy::RemoveMod));
}

#[test]
fn test_dependency_chooses_matching_version() {
    let graph = graph_of(vec![
        ModCandidate::new("a", "1.0")
            .mandatory()
            .depends_on(DependencyClause::only("b", "<2.0")),
        ModCandidate::new("b", "1.0"),
        ModCandidate::new("b", "2.0"),
    ]);

    let selection = selected(&graph);
    assert_eq!(selection.version_of("b"), Some("1.0"));
}

#[test]
fn test_outdated_dependency_suggests_update() {
    let graph = graph_of(vec![
        ModCandidate::new("a", "1.0")
            .mandatory()
            .depends_on(DependencyClause::only("b", ">=2.0")),
        ModCandidate::new("b", "1.0").mandatory(),
    ]);

    let diagnostics = unsatisfiable(&graph, &ResolverConfig::default());
    assert_eq!(diagnostics[0].kind, Some(RuleKind::DependencyLink));
    assert_eq!(diagnostics[0].message.key, "dependency.version");
    assert_eq!(diagnostics[0].remedy, Some(Remedy::UpdateMod));
}

#[test]
fn test_dependency_on_wrong_environment_mod() {
    let config = ResolverConfig {
        environment: Environment::Server,
        ..Default::default()
    };
    let mut ctx = Context::new(&config);
    ctx.add_candidate(
        "test",
        ModCandidate::new("a", "1.0")
            .mandatory()
            .depends_on(DependencyClause::only("b", "*")),
    )
    .unwrap();
    ctx.add_candidate(
        "test",
        ModCandidate::new("b", "1.0").with_environment(EnvironmentTag::Client),
    )
    .unwrap();
    let graph = ctx.seal();

    let diagnostics = unsatisfiable(&graph, &config);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, Some(RuleKind::DependencyLink));
    assert_eq!(diagnostics[0].remedy, Some(Remedy::ChangeEnvironment));
    assert!(diagnostics[0].rules.iter().any(|r| r.kind == RuleKind::Disabled));
}

#[test]
fn test_independent_conflicts_are_all_reported() {
    let graph = graph_of(vec![
        ModCandidate::new("a", "1.0")
            .mandatory()
            .depends_on(DependencyClause::only("c", "*")),
        ModCandidate::new("b", "1.0")
            .mandatory()
            .depends_on(DependencyClause::only("d", "*")),
    ]);

    let diagnostics = unsatisfiable(&graph, &ResolverConfig::default());
    assert_eq!(diagnostics.len(), 2);
    assert!(diagnostics.iter().all(|d| d.kind == Some(RuleKind::DependencyLink)));

    let mut requirements: Vec<&str> = diagnostics
        .iter()
        .filter_map(|d| d.rules[0].requirement.as_deref())
        .collect();
    requirements.sort();
    assert_eq!(requirements, vec!["c (any version)", "d (any version)"]);
}

#[test]
fn test_optional_mod_is_dropped_instead_of_failing() {
    let graph = graph_of(vec![
        ModCandidate::new("a", "1.0").depends_on(DependencyClause::only("missing", "*")),
        ModCandidate::new("b", "1.0"),
    ]);

    let selection = selected(&graph);
    assert!(!selection.contains("a"));
    assert!(selection.contains("b"));
}

#[test]
fn test_relaxation_budget_falls_back_to_listing() {
    let graph = graph_of(vec![
        ModCandidate::new("a", "1.0")
            .mandatory()
            .breaks_with(BreakClause::only("b", "*")),
        ModCandidate::new("b", "1.0").mandatory(),
    ]);
    let config = ResolverConfig {
        max_relaxation_attempts: 0,
        ..Default::default()
    };

    let diagnostics = unsatisfiable(&graph, &config);
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].is_fallback());
    assert_eq!(diagnostics[0].remedy, None);
    assert_eq!(diagnostics[0].message.key, "unresolved");
    assert_eq!(diagnostics[0].rules.len(), graph.rule_count());
}

#[test]
fn test_iteration_cap_reports_fallback() {
    let graph = graph_of(vec![ModCandidate::new("a", "1.0")]);
    let config = ResolverConfig {
        max_iterations: 0,
        ..Default::default()
    };

    let diagnostics = unsatisfiable(&graph, &config);
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].is_fallback());
}

#[test]
fn test_resolution_is_deterministic() {
    let build = || {
        graph_of(vec![
            ModCandidate::new("a", "1.0")
                .mandatory()
                .depends_on(DependencyClause::Any(vec![
                    crate::metadata::ModRequirement::new("b", "*"),
                    crate::metadata::ModRequirement::new("c", "*"),
                ])),
            ModCandidate::new("b", "1.0").breaks_with(BreakClause::only("c", "*")),
            ModCandidate::new("c", "1.0"),
            ModCandidate::new("c", "2.0"),
            ModCandidate::new("d", "1.0")
                .mandatory()
                .depends_on(DependencyClause::only("e", "*")),
        ])
    };

    let config = ResolverConfig::default();
    let first = resolve(&build(), &config).unwrap();
    let second = resolve(&build(), &config).unwrap();
    assert_eq!(first, second);

    let graph = build();
    assert_eq!(resolve(&graph, &config).unwrap(), resolve(&graph, &config).unwrap());
}

#[test]
fn test_selection_satisfies_every_rule() {
    use crate::rule::{Assignment, Constraint};

    let graph = graph_of(vec![
        ModCandidate::new("a", "1.0")
            .mandatory()
            .depends_on(DependencyClause::only("b", ">=1.0"))
            .breaks_with(BreakClause::only("c", ">=2.0")),
        ModCandidate::new("b", "1.0").depends_on(DependencyClause::only("c", "*")),
        ModCandidate::new("b", "1.2"),
        ModCandidate::new("c", "1.0"),
        ModCandidate::new("c", "2.0"),
        ModCandidate::new("d", "1.0").breaks_with(BreakClause::only("b", "*")),
    ]);

    let selection = selected(&graph);
    let mut assignment = Assignment::new(graph.option_count());
    for entry in selection.entries() {
        assignment.set(entry.option, true);
    }
    for (_, rule) in graph.rules() {
        assert!(rule.validate(&graph, &assignment), "violated: {:?}", rule);
    }
    assert!(!selection.contains("d"));
    assert_eq!(selection.version_of("b"), Some("1.2"));
}
