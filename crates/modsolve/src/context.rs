//! The mutable build phase and the sealed graph it produces.
//!
//! Discovery collaborators register candidates with a [`Context`]. Each new
//! option is run through derivation, which creates the rules implied by its
//! metadata (identity group, environment, mandatory flag, provided aliases,
//! dependencies and breaks). Derivation is driven from a worklist so options
//! created while deriving (aliases) never recurse. Once discovery is done the
//! context is sealed into a [`Graph`], which the solver and the diagnostic
//! builder only ever read.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::config::ResolverConfig;
use crate::error::{ResolveError, Result};
use crate::metadata::{Environment, ModCandidate, ModRequirement, ProvidedMod};
use crate::option::{AliasOption, LoadOption, OptionId};
use crate::overrides::Overrides;
use crate::rule::{count_by_kind, Constraint, Rule, RuleId};
use crate::version::{SemverMatcher, VersionMatcher};

/// Source name used for candidates added through [`Context::add_builtin`].
pub const BUILTIN_SOURCE: &str = "builtin";

/// Identity used to detect the same option being registered twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum OptionKey {
    Mod {
        source: String,
        identity: String,
        version: String,
        origin: String,
    },
    Alias {
        target: OptionId,
        identity: String,
    },
}

impl OptionKey {
    fn of(option: &LoadOption) -> Self {
        match option {
            LoadOption::Mod(m) => OptionKey::Mod {
                source: m.source.clone(),
                identity: m.candidate.identity(),
                version: m.candidate.version.as_str().to_string(),
                origin: m.candidate.origin.clone(),
            },
            LoadOption::Alias(a) => OptionKey::Alias {
                target: a.target,
                identity: option.identity(),
            },
        }
    }
}

/// Options and rules of one resolution problem.
///
/// Produced by [`Context::seal`]; immutable afterwards.
#[derive(Debug)]
pub struct Graph {
    options: Vec<LoadOption>,
    rules: Vec<Rule>,
    /// Option ids by mod id, groups in order of first appearance
    groups: IndexMap<String, Vec<OptionId>>,
    mandatory: HashSet<OptionId>,
    disabled: HashSet<OptionId>,
    matcher: Arc<dyn VersionMatcher>,
    environment: Environment,
    warnings: Vec<ResolveError>,
}

impl Graph {
    fn new(environment: Environment, matcher: Arc<dyn VersionMatcher>) -> Self {
        Self {
            options: Vec::new(),
            rules: Vec::new(),
            groups: IndexMap::new(),
            mandatory: HashSet::new(),
            disabled: HashSet::new(),
            matcher,
            environment,
            warnings: Vec::new(),
        }
    }

    pub fn option(&self, id: OptionId) -> Option<&LoadOption> {
        self.options.get(id.index())
    }

    pub fn options(&self) -> impl Iterator<Item = (OptionId, &LoadOption)> {
        self.options
            .iter()
            .enumerate()
            .map(|(i, o)| (OptionId::from_index(i), o))
    }

    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    pub fn rule(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(id.index())
    }

    pub fn rules(&self) -> impl Iterator<Item = (RuleId, &Rule)> {
        self.rules
            .iter()
            .enumerate()
            .map(|(i, r)| (RuleId::from_index(i), r))
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Members of the identity group for `mod_id`, in registration order.
    pub fn group(&self, mod_id: &str) -> &[OptionId] {
        self.groups.get(mod_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All identity groups in order of first appearance.
    pub fn groups(&self) -> impl Iterator<Item = (&str, &[OptionId])> {
        self.groups.iter().map(|(id, members)| (id.as_str(), members.as_slice()))
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn matcher(&self) -> &dyn VersionMatcher {
        self.matcher.as_ref()
    }

    /// Whether a mandatory rule targets this option.
    pub fn is_mandatory(&self, id: OptionId) -> bool {
        self.mandatory.contains(&id)
    }

    /// Whether a disabled rule targets this option.
    pub fn is_disabled(&self, id: OptionId) -> bool {
        self.disabled.contains(&id)
    }

    /// Recoverable problems collected while building.
    pub fn warnings(&self) -> &[ResolveError] {
        &self.warnings
    }

    /// Human label of an option for messages.
    pub fn label(&self, id: OptionId) -> String {
        match self.option(id) {
            Some(option) => option.short_string(),
            None => format!("#{}", id),
        }
    }

    /// Options currently satisfying `req`, in registration order.
    pub fn matching(&self, req: &ModRequirement) -> Vec<OptionId> {
        let group = req.group();
        self.group(req.mod_id())
            .iter()
            .copied()
            .filter(|&m| {
                let option = &self.options[m.index()];
                group.map_or(true, |g| g == option.group())
                    && self.matcher.matches(option.version(), &req.range)
            })
            .collect()
    }

    /// Union of [`Graph::matching`] over several requirements.
    pub fn matching_any(&self, reqs: &[ModRequirement]) -> Vec<OptionId> {
        let mut result = Vec::new();
        for req in reqs {
            for id in self.matching(req) {
                if !result.contains(&id) {
                    result.push(id);
                }
            }
        }
        result
    }

    /// Every rule must reference registered options only.
    pub(crate) fn check_integrity(&self) -> Result<()> {
        for (rule_id, rule) in self.rules() {
            for option in rule.direct_options() {
                if option.index() >= self.options.len() {
                    return Err(ResolveError::InternalSolverFault(format!(
                        "rule #{} ({}) references unregistered option #{}",
                        rule_id,
                        rule.kind(),
                        option
                    )));
                }
            }
        }
        Ok(())
    }

    fn push_rule(&mut self, rule: Rule) -> RuleId {
        match &rule {
            Rule::Mandatory(r) => {
                self.mandatory.insert(r.option);
            }
            Rule::Disabled(r) => {
                self.disabled.insert(r.option);
            }
            _ => {}
        }
        let id = RuleId::from_index(self.rules.len());
        log::trace!("Rule #{}: {:?}", id, rule);
        self.rules.push(rule);
        id
    }
}

/// Mutable registry used during discovery.
#[derive(Debug)]
pub struct Context {
    graph: Graph,
    keys: HashMap<OptionKey, OptionId>,
    /// Options registered but not yet derived
    pending: VecDeque<OptionId>,
    overrides: Overrides,
    dump_override_paths: bool,
    next_discovery_index: u32,
}

impl Default for Context {
    fn default() -> Self {
        Self::new(&ResolverConfig::default())
    }
}

impl Context {
    /// Empty context using the default semver matcher and no overrides.
    pub fn new(config: &ResolverConfig) -> Self {
        Self {
            graph: Graph::new(config.environment, Arc::new(SemverMatcher)),
            keys: HashMap::new(),
            pending: VecDeque::new(),
            overrides: Overrides::new(),
            dump_override_paths: config.dump_override_paths,
            next_discovery_index: 0,
        }
    }

    /// Context with the override file named by the config, if any, loaded.
    pub fn from_config(config: &ResolverConfig) -> Result<Self> {
        let mut context = Self::new(config);
        if let Some(path) = &config.overrides {
            context.overrides = Overrides::load(path)?;
        }
        Ok(context)
    }

    pub fn with_matcher(mut self, matcher: Arc<dyn VersionMatcher>) -> Self {
        self.graph.matcher = matcher;
        self
    }

    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Read access to what has been registered so far.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Register an option and derive its rules.
    ///
    /// Registering the same mod option twice is a
    /// [`ResolveError::DuplicateOption`]; the same alias merges into the
    /// existing one.
    pub fn add_option(&mut self, option: LoadOption) -> Result<OptionId> {
        let id = self.register(option)?;
        self.derive_pending();
        Ok(id)
    }

    pub fn add_candidate(&mut self, source: &str, candidate: ModCandidate) -> Result<OptionId> {
        self.add_option(LoadOption::candidate(source, candidate))
    }

    /// Register a candidate supplied by the host itself. Always mandatory.
    pub fn add_builtin(&mut self, mut candidate: ModCandidate) -> Result<OptionId> {
        candidate.mandatory = true;
        self.add_candidate(BUILTIN_SOURCE, candidate)
    }

    /// Register `provided` as an extra identity of `target`.
    pub fn add_alias(&mut self, target: OptionId, provided: ProvidedMod) -> Result<OptionId> {
        let candidate = match self.graph.option(target) {
            Some(LoadOption::Mod(m)) => &m.candidate,
            _ => return Err(ResolveError::UnknownOption(target)),
        };
        let alias = AliasOption::new(target, candidate, provided);
        self.add_option(LoadOption::Alias(alias))
    }

    /// Register a rule supplied from outside derivation.
    ///
    /// Option references are not checked here; [`resolve`](crate::resolve)
    /// reports a dangling one as an internal fault.
    pub fn add_rule(&mut self, rule: Rule) -> RuleId {
        self.graph.push_rule(rule)
    }

    /// Record a recoverable problem and keep going.
    pub fn record_warning(&mut self, error: ResolveError) {
        log::warn!("{}", error);
        self.graph.warnings.push(error);
    }

    pub fn warnings(&self) -> &[ResolveError] {
        &self.graph.warnings
    }

    /// Freeze the context. Only reads are possible from here on.
    pub fn seal(mut self) -> Graph {
        self.derive_pending();
        log::debug!(
            "Sealed graph: {} options, {} groups, {} rules {:?}",
            self.graph.options.len(),
            self.graph.groups.len(),
            self.graph.rules.len(),
            count_by_kind(self.graph.rules.iter())
        );
        self.graph
    }

    fn register(&mut self, mut option: LoadOption) -> Result<OptionId> {
        let key = OptionKey::of(&option);
        if let Some(&existing) = self.keys.get(&key) {
            if option.is_alias() {
                log::trace!("Merged duplicate alias {} into #{}", option, existing);
                return Ok(existing);
            }
            let source_name = option.as_mod().map(|m| m.source.clone()).unwrap_or_default();
            return Err(ResolveError::DuplicateOption {
                identity: option.identity(),
                source_name,
                existing,
            });
        }

        let id = OptionId::from_index(self.graph.options.len());
        option.set_discovery_index(self.next_discovery_index);
        self.next_discovery_index += 1;

        let mod_id = option.id().to_string();
        let new_group = !self.graph.groups.contains_key(&mod_id);
        self.graph.groups.entry(mod_id.clone()).or_default().push(id);

        log::debug!("Registered option #{}: {}", id, option);
        self.graph.options.push(option);
        self.keys.insert(key, id);
        self.pending.push_back(id);

        if new_group {
            self.graph.push_rule(Rule::identity_group(mod_id));
        }

        Ok(id)
    }

    fn derive_pending(&mut self) {
        while let Some(id) = self.pending.pop_front() {
            self.derive(id);
        }
    }

    fn derive(&mut self, id: OptionId) {
        let candidate = match &self.graph.options[id.index()] {
            LoadOption::Alias(alias) => {
                let target = alias.target;
                self.graph.push_rule(Rule::provided(id, target));
                return;
            }
            LoadOption::Mod(m) => m.candidate.clone(),
        };

        if !candidate.environment.matches(self.graph.environment) {
            log::debug!(
                "{} is {}-only, disabling it in the {} environment",
                candidate,
                candidate.environment,
                self.graph.environment
            );
            self.graph
                .push_rule(Rule::wrong_environment(id, candidate.environment));
            return;
        }

        if candidate.mandatory {
            self.graph.push_rule(Rule::mandatory(id));
        }

        for provided in &candidate.provides {
            let alias = AliasOption::new(id, &candidate, provided.clone());
            if let Err(e) = self.register(LoadOption::Alias(alias)) {
                self.record_warning(e);
            }
        }

        if self.dump_override_paths {
            log::info!("Override path for {}: '{}'", candidate, candidate.origin);
        }

        let (depends, breaks) = match self.overrides.get(&candidate.origin) {
            Some(entry) => {
                log::debug!("Applying dependency overrides to {}", candidate);
                let applied = entry.apply(&candidate);
                for mismatch in applied.mismatches {
                    self.record_warning(mismatch);
                }
                (applied.depends, applied.breaks)
            }
            None => (candidate.depends.clone(), candidate.breaks.clone()),
        };

        for clause in depends {
            if clause.is_optional() {
                continue;
            }
            self.graph.push_rule(Rule::depends(id, clause));
        }
        for clause in breaks {
            if clause.is_optional() {
                continue;
            }
            self.graph.push_rule(Rule::breaks(id, clause));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{BreakClause, DependencyClause, EnvironmentTag};
    use crate::overrides::{ClauseOverride, ModOverrides};
    use crate::rule::RuleKind;

    fn kinds(graph: &Graph) -> Vec<RuleKind> {
        graph.rules().map(|(_, r)| r.kind()).collect()
    }

    #[test]
    fn test_candidate_derives_rules() {
        let mut ctx = Context::default();
        ctx.add_candidate(
            "test",
            ModCandidate::new("a", "1.0")
                .mandatory()
                .depends_on(DependencyClause::only("b", "*"))
                .breaks_with(BreakClause::only("c", "*")),
        )
        .unwrap();

        let graph = ctx.seal();
        assert_eq!(
            kinds(&graph),
            vec![
                RuleKind::IdentityGroup,
                RuleKind::Mandatory,
                RuleKind::DependencyLink,
                RuleKind::BreakLink
            ]
        );
    }

    #[test]
    fn test_identity_group_created_once_per_id() {
        let mut ctx = Context::default();
        ctx.add_candidate("test", ModCandidate::new("a", "1.0")).unwrap();
        ctx.add_candidate("test", ModCandidate::new("a", "2.0")).unwrap();

        let graph = ctx.seal();
        let groups = kinds(&graph)
            .into_iter()
            .filter(|k| *k == RuleKind::IdentityGroup)
            .count();
        assert_eq!(groups, 1);
        assert_eq!(graph.group("a").len(), 2);
    }

    #[test]
    fn test_wrong_environment_only_disables() {
        let mut ctx = Context::new(&ResolverConfig {
            environment: Environment::Server,
            ..Default::default()
        });
        let id = ctx
            .add_candidate(
                "test",
                ModCandidate::new("a", "1.0")
                    .mandatory()
                    .with_environment(EnvironmentTag::Client)
                    .depends_on(DependencyClause::only("b", "*")),
            )
            .unwrap();

        let graph = ctx.seal();
        assert_eq!(kinds(&graph), vec![RuleKind::IdentityGroup, RuleKind::Disabled]);
        assert!(graph.is_disabled(id));
        assert!(!graph.is_mandatory(id));
    }

    #[test]
    fn test_provides_creates_alias_and_link() {
        let mut ctx = Context::default();
        let target = ctx
            .add_candidate("test", ModCandidate::new("a", "1.2").provides(ProvidedMod::new("legacy-a")))
            .unwrap();

        let graph = ctx.seal();
        let alias = graph.group("legacy-a")[0];
        assert_eq!(graph.option(alias).unwrap().as_alias().unwrap().target, target);
        assert!(kinds(&graph).contains(&RuleKind::ProvidedLink));
        assert_eq!(graph.option(alias).unwrap().discovery_index(), 1);
    }

    #[test]
    fn test_duplicate_candidate_is_rejected() {
        let mut ctx = Context::default();
        let first = ctx.add_candidate("test", ModCandidate::new("a", "1.0")).unwrap();
        let err = ctx
            .add_candidate("test", ModCandidate::new("a", "1.0"))
            .unwrap_err();

        match err {
            ResolveError::DuplicateOption { existing, .. } => assert_eq!(existing, first),
            other => panic!("unexpected error {:?}", other),
        }

        // Same metadata from a different origin is a separate option
        ctx.add_candidate("test", ModCandidate::new("a", "1.0").with_origin("mods/a-copy.jar"))
            .unwrap();
        assert_eq!(ctx.graph().group("a").len(), 2);
    }

    #[test]
    fn test_identical_alias_merges() {
        let mut ctx = Context::default();
        let target = ctx.add_candidate("test", ModCandidate::new("a", "1.0")).unwrap();
        let first = ctx.add_alias(target, ProvidedMod::new("b")).unwrap();
        let second = ctx.add_alias(target, ProvidedMod::new("b")).unwrap();
        assert_eq!(first, second);
        assert_eq!(ctx.graph().group("b").len(), 1);
    }

    #[test]
    fn test_alias_of_unknown_target() {
        let mut ctx = Context::default();
        assert!(matches!(
            ctx.add_alias(OptionId::from_index(3), ProvidedMod::new("b")),
            Err(ResolveError::UnknownOption(_))
        ));
    }

    #[test]
    fn test_dangling_rule_fails_integrity_check() {
        let mut ctx = Context::default();
        let id = ctx.add_candidate("test", ModCandidate::new("a", "1.0")).unwrap();
        ctx.add_rule(Rule::disabled(id));
        assert!(ctx.graph().check_integrity().is_ok());

        ctx.add_rule(Rule::mandatory(OptionId::from_index(7)));
        assert!(matches!(
            ctx.seal().check_integrity(),
            Err(ResolveError::InternalSolverFault(_))
        ));
    }

    #[test]
    fn test_optional_clauses_are_skipped() {
        let mut ctx = Context::default();
        ctx.add_candidate(
            "test",
            ModCandidate::new("a", "1.0").depends_on(DependencyClause::Only(
                ModRequirement::any_version("b").with_optional(true),
            )),
        )
        .unwrap();
        assert_eq!(kinds(&ctx.seal()), vec![RuleKind::IdentityGroup]);
    }

    #[test]
    fn test_builtin_is_mandatory() {
        let mut ctx = Context::default();
        let id = ctx.add_builtin(ModCandidate::new("minecraft", "1.20.1")).unwrap();
        let graph = ctx.seal();
        assert!(graph.is_mandatory(id));
        assert_eq!(graph.option(id).unwrap().as_mod().unwrap().source, BUILTIN_SOURCE);
    }

    #[test]
    fn test_late_targets_are_visible_to_earlier_rules() {
        let mut ctx = Context::default();
        ctx.add_candidate("test", ModCandidate::new("a", "1.0").depends_on(DependencyClause::only("b", "*")))
            .unwrap();
        let b = ctx.add_candidate("test", ModCandidate::new("b", "1.0")).unwrap();

        let graph = ctx.seal();
        let (_, dep) = graph
            .rules()
            .find(|(_, r)| r.kind() == RuleKind::DependencyLink)
            .unwrap();
        assert!(dep.options(&graph).contains(&b));
    }

    #[test]
    fn test_group_qualified_matching() {
        let mut ctx = Context::default();
        let ours = ctx
            .add_candidate("test", ModCandidate::new("lib", "1.0").with_group("org.ours"))
            .unwrap();
        ctx.add_candidate("test", ModCandidate::new("lib", "1.0").with_group("org.theirs").with_origin("x"))
            .unwrap();

        let graph = ctx.seal();
        assert_eq!(graph.matching(&ModRequirement::any_version("org.ours:lib")), vec![ours]);
        assert_eq!(graph.matching(&ModRequirement::any_version("lib")).len(), 2);
    }

    #[test]
    fn test_overrides_replace_declared_clauses() {
        let candidate = ModCandidate::new("a", "1.0")
            .with_origin("mods/a.jar")
            .depends_on(DependencyClause::only("b", ">=2"));
        let mut overrides = Overrides::new();
        overrides.insert(
            "mods/a.jar",
            ModOverrides {
                depends: vec![
                    ClauseOverride {
                        replace: DependencyClause::only("b", ">=2"),
                        with: DependencyClause::only("b", ">=1"),
                    },
                    ClauseOverride {
                        replace: DependencyClause::only("zzz", "*"),
                        with: DependencyClause::only("yyy", "*"),
                    },
                ],
                breaks: vec![],
            },
        );

        let mut ctx = Context::default().with_overrides(overrides);
        ctx.add_candidate("test", candidate).unwrap();
        assert_eq!(ctx.warnings().len(), 1);

        let graph = ctx.seal();
        let clause = graph
            .rules()
            .find_map(|(_, r)| match r {
                Rule::Dependency(link) => Some(link.clause.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(clause, DependencyClause::only("b", ">=1"));
        assert_eq!(graph.warnings().len(), 1);
    }

    #[test]
    fn test_discovery_order_follows_registration() {
        let mut ctx = Context::default();
        let a = ctx.add_candidate("test", ModCandidate::new("a", "1.0")).unwrap();
        let b = ctx.add_candidate("test", ModCandidate::new("b", "1.0")).unwrap();
        let graph = ctx.seal();
        assert!(graph.option(a).unwrap().discovery_index() < graph.option(b).unwrap().discovery_index());
        let order: Vec<&str> = graph.groups().map(|(id, _)| id).collect();
        assert_eq!(order, vec!["a", "b"]);
    }
}
