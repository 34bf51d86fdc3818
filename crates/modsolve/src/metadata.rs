//! Declarative facts about a discovered candidate.
//!
//! These are the tuples discovery collaborators hand to the
//! [`Context`](crate::Context): who the candidate is, where it came from, and
//! which other mods it needs or refuses to run with.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::version::{Version, VersionRange};

/// Group assumed for candidates that do not declare one.
pub const DEFAULT_GROUP: &str = "unknown";

/// The environment of the current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Client,
    Server,
}

impl Default for Environment {
    fn default() -> Self {
        Environment::Client
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "client" => Ok(Environment::Client),
            "server" | "dedicated_server" => Ok(Environment::Server),
            other => Err(format!("unknown environment '{}'", other)),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Client => f.write_str("client"),
            Environment::Server => f.write_str("server"),
        }
    }
}

/// The environments a candidate declares itself applicable to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnvironmentTag {
    #[serde(rename = "*")]
    Any,
    #[serde(rename = "client")]
    Client,
    #[serde(rename = "server", alias = "dedicated_server")]
    Server,
}

impl EnvironmentTag {
    pub fn matches(&self, environment: Environment) -> bool {
        match self {
            EnvironmentTag::Any => true,
            EnvironmentTag::Client => environment == Environment::Client,
            EnvironmentTag::Server => environment == Environment::Server,
        }
    }
}

impl Default for EnvironmentTag {
    fn default() -> Self {
        EnvironmentTag::Any
    }
}

impl fmt::Display for EnvironmentTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvironmentTag::Any => f.write_str("*"),
            EnvironmentTag::Client => f.write_str("client"),
            EnvironmentTag::Server => f.write_str("server"),
        }
    }
}

/// Split an optionally group-qualified id (`group:id`).
pub(crate) fn split_qualified(id: &str) -> (Option<&str>, &str) {
    match id.split_once(':') {
        Some((group, id)) => (Some(group), id),
        None => (None, id),
    }
}

/// A single "this id, in this range" requirement.
///
/// The id may be written `group:id`, in which case only options from that
/// group can satisfy it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RequirementRepr")]
pub struct ModRequirement {
    pub id: String,
    #[serde(rename = "versions", default, skip_serializing_if = "VersionRange::is_any")]
    pub range: VersionRange,
    /// The requirement does not apply while this clause is satisfied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unless: Option<Box<DependencyClause>>,
    /// Optional requirements never produce a rule.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ModRequirement {
    pub fn new(id: impl Into<String>, range: impl Into<VersionRange>) -> Self {
        Self {
            id: id.into(),
            range: range.into(),
            unless: None,
            optional: false,
            reason: None,
        }
    }

    /// Requirement on any version of `id`.
    pub fn any_version(id: impl Into<String>) -> Self {
        Self::new(id, VersionRange::Any)
    }

    pub fn with_unless(mut self, unless: DependencyClause) -> Self {
        self.unless = Some(Box::new(unless));
        self
    }

    pub fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    /// Group qualifier, if any.
    pub fn group(&self) -> Option<&str> {
        split_qualified(&self.id).0
    }

    /// The bare mod id.
    pub fn mod_id(&self) -> &str {
        split_qualified(&self.id).1
    }
}

impl fmt::Display for ModRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.range {
            VersionRange::Any => write!(f, "{} (any version)", self.id),
            range => write!(f, "{} {}", self.id, range),
        }
    }
}

/// Accepted spellings of a requirement: a bare id or a full object.
#[derive(Deserialize)]
#[serde(untagged)]
enum RequirementRepr {
    Id(String),
    Full {
        id: String,
        #[serde(default)]
        versions: VersionRange,
        #[serde(default)]
        unless: Option<Box<DependencyClause>>,
        #[serde(default)]
        optional: bool,
        #[serde(default)]
        reason: Option<String>,
    },
}

impl From<RequirementRepr> for ModRequirement {
    fn from(repr: RequirementRepr) -> Self {
        match repr {
            RequirementRepr::Id(id) => ModRequirement::any_version(id),
            RequirementRepr::Full {
                id,
                versions,
                unless,
                optional,
                reason,
            } => ModRequirement {
                id,
                range: versions,
                unless,
                optional,
                reason,
            },
        }
    }
}

/// A declared dependency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencyClause {
    /// Any one of the alternatives satisfies the dependency.
    Any(Vec<ModRequirement>),
    Only(ModRequirement),
}

impl DependencyClause {
    pub fn only(id: impl Into<String>, range: impl Into<VersionRange>) -> Self {
        DependencyClause::Only(ModRequirement::new(id, range))
    }

    pub fn requirements(&self) -> &[ModRequirement] {
        match self {
            DependencyClause::Only(req) => std::slice::from_ref(req),
            DependencyClause::Any(reqs) => reqs,
        }
    }

    /// An `Any` clause is ignored only when every alternative is optional.
    pub fn is_optional(&self) -> bool {
        match self {
            DependencyClause::Only(req) => req.optional,
            DependencyClause::Any(reqs) => !reqs.is_empty() && reqs.iter().all(|r| r.optional),
        }
    }
}

impl fmt::Display for DependencyClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyClause::Only(req) => req.fmt(f),
            DependencyClause::Any(reqs) => {
                let parts: Vec<String> = reqs.iter().map(|r| r.to_string()).collect();
                write!(f, "any of [{}]", parts.join(", "))
            }
        }
    }
}

/// A declared incompatibility.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BreakClause {
    /// Every listed requirement is excluded.
    All(Vec<ModRequirement>),
    Only(ModRequirement),
}

impl BreakClause {
    pub fn only(id: impl Into<String>, range: impl Into<VersionRange>) -> Self {
        BreakClause::Only(ModRequirement::new(id, range))
    }

    pub fn requirements(&self) -> &[ModRequirement] {
        match self {
            BreakClause::Only(req) => std::slice::from_ref(req),
            BreakClause::All(reqs) => reqs,
        }
    }

    pub fn is_optional(&self) -> bool {
        match self {
            BreakClause::Only(req) => req.optional,
            BreakClause::All(reqs) => !reqs.is_empty() && reqs.iter().all(|r| r.optional),
        }
    }
}

impl fmt::Display for BreakClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakClause::Only(req) => req.fmt(f),
            BreakClause::All(reqs) => {
                let parts: Vec<String> = reqs.iter().map(|r| r.to_string()).collect();
                write!(f, "all of [{}]", parts.join(", "))
            }
        }
    }
}

/// An alternate identity a candidate answers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "ProvidedRepr")]
pub struct ProvidedMod {
    /// Provided id, optionally `group:id`.
    pub id: String,
    /// Defaults to the providing candidate's version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
}

impl ProvidedMod {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<Version>) -> Self {
        self.version = Some(version.into());
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProvidedRepr {
    Id(String),
    Full {
        id: String,
        #[serde(default)]
        version: Option<Version>,
    },
}

impl From<ProvidedRepr> for ProvidedMod {
    fn from(repr: ProvidedRepr) -> Self {
        match repr {
            ProvidedRepr::Id(id) => ProvidedMod::new(id),
            ProvidedRepr::Full { id, version } => ProvidedMod { id, version },
        }
    }
}

/// Everything the engine needs to know about one discovered mod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModCandidate {
    pub id: String,
    #[serde(default = "default_group")]
    pub group: String,
    pub version: Version,
    /// Describable origin path; also the key for override lookup.
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub mandatory: bool,
    #[serde(default)]
    pub environment: EnvironmentTag,
    #[serde(default)]
    pub depends: Vec<DependencyClause>,
    #[serde(default)]
    pub breaks: Vec<BreakClause>,
    #[serde(default)]
    pub provides: Vec<ProvidedMod>,
}

fn default_group() -> String {
    DEFAULT_GROUP.to_string()
}

impl ModCandidate {
    pub fn new(id: impl Into<String>, version: impl Into<Version>) -> Self {
        let id = id.into();
        Self {
            origin: format!("<{}>", id),
            id,
            group: default_group(),
            version: version.into(),
            mandatory: false,
            environment: EnvironmentTag::Any,
            depends: Vec::new(),
            breaks: Vec::new(),
            provides: Vec::new(),
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    pub fn with_environment(mut self, environment: EnvironmentTag) -> Self {
        self.environment = environment;
        self
    }

    pub fn depends_on(mut self, clause: DependencyClause) -> Self {
        self.depends.push(clause);
        self
    }

    pub fn breaks_with(mut self, clause: BreakClause) -> Self {
        self.breaks.push(clause);
        self
    }

    pub fn provides(mut self, provided: ProvidedMod) -> Self {
        self.provides.push(provided);
        self
    }

    /// Canonical `group:id` identity.
    pub fn identity(&self) -> String {
        format!("{}:{}", self.group, self.id)
    }
}

impl fmt::Display for ModCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_tag_matches() {
        assert!(EnvironmentTag::Any.matches(Environment::Server));
        assert!(EnvironmentTag::Client.matches(Environment::Client));
        assert!(!EnvironmentTag::Client.matches(Environment::Server));
    }

    #[test]
    fn test_requirement_group_qualifier() {
        let req = ModRequirement::any_version("org.example:lib");
        assert_eq!(req.group(), Some("org.example"));
        assert_eq!(req.mod_id(), "lib");

        let bare = ModRequirement::any_version("lib");
        assert_eq!(bare.group(), None);
        assert_eq!(bare.mod_id(), "lib");
    }

    #[test]
    fn test_dependency_clause_json_forms() {
        let clauses: Vec<DependencyClause> = serde_json::from_str(
            r#"["fabric", {"id": "sodium", "versions": ">=0.4"}, [{"id": "a"}, "b"]]"#,
        )
        .unwrap();

        assert_eq!(clauses[0], DependencyClause::Only(ModRequirement::any_version("fabric")));
        assert_eq!(clauses[1], DependencyClause::only("sodium", ">=0.4"));
        match &clauses[2] {
            DependencyClause::Any(reqs) => assert_eq!(reqs.len(), 2),
            other => panic!("expected Any, got {:?}", other),
        }
    }

    #[test]
    fn test_unless_clause_json() {
        let clause: DependencyClause = serde_json::from_str(
            r#"{"id": "a", "unless": {"id": "b", "versions": ">=2"}}"#,
        )
        .unwrap();
        let DependencyClause::Only(req) = clause else {
            panic!("expected Only");
        };
        assert_eq!(req.unless.as_deref(), Some(&DependencyClause::only("b", ">=2")));
    }

    #[test]
    fn test_optional_any_clause() {
        let clause = DependencyClause::Any(vec![
            ModRequirement::any_version("a").with_optional(true),
            ModRequirement::any_version("b"),
        ]);
        assert!(!clause.is_optional());
        assert!(DependencyClause::Only(ModRequirement::any_version("a").with_optional(true)).is_optional());
    }

    #[test]
    fn test_candidate_identity_and_defaults() {
        let candidate: ModCandidate =
            serde_json::from_str(r#"{"id": "a", "version": "1.0"}"#).unwrap();
        assert_eq!(candidate.identity(), "unknown:a");
        assert!(!candidate.mandatory);
        assert_eq!(candidate.environment, EnvironmentTag::Any);
        assert_eq!(candidate.to_string(), "a@1.0");
    }

    #[test]
    fn test_provided_mod_forms() {
        let provided: Vec<ProvidedMod> =
            serde_json::from_str(r#"["legacy-a", {"id": "b", "version": "2.0"}]"#).unwrap();
        assert_eq!(provided[0], ProvidedMod::new("legacy-a"));
        assert_eq!(provided[1], ProvidedMod::new("b").with_version("2.0"));
    }
}
