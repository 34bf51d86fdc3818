//! Versions, version ranges, and the matching seam.
//!
//! Version syntax is owned by whoever produced the candidate metadata. The
//! engine only needs two questions answered: does a version fall inside a
//! range, and which of two versions is newer. [`VersionMatcher`] is that
//! seam; [`SemverMatcher`] is the default, built on the `semver` crate with a
//! lenient normalization step for the short forms mods like to use (`1.2`,
//! `v3`).

use std::cmp::Ordering;
use std::fmt;

use semver::VersionReq;
use serde::{Deserialize, Serialize};

/// A concrete mod version as declared in metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Version {
    raw: String,
    parsed: Option<semver::Version>,
}

impl Version {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let parsed = normalize(&raw);
        Self { raw, parsed }
    }

    /// The version exactly as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The semver interpretation, if the version could be normalized.
    pub fn semver(&self) -> Option<&semver::Version> {
        self.parsed.as_ref()
    }
}

/// Turn "1", "1.2", "v1.2.3-beta" and friends into a semver version.
fn normalize(raw: &str) -> Option<semver::Version> {
    let trimmed = raw.trim().trim_start_matches(['v', 'V']);
    if let Ok(version) = semver::Version::parse(trimmed) {
        return Some(version);
    }

    let split = trimmed.find(['-', '+']).unwrap_or(trimmed.len());
    let (core, suffix) = trimmed.split_at(split);
    let mut parts: Vec<&str> = core.split('.').collect();
    if parts.len() > 3
        || parts
            .iter()
            .any(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_digit()))
    {
        return None;
    }
    while parts.len() < 3 {
        parts.push("0");
    }

    semver::Version::parse(&format!("{}{}", parts.join("."), suffix)).ok()
}

impl From<String> for Version {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&str> for Version {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.raw
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Version {}

impl std::hash::Hash for Version {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_semver = match (&self.parsed, &other.parsed) {
            (Some(a), Some(b)) => a.cmp(b),
            // Anything we understand sorts above anything we don't.
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        };
        by_semver.then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A range of acceptable versions attached to a dependency or break clause.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VersionRange {
    /// Matches every version.
    Any,
    /// A range expression; `req` is `None` when the expression did not parse.
    Expr { raw: String, req: Option<VersionReq> },
}

impl VersionRange {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "*" || trimmed.eq_ignore_ascii_case("any") {
            return VersionRange::Any;
        }

        let req = VersionReq::parse(trimmed).ok();
        if req.is_none() {
            log::warn!("Unparsable version range '{}', it will match no version", trimmed);
        }

        VersionRange::Expr {
            raw: trimmed.to_string(),
            req,
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, VersionRange::Any)
    }

    pub fn as_str(&self) -> &str {
        match self {
            VersionRange::Any => "*",
            VersionRange::Expr { raw, .. } => raw,
        }
    }
}

impl Default for VersionRange {
    fn default() -> Self {
        VersionRange::Any
    }
}

impl PartialEq for VersionRange {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for VersionRange {}

impl std::hash::Hash for VersionRange {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl From<String> for VersionRange {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<&str> for VersionRange {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<VersionRange> for String {
    fn from(range: VersionRange) -> Self {
        range.as_str().to_string()
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionRange::Any => f.write_str("any version"),
            VersionRange::Expr { raw, .. } => f.write_str(raw),
        }
    }
}

/// Answers version questions on behalf of the engine.
pub trait VersionMatcher: Send + Sync + fmt::Debug {
    /// Whether `version` falls inside `range`.
    fn matches(&self, version: &Version, range: &VersionRange) -> bool;

    /// Orders two versions, newest last.
    fn compare(&self, a: &Version, b: &Version) -> Ordering {
        a.cmp(b)
    }
}

/// Default matcher backed by `semver`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SemverMatcher;

impl VersionMatcher for SemverMatcher {
    fn matches(&self, version: &Version, range: &VersionRange) -> bool {
        match range {
            VersionRange::Any => true,
            VersionRange::Expr { req: Some(req), .. } => match version.semver() {
                Some(parsed) => req.matches(parsed),
                None => false,
            },
            // Literal comparison is the only thing left for unparsable input.
            VersionRange::Expr { raw, req: None } => raw.trim_start_matches('=') == version.as_str(),
        }
    }
}
