//! Constraint-based mod selection for mod loaders.
//!
//! Discovery sources register candidates with a [`Context`], which derives
//! rules from their metadata. The sealed [`Graph`] is handed to [`resolve`],
//! which either selects the options to load or explains, through
//! [`Diagnostic`]s, why no selection exists.

pub mod config;
pub mod context;
pub mod descriptor;
pub mod diagnostic;
pub mod discovery;
pub mod error;
pub mod metadata;
pub mod option;
pub mod overrides;
pub mod resolution;
pub mod rule;
pub mod solver;
pub mod version;

pub use config::{ConfigLoader, ResolverConfig};
pub use context::{Context, Graph};
pub use descriptor::DescriptorSource;
pub use diagnostic::{Diagnostic, DiagnosticBuilder, Explanation, Message, Remedy};
pub use discovery::{
    CandidateSource, Discovery, DiscoveryReport, MemorySource, ScanOutcome, ScanRequest, SharedContext,
};
pub use error::{ResolveError, Result};
pub use metadata::{
    BreakClause, DependencyClause, Environment, EnvironmentTag, ModCandidate, ModRequirement, ProvidedMod,
};
pub use option::{LoadOption, OptionId};
pub use overrides::Overrides;
pub use resolution::{resolve, SelectedOption, Selection, SelectionResult};
pub use rule::{Constraint, Rule, RuleId, RuleKind};
pub use version::{Version, VersionMatcher, VersionRange};
