//! The discovery fixpoint.
//!
//! Locations are scanned by [`CandidateSource`]s. A scan yields candidates,
//! which are registered with the shared context, and nested locations, which
//! are queued for the next pass. Each pass scans its batch concurrently and
//! then registers results in request order, so discovery order (and with it
//! every tie-break downstream) does not depend on thread timing. The loop
//! ends when a pass queues nothing new.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use rayon::prelude::*;

use crate::config::DEFAULT_SCAN_THREADS;
use crate::context::{Context, Graph};
use crate::error::{ResolveError, Result};
use crate::metadata::ModCandidate;
use crate::option::OptionId;

/// A location waiting to be scanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub location: PathBuf,
    /// Stable, human readable path; becomes the candidate origin.
    pub describe: String,
    /// Directly requested locations may hold mandatory candidates.
    /// Anything found nested inside another candidate is optional.
    pub direct: bool,
    /// The entry a container declared for this location, as written.
    pub entry: Option<String>,
}

impl ScanRequest {
    pub fn root(location: impl Into<PathBuf>) -> Self {
        let location = location.into();
        Self {
            describe: location.display().to_string(),
            location,
            direct: true,
            entry: None,
        }
    }

    pub fn with_describe(mut self, describe: impl Into<String>) -> Self {
        self.describe = describe.into();
        self
    }

    /// A directory entry of this location. Keeps `direct`.
    pub fn child(&self, location: impl Into<PathBuf>, name: &str) -> Self {
        Self {
            location: location.into(),
            describe: format!("{}/{}", self.describe, name),
            direct: self.direct,
            entry: None,
        }
    }

    /// A location found inside this one, described as `parent!/entry`.
    pub fn nested(&self, location: impl Into<PathBuf>, entry: &str) -> Self {
        Self {
            location: location.into(),
            describe: format!("{}!/{}", self.describe, entry),
            direct: false,
            entry: Some(entry.to_string()),
        }
    }

    /// A declared entry may not climb out of the location that declared it.
    pub(crate) fn escapes_container(&self) -> bool {
        self.entry
            .as_deref()
            .is_some_and(|entry| Path::new(entry).components().any(|c| matches!(c, Component::ParentDir)))
    }
}

/// What a source found at one location.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub candidates: Vec<ModCandidate>,
    pub nested: Vec<ScanRequest>,
}

/// Something that can turn a location into candidates.
pub trait CandidateSource: Send + Sync {
    fn name(&self) -> &str;

    /// `Ok(None)` means the location is not one this source understands.
    fn scan(&self, request: &ScanRequest) -> Result<Option<ScanOutcome>>;
}

/// A [`Context`] shared between discovery workers.
///
/// Every write takes the lock, so registration is serialized.
#[derive(Debug, Clone)]
pub struct SharedContext {
    inner: Arc<Mutex<Context>>,
}

impl SharedContext {
    pub fn new(context: Context) -> Self {
        Self {
            inner: Arc::new(Mutex::new(context)),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, Context> {
        // Each mutation is a single lock acquisition, so poisoned data is still whole.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn register(&self, source: &str, candidate: ModCandidate) -> Result<OptionId> {
        self.lock().add_candidate(source, candidate)
    }

    pub fn record_warning(&self, error: ResolveError) {
        self.lock().record_warning(error);
    }

    /// Take the context back out. Fails while other handles are alive.
    pub fn into_inner(self) -> Result<Context> {
        match Arc::try_unwrap(self.inner) {
            Ok(mutex) => Ok(mutex.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())),
            Err(_) => Err(ResolveError::InternalSolverFault(
                "context is still shared with discovery workers".to_string(),
            )),
        }
    }

    pub fn seal(self) -> Result<Graph> {
        Ok(self.into_inner()?.seal())
    }
}

/// Summary of a discovery run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    pub passes: usize,
    pub scanned: usize,
    pub candidates: usize,
    pub failures: usize,
}

/// Result of offering one location to every source.
#[derive(Debug, Default)]
struct ScanResult {
    claimed: Option<(String, ScanOutcome)>,
    errors: Vec<ResolveError>,
}

/// Drives sources to a fixpoint.
pub struct Discovery {
    sources: Vec<Box<dyn CandidateSource>>,
    threads: usize,
}

impl Discovery {
    pub fn new(sources: Vec<Box<dyn CandidateSource>>) -> Self {
        Self {
            sources,
            threads: DEFAULT_SCAN_THREADS,
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn run(&self, context: &SharedContext, roots: Vec<ScanRequest>) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();
        let mut queue: VecDeque<ScanRequest> = roots.into();
        let mut visited: HashSet<PathBuf> = HashSet::new();

        let pool = match rayon::ThreadPoolBuilder::new().num_threads(self.threads).build() {
            Ok(pool) => Some(pool),
            Err(e) => {
                log::warn!("Could not start scan threads ({}), scanning sequentially", e);
                None
            }
        };

        while !queue.is_empty() {
            let batch: Vec<ScanRequest> = queue
                .drain(..)
                .filter(|request| visited.insert(request.location.clone()))
                .collect();
            if batch.is_empty() {
                break;
            }

            report.passes += 1;
            report.scanned += batch.len();
            log::debug!("Discovery pass {}: scanning {} location(s)", report.passes, batch.len());

            let results: Vec<ScanResult> = match &pool {
                Some(pool) => pool.install(|| batch.par_iter().map(|r| self.scan_one(r)).collect()),
                None => batch.iter().map(|r| self.scan_one(r)).collect(),
            };

            for (request, result) in batch.iter().zip(results) {
                for error in result.errors {
                    report.failures += 1;
                    context.record_warning(error);
                }

                let Some((source, outcome)) = result.claimed else {
                    log::debug!("No source recognized {}", request.describe);
                    continue;
                };

                for mut candidate in outcome.candidates {
                    if candidate.origin.is_empty() {
                        candidate.origin = request.describe.clone();
                    }
                    if !request.direct {
                        candidate.mandatory = false;
                    }
                    match context.register(&source, candidate) {
                        Ok(_) => report.candidates += 1,
                        Err(e) => {
                            report.failures += 1;
                            context.record_warning(e);
                        }
                    }
                }

                for nested in outcome.nested {
                    if nested.escapes_container() {
                        report.failures += 1;
                        context.record_warning(ResolveError::Scan {
                            location: nested.describe,
                            reason: "nested path escapes its container".to_string(),
                        });
                        continue;
                    }
                    queue.push_back(nested);
                }
            }
        }

        log::info!(
            "Discovery finished after {} pass(es): {} location(s), {} candidate(s), {} problem(s)",
            report.passes,
            report.scanned,
            report.candidates,
            report.failures
        );
        report
    }

    /// Offer the location to each source in turn; the first to claim it wins.
    fn scan_one(&self, request: &ScanRequest) -> ScanResult {
        let mut result = ScanResult::default();
        for source in &self.sources {
            match source.scan(request) {
                Ok(Some(outcome)) => {
                    log::trace!(
                        "{} claimed {} ({} candidate(s), {} nested)",
                        source.name(),
                        request.describe,
                        outcome.candidates.len(),
                        outcome.nested.len()
                    );
                    result.claimed = Some((source.name().to_string(), outcome));
                    break;
                }
                Ok(None) => {}
                Err(e) => result.errors.push(e),
            }
        }
        result
    }
}

/// One location's worth of in-memory scan data.
#[derive(Debug, Clone, Default)]
struct MemoryEntry {
    candidates: Vec<ModCandidate>,
    nested: Vec<PathBuf>,
}

/// A source serving candidates from memory, keyed by location.
///
/// Useful for hosts that already know their candidates (and for tests).
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    name: String,
    entries: HashMap<PathBuf, MemoryEntry>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: HashMap::new(),
        }
    }

    pub fn with_location(
        mut self,
        location: impl Into<PathBuf>,
        candidates: Vec<ModCandidate>,
        nested: Vec<PathBuf>,
    ) -> Self {
        self.entries
            .insert(location.into(), MemoryEntry { candidates, nested });
        self
    }
}

impl CandidateSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn scan(&self, request: &ScanRequest) -> Result<Option<ScanOutcome>> {
        let Some(entry) = self.entries.get(&request.location) else {
            return Ok(None);
        };
        Ok(Some(ScanOutcome {
            candidates: entry.candidates.clone(),
            nested: entry
                .nested
                .iter()
                .map(|path| {
                    let declared = path.strip_prefix(&request.location).unwrap_or(path.as_path());
                    let mut nested = request.nested(path.clone(), &path.display().to_string());
                    nested.entry = Some(declared.display().to_string());
                    nested
                })
                .collect(),
        }))
    }
}
