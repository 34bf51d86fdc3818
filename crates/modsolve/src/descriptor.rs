//! Filesystem candidate source reading `mod.json` descriptors.
//!
//! A location is one of:
//! - a directory holding `mod.json`: one candidate, plus any nested
//!   locations listed under `jars` (relative to that directory)
//! - a `*.json` file: one candidate read from it
//! - any other directory: a mods folder; its entries are scanned next
//!
//! ```json
//! {
//!   "id": "sodium",
//!   "group": "me.jellysquid",
//!   "version": "0.4.10",
//!   "environment": "client",
//!   "depends": ["fabric", { "id": "minecraft", "versions": ">=1.19" }],
//!   "breaks": [{ "id": "optifine" }],
//!   "provides": ["rubidium"],
//!   "jars": ["jars/indium"]
//! }
//! ```

use std::fs;
use std::path::{Component, Path};

use serde::Deserialize;

use crate::discovery::{CandidateSource, ScanOutcome, ScanRequest};
use crate::error::{ResolveError, Result};
use crate::metadata::ModCandidate;

/// Descriptor file name looked up inside candidate directories.
pub const DESCRIPTOR_FILE: &str = "mod.json";

#[derive(Debug, Deserialize)]
struct Descriptor {
    #[serde(flatten)]
    candidate: ModCandidate,
    /// Nested candidate locations, relative to the descriptor.
    #[serde(default)]
    jars: Vec<String>,
}

/// Reads candidates from descriptor files on disk.
#[derive(Debug, Default, Clone)]
pub struct DescriptorSource;

impl DescriptorSource {
    pub fn new() -> Self {
        Self
    }

    fn read(&self, request: &ScanRequest, file: &Path) -> Result<ScanOutcome> {
        let content = fs::read_to_string(file).map_err(|e| ResolveError::Scan {
            location: request.describe.clone(),
            reason: e.to_string(),
        })?;
        let descriptor: Descriptor =
            serde_json::from_str(&content).map_err(|e| ResolveError::Scan {
                location: request.describe.clone(),
                reason: format!("invalid descriptor: {}", e),
            })?;

        let mut candidate = descriptor.candidate;
        candidate.origin = request.describe.clone();
        candidate.mandatory = request.direct;

        let base = file.parent().unwrap_or_else(|| Path::new("."));
        let mut nested = Vec::new();
        for jar in &descriptor.jars {
            let relative = Path::new(jar);
            if relative
                .components()
                .any(|c| matches!(c, Component::RootDir | Component::Prefix(_)))
            {
                log::warn!("{}: ignoring absolute nested path '{}'", request.describe, jar);
                continue;
            }
            nested.push(request.nested(base.join(relative), jar));
        }

        Ok(ScanOutcome {
            candidates: vec![candidate],
            nested,
        })
    }

    fn list(&self, request: &ScanRequest) -> Result<ScanOutcome> {
        let entries = fs::read_dir(&request.location).map_err(|e| ResolveError::Scan {
            location: request.describe.clone(),
            reason: e.to_string(),
        })?;

        let mut children = Vec::new();
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            let is_candidate = path.join(DESCRIPTOR_FILE).is_file() || is_descriptor_file(&path);
            if is_candidate {
                children.push((entry.file_name().to_string_lossy().into_owned(), path));
            }
        }
        // read_dir order is platform dependent
        children.sort();

        Ok(ScanOutcome {
            candidates: Vec::new(),
            nested: children
                .into_iter()
                .map(|(name, path)| request.child(path, &name))
                .collect(),
        })
    }
}

fn is_descriptor_file(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext == "json")
}

impl CandidateSource for DescriptorSource {
    fn name(&self) -> &str {
        "descriptor"
    }

    fn scan(&self, request: &ScanRequest) -> Result<Option<ScanOutcome>> {
        let location = &request.location;
        if location.is_dir() {
            let file = location.join(DESCRIPTOR_FILE);
            if file.is_file() {
                return self.read(request, &file).map(Some);
            }
            return self.list(request).map(Some);
        }
        if is_descriptor_file(location) {
            return self.read(request, location).map(Some);
        }
        if !location.exists() {
            return Err(ResolveError::Scan {
                location: request.describe.clone(),
                reason: "no such file or directory".to_string(),
            });
        }
        Ok(None)
    }
}
