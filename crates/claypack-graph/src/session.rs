// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Per-process build state
//!
//! A [`BuildSession`] owns everything that outlives a single module: the
//! identifier cache, the dependency registry, the environment variable set,
//! the bucket accumulators and the per-module bodies waiting to be written.
//! It is passed by `&mut` through the orchestrator, so there is exactly one
//! writer at any time.

use crate::buckets::{BucketKey, BucketSet};
use crate::config::BuildConfig;
use crate::ids::{IdAssigner, ModuleId, ModuleKind};
use indexmap::{IndexMap, IndexSet};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Mutable state shared by every module of a build
#[derive(Debug)]
pub struct BuildSession {
    ids: IdAssigner,
    registry: IndexMap<ModuleId, Vec<ModuleId>>,
    env_vars: IndexSet<String>,
    buckets: BucketSet,
    pending: IndexMap<ModuleId, String>,
    processed: HashSet<PathBuf>,
    polyfills: HashMap<String, ModuleId>,
    virtual_sources: HashMap<PathBuf, String>,
}

impl BuildSession {
    /// Fresh session
    pub fn new(config: &BuildConfig, legacy_files: HashSet<PathBuf>) -> Self {
        Self {
            ids: IdAssigner::new(config, legacy_files),
            registry: IndexMap::new(),
            env_vars: IndexSet::new(),
            buckets: BucketSet::new(),
            pending: IndexMap::new(),
            processed: HashSet::new(),
            polyfills: HashMap::new(),
            virtual_sources: HashMap::new(),
        }
    }

    /// Identifier assigner
    pub fn ids(&self) -> &IdAssigner {
        &self.ids
    }

    /// Identifier assigner, mutably
    pub fn ids_mut(&mut self) -> &mut IdAssigner {
        &mut self.ids
    }

    /// Identifier for `path`, plus whether it was assigned just now
    pub fn assign(&mut self, path: &Path) -> (ModuleId, bool) {
        self.ids.assign(path)
    }

    /// Start `id`'s dependency list over
    pub fn reset_dependencies(&mut self, id: &ModuleId) {
        self.registry.insert(id.clone(), Vec::new());
    }

    /// Append `dep` to `id`'s dependency list unless already present
    pub fn add_dependency(&mut self, id: &ModuleId, dep: ModuleId) {
        let deps = self.registry.entry(id.clone()).or_default();
        if !deps.contains(&dep) {
            deps.push(dep);
        }
    }

    /// Dependencies of `id`, in discovery order
    pub fn dependencies(&self, id: &ModuleId) -> &[ModuleId] {
        self.registry.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Identifier → ordered dependency identifiers
    pub fn registry(&self) -> &IndexMap<ModuleId, Vec<ModuleId>> {
        &self.registry
    }

    /// Record an environment variable referenced by client code
    pub fn record_env(&mut self, name: impl Into<String>) {
        self.env_vars.insert(name.into());
    }

    /// Environment variables in first-seen order
    pub fn env_vars(&self) -> &IndexSet<String> {
        &self.env_vars
    }

    /// Mark `path` processed. Returns `false` if it already was.
    pub fn mark_processed(&mut self, path: &Path) -> bool {
        self.processed.insert(path.to_path_buf())
    }

    /// Whether `path` has been processed
    pub fn is_processed(&self, path: &Path) -> bool {
        self.processed.contains(path)
    }

    /// Remember the identifier of a registered polyfill
    pub fn register_polyfill(&mut self, name: &str, id: ModuleId) {
        self.polyfills.insert(name.to_string(), id);
    }

    /// Identifier of a registered polyfill
    pub fn polyfill_id(&self, name: &str) -> Option<&ModuleId> {
        self.polyfills.get(name)
    }

    /// Serve `source` for `path` instead of reading the file system
    pub fn add_virtual_source(&mut self, path: impl Into<PathBuf>, source: impl Into<String>) {
        self.virtual_sources.insert(path.into(), source.into());
    }

    /// In-memory source for `path`
    pub fn virtual_source(&self, path: &Path) -> Option<&str> {
        self.virtual_sources.get(path).map(String::as_str)
    }

    /// Hand a finished body to the output stage.
    ///
    /// Every module except plugins gets its own `<id>.js`; the body is also
    /// added to the bucket for its kind and name range, if any.
    pub fn emit(&mut self, id: &ModuleId, path: &Path, body: String) {
        if let Some(key) = BucketKey::for_module(id, path) {
            self.buckets.insert(key, id.clone(), body.clone());
        }
        if id.kind() != Some(ModuleKind::KilnPlugin) {
            self.pending.insert(id.clone(), body);
        }
    }

    /// Add extracted plugin styles to the style aggregate
    pub fn emit_plugin_style(&mut self, id: &ModuleId, css: String) {
        self.buckets.insert(BucketKey::plugin_styles(), id.clone(), css);
    }

    /// Bucket accumulators
    pub fn buckets(&self) -> &BucketSet {
        &self.buckets
    }

    /// Per-module bodies emitted since the last flush
    pub fn take_pending(&mut self) -> IndexMap<ModuleId, String> {
        std::mem::take(&mut self.pending)
    }
}
