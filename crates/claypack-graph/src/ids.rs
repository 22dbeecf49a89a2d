// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module identifiers
//!
//! Every resolved file gets exactly one [`ModuleId`] per build process.
//! Component role files and kiln plugins get legible `<name>.<kind>` ids;
//! everything else draws from a monotonic counter starting at 1.

use crate::config::BuildConfig;
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Kind suffix of a structured identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModuleKind {
    /// Component `client.js`
    Client,
    /// Component `model.js`
    Model,
    /// Component `kiln.js`
    Kiln,
    /// Component `template.hbs`
    Template,
    /// File matched by a legacy glob
    Legacy,
    /// Module under the kiln plugin namespace
    KilnPlugin,
}

impl ModuleKind {
    /// Suffix used in the identifier
    pub fn as_str(self) -> &'static str {
        match self {
            ModuleKind::Client => "client",
            ModuleKind::Model => "model",
            ModuleKind::Kiln => "kiln",
            ModuleKind::Template => "template",
            ModuleKind::Legacy => "legacy",
            ModuleKind::KilnPlugin => "kilnplugin",
        }
    }

    /// Role a component file name plays, if any
    fn from_role_file(file_name: &str) -> Option<Self> {
        match file_name {
            "client.js" => Some(ModuleKind::Client),
            "kiln.js" => Some(ModuleKind::Kiln),
            "model.js" => Some(ModuleKind::Model),
            "template.hbs" | "template.handlebars" => Some(ModuleKind::Template),
            _ => None,
        }
    }
}

/// Identifier of a module within one build process
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModuleId {
    /// Anonymous dependency
    Numeric(u32),
    /// `<name>.<kind>`
    Named {
        /// Name part
        name: String,
        /// Kind suffix
        kind: ModuleKind,
    },
}

impl ModuleId {
    /// Build a structured identifier
    pub fn named(name: impl Into<String>, kind: ModuleKind) -> Self {
        ModuleId::Named {
            name: name.into(),
            kind,
        }
    }

    /// Kind of a structured identifier, `None` for numeric ones
    pub fn kind(&self) -> Option<ModuleKind> {
        match self {
            ModuleId::Numeric(_) => None,
            ModuleId::Named { kind, .. } => Some(*kind),
        }
    }

    /// Name part of a structured identifier
    pub fn name(&self) -> Option<&str> {
        match self {
            ModuleId::Numeric(_) => None,
            ModuleId::Named { name, .. } => Some(name),
        }
    }

    /// Argument text for a generated `require(...)` call.
    ///
    /// Numeric ids are emitted bare, structured ids as string literals.
    pub fn require_arg(&self) -> String {
        match self {
            ModuleId::Numeric(n) => n.to_string(),
            ModuleId::Named { .. } => quote(&self.to_string()),
        }
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleId::Numeric(n) => write!(f, "{}", n),
            ModuleId::Named { name, kind } => write!(f, "{}.{}", name, kind.as_str()),
        }
    }
}

impl Serialize for ModuleId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ModuleId::Numeric(n) => serializer.serialize_u32(*n),
            ModuleId::Named { .. } => serializer.collect_str(self),
        }
    }
}

/// JSON string literal for `s`
pub(crate) fn quote(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// Assigns identifiers and remembers them for the process lifetime.
///
/// Lookups and assignment happen through `&mut self`, so "assign if absent,
/// else look up" is atomic for as long as the assigner has a single owner.
#[derive(Debug)]
pub struct IdAssigner {
    next_numeric: u32,
    cache: IndexMap<PathBuf, ModuleId>,
    components_root: PathBuf,
    plugin_root: PathBuf,
    legacy_files: HashSet<PathBuf>,
}

impl IdAssigner {
    /// Create an assigner for the given roots
    pub fn new(config: &BuildConfig, legacy_files: HashSet<PathBuf>) -> Self {
        Self {
            next_numeric: 1,
            cache: IndexMap::new(),
            components_root: config.components_root(),
            plugin_root: config.plugin_root(),
            legacy_files,
        }
    }

    /// Replace the legacy file set (re-expanded before each rebuild)
    pub fn set_legacy_files(&mut self, legacy_files: HashSet<PathBuf>) {
        self.legacy_files = legacy_files;
    }

    /// Identifier for `path`, assigning one if the path is new.
    ///
    /// The flag is `true` when this call performed the assignment.
    pub fn assign(&mut self, path: &Path) -> (ModuleId, bool) {
        if let Some(id) = self.cache.get(path) {
            return (id.clone(), false);
        }
        let id = self.compute(path);
        if let ModuleId::Named { .. } = id {
            if let Some(owner) = self.path_of(&id) {
                warn!(
                    %id,
                    owner = %owner.display(),
                    path = %path.display(),
                    "identifier already assigned to another file, both will share its output"
                );
            }
        }
        self.cache.insert(path.to_path_buf(), id.clone());
        (id, true)
    }

    /// Previously assigned identifier
    pub fn get(&self, path: &Path) -> Option<&ModuleId> {
        self.cache.get(path)
    }

    /// Whether `path` already has an identifier
    pub fn contains(&self, path: &Path) -> bool {
        self.cache.contains_key(path)
    }

    /// Path that was assigned `id`
    pub fn path_of(&self, id: &ModuleId) -> Option<&Path> {
        self.cache
            .iter()
            .find(|(_, assigned)| *assigned == id)
            .map(|(path, _)| path.as_path())
    }

    /// All assignments, in assignment order
    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &ModuleId)> {
        self.cache.iter()
    }

    /// Number of assigned identifiers
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether nothing has been assigned yet
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    fn compute(&mut self, path: &Path) -> ModuleId {
        let stem = file_stem(path);

        if path.starts_with(&self.plugin_root) {
            return ModuleId::named(
                format!("{}_{}", parent_name(path), stem),
                ModuleKind::KilnPlugin,
            );
        }

        if self.legacy_files.contains(path) {
            return ModuleId::named(stem, ModuleKind::Legacy);
        }

        if path.starts_with(&self.components_root) {
            let role = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(ModuleKind::from_role_file);
            if let Some(kind) = role {
                return ModuleId::named(parent_name(path), kind);
            }
        }

        let id = ModuleId::Numeric(self.next_numeric);
        self.next_numeric += 1;
        id
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn parent_name(path: &Path) -> String {
    path.parent()
        .and_then(|p| p.file_name())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
