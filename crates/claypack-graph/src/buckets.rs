// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Aggregate output files grouped by module kind and name range

use crate::ids::{ModuleId, ModuleKind};
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::path::Path;

/// Alphabetical range of base names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Shard {
    /// a-d
    AD,
    /// e-h
    EH,
    /// i-l
    IL,
    /// m-p
    MP,
    /// q-t
    QT,
    /// u-z, and anything that is not a-t
    UZ,
}

impl Shard {
    /// All shards in file order
    pub const ALL: [Shard; 6] = [Shard::AD, Shard::EH, Shard::IL, Shard::MP, Shard::QT, Shard::UZ];

    /// Shard for a base name, by its first character (case-insensitive)
    pub fn for_name(name: &str) -> Self {
        match name.chars().next().map(|c| c.to_ascii_lowercase()) {
            Some('a'..='d') => Shard::AD,
            Some('e'..='h') => Shard::EH,
            Some('i'..='l') => Shard::IL,
            Some('m'..='p') => Shard::MP,
            Some('q'..='t') => Shard::QT,
            _ => Shard::UZ,
        }
    }

    /// Range label used in file names
    pub fn as_str(self) -> &'static str {
        match self {
            Shard::AD => "a-d",
            Shard::EH => "e-h",
            Shard::IL => "i-l",
            Shard::MP => "m-p",
            Shard::QT => "q-t",
            Shard::UZ => "u-z",
        }
    }
}

/// What a bucket aggregates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BucketKind {
    /// Numerically identified modules
    Dependencies,
    /// `.model` modules
    Models,
    /// `.kiln` modules
    Kiln,
    /// `.template` modules
    Templates,
    /// `.kilnplugin` modules
    KilnPlugins,
    /// Styles extracted from kiln plugins
    KilnPluginStyles,
}

/// One output aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketKey {
    /// Aggregated kind
    pub kind: BucketKind,
    /// Name range, for the sharded kinds
    pub shard: Option<Shard>,
}

impl BucketKey {
    /// Sharded bucket
    pub fn sharded(kind: BucketKind, shard: Shard) -> Self {
        Self {
            kind,
            shard: Some(shard),
        }
    }

    /// Aggregate of kiln plugin scripts
    pub fn plugins() -> Self {
        Self {
            kind: BucketKind::KilnPlugins,
            shard: None,
        }
    }

    /// Aggregate of kiln plugin styles
    pub fn plugin_styles() -> Self {
        Self {
            kind: BucketKind::KilnPluginStyles,
            shard: None,
        }
    }

    /// Output file name
    pub fn file_name(&self) -> String {
        let prefix = match self.kind {
            BucketKind::Dependencies => "_deps",
            BucketKind::Models => "_models",
            BucketKind::Kiln => "_kiln",
            BucketKind::Templates => "_templates",
            BucketKind::KilnPlugins => return "_kiln-plugins.js".to_string(),
            BucketKind::KilnPluginStyles => return "_kiln-plugins.css".to_string(),
        };
        match self.shard {
            Some(shard) => format!("{}-{}.js", prefix, shard.as_str()),
            None => format!("{}.js", prefix),
        }
    }

    /// Bucket a module's script body belongs to.
    ///
    /// Numeric modules shard by the file stem of their source path, named
    /// ones by the name part. Clients and legacy modules are not bucketed.
    pub fn for_module(id: &ModuleId, path: &Path) -> Option<Self> {
        let (kind, base) = match id {
            ModuleId::Numeric(_) => (
                BucketKind::Dependencies,
                path.file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            ),
            ModuleId::Named { name, kind } => match kind {
                ModuleKind::Model => (BucketKind::Models, name.clone()),
                ModuleKind::Kiln => (BucketKind::Kiln, name.clone()),
                ModuleKind::Template => (BucketKind::Templates, name.clone()),
                ModuleKind::KilnPlugin => return Some(Self::plugins()),
                ModuleKind::Client | ModuleKind::Legacy => return None,
            },
        };
        Some(Self::sharded(kind, Shard::for_name(&base)))
    }
}

/// Bucket accumulators.
///
/// Entries are keyed by module id so re-emitting a module replaces its
/// previous body in place.
#[derive(Debug, Default)]
pub struct BucketSet {
    buckets: BTreeMap<BucketKey, IndexMap<ModuleId, String>>,
}

impl BucketSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace `id`'s contribution to `key`
    pub fn insert(&mut self, key: BucketKey, id: ModuleId, body: String) {
        self.buckets.entry(key).or_default().insert(id, body);
    }

    /// Non-empty buckets with their concatenated contents
    pub fn files(&self) -> impl Iterator<Item = (BucketKey, String)> + '_ {
        self.buckets
            .iter()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(key, entries)| (*key, entries.values().map(String::as_str).collect()))
    }

    /// Number of non-empty buckets
    pub fn len(&self) -> usize {
        self.buckets.values().filter(|e| !e.is_empty()).count()
    }

    /// Whether every bucket is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
