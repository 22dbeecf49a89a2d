// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Entry discovery and hook sequencing

use crate::config::BuildConfig;
use crate::error::Result;
use crate::hooks::{BuildHooks, BuildReport};
use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Entry patterns, relative to the project root
pub const ENTRY_GLOBS: &[&str] = &[
    "components/**/client.js",
    "components/**/model.js",
    "components/**/kiln.js",
    "components/**/template.hbs",
    "components/**/template.handlebars",
    "services/kiln/**/*.js",
    "services/kiln/**/*.vue",
];

/// Whether `path` is a template source
pub fn is_template(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("hbs" | "handlebars")
    )
}

fn in_node_modules(path: &Path) -> bool {
    path.components().any(|c| c.as_os_str() == "node_modules")
}

/// Files under `root` matching any of `patterns`, sorted and deduplicated.
///
/// `node_modules` is never searched into. Unreadable directory entries are
/// logged and skipped.
pub fn expand_globs<S: AsRef<str>>(root: &Path, patterns: &[S]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        let full = root.join(pattern.as_ref());
        for entry in glob::glob(&full.to_string_lossy())? {
            match entry {
                Ok(path) if path.is_file() && !in_node_modules(&path) => files.push(path),
                Ok(_) => {}
                Err(err) => warn!(error = %err, "skipping unreadable path"),
            }
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

/// Tests paths against the entry patterns
#[derive(Debug, Clone)]
pub struct EntryMatcher {
    root: PathBuf,
    patterns: Vec<Pattern>,
}

impl EntryMatcher {
    /// Matcher for the built-in entry patterns plus the legacy globs
    pub fn new(config: &BuildConfig) -> Result<Self> {
        let patterns = ENTRY_GLOBS
            .iter()
            .copied()
            .chain(config.legacy_globs.iter().map(String::as_str))
            .map(Pattern::new)
            .collect::<std::result::Result<_, _>>()?;
        Ok(Self {
            root: config.project_root.clone(),
            patterns,
        })
    }

    /// Whether `path` would be discovered as an entry
    pub fn matches(&self, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return false;
        };
        if in_node_modules(relative) {
            return false;
        }
        let options = MatchOptions {
            require_literal_separator: true,
            ..MatchOptions::default()
        };
        self.patterns
            .iter()
            .any(|p| p.matches_path_with(relative, options))
    }
}

/// Build entry points
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entries {
    /// Script and component entries, for `on_resolve`
    pub scripts: Vec<PathBuf>,
    /// Template entries, for `on_load`
    pub templates: Vec<PathBuf>,
}

impl Entries {
    /// Discover entries under the project root
    pub fn discover(config: &BuildConfig) -> Result<Self> {
        let mut paths = expand_globs(&config.project_root, ENTRY_GLOBS)?;
        paths.extend(expand_globs(&config.project_root, &config.legacy_globs)?);
        paths.sort();
        paths.dedup();
        Ok(Self::from_paths(paths))
    }

    /// Explicit entries, split by kind
    pub fn from_paths<I: IntoIterator<Item = PathBuf>>(paths: I) -> Self {
        let (templates, scripts) = paths.into_iter().partition(|p| is_template(p));
        Self { scripts, templates }
    }

    /// Total number of entries
    pub fn len(&self) -> usize {
        self.scripts.len() + self.templates.len()
    }

    /// Whether there is nothing to build
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Drive one full build through `hooks`.
///
/// Order: `on_start`, `on_resolve` per script entry, `on_load` per template
/// entry, `on_end`. The first fatal error aborts the build.
pub async fn run<H: BuildHooks + ?Sized>(hooks: &mut H, entries: &Entries) -> Result<BuildReport> {
    info!(
        scripts = entries.scripts.len(),
        templates = entries.templates.len(),
        "building"
    );
    hooks.on_start().await?;
    for path in &entries.scripts {
        hooks.on_resolve(path).await?;
    }
    for path in &entries.templates {
        hooks.on_load(path).await?;
    }
    hooks.on_end().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(root: &Path, rel: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "").unwrap();
        path
    }

    #[test]
    fn test_discover_entries() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let client = touch(root, "components/widget/client.js");
        let model = touch(root, "components/widget/model.js");
        let template = touch(root, "components/widget/template.hbs");
        touch(root, "components/widget/helper.js");
        touch(root, "components/widget/node_modules/x/client.js");
        let plugin = touch(root, "services/kiln/color/index.js");
        let legacy = touch(root, "global/js/ads.js");

        let mut config = BuildConfig::new(root);
        config.legacy_globs = vec!["global/js/*.js".to_string()];
        let entries = Entries::discover(&config).unwrap();

        assert_eq!(entries.templates, vec![template]);
        let mut expected = vec![client, model, plugin, legacy];
        expected.sort();
        assert_eq!(entries.scripts, expected);
    }

    #[test]
    fn test_entry_matcher() {
        let mut config = BuildConfig::new("/project");
        config.legacy_globs = vec!["global/js/*.js".to_string()];
        let matcher = EntryMatcher::new(&config).unwrap();

        assert!(matcher.matches(Path::new("/project/components/a/client.js")));
        assert!(matcher.matches(Path::new("/project/components/a/template.handlebars")));
        assert!(matcher.matches(Path::new("/project/services/kiln/b/index.vue")));
        assert!(matcher.matches(Path::new("/project/global/js/ads.js")));
        assert!(!matcher.matches(Path::new("/project/components/a/helper.js")));
        assert!(!matcher.matches(Path::new("/project/global/js/sub/x.js")));
        assert!(!matcher.matches(Path::new("/elsewhere/components/a/client.js")));
    }

    #[test]
    fn test_from_paths_splits_templates() {
        let entries = Entries::from_paths(vec![
            PathBuf::from("/p/components/a/client.js"),
            PathBuf::from("/p/components/a/template.hbs"),
        ]);
        assert_eq!(entries.scripts.len(), 1);
        assert_eq!(entries.templates.len(), 1);
    }
}
