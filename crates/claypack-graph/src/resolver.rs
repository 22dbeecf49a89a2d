// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module path resolution (Node.js algorithm, browser flavoured)
//!
//! Relative specifiers are probed against a fixed extension list and then as
//! a directory with an index file. Bare specifiers walk up through ancestor
//! `node_modules` directories. Resolved paths are lexically normalized so a
//! file reached through different import chains always yields the same path.

use serde::Deserialize;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::trace;

/// Extensions probed after the literal specifier
pub const EXTENSIONS: &[&str] = &[".js", ".json", ".vue"];

/// Index files probed inside directories
const INDEX_FILES: &[&str] = &["index.js", "index.json"];

/// Resolves `require()` specifiers to absolute file paths
#[derive(Debug, Clone)]
pub struct PathResolver {
    /// File extensions to try
    extensions: Vec<String>,
}

impl PathResolver {
    /// Create a new resolver
    pub fn new() -> Self {
        Self {
            extensions: EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }

    /// Whether `specifier` is resolved against the importing directory
    pub fn is_relative(specifier: &str) -> bool {
        specifier.starts_with("./")
            || specifier.starts_with("../")
            || specifier == "."
            || specifier == ".."
            || specifier.starts_with('/')
    }

    /// Resolve `specifier` as seen from a module living in `base_dir`.
    ///
    /// Returns `None` when nothing on disk matches.
    pub async fn resolve(&self, specifier: &str, base_dir: &Path) -> Option<PathBuf> {
        let resolved = if Self::is_relative(specifier) {
            self.resolve_file_or_directory(&normalize(&base_dir.join(specifier)))
                .await
        } else {
            self.resolve_node_modules(specifier, base_dir).await
        };
        trace!(specifier, base = %base_dir.display(), ?resolved, "resolved");
        resolved
    }

    async fn resolve_file_or_directory(&self, path: &Path) -> Option<PathBuf> {
        if let Some(file) = self.resolve_file(path).await {
            return Some(file);
        }
        if is_dir(path).await {
            return self.resolve_directory(path).await;
        }
        None
    }

    /// Exact file, then the path with each extension appended
    async fn resolve_file(&self, path: &Path) -> Option<PathBuf> {
        if is_file(path).await {
            return Some(path.to_path_buf());
        }
        for ext in &self.extensions {
            let candidate = append_extension(path, ext);
            if is_file(&candidate).await {
                return Some(candidate);
            }
        }
        None
    }

    /// Package manifest entry, then index files
    async fn resolve_directory(&self, dir: &Path) -> Option<PathBuf> {
        if let Some(entry) = self.manifest_entry(dir).await {
            let main_path = normalize(&dir.join(entry));
            if let Some(file) = self.resolve_file(&main_path).await {
                return Some(file);
            }
            if let Some(file) = self.resolve_index(&main_path).await {
                return Some(file);
            }
        }
        self.resolve_index(dir).await
    }

    async fn resolve_index(&self, dir: &Path) -> Option<PathBuf> {
        for index in INDEX_FILES {
            let candidate = dir.join(index);
            if is_file(&candidate).await {
                return Some(candidate);
            }
        }
        None
    }

    /// Entry file named by `package.json` (browser, then main, then module)
    async fn manifest_entry(&self, dir: &Path) -> Option<String> {
        let content = fs::read_to_string(dir.join("package.json")).await.ok()?;
        let pkg: PackageJson = serde_json::from_str(&content).ok()?;

        let browser = match pkg.browser {
            Some(serde_json::Value::String(entry)) => Some(entry),
            _ => None,
        };
        browser.or(pkg.main).or(pkg.module)
    }

    /// Walk up directory tree looking for node_modules
    async fn resolve_node_modules(&self, specifier: &str, base_dir: &Path) -> Option<PathBuf> {
        let mut current = Some(base_dir);
        while let Some(dir) = current {
            // never look for node_modules/node_modules/x
            if dir.file_name().is_some_and(|n| n == "node_modules") {
                current = dir.parent();
                continue;
            }

            let candidate = normalize(&dir.join("node_modules").join(specifier));
            if let Some(file) = self.resolve_file(&candidate).await {
                return Some(file);
            }
            if is_dir(&candidate).await {
                if let Some(file) = self.resolve_directory(&candidate).await {
                    return Some(file);
                }
            }

            current = dir.parent();
        }
        None
    }
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Minimal package.json structure for resolution
#[derive(Debug, Deserialize)]
struct PackageJson {
    main: Option<String>,
    module: Option<String>,
    #[serde(default)]
    browser: Option<serde_json::Value>,
}

/// Remove `.` and resolve `..` components without touching the file system.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(ext);
    PathBuf::from(os)
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
}

async fn is_dir(path: &Path) -> bool {
    fs::metadata(path).await.map(|m| m.is_dir()).unwrap_or(false)
}

/// Whether `path` exists at all
pub async fn exists(path: &Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as stdfs;
    use tempfile::tempdir;

    fn touch(root: &Path, rel: &str, content: &str) -> PathBuf {
        let path = root.join(rel);
        stdfs::create_dir_all(path.parent().unwrap()).unwrap();
        stdfs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_normalize() {
        assert_eq!(
            normalize(Path::new("/a/b/./c/../d.js")),
            PathBuf::from("/a/b/d.js")
        );
        assert_eq!(normalize(Path::new("/a/b/../../c")), PathBuf::from("/c"));
    }

    #[tokio::test]
    async fn test_relative_with_extension_probing() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let helper = touch(root, "components/widget/helper.js", "");
        let data = touch(root, "components/widget/data.json", "{}");
        let resolver = PathResolver::new();
        let base = root.join("components/widget");

        assert_eq!(resolver.resolve("./helper", &base).await, Some(helper.clone()));
        assert_eq!(resolver.resolve("./helper.js", &base).await, Some(helper));
        assert_eq!(resolver.resolve("./data", &base).await, Some(data));
        assert_eq!(resolver.resolve("./missing", &base).await, None);
    }

    #[tokio::test]
    async fn test_relative_directory_index() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let index = touch(root, "lib/utils/index.js", "");
        let resolver = PathResolver::new();

        let resolved = resolver.resolve("../lib/utils", &root.join("components")).await;
        assert_eq!(resolved, Some(index));
    }

    #[tokio::test]
    async fn test_same_file_through_different_chains() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        touch(root, "lib/shared.js", "");
        let resolver = PathResolver::new();

        let a = resolver.resolve("../../lib/shared", &root.join("components/a")).await;
        let b = resolver.resolve("./lib/shared.js", root).await;
        assert!(a.is_some());
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_node_modules_walk_up() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        touch(
            root,
            "node_modules/pkg/package.json",
            r#"{"main": "lib/main.js", "browser": "lib/browser.js"}"#,
        );
        let browser = touch(root, "node_modules/pkg/lib/browser.js", "");
        touch(root, "node_modules/pkg/lib/main.js", "");
        let get = touch(root, "node_modules/lodash/get.js", "");
        let scoped = touch(root, "node_modules/@scope/thing/index.js", "");
        let resolver = PathResolver::new();
        let base = root.join("components/widget");

        assert_eq!(resolver.resolve("pkg", &base).await, Some(browser));
        assert_eq!(resolver.resolve("lodash/get", &base).await, Some(get));
        assert_eq!(resolver.resolve("@scope/thing", &base).await, Some(scoped));
        assert_eq!(resolver.resolve("nope", &base).await, None);
    }

    #[tokio::test]
    async fn test_manifest_main_without_extension() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        touch(root, "node_modules/events/package.json", r#"{"main": "./events"}"#);
        let main = touch(root, "node_modules/events/events.js", "");
        let resolver = PathResolver::new();

        assert_eq!(resolver.resolve("events", root).await, Some(main));
    }
}
