// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Build configuration
//!
//! A [`BuildConfig`] is assembled once from defaults, `CLAY_COMPILER_*`
//! environment variables and CLI flags, then treated as immutable for the
//! duration of a build.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration consumed by the graph builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Project root; every project-relative path is computed against it
    pub project_root: PathBuf,

    /// Directory artifacts are written to
    pub output_dir: PathBuf,

    /// Run emitted bodies through the minifier
    pub minify: bool,

    /// Log level name (`error`, `warn`, `info`, `debug`, `trace`)
    pub log_level: String,

    /// Keep identifiers across incremental rebuilds
    pub watch: bool,

    /// Glob patterns, relative to the project root, selecting legacy files
    pub legacy_globs: Vec<String>,

    /// Ask the component compiler to extract styles
    pub extract_styles: bool,

    /// Production mode for the component compiler
    pub production: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        let project_root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            output_dir: project_root.join("public").join("js"),
            project_root,
            minify: false,
            log_level: "warn".to_string(),
            watch: false,
            legacy_globs: Vec::new(),
            extract_styles: true,
            production: false,
        }
    }
}

impl BuildConfig {
    /// Configuration rooted at `project_root` with default output location.
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        Self {
            output_dir: project_root.join("public").join("js"),
            project_root,
            ..Self::default()
        }
    }

    /// Layer the process environment over the defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.load_vars(std::env::vars());
        config
    }

    /// Apply `CLAY_COMPILER_*` style variables.
    pub fn load_vars<I, K, V>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let value = value.as_ref();
            match key.as_ref() {
                "CLAY_COMPILER_WATCH_MODE" => self.watch = value == "true",
                "CLAY_COMPILER_MINIFY" => self.minify = value == "true",
                "CLAY_COMPILER_LOG_LEVEL" if !value.is_empty() => {
                    self.log_level = normalize_level(value);
                }
                "CLAY_COMPILER_LEGACY_GLOBS" => {
                    self.legacy_globs = parse_globs(value);
                }
                "NODE_ENV" => self.production = value == "production",
                _ => {}
            }
        }
    }

    /// Root of the user component tree
    pub fn components_root(&self) -> PathBuf {
        self.project_root.join("components")
    }

    /// Namespace whose modules become kiln plugins
    pub fn plugin_root(&self) -> PathBuf {
        self.project_root.join("services").join("kiln")
    }

    /// Directory of server-only services
    pub fn server_services(&self) -> PathBuf {
        self.project_root.join("services").join("server")
    }

    /// Directory of browser-safe service counterparts
    pub fn client_services(&self) -> PathBuf {
        self.project_root.join("services").join("client")
    }

    /// `path` relative to the project root, with a leading `/`.
    ///
    /// Used for `__filename`/`__dirname` literals and the identifier map.
    /// Paths outside the root (the virtual empty module) are returned as is.
    pub fn project_relative(&self, path: &Path) -> String {
        if !path.starts_with(&self.project_root) {
            return path.to_string_lossy().into_owned();
        }
        let relative = pathdiff::diff_paths(path, &self.project_root)
            .unwrap_or_else(|| path.to_path_buf());
        let joined = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        format!("/{}", joined)
    }
}

/// `warning` is accepted for compatibility with older configs.
fn normalize_level(level: &str) -> String {
    match level.trim().to_ascii_lowercase().as_str() {
        "warning" => "warn".to_string(),
        other => other.to_string(),
    }
}

fn parse_globs(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|g| g.split_whitespace().collect::<String>())
        .filter(|g| !g.is_empty())
        .collect()
}
