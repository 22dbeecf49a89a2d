// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Shared fixtures for build tests

#![allow(dead_code)]

use async_trait::async_trait;
use claypack_graph::{
    pipeline, BuildConfig, BuildError, BuildReport, CompiledTemplate, Entries, GraphBuilder,
    ModuleId, ModuleKind, Result, SfcCompiler, SfcOutput, SfcRequest, TemplateCompiler,
};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Component compiler that returns the `<script>` block verbatim.
///
/// A source containing `<error>` produces a structured error; `<style>`
/// contents are returned as extracted styles.
pub struct StubSfc;

#[async_trait]
impl SfcCompiler for StubSfc {
    async fn compile(&self, request: SfcRequest<'_>) -> SfcOutput {
        let mut output = SfcOutput::default();
        if request.source.contains("<error>") {
            output.errors.push(format!("{}: broken component", request.filename.display()));
            return output;
        }
        output.code = between(request.source, "<script>", "</script>")
            .unwrap_or("module.exports = {};")
            .trim()
            .to_string();
        if let Some(style) = between(request.source, "<style>", "</style>") {
            output.styles.push(style.trim().to_string());
        }
        output
    }
}

fn between<'a>(source: &'a str, open: &str, close: &str) -> Option<&'a str> {
    let start = source.find(open)? + open.len();
    let end = source[start..].find(close)? + start;
    Some(&source[start..end])
}

/// Template compiler that registers the raw source under `<dir>.template`
pub struct StubTemplates;

#[async_trait]
impl TemplateCompiler for StubTemplates {
    async fn compile(&self, path: &Path) -> Result<CompiledTemplate> {
        let name = path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let source = tokio::fs::read_to_string(path).await.map_err(|e| BuildError::Template {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(CompiledTemplate {
            code: format!(
                "window.kiln.componentTemplates['{}']={}\n",
                name,
                Value::String(source)
            ),
            id: ModuleId::named(name, ModuleKind::Template),
        })
    }
}

/// Throwaway project tree
pub struct TestProject {
    dir: TempDir,
    /// Configuration used by [`TestProject::builder`]
    pub config: BuildConfig,
}

impl TestProject {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = BuildConfig::new(dir.path());
        Self { dir, config }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root().join(rel)
    }

    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.path(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    /// Minimal `process` and `buffer` packages
    pub fn install_core_polyfills(&self) {
        self.write(
            "node_modules/process/browser.js",
            "var process = module.exports = {};\nprocess.env = {};\n",
        );
        self.write(
            "node_modules/buffer/index.js",
            "function Buffer(x) { this.x = x; }\nexports.Buffer = Buffer;\n",
        );
    }

    pub fn builder(&self) -> GraphBuilder {
        GraphBuilder::new(self.config.clone(), Arc::new(StubSfc), Arc::new(StubTemplates)).unwrap()
    }

    /// Discover entries and run a full build
    pub async fn build(&self) -> Result<(GraphBuilder, BuildReport)> {
        self.build_with(self.builder()).await
    }

    pub async fn build_with(
        &self,
        mut builder: GraphBuilder,
    ) -> Result<(GraphBuilder, BuildReport)> {
        let entries = Entries::discover(&self.config)?;
        let report = pipeline::run(&mut builder, &entries).await?;
        Ok((builder, report))
    }

    pub fn id_of(&self, builder: &GraphBuilder, rel: &str) -> ModuleId {
        builder
            .session()
            .ids()
            .get(&self.path(rel))
            .cloned()
            .unwrap_or_else(|| panic!("no id for {}", rel))
    }

    pub fn output(&self, name: &str) -> String {
        fs::read_to_string(self.config.output_dir.join(name))
            .unwrap_or_else(|e| panic!("missing output {}: {}", name, e))
    }

    pub fn output_json(&self, name: &str) -> Value {
        serde_json::from_str(&self.output(name)).unwrap()
    }

    pub fn has_output(&self, name: &str) -> bool {
        self.config.output_dir.join(name).exists()
    }

    /// Output file names matching a prefix
    pub fn outputs_with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(&self.config.output_dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with(prefix))
            .collect();
        names.sort();
        names
    }
}

/// Body between the envelope's factory braces
pub fn factory_body(module: &str) -> &str {
    let open = "function(require,module,exports){";
    let start = module.find(open).map(|i| i + open.len()).unwrap_or(0);
    let end = module.rfind("\n}, ").unwrap_or(module.len());
    &module[start..end]
}
