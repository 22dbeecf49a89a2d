// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Boundaries with the outside world
//!
//! [`BuildHooks`] is what a pipeline driver calls into. [`SfcCompiler`] and
//! [`TemplateCompiler`] are the opaque transforms the graph builder calls out
//! to; it only inspects the shape of what they return.

use crate::error::Result;
use crate::ids::ModuleId;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Callbacks registered with the build pipeline
#[async_trait]
pub trait BuildHooks: Send {
    /// Register and process polyfills
    async fn on_start(&mut self) -> Result<()>;

    /// Process a module path and everything it reaches
    async fn on_resolve(&mut self, path: &Path) -> Result<()>;

    /// Load a non-script source through the template collaborator
    async fn on_load(&mut self, path: &Path) -> Result<()>;

    /// Flush metadata, per-module files and buckets
    async fn on_end(&mut self) -> Result<BuildReport>;
}

/// Input to the single-file-component collaborator
#[derive(Debug, Clone, Copy)]
pub struct SfcRequest<'a> {
    /// Component file
    pub filename: &'a Path,
    /// Component source
    pub source: &'a str,
    /// Return styles separately instead of injecting them
    pub extract_styles: bool,
    /// Production mode
    pub production: bool,
}

/// Output of the single-file-component collaborator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SfcOutput {
    /// Plain CommonJS script
    pub code: String,
    /// Extracted style fragments
    pub styles: Vec<String>,
    /// Structured diagnostics; any entry fails the build
    pub errors: Vec<String>,
}

/// Turns a single-file component into plain script
#[async_trait]
pub trait SfcCompiler: Send + Sync {
    /// Compile one component
    async fn compile(&self, request: SfcRequest<'_>) -> SfcOutput;
}

/// Output of the template collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledTemplate {
    /// Identifier the template registers under
    pub id: ModuleId,
    /// Ready-to-write registration code
    pub code: String,
}

/// Turns a template file into registration code
#[async_trait]
pub trait TemplateCompiler: Send + Sync {
    /// Compile the template at `path`
    async fn compile(&self, path: &Path) -> Result<CompiledTemplate>;
}

/// Summary returned by `on_end`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Modules processed in this build (or rebuild)
    pub modules: usize,
    /// Identifiers assigned so far
    pub identifiers: usize,
    /// Per-module files written
    pub module_files: usize,
    /// Bucket files written
    pub bucket_files: Vec<PathBuf>,
    /// Environment variables recorded
    pub env_vars: usize,
    /// Wall time since `on_start`
    pub elapsed: Duration,
}
