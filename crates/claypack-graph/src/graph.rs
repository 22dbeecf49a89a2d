// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Graph orchestration
//!
//! [`GraphBuilder`] implements the pipeline hooks. `on_resolve` drains a
//! breadth-first queue starting at the given path: every module is read,
//! rewritten, enveloped and handed to the session, and the paths it reaches
//! for the first time are queued behind it.

use crate::config::BuildConfig;
use crate::error::{BuildError, Result};
use crate::guard::SubstitutionGuard;
use crate::hooks::{BuildHooks, BuildReport, SfcCompiler, SfcRequest, TemplateCompiler};
use crate::ids::{ModuleId, ModuleKind};
use crate::output::OutputWriter;
use crate::pipeline::{expand_globs, is_template, EntryMatcher};
use crate::polyfills::{
    Polyfill, PolyfillRegistry, PolyfillSource, EMPTY_MODULE_PATH, EMPTY_MODULE_SOURCE,
};
use crate::resolver::{normalize, PathResolver};
use crate::rewriter::{envelope, json_body, Rewriter};
use crate::session::BuildSession;
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::fs;
use tracing::{debug, error, info, trace, warn};

/// Module-graph builder for one project
pub struct GraphBuilder {
    config: BuildConfig,
    session: BuildSession,
    resolver: PathResolver,
    guard: SubstitutionGuard,
    polyfills: PolyfillRegistry,
    sfc: Arc<dyn SfcCompiler>,
    templates: Arc<dyn TemplateCompiler>,
    output: OutputWriter,
    entries: EntryMatcher,
    started: Option<Instant>,
    round_modules: usize,
}

impl std::fmt::Debug for GraphBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphBuilder")
            .field("config", &self.config)
            .field("session", &self.session)
            .field("resolver", &self.resolver)
            .field("guard", &self.guard)
            .field("polyfills", &self.polyfills)
            .field("output", &self.output)
            .field("entries", &self.entries)
            .field("started", &self.started)
            .field("round_modules", &self.round_modules)
            .finish_non_exhaustive()
    }
}

impl GraphBuilder {
    /// Builder for `config` with the given collaborators.
    ///
    /// Legacy globs are expanded here, once per builder.
    pub fn new(
        config: BuildConfig,
        sfc: Arc<dyn SfcCompiler>,
        templates: Arc<dyn TemplateCompiler>,
    ) -> Result<Self> {
        let legacy: HashSet<PathBuf> = expand_globs(&config.project_root, &config.legacy_globs)?
            .into_iter()
            .collect();
        debug!(count = legacy.len(), "expanded legacy globs");

        Ok(Self {
            session: BuildSession::new(&config, legacy),
            resolver: PathResolver::new(),
            guard: SubstitutionGuard::new(&config),
            polyfills: PolyfillRegistry::builtin(),
            output: OutputWriter::new(&config),
            entries: EntryMatcher::new(&config)?,
            sfc,
            templates,
            config,
            started: None,
            round_modules: 0,
        })
    }

    /// Replace the platform module table
    pub fn with_polyfills(mut self, polyfills: PolyfillRegistry) -> Self {
        self.polyfills = polyfills;
        self
    }

    /// Build configuration
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Accumulated build state
    pub fn session(&self) -> &BuildSession {
        &self.session
    }

    /// Reprocess changed files with the same session, then flush.
    ///
    /// Legacy globs are expanded again first so files added since the last
    /// build get legacy identifiers. Files that are neither part of the graph
    /// nor entries are ignored.
    /// Identifiers persist; each changed module's dependency list is
    /// recomputed from scratch.
    pub async fn rebuild(&mut self, changed: &[PathBuf]) -> Result<BuildReport> {
        self.started = Some(Instant::now());
        let legacy = expand_globs(&self.config.project_root, &self.config.legacy_globs)?;
        self.session.ids_mut().set_legacy_files(legacy.into_iter().collect());

        for path in changed {
            let path = normalize(path);
            if !self.session.ids().contains(&path) && !self.entries.matches(&path) {
                trace!(path = %path.display(), "ignoring change outside the graph");
                continue;
            }
            info!(path = %path.display(), "rebuilding");
            if is_template(&path) {
                self.round_modules += 1;
                self.load_template(&path).await?;
            } else {
                self.process_graph(path, true).await?;
            }
        }
        self.on_end().await
    }

    /// Assign every polyfill an identifier, then process each one.
    async fn register_polyfills(&mut self) -> Result<()> {
        let ordered: Vec<Polyfill> = self.polyfills.ordered()?.into_iter().cloned().collect();
        let root = self.config.project_root.clone();
        let mut skipped: HashSet<&str> = HashSet::new();
        let mut registered = Vec::new();

        for polyfill in &ordered {
            if let Some(missing) = polyfill.depends_on.iter().find(|d| skipped.contains(*d)) {
                warn!(
                    polyfill = polyfill.name,
                    dependency = *missing,
                    "skipping polyfill whose dependency is unavailable"
                );
                skipped.insert(polyfill.name);
                continue;
            }

            let path = match polyfill.source {
                PolyfillSource::Empty => {
                    let path = PathBuf::from(EMPTY_MODULE_PATH);
                    self.session.add_virtual_source(&path, EMPTY_MODULE_SOURCE);
                    path
                }
                PolyfillSource::Package(specifier) => {
                    match self.resolver.resolve(specifier, &root).await {
                        Some(path) => path,
                        None => {
                            warn!(
                                polyfill = polyfill.name,
                                package = specifier,
                                "polyfill package not installed"
                            );
                            skipped.insert(polyfill.name);
                            continue;
                        }
                    }
                }
            };

            let (id, _) = self.session.assign(&path);
            debug!(polyfill = polyfill.name, %id, "registered polyfill");
            self.session.register_polyfill(polyfill.name, id);
            registered.push(path);
        }

        for path in registered {
            self.process_graph(path, false).await?;
        }
        Ok(())
    }

    /// Breadth-first expansion from `entry`.
    ///
    /// With `force`, the entry itself is reprocessed even if it was already
    /// processed; anything it discovers is new by construction.
    async fn process_graph(&mut self, entry: PathBuf, force: bool) -> Result<()> {
        let mut queue = VecDeque::from([entry]);
        let mut force = force;

        while let Some(path) = queue.pop_front() {
            let forced = std::mem::replace(&mut force, false);
            if !forced && self.session.is_processed(&path) {
                trace!(path = %path.display(), "already processed");
                continue;
            }
            let discovered = self.process_module(&path).await?;
            queue.extend(discovered);
        }
        Ok(())
    }

    /// Process one module. Returns dependency paths seen for the first time.
    async fn process_module(&mut self, path: &Path) -> Result<Vec<PathBuf>> {
        let (id, _) = self.session.assign(path);
        self.session.mark_processed(path);
        self.round_modules += 1;
        debug!(%id, path = %path.display(), "processing module");

        if is_template(path) {
            self.load_template(path).await?;
            return Ok(Vec::new());
        }

        let Some(source) = self.read_source(path).await else {
            return Ok(Vec::new());
        };
        self.session.reset_dependencies(&id);

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        let (body, discovered) = match extension {
            "json" => (json_body(&source), Vec::new()),
            "vue" => {
                let script = self.compile_sfc(&id, path, &source).await?;
                self.rewrite(&id, path, &script).await?
            }
            _ => self.rewrite(&id, path, &source).await?,
        };

        let wrapped = envelope(&id, &body, self.session.dependencies(&id));
        self.session.emit(&id, path, wrapped);
        Ok(discovered)
    }

    async fn rewrite(
        &mut self,
        id: &ModuleId,
        path: &Path,
        source: &str,
    ) -> Result<(String, Vec<PathBuf>)> {
        let rewriter = Rewriter {
            config: &self.config,
            resolver: &self.resolver,
            guard: &self.guard,
            polyfills: &self.polyfills,
        };
        let rewritten = rewriter.rewrite(&mut self.session, id, path, source).await?;
        Ok((rewritten.body, rewritten.discovered))
    }

    /// Source text, or `None` (logged) if the file cannot be read
    async fn read_source(&self, path: &Path) -> Option<String> {
        if let Some(source) = self.session.virtual_source(path) {
            return Some(source.to_string());
        }
        match fs::read_to_string(path).await {
            Ok(source) => Some(source),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "could not read module, skipping");
                None
            }
        }
    }

    async fn compile_sfc(&mut self, id: &ModuleId, path: &Path, source: &str) -> Result<String> {
        let output = self
            .sfc
            .compile(SfcRequest {
                filename: path,
                source,
                extract_styles: self.config.extract_styles,
                production: self.config.production,
            })
            .await;

        if !output.errors.is_empty() {
            for message in &output.errors {
                error!(path = %path.display(), "{}", message);
            }
            return Err(BuildError::Sfc {
                path: path.to_path_buf(),
                errors: output.errors,
            });
        }

        if !output.styles.is_empty() {
            if id.kind() == Some(ModuleKind::KilnPlugin) {
                self.session.emit_plugin_style(id, output.styles.join("\n"));
            } else {
                warn!(%id, "extracted styles are only bundled for kiln plugins, dropping them");
            }
        }
        Ok(output.code)
    }

    async fn load_template(&mut self, path: &Path) -> Result<()> {
        let compiled = self.templates.compile(path).await?;
        let (id, _) = self.session.assign(path);
        if compiled.id != id {
            warn!(
                expected = %id,
                got = %compiled.id,
                "template compiler returned a different identifier, keeping the assigned one"
            );
        }
        self.session.mark_processed(path);
        self.session.reset_dependencies(&id);
        self.session.emit(&id, path, compiled.code);
        Ok(())
    }
}

#[async_trait]
impl BuildHooks for GraphBuilder {
    async fn on_start(&mut self) -> Result<()> {
        self.started = Some(Instant::now());
        info!(root = %self.config.project_root.display(), "starting build");
        self.register_polyfills().await
    }

    async fn on_resolve(&mut self, path: &Path) -> Result<()> {
        self.process_graph(normalize(path), false).await
    }

    async fn on_load(&mut self, path: &Path) -> Result<()> {
        self.round_modules += 1;
        self.load_template(&normalize(path)).await
    }

    async fn on_end(&mut self) -> Result<BuildReport> {
        let summary = self.output.flush(&mut self.session, &self.config).await?;
        let report = BuildReport {
            modules: std::mem::take(&mut self.round_modules),
            identifiers: self.session.ids().len(),
            module_files: summary.module_files,
            bucket_files: summary.bucket_files,
            env_vars: self.session.env_vars().len(),
            elapsed: self
                .started
                .take()
                .map(|t| t.elapsed())
                .unwrap_or(Duration::ZERO),
        };
        info!(
            modules = report.modules,
            buckets = report.bucket_files.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "build finished"
        );
        Ok(report)
    }
}
