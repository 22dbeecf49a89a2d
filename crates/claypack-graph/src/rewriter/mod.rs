// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Source rewriting
//!
//! Rewriting happens in two phases. [`scan`] walks the syntax tree once and
//! returns typed findings carrying original byte offsets. [`Rewriter::rewrite`]
//! then resolves each finding (which needs async I/O), records dependencies in
//! the session and turns the findings into an [`EditList`] that is applied to
//! the untouched source in a single pass.

pub mod edits;
pub mod scan;
pub mod wrap;

pub use edits::{Edit, EditList};
pub use scan::{scan, Finding, PlatformGlobal, ScanResult};
pub use wrap::{dependency_map, envelope, json_body, wrap_globals, GlobalArgs};

use crate::config::BuildConfig;
use crate::error::{BuildError, Result};
use crate::guard::SubstitutionGuard;
use crate::ids::ModuleId;
use crate::polyfills::PolyfillRegistry;
use crate::resolver::PathResolver;
use crate::session::BuildSession;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Replacement for the `process.env` prefix
const BROWSER_ENV: &str = "window.process.env";

/// Rewritten module body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten {
    /// Body with requires rewritten and globals wrapped, not yet enveloped
    pub body: String,
    /// Dependency paths seen for the first time
    pub discovered: Vec<PathBuf>,
}

/// Resolution phase collaborators
#[derive(Debug, Clone, Copy)]
pub struct Rewriter<'c> {
    /// Build configuration
    pub config: &'c BuildConfig,
    /// Path resolver
    pub resolver: &'c PathResolver,
    /// Server/client substitution
    pub guard: &'c SubstitutionGuard,
    /// Platform module table
    pub polyfills: &'c PolyfillRegistry,
}

impl Rewriter<'_> {
    /// Rewrite `source`, the body of module `id` at `path`.
    ///
    /// The module's dependency list in `session` must already be reset; this
    /// appends to it in discovery order.
    pub async fn rewrite(
        &self,
        session: &mut BuildSession,
        id: &ModuleId,
        path: &Path,
        source: &str,
    ) -> Result<Rewritten> {
        let ScanResult { findings, globals } = scan(source, path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("/"));

        let mut edits = EditList::new();
        let mut discovered = Vec::new();

        for finding in findings {
            match finding {
                Finding::Require {
                    start,
                    end,
                    specifier,
                } => {
                    let dep = match self.polyfills.platform_module(&specifier) {
                        Some(name) => polyfill_id(session, name)?,
                        None => {
                            let resolved = self
                                .resolver
                                .resolve(&specifier, base_dir)
                                .await
                                .ok_or_else(|| BuildError::unresolved(&specifier, path))?;
                            let resolved = self.guard.check(resolved, &specifier, path).await?;
                            let (dep, fresh) = session.assign(&resolved);
                            if fresh {
                                discovered.push(resolved);
                            }
                            dep
                        }
                    };
                    trace!(%id, specifier = %specifier, %dep, "require");
                    edits.replace(
                        start as usize,
                        end as usize,
                        format!("require({})", dep.require_arg()),
                    );
                    if &dep != id {
                        session.add_dependency(id, dep);
                    }
                }
                Finding::EnvAccess { start, end, name } => {
                    edits.replace(start as usize, end as usize, BROWSER_ENV);
                    session.record_env(name);
                }
            }
        }

        let mut body = edits.apply(source);

        if !globals.is_empty() {
            let mut args = GlobalArgs {
                filename: self.config.project_relative(path),
                dirname: self.config.project_relative(base_dir),
                ..GlobalArgs::default()
            };
            if globals.contains(&PlatformGlobal::Process) {
                let process = polyfill_id(session, "process")?;
                if &process != id {
                    session.add_dependency(id, process.clone());
                }
                args.process = Some(process);
            }
            if globals.contains(&PlatformGlobal::Buffer) {
                let buffer = polyfill_id(session, "buffer")?;
                if &buffer != id {
                    session.add_dependency(id, buffer.clone());
                }
                args.buffer = Some(buffer);
            }
            body = wrap_globals(&body, &globals, &args);
        }

        Ok(Rewritten { body, discovered })
    }
}

fn polyfill_id(session: &BuildSession, name: &str) -> Result<ModuleId> {
    session
        .polyfill_id(name)
        .cloned()
        .ok_or_else(|| BuildError::UnregisteredPolyfill(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::fs;
    use tempfile::tempdir;

    struct Fixture {
        config: BuildConfig,
        resolver: PathResolver,
        guard: SubstitutionGuard,
        polyfills: PolyfillRegistry,
    }

    impl Fixture {
        fn new(root: &Path) -> Self {
            let config = BuildConfig::new(root);
            Self {
                guard: SubstitutionGuard::new(&config),
                config,
                resolver: PathResolver::new(),
                polyfills: PolyfillRegistry::builtin(),
            }
        }

        fn rewriter(&self) -> Rewriter<'_> {
            Rewriter {
                config: &self.config,
                resolver: &self.resolver,
                guard: &self.guard,
                polyfills: &self.polyfills,
            }
        }
    }

    fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn test_requires_rewritten_in_place() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(root, "components/w/a.js", "");
        write(root, "components/w/b.js", "");
        let client = write(
            root,
            "components/w/client.js",
            "var a = require('./a');\n// keep\nvar b = require(\"./b\");\n",
        );
        let fixture = Fixture::new(root);
        let mut session = BuildSession::new(&fixture.config, HashSet::new());
        let (id, _) = session.assign(&client);
        let source = fs::read_to_string(&client).unwrap();

        let out = fixture
            .rewriter()
            .rewrite(&mut session, &id, &client, &source)
            .await
            .unwrap();

        assert_eq!(out.body, "var a = require(1);\n// keep\nvar b = require(2);\n");
        assert_eq!(
            out.discovered,
            vec![root.join("components/w/a.js"), root.join("components/w/b.js")]
        );
        assert_eq!(session.dependencies(&id), &[ModuleId::Numeric(1), ModuleId::Numeric(2)]);
    }

    #[tokio::test]
    async fn test_env_access_recorded() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let file = write(root, "lib/env.js", "module.exports = process.env.API_HOST;");
        let fixture = Fixture::new(root);
        let mut session = BuildSession::new(&fixture.config, HashSet::new());
        session.register_polyfill("process", ModuleId::Numeric(99));
        let (id, _) = session.assign(&file);

        let out = fixture
            .rewriter()
            .rewrite(&mut session, &id, &file, "module.exports = process.env.API_HOST;")
            .await
            .unwrap();

        assert!(out.body.contains("module.exports = window.process.env.API_HOST;"));
        assert!(out.body.starts_with("(function (process){"));
        assert!(out.body.ends_with("}).call(this,require(99))"));
        assert!(session.env_vars().contains("API_HOST"));
        assert_eq!(session.dependencies(&id), &[ModuleId::Numeric(99)]);
    }

    #[tokio::test]
    async fn test_unresolved_is_fatal() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let file = write(root, "lib/a.js", "require('./nope')");
        let fixture = Fixture::new(root);
        let mut session = BuildSession::new(&fixture.config, HashSet::new());
        let (id, _) = session.assign(&file);

        let err = fixture
            .rewriter()
            .rewrite(&mut session, &id, &file, "require('./nope')")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::UnresolvedImport { ref specifier, .. } if specifier == "./nope"
        ));
    }

    #[tokio::test]
    async fn test_platform_module_uses_registered_polyfill() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let file = write(root, "lib/a.js", "");
        let fixture = Fixture::new(root);
        let mut session = BuildSession::new(&fixture.config, HashSet::new());
        session.register_polyfill("path", ModuleId::Numeric(7));
        let (id, _) = session.assign(&file);

        let out = fixture
            .rewriter()
            .rewrite(&mut session, &id, &file, "var p = require('path');")
            .await
            .unwrap();
        assert_eq!(out.body, "var p = require(7);");
        assert!(out.discovered.is_empty());
        assert_eq!(session.dependencies(&id), &[ModuleId::Numeric(7)]);

        let err = fixture
            .rewriter()
            .rewrite(&mut session, &id, &file, "require('os')")
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::UnregisteredPolyfill(ref name) if name == "os"));
    }
}
