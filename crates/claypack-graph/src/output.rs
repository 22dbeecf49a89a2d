// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Artifact writing
//!
//! Layout of the output directory:
//!
//! | file | contents |
//! |---|---|
//! | `_ids.json` | project-relative path → identifier |
//! | `_registry.json` | identifier → ordered dependency identifiers |
//! | `_client-env.json` | environment variable names |
//! | `<id>.js` | one enveloped module |
//! | `_deps-a-d.js` ... | bucket aggregates |

use crate::config::BuildConfig;
use crate::error::Result;
use crate::minify::minify;
use crate::session::BuildSession;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Identifier map file
pub const IDS_FILE: &str = "_ids.json";
/// Dependency registry file
pub const REGISTRY_FILE: &str = "_registry.json";
/// Environment variable manifest
pub const ENV_FILE: &str = "_client-env.json";

/// What a flush wrote
#[derive(Debug, Clone, Default)]
pub struct FlushSummary {
    /// Per-module files
    pub module_files: usize,
    /// Bucket files
    pub bucket_files: Vec<PathBuf>,
}

/// Writes session contents to the output directory
#[derive(Debug, Clone)]
pub struct OutputWriter {
    dir: PathBuf,
    minify: bool,
}

impl OutputWriter {
    /// Writer for `config.output_dir`
    pub fn new(config: &BuildConfig) -> Self {
        Self {
            dir: config.output_dir.clone(),
            minify: config.minify,
        }
    }

    /// Output directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write metadata, pending modules and every non-empty bucket
    pub async fn flush(
        &self,
        session: &mut BuildSession,
        config: &BuildConfig,
    ) -> Result<FlushSummary> {
        fs::create_dir_all(&self.dir).await?;

        let ids: Map<String, Value> = session
            .ids()
            .iter()
            .map(|(path, id)| -> Result<(String, Value)> {
                Ok((config.project_relative(path), serde_json::to_value(id)?))
            })
            .collect::<Result<_>>()?;
        self.write_json(IDS_FILE, &Value::Object(ids)).await?;

        let registry: Map<String, Value> = session
            .registry()
            .iter()
            .map(|(id, deps)| -> Result<(String, Value)> {
                Ok((id.to_string(), serde_json::to_value(deps)?))
            })
            .collect::<Result<_>>()?;
        self.write_json(REGISTRY_FILE, &Value::Object(registry)).await?;

        let env = serde_json::to_value(session.env_vars())?;
        self.write_json(ENV_FILE, &env).await?;

        let mut summary = FlushSummary::default();

        for (id, body) in session.take_pending() {
            self.write_script(&format!("{}.js", id), &body).await?;
            summary.module_files += 1;
        }

        for (key, contents) in session.buckets().files() {
            let name = key.file_name();
            let path = if name.ends_with(".css") {
                self.write_raw(&name, &contents).await?
            } else {
                self.write_script(&name, &contents).await?
            };
            summary.bucket_files.push(path);
        }

        debug!(
            modules = summary.module_files,
            buckets = summary.bucket_files.len(),
            dir = %self.dir.display(),
            "flushed output"
        );
        Ok(summary)
    }

    /// Write a script, minified when configured.
    ///
    /// A body the minifier cannot parse is written as is.
    pub async fn write_script(&self, name: &str, body: &str) -> Result<PathBuf> {
        if !self.minify {
            return self.write_raw(name, body).await;
        }
        match minify(body) {
            Some(min) => self.write_raw(name, &min).await,
            None => {
                warn!(file = name, "minification failed, writing unminified output");
                self.write_raw(name, body).await
            }
        }
    }

    async fn write_json(&self, name: &str, value: &Value) -> Result<PathBuf> {
        let text = serde_json::to_string_pretty(value)?;
        self.write_raw(name, &text).await
    }

    async fn write_raw(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let path = self.dir.join(name);
        fs::write(&path, contents).await?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{ModuleId, ModuleKind};
    use std::collections::HashSet;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_flush_layout() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let config = BuildConfig::new(root);
        let mut session = BuildSession::new(&config, HashSet::new());

        let client_path = root.join("components/widget/client.js");
        let helper_path = root.join("components/widget/helper.js");
        let (client, _) = session.assign(&client_path);
        let (helper, _) = session.assign(&helper_path);
        session.reset_dependencies(&client);
        session.add_dependency(&client, helper.clone());
        session.reset_dependencies(&helper);
        session.record_env("API_HOST");
        session.emit(&client, &client_path, "client();".into());
        session.emit(&helper, &helper_path, "helper();".into());

        let writer = OutputWriter::new(&config);
        let summary = writer.flush(&mut session, &config).await.unwrap();
        let out = root.join("public/js");

        assert_eq!(summary.module_files, 2);
        assert_eq!(summary.bucket_files, vec![out.join("_deps-e-h.js")]);

        let read = |name: &str| std::fs::read_to_string(out.join(name)).unwrap();
        let ids: Value = serde_json::from_str(&read(IDS_FILE)).unwrap();
        assert_eq!(ids["/components/widget/client.js"], "widget.client");
        assert_eq!(ids["/components/widget/helper.js"], 1);

        let registry: Value = serde_json::from_str(&read(REGISTRY_FILE)).unwrap();
        assert_eq!(registry["widget.client"], serde_json::json!([1]));

        let env = std::fs::read_to_string(out.join(ENV_FILE)).unwrap();
        assert!(env.contains("API_HOST"));

        assert_eq!(std::fs::read_to_string(out.join("widget.client.js")).unwrap(), "client();");
        assert_eq!(std::fs::read_to_string(out.join("1.js")).unwrap(), "helper();");
        assert_eq!(client, ModuleId::named("widget", ModuleKind::Client));
    }

    #[tokio::test]
    async fn test_minify_falls_back_to_raw() {
        let dir = tempdir().unwrap();
        let mut config = BuildConfig::new(dir.path());
        config.minify = true;
        let writer = OutputWriter::new(&config);
        std::fs::create_dir_all(writer.dir()).unwrap();

        let path = writer.write_script("bad.js", "function (").await.unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "function (");
    }
}
