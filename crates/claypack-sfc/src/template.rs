// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Handlebars template registration

use crate::error::{Result, SfcError};
use async_trait::async_trait;
use claypack_graph::{BuildError, CompiledTemplate, ModuleId, ModuleKind, TemplateCompiler};
use regex::Regex;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tokio::fs;
use tracing::debug;

static READ_HELPER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\{\{\{\s?read\s?'(.*?)'\s?\}\}\}").expect("valid read helper regex")
});

/// Registers component templates on `window.kiln.componentTemplates`
#[derive(Debug, Clone)]
pub struct HandlebarsRegistrar {
    project_root: PathBuf,
}

impl HandlebarsRegistrar {
    /// Registrar resolving `read` helpers against `project_root`
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }

    /// Replace static `{{{ read 'file' }}}` helpers with the file contents.
    ///
    /// Contents are JSON-escaped without the surrounding quotes so they can
    /// sit inside a client-side string.
    pub async fn inline_reads(&self, source: &str) -> Result<String> {
        let mut inlined = String::with_capacity(source.len());
        let mut last = 0;
        for caps in READ_HELPER.captures_iter(source) {
            let (Some(whole), Some(rel)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let path = self.project_root.join(rel.as_str());
            let contents = fs::read_to_string(&path)
                .await
                .map_err(|source| SfcError::InlineRead {
                    path: path.clone(),
                    source,
                })?;
            let escaped = Value::String(contents).to_string();

            inlined.push_str(&source[last..whole.start()]);
            inlined.push_str(&escaped[1..escaped.len() - 1]);
            last = whole.end();
        }
        inlined.push_str(&source[last..]);
        Ok(inlined)
    }

    /// Registration code for the template at `path`
    pub async fn register(&self, path: &Path) -> Result<CompiledTemplate> {
        let name = component_name(path);
        let source = fs::read_to_string(path)
            .await
            .map_err(|source| SfcError::TemplateRead {
                path: path.to_path_buf(),
                source,
            })?;
        let source = self.inline_reads(&source).await?;
        debug!(template = %name, "registered template");

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

fn component_name(path: &Path) -> String {
    path.parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[async_trait]
impl TemplateCompiler for HandlebarsRegistrar {
    async fn compile(&self, path: &Path) -> claypack_graph::Result<CompiledTemplate> {
        self.register(path).await.map_err(|err| BuildError::Template {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })
    }
}
