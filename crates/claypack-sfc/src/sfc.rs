// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Vue single-file components
//!
//! Components are split into their top-level blocks and reassembled in the
//! vueify shape: the script runs inside an IIFE that fills `module.exports`,
//! the template is attached to the exported options as a string for the
//! runtime compiler, and scoped styles get a `data-v-*` attribute.

use crate::error::{Result, SfcError};
use async_trait::async_trait;
use claypack_graph::{SfcCompiler, SfcOutput, SfcRequest};
use regex::{Captures, Regex};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

static OPEN_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(template|script|style)(\s[^>]*)?>").expect("valid block regex")
});

static SCOPED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bscoped\b").expect("valid scoped regex"));

static CSS_RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^{}]+)\{").expect("valid rule regex"));

static KEYFRAME_SELECTOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(from|to|\d+(\.\d+)?%)$").expect("valid keyframe regex")
});

static IMPORT_DEFAULT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*import\s+(\w+)\s+from\s+['"]([^'"]+)['"];?"#).expect("valid import regex")
});

static IMPORT_NAMESPACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*import\s+\*\s+as\s+(\w+)\s+from\s+['"]([^'"]+)['"];?"#)
        .expect("valid import regex")
});

static IMPORT_NAMED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*import\s+\{\s*([^}]*)\}\s+from\s+['"]([^'"]+)['"];?"#)
        .expect("valid import regex")
});

static IMPORT_SIDE_EFFECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*import\s+['"]([^'"]+)['"];?"#).expect("valid import regex")
});

static EXPORT_DEFAULT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bexport\s+default\s+").expect("valid export regex"));

/// One top-level block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block<'s> {
    /// Text between the tags
    pub content: &'s str,
    /// Raw attribute text of the opening tag
    pub attrs: &'s str,
}

impl Block<'_> {
    fn scoped(&self) -> bool {
        SCOPED.is_match(self.attrs)
    }
}

/// Top-level blocks of a component
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Descriptor<'s> {
    /// `<template>`
    pub template: Option<Block<'s>>,
    /// `<script>`
    pub script: Option<Block<'s>>,
    /// `<style>` blocks, in order
    pub styles: Vec<Block<'s>>,
}

/// Split `source` into its top-level blocks.
pub fn parse(source: &str) -> Result<Descriptor<'_>> {
    if source.trim().is_empty() {
        return Err(SfcError::Empty);
    }

    let mut descriptor = Descriptor::default();
    let mut pos = 0;
    while let Some(caps) = OPEN_TAG.captures_at(source, pos) {
        let (Some(open), Some(tag)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        let tag = tag.as_str();
        let body_start = open.end();
        let body_end = find_close(source, tag, body_start)?;
        let block = Block {
            content: &source[body_start..body_end],
            attrs: caps.get(2).map_or("", |m| m.as_str()),
        };

        match tag {
            "template" if descriptor.template.is_some() => {
                return Err(SfcError::Duplicate(tag.to_string()));
            }
            "script" if descriptor.script.is_some() => {
                return Err(SfcError::Duplicate(tag.to_string()));
            }
            "template" => descriptor.template = Some(block),
            "script" => descriptor.script = Some(block),
            _ => descriptor.styles.push(block),
        }
        pos = body_end + tag.len() + 3;
    }
    Ok(descriptor)
}

/// Offset of the `</tag>` closing the block opened before `from`.
///
/// Templates may nest `<template>` elements, so those are depth counted.
fn find_close(source: &str, tag: &str, from: usize) -> Result<usize> {
    let close = format!("</{}>", tag);
    let unterminated = || SfcError::Unterminated(tag.to_string());

    if tag != "template" {
        return source[from..]
            .find(&close)
            .map(|i| from + i)
            .ok_or_else(unterminated);
    }

    let open = "<template";
    let mut depth = 1;
    let mut cursor = from;
    loop {
        let rest = &source[cursor..];
        let next_close = rest.find(&close).ok_or_else(unterminated)?;
        match rest[..next_close].find(open) {
            Some(nested) => {
                depth += 1;
                cursor += nested + open.len();
            }
            None => {
                depth -= 1;
                if depth == 0 {
                    return Ok(cursor + next_close);
                }
                cursor += next_close + close.len();
            }
        }
    }
}

/// `data-v-<8 hex>` for a component.
///
/// Production builds hash the base name so ids do not depend on checkout
/// location.
pub fn scope_id(filename: &Path, source: &str, production: bool) -> String {
    let name = if production {
        filename
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    } else {
        filename.to_string_lossy().into_owned()
    };
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update(source.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("data-v-{}", &digest[..8])
}

/// Add `[scope]` to the last compound of every selector in `css`.
pub fn scope_css(css: &str, scope: &str) -> String {
    CSS_RULE
        .replace_all(css, |caps: &Captures<'_>| {
            let group = &caps[1];
            let trimmed = group.trim();
            if trimmed.is_empty() || trimmed.starts_with('@') {
                return caps[0].to_string();
            }
            let leading = &group[..group.len() - group.trim_start().len()];
            let selectors: Vec<String> = trimmed
                .split(',')
                .map(|s| scope_selector(s.trim(), scope))
                .collect();
            format!("{}{} {{", leading, selectors.join(", "))
        })
        .into_owned()
}

fn scope_selector(selector: &str, scope: &str) -> String {
    if KEYFRAME_SELECTOR.is_match(selector) {
        return selector.to_string();
    }
    let last_start = selector
        .rfind(|c: char| c.is_whitespace() || matches!(c, '>' | '+' | '~'))
        .map_or(0, |i| i + 1);
    let (head, last) = selector.split_at(last_start);
    match last.find(':') {
        Some(pseudo) => format!("{}{}[{}]{}", head, &last[..pseudo], scope, &last[pseudo..]),
        None => format!("{}{}[{}]", head, last, scope),
    }
}

/// Rewrite ES module syntax in a component script to CommonJS.
pub fn to_commonjs(script: &str) -> String {
    let script = IMPORT_NAMESPACE.replace_all(script, "\nvar $1 = require('$2');");
    let script = IMPORT_DEFAULT.replace_all(&script, "\nvar $1 = require('$2');");

    let mut counter = 0;
    let script = IMPORT_NAMED.replace_all(&script, |caps: &Captures<'_>| {
        let module = format!("__import{}__", counter);
        counter += 1;
        let mut out = format!("\nvar {} = require('{}');", module, &caps[2]);
        for binding in caps[1].split(',').map(str::trim).filter(|b| !b.is_empty()) {
            let (imported, local) = match binding.split_once(" as ") {
                Some((imported, local)) => (imported.trim(), local.trim()),
                None => (binding, binding),
            };
            out.push_str(&format!(" var {} = {}.{};", local, module, imported));
        }
        out
    });

    let script = IMPORT_SIDE_EFFECT.replace_all(&script, "\nrequire('$1');");
    EXPORT_DEFAULT
        .replace_all(&script, "module.exports = ")
        .into_owned()
}

/// Runtime snippet appending `css` to the document head
fn inject_style(css: &str) -> String {
    format!(
        "(function(){{var style=document.createElement('style');style.textContent={};document.head.appendChild(style);}})();\n",
        Value::String(css.to_string())
    )
}

/// Compiled component
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledComponent {
    /// Assembled CommonJS script
    pub code: String,
    /// Extracted styles (empty unless extraction was requested)
    pub styles: Vec<String>,
    /// Scope attribute
    pub scope_id: String,
}

/// Compile one component synchronously.
pub fn compile_component(request: &SfcRequest<'_>) -> Result<CompiledComponent> {
    let descriptor = parse(request.source)?;
    let scope = scope_id(request.filename, request.source, request.production);

    let script = match &descriptor.script {
        Some(block)
            if block.content.contains("export default") || block.content.contains("import ") =>
        {
            to_commonjs(block.content)
        }
        Some(block) => block.content.to_string(),
        None => "module.exports = {};".to_string(),
    };

    let styles: Vec<String> = descriptor
        .styles
        .iter()
        .map(|block| {
            let css = block.content.trim();
            if block.scoped() {
                scope_css(css, &scope)
            } else {
                css.to_string()
            }
        })
        .collect();
    let any_scoped = descriptor.styles.iter().any(Block::scoped);

    let mut code = format!(
        "!function() {{\n{}\n}}()\n\
         module.exports.__esModule && (module.exports = module.exports.default);\n\
         var __vue__options__ = \"function\" == typeof module.exports ? module.exports.options : module.exports;\n",
        script.trim()
    );
    if let Some(template) = &descriptor.template {
        code.push_str(&format!(
            "__vue__options__.template = {};\n",
            Value::String(template.content.trim().to_string())
        ));
    }
    if any_scoped {
        code.push_str(&format!(
            "__vue__options__._scopeId = {};\n",
            Value::String(scope.clone())
        ));
    }

    let extracted = if request.extract_styles {
        styles
    } else {
        for css in &styles {
            code.push_str(&inject_style(css));
        }
        Vec::new()
    };

    Ok(CompiledComponent {
        code,
        styles: extracted,
        scope_id: scope,
    })
}

/// Default single-file-component collaborator
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicSfcCompiler;

impl BasicSfcCompiler {
    /// Create a new compiler
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SfcCompiler for BasicSfcCompiler {
    async fn compile(&self, request: SfcRequest<'_>) -> SfcOutput {
        match compile_component(&request) {
            Ok(component) => {
                debug!(
                    file = %request.filename.display(),
                    scope = %component.scope_id,
                    styles = component.styles.len(),
                    "compiled component"
                );
                SfcOutput {
                    code: component.code,
                    styles: component.styles,
                    errors: Vec::new(),
                }
            }
            Err(err) => SfcOutput {
                errors: vec![format!("Could not compile Vue single-file component: {}", err)],
                ..SfcOutput::default()
            },
        }
    }
}
