// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Discovery phase: one synchronous walk over the syntax tree.
//!
//! Nothing is resolved here. The walk only records where things are so the
//! resolution phase can edit the original buffer by offset.

use crate::error::{BuildError, Result};
use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Argument, CallExpression, Expression, IdentifierReference, StaticMemberExpression,
};
use oxc_ast_visit::{walk, Visit};
use oxc_parser::Parser;
use oxc_semantic::{Scoping, SemanticBuilder};
use oxc_span::SourceType;
use std::path::Path;

/// Platform globals a module may use without requiring them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformGlobal {
    /// `process`
    Process,
    /// `Buffer`
    Buffer,
    /// `global`
    Global,
    /// `__dirname`
    Dirname,
    /// `__filename`
    Filename,
}

impl PlatformGlobal {
    /// Allow-list lookup
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "process" => Some(PlatformGlobal::Process),
            "Buffer" => Some(PlatformGlobal::Buffer),
            "global" => Some(PlatformGlobal::Global),
            "__dirname" => Some(PlatformGlobal::Dirname),
            "__filename" => Some(PlatformGlobal::Filename),
            _ => None,
        }
    }

    /// Identifier as written in source
    pub fn name(self) -> &'static str {
        match self {
            PlatformGlobal::Process => "process",
            PlatformGlobal::Buffer => "Buffer",
            PlatformGlobal::Global => "global",
            PlatformGlobal::Dirname => "__dirname",
            PlatformGlobal::Filename => "__filename",
        }
    }
}

/// Something the resolution phase has to act on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    /// `require('<specifier>')`; offsets cover the whole call
    Require {
        /// Start byte offset
        start: u32,
        /// End byte offset
        end: u32,
        /// String literal value
        specifier: String,
    },
    /// `process.env.<name>`; offsets cover the `process.env` prefix
    EnvAccess {
        /// Start byte offset
        start: u32,
        /// End byte offset
        end: u32,
        /// Variable name
        name: String,
    },
}

impl Finding {
    fn start(&self) -> u32 {
        match self {
            Finding::Require { start, .. } | Finding::EnvAccess { start, .. } => *start,
        }
    }
}

/// Output of the discovery phase
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    /// Findings in source order
    pub findings: Vec<Finding>,
    /// Free platform globals, deduplicated, in first-seen order
    pub globals: Vec<PlatformGlobal>,
}

/// Parse `source` and collect findings.
///
/// A parse failure is fatal: graphing a module we cannot read would silently
/// drop its dependencies. Globals are matched against references that no
/// scope binds, so a shadowing parameter only hides the name inside its own
/// function.
pub fn scan(source: &str, path: &Path) -> Result<ScanResult> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::mjs()).parse();

    if let Some(error) = ret.errors.first() {
        return Err(BuildError::parse(path, error.to_string()));
    }
    if ret.panicked {
        return Err(BuildError::parse(path, "parser aborted"));
    }

    let semantic = SemanticBuilder::new().build(&ret.program).semantic;
    let mut collector = Collector {
        scoping: semantic.scoping(),
        findings: Vec::new(),
        globals: Vec::new(),
    };
    collector.visit_program(&ret.program);
    Ok(collector.finish())
}

struct Collector<'s> {
    scoping: &'s Scoping,
    findings: Vec<Finding>,
    globals: Vec<PlatformGlobal>,
}

impl Collector<'_> {
    fn finish(mut self) -> ScanResult {
        self.findings.sort_by_key(Finding::start);
        ScanResult {
            findings: self.findings,
            globals: self.globals,
        }
    }

    /// No enclosing scope declares the referenced name
    fn is_unbound(&self, it: &IdentifierReference<'_>) -> bool {
        it.reference_id
            .get()
            .is_none_or(|id| self.scoping.get_reference(id).symbol_id().is_none())
    }
}

impl<'a> Visit<'a> for Collector<'_> {
    fn visit_call_expression(&mut self, it: &CallExpression<'a>) {
        if let Expression::Identifier(callee) = &it.callee {
            if callee.name.as_str() == "require" && it.arguments.len() == 1 {
                if let Argument::StringLiteral(literal) = &it.arguments[0] {
                    self.findings.push(Finding::Require {
                        start: it.span.start,
                        end: it.span.end,
                        specifier: literal.value.to_string(),
                    });
                }
            }
        }
        walk::walk_call_expression(self, it);
    }

    fn visit_static_member_expression(&mut self, it: &StaticMemberExpression<'a>) {
        if let Expression::StaticMemberExpression(prefix) = &it.object {
            let is_process_env = prefix.property.name.as_str() == "env"
                && matches!(
                    &prefix.object,
                    Expression::Identifier(obj) if obj.name.as_str() == "process"
                );
            if is_process_env {
                self.findings.push(Finding::EnvAccess {
                    start: prefix.span.start,
                    end: prefix.span.end,
                    name: it.property.name.to_string(),
                });
            }
        }
        walk::walk_static_member_expression(self, it);
    }

    fn visit_identifier_reference(&mut self, it: &IdentifierReference<'a>) {
        if let Some(global) = PlatformGlobal::from_name(it.name.as_str()) {
            if !self.globals.contains(&global) && self.is_unbound(it) {
                self.globals.push(global);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_ok(source: &str) -> ScanResult {
        scan(source, Path::new("/project/test.js")).unwrap()
    }

    #[test]
    fn test_require_calls() {
        let source = "const a = require('./a');\nconst b = require(\"b\");";
        let result = scan_ok(source);

        assert_eq!(result.findings.len(), 2);
        match &result.findings[0] {
            Finding::Require { start, end, specifier } => {
                assert_eq!(specifier, "./a");
                assert_eq!(&source[*start as usize..*end as usize], "require('./a')");
            }
            other => panic!("unexpected finding {:?}", other),
        }
        match &result.findings[1] {
            Finding::Require { specifier, .. } => assert_eq!(specifier, "b"),
            other => panic!("unexpected finding {:?}", other),
        }
    }

    #[test]
    fn test_non_literal_requires_are_ignored() {
        let result = scan_ok("require(name); require('a', 'b'); foo.require('c'); require(`d`);");
        assert!(result.findings.is_empty());
    }

    #[test]
    fn test_env_access() {
        let source = "if (process.env.API_HOST) { fetch(process.env.API_HOST); }";
        let result = scan_ok(source);

        assert_eq!(result.findings.len(), 2);
        match &result.findings[0] {
            Finding::EnvAccess { start, end, name } => {
                assert_eq!(name, "API_HOST");
                assert_eq!(&source[*start as usize..*end as usize], "process.env");
            }
            other => panic!("unexpected finding {:?}", other),
        }
        assert_eq!(result.globals, vec![PlatformGlobal::Process]);
    }

    #[test]
    fn test_globals_deduplicated_in_first_seen_order() {
        let result = scan_ok("console.log(__dirname, process.cwd(), __dirname, Buffer.from('x'));");
        assert_eq!(
            result.globals,
            vec![
                PlatformGlobal::Dirname,
                PlatformGlobal::Process,
                PlatformGlobal::Buffer
            ]
        );
    }

    #[test]
    fn test_declared_names_are_not_globals() {
        let result =
            scan_ok("var process = {}; function f(Buffer) { return Buffer; } process.x = 1;");
        assert!(result.globals.is_empty());
    }

    #[test]
    fn test_shadowing_is_scoped_to_its_function() {
        let result = scan_ok(
            "function wrap(Buffer) { return Buffer; }\n\
             module.exports = Buffer.from('x') + process.cwd();\n\
             function g() { var process = 1; return process; }",
        );
        assert_eq!(
            result.globals,
            vec![PlatformGlobal::Buffer, PlatformGlobal::Process]
        );
    }

    #[test]
    fn test_top_level_declaration_hides_global() {
        let result = scan_ok("const global = {}; global.x = 1; __filename;");
        assert_eq!(result.globals, vec![PlatformGlobal::Filename]);
    }

    #[test]
    fn test_property_names_are_not_globals() {
        let result = scan_ok("var o = { global: 1 }; o.process = 2; o.Buffer;");
        assert!(result.globals.is_empty());
    }

    #[test]
    fn test_parse_error_is_fatal() {
        let err = scan("const = ;", Path::new("/project/bad.js")).unwrap_err();
        assert!(matches!(err, BuildError::Parse { .. }));
    }
}
