// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Whitespace and comment stripping for emitted scripts

use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_parser::Parser;
use oxc_span::SourceType;

/// Re-print `source` compactly. `None` if it does not parse.
pub fn minify(source: &str) -> Option<String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::default()).parse();
    if ret.panicked || !ret.errors.is_empty() {
        return None;
    }
    let printed = Codegen::new()
        .with_options(CodegenOptions::minify())
        .build(&ret.program);
    Some(printed.code)
}
