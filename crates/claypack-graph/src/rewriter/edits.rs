// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Ordered text edits against an unmodified source buffer

use tracing::warn;

/// Replace `source[start..end]` with `replacement`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    /// Start byte offset in the original buffer
    pub start: usize,
    /// End byte offset in the original buffer
    pub end: usize,
    /// New text
    pub replacement: String,
}

/// Edits addressed by original offsets.
///
/// Offsets never shift while edits are collected; [`EditList::apply`] splices
/// everything in one forward pass.
#[derive(Debug, Clone, Default)]
pub struct EditList {
    edits: Vec<Edit>,
}

impl EditList {
    /// Empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a replacement
    pub fn replace(&mut self, start: usize, end: usize, replacement: impl Into<String>) {
        self.edits.push(Edit {
            start,
            end,
            replacement: replacement.into(),
        });
    }

    /// Number of queued edits
    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Whether no edits are queued
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Produce the edited text.
    ///
    /// Edits that overlap an earlier one, or fall outside the buffer, are
    /// skipped with a warning.
    pub fn apply(mut self, source: &str) -> String {
        self.edits.sort_by_key(|e| (e.start, e.end));

        let mut out = String::with_capacity(source.len());
        let mut cursor = 0;
        for edit in self.edits {
            let in_bounds = edit.start <= edit.end
                && edit.end <= source.len()
                && source.is_char_boundary(edit.start)
                && source.is_char_boundary(edit.end);
            if edit.start < cursor || !in_bounds {
                warn!(start = edit.start, end = edit.end, "skipping conflicting edit");
                continue;
            }
            out.push_str(&source[cursor..edit.start]);
            out.push_str(&edit.replacement);
            cursor = edit.end;
        }
        out.push_str(&source[cursor..]);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_out_of_order() {
        let source = "let a = require('./a'); let b = require('./b');";
        let mut edits = EditList::new();
        edits.replace(32, 46, "require(2)");
        edits.replace(8, 22, "require(1)");

        assert_eq!(
            edits.apply(source),
            "let a = require(1); let b = require(2);"
        );
    }

    #[test]
    fn test_empty_list_is_identity() {
        let source = "console.log('unchanged');\n";
        assert_eq!(EditList::new().apply(source), source);
    }

    #[test]
    fn test_overlapping_edit_is_skipped() {
        let mut edits = EditList::new();
        edits.replace(0, 5, "xx");
        edits.replace(3, 8, "yy");
        assert_eq!(edits.apply("0123456789"), "xx56789");
    }

    #[test]
    fn test_multibyte_text_around_edits() {
        let source = "const s = 'é'; process.env.X";
        let start = source.find("process.env").unwrap();
        let mut edits = EditList::new();
        edits.replace(start, start + "process.env".len(), "window.process.env");
        assert_eq!(edits.apply(source), "const s = 'é'; window.process.env.X");
    }
}
