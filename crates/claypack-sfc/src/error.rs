// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the default collaborators

use std::path::PathBuf;
use thiserror::Error;

/// Result type for collaborator operations
pub type Result<T> = std::result::Result<T, SfcError>;

/// Component and template compilation errors
#[derive(Debug, Error)]
pub enum SfcError {
    /// Component source is blank
    #[error("File is empty")]
    Empty,

    /// A top-level block is never closed
    #[error("<{0}> block is not closed")]
    Unterminated(String),

    /// More than one `<template>` or `<script>` block
    #[error("a component may only contain one <{0}> block")]
    Duplicate(String),

    /// `{{{ read '...' }}}` named a file that could not be read
    #[error("Error replacing {{{{{{ read '{path}' }}}}}}: {source}")]
    InlineRead {
        /// File the helper pointed at
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Template file could not be read
    #[error("Could not read template {path}: {source}")]
    TemplateRead {
        /// Template file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}
