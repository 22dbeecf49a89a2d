// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the module-graph builder

use std::path::PathBuf;
use thiserror::Error;

/// Result type for graph operations
pub type Result<T> = std::result::Result<T, BuildError>;

/// Errors that abort a build.
///
/// Conditions the builder can survive (a single unreadable file, a body the
/// minifier cannot re-parse) are logged where they happen and never reach
/// this type.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A `require()` specifier did not resolve to a file
    #[error(
        "Cannot find module '{specifier}' required from {importer}. \
         Install the package or add a polyfill for it."
    )]
    UnresolvedImport {
        /// Specifier as written in the source
        specifier: String,
        /// File containing the require
        importer: PathBuf,
    },

    /// A server-only service has no client-side counterpart
    #[error(
        "'{specifier}' required from {importer} resolves to a server-only service. \
         Create the client counterpart at {expected}."
    )]
    MissingClientService {
        /// Specifier as written in the source
        specifier: String,
        /// File containing the require
        importer: PathBuf,
        /// Path the client service was expected at
        expected: PathBuf,
    },

    /// A platform module was required but its polyfill was never registered
    #[error(
        "Polyfill for platform module '{0}' was never registered. \
         Install its browser replacement package."
    )]
    UnregisteredPolyfill(String),

    /// Polyfill dependency declarations form a cycle
    #[error("Polyfill dependency cycle involving '{0}'")]
    PolyfillCycle(String),

    /// A polyfill declares a dependency on an unknown entry
    #[error("Polyfill '{polyfill}' depends on unknown polyfill '{dependency}'")]
    UnknownPolyfill {
        /// Declaring entry
        polyfill: String,
        /// Unknown dependency name
        dependency: String,
    },

    /// Module source could not be parsed
    #[error("SyntaxError in {path}: {message}")]
    Parse {
        /// File that failed to parse
        path: PathBuf,
        /// First parser diagnostic
        message: String,
    },

    /// The single-file-component collaborator reported errors
    #[error("Could not compile single-file component {path}: {}", .errors.join("; "))]
    Sfc {
        /// Component file
        path: PathBuf,
        /// Collaborator diagnostics
        errors: Vec<String>,
    },

    /// The template collaborator failed
    #[error("Could not compile template {path}: {reason}")]
    Template {
        /// Template file
        path: PathBuf,
        /// Reason for failure
        reason: String,
    },

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid glob pattern
    #[error("Invalid glob pattern: {0}")]
    Glob(#[from] glob::PatternError),

    /// File system error while writing output
    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BuildError {
    /// Create an unresolved import error
    pub fn unresolved(specifier: impl Into<String>, importer: impl Into<PathBuf>) -> Self {
        Self::UnresolvedImport {
            specifier: specifier.into(),
            importer: importer.into(),
        }
    }

    /// Create a parse error
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }
}
