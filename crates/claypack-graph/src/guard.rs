// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Keeps server-only services out of the browser bundle

use crate::config::BuildConfig;
use crate::error::{BuildError, Result};
use crate::resolver;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Redirects `services/server/*` to `services/client/*`
#[derive(Debug, Clone)]
pub struct SubstitutionGuard {
    server_root: PathBuf,
    client_root: PathBuf,
}

impl SubstitutionGuard {
    /// Guard for the project described by `config`
    pub fn new(config: &BuildConfig) -> Self {
        Self {
            server_root: config.server_services(),
            client_root: config.client_services(),
        }
    }

    /// Path to actually bundle for `resolved`.
    ///
    /// Paths outside the server services directory pass through. Server
    /// paths are swapped for their client counterpart, which must exist.
    pub async fn check(
        &self,
        resolved: PathBuf,
        specifier: &str,
        importer: &Path,
    ) -> Result<PathBuf> {
        let Ok(relative) = resolved.strip_prefix(&self.server_root) else {
            return Ok(resolved);
        };

        let counterpart = self.client_root.join(relative);
        if resolver::exists(&counterpart).await {
            debug!(
                server = %resolved.display(),
                client = %counterpart.display(),
                "substituted client service"
            );
            Ok(counterpart)
        } else {
            Err(BuildError::MissingClientService {
                specifier: specifier.to_string(),
                importer: importer.to_path_buf(),
                expected: counterpart,
            })
        }
    }
}
