// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # claypack-graph
//!
//! Module-graph builder for Clay component trees.
//!
//! Starting from component entry files, the builder resolves every
//! `require()` the way Node.js would, assigns each file a stable identifier,
//! rewrites call sites to those identifiers, swaps platform modules for
//! browser polyfills and wraps each module in a small loader envelope. The
//! results are written per module and as aggregate buckets grouped by kind
//! and name range.
//!
//! ## Example
//!
//! ```no_run
//! use claypack_graph::{pipeline, BuildConfig, Entries, GraphBuilder};
//! # use claypack_graph::{CompiledTemplate, SfcCompiler, SfcOutput, SfcRequest, TemplateCompiler};
//! # use std::{path::Path, sync::Arc};
//! # struct Sfc;
//! # #[async_trait::async_trait]
//! # impl SfcCompiler for Sfc {
//! #     async fn compile(&self, _: SfcRequest<'_>) -> SfcOutput { SfcOutput::default() }
//! # }
//! # struct Tpl;
//! # #[async_trait::async_trait]
//! # impl TemplateCompiler for Tpl {
//! #     async fn compile(&self, _: &Path) -> claypack_graph::Result<CompiledTemplate> { unimplemented!() }
//! # }
//!
//! # async fn build() -> claypack_graph::Result<()> {
//! let config = BuildConfig::from_env();
//! let entries = Entries::discover(&config)?;
//! let mut builder = GraphBuilder::new(config, Arc::new(Sfc), Arc::new(Tpl))?;
//! let report = pipeline::run(&mut builder, &entries).await?;
//! println!("{} modules", report.modules);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod buckets;
pub mod config;
pub mod error;
pub mod graph;
pub mod guard;
pub mod hooks;
pub mod ids;
pub mod minify;
pub mod output;
pub mod pipeline;
pub mod polyfills;
pub mod resolver;
pub mod rewriter;
pub mod session;

pub use buckets::{BucketKey, BucketKind, BucketSet, Shard};
pub use config::BuildConfig;
pub use error::{BuildError, Result};
pub use graph::GraphBuilder;
pub use guard::SubstitutionGuard;
pub use hooks::{
    BuildHooks, BuildReport, CompiledTemplate, SfcCompiler, SfcOutput, SfcRequest,
    TemplateCompiler,
};
pub use ids::{IdAssigner, ModuleId, ModuleKind};
pub use output::OutputWriter;
pub use pipeline::{Entries, EntryMatcher};
pub use polyfills::{Polyfill, PolyfillRegistry, PolyfillSource};
pub use resolver::PathResolver;
pub use session::BuildSession;
