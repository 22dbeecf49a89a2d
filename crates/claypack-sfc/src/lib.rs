// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # claypack-sfc
//!
//! Default collaborators for the claypack graph builder:
//!
//! - [`BasicSfcCompiler`] turns Vue single-file components into CommonJS
//!   scripts in the vueify layout.
//! - [`HandlebarsRegistrar`] turns component templates into
//!   `window.kiln.componentTemplates` registrations.

#![warn(missing_docs)]

pub mod error;
pub mod sfc;
pub mod template;

pub use error::{Result, SfcError};
pub use sfc::{compile_component, BasicSfcCompiler, CompiledComponent};
pub use template::HandlebarsRegistrar;
