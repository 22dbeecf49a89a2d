// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Browser replacements for platform modules
//!
//! Each entry declares the polyfills it depends on. [`PolyfillRegistry::ordered`]
//! turns those declarations into a processing order so an entry is always
//! registered after everything it requires. The globals-capable entries
//! (`process`, `Buffer`) are placed first because any user module may
//! reference them without an explicit `require`.

use crate::error::{BuildError, Result};
use std::collections::HashMap;
use std::path::Path;

/// Virtual path of the shared empty replacement module
pub const EMPTY_MODULE_PATH: &str = "/__claypack__/_empty.js";

/// Source of the shared empty replacement module
pub const EMPTY_MODULE_SOURCE: &str = "module.exports = {};\n";

/// Where a replacement implementation comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolyfillSource {
    /// Package specifier, resolved from the project root
    Package(&'static str),
    /// Shared empty module
    Empty,
}

/// One platform module and its browser replacement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polyfill {
    /// Platform module name (`buffer`, `path`, ...)
    pub name: &'static str,
    /// Replacement implementation
    pub source: PolyfillSource,
    /// Polyfills the replacement requires
    pub depends_on: &'static [&'static str],
    /// Referenced as an ambient global by arbitrary modules
    pub global: bool,
}

const fn package(
    name: &'static str,
    specifier: &'static str,
    depends_on: &'static [&'static str],
) -> Polyfill {
    Polyfill {
        name,
        source: PolyfillSource::Package(specifier),
        depends_on,
        global: false,
    }
}

const fn empty(name: &'static str) -> Polyfill {
    Polyfill {
        name,
        source: PolyfillSource::Empty,
        depends_on: &[],
        global: false,
    }
}

/// Browserify's builtin table
const BUILTINS: &[Polyfill] = &[
    Polyfill {
        name: "process",
        source: PolyfillSource::Package("process/browser"),
        depends_on: &[],
        global: true,
    },
    Polyfill {
        name: "buffer",
        source: PolyfillSource::Package("buffer/"),
        depends_on: &[],
        global: true,
    },
    package("events", "events/", &[]),
    package("util", "util/util.js", &["process"]),
    package("vm", "vm-browserify", &[]),
    package("string_decoder", "string_decoder/", &["buffer"]),
    package("stream", "stream-browserify", &["events", "buffer", "util", "string_decoder"]),
    package("assert", "assert/", &["util", "buffer"]),
    empty("child_process"),
    empty("cluster"),
    package("constants", "constants-browserify", &[]),
    package("crypto", "crypto-browserify", &["buffer", "stream"]),
    empty("dgram"),
    empty("dns"),
    empty("fs"),
    package("punycode", "punycode/", &[]),
    package("querystring", "querystring-es3", &[]),
    package("url", "url/", &["punycode", "querystring"]),
    package("http", "stream-http", &["buffer", "stream", "url", "events"]),
    empty("http2"),
    package("https", "https-browserify", &["http", "url"]),
    empty("net"),
    package("os", "os-browserify/browser.js", &[]),
    package("path", "path-browserify", &["process"]),
    empty("repl"),
    package("_stream_duplex", "readable-stream/duplex.js", &["stream"]),
    package("_stream_passthrough", "readable-stream/passthrough.js", &["stream"]),
    package("_stream_readable", "readable-stream/readable.js", &["stream"]),
    package("_stream_transform", "readable-stream/transform.js", &["stream"]),
    package("_stream_writable", "readable-stream/writable.js", &["stream"]),
    package("timers", "timers-browserify", &["process"]),
    empty("tls"),
    package("tty", "tty-browserify", &[]),
    package("zlib", "browserify-zlib", &["buffer", "stream", "util", "assert", "process"]),
    package("sys", "util/util.js", &["util"]),
];

/// Platform module name → replacement table
#[derive(Debug, Clone)]
pub struct PolyfillRegistry {
    entries: Vec<Polyfill>,
    by_name: HashMap<&'static str, usize>,
}

impl PolyfillRegistry {
    /// Registry over an explicit table
    pub fn new(entries: Vec<Polyfill>) -> Self {
        let by_name = entries
            .iter()
            .enumerate()
            .map(|(i, p)| (p.name, i))
            .collect();
        Self { entries, by_name }
    }

    /// The browserify builtin table
    pub fn builtin() -> Self {
        Self::new(BUILTINS.to_vec())
    }

    /// Entry for a platform module name
    pub fn get(&self, name: &str) -> Option<&Polyfill> {
        self.by_name.get(name).map(|&i| &self.entries[i])
    }

    /// Platform module named by a `require()` specifier, if any.
    ///
    /// `node:` prefixes are accepted; `buffer/` style specifiers explicitly
    /// ask for the npm package and are not platform modules.
    pub fn platform_module<'s>(&self, specifier: &'s str) -> Option<&'s str> {
        let name = specifier.strip_prefix("node:").unwrap_or(specifier);
        self.by_name.contains_key(name).then_some(name)
    }

    /// Entries in declaration order
    pub fn entries(&self) -> &[Polyfill] {
        &self.entries
    }

    /// Entries in processing order.
    ///
    /// Dependencies always precede dependents. Among entries that are ready,
    /// globals-capable ones go first, then declaration order.
    pub fn ordered(&self) -> Result<Vec<&Polyfill>> {
        let mut indegree = vec![0usize; self.entries.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.entries.len()];

        for (i, entry) in self.entries.iter().enumerate() {
            for dep in entry.depends_on {
                let &d = self.by_name.get(dep).ok_or_else(|| BuildError::UnknownPolyfill {
                    polyfill: entry.name.to_string(),
                    dependency: dep.to_string(),
                })?;
                indegree[i] += 1;
                dependents[d].push(i);
            }
        }

        let rank = |i: usize| (!self.entries[i].global, i);
        let mut ready: Vec<usize> = (0..self.entries.len())
            .filter(|&i| indegree[i] == 0)
            .collect();
        let mut order = Vec::with_capacity(self.entries.len());

        loop {
            ready.sort_by_key(|&i| std::cmp::Reverse(rank(i)));
            let Some(next) = ready.pop() else { break };
            order.push(&self.entries[next]);
            for &dependent in &dependents[next] {
                indegree[dependent] -= 1;
                if indegree[dependent] == 0 {
                    ready.push(dependent);
                }
            }
        }

        if order.len() != self.entries.len() {
            let stuck = self
                .entries
                .iter()
                .enumerate()
                .find(|(i, _)| indegree[*i] > 0)
                .map(|(_, p)| p.name)
                .unwrap_or_default();
            return Err(BuildError::PolyfillCycle(stuck.to_string()));
        }

        Ok(order)
    }
}

impl Default for PolyfillRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Whether `path` is the shared empty module
pub fn is_empty_module(path: &Path) -> bool {
    path == Path::new(EMPTY_MODULE_PATH)
}
