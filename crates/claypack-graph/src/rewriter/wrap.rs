// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Globals wrapping and the runtime loader envelope

use super::scan::PlatformGlobal;
use crate::ids::{quote, ModuleId};
use serde_json::{Map, Value};

/// Runtime-environment detection for `global`
pub const GLOBAL_DETECT: &str = "typeof global !== \"undefined\" ? global : \
typeof self !== \"undefined\" ? self : \
typeof window !== \"undefined\" ? window : {}";

/// Values supplied to the globals wrapper
#[derive(Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Process polyfill id
    pub process: Option<ModuleId>,
    /// Buffer polyfill id
    pub buffer: Option<ModuleId>,
    /// Project-relative file path
    pub filename: String,
    /// Project-relative directory path
    pub dirname: String,
}

impl GlobalArgs {
    fn argument(&self, global: PlatformGlobal) -> String {
        match global {
            PlatformGlobal::Process => match &self.process {
                Some(id) => format!("require({})", id.require_arg()),
                None => "{}".to_string(),
            },
            PlatformGlobal::Buffer => match &self.buffer {
                Some(id) => format!("require({}).Buffer", id.require_arg()),
                None => "undefined".to_string(),
            },
            PlatformGlobal::Global => GLOBAL_DETECT.to_string(),
            PlatformGlobal::Dirname => quote(&self.dirname),
            PlatformGlobal::Filename => quote(&self.filename),
        }
    }
}

/// Wrap `body` in a function literal receiving `globals` as parameters.
pub fn wrap_globals(body: &str, globals: &[PlatformGlobal], args: &GlobalArgs) -> String {
    if globals.is_empty() {
        return body.to_string();
    }
    let params: Vec<&str> = globals.iter().map(|g| g.name()).collect();
    let values: Vec<String> = globals.iter().map(|g| args.argument(*g)).collect();
    format!(
        "(function ({}){{\n{}\n}}).call(this,{})",
        params.join(","),
        body,
        values.join(",")
    )
}

/// Dependency self-map: stringified id → id
pub fn dependency_map(deps: &[ModuleId]) -> String {
    let map: Map<String, Value> = deps
        .iter()
        .map(|dep| {
            let value = match dep {
                ModuleId::Numeric(n) => Value::from(*n),
                named => Value::String(named.to_string()),
            };
            (dep.to_string(), value)
        })
        .collect();
    Value::Object(map).to_string()
}

/// Register `body` with the client-side loader under `id`.
pub fn envelope(id: &ModuleId, body: &str, deps: &[ModuleId]) -> String {
    format!(
        "window.modules[{}] = [function(require,module,exports){{{}\n}}, {}];\n",
        quote(&id.to_string()),
        body,
        dependency_map(deps)
    )
}

/// Body of a structured-data module
pub fn json_body(data: &str) -> String {
    format!("module.exports={}", data.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ModuleKind;

    #[test]
    fn test_wrap_dirname_and_process() {
        let args = GlobalArgs {
            process: Some(ModuleId::Numeric(1)),
            buffer: Some(ModuleId::Numeric(2)),
            filename: "/components/widget/client.js".to_string(),
            dirname: "/components/widget".to_string(),
        };
        let wrapped = wrap_globals(
            "console.log(__dirname, process.browser);",
            &[PlatformGlobal::Dirname, PlatformGlobal::Process],
            &args,
        );
        assert_eq!(
            wrapped,
            "(function (__dirname,process){\nconsole.log(__dirname, process.browser);\n}).call(this,\"/components/widget\",require(1))"
        );
    }

    #[test]
    fn test_wrap_buffer_and_global() {
        let args = GlobalArgs {
            buffer: Some(ModuleId::Numeric(2)),
            ..GlobalArgs::default()
        };
        let wrapped = wrap_globals("x", &[PlatformGlobal::Buffer, PlatformGlobal::Global], &args);
        assert!(wrapped.starts_with("(function (Buffer,global){"));
        assert!(wrapped.contains("require(2).Buffer,typeof global !== \"undefined\""));
    }

    #[test]
    fn test_no_globals_is_identity() {
        assert_eq!(wrap_globals("x();", &[], &GlobalArgs::default()), "x();");
    }

    #[test]
    fn test_envelope_self_map() {
        let id = ModuleId::named("widget", ModuleKind::Client);
        let deps = vec![ModuleId::Numeric(1), ModuleId::named("widget", ModuleKind::Model)];
        let out = envelope(&id, "var a = require(1);", &deps);
        assert_eq!(
            out,
            "window.modules[\"widget.client\"] = [function(require,module,exports){var a = require(1);\n}, {\"1\":1,\"widget.model\":\"widget.model\"}];\n"
        );
    }

    #[test]
    fn test_json_body() {
        assert_eq!(json_body("{\"a\": 1}\n"), "module.exports={\"a\": 1}");
    }
}
