//! Runtime lock-down applied after `pm` is installed
//!
//! Dynamic code construction and host globals are rebound to throwing stubs
//! and timers to no-ops. Every binding is non-configurable so a script cannot
//! restore the original.

use rquickjs::{Ctx, Function, Value};

use crate::errors::Result;

const GUARDS: &str = r#"
(function (root) {
    "use strict";

    function lock(target, name, descriptor) {
        descriptor.configurable = false;
        descriptor.enumerable = false;
        if (!("get" in descriptor)) {
            descriptor.writable = false;
        }
        Object.defineProperty(target, name, descriptor);
    }

    function deny(message) {
        return function () {
            throw new Error(message);
        };
    }

    var functionProto = Object.getPrototypeOf(function () {});
    var prototypes = [
        functionProto,
        Object.getPrototypeOf(async function () {}),
        Object.getPrototypeOf(function* () {}),
        Object.getPrototypeOf(async function* () {})
    ];

    var construct = deny("Function constructor is not allowed in scripts");
    construct.prototype = functionProto;
    prototypes.forEach(function (proto) {
        lock(proto, "constructor", { value: construct });
    });

    var blocked = {
        eval: "eval() is not allowed in scripts",
        Function: "Function constructor is not allowed in scripts",
        require: "require() is not allowed in scripts",
        fetch: "fetch() is not allowed in scripts, use pm.sendRequest instead",
        XMLHttpRequest: "XMLHttpRequest is not allowed in scripts, use pm.sendRequest instead",
        WebSocket: "WebSocket is not allowed in scripts",
        importScripts: "importScripts() is not allowed in scripts"
    };
    Object.keys(blocked).forEach(function (name) {
        lock(root, name, { value: name === "Function" ? construct : deny(blocked[name]) });
    });

    var hosts = {
        process: "process is not allowed in scripts",
        global: "global is not allowed in scripts",
        window: "window object is not allowed in scripts",
        document: "document object is not allowed in scripts",
        navigator: "navigator object is not allowed in scripts"
    };
    Object.keys(hosts).forEach(function (name) {
        lock(root, name, { get: deny(hosts[name]) });
    });

    ["setTimeout", "setInterval", "setImmediate"].forEach(function (name) {
        lock(root, name, { value: function () { return 0; } });
    });
    ["clearTimeout", "clearInterval", "clearImmediate"].forEach(function (name) {
        lock(root, name, { value: function () {} });
    });

    lock(root, "pm", { value: root.pm });
    lock(root, "console", { value: root.console });
})
"#;

pub(crate) fn harden(ctx: &Ctx<'_>) -> Result<()> {
    let install: Function = ctx.eval(GUARDS)?;
    install.call::<_, Value>((ctx.globals(),))?;
    Ok(())
}
