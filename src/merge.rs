//! Writing a script's changes back into live state
//!
//! The script's final context is diffed against the snapshot it started
//! from. Only keys the script actually changed reach the store, so merging
//! the same result twice is a no-op the second time.

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::request::{Request, RequestBody};
use crate::scripting::{ScriptContext, ScriptRequest, ScriptResult};
use crate::variables::{Change, VariableScope, VariableStore};

/// Counts for one variable scope
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScopeChanges {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
}

impl ScopeChanges {
    pub fn total(&self) -> usize {
        self.added + self.updated + self.removed
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub environment: ScopeChanges,
    pub globals: ScopeChanges,
    pub request_changed: bool,
}

impl MergeReport {
    pub fn is_empty(&self) -> bool {
        self.environment.is_empty() && self.globals.is_empty() && !self.request_changed
    }
}

/// Text stored for a script value: strings verbatim, `null` as empty, the rest as JSON
pub fn store_value(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

/// Apply environment and global changes made by a script
///
/// With no active environment, environment writes land in the local scope.
pub fn merge_variables(store: &mut VariableStore, snapshot: &ScriptContext, modified: &ScriptContext) -> MergeReport {
    let report = MergeReport {
        environment: merge_scope(
            store,
            VariableScope::Environment,
            &snapshot.environment,
            &modified.environment,
        ),
        globals: merge_scope(store, VariableScope::Global, &snapshot.globals, &modified.globals),
        request_changed: false,
    };

    debug!(
        env_added = report.environment.added,
        env_updated = report.environment.updated,
        env_removed = report.environment.removed,
        globals_added = report.globals.added,
        globals_updated = report.globals.updated,
        globals_removed = report.globals.removed,
        "merged script variables"
    );
    report
}

fn merge_scope(
    store: &mut VariableStore,
    scope: VariableScope,
    before: &IndexMap<String, JsonValue>,
    after: &IndexMap<String, JsonValue>,
) -> ScopeChanges {
    let mut changes = ScopeChanges::default();

    for (key, value) in after {
        if before.get(key) == Some(value) {
            continue;
        }
        match store.set(scope, key, &store_value(value)) {
            Change::Added => changes.added += 1,
            Change::Updated => changes.updated += 1,
            Change::Unchanged => {}
        }
    }

    for key in before.keys().filter(|k| !after.contains_key(*k)) {
        if store.disable(scope, key) {
            changes.removed += 1;
        }
    }

    changes
}

/// Apply pre-request changes to the request about to be sent
///
/// Returns whether the request changed. Removed headers are disabled, not deleted.
pub fn apply_request_changes(request: &mut Request, snapshot: &ScriptRequest, modified: &ScriptRequest) -> bool {
    let mut changed = false;

    if modified.url != snapshot.url && request.url != modified.url {
        request.url = modified.url.clone();
        changed = true;
    }

    let method = modified.method.to_uppercase();
    if modified.method != snapshot.method && request.method != method {
        request.method = method;
        changed = true;
    }

    for (name, value) in &modified.headers {
        if snapshot.header(name) != Some(value.as_str()) {
            changed |= request.set_header(name, value);
        }
    }
    for name in snapshot.headers.keys() {
        if modified.header(name).is_none() {
            changed |= request.disable_header(name);
        }
    }

    if modified.body != snapshot.body {
        let body = RequestBody::from_script_value(modified.body.as_ref(), &request.body);
        if body != request.body {
            request.body = body;
            changed = true;
        }
    }

    if changed {
        debug!(url = %request.url, method = %request.method, "applied script request changes");
    }
    changed
}

/// Merge everything a pre-request script changed: variables and the request
///
/// Failed scripts carry no modified context and change nothing.
pub fn merge_pre_request(
    store: &mut VariableStore,
    request: &mut Request,
    snapshot: &ScriptContext,
    result: &ScriptResult,
) -> MergeReport {
    let Some(modified) = result.modified_context.as_ref() else {
        return MergeReport::default();
    };
    let mut report = merge_variables(store, snapshot, modified);
    report.request_changed = apply_request_changes(request, &snapshot.request, &modified.request);
    report
}

/// Merge the variable changes of a test script; the request was already sent
pub fn merge_test(store: &mut VariableStore, snapshot: &ScriptContext, result: &ScriptResult) -> MergeReport {
    match result.modified_context.as_ref() {
        Some(modified) => merge_variables(store, snapshot, modified),
        None => MergeReport::default(),
    }
}
