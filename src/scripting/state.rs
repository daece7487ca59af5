//! Mutable state shared between the `pm` bindings during one run

use std::sync::{Arc, Mutex};

use super::context::ScriptContext;
use super::result::{LogLevel, ScriptLogEntry, TestOutcome};

pub(crate) type SharedState = Arc<Mutex<PmState>>;

#[derive(Debug, Default)]
pub(crate) struct PmState {
    pub context: ScriptContext,
    pub logs: Vec<ScriptLogEntry>,
    pub tests: Vec<TestOutcome>,
}

impl PmState {
    pub fn shared(context: ScriptContext) -> SharedState {
        Arc::new(Mutex::new(PmState {
            context,
            logs: Vec::new(),
            tests: Vec::new(),
        }))
    }

    pub fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        self.logs.push(ScriptLogEntry::new(level, message));
    }
}

/// Run `f` with the state locked. Never call back into JavaScript from `f`.
pub(crate) fn with_state<R>(state: &SharedState, f: impl FnOnce(&mut PmState) -> R) -> R {
    let mut guard = state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    f(&mut guard)
}

pub(crate) fn log(state: &SharedState, level: LogLevel, message: impl Into<String>) {
    with_state(state, |s| s.log(level, message));
}

/// Take everything out of the state once the run is over
pub(crate) fn into_parts(state: SharedState) -> PmState {
    match Arc::try_unwrap(state) {
        Ok(mutex) => mutex.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner()),
        Err(shared) => with_state(&shared, std::mem::take),
    }
}
