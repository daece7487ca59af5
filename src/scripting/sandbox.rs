//! Script sandbox powered by QuickJS via rquickjs
//!
//! One [`ScriptSandbox`] owns a QuickJS runtime with memory, stack and time
//! limits. Each execution gets a fresh context holding nothing but the
//! standard built-ins, the `pm` façade and the guards.

use rquickjs::{Context, Ctx, Function, Promise, Runtime, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;

use super::context::ScriptContext;
use super::facade::{self, convert::describe_exception, guards};
use super::result::ScriptResult;
use super::state::{self, PmState, SharedState};
use super::validation;
use super::ScriptKind;
use crate::config::SandboxConfig;
use crate::errors::{PulseScriptError, Result};

const ASYNC_FUNCTION: &str = "Object.getPrototypeOf(async function () {}).constructor";

pub struct ScriptSandbox {
    runtime: Runtime,
    config: SandboxConfig,
    deadline: Arc<Mutex<Option<Instant>>>,
    interrupted: Arc<AtomicBool>,
}

impl ScriptSandbox {
    pub fn new(config: &SandboxConfig) -> Result<Self> {
        let runtime = Runtime::new()
            .map_err(|e| PulseScriptError::Script(format!("Failed to create JS runtime: {}", e)))?;
        runtime.set_memory_limit(config.memory_limit_bytes());
        runtime.set_max_stack_size(config.max_stack_size_bytes());

        let deadline: Arc<Mutex<Option<Instant>>> = Arc::new(Mutex::new(None));
        let interrupted = Arc::new(AtomicBool::new(false));
        {
            let deadline = deadline.clone();
            let interrupted = interrupted.clone();
            runtime.set_interrupt_handler(Some(Box::new(move || {
                let expired = deadline
                    .lock()
                    .map(|d| d.is_some_and(|at| Instant::now() >= at))
                    .unwrap_or(false);
                if expired {
                    interrupted.store(true, Ordering::SeqCst);
                }
                expired
            })));
        }

        Ok(Self {
            runtime,
            config: config.clone(),
            deadline,
            interrupted,
        })
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Run one script against a copy of `context`
    ///
    /// Never fails: rejected scripts, thrown errors and timeouts all come
    /// back as an unsuccessful [`ScriptResult`].
    pub fn execute(&self, kind: ScriptKind, source: &str, context: &ScriptContext) -> ScriptResult {
        let started = Instant::now();
        let shared = PmState::shared(context.clone());
        let outcome = self.run(source, &shared);
        self.runtime.run_gc();

        let PmState { context, logs, tests } = state::into_parts(shared);
        let result = match outcome {
            Ok(()) => ScriptResult::completed(logs, context, tests),
            Err(err) => {
                debug!(kind = %kind, validation = err.is_validation(), error = %err, "script failed");
                ScriptResult::failed(&err, logs, tests)
            }
        };

        debug!(
            kind = %kind,
            success = result.success,
            logs = result.logs.len(),
            tests = result.tests.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "script finished"
        );
        result
    }

    /// Size, denylist and syntax checks without running anything
    pub fn validate(&self, source: &str) -> Result<()> {
        validation::check_source(source, self.config.max_script_bytes)?;
        let context = Context::full(&self.runtime)?;
        context.with(|ctx| compile(&ctx, source).map(|_| ()))
    }

    fn run(&self, source: &str, state: &SharedState) -> Result<()> {
        validation::check_source(source, self.config.max_script_bytes)?;
        let context = Context::full(&self.runtime)
            .map_err(|e| PulseScriptError::Script(format!("Failed to create JS context: {}", e)))?;

        context.with(|ctx| {
            let script = compile(&ctx, source)?;
            facade::install(&ctx, state, &self.interrupted)?;
            guards::harden(&ctx)?;

            self.arm();
            let outcome = self.settle(&ctx, script);
            self.disarm();
            outcome
        })
    }

    /// Call the compiled body and drive its promise to completion
    fn settle<'js>(&self, ctx: &Ctx<'js>, script: Function<'js>) -> Result<()> {
        let settled = script
            .call::<_, Promise>(())
            .and_then(|promise| promise.finish::<Value>());

        match settled {
            Ok(_) => Ok(()),
            Err(_) if self.interrupted.load(Ordering::SeqCst) => {
                let _ = ctx.catch();
                Err(PulseScriptError::Timeout(self.config.timeout_ms))
            }
            Err(rquickjs::Error::Exception) => Err(PulseScriptError::Script(describe_exception(&ctx.catch()))),
            Err(rquickjs::Error::WouldBlock) => Err(PulseScriptError::Script(
                "Script is waiting on a promise that can never settle (timers are disabled)".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    fn arm(&self) {
        self.interrupted.store(false, Ordering::SeqCst);
        let at = Instant::now() + Duration::from_millis(self.config.timeout_ms);
        *self.deadline.lock().unwrap_or_else(|e| e.into_inner()) = Some(at);
    }

    fn disarm(&self) {
        *self.deadline.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

/// Compile `source` as the body of a strict async function without running it
fn compile<'js>(ctx: &Ctx<'js>, source: &str) -> Result<Function<'js>> {
    let constructor: Function = ctx.eval(ASYNC_FUNCTION)?;
    let body = format!("\"use strict\";\n{}", source);
    match constructor.call::<_, Function>((body,)) {
        Ok(script) => Ok(script),
        Err(rquickjs::Error::Exception) => {
            let thrown = ctx.catch();
            let message = thrown
                .as_exception()
                .and_then(|e| e.message())
                .unwrap_or_else(|| describe_exception(&thrown));
            Err(PulseScriptError::Syntax(message))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sandbox() -> ScriptSandbox {
        ScriptSandbox::new(&SandboxConfig::default()).unwrap()
    }

    #[test]
    fn test_validate_accepts_plain_script() {
        assert!(sandbox().validate("const x = 1 + 1;").is_ok());
    }

    #[test]
    fn test_validate_reports_syntax_error() {
        let err = sandbox().validate("const x = ").unwrap_err();
        assert!(matches!(err, PulseScriptError::Syntax(_)));
        assert!(err.to_string().starts_with("SyntaxError: "));
    }

    #[test]
    fn test_validate_checks_denylist_first() {
        let err = sandbox().validate("eval('1')").unwrap_err();
        assert_eq!(err.to_string(), "eval() is not allowed in scripts");
    }

    #[test]
    fn test_empty_script_completes() {
        let result = sandbox().execute(ScriptKind::PreRequest, "", &ScriptContext::default());
        assert!(result.success);
        assert!(result.logs.is_empty());
        assert_eq!(result.modified_context, Some(ScriptContext::default()));
    }

    #[test]
    fn test_timeout_is_reported() {
        let config = SandboxConfig {
            timeout_ms: 100,
            ..SandboxConfig::default()
        };
        let sandbox = ScriptSandbox::new(&config).unwrap();
        let result = sandbox.execute(ScriptKind::Test, "while (true) {}", &ScriptContext::default());
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Script execution timed out after 100 ms"));

        // the runtime stays usable afterwards
        let result = sandbox.execute(ScriptKind::Test, "pm.info('again')", &ScriptContext::default());
        assert!(result.success);
    }
}
