//! `pm.test` and the native hooks behind `pm.expect`

use rquickjs::convert::Coerced;
use rquickjs::function::{Func, Opt};
use rquickjs::{Ctx, Exception, Function, Object, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use super::convert::{describe_exception, js_to_subject, log_json};
use crate::assertion::{Assertion, Expectation};
use crate::errors::Result;
use crate::scripting::result::{LogLevel, TestOutcome};
use crate::scripting::state::{log, with_state, SharedState};

/// `pm.test(name, fn)`: run `fn`, turning anything it throws into a failed test
///
/// When `fn` returns a promise the outcome is recorded once it settles, so
/// a rejection after `await` fails the test.
///
/// The interrupt raised when the time budget runs out is re-thrown so it
/// still ends the script.
pub(crate) fn test_function<'js>(
    ctx: &Ctx<'js>,
    state: &SharedState,
    interrupted: &Arc<AtomicBool>,
) -> Result<Function<'js>> {
    let st = state.clone();
    let interrupted = interrupted.clone();
    let test = Function::new(
        ctx.clone(),
        move |ctx: Ctx<'js>, name: Coerced<String>, body: Opt<Function<'js>>| -> rquickjs::Result<()> {
            let name = name.0;
            log(&st, LogLevel::Info, format!("Test: {}", name));
            let started = Instant::now();

            let outcome = match body.0 {
                Some(body) => match run_body(body) {
                    Ok(()) => Ok(()),
                    Err(rquickjs::Error::Exception) => {
                        let thrown = ctx.catch();
                        if interrupted.load(Ordering::SeqCst) {
                            return Err(ctx.throw(thrown));
                        }
                        Err(describe_exception(&thrown))
                    }
                    Err(_) if interrupted.load(Ordering::SeqCst) => {
                        let thrown = ctx.catch();
                        return Err(ctx.throw(thrown));
                    }
                    Err(rquickjs::Error::WouldBlock) => {
                        Err("Test is waiting on a promise that can never settle (timers are disabled)".to_string())
                    }
                    Err(other) => Err(other.to_string()),
                },
                None => Ok(()),
            };

            let duration_ms = started.elapsed().as_millis() as u64;
            with_state(&st, |s| match outcome {
                Ok(()) => {
                    s.log(LogLevel::Info, format!("✓ Test passed: {}", name));
                    s.tests.push(TestOutcome {
                        name,
                        passed: true,
                        message: None,
                        duration_ms,
                    });
                }
                Err(message) => {
                    s.log(LogLevel::Error, format!("✗ Test failed: {} - {}", name, message));
                    s.tests.push(TestOutcome {
                        name,
                        passed: false,
                        message: Some(message),
                        duration_ms,
                    });
                }
            });
            Ok(())
        },
    )?;
    Ok(test)
}

/// Call a test body; an async body is driven until its promise settles
fn run_body(body: Function<'_>) -> rquickjs::Result<()> {
    let returned = body.call::<_, Value>(())?;
    match returned.into_promise() {
        Some(promise) => promise.finish::<Value>().map(|_| ()),
        None => Ok(()),
    }
}

/// Hooks handed to the prelude: `check` evaluates one assertion, `recordSend`
/// logs a `pm.sendRequest` call
pub(crate) fn natives<'js>(ctx: &Ctx<'js>, state: &SharedState) -> Result<Object<'js>> {
    let native = Object::new(ctx.clone())?;

    let st = state.clone();
    native.set(
        "check",
        Func::from(
            move |ctx: Ctx<'js>,
                  op: Coerced<String>,
                  negated: Opt<bool>,
                  subject: Opt<Value<'js>>,
                  expected: Opt<Value<'js>>,
                  extra: Opt<Value<'js>>|
                  -> rquickjs::Result<()> {
                let subject = js_to_subject(&ctx, subject.0)?;
                let expected = js_to_subject(&ctx, expected.0)?;
                let extra = js_to_subject(&ctx, extra.0)?;

                let assertion = Assertion::from_op(&op.0, expected, extra)
                    .map_err(|e| Exception::throw_type(&ctx, &e.message))?;
                let expectation = Expectation::new(subject).negated(negated.0.unwrap_or(false));
                match expectation.check(&assertion) {
                    Ok(passed) => {
                        log(&st, LogLevel::Info, passed);
                        Ok(())
                    }
                    Err(failure) => Err(Exception::throw_message(&ctx, &failure.message)),
                }
            },
        ),
    )?;

    let st = state.clone();
    native.set(
        "recordSend",
        Func::from(move |ctx: Ctx<'js>, options: Opt<Value<'js>>| -> rquickjs::Result<()> {
            let detail = match options.0 {
                Some(value) if value.is_string() => format!("Request URL: {}", value.get::<String>()?),
                Some(value) => format!("Request: {}", log_json(&ctx, value)?),
                None => "Request: undefined".to_string(),
            };
            with_state(&st, |s| {
                s.log(LogLevel::Info, "pm.sendRequest called");
                s.log(LogLevel::Info, detail);
            });
            Ok(())
        }),
    )?;

    Ok(native)
}
