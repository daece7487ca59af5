//! The `pm` object scripts run against
//!
//! Every binding reads or writes the shared [`PmState`](super::state::PmState)
//! rather than any live store. The fluent assertion chain and the
//! `sendRequest` stub are plain JavaScript (`prelude.js`) layered over two
//! native hooks.

pub(crate) mod console;
pub(crate) mod convert;
pub(crate) mod guards;
pub(crate) mod request;
pub(crate) mod response;
pub(crate) mod testing;
pub(crate) mod variables;

use rquickjs::{Ctx, Function, Object, Value};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use super::state::{with_state, SharedState};
use crate::errors::Result;
use variables::ScriptScope;

const PRELUDE: &str = include_str!("prelude.js");

/// Define the global `pm` and `console` objects
pub(crate) fn install(ctx: &Ctx<'_>, state: &SharedState, interrupted: &Arc<AtomicBool>) -> Result<()> {
    let pm = Object::new(ctx.clone())?;

    pm.set("environment", variables::scope_object(ctx, state, ScriptScope::Environment)?)?;
    pm.set("globals", variables::scope_object(ctx, state, ScriptScope::Globals)?)?;
    pm.set("variables", variables::variables_object(ctx, state)?)?;
    pm.set("request", request::request_object(ctx, state)?)?;
    pm.set("test", testing::test_function(ctx, state, interrupted)?)?;
    pm.set("iteration", 0)?;

    let factory: Function = ctx.eval(PRELUDE)?;
    let prelude: Object = factory.call((testing::natives(ctx, state)?,))?;
    pm.set("expect", prelude.get::<_, Value>("expect")?)?;
    pm.set("sendRequest", prelude.get::<_, Value>("sendRequest")?)?;

    if with_state(state, |s| s.context.response.is_some()) {
        let response = response::response_object(ctx, state)?;
        let assertions: Function = prelude.get("responseAssertions")?;
        let to: Value = assertions.call((response.clone(),))?;
        response.set("to", to)?;
        pm.set("response", response)?;
    } else {
        pm.set("response", Value::new_undefined(ctx.clone()))?;
    }

    console::register(ctx, &pm, state)?;
    ctx.globals().set("pm", pm)?;
    Ok(())
}
