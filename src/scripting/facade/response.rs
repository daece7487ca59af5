//! `pm.response`: read-only view of the received response

use rquickjs::convert::Coerced;
use rquickjs::function::Func;
use rquickjs::{Ctx, Object, Value};
use serde_json::Value as JsonValue;

use super::convert::{json_to_js, option_to_js};
use crate::errors::Result;
use crate::scripting::context::ScriptResponse;
use crate::scripting::state::{with_state, SharedState};

fn read<R>(state: &SharedState, f: impl FnOnce(&ScriptResponse) -> R) -> Option<R> {
    with_state(state, |s| s.context.response.as_ref().map(f))
}

pub(crate) fn response_object<'js>(ctx: &Ctx<'js>, state: &SharedState) -> Result<Object<'js>> {
    let response = Object::new(ctx.clone())?;

    let st = state.clone();
    response.set(
        "json",
        Func::from(move |ctx: Ctx<'js>| -> rquickjs::Result<Value<'js>> {
            let body = read(&st, ScriptResponse::json).flatten().unwrap_or(JsonValue::Null);
            json_to_js(&ctx, &body)
        }),
    )?;

    let st = state.clone();
    response.set(
        "text",
        Func::from(move || -> String { read(&st, ScriptResponse::text).unwrap_or_default() }),
    )?;

    let st = state.clone();
    response.set(
        "code",
        Func::from(move || -> i32 { read(&st, |r| i32::from(r.status)).unwrap_or(0) }),
    )?;

    let st = state.clone();
    response.set(
        "status",
        Func::from(move || -> &'static str { read(&st, ScriptResponse::status_label).unwrap_or("Unknown") }),
    )?;

    let st = state.clone();
    response.set(
        "responseTime",
        Func::from(move || -> f64 { read(&st, |r| r.response_time_ms as f64).unwrap_or(0.0) }),
    )?;

    let st = state.clone();
    response.set(
        "responseSize",
        Func::from(move || -> f64 { read(&st, |r| r.text().len() as f64).unwrap_or(0.0) }),
    )?;

    response.set("headers", headers_object(ctx, state)?)?;
    Ok(response)
}

fn headers_object<'js>(ctx: &Ctx<'js>, state: &SharedState) -> Result<Object<'js>> {
    let headers = Object::new(ctx.clone())?;

    let st = state.clone();
    headers.set(
        "all",
        Func::from(move |ctx: Ctx<'js>| -> rquickjs::Result<Value<'js>> {
            let all = read(&st, |r| {
                JsonValue::Object(
                    r.headers
                        .iter()
                        .map(|(k, v)| (k.clone(), JsonValue::String(v.clone())))
                        .collect(),
                )
            })
            .unwrap_or_else(|| JsonValue::Object(Default::default()));
            json_to_js(&ctx, &all)
        }),
    )?;

    let st = state.clone();
    headers.set(
        "get",
        Func::from(move |ctx: Ctx<'js>, name: Coerced<String>| -> rquickjs::Result<Value<'js>> {
            let value = read(&st, |r| r.header(&name.0).map(|v| JsonValue::String(v.to_string()))).flatten();
            option_to_js(&ctx, value.as_ref())
        }),
    )?;

    let st = state.clone();
    headers.set(
        "has",
        Func::from(move |name: Coerced<String>| -> bool {
            read(&st, |r| r.header(&name.0).is_some()).unwrap_or(false)
        }),
    )?;

    Ok(headers)
}
