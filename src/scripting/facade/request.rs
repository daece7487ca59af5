//! `pm.request`: accessors over the script's working copy of the request

use rquickjs::convert::Coerced;
use rquickjs::function::{Func, Opt};
use rquickjs::{Ctx, Exception, Object, Value};
use serde_json::Value as JsonValue;

use super::convert::{js_to_json, js_to_json_or_null, json_to_js, option_to_js};
use crate::errors::Result;
use crate::scripting::result::LogLevel;
use crate::scripting::state::{with_state, SharedState};

pub(crate) fn request_object<'js>(ctx: &Ctx<'js>, state: &SharedState) -> Result<Object<'js>> {
    let request = Object::new(ctx.clone())?;
    request.set("url", url_object(ctx, state)?)?;
    request.set("method", method_object(ctx, state)?)?;
    request.set("headers", headers_object(ctx, state)?)?;
    request.set("body", body_object(ctx, state)?)?;
    Ok(request)
}

fn url_object<'js>(ctx: &Ctx<'js>, state: &SharedState) -> Result<Object<'js>> {
    let url = Object::new(ctx.clone())?;

    let st = state.clone();
    url.set(
        "get",
        Func::from(move || -> String { with_state(&st, |s| s.context.request.url.clone()) }),
    )?;

    let st = state.clone();
    url.set(
        "toString",
        Func::from(move || -> String { with_state(&st, |s| s.context.request.url.clone()) }),
    )?;

    let st = state.clone();
    url.set(
        "set",
        Func::from(move |value: Coerced<String>| {
            with_state(&st, |s| {
                s.log(LogLevel::Info, format!("pm.request.url.set('{}')", value.0));
                s.context.request.url = value.0;
            });
        }),
    )?;

    Ok(url)
}

fn method_object<'js>(ctx: &Ctx<'js>, state: &SharedState) -> Result<Object<'js>> {
    let method = Object::new(ctx.clone())?;

    let st = state.clone();
    method.set(
        "get",
        Func::from(move || -> String { with_state(&st, |s| s.context.request.method.clone()) }),
    )?;

    let st = state.clone();
    method.set(
        "toString",
        Func::from(move || -> String { with_state(&st, |s| s.context.request.method.clone()) }),
    )?;

    let st = state.clone();
    method.set(
        "set",
        Func::from(move |value: Coerced<String>| {
            let upper = value.0.to_uppercase();
            with_state(&st, |s| {
                s.log(LogLevel::Info, format!("pm.request.method.set('{}')", upper));
                s.context.request.method = upper;
            });
        }),
    )?;

    Ok(method)
}

/// Pull `{key, value}` out of a header argument
fn header_pair<'js>(ctx: &Ctx<'js>, header: &Value<'js>, caller: &str) -> rquickjs::Result<(String, String)> {
    let obj = header
        .as_object()
        .ok_or_else(|| Exception::throw_type(ctx, &format!("{} expects a {{key, value}} object", caller)))?;
    let key: Option<Coerced<String>> = obj.get("key")?;
    let value: Option<Coerced<String>> = obj.get("value")?;
    match key {
        Some(key) if !key.0.is_empty() => Ok((key.0, value.map(|v| v.0).unwrap_or_default())),
        _ => Err(Exception::throw_type(ctx, &format!("{} needs a non-empty key", caller))),
    }
}

fn headers_object<'js>(ctx: &Ctx<'js>, state: &SharedState) -> Result<Object<'js>> {
    let headers = Object::new(ctx.clone())?;

    for op in ["add", "upsert"] {
        let st = state.clone();
        headers.set(
            op,
            Func::from(move |ctx: Ctx<'js>, header: Value<'js>| -> rquickjs::Result<()> {
                let caller = format!("pm.request.headers.{}", op);
                let (key, value) = header_pair(&ctx, &header, &caller)?;
                let shown = js_to_json(&ctx, header)?.unwrap_or(JsonValue::Null);
                with_state(&st, |s| {
                    s.log(LogLevel::Info, format!("{}({})", caller, shown));
                    s.context.request.upsert_header(&key, &value);
                });
                Ok(())
            }),
        )?;
    }

    let st = state.clone();
    headers.set(
        "remove",
        Func::from(move |name: Coerced<String>| {
            with_state(&st, |s| {
                s.log(LogLevel::Info, format!("pm.request.headers.remove('{}')", name.0));
                s.context.request.remove_header(&name.0);
            });
        }),
    )?;

    let st = state.clone();
    headers.set(
        "get",
        Func::from(move |ctx: Ctx<'js>, name: Opt<Coerced<String>>| -> rquickjs::Result<Value<'js>> {
            let value = with_state(&st, |s| {
                let request = &s.context.request;
                match name.0 {
                    Some(name) => request.header(&name.0).map(|v| JsonValue::String(v.to_string())),
                    None => Some(JsonValue::Object(
                        request
                            .headers
                            .iter()
                            .map(|(k, v)| (k.clone(), JsonValue::String(v.clone())))
                            .collect(),
                    )),
                }
            });
            option_to_js(&ctx, value.as_ref())
        }),
    )?;

    let st = state.clone();
    headers.set(
        "has",
        Func::from(move |name: Coerced<String>| -> bool {
            with_state(&st, |s| s.context.request.header(&name.0).is_some())
        }),
    )?;

    let st = state.clone();
    headers.set(
        "clear",
        Func::from(move || {
            with_state(&st, |s| {
                s.log(LogLevel::Info, "pm.request.headers.clear()");
                s.context.request.headers.clear();
            });
        }),
    )?;

    Ok(headers)
}

fn body_object<'js>(ctx: &Ctx<'js>, state: &SharedState) -> Result<Object<'js>> {
    let body = Object::new(ctx.clone())?;

    let st = state.clone();
    body.set(
        "get",
        Func::from(move |ctx: Ctx<'js>| -> rquickjs::Result<Value<'js>> {
            let value = with_state(&st, |s| s.context.request.body.clone());
            option_to_js(&ctx, value.as_ref())
        }),
    )?;

    let st = state.clone();
    body.set(
        "set",
        Func::from(move |ctx: Ctx<'js>, value: Opt<Value<'js>>| -> rquickjs::Result<()> {
            let json = match value.0 {
                Some(v) => js_to_json(&ctx, v)?,
                None => None,
            };
            with_state(&st, |s| {
                s.log(LogLevel::Info, "pm.request.body.set(...)");
                s.context.request.body = json;
            });
            Ok(())
        }),
    )?;

    let st = state.clone();
    body.set(
        "update",
        Func::from(move |ctx: Ctx<'js>, options: Value<'js>| -> rquickjs::Result<Value<'js>> {
            let patch = js_to_json_or_null(&ctx, options)?;
            let merged = with_state(&st, |s| {
                s.log(LogLevel::Info, "pm.request.body.update(...)");
                let merged = match (s.context.request.body.take(), patch) {
                    (Some(JsonValue::Object(mut current)), JsonValue::Object(patch)) => {
                        for (k, v) in patch {
                            current.insert(k, v);
                        }
                        JsonValue::Object(current)
                    }
                    (_, patch) => patch,
                };
                s.context.request.body = Some(merged.clone());
                merged
            });
            json_to_js(&ctx, &merged)
        }),
    )?;

    Ok(body)
}
