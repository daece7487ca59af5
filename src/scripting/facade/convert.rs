//! Value conversion between serde_json and QuickJS

use rquickjs::convert::Coerced;
use rquickjs::{Array, Ctx, Object, Value};
use serde_json::Value as JsonValue;

use crate::assertion::Subject;

/// Convert a serde_json::Value to a QuickJS Value
pub(crate) fn json_to_js<'js>(ctx: &Ctx<'js>, json: &JsonValue) -> rquickjs::Result<Value<'js>> {
    match json {
        JsonValue::Null => Ok(Value::new_null(ctx.clone())),
        JsonValue::Bool(b) => Ok(Value::new_bool(ctx.clone(), *b)),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64().and_then(|i| i32::try_from(i).ok()) {
                Ok(Value::new_int(ctx.clone(), i))
            } else {
                Ok(Value::new_float(ctx.clone(), n.as_f64().unwrap_or(0.0)))
            }
        }
        JsonValue::String(s) => Ok(rquickjs::String::from_str(ctx.clone(), s)?.into_value()),
        JsonValue::Array(items) => {
            let array = Array::new(ctx.clone())?;
            for (i, item) in items.iter().enumerate() {
                array.set(i, json_to_js(ctx, item)?)?;
            }
            Ok(array.into_value())
        }
        JsonValue::Object(map) => {
            let object = Object::new(ctx.clone())?;
            for (key, value) in map {
                object.set(key.as_str(), json_to_js(ctx, value)?)?;
            }
            Ok(object.into_value())
        }
    }
}

/// `undefined` for `None`
pub(crate) fn option_to_js<'js>(ctx: &Ctx<'js>, json: Option<&JsonValue>) -> rquickjs::Result<Value<'js>> {
    match json {
        Some(value) => json_to_js(ctx, value),
        None => Ok(Value::new_undefined(ctx.clone())),
    }
}

/// Convert through `JSON.stringify`; `None` for values JSON cannot express
pub(crate) fn js_to_json<'js>(ctx: &Ctx<'js>, value: Value<'js>) -> rquickjs::Result<Option<JsonValue>> {
    if value.is_undefined() {
        return Ok(None);
    }
    match ctx.json_stringify(value)? {
        Some(text) => Ok(serde_json::from_str(&text.to_string()?).ok()),
        None => Ok(None),
    }
}

/// Like [`js_to_json`] but undefined and unrepresentable values become `null`
pub(crate) fn js_to_json_or_null<'js>(ctx: &Ctx<'js>, value: Value<'js>) -> rquickjs::Result<JsonValue> {
    Ok(js_to_json(ctx, value)?.unwrap_or(JsonValue::Null))
}

pub(crate) fn js_to_subject<'js>(ctx: &Ctx<'js>, value: Option<Value<'js>>) -> rquickjs::Result<Subject> {
    let value = match value {
        Some(v) if !v.is_undefined() => v,
        _ => return Ok(Subject::Undefined),
    };
    if value.is_function() {
        return Ok(Subject::Value(JsonValue::String("[Function]".to_string())));
    }
    Ok(js_to_json(ctx, value)?.into())
}

/// How `console.log` renders one argument: objects as JSON, the rest via `String(x)`
pub(crate) fn display_value<'js>(ctx: &Ctx<'js>, value: Value<'js>) -> rquickjs::Result<String> {
    if let Some(s) = value.as_string() {
        return s.to_string();
    }
    if value.is_object() && !value.is_function() {
        if let Some(text) = ctx.json_stringify(value.clone())? {
            return text.to_string();
        }
    }
    Ok(value.get::<Coerced<String>>()?.0)
}

/// JSON text of a value for log lines, `undefined` when there is none
pub(crate) fn log_json<'js>(ctx: &Ctx<'js>, value: Value<'js>) -> rquickjs::Result<String> {
    Ok(js_to_json(ctx, value)?
        .map(|json| json.to_string())
        .unwrap_or_else(|| "undefined".to_string()))
}

/// Message for a caught exception; the error name is kept unless it is plain `Error`
pub(crate) fn describe_exception(value: &Value<'_>) -> String {
    if let Some(exception) = value.as_exception() {
        let message = exception.message().unwrap_or_default();
        let name = exception.get::<_, String>("name").unwrap_or_default();
        return if name.is_empty() || name == "Error" {
            message
        } else {
            format!("{}: {}", name, message)
        };
    }
    if let Some(s) = value.as_string() {
        return s.to_string().unwrap_or_default();
    }
    value
        .get::<Coerced<String>>()
        .map(|c| c.0)
        .unwrap_or_else(|_| "Unknown error".to_string())
}
