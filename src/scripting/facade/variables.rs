//! `pm.environment`, `pm.globals` and `pm.variables`

use indexmap::IndexMap;
use rquickjs::convert::Coerced;
use rquickjs::function::{Func, Opt};
use rquickjs::{Ctx, Object, Value};
use serde_json::Value as JsonValue;

use super::convert::{js_to_json_or_null, json_to_js, log_json, option_to_js};
use crate::errors::Result;
use crate::scripting::context::ScriptContext;
use crate::scripting::result::LogLevel;
use crate::scripting::state::{with_state, SharedState};

/// A variable map a script may write to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScriptScope {
    Environment,
    Globals,
}

impl ScriptScope {
    fn label(self) -> &'static str {
        match self {
            ScriptScope::Environment => "environment",
            ScriptScope::Globals => "globals",
        }
    }

    fn values(self, ctx: &ScriptContext) -> &IndexMap<String, JsonValue> {
        match self {
            ScriptScope::Environment => &ctx.environment,
            ScriptScope::Globals => &ctx.globals,
        }
    }

    fn values_mut(self, ctx: &mut ScriptContext) -> &mut IndexMap<String, JsonValue> {
        match self {
            ScriptScope::Environment => &mut ctx.environment,
            ScriptScope::Globals => &mut ctx.globals,
        }
    }
}

/// Build `pm.environment` or `pm.globals`
pub(crate) fn scope_object<'js>(ctx: &Ctx<'js>, state: &SharedState, scope: ScriptScope) -> Result<Object<'js>> {
    let obj = Object::new(ctx.clone())?;
    let label = scope.label();

    let st = state.clone();
    obj.set(
        "get",
        Func::from(move |ctx: Ctx<'js>, key: Coerced<String>| -> rquickjs::Result<Value<'js>> {
            let value = with_state(&st, |s| {
                s.log(LogLevel::Log, format!("pm.{}.get('{}')", label, key.0));
                scope.values(&s.context).get(&key.0).cloned()
            });
            option_to_js(&ctx, value.as_ref())
        }),
    )?;

    let st = state.clone();
    obj.set(
        "set",
        Func::from(
            move |ctx: Ctx<'js>, key: Coerced<String>, value: Opt<Value<'js>>| -> rquickjs::Result<()> {
                let value = value.0.unwrap_or_else(|| Value::new_undefined(ctx.clone()));
                let shown = log_json(&ctx, value.clone())?;
                let json = js_to_json_or_null(&ctx, value)?;
                with_state(&st, |s| {
                    s.log(LogLevel::Info, format!("pm.{}.set('{}', {})", label, key.0, shown));
                    scope.values_mut(&mut s.context).insert(key.0, json);
                });
                Ok(())
            },
        ),
    )?;

    let st = state.clone();
    obj.set(
        "unset",
        Func::from(move |key: Coerced<String>| {
            with_state(&st, |s| {
                s.log(LogLevel::Info, format!("pm.{}.unset('{}')", label, key.0));
                scope.values_mut(&mut s.context).shift_remove(&key.0);
            });
        }),
    )?;

    let st = state.clone();
    obj.set(
        "clear",
        Func::from(move || {
            with_state(&st, |s| {
                s.log(LogLevel::Info, format!("pm.{}.clear()", label));
                scope.values_mut(&mut s.context).clear();
            });
        }),
    )?;

    let st = state.clone();
    obj.set(
        "has",
        Func::from(move |key: Coerced<String>| -> bool {
            with_state(&st, |s| scope.values(&s.context).contains_key(&key.0))
        }),
    )?;

    let st = state.clone();
    obj.set(
        "toObject",
        Func::from(move |ctx: Ctx<'js>| -> rquickjs::Result<Value<'js>> {
            let snapshot = with_state(&st, |s| map_to_json(scope.values(&s.context)));
            json_to_js(&ctx, &snapshot)
        }),
    )?;

    let st = state.clone();
    obj.set(
        "toString",
        Func::from(move || -> String {
            with_state(&st, |s| map_to_json(scope.values(&s.context)).to_string())
        }),
    )?;

    Ok(obj)
}

/// Build `pm.variables`: reads local, then environment, then globals; writes go to the environment
pub(crate) fn variables_object<'js>(ctx: &Ctx<'js>, state: &SharedState) -> Result<Object<'js>> {
    let obj = Object::new(ctx.clone())?;

    let st = state.clone();
    obj.set(
        "get",
        Func::from(move |ctx: Ctx<'js>, key: Coerced<String>| -> rquickjs::Result<Value<'js>> {
            let value = with_state(&st, |s| {
                let found = [
                    ("local", &s.context.locals),
                    ("environment", &s.context.environment),
                    ("globals", &s.context.globals),
                ]
                .into_iter()
                .find_map(|(name, map)| map.get(&key.0).map(|v| (name, v.clone())));
                let source = found.as_ref().map(|(name, _)| *name).unwrap_or("undefined");
                s.log(LogLevel::Log, format!("pm.variables.get('{}') -> {}", key.0, source));
                found.map(|(_, v)| v)
            });
            option_to_js(&ctx, value.as_ref())
        }),
    )?;

    let st = state.clone();
    obj.set(
        "set",
        Func::from(
            move |ctx: Ctx<'js>, key: Coerced<String>, value: Opt<Value<'js>>| -> rquickjs::Result<()> {
                let value = value.0.unwrap_or_else(|| Value::new_undefined(ctx.clone()));
                let shown = log_json(&ctx, value.clone())?;
                let json = js_to_json_or_null(&ctx, value)?;
                with_state(&st, |s| {
                    s.log(LogLevel::Info, format!("pm.variables.set('{}', {})", key.0, shown));
                    s.context.environment.insert(key.0, json);
                });
                Ok(())
            },
        ),
    )?;

    let st = state.clone();
    obj.set(
        "has",
        Func::from(move |key: Coerced<String>| -> bool {
            with_state(&st, |s| {
                s.context.locals.contains_key(&key.0)
                    || s.context.environment.contains_key(&key.0)
                    || s.context.globals.contains_key(&key.0)
            })
        }),
    )?;

    let st = state.clone();
    obj.set(
        "unset",
        Func::from(move |key: Coerced<String>| {
            with_state(&st, |s| {
                s.log(LogLevel::Info, format!("pm.variables.unset('{}')", key.0));
                s.context.environment.shift_remove(&key.0);
                s.context.globals.shift_remove(&key.0);
            });
        }),
    )?;

    let st = state.clone();
    obj.set(
        "clear",
        Func::from(move || {
            with_state(&st, |s| {
                s.log(LogLevel::Info, "pm.variables.clear()");
                s.context.environment.clear();
                s.context.globals.clear();
            });
        }),
    )?;

    Ok(obj)
}

fn map_to_json(map: &IndexMap<String, JsonValue>) -> JsonValue {
    JsonValue::Object(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
}
