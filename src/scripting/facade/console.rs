//! `console.*` and the `pm.info/warn/error` shorthands
//!
//! Output is captured as script log entries instead of being printed.

use rquickjs::convert::Coerced;
use rquickjs::function::{Func, Rest};
use rquickjs::{Ctx, Object, Value};

use super::convert::display_value;
use crate::errors::Result;
use crate::scripting::result::LogLevel;
use crate::scripting::state::{log, SharedState};

pub(crate) fn register<'js>(ctx: &Ctx<'js>, pm: &Object<'js>, state: &SharedState) -> Result<()> {
    let console = Object::new(ctx.clone())?;

    let levels = [
        ("log", LogLevel::Log),
        ("debug", LogLevel::Log),
        ("info", LogLevel::Info),
        ("warn", LogLevel::Warn),
        ("error", LogLevel::Error),
    ];
    for (name, level) in levels {
        let st = state.clone();
        console.set(
            name,
            Func::from(move |ctx: Ctx<'js>, args: Rest<Value<'js>>| -> rquickjs::Result<()> {
                let parts = args
                    .0
                    .into_iter()
                    .map(|value| display_value(&ctx, value))
                    .collect::<rquickjs::Result<Vec<_>>>()?;
                log(&st, level, parts.join(" "));
                Ok(())
            }),
        )?;
    }

    for (name, level) in [("info", LogLevel::Info), ("warn", LogLevel::Warn), ("error", LogLevel::Error)] {
        let st = state.clone();
        pm.set(
            name,
            Func::from(move |message: Coerced<String>| log(&st, level, message.0)),
        )?;
    }

    ctx.globals().set("console", console)?;
    Ok(())
}
