//! Conversions between Lua values and host-side values.

use luaext_application::ScriptError;
use luaext_domain::ScriptValue;
use mlua::SerializeOptions;
use mlua::prelude::*;
use serde_json::{Map, Number, Value as JsonValue};
use std::ffi::c_void;

/// JSON → Lua, keeping JSON `null` as the `JSON.null` sentinel.
pub(crate) fn json_to_lua(lua: &Lua, value: &JsonValue) -> LuaResult<LuaValue> {
    lua.to_value(value)
}

/// JSON → Lua, mapping JSON `null` to `nil`.
pub(crate) fn json_to_lua_nil(lua: &Lua, value: &JsonValue) -> LuaResult<LuaValue> {
    let options = SerializeOptions::new()
        .serialize_none_to_null(false)
        .serialize_unit_to_null(false);
    lua.to_value_with(value, options)
}

/// Lua → JSON.
///
/// A table becomes an array only when its keys are exactly `1..n` (or it
/// carries the array metatable `JSON.parse` attaches); any other table
/// becomes an object with stringified keys. `JSON.null` encodes as `null`.
/// Host-only values (functions, userdata, threads) are left out of objects
/// and become `null` inside arrays. Self-referencing tables are an error.
pub(crate) fn lua_to_json(lua: &Lua, value: LuaValue) -> LuaResult<JsonValue> {
    let mut visiting = Vec::new();
    Ok(encode_value(lua, &value, &mut visiting)?.unwrap_or(JsonValue::Null))
}

/// `None` for values JSON has no representation for.
fn encode_value(
    lua: &Lua,
    value: &LuaValue,
    visiting: &mut Vec<*const c_void>,
) -> LuaResult<Option<JsonValue>> {
    Ok(Some(match value {
        LuaValue::Nil => JsonValue::Null,
        LuaValue::LightUserData(ud) if ud.0.is_null() => JsonValue::Null,
        LuaValue::Boolean(b) => JsonValue::Bool(*b),
        LuaValue::Integer(i) => JsonValue::from(*i),
        LuaValue::Number(n) => Number::from_f64(*n).map_or(JsonValue::Null, JsonValue::Number),
        LuaValue::String(s) => JsonValue::String(s.to_string_lossy().to_string()),
        LuaValue::Table(t) => encode_table(lua, t, visiting)?,
        _ => return Ok(None),
    }))
}

fn encode_table(
    lua: &Lua,
    table: &LuaTable,
    visiting: &mut Vec<*const c_void>,
) -> LuaResult<JsonValue> {
    let ptr = table.to_pointer();
    if visiting.contains(&ptr) {
        return Err(LuaError::runtime("cannot encode a table that contains itself"));
    }
    visiting.push(ptr);

    let pairs = table
        .clone()
        .pairs::<LuaValue, LuaValue>()
        .collect::<LuaResult<Vec<_>>>()?;
    let tagged_array = table.metatable().is_some_and(|mt| mt == lua.array_metatable());
    let array_len = if is_sequence(&pairs) {
        Some(pairs.len())
    } else if tagged_array {
        tagged_array_len(&pairs)
    } else {
        None
    };
    let encoded = if let Some(len) = array_len {
        let mut items = vec![JsonValue::Null; len];
        for (key, value) in &pairs {
            if let LuaValue::Integer(i) = key {
                if let Some(slot) = usize::try_from(*i - 1).ok().and_then(|i| items.get_mut(i)) {
                    *slot = encode_value(lua, value, visiting)?.unwrap_or(JsonValue::Null);
                }
            }
        }
        JsonValue::Array(items)
    } else {
        let mut object = Map::new();
        for (key, value) in &pairs {
            if let Some(encoded) = encode_value(lua, value, visiting)? {
                object.insert(object_key(key)?, encoded);
            }
        }
        JsonValue::Object(object)
    };

    visiting.pop();
    Ok(encoded)
}

/// Keys are exactly `1..n`. The empty table is an object.
fn is_sequence(pairs: &[(LuaValue, LuaValue)]) -> bool {
    let len = pairs.len() as i64;
    !pairs.is_empty()
        && pairs
            .iter()
            .all(|(key, _)| matches!(key, LuaValue::Integer(i) if (1..=len).contains(i)))
}

/// Length of a parsed array edited from Lua: the highest index, provided
/// every key is still a positive index and the holes stay small.
fn tagged_array_len(pairs: &[(LuaValue, LuaValue)]) -> Option<usize> {
    pairs
        .iter()
        .try_fold(0usize, |len, (key, _)| match key {
            LuaValue::Integer(i) if *i >= 1 => usize::try_from(*i).ok().map(|i| len.max(i)),
            _ => None,
        })
        .filter(|len| *len <= pairs.len() * 2 + 16)
}

fn object_key(key: &LuaValue) -> LuaResult<String> {
    match key {
        LuaValue::String(s) => Ok(s.to_string_lossy().to_string()),
        LuaValue::Integer(i) => Ok(i.to_string()),
        LuaValue::Number(n) => Ok(n.to_string()),
        LuaValue::Boolean(b) => Ok(b.to_string()),
        other => Err(LuaError::runtime(format!(
            "cannot encode a {} key as JSON",
            other.type_name()
        ))),
    }
}

/// Marshal the first result of a call for the host.
pub(crate) fn to_script_value(lua: &Lua, value: LuaValue) -> LuaResult<ScriptValue> {
    Ok(match value {
        LuaValue::Nil => ScriptValue::Nil,
        LuaValue::LightUserData(ud) if ud.0.is_null() => ScriptValue::Nil,
        LuaValue::Boolean(b) => ScriptValue::Boolean(b),
        LuaValue::Integer(i) => ScriptValue::Integer(i),
        LuaValue::Number(n) => ScriptValue::Number(n),
        LuaValue::String(s) => ScriptValue::String(s.to_string_lossy().to_string()),
        LuaValue::Table(_) => ScriptValue::Composite(lua_to_json(lua, value)?),
        other => ScriptValue::String(format!("<{}>", other.type_name())),
    })
}

/// Lenient `tostring` for host messages; never fails.
pub(crate) fn display_value(value: &LuaValue) -> String {
    match value {
        LuaValue::Nil => "nil".to_string(),
        LuaValue::Boolean(b) => b.to_string(),
        LuaValue::Integer(i) => i.to_string(),
        LuaValue::Number(n) => n.to_string(),
        LuaValue::String(s) => s.to_string_lossy().to_string(),
        other => format!("<{}>", other.type_name()),
    }
}

/// Coarse host type tag of a Lua value.
pub(crate) fn host_type(value: &LuaValue) -> &'static str {
    match value {
        LuaValue::Nil => "undefined",
        LuaValue::Boolean(_) => "boolean",
        LuaValue::Integer(_) | LuaValue::Number(_) => "number",
        LuaValue::String(_) => "string",
        LuaValue::Function(_) => "function",
        _ => "object",
    }
}

/// Map an mlua error onto the runtime port's error type.
pub(crate) fn script_error(e: LuaError) -> ScriptError {
    match e {
        LuaError::SyntaxError { message, .. } => ScriptError::syntax(message),
        other => ScriptError::runtime(other.to_string()),
    }
}
