//! Always-available Lua globals.
//!
//! ```lua
//! hosttype(v)                          -- "undefined" | "boolean" | "number" | ...
//! regex.match(s, p)                    -- all matches, or nil
//! regex.replace(s, p, r)               -- global replace, "$1" group refs
//! regex.test(s, p)
//! JSON.stringify(v) / JSON.parse(s)    -- JSON.null is the null sentinel
//! notify.info("saved", "Title")        -- also success / warning / error
//! capabilities.has("timers")
//! capabilities.list()
//! events.on("chat_changed", function(...) end)
//! dispatch_event("chat_changed", 1, 2)
//! ```

use luaext_application::{HostFacade, NotifyLevel};
use luaext_domain::{Capability, CapabilityFlags};
use mlua::prelude::*;
use regex::Regex;
use std::sync::{Arc, Mutex};
use tracing::warn;

use super::convert::{display_value, host_type, json_to_lua, lua_to_json};
use super::event_bus::EventBus;

pub fn register_core_api(
    lua: &Lua,
    globals: &LuaTable,
    host: Arc<dyn HostFacade>,
    flags: CapabilityFlags,
    event_bus: Arc<Mutex<EventBus>>,
) -> LuaResult<()> {
    globals.set(
        "hosttype",
        lua.create_function(|_, value: LuaValue| Ok(host_type(&value)))?,
    )?;

    register_regex_api(lua, globals)?;
    register_json_api(lua, globals)?;
    register_notify_api(lua, globals, host)?;
    register_capabilities_api(lua, globals, flags)?;
    register_events_api(lua, globals, event_bus)?;
    Ok(())
}

fn compile(pattern: &str) -> LuaResult<Regex> {
    Regex::new(pattern)
        .map_err(|e| LuaError::external(format!("invalid pattern '{}': {}", pattern, e)))
}

fn register_regex_api(lua: &Lua, globals: &LuaTable) -> LuaResult<()> {
    let regex_table = lua.create_table()?;

    // regex.match(s, p) -> { match, ... } | nil
    regex_table.set(
        "match",
        lua.create_function(|lua, (subject, pattern): (String, String)| {
            let re = compile(&pattern)?;
            let matches: Vec<&str> = re.find_iter(&subject).map(|m| m.as_str()).collect();
            if matches.is_empty() {
                Ok(LuaValue::Nil)
            } else {
                Ok(LuaValue::Table(lua.create_sequence_from(matches)?))
            }
        })?,
    )?;

    // regex.replace(s, p, r) -> string
    regex_table.set(
        "replace",
        lua.create_function(
            |_, (subject, pattern, replacement): (String, String, String)| {
                let re = compile(&pattern)?;
                Ok(re.replace_all(&subject, replacement.as_str()).into_owned())
            },
        )?,
    )?;

    // regex.test(s, p) -> boolean
    regex_table.set(
        "test",
        lua.create_function(|_, (subject, pattern): (String, String)| {
            Ok(compile(&pattern)?.is_match(&subject))
        })?,
    )?;

    globals.set("regex", regex_table)
}

fn register_json_api(lua: &Lua, globals: &LuaTable) -> LuaResult<()> {
    let json_table = lua.create_table()?;

    json_table.set(
        "stringify",
        lua.create_function(|lua, value: LuaValue| {
            let json = lua_to_json(lua, value)?;
            serde_json::to_string(&json).map_err(LuaError::external)
        })?,
    )?;

    json_table.set(
        "parse",
        lua.create_function(|lua, text: String| {
            let json: serde_json::Value = serde_json::from_str(&text)
                .map_err(|e| LuaError::external(format!("invalid JSON: {}", e)))?;
            json_to_lua(lua, &json)
        })?,
    )?;

    json_table.set("null", LuaValue::NULL)?;
    globals.set("JSON", json_table)
}

fn register_notify_api(lua: &Lua, globals: &LuaTable, host: Arc<dyn HostFacade>) -> LuaResult<()> {
    let notify_table = lua.create_table()?;

    for level in NotifyLevel::ALL {
        let host = Arc::clone(&host);
        let notify_fn = lua.create_function(move |_, (message, title): (LuaValue, LuaValue)| {
            let message = display_value(&message);
            let title = match title {
                LuaValue::Nil => None,
                other => Some(display_value(&other)),
            };
            host.notify(level, &message, title.as_deref());
            Ok(())
        })?;
        notify_table.set(level.as_str(), notify_fn)?;
    }

    globals.set("notify", notify_table)
}

fn register_capabilities_api(
    lua: &Lua,
    globals: &LuaTable,
    flags: CapabilityFlags,
) -> LuaResult<()> {
    let capabilities = lua.create_table()?;

    capabilities.set(
        "has",
        lua.create_function(move |_, name: String| {
            Ok(name
                .parse::<Capability>()
                .map(|c| flags.is_enabled(c))
                .unwrap_or(false))
        })?,
    )?;

    capabilities.set(
        "list",
        lua.create_function(move |lua, ()| {
            lua.create_sequence_from(flags.enabled().iter().map(|c| c.as_str()))
        })?,
    )?;

    globals.set("capabilities", capabilities)
}

fn register_events_api(
    lua: &Lua,
    globals: &LuaTable,
    event_bus: Arc<Mutex<EventBus>>,
) -> LuaResult<()> {
    let events = lua.create_table()?;

    // events.on(name, fn)
    {
        let bus = Arc::clone(&event_bus);
        let on_fn = lua.create_function(move |lua, (name, callback): (String, LuaFunction)| {
            let key = lua.create_registry_value(callback)?;
            let mut bus = bus
                .lock()
                .map_err(|e| LuaError::external(format!("event_bus lock poisoned: {}", e)))?;
            bus.register(&name, key);
            Ok(())
        })?;
        events.set("on", on_fn)?;
    }
    globals.set("events", events)?;

    // dispatch_event(name, ...) -> number of listeners run
    let bus = Arc::clone(&event_bus);
    let dispatch_fn = lua.create_async_function(
        move |lua, (name, args): (String, LuaMultiValue)| {
            let bus = Arc::clone(&bus);
            async move {
                let listeners = {
                    let bus = bus.lock().map_err(|e| {
                        LuaError::external(format!("event_bus lock poisoned: {}", e))
                    })?;
                    bus.resolve(&lua, &name)?
                };

                let count = listeners.len();
                for listener in listeners {
                    if let Err(e) = listener.call_async::<()>(args.clone()).await {
                        warn!(event = %name, "Event listener failed: {}", e);
                    }
                }
                Ok(count)
            }
        },
    )?;
    globals.set("dispatch_event", dispatch_fn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingHost;

    fn make_lua(flags: CapabilityFlags) -> (Lua, Arc<RecordingHost>) {
        let lua = Lua::new();
        let host = Arc::new(RecordingHost::new());
        register_core_api(
            &lua,
            &lua.globals(),
            host.clone(),
            flags,
            Arc::new(Mutex::new(EventBus::new())),
        )
        .unwrap();
        (lua, host)
    }

    #[test]
    fn test_regex_match_returns_all_matches_or_nil() {
        let (lua, _) = make_lua(CapabilityFlags::none());
        let joined: String = lua
            .load("return table.concat(regex.match('a1b22c333', '[0-9]+'), ',')")
            .eval()
            .unwrap();
        assert_eq!(joined, "1,22,333");

        let none: LuaValue = lua.load("return regex.match('abc', '[0-9]')").eval().unwrap();
        assert_eq!(none, LuaValue::Nil);
    }

    #[test]
    fn test_regex_replace_supports_group_refs() {
        let (lua, _) = make_lua(CapabilityFlags::none());
        let out: String = lua
            .load(r#"return regex.replace('john smith', '(\\w+) (\\w+)', '$2 $1')"#)
            .eval()
            .unwrap();
        assert_eq!(out, "smith john");
    }

    #[test]
    fn test_regex_invalid_pattern_raises() {
        let (lua, _) = make_lua(CapabilityFlags::none());
        assert!(lua.load("regex.test('x', '(')").exec().is_err());
        let ok: bool = lua.load("return regex.test('abc', '^a')").eval().unwrap();
        assert!(ok);
    }

    #[test]
    fn test_json_roundtrip_and_errors() {
        let (lua, _) = make_lua(CapabilityFlags::none());
        let text: String = lua
            .load(r#"return JSON.stringify(JSON.parse('{"a":[1,2],"b":null}'))"#)
            .eval()
            .unwrap();
        assert_eq!(text, r#"{"a":[1,2],"b":null}"#);

        assert!(lua.load("JSON.parse('{oops')").exec().is_err());
    }

    #[test]
    fn test_notify_never_raises() {
        let (lua, host) = make_lua(CapabilityFlags::none());
        lua.load("notify.success('done', 'Title'); notify.error(42)")
            .exec()
            .unwrap();

        let notes = host.notifications();
        assert_eq!(notes.len(), 2);
        assert_eq!(
            notes[0],
            (NotifyLevel::Success, "done".to_string(), Some("Title".to_string()))
        );
        assert_eq!(notes[1], (NotifyLevel::Error, "42".to_string(), None));
    }

    #[test]
    fn test_capabilities_has_reports_flags() {
        let flags = CapabilityFlags::none().with(Capability::Fetch, true);
        let (lua, _) = make_lua(flags);

        let (fetch, timers, bogus): (bool, bool, bool) = lua
            .load(
                "return capabilities.has('fetch'), capabilities.has('timers'), capabilities.has('nope')",
            )
            .eval()
            .unwrap();
        assert!(fetch);
        assert!(!timers);
        assert!(!bogus);

        let list: String = lua
            .load("return table.concat(capabilities.list(), ',')")
            .eval()
            .unwrap();
        assert_eq!(list, "fetch");
    }

    #[tokio::test]
    async fn test_dispatch_event_runs_listeners_in_order() {
        let (lua, _) = make_lua(CapabilityFlags::none());
        lua.load(
            r#"
            seen = {}
            events.on("tick", function(n) table.insert(seen, "a" .. n) end)
            events.on("tick", function() error("listener broke") end)
            events.on("tick", function(n) table.insert(seen, "b" .. n) end)
        "#,
        )
        .exec()
        .unwrap();

        let dispatch: LuaFunction = lua.globals().get("dispatch_event").unwrap();
        let count: usize = dispatch.call_async(("tick", 7)).await.unwrap();
        assert_eq!(count, 3);

        let seen: String = lua.load("table.concat(seen, ',')").eval().unwrap();
        assert_eq!(seen, "a7,b7");
    }

    #[test]
    fn test_hosttype() {
        let (lua, _) = make_lua(CapabilityFlags::none());
        let tags: String = lua
            .load(
                "return table.concat({hosttype(nil), hosttype('x'), hosttype({}), hosttype(hosttype)}, ',')",
            )
            .eval()
            .unwrap();
        assert_eq!(tags, "undefined,string,object,function");
    }
}
