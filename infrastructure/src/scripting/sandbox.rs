//! Lua sandbox — a VM without host I/O.
//!
//! Scripts are user-authored but run inside a host that gates dangerous
//! operations behind capability flags, so the VM itself must not offer a
//! way around them: no `io`, `os` or `debug`, no C modules, no loading
//! Lua files from disk.

use mlua::prelude::*;
use mlua::{LuaOptions, StdLib};

/// Standard libraries available to scripts. The base library is always loaded.
fn allowed_libs() -> StdLib {
    StdLib::TABLE
        | StdLib::STRING
        | StdLib::MATH
        | StdLib::UTF8
        | StdLib::COROUTINE
        | StdLib::PACKAGE
}

/// Create a fresh sandboxed VM.
pub fn create_sandboxed_vm() -> LuaResult<Lua> {
    let lua = Lua::new_with(allowed_libs(), LuaOptions::default())?;
    apply_sandbox(&lua)?;
    Ok(lua)
}

/// Apply sandbox restrictions to the Lua VM.
///
/// Blocks:
/// - `package.loadlib` and `package.cpath`: no C extension modules
/// - `package.path`, `dofile`, `loadfile`: no Lua sources from disk
///
/// `require` keeps working for modules registered in `package.loaded`.
pub fn apply_sandbox(lua: &Lua) -> LuaResult<()> {
    lua.load(
        r#"
        package.loadlib = nil
        package.cpath = ''
        package.path = ''
        dofile = nil
        loadfile = nil
    "#,
    )
    .set_name("=sandbox")
    .exec()
}
