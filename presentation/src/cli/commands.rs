//! CLI command definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for luaext
#[derive(Parser, Debug)]
#[command(name = "luaext")]
#[command(author, version, about = "Run Lua scripts against a capability-gated host")]
#[command(long_about = r#"
luaext embeds a Lua 5.4 runtime and exposes a curated set of host
capabilities to it. Timers, storage, fetch and DOM access are only
available once their setting is switched on.

Configuration files are loaded from (in priority order):
1. --config <path>     Explicit config file
2. ./luaext.toml       Project-level config
3. ~/.config/luaext/config.toml   Global config

Example:
  luaext lua-run "return 1 + 1"
  luaext lua-run --json --data '{"who":"world"}' "return 'hello ' .. data.who"
  luaext scripts add greet --code "return 'hi ' .. (args[1] or '')"
  luaext lua-script --script greet friend
  luaext settings set enableTimers true
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run a snippet of Lua code
    #[command(visible_alias = "lua")]
    LuaRun {
        /// Lua source to run
        code: String,

        #[command(flatten)]
        input: InputArgs,
    },

    /// Run a saved user script
    #[command(visible_alias = "luascript")]
    LuaScript {
        /// Name of the script (must match exactly one script)
        #[arg(long, value_name = "NAME")]
        script: Option<String>,

        /// Position of the script in the script list
        #[arg(long, value_name = "ID")]
        script_id: Option<usize>,

        #[command(flatten)]
        input: InputArgs,
    },

    /// Manage saved user scripts
    #[command(subcommand)]
    Scripts(ScriptsCommand),

    /// Read or change extension settings
    #[command(subcommand)]
    Settings(SettingsCommand),

    /// Tear the runtime down and build it again with the current settings
    Reload,

    /// Emit an event on the host bus
    Emit {
        /// Event name
        event: String,

        /// Payload values, parsed as JSON and falling back to plain strings
        payload: Vec<String>,
    },
}

/// Context handed to a run as `data` and `args`.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct InputArgs {
    /// Value exposed to the script as `data`
    #[arg(long, value_name = "DATA")]
    pub data: Option<String>,

    /// Decode --data as JSON before passing it in
    #[arg(long)]
    pub json: bool,

    /// Positional arguments exposed as `args`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ScriptsCommand {
    /// List saved scripts with their ids
    List,

    /// Save a new script
    Add {
        /// Script name
        name: String,

        /// Inline source
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        code: Option<String>,

        /// Read the source from a file
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,
    },

    /// Replace the code of a saved script
    Update {
        #[command(flatten)]
        selector: ScriptSelector,

        /// Inline source
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        code: Option<String>,

        /// Read the source from a file
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,
    },

    /// Delete a saved script
    Remove {
        #[command(flatten)]
        selector: ScriptSelector,
    },

    /// Print the source of a saved script
    Show {
        #[command(flatten)]
        selector: ScriptSelector,
    },
}

/// Names a saved script by name or by id.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptSelector {
    /// Script name
    pub name: Option<String>,

    /// Script id
    #[arg(long, value_name = "ID")]
    pub index: Option<usize>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum SettingsCommand {
    /// Print one setting as JSON
    Get { key: String },

    /// Change one setting; VALUE is parsed as JSON, falling back to a string
    Set { key: String, value: String },

    /// Print the capability toggles and script settings
    List,
}
