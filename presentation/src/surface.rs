//! Command surface
//!
//! Maps parsed CLI commands onto the application use cases. Every command
//! produces either printable text or one descriptive error.

use crate::cli::commands::{Command, InputArgs, ScriptSelector, ScriptsCommand, SettingsCommand};
use crate::output::console::ConsoleFormatter;
use luaext_application::{
    ENABLE_GLOBAL_SCRIPTS, ExecutionAdapter, ExecutionError, GLOBAL_SCRIPTS, HostFacade,
    LifecycleError, RunInput, RuntimeLifecycle, ScriptData, ScriptLookupError, ScriptRef,
    UserScriptRepository,
};
use luaext_domain::{Capability, HostEvent, UserScript};
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Publishes an event on the host bus; returns how many subscribers got it.
pub type EventEmitter = Box<dyn Fn(HostEvent) -> usize + Send + Sync>;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Lookup(#[from] ScriptLookupError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("failed to read {}: {message}", path.display())]
    ReadSource { path: PathBuf, message: String },

    #[error("this host has no event bus to emit on")]
    NoEventBus,
}

pub struct CommandSurface {
    host: Arc<dyn HostFacade>,
    lifecycle: Arc<RuntimeLifecycle>,
    adapter: ExecutionAdapter,
    scripts: UserScriptRepository,
    emitter: Option<EventEmitter>,
}

impl CommandSurface {
    pub fn new(host: Arc<dyn HostFacade>, lifecycle: Arc<RuntimeLifecycle>) -> Self {
        let adapter = ExecutionAdapter::new(
            lifecycle.clone(),
            UserScriptRepository::new(host.clone()),
        );
        Self {
            scripts: UserScriptRepository::new(host.clone()),
            host,
            lifecycle,
            adapter,
            emitter: None,
        }
    }

    pub fn with_emitter(mut self, emitter: EventEmitter) -> Self {
        self.emitter = Some(emitter);
        self
    }

    /// Run one command and return what should be printed.
    pub async fn run(&self, command: Command) -> Result<String, CommandError> {
        match command {
            Command::LuaRun { code, input } => {
                self.lifecycle.init().await?;
                Ok(self.adapter.run_code(&code, run_input(input)).await?)
            }
            Command::LuaScript {
                script,
                script_id,
                input,
            } => {
                let script = ScriptRef::from_selectors(script, script_id)?;
                self.lifecycle.init().await?;
                Ok(self.adapter.run_script(&script, run_input(input)).await?)
            }
            Command::Scripts(command) => self.scripts(command),
            Command::Settings(command) => Ok(self.settings(command)),
            Command::Reload => {
                self.lifecycle.reload().await?;
                Ok("Lua runtime reloaded.".to_string())
            }
            Command::Emit { event, payload } => {
                let emitter = self.emitter.as_ref().ok_or(CommandError::NoEventBus)?;
                self.lifecycle.init().await?;
                let event = payload
                    .iter()
                    .fold(HostEvent::new(event), |acc, raw| acc.with_arg(parse_loose(raw)));
                let delivered = emitter(event);
                Ok(format!("Delivered to {} subscriber(s).", delivered))
            }
        }
    }

    fn scripts(&self, command: ScriptsCommand) -> Result<String, CommandError> {
        match command {
            ScriptsCommand::List => Ok(ConsoleFormatter::script_list(&self.scripts.list())),
            ScriptsCommand::Add { name, code, file } => {
                let code = script_source(code, file.as_deref())?;
                let index = self.scripts.add(UserScript::new(name.clone(), code));
                Ok(format!("Saved script {} as id {}.", name, index))
            }
            ScriptsCommand::Update {
                selector,
                code,
                file,
            } => {
                let script = selector_ref(selector)?;
                let code = script_source(code, file.as_deref())?;
                let index = self.scripts.update(&script, code)?;
                Ok(format!("Updated script id {}.", index))
            }
            ScriptsCommand::Remove { selector } => {
                let removed = self.scripts.remove(&selector_ref(selector)?)?;
                Ok(format!("Removed script {}.", removed.name))
            }
            ScriptsCommand::Show { selector } => {
                let (index, script) = self.scripts.find(&selector_ref(selector)?)?;
                Ok(ConsoleFormatter::script_detail(index, &script))
            }
        }
    }

    fn settings(&self, command: SettingsCommand) -> String {
        match command {
            SettingsCommand::Get { key } => self
                .host
                .get_setting(&key)
                .map(|value| value.to_string())
                .unwrap_or_default(),
            SettingsCommand::Set { key, value } => {
                self.host.set_setting(&key, parse_loose(&value));
                match key.parse::<Capability>() {
                    Ok(capability) => ConsoleFormatter::reload_hint(capability),
                    Err(_) => String::new(),
                }
            }
            SettingsCommand::List => {
                let keys = Capability::ALL
                    .iter()
                    .map(|c| c.setting_key())
                    .chain([ENABLE_GLOBAL_SCRIPTS, GLOBAL_SCRIPTS]);
                let entries: Vec<_> = keys
                    .map(|key| (key.to_string(), self.host.get_setting(key)))
                    .collect();
                ConsoleFormatter::settings(&entries)
            }
        }
    }
}

fn run_input(input: InputArgs) -> RunInput {
    let mut run = RunInput::new().with_args(input.args);
    if let Some(data) = input.data {
        run = run.with_data(ScriptData::new(data, input.json));
    }
    run
}

fn selector_ref(selector: ScriptSelector) -> Result<ScriptRef, ScriptLookupError> {
    ScriptRef::from_selectors(selector.name, selector.index)
}

fn script_source(code: Option<String>, file: Option<&Path>) -> Result<String, CommandError> {
    match (code, file) {
        (Some(code), _) => Ok(code),
        (None, Some(path)) => {
            std::fs::read_to_string(path).map_err(|e| CommandError::ReadSource {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
        }
        (None, None) => Ok(String::new()),
    }
}

/// JSON when it parses, otherwise the raw text as a string.
pub fn parse_loose(raw: &str) -> JsonValue {
    serde_json::from_str(raw).unwrap_or_else(|_| JsonValue::String(raw.to_string()))
}
