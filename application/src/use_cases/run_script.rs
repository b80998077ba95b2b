//! Execution adapter
//!
//! Runs an ad-hoc snippet or a named user script in the live runtime with
//! a `{data, args}` context, and marshals the result into plain text:
//! nil becomes `""`, tables become JSON, scalars print as-is.

use super::lifecycle::{LifecycleError, RuntimeLifecycle};
use super::user_scripts::{ScriptLookupError, ScriptRef, UserScriptRepository};
use luaext_domain::ExecutionContext;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Data handed to a script as `data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptData {
    /// Passed through as a string.
    Raw(String),
    /// Decoded as JSON before the call.
    Json(String),
}

impl ScriptData {
    pub fn new(data: String, json: bool) -> Self {
        if json {
            Self::Json(data)
        } else {
            Self::Raw(data)
        }
    }

    fn into_value(self) -> Result<JsonValue, ExecutionError> {
        match self {
            Self::Raw(s) => Ok(JsonValue::String(s)),
            Self::Json(s) => serde_json::from_str(&s).map_err(|e| ExecutionError::InvalidData {
                data: s.clone(),
                message: e.to_string(),
            }),
        }
    }
}

/// Input to one execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunInput {
    pub data: Option<ScriptData>,
    pub args: Vec<String>,
}

impl RunInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(mut self, data: ScriptData) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    fn into_context(self) -> Result<ExecutionContext, ExecutionError> {
        let mut context = ExecutionContext::new().with_args(self.args);
        if let Some(data) = self.data {
            context = context.with_data(data.into_value()?);
        }
        Ok(context)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("Script not found: {0}")]
    ScriptNotFound(String),

    #[error("Script name {name} matches {count} scripts; select it by id")]
    AmbiguousScript { name: String, count: usize },

    #[error("{0}")]
    InvalidSelector(String),

    #[error("Error parsing data as json: {message} for data: {data}")]
    InvalidData { data: String, message: String },

    #[error("Error executing {target}: {message}")]
    Script { target: String, message: String },

    #[error(transparent)]
    Lifecycle(LifecycleError),
}

impl From<ScriptLookupError> for ExecutionError {
    fn from(e: ScriptLookupError) -> Self {
        match e {
            ScriptLookupError::NotFound(name) => Self::ScriptNotFound(name),
            ScriptLookupError::IndexOutOfRange { index, .. } => {
                Self::ScriptNotFound(format!("id {}", index))
            }
            ScriptLookupError::Ambiguous { name, count } => Self::AmbiguousScript { name, count },
            other => Self::InvalidSelector(other.to_string()),
        }
    }
}

pub struct ExecutionAdapter {
    lifecycle: Arc<RuntimeLifecycle>,
    scripts: UserScriptRepository,
}

impl ExecutionAdapter {
    pub fn new(lifecycle: Arc<RuntimeLifecycle>, scripts: UserScriptRepository) -> Self {
        Self { lifecycle, scripts }
    }

    /// Run an ad-hoc snippet.
    pub async fn run_code(&self, source: &str, input: RunInput) -> Result<String, ExecutionError> {
        let context = input.into_context()?;
        self.run(source, "=lua-run", &context, "lua code".to_string())
            .await
    }

    /// Run a persisted user script by name or id.
    pub async fn run_script(
        &self,
        script: &ScriptRef,
        input: RunInput,
    ) -> Result<String, ExecutionError> {
        let (index, script) = self.scripts.find(script)?;
        let context = input.into_context()?;
        debug!(index, name = %script.name, "Running user script");
        let chunk_name = format!("=script:{}", script.name);
        self.run(
            &script.code,
            &chunk_name,
            &context,
            format!("script {}", script.name),
        )
        .await
    }

    async fn run(
        &self,
        source: &str,
        chunk_name: &str,
        context: &ExecutionContext,
        target: String,
    ) -> Result<String, ExecutionError> {
        match self.lifecycle.execute(source, chunk_name, context).await {
            Ok(value) => Ok(value.into_output()),
            Err(LifecycleError::Script(e)) => Err(ExecutionError::Script {
                target,
                message: e.to_string(),
            }),
            Err(e) => Err(ExecutionError::Lifecycle(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::host::HostFacade;
    use crate::testing::{FakeFactory, MapResources, MockHost};
    use crate::use_cases::load_modules::ModuleLoader;
    use luaext_domain::{LoadBatch, UserScript};
    use serde_json::json;

    async fn adapter(scripts: &[(&str, &str)]) -> ExecutionAdapter {
        let host = Arc::new(MockHost::new());
        let list: Vec<_> = scripts
            .iter()
            .map(|(n, c)| UserScript::new(*n, *c))
            .collect();
        host.set_user_scripts(&list);

        let lifecycle = Arc::new(RuntimeLifecycle::new(
            host.clone(),
            Arc::new(FakeFactory::new()),
            ModuleLoader::new(Arc::new(MapResources::new(Vec::<(String, String)>::new()))),
            LoadBatch::default(),
        ));
        lifecycle.init().await.unwrap();
        ExecutionAdapter::new(lifecycle, UserScriptRepository::new(host))
    }

    #[tokio::test]
    async fn test_run_code_passes_context() {
        let adapter = adapter(&[]).await;
        let input = RunInput::new()
            .with_data(ScriptData::new(r#"{"n": 2}"#.into(), true))
            .with_args(vec!["x".into()]);

        let output = adapter.run_code("return data", input).await.unwrap();

        let echoed: JsonValue = serde_json::from_str(&output).unwrap();
        assert_eq!(echoed["data"], json!({"n": 2}));
        assert_eq!(echoed["args"], json!(["x"]));
    }

    #[tokio::test]
    async fn test_raw_data_is_passed_as_string() {
        let adapter = adapter(&[]).await;
        let input = RunInput::new().with_data(ScriptData::new("{not json".into(), false));

        let output = adapter.run_code("return data", input).await.unwrap();

        let echoed: JsonValue = serde_json::from_str(&output).unwrap();
        assert_eq!(echoed["data"], json!("{not json"));
    }

    #[tokio::test]
    async fn test_invalid_json_data_is_rejected() {
        let adapter = adapter(&[]).await;
        let input = RunInput::new().with_data(ScriptData::new("{not json".into(), true));

        let err = adapter.run_code("return 1", input).await.unwrap_err();

        assert!(matches!(err, ExecutionError::InvalidData { .. }));
    }

    #[tokio::test]
    async fn test_nil_result_is_empty_string() {
        let adapter = adapter(&[]).await;
        assert_eq!(
            adapter.run_code("return nil", RunInput::new()).await.unwrap(),
            ""
        );
    }

    #[tokio::test]
    async fn test_code_failure_names_lua_code() {
        let adapter = adapter(&[]).await;
        let err = adapter
            .run_code("error('x')", RunInput::new())
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Error executing lua code: "));
    }

    #[tokio::test]
    async fn test_run_script_by_name_and_index() {
        let adapter = adapter(&[("first", "return 1"), ("second", "return 2")]).await;

        let by_name = adapter
            .run_script(&ScriptRef::Name("second".into()), RunInput::new())
            .await
            .unwrap();
        let by_index = adapter
            .run_script(&ScriptRef::Index(1), RunInput::new())
            .await
            .unwrap();

        assert_eq!(by_name, by_index);
        assert!(by_name.contains("return 2"));
    }

    #[tokio::test]
    async fn test_run_script_failure_names_script() {
        let adapter = adapter(&[("broken", "error('x')")]).await;
        let err = adapter
            .run_script(&ScriptRef::Index(0), RunInput::new())
            .await
            .unwrap_err();
        match err {
            ExecutionError::Script { target, .. } => assert_eq!(target, "script broken"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_script() {
        let adapter = adapter(&[("a", "return 1"), ("a", "return 2")]).await;
        assert_eq!(
            adapter
                .run_script(&ScriptRef::Name("b".into()), RunInput::new())
                .await
                .unwrap_err(),
            ExecutionError::ScriptNotFound("b".into())
        );
        assert!(matches!(
            adapter
                .run_script(&ScriptRef::Name("a".into()), RunInput::new())
                .await
                .unwrap_err(),
            ExecutionError::AmbiguousScript { count: 2, .. }
        ));
    }
}
