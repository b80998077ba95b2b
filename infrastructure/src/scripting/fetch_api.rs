//! `fetch` global (`enableFetch`).
//!
//! ```lua
//! local data = fetch("https://example.com/api", {
//!     method = "POST",
//!     headers = { Authorization = "Bearer ..." },
//!     body = { query = "x" },          -- tables are sent as JSON
//! })
//! if data == nil then notify.warning("request failed") end
//! ```
//!
//! Only `application/json` (decoded) and `text/html` (as text) responses
//! reach the script. Everything else, including non-2xx statuses and
//! transport errors, yields `nil`.

use luaext_application::{FetchRequest, FetchResponse, HostFacade};
use mlua::prelude::*;
use std::sync::Arc;
use tracing::warn;

use super::convert::{display_value, json_to_lua, lua_to_json};

/// What a response turns into on the Lua side.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchBody {
    Json(serde_json::Value),
    Html(String),
}

/// Decide what, if anything, a script gets to see of `response`.
pub fn accept_response(response: &FetchResponse) -> Result<FetchBody, String> {
    if !response.is_success() {
        return Err(format!("status {}", response.status));
    }
    let content_type = response
        .content_type
        .as_deref()
        .unwrap_or("")
        .to_ascii_lowercase();
    if content_type.contains("application/json") {
        serde_json::from_slice(&response.body)
            .map(FetchBody::Json)
            .map_err(|e| format!("invalid JSON body: {}", e))
    } else if content_type.contains("text/html") {
        Ok(FetchBody::Html(
            String::from_utf8_lossy(&response.body).into_owned(),
        ))
    } else {
        Err(format!("unsupported response type: {}", content_type))
    }
}

fn build_request(lua: &Lua, url: String, options: Option<LuaTable>) -> LuaResult<FetchRequest> {
    let mut request = FetchRequest::get(url);
    let Some(options) = options else {
        return Ok(request);
    };

    if let Some(method) = options.get::<Option<String>>("method")? {
        request.method = method.to_uppercase();
    }
    if let Some(headers) = options.get::<Option<LuaTable>>("headers")? {
        for pair in headers.pairs::<LuaValue, LuaValue>() {
            let (name, value) = pair?;
            request
                .headers
                .push((display_value(&name), display_value(&value)));
        }
    }
    match options.get::<LuaValue>("body")? {
        LuaValue::Nil => {}
        LuaValue::String(s) => request.body = Some(s.to_string_lossy().to_string()),
        LuaValue::Table(t) => {
            let json = lua_to_json(lua, LuaValue::Table(t))?;
            request.body = Some(json.to_string());
            if !request
                .headers
                .iter()
                .any(|(k, _)| k.eq_ignore_ascii_case("content-type"))
            {
                request
                    .headers
                    .push(("Content-Type".to_string(), "application/json".to_string()));
            }
        }
        other => request.body = Some(display_value(&other)),
    }
    Ok(request)
}

pub fn register_fetch_api(
    lua: &Lua,
    globals: &LuaTable,
    host: Arc<dyn HostFacade>,
) -> LuaResult<()> {
    let fetch_fn = lua.create_async_function(
        move |lua, (url, options): (String, Option<LuaTable>)| {
            let host = Arc::clone(&host);
            async move {
                let request = build_request(&lua, url.clone(), options)?;
                let response = match host.fetch(request).await {
                    Ok(response) => response,
                    Err(e) => {
                        warn!(url = %url, "Error fetching url: {}", e);
                        return Ok(LuaValue::Nil);
                    }
                };
                match accept_response(&response) {
                    Ok(FetchBody::Json(json)) => json_to_lua(&lua, &json),
                    Ok(FetchBody::Html(text)) => Ok(LuaValue::String(lua.create_string(&text)?)),
                    Err(reason) => {
                        warn!(url = %url, "Discarding fetch response: {}", reason);
                        Ok(LuaValue::Nil)
                    }
                }
            }
        },
    )?;
    globals.set("fetch", fetch_fn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingHost;
    use serde_json::json;

    fn response(status: u16, content_type: &str, body: &str) -> FetchResponse {
        FetchResponse {
            status,
            content_type: Some(content_type.to_string()),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_accept_response_filters_content() {
        assert_eq!(
            accept_response(&response(200, "application/json; charset=utf-8", r#"{"a":1}"#)),
            Ok(FetchBody::Json(json!({"a": 1})))
        );
        assert_eq!(
            accept_response(&response(200, "text/html", "<p>hi</p>")),
            Ok(FetchBody::Html("<p>hi</p>".into()))
        );
        assert!(accept_response(&response(200, "image/png", "")).is_err());
    }

    #[test]
    fn test_accept_response_ignores_content_type_case() {
        assert_eq!(
            accept_response(&response(200, "Application/JSON; charset=UTF-8", "[1]")),
            Ok(FetchBody::Json(json!([1])))
        );
        assert_eq!(
            accept_response(&response(200, "TEXT/HTML", "<b>x</b>")),
            Ok(FetchBody::Html("<b>x</b>".into()))
        );
    }

    #[test]
    fn test_accept_response_rejects_failures() {
        assert!(accept_response(&response(404, "application/json", "{}")).is_err());
        assert!(accept_response(&response(200, "application/json", "{oops")).is_err());
    }

    #[tokio::test]
    async fn test_fetch_decodes_json_and_sends_table_bodies() {
        let lua = Lua::new();
        let host = Arc::new(RecordingHost::new());
        host.respond_with(response(200, "application/json", r#"{"n":5}"#));
        register_fetch_api(&lua, &lua.globals(), host.clone()).unwrap();

        let n: i64 = lua
            .load(r#"return fetch("https://x.test/api", { method = "post", body = { q = 1 } }).n"#)
            .eval_async()
            .await
            .unwrap();
        assert_eq!(n, 5);

        let request = host.last_request().unwrap();
        assert_eq!(request.method, "POST");
        assert_eq!(request.body.as_deref(), Some(r#"{"q":1}"#));
        assert!(
            request
                .headers
                .contains(&("Content-Type".to_string(), "application/json".to_string()))
        );
    }

    #[tokio::test]
    async fn test_fetch_failures_yield_nil() {
        let lua = Lua::new();
        let host = Arc::new(RecordingHost::new());
        host.respond_with(response(500, "application/json", "{}"));
        register_fetch_api(&lua, &lua.globals(), host.clone()).unwrap();

        let value: LuaValue = lua
            .load(r#"return fetch("https://x.test/")"#)
            .eval_async()
            .await
            .unwrap();
        assert_eq!(value, LuaValue::Nil);
    }
}
