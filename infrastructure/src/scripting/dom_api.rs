//! `Document` global (`enableDomManipulation`).
//!
//! ```lua
//! local root = Document.findElement("#extensions_settings")
//! local btn = Document.createElement("button", { class = "menu_button" }, "Run")
//! Document.appendChild(root, btn)
//! Document.addEventListener(btn, "click", function(ev) notify.info(ev.type) end)
//! Document.modifyElement(btn, { style = Document.createStyle({ color = "red" }) })
//! ```
//!
//! Attribute keys, attribute values and text content are HTML-escaped
//! before they reach the host.

use luaext_application::{DocumentPort, DomEvent, DomListener, ElementId};
use mlua::prelude::*;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::warn;

use super::call_gate::CallGate;
use super::convert::display_value;

/// Lua-side handle of a host element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementHandle(pub ElementId);

type ElementRef = LuaUserDataRef<ElementHandle>;

impl LuaUserData for ElementHandle {
    fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("id", |_, this| Ok(this.0));
    }

    fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| {
            Ok(format!("Element({})", this.0))
        });
        methods.add_meta_method(
            LuaMetaMethod::Eq,
            |_, this, other: ElementRef| Ok(this.0 == other.0),
        );
    }
}

/// Escape `& < > " '` for inclusion in markup.
pub fn sanitize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            other => out.push(other),
        }
    }
    out
}

/// `"k: v;"` pairs joined by spaces, keys sorted.
pub fn create_style(pairs: Vec<(String, String)>) -> String {
    let mut pairs = pairs;
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    pairs
        .iter()
        .map(|(k, v)| format!("{}: {};", k, v))
        .collect::<Vec<_>>()
        .join(" ")
}

fn valid_tag(tag: &str) -> bool {
    !tag.is_empty() && tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

fn host_error(e: impl std::fmt::Display) -> LuaError {
    LuaError::external(e.to_string())
}

fn apply(
    document: &dyn DocumentPort,
    element: ElementId,
    attributes: Option<LuaTable>,
    text: Option<LuaValue>,
) -> LuaResult<()> {
    if let Some(attributes) = attributes {
        for pair in attributes.pairs::<LuaValue, LuaValue>() {
            let (key, value) = pair?;
            document
                .set_attribute(
                    element,
                    &sanitize(&display_value(&key)),
                    &sanitize(&display_value(&value)),
                )
                .map_err(host_error)?;
        }
    }
    match text {
        None | Some(LuaValue::Nil) => {}
        Some(text) => document
            .set_text_content(element, &sanitize(&display_value(&text)))
            .map_err(host_error)?,
    }
    Ok(())
}

pub fn register_dom_api(
    lua: &Lua,
    globals: &LuaTable,
    document: Arc<dyn DocumentPort>,
    gate: CallGate,
    handle: Handle,
) -> LuaResult<()> {
    let dom = lua.create_table()?;

    // Document.findElement(selector) -> element; raises when nothing matches
    {
        let document = Arc::clone(&document);
        let find_fn = lua.create_function(move |_, selector: String| {
            document
                .query_selector(&selector)
                .map(ElementHandle)
                .ok_or_else(|| LuaError::external(format!("Element not found: {}", selector)))
        })?;
        dom.set("findElement", find_fn)?;
    }

    // Document.createElement(tag, attrs?, text?) -> element
    {
        let document = Arc::clone(&document);
        let create_fn = lua.create_function(
            move |_, (tag, attributes, text): (String, Option<LuaTable>, Option<LuaValue>)| {
                if !valid_tag(&tag) {
                    return Err(LuaError::external(format!("invalid tag name: {}", tag)));
                }
                let element = document.create_element(&tag);
                apply(document.as_ref(), element, attributes, text)?;
                Ok(ElementHandle(element))
            },
        )?;
        dom.set("createElement", create_fn)?;
    }

    // Document.modifyElement(el, attrs?, text?)
    {
        let document = Arc::clone(&document);
        let modify_fn = lua.create_function(
            move |_, (el, attributes, text): (ElementRef, Option<LuaTable>, Option<LuaValue>)| {
                apply(document.as_ref(), el.0, attributes, text)
            },
        )?;
        dom.set("modifyElement", modify_fn)?;
    }

    // Document.appendChild(parent, child)
    {
        let document = Arc::clone(&document);
        let append_fn = lua.create_function(
            move |_, (parent, child): (ElementRef, ElementRef)| {
                document.append_child(parent.0, child.0).map_err(host_error)
            },
        )?;
        dom.set("appendChild", append_fn)?;
    }

    // Document.addEventListener(el, event, fn)
    {
        let document = Arc::clone(&document);
        let listen_fn = lua.create_function(
            move |lua, (element, event, callback): (ElementRef, String, LuaFunction)| {
                let key = Arc::new(lua.create_registry_value(callback)?);
                let gate = gate.clone();
                let handle = handle.clone();
                let listener: DomListener = Arc::new(move |event: DomEvent| {
                    let gate = gate.clone();
                    let key = Arc::clone(&key);
                    handle.spawn(async move {
                        let Ok(lua) = gate.enter().await else {
                            return;
                        };
                        let result = async {
                            let callback: LuaFunction = lua.registry_value(&key)?;
                            let payload = lua.create_table()?;
                            payload.set("type", event.event.as_str())?;
                            payload.set("target", ElementHandle(event.target))?;
                            callback.call_async::<()>(payload).await
                        }
                        .await;
                        if let Err(e) = result {
                            warn!("DOM listener failed: {}", e);
                        }
                    });
                });
                document
                    .add_event_listener(element.0, &event, listener)
                    .map_err(host_error)
            },
        )?;
        dom.set("addEventListener", listen_fn)?;
    }

    // Document.createStyle({ color = "red" }) -> "color: red;"
    dom.set(
        "createStyle",
        lua.create_function(|_, css: LuaTable| {
            let pairs = css
                .pairs::<LuaValue, LuaValue>()
                .map(|pair| pair.map(|(k, v)| (display_value(&k), display_value(&v))))
                .collect::<LuaResult<Vec<_>>>()?;
            Ok(create_style(pairs))
        })?,
    )?;

    globals.set("Document", dom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::document::MemoryDocument;
    use std::time::Duration;

    fn make_gate(document: Arc<MemoryDocument>) -> CallGate {
        let lua = Lua::new();
        let gate = CallGate::new();
        register_dom_api(
            &lua,
            &lua.globals(),
            document,
            gate.clone(),
            Handle::current(),
        )
        .unwrap();
        gate.open(lua).unwrap();
        gate
    }

    #[test]
    fn test_sanitize_escapes_markup() {
        assert_eq!(
            sanitize(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#039;&amp;&#039;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_create_style_sorts_keys() {
        let style = create_style(vec![
            ("width".into(), "10px".into()),
            ("color".into(), "red".into()),
        ]);
        assert_eq!(style, "color: red; width: 10px;");
    }

    #[tokio::test]
    async fn test_create_and_modify_escape_content() {
        let document = Arc::new(MemoryDocument::new());
        let gate = make_gate(document.clone());

        let id: u64 = {
            let lua = gate.enter().await.unwrap();
            lua.load(
                r#"
                local el = Document.createElement("div", { title = "<b>" }, "a & b")
                Document.modifyElement(el, { ["data-x"] = "'q'" })
                Document.appendChild(Document.findElement("body"), el)
                return el.id
            "#,
            )
            .eval()
            .unwrap()
        };

        let element = document.element(id).unwrap();
        assert_eq!(element.attributes.get("title").unwrap(), "&lt;b&gt;");
        assert_eq!(element.attributes.get("data-x").unwrap(), "&#039;q&#039;");
        assert_eq!(element.text, "a &amp; b");
        assert_eq!(document.query_selector("div"), Some(id));
    }

    #[tokio::test]
    async fn test_find_element_raises_when_missing() {
        let document = Arc::new(MemoryDocument::new());
        let gate = make_gate(document);
        let lua = gate.enter().await.unwrap();
        let err = lua
            .load("Document.findElement('#nope')")
            .exec()
            .unwrap_err();
        assert!(err.to_string().contains("Element not found"));
    }

    #[tokio::test]
    async fn test_listener_runs_through_gate() {
        let document = Arc::new(MemoryDocument::new());
        let gate = make_gate(document.clone());

        let id: u64 = {
            let lua = gate.enter().await.unwrap();
            lua.load(
                r#"
                clicked = nil
                local el = Document.createElement("button")
                Document.addEventListener(el, "click", function(ev)
                    clicked = ev.type .. ":" .. tostring(ev.target.id)
                end)
                return el.id
            "#,
            )
            .eval()
            .unwrap()
        };

        assert_eq!(document.dispatch(id, "click"), 1);

        let mut clicked = None;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(5)).await;
            let lua = gate.enter().await.unwrap();
            clicked = lua.globals().get::<Option<String>>("clicked").unwrap();
            if clicked.is_some() {
                break;
            }
        }
        assert_eq!(clicked, Some(format!("click:{}", id)));
    }
}
