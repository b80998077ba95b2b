//! In-memory document model for hosts without a real presentation layer.
//!
//! Supports the selector subset scripts use in practice: `#id`, `.class`
//! and bare tag names. Only elements attached under the root are found.

use luaext_application::{DocumentPort, DomEvent, DomListener, ElementId, HostError};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Mutex;
use tracing::warn;

/// Read-only copy of one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSnapshot {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub text: String,
    pub children: Vec<ElementId>,
    pub parent: Option<ElementId>,
}

struct Node {
    element: ElementSnapshot,
    listeners: Vec<(String, DomListener)>,
}

struct Tree {
    next_id: ElementId,
    nodes: BTreeMap<ElementId, Node>,
}

impl Tree {
    fn insert(&mut self, tag: &str) -> ElementId {
        self.next_id += 1;
        let id = self.next_id;
        self.nodes.insert(
            id,
            Node {
                element: ElementSnapshot {
                    tag: tag.to_ascii_lowercase(),
                    attributes: BTreeMap::new(),
                    text: String::new(),
                    children: Vec::new(),
                    parent: None,
                },
                listeners: Vec::new(),
            },
        );
        id
    }

    fn node_mut(&mut self, id: ElementId) -> Result<&mut Node, HostError> {
        self.nodes
            .get_mut(&id)
            .ok_or_else(|| HostError::ElementNotFound(format!("element {}", id)))
    }

    fn is_ancestor(&self, ancestor: ElementId, mut id: ElementId) -> bool {
        loop {
            if id == ancestor {
                return true;
            }
            match self.nodes.get(&id).and_then(|n| n.element.parent) {
                Some(parent) => id = parent,
                None => return false,
            }
        }
    }
}

fn matches(element: &ElementSnapshot, selector: &str) -> bool {
    if let Some(id) = selector.strip_prefix('#') {
        element.attributes.get("id").is_some_and(|v| v == id)
    } else if let Some(class) = selector.strip_prefix('.') {
        element
            .attributes
            .get("class")
            .is_some_and(|v| v.split_whitespace().any(|c| c == class))
    } else {
        element.tag.eq_ignore_ascii_case(selector)
    }
}

pub struct MemoryDocument {
    root: ElementId,
    tree: Mutex<Tree>,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    /// A document holding a single `<body>` root.
    pub fn new() -> Self {
        let mut tree = Tree {
            next_id: 0,
            nodes: BTreeMap::new(),
        };
        let root = tree.insert("body");
        Self {
            root,
            tree: Mutex::new(tree),
        }
    }

    pub fn root(&self) -> ElementId {
        self.root
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tree> {
        self.tree.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn element(&self, id: ElementId) -> Option<ElementSnapshot> {
        self.lock().nodes.get(&id).map(|n| n.element.clone())
    }

    /// Fire `event` on `id`. Returns the number of listeners invoked.
    pub fn dispatch(&self, id: ElementId, event: &str) -> usize {
        let listeners: Vec<DomListener> = {
            let tree = self.lock();
            let Some(node) = tree.nodes.get(&id) else {
                warn!(element = id, "Dispatch to unknown element");
                return 0;
            };
            node.listeners
                .iter()
                .filter(|(name, _)| name == event)
                .map(|(_, listener)| listener.clone())
                .collect()
        };
        for listener in &listeners {
            listener(DomEvent {
                event: event.to_string(),
                target: id,
            });
        }
        listeners.len()
    }

    /// Markup of the subtree at `id`; attribute values and text are stored escaped.
    pub fn render(&self, id: ElementId) -> String {
        let tree = self.lock();
        let mut out = String::new();
        render_into(&tree, id, &mut out);
        out
    }
}

fn render_into(tree: &Tree, id: ElementId, out: &mut String) {
    let Some(node) = tree.nodes.get(&id) else {
        return;
    };
    let element = &node.element;
    let _ = write!(out, "<{}", element.tag);
    for (name, value) in &element.attributes {
        let _ = write!(out, " {}=\"{}\"", name, value);
    }
    out.push('>');
    out.push_str(&element.text);
    for child in &element.children {
        render_into(tree, *child, out);
    }
    let _ = write!(out, "</{}>", element.tag);
}

impl DocumentPort for MemoryDocument {
    fn query_selector(&self, selector: &str) -> Option<ElementId> {
        let selector = selector.trim();
        let tree = self.lock();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let Some(node) = tree.nodes.get(&id) else {
                continue;
            };
            if matches(&node.element, selector) {
                return Some(id);
            }
            stack.extend(node.element.children.iter().rev());
        }
        None
    }

    fn create_element(&self, tag: &str) -> ElementId {
        self.lock().insert(tag)
    }

    fn set_attribute(&self, element: ElementId, name: &str, value: &str) -> Result<(), HostError> {
        self.lock()
            .node_mut(element)?
            .element
            .attributes
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn set_text_content(&self, element: ElementId, text: &str) -> Result<(), HostError> {
        self.lock().node_mut(element)?.element.text = text.to_string();
        Ok(())
    }

    fn append_child(&self, parent: ElementId, child: ElementId) -> Result<(), HostError> {
        let mut tree = self.lock();
        tree.node_mut(parent)?;
        let old_parent = tree.node_mut(child)?.element.parent;
        if tree.is_ancestor(child, parent) {
            return Err(HostError::Unsupported(format!(
                "cannot append element {} inside itself",
                child
            )));
        }

        if let Some(old) = old_parent {
            tree.node_mut(old)?.element.children.retain(|c| *c != child);
        }
        tree.node_mut(parent)?.element.children.push(child);
        tree.node_mut(child)?.element.parent = Some(parent);
        Ok(())
    }

    fn add_event_listener(
        &self,
        element: ElementId,
        event: &str,
        listener: DomListener,
    ) -> Result<(), HostError> {
        self.lock()
            .node_mut(element)?
            .listeners
            .push((event.to_string(), listener));
        Ok(())
    }
}
