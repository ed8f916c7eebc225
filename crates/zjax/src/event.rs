//! Events
//!
//! Host events delivered to listeners: DOM input events dispatched by the
//! embedder, synthetic `mount` events and the `zjax:*` lifecycle events.

use serde_json::Value;
use zjax_dom::{DomTree, NodeId};

/// Where a listener is attached / where an event is dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTarget {
    Node(NodeId),
    Document,
    Window,
}

impl EventTarget {
    /// Node id for node targets
    pub fn node(&self) -> Option<NodeId> {
        match self {
            EventTarget::Node(id) => Some(*id),
            _ => None,
        }
    }
}

/// Event kinds that do not bubble
const NON_BUBBLING: &[&str] = &["focus", "blur", "mouseenter", "mouseleave", "load", "mount"];

/// Whether events of `kind` bubble by default
pub fn bubbles(kind: &str) -> bool {
    !(NON_BUBBLING.contains(&kind) || kind.starts_with("zjax:"))
}

/// Event
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Lowercase event name, e.g. `click`
    pub kind: String,
    pub target: EventTarget,
    /// Node the event is about, for events dispatched elsewhere
    pub related_node: Option<NodeId>,
    /// `KeyboardEvent.key` value
    pub key: Option<String>,
    pub shift_key: bool,
    pub ctrl_key: bool,
    pub alt_key: bool,
    pub meta_key: bool,
    pub detail: Value,
    pub bubbles: bool,
}

impl Event {
    pub fn new(kind: &str, target: EventTarget) -> Self {
        let kind = kind.to_ascii_lowercase();
        Self {
            bubbles: bubbles(&kind),
            kind,
            target,
            related_node: None,
            key: None,
            shift_key: false,
            ctrl_key: false,
            alt_key: false,
            meta_key: false,
            detail: Value::Null,
        }
    }

    /// Create click event on a node
    pub fn click(node: NodeId) -> Self {
        Self::new("click", EventTarget::Node(node))
    }

    /// Create keydown event on a node
    pub fn keydown(node: NodeId, key: &str) -> Self {
        Self::new("keydown", EventTarget::Node(node)).with_key(key)
    }

    /// Create submit event on a form
    pub fn submit(form: NodeId) -> Self {
        Self::new("submit", EventTarget::Node(form))
    }

    /// Custom event carrying a JSON detail
    pub fn custom(kind: &str, target: EventTarget, detail: Value) -> Self {
        Self::new(kind, target).with_detail(detail)
    }

    pub fn with_key(mut self, key: &str) -> Self {
        self.key = Some(key.to_string());
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift_key = true;
        self
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl_key = true;
        self
    }

    pub fn with_alt(mut self) -> Self {
        self.alt_key = true;
        self
    }

    pub fn with_meta(mut self) -> Self {
        self.meta_key = true;
        self
    }

    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = detail;
        self
    }

    pub fn with_related_node(mut self, node: NodeId) -> Self {
        self.related_node = Some(node);
        self
    }

    /// Override the default bubbling behavior
    pub fn with_bubbles(mut self, bubbles: bool) -> Self {
        self.bubbles = bubbles;
        self
    }

    /// Targets visited by this event, innermost first
    ///
    /// A detached node's path stops at its detached root.
    pub fn propagation_path(&self, tree: &DomTree) -> Vec<EventTarget> {
        if !self.bubbles {
            return vec![self.target];
        }
        let mut path = Vec::new();
        match self.target {
            EventTarget::Node(node) => {
                let mut reached_document = false;
                for id in std::iter::once(node).chain(tree.ancestors(node)) {
                    if id == NodeId::ROOT {
                        reached_document = true;
                        break;
                    }
                    path.push(EventTarget::Node(id));
                }
                if reached_document {
                    path.push(EventTarget::Document);
                    path.push(EventTarget::Window);
                }
            }
            EventTarget::Document => {
                path.push(EventTarget::Document);
                path.push(EventTarget::Window);
            }
            EventTarget::Window => path.push(EventTarget::Window),
        }
        path
    }
}
