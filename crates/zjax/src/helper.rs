//! Request-scoped helper
//!
//! Handed to action functions, inline handlers and error handlers. It is a
//! capability object over the page: the declaring node, the triggering
//! event, selector lookups, navigation and (for error handlers) the raw
//! HTTP response.
//!
//! Document borrows returned by [`Helper::document`] and
//! [`Helper::document_mut`] must be dropped before calling another helper
//! method that touches the document.

use std::cell::{Ref, RefMut};
use std::rc::Rc;

use serde_json::Value;
use url::Url;
use zjax_dom::{Document, NodeId};
use zjax_net::Response;

use crate::event::Event;
use crate::page::PageInner;
use crate::{Result, ZjaxError};

/// Request-scoped helper
#[derive(Clone)]
pub struct Helper {
    page: Rc<PageInner>,
    node: NodeId,
    event: Option<Event>,
    response: Option<Response>,
    namespace: Option<String>,
}

impl Helper {
    pub(crate) fn new(page: Rc<PageInner>, node: NodeId) -> Self {
        Self {
            page,
            node,
            event: None,
            response: None,
            namespace: None,
        }
    }

    pub(crate) fn with_event(mut self, event: Event) -> Self {
        self.event = Some(event);
        self
    }

    pub(crate) fn with_response(mut self, response: Response) -> Self {
        self.response = Some(response);
        self
    }

    /// Same helper, bound to an action namespace
    pub(crate) fn in_namespace(&self, namespace: Option<String>) -> Self {
        Self {
            namespace,
            ..self.clone()
        }
    }

    /// The node that declared the directive
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// `helper()` / `helper(selector)`: the declaring node, or the first
    /// match for `selector`
    pub fn call(&self, selector: Option<&str>) -> Result<NodeId> {
        match selector {
            None => Ok(self.node),
            Some(selector) => self.select(selector),
        }
    }

    /// First element matching `selector`; an error when nothing matches
    pub fn select(&self, selector: &str) -> Result<NodeId> {
        let doc = self.page.document.borrow();
        doc.tree()
            .query_selector(NodeId::ROOT, selector)?
            .ok_or_else(|| ZjaxError::action(format!("$('{}') did not match any elements in the DOM.", selector)))
    }

    /// Every element matching `selector`, in document order
    pub fn all(&self, selector: &str) -> Result<Vec<NodeId>> {
        let doc = self.page.document.borrow();
        Ok(doc.tree().query_selector_all(NodeId::ROOT, selector)?)
    }

    /// The triggering event
    pub fn event(&self) -> Option<&Event> {
        self.event.as_ref()
    }

    /// The raw response; only set for error handlers
    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    /// Namespace of the action being invoked
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Current page location
    pub fn location(&self) -> String {
        self.page.document.borrow().url().to_string()
    }

    /// Navigate the page to `url`, resolved against the current location
    pub fn redirect(&self, url: &str) -> Result<()> {
        let location = self.location();
        let target = Url::parse(&location)
            .and_then(|base| base.join(url))
            .map_err(|e| ZjaxError::action(format!("Invalid redirect URL '{}': {}", url, e)))?;
        tracing::info!("Redirecting to {}", target);
        self.page.document.borrow_mut().set_url(target.as_str());
        Ok(())
    }

    /// Invoke another registered action, looked up first in this helper's
    /// namespace and then at the top level
    pub fn invoke(&self, name: &str) -> Result<Value> {
        let registry = self.page.config.action_registry();
        let action = self
            .namespace
            .as_ref()
            .and_then(|ns| registry.get(&format!("{}.{}", ns, name)))
            .or_else(|| registry.get(name))
            .cloned()
            .ok_or_else(|| ZjaxError::ActionResolution(format!("Unknown action: {}", name)))?;
        action.call(self)
    }

    pub fn document(&self) -> Ref<'_, Document> {
        self.page.document.borrow()
    }

    pub fn document_mut(&self) -> RefMut<'_, Document> {
        self.page.document.borrow_mut()
    }

    /// Pretty name of the declaring node, e.g. `<button#save>`
    pub fn pretty_name(&self) -> String {
        self.document().tree().pretty_name(self.node)
    }
}

impl std::fmt::Debug for Helper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Helper")
            .field("node", &self.node)
            .field("event", &self.event.as_ref().map(|e| e.kind.as_str()))
            .field("status", &self.response.as_ref().map(|r| r.status))
            .field("namespace", &self.namespace)
            .finish()
    }
}
