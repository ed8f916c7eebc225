//! Directive scanning
//!
//! Finds `z-swap` and `z-action` elements under a root (inclusive), parses
//! each node's directive and binds its listeners. A node whose directive
//! fails to parse is logged and skipped; nothing is bound for it.

use std::rc::Rc;

use zjax_dom::NodeId;

use crate::actions::CompiledAction;
use crate::directive::parse_triggers;
use crate::listeners::{self, Handler, ListenerId};
use crate::page::PageInner;
use crate::pipeline;
use crate::swap::SwapRequest;
use crate::trigger::Trigger;
use crate::Result;

const Z_SWAP: &str = "z-swap";
const Z_ACTION: &str = "z-action";

/// Bind every directive under `root`; returns the number of listeners bound
pub(crate) fn scan(page: &Rc<PageInner>, root: NodeId) -> usize {
    if !page.document.borrow().tree().is_connected(root) {
        tracing::warn!("Not scanning detached node {}", pretty_name(page, root));
        return 0;
    }
    scan_directive(page, root, Z_SWAP, parse_swap) + scan_directive(page, root, Z_ACTION, parse_action)
}

/// Drop every directive listener, then scan the whole document
pub(crate) fn rescan(page: &Rc<PageInner>) -> usize {
    let cleared = page.listeners.borrow_mut().clear_directives();
    zdebug!(page, "Cleared {} directive listener(s)", cleared);
    scan(page, NodeId::ROOT)
}

type Parser = fn(&PageInner, NodeId, &str) -> Result<Vec<(Trigger, Handler)>>;

fn scan_directive(page: &Rc<PageInner>, root: NodeId, attribute: &str, parse: Parser) -> usize {
    let nodes = {
        let doc = page.document.borrow();
        doc.tree()
            .query_selector_all_inclusive(root, &format!("[{}]", attribute))
            .unwrap_or_default()
    };
    zdebug!(page, "Found {} {} nodes in {}", nodes.len(), attribute, pretty_name(page, root));

    let mut bound = 0;
    for node in nodes {
        let value = page
            .document
            .borrow()
            .tree()
            .get_attribute(node, attribute)
            .unwrap_or_default()
            .to_string();

        match parse(page, node, &value) {
            Ok(pairs) => {
                let ids = bind(page, pairs);
                zdebug!(page, "Added {} {} listener(s) to {}", ids.len(), attribute, pretty_name(page, node));
                bound += ids.len();
                listeners::mount(page, &ids);
            }
            Err(e) => tracing::error!("Unable to parse {}: {} on {}", attribute, e, pretty_name(page, node)),
        }
    }
    bound
}

fn bind(page: &PageInner, pairs: Vec<(Trigger, Handler)>) -> Vec<ListenerId> {
    let mut registry = page.listeners.borrow_mut();
    pairs
        .into_iter()
        .map(|(trigger, handler)| registry.bind(trigger, handler))
        .collect()
}

fn parse_swap(page: &PageInner, node: NodeId, value: &str) -> Result<Vec<(Trigger, Handler)>> {
    let doc = page.document.borrow();
    let tree = doc.tree();
    let tag = tree.tag_name(node).unwrap_or_default();

    parse_triggers(value, tag, node)?
        .into_iter()
        .map(|trigger| -> Result<(Trigger, Handler)> {
            let request = SwapRequest::parse(&trigger.handler_text, tree, node)?;
            Ok((trigger, pipeline::swap_handler(node, Rc::new(request))))
        })
        .collect()
}

fn parse_action(page: &PageInner, node: NodeId, value: &str) -> Result<Vec<(Trigger, Handler)>> {
    let tag = page.document.borrow().tree().tag_name(node).unwrap_or_default().to_string();

    parse_triggers(value, &tag, node)?
        .into_iter()
        .map(|trigger| -> Result<(Trigger, Handler)> {
            let action = CompiledAction::compile(&trigger.handler_text, page.config.action_registry())?;
            Ok((trigger, pipeline::action_handler(node, Rc::new(action))))
        })
        .collect()
}

pub(crate) fn pretty_name(page: &PageInner, node: NodeId) -> String {
    page.document.borrow().tree().pretty_name(node)
}
