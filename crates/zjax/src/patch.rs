//! DOM Patch Engine
//!
//! Executes one [`SwapOp`] against the live document:
//!
//! 1. resolve the target (live) and source (response) nodes
//! 2. carry client attributes onto response elements sharing an `id`
//! 3. flatten the response into an ordered node list
//! 4. import and insert the nodes with the op's strategy
//!
//! All four steps run in one synchronous call. [`settle`] completes the
//! attribute handoff later, once the swap has painted.

use zjax_dom::{Attribute, Document, DomTree, NodeId};

use crate::swap::{ResponseMode, SwapMode, SwapOp, WILDCARD};
use crate::{Result, ZjaxError};

/// Attributes never carried across a swap or restored at settle
pub const PROTECTED_ATTRIBUTES: &[&str] = &["id", "z-swap", "z-action", "z-confirm", "z-active", "z-validate"];

/// Class present on a target while its swap is in flight
pub const SWAPPING_CLASS: &str = "zjax-swapping";

/// Host hook for wrapping a DOM update in a view transition
pub trait ViewTransitions {
    /// Run `update` inside a transition
    ///
    /// A host that never calls `update` still gets the mutation applied
    /// once `start` returns.
    fn start(&self, update: &mut dyn FnMut());
}

/// Response attributes held back until settle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreservedAttributes {
    pub id: String,
    pub attributes: Vec<Attribute>,
}

/// What one patch did to the live document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchResult {
    /// Live target, if one was resolved
    pub target: Option<NodeId>,
    /// Top-level nodes inserted into the live tree, in order
    pub inserted: Vec<NodeId>,
    pub preserved: Vec<PreservedAttributes>,
}

fn is_protected(name: &str) -> bool {
    PROTECTED_ATTRIBUTES.contains(&name)
}

/// Apply `op`, moving nodes from `response` into `live`
pub fn patch(
    live: &mut Document,
    response: &mut Document,
    op: &SwapOp,
    transitions: Option<&dyn ViewTransitions>,
) -> Result<PatchResult> {
    let (target, source) = resolve_nodes(live, response, op)?;
    let mut result = PatchResult {
        target,
        ..Default::default()
    };

    let Some(target) = target else {
        return Ok(result);
    };
    match op.swap_mode {
        SwapMode::None => return Ok(result),
        SwapMode::Delete => {
            live.tree_mut().detach(target);
            return Ok(result);
        }
        _ => {}
    }

    live.tree_mut().add_class(target, SWAPPING_CLASS)?;

    let Some(source) = source else {
        return Ok(result);
    };
    result.preserved = preserve_attributes(live.tree(), target, response.tree_mut(), source);

    let nodes = normalize_response(response, source, op.response_mode);
    let mut imported = Vec::with_capacity(nodes.len());
    for node in nodes {
        imported.push(live.tree_mut().import_node(response.tree(), node)?);
    }

    let mut outcome = None;
    {
        let mut update = || {
            if outcome.is_none() {
                outcome = Some(apply_strategy(live.tree_mut(), target, &imported, op.swap_mode));
            }
        };
        match transitions {
            Some(host) => host.start(&mut update),
            None => update(),
        }
    }
    match outcome {
        Some(applied) => applied?,
        None => apply_strategy(live.tree_mut(), target, &imported, op.swap_mode)?,
    }

    result.inserted = imported;
    Ok(result)
}

/// Locate the live target and the response source for `op`
fn resolve_nodes(live: &Document, response: &Document, op: &SwapOp) -> Result<(Option<NodeId>, Option<NodeId>)> {
    let target = if op.target == WILDCARD {
        Some(live.body().ok_or_else(|| {
            ZjaxError::resolution("Unable to find body element in local DOM to swap into")
        })?)
    } else {
        live.tree().query_selector(NodeId::ROOT, &op.target)?
    };

    let source = if op.response == WILDCARD {
        Some(NodeId::ROOT)
    } else {
        response.tree().query_selector(NodeId::ROOT, &op.response)?
    };

    if target.is_none() && op.swap_mode != SwapMode::None {
        return Err(ZjaxError::resolution(format!(
            "Target node '{}' does not exist in local DOM",
            op.target
        )));
    }
    if source.is_none() && !op.swap_mode.response_optional() {
        return Err(ZjaxError::resolution(format!(
            "Source node {} does not exist in response DOM",
            op.response
        )));
    }
    Ok((target, source))
}

/// Give response elements the client's attributes for every shared `id`
///
/// Returns what the response originally specified, first occurrence per id.
fn preserve_attributes(
    live: &DomTree,
    target: NodeId,
    response: &mut DomTree,
    source: NodeId,
) -> Vec<PreservedAttributes> {
    let mut preserved: Vec<PreservedAttributes> = Vec::new();

    for live_node in std::iter::once(target).chain(live.descendants(target)) {
        let Some(id) = live.element(live_node).and_then(|e| e.id()) else {
            continue;
        };
        if preserved.iter().any(|p| p.id == id) {
            continue;
        }
        let Some(response_node) = response.find_by_id(source, id) else {
            continue;
        };

        let original: Vec<Attribute> = response
            .attributes(response_node)
            .iter()
            .filter(|a| !is_protected(&a.name))
            .cloned()
            .collect();
        let Some(element) = response.element_mut(response_node) else {
            continue;
        };
        for attr in &original {
            element.remove_attr(&attr.name);
        }
        for attr in live.attributes(live_node).iter().filter(|a| !is_protected(&a.name)) {
            element.set_attr(&attr.name, &attr.value);
        }

        preserved.push(PreservedAttributes {
            id: id.to_string(),
            attributes: original,
        });
    }
    preserved
}

/// Flatten the response source into the nodes to insert
fn normalize_response(response: &Document, source: NodeId, mode: ResponseMode) -> Vec<NodeId> {
    let tree = response.tree();
    if source == NodeId::ROOT {
        let container = response.document_element().unwrap_or(NodeId::ROOT);
        return tree.children(container).collect();
    }
    match mode {
        ResponseMode::Outer => vec![source],
        ResponseMode::Inner => tree.children(source).collect(),
    }
}

fn parent_of(tree: &DomTree, target: NodeId) -> Result<NodeId> {
    tree.parent(target)
        .ok_or_else(|| ZjaxError::resolution(format!("Target node {} has no parent", tree.pretty_name(target))))
}

fn apply_strategy(tree: &mut DomTree, target: NodeId, nodes: &[NodeId], mode: SwapMode) -> Result<()> {
    match mode {
        SwapMode::Outer => {
            let parent = parent_of(tree, target)?;
            for &node in nodes {
                tree.insert_before(parent, node, Some(target))?;
            }
            tree.detach(target);
        }
        SwapMode::Inner => {
            tree.set_text_content(target, "")?;
            for &node in nodes {
                tree.append_child(target, node)?;
            }
        }
        SwapMode::Before => {
            let parent = parent_of(tree, target)?;
            for &node in nodes {
                tree.insert_before(parent, node, Some(target))?;
            }
        }
        SwapMode::After => {
            let parent = parent_of(tree, target)?;
            let mut reference = target;
            for &node in nodes {
                tree.insert_after(parent, node, reference)?;
                reference = node;
            }
        }
        SwapMode::Prepend => {
            let first = tree.first_child(target);
            for &node in nodes {
                tree.insert_before(target, node, first)?;
            }
        }
        SwapMode::Append => {
            for &node in nodes {
                tree.append_child(target, node)?;
            }
        }
        SwapMode::Delete => tree.detach(target),
        SwapMode::None => {}
    }
    Ok(())
}

/// Second half of the attribute handoff
///
/// Every preserved id found inside a still-connected inserted subtree gets
/// the response's original attributes back. The swapping class is dropped
/// from a target that is still in the document.
pub fn settle(live: &mut Document, result: &PatchResult) -> Result<()> {
    let tree = live.tree_mut();

    for preserved in &result.preserved {
        let found = result
            .inserted
            .iter()
            .filter(|&&root| tree.is_connected(root))
            .find_map(|&root| tree.find_by_id(root, &preserved.id));
        let Some(node) = found else {
            continue;
        };
        let current: Vec<String> = tree
            .attributes(node)
            .iter()
            .filter(|a| !is_protected(&a.name))
            .map(|a| a.name.clone())
            .collect();
        for name in current {
            tree.remove_attribute(node, &name);
        }
        for attr in &preserved.attributes {
            tree.set_attribute(node, &attr.name, &attr.value)?;
        }
    }

    if let Some(target) = result.target.filter(|&t| tree.is_connected(t)) {
        tree.remove_class(target, SWAPPING_CLASS)?;
    }
    Ok(())
}
