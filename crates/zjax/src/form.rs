//! Form payloads
//!
//! Successful-control collection for the form enclosing a swap's node, and
//! the GET/DELETE query-string vs. urlencoded-body split.

use url::{Url, form_urlencoded};
use zjax_dom::{DomTree, NodeId};
use zjax_net::Method;

/// Input types that never contribute a value
const SKIPPED_INPUT_TYPES: &[&str] = &["submit", "button", "reset", "image", "file"];

/// Name/value pairs for a swap declared on `node`
///
/// Uses the nearest enclosing form (inclusive). Outside a form, a named
/// control contributes its own value.
pub fn collect_payload(tree: &DomTree, node: NodeId) -> Vec<(String, String)> {
    let form = std::iter::once(node)
        .chain(tree.ancestors(node))
        .find(|&n| tree.tag_name(n) == Some("form"));

    match form {
        Some(form) => tree
            .descendants(form)
            .filter(|&control| is_successful(tree, control))
            .flat_map(|control| control_values(tree, control))
            .collect(),
        None if is_control(tree, node) && tree.get_attribute(node, "name").is_some_and(|n| !n.is_empty()) => {
            control_values(tree, node)
        }
        None => Vec::new(),
    }
}

fn is_control(tree: &DomTree, node: NodeId) -> bool {
    matches!(tree.tag_name(node), Some("input" | "select" | "textarea" | "button"))
}

fn is_successful(tree: &DomTree, control: NodeId) -> bool {
    if !matches!(tree.tag_name(control), Some("input" | "select" | "textarea")) {
        return false;
    }
    if tree.get_attribute(control, "name").is_none_or(str::is_empty) || tree.has_attribute(control, "disabled") {
        return false;
    }
    if tree.tag_name(control) == Some("input") {
        let kind = input_type(tree, control);
        if SKIPPED_INPUT_TYPES.contains(&kind.as_str()) {
            return false;
        }
        if (kind == "checkbox" || kind == "radio") && !tree.has_attribute(control, "checked") {
            return false;
        }
    }
    true
}

fn input_type(tree: &DomTree, input: NodeId) -> String {
    tree.get_attribute(input, "type")
        .unwrap_or("text")
        .to_ascii_lowercase()
}

fn control_values(tree: &DomTree, control: NodeId) -> Vec<(String, String)> {
    let name = tree.get_attribute(control, "name").unwrap_or("").to_string();
    match tree.tag_name(control) {
        Some("select") => select_values(tree, control)
            .into_iter()
            .map(|value| (name.clone(), value))
            .collect(),
        Some("textarea") => vec![(name, tree.text_content(control))],
        Some("input") => {
            let kind = input_type(tree, control);
            let default = if kind == "checkbox" || kind == "radio" { "on" } else { "" };
            let value = tree.get_attribute(control, "value").unwrap_or(default);
            vec![(name, value.to_string())]
        }
        _ => vec![(name, tree.get_attribute(control, "value").unwrap_or("").to_string())],
    }
}

fn select_values(tree: &DomTree, select: NodeId) -> Vec<String> {
    let options: Vec<NodeId> = tree
        .descendants(select)
        .filter(|&n| tree.tag_name(n) == Some("option") && !tree.has_attribute(n, "disabled"))
        .collect();
    let selected: Vec<NodeId> = options
        .iter()
        .copied()
        .filter(|&o| tree.has_attribute(o, "selected"))
        .collect();

    let chosen = if !selected.is_empty() {
        if tree.has_attribute(select, "multiple") { selected } else { vec![selected[0]] }
    } else if tree.has_attribute(select, "multiple") {
        Vec::new()
    } else {
        options.into_iter().take(1).collect()
    };

    chosen
        .into_iter()
        .map(|o| match tree.get_attribute(o, "value") {
            Some(value) => value.to_string(),
            None => tree.text_content(o).trim().to_string(),
        })
        .collect()
}

/// `application/x-www-form-urlencoded` serialization
pub fn encode(pairs: &[(String, String)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

/// Place `pairs` for `method`: query string for GET/DELETE, body otherwise
///
/// Query pairs go after any existing query and before the fragment.
pub fn apply_payload(method: Method, url: &str, pairs: &[(String, String)]) -> (String, Option<Vec<u8>>) {
    if pairs.is_empty() {
        return (url.to_string(), None);
    }
    if !method.uses_query() {
        return (url.to_string(), Some(encode(pairs).into_bytes()));
    }
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.query_pairs_mut().extend_pairs(pairs);
            (parsed.into(), None)
        }
        Err(_) => {
            let (base, fragment) = match url.split_once('#') {
                Some((base, fragment)) => (base, Some(fragment)),
                None => (url, None),
            };
            let separator = if base.contains('?') { '&' } else { '?' };
            let mut out = format!("{}{}{}", base, separator, encode(pairs));
            if let Some(fragment) = fragment {
                out.push('#');
                out.push_str(fragment);
            }
            (out, None)
        }
    }
}
