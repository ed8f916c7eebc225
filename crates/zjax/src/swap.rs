//! Swap-Spec Parser
//!
//! Parses `z-swap` handler text into a request descriptor:
//!
//! ```text
//! [METHOD] [endpoint] [response[|responseMode]->]target[|swapMode][, ...]
//! ```
//!
//! Method and endpoint may appear in either order, or not at all.

use serde::Serialize;
use zjax_dom::{DomTree, NodeId};
use zjax_net::Method;

use crate::{Result, ZjaxError};

/// How much of the response node is used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    #[default]
    Outer,
    Inner,
}

impl ResponseMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "outer" => Some(ResponseMode::Outer),
            "inner" => Some(ResponseMode::Inner),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseMode::Outer => "outer",
            ResponseMode::Inner => "inner",
        }
    }
}

/// Insertion strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SwapMode {
    #[default]
    Outer,
    Inner,
    Before,
    After,
    Prepend,
    Append,
    None,
    Delete,
}

impl SwapMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "outer" => Some(SwapMode::Outer),
            "inner" => Some(SwapMode::Inner),
            "before" => Some(SwapMode::Before),
            "after" => Some(SwapMode::After),
            "prepend" => Some(SwapMode::Prepend),
            "append" => Some(SwapMode::Append),
            "none" => Some(SwapMode::None),
            "delete" => Some(SwapMode::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SwapMode::Outer => "outer",
            SwapMode::Inner => "inner",
            SwapMode::Before => "before",
            SwapMode::After => "after",
            SwapMode::Prepend => "prepend",
            SwapMode::Append => "append",
            SwapMode::None => "none",
            SwapMode::Delete => "delete",
        }
    }

    /// Whether a missing response node is acceptable
    pub fn response_optional(&self) -> bool {
        matches!(self, SwapMode::None | SwapMode::Delete)
    }
}

/// Wildcard selector
pub const WILDCARD: &str = "*";

/// One swap operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwapOp {
    /// Selector into the response document, or `*`
    pub response: String,
    pub response_mode: ResponseMode,
    /// Selector into the live document, or `*` for `<body>`
    pub target: String,
    pub swap_mode: SwapMode,
}

impl SwapOp {
    /// Parse `[response[|responseMode]->]target[|swapMode]`
    pub fn parse(spec: &str) -> Result<Self> {
        let segments: Vec<&str> = spec.split("->").collect();
        if segments.len() > 2 {
            return Err(ZjaxError::grammar(format!("Too many '->' in swap '{}'", spec.trim())));
        }

        let (target, swap_mode) = split_pipe(segments[segments.len() - 1]);
        let (response, response_mode) = if segments.len() == 2 {
            split_pipe(segments[0])
        } else {
            (target, None)
        };
        if target.is_empty() || response.is_empty() {
            return Err(ZjaxError::grammar(format!("Missing selector in swap '{}'", spec.trim())));
        }

        let response_mode = match response_mode {
            Some(mode) => ResponseMode::parse(mode)
                .ok_or_else(|| ZjaxError::grammar(format!("Invalid response type: {}", mode)))?,
            None => ResponseMode::Outer,
        };
        let swap_mode = match swap_mode {
            Some(mode) => {
                SwapMode::parse(mode).ok_or_else(|| ZjaxError::grammar(format!("Invalid swap type: {}", mode)))?
            }
            None => SwapMode::Outer,
        };

        if response == WILDCARD && response_mode != ResponseMode::Outer {
            return Err(ZjaxError::grammar("Wild card \"*\" can not be piped to a Response Type"));
        }
        if target == WILDCARD && swap_mode != SwapMode::Outer {
            return Err(ZjaxError::grammar("Wild card \"*\" can not be piped to a Swap Type"));
        }

        Ok(Self {
            response: response.to_string(),
            response_mode,
            target: target.to_string(),
            swap_mode,
        })
    }
}

impl std::fmt::Display for SwapOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}|{}->{}|{}",
            self.response,
            self.response_mode.as_str(),
            self.target,
            self.swap_mode.as_str()
        )
    }
}

fn split_pipe(segment: &str) -> (&str, Option<&str>) {
    match segment.split_once('|') {
        Some((selector, mode)) => (selector.trim(), Some(mode.trim())),
        None => (segment.trim(), None),
    }
}

/// Parse a comma-separated swap list
pub fn parse_swap_list(text: &str) -> Result<Vec<SwapOp>> {
    if text.trim().is_empty() {
        return Err(ZjaxError::grammar("No swap specified"));
    }
    text.split(',').map(SwapOp::parse).collect()
}

/// Explicit parts of a `z-swap` handler, before defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapParts {
    pub method: Option<Method>,
    pub endpoint: Option<String>,
    pub swaps: Vec<SwapOp>,
}

impl SwapParts {
    pub fn parse(handler_text: &str) -> Result<Self> {
        let collapsed = collapse_commas(handler_text);
        let tokens: Vec<&str> = collapsed.split_whitespace().collect();
        if tokens.is_empty() || tokens.len() > 4 {
            return Err(ZjaxError::grammar("Must have between 1 and 4 parts separated by spaces."));
        }

        let mut method = None;
        let mut endpoint = None;
        let mut leftover = Vec::new();
        for token in tokens {
            if let Some(m) = Method::parse(token) {
                if method.replace(m).is_some() {
                    return Err(ZjaxError::grammar(format!("Duplicate HTTP method: {}", token)));
                }
            } else if is_endpoint(token) {
                if endpoint.replace(token.to_string()).is_some() {
                    return Err(ZjaxError::grammar(format!("Duplicate endpoint: {}", token)));
                }
            } else {
                leftover.push(token);
            }
        }

        Ok(Self {
            method,
            endpoint,
            swaps: parse_swap_list(&leftover.join(" "))?,
        })
    }
}

/// `.`, or starts with `/`, `./`, `http://` or `https://`
pub fn is_endpoint(token: &str) -> bool {
    token == "."
        || token.starts_with('/')
        || token.starts_with("./")
        || token.starts_with("http://")
        || token.starts_with("https://")
}

/// Remove whitespace on either side of every comma
fn collapse_commas(text: &str) -> String {
    text.split(',').map(str::trim).collect::<Vec<_>>().join(",")
}

/// Request descriptor for one `z-swap` trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwapRequest {
    pub method: Method,
    /// As written (or inferred); resolved against the page at dispatch
    pub endpoint: String,
    pub swaps: Vec<SwapOp>,
}

impl SwapRequest {
    /// Parse handler text declared on `node`, filling defaults from the element
    pub fn parse(handler_text: &str, tree: &DomTree, node: NodeId) -> Result<Self> {
        let parts = SwapParts::parse(handler_text)?;
        let tag = tree.tag_name(node).unwrap_or("");

        let method = match parts.method {
            Some(method) => method,
            None if tag == "form" => tree
                .get_attribute(node, "method")
                .and_then(Method::parse)
                .unwrap_or(Method::Post),
            None => Method::Get,
        };

        let endpoint = match parts.endpoint {
            Some(endpoint) => endpoint,
            None => match tag {
                "form" => tree
                    .get_attribute(node, "action")
                    .filter(|a| !a.trim().is_empty())
                    .unwrap_or(".")
                    .to_string(),
                "a" => tree
                    .get_attribute(node, "href")
                    .map(str::to_string)
                    .ok_or_else(|| ZjaxError::grammar("No endpoint inferrable or specified"))?,
                _ => return Err(ZjaxError::grammar("No endpoint inferrable or specified")),
            },
        };

        Ok(Self {
            method,
            endpoint,
            swaps: parts.swaps,
        })
    }
}
