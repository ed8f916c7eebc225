//! Directive Grammar Parser
//!
//! Splits a `z-swap` / `z-action` attribute value into statements. A new
//! statement starts at a comma followed by optional whitespace and `@`, so
//! commas inside handler text survive:
//!
//! ```text
//! @click.once GET /a #a, @[keydown.enter, change] POST /b #b
//! ```

use zjax_dom::NodeId;

use crate::trigger::{Trigger, resolve_triggers};
use crate::{Result, ZjaxError};

/// One `(trigger-list, handler)` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Raw trigger list with `@`, brackets and whitespace stripped; empty
    /// when the statement names no trigger
    pub triggers: String,
    /// Trimmed handler text
    pub handler: String,
}

/// Split an attribute value into statements
pub fn parse_statements(value: &str) -> Result<Vec<Statement>> {
    split_statements(value).into_iter().map(parse_statement).collect()
}

/// Parse an attribute value into triggers for `node`
pub fn parse_triggers(value: &str, tag_name: &str, node: NodeId) -> Result<Vec<Trigger>> {
    let mut triggers = Vec::new();
    for statement in parse_statements(value)? {
        if statement.triggers.is_empty() {
            triggers.push(Trigger::default_for(tag_name, node, &statement.handler));
        } else {
            triggers.extend(resolve_triggers(&statement.triggers, node, &statement.handler)?);
        }
    }
    Ok(triggers)
}

fn split_statements(value: &str) -> Vec<&str> {
    let mut statements = Vec::new();
    let mut start = 0;
    for (i, c) in value.char_indices() {
        if c == ',' && value[i + 1..].trim_start().starts_with('@') {
            statements.push(&value[start..i]);
            start = i + 1;
        }
    }
    statements.push(&value[start..]);
    statements
}

fn parse_statement(statement: &str) -> Result<Statement> {
    let statement = statement.trim_start();
    let Some(rest) = statement.strip_prefix('@') else {
        return Ok(Statement {
            triggers: String::new(),
            handler: statement.trim().to_string(),
        });
    };

    let (raw, handler) = if let Some(list) = rest.strip_prefix('[') {
        let end = list
            .find(']')
            .ok_or_else(|| ZjaxError::grammar(format!("Unterminated trigger list in '{}'", statement)))?;
        (&list[..end], &list[end + 1..])
    } else {
        let end = rest
            .find(|c: char| !is_trigger_char(c))
            .unwrap_or(rest.len());
        (&rest[..end], &rest[end..])
    };

    let triggers: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if triggers.is_empty() {
        return Err(ZjaxError::grammar(format!("Empty trigger in '{}'", statement)));
    }

    Ok(Statement {
        triggers,
        handler: handler.trim().to_string(),
    })
}

fn is_trigger_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')
}
