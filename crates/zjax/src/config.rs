//! Page configuration
//!
//! Built once before the page starts, then read-only. Scalar settings use
//! by-value `with_*` builders; registrations go through `actions`,
//! `on_error` and `catch_all`.

use std::collections::HashMap;
use std::time::Duration;

use crate::actions::{ActionFn, ActionRegistry};
use crate::Result;

/// Handler for a non-2xx swap response; `Helper::response` is set
pub type ErrorHandler = ActionFn;

/// Default delay before preserved attributes settle
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(20);

/// zjax configuration
#[derive(Clone)]
pub struct Config {
    debug: bool,
    transitions: bool,
    settle_delay: Duration,
    rescan_events: Vec<String>,
    actions: ActionRegistry,
    errors: HashMap<u16, ErrorHandler>,
    catch_all: Option<ErrorHandler>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            transitions: true,
            settle_delay: DEFAULT_SETTLE_DELAY,
            rescan_events: vec!["turbo:load".to_string()],
            actions: ActionRegistry::new(),
            errors: HashMap::new(),
            catch_all: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit progress diagnostics
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Wrap patches in view transitions when a host provides them
    pub fn with_transitions(mut self, transitions: bool) -> Self {
        self.transitions = transitions;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Events that clear every directive listener and rescan the document
    pub fn with_rescan_events<I, S>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rescan_events = events.into_iter().map(Into::into).collect();
        self
    }

    /// Builder form of [`Config::actions`]
    pub fn with_actions<I, S>(mut self, namespace: Option<&str>, handlers: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, ActionFn)>,
        S: AsRef<str>,
    {
        self.actions(namespace, handlers)?;
        Ok(self)
    }

    /// Register actions, optionally under a namespace
    pub fn actions<I, S>(&mut self, namespace: Option<&str>, handlers: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (S, ActionFn)>,
        S: AsRef<str>,
    {
        self.actions.register(namespace, handlers)?;
        Ok(self)
    }

    /// Handle responses with this status code
    pub fn on_error(&mut self, status: u16, handler: ErrorHandler) -> &mut Self {
        self.errors.insert(status, handler);
        self
    }

    /// Handle non-2xx responses without a status-specific handler
    pub fn catch_all(&mut self, handler: ErrorHandler) -> &mut Self {
        self.catch_all = Some(handler);
        self
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn transitions(&self) -> bool {
        self.transitions
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    pub fn rescan_events(&self) -> &[String] {
        &self.rescan_events
    }

    pub fn action_registry(&self) -> &ActionRegistry {
        &self.actions
    }

    /// Status handler, falling back to the catch-all
    pub fn error_handler(&self, status: u16) -> Option<&ErrorHandler> {
        self.errors.get(&status).or(self.catch_all.as_ref())
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut statuses: Vec<_> = self.errors.keys().collect();
        statuses.sort();
        f.debug_struct("Config")
            .field("debug", &self.debug)
            .field("transitions", &self.transitions)
            .field("settle_delay", &self.settle_delay)
            .field("rescan_events", &self.rescan_events)
            .field("actions", &self.actions.paths().collect::<Vec<_>>())
            .field("errors", &statuses)
            .field("catch_all", &self.catch_all.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::action;
    use serde_json::Value;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(!config.debug());
        assert!(config.transitions());
        assert_eq!(config.settle_delay(), Duration::from_millis(20));
        assert_eq!(config.rescan_events(), ["turbo:load".to_string()]);
        assert!(config.action_registry().is_empty());
    }

    #[test]
    fn test_builders() {
        let config = Config::new()
            .with_debug(true)
            .with_transitions(false)
            .with_settle_delay(Duration::ZERO)
            .with_rescan_events(["page:change", "turbo:load"]);
        assert!(config.debug());
        assert!(!config.transitions());
        assert_eq!(config.settle_delay(), Duration::ZERO);
        assert_eq!(config.rescan_events().len(), 2);
    }

    #[test]
    fn test_error_handler_fallback() {
        let mut config = Config::new();
        assert!(config.error_handler(404).is_none());

        config.catch_all(action(|_| Ok(Value::from("catch"))));
        config.on_error(404, action(|_| Ok(Value::from("404"))));
        assert!(config.error_handler(404).is_some());
        assert!(config.error_handler(500).is_some());
    }

    #[test]
    fn test_actions_registration() {
        let config = Config::new()
            .with_actions(Some("menu"), [("open", action(|_| Ok(Value::Null)))])
            .unwrap();
        assert!(config.action_registry().get("menu.open").is_some());

        let mut config = Config::new();
        assert!(config.actions(Some("zjax"), [("x", action(|_| Ok(Value::Null)))]).is_err());
    }
}
