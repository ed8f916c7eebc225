//! Action Dispatcher
//!
//! `z-action` handler text is either a dotted path into the action
//! registry or an inline script. The choice is made once, at bind time,
//! by a strict `identifier(.identifier)*` match.

use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::Value;

use crate::helper::Helper;
use crate::script::Script;
use crate::{Result, ZjaxError};

/// Registered action function
pub type ActionFn = Rc<dyn Fn(&Helper) -> Result<Value>>;

/// Wrap a closure as an `ActionFn`
pub fn action<F>(f: F) -> ActionFn
where
    F: Fn(&Helper) -> Result<Value> + 'static,
{
    Rc::new(f)
}

/// Namespace reserved for built-in actions
pub const RESERVED_NAMESPACE: &str = "zjax";

/// What a handler string refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerRef {
    /// Dotted path into the registry
    Named(Vec<String>),
    /// Inline script source
    Inline(String),
}

impl HandlerRef {
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        let segments: Vec<&str> = text.split('.').collect();
        if segments.iter().all(|s| is_identifier(s)) {
            HandlerRef::Named(segments.into_iter().map(str::to_string).collect())
        } else {
            HandlerRef::Inline(text.to_string())
        }
    }
}

/// `\w+`
fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A registered action and the namespace it belongs to
#[derive(Clone)]
pub struct Action {
    path: String,
    namespace: Option<String>,
    func: ActionFn,
}

impl Action {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Invoke with the helper bound to this action's namespace
    pub fn call(&self, helper: &Helper) -> Result<Value> {
        let helper = helper.in_namespace(self.namespace.clone());
        (self.func)(&helper)
    }
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action").field("path", &self.path).finish()
    }
}

/// Dotted path → action
#[derive(Debug, Clone, Default)]
pub struct ActionRegistry {
    actions: BTreeMap<String, Action>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handlers`, optionally under `namespace`
    ///
    /// Registering a namespace again replaces everything it held.
    /// Unnamespaced registrations merge into the top level.
    pub fn register<I, S>(&mut self, namespace: Option<&str>, handlers: I) -> Result<()>
    where
        I: IntoIterator<Item = (S, ActionFn)>,
        S: AsRef<str>,
    {
        if let Some(ns) = namespace {
            if ns == RESERVED_NAMESPACE {
                return Err(ZjaxError::Config(format!("'{}' is a reserved actions namespace", ns)));
            }
            if !is_identifier(ns) {
                return Err(ZjaxError::Config(format!("Invalid actions namespace: '{}'", ns)));
            }
        }

        let mut staged = Vec::new();
        for (name, func) in handlers {
            let name = name.as_ref();
            if !is_identifier(name) {
                return Err(ZjaxError::Config(format!("Invalid action name: '{}'", name)));
            }
            let path = match namespace {
                Some(ns) => format!("{}.{}", ns, name),
                None => name.to_string(),
            };
            staged.push(Action {
                path,
                namespace: namespace.map(str::to_string),
                func,
            });
        }

        if let Some(ns) = namespace {
            self.actions.retain(|_, action| action.namespace.as_deref() != Some(ns));
        }
        for action in staged {
            tracing::debug!("Registered action {}", action.path);
            self.actions.insert(action.path.clone(), action);
        }
        Ok(())
    }

    /// Resolve a dotted path
    pub fn lookup(&self, path: &[String]) -> Result<Action> {
        let key = path.join(".");
        self.actions
            .get(&key)
            .cloned()
            .ok_or_else(|| ZjaxError::ActionResolution(format!("Unknown action: {}", key)))
    }

    pub fn get(&self, path: &str) -> Option<&Action> {
        self.actions.get(path)
    }

    /// Registered paths, sorted
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// A resolved `z-action` handler
#[derive(Debug, Clone)]
pub enum CompiledAction {
    Registered(Action),
    Inline(Script),
}

impl CompiledAction {
    /// Resolve or compile handler text
    pub fn compile(text: &str, registry: &ActionRegistry) -> Result<Self> {
        match HandlerRef::parse(text) {
            HandlerRef::Named(path) => Ok(CompiledAction::Registered(registry.lookup(&path)?)),
            HandlerRef::Inline(source) => Script::compile(&source)
                .map(CompiledAction::Inline)
                .map_err(|e| ZjaxError::ActionResolution(format!("z-action value is invalid: {}", e))),
        }
    }

    pub fn invoke(&self, helper: &Helper) -> Result<Value> {
        match self {
            CompiledAction::Registered(action) => action.call(helper),
            CompiledAction::Inline(script) => script.run(helper),
        }
    }
}

/// JavaScript truthiness of a JSON value
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn noop() -> ActionFn {
        action(|_| Ok(Value::Null))
    }

    #[test]
    fn test_handler_ref() {
        assert_eq!(HandlerRef::parse("openPanel"), HandlerRef::Named(vec!["openPanel".into()]));
        assert_eq!(
            HandlerRef::parse(" books.close_panel "),
            HandlerRef::Named(vec!["books".into(), "close_panel".into()])
        );
        assert!(matches!(HandlerRef::parse("$().remove()"), HandlerRef::Inline(_)));
        assert!(matches!(HandlerRef::parse("books."), HandlerRef::Inline(_)));
        assert!(matches!(HandlerRef::parse("a b"), HandlerRef::Inline(_)));
        assert!(matches!(HandlerRef::parse("café"), HandlerRef::Inline(_)));
        assert!(matches!(HandlerRef::parse("books.Ωpen"), HandlerRef::Inline(_)));
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = ActionRegistry::new();
        registry.register(None, [("open", noop())]).unwrap();
        registry.register(Some("books"), [("close", noop()), ("open", noop())]).unwrap();

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.lookup(&["books".into(), "close".into()]).unwrap().namespace(), Some("books"));
        assert_eq!(registry.lookup(&["open".into()]).unwrap().namespace(), None);

        let err = registry.lookup(&["books".into(), "missing".into()]).unwrap_err();
        assert_eq!(err.to_string(), "Unknown action: books.missing");
    }

    #[test]
    fn test_namespace_replaced() {
        let mut registry = ActionRegistry::new();
        registry.register(Some("books"), [("a", noop()), ("b", noop())]).unwrap();
        registry.register(Some("books"), [("c", noop())]).unwrap();
        assert_eq!(registry.paths().collect::<Vec<_>>(), vec!["books.c"]);
    }

    #[test]
    fn test_reserved_namespace() {
        let mut registry = ActionRegistry::new();
        let err = registry.register(Some("zjax"), [("x", noop())]).unwrap_err();
        assert_eq!(err.to_string(), "'zjax' is a reserved actions namespace");
        assert!(registry.register(None, [("bad-name", noop())]).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_compile_errors() {
        let registry = ActionRegistry::new();
        let err = CompiledAction::compile("missing", &registry).unwrap_err();
        assert!(matches!(err, ZjaxError::ActionResolution(_)));

        let err = CompiledAction::compile("$().explode(", &registry).unwrap_err();
        assert!(err.to_string().starts_with("z-action value is invalid:"));
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!("ok")));
        assert!(is_truthy(&json!(1.5)));
        assert!(is_truthy(&json!([])));
        assert!(is_truthy(&json!({})));
    }
}
