//! Inline handlers
//!
//! A `z-action` value that is not an action name is a JavaScript function
//! body. It is compiled once with QuickJS as `function ($) { ... }` and
//! called with `$` bound to the request helper:
//!
//! ```text
//! $('#menu').classList.toggle('open'); return $().getAttribute('data-id')
//! ```
//!
//! `$()` is the declaring node, `$('sel')` the first match (throws when
//! nothing matches), `$.all('sel')` every match. `$.event`, `$.response`,
//! `$.location`, `$.redirect(url)` and `$.invoke(name)` mirror [`Helper`].
//! Elements are thin wrappers over node ids; every DOM call goes back
//! through the helper, so handlers see and edit the live page.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};

use rquickjs::{Context, Ctx, Function, Object, Persistent, Runtime, Value as JsValue};
use serde_json::{Map, Value, json};
use zjax_dom::{DomTree, NodeId};

use crate::event::Event;
use crate::helper::Helper;
use crate::{Result, ZjaxError};

/// QuickJS heap ceiling shared by all handlers on a thread
const MEMORY_LIMIT: usize = 32 * 1024 * 1024;
const STACK_LIMIT: usize = 512 * 1024;

/// Wall-clock budget for one handler call
const RUN_BUDGET: Duration = Duration::from_secs(1);

/// Builds `$` from the native bridge, the event and the response.
/// Also installs `console`, which forwards to `tracing`.
const PRELUDE: &str = r#"
(() => {
  "use strict";

  const log = globalThis.__zjax_log;
  delete globalThis.__zjax_log;

  const call = (native, name, ...args) => {
    const value = native[name](...args);
    const message = native.error();
    if (message != null) throw new Error(message);
    return value;
  };

  class ClassList {
    constructor(element) { this.element = element; }
    add(...names) { for (const name of names) this.element._call("addClass", String(name)); }
    remove(...names) { for (const name of names) this.element._call("removeClass", String(name)); }
    contains(name) { return this.element._call("hasClass", String(name)); }
    toggle(name, force) {
      const on = force === undefined ? !this.contains(name) : Boolean(force);
      this.element._call(on ? "addClass" : "removeClass", String(name));
      return on;
    }
  }

  class Element {
    constructor(native, node) { this.native = native; this.node = node; }
    _call(name, ...args) { return call(this.native, name, this.node, ...args); }
    _wrap(node) { return node < 0 ? null : new Element(this.native, node); }

    get id() { return this.getAttribute("id") ?? ""; }
    get tagName() { return this._call("tagName"); }
    get classList() { return new ClassList(this); }
    get parentElement() { return this._wrap(this._call("parent")); }

    getAttribute(name) { return this._call("getAttribute", String(name)) ?? null; }
    hasAttribute(name) { return this.getAttribute(name) !== null; }
    setAttribute(name, value) { this._call("setAttribute", String(name), String(value)); }
    removeAttribute(name) { this._call("removeAttribute", String(name)); }
    toggleAttribute(name, force) {
      const on = force === undefined ? !this.hasAttribute(name) : Boolean(force);
      if (!on) this.removeAttribute(name);
      else if (!this.hasAttribute(name)) this.setAttribute(name, "");
      return on;
    }

    get textContent() { return this._call("textContent"); }
    set textContent(text) { this._call("setTextContent", text == null ? "" : String(text)); }
    get value() { return this.getAttribute("value") ?? ""; }
    set value(value) { this.setAttribute("value", value); }

    querySelector(selector) { return this._wrap(this._call("query", String(selector))); }
    querySelectorAll(selector) { return this._call("queryAll", String(selector)).map((n) => this._wrap(n)); }
    closest(selector) { return this._wrap(this._call("closest", String(selector))); }
    remove() { this._call("remove"); }
    toJSON() { return this._call("prettyName"); }
  }

  const show = (value) => {
    if (typeof value === "string") return value;
    try {
      const json = JSON.stringify(value);
      return json === undefined ? String(value) : json;
    } catch (_) {
      return String(value);
    }
  };
  globalThis.console = Object.fromEntries(
    ["debug", "info", "log", "warn", "error"].map((level) => [
      level,
      (...args) => log(level, args.map(show).join(" ")),
    ]),
  );

  return (native, event, response) => {
    const element = (node) => (node < 0 ? null : new Element(native, node));
    const $ = function (...args) {
      if (args.length === 0) return element(call(native, "node"));
      if (args.length > 1) throw new Error("$() can be called with a maximum of one argument.");
      return element(call(native, "select", String(args[0])));
    };
    $.all = (selector) => call(native, "all", String(selector)).map(element);
    $.redirect = (url) => { call(native, "redirect", String(url)); };
    $.invoke = (name) => JSON.parse(call(native, "invoke", String(name)));
    Object.defineProperty($, "location", { get: () => call(native, "location") });

    if (event) {
      event.target = element(event.target);
      event.relatedNode = element(event.relatedNode);
    }
    if (response) {
      response.text = () => response.body;
    }
    $.event = event;
    $.response = response;
    return $;
  };
})()
"#;

/// Compile or engine failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ScriptError {
    pub message: String,
}

impl ScriptError {
    fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// One QuickJS runtime per thread, shared by every compiled handler
struct Engine {
    make_dollar: Persistent<Function<'static>>,
    deadline: Rc<Cell<Option<Instant>>>,
    context: Context,
    runtime: Runtime,
}

thread_local! {
    static ENGINE: RefCell<Option<Rc<Engine>>> = const { RefCell::new(None) };
    static RUNNING: Cell<bool> = const { Cell::new(false) };
}

impl Engine {
    fn get() -> std::result::Result<Rc<Engine>, ScriptError> {
        if let Some(engine) = ENGINE.with(|slot| slot.borrow().clone()) {
            return Ok(engine);
        }
        let engine = Rc::new(Engine::new()?);
        ENGINE.with(|slot| *slot.borrow_mut() = Some(engine.clone()));
        Ok(engine)
    }

    fn new() -> std::result::Result<Self, ScriptError> {
        let runtime = Runtime::new().map_err(|e| ScriptError::new(e.to_string()))?;
        runtime.set_memory_limit(MEMORY_LIMIT);
        runtime.set_max_stack_size(STACK_LIMIT);

        let deadline: Rc<Cell<Option<Instant>>> = Rc::new(Cell::new(None));
        let watch = deadline.clone();
        runtime.set_interrupt_handler(Some(Box::new(move || {
            watch.get().is_some_and(|at| Instant::now() > at)
        })));

        let context = Context::full(&runtime).map_err(|e| ScriptError::new(e.to_string()))?;
        let make_dollar = context
            .with(|ctx| {
                let install = || -> rquickjs::Result<Function> {
                    ctx.globals().set(
                        "__zjax_log",
                        Function::new(ctx.clone(), |level: String, message: String| match level.as_str() {
                            "error" => tracing::error!("[z-action] {}", message),
                            "warn" => tracing::warn!("[z-action] {}", message),
                            "debug" => tracing::debug!("[z-action] {}", message),
                            _ => tracing::info!("[z-action] {}", message),
                        })?,
                    )?;
                    ctx.eval(PRELUDE)
                };
                install()
                    .map(|make| Persistent::save(&ctx, make))
                    .map_err(|e| describe(&ctx, e))
            })
            .map_err(ScriptError::new)?;

        Ok(Self {
            make_dollar,
            deadline,
            context,
            runtime,
        })
    }
}

/// Marks the thread as inside QuickJS until dropped
struct Running;

impl Running {
    fn enter() -> Result<Self> {
        if RUNNING.with(|r| r.replace(true)) {
            return Err(ZjaxError::action("Inline handlers cannot run from inside another inline handler"));
        }
        Ok(Running)
    }
}

impl Drop for Running {
    fn drop(&mut self) {
        RUNNING.with(|r| r.set(false));
    }
}

/// Compiled inline handler
#[derive(Clone)]
pub struct Script {
    source: String,
    function: Persistent<Function<'static>>,
    engine: Rc<Engine>,
}

impl Script {
    /// Compile `source` as the body of `function ($)`
    pub fn compile(source: &str) -> std::result::Result<Self, ScriptError> {
        let _running = Running::enter().map_err(|e| ScriptError::new(e.to_string()))?;
        let engine = Engine::get()?;
        let function = engine
            .context
            .with(|ctx| {
                let build = || -> rquickjs::Result<Function> {
                    let constructor: Function = ctx.globals().get("Function")?;
                    constructor.call(("$", source))
                };
                build()
                    .map(|function| Persistent::save(&ctx, function))
                    .map_err(|e| describe(&ctx, e))
            })
            .map_err(ScriptError::new)?;

        Ok(Self {
            source: source.to_string(),
            function,
            engine,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Call the handler with `$` bound to `helper`; the return value as
    /// JSON, `undefined` as null
    pub fn run(&self, helper: &Helper) -> Result<Value> {
        let _running = Running::enter()?;
        let bridge = Rc::new(Bridge {
            helper: helper.clone(),
            pending: RefCell::new(None),
            thrown: RefCell::new(None),
        });

        self.engine.deadline.set(Some(Instant::now() + RUN_BUDGET));
        let outcome = self.engine.context.with(|ctx| self.call(&ctx, &bridge));
        self.engine.deadline.set(None);
        self.engine.runtime.run_gc();
        outcome
    }

    fn call<'js>(&self, ctx: &Ctx<'js>, bridge: &Rc<Bridge>) -> Result<Value> {
        let invoke = || -> rquickjs::Result<JsValue<'js>> {
            let native = bridge.install(ctx)?;
            let event = ctx.json_parse(event_json(bridge.helper.event()).to_string())?;
            let response = ctx.json_parse(response_json(&bridge.helper).to_string())?;
            let make: Function = self.engine.make_dollar.clone().restore(ctx)?;
            let dollar: JsValue = make.call((native, event, response))?;
            let function: Function = self.function.clone().restore(ctx)?;
            function.call((dollar,))
        };

        match invoke() {
            Ok(value) => to_json(ctx, value),
            Err(e) => {
                let message = describe(ctx, e);
                match bridge.thrown.borrow_mut().take() {
                    Some(error) if error.to_string() == message => Err(error),
                    _ => Err(ZjaxError::action(message)),
                }
            }
        }
    }
}

impl std::fmt::Debug for Script {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Script").field("source", &self.source).finish()
    }
}

/// Native half of `$`: helper calls keyed by node index
///
/// A failing call parks its error in `pending` and returns a placeholder;
/// the prelude then throws. `thrown` keeps the last error handed to JS so
/// an uncaught one surfaces with its original variant.
struct Bridge {
    helper: Helper,
    pending: RefCell<Option<ZjaxError>>,
    thrown: RefCell<Option<ZjaxError>>,
}

impl Bridge {
    fn settle<T>(&self, result: Result<T>, fallback: T) -> T {
        result.unwrap_or_else(|e| {
            *self.pending.borrow_mut() = Some(e);
            fallback
        })
    }

    fn take_error(&self) -> Option<String> {
        let error = self.pending.borrow_mut().take()?;
        let message = error.to_string();
        *self.thrown.borrow_mut() = Some(error);
        Some(message)
    }

    fn read<T>(&self, f: impl FnOnce(&DomTree) -> Result<T>) -> Result<T> {
        f(self.helper.document().tree())
    }

    fn write<T>(&self, f: impl FnOnce(&mut DomTree) -> Result<T>) -> Result<T> {
        f(self.helper.document_mut().tree_mut())
    }

    fn install<'js>(self: &Rc<Self>, ctx: &Ctx<'js>) -> rquickjs::Result<Object<'js>> {
        let native = Object::new(ctx.clone())?;

        let b = self.clone();
        native.set("error", Function::new(ctx.clone(), move || b.take_error())?)?;

        // $ and navigation
        let b = self.clone();
        native.set("node", Function::new(ctx.clone(), move || js_id(b.helper.node()))?)?;
        let b = self.clone();
        native.set(
            "select",
            Function::new(ctx.clone(), move |selector: String| {
                b.settle(b.helper.select(&selector).map(js_id), -1)
            })?,
        )?;
        let b = self.clone();
        native.set(
            "all",
            Function::new(ctx.clone(), move |selector: String| {
                b.settle(b.helper.all(&selector).map(js_ids), Vec::new())
            })?,
        )?;
        let b = self.clone();
        native.set(
            "redirect",
            Function::new(ctx.clone(), move |url: String| b.settle(b.helper.redirect(&url), ()))?,
        )?;
        let b = self.clone();
        native.set(
            "invoke",
            Function::new(ctx.clone(), move |name: String| {
                let value = b.helper.invoke(&name).map(|v| v.to_string());
                b.settle(value, "null".to_string())
            })?,
        )?;
        let b = self.clone();
        native.set("location", Function::new(ctx.clone(), move || b.helper.location())?)?;

        // Element reads
        let b = self.clone();
        native.set(
            "tagName",
            Function::new(ctx.clone(), move |node: i32| {
                b.read(|tree| Ok(tree.tag_name(node_id(node)).unwrap_or_default().to_ascii_uppercase()))
                    .unwrap_or_default()
            })?,
        )?;
        let b = self.clone();
        native.set(
            "getAttribute",
            Function::new(ctx.clone(), move |node: i32, name: String| {
                b.read(|tree| Ok(tree.get_attribute(node_id(node), &name).map(str::to_string)))
                    .unwrap_or_default()
            })?,
        )?;
        let b = self.clone();
        native.set(
            "hasClass",
            Function::new(ctx.clone(), move |node: i32, class: String| {
                b.read(|tree| Ok(tree.element(node_id(node)).is_some_and(|e| e.has_class(&class))))
                    .unwrap_or_default()
            })?,
        )?;
        let b = self.clone();
        native.set(
            "textContent",
            Function::new(ctx.clone(), move |node: i32| {
                b.read(|tree| Ok(tree.text_content(node_id(node)))).unwrap_or_default()
            })?,
        )?;
        let b = self.clone();
        native.set(
            "parent",
            Function::new(ctx.clone(), move |node: i32| {
                b.read(|tree| Ok(tree.parent(node_id(node)).filter(|&p| tree.is_element(p)).map_or(-1, js_id)))
                    .unwrap_or(-1)
            })?,
        )?;
        let b = self.clone();
        native.set(
            "prettyName",
            Function::new(ctx.clone(), move |node: i32| {
                b.read(|tree| Ok(tree.pretty_name(node_id(node)))).unwrap_or_default()
            })?,
        )?;

        // Scoped queries
        let b = self.clone();
        native.set(
            "query",
            Function::new(ctx.clone(), move |node: i32, selector: String| {
                let found = b.read(|tree| Ok(tree.query_selector(node_id(node), &selector)?.map_or(-1, js_id)));
                b.settle(found, -1)
            })?,
        )?;
        let b = self.clone();
        native.set(
            "queryAll",
            Function::new(ctx.clone(), move |node: i32, selector: String| {
                let found = b.read(|tree| Ok(js_ids(tree.query_selector_all(node_id(node), &selector)?)));
                b.settle(found, Vec::new())
            })?,
        )?;
        let b = self.clone();
        native.set(
            "closest",
            Function::new(ctx.clone(), move |node: i32, selector: String| {
                let found = b.read(|tree| Ok(tree.closest(node_id(node), &selector)?.map_or(-1, js_id)));
                b.settle(found, -1)
            })?,
        )?;

        // Element writes
        let b = self.clone();
        native.set(
            "setAttribute",
            Function::new(ctx.clone(), move |node: i32, name: String, value: String| {
                let done = b.write(|tree| Ok(tree.set_attribute(node_id(node), &name, &value)?));
                b.settle(done, ())
            })?,
        )?;
        let b = self.clone();
        native.set(
            "removeAttribute",
            Function::new(ctx.clone(), move |node: i32, name: String| {
                let _ = b.write(|tree| Ok(tree.remove_attribute(node_id(node), &name)));
            })?,
        )?;
        let b = self.clone();
        native.set(
            "addClass",
            Function::new(ctx.clone(), move |node: i32, class: String| {
                let done = b.write(|tree| Ok(tree.add_class(node_id(node), &class)?));
                b.settle(done, ())
            })?,
        )?;
        let b = self.clone();
        native.set(
            "removeClass",
            Function::new(ctx.clone(), move |node: i32, class: String| {
                let done = b.write(|tree| Ok(tree.remove_class(node_id(node), &class)?));
                b.settle(done, ())
            })?,
        )?;
        let b = self.clone();
        native.set(
            "setTextContent",
            Function::new(ctx.clone(), move |node: i32, text: String| {
                let done = b.write(|tree| Ok(tree.set_text_content(node_id(node), &text)?));
                b.settle(done, ())
            })?,
        )?;
        let b = self.clone();
        native.set(
            "remove",
            Function::new(ctx.clone(), move |node: i32| {
                let _ = b.write(|tree| {
                    tree.detach(node_id(node));
                    Ok(())
                });
            })?,
        )?;

        Ok(native)
    }
}

fn js_id(node: NodeId) -> i32 {
    if node.is_valid() {
        i32::try_from(node.index()).unwrap_or(-1)
    } else {
        -1
    }
}

fn js_ids(nodes: Vec<NodeId>) -> Vec<i32> {
    nodes.into_iter().map(js_id).collect()
}

fn node_id(id: i32) -> NodeId {
    u32::try_from(id).map_or(NodeId::NONE, NodeId::from_index)
}

fn event_json(event: Option<&Event>) -> Value {
    let Some(event) = event else {
        return Value::Null;
    };
    json!({
        "type": event.kind,
        "key": event.key,
        "shiftKey": event.shift_key,
        "ctrlKey": event.ctrl_key,
        "altKey": event.alt_key,
        "metaKey": event.meta_key,
        "detail": event.detail,
        "target": event.target.node().map_or(-1, js_id),
        "relatedNode": event.related_node.map_or(-1, js_id),
    })
}

fn response_json(helper: &Helper) -> Value {
    let Some(response) = helper.response() else {
        return Value::Null;
    };
    let headers: Map<String, Value> = response
        .headers
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), Value::from(value.as_str())))
        .collect();
    json!({
        "status": response.status,
        "statusText": response.reason,
        "ok": response.is_success(),
        "headers": headers,
        "body": response.text(),
    })
}

fn to_json<'js>(ctx: &Ctx<'js>, value: JsValue<'js>) -> Result<Value> {
    if value.is_undefined() {
        return Ok(Value::Null);
    }
    let text = ctx
        .json_stringify(value)
        .map_err(|e| ZjaxError::action(describe(ctx, e)))?;
    match text {
        None => Ok(Value::Null),
        Some(text) => {
            let text = text.to_string().map_err(|e| ZjaxError::action(e.to_string()))?;
            serde_json::from_str(&text).map_err(|e| ZjaxError::action(e.to_string()))
        }
    }
}

/// Message of a pending JS exception, or the engine error itself
fn describe(ctx: &Ctx<'_>, error: rquickjs::Error) -> String {
    if !error.is_exception() {
        return error.to_string();
    }
    let thrown = ctx.catch();
    if let Some(exception) = thrown.as_exception() {
        return exception.message().unwrap_or_else(|| "uncaught exception".to_string());
    }
    thrown
        .as_string()
        .and_then(|s| s.to_string().ok())
        .unwrap_or_else(|| "uncaught exception".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_accepts_javascript() {
        for source in [
            "const n = 1; return n + 1",
            "if ($.event.key === 'Escape') $('#m').remove()",
            "$.all('li').forEach(li => li.remove())",
            "",
            ";;;",
        ] {
            assert!(Script::compile(source).is_ok(), "{:?}", source);
        }
    }

    #[test]
    fn test_compile_rejects_syntax_errors() {
        for source in ["$('#a'", "return }", "const = 3"] {
            let err = Script::compile(source).unwrap_err();
            assert!(!err.message.is_empty(), "{:?}", source);
        }
    }

    #[test]
    fn test_source_kept() {
        let script = Script::compile("return 1").unwrap();
        assert_eq!(script.source(), "return 1");
        assert!(format!("{:?}", script).contains("return 1"));
    }

    #[test]
    fn test_node_id_conversion() {
        assert_eq!(node_id(-1), NodeId::NONE);
        assert_eq!(node_id(3), NodeId::from_index(3));
        assert_eq!(js_id(NodeId::NONE), -1);
        assert_eq!(js_id(NodeId::from_index(7)), 7);
    }

    #[test]
    fn test_event_json() {
        let event = Event::keydown(NodeId::from_index(4), "Enter").with_shift();
        let value = event_json(Some(&event));
        assert_eq!(value["type"], "keydown");
        assert_eq!(value["key"], "Enter");
        assert_eq!(value["shiftKey"], true);
        assert_eq!(value["target"], 4);
        assert_eq!(value["relatedNode"], -1);
        assert_eq!(event_json(None), Value::Null);
    }
}
