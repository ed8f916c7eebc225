//! Event Binding & Lifecycle Manager
//!
//! Every listener on the page lives in one [`ListenerRegistry`]. Directive
//! listeners are owned by their declaring node: the structural sweep
//! drops them as soon as that node leaves the document. Native listeners
//! belong to the embedder and stay until removed explicitly.
//!
//! Firing a directive listener runs its modifier gates synchronously
//! (keys, mouse keys, outside, once, prevent/stop), then spawns a task for
//! the delay, debounce and handler stages.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use serde_json::Value;
use smol::Timer;
use smol::channel::{self, Receiver, Sender};
use smol::future::BoxedLocal;
use zjax_dom::NodeId;

use crate::event::{Event, EventTarget};
use crate::page::PageInner;
use crate::trigger::{EventCategory, Trigger};
use crate::Result;

/// Directive handler: runs one firing against the page
pub(crate) type Handler = Rc<dyn Fn(Rc<PageInner>, Event) -> BoxedLocal<Result<Value>>>;

/// Embedder callback for native listeners
pub type NativeCallback = Rc<dyn Fn(&Event)>;

/// Listener identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Coalesces a burst of firings into one handler call
#[derive(Default)]
pub(crate) struct Debouncer {
    generation: Cell<u64>,
    waiters: RefCell<Vec<Sender<Result<Value>>>>,
}

impl Debouncer {
    /// Wait out the quiet period; the last firing of a burst makes the call
    /// and every waiter of the burst receives its outcome
    async fn run<F>(&self, quiet: Duration, waiter: Sender<Result<Value>>, call: F)
    where
        F: FnOnce() -> BoxedLocal<Result<Value>>,
    {
        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        self.waiters.borrow_mut().push(waiter);

        Timer::after(quiet).await;
        if self.generation.get() != generation {
            return;
        }

        let waiters = self.waiters.take();
        let outcome = call().await;
        for waiter in waiters {
            let _ = waiter.try_send(outcome.clone());
        }
    }
}

pub(crate) enum ListenerKind {
    Directive {
        trigger: Trigger,
        handler: Handler,
        fired: Cell<bool>,
        debouncer: Debouncer,
    },
    Native {
        callback: NativeCallback,
    },
}

pub(crate) struct Listener {
    pub(crate) id: ListenerId,
    pub(crate) target: EventTarget,
    pub(crate) event: String,
    pub(crate) kind: ListenerKind,
}

impl Listener {
    fn trigger(&self) -> Option<&Trigger> {
        match &self.kind {
            ListenerKind::Directive { trigger, .. } => Some(trigger),
            ListenerKind::Native { .. } => None,
        }
    }
}

/// All listeners of a page, in registration order
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: u64,
    listeners: Vec<Rc<Listener>>,
}

impl ListenerRegistry {
    fn next_id(&mut self) -> ListenerId {
        self.next_id += 1;
        ListenerId(self.next_id)
    }

    /// Bind a directive listener for `trigger`
    pub(crate) fn bind(&mut self, trigger: Trigger, handler: Handler) -> ListenerId {
        let id = self.next_id();
        self.listeners.push(Rc::new(Listener {
            id,
            target: trigger.target,
            event: trigger.event.clone(),
            kind: ListenerKind::Directive {
                trigger,
                handler,
                fired: Cell::new(false),
                debouncer: Debouncer::default(),
            },
        }));
        id
    }

    pub(crate) fn add_native(&mut self, target: EventTarget, event: &str, callback: NativeCallback) -> ListenerId {
        let id = self.next_id();
        self.listeners.push(Rc::new(Listener {
            id,
            target,
            event: event.to_ascii_lowercase(),
            kind: ListenerKind::Native { callback },
        }));
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.id != id);
        self.listeners.len() != before
    }

    pub(crate) fn get(&self, id: ListenerId) -> Option<Rc<Listener>> {
        self.listeners.iter().find(|l| l.id == id).cloned()
    }

    /// Listeners on `target` for `event`, in registration order
    pub(crate) fn matching(&self, target: EventTarget, event: &str) -> Vec<Rc<Listener>> {
        self.listeners
            .iter()
            .filter(|l| l.target == target && l.event == event)
            .cloned()
            .collect()
    }

    /// Drop directive listeners whose trigger fails `keep`; returns how many
    pub(crate) fn retain_directives(&mut self, mut keep: impl FnMut(&Trigger) -> bool) -> usize {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.trigger().is_none_or(&mut keep));
        before - self.listeners.len()
    }

    /// Drop every directive listener
    pub(crate) fn clear_directives(&mut self) -> usize {
        self.retain_directives(|_| false)
    }

    /// Triggers bound for `node`, in registration order
    pub(crate) fn triggers_for(&self, node: NodeId) -> Vec<Trigger> {
        self.listeners
            .iter()
            .filter_map(|l| l.trigger())
            .filter(|t| t.node == node)
            .cloned()
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.len()
    }
}

/// Handle on one directive firing that passed its synchronous gates
#[derive(Debug)]
pub struct Firing {
    pub listener: ListenerId,
    outcome: Receiver<Result<Value>>,
}

impl Firing {
    /// Outcome, if the handler has finished
    pub fn try_outcome(&self) -> Option<Result<Value>> {
        self.outcome.try_recv().ok()
    }

    /// Wait for the handler; `None` if the page went away first
    pub async fn outcome(&self) -> Option<Result<Value>> {
        self.outcome.recv().await.ok()
    }
}

/// Summary of one dispatch
#[derive(Debug, Default)]
pub struct Dispatch {
    pub default_prevented: bool,
    pub propagation_stopped: bool,
    pub firings: Vec<Firing>,
}

/// Deliver `event` along its propagation path
pub(crate) fn dispatch(page: &Rc<PageInner>, event: Event) -> Dispatch {
    sweep(page);

    if page.config.rescan_events().iter().any(|kind| *kind == event.kind) {
        zdebug!(page, "'{}' received, rescanning document", event.kind);
        crate::scan::rescan(page);
    }

    let path = event.propagation_path(page.document.borrow().tree());
    let mut result = Dispatch::default();

    for target in path {
        let listeners = page.listeners.borrow().matching(target, &event.kind);
        for listener in listeners {
            match &listener.kind {
                ListenerKind::Native { callback } => callback(&event),
                ListenerKind::Directive { trigger, .. } => {
                    if !passes_gates(page, &listener, &event) {
                        continue;
                    }
                    result.default_prevented |= trigger.modifiers.prevent;
                    result.propagation_stopped |= trigger.modifiers.stop;
                    result.firings.push(fire(page, &listener, event.clone()));
                }
            }
        }
        if result.propagation_stopped {
            break;
        }
    }
    result
}

/// Keyboard, mouse, outside and once gates, in that order
fn passes_gates(page: &PageInner, listener: &Listener, event: &Event) -> bool {
    let ListenerKind::Directive { trigger, fired, .. } = &listener.kind else {
        return true;
    };
    let modifiers = &trigger.modifiers;

    match trigger.category() {
        EventCategory::Keyboard => {
            if !modifiers.keys_held(event) || !modifiers.key_matches(event) {
                return false;
            }
        }
        EventCategory::Mouse => {
            if !modifiers.keys_held(event) {
                return false;
            }
        }
        EventCategory::Other => {}
    }

    if modifiers.outside {
        let inside = event
            .target
            .node()
            .is_some_and(|origin| page.document.borrow().tree().contains(trigger.node, origin));
        if inside {
            return false;
        }
    }

    if fired.get() {
        return false;
    }
    if modifiers.once {
        fired.set(true);
    }
    true
}

/// Spawn the delay / debounce / handler stages for one firing
fn fire(page: &Rc<PageInner>, listener: &Rc<Listener>, event: Event) -> Firing {
    let (sender, receiver) = channel::bounded(1);
    let task_page = page.clone();
    let task_listener = listener.clone();

    page.spawn(async move {
        let ListenerKind::Directive { trigger, handler, debouncer, .. } = &task_listener.kind else {
            return;
        };
        if let Some(ms) = trigger.modifiers.delay {
            Timer::after(Duration::from_millis(ms)).await;
        }
        match trigger.modifiers.debounce {
            Some(ms) => {
                debouncer
                    .run(Duration::from_millis(ms), sender, || handler(task_page, event))
                    .await
            }
            None => {
                let outcome = handler(task_page, event).await;
                let _ = sender.try_send(outcome);
            }
        }
    });

    Firing {
        listener: listener.id,
        outcome: receiver,
    }
}

/// Fire a synthetic `mount` at each newly bound listener that wants one
pub(crate) fn mount(page: &Rc<PageInner>, bound: &[ListenerId]) -> Vec<Firing> {
    let mut firings = Vec::new();
    for &id in bound {
        let Some(listener) = page.listeners.borrow().get(id) else {
            continue;
        };
        let Some(trigger) = listener.trigger() else {
            continue;
        };
        if trigger.event != "mount" {
            continue;
        }
        let event = Event::new("mount", EventTarget::Node(trigger.node));
        if passes_gates(page, &listener, &event) {
            firings.push(fire(page, &listener, event));
        }
    }
    firings
}

/// Structural watcher: drop directive listeners whose owner was detached
///
/// Consumes the document's pending mutation records; does nothing when no
/// node was removed since the last sweep.
pub(crate) fn sweep(page: &PageInner) -> usize {
    let removed_any = {
        let mut doc = page.document.borrow_mut();
        let records = doc.tree_mut().take_mutations();
        records.iter().any(|record| !record.removed_nodes.is_empty())
    };
    if !removed_any {
        return 0;
    }

    let doc = page.document.borrow();
    let tree = doc.tree();
    let dropped = page
        .listeners
        .borrow_mut()
        .retain_directives(|trigger| tree.is_connected(trigger.node));
    if dropped > 0 {
        zdebug!(page, "Removed {} listener(s) of detached nodes", dropped);
    }
    dropped
}
