//! Page runtime
//!
//! A [`Page`] owns the live document, the listener registry, the
//! configuration, the transport and a single-threaded executor. Handler
//! stages (timers, fetches, settle) run as tasks on that executor; nothing
//! runs until the embedder drives it with [`Page::run_until_idle`],
//! [`Page::wait`] or [`Page::block_on`].

use std::cell::{Ref, RefCell, RefMut};
use std::future::Future;
use std::rc::{Rc, Weak};
use std::time::Duration;

use smol::{LocalExecutor, Timer};
use zjax_dom::{Document, NodeId};
use zjax_net::Transport;

use crate::config::Config;
use crate::event::{Event, EventTarget};
use crate::listeners::{self, Dispatch, ListenerId, ListenerRegistry};
use crate::patch::ViewTransitions;
use crate::scan;
use crate::trigger::Trigger;

/// Poll interval while waiting for the executor to drain
const IDLE_POLL: Duration = Duration::from_millis(1);

/// Shared page state, reachable from every handler task
pub(crate) struct PageInner {
    executor: Weak<LocalExecutor<'static>>,
    pub(crate) document: RefCell<Document>,
    pub(crate) listeners: RefCell<ListenerRegistry>,
    pub(crate) config: Config,
    pub(crate) transport: Rc<dyn Transport>,
    pub(crate) transitions: RefCell<Option<Rc<dyn ViewTransitions>>>,
}

impl PageInner {
    /// Run `future` on the page executor; dropped if the page is gone
    pub(crate) fn spawn(&self, future: impl Future<Output = ()> + 'static) {
        if let Some(executor) = self.executor.upgrade() {
            executor.spawn(future).detach();
        }
    }
}

/// A live page with zjax directives
pub struct Page {
    inner: Rc<PageInner>,
    executor: Rc<LocalExecutor<'static>>,
}

impl Page {
    /// Wrap an existing document; call [`Page::start`] to bind directives
    pub fn new(mut document: Document, config: Config, transport: impl Transport + 'static) -> Self {
        document.tree_mut().take_mutations();
        let executor = Rc::new(LocalExecutor::new());
        let inner = Rc::new(PageInner {
            executor: Rc::downgrade(&executor),
            document: RefCell::new(document),
            listeners: RefCell::new(ListenerRegistry::default()),
            config,
            transport: Rc::new(transport),
            transitions: RefCell::new(None),
        });
        Self { inner, executor }
    }

    /// Parse `html` as the page served from `url`
    pub fn from_html(html: &str, url: &str, config: Config, transport: impl Transport + 'static) -> Self {
        Self::new(zjax_html::parse_with_url(html, url), config, transport)
    }

    /// Initial scan of the whole document
    pub fn start(&self) -> usize {
        tracing::info!("zjax {} starting on {}", env!("CARGO_PKG_VERSION"), self.location());
        scan::scan(&self.inner, NodeId::ROOT)
    }

    /// Bind directives under `node` (inclusive)
    ///
    /// Scanning the same node twice binds its listeners twice.
    pub fn scan(&self, node: NodeId) -> usize {
        scan::scan(&self.inner, node)
    }

    /// Drop every directive listener and scan the whole document again
    pub fn rescan(&self) -> usize {
        scan::rescan(&self.inner)
    }

    /// Drop every directive listener; native listeners stay
    pub fn clear_listeners(&self) -> usize {
        self.inner.listeners.borrow_mut().clear_directives()
    }

    /// Deliver an event; handler stages run once the executor is driven
    pub fn dispatch(&self, event: Event) -> Dispatch {
        listeners::dispatch(&self.inner, event)
    }

    /// Register an embedder listener on `target`
    pub fn add_event_listener<F>(&self, target: EventTarget, kind: &str, callback: F) -> ListenerId
    where
        F: Fn(&Event) + 'static,
    {
        self.inner
            .listeners
            .borrow_mut()
            .add_native(target, kind, Rc::new(callback))
    }

    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.borrow_mut().remove(id)
    }

    /// Live listeners, after dropping those of detached nodes
    pub fn listener_count(&self) -> usize {
        listeners::sweep(&self.inner);
        self.inner.listeners.borrow().len()
    }

    /// Triggers bound for `node`
    pub fn listeners_for(&self, node: NodeId) -> Vec<Trigger> {
        listeners::sweep(&self.inner);
        self.inner.listeners.borrow().triggers_for(node)
    }

    pub fn document(&self) -> Ref<'_, Document> {
        self.inner.document.borrow()
    }

    pub fn document_mut(&self) -> RefMut<'_, Document> {
        self.inner.document.borrow_mut()
    }

    /// First element matching `selector`
    pub fn query(&self, selector: &str) -> Option<NodeId> {
        self.document().query(selector)
    }

    /// Current location
    pub fn location(&self) -> String {
        self.document().url().to_string()
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Install or remove the host's view-transition hook
    pub fn set_view_transitions(&self, host: Option<Rc<dyn ViewTransitions>>) {
        *self.inner.transitions.borrow_mut() = host;
    }

    /// Drive the executor until no task is left
    pub fn run_until_idle(&self) {
        let executor = self.executor.clone();
        smol::block_on(self.executor.run(async move {
            while !executor.is_empty() {
                Timer::after(IDLE_POLL).await;
            }
        }));
    }

    /// Drive the executor for `duration`
    pub fn wait(&self, duration: Duration) {
        self.block_on(async {
            Timer::after(duration).await;
        });
    }

    /// Drive the executor until `future` completes
    pub fn block_on<T>(&self, future: impl Future<Output = T>) -> T {
        smol::block_on(self.executor.run(future))
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("location", &self.location())
            .field("listeners", &self.inner.listeners.borrow().len())
            .field("config", &self.inner.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zjax_net::MemoryTransport;

    fn page(html: &str) -> Page {
        Page::from_html(html, "http://localhost/", Config::default(), MemoryTransport::new())
    }

    #[test]
    fn test_start_binds_directives() {
        let page = page(r##"<button z-swap="/a #a">A</button><a href="/b" z-swap="#b">B</a><div z-action="@[click,keydown.enter] $().remove()"></div>"##);
        assert_eq!(page.start(), 4);
        assert_eq!(page.listener_count(), 4);
    }

    #[test]
    fn test_bad_directive_is_isolated() {
        let page = page(r#"<button z-swap="@click.sideways /a #a"></button><button id="ok" z-swap="/a #a"></button>"#);
        assert_eq!(page.start(), 1);
        let ok = page.query("#ok").unwrap();
        assert_eq!(page.listeners_for(ok).len(), 1);
    }

    #[test]
    fn test_native_listeners_survive_rescan() {
        let page = page(r#"<button z-swap="/a #a"></button>"#);
        page.start();
        page.add_event_listener(EventTarget::Document, "zjax:swap", |_| {});
        assert_eq!(page.listener_count(), 2);

        assert_eq!(page.rescan(), 1);
        assert_eq!(page.listener_count(), 2);
        assert_eq!(page.clear_listeners(), 1);
        assert_eq!(page.listener_count(), 1);
    }

    #[test]
    fn test_run_until_idle_without_tasks() {
        let page = page("<p></p>");
        page.run_until_idle();
        assert_eq!(page.block_on(async { 7 }), 7);
    }
}
