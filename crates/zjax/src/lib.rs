//! zjax - declarative swaps and actions
//!
//! HTML attributes describe event-driven behavior:
//!
//! ```html
//! <button z-swap="@click.once GET /books #list|append">More</button>
//! <div z-action="@keydown.escape.document $('#menu').classList.remove('open')"></div>
//! ```
//!
//! `z-swap` fetches HTML and splices parts of it into the page; `z-action`
//! runs a registered action or an inline handler. A [`Page`] scans its
//! document for both, binds listeners, and drives the resulting handlers
//! on a single-threaded executor.

/// `tracing::debug!`, only when the page runs with `Config::debug`
macro_rules! zdebug {
    ($page:expr, $($arg:tt)+) => {
        if $page.config.debug() {
            tracing::debug!($($arg)+);
        }
    };
}

pub mod actions;
pub mod config;
pub mod directive;
mod error;
pub mod event;
pub mod form;
pub mod helper;
pub mod listeners;
mod page;
pub mod patch;
mod pipeline;
mod scan;
pub mod script;
pub mod swap;
pub mod trigger;

pub use actions::{ActionFn, ActionRegistry, CompiledAction, HandlerRef, action};
pub use config::Config;
pub use error::{Result, ZjaxError};
pub use event::{Event, EventTarget};
pub use helper::Helper;
pub use listeners::{Dispatch, Firing, ListenerId};
pub use page::Page;
pub use patch::{PatchResult, ViewTransitions};
pub use swap::{ResponseMode, SwapMode, SwapOp, SwapRequest};
pub use trigger::{Modifiers, Trigger};

pub use zjax_dom::{Document, NodeId};
pub use zjax_net::{Method, MemoryTransport, Response, Transport};
