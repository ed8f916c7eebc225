//! Trigger/Modifier Resolver
//!
//! Turns `event[.modifier]*` specs into normalized subscriptions. Modifiers
//! are scanned left to right in one pass:
//!
//! 1. global modifiers (`document window once prevent stop`)
//! 2. category booleans (`ctrl shift alt meta cmd`, plus `outside` for mouse)
//! 3. `outside` for keyboard events
//! 4. the value of a pending timer
//! 5. timer names (`delay`, `debounce`), which open the pending slot
//! 6. the keyboard key-name slot (first unrecognized token)
//!
//! Anything else is an unknown modifier.

use serde::Serialize;
use zjax_dom::NodeId;

use crate::event::{Event, EventTarget};
use crate::{Result, ZjaxError};

/// Keyboard event names
pub const KEYBOARD_EVENTS: &[&str] = &["keydown", "keyup", "keypress", "input", "change", "focus", "blur"];

/// Mouse / pointer event names
pub const MOUSE_EVENTS: &[&str] = &[
    "click",
    "dblclick",
    "mousedown",
    "mouseup",
    "mouseover",
    "mousemove",
    "mouseout",
    "mouseenter",
    "mouseleave",
    "contextmenu",
    "auxclick",
];

/// Named keys accepted in the key-name slot
const KEY_ALIASES: &[(&str, &str)] = &[
    ("escape", "Escape"),
    ("esc", "Escape"),
    ("enter", "Enter"),
    ("tab", "Tab"),
    ("space", " "),
    ("backspace", "Backspace"),
    ("delete", "Delete"),
    ("arrowup", "ArrowUp"),
    ("arrowdown", "ArrowDown"),
    ("arrowleft", "ArrowLeft"),
    ("arrowright", "ArrowRight"),
    ("home", "Home"),
    ("end", "End"),
    ("pageup", "PageUp"),
    ("pagedown", "PageDown"),
];

/// Key name that matches every key
pub const ANY_KEY: &str = "any";

/// Event category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCategory {
    Keyboard,
    Mouse,
    Other,
}

impl EventCategory {
    pub fn of(event: &str) -> Self {
        if KEYBOARD_EVENTS.contains(&event) {
            EventCategory::Keyboard
        } else if MOUSE_EVENTS.contains(&event) {
            EventCategory::Mouse
        } else {
            EventCategory::Other
        }
    }
}

/// Behavioral qualifiers on a trigger
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
    pub once: bool,
    pub outside: bool,
    pub prevent: bool,
    pub stop: bool,
    pub document: bool,
    pub window: bool,
    /// Normalized `KeyboardEvent.key`, or `any`
    pub key_name: Option<String>,
    /// Milliseconds
    pub delay: Option<u64>,
    /// Milliseconds
    pub debounce: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Timer {
    Delay,
    Debounce,
}

impl Timer {
    fn parse(token: &str) -> Option<Timer> {
        match token {
            "delay" => Some(Timer::Delay),
            "debounce" => Some(Timer::Debounce),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Timer::Delay => "delay",
            Timer::Debounce => "debounce",
        }
    }
}

impl Modifiers {
    /// Scan modifier tokens for `event`
    pub fn parse(event: &str, tokens: &[&str]) -> Result<Self> {
        let category = EventCategory::of(event);
        let mut modifiers = Modifiers::default();
        let mut pending: Option<Timer> = None;
        let mut key_slot_open = category == EventCategory::Keyboard;

        for &token in tokens {
            if modifiers.set_global(token) {
                continue;
            }
            if category != EventCategory::Other && modifiers.set_key_modifier(token) {
                continue;
            }
            if token == "outside" && category != EventCategory::Other {
                modifiers.outside = true;
                continue;
            }
            if let Some(timer) = pending.take() {
                let ms = parse_timer_value(token)?;
                match timer {
                    Timer::Delay => modifiers.delay = Some(ms),
                    Timer::Debounce => modifiers.debounce = Some(ms),
                }
                continue;
            }
            if let Some(timer) = Timer::parse(token) {
                pending = Some(timer);
                continue;
            }
            if key_slot_open {
                modifiers.key_name = Some(normalize_key(token));
                key_slot_open = false;
                continue;
            }
            return Err(ZjaxError::grammar(format!(
                "Unknown trigger modifier in this context: {}",
                token
            )));
        }

        if let Some(timer) = pending {
            return Err(ZjaxError::grammar(format!("Missing value for timer modifier: {}", timer.name())));
        }
        Ok(modifiers)
    }

    fn set_global(&mut self, token: &str) -> bool {
        let flag = match token {
            "document" => &mut self.document,
            "window" => &mut self.window,
            "once" => &mut self.once,
            "prevent" => &mut self.prevent,
            "stop" => &mut self.stop,
            _ => return false,
        };
        *flag = true;
        true
    }

    fn set_key_modifier(&mut self, token: &str) -> bool {
        let flag = match token {
            "ctrl" => &mut self.ctrl,
            "shift" => &mut self.shift,
            "alt" => &mut self.alt,
            "meta" | "cmd" => &mut self.meta,
            _ => return false,
        };
        *flag = true;
        true
    }

    /// Required modifier keys are held
    pub(crate) fn keys_held(&self, event: &Event) -> bool {
        (!self.shift || event.shift_key)
            && (!self.ctrl || event.ctrl_key)
            && (!self.alt || event.alt_key)
            && (!self.meta || event.meta_key)
    }

    /// Key-name filter passes
    pub(crate) fn key_matches(&self, event: &Event) -> bool {
        match self.key_name.as_deref() {
            None | Some(ANY_KEY) => true,
            Some(name) => event.key.as_deref() == Some(name),
        }
    }
}

/// `^\d+s$` (seconds) or `^\d+ms$`, in milliseconds
fn parse_timer_value(token: &str) -> Result<u64> {
    let invalid = || ZjaxError::grammar(format!("Invalid timer value: {}", token));
    let (digits, scale) = if let Some(ms) = token.strip_suffix("ms") {
        (ms, 1)
    } else if let Some(s) = token.strip_suffix('s') {
        (s, 1000)
    } else {
        return Err(invalid());
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    digits
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(scale))
        .ok_or_else(invalid)
}

fn normalize_key(token: &str) -> String {
    KEY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == token)
        .map(|(_, key)| key.to_string())
        .unwrap_or_else(|| token.to_string())
}

/// A normalized event subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    /// Lowercase event name
    pub event: String,
    pub modifiers: Modifiers,
    /// Declaring element
    pub node: NodeId,
    /// Where the listener is attached
    pub target: EventTarget,
    pub handler_text: String,
}

impl Trigger {
    /// Parse one `event[.modifier]*` spec
    pub fn parse(spec: &str, node: NodeId, handler_text: &str) -> Result<Self> {
        let mut parts = spec.split('.');
        let event = parts.next().unwrap_or("").to_ascii_lowercase();
        if event.is_empty() || !event.chars().all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | ':')) {
            return Err(ZjaxError::grammar(format!("Invalid trigger event: '{}'", spec)));
        }
        let tokens: Vec<&str> = parts.collect();
        let modifiers = Modifiers::parse(&event, &tokens)?;

        let target = if modifiers.document {
            EventTarget::Document
        } else if modifiers.window || modifiers.outside {
            EventTarget::Window
        } else {
            EventTarget::Node(node)
        };

        Ok(Self {
            event,
            modifiers,
            node,
            target,
            handler_text: handler_text.to_string(),
        })
    }

    /// Trigger used when a statement names none
    pub fn default_for(tag_name: &str, node: NodeId, handler_text: &str) -> Self {
        let event = if tag_name.eq_ignore_ascii_case("form") { "submit" } else { "click" };
        Self {
            event: event.to_string(),
            modifiers: Modifiers::default(),
            node,
            target: EventTarget::Node(node),
            handler_text: handler_text.to_string(),
        }
    }

    pub fn category(&self) -> EventCategory {
        EventCategory::of(&self.event)
    }
}

/// Split a raw trigger list (`click.once,change`) into triggers
pub fn resolve_triggers(raw: &str, node: NodeId, handler_text: &str) -> Result<Vec<Trigger>> {
    raw.split(',')
        .map(|spec| Trigger::parse(spec.trim(), node, handler_text))
        .collect()
}
