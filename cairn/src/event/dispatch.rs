//! Targets, handler registries, and the cascade dispatcher.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::{Event, EventKind};
use crate::block::BlockId;
use crate::menu::MenuItemId;
use crate::window::WindowId;

/// Anything that can receive and route events.
///
/// Targets are plain handles; the context that owns the objects resolves
/// their handlers and parent targets (see [`Cascade`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Block(BlockId),
    Window(WindowId),
    MenuItem(MenuItemId),
    /// The application singleton: root of every cascade chain.
    Application,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Block(id) => write!(f, "Block #{}", id.raw()),
            Target::Window(id) => write!(f, "Window #{}", id.raw()),
            Target::MenuItem(id) => write!(f, "MenuItem #{}", id.raw()),
            Target::Application => f.write_str("Application"),
        }
    }
}

/// An event handler. `C` is the context the handler may mutate.
pub type Handler<C> = Rc<dyn Fn(&mut C, &mut Event)>;

/// Per-target handler registry: handlers grouped by kind, in registration order.
pub struct Handlers<C> {
    by_kind: HashMap<EventKind, Vec<Handler<C>>>,
}

impl<C> Handlers<C> {
    pub fn new() -> Self {
        Self {
            by_kind: HashMap::new(),
        }
    }

    /// Register a handler for a kind. Handlers run in registration order.
    pub fn add<F>(&mut self, kind: EventKind, handler: F)
    where
        F: Fn(&mut C, &mut Event) + 'static,
    {
        self.by_kind.entry(kind).or_default().push(Rc::new(handler));
    }

    /// Drop every handler registered for a kind.
    pub fn remove_all(&mut self, kind: EventKind) {
        self.by_kind.remove(&kind);
    }

    /// True if at least one handler is registered for the kind.
    pub fn has(&self, kind: EventKind) -> bool {
        self.by_kind.get(&kind).is_some_and(|list| !list.is_empty())
    }

    /// Snapshot of the handlers for a kind.
    ///
    /// Cloning the `Rc`s lets the dispatcher release its borrow of the owner
    /// before running handlers that mutate it.
    pub fn get(&self, kind: EventKind) -> Vec<Handler<C>> {
        self.by_kind.get(&kind).cloned().unwrap_or_default()
    }

    /// Total number of registered handlers.
    pub fn len(&self) -> usize {
        self.by_kind.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<C> Default for Handlers<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for Handlers<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.by_kind.iter().map(|(kind, list)| (kind, list.len())))
            .finish()
    }
}

/// Resolves targets for the dispatcher.
pub trait Cascade: Sized {
    /// Handlers registered on `target` for `kind`, in registration order.
    fn handlers_for(&self, target: Target, kind: EventKind) -> Vec<Handler<Self>>;

    /// The next target up the chain, `None` at the root.
    fn parent_target(&self, target: Target) -> Option<Target>;
}

/// Dispatch an event through the cascade.
///
/// Starting at the event's target, every handler registered for the event's
/// kind runs in registration order. After a target's handlers ran, dispatch
/// moves to the parent target only if the event cascades and is not finished.
/// It stops at the root.
pub fn dispatch<C: Cascade>(cx: &mut C, event: &mut Event) {
    let kind = event.kind();
    let mut current = Some(event.target());
    while let Some(target) = current {
        for handler in cx.handlers_for(target, kind) {
            handler(cx, event);
        }
        if !event.cascade() || event.finished() {
            break;
        }
        current = cx.parent_target(target);
    }
}
