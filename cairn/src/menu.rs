//! Menu items as event targets.
//!
//! Menus themselves are widgets; the core only knows that a menu item can be
//! validated (is it enabled right now?) and selected, and that unhandled
//! events on it cascade to the application.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::context::AppContext;
use crate::event::{Handlers, Modifiers};

static MENU_ITEM_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MenuItemId(u64);

impl MenuItemId {
    pub fn next() -> Self {
        Self(MENU_ITEM_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub const fn raw(&self) -> u64 {
        self.0
    }
}

/// A selectable menu entry.
pub struct MenuItem {
    pub(crate) id: MenuItemId,
    title: String,
    key_equivalent: Option<(char, Modifiers)>,
    pub(crate) handlers: Handlers<AppContext>,
}

impl MenuItem {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: MenuItemId::next(),
            title: title.into(),
            key_equivalent: None,
            handlers: Handlers::new(),
        }
    }

    /// Shortcut shown next to the title, using the platform menu modifier.
    pub fn with_key(mut self, key: char) -> Self {
        self.key_equivalent = Some((key, Modifiers::platform_menu()));
        self
    }

    pub fn with_key_modifiers(mut self, key: char, modifiers: Modifiers) -> Self {
        self.key_equivalent = Some((key, modifiers));
        self
    }

    pub fn id(&self) -> MenuItemId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn key_equivalent(&self) -> Option<(char, Modifiers)> {
        self.key_equivalent
    }

    pub fn handlers(&self) -> &Handlers<AppContext> {
        &self.handlers
    }

    pub fn handlers_mut(&mut self) -> &mut Handlers<AppContext> {
        &mut self.handlers
    }
}

impl fmt::Debug for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MenuItem")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("key_equivalent", &self.key_equivalent)
            .finish_non_exhaustive()
    }
}
