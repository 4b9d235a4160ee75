//! Application context
//!
//! `AppContext` is the single owner of all toolkit state: the block tree, the
//! window registry, menu items, the application target, the quit state
//! machine, deferred tasks, and the backend with its display connection.
//!
//! It is created explicitly, handed to the event loop, and mutated only on
//! the loop thread. Handlers receive it as `&mut AppContext`.
//!
//! # Cascade
//!
//! `AppContext` resolves targets for the dispatcher:
//!
//! ```text
//! Block -> parent Block -> ... -> root Block -> Window -> Application
//! MenuItem -> Application
//! ```
//!
//! A block outside any window cascades straight to the application.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::app::{AppConfig, Application, QuitMachine, QuitResponse, QuitState, QuitStep};
use crate::block::{Block, BlockId, BlockTree};
use crate::error::{Error, Result};
use crate::event::{
    keys, Cascade, Event, EventKind, Handler, KeyInfo, Modifiers, MouseInfo, Payload, Target,
};
use crate::menu::{MenuItem, MenuItemId};
use crate::primitives::{Point, Rect, SizeHint};
use crate::shell::{Atom, Backend, NativeHandle, TaskId};
use crate::window::{
    place_tooltip, ClickTracker, CursorIcon, RootLayout, Window, WindowId, WindowOptions,
    WindowRegistry, WindowStyle,
};

type Task = Box<dyn FnOnce(&mut AppContext)>;

struct PendingTask {
    /// The task is dropped unrun if this window closes first.
    window: Option<WindowId>,
    task: Task,
}

/// Owner of the toolkit's state. See the module docs.
pub struct AppContext {
    config: AppConfig,
    blocks: BlockTree,
    windows: WindowRegistry,
    menu_items: HashMap<MenuItemId, MenuItem>,
    app: Application,
    quit: QuitMachine,
    backend: Box<dyn Backend>,
    tasks: HashMap<TaskId, PendingTask>,
    /// Handles we destroyed and whose `Destroy` notification is still due.
    pending_destroy: HashSet<NativeHandle>,
    running: bool,
    display_open: bool,
}

impl AppContext {
    pub fn new(config: AppConfig, backend: impl Backend + 'static) -> Self {
        Self {
            config,
            blocks: BlockTree::new(),
            windows: WindowRegistry::new(),
            menu_items: HashMap::new(),
            app: Application::default(),
            quit: QuitMachine::new(),
            backend: Box::new(backend),
            tasks: HashMap::new(),
            pending_destroy: HashSet::new(),
            running: false,
            display_open: false,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn blocks(&self) -> &BlockTree {
        &self.blocks
    }

    pub fn blocks_mut(&mut self) -> &mut BlockTree {
        &mut self.blocks
    }

    pub fn windows(&self) -> &WindowRegistry {
        &self.windows
    }

    pub fn window(&self, id: WindowId) -> Option<&Window> {
        self.windows.get(id)
    }

    pub fn window_mut(&mut self, id: WindowId) -> Option<&mut Window> {
        self.windows.get_mut(id)
    }

    pub fn application(&self) -> &Application {
        &self.app
    }

    pub fn application_mut(&mut self) -> &mut Application {
        &mut self.app
    }

    pub fn quit_state(&self) -> QuitState {
        self.quit.state()
    }

    /// True from startup until the terminal quit transition.
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_display_open(&self) -> bool {
        self.display_open
    }

    pub fn app_name(&self) -> String {
        self.backend
            .app_name()
            .unwrap_or_else(|| self.config.name.clone())
    }

    pub(crate) fn close_atom(&self) -> Atom {
        self.backend.close_atom()
    }

    pub(crate) fn backend_mut(&mut self) -> &mut dyn Backend {
        self.backend.as_mut()
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Register a handler on a target. Returns false if the target is unknown.
    pub fn on<F>(&mut self, target: Target, kind: EventKind, handler: F) -> bool
    where
        F: Fn(&mut AppContext, &mut Event) + 'static,
    {
        let handlers = match target {
            Target::Block(id) => self.blocks.get_mut(id).map(|b| &mut b.handlers),
            Target::Window(id) => self.windows.get_mut(id).map(|w| &mut w.handlers),
            Target::MenuItem(id) => self.menu_items.get_mut(&id).map(|m| &mut m.handlers),
            Target::Application => Some(&mut self.app.handlers),
        };
        match handlers {
            Some(handlers) => {
                handlers.add(kind, handler);
                true
            }
            None => false,
        }
    }

    /// Dispatch an event through the cascade.
    pub fn dispatch(&mut self, event: &mut Event) {
        trace!(%event, "dispatch");
        crate::event::dispatch(self, event);
    }

    /// Build, dispatch, and return an event.
    pub fn send(&mut self, target: Target, payload: Payload) -> Event {
        let mut event = Event::new(target, payload);
        self.dispatch(&mut event);
        event
    }

    /// Dispatch a validate event at `target`. True unless someone marked it invalid.
    pub fn validate(&mut self, target: Target) -> bool {
        self.send(target, Payload::Validate { invalid: false })
            .is_valid()
    }

    // =========================================================================
    // Windows
    // =========================================================================

    /// Window options filled from the configuration.
    pub fn window_options(&self) -> WindowOptions {
        WindowOptions {
            frame: Rect::from_size(self.config.window_size),
            style: WindowStyle::standard(),
            title: self.config.window_title.clone(),
            background: self.config.background_color,
        }
    }

    /// Create a window with a root block sized to the frame and an empty
    /// content block. The window is not shown until `show_window`.
    pub fn new_window(&mut self, options: WindowOptions) -> Result<WindowId> {
        let (handle, surface) = self.backend.create_window(options.frame, options.style)?;
        let id = WindowId::next();

        let content = self.blocks.create();
        let root = self.blocks.insert(
            Block::new()
                .with_bounds(Rect::from_size(options.frame.size()))
                .with_background(options.background)
                .with_layout(RootLayout::new(content)),
        );
        self.blocks.add_child(root, content);
        self.blocks.attach_window(root, id);
        self.backend.set_title(handle, &options.title);

        let clicks = ClickTracker::new(
            self.config.double_click_interval,
            self.config.double_click_slop,
        );
        self.windows.insert(Window::new(
            id,
            handle,
            surface,
            options.style,
            root,
            content,
            options.frame,
            clicks,
        ));
        debug!(window = %id, ?handle, "window opened");
        Ok(id)
    }

    fn handle_of(&self, id: WindowId) -> Result<NativeHandle> {
        self.windows
            .get(id)
            .map(|w| w.handle)
            .ok_or(Error::UnknownWindow(id))
    }

    /// Map the window if needed and raise it.
    pub fn show_window(&mut self, id: WindowId) -> Result<()> {
        let handle = self.handle_of(id)?;
        self.backend.to_front(handle);
        if let Some(root) = self.windows.get(id).map(|w| w.root) {
            self.blocks.repaint(root);
        }
        Ok(())
    }

    /// Ask the window's handlers whether it may close.
    pub fn window_should_close(&mut self, id: WindowId) -> bool {
        if !self.windows.contains(id) {
            return false;
        }
        !self.send(Target::Window(id), Payload::Closing { aborted: false })
            .close_aborted()
    }

    /// Close the window if its handlers agree. Returns true if it closed.
    pub fn perform_close(&mut self, id: WindowId) -> bool {
        self.window_should_close(id) && self.close_window(id)
    }

    /// Close a window unconditionally.
    ///
    /// Native resources are released exactly once. Closing an unknown or
    /// already-closed window is a no-op that returns false.
    pub fn close_window(&mut self, id: WindowId) -> bool {
        match self.remove_window(id) {
            Some(window) => {
                self.backend.destroy_window(window.handle, window.surface);
                self.pending_destroy.insert(window.handle);
                true
            }
            None => {
                debug!(window = %id, "close of unknown window ignored");
                false
            }
        }
    }

    fn remove_window(&mut self, id: WindowId) -> Option<Window> {
        let window = self.windows.remove(id)?;
        debug!(window = %id, "window closed");
        self.tasks.retain(|_, task| task.window != Some(id));
        self.blocks.destroy(window.root);

        let mut event = Event::new(Target::Window(id), Payload::WindowClosed);
        for handler in window.handlers.get(EventKind::WindowClosed) {
            handler(self, &mut event);
        }
        Some(window)
    }

    pub fn title(&self, id: WindowId) -> Option<String> {
        self.windows.get(id).map(|w| self.backend.title(w.handle))
    }

    pub fn set_title(&mut self, id: WindowId, title: &str) -> Result<()> {
        let handle = self.handle_of(id)?;
        self.backend.set_title(handle, title);
        Ok(())
    }

    /// Last known frame. Native geometry lags, so this never queries the backend.
    pub fn frame(&self, id: WindowId) -> Option<Rect> {
        self.windows.get(id).map(|w| w.frame)
    }

    pub fn set_frame(&mut self, id: WindowId, frame: Rect) -> Result<()> {
        let handle = self.handle_of(id)?;
        if let Some(w) = self.windows.get_mut(id) {
            w.frame = frame;
        }
        self.backend.set_frame(handle, frame);
        Ok(())
    }

    pub fn minimize(&mut self, id: WindowId) -> Result<()> {
        let handle = self.handle_of(id)?;
        self.backend.minimize(handle);
        Ok(())
    }

    pub fn scaling_factor(&self, id: WindowId) -> f32 {
        self.windows
            .get(id)
            .map(|w| self.backend.scaling_factor(w.handle))
            .unwrap_or(1.0)
    }

    pub fn set_cursor(&mut self, id: WindowId, cursor: CursorIcon) {
        if let Some(w) = self.windows.get_mut(id)
            && w.cursor != cursor
        {
            w.cursor = cursor;
            let handle = w.handle;
            self.backend.set_cursor(handle, cursor);
        }
    }

    /// Native tooltip text, for backends that have native tooltips.
    pub fn set_native_tooltip(&mut self, id: WindowId, text: Option<&str>) {
        if let Some(w) = self.windows.get(id) {
            let handle = w.handle;
            self.backend.set_tooltip(handle, text);
        }
    }

    /// The window holding keyboard input, if the backend knows.
    pub fn key_window(&self) -> Option<WindowId> {
        self.backend
            .key_window()
            .and_then(|handle| self.windows.by_handle(handle))
    }

    /// The window containing a block.
    pub fn window_of(&self, block: BlockId) -> Option<WindowId> {
        self.blocks.window_of(block)
    }

    /// True while the block's window is being interactively resized.
    pub fn in_live_resize(&self, block: BlockId) -> bool {
        self.blocks
            .window_of(block)
            .and_then(|id| self.windows.get(id))
            .is_some_and(|w| w.in_live_resize)
    }

    /// Reported by backends that can tell when a live resize starts and ends.
    pub fn set_live_resize(&mut self, id: WindowId, live: bool) {
        if let Some(w) = self.windows.get_mut(id) {
            w.in_live_resize = live;
        }
    }

    /// A window's frame changed. Layout runs with repainting suspended, then
    /// the surface is resized and the whole window is repainted once. A pure
    /// move keeps the surface and repaints nothing.
    pub fn window_configured(&mut self, id: WindowId, frame: Rect) {
        let Some(w) = self.windows.get_mut(id) else {
            return;
        };
        let resized = w.frame.size() != frame.size();
        w.frame = frame;
        w.ignore_repaint = true;
        let (root, surface) = (w.root, w.surface);

        self.blocks.set_size(root, frame.size());
        self.send(Target::Window(id), Payload::WindowResized);
        self.blocks.validate_layout(root);
        self.flush_damage();

        if let Some(w) = self.windows.get_mut(id) {
            w.ignore_repaint = false;
        }
        if resized {
            self.backend.resize_surface(surface, frame.size());
            self.blocks.repaint(root);
        }
    }

    /// The display reported a window destroyed.
    ///
    /// Handles we never tracked are ignored. When the last window is gone, a
    /// quit in progress finishes; otherwise the last-window policy decides.
    pub fn window_destroyed(&mut self, handle: NativeHandle) {
        if let Some(id) = self.windows.by_handle(handle) {
            debug!(window = %id, "window destroyed by the display");
            self.remove_window(id);
        } else if !self.pending_destroy.remove(&handle) {
            debug!(?handle, "destroy for untracked window dropped");
            return;
        }

        if !self.windows.is_empty() {
            return;
        }
        if self.quit.is_quitting() {
            let steps = self.quit.windows_closed(0);
            self.apply_quit_steps(steps);
        } else if self.running && self.should_quit_after_last_window() {
            self.attempt_quit();
        }
    }

    // =========================================================================
    // Focus
    // =========================================================================

    pub fn focused_block(&self, window: WindowId) -> Option<BlockId> {
        self.windows.get(window).and_then(|w| w.focus)
    }

    /// Move keyboard focus within a window.
    ///
    /// The old focus receives `FocusLost`, the new one `FocusGained`. Blocks
    /// from other windows are refused.
    pub fn set_focus(&mut self, window: WindowId, block: Option<BlockId>) {
        let Some(w) = self.windows.get(window) else {
            return;
        };
        if w.focus == block {
            return;
        }
        if let Some(b) = block
            && self.blocks.window_of(b) != Some(window)
        {
            debug!(block = ?b, window = %window, "focus target is not in window");
            return;
        }
        let old = w.focus;
        if let Some(w) = self.windows.get_mut(window) {
            w.focus = block;
        }

        if let Some(old) = old
            && self.blocks.contains(old)
        {
            self.blocks.set_focused(old, false);
            self.send(Target::Block(old), Payload::FocusLost);
        }
        if let Some(new) = block {
            self.blocks.set_focused(new, true);
            self.send(Target::Block(new), Payload::FocusGained);
        }
    }

    /// Focus the next focusable block in tree order, wrapping around.
    pub fn focus_next(&mut self, window: WindowId) {
        self.move_focus(window, true);
    }

    /// Focus the previous focusable block in tree order, wrapping around.
    pub fn focus_previous(&mut self, window: WindowId) {
        self.move_focus(window, false);
    }

    fn move_focus(&mut self, window: WindowId, forward: bool) {
        let Some(w) = self.windows.get(window) else {
            return;
        };
        let candidates = self.blocks.focus_candidates(w.content);
        let count = candidates.len();
        if count == 0 {
            return;
        }
        let current = w
            .focus
            .and_then(|f| candidates.iter().position(|c| *c == f));
        let index = match (current, forward) {
            (Some(i), true) => (i + 1) % count,
            (Some(i), false) => (i + count - 1) % count,
            (None, true) => 0,
            (None, false) => count - 1,
        };
        self.set_focus(window, Some(candidates[index]));
    }

    // =========================================================================
    // Keyboard
    // =========================================================================

    /// Route a key press to the focused block, or the window without one.
    /// An unhandled Tab moves the focus.
    pub fn key_down(&mut self, window: WindowId, key: KeyInfo) {
        let Some(target) = self.key_target(window) else {
            return;
        };
        let event = self.send(target, Payload::KeyDown(key));
        let plain = !key
            .modifiers
            .intersects(Modifiers::CONTROL | Modifiers::OPTION | Modifiers::COMMAND);
        if !event.finished() && key.is_tab() && plain {
            if key.modifiers.contains(Modifiers::SHIFT) || key.code == keys::ISO_LEFT_TAB {
                self.focus_previous(window);
            } else {
                self.focus_next(window);
            }
        }
    }

    pub fn key_up(&mut self, window: WindowId, key: KeyInfo) {
        if let Some(target) = self.key_target(window) {
            self.send(target, Payload::KeyUp(key));
        }
    }

    fn key_target(&self, window: WindowId) -> Option<Target> {
        let w = self.windows.get(window)?;
        Some(
            w.focus
                .filter(|f| self.blocks.contains(*f))
                .map(Target::Block)
                .unwrap_or(Target::Window(window)),
        )
    }

    // =========================================================================
    // Pointer
    // =========================================================================

    /// Deepest block under a point in window coordinates.
    ///
    /// Hit-testing starts at the content block, so a shown tooltip never
    /// swallows the pointer.
    pub fn block_at(&self, window: WindowId, where_: Point) -> Option<BlockId> {
        let w = self.windows.get(window)?;
        let local = self.blocks.from_window(w.content, where_);
        Some(self.blocks.block_at(w.content, local))
    }

    /// The nearest enabled block at or above `block`.
    fn enabled_ancestor(&self, block: BlockId) -> BlockId {
        let mut current = block;
        while self.blocks.get(current).is_some_and(|b| b.disabled) {
            match self.blocks.parent(current) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        current
    }

    fn pointer_target(&self, window: WindowId, where_: Point) -> Option<BlockId> {
        self.block_at(window, where_)
            .map(|hit| self.enabled_ancestor(hit))
    }

    fn mouse_info(&self, block: BlockId, where_: Point, modifiers: Modifiers) -> MouseInfo {
        MouseInfo::new(self.blocks.from_window(block, where_), modifiers)
    }

    /// The pointer capability sees the event first; unless it finishes the
    /// event, normal dispatch follows.
    fn deliver_pointer(&mut self, block: BlockId, payload: Payload) {
        let mut event = Event::new(Target::Block(block), payload);
        if let Some(pointer) = self.blocks.get(block).and_then(|b| b.pointer.clone()) {
            pointer.pointer_event(self, block, &mut event);
            if event.finished() {
                return;
            }
        }
        self.dispatch(&mut event);
    }

    /// A button went down. The block under the pointer becomes the target
    /// for the rest of the gesture and, if focusable, takes the focus.
    pub fn mouse_down(&mut self, window: WindowId, where_: Point, button: u8, modifiers: Modifiers) {
        self.cancel_tooltip(window);
        let Some(target) = self.pointer_target(window, where_) else {
            return;
        };
        let Some(w) = self.windows.get_mut(window) else {
            return;
        };
        let clicks = w.clicks.press(Instant::now(), where_, button);
        w.mouse_down = Some(target);

        if self.blocks.get(target).is_some_and(|b| b.focusable) {
            self.set_focus(window, Some(target));
        }
        let info = self
            .mouse_info(target, where_, modifiers)
            .with_button(button)
            .with_click_count(clicks);
        self.deliver_pointer(target, Payload::MouseDown(info));
    }

    /// Sticky target of the current gesture, else whatever is under the pointer.
    fn gesture_target(&self, window: WindowId, where_: Point) -> Option<BlockId> {
        self.windows
            .get(window)
            .and_then(|w| w.mouse_down)
            .filter(|b| self.blocks.contains(*b))
            .or_else(|| self.pointer_target(window, where_))
    }

    pub fn mouse_dragged(&mut self, window: WindowId, where_: Point, button: u8, modifiers: Modifiers) {
        let Some(target) = self.gesture_target(window, where_) else {
            return;
        };
        let info = self
            .mouse_info(target, where_, modifiers)
            .with_button(button);
        self.deliver_pointer(target, Payload::MouseDragged(info));
    }

    pub fn mouse_up(&mut self, window: WindowId, where_: Point, button: u8, modifiers: Modifiers) {
        let Some(target) = self.gesture_target(window, where_) else {
            return;
        };
        if let Some(w) = self.windows.get_mut(window) {
            w.mouse_down = None;
        }
        let info = self
            .mouse_info(target, where_, modifiers)
            .with_button(button);
        self.deliver_pointer(target, Payload::MouseUp(info));
    }

    pub fn mouse_moved(&mut self, window: WindowId, where_: Point, modifiers: Modifiers) {
        let Some(target) = self.pointer_target(window, where_) else {
            return;
        };
        self.update_hover(window, Some(target), where_, modifiers);
        let info = self.mouse_info(target, where_, modifiers);
        self.deliver_pointer(target, Payload::MouseMoved(info));
    }

    pub fn mouse_entered(&mut self, window: WindowId, where_: Point, modifiers: Modifiers) {
        let target = self.pointer_target(window, where_);
        self.update_hover(window, target, where_, modifiers);
    }

    pub fn mouse_exited(&mut self, window: WindowId, where_: Point, modifiers: Modifiers) {
        self.update_hover(window, None, where_, modifiers);
    }

    pub fn mouse_wheel(&mut self, window: WindowId, where_: Point, delta: Point, modifiers: Modifiers) {
        let Some(target) = self.pointer_target(window, where_) else {
            return;
        };
        let info = self.mouse_info(target, where_, modifiers);
        self.deliver_pointer(target, Payload::MouseWheel { info, delta });
    }

    /// Send exit/enter when the hovered block changes, and restart the
    /// tooltip cycle for the new block.
    fn update_hover(
        &mut self,
        window: WindowId,
        hover: Option<BlockId>,
        where_: Point,
        modifiers: Modifiers,
    ) {
        let Some(w) = self.windows.get_mut(window) else {
            return;
        };
        if w.hover == hover {
            return;
        }
        let old = std::mem::replace(&mut w.hover, hover);
        self.cancel_tooltip(window);

        if let Some(old) = old
            && self.blocks.contains(old)
        {
            let info = self.mouse_info(old, where_, modifiers);
            self.deliver_pointer(old, Payload::MouseExited(info));
        }
        if let Some(new) = hover {
            let info = self.mouse_info(new, where_, modifiers);
            self.deliver_pointer(new, Payload::MouseEntered(info));
            self.schedule_tooltip(window, new, where_);
        }
    }

    // =========================================================================
    // Tooltips
    // =========================================================================

    /// Invalidate pending tooltip callbacks and hide the current tooltip.
    fn cancel_tooltip(&mut self, window: WindowId) {
        let Some(w) = self.windows.get_mut(window) else {
            return;
        };
        w.bump_tooltip_sequence();
        if let Some(tip) = w.tooltip.take() {
            self.blocks.destroy(tip);
        }
    }

    fn schedule_tooltip(&mut self, window: WindowId, block: BlockId, where_: Point) {
        if !self.blocks.get(block).is_some_and(|b| b.has_tooltip()) {
            return;
        }
        let Some(w) = self.windows.get(window) else {
            return;
        };
        let sequence = w.tooltip_sequence;
        // Moving between tooltips while one is up shows the next at once.
        let recent = w
            .last_tooltip_shown_at
            .is_some_and(|at| at.elapsed() < self.config.tooltip_dismissal);
        let delay = (!recent).then_some(self.config.tooltip_delay);
        let at = self.blocks.from_window(block, where_);
        self.invoke_after(Some(window), delay, move |cx| {
            cx.show_tooltip(window, block, at, sequence)
        });
    }

    fn show_tooltip(&mut self, window: WindowId, block: BlockId, at: Point, sequence: u64) {
        let Some(w) = self.windows.get(window) else {
            return;
        };
        if w.tooltip_sequence != sequence {
            trace!(window = %window, sequence, "stale tooltip request");
            return;
        }
        let root = w.root;
        let Some(source) = self.blocks.get(block).and_then(|b| b.tooltip.clone()) else {
            return;
        };
        let Some(tip) = source.tooltip(&mut self.blocks, block, at) else {
            return;
        };
        let Some(size) = self.blocks.get(block).map(|b| b.size()) else {
            return;
        };

        let avoid = Rect::from_origin_size(self.blocks.to_window(block, Point::ORIGIN), size);
        let view = self.blocks.get(root).map(|b| b.size()).unwrap_or_default();
        let pref = self.blocks.compute_sizes(tip, SizeHint::NONE).pref;
        let blocks = &self.blocks;
        let bounds = place_tooltip(avoid, pref, view, |width| {
            blocks.compute_sizes(tip, SizeHint::width(width)).pref
        });

        self.blocks.add_child(root, tip);
        self.blocks.set_bounds(tip, bounds);
        self.blocks.repaint(tip);
        if let Some(w) = self.windows.get_mut(window) {
            w.tooltip = Some(tip);
            w.last_tooltip_shown_at = Some(Instant::now());
        }

        let dismissal = self.config.tooltip_dismissal;
        self.invoke_after(Some(window), Some(dismissal), move |cx| {
            cx.dismiss_tooltip(window, sequence)
        });
    }

    fn dismiss_tooltip(&mut self, window: WindowId, sequence: u64) {
        let Some(w) = self.windows.get_mut(window) else {
            return;
        };
        if w.tooltip_sequence != sequence {
            return;
        }
        if let Some(tip) = w.tooltip.take() {
            self.blocks.destroy(tip);
        }
    }

    // =========================================================================
    // Painting
    // =========================================================================

    /// Paint the damaged part of a window and flush it.
    pub fn paint_window(&mut self, id: WindowId, clip: Rect) {
        let Some(w) = self.windows.get(id) else {
            return;
        };
        let (handle, surface, root) = (w.handle, w.surface, w.root);
        self.blocks.validate_layout(root);

        let g = self.backend.begin_paint(handle, surface, clip);
        self.blocks.paint(root, g, clip);
        self.backend.flush(handle);
    }

    /// Hand block damage to the owning windows.
    fn flush_damage(&mut self) {
        for damage in self.blocks.take_damage() {
            if let Some(w) = self.windows.get_mut(damage.window) {
                w.repaint_bounds(damage.rect);
            }
        }
    }

    /// Bookkeeping after each native event: validate layouts, then turn
    /// accumulated dirty regions into native repaint requests.
    pub fn after_event(&mut self) {
        for id in self.windows.ids() {
            if let Some(root) = self.windows.get(id).map(|w| w.root) {
                self.blocks.validate_layout(root);
            }
        }
        self.flush_damage();
        for id in self.windows.ids() {
            let Some(w) = self.windows.get_mut(id) else {
                continue;
            };
            if let Some(dirty) = w.take_dirty() {
                let handle = w.handle;
                self.backend.request_repaint(handle, dirty);
            }
        }
    }

    // =========================================================================
    // Deferred work
    // =========================================================================

    /// Run `task` on the loop thread, after the current event.
    pub fn invoke<F>(&mut self, window: Option<WindowId>, task: F) -> TaskId
    where
        F: FnOnce(&mut AppContext) + 'static,
    {
        self.invoke_after(window, None, task)
    }

    /// Run `task` on the loop thread after `delay`.
    ///
    /// Tasks bound to a window are dropped if it closes first.
    pub fn invoke_after<F>(
        &mut self,
        window: Option<WindowId>,
        delay: Option<Duration>,
        task: F,
    ) -> TaskId
    where
        F: FnOnce(&mut AppContext) + 'static,
    {
        let id = TaskId::next();
        self.tasks.insert(
            id,
            PendingTask {
                window,
                task: Box::new(task),
            },
        );
        let handle = window.and_then(|w| self.windows.get(w)).map(|w| w.handle);
        self.backend.invoke_after(handle, id, delay);
        id
    }

    /// Forget a task that has not run yet.
    pub fn cancel_task(&mut self, id: TaskId) -> bool {
        self.tasks.remove(&id).is_some()
    }

    pub(crate) fn run_task(&mut self, id: TaskId) {
        let Some(pending) = self.tasks.remove(&id) else {
            trace!(task = id.raw(), "task already gone");
            return;
        };
        if let Some(window) = pending.window
            && !self.windows.contains(window)
        {
            debug!(task = id.raw(), window = %window, "task for closed window dropped");
            return;
        }
        (pending.task)(self);
    }

    // =========================================================================
    // Application lifecycle
    // =========================================================================

    pub(crate) fn open_display(&mut self) -> Result<()> {
        self.backend.open()?;
        self.display_open = true;
        debug!("display opened");
        Ok(())
    }

    pub(crate) fn startup(&mut self) {
        self.send(Target::Application, Payload::AppWillFinishStartup);
        self.running = true;
        self.send(Target::Application, Payload::AppDidFinishStartup);
        if self.windows.is_empty() && self.should_quit_after_last_window() {
            self.attempt_quit();
        }
    }

    pub fn app_became_active(&mut self) {
        if self.app.active {
            return;
        }
        self.send(Target::Application, Payload::AppWillBecomeActive);
        self.app.active = true;
        self.send(Target::Application, Payload::AppDidBecomeActive);
    }

    pub fn app_resigned_active(&mut self) {
        if !self.app.active {
            return;
        }
        self.send(Target::Application, Payload::AppWillResignActive);
        self.app.active = false;
        self.send(Target::Application, Payload::AppDidResignActive);
    }

    fn should_quit_after_last_window(&mut self) -> bool {
        let quit = self.config.quit_after_last_window_closed;
        self.send(Target::Application, Payload::LastWindowClosed { quit })
            .quit_after_last_window()
            .unwrap_or(quit)
    }

    /// Ask the application whether to quit and act on the answer.
    pub fn attempt_quit(&mut self) {
        if self.quit.state() != QuitState::Running {
            debug!(state = ?self.quit.state(), "quit already in progress");
            return;
        }
        let response = self
            .send(
                Target::Application,
                Payload::QuitRequested {
                    response: QuitResponse::Now,
                },
            )
            .quit_response()
            .unwrap_or_default();
        let steps = self.quit.attempt(response, self.windows.len());
        self.apply_quit_steps(steps);
    }

    /// Resolve a quit deferred with [`QuitResponse::Later`].
    pub fn app_may_quit_now(&mut self, quit: bool) {
        let steps = self.quit.may_quit_now(quit, self.windows.len());
        self.apply_quit_steps(steps);
    }

    pub(crate) fn connection_lost(&mut self) {
        let steps = self.quit.connection_lost();
        self.apply_quit_steps(steps);
    }

    fn apply_quit_steps(&mut self, steps: Vec<QuitStep>) {
        for step in steps {
            match step {
                QuitStep::NotifyWillQuit => {
                    self.send(Target::Application, Payload::AppWillQuit);
                }
                QuitStep::CloseAllWindows => {
                    for id in self.windows.ids() {
                        self.close_window(id);
                    }
                }
                QuitStep::Finish => self.finish(),
            }
        }
    }

    fn finish(&mut self) {
        self.running = false;
        if self.display_open {
            self.display_open = false;
            self.backend.close();
            debug!("display closed");
        }
    }

    // =========================================================================
    // Menu items
    // =========================================================================

    pub fn add_menu_item(&mut self, item: MenuItem) -> MenuItemId {
        let id = item.id;
        self.menu_items.insert(id, item);
        id
    }

    pub fn menu_item(&self, id: MenuItemId) -> Option<&MenuItem> {
        self.menu_items.get(&id)
    }

    pub fn menu_item_mut(&mut self, id: MenuItemId) -> Option<&mut MenuItem> {
        self.menu_items.get_mut(&id)
    }

    pub fn remove_menu_item(&mut self, id: MenuItemId) -> Option<MenuItem> {
        self.menu_items.remove(&id)
    }

    /// True if the item is enabled right now.
    pub fn validate_menu_item(&mut self, id: MenuItemId) -> bool {
        self.menu_items.contains_key(&id) && self.validate(Target::MenuItem(id))
    }

    /// Validate the item, then dispatch its selection. Returns false if it
    /// was disabled.
    pub fn select_menu_item(&mut self, id: MenuItemId) -> bool {
        if !self.validate_menu_item(id) {
            return false;
        }
        self.send(Target::MenuItem(id), Payload::Selection);
        true
    }
}

impl Cascade for AppContext {
    fn handlers_for(&self, target: Target, kind: EventKind) -> Vec<Handler<Self>> {
        match target {
            Target::Block(id) => self.blocks.get(id).map(|b| b.handlers.get(kind)),
            Target::Window(id) => self.windows.get(id).map(|w| w.handlers.get(kind)),
            Target::MenuItem(id) => self.menu_items.get(&id).map(|m| m.handlers.get(kind)),
            Target::Application => Some(self.app.handlers.get(kind)),
        }
        .unwrap_or_default()
    }

    fn parent_target(&self, target: Target) -> Option<Target> {
        match target {
            Target::Block(id) => {
                let block = self.blocks.get(id)?;
                Some(match (block.parent, block.window) {
                    (Some(parent), _) => Target::Block(parent),
                    (None, Some(window)) => Target::Window(window),
                    (None, None) => Target::Application,
                })
            }
            Target::Window(_) | Target::MenuItem(_) => Some(Target::Application),
            Target::Application => None,
        }
    }
}
