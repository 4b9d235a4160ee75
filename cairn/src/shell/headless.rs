//! In-memory backend.
//!
//! Windows, titles, frames, and paint output live in a shared
//! [`HeadlessState`]. Native events travel over a crossbeam channel, so a
//! [`HeadlessHandle`] can inject input from tests or another thread while the
//! loop runs. Delayed callbacks are timed on a small tokio runtime started
//! with the display.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, trace, warn};

use super::backend::{Atom, Backend, ClientData, NativeEvent, NativeEventKind, NativeHandle, SurfaceHandle, TaskId};
use crate::error::{Error, Result};
use crate::graphics::{DrawOp, Graphics, RecordingGraphics};
use crate::primitives::{Rect, Size};
use crate::window::{CursorIcon, WindowStyle};

const CLOSE_ATOM: Atom = Atom(1);

/// A window as the headless display sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessWindow {
    pub surface: SurfaceHandle,
    pub frame: Rect,
    pub style: WindowStyle,
    pub title: String,
    pub mapped: bool,
    pub minimized: bool,
    /// Times the window was raised after being mapped.
    pub raised: usize,
    pub cursor: CursorIcon,
    pub tooltip: Option<String>,
}

/// One flushed paint pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PaintRecord {
    pub window: NativeHandle,
    pub clip: Rect,
    pub ops: Vec<DrawOp>,
}

impl PaintRecord {
    /// Filled rectangles of this pass, in window coordinates.
    pub fn fills(&self) -> Vec<Rect> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::FillRect { rect, .. } => Some(*rect),
                _ => None,
            })
            .collect()
    }
}

/// Everything the headless display has been told.
#[derive(Debug, Default)]
pub struct HeadlessState {
    pub opens: usize,
    pub closes: usize,
    pub windows: HashMap<NativeHandle, HeadlessWindow>,
    pub destroyed: Vec<NativeHandle>,
    pub repaint_requests: Vec<(NativeHandle, Rect)>,
    pub painted: Vec<PaintRecord>,
    pub surface_sizes: HashMap<SurfaceHandle, Size>,
    /// When set, the next `next_event` reports a lost connection.
    pub disconnected: bool,
    /// Events pulled off the channel by coalescing but not yet delivered.
    held: usize,
}

impl HeadlessState {
    /// Paint passes flushed for one window.
    pub fn paints_for(&self, window: NativeHandle) -> Vec<&PaintRecord> {
        self.painted.iter().filter(|p| p.window == window).collect()
    }
}

fn lock(state: &Mutex<HeadlessState>) -> MutexGuard<'_, HeadlessState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cloneable access to a running [`HeadlessBackend`].
#[derive(Debug, Clone)]
pub struct HeadlessHandle {
    sender: Sender<NativeEvent>,
    state: Arc<Mutex<HeadlessState>>,
}

impl HeadlessHandle {
    /// Queue a native event for the loop.
    pub fn post(&self, event: NativeEvent) {
        let _ = self.sender.send(event);
    }

    /// Queue the window manager's close request for `window`.
    pub fn request_close(&self, window: NativeHandle) {
        self.post(NativeEvent::ClientMessage {
            window,
            data: ClientData::Atom(CLOSE_ATOM),
        });
    }

    /// Drop the display connection as seen by the loop.
    pub fn disconnect(&self) {
        lock(&self.state).disconnected = true;
    }

    pub fn state(&self) -> MutexGuard<'_, HeadlessState> {
        lock(&self.state)
    }

    /// Events posted but not yet handed to the loop.
    pub fn queued(&self) -> usize {
        self.sender.len() + lock(&self.state).held
    }

    pub fn window(&self, handle: NativeHandle) -> Option<HeadlessWindow> {
        lock(&self.state).windows.get(&handle).cloned()
    }

    /// Live window handles in creation order.
    pub fn handles(&self) -> Vec<NativeHandle> {
        let mut handles: Vec<_> = lock(&self.state).windows.keys().copied().collect();
        handles.sort();
        handles
    }
}

/// Backend that keeps everything in memory.
pub struct HeadlessBackend {
    sender: Sender<NativeEvent>,
    receiver: Receiver<NativeEvent>,
    /// Events pulled off the channel while coalescing.
    pending: VecDeque<NativeEvent>,
    state: Arc<Mutex<HeadlessState>>,
    runtime: Option<tokio::runtime::Runtime>,
    idle_timeout: Option<Duration>,
    fail_open: bool,
    next_handle: u64,
    painting: HashMap<NativeHandle, (Rect, RecordingGraphics)>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            pending: VecDeque::new(),
            state: Arc::new(Mutex::new(HeadlessState::default())),
            runtime: None,
            idle_timeout: None,
            fail_open: false,
            next_handle: 1,
            painting: HashMap::new(),
        }
    }

    /// How long `next_event` waits before treating an idle queue as a lost
    /// connection. The default, `None`, blocks until the next event.
    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// A backend whose display refuses to open.
    pub fn unavailable() -> Self {
        Self {
            fail_open: true,
            ..Self::new()
        }
    }

    pub fn handle(&self) -> HeadlessHandle {
        HeadlessHandle {
            sender: self.sender.clone(),
            state: self.state.clone(),
        }
    }

    fn allocate(&mut self) -> u64 {
        let id = self.next_handle;
        self.next_handle += 1;
        id
    }

    fn post(&self, event: NativeEvent) {
        let _ = self.sender.send(event);
    }

    fn with_window(&self, window: NativeHandle, f: impl FnOnce(&mut HeadlessWindow)) {
        match lock(&self.state).windows.get_mut(&window) {
            Some(w) => f(w),
            None => trace!(?window, "request for unknown headless window"),
        }
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for HeadlessBackend {
    fn open(&mut self) -> Result<()> {
        if self.fail_open {
            return Err(Error::DisplayUnavailable(String::from("headless display refused")));
        }
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("cairn-timer")
            .enable_time()
            .build()
            .map_err(|e| Error::Backend(e.to_string()))?;
        self.runtime = Some(runtime);
        lock(&self.state).opens += 1;
        debug!("headless display opened");
        Ok(())
    }

    fn close(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
        lock(&self.state).closes += 1;
        debug!("headless display closed");
    }

    fn close_atom(&self) -> Atom {
        CLOSE_ATOM
    }

    fn next_event(&mut self) -> Option<NativeEvent> {
        if lock(&self.state).disconnected {
            return None;
        }
        if let Some(event) = self.pending.pop_front() {
            lock(&self.state).held = self.pending.len();
            return Some(event);
        }
        match self.idle_timeout {
            Some(timeout) => match self.receiver.recv_timeout(timeout) {
                Ok(event) => Some(event),
                Err(RecvTimeoutError::Timeout) => {
                    warn!(?timeout, "headless display idle, disconnecting");
                    None
                }
                Err(RecvTimeoutError::Disconnected) => None,
            },
            None => self.receiver.recv().ok(),
        }
    }

    fn take_pending(&mut self, window: NativeHandle, kind: NativeEventKind) -> Vec<NativeEvent> {
        self.pending.extend(self.receiver.try_iter());
        let (matching, rest): (Vec<_>, Vec<_>) = self
            .pending
            .drain(..)
            .partition(|e| e.window() == window && e.kind() == kind);
        self.pending = rest.into();
        lock(&self.state).held = self.pending.len();
        matching
    }

    fn create_window(&mut self, frame: Rect, style: WindowStyle) -> Result<(NativeHandle, SurfaceHandle)> {
        let handle = NativeHandle(self.allocate());
        let surface = SurfaceHandle(self.allocate());
        let mut state = lock(&self.state);
        state.windows.insert(
            handle,
            HeadlessWindow {
                surface,
                frame,
                style,
                title: String::new(),
                mapped: false,
                minimized: false,
                raised: 0,
                cursor: CursorIcon::default(),
                tooltip: None,
            },
        );
        state.surface_sizes.insert(surface, frame.size());
        trace!(?handle, ?surface, "headless window created");
        Ok((handle, surface))
    }

    fn destroy_window(&mut self, window: NativeHandle, surface: SurfaceHandle) {
        self.painting.remove(&window);
        {
            let mut state = lock(&self.state);
            state.windows.remove(&window);
            state.surface_sizes.remove(&surface);
            state.destroyed.push(window);
        }
        self.post(NativeEvent::Destroy { window });
    }

    fn title(&self, window: NativeHandle) -> String {
        lock(&self.state)
            .windows
            .get(&window)
            .map(|w| w.title.clone())
            .unwrap_or_default()
    }

    fn set_title(&mut self, window: NativeHandle, title: &str) {
        self.with_window(window, |w| w.title = title.to_owned());
    }

    fn frame(&self, window: NativeHandle) -> Option<Rect> {
        lock(&self.state).windows.get(&window).map(|w| w.frame)
    }

    fn set_frame(&mut self, window: NativeHandle, frame: Rect) {
        self.with_window(window, |w| w.frame = frame);
        self.post(NativeEvent::Configure { window, frame });
    }

    fn to_front(&mut self, window: NativeHandle) {
        self.with_window(window, |w| {
            if w.mapped {
                w.raised += 1;
            } else {
                w.mapped = true;
            }
            w.minimized = false;
        });
    }

    fn minimize(&mut self, window: NativeHandle) {
        self.with_window(window, |w| w.minimized = true);
    }

    fn request_repaint(&mut self, window: NativeHandle, rect: Rect) {
        lock(&self.state).repaint_requests.push((window, rect));
        self.post(NativeEvent::Expose { window, rect });
    }

    fn begin_paint(&mut self, window: NativeHandle, _surface: SurfaceHandle, clip: Rect) -> &mut dyn Graphics {
        let (_, graphics) = self
            .painting
            .entry(window)
            .and_modify(|(pass_clip, _)| *pass_clip = clip)
            .or_insert_with(|| (clip, RecordingGraphics::new()));
        graphics
    }

    fn flush(&mut self, window: NativeHandle) {
        let Some((clip, mut graphics)) = self.painting.remove(&window) else {
            return;
        };
        lock(&self.state).painted.push(PaintRecord {
            window,
            clip,
            ops: graphics.take_ops(),
        });
    }

    fn resize_surface(&mut self, surface: SurfaceHandle, size: Size) {
        lock(&self.state).surface_sizes.insert(surface, size);
    }

    fn invoke_after(&mut self, window: Option<NativeHandle>, task: TaskId, delay: Option<Duration>) {
        let event = NativeEvent::ClientMessage {
            window: window.unwrap_or(NativeHandle::NONE),
            data: ClientData::Task(task),
        };
        match (delay, &self.runtime) {
            (Some(delay), Some(runtime)) => {
                let sender = self.sender.clone();
                runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = sender.send(event);
                });
            }
            (Some(_), None) => {
                warn!(task = task.raw(), "timer unavailable before open, running task next");
                self.post(event);
            }
            (None, _) => self.post(event),
        }
    }

    fn set_cursor(&mut self, window: NativeHandle, cursor: CursorIcon) {
        self.with_window(window, |w| w.cursor = cursor);
    }

    fn set_tooltip(&mut self, window: NativeHandle, text: Option<&str>) {
        self.with_window(window, |w| w.tooltip = text.map(str::to_owned));
    }
}
