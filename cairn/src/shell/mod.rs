//! Platform shell
//!
//! The [`Backend`] trait is the contract with a native windowing system. The
//! [`EventLoop`] pumps its events on the loop thread and translates them into
//! block, window, and application operations on the [`AppContext`].
//!
//! [`HeadlessBackend`] is the in-memory reference backend: it keeps windows
//! and paint output in memory and lets tests inject native events.
//!
//! [`AppContext`]: crate::context::AppContext

mod backend;
mod event_loop;
mod headless;

pub use backend::{
    state, Atom, Backend, ClientData, NativeEvent, NativeEventKind, NativeHandle, SurfaceHandle,
    TaskId,
};
pub use event_loop::{
    convert_modifiers, is_wheel_button, map_button, run, wheel_delta, EventLoop, Translator,
};
pub use headless::{HeadlessBackend, HeadlessHandle, HeadlessState, HeadlessWindow, PaintRecord};
