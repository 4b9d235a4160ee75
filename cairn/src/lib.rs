//! Cairn: a retained-mode UI toolkit core.
//!
//! A tree of rectangular blocks with pluggable layout, dirty-region
//! repainting, and cascading event dispatch, driven by a single native event
//! loop.
//!
//! # Architecture
//!
//! ```text
//! Backend ──NativeEvent──> Translator ──ops──> AppContext
//!                                                 │
//!                                  ┌──────────────┼──────────────┐
//!                                  ▼              ▼              ▼
//!                              BlockTree    WindowRegistry   QuitMachine
//!                                  │
//!                         layout / repaint damage
//!                                  │
//!                                  ▼
//!                  after_event: validate, request repaint
//! ```
//!
//! Everything runs on the loop thread. Backends may time callbacks on other
//! threads, but the callback bodies always run inside the loop.
//!
//! # Example
//!
//! ```no_run
//! use cairn::{AppConfig, AppContext, EventKind, HeadlessBackend, Target};
//!
//! let mut cx = AppContext::new(AppConfig::default(), HeadlessBackend::new());
//! cx.on(Target::Application, EventKind::AppDidFinishStartup, |cx, _| {
//!     if let Ok(window) = cx.new_window(cx.window_options()) {
//!         let _ = cx.show_window(window);
//!     }
//! });
//! cairn::run(&mut cx).expect("display");
//! ```

pub mod app;
pub mod block;
pub mod context;
pub mod error;
pub mod event;
pub mod graphics;
pub mod layout;
pub mod menu;
pub mod primitives;
pub mod shell;
pub mod window;

pub use app::{AppConfig, QuitResponse, QuitState};
pub use block::{Block, BlockId, BlockTree};
pub use context::AppContext;
pub use error::{Error, Result};
pub use event::{Event, EventKind, KeyInfo, Modifiers, MouseInfo, Payload, Target};
pub use graphics::{DrawOp, Graphics, RecordingGraphics};
pub use layout::{FillLayout, Layout, StackData, StackLayout};
pub use menu::{MenuItem, MenuItemId};
pub use primitives::{Color, Insets, Point, Rect, Size, SizeHint, Sizes};
pub use shell::{run, Backend, EventLoop, HeadlessBackend, HeadlessHandle, NativeEvent, NativeHandle};
pub use window::{CursorIcon, Window, WindowId, WindowOptions, WindowStyle};
