//! Application-level configuration, state, and the quit state machine.

use std::time::Duration;

use tracing::debug;

use crate::context::AppContext;
use crate::event::Handlers;
use crate::primitives::{Color, Size};

/// Configuration for a cairn application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Application name, reported when the backend has none of its own.
    pub name: String,

    /// Title of windows created without one.
    pub window_title: String,

    /// Initial size of new windows.
    pub window_size: Size,

    /// Background of a window's root block.
    pub background_color: Color,

    /// Hover time before a tooltip is shown.
    pub tooltip_delay: Duration,

    /// Time a tooltip stays up.
    pub tooltip_dismissal: Duration,

    /// Maximum time between presses counted as one multi-click.
    pub double_click_interval: Duration,

    /// Maximum pointer travel between presses counted as one multi-click.
    pub double_click_slop: f32,

    /// Default answer of the `LastWindowClosed` event.
    pub quit_after_last_window_closed: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: String::from("Cairn"),
            window_title: String::from("Untitled"),
            window_size: Size::new(640.0, 480.0),
            background_color: Color::BACKGROUND,
            tooltip_delay: Duration::from_millis(1500),
            tooltip_dismissal: Duration::from_secs(3),
            double_click_interval: Duration::from_millis(500),
            double_click_slop: 4.0,
            quit_after_last_window_closed: true,
        }
    }
}

/// Answer to a quit request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuitResponse {
    /// Quit right away.
    #[default]
    Now,
    /// Hold the quit until `AppContext::app_may_quit_now` is called.
    Later,
    /// Keep running.
    Cancel,
}

/// States of the quit sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitState {
    Running,
    /// A quit was deferred with [`QuitResponse::Later`].
    AwaitingQuit,
    /// Windows are being closed on the way out.
    Quitting,
    /// Terminal: the loop is stopped and the display is released.
    Finished,
}

/// Side effects requested by a transition, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitStep {
    /// Dispatch `AppWillQuit`.
    NotifyWillQuit,
    /// Ask every open window to close.
    CloseAllWindows,
    /// Stop the loop and release the display. Emitted at most once.
    Finish,
}

/// The quit protocol, independent of any display.
///
/// Transition functions take the current number of open windows and return
/// the steps the caller must carry out.
#[derive(Debug, Clone)]
pub struct QuitMachine {
    state: QuitState,
}

impl QuitMachine {
    pub fn new() -> Self {
        Self {
            state: QuitState::Running,
        }
    }

    pub fn state(&self) -> QuitState {
        self.state
    }

    pub fn is_quitting(&self) -> bool {
        self.state == QuitState::Quitting
    }

    pub fn is_awaiting(&self) -> bool {
        self.state == QuitState::AwaitingQuit
    }

    pub fn is_finished(&self) -> bool {
        self.state == QuitState::Finished
    }

    /// Apply the answer to a quit request. Ignored unless running.
    pub fn attempt(&mut self, response: QuitResponse, open_windows: usize) -> Vec<QuitStep> {
        if self.state != QuitState::Running {
            debug!(state = ?self.state, "quit attempt ignored");
            return Vec::new();
        }
        match response {
            QuitResponse::Cancel => {
                debug!("quit cancelled");
                Vec::new()
            }
            QuitResponse::Later => {
                debug!("quit deferred");
                self.state = QuitState::AwaitingQuit;
                Vec::new()
            }
            QuitResponse::Now => self.initiate(open_windows),
        }
    }

    /// Resolve a deferred quit. Ignored unless awaiting.
    pub fn may_quit_now(&mut self, quit: bool, open_windows: usize) -> Vec<QuitStep> {
        if self.state != QuitState::AwaitingQuit {
            return Vec::new();
        }
        if quit {
            self.initiate(open_windows)
        } else {
            debug!("deferred quit declined");
            self.state = QuitState::Running;
            Vec::new()
        }
    }

    /// The live window count dropped to `open_windows`.
    pub fn windows_closed(&mut self, open_windows: usize) -> Vec<QuitStep> {
        if self.state == QuitState::Quitting && open_windows == 0 {
            self.finish()
        } else {
            Vec::new()
        }
    }

    /// The display connection is gone; nothing else can happen.
    pub fn connection_lost(&mut self) -> Vec<QuitStep> {
        if self.state == QuitState::Finished {
            Vec::new()
        } else {
            self.finish()
        }
    }

    fn initiate(&mut self, open_windows: usize) -> Vec<QuitStep> {
        debug!(open_windows, "quitting");
        self.state = QuitState::Quitting;
        let mut steps = vec![QuitStep::NotifyWillQuit];
        if open_windows > 0 {
            steps.push(QuitStep::CloseAllWindows);
        } else {
            steps.extend(self.finish());
        }
        steps
    }

    fn finish(&mut self) -> Vec<QuitStep> {
        debug!("quit finished");
        self.state = QuitState::Finished;
        vec![QuitStep::Finish]
    }
}

impl Default for QuitMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// The application singleton's target state.
#[derive(Debug, Default)]
pub struct Application {
    pub(crate) handlers: Handlers<AppContext>,
    pub(crate) active: bool,
}

impl Application {
    pub fn handlers(&self) -> &Handlers<AppContext> {
        &self.handlers
    }

    pub fn handlers_mut(&mut self) -> &mut Handlers<AppContext> {
        &mut self.handlers
    }

    /// True between `AppDidBecomeActive` and `AppWillResignActive`.
    pub fn is_active(&self) -> bool {
        self.active
    }
}
