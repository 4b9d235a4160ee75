//! Integration tests for the event loop.
//!
//! Every test drives a real `AppContext` through the headless backend: native
//! events are posted on the display handle and pumped through the loop, and
//! the results are read back from the context and the display state.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use cairn::block::{PointerTarget, TooltipSource};
use cairn::event::keys;
use cairn::shell::{state, HeadlessBackend, HeadlessHandle, NativeEvent, NativeHandle};
use cairn::{
    AppConfig, AppContext, Block, BlockId, BlockTree, Color, Error, Event, EventKind, EventLoop,
    Payload, Point, QuitResponse, QuitState, Rect, Size, SizeHint, Sizes, Target, WindowId,
    WindowOptions,
};

/// A running application with one window, opened during startup.
struct LoopTest {
    cx: AppContext,
    display: HeadlessHandle,
    event_loop: EventLoop,
    window: WindowId,
}

impl LoopTest {
    fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    fn with_config(config: AppConfig) -> Self {
        let backend = HeadlessBackend::new().with_idle_timeout(Some(Duration::from_millis(200)));
        let display = backend.handle();
        let mut cx = AppContext::new(config, backend);

        let opened = Rc::new(Cell::new(None));
        let slot = opened.clone();
        cx.on(Target::Application, EventKind::AppWillFinishStartup, move |cx, _| {
            let window = cx.new_window(cx.window_options()).expect("window");
            cx.show_window(window).expect("show");
            slot.set(Some(window));
        });

        let mut event_loop = EventLoop::new();
        event_loop.start(&mut cx).expect("display");
        let window = opened.get().expect("window opened during startup");

        let mut test = Self {
            cx,
            display,
            event_loop,
            window,
        };
        test.pump();
        test
    }

    /// Handle everything already queued.
    fn pump(&mut self) {
        while self.display.queued() > 0 {
            if !self.event_loop.turn(&mut self.cx) {
                break;
            }
        }
    }

    /// Keep handling events as they arrive, for timer-driven behavior.
    fn wait(&mut self, duration: Duration) {
        let deadline = Instant::now() + duration;
        while Instant::now() < deadline && self.cx.is_running() {
            if self.display.queued() > 0 {
                self.event_loop.turn(&mut self.cx);
            } else {
                thread::sleep(Duration::from_millis(2));
            }
        }
    }

    fn post(&mut self, event: NativeEvent) {
        self.display.post(event);
        self.pump();
    }

    fn native(&self, window: WindowId) -> NativeHandle {
        self.cx.window(window).expect("window").handle()
    }

    fn content(&self, window: WindowId) -> BlockId {
        self.cx.window(window).expect("window").content()
    }

    fn add_block(&mut self, window: WindowId, bounds: Rect) -> BlockId {
        let content = self.content(window);
        let block = self.cx.blocks_mut().insert(Block::new().with_bounds(bounds));
        self.cx.blocks_mut().add_child(content, block);
        self.cx.after_event();
        self.pump();
        block
    }

    fn count(&mut self, target: Target, kind: EventKind) -> Rc<Cell<usize>> {
        let counter = Rc::new(Cell::new(0));
        let c = counter.clone();
        self.cx.on(target, kind, move |_, _| c.set(c.get() + 1));
        counter
    }
}

fn press(window: NativeHandle, position: Point) -> NativeEvent {
    NativeEvent::ButtonPress {
        window,
        button: 1,
        state: 0,
        position,
    }
}

fn release(window: NativeHandle, position: Point) -> NativeEvent {
    NativeEvent::ButtonRelease {
        window,
        button: 1,
        state: 0,
        position,
    }
}

fn motion(window: NativeHandle, position: Point) -> NativeEvent {
    NativeEvent::Motion {
        window,
        state: 0,
        position,
    }
}

/// Motion with the primary button held.
fn drag(window: NativeHandle, position: Point) -> NativeEvent {
    NativeEvent::Motion {
        window,
        state: state::BUTTON1,
        position,
    }
}

// =============================================================================
// Startup
// =============================================================================

#[test]
fn unavailable_display_is_fatal() {
    let mut cx = AppContext::new(AppConfig::default(), HeadlessBackend::unavailable());
    let started = Rc::new(Cell::new(false));
    let flag = started.clone();
    cx.on(Target::Application, EventKind::AppWillFinishStartup, move |_, _| flag.set(true));

    let result = cairn::run(&mut cx);
    assert!(matches!(result, Err(Error::DisplayUnavailable(_))));
    assert!(!started.get());
    assert!(!cx.is_running());
}

#[test]
fn startup_without_windows_quits() {
    let backend = HeadlessBackend::new();
    let display = backend.handle();
    let mut cx = AppContext::new(AppConfig::default(), backend);

    let order = Rc::new(RefCell::new(Vec::new()));
    for kind in [
        EventKind::AppWillFinishStartup,
        EventKind::AppDidFinishStartup,
        EventKind::AppWillQuit,
    ] {
        let order = order.clone();
        cx.on(Target::Application, kind, move |_, _| order.borrow_mut().push(kind));
    }

    cairn::run(&mut cx).expect("run");
    assert_eq!(
        *order.borrow(),
        vec![
            EventKind::AppWillFinishStartup,
            EventKind::AppDidFinishStartup,
            EventKind::AppWillQuit,
        ]
    );
    assert_eq!(cx.quit_state(), QuitState::Finished);
    let state = display.state();
    assert_eq!((state.opens, state.closes), (1, 1));
}

#[test]
fn default_display_waits_for_delayed_tasks() {
    let mut cx = AppContext::new(AppConfig::default(), HeadlessBackend::new());
    let ran = Rc::new(Cell::new(false));
    let will_quit = Rc::new(Cell::new(0));

    let r = ran.clone();
    cx.on(Target::Application, EventKind::AppDidFinishStartup, move |cx, _| {
        let window = cx.new_window(cx.window_options()).expect("window");
        cx.show_window(window).expect("show");
        let r = r.clone();
        cx.invoke_after(None, Some(Duration::from_millis(600)), move |cx| {
            r.set(cx.windows().len() == 1);
            cx.close_window(window);
        });
    });
    let q = will_quit.clone();
    cx.on(Target::Application, EventKind::AppWillQuit, move |_, _| q.set(q.get() + 1));

    let started = Instant::now();
    cairn::run(&mut cx).expect("run");

    assert!(ran.get());
    assert!(started.elapsed() >= Duration::from_millis(600));
    assert!(cx.windows().is_empty());
    assert_eq!(will_quit.get(), 1);
    assert_eq!(cx.quit_state(), QuitState::Finished);
}

#[test]
fn shown_window_is_mapped_and_painted() {
    let test = LoopTest::new();
    let native = test.native(test.window);
    let window = test.display.window(native).expect("native window");
    assert!(window.mapped);
    assert_eq!(window.title, "Untitled");

    let state = test.display.state();
    let paints = state.paints_for(native);
    assert_eq!(paints.len(), 1);
    assert_eq!(paints[0].clip, Rect::new(0.0, 0.0, 640.0, 480.0));
}

// =============================================================================
// Repaint
// =============================================================================

#[test]
fn moving_a_block_repaints_old_and_new_area() {
    let mut test = LoopTest::new();
    let window = test.window;
    let block = test.add_block(window, Rect::new(10.0, 10.0, 20.0, 20.0));
    test.cx.blocks_mut().set_background(block, Color::BLACK);
    test.cx.after_event();
    test.pump();
    let native = test.native(window);
    let before = test.display.state().repaint_requests.len();

    test.cx.blocks_mut().set_bounds(block, Rect::new(50.0, 50.0, 20.0, 20.0));
    test.cx.after_event();
    test.pump();

    let state = test.display.state();
    assert_eq!(state.repaint_requests.len(), before + 1);
    assert_eq!(
        state.repaint_requests.last(),
        Some(&(native, Rect::new(10.0, 10.0, 60.0, 60.0)))
    );
    let last = state.painted.last().expect("paint pass");
    assert_eq!(last.clip, Rect::new(10.0, 10.0, 60.0, 60.0));
    assert!(last.fills().contains(&Rect::new(50.0, 50.0, 20.0, 20.0)));
}

#[test]
fn unchanged_bounds_request_nothing() {
    let mut test = LoopTest::new();
    let block = test.add_block(test.window, Rect::new(10.0, 10.0, 20.0, 20.0));
    let before = test.display.state().repaint_requests.len();

    test.cx.blocks_mut().set_bounds(block, Rect::new(10.0, 10.0, 20.0, 20.0));
    test.cx.after_event();
    assert_eq!(test.display.state().repaint_requests.len(), before);
}

// =============================================================================
// Configure
// =============================================================================

#[test]
fn configure_bursts_are_coalesced() {
    let mut test = LoopTest::new();
    let window = test.window;
    let native = test.native(window);
    let resized = test.count(Target::Window(window), EventKind::WindowResized);

    for (w, h) in [(300.0, 200.0), (400.0, 300.0), (500.0, 400.0)] {
        test.display.post(NativeEvent::Configure {
            window: native,
            frame: Rect::new(0.0, 0.0, w, h),
        });
    }
    test.pump();

    assert_eq!(resized.get(), 1);
    assert_eq!(test.cx.frame(window), Some(Rect::new(0.0, 0.0, 500.0, 400.0)));
    let content = test.content(window);
    assert_eq!(
        test.cx.blocks().get(content).map(|b| b.size()),
        Some(Size::new(500.0, 400.0))
    );

    let surface = test.cx.window(window).expect("window").surface();
    let state = test.display.state();
    assert_eq!(state.surface_sizes.get(&surface), Some(&Size::new(500.0, 400.0)));
    assert_eq!(
        state.repaint_requests.last(),
        Some(&(native, Rect::new(0.0, 0.0, 500.0, 400.0)))
    );
}

#[test]
fn moving_a_window_repaints_nothing() {
    let mut test = LoopTest::new();
    let window = test.window;
    let native = test.native(window);
    let resized = test.count(Target::Window(window), EventKind::WindowResized);
    let frame = test.cx.frame(window).expect("frame");
    let (requests, paints) = {
        let state = test.display.state();
        (state.repaint_requests.len(), state.painted.len())
    };

    let moved = Rect::new(frame.x + 30.0, frame.y + 40.0, frame.width, frame.height);
    test.post(NativeEvent::Configure {
        window: native,
        frame: moved,
    });

    assert_eq!(resized.get(), 1);
    assert_eq!(test.cx.frame(window), Some(moved));
    let state = test.display.state();
    assert_eq!(state.repaint_requests.len(), requests);
    assert_eq!(state.painted.len(), paints);
}

#[test]
fn live_resize_is_reported_per_window() {
    let mut test = LoopTest::new();
    let window = test.window;
    let block = test.add_block(window, Rect::new(0.0, 0.0, 10.0, 10.0));
    let detached = test.cx.blocks_mut().insert(Block::new());

    assert!(!test.cx.in_live_resize(block));
    test.cx.set_live_resize(window, true);
    assert!(test.cx.in_live_resize(block));
    assert!(test.cx.in_live_resize(test.content(window)));
    assert!(!test.cx.in_live_resize(detached));
    test.cx.set_live_resize(window, false);
    assert!(!test.cx.in_live_resize(block));
}

// =============================================================================
// Expose
// =============================================================================

#[test]
fn expose_burst_paints_once_with_union_clip() {
    let mut test = LoopTest::new();
    let native = test.native(test.window);
    let before = test.display.state().paints_for(native).len();

    for rect in [
        Rect::new(0.0, 0.0, 10.0, 10.0),
        Rect::new(50.0, 50.0, 10.0, 10.0),
        Rect::new(20.0, 0.0, 5.0, 5.0),
    ] {
        test.display.post(NativeEvent::Expose {
            window: native,
            rect,
        });
    }
    test.pump();

    let state = test.display.state();
    let paints = state.paints_for(native);
    assert_eq!(paints.len(), before + 1);
    assert_eq!(paints[before].clip, Rect::new(0.0, 0.0, 60.0, 60.0));
}

// =============================================================================
// Activation
// =============================================================================

#[test]
fn focus_changes_notify_activation_once() {
    let mut test = LoopTest::new();
    let native = test.native(test.window);
    let order = Rc::new(RefCell::new(Vec::new()));
    for kind in [
        EventKind::AppWillBecomeActive,
        EventKind::AppDidBecomeActive,
        EventKind::AppWillResignActive,
        EventKind::AppDidResignActive,
    ] {
        let order = order.clone();
        test.cx.on(Target::Application, kind, move |cx, _| {
            order.borrow_mut().push((kind, cx.application().is_active()));
        });
    }

    test.post(NativeEvent::FocusIn { window: native });
    test.post(NativeEvent::FocusIn { window: native });
    assert!(test.cx.application().is_active());
    test.post(NativeEvent::FocusOut { window: native });
    test.post(NativeEvent::FocusOut { window: native });
    assert!(!test.cx.application().is_active());

    assert_eq!(
        *order.borrow(),
        vec![
            (EventKind::AppWillBecomeActive, false),
            (EventKind::AppDidBecomeActive, true),
            (EventKind::AppWillResignActive, true),
            (EventKind::AppDidResignActive, false),
        ]
    );
}

// =============================================================================
// Unknown windows
// =============================================================================

#[test]
fn events_for_unknown_windows_are_dropped() {
    let mut test = LoopTest::new();
    let stranger = NativeHandle(999);
    let downs = test.count(Target::Application, EventKind::MouseDown);

    test.post(press(stranger, Point::new(1.0, 1.0)));
    test.post(NativeEvent::Destroy { window: stranger });

    assert_eq!(downs.get(), 0);
    assert!(test.cx.is_running());
    assert_eq!(test.cx.windows().len(), 1);
}

// =============================================================================
// Close and quit
// =============================================================================

#[test]
fn double_close_releases_once() {
    let mut test = LoopTest::with_config(AppConfig {
        quit_after_last_window_closed: false,
        ..AppConfig::default()
    });
    let window = test.window;
    let native = test.native(window);
    let closed = test.count(Target::Window(window), EventKind::WindowClosed);

    assert!(test.cx.close_window(window));
    assert!(!test.cx.close_window(window));
    test.pump();

    assert_eq!(closed.get(), 1);
    assert_eq!(test.display.state().destroyed, vec![native]);
    assert!(test.cx.is_running());
}

#[test]
fn window_manager_close_quits_after_last_window() {
    let mut test = LoopTest::new();
    let window = test.window;
    let native = test.native(window);
    let closed = test.count(Target::Window(window), EventKind::WindowClosed);
    let will_quit = test.count(Target::Application, EventKind::AppWillQuit);

    test.display.request_close(native);
    test.pump();

    assert_eq!(closed.get(), 1);
    assert_eq!(will_quit.get(), 1);
    assert_eq!(test.cx.quit_state(), QuitState::Finished);
    assert!(!test.cx.is_running());
    assert_eq!(test.display.state().closes, 1);
}

#[test]
fn last_window_policy_can_keep_running() {
    let mut test = LoopTest::new();
    let native = test.native(test.window);
    test.cx.on(Target::Application, EventKind::LastWindowClosed, |_, event| {
        event.set_quit_after_last_window(false)
    });

    test.display.request_close(native);
    test.pump();
    assert!(test.cx.windows().is_empty());
    assert!(test.cx.is_running());

    test.display.disconnect();
    assert!(!test.event_loop.turn(&mut test.cx));
    assert_eq!(test.cx.quit_state(), QuitState::Finished);
    assert_eq!(test.display.state().closes, 1);
}

#[test]
fn closing_veto_keeps_window_open() {
    let mut test = LoopTest::new();
    let window = test.window;
    let native = test.native(window);
    test.cx.on(Target::Window(window), EventKind::Closing, |_, event| event.abort_close());

    test.display.request_close(native);
    test.pump();
    assert!(test.cx.windows().contains(window));
    assert!(test.display.state().destroyed.is_empty());
}

#[test]
fn cancelled_quit_changes_nothing() {
    let mut test = LoopTest::new();
    test.cx.on(Target::Application, EventKind::QuitRequested, |_, event| {
        event.set_quit_response(QuitResponse::Cancel)
    });

    test.cx.attempt_quit();
    test.pump();
    assert_eq!(test.cx.quit_state(), QuitState::Running);
    assert!(test.cx.windows().contains(test.window));
    assert!(test.cx.is_running());
}

#[test]
fn deferred_quit_finishes_once_windows_are_gone() {
    let mut test = LoopTest::new();
    let second = test
        .cx
        .new_window(WindowOptions {
            frame: Rect::new(100.0, 0.0, 200.0, 200.0),
            ..test.cx.window_options()
        })
        .expect("window");
    test.cx.on(Target::Application, EventKind::QuitRequested, |_, event| {
        event.set_quit_response(QuitResponse::Later)
    });
    let will_quit = test.count(Target::Application, EventKind::AppWillQuit);

    test.cx.attempt_quit();
    assert_eq!(test.cx.quit_state(), QuitState::AwaitingQuit);
    assert_eq!(will_quit.get(), 0);
    assert_eq!(test.cx.windows().len(), 2);

    test.cx.app_may_quit_now(true);
    assert_eq!(will_quit.get(), 1);
    assert_eq!(test.cx.quit_state(), QuitState::Quitting);
    assert!(!test.cx.windows().contains(second));
    assert!(test.cx.is_running());

    test.pump();
    assert_eq!(test.cx.quit_state(), QuitState::Finished);
    assert!(!test.cx.is_running());
    assert_eq!(test.display.state().closes, 1);

    test.cx.app_may_quit_now(true);
    assert_eq!(will_quit.get(), 1);
}

// =============================================================================
// Pointer
// =============================================================================

#[test]
fn drag_follows_the_press_window() {
    let mut test = LoopTest::new();
    let first = test.window;
    let second = test
        .cx
        .new_window(WindowOptions {
            frame: Rect::new(100.0, 0.0, 200.0, 200.0),
            ..test.cx.window_options()
        })
        .expect("window");
    test.cx.after_event();
    test.pump();

    let log = Rc::new(RefCell::new(Vec::new()));
    for window in [first, second] {
        let content = test.content(window);
        for kind in [EventKind::MouseDown, EventKind::MouseDragged, EventKind::MouseUp] {
            let log = log.clone();
            test.cx.on(Target::Block(content), kind, move |_, event| {
                let at = event.mouse().map(|m| m.position).unwrap_or_default();
                log.borrow_mut().push((window, kind, at));
                event.finish();
            });
        }
    }

    let (a, b) = (test.native(first), test.native(second));
    test.post(press(a, Point::new(10.0, 10.0)));
    test.post(drag(b, Point::new(5.0, 5.0)));
    test.post(release(b, Point::new(6.0, 6.0)));

    assert_eq!(
        *log.borrow(),
        vec![
            (first, EventKind::MouseDown, Point::new(10.0, 10.0)),
            (first, EventKind::MouseDragged, Point::new(105.0, 5.0)),
            (first, EventKind::MouseUp, Point::new(106.0, 6.0)),
        ]
    );
}

#[test]
fn press_counts_clicks_and_reaches_deepest_block() {
    let mut test = LoopTest::new();
    let window = test.window;
    let block = test.add_block(window, Rect::new(20.0, 20.0, 40.0, 40.0));

    let clicks = Rc::new(RefCell::new(Vec::new()));
    let seen = clicks.clone();
    test.cx.on(Target::Block(block), EventKind::MouseDown, move |_, event| {
        if let Some(m) = event.mouse() {
            seen.borrow_mut().push((m.position, m.click_count));
        }
    });

    let native = test.native(window);
    for _ in 0..2 {
        test.post(press(native, Point::new(25.0, 30.0)));
        test.post(release(native, Point::new(25.0, 30.0)));
    }

    assert_eq!(
        *clicks.borrow(),
        vec![(Point::new(5.0, 10.0), 1), (Point::new(5.0, 10.0), 2)]
    );
}

#[test]
fn wheel_buttons_scroll_without_pressing() {
    let mut test = LoopTest::new();
    let window = test.window;
    let content = test.content(window);
    let deltas = Rc::new(RefCell::new(Vec::new()));
    let seen = deltas.clone();
    test.cx.on(Target::Block(content), EventKind::MouseWheel, move |_, event| {
        seen.borrow_mut().extend(event.wheel_delta());
    });
    let downs = test.count(Target::Application, EventKind::MouseDown);

    let native = test.native(window);
    for button in [4, 7] {
        test.post(NativeEvent::ButtonPress {
            window: native,
            button,
            state: state::SHIFT,
            position: Point::new(3.0, 3.0),
        });
        test.post(NativeEvent::ButtonRelease {
            window: native,
            button,
            state: state::SHIFT,
            position: Point::new(3.0, 3.0),
        });
    }

    assert_eq!(*deltas.borrow(), vec![Point::new(0.0, -1.0), Point::new(1.0, 0.0)]);
    assert_eq!(downs.get(), 0);
}

#[test]
fn buttonless_motion_ends_a_lost_drag() {
    let mut test = LoopTest::new();
    let window = test.window;
    let content = test.content(window);
    let kinds = Rc::new(RefCell::new(Vec::new()));
    for kind in [EventKind::MouseDown, EventKind::MouseDragged, EventKind::MouseMoved] {
        let kinds = kinds.clone();
        test.cx.on(Target::Block(content), kind, move |_, _| kinds.borrow_mut().push(kind));
    }

    let native = test.native(window);
    test.post(press(native, Point::new(10.0, 10.0)));
    test.post(release(NativeHandle(999), Point::new(10.0, 10.0)));
    test.post(motion(native, Point::new(12.0, 12.0)));

    assert_eq!(*kinds.borrow(), vec![EventKind::MouseDown, EventKind::MouseMoved]);
}

#[test]
fn enter_and_leave_track_the_hovered_block() {
    let mut test = LoopTest::new();
    let window = test.window;
    let content = test.content(window);
    let block = test.add_block(window, Rect::new(20.0, 20.0, 40.0, 40.0));

    let log = Rc::new(RefCell::new(Vec::new()));
    for target in [block, content] {
        for kind in [EventKind::MouseEntered, EventKind::MouseExited] {
            let log = log.clone();
            test.cx.on(Target::Block(target), kind, move |_, event| {
                let at = event.mouse().map(|m| m.position).unwrap_or_default();
                log.borrow_mut().push((target, kind, at));
            });
        }
    }

    let native = test.native(window);
    test.post(NativeEvent::Enter {
        window: native,
        state: 0,
        position: Point::new(25.0, 25.0),
    });
    test.post(motion(native, Point::new(5.0, 5.0)));
    test.post(NativeEvent::Leave {
        window: native,
        state: 0,
        position: Point::new(-1.0, 5.0),
    });

    assert_eq!(
        *log.borrow(),
        vec![
            (block, EventKind::MouseEntered, Point::new(5.0, 5.0)),
            (block, EventKind::MouseExited, Point::new(-15.0, -15.0)),
            (content, EventKind::MouseEntered, Point::new(5.0, 5.0)),
            (content, EventKind::MouseExited, Point::new(-1.0, 5.0)),
        ]
    );
}

/// Consumes presses; lets everything else through.
struct PressSink(Rc<Cell<usize>>);

impl PointerTarget for PressSink {
    fn pointer_event(&self, _cx: &mut AppContext, _block: BlockId, event: &mut Event) {
        self.0.set(self.0.get() + 1);
        if event.kind() == EventKind::MouseDown {
            event.finish();
        }
    }
}

#[test]
fn pointer_capability_runs_before_handlers() {
    let mut test = LoopTest::new();
    let window = test.window;
    let content = test.content(window);
    let seen = Rc::new(Cell::new(0));
    let block = test.cx.blocks_mut().insert(
        Block::new()
            .with_bounds(Rect::new(0.0, 0.0, 30.0, 30.0))
            .with_pointer(PressSink(seen.clone())),
    );
    test.cx.blocks_mut().add_child(content, block);
    test.cx.after_event();
    test.pump();

    let downs = test.count(Target::Block(block), EventKind::MouseDown);
    let app_downs = test.count(Target::Application, EventKind::MouseDown);
    let ups = test.count(Target::Block(block), EventKind::MouseUp);

    let native = test.native(window);
    test.post(press(native, Point::new(5.0, 5.0)));
    test.post(release(native, Point::new(5.0, 5.0)));

    assert_eq!(seen.get(), 2);
    assert_eq!((downs.get(), app_downs.get()), (0, 0));
    assert_eq!(ups.get(), 1);
}

// =============================================================================
// Keyboard
// =============================================================================

#[test]
fn tab_moves_focus_in_both_directions() {
    let mut test = LoopTest::new();
    let window = test.window;
    let content = test.content(window);
    let a = test.cx.blocks_mut().insert(Block::new().focusable(true));
    let b = test.cx.blocks_mut().insert(Block::new().focusable(true));
    test.cx.blocks_mut().add_child(content, a);
    test.cx.blocks_mut().add_child(content, b);
    let native = test.native(window);

    let tab = |state: u32| NativeEvent::KeyPress {
        window: native,
        code: keys::TAB,
        ch: Some('\t'),
        state,
        repeat: false,
    };

    test.post(tab(0));
    assert_eq!(test.cx.focused_block(window), Some(a));
    test.post(tab(0));
    assert_eq!(test.cx.focused_block(window), Some(b));
    test.post(tab(state::SHIFT));
    assert_eq!(test.cx.focused_block(window), Some(a));
    test.post(tab(state::CONTROL));
    assert_eq!(test.cx.focused_block(window), Some(a));
}

#[test]
fn handled_tab_keeps_focus() {
    let mut test = LoopTest::new();
    let window = test.window;
    let content = test.content(window);
    let a = test.cx.blocks_mut().insert(Block::new().focusable(true));
    test.cx.blocks_mut().add_child(content, a);
    test.cx.on(Target::Window(window), EventKind::KeyDown, |_, event| event.finish());

    let native = test.native(window);
    test.post(NativeEvent::KeyPress {
        window: native,
        code: keys::TAB,
        ch: Some('\t'),
        state: 0,
        repeat: false,
    });
    assert_eq!(test.cx.focused_block(window), None);
}

// =============================================================================
// Tooltips
// =============================================================================

struct Tip;

impl TooltipSource for Tip {
    fn tooltip(&self, tree: &mut BlockTree, _block: BlockId, _at: Point) -> Option<BlockId> {
        let tip = Block::new()
            .with_background(Color::TOOLTIP)
            .with_sizer(|_: &Block, _: SizeHint| Sizes::fixed(Size::new(40.0, 10.0)));
        Some(tree.insert(tip))
    }
}

fn tooltip_test() -> (LoopTest, BlockId) {
    let mut test = LoopTest::with_config(AppConfig {
        tooltip_delay: Duration::from_millis(20),
        tooltip_dismissal: Duration::from_millis(250),
        ..AppConfig::default()
    });
    let content = test.content(test.window);
    let block = test.cx.blocks_mut().insert(
        Block::new()
            .with_bounds(Rect::new(10.0, 10.0, 50.0, 20.0))
            .with_tooltip(Tip),
    );
    test.cx.blocks_mut().add_child(content, block);
    test.cx.after_event();
    test.pump();
    (test, block)
}

#[test]
fn tooltip_appears_below_the_hovered_block_then_dismisses() {
    let (mut test, _) = tooltip_test();
    let window = test.window;
    let native = test.native(window);

    test.post(motion(native, Point::new(15.0, 15.0)));
    assert!(test.cx.window(window).and_then(|w| w.tooltip()).is_none());

    test.wait(Duration::from_millis(120));
    let tip = test
        .cx
        .window(window)
        .and_then(|w| w.tooltip())
        .expect("tooltip shown");
    let bounds = test.cx.blocks().get(tip).map(|b| b.bounds()).expect("tip");
    assert_eq!(bounds.size(), Size::new(40.0, 10.0));
    assert!(bounds.y >= 30.0);

    test.wait(Duration::from_millis(400));
    assert!(test.cx.window(window).and_then(|w| w.tooltip()).is_none());
    assert!(!test.cx.blocks().contains(tip));
}

#[test]
fn stale_tooltip_request_is_ignored() {
    let (mut test, _) = tooltip_test();
    let window = test.window;
    let native = test.native(window);

    test.post(motion(native, Point::new(15.0, 15.0)));
    test.post(motion(native, Point::new(300.0, 300.0)));
    test.wait(Duration::from_millis(120));

    assert!(test.cx.window(window).and_then(|w| w.tooltip()).is_none());
}

#[test]
fn pressing_hides_pending_tooltip() {
    let (mut test, _) = tooltip_test();
    let window = test.window;
    let native = test.native(window);

    test.post(motion(native, Point::new(15.0, 15.0)));
    test.post(press(native, Point::new(15.0, 15.0)));
    test.post(release(native, Point::new(15.0, 15.0)));
    test.wait(Duration::from_millis(120));

    assert!(test.cx.window(window).and_then(|w| w.tooltip()).is_none());
}

// =============================================================================
// Deferred tasks
// =============================================================================

#[test]
fn tasks_for_closed_windows_never_run() {
    let mut test = LoopTest::with_config(AppConfig {
        quit_after_last_window_closed: false,
        ..AppConfig::default()
    });
    let window = test.window;
    let ran = Rc::new(Cell::new(0));

    let r = ran.clone();
    test.cx.invoke(Some(window), move |_| r.set(r.get() + 1));
    let r = ran.clone();
    test.cx.invoke(None, move |_| r.set(r.get() + 10));
    test.cx.close_window(window);
    test.pump();

    assert_eq!(ran.get(), 10);
}

#[test]
fn delayed_task_runs_on_the_loop() {
    let mut test = LoopTest::new();
    let ran = Rc::new(Cell::new(false));
    let r = ran.clone();
    test.cx.invoke_after(None, Some(Duration::from_millis(10)), move |cx| {
        r.set(cx.is_running())
    });

    assert!(!ran.get());
    test.wait(Duration::from_millis(100));
    assert!(ran.get());
}

#[test]
fn selection_cascades_to_the_application() {
    let mut test = LoopTest::new();
    let block = test.add_block(test.window, Rect::new(0.0, 0.0, 10.0, 10.0));
    let selected = test.count(Target::Application, EventKind::Selection);

    let event = test.cx.send(Target::Block(block), Payload::Selection);
    assert!(!event.finished());
    assert_eq!(selected.get(), 1);
}
