//! Cairn demo.
//!
//! Opens one window on the headless display, lays out a small stack of
//! blocks, and replays a scripted input session: hover, click, resize, close.
//! Set `RUST_LOG=cairn=debug` to watch the toolkit work.

use std::rc::Rc;

use anyhow::Context;
use cairn::block::LineBorder;
use cairn::shell::NativeEvent;
use cairn::{
    AppConfig, AppContext, Block, BlockId, Color, EventKind, HeadlessBackend, HeadlessHandle,
    Insets, Point, Rect, Size, SizeHint, Sizes, StackData, StackLayout, Target, WindowId,
};
use tracing_subscriber::EnvFilter;

fn row(height: f32) -> impl Fn(&Block, SizeHint) -> Sizes {
    move |_, _| {
        Sizes::new(
            Size::new(0.0, height),
            Size::new(200.0, height),
            Size::new(f32::INFINITY, height),
        )
    }
}

/// Header, growing body, and a button along the bottom.
fn build(cx: &mut AppContext, window: WindowId) -> Option<BlockId> {
    let content = cx.window(window)?.content();
    let blocks = cx.blocks_mut();
    blocks.set_layout(content, Some(Rc::new(StackLayout::vertical(8.0))));

    let header = blocks.insert(
        Block::new()
            .with_background(Color::rgb(0.2, 0.3, 0.5))
            .with_sizer(row(40.0)),
    );
    let body = blocks.insert(
        Block::new()
            .with_background(Color::WHITE)
            .with_border(LineBorder::new(Color::BLACK, Insets::uniform(1.0)))
            .with_layout_data(StackData::grow(1.0)),
    );
    let button = blocks.insert(
        Block::new()
            .with_background(Color::rgb(0.8, 0.8, 0.8))
            .with_sizer(row(30.0))
            .focusable(true),
    );
    for child in [header, body, button] {
        blocks.add_child(content, child);
    }

    cx.on(Target::Block(header), EventKind::MouseEntered, |_, _| {
        tracing::info!("pointer entered header");
    });
    cx.on(Target::Block(button), EventKind::MouseUp, |_, event| {
        if let Some(m) = event.mouse() {
            tracing::info!(at = ?m.position, "button clicked");
        }
        event.finish();
    });
    Some(button)
}

/// Queue the input session against the window.
fn script(cx: &AppContext, display: &HeadlessHandle, window: WindowId, button: BlockId) {
    let Some(native) = cx.window(window).map(|w| w.handle()) else {
        return;
    };
    let click = cx.blocks().to_window(button, Point::new(10.0, 10.0));

    display.post(NativeEvent::Motion {
        window: native,
        state: 0,
        position: Point::new(20.0, 20.0),
    });
    display.post(NativeEvent::ButtonPress {
        window: native,
        button: 1,
        state: 0,
        position: click,
    });
    display.post(NativeEvent::ButtonRelease {
        window: native,
        button: 1,
        state: 0,
        position: click,
    });
    display.post(NativeEvent::Configure {
        window: native,
        frame: Rect::new(0.0, 0.0, 800.0, 600.0),
    });
    display.request_close(native);
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting cairn demo");

    let backend = HeadlessBackend::new();
    let display = backend.handle();
    let config = AppConfig {
        name: String::from("Cairn Demo"),
        window_title: String::from("Cairn"),
        ..AppConfig::default()
    };
    let mut cx = AppContext::new(config, backend);

    cx.on(Target::Application, EventKind::AppWillFinishStartup, move |cx, _| {
        let window = match cx.new_window(cx.window_options()) {
            Ok(window) => window,
            Err(e) => {
                tracing::error!(error = %e, "window creation failed");
                return;
            }
        };
        if let Some(button) = build(cx, window) {
            // The click lands on the button only once layout has run.
            cx.after_event();
            script(cx, &display, window, button);
        }
        let _ = cx.show_window(window);
        cx.on(Target::Window(window), EventKind::WindowResized, move |cx, _| {
            tracing::info!(frame = ?cx.frame(window), "window resized");
        });
    });
    cx.on(Target::Application, EventKind::AppWillQuit, |cx, _| {
        tracing::info!(app = %cx.app_name(), "quitting");
    });

    cairn::run(&mut cx).context("failed to run the event loop")?;
    tracing::info!("done");
    Ok(())
}
