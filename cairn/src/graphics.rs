//! The drawing capability the paint pipeline drives.
//!
//! The core never draws pixels itself. It hands a `Graphics` to each block's
//! border and paint capability, after clipping and translating it so the block
//! sees its own local coordinate space.

use crate::primitives::{Color, Point, Rect};

/// Opaque drawing surface, supplied by the backend for one paint pass.
pub trait Graphics {
    /// Push the current translation and clip.
    fn save(&mut self);

    /// Pop the translation and clip pushed by the matching `save`.
    fn restore(&mut self);

    /// Intersect the clip with `rect`, in current coordinates.
    fn clip_rect(&mut self, rect: Rect);

    /// Move the coordinate origin.
    fn translate(&mut self, offset: Point);

    fn fill_rect(&mut self, rect: Rect, color: Color);

    fn stroke_rect(&mut self, rect: Rect, color: Color, width: f32);

    fn draw_text(&mut self, text: &str, at: Point, color: Color);
}

/// One recorded drawing command, in device coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Clip(Rect),
    FillRect { rect: Rect, color: Color },
    StrokeRect { rect: Rect, color: Color, width: f32 },
    Text { text: String, at: Point, color: Color },
}

#[derive(Debug, Clone, Copy)]
struct State {
    offset: Point,
    clip: Option<Rect>,
}

/// A `Graphics` that records commands instead of drawing them.
///
/// Translations are applied as commands are recorded, so every `DrawOp`
/// holds device coordinates. Used by the headless backend and by tests.
#[derive(Debug, Clone)]
pub struct RecordingGraphics {
    ops: Vec<DrawOp>,
    state: State,
    stack: Vec<State>,
}

impl RecordingGraphics {
    pub fn new() -> Self {
        Self {
            ops: Vec::new(),
            state: State {
                offset: Point::ORIGIN,
                clip: None,
            },
            stack: Vec::new(),
        }
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Drain the recorded commands and reset the transform state.
    pub fn take_ops(&mut self) -> Vec<DrawOp> {
        self.stack.clear();
        self.state = State {
            offset: Point::ORIGIN,
            clip: None,
        };
        std::mem::take(&mut self.ops)
    }

    /// Rectangles filled so far, in device coordinates.
    pub fn fills(&self) -> Vec<Rect> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::FillRect { rect, .. } => Some(*rect),
                _ => None,
            })
            .collect()
    }

    /// The current clip in device coordinates, `None` if unclipped.
    pub fn current_clip(&self) -> Option<Rect> {
        self.state.clip
    }
}

impl Default for RecordingGraphics {
    fn default() -> Self {
        Self::new()
    }
}

impl Graphics for RecordingGraphics {
    fn save(&mut self) {
        self.stack.push(self.state);
    }

    fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }

    fn clip_rect(&mut self, rect: Rect) {
        let device = rect.translate(self.state.offset);
        let clip = match self.state.clip {
            Some(current) => current.intersection(&device).unwrap_or(Rect::ZERO),
            None => device,
        };
        self.state.clip = Some(clip);
        self.ops.push(DrawOp::Clip(clip));
    }

    fn translate(&mut self, offset: Point) {
        self.state.offset += offset;
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.ops.push(DrawOp::FillRect {
            rect: rect.translate(self.state.offset),
            color,
        });
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, width: f32) {
        self.ops.push(DrawOp::StrokeRect {
            rect: rect.translate(self.state.offset),
            color,
            width,
        });
    }

    fn draw_text(&mut self, text: &str, at: Point, color: Color) {
        self.ops.push(DrawOp::Text {
            text: text.to_owned(),
            at: at + self.state.offset,
            color,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translation_applies_to_recorded_ops() {
        let mut g = RecordingGraphics::new();
        g.translate(Point::new(10.0, 5.0));
        g.fill_rect(Rect::new(0.0, 0.0, 4.0, 4.0), Color::BLACK);
        assert_eq!(g.fills(), vec![Rect::new(10.0, 5.0, 4.0, 4.0)]);
    }

    #[test]
    fn restore_undoes_translation_and_clip() {
        let mut g = RecordingGraphics::new();
        g.save();
        g.translate(Point::new(3.0, 3.0));
        g.clip_rect(Rect::new(0.0, 0.0, 2.0, 2.0));
        assert_eq!(g.current_clip(), Some(Rect::new(3.0, 3.0, 2.0, 2.0)));
        g.restore();
        assert_eq!(g.current_clip(), None);
        g.fill_rect(Rect::new(0.0, 0.0, 1.0, 1.0), Color::WHITE);
        assert_eq!(g.fills().last(), Some(&Rect::new(0.0, 0.0, 1.0, 1.0)));
    }

    #[test]
    fn nested_clips_intersect() {
        let mut g = RecordingGraphics::new();
        g.clip_rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        g.clip_rect(Rect::new(5.0, 5.0, 10.0, 10.0));
        assert_eq!(g.current_clip(), Some(Rect::new(5.0, 5.0, 5.0, 5.0)));
    }
}
