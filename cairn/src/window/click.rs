//! Multi-click detection.

use std::time::{Duration, Instant};

use crate::primitives::Point;

/// Counts consecutive presses of the same button that land close together
/// in space and time.
#[derive(Debug, Clone)]
pub struct ClickTracker {
    interval: Duration,
    slop: f32,
    last: Option<(Instant, Point, u8)>,
    count: u32,
}

impl ClickTracker {
    pub fn new(interval: Duration, slop: f32) -> Self {
        Self {
            interval,
            slop,
            last: None,
            count: 0,
        }
    }

    /// Record a press at `where_` (window coordinates) and return its click count.
    pub fn press(&mut self, at: Instant, where_: Point, button: u8) -> u32 {
        let continues = self.last.is_some_and(|(when, pos, last_button)| {
            last_button == button
                && at.saturating_duration_since(when) <= self.interval
                && pos.distance(where_) <= self.slop
        });
        self.count = if continues { self.count + 1 } else { 1 };
        self.last = Some((at, where_, button));
        self.count
    }

    pub fn reset(&mut self) {
        self.last = None;
        self.count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> ClickTracker {
        ClickTracker::new(Duration::from_millis(500), 4.0)
    }

    #[test]
    fn quick_presses_count_up() {
        let mut t = tracker();
        let start = Instant::now();
        let p = Point::new(10.0, 10.0);
        assert_eq!(t.press(start, p, 0), 1);
        assert_eq!(t.press(start + Duration::from_millis(200), p, 0), 2);
        assert_eq!(t.press(start + Duration::from_millis(400), Point::new(12.0, 11.0), 0), 3);
    }

    #[test]
    fn slow_press_starts_over() {
        let mut t = tracker();
        let start = Instant::now();
        let p = Point::new(10.0, 10.0);
        t.press(start, p, 0);
        assert_eq!(t.press(start + Duration::from_millis(600), p, 0), 1);
    }

    #[test]
    fn distance_or_button_change_starts_over() {
        let mut t = tracker();
        let start = Instant::now();
        t.press(start, Point::new(10.0, 10.0), 0);
        assert_eq!(t.press(start, Point::new(30.0, 10.0), 0), 1);
        assert_eq!(t.press(start, Point::new(30.0, 10.0), 1), 1);
        t.reset();
        assert_eq!(t.press(start, Point::new(30.0, 10.0), 1), 1);
    }
}
