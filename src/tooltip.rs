//! Placement of the calendar day tooltip inside the viewport.
//!
//! The dashboard page applies the same rules in its inline script, with
//! `SPACING` and `MARGIN` substituted from here.

use serde::{Deserialize, Serialize};

/// Gap between the anchor and the tooltip.
pub const SPACING: f64 = 8.0;
/// Minimum distance kept from every viewport edge.
pub const MARGIN: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left && x <= self.right() && y >= self.top && y <= self.bottom()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub top: f64,
    pub left: f64,
}

/// Above the anchor when it fits, else below, else vertically centred on the
/// anchor and clamped. Always horizontally centred and clamped.
pub fn place(anchor: Rect, tip: Size, viewport: Size) -> Placement {
    let centered_left = anchor.left + anchor.width / 2.0 - tip.width / 2.0;
    let left = centered_left.max(MARGIN).min(viewport.width - tip.width - MARGIN);

    let above = anchor.top - SPACING - tip.height;
    let below = anchor.bottom() + SPACING;
    let top = if above >= MARGIN {
        above
    } else if below + tip.height <= viewport.height - MARGIN {
        below
    } else {
        (anchor.top - tip.height / 2.0)
            .max(MARGIN)
            .min(viewport.height - tip.height - MARGIN)
    };

    Placement { top, left }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TooltipEvent {
    Scroll,
    Resize,
    PointerDown { x: f64, y: f64 },
}

/// Whether an event closes a tooltip currently drawn at `tooltip`.
pub fn dismisses(event: TooltipEvent, tooltip: Rect) -> bool {
    match event {
        TooltipEvent::Scroll | TooltipEvent::Resize => true,
        TooltipEvent::PointerDown { x, y } => !tooltip.contains(x, y),
    }
}
