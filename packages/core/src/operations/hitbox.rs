//! Pointer-to-operation classification
//!
//! [`classify_drop`] maps a pointer position over a target's bounding box to
//! the drop operation it implies. It knows nothing about rendering: callers
//! pass plain geometry, which keeps the policy testable with synthetic
//! rectangles.
//!
//! The default [`ThreeZoneHitbox`] splits the box vertically into a top band
//! (reorder before), a middle band (combine) and a bottom band (reorder after).
//! With an edge fraction of `0.5` the middle band disappears and the box
//! behaves like a plain before/after list row.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.top()
            && point.y <= self.bottom()
    }

    /// Shrink by `amount` on every side (never below zero size)
    pub fn inset(&self, amount: f32) -> Rect {
        Rect {
            x: self.x + amount,
            y: self.y + amount,
            width: (self.width - 2.0 * amount).max(0.0),
            height: (self.height - 2.0 * amount).max(0.0),
        }
    }
}

/// Operation implied by the pointer position over a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DropOperation {
    /// Become the last child of the target
    Combine,
    ReorderBefore,
    ReorderAfter,
}

/// Strategy for turning pointer geometry into a [`DropOperation`]
pub trait HitboxPolicy: Send + Sync {
    fn classify(&self, pointer: Point, bounds: Rect) -> DropOperation;
}

/// Top band → before, middle band → combine, bottom band → after
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThreeZoneHitbox {
    /// Height of each edge band as a fraction of the box, in `(0, 0.5]`
    pub edge_fraction: f32,
}

impl ThreeZoneHitbox {
    pub const DEFAULT_EDGE_FRACTION: f32 = 1.0 / 3.0;

    pub fn new(edge_fraction: f32) -> Self {
        Self { edge_fraction }
    }

    /// Before/after only, split at the midline
    pub fn half_split() -> Self {
        Self::new(0.5)
    }
}

impl Default for ThreeZoneHitbox {
    fn default() -> Self {
        Self::new(Self::DEFAULT_EDGE_FRACTION)
    }
}

impl HitboxPolicy for ThreeZoneHitbox {
    fn classify(&self, pointer: Point, bounds: Rect) -> DropOperation {
        if bounds.height <= 0.0 {
            return DropOperation::ReorderAfter;
        }
        // Pointers slightly outside the box still belong to the nearest band
        let offset = (pointer.y - bounds.top()).clamp(0.0, bounds.height);
        let edge = bounds.height * self.edge_fraction.clamp(f32::EPSILON, 0.5);

        if offset < edge {
            DropOperation::ReorderBefore
        } else if offset >= bounds.height - edge {
            DropOperation::ReorderAfter
        } else {
            DropOperation::Combine
        }
    }
}

/// Classify a pointer over `target_bounds` with `policy`
pub fn classify_drop(pointer: Point, target_bounds: Rect, policy: &dyn HitboxPolicy) -> DropOperation {
    policy.classify(pointer, target_bounds)
}
