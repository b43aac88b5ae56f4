//! Drop position indicator
//!
//! Each tree view owns exactly one [`DropIndicator`]. It only computes
//! geometry and tone; drawing is left to the host.
//!
//! | Operation      | Shape           | Placement                                  |
//! |----------------|-----------------|--------------------------------------------|
//! | combine        | dashed outline  | target bounds inset by `combine_inset`     |
//! | reorder before | line            | `before_offset` above the target's top     |
//! | reorder after  | line            | `after_offset` below the target's bottom   |
//! | drop at end    | glowing line    | top edge of the drop-at-end zone           |
//!
//! Blocked operations keep their geometry and switch to the danger tone.

use crate::config::IndicatorMetrics;
use crate::operations::{DropOperation, Rect};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum IndicatorShape {
    Line,
    DashedOutline,
    Glow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum IndicatorTone {
    Primary,
    Danger,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorStyle {
    pub rect: Rect,
    pub shape: IndicatorShape,
    pub tone: IndicatorTone,
    pub border_width: f32,
    pub corner_radius: f32,
}

#[derive(Debug, Clone)]
pub struct DropIndicator {
    metrics: IndicatorMetrics,
    current: Option<IndicatorStyle>,
}

impl DropIndicator {
    pub fn new(metrics: IndicatorMetrics) -> Self {
        Self {
            metrics,
            current: None,
        }
    }

    /// Geometry for `operation` over `target`
    pub fn layout(
        metrics: &IndicatorMetrics,
        target: Rect,
        operation: DropOperation,
        blocked: bool,
    ) -> IndicatorStyle {
        let tone = if blocked {
            IndicatorTone::Danger
        } else {
            IndicatorTone::Primary
        };
        let line = |y: f32| IndicatorStyle {
            rect: Rect::new(target.x, y, target.width, metrics.line_thickness),
            shape: IndicatorShape::Line,
            tone,
            border_width: 0.0,
            corner_radius: metrics.line_thickness,
        };

        match operation {
            DropOperation::Combine => IndicatorStyle {
                rect: target.inset(metrics.combine_inset),
                shape: IndicatorShape::DashedOutline,
                tone,
                border_width: metrics.line_thickness,
                corner_radius: metrics.outline_radius,
            },
            DropOperation::ReorderBefore => line(target.top() - metrics.before_offset),
            DropOperation::ReorderAfter => line(target.bottom() + metrics.after_offset),
        }
    }

    pub fn show(&mut self, target: Rect, operation: DropOperation, blocked: bool) {
        self.current = Some(Self::layout(&self.metrics, target, operation, blocked));
    }

    pub fn show_drop_at_end(&mut self, zone: Rect) {
        self.current = Some(IndicatorStyle {
            rect: Rect::new(zone.x, zone.top(), zone.width, self.metrics.line_thickness),
            shape: IndicatorShape::Glow,
            tone: IndicatorTone::Primary,
            border_width: 0.0,
            corner_radius: self.metrics.line_thickness,
        });
    }

    pub fn hide(&mut self) {
        self.current = None;
    }

    pub fn current(&self) -> Option<&IndicatorStyle> {
        self.current.as_ref()
    }

    pub fn is_visible(&self) -> bool {
        self.current.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> Rect {
        Rect::new(10.0, 100.0, 200.0, 32.0)
    }

    #[test]
    fn test_combine_outline_is_inset() {
        let style = DropIndicator::layout(
            &IndicatorMetrics::default(),
            target(),
            DropOperation::Combine,
            false,
        );
        assert_eq!(style.shape, IndicatorShape::DashedOutline);
        assert_eq!(style.rect, Rect::new(14.0, 104.0, 192.0, 24.0));
        assert_eq!(style.border_width, 3.0);
        assert_eq!(style.corner_radius, 8.0);
    }

    #[test]
    fn test_before_and_after_lines() {
        let metrics = IndicatorMetrics::default();
        let before = DropIndicator::layout(&metrics, target(), DropOperation::ReorderBefore, false);
        let after = DropIndicator::layout(&metrics, target(), DropOperation::ReorderAfter, false);
        assert_eq!(before.rect, Rect::new(10.0, 94.0, 200.0, 3.0));
        assert_eq!(after.rect, Rect::new(10.0, 135.0, 200.0, 3.0));
        assert_eq!(before.shape, IndicatorShape::Line);
    }

    #[test]
    fn test_blocked_uses_danger_tone() {
        let style = DropIndicator::layout(
            &IndicatorMetrics::default(),
            target(),
            DropOperation::Combine,
            true,
        );
        assert_eq!(style.tone, IndicatorTone::Danger);
    }

    #[test]
    fn test_show_and_hide() {
        let mut indicator = DropIndicator::new(IndicatorMetrics::default());
        assert!(!indicator.is_visible());
        indicator.show_drop_at_end(Rect::new(0.0, 400.0, 300.0, 40.0));
        assert_eq!(indicator.current().unwrap().shape, IndicatorShape::Glow);
        assert_eq!(indicator.current().unwrap().rect.y, 400.0);
        indicator.hide();
        assert!(indicator.current().is_none());
    }
}
