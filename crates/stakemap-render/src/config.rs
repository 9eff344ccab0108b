use serde::{Deserialize, Serialize};
use stakemap_core::RepresentativeOrder;

/// Layout constants, injected once when a [`crate::layout::LayoutEngine`] is built.
///
/// Values are abstract layout units; a renderer may apply its own pixel scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    pub node_width: f64,
    pub root_width: f64,
    /// Horizontal gap between boxes sharing a row.
    pub row_gap: f64,
    /// Vertical distance between consecutive levels and rows.
    pub level_gap: f64,
    pub header_width: f64,
    pub row_capacity: usize,
    /// Nominal entity box height. Realized boxes may grow when text wraps.
    pub node_height: f64,
    pub root_height: f64,
    pub header_height: f64,
    /// Root y. Negative so the root sits above everything else.
    pub root_offset_y: f64,
    pub padding: f64,
    pub representative_order: RepresentativeOrder,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: 350.0,
            root_width: 1400.0,
            row_gap: 130.0,
            level_gap: 400.0,
            header_width: 400.0,
            row_capacity: 3,
            node_height: 200.0,
            root_height: 200.0,
            header_height: 60.0,
            root_offset_y: -200.0,
            padding: 100.0,
            representative_order: RepresentativeOrder::Input,
        }
    }
}

impl LayoutConfig {
    /// Row capacity, never below one.
    pub fn capacity(&self) -> usize {
        self.row_capacity.max(1)
    }

    /// Width taken by `count` standard boxes in one row, gaps included.
    pub fn row_span(&self, count: usize) -> f64 {
        if count == 0 {
            return 0.0;
        }
        count as f64 * self.node_width + (count - 1) as f64 * self.row_gap
    }

    pub fn rows_for(&self, count: usize) -> usize {
        count.div_ceil(self.capacity())
    }
}
