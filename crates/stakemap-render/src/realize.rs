//! Realized node geometry.
//!
//! The layout assigns nominal heights. Once text is wrapped into the fixed box width a box may
//! need to grow, so anything that draws or captures the diagram works from these realized boxes.

use crate::model::{LayoutNode, LayoutResult, SizeClass};
use crate::text::{TextMeasurer, TextStyle, wrap_text_lines};
use serde::{Deserialize, Serialize};
use stakemap_core::geom::{Rect, rect};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeTextStyle {
    pub title: TextStyle,
    pub root_title: TextStyle,
    pub detail: TextStyle,
    pub padding_x: f64,
    pub padding_y: f64,
    /// Space between the title block and the detail lines.
    pub title_gap: f64,
}

impl Default for NodeTextStyle {
    fn default() -> Self {
        Self {
            title: TextStyle::bold(18.0),
            root_title: TextStyle::bold(28.0),
            detail: TextStyle::default(),
            padding_x: 16.0,
            padding_y: 14.0,
            title_gap: 8.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealizedNode {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub title_lines: Vec<String>,
    pub detail_lines: Vec<String>,
    pub title_line_height: f64,
    pub detail_line_height: f64,
}

impl RealizedNode {
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn rect(&self) -> Rect {
        rect(self.x, self.y, self.width, self.height)
    }
}

/// Realized `(width, height)` of one box: the width is fixed, the height grows with wrapped text.
pub fn measure_node(
    node: &LayoutNode,
    measurer: &dyn TextMeasurer,
    style: &NodeTextStyle,
) -> (f64, f64) {
    let realized = realize_node(node, measurer, style);
    (realized.width, realized.height)
}

pub fn realize_node(
    node: &LayoutNode,
    measurer: &dyn TextMeasurer,
    style: &NodeTextStyle,
) -> RealizedNode {
    let title_style = match node.size {
        SizeClass::Root => &style.root_title,
        SizeClass::Header | SizeClass::Standard => &style.title,
    };
    let inner_width = (node.width - 2.0 * style.padding_x).max(1.0);

    let title_lines = wrap_text_lines(node.content.title(), measurer, title_style, Some(inner_width));
    let mut detail_lines = Vec::new();
    for line in node.content.detail_lines() {
        detail_lines.extend(wrap_text_lines(&line, measurer, &style.detail, Some(inner_width)));
    }

    let title_line_height = measurer.line_height(title_style);
    let detail_line_height = measurer.line_height(&style.detail);
    let mut content_height = 2.0 * style.padding_y + title_lines.len() as f64 * title_line_height;
    if !detail_lines.is_empty() {
        content_height += style.title_gap + detail_lines.len() as f64 * detail_line_height;
    }

    RealizedNode {
        id: node.id.clone(),
        x: node.x,
        y: node.y,
        width: node.width,
        height: node.height.max(content_height),
        title_lines,
        detail_lines,
        title_line_height,
        detail_line_height,
    }
}

pub fn realize_nodes(
    layout: &LayoutResult,
    measurer: &dyn TextMeasurer,
    style: &NodeTextStyle,
) -> Vec<RealizedNode> {
    layout
        .nodes
        .iter()
        .map(|n| realize_node(n, measurer, style))
        .collect()
}
