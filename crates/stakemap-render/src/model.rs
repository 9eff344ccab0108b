use crate::content::NodeContent;
use serde::{Deserialize, Serialize};
use stakemap_core::Membership;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Group {
    Shareholders,
    Representatives,
}

impl Group {
    pub fn header_id(self) -> &'static str {
        match self {
            Group::Shareholders => "header-shareholders",
            Group::Representatives => "header-representatives",
        }
    }

    pub fn node_id_prefix(self) -> &'static str {
        match self {
            Group::Shareholders => "shareholder",
            Group::Representatives => "representative",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Group::Shareholders => "Shareholders",
            Group::Representatives => "Legal Representatives",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    Root,
    Header(Group),
    Entity(Membership),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizeClass {
    Root,
    Header,
    Standard,
}

/// A positioned box. `x`/`y` are the top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutNode {
    pub id: String,
    /// Source entity id; `None` for group headers.
    pub entity_id: Option<String>,
    pub role: NodeRole,
    pub content: NodeContent,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub size: SizeClass,
    /// Always false: the computed position is authoritative and not user-draggable.
    pub interactive: bool,
}

impl LayoutNode {
    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeCurve {
    SmoothStep,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeStyle {
    pub curve: EdgeCurve,
    pub stroke: String,
    pub stroke_width: f64,
    pub arrow_head: bool,
    pub dashed: bool,
}

impl EdgeStyle {
    pub fn solid() -> Self {
        Self {
            curve: EdgeCurve::SmoothStep,
            stroke: "#64748b".to_string(),
            stroke_width: 2.0,
            arrow_head: true,
            dashed: false,
        }
    }

    pub fn dashed() -> Self {
        Self {
            dashed: true,
            ..Self::solid()
        }
    }
}

/// Directed parent → child connector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub style: EdgeStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiagramBounds {
    pub width: f64,
    pub height: f64,
    pub padding: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutResult {
    pub nodes: Vec<LayoutNode>,
    pub edges: Vec<LayoutEdge>,
    pub bounds: DiagramBounds,
    /// Ids of descendants classified as excluded (present in the tree, drawn nowhere).
    pub excluded: Vec<String>,
}

impl LayoutResult {
    pub fn root(&self) -> Option<&LayoutNode> {
        self.nodes.iter().find(|n| n.role == NodeRole::Root)
    }

    pub fn node(&self, id: &str) -> Option<&LayoutNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn header(&self, group: Group) -> Option<&LayoutNode> {
        self.node(group.header_id())
    }

    pub fn entities(&self, group: Group) -> impl Iterator<Item = &LayoutNode> {
        let membership = match group {
            Group::Shareholders => Membership::Shareholder,
            Group::Representatives => Membership::RepresentativeOnly,
        };
        self.nodes
            .iter()
            .filter(move |n| n.role == NodeRole::Entity(membership))
    }

    /// Top-left of the area the nodes occupy (the root usually sits at a negative y).
    pub fn origin(&self) -> (f64, f64) {
        let min_x = self.nodes.iter().map(|n| n.x).fold(f64::INFINITY, f64::min);
        let min_y = self.nodes.iter().map(|n| n.y).fold(f64::INFINITY, f64::min);
        if min_x.is_finite() && min_y.is_finite() {
            (min_x, min_y)
        } else {
            (0.0, 0.0)
        }
    }

    /// Padded diagram rectangle as `(min_x, min_y, width, height)`, e.g. for an SVG viewBox.
    pub fn view_box(&self) -> (f64, f64, f64, f64) {
        let (x, y) = self.origin();
        let half = self.bounds.padding / 2.0;
        (x - half, y - half, self.bounds.width, self.bounds.height)
    }
}
