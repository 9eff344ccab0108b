//! Two-tier ownership layout.
//!
//! The root sits alone on top. Below it come up to two groups, each introduced by a header box:
//! shareholders first, then legal representatives. Each group wraps into rows of at most
//! `row_capacity` boxes, every row centered on the root.

use crate::config::LayoutConfig;
use crate::content::{entity_content, header_content, root_content};
use crate::model::{
    DiagramBounds, EdgeStyle, Group, LayoutEdge, LayoutNode, LayoutResult, NodeRole, SizeClass,
};
use stakemap_core::{ClassifiedEntity, ClassifiedTree, OwnershipTree, classify_tree};

#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    config: LayoutConfig,
}

/// Where a placed group ended, so the next group can start below it.
struct GroupPlacement {
    header_id: &'static str,
    deepest_row_y: f64,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Lays out the root and its direct descendants.
    ///
    /// Pure: the same tree always produces the same coordinates. Nothing is cached between
    /// calls.
    pub fn layout(&self, tree: &OwnershipTree) -> LayoutResult {
        let classified = classify_tree(tree, self.config.representative_order);
        self.layout_classified(tree, &classified)
    }

    pub fn layout_classified(
        &self,
        tree: &OwnershipTree,
        classified: &ClassifiedTree,
    ) -> LayoutResult {
        let cfg = &self.config;
        let cap = cfg.capacity();
        let totals = &tree.share_class_totals;

        let widest_row = classified
            .shareholders
            .len()
            .min(cap)
            .max(classified.representatives.len().min(cap));
        let total_width = cfg.root_width.max(cfg.row_span(widest_row));
        let center_x = total_width / 2.0;

        let mut nodes: Vec<LayoutNode> = Vec::with_capacity(classified.placed_count() + 3);
        let mut edges: Vec<LayoutEdge> = Vec::with_capacity(classified.placed_count() + 2);

        let root = &tree.root;
        let root_y = cfg.root_offset_y;
        nodes.push(LayoutNode {
            id: root.id.clone(),
            entity_id: Some(root.id.clone()),
            role: NodeRole::Root,
            content: root_content(root, totals),
            x: center_x - cfg.root_width / 2.0,
            y: root_y,
            width: cfg.root_width,
            height: cfg.root_height,
            size: SizeClass::Root,
            interactive: false,
        });
        let mut deepest_bottom = root_y + cfg.root_height;

        let shareholders = self.place_group(
            Group::Shareholders,
            &classified.shareholders,
            &root.id,
            root_y + cfg.level_gap,
            center_x,
            tree,
            &mut nodes,
            &mut edges,
        );

        let (rep_parent, rep_header_y) = match &shareholders {
            Some(placed) => (placed.header_id, placed.deepest_row_y + cfg.level_gap),
            None => (root.id.as_str(), root_y + cfg.level_gap),
        };
        let representatives = self.place_group(
            Group::Representatives,
            &classified.representatives,
            rep_parent,
            rep_header_y,
            center_x,
            tree,
            &mut nodes,
            &mut edges,
        );

        for placed in shareholders.iter().chain(representatives.iter()) {
            deepest_bottom = deepest_bottom.max(placed.deepest_row_y + cfg.node_height);
        }

        let bounds = DiagramBounds {
            width: total_width + cfg.padding,
            height: (deepest_bottom - root_y) + cfg.padding,
            padding: cfg.padding,
        };

        tracing::debug!(
            root = %root.id,
            nodes = nodes.len(),
            edges = edges.len(),
            width = bounds.width,
            height = bounds.height,
            "ownership layout computed"
        );

        LayoutResult {
            nodes,
            edges,
            bounds,
            excluded: classified
                .excluded
                .iter()
                .map(|e| e.node.id.clone())
                .collect(),
        }
    }

    /// Places one group's header and rows. Returns `None` (and places nothing) for an empty
    /// group.
    #[allow(clippy::too_many_arguments)]
    fn place_group(
        &self,
        group: Group,
        members: &[ClassifiedEntity],
        parent_id: &str,
        header_y: f64,
        center_x: f64,
        tree: &OwnershipTree,
        nodes: &mut Vec<LayoutNode>,
        edges: &mut Vec<LayoutEdge>,
    ) -> Option<GroupPlacement> {
        if members.is_empty() {
            return None;
        }
        let cfg = &self.config;
        let cap = cfg.capacity();
        let header_id = group.header_id();
        let edge_style = match group {
            Group::Shareholders => EdgeStyle::solid(),
            Group::Representatives => EdgeStyle::dashed(),
        };

        nodes.push(LayoutNode {
            id: header_id.to_string(),
            entity_id: None,
            role: NodeRole::Header(group),
            content: header_content(group.label(), members.len()),
            x: center_x - cfg.header_width / 2.0,
            y: header_y,
            width: cfg.header_width,
            height: cfg.header_height,
            size: SizeClass::Header,
            interactive: false,
        });
        edges.push(edge(parent_id, header_id, edge_style.clone()));

        let mut deepest_row_y = header_y;
        for (i, member) in members.iter().enumerate() {
            let row = i / cap;
            let col = i % cap;
            let in_row = cap.min(members.len() - row * cap);
            let row_left = center_x - cfg.row_span(in_row) / 2.0;
            let x = row_left + col as f64 * (cfg.node_width + cfg.row_gap);
            let y = header_y + cfg.level_gap * (1 + row) as f64;
            deepest_row_y = deepest_row_y.max(y);

            let id = format!("{}-{i}", group.node_id_prefix());
            nodes.push(LayoutNode {
                id: id.clone(),
                entity_id: Some(member.node.id.clone()),
                role: NodeRole::Entity(member.membership),
                content: entity_content(&member.node, member.membership, &tree.share_class_totals),
                x,
                y,
                width: cfg.node_width,
                height: cfg.node_height,
                size: SizeClass::Standard,
                interactive: false,
            });
            edges.push(edge(header_id, &id, edge_style.clone()));
        }

        Some(GroupPlacement {
            header_id,
            deepest_row_y,
        })
    }
}

fn edge(source: &str, target: &str, style: EdgeStyle) -> LayoutEdge {
    LayoutEdge {
        id: format!("e-{source}-{target}"),
        source: source.to_string(),
        target: target.to_string(),
        style,
    }
}

/// Lays out `tree` with default constants.
pub fn layout(tree: &OwnershipTree) -> LayoutResult {
    LayoutEngine::default().layout(tree)
}
