//! Tree normalization: sorts the root's direct descendants into shareholder and
//! representative buckets.
//!
//! Classification looks at each descendant in isolation. A node with any positive holding is a
//! shareholder even when it also carries a director role; the representative bucket only sees
//! what is left over.

use crate::model::{OwnershipNode, OwnershipTree};
use crate::share_class::ShareClass;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

const REPRESENTATIVE_ROLE_MARKERS: [&str; 3] = ["representative", "director", "secretary"];

/// Priority assigned to shareholders without an A/B/C holding.
pub const LOWEST_PRIORITY: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Membership {
    Shareholder,
    RepresentativeOnly,
    /// Present in the source tree but placed in neither row.
    Excluded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RepresentativeOrder {
    /// Keep the order the data source delivered.
    #[default]
    Input,
    /// Case-insensitive display name, ascending.
    Name,
}

pub fn classify(node: &OwnershipNode) -> Membership {
    let holds_percentage = node.share_percentage.is_some_and(|p| p > 0.0);
    let holds_total = node.total_shares.is_some_and(|t| t > 0.0);
    let holds_allocation = node.share_allocations.iter().any(|a| a.count > 0);
    if holds_percentage || holds_total || holds_allocation {
        return Membership::Shareholder;
    }
    if has_representative_role(node) {
        return Membership::RepresentativeOnly;
    }
    Membership::Excluded
}

pub fn has_representative_role(node: &OwnershipNode) -> bool {
    node.roles.iter().any(|role| {
        let role = role.to_lowercase();
        REPRESENTATIVE_ROLE_MARKERS
            .iter()
            .any(|marker| role.contains(marker))
    })
}

/// Rank of the best share class the node actually holds (count > 0).
pub fn priority(node: &OwnershipNode) -> u8 {
    node.share_allocations
        .iter()
        .filter(|a| a.count > 0)
        .map(|a| ShareClass::parse(&a.class).rank())
        .min()
        .unwrap_or(LOWEST_PRIORITY)
}

/// Sum of allocation counts, saturating at the `i64` range; `totalShares` (truncated) stands in
/// when no allocations are listed.
pub fn total_share_count(node: &OwnershipNode) -> i64 {
    if node.share_allocations.is_empty() {
        return node.total_shares.map_or(0, |t| t.trunc() as i64);
    }
    node.share_allocations
        .iter()
        .fold(0i64, |acc, a| acc.saturating_add(a.count))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedEntity {
    pub node: OwnershipNode,
    pub membership: Membership,
    pub priority: u8,
}

impl ClassifiedEntity {
    pub fn new(node: OwnershipNode) -> Self {
        let membership = classify(&node);
        let priority = priority(&node);
        Self {
            node,
            membership,
            priority,
        }
    }

    pub fn total_shares(&self) -> i64 {
        total_share_count(&self.node)
    }
}

/// Priority ascending, then total shares descending, then case-insensitive name ascending.
pub fn compare_shareholders(a: &ClassifiedEntity, b: &ClassifiedEntity) -> Ordering {
    a.priority
        .cmp(&b.priority)
        .then_with(|| b.total_shares().cmp(&a.total_shares()))
        .then_with(|| {
            a.node
                .display_name
                .to_lowercase()
                .cmp(&b.node.display_name.to_lowercase())
        })
}

pub fn sort_shareholders(entities: &mut [ClassifiedEntity]) {
    entities.sort_by(compare_shareholders);
}

pub fn sort_representatives(entities: &mut [ClassifiedEntity], order: RepresentativeOrder) {
    match order {
        RepresentativeOrder::Input => {}
        RepresentativeOrder::Name => entities.sort_by(|a, b| {
            a.node
                .display_name
                .to_lowercase()
                .cmp(&b.node.display_name.to_lowercase())
        }),
    }
}

/// Direct descendants of a root, split into buckets and ordered for placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedTree {
    pub shareholders: Vec<ClassifiedEntity>,
    pub representatives: Vec<ClassifiedEntity>,
    pub excluded: Vec<ClassifiedEntity>,
}

impl ClassifiedTree {
    pub fn is_empty(&self) -> bool {
        self.shareholders.is_empty() && self.representatives.is_empty()
    }

    pub fn placed_count(&self) -> usize {
        self.shareholders.len() + self.representatives.len()
    }
}

pub fn classify_tree(tree: &OwnershipTree, order: RepresentativeOrder) -> ClassifiedTree {
    classify_children(&tree.root, order)
}

pub fn classify_children(root: &OwnershipNode, order: RepresentativeOrder) -> ClassifiedTree {
    let mut shareholders = Vec::new();
    let mut representatives = Vec::new();
    let mut excluded = Vec::new();

    for child in &root.children {
        let entity = ClassifiedEntity::new(child.clone());
        match entity.membership {
            Membership::Shareholder => shareholders.push(entity),
            Membership::RepresentativeOnly => representatives.push(entity),
            Membership::Excluded => excluded.push(entity),
        }
    }

    sort_shareholders(&mut shareholders);
    sort_representatives(&mut representatives, order);

    tracing::debug!(
        root = %root.id,
        shareholders = shareholders.len(),
        representatives = representatives.len(),
        excluded = excluded.len(),
        "classified ownership tree"
    );

    ClassifiedTree {
        shareholders,
        representatives,
        excluded,
    }
}
