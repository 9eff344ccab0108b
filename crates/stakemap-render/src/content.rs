//! Structured node content.
//!
//! The layout hands every box a [`NodeContent`] descriptor instead of markup so the drawing
//! surface stays swappable (SVG here, anything else in a host UI).

use serde::{Deserialize, Serialize};
use stakemap_core::{Membership, OwnershipNode, ShareClassTotals, total_share_count};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeContent {
    Root(RootCard),
    Header(HeaderCard),
    Entity(EntityCard),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootCard {
    pub title: String,
    pub kind_label: String,
    pub address: Option<String>,
    pub nationality: Option<String>,
    /// Issued shares per class, as totals (no percentages).
    pub share_classes: Vec<ShareFigure>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderCard {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityCard {
    pub name: String,
    pub kind_label: String,
    pub address: Option<String>,
    pub nationality: Option<String>,
    pub badges: Vec<RoleBadge>,
    pub shares: Vec<ShareFigure>,
    pub total_shares: Option<i64>,
    pub total_percentage: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BadgeTone {
    Shareholder,
    Representative,
    Director,
    Secretary,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleBadge {
    pub label: String,
    pub tone: BadgeTone,
}

impl RoleBadge {
    pub fn from_role(role: &str) -> Self {
        let lower = role.to_lowercase();
        let tone = if lower.contains("director") {
            BadgeTone::Director
        } else if lower.contains("secretary") {
            BadgeTone::Secretary
        } else if lower.contains("representative") {
            BadgeTone::Representative
        } else if lower.contains("shareholder") {
            BadgeTone::Shareholder
        } else {
            BadgeTone::Other
        };
        Self {
            label: role.trim().to_string(),
            tone,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareFigure {
    pub class: String,
    pub count: i64,
    pub percentage: Option<f64>,
    pub count_label: String,
    pub percentage_label: Option<String>,
}

impl ShareFigure {
    pub fn new(class: &str, count: i64, class_total: Option<i64>) -> Self {
        let percentage = class_total
            .filter(|t| *t > 0)
            .map(|t| count as f64 / t as f64 * 100.0);
        Self {
            class: class.to_string(),
            count,
            percentage,
            count_label: format_count(count),
            percentage_label: percentage.map(format_percentage),
        }
    }

    /// `Class A: 600 (60%)`
    pub fn display(&self) -> String {
        match &self.percentage_label {
            Some(p) => format!("{}: {} ({p})", self.class, self.count_label),
            None => format!("{}: {}", self.class, self.count_label),
        }
    }
}

impl NodeContent {
    pub fn title(&self) -> &str {
        match self {
            NodeContent::Root(card) => &card.title,
            NodeContent::Header(card) => &card.label,
            NodeContent::Entity(card) => &card.name,
        }
    }

    /// Lines below the title, in drawing order.
    pub fn detail_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        match self {
            NodeContent::Root(card) => {
                lines.push(card.kind_label.clone());
                lines.extend(card.address.iter().cloned());
                lines.extend(card.nationality.iter().cloned());
                for figure in &card.share_classes {
                    lines.push(format!("{}: {} issued", figure.class, figure.count_label));
                }
            }
            NodeContent::Header(_) => {}
            NodeContent::Entity(card) => {
                let mut kind = card.kind_label.clone();
                if let Some(nat) = &card.nationality {
                    kind.push_str(" · ");
                    kind.push_str(nat);
                }
                lines.push(kind);
                lines.extend(card.address.iter().cloned());
                if !card.badges.is_empty() {
                    let badges: Vec<&str> = card.badges.iter().map(|b| b.label.as_str()).collect();
                    lines.push(badges.join(" | "));
                }
                for figure in &card.shares {
                    lines.push(figure.display());
                }
                if card.shares.len() != 1 {
                    if let Some(total) = card.total_shares {
                        let mut line = format!("Total: {}", format_count(total));
                        if let Some(p) = card.total_percentage {
                            line.push_str(&format!(" ({})", format_percentage(p)));
                        }
                        lines.push(line);
                    }
                }
            }
        }
        lines
    }

    /// Title followed by the detail lines.
    pub fn text_lines(&self) -> Vec<String> {
        let mut lines = vec![self.title().to_string()];
        lines.extend(self.detail_lines());
        lines
    }
}

pub fn root_content(root: &OwnershipNode, totals: &ShareClassTotals) -> NodeContent {
    NodeContent::Root(RootCard {
        title: root.display_name.clone(),
        kind_label: root.kind.label().to_string(),
        address: non_empty(&root.address),
        nationality: root.nationality.clone(),
        share_classes: totals
            .iter()
            .map(|(class, total)| ShareFigure::new(class, total, None))
            .collect(),
    })
}

pub fn header_content(label: &str, count: usize) -> NodeContent {
    NodeContent::Header(HeaderCard {
        label: label.to_string(),
        count,
    })
}

pub fn entity_content(
    node: &OwnershipNode,
    membership: Membership,
    totals: &ShareClassTotals,
) -> NodeContent {
    let mut badges: Vec<RoleBadge> = Vec::new();
    if membership == Membership::Shareholder {
        badges.push(RoleBadge {
            label: "Shareholder".to_string(),
            tone: BadgeTone::Shareholder,
        });
    }
    for role in &node.roles {
        if role.trim().is_empty() {
            continue;
        }
        let badge = RoleBadge::from_role(role);
        let duplicate = badges
            .iter()
            .any(|b| b.label.eq_ignore_ascii_case(&badge.label));
        if !duplicate {
            badges.push(badge);
        }
    }

    let shares: Vec<ShareFigure> = node
        .share_allocations
        .iter()
        .filter(|a| a.count != 0)
        .map(|a| ShareFigure::new(&a.class, a.count, totals.total_for(&a.class)))
        .collect();

    let total = total_share_count(node);
    let total_shares = (membership == Membership::Shareholder && total != 0).then_some(total);

    NodeContent::Entity(EntityCard {
        name: node.display_name.clone(),
        kind_label: node.kind.label().to_string(),
        address: non_empty(&node.address),
        nationality: node.nationality.clone(),
        badges,
        shares,
        total_shares,
        total_percentage: total_percentage(node, totals),
    })
}

/// Explicit percentage when positive, otherwise held counts over the issued totals of the
/// classes held.
pub fn total_percentage(node: &OwnershipNode, totals: &ShareClassTotals) -> Option<f64> {
    if let Some(p) = node.share_percentage.filter(|p| *p > 0.0) {
        return Some(p);
    }
    // Widened so sums of i64-range counts cannot overflow.
    let mut held = 0i128;
    let mut issued = 0i128;
    for a in node.share_allocations.iter().filter(|a| a.count != 0) {
        let total = totals.total_for(&a.class)?;
        held += i128::from(a.count);
        issued += i128::from(total);
    }
    (issued > 0).then(|| held as f64 / issued as f64 * 100.0)
}

/// `1250000` → `1,250,000`.
pub fn format_count(count: i64) -> String {
    let digits = count.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if count < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Two decimals with trailing zeros trimmed: `33.33%`, `50%`.
pub fn format_percentage(value: f64) -> String {
    if !value.is_finite() {
        return "0%".to_string();
    }
    let mut s = format!("{value:.2}");
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    if s == "-0" {
        s = "0".to_string();
    }
    s.push('%');
    s
}

fn non_empty(s: &str) -> Option<String> {
    let t = s.trim();
    (!t.is_empty()).then(|| t.to_string())
}
