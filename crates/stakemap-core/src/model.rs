use crate::share_class::ShareClassTotals;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EntityKind {
    Person,
    #[default]
    Company,
}

impl EntityKind {
    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Person => "Person",
            EntityKind::Company => "Company",
        }
    }
}

/// Raw share count held in one share class. Negative counts are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareAllocation {
    pub class: String,
    #[serde(deserialize_with = "count_from_value")]
    pub count: i64,
}

impl ShareAllocation {
    pub fn new(class: impl Into<String>, count: i64) -> Self {
        Self {
            class: class.into(),
            count,
        }
    }
}

/// A company, person or representative in an ownership tree.
///
/// Children are owned values. The same real-world entity may show up in several branches as
/// distinct nodes; nothing here deduplicates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipNode {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub kind: EntityKind,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub nationality: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default, deserialize_with = "allocations_from_value")]
    pub share_allocations: Vec<ShareAllocation>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub share_percentage: Option<f64>,
    /// Kept as a float so a fractional total still counts as holding shares.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_shares: Option<f64>,
    #[serde(default)]
    pub children: Vec<OwnershipNode>,
}

impl OwnershipNode {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            kind,
            address: String::new(),
            nationality: None,
            roles: Vec::new(),
            share_allocations: Vec::new(),
            share_percentage: None,
            total_shares: None,
            children: Vec::new(),
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn with_nationality(mut self, nationality: impl Into<String>) -> Self {
        self.nationality = Some(nationality.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn with_shares(mut self, class: impl Into<String>, count: i64) -> Self {
        self.share_allocations.push(ShareAllocation::new(class, count));
        self
    }

    pub fn with_share_percentage(mut self, percentage: f64) -> Self {
        self.share_percentage = Some(percentage);
        self
    }

    pub fn with_total_shares(mut self, total: i64) -> Self {
        self.total_shares = Some(total as f64);
        self
    }

    pub fn with_child(mut self, child: OwnershipNode) -> Self {
        self.children.push(child);
        self
    }

    /// Number of nodes below this one, at any depth.
    pub fn descendant_count(&self) -> usize {
        self.children
            .iter()
            .map(|c| 1 + c.descendant_count())
            .sum()
    }
}

/// The unit handed to the layout engine: a root plus the share totals used to turn raw counts
/// into percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipTree {
    pub root: OwnershipNode,
    #[serde(default)]
    pub share_class_totals: ShareClassTotals,
}

impl OwnershipTree {
    /// Wraps a root, deriving share totals from the root's own allocations or, failing that,
    /// from the direct descendants.
    pub fn new(root: OwnershipNode) -> Self {
        let share_class_totals = ShareClassTotals::resolve(&root);
        Self {
            root,
            share_class_totals,
        }
    }

    pub fn with_totals(root: OwnershipNode, totals: ShareClassTotals) -> Self {
        Self {
            root,
            share_class_totals: totals,
        }
    }

    /// Accepts either `{ "root": {...}, "shareClassTotals": {...} }` or a bare root node.
    pub fn from_json_value(value: Value) -> crate::Result<Self> {
        if value.get("root").is_some() {
            let mut tree: OwnershipTree = serde_json::from_value(value)?;
            if tree.share_class_totals.is_empty() {
                tree.share_class_totals = ShareClassTotals::resolve(&tree.root);
            }
            return Ok(tree);
        }
        if !value.is_object() {
            return Err(crate::Error::InvalidTree {
                message: "expected a JSON object for the ownership root".to_string(),
            });
        }
        let root: OwnershipNode = serde_json::from_value(value)?;
        Ok(Self::new(root))
    }

    pub fn from_json_str(text: &str) -> crate::Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_json_value(value)
    }
}

fn number_like_to_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s.trim().chars().filter(|c| *c != ',' && *c != '_').collect();
            cleaned.parse::<f64>().ok()
        }
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn number_like_to_i64(value: &Value) -> Option<i64> {
    if let Some(v) = value.as_i64() {
        return Some(v);
    }
    number_like_to_f64(value).map(|v| v.trunc() as i64)
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_like_to_f64))
}

fn count_from_value<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number_like_to_i64(&value).unwrap_or(0))
}

fn allocations_from_value<'de, D>(deserializer: D) -> Result<Vec<ShareAllocation>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;

    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        // `{ "Class A": 100, "Ordinary": 20 }` keeps key order (serde_json `preserve_order`).
        Some(Value::Object(map)) => Ok(map
            .iter()
            .map(|(class, count)| ShareAllocation {
                class: class.clone(),
                count: number_like_to_i64(count).unwrap_or(0),
            })
            .collect()),
        Some(v @ Value::Array(_)) => serde_json::from_value(v).map_err(D::Error::custom),
        Some(other) => Err(D::Error::custom(format!(
            "shareAllocations must be a list or an object, got {other}"
        ))),
    }
}
