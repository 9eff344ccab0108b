#![forbid(unsafe_code)]

//! Ownership tree model + classification (headless).
//!
//! Design goals:
//! - deterministic, testable outputs (the same tree always classifies the same way)
//! - no I/O: trees arrive from an external data-fetch collaborator as values or JSON
//! - well-formed input is taken literally; negative counts are not rejected

pub mod classify;
pub mod error;
pub mod geom;
pub mod model;
pub mod share_class;

pub use classify::{
    ClassifiedEntity, ClassifiedTree, Membership, RepresentativeOrder, classify, classify_tree,
    priority, sort_shareholders, total_share_count,
};
pub use error::{Error, Result};
pub use model::{EntityKind, OwnershipNode, OwnershipTree, ShareAllocation};
pub use share_class::{ShareClass, ShareClassTotals};

/// What the host currently knows about the tree it wants drawn.
///
/// `Loading` and `Unavailable` are distinct from a loaded root with zero descendants: the latter
/// is a valid, drawable state.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TreeState {
    #[default]
    Loading,
    Unavailable {
        reason: String,
    },
    Loaded(OwnershipTree),
}

impl TreeState {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Maps a fetch outcome onto a state. `Ok(None)` (the backend answered "not found") is
    /// treated as unavailable.
    pub fn from_fetch<E: std::fmt::Display>(
        result: std::result::Result<Option<OwnershipTree>, E>,
    ) -> Self {
        match result {
            Ok(Some(tree)) => Self::Loaded(tree),
            Ok(None) => Self::unavailable("ownership tree not found"),
            Err(err) => Self::unavailable(err.to_string()),
        }
    }

    /// Returns the tree if loaded, `Ok(None)` while loading, and
    /// [`Error::DataUnavailable`] otherwise.
    pub fn tree(&self) -> Result<Option<&OwnershipTree>> {
        match self {
            TreeState::Loading => Ok(None),
            TreeState::Unavailable { reason } => Err(Error::DataUnavailable {
                reason: reason.clone(),
            }),
            TreeState::Loaded(tree) => Ok(Some(tree)),
        }
    }
}
