#![forbid(unsafe_code)]

//! Two-tier ownership layout, node content and SVG rendering (headless).

pub mod config;
pub mod content;
pub mod layout;
pub mod model;
pub mod realize;
pub mod svg;
pub mod text;

use crate::text::{DeterministicTextMeasurer, TextMeasurer};
use stakemap_core::TreeState;
use std::sync::Arc;

pub use config::LayoutConfig;
pub use content::{NodeContent, ShareFigure};
pub use layout::{LayoutEngine, layout};
pub use model::{
    DiagramBounds, Group, LayoutEdge, LayoutNode, LayoutResult, NodeRole, SizeClass,
};
pub use realize::{NodeTextStyle, RealizedNode, measure_node, realize_nodes};
pub use svg::{SvgFrame, SvgRenderOptions, render_svg};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] stakemap_core::Error),
    #[error("layout JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone)]
pub struct RenderOptions {
    pub text_measurer: Arc<dyn TextMeasurer + Send + Sync>,
    pub svg: SvgRenderOptions,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            text_measurer: Arc::new(DeterministicTextMeasurer::default()),
            svg: SvgRenderOptions::default(),
        }
    }
}

/// Lays out whatever the host currently holds.
///
/// `Loading` yields `Ok(None)` (draw nothing yet); an unavailable tree is an error rather than
/// an empty diagram.
pub fn layout_state(engine: &LayoutEngine, state: &TreeState) -> Result<Option<LayoutResult>> {
    Ok(state.tree()?.map(|tree| engine.layout(tree)))
}

pub fn render_state_svg(
    engine: &LayoutEngine,
    state: &TreeState,
    options: &RenderOptions,
) -> Result<Option<String>> {
    let Some(layout) = layout_state(engine, state)? else {
        return Ok(None);
    };
    Ok(Some(render_svg(
        &layout,
        options.text_measurer.as_ref(),
        &options.svg,
    )))
}

pub fn layout_to_json(layout: &LayoutResult, pretty: bool) -> Result<String> {
    let out = if pretty {
        serde_json::to_string_pretty(layout)?
    } else {
        serde_json::to_string(layout)?
    };
    Ok(out)
}
