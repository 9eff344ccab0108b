#![forbid(unsafe_code)]

//! `stakemap` draws the ownership structure of a company: who holds its shares, and who
//! represents it.
//!
//! The root entity sits on top, shareholders form the first tier (best share class first) and
//! legal representatives the second. Everything is headless and deterministic; hosts supply the
//! tree and decide where the output goes.
//!
//! # Features
//!
//! - `render` (default): layout + SVG rendering (`stakemap::render`)
//! - `raster`: PNG and single-page vector PDF via pure-Rust SVG rasterization/conversion
//! - `export`: the viewport/export controller producing paginated A4 documents
//!   (`stakemap::export`)

pub use stakemap_core::*;

#[cfg(feature = "export")]
pub mod export;

#[cfg(feature = "render")]
pub mod render {
    use stakemap_core::{OwnershipTree, TreeState};

    pub use stakemap_render::config::LayoutConfig;
    pub use stakemap_render::layout::LayoutEngine;
    pub use stakemap_render::model::{Group, LayoutEdge, LayoutNode, LayoutResult, NodeRole};
    pub use stakemap_render::realize::{NodeTextStyle, RealizedNode, realize_nodes};
    pub use stakemap_render::svg::{SvgFrame, SvgRenderOptions, render_realized_svg};
    pub use stakemap_render::text::{DeterministicTextMeasurer, TextMeasurer};
    pub use stakemap_render::{RenderOptions, layout_state};

    #[cfg(feature = "raster")]
    pub mod raster;

    #[derive(Debug, thiserror::Error)]
    pub enum HeadlessError {
        #[error(transparent)]
        Model(#[from] stakemap_core::Error),
        #[error(transparent)]
        Render(#[from] stakemap_render::Error),
    }

    pub type Result<T> = std::result::Result<T, HeadlessError>;

    /// Converts an arbitrary string (usually an entity id) into a conservative SVG `id` token.
    ///
    /// The root `<svg id>` prefixes marker ids under `<defs>`, so two diagrams inlined in the
    /// same page must not share it.
    pub fn sanitize_svg_id(raw: &str) -> String {
        let raw = raw.trim();
        if raw.is_empty() {
            return "ownership".to_string();
        }

        let mut out = String::with_capacity(raw.len() + 4);
        for ch in raw.chars() {
            let ok = ch.is_ascii_alphanumeric() || ch == '-' || ch == '_';
            out.push(if ok { ch } else { '-' });
        }
        if !out.starts_with(|c: char| c.is_ascii_alphabetic()) {
            out.insert_str(0, "o-");
        }
        while out.contains("--") {
            out = out.replace("--", "-");
        }
        let out = out.trim_matches('-');
        if out.is_empty() || out == "o" {
            return "ownership".to_string();
        }
        out.to_string()
    }

    /// Bundles a layout engine and render options for repeated headless rendering.
    ///
    /// Nothing is cached: every call recomputes the layout from the tree it is given, so a host
    /// simply calls again whenever its tree changes.
    #[derive(Clone, Default)]
    pub struct HeadlessRenderer {
        pub engine: LayoutEngine,
        pub options: RenderOptions,
    }

    impl HeadlessRenderer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_layout_config(mut self, config: LayoutConfig) -> Self {
            self.engine = LayoutEngine::new(config);
            self
        }

        pub fn layout(&self, tree: &OwnershipTree) -> LayoutResult {
            self.engine.layout(tree)
        }

        pub fn layout_state(&self, state: &TreeState) -> Result<Option<LayoutResult>> {
            Ok(layout_state(&self.engine, state)?)
        }

        pub fn render_layout_svg(&self, layout: &LayoutResult) -> String {
            stakemap_render::svg::render_svg(
                layout,
                self.options.text_measurer.as_ref(),
                &self.options.svg,
            )
        }

        pub fn render_svg(&self, tree: &OwnershipTree) -> String {
            self.render_layout_svg(&self.layout(tree))
        }

        pub fn render_state_svg(&self, state: &TreeState) -> Result<Option<String>> {
            Ok(stakemap_render::render_state_svg(
                &self.engine,
                state,
                &self.options,
            )?)
        }

        /// Like [`Self::render_svg`], with the root id derived from the tree's root entity.
        pub fn render_svg_with_root_id(&self, tree: &OwnershipTree) -> String {
            let mut options = self.options.svg.clone();
            options.diagram_id = Some(sanitize_svg_id(&tree.root.id));
            stakemap_render::svg::render_svg(
                &self.layout(tree),
                self.options.text_measurer.as_ref(),
                &options,
            )
        }

        #[cfg(feature = "raster")]
        pub fn render_png(
            &self,
            tree: &OwnershipTree,
            raster: &raster::RasterOptions,
        ) -> raster::Result<Vec<u8>> {
            raster::svg_to_png(&self.render_svg(tree), raster)
        }

        #[cfg(feature = "raster")]
        pub fn render_vector_pdf(&self, tree: &OwnershipTree) -> raster::Result<Vec<u8>> {
            raster::svg_to_pdf(&self.render_svg(tree))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn sanitize_svg_id_is_conservative() {
            assert_eq!(sanitize_svg_id("acme"), "acme");
            assert_eq!(sanitize_svg_id("  "), "ownership");
            assert_eq!(sanitize_svg_id("12 Holdings/HK"), "o-12-Holdings-HK");
            assert_eq!(sanitize_svg_id("---"), "ownership");
        }
    }
}
