//! Drawable surfaces the export controller can capture.

use crate::render::raster::{RasterError, svg_to_pixmap};
use crate::render::{
    LayoutResult, NodeTextStyle, RealizedNode, SvgFrame, SvgRenderOptions, TextMeasurer,
    realize_nodes, render_realized_svg,
};

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error(transparent)]
    Raster(#[from] RasterError),
    #[error("render surface has nothing to capture")]
    NoContent,
    #[error("rasterized buffer does not match a {width}x{height} image")]
    Buffer { width: u32, height: u32 },
}

/// Pan/zoom state of a surface: content point `p` is drawn at `p * zoom + translate`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    pub width: f64,
    pub height: f64,
    pub translate_x: f64,
    pub translate_y: f64,
    pub zoom: f64,
}

impl ViewportState {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            translate_x: 0.0,
            translate_y: 0.0,
            zoom: 1.0,
        }
    }
}

/// A host view the diagram is drawn into.
///
/// `realized_nodes` reports boxes in content coordinates, with their final (text-grown)
/// heights. `rasterize` captures what the current viewport shows.
pub trait RenderSurface {
    fn is_mounted(&self) -> bool;

    fn realized_nodes(&self) -> Vec<RealizedNode>;

    fn viewport(&self) -> ViewportState;

    fn set_viewport(&mut self, viewport: ViewportState);

    fn is_interactive(&self) -> bool;

    fn set_interactive(&mut self, interactive: bool);

    /// Renders the current viewport at `scale` device pixels per viewport unit.
    fn rasterize(&self, scale: f64) -> Result<image::RgbaImage, CaptureError>;
}

/// Offscreen surface backed by the SVG renderer and resvg.
pub struct HeadlessSurface {
    layout: Option<LayoutResult>,
    realized: Vec<RealizedNode>,
    svg: SvgRenderOptions,
    viewport: ViewportState,
    interactive: bool,
    mounted: bool,
}

impl HeadlessSurface {
    /// A mounted surface whose viewport shows the whole diagram at zoom 1.
    pub fn new(layout: LayoutResult, measurer: &dyn TextMeasurer, svg: SvgRenderOptions) -> Self {
        let mut surface = Self {
            layout: None,
            realized: Vec::new(),
            svg,
            viewport: ViewportState::new(1.0, 1.0),
            interactive: true,
            mounted: true,
        };
        surface.set_layout(layout, measurer);
        surface
    }

    /// A mounted surface with nothing drawn yet.
    pub fn empty() -> Self {
        Self {
            layout: None,
            realized: Vec::new(),
            svg: SvgRenderOptions::default(),
            viewport: ViewportState::new(1.0, 1.0),
            interactive: true,
            mounted: true,
        }
    }

    /// Replaces the drawn diagram and fits the viewport to it.
    pub fn set_layout(&mut self, layout: LayoutResult, measurer: &dyn TextMeasurer) {
        self.realized = realize_nodes(&layout, measurer, &self.text_style());
        let (x, y, w, h) = stakemap_render::svg::fit_view_box(&layout, &self.realized);
        self.viewport = ViewportState {
            width: w,
            height: h,
            translate_x: -x,
            translate_y: -y,
            zoom: 1.0,
        };
        self.layout = Some(layout);
    }

    pub fn layout(&self) -> Option<&LayoutResult> {
        self.layout.as_ref()
    }

    pub fn mount(&mut self) {
        self.mounted = true;
    }

    pub fn unmount(&mut self) {
        self.mounted = false;
    }

    fn text_style(&self) -> NodeTextStyle {
        self.svg.text_style.clone()
    }

    /// SVG for whatever the viewport currently shows.
    pub fn viewport_svg(&self) -> Option<String> {
        let layout = self.layout.as_ref()?;
        let vp = self.viewport;
        Some(render_realized_svg(
            layout,
            &self.realized,
            &self.svg,
            SvgFrame::Viewport {
                width: vp.width,
                height: vp.height,
                translate_x: vp.translate_x,
                translate_y: vp.translate_y,
                zoom: vp.zoom,
            },
        ))
    }
}

impl RenderSurface for HeadlessSurface {
    fn is_mounted(&self) -> bool {
        self.mounted
    }

    fn realized_nodes(&self) -> Vec<RealizedNode> {
        self.realized.clone()
    }

    fn viewport(&self) -> ViewportState {
        self.viewport
    }

    fn set_viewport(&mut self, viewport: ViewportState) {
        self.viewport = viewport;
    }

    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn set_interactive(&mut self, interactive: bool) {
        self.interactive = interactive;
    }

    fn rasterize(&self, scale: f64) -> Result<image::RgbaImage, CaptureError> {
        let svg = self.viewport_svg().ok_or(CaptureError::NoContent)?;
        let pixmap = svg_to_pixmap(&svg, scale as f32, Some("white"))?;
        pixmap_to_rgba(&pixmap)
    }
}

/// tiny-skia stores premultiplied RGBA; `image` expects straight alpha.
fn pixmap_to_rgba(pixmap: &tiny_skia::Pixmap) -> Result<image::RgbaImage, CaptureError> {
    let (width, height) = (pixmap.width(), pixmap.height());
    let mut buf = Vec::with_capacity(pixmap.pixels().len() * 4);
    for px in pixmap.pixels() {
        let c = px.demultiply();
        buf.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    image::RgbaImage::from_raw(width, height, buf).ok_or(CaptureError::Buffer { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{DeterministicTextMeasurer, LayoutEngine};
    use stakemap_core::{EntityKind, OwnershipNode, OwnershipTree};

    fn surface() -> HeadlessSurface {
        let root = OwnershipNode::new("r", "Root Co", EntityKind::Company)
            .with_child(OwnershipNode::new("a", "Holder", EntityKind::Person).with_shares("Class A", 10));
        let layout = LayoutEngine::default().layout(&OwnershipTree::new(root));
        HeadlessSurface::new(
            layout,
            &DeterministicTextMeasurer::default(),
            SvgRenderOptions::default(),
        )
    }

    #[test]
    fn new_surface_fits_the_viewport_to_the_diagram() {
        let s = surface();
        let vp = s.viewport();
        assert_eq!(vp.zoom, 1.0);
        assert_eq!(vp.width, 1500.0);
        assert_eq!((vp.translate_x, vp.translate_y), (50.0, 250.0));
        assert_eq!(s.realized_nodes().len(), 3);
    }

    #[test]
    fn rasterize_follows_viewport_size_and_scale() {
        let mut s = surface();
        s.set_viewport(ViewportState {
            width: 100.0,
            height: 50.0,
            translate_x: 0.0,
            translate_y: 0.0,
            zoom: 1.0,
        });
        let img = s.rasterize(2.0).unwrap();
        assert_eq!(img.dimensions(), (200, 100));
        // Opaque white background under everything.
        assert_eq!(img.get_pixel(199, 99).0[3], 255);
    }

    #[test]
    fn empty_surface_has_nothing_to_capture() {
        let s = HeadlessSurface::empty();
        assert!(s.realized_nodes().is_empty());
        assert!(matches!(s.rasterize(1.0), Err(CaptureError::NoContent)));
    }
}
