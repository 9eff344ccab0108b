#![forbid(unsafe_code)]

#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("failed to parse SVG")]
    SvgParse,
    #[error("SVG has no usable viewBox")]
    MissingViewBox,
    #[error("failed to allocate a {width}x{height} pixmap for raster rendering")]
    PixmapAlloc { width: u32, height: u32 },
    #[error("failed to encode PNG")]
    PngEncode,
    #[error("invalid background color: {0}")]
    Background(String),
    #[error("failed to convert SVG to PDF")]
    PdfConvert,
}

pub type Result<T> = std::result::Result<T, RasterError>;

#[derive(Debug, Clone)]
pub struct RasterOptions {
    pub scale: f32,
    /// Fill behind the diagram. `None` keeps transparent pixels transparent.
    pub background: Option<String>,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            background: Some("white".to_string()),
        }
    }
}

pub fn svg_to_png(svg: &str, options: &RasterOptions) -> Result<Vec<u8>> {
    let pixmap = svg_to_pixmap(svg, options.scale, options.background.as_deref())?;
    pixmap.encode_png().map_err(|_| RasterError::PngEncode)
}

/// Single-page vector PDF sized to the SVG viewBox.
pub fn svg_to_pdf(svg: &str) -> Result<Vec<u8>> {
    // svg2pdf pins its own usvg release, so the tree is parsed through its re-export.
    let mut opt = svg2pdf::usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();
    opt.font_family = "Arial".to_string();
    let tree = svg2pdf::usvg::Tree::from_str(svg, &opt).map_err(|_| RasterError::SvgParse)?;

    svg2pdf::to_pdf(
        &tree,
        svg2pdf::ConversionOptions::default(),
        svg2pdf::PageOptions::default(),
    )
    .map_err(|_| RasterError::PdfConvert)
}

fn parse_tree(svg: &str) -> Result<usvg::Tree> {
    let mut opt = usvg::Options::default();
    // System fonts vary; pin a common family so glyph fallback is at least predictable.
    opt.fontdb_mut().load_system_fonts();
    opt.font_family = "Arial".to_string();
    usvg::Tree::from_str(svg, &opt).map_err(|_| RasterError::SvgParse)
}

/// Root viewBox `(width, height)`. Stakemap SVGs always carry one.
fn svg_view_box_size(svg: &str) -> Option<(f32, f32)> {
    let i = svg.find("viewBox=\"")?;
    let rest = &svg[i + "viewBox=\"".len()..];
    let raw = &rest[..rest.find('"')?];
    let nums: Vec<f32> = raw
        .split_whitespace()
        .map(|s| s.parse::<f32>().ok())
        .collect::<Option<_>>()?;
    let [_, _, width, height] = nums[..] else {
        return None;
    };
    (width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0)
        .then_some((width, height))
}

/// Rasterizes `svg` at `scale` device pixels per SVG unit.
///
/// usvg already maps the viewBox min corner to (0,0), so only the scale is applied here.
pub(crate) fn svg_to_pixmap(
    svg: &str,
    scale: f32,
    background: Option<&str>,
) -> Result<tiny_skia::Pixmap> {
    let (width, height) = svg_view_box_size(svg).ok_or(RasterError::MissingViewBox)?;
    let tree = parse_tree(svg)?;

    let width_px = (width * scale).ceil().max(1.0) as u32;
    let height_px = (height * scale).ceil().max(1.0) as u32;
    let mut pixmap = tiny_skia::Pixmap::new(width_px, height_px).ok_or(
        RasterError::PixmapAlloc {
            width: width_px,
            height: height_px,
        },
    )?;

    if let Some(bg) = background {
        let color =
            parse_tiny_skia_color(bg).ok_or_else(|| RasterError::Background(bg.to_string()))?;
        pixmap.fill(color);
    }

    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );
    Ok(pixmap)
}

/// Accepts `transparent`, `white`, `black` and `#rgb` / `#rgba` / `#rrggbb` / `#rrggbbaa`.
pub(crate) fn parse_tiny_skia_color(text: &str) -> Option<tiny_skia::Color> {
    let s = text.trim().to_ascii_lowercase();
    match s.as_str() {
        "transparent" => return Some(tiny_skia::Color::TRANSPARENT),
        "white" => return Some(tiny_skia::Color::WHITE),
        "black" => return Some(tiny_skia::Color::BLACK),
        _ => {}
    }

    let hex = s.strip_prefix('#')?;
    let digits: Vec<u8> = hex
        .chars()
        .map(|c| c.to_digit(16).map(|d| d as u8))
        .collect::<Option<_>>()?;
    let channel = |i: usize, wide: bool| -> u8 {
        if wide {
            (digits[2 * i] << 4) | digits[2 * i + 1]
        } else {
            (digits[i] << 4) | digits[i]
        }
    };
    let (wide, has_alpha) = match digits.len() {
        3 => (false, false),
        4 => (false, true),
        6 => (true, false),
        8 => (true, true),
        _ => return None,
    };
    let alpha = if has_alpha { channel(3, wide) } else { 255 };
    Some(tiny_skia::Color::from_rgba8(
        channel(0, wide),
        channel(1, wide),
        channel(2, wide),
        alpha,
    ))
}
