//! Slicing a tall capture into fixed-size pages.

use serde::{Deserialize, Serialize};

/// Physical page, in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PageSetup {
    pub width_mm: f64,
    pub height_mm: f64,
    pub margin_mm: f64,
}

impl Default for PageSetup {
    fn default() -> Self {
        Self::a4()
    }
}

impl PageSetup {
    pub fn a4() -> Self {
        Self {
            width_mm: 210.0,
            height_mm: 297.0,
            margin_mm: 10.0,
        }
    }

    pub fn letter() -> Self {
        Self {
            width_mm: 215.9,
            height_mm: 279.4,
            margin_mm: 10.0,
        }
    }

    pub fn with_margin(mut self, margin_mm: f64) -> Self {
        self.margin_mm = margin_mm;
        self
    }

    pub fn content_width_mm(&self) -> f64 {
        (self.width_mm - 2.0 * self.margin_mm).max(1.0)
    }

    pub fn content_height_mm(&self) -> f64 {
        (self.height_mm - 2.0 * self.margin_mm).max(1.0)
    }
}

/// One page's share of the source image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSlice {
    pub index: usize,
    /// First source pixel row.
    pub src_y: u32,
    pub src_height: u32,
    /// Always the full content width of the page.
    pub width_mm: f64,
    pub height_mm: f64,
}

/// Splits an image of `px_width` × `px_height` into pages.
///
/// The image is scaled to fill the page content width. Slices run top to bottom, each one a full
/// content height except the last, until the whole image is covered.
pub fn paginate(px_width: u32, px_height: u32, page: &PageSetup) -> Vec<PageSlice> {
    if px_width == 0 || px_height == 0 {
        return Vec::new();
    }

    let content_w = page.content_width_mm();
    let content_h = page.content_height_mm();
    let mm_per_px = content_w / f64::from(px_width);
    let px_per_page = content_h / mm_per_px;

    let mut slices = Vec::new();
    let mut src_y = 0u32;
    while src_y < px_height {
        let index = slices.len();
        let end = ((index + 1) as f64 * px_per_page).round().min(f64::from(px_height)) as u32;
        // Rounding never lets a page shrink to nothing.
        let end = end.max(src_y + 1);
        let src_height = end - src_y;
        slices.push(PageSlice {
            index,
            src_y,
            src_height,
            width_mm: content_w,
            height_mm: f64::from(src_height) * mm_per_px,
        });
        src_y = end;
    }
    slices
}
