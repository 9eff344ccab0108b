//! Viewport capture and paginated export.
//!
//! An [`ExportController`] owns a [`RenderSurface`]. Exporting temporarily resizes the surface's
//! viewport to frame every realized node, rasterizes it, restores the viewport, and slices the
//! image into A4 (or any [`PageSetup`]) pages ready for PDF or PNG encoding.

mod controller;
mod document;
mod filename;
mod paginate;
mod surface;

pub use controller::{
    CancelToken, CaptureBox, CapturePadding, ExportController, ExportOptions, capture_bounds,
};
pub use document::{PageImage, PaginatedDocument};
pub use filename::export_file_name;
pub use paginate::{PageSetup, PageSlice, paginate};
pub use surface::{CaptureError, HeadlessSurface, RenderSurface, ViewportState};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("another export is already in progress")]
    ExportInProgress,
    #[error("render surface is not mounted")]
    RenderSurfaceUnavailable,
    #[error("failed to capture the diagram: {0}")]
    CaptureFailure(#[from] CaptureError),
    #[error("export cancelled")]
    Cancelled,
    #[error("zoom factor must be finite and positive, got {factor}")]
    InvalidZoom { factor: f64 },
    #[error("failed to encode export: {message}")]
    Encode { message: String },
}
