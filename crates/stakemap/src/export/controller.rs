//! Exclusive capture of a render surface into a paginated document.

use super::ExportError;
use super::document::{PageImage, PaginatedDocument};
use super::filename::export_file_name;
use super::paginate::{PageSetup, paginate};
use super::surface::{RenderSurface, ViewportState};
use crate::render::RealizedNode;
use serde::{Deserialize, Serialize};
use stakemap_core::geom::union_rects;
use std::cell::{Cell, RefCell};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::Poll;

/// Extra space around the captured boxes, in content units. The wider right edge leaves room for
/// connector overhang.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CapturePadding {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Default for CapturePadding {
    fn default() -> Self {
        Self {
            left: 40.0,
            top: 40.0,
            right: 120.0,
            bottom: 40.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExportOptions {
    pub capture_padding: CapturePadding,
    /// Device pixels per content unit when rasterizing.
    pub oversampling: f64,
    pub page: PageSetup,
    pub jpeg_quality: u8,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            capture_padding: CapturePadding::default(),
            oversampling: 2.0,
            page: PageSetup::a4(),
            jpeg_quality: 92,
        }
    }
}

/// Region to capture, in content coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Padded box around every realized node; `None` when there are no nodes.
pub fn capture_bounds(nodes: &[RealizedNode], padding: &CapturePadding) -> Option<CaptureBox> {
    let bounds = union_rects(nodes.iter().map(RealizedNode::rect))?;
    Some(CaptureBox {
        x: bounds.min.x - padding.left,
        y: bounds.min.y - padding.top,
        width: bounds.width() + padding.left + padding.right,
        height: bounds.height() + padding.top + padding.bottom,
    })
}

/// Cooperative cancellation flag shared between a host and a running export.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), ExportError> {
        if self.is_cancelled() {
            return Err(ExportError::Cancelled);
        }
        Ok(())
    }
}

/// Returns `Pending` once so other tasks on the same executor get a turn.
async fn yield_now() {
    let mut yielded = false;
    futures::future::poll_fn(|cx| {
        if yielded {
            return Poll::Ready(());
        }
        yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    })
    .await
}

/// Held for the whole export; released on drop.
struct ExportLock<'a> {
    busy: &'a Cell<bool>,
}

impl<'a> ExportLock<'a> {
    fn acquire(busy: &'a Cell<bool>) -> Option<Self> {
        if busy.replace(true) {
            return None;
        }
        Some(Self { busy })
    }
}

impl Drop for ExportLock<'_> {
    fn drop(&mut self) {
        self.busy.set(false);
    }
}

/// Viewport and interaction state to put back once the surface can be borrowed again.
type PendingRestore = Cell<Option<(ViewportState, bool)>>;

/// Saves the viewport and interaction state on entry and puts both back on drop, whatever the
/// exit path.
///
/// If the surface is borrowed at that moment (a host dropping the export future from inside
/// [`ExportController::with_surface`], or unwinding out of a surface call) the saved state is
/// parked in `pending` and applied on the controller's next access to the surface.
struct ViewportGuard<'a, S: RenderSurface> {
    surface: &'a RefCell<S>,
    pending: &'a PendingRestore,
    saved: ViewportState,
    was_interactive: bool,
}

impl<'a, S: RenderSurface> ViewportGuard<'a, S> {
    fn enter(surface: &'a RefCell<S>, pending: &'a PendingRestore) -> Self {
        let mut s = surface.borrow_mut();
        let saved = s.viewport();
        let was_interactive = s.is_interactive();
        s.set_interactive(false);
        drop(s);
        Self {
            surface,
            pending,
            saved,
            was_interactive,
        }
    }

    fn apply(&self, viewport: ViewportState) {
        self.surface.borrow_mut().set_viewport(viewport);
    }
}

impl<S: RenderSurface> Drop for ViewportGuard<'_, S> {
    fn drop(&mut self) {
        match self.surface.try_borrow_mut() {
            Ok(mut s) => {
                s.set_viewport(self.saved);
                s.set_interactive(self.was_interactive);
            }
            Err(_) => {
                tracing::warn!("surface busy while restoring viewport; deferring restore");
                self.pending.set(Some((self.saved, self.was_interactive)));
            }
        }
    }
}

/// Owns a render surface and serializes exports of it.
///
/// Only one export runs at a time; a second request while one is in flight is rejected with
/// [`ExportError::ExportInProgress`] and leaves the surface untouched. Interactive pan/zoom is
/// rejected the same way for the duration.
pub struct ExportController<S: RenderSurface> {
    surface: RefCell<S>,
    busy: Cell<bool>,
    pending_restore: PendingRestore,
    options: ExportOptions,
}

impl<S: RenderSurface> ExportController<S> {
    pub fn new(surface: S, options: ExportOptions) -> Self {
        Self {
            surface: RefCell::new(surface),
            busy: Cell::new(false),
            pending_restore: Cell::new(None),
            options,
        }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Runs `f` against the surface. The borrow ends when `f` returns.
    pub fn with_surface<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        self.settle();
        let surface = self.surface.borrow();
        f(&*surface)
    }

    pub fn into_surface(self) -> S {
        self.settle();
        self.surface.into_inner()
    }

    /// Applies a restore the viewport guard could not perform itself.
    fn settle(&self) {
        let Some((viewport, interactive)) = self.pending_restore.take() else {
            return;
        };
        match self.surface.try_borrow_mut() {
            Ok(mut s) => {
                s.set_viewport(viewport);
                s.set_interactive(interactive);
                tracing::debug!("applied deferred viewport restore");
            }
            Err(_) => self.pending_restore.set(Some((viewport, interactive))),
        }
    }

    pub fn is_exporting(&self) -> bool {
        self.busy.get()
    }

    pub fn pan_by(&self, dx: f64, dy: f64) -> Result<(), ExportError> {
        self.interact(|vp| {
            vp.translate_x += dx;
            vp.translate_y += dy;
        })
    }

    /// Zooms about the viewport origin, clamped to `[0.1, 4.0]`.
    pub fn zoom_by(&self, factor: f64) -> Result<(), ExportError> {
        if !factor.is_finite() || factor <= 0.0 {
            tracing::debug!(factor, "zoom rejected: factor must be finite and positive");
            return Err(ExportError::InvalidZoom { factor });
        }
        self.interact(|vp| {
            vp.zoom = (vp.zoom * factor).clamp(0.1, 4.0);
        })
    }

    fn interact(&self, f: impl FnOnce(&mut ViewportState)) -> Result<(), ExportError> {
        if self.busy.get() {
            tracing::warn!("viewport change rejected: export in progress");
            return Err(ExportError::ExportInProgress);
        }
        self.settle();
        let mut surface = self.surface.borrow_mut();
        let mut vp = surface.viewport();
        f(&mut vp);
        surface.set_viewport(vp);
        Ok(())
    }

    /// Exports with the options given at construction.
    pub async fn export(
        &self,
        title: &str,
        cancel: &CancelToken,
    ) -> Result<Option<PaginatedDocument>, ExportError> {
        self.export_with(title, &self.options, cancel).await
    }

    /// Captures every realized node into a paginated document.
    ///
    /// Returns `Ok(None)` when the surface is mounted but shows no nodes. The viewport and
    /// interaction state are restored before this returns, on success or failure.
    pub async fn export_with(
        &self,
        title: &str,
        options: &ExportOptions,
        cancel: &CancelToken,
    ) -> Result<Option<PaginatedDocument>, ExportError> {
        let Some(_lock) = ExportLock::acquire(&self.busy) else {
            tracing::warn!(title, "export rejected: another export is in progress");
            return Err(ExportError::ExportInProgress);
        };
        self.settle();

        let capture = {
            let surface = self.surface.borrow();
            if !surface.is_mounted() {
                tracing::warn!(title, "export rejected: render surface is not mounted");
                return Err(ExportError::RenderSurfaceUnavailable);
            }
            capture_bounds(&surface.realized_nodes(), &options.capture_padding)
        };
        let Some(capture) = capture else {
            tracing::info!(title, "nothing to export");
            return Ok(None);
        };

        tracing::info!(
            title,
            width = capture.width,
            height = capture.height,
            scale = options.oversampling,
            "export started"
        );

        let image = {
            let guard = ViewportGuard::enter(&self.surface, &self.pending_restore);
            guard.apply(ViewportState {
                width: capture.width,
                height: capture.height,
                translate_x: -capture.x,
                translate_y: -capture.y,
                zoom: 1.0,
            });
            // Give the host a frame to settle before capturing.
            yield_now().await;
            cancel.check()?;

            let captured = self.surface.borrow().rasterize(options.oversampling);
            captured.map_err(|err| {
                tracing::warn!(title, error = %err, "capture failed");
                ExportError::CaptureFailure(err)
            })?
        };

        let slices = paginate(image.width(), image.height(), &options.page);
        let mut pages = Vec::with_capacity(slices.len());
        for slice in &slices {
            yield_now().await;
            cancel.check()?;
            pages.push(PageImage::from_slice(&image, slice));
        }

        let document = PaginatedDocument {
            title: title.to_string(),
            file_name: export_file_name(title, "pdf"),
            page_setup: options.page,
            pages,
            jpeg_quality: options.jpeg_quality,
        };
        tracing::info!(
            title,
            pages = document.page_count(),
            file_name = %document.file_name,
            "export finished"
        );
        Ok(Some(document))
    }
}
