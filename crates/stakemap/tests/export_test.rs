use futures::executor::block_on;
use stakemap::OwnershipTree;
use stakemap::export::{
    CancelToken, CaptureError, ExportController, ExportError, ExportOptions, HeadlessSurface,
    RenderSurface, ViewportState,
};
use stakemap::render::{DeterministicTextMeasurer, LayoutEngine, RealizedNode, SvgRenderOptions};
use std::cell::{Cell, RefCell};
use std::path::PathBuf;

/// Records every viewport it is given; rasterizes to a blank image the size of the viewport.
struct RecordingSurface {
    nodes: Vec<RealizedNode>,
    viewport: ViewportState,
    interactive: bool,
    mounted: bool,
    fail_capture: bool,
    panic_on_capture: bool,
    viewport_writes: RefCell<Vec<ViewportState>>,
    captured_with: Cell<Option<ViewportState>>,
}

impl RecordingSurface {
    fn new(nodes: Vec<RealizedNode>) -> Self {
        Self {
            nodes,
            viewport: ViewportState {
                width: 800.0,
                height: 600.0,
                translate_x: 12.0,
                translate_y: -34.0,
                zoom: 0.75,
            },
            interactive: true,
            mounted: true,
            fail_capture: false,
            panic_on_capture: false,
            viewport_writes: RefCell::new(Vec::new()),
            captured_with: Cell::new(None),
        }
    }
}

impl RenderSurface for RecordingSurface {
    fn is_mounted(&self) -> bool {
        self.mounted
    }

    fn realized_nodes(&self) -> Vec<RealizedNode> {
        self.nodes.clone()
    }

    fn viewport(&self) -> ViewportState {
        self.viewport
    }

    fn set_viewport(&mut self, viewport: ViewportState) {
        self.viewport_writes.borrow_mut().push(viewport);
        self.viewport = viewport;
    }

    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn set_interactive(&mut self, interactive: bool) {
        self.interactive = interactive;
    }

    fn rasterize(&self, scale: f64) -> Result<image::RgbaImage, CaptureError> {
        if self.panic_on_capture {
            panic!("surface blew up");
        }
        if self.fail_capture {
            return Err(CaptureError::NoContent);
        }
        self.captured_with.set(Some(self.viewport));
        let w = (self.viewport.width * scale).ceil() as u32;
        let h = (self.viewport.height * scale).ceil() as u32;
        Ok(image::RgbaImage::from_pixel(w, h, image::Rgba([255, 255, 255, 255])))
    }
}

fn node(id: &str, x: f64, y: f64, width: f64, height: f64) -> RealizedNode {
    RealizedNode {
        id: id.to_string(),
        x,
        y,
        width,
        height,
        title_lines: vec![id.to_string()],
        detail_lines: Vec::new(),
        title_line_height: 21.6,
        detail_line_height: 19.2,
    }
}

fn original_viewport() -> ViewportState {
    RecordingSurface::new(Vec::new()).viewport
}

/// Capture box 950 × 3185.5 → 1900 × 6371 px at 2× → 2.3 A4 pages.
fn tall_surface() -> RecordingSurface {
    RecordingSurface::new(vec![
        node("root", 0.0, 0.0, 790.0, 200.0),
        node("tail", 0.0, 3000.0, 350.0, 105.5),
    ])
}

#[test]
fn tall_diagram_spans_three_full_width_pages() {
    let controller = ExportController::new(tall_surface(), ExportOptions::default());
    let doc = block_on(controller.export("Acme Holdings", &CancelToken::new()))
        .expect("export succeeds")
        .expect("there is something to export");

    assert_eq!(doc.page_count(), 3);
    assert!(doc.pages.iter().all(|p| p.image.width() == 1900));
    assert!(doc.pages.iter().all(|p| (p.width_mm - 190.0).abs() < 1e-9));
    let heights: Vec<u32> = doc.pages.iter().map(|p| p.image.height()).collect();
    assert_eq!(heights, vec![2770, 2770, 831]);
    assert_eq!(doc.file_name, "Acme_Holdings_ownership_structure.pdf");

    controller.with_surface(|surface| {
        let captured = surface.captured_with.get().expect("captured");
        assert_eq!(
            captured,
            ViewportState {
                width: 950.0,
                height: 3185.5,
                translate_x: 40.0,
                translate_y: 40.0,
                zoom: 1.0,
            }
        );
        assert_eq!(surface.viewport(), original_viewport());
        assert!(surface.is_interactive());
    });
}

#[test]
fn concurrent_export_is_rejected_and_first_restores_viewport() {
    let controller = ExportController::new(tall_surface(), ExportOptions::default());
    let token = CancelToken::new();

    let (first, second) = block_on(async {
        futures::join!(
            controller.export("first", &token),
            controller.export("second", &token)
        )
    });

    assert!(matches!(first, Ok(Some(_))));
    assert!(matches!(second, Err(ExportError::ExportInProgress)));

    controller.with_surface(|surface| {
        assert_eq!(surface.viewport(), original_viewport());
        assert!(surface.is_interactive());
        // Exactly one resize and one restore: the rejected call never touched the viewport.
        assert_eq!(surface.viewport_writes.borrow().len(), 2);
    });
    assert!(!controller.is_exporting());
}

#[test]
fn pan_and_zoom_are_rejected_while_exporting() {
    let controller = ExportController::new(tall_surface(), ExportOptions::default());
    let token = CancelToken::new();

    block_on(async {
        let export = controller.export("busy", &token);
        futures::pin_mut!(export);
        assert!(futures::poll!(export.as_mut()).is_pending());

        assert!(controller.is_exporting());
        assert!(!controller.with_surface(|s| s.is_interactive()));
        assert!(matches!(
            controller.pan_by(10.0, 10.0),
            Err(ExportError::ExportInProgress)
        ));
        assert!(matches!(
            controller.zoom_by(2.0),
            Err(ExportError::ExportInProgress)
        ));

        let doc = export.await.expect("export succeeds");
        assert!(doc.is_some());
    });

    controller.pan_by(8.0, -4.0).expect("pan after export");
    let vp = controller.with_surface(|s| s.viewport());
    assert_eq!(vp.translate_x, 12.0 + 8.0);
    assert_eq!(vp.translate_y, -34.0 - 4.0);
}

#[test]
fn unmounted_surface_aborts_before_any_mutation() {
    let mut surface = tall_surface();
    surface.mounted = false;
    let controller = ExportController::new(surface, ExportOptions::default());

    let result = block_on(controller.export("x", &CancelToken::new()));
    assert!(matches!(result, Err(ExportError::RenderSurfaceUnavailable)));

    controller.with_surface(|surface| {
        assert!(surface.viewport_writes.borrow().is_empty());
        assert!(surface.is_interactive());
        assert!(surface.captured_with.get().is_none());
    });
}

#[test]
fn surface_without_nodes_exports_nothing() {
    let controller =
        ExportController::new(RecordingSurface::new(Vec::new()), ExportOptions::default());
    let result = block_on(controller.export("empty", &CancelToken::new()));
    assert!(matches!(result, Ok(None)));
    assert!(controller.with_surface(|s| s.viewport_writes.borrow().is_empty()));
}

#[test]
fn capture_failure_still_restores_viewport() {
    let mut surface = tall_surface();
    surface.fail_capture = true;
    let controller = ExportController::new(surface, ExportOptions::default());

    let result = block_on(controller.export("x", &CancelToken::new()));
    assert!(matches!(result, Err(ExportError::CaptureFailure(_))));

    controller.with_surface(|surface| {
        assert_eq!(surface.viewport(), original_viewport());
        assert!(surface.is_interactive());
    });
    assert!(!controller.is_exporting());
}

#[test]
fn cancellation_restores_viewport_and_releases_the_lock() {
    let controller = ExportController::new(tall_surface(), ExportOptions::default());
    let token = CancelToken::new();
    token.cancel();

    let result = block_on(controller.export("x", &token));
    assert!(matches!(result, Err(ExportError::Cancelled)));
    controller.with_surface(|surface| {
        assert_eq!(surface.viewport(), original_viewport());
        assert!(surface.captured_with.get().is_none());
    });

    let again = block_on(controller.export("x", &CancelToken::new()));
    assert!(matches!(again, Ok(Some(_))));
}

#[test]
fn panicking_capture_still_restores_viewport() {
    let mut surface = tall_surface();
    surface.panic_on_capture = true;
    let controller = ExportController::new(surface, ExportOptions::default());

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        block_on(controller.export("x", &CancelToken::new()))
    }));
    assert!(outcome.is_err());

    controller.with_surface(|surface| {
        assert_eq!(surface.viewport(), original_viewport());
        assert!(surface.is_interactive());
    });
    assert!(!controller.is_exporting());
}

#[test]
fn dropping_a_pending_export_inside_a_surface_borrow_still_restores() {
    let controller = ExportController::new(tall_surface(), ExportOptions::default());
    let token = CancelToken::new();

    let mut export = Box::pin(controller.export("abandoned", &token));
    block_on(async {
        assert!(futures::poll!(export.as_mut()).is_pending());
    });

    controller.with_surface(move |surface| {
        assert!(!surface.is_interactive());
        assert_ne!(surface.viewport(), original_viewport());
        drop(export);
    });
    assert!(!controller.is_exporting());

    controller.with_surface(|surface| {
        assert_eq!(surface.viewport(), original_viewport());
        assert!(surface.is_interactive());
    });
    controller.pan_by(1.0, 0.0).expect("interactive again");
}

#[test]
fn zoom_rejects_non_finite_and_non_positive_factors() {
    let controller = ExportController::new(tall_surface(), ExportOptions::default());
    for factor in [0.0, -2.0, f64::NAN, f64::INFINITY] {
        assert!(matches!(
            controller.zoom_by(factor),
            Err(ExportError::InvalidZoom { .. })
        ));
    }
    assert_eq!(controller.with_surface(|s| s.viewport()), original_viewport());

    controller.zoom_by(100.0).expect("finite zoom");
    assert_eq!(controller.with_surface(|s| s.viewport().zoom), 4.0);
}

#[test]
fn headless_surface_exports_a_real_pdf() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("fixtures")
        .join("ownership")
        .join("basic.json");
    let text = std::fs::read_to_string(&path).expect("read fixture");
    let tree = OwnershipTree::from_json_str(&text).expect("fixture parses");
    let layout = LayoutEngine::default().layout(&tree);

    let surface = HeadlessSurface::new(
        layout,
        &DeterministicTextMeasurer::default(),
        SvgRenderOptions::default(),
    );
    let before = surface.viewport();
    let options = ExportOptions {
        oversampling: 0.5,
        ..ExportOptions::default()
    };
    let controller = ExportController::new(surface, options);

    let doc = block_on(controller.export(&tree.root.display_name, &CancelToken::new()))
        .expect("export succeeds")
        .expect("nodes present");
    assert!(doc.page_count() >= 1);
    let width = doc.pages[0].image.width();
    assert!(doc.pages.iter().all(|p| p.image.width() == width));

    let pdf = doc.to_pdf_bytes().expect("pdf encodes");
    assert!(pdf.starts_with(b"%PDF-"));
    assert_eq!(controller.with_surface(|s| s.viewport()), before);
}
