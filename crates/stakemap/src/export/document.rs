//! The paginated export result and its encoders.

use super::ExportError;
use super::paginate::{PageSetup, PageSlice};
use chrono::{Datelike, Timelike, Utc};
use pdf_writer::{Content, Date, Filter, Name, Pdf, Rect, Ref, TextStr};
use std::io::Cursor;

const PT_PER_MM: f64 = 72.0 / 25.4;
const IMAGE_NAME: Name<'static> = Name(b"Im0");

/// One page: a horizontal band of the capture and where it lands on paper.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub index: usize,
    pub image: image::RgbaImage,
    pub width_mm: f64,
    pub height_mm: f64,
}

impl PageImage {
    pub fn from_slice(source: &image::RgbaImage, slice: &PageSlice) -> Self {
        let band = image::imageops::crop_imm(
            source,
            0,
            slice.src_y,
            source.width(),
            slice.src_height,
        )
        .to_image();
        Self {
            index: slice.index,
            image: band,
            width_mm: slice.width_mm,
            height_mm: slice.height_mm,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PaginatedDocument {
    pub title: String,
    /// Suggested download name; see [`super::export_file_name`].
    pub file_name: String,
    pub page_setup: PageSetup,
    pub pages: Vec<PageImage>,
    pub jpeg_quality: u8,
}

impl PaginatedDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// One PDF page per [`PageImage`], each a JPEG image XObject placed at the top-left margin.
    pub fn to_pdf_bytes(&self) -> Result<Vec<u8>, ExportError> {
        let mut alloc = Ref::new(1);
        let catalog_id = alloc.bump();
        let page_tree_id = alloc.bump();
        let info_id = alloc.bump();

        let ids: Vec<(Ref, Ref, Ref)> = self
            .pages
            .iter()
            .map(|_| (alloc.bump(), alloc.bump(), alloc.bump()))
            .collect();

        let mut pdf = Pdf::new();
        pdf.catalog(catalog_id).pages(page_tree_id);
        pdf.pages(page_tree_id)
            .kids(ids.iter().map(|(page_id, _, _)| *page_id))
            .count(ids.len() as i32);

        let page_w = (self.page_setup.width_mm * PT_PER_MM) as f32;
        let page_h = (self.page_setup.height_mm * PT_PER_MM) as f32;
        let margin = (self.page_setup.margin_mm * PT_PER_MM) as f32;

        for (page, &(page_id, content_id, image_id)) in self.pages.iter().zip(&ids) {
            let jpeg = encode_jpeg(&page.image, self.jpeg_quality)?;
            {
                let mut image = pdf.image_xobject(image_id, &jpeg);
                image.filter(Filter::DctDecode);
                image.width(page.image.width() as i32);
                image.height(page.image.height() as i32);
                image.color_space().device_rgb();
                image.bits_per_component(8);
            }

            // PDF space grows upwards; the band hangs from the top margin.
            let draw_w = (page.width_mm * PT_PER_MM) as f32;
            let draw_h = (page.height_mm * PT_PER_MM) as f32;
            let mut content = Content::new();
            content.save_state();
            content.transform([draw_w, 0.0, 0.0, draw_h, margin, page_h - margin - draw_h]);
            content.x_object(IMAGE_NAME);
            content.restore_state();
            pdf.stream(content_id, &content.finish());

            let mut pdf_page = pdf.page(page_id);
            pdf_page.media_box(Rect::new(0.0, 0.0, page_w, page_h));
            pdf_page.parent(page_tree_id);
            pdf_page.contents(content_id);
            pdf_page.resources().x_objects().pair(IMAGE_NAME, image_id);
        }

        let now = Utc::now();
        let created = Date::new(now.year().clamp(0, 9999) as u16)
            .month(now.month() as u8)
            .day(now.day() as u8)
            .hour(now.hour() as u8)
            .minute(now.minute() as u8)
            .second(now.second() as u8)
            .utc_offset_hour(0);
        pdf.document_info(info_id)
            .title(TextStr(&self.title))
            .producer(TextStr("stakemap"))
            .creation_date(created);

        Ok(pdf.finish())
    }

    /// Each page as a standalone PNG.
    pub fn to_png_pages(&self) -> Result<Vec<Vec<u8>>, ExportError> {
        self.pages
            .iter()
            .map(|page| {
                let mut out = Cursor::new(Vec::new());
                page.image
                    .write_to(&mut out, image::ImageFormat::Png)
                    .map_err(|err| ExportError::Encode {
                        message: format!("page {}: {err}", page.index + 1),
                    })?;
                Ok(out.into_inner())
            })
            .collect()
    }
}

/// Drops alpha (the capture is painted over an opaque background) and encodes baseline JPEG.
fn encode_jpeg(image: &image::RgbaImage, quality: u8) -> Result<Vec<u8>, ExportError> {
    let (w, h) = image.dimensions();
    let mut rgb = Vec::with_capacity((w as usize) * (h as usize) * 3);
    for px in image.pixels() {
        rgb.extend_from_slice(&px.0[..3]);
    }

    let mut out = Vec::new();
    let mut enc = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality);
    enc.encode(&rgb, w, h, image::ExtendedColorType::Rgb8)
        .map_err(|err| ExportError::Encode {
            message: format!("jpeg: {err}"),
        })?;
    Ok(out)
}
