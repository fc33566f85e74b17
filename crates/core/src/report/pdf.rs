//! Lays a [`Report`] out on A4 sheets and writes it as PDF 1.5.
//!
//! Layout works in millimetres from the top-left corner; conversion to PDF
//! points (bottom-left origin) happens when operations are emitted.

use crate::domain::{DISCLAIMER, REPORT_TITLE};
use crate::report::compose::{ImagePage, Page, RasterImage, Report, TextPage};
use crate::report::error::ReportError;
use crate::report::text::{self, Font};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::io::Write;

pub const PDF_FILENAME: &str = "gapup_report.pdf";
pub const PDF_MIME: &str = "application/pdf";

const PT_PER_MM: f32 = 72.0 / 25.4;
const PAGE_W_MM: f32 = 210.0;
const PAGE_H_MM: f32 = 297.0;
const MARGIN_MM: f32 = 10.0;
const AUTO_BREAK_MM: f32 = 20.0;
const CELL_PAD_MM: f32 = 1.0;
const PRINTABLE_W_MM: f32 = PAGE_W_MM - 2.0 * MARGIN_MM;

const IMAGE_X_MM: f32 = 10.0;
const IMAGE_Y_MM: f32 = 30.0;
const IMAGE_W_MM: f32 = 180.0;

const TITLE_SIZE: f32 = 16.0;
const NOTICE_SIZE: f32 = 10.0;
const BODY_SIZE: f32 = 12.0;
const IMAGE_XOBJECT: &str = "Im1";

/// Where an image lands on its page, in millimetres from the top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

/// Fixed 180 mm width at (10, 30), height from the source aspect ratio. An
/// image too tall for the page is shrunk to fit and centered.
pub fn image_placement(width_px: u32, height_px: u32) -> Placement {
    let ratio = height_px as f32 / width_px.max(1) as f32;
    let max_h = PAGE_H_MM - IMAGE_Y_MM - MARGIN_MM;
    let h = IMAGE_W_MM * ratio;
    if h <= max_h {
        return Placement {
            x: IMAGE_X_MM,
            y: IMAGE_Y_MM,
            w: IMAGE_W_MM,
            h,
        };
    }
    let w = max_h / ratio;
    Placement {
        x: (PAGE_W_MM - w) / 2.0,
        y: IMAGE_Y_MM,
        w,
        h: max_h,
    }
}

#[derive(Default)]
struct Sheet<'r> {
    ops: Vec<Operation>,
    image: Option<&'r RasterImage>,
}

/// Top-down cursor over one or more sheets; breaks onto a new sheet when a
/// line would cross the bottom margin.
struct Flow<'r> {
    sheets: Vec<Sheet<'r>>,
    y: f32,
}

impl<'r> Flow<'r> {
    fn new() -> Self {
        Self {
            sheets: vec![Sheet::default()],
            y: MARGIN_MM,
        }
    }

    fn ensure_room(&mut self, h: f32) {
        if self.y + h > PAGE_H_MM - AUTO_BREAK_MM {
            self.sheets.push(Sheet::default());
            self.y = MARGIN_MM;
        }
    }

    fn current(&mut self) -> &mut Sheet<'r> {
        let last = self.sheets.len() - 1;
        &mut self.sheets[last]
    }

    fn line(&mut self, encoded: &[u8], font: Font, size: f32, h: f32) {
        self.ensure_room(h);
        let baseline = baseline(self.y, h, size);
        let ops = text_ops(encoded, font, size, MARGIN_MM + CELL_PAD_MM, baseline);
        self.current().ops.extend(ops);
        self.y += h;
    }

    fn centered(&mut self, encoded: &[u8], font: Font, size: f32, h: f32) {
        self.ensure_room(h);
        let x = MARGIN_MM + (PRINTABLE_W_MM - text::width_mm(encoded, font, size)) / 2.0;
        let ops = text_ops(encoded, font, size, x, baseline(self.y, h, size));
        self.current().ops.extend(ops);
        self.y += h;
    }

    fn gap(&mut self, h: f32) {
        self.y += h;
    }
}

fn baseline(cell_top: f32, cell_h: f32, size_pt: f32) -> f32 {
    cell_top + cell_h / 2.0 + 0.3 * size_pt / PT_PER_MM
}

fn text_ops(encoded: &[u8], font: Font, size: f32, x_mm: f32, baseline_mm: f32) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![font.resource().into(), size.into()]),
        Operation::new(
            "Td",
            vec![
                (x_mm * PT_PER_MM).into(),
                ((PAGE_H_MM - baseline_mm) * PT_PER_MM).into(),
            ],
        ),
        Operation::new(
            "Tj",
            vec![Object::String(encoded.to_vec(), StringFormat::Literal)],
        ),
        Operation::new("ET", vec![]),
    ]
}

fn layout_text<'r>(page: &TextPage) -> Vec<Sheet<'r>> {
    let mut flow = Flow::new();
    flow.centered(&text::win_ansi(&page.title), Font::Bold, TITLE_SIZE, 10.0);

    let notice = text::win_ansi(&page.notice);
    let wrap_w = PRINTABLE_W_MM - 2.0 * CELL_PAD_MM;
    for line in text::wrap(&notice, Font::Regular, NOTICE_SIZE, wrap_w) {
        flow.line(&line, Font::Regular, NOTICE_SIZE, 5.0);
    }
    flow.gap(5.0);

    for line in &page.lines {
        flow.line(&text::win_ansi(line), Font::Regular, BODY_SIZE, 10.0);
    }
    flow.sheets
}

fn layout_image(page: &ImagePage) -> Sheet<'_> {
    let mut flow = Flow::new();
    flow.centered(&text::win_ansi(&page.title), Font::Regular, BODY_SIZE, 10.0);

    let p = image_placement(page.image.width, page.image.height);
    let mut sheet = flow.sheets.remove(0);
    sheet.ops.extend([
        Operation::new("q", vec![]),
        Operation::new(
            "cm",
            vec![
                (p.w * PT_PER_MM).into(),
                0.into(),
                0.into(),
                (p.h * PT_PER_MM).into(),
                (p.x * PT_PER_MM).into(),
                ((PAGE_H_MM - p.y - p.h) * PT_PER_MM).into(),
            ],
        ),
        Operation::new("Do", vec![Object::Name(IMAGE_XOBJECT.as_bytes().to_vec())]),
        Operation::new("Q", vec![]),
    ]);
    sheet.image = Some(&page.image);
    sheet
}

fn image_stream(image: &RasterImage) -> Result<Stream, ReportError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&image.rgb)
        .map_err(|e| ReportError::encode("pdf", e))?;
    let data = encoder.finish().map_err(|e| ReportError::encode("pdf", e))?;

    Ok(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(image.width),
            "Height" => i64::from(image.height),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        },
        data,
    ))
}

fn utf16_text(s: &str) -> Object {
    let mut bytes = vec![0xFE, 0xFF];
    for unit in s.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

fn font_object(doc: &mut Document, font: Font) -> ObjectId {
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => font.base_font(),
        "Encoding" => "WinAnsiEncoding",
    })
}

impl Report {
    /// Serializes every page. The text page may spill over continuation
    /// sheets; each image page is exactly one sheet.
    pub fn to_pdf(&self) -> Result<Vec<u8>, ReportError> {
        let mut sheets: Vec<Sheet<'_>> = Vec::new();
        for page in &self.pages {
            match page {
                Page::Text(t) => sheets.extend(layout_text(t)),
                Page::Image(i) => sheets.push(layout_image(i)),
            }
        }

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let regular_id = font_object(&mut doc, Font::Regular);
        let bold_id = font_object(&mut doc, Font::Bold);

        let mut kids: Vec<Object> = Vec::with_capacity(sheets.len());
        for sheet in sheets {
            let mut resources = dictionary! {
                "Font" => dictionary! {
                    Font::Regular.resource() => regular_id,
                    Font::Bold.resource() => bold_id,
                },
            };
            if let Some(image) = sheet.image {
                let image_id = doc.add_object(image_stream(image)?);
                resources.set("XObject", dictionary! { IMAGE_XOBJECT => image_id });
            }

            let content = Content {
                operations: sheet.ops,
            }
            .encode()
            .map_err(|e| ReportError::encode("pdf", e))?;
            let content_id = doc.add_object(Stream::new(dictionary! {}, content));

            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![
                    0.into(),
                    0.into(),
                    (PAGE_W_MM * PT_PER_MM).into(),
                    (PAGE_H_MM * PT_PER_MM).into(),
                ],
                "Contents" => content_id,
                "Resources" => resources,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = doc.add_object(dictionary! {
            "Title" => utf16_text(REPORT_TITLE),
            "Subject" => utf16_text(DISCLAIMER),
            "Producer" => Object::string_literal("gapup_core"),
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);

        let mut out = Vec::new();
        doc.save_to(&mut out)
            .map_err(|e| ReportError::encode("pdf", e))?;
        Ok(out)
    }
}
