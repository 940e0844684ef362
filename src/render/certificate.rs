//! Fixed-layout certificate renderer.
//!
//! Pure function from a certificate snapshot plus per-event style to PDF
//! bytes. Holds no state; any drawing error aborts the whole render.

use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point, Polygon,
    Rgb,
};
use qrcode::QrCode;
use thiserror::Error;

use crate::entities::events::CertificateStyle;

const PAGE_W: f64 = 297.0;
const PAGE_H: f64 = 210.0;

// Rough average glyph-width factors for the built-in faces, used to center
// text: width_mm ~= chars * size_pt * factor * PT_TO_MM.
const PT_TO_MM: f64 = 0.352_778;
const HELVETICA_FACTOR: f64 = 0.50;
const HELVETICA_BOLD_FACTOR: f64 = 0.53;
const TIMES_FACTOR: f64 = 0.47;
const TIMES_BOLD_ITALIC_FACTOR: f64 = 0.50;

const DEFAULT_COLLEGE_NAME: &str = "K. S. Institute of Technology";
const DEFAULT_COLLEGE_ADDRESS: &str =
    "No.14, Raghuvanahalli, Kanakapura Road, Bengaluru - 560109";
const DEFAULT_HEADER_DEPARTMENT: &str =
    "DEPARTMENT OF MASTER OF COMPUTER APPLICATIONS (MCA)";
const DEFAULT_TITLE: &str = "CERTIFICATE OF PARTICIPATION";
const DEFAULT_EVENT_TYPE: &str = "Workshop";
const DEFAULT_SIGNATURE_TEXT: &str = "Authorized Signature";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to render certificate document: {0}")]
    Draw(String),
}

/// Everything the layout needs, already denormalized.
#[derive(Debug, Clone)]
pub struct CertificateDocument {
    pub certificate_id: String,
    pub student_name: String,
    pub student_department: String,
    pub student_semester: String,
    pub event_name: String,
    pub event_date: String,
    pub verify_url: String,
    pub style: CertificateStyle,
}

struct Palette;

impl Palette {
    const DARK_BLUE: (f64, f64, f64) = (0.118, 0.227, 0.541); // #1e3a8a
    const GOLD: (f64, f64, f64) = (0.984, 0.749, 0.141); // #fbbf24
    const BRONZE: (f64, f64, f64) = (0.706, 0.325, 0.035); // #b45309
    const INK: (f64, f64, f64) = (0.059, 0.090, 0.165); // #0f172a
    const NAME_BLUE: (f64, f64, f64) = (0.118, 0.251, 0.686); // #1e40af
    const SLATE: (f64, f64, f64) = (0.278, 0.333, 0.412); // #475569
    const FADED: (f64, f64, f64) = (0.580, 0.639, 0.722); // #94a3b8
    const BLACK: (f64, f64, f64) = (0.0, 0.0, 0.0);
}

fn color((r, g, b): (f64, f64, f64)) -> Color {
    Color::Rgb(Rgb::new(r as f32, g as f32, b as f32, None))
}

/// Y grows downward in the layout maths; PDF space grows upward.
const fn from_top(y: f64) -> f64 {
    PAGE_H - y
}

fn text_width_mm(text: &str, size_pt: f64, factor: f64) -> f64 {
    text.chars().count() as f64 * size_pt * factor * PT_TO_MM
}

fn centered_text(
    layer: &PdfLayerReference,
    text: &str,
    size_pt: f64,
    factor: f64,
    y_from_top: f64,
    font: &IndirectFontRef,
    fill: (f64, f64, f64),
) {
    let x = (PAGE_W - text_width_mm(text, size_pt, factor)) / 2.0;
    layer.set_fill_color(color(fill));
    layer.use_text(
        text,
        size_pt as f32,
        Mm(x.max(5.0) as f32),
        Mm(from_top(y_from_top) as f32),
        font,
    );
}

fn stroke_rect(
    layer: &PdfLayerReference,
    x: f64,
    y_from_top: f64,
    w: f64,
    h: f64,
    thickness_pt: f64,
    stroke: (f64, f64, f64),
) {
    let bottom = from_top(y_from_top + h);
    let points = vec![
        (Point::new(Mm(x as f32), Mm(bottom as f32)), false),
        (Point::new(Mm((x + w) as f32), Mm(bottom as f32)), false),
        (
            Point::new(Mm((x + w) as f32), Mm((bottom + h) as f32)),
            false,
        ),
        (Point::new(Mm(x as f32), Mm((bottom + h) as f32)), false),
    ];

    layer.set_outline_color(color(stroke));
    layer.set_outline_thickness(thickness_pt as f32);
    layer.add_line(Line {
        points,
        is_closed: true,
    });
}

fn fill_rect(layer: &PdfLayerReference, x: f64, y_from_top: f64, w: f64, h: f64) {
    let bottom = from_top(y_from_top + h);
    let ring = vec![
        (Point::new(Mm(x as f32), Mm(bottom as f32)), false),
        (Point::new(Mm((x + w) as f32), Mm(bottom as f32)), false),
        (
            Point::new(Mm((x + w) as f32), Mm((bottom + h) as f32)),
            false,
        ),
        (Point::new(Mm(x as f32), Mm((bottom + h) as f32)), false),
    ];

    layer.add_polygon(Polygon {
        rings: vec![ring],
        mode: PaintMode::Fill,
        winding_order: WindingOrder::NonZero,
    });
}

fn horizontal_line(
    layer: &PdfLayerReference,
    x1: f64,
    x2: f64,
    y_from_top: f64,
    thickness_pt: f64,
    stroke: (f64, f64, f64),
) {
    layer.set_outline_color(color(stroke));
    layer.set_outline_thickness(thickness_pt as f32);
    layer.add_line(Line {
        points: vec![
            (
                Point::new(Mm(x1 as f32), Mm(from_top(y_from_top) as f32)),
                false,
            ),
            (
                Point::new(Mm(x2 as f32), Mm(from_top(y_from_top) as f32)),
                false,
            ),
        ],
        is_closed: false,
    });
}

/// "14 March 2026" for ISO dates; anything unparseable is printed as-is.
fn display_date(raw: &str) -> String {
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_or_else(
        |_| raw.to_string(),
        |d| {
            use chrono::Datelike;
            format!("{} {} {}", d.day(), d.format("%B"), d.year())
        },
    )
}

/// Verification QR drawn as vector modules in the footer-left corner.
fn draw_qr(layer: &PdfLayerReference, url: &str, x: f64, y_from_top: f64, size_mm: f64)
-> Result<(), RenderError> {
    let code = QrCode::new(url.as_bytes()).map_err(|e| RenderError::Draw(e.to_string()))?;
    let width = code.width();
    let colors = code.to_colors();
    let module = size_mm / width as f64;

    layer.set_fill_color(color(Palette::INK));

    for row in 0..width {
        for col in 0..width {
            if colors[row * width + col] == qrcode::Color::Dark {
                fill_rect(
                    layer,
                    x + col as f64 * module,
                    y_from_top + row as f64 * module,
                    module,
                    module,
                );
            }
        }
    }

    Ok(())
}

pub fn render_certificate(document: &CertificateDocument) -> Result<Vec<u8>, RenderError> {
    let style = &document.style;

    let college_name = style
        .college_name
        .as_deref()
        .unwrap_or(DEFAULT_COLLEGE_NAME)
        .to_uppercase();
    let address = style
        .college_address
        .as_deref()
        .unwrap_or(DEFAULT_COLLEGE_ADDRESS);
    let dept_header = style
        .header_department
        .as_deref()
        .unwrap_or(DEFAULT_HEADER_DEPARTMENT);
    let title = style.certificate_title.as_deref().unwrap_or(DEFAULT_TITLE);
    let event_type = style.event_type.as_deref().unwrap_or(DEFAULT_EVENT_TYPE);
    let duration = style
        .event_duration
        .as_deref()
        .map(|d| format!("{d} "))
        .unwrap_or_default();
    let signature_text = style
        .signature_text
        .as_deref()
        .unwrap_or(DEFAULT_SIGNATURE_TEXT);

    let (doc, page, layer_index) = PdfDocument::new(
        "Certificate",
        Mm(PAGE_W as f32),
        Mm(PAGE_H as f32),
        "certificate",
    );
    let layer = doc.get_page(page).get_layer(layer_index);

    let helvetica = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| RenderError::Draw(e.to_string()))?;
    let helvetica_bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| RenderError::Draw(e.to_string()))?;
    let times = doc
        .add_builtin_font(BuiltinFont::TimesRoman)
        .map_err(|e| RenderError::Draw(e.to_string()))?;
    let times_bold_italic = doc
        .add_builtin_font(BuiltinFont::TimesBoldItalic)
        .map_err(|e| RenderError::Draw(e.to_string()))?;

    // Classic double border
    stroke_rect(&layer, 7.0, 7.0, PAGE_W - 14.0, PAGE_H - 14.0, 15.0, Palette::DARK_BLUE);
    stroke_rect(&layer, 11.5, 11.5, PAGE_W - 23.0, PAGE_H - 23.0, 1.0, Palette::GOLD);

    // Header block
    centered_text(
        &layer,
        &college_name,
        26.0,
        HELVETICA_BOLD_FACTOR,
        32.0,
        &helvetica_bold,
        Palette::DARK_BLUE,
    );

    let mut address_y = 41.0;
    for line in address.lines() {
        centered_text(
            &layer,
            line,
            9.0,
            HELVETICA_FACTOR,
            address_y,
            &helvetica,
            Palette::SLATE,
        );
        address_y += 5.0;
    }

    centered_text(
        &layer,
        dept_header,
        14.0,
        HELVETICA_BOLD_FACTOR,
        address_y + 8.0,
        &helvetica_bold,
        Palette::BLACK,
    );

    centered_text(
        &layer,
        title,
        32.0,
        HELVETICA_BOLD_FACTOR,
        78.0,
        &helvetica_bold,
        Palette::BRONZE,
    );

    // Body
    centered_text(
        &layer,
        "This is to Certify that Mr/Ms",
        18.0,
        TIMES_FACTOR,
        98.0,
        &times,
        Palette::INK,
    );

    centered_text(
        &layer,
        &document.student_name,
        36.0,
        TIMES_BOLD_ITALIC_FACTOR,
        114.0,
        &times_bold_italic,
        Palette::NAME_BLUE,
    );

    let name_width = text_width_mm(&document.student_name, 36.0, TIMES_BOLD_ITALIC_FACTOR);
    horizontal_line(
        &layer,
        (PAGE_W - name_width) / 2.0 - 4.0,
        (PAGE_W + name_width) / 2.0 + 4.0,
        118.0,
        1.0,
        Palette::NAME_BLUE,
    );

    let body_line = format!(
        "of {} semester {} has attended the {}{}",
        document.student_semester, document.student_department, duration, event_type
    );
    centered_text(&layer, &body_line, 18.0, TIMES_FACTOR, 130.0, &times, Palette::INK);

    centered_text(
        &layer,
        &document.event_name,
        22.0,
        HELVETICA_BOLD_FACTOR,
        142.0,
        &helvetica_bold,
        Palette::INK,
    );

    centered_text(
        &layer,
        &format!("on {}", display_date(&document.event_date)),
        16.0,
        TIMES_FACTOR,
        152.0,
        &times,
        Palette::INK,
    );

    // Footer: QR left, signature right, id line centered
    draw_qr(&layer, &document.verify_url, 21.0, 158.0, 28.0)?;
    layer.set_fill_color(color(Palette::BLACK));
    layer.use_text(
        "Scan to Verify",
        9.0,
        Mm(21.0),
        Mm(from_top(192.0) as f32),
        &helvetica,
    );

    horizontal_line(&layer, 210.0, 273.0, 182.0, 1.0, Palette::BLACK);
    layer.set_fill_color(color(Palette::BLACK));
    layer.use_text(
        signature_text,
        12.0,
        Mm(218.0),
        Mm(from_top(188.0) as f32),
        &helvetica,
    );

    centered_text(
        &layer,
        &format!(
            "Certificate ID: {} | Generated by CredChain",
            document.certificate_id
        ),
        10.0,
        HELVETICA_FACTOR,
        197.0,
        &helvetica,
        Palette::FADED,
    );

    doc.save_to_bytes()
        .map_err(|e| RenderError::Draw(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document() -> CertificateDocument {
        CertificateDocument {
            certificate_id: "CERT-aB3xY9kQ2m".to_string(),
            student_name: "Jane Doe".to_string(),
            student_department: "MCA".to_string(),
            student_semester: "3rd".to_string(),
            event_name: "Rust Systems Workshop".to_string(),
            event_date: "2026-03-14".to_string(),
            verify_url: "http://localhost:5173/verify/CERT-aB3xY9kQ2m".to_string(),
            style: CertificateStyle::default(),
        }
    }

    #[test]
    fn renders_a_pdf_document() {
        let bytes = render_certificate(&sample_document()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 1000);
    }

    #[test]
    fn style_overrides_do_not_break_rendering() {
        let mut document = sample_document();
        document.style = CertificateStyle {
            college_name: Some("Test Institute".to_string()),
            college_address: Some("Line one\nLine two".to_string()),
            header_department: Some("DEPARTMENT OF TESTING".to_string()),
            certificate_title: Some("CERTIFICATE OF EXCELLENCE".to_string()),
            event_type: Some("Hackathon".to_string()),
            event_duration: Some("2-day".to_string()),
            signature_text: Some("Head of Department".to_string()),
        };

        let bytes = render_certificate(&document).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn unparseable_dates_pass_through() {
        assert_eq!(display_date("14th March"), "14th March");
        assert_eq!(display_date("2026-03-14"), "14 March 2026");
    }
}
