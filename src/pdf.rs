//! The document composer: turns a draft plus invoice number, date and the
//! fixed issuer record into PDF bytes.
//!
//! Composition is a pure function of its inputs. PDF metadata (creation and
//! modification dates, document id) is derived from the issue date and the
//! invoice number rather than the wall clock, so identical inputs produce
//! byte-identical output. The composer never touches the counter.

use std::io::Cursor;

use printpdf::{
    CustomPdfConformance, IndirectFontRef, LineDashPattern, Mm, PdfConformance, PdfDocument,
    PdfLayerReference,
};
use time::Date;

use crate::draft::InvoiceDraft;
use crate::error::Error;
use crate::{format_issue_date, Issuer};

// Embedded Unicode face: the Latvian diacritics (ē, ķ, ģ, ī) are outside
// the PDF builtin-font encodings.
static FONT_BYTES: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN_X: f32 = 20.0;
const CONTENT_RIGHT: f32 = PAGE_W - MARGIN_X;
const CONTENT_W: f32 = CONTENT_RIGHT - MARGIN_X;

// Content on any page stays above this line; the disclaimer footer sits
// below it on the last page.
const FOOTER_LIMIT_Y: f32 = 25.0;
const FOOTER_TEXT_Y: f32 = 10.0;

const TITLE_SIZE: f32 = 18.0;
const BODY_SIZE: f32 = 12.0;
const DETAIL_SIZE: f32 = 11.0;
const TABLE_SIZE: f32 = 10.0;
const FOOTER_SIZE: f32 = 9.0;

const DETAIL_LINE_STEP: f32 = 6.5;
const TABLE_LINE_STEP: f32 = 4.5;

const DISCLAIMER: &str = "Rēķins sagatavots elektroniski un ir derīgs bez paraksta.";

#[derive(Clone, Copy)]
enum ColumnAlign {
    Left,
    Center,
    Right,
}

struct TableColumn {
    title: &'static str,
    width: f32,
    align: ColumnAlign,
}

// Fixed column grid; widths sum to the content width.
const TABLE_COLUMNS: [TableColumn; 4] = [
    TableColumn {
        title: "Pakalpojums/Prece",
        width: 70.0,
        align: ColumnAlign::Left,
    },
    TableColumn {
        title: "Daudzums",
        width: 20.0,
        align: ColumnAlign::Center,
    },
    TableColumn {
        title: "Cena ar PVN (€)",
        width: 40.0,
        align: ColumnAlign::Right,
    },
    TableColumn {
        title: "Summa ar PVN (€)",
        width: 40.0,
        align: ColumnAlign::Right,
    },
];

const TABLE_HEADER_H: f32 = 8.0;
const TABLE_CELL_PAD_X: f32 = 2.0;
const TABLE_ROW_TOP_PAD: f32 = 5.5;
const TABLE_ROW_BOTTOM_PAD: f32 = 2.5;

/// Renders one invoice. `draft` must already be validated; the composer has
/// no defined behavior for an empty item sequence.
pub fn compose(
    invoice_number: i64,
    issue_date: Date,
    issuer: &Issuer,
    draft: &InvoiceDraft,
) -> Result<Vec<u8>, Error> {
    debug_assert!(!draft.items.is_empty());

    let (doc, page1, layer1) = PdfDocument::new(
        format!("Rēķins Nr. {invoice_number}"),
        Mm(PAGE_W),
        Mm(PAGE_H),
        "Layer 1",
    );

    // Deterministic metadata: no wall clock, no random ids, no XMP packet.
    let created = issue_date.midnight().assume_utc();
    let doc = doc
        .with_conformance(PdfConformance::Custom(CustomPdfConformance {
            requires_icc_profile: false,
            requires_xmp_metadata: false,
            ..Default::default()
        }))
        .with_creation_date(created)
        .with_mod_date(created)
        .with_document_id(format!("rekins-{invoice_number}"));

    let font = doc
        .add_external_font(Cursor::new(FONT_BYTES))
        .map_err(|e| Error::Pdf(e.to_string()))?;
    let face = ttf_parser::Face::parse(FONT_BYTES, 0)
        .map_err(|_| Error::Pdf("failed to parse embedded font".to_string()))?;

    let mut layer = doc.get_page(page1).get_layer(layer1);

    // Title, centered.
    let title = format!("Rēķins Nr. {invoice_number}");
    push_line_centered(&layer, &font, &face, &title, TITLE_SIZE, PAGE_W / 2.0, PAGE_H - 20.0);

    // Date line.
    let date_line = format!("Datums: {}", format_issue_date(issue_date));
    push_line(&layer, &font, &date_line, BODY_SIZE, MARGIN_X, PAGE_H - 30.0);

    // Issuer block between two dashed rules.
    let mut y = PAGE_H - 45.0;
    draw_dashed_rule(&layer, MARGIN_X, CONTENT_RIGHT, y + 5.0);
    for line in issuer.document_lines() {
        push_line(&layer, &font, &line, DETAIL_SIZE, MARGIN_X, y);
        y -= DETAIL_LINE_STEP;
    }
    y -= 2.0;
    draw_dashed_rule(&layer, MARGIN_X, CONTENT_RIGHT, y);

    // Optional buyer block, wrapped to the content width.
    if let Some(buyer) = draft.buyer_text_trimmed() {
        y -= 10.0;
        push_line(&layer, &font, "Pircējs:", DETAIL_SIZE, MARGIN_X, y);
        y -= 6.0;
        for line in split_and_wrap_lines(&face, buyer, DETAIL_SIZE, CONTENT_W) {
            push_line(&layer, &font, &line, DETAIL_SIZE, MARGIN_X, y);
            y -= DETAIL_LINE_STEP;
        }
    }

    // Payment method.
    y -= 8.0;
    let payment_line = format!("Apmaksas kārtība: {}", draft.payment_method.label());
    push_line(&layer, &font, &payment_line, DETAIL_SIZE, MARGIN_X, y);

    // Items table. Rows that would cross into the footer band continue on a
    // fresh page under a repeated header row.
    y -= 8.0;
    y = draw_table_header(&layer, &font, &face, y);

    let name_width = TABLE_COLUMNS[0].width - 2.0 * TABLE_CELL_PAD_X;
    for item in &draft.items {
        let name_lines = split_and_wrap_lines(&face, &item.name, TABLE_SIZE, name_width);
        let extra_lines = name_lines.len().saturating_sub(1) as f32;
        let row_h = TABLE_ROW_TOP_PAD + extra_lines * TABLE_LINE_STEP + TABLE_ROW_BOTTOM_PAD;

        if y - row_h < FOOTER_LIMIT_Y {
            layer = new_page(&doc);
            y = draw_table_header(&layer, &font, &face, PAGE_H - 20.0);
        }

        let baseline = y - TABLE_ROW_TOP_PAD;
        if let Some(first) = name_lines.first() {
            draw_cell(&layer, &font, &face, first, &TABLE_COLUMNS[0], column_left(0), baseline);
        }
        for (idx, line) in name_lines.iter().enumerate().skip(1) {
            push_line(
                &layer,
                &font,
                line,
                TABLE_SIZE,
                column_left(0) + TABLE_CELL_PAD_X,
                baseline - idx as f32 * TABLE_LINE_STEP,
            );
        }

        let cells = [
            format_quantity(item.quantity),
            format_amount(item.unit_price_incl_tax),
            format_amount(item.line_total_incl_tax()),
        ];
        for (offset, text) in cells.iter().enumerate() {
            let col = 1 + offset;
            draw_cell(&layer, &font, &face, text, &TABLE_COLUMNS[col], column_left(col), baseline);
        }

        y -= row_h;
    }
    draw_rule(&layer, MARGIN_X, CONTENT_RIGHT, y, 0.3);

    // Summary block; moves to a fresh page as a whole if it no longer fits.
    const SUMMARY_X: f32 = 140.0;
    const SUMMARY_STEP: f32 = 7.0;
    if y - 8.0 - 3.0 * SUMMARY_STEP < FOOTER_LIMIT_Y {
        layer = new_page(&doc);
        y = PAGE_H - 20.0;
    }
    y -= 8.0;

    let totals = draft.totals();
    let summary = [
        format!("Summa bez PVN: {} €", format_amount(totals.total_excl_tax)),
        format!("PVN 21%: {} €", format_amount(totals.tax_amount)),
        format!("Kopā (ar PVN): {} €", format_amount(totals.total_incl_tax)),
    ];
    for line in &summary {
        push_line(&layer, &font, line, DETAIL_SIZE, SUMMARY_X, y);
        y -= SUMMARY_STEP;
    }

    // Disclaimer footer, centered near the bottom of the last page.
    set_fill_gray(&layer, 0.47);
    push_line_centered(&layer, &font, &face, DISCLAIMER, FOOTER_SIZE, PAGE_W / 2.0, FOOTER_TEXT_Y);
    set_fill_gray(&layer, 0.0);

    let mut writer = std::io::BufWriter::new(Vec::<u8>::new());
    doc.save(&mut writer).map_err(|e| Error::Pdf(e.to_string()))?;
    writer
        .into_inner()
        .map_err(|e| Error::Pdf(e.to_string()))
}

fn new_page(doc: &printpdf::PdfDocumentReference) -> PdfLayerReference {
    let (page, layer) = doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
    doc.get_page(page).get_layer(layer)
}

fn column_left(index: usize) -> f32 {
    MARGIN_X + TABLE_COLUMNS[..index].iter().map(|c| c.width).sum::<f32>()
}

/// Draws the header band: dark fill, white column titles, and returns the y
/// cursor positioned at the first row top.
fn draw_table_header(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    face: &ttf_parser::Face<'_>,
    band_top: f32,
) -> f32 {
    fill_rect(layer, MARGIN_X, band_top, CONTENT_W, TABLE_HEADER_H, 50.0 / 255.0);

    set_fill_gray(layer, 1.0);
    let baseline = band_top - 5.5;
    for (index, column) in TABLE_COLUMNS.iter().enumerate() {
        draw_cell(layer, font, face, column.title, column, column_left(index), baseline);
    }
    set_fill_gray(layer, 0.0);

    band_top - TABLE_HEADER_H
}

fn draw_cell(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    face: &ttf_parser::Face<'_>,
    text: &str,
    column: &TableColumn,
    col_left: f32,
    baseline: f32,
) {
    match column.align {
        ColumnAlign::Left => push_line(
            layer,
            font,
            text,
            TABLE_SIZE,
            col_left + TABLE_CELL_PAD_X,
            baseline,
        ),
        ColumnAlign::Center => push_line_centered(
            layer,
            font,
            face,
            text,
            TABLE_SIZE,
            col_left + column.width / 2.0,
            baseline,
        ),
        ColumnAlign::Right => push_line_right(
            layer,
            font,
            face,
            text,
            TABLE_SIZE,
            col_left + column.width - TABLE_CELL_PAD_X,
            baseline,
        ),
    }
}

fn push_line(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    text: &str,
    font_size: f32,
    x: f32,
    y: f32,
) {
    layer.use_text(text, font_size, Mm(x), Mm(y), font);
}

fn push_line_right(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    face: &ttf_parser::Face<'_>,
    text: &str,
    font_size: f32,
    x_right: f32,
    y: f32,
) {
    let width = text_width_mm(face, text, font_size);
    push_line(layer, font, text, font_size, (x_right - width).max(0.0), y);
}

fn push_line_centered(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    face: &ttf_parser::Face<'_>,
    text: &str,
    font_size: f32,
    x_center: f32,
    y: f32,
) {
    let width = text_width_mm(face, text, font_size);
    push_line(layer, font, text, font_size, (x_center - width / 2.0).max(0.0), y);
}

fn text_width_mm(face: &ttf_parser::Face<'_>, text: &str, font_size_pt: f32) -> f32 {
    // PDF font sizes are in points; the page grid is in millimeters.
    const PT_TO_MM: f32 = 25.4 / 72.0;
    let units_per_em = face.units_per_em() as f32;
    if units_per_em <= 0.0 {
        return 0.0;
    }

    let mut width_units: i32 = 0;
    for ch in text.chars() {
        let Some(gid) = face.glyph_index(ch) else {
            continue;
        };
        width_units += face.glyph_hor_advance(gid).unwrap_or(0) as i32;
    }

    (width_units as f32 / units_per_em) * font_size_pt * PT_TO_MM
}

fn draw_rule(layer: &PdfLayerReference, x1: f32, x2: f32, y: f32, thickness: f32) {
    layer.set_outline_thickness(thickness);
    layer.add_line(printpdf::Line {
        points: vec![
            (printpdf::Point::new(Mm(x1), Mm(y)), false),
            (printpdf::Point::new(Mm(x2), Mm(y)), false),
        ],
        is_closed: false,
    });
}

fn draw_dashed_rule(layer: &PdfLayerReference, x1: f32, x2: f32, y: f32) {
    set_outline_gray(layer, 150.0 / 255.0);
    layer.set_line_dash_pattern(LineDashPattern {
        dash_1: Some(2),
        gap_1: Some(2),
        ..Default::default()
    });
    draw_rule(layer, x1, x2, y, 0.2);
    layer.set_line_dash_pattern(LineDashPattern::default());
    set_outline_gray(layer, 0.0);
}

fn fill_rect(layer: &PdfLayerReference, x: f32, y_top: f32, w: f32, h: f32, gray: f32) {
    use printpdf::{path::PaintMode, Rect};

    set_fill_gray(layer, gray);
    let rect = Rect::new(Mm(x), Mm(y_top - h), Mm(x + w), Mm(y_top)).with_mode(PaintMode::Fill);
    layer.add_rect(rect);
    set_fill_gray(layer, 0.0);
}

// Text is painted with the fill color, so this doubles as the text color.
fn set_fill_gray(layer: &PdfLayerReference, gray: f32) {
    use printpdf::{Color, Rgb};
    layer.set_fill_color(Color::Rgb(Rgb::new(gray, gray, gray, None)));
}

fn set_outline_gray(layer: &PdfLayerReference, gray: f32) {
    use printpdf::{Color, Rgb};
    layer.set_outline_color(Color::Rgb(Rgb::new(gray, gray, gray, None)));
}

fn format_amount(v: f64) -> String {
    format!("{:.2}", v)
}

fn format_quantity(v: f64) -> String {
    format!("{:.2}", v)
}

fn wrap_text_by_width_mm(
    face: &ttf_parser::Face<'_>,
    input: &str,
    font_size: f32,
    max_width_mm: f32,
) -> Vec<String> {
    let s = input.trim();
    if s.is_empty() {
        return Vec::new();
    }

    let mut out: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in s.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };

        if text_width_mm(face, &candidate, font_size) <= max_width_mm {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }

        if text_width_mm(face, word, font_size) <= max_width_mm {
            current.push_str(word);
        } else {
            // Split a single too-long word into chunks.
            let mut chunk = String::new();
            for ch in word.chars() {
                let cand = format!("{chunk}{ch}");
                if text_width_mm(face, &cand, font_size) <= max_width_mm {
                    chunk = cand;
                } else {
                    if !chunk.is_empty() {
                        out.push(chunk);
                    }
                    chunk = ch.to_string();
                }
            }
            current = chunk;
        }
    }

    if !current.is_empty() {
        out.push(current);
    }

    out
}

fn split_and_wrap_lines(
    face: &ttf_parser::Face<'_>,
    input: &str,
    font_size: f32,
    max_width_mm: f32,
) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for raw in input.lines() {
        let s = raw.trim();
        if s.is_empty() {
            continue;
        }
        out.extend(wrap_text_by_width_mm(face, s, font_size, max_width_mm));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::{LineItem, PaymentMethod};
    use crate::ISSUER;
    use time::macros::date;

    fn draft_with(items: Vec<LineItem>) -> InvoiceDraft {
        InvoiceDraft {
            items,
            buyer_text: Some("SIA Pircējs, Brīvības iela 1, Rīga".to_string()),
            payment_method: PaymentMethod::BankTransfer,
        }
    }

    fn item(name: &str, quantity: f64, unit_price: f64) -> LineItem {
        LineItem {
            name: name.to_string(),
            quantity,
            unit_price_incl_tax: unit_price,
        }
    }

    #[test]
    fn compose_emits_a_pdf() {
        let draft = draft_with(vec![item("Konsultācija", 2.0, 10.0)]);
        let bytes = compose(2501, date!(2025 - 03 - 07), &ISSUER, &draft).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn compose_is_a_pure_function_of_its_inputs() {
        let draft = draft_with(vec![
            item("Konsultācija", 2.0, 10.0),
            item("Piegāde Rīgas robežās", 1.0, 7.5),
        ]);

        let first = compose(2501, date!(2025 - 03 - 07), &ISSUER, &draft).unwrap();
        let second = compose(2501, date!(2025 - 03 - 07), &ISSUER, &draft).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn different_numbers_produce_different_documents() {
        let draft = draft_with(vec![item("Konsultācija", 2.0, 10.0)]);
        let a = compose(2501, date!(2025 - 03 - 07), &ISSUER, &draft).unwrap();
        let b = compose(2502, date!(2025 - 03 - 07), &ISSUER, &draft).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn long_item_lists_flow_onto_further_pages() {
        let many: Vec<LineItem> = (0..120)
            .map(|i| item(&format!("Pozīcija {i}"), 1.0, 3.0 + i as f64))
            .collect();
        let short = compose(2501, date!(2025 - 03 - 07), &ISSUER, &draft_with(vec![item("A", 1.0, 1.0)]))
            .unwrap();
        let long = compose(2501, date!(2025 - 03 - 07), &ISSUER, &draft_with(many)).unwrap();

        // A 120-row table cannot fit one A4 page; the composer must keep
        // rendering instead of rejecting the draft.
        assert!(long.len() > short.len());
    }

    #[test]
    fn embedded_font_measures_text() {
        let face = ttf_parser::Face::parse(FONT_BYTES, 0).unwrap();
        let narrow = text_width_mm(&face, "i", 10.0);
        let wide = text_width_mm(&face, "Rēķins Nr. 2501", 10.0);
        assert!(narrow > 0.0);
        assert!(wide > narrow);
    }

    #[test]
    fn wrapping_respects_width_and_splits_oversized_words() {
        let face = ttf_parser::Face::parse(FONT_BYTES, 0).unwrap();

        assert!(wrap_text_by_width_mm(&face, "   ", 11.0, 50.0).is_empty());

        let lines = wrap_text_by_width_mm(
            &face,
            "Ilgstoša tehniskā apkalpošana un konsultācijas par iekārtu ekspluatāciju",
            11.0,
            60.0,
        );
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width_mm(&face, line, 11.0) <= 60.0);
        }

        let split = wrap_text_by_width_mm(&face, &"x".repeat(200), 11.0, 30.0);
        assert!(split.len() > 1);
    }
}
