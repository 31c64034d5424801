//! PDF rendering of a credential sheet.

use std::io::BufWriter;

use printpdf::{BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfLayerReference, Rgb};

use super::sheet::CredentialSheet;
use super::{ExportError, ExportResult};

/// US letter.
const PAGE_WIDTH: Mm = Mm(215.9);
const PAGE_HEIGHT: Mm = Mm(279.4);

const LEFT: Mm = Mm(25.0);
const VALUE_COLUMN: Mm = Mm(85.0);

/// Heading colours: teal title, orange sections, blue instructions, red code.
const TEAL: (f32, f32, f32) = (0.102, 0.737, 0.612);
const ORANGE: (f32, f32, f32) = (0.953, 0.612, 0.071);
const BLUE: (f32, f32, f32) = (0.204, 0.596, 0.859);
const RED: (f32, f32, f32) = (0.906, 0.298, 0.235);
const BLACK: (f32, f32, f32) = (0.0, 0.0, 0.0);

fn fill(layer: &PdfLayerReference, (r, g, b): (f32, f32, f32)) {
    layer.set_fill_color(Color::Rgb(Rgb::new(r, g, b, None)));
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

/// Render `sheet` as a single-page PDF.
pub fn render_pdf(sheet: &CredentialSheet) -> ExportResult<Vec<u8>> {
    let (doc, page, layer) = PdfDocument::new(&sheet.heading, PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");
    let layer = doc.get_page(page).get_layer(layer);

    let fonts = Fonts {
        regular: doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ExportError::Pdf(format!("font error: {e}")))?,
        bold: doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ExportError::Pdf(format!("font error: {e}")))?,
    };

    let mut y = Mm(255.0);

    fill(&layer, TEAL);
    layer.use_text(&sheet.lab_title, 18.0, LEFT, y, &fonts.bold);
    y -= Mm(7.0);
    fill(&layer, BLACK);
    layer.use_text(&sheet.location, 11.0, LEFT, y, &fonts.regular);
    y -= Mm(14.0);

    fill(&layer, TEAL);
    layer.use_text(&sheet.heading, 14.0, LEFT, y, &fonts.bold);
    y -= Mm(12.0);

    for section in sheet.sections() {
        fill(&layer, ORANGE);
        layer.use_text(&section.title, 12.0, LEFT, y, &fonts.bold);
        y -= Mm(8.0);

        for field in &section.fields {
            fill(&layer, BLACK);
            layer.use_text(&field.label, 11.0, LEFT, y, &fonts.regular);
            if field.emphasized {
                fill(&layer, RED);
                layer.use_text(&field.value, 14.0, VALUE_COLUMN, y, &fonts.bold);
            } else {
                layer.use_text(&field.value, 11.0, VALUE_COLUMN, y, &fonts.regular);
            }
            y -= Mm(7.0);
        }
        y -= Mm(6.0);
    }

    fill(&layer, BLUE);
    layer.use_text(&sheet.instructions_title, 12.0, LEFT, y, &fonts.bold);
    y -= Mm(8.0);
    fill(&layer, BLACK);
    for line in &sheet.instructions {
        layer.use_text(line, 11.0, LEFT, y, &fonts.regular);
        y -= Mm(6.5);
    }

    y -= Mm(8.0);
    layer.use_text(&sheet.issued_line, 10.0, LEFT, y, &fonts.regular);

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| ExportError::Pdf(format!("save error: {e}")))?;
    buf.into_inner()
        .map_err(|e| ExportError::Pdf(format!("buffer error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LabProfile;
    use crate::models::ResultRecord;
    use chrono::Utc;

    #[test]
    fn test_render_pdf_produces_pdf() {
        let result = ResultRecord {
            id: 1,
            order_number: "ORD-1".into(),
            patient_id: None,
            patient_name: "Luis Mamani".into(),
            patient_ci: "7654321".into(),
            sample_date: None,
            file_name: None,
            file_checksum: None,
            access_code: "ZZZZ9999".into(),
            created_at: Utc::now(),
        };
        let sheet = CredentialSheet::build(&result, &LabProfile::default());

        let bytes = render_pdf(&sheet).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
