//! Rich Text Format rendering of a credential sheet.
//!
//! RTF opens in every word processor, so it stands in for an editable
//! document without pulling in an OOXML writer.

use super::sheet::{CredentialSheet, SheetSection};

/// Colour table entries: 1 teal, 2 orange, 3 blue, 4 red.
const COLOR_TABLE: &str =
    r"{\colortbl;\red26\green188\blue156;\red243\green156\blue18;\red52\green152\blue219;\red231\green76\blue60;}";

/// Escape text for an RTF body: control characters are escaped and anything
/// outside ASCII is written as a `\uN?` unicode escape.
pub fn escape_rtf(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str(r"\\"),
            '{' => out.push_str(r"\{"),
            '}' => out.push_str(r"\}"),
            '\n' => out.push_str(r"\line "),
            c if c.is_ascii() => out.push(c),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    // RTF takes signed 16-bit values
                    out.push_str(&format!(r"\u{}?", *unit as i16));
                }
            }
        }
    }
    out
}

fn push_section(out: &mut String, section: &SheetSection) {
    out.push_str(&format!(
        "\\pard\\sb240\\b\\cf2\\fs24 {}\\cf0\\b0\\par\n",
        escape_rtf(&section.title)
    ));
    for field in &section.fields {
        if field.emphasized {
            out.push_str(&format!(
                "\\pard\\fs22 {}\\tab \\b\\cf4\\fs28 {}\\cf0\\b0\\fs22\\par\n",
                escape_rtf(&field.label),
                escape_rtf(&field.value)
            ));
        } else {
            out.push_str(&format!(
                "\\pard\\fs22 {}\\tab {}\\par\n",
                escape_rtf(&field.label),
                escape_rtf(&field.value)
            ));
        }
    }
}

/// Render `sheet` as an RTF document.
pub fn render_rtf(sheet: &CredentialSheet) -> Vec<u8> {
    let mut out = String::new();
    out.push_str("{\\rtf1\\ansi\\ansicpg1252\\deff0\n");
    out.push_str("{\\fonttbl{\\f0\\fswiss Helvetica;}}\n");
    out.push_str(COLOR_TABLE);
    out.push('\n');
    out.push_str("\\tx3600\n");

    out.push_str(&format!(
        "\\pard\\qc\\b\\cf1\\fs36 {}\\cf0\\b0\\par\n",
        escape_rtf(&sheet.lab_title)
    ));
    out.push_str(&format!("\\pard\\qc\\fs22 {}\\par\n", escape_rtf(&sheet.location)));
    out.push_str(&format!(
        "\\pard\\qc\\sb360\\b\\cf1\\fs28 {}\\cf0\\b0\\par\n",
        escape_rtf(&sheet.heading)
    ));

    for section in sheet.sections() {
        push_section(&mut out, section);
    }

    out.push_str(&format!(
        "\\pard\\sb240\\b\\cf3\\fs24 {}\\cf0\\b0\\par\n",
        escape_rtf(&sheet.instructions_title)
    ));
    for line in &sheet.instructions {
        out.push_str(&format!("\\pard\\fs22 {}\\par\n", escape_rtf(line)));
    }

    out.push_str(&format!(
        "\\pard\\sb360\\fs20 {}\\par\n",
        escape_rtf(&sheet.issued_line)
    ));
    out.push('}');

    out.into_bytes()
}
