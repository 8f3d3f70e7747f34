//! Coordinate-based text patching
//!
//! Each edit covers its rectangle with opaque white and, when it carries
//! replacement text, draws that text in Helvetica at the rectangle's origin.
//! The existing page content is never parsed or rewritten; patches are
//! appended as separate content streams on top of it.

use std::collections::HashSet;

use lopdf::content::Operation;
use lopdf::{dictionary, Document, Object, ObjectId, StringFormat};

use crate::error::PdfToolError;
use crate::operations::EditInstruction;
use crate::page;

/// Resource name the overlay font is registered under on edited pages
pub const OVERLAY_FONT: &str = "PdfToolHelv";

pub const OVERLAY_FONT_SIZE: i64 = 12;

/// Apply `edits` in order. Every instruction is validated first, so an
/// invalid one leaves the document untouched.
pub fn apply_edits(doc: &mut Document, edits: &[EditInstruction]) -> Result<(), PdfToolError> {
    let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();

    let mut encoded = Vec::with_capacity(edits.len());
    for edit in edits {
        edit.validate(pages.len())?;
        encoded.push(encode_win_ansi(&edit.replacement_text)?);
    }
    if edits.is_empty() {
        return Ok(());
    }

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut isolated: HashSet<ObjectId> = HashSet::new();
    for (edit, text) in edits.iter().zip(encoded) {
        let page_id = pages[edit.page_index];
        if isolated.insert(page_id) {
            page::isolate_existing_content(doc, page_id)?;
            page::register_font(doc, page_id, OVERLAY_FONT, font_id)?;
        }
        let patch = page::encode_operations(patch_operations(edit, text))?;
        page::append_content(doc, page_id, patch)?;
    }

    tracing::debug!(
        edits = edits.len(),
        pages = isolated.len(),
        "Applied text edits"
    );
    Ok(())
}

/// `q`, white box, optional black text, `Q`
fn patch_operations(edit: &EditInstruction, text: Vec<u8>) -> Vec<Operation> {
    let area = edit.rect();
    let mut ops = vec![
        Operation::new("q", vec![]),
        Operation::new("rg", vec![1.into(), 1.into(), 1.into()]),
        Operation::new(
            "re",
            vec![
                Object::Real(area.x),
                Object::Real(area.y),
                Object::Real(area.width),
                Object::Real(area.height),
            ],
        ),
        Operation::new("f", vec![]),
    ];

    if !text.is_empty() {
        ops.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![OVERLAY_FONT.into(), OVERLAY_FONT_SIZE.into()]),
            Operation::new("rg", vec![0.into(), 0.into(), 0.into()]),
            Operation::new("Td", vec![Object::Real(area.x), Object::Real(area.y)]),
            Operation::new("Tj", vec![Object::String(text, StringFormat::Literal)]),
            Operation::new("ET", vec![]),
        ]);
    }

    ops.push(Operation::new("Q", vec![]));
    ops
}

/// Encode `text` for a simple font using WinAnsiEncoding
pub fn encode_win_ansi(text: &str) -> Result<Vec<u8>, PdfToolError> {
    text.chars()
        .map(|ch| {
            win_ansi_byte(ch).ok_or_else(|| {
                PdfToolError::UnsupportedText(format!(
                    "character {:?} (U+{:04X}) is not in WinAnsiEncoding",
                    ch, ch as u32
                ))
            })
        })
        .collect()
}

fn win_ansi_byte(ch: char) -> Option<u8> {
    let byte = match ch {
        ' '..='~' | '\u{A0}'..='\u{FF}' => ch as u8,
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8A,
        '‹' => 0x8B,
        'Œ' => 0x8C,
        'Ž' => 0x8E,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9A,
        '›' => 0x9B,
        'œ' => 0x9C,
        'ž' => 0x9E,
        'Ÿ' => 0x9F,
        _ => return None,
    };
    Some(byte)
}
