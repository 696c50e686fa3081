//! Positioned text recovery from PDF content streams.
//!
//! Walks each page's text operators with lopdf, tracking the text matrix
//! closely enough to place every shown string on the page. The current
//! transformation matrix (`cm`) is not applied; contracts produced by word
//! processors keep text in page space, which is all the signature zone
//! heuristics need.

use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};

use crate::error::{IngestError, IngestResult};
use crate::types::{TextBox, DEFAULT_PAGE_HEIGHT, DEFAULT_PAGE_WIDTH};

/// Average glyph advance as a fraction of the font size.
const GLYPH_ADVANCE: f32 = 0.5;
/// TJ adjustments more negative than this are treated as word gaps.
const WORD_GAP_ADJUSTMENT: f32 = -200.0;

/// Geometry and boxes of one PDF page.
#[derive(Debug, Clone)]
pub(crate) struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub boxes: Vec<TextBox>,
}

type Matrix = [f32; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

fn translate(m: &Matrix, tx: f32, ty: f32) -> Matrix {
    [
        m[0],
        m[1],
        m[2],
        m[3],
        tx * m[0] + ty * m[2] + m[4],
        tx * m[1] + ty * m[3] + m[5],
    ]
}

#[derive(Debug)]
struct TextState {
    matrix: Matrix,
    line_matrix: Matrix,
    leading: f32,
    font_size: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            matrix: IDENTITY,
            line_matrix: IDENTITY,
            leading: 0.0,
            font_size: 12.0,
        }
    }
}

impl TextState {
    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = translate(&self.line_matrix, tx, ty);
        self.matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = self.leading;
        self.move_line(0.0, -leading);
    }

    fn rendered_size(&self) -> f32 {
        let scale = self.matrix[3].abs();
        let size = self.font_size * if scale > 0.0 { scale } else { 1.0 };
        size.max(1.0)
    }
}

/// Extract geometry for every page, in page order.
pub(crate) fn page_geometries(content: &[u8]) -> IngestResult<Vec<PageGeometry>> {
    let doc = Document::load_mem(content)
        .map_err(|e| IngestError::Pdf(format!("Failed to parse PDF: {}", e)))?;

    let pages = doc.get_pages();
    let mut geometries = Vec::with_capacity(pages.len());

    for (page_number, page_id) in pages {
        let (width, height) = media_box(&doc, page_id)
            .unwrap_or((DEFAULT_PAGE_WIDTH, DEFAULT_PAGE_HEIGHT));

        let boxes = match page_boxes(&doc, page_id, height) {
            Ok(boxes) => boxes,
            Err(e) => {
                tracing::warn!(page = page_number, error = %e, "Could not decode page content");
                Vec::new()
            }
        };

        geometries.push(PageGeometry {
            width,
            height,
            boxes,
        });
    }

    Ok(geometries)
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// Page size from the MediaBox, following the Parent chain for inherited boxes.
fn media_box(doc: &Document, page_id: ObjectId) -> Option<(f32, f32)> {
    let mut current = doc.get_dictionary(page_id).ok()?;

    // Page trees are shallow; the bound guards against reference cycles.
    for _ in 0..32 {
        if let Ok(obj) = current.get(b"MediaBox") {
            let values: Vec<f32> = resolve(doc, obj)?
                .as_array()
                .ok()?
                .iter()
                .filter_map(|v| resolve(doc, v).and_then(number))
                .collect();
            if let [x0, y0, x1, y1] = values[..] {
                return Some(((x1 - x0).abs(), (y1 - y0).abs()));
            }
            return None;
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// Decode a PDF string operand. UTF-16BE when it carries a BOM, Latin-1 otherwise.
fn decode_string(bytes: &[u8]) -> String {
    if bytes.starts_with(&[0xFE, 0xFF]) {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| b as char).collect()
}

fn shown_text(operand: &Object) -> String {
    match operand {
        Object::String(bytes, _) => decode_string(bytes),
        Object::Array(items) => {
            let mut text = String::new();
            for item in items {
                match item {
                    Object::String(bytes, _) => text.push_str(&decode_string(bytes)),
                    other => {
                        if number(other).is_some_and(|n| n < WORD_GAP_ADJUSTMENT) {
                            text.push(' ');
                        }
                    }
                }
            }
            text
        }
        _ => String::new(),
    }
}

fn page_boxes(doc: &Document, page_id: ObjectId, page_height: f32) -> IngestResult<Vec<TextBox>> {
    let raw = doc
        .get_page_content(page_id)
        .map_err(|e| IngestError::Pdf(format!("Missing page content: {}", e)))?;
    let content = Content::decode(&raw)
        .map_err(|e| IngestError::Pdf(format!("Invalid content stream: {}", e)))?;

    let mut state = TextState::default();
    let mut boxes = Vec::new();

    for op in &content.operations {
        let operands = &op.operands;
        let num = |i: usize| operands.get(i).and_then(number);

        let shown = match op.operator.as_str() {
            "BT" => {
                state.matrix = IDENTITY;
                state.line_matrix = IDENTITY;
                None
            }
            "Tf" => {
                if let Some(size) = num(1) {
                    state.font_size = size;
                }
                None
            }
            "TL" => {
                if let Some(leading) = num(0) {
                    state.leading = leading;
                }
                None
            }
            "Td" => {
                if let (Some(tx), Some(ty)) = (num(0), num(1)) {
                    state.move_line(tx, ty);
                }
                None
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (num(0), num(1)) {
                    state.leading = -ty;
                    state.move_line(tx, ty);
                }
                None
            }
            "Tm" => {
                let values: Vec<f32> = operands.iter().filter_map(number).collect();
                if let [a, b, c, d, e, f] = values[..] {
                    state.line_matrix = [a, b, c, d, e, f];
                    state.matrix = state.line_matrix;
                }
                None
            }
            "T*" => {
                state.next_line();
                None
            }
            "Tj" | "TJ" => operands.first().map(shown_text),
            "'" => {
                state.next_line();
                operands.first().map(shown_text)
            }
            "\"" => {
                state.next_line();
                operands.get(2).map(shown_text)
            }
            _ => None,
        };

        let Some(text) = shown else { continue };
        if text.trim().is_empty() {
            continue;
        }

        let size = state.rendered_size();
        let width = text.chars().count() as f32 * size * GLYPH_ADVANCE;
        let baseline = state.matrix[5];
        boxes.push(TextBox::new(
            text,
            state.matrix[4],
            (page_height - baseline - size).max(0.0),
            width,
            size,
        ));

        // Advance along the baseline so consecutive shows on one line stay ordered.
        state.matrix[4] += width;
    }

    Ok(boxes)
}
