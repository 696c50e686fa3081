//! Normalised in-memory document representation.

use serde::{Deserialize, Serialize};

/// US Letter width in PDF points, used when a page declares no geometry.
pub const DEFAULT_PAGE_WIDTH: f32 = 612.0;
/// US Letter height in PDF points.
pub const DEFAULT_PAGE_HEIGHT: f32 = 792.0;

/// Minimum overlap, in points, for a box to count as inside a page band.
pub const BAND_TOLERANCE: f32 = 0.5;

/// Format the document was ingested from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    /// Plain UTF-8 text.
    #[default]
    Text,
    /// PDF document.
    Pdf,
}

/// A run of text placed on a page.
///
/// Coordinates use a top-left origin: `y` grows downwards, so a box near the
/// bottom of the page has `y` close to the page height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBox {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl TextBox {
    pub fn new(text: impl Into<String>, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            width,
            height,
        }
    }
}

/// Geometry and text of a single page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    /// 1-based page number.
    pub page_number: usize,
    pub width: f32,
    pub height: f32,
    /// Page text in reading order.
    pub text: String,
    /// Positioned text boxes.
    #[serde(default)]
    pub boxes: Vec<TextBox>,
}

impl PageLayout {
    /// Boxes reaching into the bottom `fraction` of the page.
    ///
    /// A box belongs to the band when more than [`BAND_TOLERANCE`] points of
    /// it overlap the band.
    pub fn bottom_band(&self, fraction: f32) -> impl Iterator<Item = &TextBox> {
        let cutoff = self.height * (1.0 - fraction.clamp(0.0, 1.0));
        self.boxes
            .iter()
            .filter(move |b| b.y + b.height > cutoff + BAND_TOLERANCE)
    }

    /// Reassemble a set of boxes into lines of text in reading order.
    ///
    /// Boxes whose vertical positions differ by less than half a line are
    /// joined on one line, separated by a double space.
    pub fn lines_of<'a>(boxes: impl IntoIterator<Item = &'a TextBox>) -> Vec<String> {
        let mut sorted: Vec<&TextBox> = boxes.into_iter().collect();
        sorted.sort_by(|a, b| {
            a.y.partial_cmp(&b.y)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
        });

        let mut lines: Vec<(f32, Vec<&TextBox>)> = Vec::new();
        for b in sorted {
            let tolerance = (b.height / 2.0).max(1.0);
            match lines.last_mut() {
                Some((y, members)) if (b.y - *y).abs() < tolerance => members.push(b),
                _ => lines.push((b.y, vec![b])),
            }
        }

        lines
            .into_iter()
            .map(|(_, mut members)| {
                members.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));
                members
                    .iter()
                    .map(|b| b.text.trim())
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
                    .join("  ")
            })
            .filter(|line| !line.is_empty())
            .collect()
    }
}

/// Normalised document handed to every extraction strategy.
///
/// Created once per job and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    /// Concatenated text of all pages.
    pub full_text: String,
    /// Per-page layout, in page order.
    pub pages: Vec<PageLayout>,
    pub modality: Modality,
}

impl RawDocument {
    /// Build a document from its pages, deriving the full text.
    pub fn from_pages(pages: Vec<PageLayout>, modality: Modality) -> Self {
        let full_text = pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            full_text,
            pages,
            modality,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// The final page with text, where signature blocks conventionally live.
    ///
    /// Trailing blank pages are skipped. A document without text yields its
    /// last page as is.
    pub fn last_page(&self) -> Option<&PageLayout> {
        self.pages
            .iter()
            .rev()
            .find(|p| !p.text.trim().is_empty())
            .or_else(|| self.pages.last())
    }

    /// Check if the document carries any non-whitespace text.
    pub fn is_empty(&self) -> bool {
        self.full_text.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(boxes: Vec<TextBox>) -> PageLayout {
        PageLayout {
            page_number: 1,
            width: DEFAULT_PAGE_WIDTH,
            height: DEFAULT_PAGE_HEIGHT,
            text: String::new(),
            boxes,
        }
    }

    #[test]
    fn test_bottom_band_filters_by_height() {
        let layout = page(vec![
            TextBox::new("header", 72.0, 40.0, 100.0, 12.0),
            TextBox::new("By: Jane Doe", 72.0, 700.0, 100.0, 12.0),
        ]);

        let band: Vec<_> = layout.bottom_band(0.30).map(|b| b.text.as_str()).collect();
        assert_eq!(band, vec!["By: Jane Doe"]);
    }

    #[test]
    fn test_lines_of_joins_same_row() {
        let boxes = vec![
            TextBox::new("Title: CFO", 300.0, 700.5, 60.0, 12.0),
            TextBox::new("By: Jane Doe", 72.0, 700.0, 80.0, 12.0),
            TextBox::new("Date: 2024-01-01", 72.0, 720.0, 80.0, 12.0),
        ];

        let lines = PageLayout::lines_of(&boxes);
        assert_eq!(lines, vec!["By: Jane Doe  Title: CFO", "Date: 2024-01-01"]);
    }

    #[test]
    fn test_from_pages_joins_text() {
        let mut first = page(vec![]);
        first.text = "Page one".to_string();
        let mut second = page(vec![]);
        second.page_number = 2;
        second.text = "Page two".to_string();

        let doc = RawDocument::from_pages(vec![first, second], Modality::Text);
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.full_text, "Page one\nPage two");
        assert_eq!(doc.last_page().map(|p| p.page_number), Some(2));
        assert!(!doc.is_empty());
    }

    #[test]
    fn test_last_page_skips_blank_back_pages() {
        let mut signed = page(vec![]);
        signed.text = "By: Jane Doe".to_string();
        let mut blank = page(vec![]);
        blank.page_number = 2;
        blank.text = " \n".to_string();

        let doc = RawDocument::from_pages(vec![signed, blank], Modality::Pdf);
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.last_page().map(|p| p.page_number), Some(1));
    }
}
