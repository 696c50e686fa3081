//! Signature-block extraction from page geometry.
//!
//! Only the bottom band of the final page is read. Within it, a `By:` line
//! followed by a `Name:` or `Title:` marker is taken as the signature block.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use pactum_extractors::{PageLayout, RawDocument};
use regex::Regex;

use crate::error::PactumResult;
use crate::traits::ExtractionStrategy;
use crate::types::{collapse_whitespace, ContractField, ExtractedField, FieldValue, StrategyKind};

/// Confidence of a signatory read from a signature block.
pub const SIGNATURE_CONFIDENCE: f32 = 0.98;

/// Lines after the `By:` line searched for name and title markers.
const BLOCK_LOOKAHEAD: usize = 4;

static MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(by|print(?:ed)?\s+name|name|title|its|date|signature)\s*:").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    By,
    Name,
    Title,
    Other,
}

impl Marker {
    fn from_label(label: &str) -> Self {
        let label = label.to_ascii_lowercase();
        match label.as_str() {
            "by" => Self::By,
            "title" | "its" => Self::Title,
            l if l.ends_with("name") => Self::Name,
            _ => Self::Other,
        }
    }
}

/// Markers on a line with their cleaned values, left to right.
///
/// A value runs from its marker to the next marker or to a column gap (two
/// spaces), whichever comes first.
fn markers_in(line: &str) -> Vec<(Marker, String)> {
    let found: Vec<_> = MARKER
        .captures_iter(line)
        .filter_map(|c| Some((c.get(0)?, c.get(1)?)))
        .collect();

    found
        .iter()
        .enumerate()
        .map(|(k, (whole, label))| {
            let end = found.get(k + 1).map_or(line.len(), |(next, _)| next.start());
            (
                Marker::from_label(label.as_str()),
                clean_value(&line[whole.end()..end]),
            )
        })
        .collect()
}

fn clean_value(raw: &str) -> String {
    let column = raw.trim_start().split("  ").next().unwrap_or_default();
    let value = column.replace("/s/", " ").replace('_', " ");
    collapse_whitespace(value.trim_matches(|c: char| !c.is_alphanumeric()))
}

/// Signatory read from a signature block.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureBlock {
    pub name: String,
    pub title: Option<String>,
    /// The block's lines, space-joined.
    pub text: String,
}

/// Find the first signature block in `lines`.
///
/// The name comes from a `Name:` marker when present, otherwise from the
/// `By:` line. A block without any name or title marker is ignored.
pub fn parse_signature_block(lines: &[String]) -> Option<SignatureBlock> {
    let parsed: Vec<Vec<(Marker, String)>> = lines.iter().map(|l| markers_in(l)).collect();
    let has_by = |markers: &[(Marker, String)]| markers.iter().any(|(m, _)| *m == Marker::By);

    for (i, line) in parsed.iter().enumerate() {
        let Some(by_index) = line.iter().position(|(m, _)| *m == Marker::By) else {
            continue;
        };

        let limit = lines.len().min(i + 1 + BLOCK_LOOKAHEAD);
        let end = (i + 1..limit)
            .find(|&j| has_by(parsed[j].as_slice()))
            .unwrap_or(limit);

        let block: Vec<&(Marker, String)> = line[by_index..]
            .iter()
            .chain(parsed[i + 1..end].iter().flatten())
            .collect();

        let first_value = |marker: Marker| {
            block
                .iter()
                .find(|(m, v)| *m == marker && !v.is_empty())
                .map(|(_, v)| v.clone())
        };
        let has_detail = block
            .iter()
            .any(|(m, _)| matches!(m, Marker::Name | Marker::Title));

        let name = first_value(Marker::Name).or_else(|| first_value(Marker::By));
        match name {
            Some(name) if has_detail => {
                return Some(SignatureBlock {
                    name,
                    title: first_value(Marker::Title),
                    text: lines[i..end].join(" "),
                });
            }
            _ => continue,
        }
    }
    None
}

/// Signatory from the final page's signature zone.
#[derive(Debug, Clone)]
pub struct SignatureStrategy {
    zone_fraction: f32,
}

impl SignatureStrategy {
    /// `zone_fraction` is the share of the page height, from the bottom, searched.
    pub fn new(zone_fraction: f32) -> Self {
        Self { zone_fraction }
    }
}

#[async_trait]
impl ExtractionStrategy for SignatureStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Layout
    }

    async fn extract(&self, document: &RawDocument) -> PactumResult<Vec<ExtractedField>> {
        let Some(page) = document.last_page() else {
            return Ok(Vec::new());
        };

        let lines = PageLayout::lines_of(page.bottom_band(self.zone_fraction));
        let Some(block) = parse_signature_block(&lines) else {
            tracing::debug!(
                page = page.page_number,
                lines = lines.len(),
                "No signature block in zone"
            );
            return Ok(Vec::new());
        };

        let snippet = format!("Signature zone on page {}: {}", page.page_number, block.text);
        Ok(vec![ExtractedField::new(
            ContractField::AuthorizedSignatory,
            FieldValue::Signatory {
                name: block.name,
                title: block.title,
            },
            SIGNATURE_CONFIDENCE,
            StrategyKind::Layout,
        )
        .with_snippet(&snippet)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pactum_extractors::{Ingestor, TextIngestor};

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_by_then_title() {
        let block = parse_signature_block(&lines(&[
            "IN WITNESS WHEREOF",
            "By: Jane Doe",
            "Title: Chief Financial Officer",
            "Date: 2024-01-01",
        ]))
        .unwrap();

        assert_eq!(block.name, "Jane Doe");
        assert_eq!(block.title.as_deref(), Some("Chief Financial Officer"));
        assert!(block.text.starts_with("By: Jane Doe"));
    }

    #[test]
    fn test_name_marker_wins_over_blank_by() {
        let block = parse_signature_block(&lines(&[
            "By: ____________________",
            "Printed Name: John Smith",
            "Its: President",
        ]))
        .unwrap();

        assert_eq!(block.name, "John Smith");
        assert_eq!(block.title.as_deref(), Some("President"));
    }

    #[test]
    fn test_markers_on_one_line() {
        let block = parse_signature_block(&lines(&["By: /s/ Jane Doe  Title: CFO"])).unwrap();
        assert_eq!(block.name, "Jane Doe");
        assert_eq!(block.title.as_deref(), Some("CFO"));
    }

    #[test]
    fn test_two_columns_take_left_block() {
        let block = parse_signature_block(&lines(&[
            "By: Jane Doe  By: John Roe",
            "Title: CFO  Title: CEO",
        ]))
        .unwrap();
        assert_eq!(block.name, "Jane Doe");
        assert_eq!(block.title.as_deref(), Some("CFO"));
    }

    #[test]
    fn test_by_without_detail_is_ignored() {
        assert!(parse_signature_block(&lines(&["Delivered by: courier"])).is_none());
        assert!(parse_signature_block(&lines(&["By:", "Name:", "Title: CFO"])).is_none());
        assert!(parse_signature_block(&[]).is_none());
    }

    #[tokio::test]
    async fn test_strategy_reads_last_page_zone() {
        let body = "Clause.\n".repeat(20);
        let text = format!(
            "Cover page\x0c{}By: Jane Doe\nTitle: CFO\nDate: 2024-01-01\n",
            body
        );
        let document = TextIngestor::new().ingest(text.as_bytes()).await.unwrap();

        let fields = SignatureStrategy::new(0.30).extract(&document).await.unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].source, StrategyKind::Layout);
        assert_eq!(fields[0].confidence, SIGNATURE_CONFIDENCE);
        assert_eq!(fields[0].value.render(), "Jane Doe, CFO");
        assert!(fields[0]
            .source_snippet
            .as_deref()
            .unwrap()
            .starts_with("Signature zone on page 2: "));
    }

    #[tokio::test]
    async fn test_strategy_ignores_block_above_zone() {
        let body = "Clause.\n".repeat(20);
        let text = format!("By: Jane Doe\nTitle: CFO\n{}", body);
        let document = TextIngestor::new().ingest(text.as_bytes()).await.unwrap();

        let fields = SignatureStrategy::new(0.30).extract(&document).await.unwrap();
        assert!(fields.is_empty());
    }

    #[tokio::test]
    async fn test_trailing_form_feed_does_not_hide_signature_page() {
        let body = "Clause.\n".repeat(10);
        let text = format!("Terms.\x0c{}By: John Smith\nTitle: CEO\n\x0c", body);
        let document = TextIngestor::new().ingest(text.as_bytes()).await.unwrap();

        let fields = SignatureStrategy::new(0.30).extract(&document).await.unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].value.render(), "John Smith, CEO");
    }
}
