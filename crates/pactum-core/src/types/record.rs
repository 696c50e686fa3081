//! Persisted records, stored originals and listing queries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::field::{ExtractionResult, GapList};
use super::job::{ContractJob, JobStatus};

/// Consolidated output of a completed job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractRecord {
    pub job_id: String,
    pub result: ExtractionResult,
    pub gaps: GapList,
    /// Lower-cased filename and party names, searched by listing queries.
    pub search_content: String,
}

impl ContractRecord {
    /// Build the record for a job, deriving its search content.
    pub fn new(job: &ContractJob, result: ExtractionResult, gaps: GapList) -> Self {
        let search_content = build_search_content(job.filename(), &result);
        Self {
            job_id: job.id().to_string(),
            result,
            gaps,
            search_content,
        }
    }
}

fn build_search_content(filename: &str, result: &ExtractionResult) -> String {
    use super::field::ContractField;

    let mut parts = vec![sanitize_filename(filename)];
    for field in [ContractField::CustomerName, ContractField::VendorName] {
        if let Some(extracted) = result.get(field) {
            let party: String = extracted
                .value
                .render()
                .chars()
                .filter(|c| c.is_alphanumeric() || c.is_whitespace())
                .collect();
            parts.push(party.split_whitespace().collect::<Vec<_>>().join(" "));
        }
    }
    parts
        .iter()
        .map(|p| p.to_lowercase())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Drop path components and turn every non-alphanumeric character into a space.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    base.chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Uploaded bytes kept for download and resubmission.
#[derive(Debug, Clone, PartialEq)]
pub struct OriginalDocument {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: String,
}

/// A completed job's result and gaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOutcome {
    pub job_id: String,
    pub result: ExtractionResult,
    pub gaps: GapList,
}

impl From<ContractRecord> for JobOutcome {
    fn from(record: ContractRecord) -> Self {
        Self {
            job_id: record.job_id,
            result: record.result,
            gaps: record.gaps,
        }
    }
}

/// Listing sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    UploadedAt,
    Filename,
    Status,
}

/// Listing sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Filters and paging for job listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobQuery {
    pub status: Option<JobStatus>,
    /// Case-insensitive filename substring.
    pub filename: Option<String>,
    /// Case-insensitive free text over the record search content.
    pub q: Option<String>,
    pub uploaded_from: Option<DateTime<Utc>>,
    pub uploaded_to: Option<DateTime<Utc>>,
    pub sort_by: SortField,
    pub order: SortOrder,
    pub limit: usize,
    pub offset: usize,
}

/// Default page size for listings.
pub const DEFAULT_PAGE_SIZE: usize = 20;
/// Largest page size a listing will return.
pub const MAX_PAGE_SIZE: usize = 100;

impl Default for JobQuery {
    fn default() -> Self {
        Self {
            status: None,
            filename: None,
            q: None,
            uploaded_from: None,
            uploaded_to: None,
            sort_by: SortField::default(),
            order: SortOrder::default(),
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl JobQuery {
    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_search(mut self, q: impl Into<String>) -> Self {
        self.q = Some(q.into());
        self
    }

    pub fn sorted_by(mut self, field: SortField, order: SortOrder) -> Self {
        self.sort_by = field;
        self.order = order;
        self
    }

    pub fn page(mut self, limit: usize, offset: usize) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }

    /// Page size clamped to `1..=MAX_PAGE_SIZE`.
    pub fn effective_limit(&self) -> usize {
        self.limit.clamp(1, MAX_PAGE_SIZE)
    }

    /// Whether a job (and its record, if any) passes every filter.
    pub fn matches(&self, job: &ContractJob, record: Option<&ContractRecord>) -> bool {
        if self.status.is_some_and(|s| s != job.status()) {
            return false;
        }
        if let Some(needle) = self.filename.as_deref().map(str::to_lowercase) {
            if !job.filename().to_lowercase().contains(&needle) {
                return false;
            }
        }
        if self.uploaded_from.is_some_and(|from| job.uploaded_at() < from) {
            return false;
        }
        if self.uploaded_to.is_some_and(|to| job.uploaded_at() > to) {
            return false;
        }
        if let Some(q) = self.q.as_deref().map(|q| q.trim().to_lowercase()) {
            if !q.is_empty() {
                let haystack = match record {
                    Some(record) => record.search_content.clone(),
                    None => sanitize_filename(job.filename()).to_lowercase(),
                };
                if !haystack.contains(&q) {
                    return false;
                }
            }
        }
        true
    }
}

/// One row of a job listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: String,
    pub filename: String,
    pub file_size_bytes: u64,
    pub uploaded_at: DateTime<Utc>,
    pub status: JobStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
    /// Number of gaps, for completed jobs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gaps_count: Option<usize>,
    pub attempt: u32,
}

impl JobSummary {
    pub fn new(job: &ContractJob, record: Option<&ContractRecord>) -> Self {
        Self {
            id: job.id().to_string(),
            filename: job.filename().to_string(),
            file_size_bytes: job.file_size_bytes(),
            uploaded_at: job.uploaded_at(),
            status: job.status(),
            progress: job.progress(),
            processed_at: job.processed_at(),
            gaps_count: record.map(|r| r.gaps.len()),
            attempt: job.attempt(),
        }
    }
}

/// A page of job summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPage {
    pub items: Vec<JobSummary>,
    /// Number of jobs matching the filters, across all pages.
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContractField, ExtractedField, FieldValue, StrategyKind};

    fn record_for(job: &ContractJob) -> ContractRecord {
        let result: ExtractionResult = vec![
            ExtractedField::new(
                ContractField::CustomerName,
                FieldValue::text("Globex Corporation"),
                0.75,
                StrategyKind::Entity,
            ),
            ExtractedField::new(
                ContractField::VendorName,
                FieldValue::text("Initech, L.L.C."),
                0.75,
                StrategyKind::Entity,
            ),
        ]
        .into_iter()
        .collect();
        ContractRecord::new(job, result, GapList::default())
    }

    #[test]
    fn test_search_content_includes_parties() {
        let job = ContractJob::new("uploads/Master_Services-(2024).pdf", 10);
        let record = record_for(&job);
        assert_eq!(
            record.search_content,
            "master services 2024 pdf globex corporation initech llc"
        );
    }

    #[test]
    fn test_query_matches_filters() {
        let job = ContractJob::new("MSA_globex.pdf", 10);
        let record = record_for(&job);

        assert!(JobQuery::default().matches(&job, Some(&record)));
        assert!(JobQuery::default().with_filename("GLOBEX").matches(&job, None));
        assert!(!JobQuery::default().with_filename("acme").matches(&job, None));
        assert!(JobQuery::default().with_search("initech").matches(&job, Some(&record)));
        assert!(!JobQuery::default().with_search("initech").matches(&job, None));
        assert!(!JobQuery::default()
            .with_status(JobStatus::Completed)
            .matches(&job, Some(&record)));
    }

    #[test]
    fn test_effective_limit_is_clamped() {
        assert_eq!(JobQuery::default().page(0, 0).effective_limit(), 1);
        assert_eq!(JobQuery::default().page(500, 0).effective_limit(), MAX_PAGE_SIZE);
    }
}
