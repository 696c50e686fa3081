//! In-memory job, record and original storage.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use super::check_update;
use crate::error::{PactumError, PactumResult};
use crate::traits::{ContractStore, OriginalStore};
use crate::types::{
    ContractJob, ContractRecord, JobPage, JobQuery, JobStatus, JobSummary, OriginalDocument,
    SortField, SortOrder,
};

#[derive(Default)]
struct State {
    jobs: HashMap<String, ContractJob>,
    records: HashMap<String, ContractRecord>,
    originals: HashMap<String, OriginalDocument>,
}

/// Process-local store. Contents are lost on restart.
#[derive(Default)]
pub struct InMemoryContractStore {
    state: RwLock<State>,
}

impl InMemoryContractStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> PactumResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| PactumError::Internal("store lock poisoned".to_string()))
    }

    fn write(&self) -> PactumResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| PactumError::Internal("store lock poisoned".to_string()))
    }
}

fn compare(a: &ContractJob, b: &ContractJob, field: SortField) -> Ordering {
    let primary = match field {
        SortField::UploadedAt => a.uploaded_at().cmp(&b.uploaded_at()),
        SortField::Filename => a.filename().cmp(b.filename()),
        SortField::Status => a.status().as_str().cmp(b.status().as_str()),
    };
    primary.then_with(|| a.id().cmp(b.id()))
}

#[async_trait]
impl ContractStore for InMemoryContractStore {
    async fn insert_job(&self, job: &ContractJob) -> PactumResult<()> {
        let mut state = self.write()?;
        if state.jobs.contains_key(job.id()) {
            return Err(PactumError::persistence(format!("job {} already exists", job.id())));
        }
        state.jobs.insert(job.id().to_string(), job.clone());
        Ok(())
    }

    async fn get_job(&self, job_id: &str) -> PactumResult<Option<ContractJob>> {
        Ok(self.read()?.jobs.get(job_id).cloned())
    }

    async fn claim_job(&self, job_id: &str) -> PactumResult<Option<ContractJob>> {
        let mut state = self.write()?;
        let job = state
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| PactumError::not_found(job_id))?;
        if job.status() != JobStatus::Pending {
            return Ok(None);
        }
        job.claim()?;
        Ok(Some(job.clone()))
    }

    async fn update_job(&self, job: &ContractJob) -> PactumResult<()> {
        let mut state = self.write()?;
        let stored = state
            .jobs
            .get_mut(job.id())
            .ok_or_else(|| PactumError::not_found(job.id()))?;
        check_update(stored, job)?;
        *stored = job.clone();
        Ok(())
    }

    async fn finalize(&self, job: &ContractJob, record: &ContractRecord) -> PactumResult<()> {
        let mut state = self.write()?;
        let stored = state
            .jobs
            .get_mut(job.id())
            .ok_or_else(|| PactumError::not_found(job.id()))?;
        super::check_finalize(stored, job, record)?;
        *stored = job.clone();
        state.records.insert(job.id().to_string(), record.clone());
        Ok(())
    }

    async fn get_record(&self, job_id: &str) -> PactumResult<Option<ContractRecord>> {
        Ok(self.read()?.records.get(job_id).cloned())
    }

    async fn list_jobs(&self, query: &JobQuery) -> PactumResult<JobPage> {
        let state = self.read()?;
        let mut matching: Vec<&ContractJob> = state
            .jobs
            .values()
            .filter(|job| query.matches(job, state.records.get(job.id())))
            .collect();

        matching.sort_by(|a, b| {
            let ordering = compare(a, b, query.sort_by);
            match query.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let limit = query.effective_limit();
        let items = matching
            .iter()
            .skip(query.offset)
            .take(limit)
            .map(|job| JobSummary::new(job, state.records.get(job.id())))
            .collect();

        Ok(JobPage {
            items,
            total: matching.len(),
            limit,
            offset: query.offset,
        })
    }
}

#[async_trait]
impl OriginalStore for InMemoryContractStore {
    async fn put_original(&self, job_id: &str, original: &OriginalDocument) -> PactumResult<()> {
        self.write()?
            .originals
            .insert(job_id.to_string(), original.clone());
        Ok(())
    }

    async fn get_original(&self, job_id: &str) -> PactumResult<Option<OriginalDocument>> {
        Ok(self.read()?.originals.get(job_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Checkpoint, GapList};

    #[tokio::test]
    async fn test_claim_is_exclusive() {
        let store = InMemoryContractStore::new();
        let job = ContractJob::new("msa.pdf", 10);
        store.insert_job(&job).await.unwrap();

        let claimed = store.claim_job(job.id()).await.unwrap().unwrap();
        assert_eq!(claimed.status(), JobStatus::Processing);
        assert!(store.claim_job(job.id()).await.unwrap().is_none());
        assert!(store.claim_job("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_terminal_job_is_immutable() {
        let store = InMemoryContractStore::new();
        let job = ContractJob::new("msa.pdf", 10);
        store.insert_job(&job).await.unwrap();
        let mut job = store.claim_job(job.id()).await.unwrap().unwrap();

        let mut failed = job.clone();
        failed.fail("boom").unwrap();
        store.update_job(&failed).await.unwrap();

        job.checkpoint(Checkpoint::Ingested).unwrap();
        assert!(matches!(
            store.update_job(&job).await,
            Err(PactumError::InvalidTransition { .. })
        ));

        let mut completed = job.clone();
        completed.complete().unwrap();
        let record = ContractRecord::new(&completed, Default::default(), GapList::default());
        assert!(store.finalize(&completed, &record).await.is_err());
        assert!(store.get_record(job.id()).await.unwrap().is_none());
        assert_eq!(
            store.get_job(job.id()).await.unwrap().unwrap().status(),
            JobStatus::Failed
        );
    }

    #[tokio::test]
    async fn test_completion_goes_through_finalize() {
        let store = InMemoryContractStore::new();
        let job = ContractJob::new("msa.pdf", 10);
        store.insert_job(&job).await.unwrap();
        let mut job = store.claim_job(job.id()).await.unwrap().unwrap();
        job.complete().unwrap();

        assert!(store.update_job(&job).await.is_err());

        let record = ContractRecord::new(&job, Default::default(), GapList::default());
        store.finalize(&job, &record).await.unwrap();
        assert_eq!(store.get_record(job.id()).await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn test_progress_cannot_regress() {
        let store = InMemoryContractStore::new();
        let job = ContractJob::new("msa.pdf", 10);
        store.insert_job(&job).await.unwrap();
        let claimed = store.claim_job(job.id()).await.unwrap().unwrap();

        let mut ahead = claimed.clone();
        ahead.checkpoint(Checkpoint::Analyzed).unwrap();
        store.update_job(&ahead).await.unwrap();

        let mut behind = claimed;
        behind.checkpoint(Checkpoint::Ingested).unwrap();
        assert!(store.update_job(&behind).await.is_err());
    }

    #[tokio::test]
    async fn test_list_sorts_and_pages() {
        let store = InMemoryContractStore::new();
        for name in ["b.pdf", "a.pdf", "c.txt"] {
            store.insert_job(&ContractJob::new(name, 1)).await.unwrap();
        }

        let page = store
            .list_jobs(
                &JobQuery::default()
                    .sorted_by(SortField::Filename, SortOrder::Asc)
                    .page(2, 0),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        let names: Vec<_> = page.items.iter().map(|s| s.filename.as_str()).collect();
        assert_eq!(names, vec!["a.pdf", "b.pdf"]);

        let page = store
            .list_jobs(&JobQuery::default().with_filename(".PDF").page(10, 1))
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 1);
    }
}
