use std::sync::Arc;

use futures::StreamExt;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::{models::ModRecord, repository::Repository};

/// Result of persisting one record.
#[derive(Debug, Clone, PartialEq)]
pub enum PersistOutcome {
    Saved(u64),
    Failed(PersistFailure),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistFailure {
    pub id: u64,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistSummary {
    pub saved: usize,
    pub failures: Vec<PersistFailure>,
}

impl PersistSummary {
    fn record(&mut self, outcome: PersistOutcome) {
        match outcome {
            PersistOutcome::Saved(_) => self.saved += 1,
            PersistOutcome::Failed(failure) => self.failures.push(failure),
        }
    }
}

/// Upserts records one at a time, in the order they arrive.
pub struct Processor {
    repository: Arc<dyn Repository>,
}

impl Processor {
    /// Constructs a new `Processor`.
    ///
    /// # Arguments
    ///
    /// * `repository` - The `Repository` records are upserted into.
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    /// Persists every record received on `items_rx` until the channel closes.
    ///
    /// # Remarks
    ///
    /// A failed record is logged and counted; it does not stop the records
    /// after it.
    pub async fn process_items(&self, items_rx: mpsc::Receiver<ModRecord>) -> PersistSummary {
        ReceiverStream::new(items_rx)
            .then(|record| self.persist(record))
            .fold(PersistSummary::default(), |mut summary, outcome| async move {
                summary.record(outcome);
                summary
            })
            .await
    }

    pub async fn persist(&self, record: ModRecord) -> PersistOutcome {
        let id = record.id;
        let repository = Arc::clone(&self.repository);
        let result = tokio::task::spawn_blocking(move || repository.upsert(&record)).await;

        let error = match result {
            Ok(Ok(())) => return PersistOutcome::Saved(id),
            Ok(Err(err)) => err.to_string(),
            Err(err) => err.to_string(),
        };
        log::error!("failed to save mod {}: {}", id, error);
        PersistOutcome::Failed(PersistFailure { id, error })
    }
}
