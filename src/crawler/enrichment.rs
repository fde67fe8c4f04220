//! Enrichment: detail backfill over a previously dumped frontier

use crate::crawler::retry::RetryOutcome;
use crate::crawler::PlayManager;
use crate::fetch::DETAIL_MARKER_FIELD;
use crate::state::FailureKind;
use crate::storage::{discover_detailed_files, discover_dump_files, load_records_with_retry};
use std::sync::Arc;

impl PlayManager {
    pub(crate) fn schedule_enrichment(&self) -> usize {
        let loaded = self.load_previous_dumps();
        let (batch, pending) = {
            let frontier = self.core.frontier.borrow();
            let (enriched, pending): (Vec<String>, Vec<String>) =
                frontier.ids().into_iter().partition(|app_id| {
                    frontier
                        .get(app_id)
                        .is_some_and(|record| record.has_field(DETAIL_MARKER_FIELD))
                });
            let count = pending.len();
            let batch: Vec<String> = pending
                .into_iter()
                .chain(enriched)
                .take(self.core.settings.details_batch_size)
                .collect();
            (batch, count)
        };

        tracing::info!(
            "Job {} loaded {} records ({} without details), enriching {}",
            self.id(),
            loaded,
            pending,
            batch.len()
        );

        batch
            .into_iter()
            .filter(|app_id| {
                let manager = self.clone();
                let app_id = app_id.clone();
                self.schedule(
                    async move {
                        manager.enrich(app_id);
                    },
                    false,
                )
            })
            .count()
    }

    /// Merges every dump in the read directory into the frontier
    ///
    /// Discovery chunks go in first and earlier `_detailed` chunks on top,
    /// so fields fetched by a previous enrichment job survive. A file that
    /// keeps failing to load is skipped and recorded as a failure. Returns
    /// the number of records read.
    fn load_previous_dumps(&self) -> usize {
        let settings = &self.core.settings;
        let listed = discover_dump_files(&settings.read_dir, &settings.file_prefix).and_then(|mut files| {
            files.extend(discover_detailed_files(&settings.read_dir, &settings.file_prefix)?);
            Ok(files)
        });
        let files = match listed {
            Ok(files) => files,
            Err(e) => {
                tracing::error!("Cannot list {}: {}", settings.read_dir.display(), e);
                self.push_failure(
                    FailureKind::DataLoadFailure,
                    format!("{}: {}", settings.read_dir.display(), e),
                );
                return 0;
            }
        };

        let mut loaded = 0;
        for path in files {
            match load_records_with_retry(&path, settings.read_retry_limit) {
                Ok(records) => {
                    loaded += records.len();
                    self.core.frontier.borrow_mut().upsert_all(records);
                }
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", path.display(), e);
                    self.push_failure(FailureKind::DataLoadFailure, format!("{}: {}", path.display(), e));
                }
            }
        }
        loaded
    }

    /// Schedules the detail fetch for one id unless it is already enriched
    pub fn enrich(&self, app_id: String) {
        let enriched = self
            .core
            .frontier
            .borrow()
            .get(&app_id)
            .is_some_and(|record| record.has_field(DETAIL_MARKER_FIELD));
        if enriched {
            self.add_processed(1);
            return;
        }

        let manager = self.clone();
        self.schedule(
            async move {
                manager.fetch_details(app_id).await;
            },
            true,
        );
    }

    async fn fetch_details(&self, app_id: String) {
        let fetcher = Arc::clone(&self.core.fetcher);
        let outcome = self
            .retry_fetch(
                || {
                    let fetcher = Arc::clone(&fetcher);
                    let app_id = app_id.clone();
                    async move { fetcher.details(&app_id).await }
                },
                true,
            )
            .await;

        match outcome {
            RetryOutcome::Success(record) => {
                self.core.frontier.borrow_mut().upsert(record);
                self.add_processed(1);
            }
            RetryOutcome::Rejected(e) | RetryOutcome::Exhausted(e) => {
                tracing::warn!("Details of {} unavailable, keeping summary record: {}", app_id, e);
                self.add_failed();
            }
            RetryOutcome::Cancelled => {}
        }
    }
}
