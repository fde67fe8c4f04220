//! Discovery: collection pagination and similar-app expansion
//!
//! Discovery seeds one pagination task per collection/category pair. Every
//! record that is new to the frontier schedules an expansion task that
//! fetches its similar apps, and so on. The frontier's dedup-on-insert is
//! what stops the fan-out: ids already seen never expand again.

use crate::crawler::retry::RetryOutcome;
use crate::crawler::{PlayManager, Record};
use crate::fetch::seed_pairs;
use std::sync::Arc;

impl PlayManager {
    pub(crate) fn schedule_discovery(&self) -> usize {
        seed_pairs()
            .filter(|(collection, category)| {
                let manager = self.clone();
                let (collection, category) = (*collection, *category);
                self.schedule(
                    async move {
                        manager.paginate(collection, category).await;
                    },
                    false,
                )
            })
            .count()
    }

    /// Walks the pages of one collection/category listing
    ///
    /// A full page means more pages may follow; a short page ends the walk.
    /// Returns the number of records fetched.
    pub async fn paginate(&self, collection: &str, category: &str) -> usize {
        let page_size = self.core.settings.page_size;
        let mut page = 0;
        let mut fetched = 0;

        loop {
            let fetcher = Arc::clone(&self.core.fetcher);
            let outcome = self
                .retry_fetch(
                    || {
                        let fetcher = Arc::clone(&fetcher);
                        async move { fetcher.collection(collection, category, page, page_size).await }
                    },
                    false,
                )
                .await;

            match outcome {
                RetryOutcome::Success(records) => {
                    let count = records.len();
                    fetched += count;
                    self.merge_and_expand(records);

                    if count < page_size {
                        break;
                    }
                    page += 1;
                }
                RetryOutcome::Rejected(e) => {
                    tracing::debug!("{} / {} page {} rejected: {}", collection, category, page, e);
                    break;
                }
                RetryOutcome::Exhausted(e) => {
                    tracing::warn!("{} / {} page {} gave up: {}", collection, category, page, e);
                    self.add_failed();
                    break;
                }
                RetryOutcome::Cancelled => break,
            }
        }

        tracing::debug!("{} / {} yielded {} records over {} pages", collection, category, fetched, page + 1);
        fetched
    }

    /// Fetches the apps similar to `app_id` and merges them in
    pub async fn expand(&self, app_id: String) {
        let fetcher = Arc::clone(&self.core.fetcher);
        let outcome = self
            .retry_fetch(
                || {
                    let fetcher = Arc::clone(&fetcher);
                    let app_id = app_id.clone();
                    async move { fetcher.similar(&app_id).await }
                },
                false,
            )
            .await;

        match outcome {
            RetryOutcome::Success(records) => {
                self.merge_and_expand(records);
            }
            RetryOutcome::Exhausted(e) => {
                tracing::warn!("Similar apps of {} gave up: {}", app_id, e);
                self.add_failed();
            }
            RetryOutcome::Rejected(_) | RetryOutcome::Cancelled => {}
        }
    }

    /// Upserts a batch and schedules expansion for every new id
    ///
    /// Returns the number of ids that were new.
    fn merge_and_expand(&self, records: Vec<Record>) -> usize {
        let merged = records.len();
        let fresh = self.core.frontier.borrow_mut().upsert_all(records);
        self.add_processed(merged);

        let count = fresh.len();
        for app_id in fresh {
            let manager = self.clone();
            self.schedule(
                async move {
                    manager.expand(app_id).await;
                },
                false,
            );
        }
        count
    }
}
