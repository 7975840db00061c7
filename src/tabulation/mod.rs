//! Filtered, grouped tabulation of the stored records, memoised until the
//! next mutation of the election's data.

use std::sync::Arc;

use log::debug;

use crate::{
    model::{
        api::{AggregateResult, Filter, GroupBy},
        election::ElectionDefinition,
        mongodb::Id,
    },
    store::{CvrStore, StoreError},
};

mod cache;
mod filter;
mod manual;
mod tally;

pub use cache::{cache_key, TabulationCache};
pub use filter::normalize;
pub use manual::{validate_manual_results, ManualResultsError};
pub use tally::tabulate;

/// Answers tabulation queries through the cache.
#[derive(Clone)]
pub struct Tabulator {
    store: Arc<dyn CvrStore>,
    cache: Arc<TabulationCache>,
}

impl Tabulator {
    pub fn new(store: Arc<dyn CvrStore>, cache: Arc<TabulationCache>) -> Self {
        Self { store, cache }
    }

    pub async fn tabulate(
        &self,
        election_id: Id,
        definition: &ElectionDefinition,
        filter: Filter,
        group_by: GroupBy,
    ) -> Result<Arc<AggregateResult>, StoreError> {
        let filter = normalize(filter, &definition.election);
        let key = cache_key(election_id, &filter, &group_by);
        if let Some(result) = self.cache.get(&key).await {
            debug!("Tabulation cache hit for {key}");
            return Ok(result);
        }

        let records = self.store.cast_vote_records(election_id).await?;
        let batches = self.store.scanner_batches(election_id).await?;
        let write_ins = self.store.write_ins(election_id).await?;
        let manual_results = self.store.manual_results(election_id).await?;
        let result = Arc::new(tabulate(
            &definition.election,
            &records,
            &batches,
            &write_ins,
            &manual_results,
            &filter,
            &group_by,
        ));
        debug!("Tabulated {} records for {key}", records.len());
        self.cache.set(key, result.clone()).await;
        Ok(result)
    }
}
