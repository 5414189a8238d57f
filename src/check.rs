//! The top-level reconcile-and-aggregate pass for one swap service.

use crate::aggregate::{aggregate, AggregateError};
use crate::config::Config;
use crate::model::{SwapRunParams, SwapTx, TxDataMap};
use crate::rates::RateResolver;
use crate::reconcile::{DiskCache, ReconcileError};
use std::path::Path;
use thiserror::Error;
use tracing::info;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// What the injected fetch callback returns: the previously persisted cache
/// object and the newly downloaded batch. The provider-specific fetch is
/// never performed here.
#[derive(Debug, Default)]
pub struct FetchResult {
    pub disk_cache: DiskCache,
    pub new_transactions: Vec<SwapTx>,
}

#[derive(Debug, Error)]
pub enum CheckError {
    #[error("Swap service fetch failed")]
    Fetch(#[source] BoxError),

    #[error("Unable to persist transaction cache")]
    Reconcile(#[from] ReconcileError),

    #[error("Aggregation failed")]
    Aggregate(#[from] AggregateError),
}

/// Run one reconcile-and-aggregate pass for a swap service.
///
/// A fresh [`RateResolver`] is constructed for every run, so rate caches are
/// rehydrated from disk and nothing leaks between runs in a long-lived
/// process.
pub fn run_check<F>(
    fetch: F,
    cache_file: &Path,
    prefix: &str,
    config: &Config,
    params: &SwapRunParams,
) -> Result<TxDataMap, CheckError>
where
    F: FnOnce(&SwapRunParams) -> Result<FetchResult, BoxError>,
{
    run_check_inner(fetch, cache_file, prefix, RateResolver::new(config), params)
}

fn run_check_inner<F>(
    fetch: F,
    cache_file: &Path,
    prefix: &str,
    mut resolver: RateResolver,
    params: &SwapRunParams,
) -> Result<TxDataMap, CheckError>
where
    F: FnOnce(&SwapRunParams) -> Result<FetchResult, BoxError>,
{
    let FetchResult {
        mut disk_cache,
        new_transactions,
    } = fetch(params).map_err(CheckError::Fetch)?;

    let downloaded = new_transactions.len();
    let accepted = disk_cache.merge(new_transactions);
    if !params.use_cache {
        info!("{prefix}: NEW TXS: {accepted} of downloaded: {downloaded}");
    }
    disk_cache.persist(cache_file)?;

    Ok(aggregate(&disk_cache.txs, &mut resolver, params)?)
}
