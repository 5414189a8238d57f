//! Time-bucketed volume aggregation over the reconciled transaction list.

use crate::consts::{BASE_CURRENCY, FIAT_CURRENCY, HALF_SPLIT_DIGITS, SWAP_FEE_RATE};
use crate::model::{SwapRunParams, SwapTx, TxDataMap};
use crate::rates::{RateError, RateResolver};
use crate::util::decimal::{self, DecimalError};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

// Comparison keys are digits-only bucket keys padded out to minute
// resolution: YYYYMMDDHHmm.
const COMPARISON_WIDTH: usize = 12;

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("Rate resolution failed")]
    Rate(#[from] RateError),

    #[error("Decimal arithmetic error")]
    Decimal(#[from] DecimalError),

    #[error("Transaction has invalid timestamp {0}")]
    Timestamp(i64),
}

/// Bucket key or end date in comparison form: hyphens stripped, right-padded
/// with zeros.
fn comparison_key(value: &str) -> String {
    let mut key = value.replace('-', "");
    while key.len() < COMPARISON_WIDTH {
        key.push('0');
    }

    key
}

/// Walk the merged, timestamp-descending transaction list and accumulate
/// per-bucket volume totals in both the base unit and fiat.
///
/// The walk terminates at the first bucket older than `params.end_date`;
/// because the list is sorted descending this is an early exit, not a filter.
/// Rate lookups are strictly sequential and may block on the network; runs
/// are periodic batch jobs, not latency-sensitive services.
pub fn aggregate(
    txs: &[SwapTx],
    resolver: &mut RateResolver,
    params: &SwapRunParams,
) -> Result<TxDataMap, AggregateError> {
    let mut tx_data_map = TxDataMap::new();
    let mut amount_total = String::from("0");
    let mut rev_total = String::from("0");
    let end_compare = comparison_key(&params.end_date);

    for tx in txs {
        if tx.status != "complete" {
            continue;
        }

        let datetime = DateTime::<Utc>::from_timestamp(tx.timestamp, 0)
            .ok_or(AggregateError::Timestamp(tx.timestamp))?;
        let bucket = params.interval.bucket_key(&datetime);

        if decimal::gt(&end_compare, &comparison_key(&bucket))? {
            break;
        }

        let date = datetime.format("%Y-%m-%d").to_string();

        let data = tx_data_map.entry(bucket).or_default();
        data.tx_count += 1;

        let (amount_base, amount_fiat) =
            if tx.input_currency == FIAT_CURRENCY && tx.output_currency == FIAT_CURRENCY {
                // Fiat-only partners report USD directly; there is no base
                // leg.
                ("0".to_string(), tx.output_amount.clone())
            } else {
                let amount_base = if tx.input_currency == BASE_CURRENCY {
                    tx.input_amount.normalize().to_string()
                } else {
                    let rate = resolver.cross_rate(&tx.input_currency, BASE_CURRENCY, &date)?;
                    decimal::mul(&rate, &tx.input_amount.to_string())?
                };
                let base_usd = resolver.usd_rate_cached(BASE_CURRENCY, &date)?;
                let amount_fiat = decimal::mul(&amount_base, &base_usd)?;

                (amount_base, amount_fiat)
            };

        data.amount_base = decimal::add(&data.amount_base, &amount_base)?;
        data.amount_fiat = decimal::add(&data.amount_fiat, &amount_fiat)?;

        let rev = decimal::mul(&amount_base, SWAP_FEE_RATE)?;
        amount_total = decimal::add(&amount_total, &amount_base)?;
        rev_total = decimal::add(&rev_total, &rev)?;

        // Credit half of the fiat volume to each side of the swap.
        let half = decimal::div(&amount_fiat, "2", HALF_SPLIT_DIGITS)?;
        for currency in [&tx.input_currency, &tx.output_currency] {
            let slot = data
                .currency_amount
                .entry(currency.clone())
                .or_insert_with(|| "0".to_string());
            *slot = decimal::add(slot, &half)?;
        }
    }

    debug!(
        "{} buckets, {amount_total} {BASE_CURRENCY} total, {rev_total} {BASE_CURRENCY} revenue",
        tx_data_map.len()
    );

    Ok(tx_data_map)
}
