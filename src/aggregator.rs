use crate::chains::Chain;
use crate::explorer::TransactionSource;
use crate::models::{ChainTransaction, OwnerId, WatchEntry};
use crate::watermark::WatermarkStore;
use futures::future::join_all;
use log::warn;
use std::collections::{HashMap, HashSet};

/// Result of one owner's aggregation pass.
#[derive(Debug, Default)]
pub struct CycleBatch {
    /// Transactions strictly newer than the cycle-start watermark of the
    /// address they were fetched for, deduplicated within the batch.
    pub transactions: Vec<ChainTransaction>,
    /// Highest timestamp observed per watched address across all chains,
    /// for the caller to advance watermarks with after dispatch routing.
    pub high_marks: HashMap<String, u64>,
}

/// Fan out one fetch per (address, chain) pair for a single owner's watch
/// list, concurrently, and merge whatever came back.
///
/// Best-effort policy: a failed fetch is logged and contributes zero
/// transactions; it never aborts the batch. Watermark boundaries are read
/// once up front, so results from slower chains discovered mid-cycle are
/// filtered against the same cycle-start value.
pub async fn collect_new_transactions<S>(
    source: &S,
    owner: OwnerId,
    entries: &[WatchEntry],
    watermarks: &WatermarkStore,
) -> CycleBatch
where
    S: TransactionSource + ?Sized,
{
    // Cycle-start boundaries, one per watched address.
    let boundaries: HashMap<&str, u64> = entries
        .iter()
        .map(|entry| (entry.address.as_str(), watermarks.read(owner, &entry.address)))
        .collect();

    let fetches = entries.iter().flat_map(|entry| {
        Chain::ALL.into_iter().map(move |chain| {
            let address = entry.address.clone();
            async move {
                let result = source.fetch(chain, &address).await;
                (chain, address, result)
            }
        })
    });

    let mut batch = CycleBatch::default();
    let mut seen: HashSet<(Chain, String)> = HashSet::new();

    for (chain, address, result) in join_all(fetches).await {
        let transactions = match result {
            Ok(transactions) => transactions,
            Err(e) => {
                warn!("fetch failed for {} on {}: {}", address, chain, e);
                continue;
            }
        };

        let boundary = boundaries.get(address.as_str()).copied().unwrap_or(u64::MAX);

        for tx in transactions {
            let mark = batch.high_marks.entry(address.clone()).or_insert(0);
            if tx.timestamp > *mark {
                *mark = tx.timestamp;
            }

            if tx.timestamp <= boundary {
                continue;
            }
            // A transaction between two watched addresses of the same
            // owner shows up in both queries; report it once. Hash
            // collisions across chains remain distinct events.
            if !seen.insert((tx.chain, tx.hash.clone())) {
                continue;
            }
            batch.transactions.push(tx);
        }
    }

    batch
}
