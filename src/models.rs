use crate::chains::Chain;
use serde::{Deserialize, Serialize};

/// Messaging-transport chat id of the user who owns a watch entry.
pub type OwnerId = i64;

/// One address a user watches, with its display nickname.
/// Addresses are stored in canonical lowercase 0x-prefixed form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEntry {
    pub owner_id: OwnerId,
    pub address: String,
    pub nickname: String,
}

/// Raw transaction record as returned by an etherscan-compatible
/// `txlist` endpoint. Numeric fields arrive as decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplorerTx {
    pub hash: String,
    pub from: String,
    /// Empty for contract-creation transactions.
    #[serde(default)]
    pub to: String,
    /// Value in the chain's smallest unit (wei), decimal string.
    pub value: String,
    #[serde(rename = "timeStamp")]
    pub time_stamp: String,
}

/// A fetched transaction tagged with its origin chain and the watched
/// address whose query returned it. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainTransaction {
    pub chain: Chain,
    /// The watched address this record was fetched for.
    pub watched_address: String,
    pub hash: String,
    pub from: String,
    pub to: String,
    /// Value in wei, kept as the explorer-reported decimal string.
    pub value: String,
    /// Unix seconds.
    pub timestamp: u64,
}

impl ChainTransaction {
    /// Tag a raw explorer record with its chain and query address.
    /// Returns `None` when the timestamp is not a valid integer; such
    /// records cannot be ordered against the watermark.
    pub fn from_explorer(chain: Chain, watched_address: &str, tx: ExplorerTx) -> Option<Self> {
        let timestamp = tx.time_stamp.parse::<u64>().ok()?;
        Some(Self {
            chain,
            watched_address: watched_address.to_string(),
            hash: tx.hash,
            from: tx.from,
            to: tx.to,
            value: tx.value,
            timestamp,
        })
    }

    /// Value converted from wei to native units (all supported chains
    /// use 18 decimals).
    pub fn value_native(&self) -> f64 {
        self.value.parse::<u128>().unwrap_or(0) as f64 / 1e18
    }
}
