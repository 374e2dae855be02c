use crate::chains::Chain;
use crate::models::{ChainTransaction, OwnerId, WatchEntry};
use crate::prices::PriceSnapshot;

/// Label used when no watch entry matches a transaction's endpoints.
/// Explorers occasionally return records for contract-internal transfers
/// that name neither side the query address.
const UNKNOWN_SUBJECT: &str = "unknown";

/// A notification ready for dispatch, derived per transaction and never
/// persisted; lives for one delivery attempt plus retries.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationEvent {
    pub owner_id: OwnerId,
    pub nickname: String,
    /// Canonical watched address, or "unknown" when unmatched.
    pub address: String,
    pub chain: Chain,
    pub tx_hash: String,
    pub value_native: f64,
    pub value_usd: Option<f64>,
}

/// Find the watch entry whose address matches either endpoint of the
/// transaction, case-insensitively.
pub fn match_entry<'a>(
    entries: &'a [WatchEntry],
    tx: &ChainTransaction,
) -> Option<&'a WatchEntry> {
    let from = tx.from.to_lowercase();
    let to = tx.to.to_lowercase();
    entries
        .iter()
        .find(|entry| entry.address == from || entry.address == to)
}

impl NotificationEvent {
    pub fn build(
        owner_id: OwnerId,
        tx: &ChainTransaction,
        matched: Option<&WatchEntry>,
        prices: &PriceSnapshot,
    ) -> Self {
        let (nickname, address) = match matched {
            Some(entry) => (entry.nickname.clone(), entry.address.clone()),
            None => (UNKNOWN_SUBJECT.to_string(), UNKNOWN_SUBJECT.to_string()),
        };
        let value_native = tx.value_native();
        let value_usd = prices.usd(tx.chain).map(|price| price * value_native);

        Self {
            owner_id,
            nickname,
            address,
            chain: tx.chain,
            tx_hash: tx.hash.clone(),
            value_native,
            value_usd,
        }
    }

    /// Render the HTML message delivered to the user: linked nickname,
    /// linked transaction hash, optional USD amount, chain name.
    pub fn render(&self) -> String {
        let subject = if self.address == UNKNOWN_SUBJECT {
            self.nickname.clone()
        } else {
            format!(
                "<a href=\"{}\">{}</a>",
                self.chain.address_url(&self.address),
                self.nickname
            )
        };

        let amount = match self.value_usd {
            Some(usd) => {
                let formatted = format!("{:.2}", usd);
                // An amount that rounds to nothing is noise; leave the line out.
                if formatted == "0.00" {
                    String::new()
                } else {
                    format!("  Amount: ${}", formatted)
                }
            }
            None => String::new(),
        };

        format!(
            "----------------------\n\n{}\n\n<a href=\"{}\">Tx Hash</a>{}\nBlockchain: {}",
            subject,
            self.chain.tx_url(&self.tx_hash),
            amount,
            self.chain.name()
        )
    }
}
