use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported EVM chains. Adding a chain means adding one entry to
/// [`CHAIN_SPECS`]; everything else (explorer URLs, price asset, symbol)
/// is looked up through the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Chain {
    Ethereum,
    BinanceSmartChain,
    Polygon,
    Avalanche,
    Fantom,
    Arbitrum,
}

/// Static per-chain metadata: explorer API endpoint, explorer web URLs,
/// native token and the asset identifier used for USD price lookups.
#[derive(Debug, Clone, Copy)]
pub struct ChainSpec {
    pub chain: Chain,
    /// Human-readable chain name used in notifications.
    pub name: &'static str,
    /// Short identifier used in config keys and logs.
    pub slug: &'static str,
    /// Explorer HTTP API base URL (etherscan-compatible txlist endpoint).
    pub api_base: &'static str,
    /// Environment variable carrying this chain's explorer API key.
    pub api_key_env: &'static str,
    /// Explorer web frontend base URL for address/tx links.
    pub explorer_base: &'static str,
    pub native_symbol: &'static str,
    /// Price-feed asset id. Arbitrum settles in ETH, so it shares the
    /// ethereum asset.
    pub price_asset: &'static str,
}

pub static CHAIN_SPECS: [ChainSpec; 6] = [
    ChainSpec {
        chain: Chain::Ethereum,
        name: "Ethereum",
        slug: "eth",
        api_base: "https://api.etherscan.io/api",
        api_key_env: "API_ETHERSCAN",
        explorer_base: "https://etherscan.io",
        native_symbol: "ETH",
        price_asset: "ethereum",
    },
    ChainSpec {
        chain: Chain::BinanceSmartChain,
        name: "Binance Smart Chain",
        slug: "bsc",
        api_base: "https://api.bscscan.com/api",
        api_key_env: "API_BSCSCAN",
        explorer_base: "https://bscscan.com",
        native_symbol: "BNB",
        price_asset: "binancecoin",
    },
    ChainSpec {
        chain: Chain::Polygon,
        name: "Polygon",
        slug: "polygon",
        api_base: "https://api.polygonscan.com/api",
        api_key_env: "API_POLYGONSCAN",
        explorer_base: "https://polygonscan.com",
        native_symbol: "MATIC",
        price_asset: "matic-network",
    },
    ChainSpec {
        chain: Chain::Avalanche,
        name: "Avalanche",
        slug: "avalanche",
        api_base: "https://api.snowtrace.io/api",
        api_key_env: "API_AVALANCHESCAN",
        explorer_base: "https://snowtrace.io",
        native_symbol: "AVAX",
        price_asset: "avalanche-2",
    },
    ChainSpec {
        chain: Chain::Fantom,
        name: "Fantom",
        slug: "fantom",
        api_base: "https://api.ftmscan.com/api",
        api_key_env: "API_FANTOMSCAN",
        explorer_base: "https://ftmscan.com",
        native_symbol: "FTM",
        price_asset: "fantom",
    },
    ChainSpec {
        chain: Chain::Arbitrum,
        name: "Arbitrum",
        slug: "arbitrum",
        api_base: "https://api.arbiscan.io/api",
        api_key_env: "API_ARBITRUM",
        explorer_base: "https://arbiscan.io",
        native_symbol: "ETH",
        price_asset: "ethereum",
    },
];

impl Chain {
    pub const ALL: [Chain; 6] = [
        Chain::Ethereum,
        Chain::BinanceSmartChain,
        Chain::Polygon,
        Chain::Avalanche,
        Chain::Fantom,
        Chain::Arbitrum,
    ];

    pub fn spec(&self) -> &'static ChainSpec {
        // CHAIN_SPECS is ordered to match the enum discriminants.
        &CHAIN_SPECS[*self as usize]
    }

    pub fn name(&self) -> &'static str {
        self.spec().name
    }

    pub fn slug(&self) -> &'static str {
        self.spec().slug
    }

    pub fn from_slug(slug: &str) -> Option<Chain> {
        CHAIN_SPECS
            .iter()
            .find(|spec| spec.slug == slug)
            .map(|spec| spec.chain)
    }

    /// Explorer web link for an address page.
    pub fn address_url(&self, address: &str) -> String {
        format!("{}/address/{}", self.spec().explorer_base, address)
    }

    /// Explorer web link for a transaction page.
    pub fn tx_url(&self, hash: &str) -> String {
        format!("{}/tx/{}", self.spec().explorer_base, hash)
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
