pub mod aggregator;
pub mod chains;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod explorer;
pub mod formatter;
pub mod models;
pub mod prices;
pub mod registry;
pub mod watermark;

pub use chains::Chain;
pub use config::AppConfig;
pub use dispatcher::{DeliveryOutcome, Dispatcher, TelegramTransport, Transport};
pub use engine::{CycleReport, WatchEngine};
pub use error::{Result, WatchError};
pub use explorer::{ExplorerClient, TransactionSource};
pub use formatter::NotificationEvent;
pub use models::{ChainTransaction, OwnerId, WatchEntry};
pub use prices::{PriceOracle, PriceSnapshot};
pub use registry::{AddressRegistry, InMemoryRegistry};
pub use watermark::WatermarkStore;
