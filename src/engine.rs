use crate::aggregator;
use crate::config::PollConfig;
use crate::dispatcher::Dispatcher;
use crate::explorer::TransactionSource;
use crate::formatter::{match_entry, NotificationEvent};
use crate::prices::PriceOracle;
use crate::registry::AddressRegistry;
use crate::watermark::WatermarkStore;
use crate::error::WatchError;
use crate::models::OwnerId;
use futures::future::join_all;
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::time::{interval, MissedTickBehavior};

/// Counters for one completed poll cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub users_polled: usize,
    pub new_transactions: usize,
    pub delivered: usize,
    pub abandoned: usize,
}

/// Top-level scheduler: every `poll.interval_seconds`, refresh prices,
/// aggregate new transactions per user and route them through the
/// formatter to the dispatcher. Owns the watermark store exclusively;
/// cycles never overlap (the next tick waits for the current cycle's
/// dispatch work to finish).
pub struct WatchEngine {
    registry: Arc<dyn AddressRegistry>,
    source: Arc<dyn TransactionSource>,
    oracle: PriceOracle,
    dispatcher: Dispatcher,
    watermarks: WatermarkStore,
    config: PollConfig,
    shutdown_signal: Arc<AtomicBool>,
}

impl WatchEngine {
    pub fn new(
        registry: Arc<dyn AddressRegistry>,
        source: Arc<dyn TransactionSource>,
        oracle: PriceOracle,
        dispatcher: Dispatcher,
        watermarks: WatermarkStore,
        config: PollConfig,
    ) -> Self {
        Self {
            registry,
            source,
            oracle,
            dispatcher,
            watermarks,
            config,
            shutdown_signal: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request graceful shutdown: the in-flight cycle finishes, then the
    /// loop stops.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown_signal)
    }

    /// Run the poll loop until shutdown is requested.
    pub async fn run(&mut self) {
        info!(
            "starting watch engine with {}s poll interval",
            self.config.interval_seconds
        );

        let mut ticker = interval(Duration::from_secs(self.config.interval_seconds));
        // A cycle that overruns the interval (a rate-limit cooldown can
        // hold one open for minutes) must not be followed by a burst of
        // make-up polls; the next tick waits a full interval.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let shutdown_signal = Arc::clone(&self.shutdown_signal);
        tokio::spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => {
                    info!("received shutdown signal");
                    shutdown_signal.store(true, Ordering::Relaxed);
                }
                Err(err) => {
                    error!("unable to listen for shutdown signal: {}", err);
                }
            }
        });

        loop {
            ticker.tick().await;

            if self.shutdown_signal.load(Ordering::Relaxed) {
                info!("shutdown requested, stopping watch engine");
                return;
            }

            match self.run_cycle().await {
                Ok(report) => {
                    if report.new_transactions > 0 {
                        info!(
                            "cycle complete: {} users, {} new transactions, {} delivered, {} abandoned",
                            report.users_polled,
                            report.new_transactions,
                            report.delivered,
                            report.abandoned
                        );
                    } else {
                        debug!("cycle complete: {} users, nothing new", report.users_polled);
                    }
                }
                // A cycle that could not even start (registry down) is
                // logged; the loop continues on the next tick.
                Err(e) => error!("poll cycle failed: {}", e),
            }
        }
    }

    /// One poll cycle: price snapshot, per-user aggregation, then one
    /// concurrent delivery per pending notification. One user's failures
    /// never block another's.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, WatchError> {
        let prices = self.oracle.refresh().await;
        let watch_lists = self.registry.list_all().await?;

        let mut report = CycleReport::default();
        let mut watched: HashSet<(OwnerId, String)> = HashSet::new();
        let mut pending: Vec<(OwnerId, String)> = Vec::new();
        let mut advances: Vec<(OwnerId, String, u64)> = Vec::new();

        for (owner, entries) in &watch_lists {
            for entry in entries {
                watched.insert((*owner, entry.address.clone()));
            }
            if entries.is_empty() {
                continue;
            }
            report.users_polled += 1;

            let batch = aggregator::collect_new_transactions(
                self.source.as_ref(),
                *owner,
                entries,
                &self.watermarks,
            )
            .await;

            report.new_transactions += batch.transactions.len();

            for tx in &batch.transactions {
                let matched = match_entry(entries, tx);
                if matched.is_none() {
                    warn!(
                        "transaction {} on {} matches no watch entry for {}, labeling unknown",
                        tx.hash, tx.chain, owner
                    );
                }
                let event = NotificationEvent::build(*owner, tx, matched, &prices);
                pending.push((*owner, event.render()));
            }

            for (address, high_mark) in batch.high_marks {
                advances.push((*owner, address, high_mark));
            }
        }

        // Deliveries fan out concurrently; a recipient sitting in a
        // rate-limit cooldown does not delay anyone else's notification.
        let dispatcher = &self.dispatcher;
        let outcomes = join_all(
            pending
                .iter()
                .map(|(owner, text)| dispatcher.send(*owner, text)),
        )
        .await;
        for outcome in outcomes {
            if outcome.is_delivered() {
                report.delivered += 1;
            } else {
                report.abandoned += 1;
            }
        }

        // One atomic advance per (owner, address) per cycle, after
        // aggregation, against the boundary captured at cycle start.
        for (owner, address, high_mark) in advances {
            self.watermarks.advance(owner, &address, high_mark);
        }
        // Marks for watches removed since the last cycle are dropped.
        self.watermarks.retain_watched(&watched);

        Ok(report)
    }
}
