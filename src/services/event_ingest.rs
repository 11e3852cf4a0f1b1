use anyhow::{Context, Result};
use colored::Colorize;
use futures_util::{Stream, StreamExt};
use std::fmt::Display;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::connector::oracle::OracleContract;
use crate::relay::{OracleEvent, OracleRequest};

// Macro for timestamped colored output
macro_rules! tprintln {
    ($($arg:tt)*) => {{
        println!("{} {}",
            chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string().bright_black(),
            format!($($arg)*)
        );
    }};
}

/// Oracle event ingestion service
///
/// Subscribes to `GetLatestEthPriceEvent` and `SetLatestEthPriceEvent` on the
/// oracle contract and forwards every price request to the scheduler's queue.
pub struct EventIngestService {
    pub contract: OracleContract,
    pub request_tx: mpsc::UnboundedSender<OracleRequest>,
}

impl EventIngestService {
    /// Runs until the subscription ends. Ending while the scheduler is still
    /// listening is an error.
    pub async fn run(self) -> Result<()> {
        let events = self.contract.events();
        let stream = events
            .subscribe()
            .await
            .context("Failed to subscribe to oracle events")?;

        tprintln!("{} Listening for oracle events", "[INGEST]".magenta().bold());

        let forwarded = forward_events(
            stream.map(|item| item.map(OracleEvent::from)),
            &self.request_tx,
        )
        .await;

        if self.request_tx.is_closed() {
            return Ok(());
        }

        anyhow::bail!(
            "Oracle event subscription closed after forwarding {} request(s)",
            forwarded
        )
    }
}

/// Forward price requests from an event stream to the request channel.
///
/// Erroring items are logged and dropped. Returns the number of requests
/// forwarded once the stream ends or the receiver is gone.
pub async fn forward_events<S, E>(events: S, request_tx: &mpsc::UnboundedSender<OracleRequest>) -> usize
where
    S: Stream<Item = Result<OracleEvent, E>>,
    E: Display,
{
    futures_util::pin_mut!(events);
    let mut forwarded = 0;

    while let Some(item) = events.next().await {
        match item {
            Ok(OracleEvent::PriceRequested(request)) => {
                debug!("[INGEST] Price requested: {}", request);
                if request_tx.send(request).is_err() {
                    debug!("[INGEST] Request channel closed, stopping");
                    break;
                }
                forwarded += 1;
            }
            Ok(OracleEvent::PriceSet {
                price,
                caller_address,
            }) => {
                debug!("[INGEST] Price {} set for {:?}", price, caller_address);
            }
            Err(e) => {
                warn!("[INGEST] Error on event: {}", e);
            }
        }
    }

    forwarded
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::{Address, U256};
    use futures_util::stream;

    fn requested(id: u64) -> Result<OracleEvent, String> {
        Ok(OracleEvent::PriceRequested(OracleRequest::new(
            U256::from(id),
            Address::from_low_u64_be(id),
        )))
    }

    #[tokio::test]
    async fn test_every_request_is_forwarded_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let events: Vec<_> = (1..=25).map(requested).collect();

        let forwarded = forward_events(stream::iter(events), &tx).await;
        assert_eq!(forwarded, 25);

        for id in 1..=25u64 {
            assert_eq!(rx.try_recv().unwrap().id, U256::from(id));
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_errors_and_price_set_are_dropped() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let events = vec![
            requested(1),
            Err("malformed log".to_string()),
            Ok(OracleEvent::PriceSet {
                price: U256::from(100u64),
                caller_address: Address::zero(),
            }),
            requested(2),
        ];

        let forwarded = forward_events(stream::iter(events), &tx).await;
        assert_eq!(forwarded, 2);
        assert_eq!(rx.try_recv().unwrap().id, U256::from(1u64));
        assert_eq!(rx.try_recv().unwrap().id, U256::from(2u64));
    }

    #[tokio::test]
    async fn test_stops_when_receiver_dropped() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        let forwarded = forward_events(stream::iter(vec![requested(1), requested(2)]), &tx).await;
        assert_eq!(forwarded, 0);
    }
}
