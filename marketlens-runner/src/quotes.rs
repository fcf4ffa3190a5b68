//! Concurrent quote fan-out with a batch deadline.
//!
//! One thread per instrument. Each thread sends exactly one `(slot, result)`
//! message; the collecting thread is the only writer of the board. Slots
//! that have not reported when the deadline passes become
//! `DataError::Timeout` and whatever arrives later is dropped.

use crate::config::Instrument;
use marketlens_core::data::{DataError, MarketDataProvider, Quote};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Latest quotes keyed by instrument, in configured order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteBoard {
    pub quotes: Vec<(Instrument, Quote)>,
    pub failures: Vec<(Instrument, DataError)>,
}

impl QuoteBoard {
    pub fn get(&self, symbol: &str) -> Option<&Quote> {
        self.quotes
            .iter()
            .find(|(i, _)| i.symbol == symbol)
            .map(|(_, q)| q)
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Fetch one quote per instrument concurrently, waiting at most `deadline`
/// for the whole batch.
pub fn fetch_quotes(
    provider: Arc<dyn MarketDataProvider>,
    instruments: &[Instrument],
    deadline: Duration,
) -> QuoteBoard {
    let started = Instant::now();
    let (tx, rx) = mpsc::channel::<(usize, Result<Quote, DataError>)>();

    for (slot, instrument) in instruments.iter().enumerate() {
        let worker_tx = tx.clone();
        let worker_provider = Arc::clone(&provider);
        let symbol = instrument.symbol.clone();
        let spawned = thread::Builder::new()
            .name(format!("quote-{symbol}"))
            .spawn(move || {
                let result = worker_provider.quote(&symbol);
                // The collector may already have given up on this slot.
                let _ = worker_tx.send((slot, result));
            });
        if let Err(e) = spawned {
            warn!(symbol = %instrument.symbol, error = %e, "failed to spawn quote thread");
            let _ = tx.send((
                slot,
                Err(DataError::Network {
                    provider: provider.name().to_string(),
                    reason: format!("spawn failed: {e}"),
                }),
            ));
        }
    }
    drop(tx);

    let mut slots: Vec<Option<Result<Quote, DataError>>> = vec![None; instruments.len()];
    let mut pending = instruments.len();
    while pending > 0 {
        let remaining = deadline.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            break;
        }
        match rx.recv_timeout(remaining) {
            Ok((slot, result)) => {
                if slots[slot].is_none() {
                    pending -= 1;
                }
                slots[slot] = Some(result);
            }
            // Timeout, or every sender is gone.
            Err(_) => break,
        }
    }

    let elapsed_ms = started.elapsed().as_millis() as u64;
    let mut board = QuoteBoard::default();
    for (instrument, slot) in instruments.iter().zip(slots) {
        match slot {
            Some(Ok(quote)) => board.quotes.push((instrument.clone(), quote)),
            Some(Err(e)) => {
                warn!(symbol = %instrument.symbol, error = %e, "quote failed");
                board.failures.push((instrument.clone(), e));
            }
            None => {
                warn!(symbol = %instrument.symbol, elapsed_ms, "quote missed the deadline");
                board.failures.push((
                    instrument.clone(),
                    DataError::Timeout {
                        id: instrument.symbol.clone(),
                        elapsed_ms,
                    },
                ));
            }
        }
    }
    debug!(
        ok = board.quotes.len(),
        failed = board.failures.len(),
        elapsed_ms,
        "quote batch done"
    );
    board
}
