//! Frequent batch auction book.
//!
//! Orders never cross on arrival. They accumulate in the ladders, tagged with
//! the currently open batch number, until the session fires a clearing tick.
//! At the tick a single clearing price is derived and all crossable interest
//! trades at that one price.
//!
//! ## Intra-batch priority
//!
//! Arrival time within a batch confers no advantage: an arriving order is
//! placed at a uniformly random position among the same-batch orders already
//! queued at its price level. Orders carried over from earlier batches keep
//! strict time priority ahead of the current batch.
//!
//! ## Clearing price
//!
//! Walk all price levels, bids and asks merged, from the highest price down,
//! accumulating resident interest. The clearing price is the price of the
//! level at which the running total first reaches the total ask interest.
//! With no ask interest there is no clearing price and the batch is a no-op.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::BookError;
use crate::orderbook::{BookCore, CancelResult};
use crate::types::{BboSnapshot, Match, Order, OrderToken, Price, Volume};

/// Everything one clearing tick produced. The session turns this into
/// executions plus a post-batch broadcast.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub clearing_price: Option<Price>,
    pub matches: Vec<Match>,
    pub transacted_volume: u64,

    /// Post-clear snapshot, always reported (trades or not)
    pub bbo: BboSnapshot,

    /// `Some` only when the snapshot changed during the clear
    pub bbo_delta: Option<BboSnapshot>,
}

/// Frequent batch auction over a [`BookCore`].
#[derive(Debug)]
pub struct FbaBook {
    core: BookCore,

    /// Currently open batch; bumped after every clearing tick
    batch: u64,

    /// Seeded RNG driving intra-batch position draws
    rng: StdRng,
}

impl FbaBook {
    pub fn new(seed: u64) -> Self {
        Self {
            core: BookCore::new(),
            batch: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    #[inline]
    pub fn core(&self) -> &BookCore {
        &self.core
    }

    #[inline]
    pub fn batch_number(&self) -> u64 {
        self.batch
    }

    /// Enter an order into the open batch. Never crosses.
    pub fn enter(&mut self, order: Order) -> Result<Option<BboSnapshot>, BookError> {
        self.core
            .insert_resting_randomized(order, self.batch, &mut self.rng)?;
        Ok(self.core.bbo_delta())
    }

    /// Cancel all or part of a resting order (see [`BookCore::cancel`]).
    pub fn cancel(
        &mut self,
        token: OrderToken,
        volume: Volume,
    ) -> Result<(CancelResult, Option<BboSnapshot>), BookError> {
        let result = self.core.cancel(token, volume)?;
        Ok((result, self.core.bbo_delta()))
    }

    /// Remove a resting order outright (replace path).
    pub fn remove(&mut self, token: OrderToken) -> Result<(Order, Option<BboSnapshot>), BookError> {
        let order = self.core.remove(token)?;
        Ok((order, self.core.bbo_delta()))
    }

    /// Derive the uniform clearing price for the current book state.
    fn clearing_price(&self) -> Option<Price> {
        let ask_interest = self.core.asks.total_interest();
        let mut bids = self.core.bids.iter().peekable();
        let mut asks = self.core.asks.iter_rev().peekable();

        let mut cumulative = 0u64;
        let mut clearing = None;

        while cumulative < ask_interest {
            let level = match (bids.peek(), asks.peek()) {
                (None, None) => break,
                (Some(_), None) => bids.next(),
                (None, Some(_)) => asks.next(),
                (Some(b), Some(a)) => {
                    if a.price >= b.price {
                        asks.next()
                    } else {
                        bids.next()
                    }
                }
            };
            let Some(level) = level else { break };
            cumulative += level.interest;
            clearing = Some(level.price);
        }

        clearing
    }

    /// Clear the open batch: fix the clearing price, cross all eligible
    /// interest at it, and open the next batch.
    pub fn batch_process(&mut self) -> Result<BatchOutcome, BookError> {
        let clearing_price = self.clearing_price();
        let matches = match clearing_price {
            Some(clearing) => self.core.uniform_cross(clearing)?,
            None => Vec::new(),
        };
        let transacted_volume = matches.iter().map(|m| m.volume as u64).sum();

        self.batch += 1;

        Ok(BatchOutcome {
            clearing_price,
            matches,
            transacted_volume,
            bbo: self.core.bbo(),
            bbo_delta: self.core.bbo_delta(),
        })
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Side;

    fn enter(book: &mut FbaBook, token: u64, side: Side, price: u32, volume: u32) {
        book.enter(Order::new(token, side, price, volume)).unwrap();
    }

    #[test]
    fn test_entry_never_crosses() {
        let mut book = FbaBook::new(1);
        enter(&mut book, 1, Side::Buy, 12, 5);
        enter(&mut book, 3, Side::Sell, 10, 5);

        // Locked market rests untouched until the tick
        assert_eq!(book.core().order(1).unwrap().remaining, 5);
        assert_eq!(book.core().order(3).unwrap().remaining, 5);
        let bbo = book.core().bbo();
        assert_eq!(bbo.best_bid, 12);
        assert_eq!(bbo.best_ask, 10);
    }

    #[test]
    fn test_uniform_clearing_price() {
        let mut book = FbaBook::new(1);
        enter(&mut book, 1, Side::Buy, 12, 3);
        enter(&mut book, 3, Side::Buy, 10, 2);
        enter(&mut book, 5, Side::Sell, 9, 4);

        let outcome = book.batch_process().unwrap();

        // Descending scan: 12(+3) cumulative 3 < 4, 10(+2) cumulative 5 >= 4
        assert_eq!(outcome.clearing_price, Some(10));
        assert_eq!(outcome.transacted_volume, 4);
        for m in &outcome.matches {
            assert_eq!(m.price, 10);
            assert_eq!(m.resting, 5);
        }
        assert_eq!(outcome.matches[0].aggressor, 1);
        assert_eq!(outcome.matches[0].volume, 3);
        assert_eq!(outcome.matches[1].aggressor, 3);
        assert_eq!(outcome.matches[1].volume, 1);

        // Bid 3 keeps its unfilled share at 10
        assert_eq!(book.core().order(3).unwrap().remaining, 1);
        assert!(!book.core().contains(1));
        assert!(!book.core().contains(5));
    }

    #[test]
    fn test_empty_batch_has_no_clearing_price() {
        let mut book = FbaBook::new(1);
        let outcome = book.batch_process().unwrap();
        assert_eq!(outcome.clearing_price, None);
        assert!(outcome.matches.is_empty());
        assert_eq!(outcome.transacted_volume, 0);
    }

    #[test]
    fn test_bid_only_batch_has_no_clearing_price() {
        let mut book = FbaBook::new(1);
        enter(&mut book, 1, Side::Buy, 12, 5);

        let outcome = book.batch_process().unwrap();
        assert_eq!(outcome.clearing_price, None);
        assert!(outcome.matches.is_empty());
        assert_eq!(book.core().order(1).unwrap().remaining, 5);
    }

    #[test]
    fn test_ask_only_batch_clears_nothing() {
        let mut book = FbaBook::new(1);
        enter(&mut book, 1, Side::Sell, 10, 5);

        let outcome = book.batch_process().unwrap();
        // The descending scan still lands on a price, but no bid crosses it
        assert_eq!(outcome.clearing_price, Some(10));
        assert!(outcome.matches.is_empty());
        assert_eq!(book.core().order(1).unwrap().remaining, 5);
    }

    #[test]
    fn test_uncrossed_batch_carries_over() {
        let mut book = FbaBook::new(1);
        enter(&mut book, 1, Side::Buy, 9, 5);
        enter(&mut book, 3, Side::Sell, 11, 5);

        let outcome = book.batch_process().unwrap();
        assert!(outcome.matches.is_empty());
        assert_eq!(book.batch_number(), 1);

        // Both orders survive into the next batch
        assert!(book.core().contains(1));
        assert!(book.core().contains(3));
    }

    #[test]
    fn test_carried_orders_keep_priority_over_new_batch() {
        let mut book = FbaBook::new(1);
        enter(&mut book, 1, Side::Buy, 10, 2);
        book.batch_process().unwrap();

        // Same price, next batch: must queue behind the carried order
        enter(&mut book, 3, Side::Buy, 10, 2);
        enter(&mut book, 5, Side::Sell, 10, 2);

        let outcome = book.batch_process().unwrap();
        assert_eq!(outcome.clearing_price, Some(10));
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].aggressor, 1);
        assert!(book.core().contains(3));
    }

    #[test]
    fn test_seeded_sessions_are_deterministic() {
        let run = |seed: u64| -> Vec<Match> {
            let mut book = FbaBook::new(seed);
            for token in [1u64, 3, 5, 7] {
                enter(&mut book, token, Side::Buy, 10, 1);
            }
            enter(&mut book, 9, Side::Sell, 10, 2);
            book.batch_process().unwrap().matches
        };

        assert_eq!(run(7), run(7));
    }
}
