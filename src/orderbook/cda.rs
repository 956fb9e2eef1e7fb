//! Continuous double auction book.
//!
//! Incoming orders cross immediately against the contra side, best price
//! inward with FIFO within a level, paying the resting order's price. Any
//! unfilled remainder rests at its limit (unless the order is
//! immediate-or-cancel).

use crate::error::BookError;
use crate::orderbook::{BookCore, CancelResult};
use crate::types::{BboSnapshot, Match, Order, OrderToken, Volume};

/// Result of entering an order into a continuous book.
#[derive(Debug, Clone)]
pub struct EnterOutcome {
    /// Matches generated at crossing time, aggressor's view
    pub matches: Vec<Match>,

    /// Aggressor volume left unfilled after crossing
    pub leftover: Volume,

    /// Whether the leftover was placed on the book
    pub rested: bool,

    /// Quote change caused by this entry, if any
    pub bbo: Option<BboSnapshot>,
}

/// Continuous double auction over a [`BookCore`].
#[derive(Debug, Default)]
pub struct CdaBook {
    core: BookCore,
}

impl CdaBook {
    pub fn new() -> Self {
        Self {
            core: BookCore::new(),
        }
    }

    #[inline]
    pub fn core(&self) -> &BookCore {
        &self.core
    }

    /// Enter a limit order: cross first, rest the remainder.
    pub fn enter(&mut self, order: Order) -> Result<EnterOutcome, BookError> {
        if self.core.contains(order.token) {
            return Err(BookError::DuplicateOrderToken(order.token));
        }

        let (matches, leftover) =
            self.core
                .fill_against(order.token, order.side, order.price, order.remaining);

        let mut rested = false;
        if leftover > 0 && order.time_in_force.rests() {
            let mut remainder = order;
            remainder.remaining = leftover;
            self.core.insert_resting(remainder)?;
            rested = true;
        }

        Ok(EnterOutcome {
            matches,
            leftover,
            rested,
            bbo: self.core.bbo_delta(),
        })
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
}

// ============================================================================
// Unit Tests
// ============================================================================
