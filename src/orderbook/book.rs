//! Shared book state for all matching mechanisms.
//!
//! ## Architecture
//!
//! ```text
//! BookCore
//! ├── Slab<OrderNode>          (arena: all resting orders)
//! ├── HashMap<token, slab key> (O(1) cancel/replace lookup)
//! ├── Ladder (bids)            (BTreeMap price -> PriceLevel)
//! └── Ladder (asks)
//! ```
//!
//! The continuous, batch, and speed-bump books each wrap a `BookCore` and
//! layer their mechanism on top: the core owns residency, cancel semantics,
//! the price-time fill loop, and quote snapshots; the wrappers decide *when*
//! crossing happens and at what price.

use std::collections::HashMap;

use rand::Rng;
use slab::Slab;

use crate::error::BookError;
use crate::orderbook::{Ladder, LevelFill, OrderNode};
use crate::types::{
    BboSnapshot, Match, Order, OrderToken, Price, Side, Volume, MAX_ASK, MIN_BID,
};

/// Outcome of a cancel against a resting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelResult {
    /// Volume actually removed from the book
    pub cancelled: Volume,

    /// Volume still resident after the cancel
    pub resident: Volume,
}

/// Arena-backed order residency shared by every mechanism.
#[derive(Debug)]
pub struct BookCore {
    /// All resting orders
    slab: Slab<OrderNode>,

    /// Token -> slab key
    index: HashMap<OrderToken, usize>,

    pub bids: Ladder,
    pub asks: Ladder,

    /// Last snapshot handed out, for change detection
    last_bbo: BboSnapshot,

    /// Monotonic arrival counter, assigned to orders as they are stored
    arrival_seq: u64,
}

impl BookCore {
    pub fn new() -> Self {
        Self {
            slab: Slab::with_capacity(1024),
            index: HashMap::with_capacity(1024),
            bids: Ladder::new(Side::Buy),
            asks: Ladder::new(Side::Sell),
            last_bbo: BboSnapshot::empty(),
            arrival_seq: 0,
        }
    }

    #[inline]
    pub fn contains(&self, token: OrderToken) -> bool {
        self.index.contains_key(&token)
    }

    /// Number of orders resting in the ladders.
    #[inline]
    pub fn order_count(&self) -> usize {
        self.index.len()
    }

    pub fn order(&self, token: OrderToken) -> Option<&Order> {
        self.index.get(&token).map(|&key| &self.slab[key].order)
    }

    #[inline]
    pub fn next_arrival_seq(&mut self) -> u64 {
        let seq = self.arrival_seq;
        self.arrival_seq += 1;
        seq
    }

    /// Rest an order at the tail of its price level (price-time priority).
    pub fn insert_resting(&mut self, mut order: Order) -> Result<(), BookError> {
        if self.index.contains_key(&order.token) {
            return Err(BookError::DuplicateOrderToken(order.token));
        }
        order.arrival_seq = self.next_arrival_seq();

        let token = order.token;
        let side = order.side;
        let price = order.price;
        let key = self.slab.insert(OrderNode::new(order));
        self.index.insert(token, key);

        let ladder = match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        ladder.level_entry(price).push_back(key, &mut self.slab);
        Ok(())
    }

    /// Rest an order at a uniformly random position within the span of
    /// same-batch arrivals at its level (batch-auction entry).
    pub fn insert_resting_randomized<R: Rng>(
        &mut self,
        mut order: Order,
        batch: u64,
        rng: &mut R,
    ) -> Result<(), BookError> {
        if self.index.contains_key(&order.token) {
            return Err(BookError::DuplicateOrderToken(order.token));
        }
        order.arrival_seq = self.next_arrival_seq();
        order.batch = batch;

        let token = order.token;
        let side = order.side;
        let price = order.price;
        let key = self.slab.insert(OrderNode::new(order));
        self.index.insert(token, key);

        let ladder = match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        ladder
            .level_entry(price)
            .push_randomized(key, batch, rng, &mut self.slab);
        Ok(())
    }

    /// Cancel all or part of a resting order.
    ///
    /// `volume` is the desired volume to *remain* on the book:
    /// - `0` cancels fully;
    /// - `0 < volume < resident` reduces the order to `volume`, keeping its
    ///   queue position;
    /// - `volume >= resident` cancels nothing and reports the over-cancel.
    pub fn cancel(&mut self, token: OrderToken, volume: Volume) -> Result<CancelResult, BookError> {
        let &key = self
            .index
            .get(&token)
            .ok_or(BookError::UnknownOrderToken(token))?;
        let (side, price, resident) = {
            let node = &self.slab[key];
            (node.order.side, node.price(), node.remaining())
        };

        if volume == 0 {
            let order = self.remove(token)?;
            return Ok(CancelResult {
                cancelled: order.remaining,
                resident: 0,
            });
        }
        if volume >= resident {
            return Err(BookError::OverCancelAttempt {
                token,
                requested: volume,
                resident,
            });
        }

        let ladder = match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        let level = ladder
            .level_mut(price)
            .ok_or(BookError::InvariantViolation("resident order has no level"))?;
        let cancelled = level.reduce(key, volume, &mut self.slab);
        Ok(CancelResult {
            cancelled,
            resident: volume,
        })
    }

    /// Remove a resting order outright, returning it (replace, auto-cancel).
    pub fn remove(&mut self, token: OrderToken) -> Result<Order, BookError> {
        let key = self
            .index
            .remove(&token)
            .ok_or(BookError::UnknownOrderToken(token))?;
        let (side, price) = {
            let node = &self.slab[key];
            (node.order.side, node.price())
        };

        let ladder = match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        if let Some(level) = ladder.level_mut(price) {
            level.remove(key, &mut self.slab);
        }
        ladder.prune(price);
        Ok(self.slab.remove(key).order)
    }

    /// Whether an aggressor at `limit` crosses the contra side's best level,
    /// and at what price.
    pub fn crossing_price(&self, side: Side, limit: Price) -> Option<Price> {
        let best = self.ladder_for(side.opposite()).best_price()?;
        let crosses = match side {
            Side::Buy => limit >= best,
            Side::Sell => limit <= best,
        };
        crosses.then_some(best)
    }

    /// Fill against the single best contra level, if the limit crosses it.
    /// Matches are priced at the resting level. Returns the leftover volume.
    pub fn fill_best_level(
        &mut self,
        aggressor: OrderToken,
        side: Side,
        limit: Price,
        volume: Volume,
    ) -> (Vec<Match>, Volume) {
        let Some(best) = self.crossing_price(side, limit) else {
            return (Vec::new(), volume);
        };

        let fill = {
            let contra = match side {
                Side::Buy => &mut self.asks,
                Side::Sell => &mut self.bids,
            };
            match contra.level_mut(best) {
                Some(level) => level.fill(volume, &mut self.slab),
                None => LevelFill::default(),
            }
        };

        let mut matches = Vec::with_capacity(fill.fills.len());
        for &(resting, taken) in &fill.fills {
            matches.push(Match {
                aggressor,
                resting,
                price: best,
                volume: taken,
            });
        }
        for key in fill.drained {
            let token = self.slab.remove(key).token();
            self.index.remove(&token);
        }
        match side {
            Side::Buy => self.asks.prune(best),
            Side::Sell => self.bids.prune(best),
        }

        (matches, volume - fill.filled)
    }

    /// Cross `volume` of an aggressor against the contra ladder, best price
    /// inward, FIFO within a level. Stops when the limit no longer crosses or
    /// the volume is exhausted.
    pub fn fill_against(
        &mut self,
        aggressor: OrderToken,
        side: Side,
        limit: Price,
        volume: Volume,
    ) -> (Vec<Match>, Volume) {
        let mut matches = Vec::new();
        let mut leftover = volume;

        while leftover > 0 && self.crossing_price(side, limit).is_some() {
            let (level_matches, rest) = self.fill_best_level(aggressor, side, limit, leftover);
            matches.extend(level_matches);
            leftover = rest;
        }

        (matches, leftover)
    }

    /// Cross every bid at/above `clearing` against every ask at/below it,
    /// all matches priced at `clearing`. Bids act as the recorded aggressor
    /// side. Used by the batch auction after the clearing price is fixed.
    pub fn uniform_cross(&mut self, clearing: Price) -> Result<Vec<Match>, BookError> {
        let mut matches = Vec::new();

        while let Some(bid_price) = self.bids.best_price() {
            if bid_price < clearing {
                break;
            }
            let head = self
                .bids
                .level(bid_price)
                .and_then(|level| level.peek_head())
                .ok_or(BookError::InvariantViolation("best level has no head"))?;
            let (bid_token, bid_remaining) = {
                let node = &self.slab[head];
                (node.token(), node.remaining())
            };

            let (mut bid_matches, leftover) =
                self.fill_against(bid_token, Side::Buy, clearing, bid_remaining);
            if bid_matches.is_empty() {
                // No ask interest left at or below the clearing price
                break;
            }
            for m in &mut bid_matches {
                m.price = clearing;
            }
            matches.extend(bid_matches);

            if leftover == 0 {
                self.remove(bid_token)?;
            } else {
                self.cancel(bid_token, leftover)?;
            }
        }

        Ok(matches)
    }

    /// Current snapshot from displayed interest only.
    pub fn bbo(&self) -> BboSnapshot {
        let (bid_best, bid_next) = self.bids.displayed_top();
        let (ask_best, ask_next) = self.asks.displayed_top();
        let (best_bid, volume_at_best_bid) = bid_best.unwrap_or((MIN_BID, 0));
        let (best_ask, volume_at_best_ask) = ask_best.unwrap_or((MAX_ASK, 0));
        BboSnapshot {
            best_bid,
            volume_at_best_bid,
            best_ask,
            volume_at_best_ask,
            next_bid: bid_next.unwrap_or(MIN_BID),
            next_ask: ask_next.unwrap_or(MAX_ASK),
        }
    }

    /// Recompute the snapshot; `Some` only when it changed since the last
    /// call. The session broadcasts exactly these.
    pub fn bbo_delta(&mut self) -> Option<BboSnapshot> {
        let bbo = self.bbo();
        if bbo == self.last_bbo {
            None
        } else {
            self.last_bbo = bbo;
            Some(bbo)
        }
    }

    #[inline]
    pub fn ladder_for(&self, side: Side) -> &Ladder {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }
}

impl Default for BookCore {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
