//! Side-ordered price ladder.
//!
//! ## Design
//!
//! A `Ladder` holds one side's price levels in a `BTreeMap` keyed by an
//! encoded price, chosen so that ascending key order is always priority
//! order:
//!
//! - asks: key = price (lowest ask first)
//! - bids: key = `u32::MAX - price` (highest bid first)
//!
//! `first_key_value` is therefore the best level on either side, and an
//! in-order walk visits levels from most to least aggressive.

use std::collections::BTreeMap;

use crate::orderbook::PriceLevel;
use crate::types::{Price, Side, Volume};

/// One side of a book: price levels in priority order.
#[derive(Debug, Clone)]
pub struct Ladder {
    side: Side,
    levels: BTreeMap<u32, PriceLevel>,
}

impl Ladder {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
        }
    }

    #[inline]
    pub fn side(&self) -> Side {
        self.side
    }

    #[inline]
    fn encode(&self, price: Price) -> u32 {
        match self.side {
            Side::Buy => u32::MAX - price,
            Side::Sell => price,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    #[inline]
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Level at an exact price, creating it if absent.
    pub fn level_entry(&mut self, price: Price) -> &mut PriceLevel {
        self.levels
            .entry(self.encode(price))
            .or_insert_with(|| PriceLevel::new(price))
    }

    pub fn level(&self, price: Price) -> Option<&PriceLevel> {
        self.levels.get(&self.encode(price))
    }

    pub fn level_mut(&mut self, price: Price) -> Option<&mut PriceLevel> {
        self.levels.get_mut(&self.encode(price))
    }

    /// Drop the level at `price` if it holds no orders.
    pub fn prune(&mut self, price: Price) {
        let key = self.encode(price);
        if self.levels.get(&key).is_some_and(|l| l.is_empty()) {
            self.levels.remove(&key);
        }
    }

    /// Best (most aggressive) non-empty level's price.
    pub fn best_price(&self) -> Option<Price> {
        self.levels.first_key_value().map(|(_, level)| level.price)
    }

    /// Best level, mutable, for the matching loop.
    pub fn best_level_mut(&mut self) -> Option<&mut PriceLevel> {
        self.levels.values_mut().next()
    }

    /// Total resident interest across all levels, lit and dark.
    pub fn total_interest(&self) -> u64 {
        self.levels.values().map(|l| l.interest).sum()
    }

    /// Best and next-best *displayed* prices with the displayed volume at
    /// the best. Levels holding only dark interest are skipped.
    pub fn displayed_top(&self) -> (Option<(Price, Volume)>, Option<Price>) {
        let mut it = self
            .levels
            .values()
            .filter(|l| l.displayed > 0)
            .map(|l| (l.price, l.displayed.min(Volume::MAX as u64) as Volume));
        let best = it.next();
        let next = it.next().map(|(p, _)| p);
        (best, next)
    }

    /// Walk levels in priority order (most aggressive first).
    pub fn iter(&self) -> impl Iterator<Item = &PriceLevel> {
        self.levels.values()
    }

    /// Walk levels from least to most aggressive.
    pub fn iter_rev(&self) -> impl Iterator<Item = &PriceLevel> {
        self.levels.values().rev()
    }

    /// Whether a contra order priced at `price` crosses this side's best.
    pub fn crossed_by(&self, price: Price) -> bool {
        match self.best_price() {
            Some(best) => match self.side {
                // Resting bids are crossed by a sell at or below the best bid
                Side::Buy => price <= best,
                Side::Sell => price >= best,
            },
            None => false,
        }
    }

    /// Verify queue sums against the slab, for debug assertions in tests.
    #[cfg(test)]
    pub fn check_interest(&self, slab: &slab::Slab<crate::orderbook::OrderNode>) -> bool {
        self.levels.values().all(|level| {
            let mut interest = 0u64;
            let mut cursor = level.head;
            while let Some(k) = cursor {
                let node = &slab[k];
                interest += node.remaining() as u64;
                cursor = node.next;
            }
            interest == level.interest
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orderbook::OrderNode;
    use crate::types::{Display, Order};
    use slab::Slab;

    fn push(ladder: &mut Ladder, slab: &mut Slab<OrderNode>, token: u64, price: u32, volume: u32) {
        let key = slab.insert(OrderNode::new(Order::new(token, ladder.side(), price, volume)));
        ladder.level_entry(price).push_back(key, slab);
    }

    #[test]
    fn test_bid_priority_order() {
        let mut slab = Slab::new();
        let mut bids = Ladder::new(Side::Buy);

        push(&mut bids, &mut slab, 1, 10, 5);
        push(&mut bids, &mut slab, 3, 12, 5);
        push(&mut bids, &mut slab, 5, 11, 5);

        assert_eq!(bids.best_price(), Some(12));
        let prices: Vec<u32> = bids.iter().map(|l| l.price).collect();
        assert_eq!(prices, vec![12, 11, 10]);
    }

    #[test]
    fn test_ask_priority_order() {
        let mut slab = Slab::new();
        let mut asks = Ladder::new(Side::Sell);

        push(&mut asks, &mut slab, 1, 10, 5);
        push(&mut asks, &mut slab, 3, 12, 5);
        push(&mut asks, &mut slab, 5, 11, 5);

        assert_eq!(asks.best_price(), Some(10));
        let prices: Vec<u32> = asks.iter().map(|l| l.price).collect();
        assert_eq!(prices, vec![10, 11, 12]);
    }

    #[test]
    fn test_crossed_by() {
        let mut slab = Slab::new();
        let mut bids = Ladder::new(Side::Buy);
        push(&mut bids, &mut slab, 1, 10, 5);

        assert!(bids.crossed_by(10));
        assert!(bids.crossed_by(8));
        assert!(!bids.crossed_by(11));

        let asks = Ladder::new(Side::Sell);
        assert!(!asks.crossed_by(10));
    }

    #[test]
    fn test_displayed_top_skips_dark_levels() {
        let mut slab = Slab::new();
        let mut bids = Ladder::new(Side::Buy);

        // Dark order at the best price, lit orders below
        let dark = slab.insert(OrderNode::new(
            Order::new(1, Side::Buy, 12, 5).with_display(Display::Dark),
        ));
        bids.level_entry(12).push_back(dark, &mut slab);
        push(&mut bids, &mut slab, 3, 11, 7);
        push(&mut bids, &mut slab, 5, 10, 2);

        let (best, next) = bids.displayed_top();
        assert_eq!(best, Some((11, 7)));
        assert_eq!(next, Some(10));

        // Matching priority still sees the dark level first
        assert_eq!(bids.best_price(), Some(12));
    }

    #[test]
    fn test_prune_removes_empty_levels() {
        let mut slab = Slab::new();
        let mut asks = Ladder::new(Side::Sell);
        push(&mut asks, &mut slab, 1, 10, 5);

        let key = asks.level(10).unwrap().head.unwrap();
        asks.level_mut(10).unwrap().remove(key, &mut slab);
        assert_eq!(asks.level_count(), 1);

        asks.prune(10);
        assert!(asks.is_empty());
        assert_eq!(asks.best_price(), None);
    }

    #[test]
    fn test_check_interest() {
        let mut slab = Slab::new();
        let mut bids = Ladder::new(Side::Buy);
        push(&mut bids, &mut slab, 1, 10, 5);
        push(&mut bids, &mut slab, 3, 10, 7);

        assert!(bids.check_interest(&slab));
        assert_eq!(bids.total_interest(), 12);
    }
}
