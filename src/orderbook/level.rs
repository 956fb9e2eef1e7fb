//! Price level management for orders at the same price.
//!
//! ## Design
//!
//! A `PriceLevel` represents all orders resting at a single price point.
//! Orders are maintained in a doubly-linked list for FIFO ordering
//! (price-time priority).
//!
//! ## Queue Structure
//!
//! ```text
//! head (oldest) <-> order2 <-> order3 <-> tail (newest)
//! ```
//!
//! - New orders are appended at the tail
//! - Matching consumes orders from the head
//! - Any order can be removed in O(1) using the slab key
//!
//! The level tracks two running sums: `interest` (all resident volume) and
//! `displayed` (lit volume only). Quote snapshots read `displayed`; matching
//! and batch clearing read `interest`.

use rand::Rng;
use slab::Slab;

use crate::orderbook::OrderNode;
use crate::types::{OrderToken, Price, Volume};

/// Result of filling volume against a level's queue head-to-tail.
#[derive(Debug, Clone, Default)]
pub struct LevelFill {
    /// Total volume taken from this level
    pub filled: Volume,

    /// Per-order fills, oldest first
    pub fills: Vec<(OrderToken, Volume)>,

    /// Slab keys of orders fully consumed and unlinked; the owning book
    /// must release them from the slab and its token index
    pub drained: Vec<usize>,
}

/// A price level containing orders at a single price.
///
/// Orders are stored in a FIFO queue (doubly-linked list).
/// The actual order data lives in the slab; this struct only
/// holds the queue metadata.
#[derive(Debug, Clone)]
pub struct PriceLevel {
    /// Price for this level (integer ticks)
    pub price: Price,

    /// Total resident volume at this level, lit and dark
    pub interest: u64,

    /// Lit resident volume only; this is what quote snapshots report
    pub displayed: u64,

    /// Head of the order queue (oldest order, slab key)
    pub head: Option<usize>,

    /// Tail of the order queue (newest order, slab key)
    pub tail: Option<usize>,

    /// Number of orders at this price level
    pub order_count: usize,
}

impl PriceLevel {
    /// Create a new empty price level
    pub fn new(price: Price) -> Self {
        Self {
            price,
            interest: 0,
            displayed: 0,
            head: None,
            tail: None,
            order_count: 0,
        }
    }

    /// Check if the price level is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order_count == 0
    }

    /// Add an order to the tail of the queue
    ///
    /// This maintains FIFO ordering - oldest orders are matched first.
    ///
    /// # Panics
    ///
    /// Panics if the key doesn't exist in the slab
    pub fn push_back(&mut self, key: usize, slab: &mut Slab<OrderNode>) {
        let node = slab.get_mut(key).expect("invalid slab key");
        let volume = node.remaining();
        let lit = node.order.display.is_lit();

        node.prev = self.tail;
        node.next = None;

        if let Some(tail_key) = self.tail {
            let tail_node = slab.get_mut(tail_key).expect("invalid tail key");
            tail_node.next = Some(key);
        } else {
            // Empty list - this is also the head
            self.head = Some(key);
        }

        self.tail = Some(key);
        self.order_count += 1;
        self.add_interest(volume, lit);
    }

    /// Add an order at a uniformly random position within the span of
    /// same-batch orders at the tail of the queue.
    ///
    /// Orders from earlier batches keep strict priority; only arrival order
    /// *within* the current batch is randomized, so same-batch arrival time
    /// confers no advantage at the clearing tick.
    pub fn push_randomized<R: Rng>(
        &mut self,
        key: usize,
        batch: u64,
        rng: &mut R,
        slab: &mut Slab<OrderNode>,
    ) {
        // Walk backwards from the tail over orders of the current batch.
        let mut span_start = None;
        let mut span_len = 0usize;
        let mut cursor = self.tail;
        while let Some(k) = cursor {
            let node = slab.get(k).expect("invalid slab key");
            if node.order.batch != batch {
                break;
            }
            span_start = Some(k);
            span_len += 1;
            cursor = node.prev;
        }

        let pos = rng.gen_range(0..=span_len);
        if pos == span_len {
            self.push_back(key, slab);
            return;
        }

        let mut before = span_start.expect("non-empty span has a start");
        for _ in 0..pos {
            before = slab
                .get(before)
                .expect("invalid slab key")
                .next
                .expect("span walk past tail");
        }
        self.insert_before(key, before, slab);
    }

    /// Insert an order immediately before an existing queue member.
    fn insert_before(&mut self, key: usize, before: usize, slab: &mut Slab<OrderNode>) {
        let (volume, lit) = {
            let node = slab.get(key).expect("invalid slab key");
            (node.remaining(), node.order.display.is_lit())
        };

        let prev_key = slab.get(before).expect("invalid slab key").prev;

        {
            let node = slab.get_mut(key).expect("invalid slab key");
            node.prev = prev_key;
            node.next = Some(before);
        }
        slab.get_mut(before).expect("invalid slab key").prev = Some(key);

        if let Some(prev) = prev_key {
            slab.get_mut(prev).expect("invalid prev key").next = Some(key);
        } else {
            self.head = Some(key);
        }

        self.order_count += 1;
        self.add_interest(volume, lit);
    }

    /// Remove an order from the queue by slab key
    ///
    /// # Returns
    ///
    /// The remaining volume of the removed order
    pub fn remove(&mut self, key: usize, slab: &mut Slab<OrderNode>) -> Volume {
        let node = slab.get(key).expect("invalid slab key");
        let volume = node.remaining();
        let lit = node.order.display.is_lit();
        let prev_key = node.prev;
        let next_key = node.next;

        if let Some(prev) = prev_key {
            let prev_node = slab.get_mut(prev).expect("invalid prev key");
            prev_node.next = next_key;
        } else {
            // This was the head
            self.head = next_key;
        }

        if let Some(next) = next_key {
            let next_node = slab.get_mut(next).expect("invalid next key");
            next_node.prev = prev_key;
        } else {
            // This was the tail
            self.tail = prev_key;
        }

        let node = slab.get_mut(key).expect("invalid slab key");
        node.prev = None;
        node.next = None;

        self.order_count -= 1;
        self.sub_interest(volume, lit);

        volume
    }

    /// Reduce a resident order's volume in place, keeping its queue position.
    ///
    /// The caller has already checked that `new_volume` is strictly below the
    /// order's remaining volume.
    pub fn reduce(&mut self, key: usize, new_volume: Volume, slab: &mut Slab<OrderNode>) -> Volume {
        let node = slab.get_mut(key).expect("invalid slab key");
        let delta = node.remaining().saturating_sub(new_volume);
        let lit = node.order.display.is_lit();
        node.order.remaining = new_volume;
        self.sub_interest(delta, lit);
        delta
    }

    /// Fill up to `volume` against the queue, head to tail.
    ///
    /// Fully consumed orders are unlinked and reported in
    /// [`LevelFill::drained`]; the owning book releases their slab entries.
    pub fn fill(&mut self, volume: Volume, slab: &mut Slab<OrderNode>) -> LevelFill {
        let mut result = LevelFill::default();
        let mut wanted = volume;

        while wanted > 0 {
            let Some(head_key) = self.head else { break };
            let node = slab.get_mut(head_key).expect("invalid head key");
            let lit = node.order.display.is_lit();
            let taken = node.fill(wanted);
            let token = node.token();
            let done = node.is_filled();

            wanted -= taken;
            self.sub_interest(taken, lit);
            result.fills.push((token, taken));

            if done {
                // remove() sees zero remaining, so the sums stay exact
                self.remove(head_key, slab);
                result.drained.push(head_key);
            }
        }

        result.filled = volume - wanted;
        result
    }

    /// Get the head order's slab key (oldest order)
    #[inline]
    pub fn peek_head(&self) -> Option<usize> {
        self.head
    }

    #[inline]
    fn add_interest(&mut self, volume: Volume, lit: bool) {
        self.interest = self.interest.saturating_add(volume as u64);
        if lit {
            self.displayed = self.displayed.saturating_add(volume as u64);
        }
    }

    #[inline]
    fn sub_interest(&mut self, volume: Volume, lit: bool) {
        self.interest = self.interest.saturating_sub(volume as u64);
        if lit {
            self.displayed = self.displayed.saturating_sub(volume as u64);
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
