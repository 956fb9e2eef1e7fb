//! Session-wide order store.
//!
//! The store is the session's append-only memory of every order it ever
//! accepted: the original entry terms, the event history, and the running
//! executed quantity. Books only know about *resting* volume; the store is
//! what makes token uniqueness and replace volume accounting work after an
//! order has partially or fully left the book.

use std::collections::HashMap;

use crate::types::{EngineEvent, Order, OrderToken, Price, Side, TimeInForce, Volume};

/// One accepted order's permanent record.
#[derive(Debug, Clone)]
pub struct StoredOrder {
    pub token: OrderToken,
    pub side: Side,
    pub price: Price,

    /// Volume at entry, never updated
    pub volume: Volume,

    pub display: bool,
    pub midpoint_peg: bool,
    pub time_in_force: TimeInForce,

    /// Total executed so far
    pub executed: u64,

    /// Every event the session attributed to this token, in order
    pub events: Vec<EngineEvent>,
}

/// Append-only map of every token the session has accepted.
#[derive(Debug, Default)]
pub struct OrderStore {
    orders: HashMap<OrderToken, StoredOrder>,
}

impl OrderStore {
    pub fn new() -> Self {
        Self {
            orders: HashMap::new(),
        }
    }

    /// Record a newly accepted order. Returns `false` if the token was ever
    /// used before; the entry is not overwritten.
    pub fn store_order(&mut self, order: &Order) -> bool {
        if self.orders.contains_key(&order.token) {
            return false;
        }
        self.orders.insert(
            order.token,
            StoredOrder {
                token: order.token,
                side: order.side,
                price: order.price,
                volume: order.volume,
                display: order.display.is_lit(),
                midpoint_peg: order.midpoint_peg,
                time_in_force: order.time_in_force,
                executed: 0,
                events: Vec::new(),
            },
        );
        true
    }

    #[inline]
    pub fn contains(&self, token: OrderToken) -> bool {
        self.orders.contains_key(&token)
    }

    pub fn get(&self, token: OrderToken) -> Option<&StoredOrder> {
        self.orders.get(&token)
    }

    /// Append an event to its order's history (no-op for unknown tokens,
    /// which only happens for events the session chose not to admit).
    pub fn record_event(&mut self, event: &EngineEvent) {
        if let Some(token) = event.token() {
            if let Some(stored) = self.orders.get_mut(&token) {
                stored.events.push(event.clone());
            }
        }
    }

    /// Accumulate executed quantity against a token.
    pub fn execute_quantity(&mut self, token: OrderToken, volume: Volume) {
        if let Some(stored) = self.orders.get_mut(&token) {
            stored.executed += volume as u64;
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
