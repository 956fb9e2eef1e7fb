//! Order node for slab-based storage.
//!
//! ## Design
//!
//! `OrderNode` wraps an [`Order`] with doubly-linked list pointers so a
//! price-level queue can remove it from anywhere in O(1) given its slab key.
//! The pointers are slab keys (`usize`), not references, which keeps the
//! arena index-stable while orders move between queues on replace.

use crate::types::{Order, OrderToken, Price, Volume};

/// Order node stored in a book's slab arena.
#[derive(Debug, Clone)]
pub struct OrderNode {
    /// The actual order data
    pub order: Order,

    /// Next order in the price-level queue (newer), slab key
    pub next: Option<usize>,

    /// Previous order in the price-level queue (older), slab key
    pub prev: Option<usize>,
}

impl OrderNode {
    /// Create a new order node (not yet linked)
    #[inline]
    pub fn new(order: Order) -> Self {
        Self {
            order,
            next: None,
            prev: None,
        }
    }

    /// Check if this node is unlinked (not part of any price level)
    #[inline]
    pub fn is_unlinked(&self) -> bool {
        self.next.is_none() && self.prev.is_none()
    }

    #[inline]
    pub fn token(&self) -> OrderToken {
        self.order.token
    }

    #[inline]
    pub fn price(&self) -> Price {
        self.order.price
    }

    #[inline]
    pub fn remaining(&self) -> Volume {
        self.order.remaining
    }

    /// Fill a portion of this order, returning the volume actually taken.
    #[inline]
    pub fn fill(&mut self, volume: Volume) -> Volume {
        self.order.fill(volume)
    }

    #[inline]
    pub fn is_filled(&self) -> bool {
        self.order.is_filled()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Side;

    #[test]
    fn test_order_node_new() {
        let order = Order::new(1, Side::Buy, 10, 5);
        let node = OrderNode::new(order.clone());

        assert_eq!(node.order, order);
        assert!(node.is_unlinked());
        assert_eq!(node.token(), 1);
        assert_eq!(node.price(), 10);
        assert_eq!(node.remaining(), 5);
    }

    #[test]
    fn test_order_node_fill() {
        let mut node = OrderNode::new(Order::new(1, Side::Sell, 10, 5));

        assert_eq!(node.fill(2), 2);
        assert_eq!(node.remaining(), 3);
        assert!(!node.is_filled());

        assert_eq!(node.fill(3), 3);
        assert!(node.is_filled());
    }

    #[test]
    fn test_order_node_linking() {
        let mut node = OrderNode::new(Order::new(1, Side::Buy, 10, 5));
        assert!(node.is_unlinked());

        node.next = Some(2);
        assert!(!node.is_unlinked());
        node.prev = Some(0);
        node.next = None;
        assert!(!node.is_unlinked());
    }
}
