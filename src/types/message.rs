//! Core-facing commands and core-emitted events.
//!
//! These are the boundary contract with the external codec/dispatcher: the
//! transport decodes its wire format into [`OrderCommand`] values and encodes
//! [`EngineEvent`] values back out. The core never sees raw frames.

use serde::{Deserialize, Serialize};

use crate::types::bbo::BboSnapshot;
use crate::types::order::{OrderToken, Price, Side, Volume};

// ============================================================================
// Commands (inbound)
// ============================================================================

/// Enter a new limit order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnterOrder {
    pub token: OrderToken,
    pub side: Side,
    pub price: Price,
    pub volume: Volume,
    /// Raw time-in-force encoding (see [`crate::types::TimeInForce`])
    pub time_in_force: u32,
    /// `true` = lit (displayed), `false` = dark
    pub display: bool,
    pub midpoint_peg: bool,
}

/// Cancel all or part of a resting order. `volume` is the desired volume to
/// remain on the book: `0` cancels fully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrder {
    pub token: OrderToken,
    pub volume: Volume,
}

/// Cancel an existing order and re-enter its liable remainder under a new
/// token. Side and peg status are inherited from the original order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceOrder {
    pub existing_token: OrderToken,
    pub replacement_token: OrderToken,
    pub price: Price,
    pub volume: Volume,
    pub time_in_force: u32,
    pub display: bool,
}

/// External NBBO quote change (IEX only). Drives the midpoint peg price:
/// `(best_bid + best_offer) / 2`, or no peg when either side carries its
/// sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalFeedChange {
    pub best_bid: Price,
    pub best_offer: Price,
}

/// A decoded command admitted to the matching session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderCommand {
    Enter(EnterOrder),
    Cancel(CancelOrder),
    Replace(ReplaceOrder),
    FeedChange(ExternalFeedChange),
    /// Periodic FBA clearing tick, armed internally by the scheduler
    BatchTick,
}

// ============================================================================
// Matches
// ============================================================================

/// One crossed counterparty pair, generated strictly at crossing time.
///
/// `price` is always the resting side's price: the level price for ladder
/// orders, the peg for pegged orders, or the clearing price in a batch
/// auction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub aggressor: OrderToken,
    pub resting: OrderToken,
    pub price: Price,
    pub volume: Volume,
}

// ============================================================================
// Events (outbound)
// ============================================================================

/// Events assembled by the matching session for the external codec.
///
/// `timestamp` fields are session-relative nanoseconds, captured once per
/// applied command, so every event produced by one command shares a stamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineEvent {
    Accepted {
        token: OrderToken,
        side: Side,
        price: Price,
        volume: Volume,
        time_in_force: u32,
        display: bool,
        midpoint_peg: bool,
        order_reference_number: u64,
        timestamp: u64,
    },
    /// One per matched counterparty: each match produces two of these,
    /// sharing a match number.
    Executed {
        token: OrderToken,
        executed_volume: Volume,
        execution_price: Price,
        match_number: u64,
        timestamp: u64,
    },
    Cancelled {
        token: OrderToken,
        cancelled_volume: Volume,
        timestamp: u64,
    },
    Replaced {
        replacement_token: OrderToken,
        previous_token: OrderToken,
        side: Side,
        price: Price,
        volume: Volume,
        time_in_force: u32,
        display: bool,
        midpoint_peg: bool,
        order_reference_number: u64,
        timestamp: u64,
    },
    /// Broadcast whenever a book's BBO snapshot changes.
    BestQuoteUpdate { bbo: BboSnapshot, timestamp: u64 },
    /// Broadcast once per FBA batch tick, trades or not.
    PostBatch {
        clearing_price: Option<Price>,
        transacted_volume: u64,
        best_bid: Price,
        best_ask: Price,
        next_bid: Price,
        next_ask: Price,
        timestamp: u64,
    },
}

impl EngineEvent {
    /// Token the event refers to, if it is order-scoped.
    pub fn token(&self) -> Option<OrderToken> {
        match self {
            EngineEvent::Accepted { token, .. }
            | EngineEvent::Executed { token, .. }
            | EngineEvent::Cancelled { token, .. } => Some(*token),
            EngineEvent::Replaced {
                replacement_token, ..
            } => Some(*replacement_token),
            EngineEvent::BestQuoteUpdate { .. } | EngineEvent::PostBatch { .. } => None,
        }
    }
}
