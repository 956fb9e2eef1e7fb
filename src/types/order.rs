//! Order types for the matching core.
//!
//! ## Units
//!
//! Prices are integers in the smallest tradable increment; volumes are
//! integers in shares. Empty book sides are marked with the `MIN_BID` /
//! `MAX_ASK` sentinels so the crossing loops can compare prices without
//! unwrapping options.

use serde::{Deserialize, Serialize};

/// Opaque order token, supplied by the caller and unique per session.
pub type OrderToken = u64;

/// Price in the smallest tradable increment.
pub type Price = u32;

/// Volume in shares.
pub type Volume = u32;

/// Sentinel best bid when the bid side is empty.
pub const MIN_BID: Price = 0;

/// Sentinel best ask when the ask side is empty.
pub const MAX_ASK: Price = 0x7FFF_FFFF;

// ============================================================================
// Side enum
// ============================================================================

/// Order side: Buy or Sell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Buy order (bid) - wants to purchase the asset
    Buy,
    /// Sell order (ask) - wants to sell the asset
    Sell,
}

impl Side {
    /// Returns the opposite side
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    pub fn is_buy(self) -> bool {
        matches!(self, Side::Buy)
    }
}

// ============================================================================
// Display enum
// ============================================================================

/// Whether a resting order is visible in quote/market-data feeds.
///
/// Dark orders participate in matching exactly like lit orders but are
/// excluded from BBO snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Display {
    Lit,
    Dark,
}

impl Display {
    pub fn is_lit(self) -> bool {
        matches!(self, Display::Lit)
    }

    /// Decode the wire flag (`true` = displayed).
    pub fn from_flag(lit: bool) -> Self {
        if lit {
            Display::Lit
        } else {
            Display::Dark
        }
    }
}

// ============================================================================
// TimeInForce enum
// ============================================================================

/// How long a resting order remains eligible for matching.
///
/// Wire encoding: `0` = immediate-or-cancel, `1..=99997` = seconds until
/// auto-cancel, `99998`/`99999` = good for the whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeInForce {
    ImmediateOrCancel,
    Seconds(u32),
    Session,
}

impl TimeInForce {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => TimeInForce::ImmediateOrCancel,
            1..=99997 => TimeInForce::Seconds(raw),
            _ => TimeInForce::Session,
        }
    }

    pub fn to_raw(self) -> u32 {
        match self {
            TimeInForce::ImmediateOrCancel => 0,
            TimeInForce::Seconds(s) => s,
            TimeInForce::Session => 99999,
        }
    }

    /// Whether an unfilled remainder may rest on the book.
    pub fn rests(self) -> bool {
        !matches!(self, TimeInForce::ImmediateOrCancel)
    }

    /// Seconds until the resting order is auto-cancelled, if any.
    pub fn auto_cancel_seconds(self) -> Option<u32> {
        match self {
            TimeInForce::Seconds(s) => Some(s),
            _ => None,
        }
    }
}

// ============================================================================
// Order struct
// ============================================================================

/// A limit order resident in (or entering) a book.
///
/// The order is owned exclusively by the price-level queue (or peg queue) it
/// currently rests in; `remaining` is decremented in place by partial fills
/// and partial cancels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Caller-supplied unique token
    pub token: OrderToken,

    pub side: Side,

    /// Limit price; for midpoint-pegged orders this is the limit bound,
    /// not the resting price
    pub price: Price,

    /// Original entered volume
    pub volume: Volume,

    /// Remaining unexecuted volume
    pub remaining: Volume,

    /// Monotonic arrival counter, assigned by the book on entry (tie-break)
    pub arrival_seq: u64,

    pub display: Display,

    pub midpoint_peg: bool,

    pub time_in_force: TimeInForce,

    /// Batch window the order joined in (FBA only, 0 elsewhere)
    pub batch: u64,
}

impl Order {
    pub fn new(token: OrderToken, side: Side, price: Price, volume: Volume) -> Self {
        Self {
            token,
            side,
            price,
            volume,
            remaining: volume,
            arrival_seq: 0,
            display: Display::Lit,
            midpoint_peg: false,
            time_in_force: TimeInForce::Session,
            batch: 0,
        }
    }

    pub fn with_display(mut self, display: Display) -> Self {
        self.display = display;
        self
    }

    pub fn with_peg(mut self, midpoint_peg: bool) -> Self {
        self.midpoint_peg = midpoint_peg;
        self
    }

    pub fn with_time_in_force(mut self, tif: TimeInForce) -> Self {
        self.time_in_force = tif;
        self
    }

    /// Check if the order is fully filled
    pub fn is_filled(&self) -> bool {
        self.remaining == 0
    }

    pub fn filled_volume(&self) -> Volume {
        self.volume.saturating_sub(self.remaining)
    }

    /// Fill a portion of this order, returning the volume actually taken.
    pub fn fill(&mut self, volume: Volume) -> Volume {
        let taken = volume.min(self.remaining);
        self.remaining -= taken;
        taken
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
