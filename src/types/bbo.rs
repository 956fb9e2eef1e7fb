//! Best bid/offer snapshots.
//!
//! A snapshot is an immutable value recomputed after every structural change
//! to a book. The session broadcasts a quote update only when the new
//! snapshot differs from the previous one. Snapshots count **displayed**
//! interest only: dark and pegged orders match like any other liquidity but
//! never appear here.

use serde::{Deserialize, Serialize};

use crate::types::order::{Price, Volume, MAX_ASK, MIN_BID};

/// Top-of-book quote: best and next-best displayed price on each side, with
/// the displayed volume resting at the best.
///
/// Empty sides carry the `MIN_BID` / `MAX_ASK` sentinels so the snapshot is
/// always directly encodable for broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BboSnapshot {
    pub best_bid: Price,
    pub volume_at_best_bid: Volume,
    pub best_ask: Price,
    pub volume_at_best_ask: Volume,
    pub next_bid: Price,
    pub next_ask: Price,
}

impl BboSnapshot {
    /// Snapshot of a book with no displayed interest on either side.
    pub fn empty() -> Self {
        Self {
            best_bid: MIN_BID,
            volume_at_best_bid: 0,
            best_ask: MAX_ASK,
            volume_at_best_ask: 0,
            next_bid: MIN_BID,
            next_ask: MAX_ASK,
        }
    }
}

impl Default for BboSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_snapshot_sentinels() {
        let bbo = BboSnapshot::empty();
        assert_eq!(bbo.best_bid, MIN_BID);
        assert_eq!(bbo.best_ask, MAX_ASK);
        assert_eq!(bbo.next_bid, MIN_BID);
        assert_eq!(bbo.next_ask, MAX_ASK);
        assert_eq!(bbo.volume_at_best_bid, 0);
        assert_eq!(bbo.volume_at_best_ask, 0);
    }
}
