//! Error taxonomy for the matching core.
//!
//! Most conditions here are recovered locally: the operation becomes a
//! logged no-op (unknown token, over-cancel, peg-before-price) or a boolean
//! failure (duplicate token). Only [`BookError::InvariantViolation`] is a
//! programming-contract breach; it aborts the single in-flight command and
//! leaves the book state from before the command authoritative.

use thiserror::Error;

use crate::types::{OrderToken, Volume};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookError {
    /// Cancel/replace/reduce referencing a token absent from the book or store
    #[error("unknown order token {0}")]
    UnknownOrderToken(OrderToken),

    /// Enter reusing a live token
    #[error("duplicate order token {0}")]
    DuplicateOrderToken(OrderToken),

    /// Requested cancel volume exceeds the resident volume
    #[error("over-cancel on token {token}: requested {requested}, resident {resident}")]
    OverCancelAttempt {
        token: OrderToken,
        requested: Volume,
        resident: Volume,
    },

    /// Pegged order submitted before any peg price was established
    #[error("pegged order {0} submitted with no peg price set")]
    PegBeforePriceSet(OrderToken),

    /// Programming-contract violation; aborts the in-flight command
    #[error("invariant violation: {0}")]
    InvariantViolation(&'static str),
}
