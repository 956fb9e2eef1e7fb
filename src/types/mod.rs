//! Core data types for the matching engine.
//!
//! ## Types
//!
//! - [`Order`]: a limit order resident in a book
//! - [`Side`], [`Display`], [`TimeInForce`]: order attributes
//! - [`Match`]: one crossed counterparty pair
//! - [`BboSnapshot`]: immutable top-of-book quote
//! - [`OrderCommand`] / [`EngineEvent`]: the boundary contract with the
//!   external codec

mod bbo;
mod message;
mod order;

pub use bbo::BboSnapshot;
pub use message::{
    CancelOrder, EngineEvent, EnterOrder, ExternalFeedChange, Match, OrderCommand, ReplaceOrder,
};
pub use order::{Display, Order, OrderToken, Price, Side, TimeInForce, Volume, MAX_ASK, MIN_BID};
