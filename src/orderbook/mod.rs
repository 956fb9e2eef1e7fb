//! Order book implementations.
//!
//! ## Layout
//!
//! - [`node`]: slab-resident order nodes with intrusive queue links
//! - [`level`]: FIFO price-level queues
//! - [`ladder`]: side-ordered price -> level maps
//! - [`book`]: [`BookCore`], the residency/fill engine shared by all three
//!   mechanisms
//! - [`cda`]: continuous double auction
//! - [`fba`]: frequent batch auction (uniform-price clearing on a timer)
//! - [`iex`]: continuous book with midpoint-pegged hidden orders

mod book;
mod cda;
mod fba;
mod iex;
mod ladder;
mod level;
mod node;

pub use book::{BookCore, CancelResult};
pub use cda::{CdaBook, EnterOutcome};
pub use fba::{BatchOutcome, FbaBook};
pub use iex::IexBook;
pub use ladder::Ladder;
pub use level::{LevelFill, PriceLevel};
pub use node::OrderNode;
