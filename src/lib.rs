//! # matchcore
//!
//! Simulated securities-exchange matching core with interchangeable market
//! mechanisms over a single instrument.
//!
//! ## Mechanisms
//!
//! - **CDA**: continuous double auction, immediate price-time crossing
//! - **FBA**: frequent batch auction, uniform-price clearing on an aligned
//!   timer with randomized intra-batch priority
//! - **IEX**: continuous book behind a speed bump, with hidden
//!   midpoint-pegged orders repriced from an external quote feed
//!
//! ## Design Principles
//!
//! 1. **Determinism**: a seeded session replays to an identical event stream
//! 2. **Virtual time**: the caller drives a nanosecond clock; delays, timed
//!    cancels, and batch ticks are scheduler entries, never wall-clock sleeps
//! 3. **Pre-allocated memory**: slab arena storage for O(1) order operations
//! 4. **Closed command set**: the boundary is one command enum in, one event
//!    enum out; wire codecs live outside this crate
//!
//! ## Quick start
//!
//! ```
//! use matchcore::{EngineEvent, EnterOrder, MatchingSession, OrderCommand, Side, VenueConfig};
//!
//! let mut session = MatchingSession::new(&VenueConfig::default());
//! let events = session.submit(
//!     OrderCommand::Enter(EnterOrder {
//!         token: 1,
//!         side: Side::Buy,
//!         price: 100,
//!         volume: 10,
//!         time_in_force: 99999,
//!         display: true,
//!         midpoint_peg: false,
//!     }),
//!     0,
//! );
//! assert!(matches!(events[0], EngineEvent::Accepted { .. }));
//! ```

// ============================================================================
// Module declarations
// ============================================================================

/// Venue configuration (mechanism, timing, seed)
pub mod config;

/// Session engine: command sequencing, order store, scheduler
pub mod engine;

/// Error taxonomy
pub mod error;

/// Order books: shared core plus the three mechanisms
pub mod orderbook;

/// Core data types and the command/event boundary contract
pub mod types;

// ============================================================================
// Re-exports for convenience
// ============================================================================

pub use config::{ConfigError, Mechanism, VenueConfig};
pub use engine::{Book, MatchingSession, OrderStore};
pub use error::BookError;
pub use orderbook::{BookCore, CdaBook, FbaBook, IexBook};
pub use types::{
    BboSnapshot, CancelOrder, EngineEvent, EnterOrder, ExternalFeedChange, Match, Order,
    OrderCommand, OrderToken, Price, ReplaceOrder, Side, TimeInForce, Volume, MAX_ASK, MIN_BID,
};
