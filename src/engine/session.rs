//! Matching session: command admission, sequencing, and event assembly.
//!
//! The session owns one mechanism book, the order store, and the deferred
//! command scheduler. It is single-threaded and driven by a caller-supplied
//! virtual clock:
//!
//! - [`MatchingSession::submit`] admits a decoded command at a given
//!   nanosecond time; speed-bumped commands are parked, everything else
//!   applies immediately.
//! - [`MatchingSession::advance_to`] replays parked commands (delayed
//!   orders, timed auto-cancels, batch ticks) up to a deadline.
//!
//! Every applied command is stamped once; all events it produces share that
//! stamp. Order reference numbers are odd (1, 3, 5, ...) and match numbers
//! count up from zero, both session-scoped.

use tracing::{debug, warn};

use crate::config::{Mechanism, VenueConfig};
use crate::engine::scheduler::{next_aligned_tick, Scheduler};
use crate::engine::store::OrderStore;
use crate::error::BookError;
use crate::orderbook::{
    BookCore, CancelResult, CdaBook, EnterOutcome, FbaBook, IexBook,
};
use crate::types::{
    BboSnapshot, CancelOrder, Display, EngineEvent, EnterOrder, ExternalFeedChange, Match, Order,
    OrderCommand, OrderToken, ReplaceOrder, TimeInForce, Volume, MAX_ASK, MIN_BID,
};

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// The mechanism book a session runs. Closed set: adding a mechanism is a
/// code change, not a trait implementation.
#[derive(Debug)]
pub enum Book {
    Cda(CdaBook),
    Fba(FbaBook),
    Iex(IexBook),
}

impl Book {
    pub fn core(&self) -> &BookCore {
        match self {
            Book::Cda(book) => book.core(),
            Book::Fba(book) => book.core(),
            Book::Iex(book) => book.core(),
        }
    }

    /// Whether a token is resident anywhere in the book, hidden pools
    /// included.
    pub fn contains(&self, token: OrderToken) -> bool {
        match self {
            Book::Cda(book) => book.core().contains(token),
            Book::Fba(book) => book.core().contains(token),
            Book::Iex(book) => book.contains(token),
        }
    }

    fn enter(&mut self, order: Order) -> Result<EnterOutcome, BookError> {
        match self {
            Book::Cda(book) => book.enter(order),
            Book::Iex(book) => book.enter(order),
            Book::Fba(book) => {
                // Batch entry never crosses; the whole order rests
                let bbo = book.enter(order)?;
                Ok(EnterOutcome {
                    matches: Vec::new(),
                    leftover: 0,
                    rested: true,
                    bbo,
                })
            }
        }
    }

    fn cancel(
        &mut self,
        token: OrderToken,
        volume: Volume,
    ) -> Result<(CancelResult, Option<BboSnapshot>), BookError> {
        match self {
            Book::Cda(book) => book.cancel(token, volume),
            Book::Fba(book) => book.cancel(token, volume),
            Book::Iex(book) => book.cancel(token, volume),
        }
    }

    fn remove(&mut self, token: OrderToken) -> Result<(Order, Option<BboSnapshot>), BookError> {
        match self {
            Book::Cda(book) => book.remove(token),
            Book::Fba(book) => book.remove(token),
            Book::Iex(book) => book.remove(token),
        }
    }
}

/// One venue: book + store + scheduler behind a virtual clock.
#[derive(Debug)]
pub struct MatchingSession {
    book: Book,
    store: OrderStore,
    scheduler: Scheduler,

    /// Order-path delay in nanoseconds; zero on venues without a speed bump
    speed_bump: u64,

    /// Batch tick interval in nanoseconds; zero on continuous venues
    batch_interval: u64,

    /// Next order reference number, always odd
    next_reference: u64,

    /// Next match number
    next_match: u64,

    /// Session clock, nanoseconds
    now: u64,
}

impl MatchingSession {
    pub fn new(config: &VenueConfig) -> Self {
        let book = match config.mechanism {
            Mechanism::Cda => Book::Cda(CdaBook::new()),
            Mechanism::Fba => Book::Fba(FbaBook::new(config.rng_seed)),
            Mechanism::Iex => Book::Iex(IexBook::new()),
        };
        let speed_bump = match config.mechanism {
            Mechanism::Iex => config.speed_bump_nanos(),
            _ => 0,
        };
        let batch_interval = match config.mechanism {
            Mechanism::Fba => config.batch_interval_nanos(),
            _ => 0,
        };

        let mut session = Self {
            book,
            store: OrderStore::new(),
            scheduler: Scheduler::new(),
            speed_bump,
            batch_interval,
            next_reference: 1,
            next_match: 0,
            now: 0,
        };
        session.arm_batch_tick(0);
        session
    }

    #[inline]
    pub fn now(&self) -> u64 {
        self.now
    }

    #[inline]
    pub fn book(&self) -> &Book {
        &self.book
    }

    #[inline]
    pub fn store(&self) -> &OrderStore {
        &self.store
    }

    /// Admit a command at session time `now` (nanoseconds, non-decreasing).
    ///
    /// Catches the session up to `now` first, so anything already due
    /// applies before the new command. Returns every event produced.
    pub fn submit(&mut self, command: OrderCommand, now: u64) -> Vec<EngineEvent> {
        let now = now.max(self.now);
        let mut events = self.advance_to(now);

        let bumped = matches!(self.book, Book::Iex(_))
            && matches!(
                command,
                OrderCommand::Enter(_) | OrderCommand::Cancel(_) | OrderCommand::Replace(_)
            );

        if bumped {
            self.scheduler.push(now + self.speed_bump, command);
        } else {
            events.extend(self.apply(command, now));
        }
        events
    }

    /// Replay everything due at or before `deadline`, in effective-time
    /// order, then move the clock to `deadline`.
    pub fn advance_to(&mut self, deadline: u64) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        while let Some(scheduled) = self.scheduler.pop_due(deadline) {
            self.now = scheduled.apply_at.max(self.now);
            let at = self.now;
            events.extend(self.apply(scheduled.command, at));
        }
        self.now = deadline.max(self.now);
        events
    }

    fn apply(&mut self, command: OrderCommand, at: u64) -> Vec<EngineEvent> {
        let events = match command {
            OrderCommand::Enter(cmd) => self.apply_enter(cmd, at),
            OrderCommand::Cancel(cmd) => self.apply_cancel(cmd, at),
            OrderCommand::Replace(cmd) => self.apply_replace(cmd, at),
            OrderCommand::FeedChange(cmd) => self.apply_feed_change(cmd, at),
            OrderCommand::BatchTick => self.apply_batch_tick(at),
        };

        for event in &events {
            self.store.record_event(event);
            if let EngineEvent::Executed {
                token,
                executed_volume,
                ..
            } = event
            {
                self.store.execute_quantity(*token, *executed_volume);
            }
        }
        events
    }

    fn apply_enter(&mut self, cmd: EnterOrder, at: u64) -> Vec<EngineEvent> {
        let tif = TimeInForce::from_raw(cmd.time_in_force);
        let order = Order::new(cmd.token, cmd.side, cmd.price, cmd.volume)
            .with_display(Display::from_flag(cmd.display))
            .with_peg(cmd.midpoint_peg)
            .with_time_in_force(tif);

        if !self.store.store_order(&order) {
            warn!(token = cmd.token, "duplicate order token, entry ignored");
            return Vec::new();
        }

        // A batch venue has no continuous crossing, so an immediate-or-cancel
        // order can never execute: accept it and cancel it outright.
        if matches!(self.book, Book::Fba(_)) && !tif.rests() {
            let mut events = vec![self.accepted(&order, at)];
            events.push(EngineEvent::Cancelled {
                token: order.token,
                cancelled_volume: order.volume,
                timestamp: at,
            });
            return events;
        }

        let outcome = match self.book.enter(order.clone()) {
            Ok(outcome) => outcome,
            Err(BookError::PegBeforePriceSet(token)) => {
                warn!(token, "pegged order arrived with no peg price, dropped");
                return Vec::new();
            }
            Err(err) => {
                warn!(%err, token = cmd.token, "order entry rejected");
                return Vec::new();
            }
        };

        let mut events = vec![self.accepted(&order, at)];
        for m in outcome.matches {
            self.match_events(m, at, &mut events);
        }
        if outcome.leftover > 0 && !outcome.rested {
            events.push(EngineEvent::Cancelled {
                token: order.token,
                cancelled_volume: outcome.leftover,
                timestamp: at,
            });
        }
        if let Some(bbo) = outcome.bbo {
            events.push(EngineEvent::BestQuoteUpdate { bbo, timestamp: at });
        }

        if outcome.rested {
            self.arm_auto_cancel(order.token, tif, at);
        }
        events
    }

    fn apply_cancel(&mut self, cmd: CancelOrder, at: u64) -> Vec<EngineEvent> {
        match self.book.cancel(cmd.token, cmd.volume) {
            Ok((result, bbo)) => {
                let mut events = vec![EngineEvent::Cancelled {
                    token: cmd.token,
                    cancelled_volume: result.cancelled,
                    timestamp: at,
                }];
                if let Some(bbo) = bbo {
                    events.push(EngineEvent::BestQuoteUpdate { bbo, timestamp: at });
                }
                events
            }
            Err(BookError::UnknownOrderToken(token)) => {
                debug!(token, "no order in the book to cancel, cancel ignored");
                Vec::new()
            }
            Err(BookError::OverCancelAttempt {
                token,
                requested,
                resident,
            }) => {
                warn!(
                    token,
                    requested, resident, "cancel volume at or above resident volume, ignored"
                );
                Vec::new()
            }
            Err(err) => {
                warn!(%err, token = cmd.token, "cancel rejected");
                Vec::new()
            }
        }
    }

    fn apply_replace(&mut self, cmd: ReplaceOrder, at: u64) -> Vec<EngineEvent> {
        let Some(stored) = self.store.get(cmd.existing_token) else {
            debug!(
                token = cmd.existing_token,
                "existing token unknown, replace ignored"
            );
            return Vec::new();
        };
        let (side, original_volume, midpoint_peg) =
            (stored.side, stored.volume, stored.midpoint_peg);

        if self.store.contains(cmd.replacement_token) {
            debug!(
                token = cmd.replacement_token,
                "replacement token already used, replace ignored"
            );
            return Vec::new();
        }

        // Fully cancel the existing order off the book
        let (removed, bbo_post_cancel) = match self.book.remove(cmd.existing_token) {
            Ok(removed) => removed,
            Err(BookError::UnknownOrderToken(token)) => {
                debug!(token, "existing order no longer on the book, replace ignored");
                return Vec::new();
            }
            Err(err) => {
                warn!(%err, token = cmd.existing_token, "replace rejected");
                return Vec::new();
            }
        };

        // The replacement is liable only for what was still cancellable,
        // adjusted by the requested size change against the original terms.
        let cancelled = removed.remaining;
        let diff = cmd.volume as i64 - original_volume as i64;
        let liable = (cancelled as i64 + diff).max(0) as Volume;

        if liable == 0 {
            debug!(
                token = cmd.existing_token,
                "no liable volume remains, nothing re-entered"
            );
            return match bbo_post_cancel {
                Some(bbo) => vec![EngineEvent::BestQuoteUpdate { bbo, timestamp: at }],
                None => Vec::new(),
            };
        }

        let tif = TimeInForce::from_raw(cmd.time_in_force);
        let order = Order::new(cmd.replacement_token, side, cmd.price, liable)
            .with_display(Display::from_flag(cmd.display))
            .with_peg(midpoint_peg)
            .with_time_in_force(tif);
        self.store.store_order(&order);

        let outcome = if matches!(self.book, Book::Fba(_)) && !tif.rests() {
            EnterOutcome {
                matches: Vec::new(),
                leftover: liable,
                rested: false,
                bbo: None,
            }
        } else {
            match self.book.enter(order.clone()) {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(%err, token = cmd.replacement_token, "replacement not entered");
                    EnterOutcome {
                        matches: Vec::new(),
                        leftover: liable,
                        rested: false,
                        bbo: None,
                    }
                }
            }
        };

        let mut events = vec![EngineEvent::Replaced {
            replacement_token: cmd.replacement_token,
            previous_token: cmd.existing_token,
            side,
            price: cmd.price,
            volume: liable,
            time_in_force: cmd.time_in_force,
            display: cmd.display,
            midpoint_peg,
            order_reference_number: self.next_reference(),
            timestamp: at,
        }];
        for m in outcome.matches {
            self.match_events(m, at, &mut events);
        }
        if outcome.leftover > 0 && !outcome.rested {
            events.push(EngineEvent::Cancelled {
                token: cmd.replacement_token,
                cancelled_volume: outcome.leftover,
                timestamp: at,
            });
        }
        match (outcome.bbo, bbo_post_cancel) {
            (Some(bbo), _) | (None, Some(bbo)) => {
                events.push(EngineEvent::BestQuoteUpdate { bbo, timestamp: at });
            }
            (None, None) => {}
        }

        if outcome.rested {
            self.arm_auto_cancel(cmd.replacement_token, tif, at);
        }
        events
    }

    fn apply_feed_change(&mut self, cmd: ExternalFeedChange, at: u64) -> Vec<EngineEvent> {
        let Book::Iex(book) = &mut self.book else {
            debug!("external feed change on a venue without pegs, ignored");
            return Vec::new();
        };

        // Midpoint is only defined while both sides of the external quote
        // are real; a sentinel on either side clears the peg.
        let peg = if cmd.best_bid == MIN_BID || cmd.best_offer == MAX_ASK {
            None
        } else {
            Some((cmd.best_bid + cmd.best_offer) / 2)
        };
        debug!(?peg, "external feed change");

        let result = book.update_peg_price(peg);
        let (matches, bbo) = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(%err, "feed change rejected");
                return Vec::new();
            }
        };

        let mut events = Vec::new();
        for m in matches {
            self.match_events(m, at, &mut events);
        }
        if let Some(bbo) = bbo {
            events.push(EngineEvent::BestQuoteUpdate { bbo, timestamp: at });
        }
        events
    }

    fn apply_batch_tick(&mut self, at: u64) -> Vec<EngineEvent> {
        let Book::Fba(book) = &mut self.book else {
            return Vec::new();
        };

        let result = book.batch_process();
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(%err, "batch clear aborted");
                self.arm_batch_tick(at);
                return Vec::new();
            }
        };
        debug!(
            clearing = ?outcome.clearing_price,
            volume = outcome.transacted_volume,
            "batch cleared"
        );

        let mut events = Vec::new();
        for m in outcome.matches {
            self.match_events(m, at, &mut events);
        }
        if let Some(bbo) = outcome.bbo_delta {
            events.push(EngineEvent::BestQuoteUpdate { bbo, timestamp: at });
        }
        events.push(EngineEvent::PostBatch {
            clearing_price: outcome.clearing_price,
            transacted_volume: outcome.transacted_volume,
            best_bid: outcome.bbo.best_bid,
            best_ask: outcome.bbo.best_ask,
            next_bid: outcome.bbo.next_bid,
            next_ask: outcome.bbo.next_ask,
            timestamp: at,
        });

        self.arm_batch_tick(at);
        events
    }

    /// Two `Executed` events per match, one per counterparty, sharing a
    /// match number.
    fn match_events(&mut self, m: Match, at: u64, events: &mut Vec<EngineEvent>) {
        let match_number = self.next_match;
        self.next_match += 1;
        for token in [m.aggressor, m.resting] {
            events.push(EngineEvent::Executed {
                token,
                executed_volume: m.volume,
                execution_price: m.price,
                match_number,
                timestamp: at,
            });
        }
    }

    fn accepted(&mut self, order: &Order, at: u64) -> EngineEvent {
        EngineEvent::Accepted {
            token: order.token,
            side: order.side,
            price: order.price,
            volume: order.volume,
            time_in_force: order.time_in_force.to_raw(),
            display: order.display.is_lit(),
            midpoint_peg: order.midpoint_peg,
            order_reference_number: self.next_reference(),
            timestamp: at,
        }
    }

    fn next_reference(&mut self) -> u64 {
        let reference = self.next_reference;
        self.next_reference += 2;
        reference
    }

    fn arm_auto_cancel(&mut self, token: OrderToken, tif: TimeInForce, at: u64) {
        if let Some(seconds) = tif.auto_cancel_seconds() {
            self.scheduler.push(
                at + seconds as u64 * NANOS_PER_SEC,
                OrderCommand::Cancel(CancelOrder { token, volume: 0 }),
            );
        }
    }

    fn arm_batch_tick(&mut self, now: u64) {
        if self.batch_interval > 0 {
            self.scheduler
                .push(next_aligned_tick(now, self.batch_interval), OrderCommand::BatchTick);
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
