//! End-to-end session tests across all three mechanisms.
//!
//! Everything here drives a [`MatchingSession`] through its public
//! command/event boundary, the way an external codec would, and asserts on
//! the emitted event stream.

use matchcore::{
    CancelOrder, EngineEvent, EnterOrder, ExternalFeedChange, MatchingSession, Mechanism,
    OrderCommand, ReplaceOrder, Side, VenueConfig, MAX_ASK, MIN_BID,
};

const MS: u64 = 1_000_000;
const SEC: u64 = 1_000_000_000;

fn session(mechanism: Mechanism) -> MatchingSession {
    let config = VenueConfig {
        mechanism,
        batch_interval_ms: 100,
        rng_seed: 7,
        ..VenueConfig::default()
    };
    MatchingSession::new(&config)
}

fn enter(token: u64, side: Side, price: u32, volume: u32) -> OrderCommand {
    OrderCommand::Enter(EnterOrder {
        token,
        side,
        price,
        volume,
        time_in_force: 99999,
        display: true,
        midpoint_peg: false,
    })
}

fn enter_pegged(token: u64, side: Side, limit: u32, volume: u32) -> OrderCommand {
    OrderCommand::Enter(EnterOrder {
        token,
        side,
        price: limit,
        volume,
        time_in_force: 99999,
        display: false,
        midpoint_peg: true,
    })
}

fn feed(best_bid: u32, best_offer: u32) -> OrderCommand {
    OrderCommand::FeedChange(ExternalFeedChange {
        best_bid,
        best_offer,
    })
}

/// `(token, volume, price, match_number)` for every Executed in the stream.
fn executions(events: &[EngineEvent]) -> Vec<(u64, u32, u32, u64)> {
    events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::Executed {
                token,
                executed_volume,
                execution_price,
                match_number,
                ..
            } => Some((*token, *executed_volume, *execution_price, *match_number)),
            _ => None,
        })
        .collect()
}

// ============================================================================
// CDA
// ============================================================================

#[test]
fn cda_crosses_at_resting_prices_best_first() {
    let mut session = session(Mechanism::Cda);
    session.submit(enter(1, Side::Buy, 10, 2), 0);
    session.submit(enter(2, Side::Buy, 11, 3), MS);
    let events = session.submit(enter(3, Side::Sell, 8, 10), 2 * MS);

    // Two matches, aggressor and resting legs pairwise, priced at the
    // resting bids, best bid first
    assert_eq!(
        executions(&events),
        vec![(3, 3, 11, 0), (2, 3, 11, 0), (3, 2, 10, 1), (1, 2, 10, 1)]
    );

    // Leftover 5 rests at the sell limit
    let resting = session.book().core().order(3).expect("leftover rests");
    assert_eq!(resting.remaining, 5);
    assert_eq!(resting.price, 8);

    let bbo = session.book().core().bbo();
    assert_eq!(bbo.best_bid, MIN_BID);
    assert_eq!(bbo.best_ask, 8);
    assert_eq!(bbo.volume_at_best_ask, 5);
}

#[test]
fn cda_partial_cancel_then_over_cancel() {
    let mut session = session(Mechanism::Cda);
    session.submit(enter(1, Side::Buy, 10, 5), 0);

    // Reduce to 2 remaining
    let events = session.submit(
        OrderCommand::Cancel(CancelOrder { token: 1, volume: 2 }),
        MS,
    );
    assert!(matches!(
        events[0],
        EngineEvent::Cancelled {
            token: 1,
            cancelled_volume: 3,
            ..
        }
    ));

    // Asking to keep more than is resident cancels nothing
    let events = session.submit(
        OrderCommand::Cancel(CancelOrder { token: 1, volume: 4 }),
        2 * MS,
    );
    assert!(events.is_empty());
    assert_eq!(session.book().core().order(1).unwrap().remaining, 2);
}

#[test]
fn token_uniqueness_is_session_wide() {
    let mut session = session(Mechanism::Cda);
    session.submit(enter(1, Side::Buy, 10, 5), 0);
    session.submit(OrderCommand::Cancel(CancelOrder { token: 1, volume: 0 }), MS);

    // The token is gone from the book but stays burned for the session
    let events = session.submit(enter(1, Side::Buy, 12, 5), 2 * MS);
    assert!(events.is_empty());
    assert!(session.book().core().order(1).is_none());
}

#[test]
fn timed_order_auto_cancels() {
    let mut session = session(Mechanism::Cda);
    let events = session.submit(
        OrderCommand::Enter(EnterOrder {
            token: 1,
            side: Side::Buy,
            price: 10,
            volume: 5,
            time_in_force: 2,
            display: true,
            midpoint_peg: false,
        }),
        0,
    );
    assert!(matches!(events[0], EngineEvent::Accepted { .. }));

    // Still resting just before expiry
    let events = session.advance_to(2 * SEC - 1);
    assert!(events.is_empty());
    assert!(session.book().contains(1));

    let events = session.advance_to(3 * SEC);
    assert!(matches!(
        events[0],
        EngineEvent::Cancelled {
            token: 1,
            cancelled_volume: 5,
            timestamp,
            ..
        } if timestamp == 2 * SEC
    ));
    assert!(!session.book().contains(1));
}

#[test]
fn replace_applies_liable_volume_and_recrosses() {
    let mut session = session(Mechanism::Cda);
    session.submit(enter(1, Side::Buy, 10, 5), 0);
    // Partial fill: 2 of 5 execute
    session.submit(enter(2, Side::Sell, 10, 2), MS);
    session.submit(enter(3, Side::Sell, 12, 4), 2 * MS);

    // Replace: new volume 7 against original 5, remaining 3:
    // liable = 3 + (7 - 5) = 5, repriced to 12 where it crosses token 3
    let events = session.submit(
        OrderCommand::Replace(ReplaceOrder {
            existing_token: 1,
            replacement_token: 4,
            price: 12,
            volume: 7,
            time_in_force: 99999,
            display: true,
        }),
        3 * MS,
    );

    let EngineEvent::Replaced {
        replacement_token,
        previous_token,
        side,
        price,
        volume,
        ..
    } = &events[0]
    else {
        panic!("expected Replaced first, got {events:?}");
    };
    assert_eq!((*replacement_token, *previous_token), (4, 1));
    assert_eq!((*side, *price, *volume), (Side::Buy, 12, 5));

    assert_eq!(executions(&events), vec![(4, 4, 12, 1), (3, 4, 12, 1)]);
    assert_eq!(session.book().core().order(4).unwrap().remaining, 1);
    assert!(!session.book().contains(1));
}

#[test]
fn replace_of_unknown_or_dead_order_is_ignored() {
    let mut session = session(Mechanism::Cda);
    let events = session.submit(
        OrderCommand::Replace(ReplaceOrder {
            existing_token: 9,
            replacement_token: 10,
            price: 10,
            volume: 5,
            time_in_force: 99999,
            display: true,
        }),
        0,
    );
    assert!(events.is_empty());

    // Fully executed order: known to the store, gone from the book
    session.submit(enter(1, Side::Buy, 10, 2), MS);
    session.submit(enter(2, Side::Sell, 10, 2), 2 * MS);
    let events = session.submit(
        OrderCommand::Replace(ReplaceOrder {
            existing_token: 1,
            replacement_token: 3,
            price: 11,
            volume: 2,
            time_in_force: 99999,
            display: true,
        }),
        3 * MS,
    );
    assert!(events.is_empty());
}

// ============================================================================
// FBA
// ============================================================================

#[test]
fn fba_clears_everything_at_one_price() {
    let mut session = session(Mechanism::Fba);
    session.submit(enter(1, Side::Buy, 12, 3), 0);
    session.submit(enter(2, Side::Buy, 10, 2), MS);
    session.submit(enter(3, Side::Sell, 9, 4), 2 * MS);

    // Nothing crossed on entry
    assert!(session.book().core().order(1).is_some());
    assert!(session.book().core().order(3).is_some());

    let events = session.advance_to(100 * MS);
    for (_, _, price, _) in executions(&events) {
        assert_eq!(price, 10);
    }
    let total: u32 = executions(&events)
        .iter()
        .filter(|(token, ..)| *token == 3)
        .map(|(_, v, ..)| *v)
        .sum();
    assert_eq!(total, 4);

    let Some(EngineEvent::PostBatch {
        clearing_price,
        transacted_volume,
        timestamp,
        ..
    }) = events.last()
    else {
        panic!("expected PostBatch last, got {events:?}");
    };
    assert_eq!(*clearing_price, Some(10));
    assert_eq!(*transacted_volume, 4);
    assert_eq!(*timestamp, 100 * MS);
}

#[test]
fn fba_posts_empty_batches_on_aligned_ticks() {
    let mut session = session(Mechanism::Fba);
    let events = session.advance_to(350 * MS);

    let ticks: Vec<(Option<u32>, u64, u64)> = events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::PostBatch {
                clearing_price,
                transacted_volume,
                timestamp,
                ..
            } => Some((*clearing_price, *transacted_volume, *timestamp)),
            _ => None,
        })
        .collect();
    assert_eq!(
        ticks,
        vec![
            (None, 0, 100 * MS),
            (None, 0, 200 * MS),
            (None, 0, 300 * MS)
        ]
    );
}

#[test]
fn fba_uncrossed_interest_carries_to_later_batches() {
    let mut session = session(Mechanism::Fba);
    session.submit(enter(1, Side::Buy, 10, 5), 0);
    let events = session.advance_to(100 * MS);
    assert!(executions(&events).is_empty());

    // A crossing ask in the second batch trades against the carried bid
    session.submit(enter(2, Side::Sell, 10, 5), 150 * MS);
    let events = session.advance_to(200 * MS);
    assert_eq!(executions(&events).len(), 2);
    assert_eq!(executions(&events)[0].2, 10);
}

#[test]
fn fba_seeded_replay_is_identical() {
    let run = || {
        let mut session = session(Mechanism::Fba);
        let mut events = Vec::new();
        // Four same-priced bids in one batch, partially clearable
        for (i, token) in [1u64, 2, 3, 4].into_iter().enumerate() {
            events.extend(session.submit(enter(token, Side::Buy, 10, 1), i as u64 * MS));
        }
        events.extend(session.submit(enter(5, Side::Sell, 10, 2), 10 * MS));
        events.extend(session.advance_to(100 * MS));
        events
    };

    assert_eq!(run(), run());
}

// ============================================================================
// IEX
// ============================================================================

#[test]
fn iex_speed_bump_delays_orders_but_not_feed_changes() {
    let mut session = session(Mechanism::Iex);

    // Pegged order admitted while no peg exists yet; it applies 350us later
    session.submit(enter_pegged(1, Side::Buy, 11, 2), 0);

    // The feed change admitted afterwards applies immediately, so the peg
    // is established by the time the order clears the bump
    session.submit(feed(8, 10), 100_000);

    let events = session.advance_to(SEC);
    assert!(
        matches!(events[0], EngineEvent::Accepted { token: 1, .. }),
        "order should survive the bump: {events:?}"
    );
    assert!(session.book().contains(1));
}

#[test]
fn iex_pegged_order_trades_at_midpoint() {
    let mut session = session(Mechanism::Iex);
    session.submit(feed(8, 10), 0);
    session.submit(enter_pegged(1, Side::Buy, 11, 5), MS);
    session.advance_to(10 * MS);

    // Hidden: no displayed bid
    assert_eq!(session.book().core().bbo().best_bid, MIN_BID);

    let events = session.submit(enter(2, Side::Sell, 9, 2), 20 * MS);
    let events = [events, session.advance_to(SEC)].concat();
    assert_eq!(executions(&events), vec![(2, 2, 9, 0), (1, 2, 9, 0)]);
}

#[test]
fn iex_peg_rise_replays_resting_pegged_bids() {
    let mut session = session(Mechanism::Iex);
    session.submit(feed(6, 10), 0); // midpoint 8
    session.submit(enter_pegged(1, Side::Buy, 11, 2), MS);
    session.submit(enter(2, Side::Sell, 10, 2), 2 * MS);
    let events = session.advance_to(100 * MS);
    assert!(executions(&events).is_empty());

    // Midpoint moves to 10: the pegged bid reaches the resting ask and
    // trades at the ask's price
    let events = session.submit(feed(8, 12), 200 * MS);
    assert_eq!(executions(&events), vec![(1, 2, 10, 0), (2, 2, 10, 0)]);
    assert!(!session.book().contains(1));
}

#[test]
fn iex_peg_drop_past_a_pegged_sells_limit_still_crosses() {
    let mut session = session(Mechanism::Iex);
    session.submit(feed(10, 20), 0); // midpoint 15
    session.submit(enter_pegged(1, Side::Sell, 12, 2), MS);
    session.submit(enter(2, Side::Buy, 10, 2), 2 * MS);
    let events = session.advance_to(10 * MS);
    assert!(executions(&events).is_empty());

    // Midpoint falls to 9, below the pegged sell's own limit; the resting
    // order follows the peg and trades at the bid's price
    let events = session.submit(feed(8, 10), 20 * MS);
    assert_eq!(executions(&events), vec![(1, 2, 10, 0), (2, 2, 10, 0)]);
    assert!(!session.book().contains(1));
    assert!(!session.book().contains(2));
}

#[test]
fn iex_one_sided_feed_clears_the_peg() {
    let mut session = session(Mechanism::Iex);
    session.submit(feed(8, 10), 0);
    session.submit(enter_pegged(1, Side::Buy, 11, 2), MS);
    session.advance_to(10 * MS);

    // External quote loses its offer side: peg cleared, order inert
    session.submit(feed(8, MAX_ASK), 20 * MS);
    let events = session.submit(enter(2, Side::Sell, 1, 2), 30 * MS);
    let events = [events, session.advance_to(SEC)].concat();
    assert_eq!(executions(&events), vec![]);
    assert!(session.book().contains(1));
}

#[test]
fn iex_commands_interleave_by_effective_apply_time() {
    let mut session = session(Mechanism::Iex);
    session.submit(feed(8, 12), 0); // midpoint 10

    // Cancel admitted before a crossing sell, both bumped: they apply in
    // admission order, so the bid is gone before the sell arrives
    session.submit(enter(1, Side::Buy, 10, 5), 0);
    session.advance_to(10 * MS);
    session.submit(OrderCommand::Cancel(CancelOrder { token: 1, volume: 0 }), 20 * MS);
    let events = session.submit(enter(2, Side::Sell, 10, 5), 20 * MS + 1);
    let events = [events, session.advance_to(SEC)].concat();

    assert!(executions(&events).is_empty());
    assert_eq!(session.book().core().order(2).unwrap().remaining, 5);
}
