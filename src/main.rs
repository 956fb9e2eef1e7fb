//! matchcore - Binary Entry Point
//!
//! Runs a short scripted trading session against the configured venue and
//! prints every engine event as a JSON line. Useful for eyeballing mechanism
//! behavior without wiring up a transport.

use std::env;
use std::path::Path;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use matchcore::{
    CancelOrder, EngineEvent, EnterOrder, ExternalFeedChange, MatchingSession, Mechanism,
    OrderCommand, Side, VenueConfig,
};

fn print_events(events: &[EngineEvent]) {
    for event in events {
        match serde_json::to_string(event) {
            Ok(line) => println!("{line}"),
            Err(err) => eprintln!("failed to encode event: {err}"),
        }
    }
}

/// A small script exercising entry, crossing, pegging, and cancellation.
/// Times are session-relative milliseconds.
fn script(mechanism: Mechanism) -> Vec<(u64, OrderCommand)> {
    let enter = |token, side, price, volume| {
        OrderCommand::Enter(EnterOrder {
            token,
            side,
            price,
            volume,
            time_in_force: 99999,
            display: true,
            midpoint_peg: false,
        })
    };

    let mut commands = vec![
        (0, enter(1, Side::Buy, 10, 2)),
        (5, enter(2, Side::Buy, 11, 3)),
        (10, enter(3, Side::Sell, 8, 10)),
        (20, enter(4, Side::Buy, 9, 4)),
        (30, OrderCommand::Cancel(CancelOrder { token: 4, volume: 1 })),
    ];

    if mechanism == Mechanism::Iex {
        commands.insert(
            0,
            (
                0,
                OrderCommand::FeedChange(ExternalFeedChange {
                    best_bid: 8,
                    best_offer: 12,
                }),
            ),
        );
        commands.push((
            40,
            OrderCommand::Enter(EnterOrder {
                token: 5,
                side: Side::Buy,
                price: 11,
                volume: 2,
                time_in_force: 99999,
                display: false,
                midpoint_peg: true,
            }),
        ));
    }

    commands
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = match env::args().nth(1) {
        Some(path) => VenueConfig::load(Path::new(&path))?,
        None => VenueConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_filter.clone())),
        )
        .init();

    tracing::info!(mechanism = ?config.mechanism, "starting session");
    let mut session = MatchingSession::new(&config);

    for (at_ms, command) in script(config.mechanism) {
        let events = session.submit(command, at_ms * 1_000_000);
        print_events(&events);
    }

    // Run the clock out far enough to cover speed bumps and a few batch
    // ticks, so every deferred command lands.
    let horizon = 5 * config.batch_interval_nanos().max(1_000_000_000);
    let events = session.advance_to(horizon);
    print_events(&events);

    tracing::info!(
        orders = session.store().len(),
        resting = session.book().core().order_count(),
        "session complete"
    );
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
