//! Continuous book with midpoint-pegged hidden orders.
//!
//! Mechanically a continuous double auction, with one extra liquidity pool:
//! midpoint-pegged orders. A pegged order never joins the ladder. It rests
//! hidden in a side-specific FIFO queue and trades at the peg price derived
//! from the external quote feed.
//!
//! The limit price on a pegged order is an entry gate, not a resting price:
//! an order whose limit stops it from trading at the current peg (a pegged
//! sell limited above the peg, a pegged buy limited below it) neither
//! crosses nor rests. Once resting, a pegged order tracks the peg
//! unconditionally, including through moves past its limit.
//!
//! Crossing interleaves the contra ladder with the contra peg queue by
//! price; the ladder wins ties, so hidden interest never jumps ahead of
//! displayed interest at the same price. Executions always happen at the
//! resting order's price (ladder level or peg).
//!
//! When the peg moves, the side the move made more aggressive (peg down:
//! pegged sells, peg up: pegged buys) is replayed against the book and may
//! generate matches. The command speed bump lives in the session scheduler,
//! not here.

use std::collections::VecDeque;

use crate::error::BookError;
use crate::orderbook::{BookCore, CancelResult, EnterOutcome};
use crate::types::{BboSnapshot, Match, Order, OrderToken, Price, Side, Volume};

/// Speed-bump venue book: lit ladder plus hidden midpoint-pegged queues.
#[derive(Debug, Default)]
pub struct IexBook {
    core: BookCore,

    /// Current midpoint peg; `None` while the external quote is one-sided
    peg: Option<Price>,

    /// Hidden pegged orders in arrival order
    pegged_bids: VecDeque<Order>,
    pegged_asks: VecDeque<Order>,
}

impl IexBook {
    pub fn new() -> Self {
        Self {
            core: BookCore::new(),
            peg: None,
            pegged_bids: VecDeque::new(),
            pegged_asks: VecDeque::new(),
        }
    }

    #[inline]
    pub fn core(&self) -> &BookCore {
        &self.core
    }

    #[inline]
    pub fn peg_price(&self) -> Option<Price> {
        self.peg
    }

    /// Hidden resident volume on one side.
    pub fn pegged_interest(&self, side: Side) -> u64 {
        self.peg_queue(side)
            .iter()
            .map(|o| o.remaining as u64)
            .sum()
    }

    pub fn contains(&self, token: OrderToken) -> bool {
        self.core.contains(token)
            || self.pegged_bids.iter().any(|o| o.token == token)
            || self.pegged_asks.iter().any(|o| o.token == token)
    }

    /// Enter a limit order: cross first, rest the remainder (ladder for
    /// ordinary orders, hidden peg queue for pegged ones).
    ///
    /// A pegged order arriving while no peg is established fails with
    /// [`BookError::PegBeforePriceSet`] and leaves the book untouched. A
    /// pegged order whose limit blocks trading at the current peg neither
    /// crosses nor rests.
    pub fn enter(&mut self, order: Order) -> Result<EnterOutcome, BookError> {
        if self.contains(order.token) {
            return Err(BookError::DuplicateOrderToken(order.token));
        }

        let limit = if order.midpoint_peg {
            let peg = self
                .peg
                .ok_or(BookError::PegBeforePriceSet(order.token))?;
            let blocked = match order.side {
                Side::Buy => order.price < peg,
                Side::Sell => order.price > peg,
            };
            if blocked {
                return Ok(EnterOutcome {
                    matches: Vec::new(),
                    leftover: order.remaining,
                    rested: false,
                    bbo: None,
                });
            }
            peg
        } else {
            order.price
        };

        let (matches, leftover) = self.cross(order.token, order.side, limit, order.remaining);

        let mut rested = false;
        if leftover > 0 && order.time_in_force.rests() {
            let mut remainder = order;
            remainder.remaining = leftover;
            if remainder.midpoint_peg {
                self.peg_queue_mut(remainder.side).push_back(remainder);
            } else {
                self.core.insert_resting(remainder)?;
            }
            rested = true;
        }

        Ok(EnterOutcome {
            matches,
            leftover,
            rested,
            bbo: self.core.bbo_delta(),
        })
    }

    /// Cancel all or part of a resting order, ladder or pegged.
    pub fn cancel(
        &mut self,
        token: OrderToken,
        volume: Volume,
    ) -> Result<(CancelResult, Option<BboSnapshot>), BookError> {
        if self.core.contains(token) {
            let result = self.core.cancel(token, volume)?;
            return Ok((result, self.core.bbo_delta()));
        }

        for queue in [&mut self.pegged_bids, &mut self.pegged_asks] {
            if let Some(idx) = queue.iter().position(|o| o.token == token) {
                let resident = queue[idx].remaining;
                if volume == 0 {
                    queue.remove(idx);
                    return Ok((
                        CancelResult {
                            cancelled: resident,
                            resident: 0,
                        },
                        None,
                    ));
                }
                if volume >= resident {
                    return Err(BookError::OverCancelAttempt {
                        token,
                        requested: volume,
                        resident,
                    });
                }
                queue[idx].remaining = volume;
                return Ok((
                    CancelResult {
                        cancelled: resident - volume,
                        resident: volume,
                    },
                    None,
                ));
            }
        }

        Err(BookError::UnknownOrderToken(token))
    }

    /// Remove a resting order outright, ladder or pegged (replace path).
    pub fn remove(&mut self, token: OrderToken) -> Result<(Order, Option<BboSnapshot>), BookError> {
        if self.core.contains(token) {
            let order = self.core.remove(token)?;
            return Ok((order, self.core.bbo_delta()));
        }
        for queue in [&mut self.pegged_bids, &mut self.pegged_asks] {
            if let Some(idx) = queue.iter().position(|o| o.token == token) {
                let order = queue
                    .remove(idx)
                    .ok_or(BookError::InvariantViolation("peg queue index out of range"))?;
                return Ok((order, None));
            }
        }
        Err(BookError::UnknownOrderToken(token))
    }

    /// Apply a new midpoint peg (or clear it). The side the move made more
    /// aggressive is replayed against the book and may trade.
    pub fn update_peg_price(
        &mut self,
        new_peg: Option<Price>,
    ) -> Result<(Vec<Match>, Option<BboSnapshot>), BookError> {
        let old = self.peg;
        self.peg = new_peg;

        let Some(peg) = new_peg else {
            // One-sided external quote: pegged orders go inert
            return Ok((Vec::new(), None));
        };

        let mut matches = Vec::new();
        match old {
            // First peg of the session: both queues may newly cross
            None => {
                matches.extend(self.replay_pegged(Side::Sell));
                matches.extend(self.replay_pegged(Side::Buy));
            }
            Some(o) if peg < o => matches.extend(self.replay_pegged(Side::Sell)),
            Some(o) if peg > o => matches.extend(self.replay_pegged(Side::Buy)),
            Some(_) => {}
        }

        Ok((matches, self.core.bbo_delta()))
    }

    /// Replay one side's pegged orders as aggressors at the peg, FIFO. A
    /// resting pegged order follows the peg wherever it moved, so its own
    /// limit no longer constrains it.
    fn replay_pegged(&mut self, side: Side) -> Vec<Match> {
        let mut matches = Vec::new();
        let Some(peg) = self.peg else { return matches };

        loop {
            let Some((token, remaining)) = self
                .peg_queue(side)
                .front()
                .map(|o| (o.token, o.remaining))
            else {
                break;
            };

            let (step, leftover) = self.cross(token, side, peg, remaining);
            if step.is_empty() {
                // Every queued order trades at the same peg, so none behind
                // the head can cross either
                break;
            }
            matches.extend(step);

            let queue = self.peg_queue_mut(side);
            if leftover == 0 {
                queue.pop_front();
            } else if let Some(front) = queue.front_mut() {
                front.remaining = leftover;
            }
        }

        matches
    }

    /// Cross an aggressor against the contra ladder and contra peg queue,
    /// interleaved by price with the ladder winning ties. Pegged contra
    /// interest is priced at the peg.
    fn cross(
        &mut self,
        aggressor: OrderToken,
        side: Side,
        limit: Price,
        volume: Volume,
    ) -> (Vec<Match>, Volume) {
        let mut matches = Vec::new();
        let mut leftover = volume;

        while leftover > 0 {
            let ladder_price = self.core.crossing_price(side, limit);
            let peg_hit = self
                .peg
                .filter(|&peg| match side {
                    Side::Buy => peg <= limit,
                    Side::Sell => peg >= limit,
                })
                .filter(|_| !self.peg_queue(side.opposite()).is_empty());

            let take_ladder = match (ladder_price, peg_hit) {
                (None, None) => break,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (Some(lp), Some(peg)) => match side {
                    Side::Buy => lp <= peg,
                    Side::Sell => lp >= peg,
                },
            };

            if take_ladder {
                let (step, rest) = self.core.fill_best_level(aggressor, side, limit, leftover);
                if step.is_empty() {
                    break;
                }
                matches.extend(step);
                leftover = rest;
            } else if let Some(peg) = peg_hit {
                let queue = self.peg_queue_mut(side.opposite());
                let Some(front) = queue.front_mut() else { break };
                let take = leftover.min(front.remaining);
                let resting = front.token;
                front.remaining -= take;
                if front.remaining == 0 {
                    queue.pop_front();
                }
                matches.push(Match {
                    aggressor,
                    resting,
                    price: peg,
                    volume: take,
                });
                leftover -= take;
            }
        }

        (matches, leftover)
    }

    #[inline]
    fn peg_queue(&self, side: Side) -> &VecDeque<Order> {
        match side {
            Side::Buy => &self.pegged_bids,
            Side::Sell => &self.pegged_asks,
        }
    }

    #[inline]
    fn peg_queue_mut(&mut self, side: Side) -> &mut VecDeque<Order> {
        match side {
            Side::Buy => &mut self.pegged_bids,
            Side::Sell => &mut self.pegged_asks,
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
