//! The ledger-side half of loan sourcing: the mutations a borrow/repay/
//! liquidate in `lending-pool` drives against one or more nodes. Quoting
//! and tick-list validation themselves are lending-pool concerns (component
//! E) since they also need the pool's rate/duration tables; this module
//! only exposes the node-level effects those operations apply once a quote
//! has been accepted.

use common_errors::Error;
use common_math as math;
use common_structs::Tick;

use crate::storage::Ledger;

/// One tick's contribution to a multi-tick loan draw, carrying both the
/// principal actually drawn (`used`, which leaves `available`) and the full
/// lender-due obligation attributed to this tick (`pending`, which includes
/// this tick's pro-rated share of interest). These are exactly the two
/// amounts a `NodeReceipt` records on the wire, since a `DrawAllocation` is
/// the in-memory twin of one.
#[derive(Debug, Clone, Copy)]
pub struct DrawAllocation {
    pub tick: Tick,
    pub used: u128,
    pub pending: u128,
}

impl Ledger {
    /// Moves `used` out of `available` and `pending` into the node's
    /// `pending` counter for each allocation, in the order given. The
    /// difference `pending - used` (the tick's share of unrealized
    /// interest) accrues to `value` immediately, so a depositor who enters
    /// after this borrow cannot skim the interest already earmarked for
    /// existing lenders. Atomic: the whole draw is rejected (no node
    /// mutated) if any single tick cannot cover its slice.
    pub fn apply_borrow_draw(&mut self, allocations: &[DrawAllocation]) -> Result<(), Error> {
        for a in allocations {
            let node = self.nodes.get(&a.tick.0).ok_or(Error::InvalidTick("tick does not exist"))?;
            if node.available < a.used {
                return Err(Error::InsufficientLiquidity);
            }
        }
        for a in allocations {
            let node = self.nodes.get_mut(&a.tick.0).expect("checked above");
            node.available = math::sub(node.available, a.used)?;
            node.pending = math::add(node.pending, a.pending)?;
            node.value = math::add(node.value, math::sub(a.pending, a.used)?)?;
        }
        Ok(())
    }

    /// Settles a repay or liquidation against the same allocations the loan
    /// was sourced from: each tick's `pending` slice clears in full, and
    /// the tick's share of the actual cash returned (`proceeds`, which may
    /// be less than `pending` on early repay or on a liquidation shortfall,
    /// or carry a surplus share) lands in `value` and `available`. A node
    /// driven to zero `value` while still holding shares becomes insolvent;
    /// callers observe this through `liquidity_node`. Drains that tick's
    /// redemption queue immediately afterward with the freshly arrived cash.
    pub fn apply_repay_settlement(
        &mut self,
        allocations: &[DrawAllocation],
        proceeds: &[u128],
        config: &common_structs::PoolConfig,
    ) -> Result<(), Error> {
        if allocations.len() != proceeds.len() {
            return Err(Error::InvalidParameters("allocations/proceeds length mismatch"));
        }
        for a in allocations {
            let node = self.nodes.get(&a.tick.0).ok_or(Error::InvalidTick("tick does not exist"))?;
            if node.pending < a.pending {
                return Err(Error::InvalidParameters("settlement exceeds tick's pending obligation"));
            }
        }
        for (a, &proceeds_for_tick) in allocations.iter().zip(proceeds.iter()) {
            let node = self.nodes.get_mut(&a.tick.0).expect("checked above");
            node.pending = math::sub(node.pending, a.pending)?;
            let delta = proceeds_for_tick as i128 - a.pending as i128;
            if delta >= 0 {
                node.value = math::add(node.value, delta as u128)?;
            } else {
                node.value = math::sub(node.value, (-delta) as u128)?;
            }
            node.available = math::add(node.available, proceeds_for_tick)?;

            let node = self.nodes.get(&a.tick.0).expect("checked above");
            if node.is_insolvent() {
                common_events::tick_insolvent(a.tick, node.shares);
            } else if node.share_price_is_impaired(config.impairment_threshold_bps) {
                common_events::tick_impaired(a.tick, node.value, node.shares);
            }

            self.drain_tick(a.tick, config)?;
            self.try_gc(a.tick);
        }
        Ok(())
    }

    /// Settles a collateral liquidation. Shares the repay path's settlement
    /// mechanics exactly: both ultimately clear a tick's `pending` against
    /// whatever cash landed for it, the only difference being how the
    /// caller computed `proceeds` upstream (pro-rated loss vs. surplus
    /// split vs. full recovery).
    pub fn apply_liquidation_settlement(
        &mut self,
        allocations: &[DrawAllocation],
        proceeds: &[u128],
        config: &common_structs::PoolConfig,
    ) -> Result<(), Error> {
        self.apply_repay_settlement(allocations, proceeds, config)
    }
}
