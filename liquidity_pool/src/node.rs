//! A single liquidity node: the live ledger record for one tick.
//!
//! The teacher keeps one node per supported asset (a single `PoolParams` +
//! running totals); here every tick gets its own node, so the node itself
//! carries the share/value/available/pending accounting the teacher split
//! across `liq_storage`/`StorageCache`.

use std::collections::VecDeque;

use alloy_primitives::U256;
use common_structs::Tick;

use crate::ticket::TicketKey;

/// `value / shares` below this fraction of the tick's own limit marks the
/// node impaired; a node with `value == 0 && shares > 0` is insolvent.
/// Matches the spec's "one-twentieth of tick limit" default at 500 bps.
pub const DEFAULT_IMPAIRMENT_THRESHOLD_BPS: u16 = 500;

#[derive(Debug, Clone)]
pub struct Node {
    pub tick: Tick,
    pub value: u128,
    pub shares: u128,
    pub available: u128,
    pub pending: u128,
    /// Shares queued for redemption that have not yet been claimed via
    /// `withdraw`. Decremented when a ticket's drained slice is collected,
    /// not merely when it is drained — this is what keeps a node alive
    /// ("outstanding redemption tickets can still resolve") even after its
    /// queue has fully drained in cash terms.
    pub redemptions: u128,
    /// FIFO order of tickets still owed a drain and/or a withdraw.
    pub(crate) queue: VecDeque<TicketKey>,
    /// Monotonically increasing count of shares ever enqueued on this node;
    /// a new ticket's `target` snapshots this value, giving a total order
    /// independent of later withdrawals.
    pub(crate) total_enqueued_shares: u128,
    /// Bumped whenever a drain pass exhausts `available` while the queue is
    /// still nonempty — a new "generation" of redemption starts once more
    /// cash arrives. Exposed on tickets purely for FIFO-order introspection.
    pub(crate) generation: u64,
}

impl Node {
    pub fn sentinel() -> Node {
        Node {
            tick: Tick::sentinel(),
            value: 0,
            shares: 0,
            available: 0,
            pending: 0,
            redemptions: 0,
            queue: VecDeque::new(),
            total_enqueued_shares: 0,
            generation: 0,
        }
    }

    pub fn new(tick: Tick) -> Node {
        Node {
            tick,
            value: 0,
            shares: 0,
            available: 0,
            pending: 0,
            redemptions: 0,
            queue: VecDeque::new(),
            total_enqueued_shares: 0,
            generation: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.shares == 0 && self.value == 0
    }

    /// GC predicate from spec §3: a node unlinks iff it holds no shares, no
    /// pending loan principal, and no outstanding redemption claims.
    pub fn is_collectible(&self) -> bool {
        self.shares == 0 && self.pending == 0 && self.redemptions == 0
    }

    /// value/shares < (threshold_bps/10000) * limit, i.e. the share price has
    /// fallen below a configured fraction of the tick's own limit (spec
    /// §4.D default: one-twentieth, 500 bps). `limit` and `shares` can each
    /// run up to 120/128 bits, so the cross-multiplied comparison is done
    /// widened in `U256` to stay exact.
    pub fn share_price_is_impaired(&self, threshold_bps: u16) -> bool {
        if self.shares == 0 {
            return false;
        }
        let limit = self.tick.limit();
        // value/shares < limit * threshold_bps/10000
        //   <=>  value * 10000 < shares * limit * threshold_bps
        let lhs = U256::from(self.value) * U256::from(10_000u128);
        let rhs = U256::from(self.shares) * U256::from(limit) * U256::from(threshold_bps);
        lhs < rhs
    }

    pub fn is_insolvent(&self) -> bool {
        self.value == 0 && self.shares > 0
    }

    pub fn is_inactive(&self, threshold_bps: u16) -> bool {
        self.is_insolvent() || self.share_price_is_impaired(threshold_bps)
    }
}
