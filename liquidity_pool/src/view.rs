//! Read-only accessors: `liquidity_node`, `liquidity_nodes`, `deposits`,
//! `redemptions`, `redemption_available` from the operation surface.

use alloy_primitives::Address;
use common_structs::Tick;

use crate::storage::Ledger;

/// Snapshot of one node's accounting, decoupled from the live `Node` so
/// callers can't reach into the ledger's internals through a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeView {
    pub tick: Tick,
    pub value: u128,
    pub shares: u128,
    pub available: u128,
    pub pending: u128,
    pub redemptions: u128,
}

/// Snapshot of a redemption ticket's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedemptionView {
    pub pending: u128,
    pub index: u64,
    pub target: u128,
    pub owed_shares: u128,
    pub owed_cash: u128,
}

impl Ledger {
    pub fn liquidity_node(&self, tick: Tick) -> Option<NodeView> {
        self.nodes.get(&tick.0).map(|n| NodeView {
            tick: n.tick,
            value: n.value,
            shares: n.shares,
            available: n.available,
            pending: n.pending,
            redemptions: n.redemptions,
        })
    }

    /// Ascending tick order, sentinel included.
    pub fn liquidity_nodes(&self) -> Vec<NodeView> {
        self.nodes_ascending()
            .map(|n| NodeView {
                tick: n.tick,
                value: n.value,
                shares: n.shares,
                available: n.available,
                pending: n.pending,
                redemptions: n.redemptions,
            })
            .collect()
    }

    pub fn deposits(&self, account: Address, tick: Tick) -> u128 {
        self.deposit_record(account, tick).map(|r| r.shares).unwrap_or(0)
    }

    pub fn redemptions(&self, account: Address, tick: Tick, redemption_id: u64) -> Option<RedemptionView> {
        self.ticket(account, tick, redemption_id).map(|t| RedemptionView {
            pending: t.pending,
            index: t.index,
            target: t.target,
            owed_shares: t.owed_shares,
            owed_cash: t.owed_cash,
        })
    }

    /// Currency a ticket could collect via `withdraw` right now, without
    /// mutating anything.
    pub fn redemption_available(&self, account: Address, tick: Tick, redemption_id: u64) -> u128 {
        self.ticket(account, tick, redemption_id).map(|t| t.owed_cash).unwrap_or(0)
    }
}
