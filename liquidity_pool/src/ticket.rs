//! Deposit records and redemption tickets — the per-account state the
//! ledger tracks alongside the shared node.

use alloy_primitives::Address;
use common_structs::Tick;

pub type TicketKey = (Address, u128, u64);

/// Keyed by `(account, tick)`.
#[derive(Debug, Clone, Default)]
pub struct DepositRecord {
    pub shares: u128,
    /// Monotonically increasing counter of redemption tickets this account
    /// has opened against this tick.
    pub next_redemption_id: u64,
}

/// Keyed by `(account, tick, redemption_id)`.
#[derive(Debug, Clone)]
pub struct RedemptionTicket {
    pub account: Address,
    pub tick: Tick,
    pub redemption_id: u64,
    /// Shares of the original redemption not yet drained from the node.
    pub pending: u128,
    /// Generation of the node's redemption queue this ticket was opened
    /// in — see `Node::generation`.
    pub index: u64,
    /// Shares of queue precedence ahead of this ticket at creation time.
    pub target: u128,
    /// Shares already drained but not yet collected via `withdraw`.
    pub owed_shares: u128,
    /// Currency already earmarked for this ticket but not yet paid out.
    pub owed_cash: u128,
}

impl RedemptionTicket {
    pub fn is_fully_settled(&self) -> bool {
        self.pending == 0 && self.owed_shares == 0
    }
}
