//! `redeem`, `withdraw`, `rebalance`, and the internal FIFO drain pass
//! (spec §4.D) that services queued redemption tickets as cash becomes
//! `available` on a node.

use alloy_primitives::Address;
use common_errors::Error;
use common_math as math;
use common_structs::{PoolConfig, Tick};

use crate::ticket::RedemptionTicket;
use crate::storage::Ledger;

impl Ledger {
    /// Queues `shares_in` of `account`'s position at `tick` for redemption,
    /// draining immediately against whatever cash is already `available`.
    /// Returns the new ticket's `redemption_id`.
    pub fn redeem(
        &mut self,
        account: Address,
        tick: Tick,
        shares_in: u128,
        config: &PoolConfig,
    ) -> Result<u64, Error> {
        if shares_in == 0 {
            return Err(Error::InsufficientShares);
        }
        let record = self
            .deposits
            .get_mut(&(account, tick.0))
            .ok_or(Error::InsufficientShares)?;
        if record.shares < shares_in {
            return Err(Error::InsufficientShares);
        }
        record.shares -= shares_in;
        let redemption_id = record.next_redemption_id;
        record.next_redemption_id += 1;

        let node = self.nodes.get_mut(&tick.0).ok_or(Error::InvalidTick("tick does not exist"))?;
        let target = node.total_enqueued_shares;
        node.total_enqueued_shares = math::add(node.total_enqueued_shares, shares_in)?;
        node.redemptions = math::add(node.redemptions, shares_in)?;
        let index = node.generation;

        let ticket = RedemptionTicket {
            account,
            tick,
            redemption_id,
            pending: shares_in,
            index,
            target,
            owed_shares: 0,
            owed_cash: 0,
        };
        let key = (account, tick.0, redemption_id);
        node.queue.push_back(key);
        self.tickets.insert(key, ticket);

        common_events::redeem(tick, account, redemption_id, shares_in);

        self.drain_tick(tick, config)?;
        Ok(redemption_id)
    }

    /// Drains as much of `tick`'s redemption queue as `available` cash
    /// allows, in FIFO order. A ticket at the head that cannot be fully
    /// drained absorbs a partial fill and stays at the head; the node's
    /// generation is bumped once `available` is exhausted with tickets
    /// still queued, so a later arrival of cash starts a fresh pass.
    pub(crate) fn drain_tick(&mut self, tick: Tick, _config: &PoolConfig) -> Result<(), Error> {
        loop {
            let node = match self.nodes.get(&tick.0) {
                Some(n) => n,
                None => return Ok(()),
            };
            if node.available == 0 || node.shares == 0 {
                break;
            }
            let key = match node.queue.front().copied() {
                Some(k) => k,
                None => break,
            };
            let (node_value, node_shares, node_available) = (node.value, node.shares, node.available);

            let ticket_pending = self
                .tickets
                .get(&key)
                .map(|t| t.pending)
                .ok_or(Error::InvalidRedemptionStatus)?;

            // Shares drainable at the current value/shares price without
            // exceeding what's available in cash.
            let shares_drainable_by_cash = math::widen_mul(node_available, node_shares)?
                .checked_div(alloy_primitives::U256::from(node_value))
                .ok_or(Error::overflow("drain div by zero value"))
                .and_then(|v| math::narrow_from(v, "drain shares_drainable"))?;
            let shares_drained = math::min(shares_drainable_by_cash, ticket_pending);
            if shares_drained == 0 {
                break;
            }
            let cash_out = math::widen_mul(shares_drained, node_value)?
                .checked_div(alloy_primitives::U256::from(node_shares))
                .ok_or(Error::overflow("drain div by zero shares"))
                .and_then(|v| math::narrow_from(v, "drain cash_out"))?;
            let cash_out = math::min(cash_out, node_available);

            let node = self.nodes.get_mut(&tick.0).expect("checked above");
            node.value = math::sub(node.value, cash_out)?;
            node.shares = math::sub(node.shares, shares_drained)?;
            node.available = math::sub(node.available, cash_out)?;

            let ticket = self.tickets.get_mut(&key).expect("checked above");
            ticket.pending = math::sub(ticket.pending, shares_drained)?;
            ticket.owed_shares = math::add(ticket.owed_shares, shares_drained)?;
            ticket.owed_cash = math::add(ticket.owed_cash, cash_out)?;
            let fully_drained = ticket.pending == 0;

            if fully_drained {
                let node = self.nodes.get_mut(&tick.0).expect("checked above");
                node.queue.pop_front();
            } else {
                let node = self.nodes.get_mut(&tick.0).expect("checked above");
                node.generation = node.generation.wrapping_add(1);
                break;
            }
        }
        Ok(())
    }

    /// Collects whatever cash a ticket has accumulated from `drain_tick`
    /// passes. A ticket that is not yet fully settled can be withdrawn
    /// repeatedly as more of it drains; `is_fully_settled` tickets are
    /// removed from the table and their node is offered for GC.
    pub fn withdraw(&mut self, account: Address, tick: Tick, redemption_id: u64) -> Result<u128, Error> {
        let key = (account, tick.0, redemption_id);
        let ticket = self.tickets.get_mut(&key).ok_or(Error::InvalidRedemptionStatus)?;
        if ticket.owed_shares == 0 && ticket.owed_cash == 0 {
            return Err(Error::InvalidRedemptionStatus);
        }
        let amount_out = ticket.owed_cash;
        let shares_claimed = ticket.owed_shares;
        ticket.owed_cash = 0;
        ticket.owed_shares = 0;
        let fully_settled = ticket.is_fully_settled();

        let node = self.nodes.get_mut(&tick.0).ok_or(Error::InvalidTick("tick does not exist"))?;
        node.redemptions = math::sub(node.redemptions, shares_claimed)?;

        if fully_settled {
            self.tickets.remove(&key);
        }
        self.try_gc(tick);

        common_events::withdraw(tick, account, redemption_id, shares_claimed, amount_out);
        Ok(amount_out)
    }

    /// Moves a redemption ticket's already-drained cash directly into a
    /// fresh deposit at `dst`, without a round trip through the caller's
    /// external balance. The ticket's still-pending (undrained) portion, if
    /// any, is left queued at `src` untouched.
    pub fn rebalance(
        &mut self,
        account: Address,
        src: Tick,
        redemption_id: u64,
        dst: Tick,
        min_shares_out: u128,
        config: &PoolConfig,
    ) -> Result<u128, Error> {
        let key = (account, src.0, redemption_id);
        let ticket = self.tickets.get(&key).ok_or(Error::InvalidRedemptionStatus)?;
        if ticket.owed_cash == 0 {
            return Err(Error::InvalidRedemptionStatus);
        }
        let amount = ticket.owed_cash;
        let shares_claimed = ticket.owed_shares;

        let ticket = self.tickets.get_mut(&key).expect("checked above");
        ticket.owed_cash = 0;
        ticket.owed_shares = 0;
        let fully_settled = ticket.is_fully_settled();

        let node = self.nodes.get_mut(&src.0).ok_or(Error::InvalidTick("src tick does not exist"))?;
        node.redemptions = math::sub(node.redemptions, shares_claimed)?;
        if fully_settled {
            self.tickets.remove(&key);
        }
        self.try_gc(src);

        let shares_out = self.deposit(account, dst, amount, min_shares_out, config)?;
        common_events::rebalance(src, dst, account, amount, shares_out);
        Ok(shares_out)
    }
}
