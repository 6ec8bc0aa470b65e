//! `deposit` (spec §4.D).

use alloy_primitives::Address;
use common_errors::Error;
use common_math as math;
use common_structs::{PoolConfig, Tick};

use crate::storage::Ledger;

impl Ledger {
    pub fn deposit(
        &mut self,
        account: Address,
        tick: Tick,
        amount: u128,
        min_shares_out: u128,
        config: &PoolConfig,
    ) -> Result<u128, Error> {
        if tick.is_sentinel() {
            return Err(Error::InvalidTick("cannot deposit into the sentinel"));
        }
        tick.validate_classes(config.duration_table.len(), config.rate_table.len())?;

        self.get_or_create_node(tick, config)?;
        let node = self.nodes.get(&tick.0).expect("just created or existing");
        if node.is_inactive(config.impairment_threshold_bps) {
            return Err(Error::InactiveLiquidity("tick is impaired or insolvent"));
        }

        let shares_out = if node.shares == 0 {
            amount
        } else {
            math::widen_mul(amount, node.shares)?
                .checked_div(alloy_primitives::U256::from(node.value))
                .ok_or(Error::overflow("deposit div by zero value"))
                .and_then(|v| math::narrow_from(v, "deposit shares_out"))?
        };
        if shares_out == 0 || shares_out < min_shares_out {
            return Err(Error::InsufficientShares);
        }

        let node = self.nodes.get_mut(&tick.0).expect("present");
        node.value = math::add(node.value, amount)?;
        node.available = math::add(node.available, amount)?;
        node.shares = math::add(node.shares, shares_out)?;

        let record = self.deposits.entry((account, tick.0)).or_default();
        record.shares = math::add(record.shares, shares_out)?;

        common_events::deposit(tick, account, amount, shares_out);
        Ok(shares_out)
    }
}
