//! The loan lifecycle engine (component F): `borrow`, `repay`, `refinance`,
//! `liquidate`, and `on_collateral_liquidated`, plus the admin-fee ledger and
//! the thin liquidity-ledger passthroughs (`deposit`/`redeem`/`withdraw`/
//! `rebalance`, and the read-only views) that round out the operation
//! surface behind one facade.
//!
//! `LendingPool` is the crate's single entry point: it owns the liquidity
//! ledger, the per-receipt-hash loan status table, the admin-fee balance,
//! and the reentrancy guard the spec requires on every state-mutating
//! operation. External collaborators (the currency token, the collateral
//! NFT, the liquidator, the delegation registries) are never owned by the
//! pool — they are passed in per call as trait objects, so a production
//! deployment supplies chain-backed adapters and tests supply mock doubles.

use std::collections::HashMap;

use alloy_primitives::{Address, B256, U256};
use common_errors::Error;
use common_math as math;
use common_structs::{AdminFeeConfig, LoanStatus, PoolConfig, Tick};
use liquidity_pool::{DrawAllocation, Ledger, NodeView, RedemptionView};

use crate::delegation;
use crate::external::{CollateralLiquidator, CollateralToken, CurrencyToken, DelegationRegistry};
use crate::options::Options;
use crate::receipt::{LoanReceipt, NodeReceipt, CURRENT_VERSION};
use crate::reentrancy::ReentrancyFlag;
use crate::sourcing;

/// The four external collaborators a loan-lifecycle call may need to drive,
/// bundled so call sites don't thread four separate `&mut dyn` parameters
/// through every method.
pub struct Collaborators<'a> {
    pub currency: &'a mut dyn CurrencyToken,
    pub collateral: &'a mut dyn CollateralToken,
    pub liquidator: &'a mut dyn CollateralLiquidator,
    pub delegation: &'a mut dyn DelegationRegistry,
}

pub struct LendingPool {
    /// The pool's own address, as the collaborators see it — the `pool`
    /// argument every external contract call in the collateral/delegation
    /// hooks takes.
    pub address: Address,
    pub config: PoolConfig,
    pub ledger: Ledger,
    loans: HashMap<B256, LoanStatus>,
    admin_fee_balance: u128,
    reentrancy: ReentrancyFlag,
}

/// Splits `total` across `weights` in proportion to `weight_sum`, the last
/// entry absorbing whatever remainder integer division leaves behind, so
/// the shares always sum to exactly `total`.
fn distribute_proportionally(total: u128, weights: &[u128], weight_sum: u128) -> Result<Vec<u128>, Error> {
    let mut out = Vec::with_capacity(weights.len());
    let mut distributed = 0u128;
    let n = weights.len();
    for (i, &w) in weights.iter().enumerate() {
        let share = if i + 1 == n {
            math::sub(total, distributed)?
        } else if weight_sum == 0 {
            0
        } else {
            math::widen_mul(total, w)?
                .checked_div(U256::from(weight_sum))
                .ok_or(Error::overflow("distribute div by zero"))
                .and_then(|v| math::narrow_from(v, "distribute narrow"))?
        };
        distributed = math::add(distributed, share)?;
        out.push(share);
    }
    Ok(out)
}

/// `total * elapsed / duration`, the linear proration a receipt's interest
/// and admin fee realize by when it's settled early.
fn prorate(total: u128, elapsed: u64, duration: u64) -> Result<u128, Error> {
    if duration == 0 {
        return Err(Error::overflow("prorate: zero duration"));
    }
    math::widen_mul(total, elapsed as u128)?
        .checked_div(U256::from(duration))
        .ok_or(Error::overflow("prorate div by zero"))
        .and_then(|v| math::narrow_from(v, "prorate narrow"))
}

fn allocations_from_receipt(receipt: &LoanReceipt) -> Vec<DrawAllocation> {
    receipt
        .node_receipts
        .iter()
        .map(|nr| DrawAllocation { tick: Tick(nr.tick), used: nr.used, pending: nr.pending })
        .collect()
}

fn node_receipts_from_allocations(allocations: &[DrawAllocation]) -> Vec<NodeReceipt> {
    allocations
        .iter()
        .map(|a| NodeReceipt { tick: a.tick.0, used: a.used, pending: a.pending })
        .collect()
}

/// The outcome of settling one receipt's interest up to `now`: the total
/// cash the borrower owes, and the admin's realized slice of it.
struct Settlement {
    owed: u128,
    admin_fee_accrued: u128,
    elapsed: u64,
}

impl LendingPool {
    pub fn new(address: Address, config: PoolConfig) -> Result<LendingPool, Error> {
        config.validate()?;
        Ok(LendingPool {
            address,
            config,
            ledger: Ledger::new(),
            loans: HashMap::new(),
            admin_fee_balance: 0,
            reentrancy: ReentrancyFlag::new(),
        })
    }

    pub fn admin_fee_balance(&self) -> u128 {
        self.admin_fee_balance
    }

    pub fn loans(&self, receipt_hash: B256) -> LoanStatus {
        self.loans.get(&receipt_hash).copied().unwrap_or_default()
    }

    pub fn liquidity_node(&self, tick: Tick) -> Option<NodeView> {
        self.ledger.liquidity_node(tick)
    }

    pub fn liquidity_nodes(&self) -> Vec<NodeView> {
        self.ledger.liquidity_nodes()
    }

    pub fn deposits(&self, account: Address, tick: Tick) -> u128 {
        self.ledger.deposits(account, tick)
    }

    pub fn redemptions(&self, account: Address, tick: Tick, redemption_id: u64) -> Option<RedemptionView> {
        self.ledger.redemptions(account, tick, redemption_id)
    }

    pub fn redemption_available(&self, account: Address, tick: Tick, redemption_id: u64) -> u128 {
        self.ledger.redemption_available(account, tick, redemption_id)
    }

    /// Quotes the repayment a `borrow` with these terms would produce,
    /// without mutating the ledger.
    pub fn quote(
        &self,
        principal: u128,
        duration: u64,
        collateral_token: Address,
        token_id: U256,
        ticks: &[Tick],
        options_bytes: &[u8],
    ) -> Result<u128, Error> {
        let options = Options::parse(options_bytes)?;
        let q = sourcing::quote(&self.ledger, &self.config, principal, duration, collateral_token, token_id, ticks, &options)?;
        Ok(q.repayment)
    }

    pub fn deposit(
        &mut self,
        account: Address,
        tick: Tick,
        amount: u128,
        min_shares_out: u128,
        currency: &mut dyn CurrencyToken,
    ) -> Result<u128, Error> {
        let _guard = self.reentrancy.acquire()?;
        currency.transfer_from(account, self.address, amount)?;
        self.ledger.deposit(account, tick, amount, min_shares_out, &self.config)
    }

    pub fn redeem(&mut self, account: Address, tick: Tick, shares_in: u128) -> Result<u64, Error> {
        let _guard = self.reentrancy.acquire()?;
        self.ledger.redeem(account, tick, shares_in, &self.config)
    }

    pub fn withdraw(
        &mut self,
        account: Address,
        tick: Tick,
        redemption_id: u64,
        currency: &mut dyn CurrencyToken,
    ) -> Result<u128, Error> {
        let _guard = self.reentrancy.acquire()?;
        let amount = self.ledger.withdraw(account, tick, redemption_id)?;
        if amount > 0 {
            currency.transfer(account, amount)?;
        }
        Ok(amount)
    }

    pub fn rebalance(
        &mut self,
        account: Address,
        src: Tick,
        redemption_id: u64,
        dst: Tick,
        min_shares_out: u128,
    ) -> Result<u128, Error> {
        let _guard = self.reentrancy.acquire()?;
        self.ledger.rebalance(account, src, redemption_id, dst, min_shares_out, &self.config)
    }

    /// Sources `principal` against the caller's tick list, pulls the
    /// collateral into the pool's custody, grants any requested delegation,
    /// and mints the loan receipt that is the borrower's sole claim to it
    /// back.
    #[allow(clippy::too_many_arguments)]
    pub fn borrow(
        &mut self,
        now: u64,
        borrower: Address,
        principal: u128,
        duration: u64,
        collateral_token: Address,
        token_id: U256,
        max_repayment: u128,
        ticks: &[Tick],
        options_bytes: &[u8],
        collaborators: &mut Collaborators,
    ) -> Result<(LoanReceipt, B256), Error> {
        let _guard = self.reentrancy.acquire()?;
        let options = Options::parse(options_bytes)?;
        let quote = sourcing::quote(&self.ledger, &self.config, principal, duration, collateral_token, token_id, ticks, &options)?;
        if quote.repayment > max_repayment {
            return Err(Error::RepaymentTooHigh);
        }
        self.ledger.apply_borrow_draw(&quote.allocations)?;

        collaborators.collateral.transfer_from(borrower, self.address, token_id)?;
        collaborators.currency.transfer(borrower, principal)?;
        delegation::grant(collaborators.delegation, self.address, collateral_token, token_id, &options)?;

        let maturity = now.checked_add(duration).ok_or(Error::overflow("maturity overflow"))?;
        let receipt = LoanReceipt {
            version: CURRENT_VERSION,
            principal,
            repayment: quote.repayment,
            admin_fee: quote.admin_fee,
            borrower,
            maturity,
            duration,
            collateral_token,
            collateral_token_id: token_id,
            context: options.wrapper_context.clone().unwrap_or_default(),
            node_receipts: node_receipts_from_allocations(&quote.allocations),
        };
        let hash = receipt.hash();
        if self.loans.get(&hash).copied().unwrap_or_default().was_produced_by_pool() {
            return Err(Error::InvalidLoanReceipt("receipt hash already in use"));
        }
        self.loans.insert(hash, LoanStatus::Active);

        common_events::borrow(hash, borrower, principal, quote.repayment, maturity);
        Ok((receipt, hash))
    }

    /// Settles a receipt's interest linearly up to `now` (capped at
    /// maturity), splits the realized interest into the lenders' and
    /// admin's shares, and applies the settlement to the ledger. Shared by
    /// `repay` and the settlement half of `refinance`.
    fn settle_interest(&mut self, now: u64, receipt: &LoanReceipt) -> Result<Settlement, Error> {
        let origination = receipt.origination_time();
        if now <= origination {
            return Err(Error::InvalidLoanReceipt("cannot settle in the same block the loan originated"));
        }
        let elapsed = now.min(receipt.maturity) - origination;
        let lender_interest = math::sub(math::sub(receipt.repayment, receipt.admin_fee)?, receipt.principal)?;
        let lender_interest_realized = prorate(lender_interest, elapsed, receipt.duration)?;
        let admin_fee_accrued = prorate(receipt.admin_fee, elapsed, receipt.duration)?;
        let owed = math::add(math::add(receipt.principal, lender_interest_realized)?, admin_fee_accrued)?;

        let allocations = allocations_from_receipt(receipt);
        let weights: Vec<u128> = allocations.iter().map(|a| a.pending).collect();
        let lender_due: u128 = weights.iter().copied().sum();
        let interest_shares = distribute_proportionally(lender_interest_realized, &weights, lender_due)?;
        let proceeds: Vec<u128> = allocations.iter().zip(&interest_shares).map(|(a, i)| a.used + i).collect();
        self.ledger.apply_repay_settlement(&allocations, &proceeds, &self.config)?;

        self.admin_fee_balance = math::add(self.admin_fee_balance, admin_fee_accrued)?;
        Ok(Settlement { owed, admin_fee_accrued, elapsed })
    }

    /// Pays the fee-share recipient's configured split of a just-accrued
    /// admin fee immediately, debiting it back out of `admin_fee_balance`.
    fn pay_fee_share(&mut self, admin_fee_accrued: u128, currency: &mut dyn CurrencyToken) -> Result<u128, Error> {
        let Some(recipient) = self.config.admin_fee.fee_share_recipient else {
            return Ok(0);
        };
        let split = math::bps_of(admin_fee_accrued, self.config.admin_fee.fee_share_split_bps)?;
        if split == 0 {
            return Ok(0);
        }
        currency.transfer(recipient, split)?;
        self.admin_fee_balance = math::sub(self.admin_fee_balance, split)?;
        Ok(split)
    }

    /// Repays an active loan in full: settles the ledger, pulls `owed` from
    /// the borrower, releases the collateral, and revokes any delegation
    /// the caller names.
    pub fn repay(
        &mut self,
        now: u64,
        receipt_bytes: &[u8],
        caller: Address,
        revoke_delegate_v1: Option<Address>,
        revoke_delegate_v2: Option<Address>,
        collaborators: &mut Collaborators,
    ) -> Result<u128, Error> {
        let _guard = self.reentrancy.acquire()?;
        let receipt = LoanReceipt::decode(receipt_bytes)?;
        let hash = receipt.hash();
        if !self.loans.get(&hash).copied().unwrap_or_default().is_active() {
            return Err(Error::InvalidLoanReceipt("loan is not active"));
        }
        if receipt.borrower != caller {
            return Err(Error::InvalidCaller);
        }

        let settlement = self.settle_interest(now, &receipt)?;
        collaborators.currency.transfer_from(caller, self.address, settlement.owed)?;
        collaborators.collateral.transfer_from(self.address, receipt.borrower, receipt.collateral_token_id)?;

        let revoke_options = Options { delegate_v1: revoke_delegate_v1, delegate_v2: revoke_delegate_v2, ..Options::default() };
        delegation::revoke(collaborators.delegation, self.address, receipt.collateral_token, receipt.collateral_token_id, &revoke_options)?;

        let split = self.pay_fee_share(settlement.admin_fee_accrued, collaborators.currency)?;
        self.loans.insert(hash, LoanStatus::Repaid);

        common_events::admin_fee_accrued(hash, settlement.admin_fee_accrued, split);
        common_events::repay(hash, settlement.owed, settlement.elapsed);
        Ok(settlement.owed)
    }

    /// Settles an active loan's accrued interest in place and immediately
    /// opens a new loan against the same locked collateral, charging or
    /// crediting the borrower the net difference between what was owed and
    /// the new draw.
    #[allow(clippy::too_many_arguments)]
    pub fn refinance(
        &mut self,
        now: u64,
        receipt_bytes: &[u8],
        caller: Address,
        new_principal: u128,
        new_duration: u64,
        max_repayment: u128,
        new_ticks: &[Tick],
        new_options_bytes: &[u8],
        collaborators: &mut Collaborators,
    ) -> Result<(LoanReceipt, B256), Error> {
        let _guard = self.reentrancy.acquire()?;
        let old_receipt = LoanReceipt::decode(receipt_bytes)?;
        let old_hash = old_receipt.hash();
        if !self.loans.get(&old_hash).copied().unwrap_or_default().is_active() {
            return Err(Error::InvalidLoanReceipt("loan is not active"));
        }
        if old_receipt.borrower != caller {
            return Err(Error::InvalidCaller);
        }

        let settlement = self.settle_interest(now, &old_receipt)?;
        let split = self.pay_fee_share(settlement.admin_fee_accrued, collaborators.currency)?;
        self.loans.insert(old_hash, LoanStatus::Repaid);
        common_events::admin_fee_accrued(old_hash, settlement.admin_fee_accrued, split);
        common_events::repay(old_hash, settlement.owed, settlement.elapsed);

        let new_options = Options::parse(new_options_bytes)?;
        let quote = sourcing::quote(
            &self.ledger,
            &self.config,
            new_principal,
            new_duration,
            old_receipt.collateral_token,
            old_receipt.collateral_token_id,
            new_ticks,
            &new_options,
        )?;
        if quote.repayment > max_repayment {
            return Err(Error::RepaymentTooHigh);
        }
        self.ledger.apply_borrow_draw(&quote.allocations)?;

        let new_maturity = now.checked_add(new_duration).ok_or(Error::overflow("maturity overflow"))?;
        let new_receipt = LoanReceipt {
            version: CURRENT_VERSION,
            principal: new_principal,
            repayment: quote.repayment,
            admin_fee: quote.admin_fee,
            borrower: caller,
            maturity: new_maturity,
            duration: new_duration,
            collateral_token: old_receipt.collateral_token,
            collateral_token_id: old_receipt.collateral_token_id,
            context: new_options.wrapper_context.clone().unwrap_or_default(),
            node_receipts: node_receipts_from_allocations(&quote.allocations),
        };
        let new_hash = new_receipt.hash();
        if self.loans.get(&new_hash).copied().unwrap_or_default().was_produced_by_pool() {
            return Err(Error::InvalidLoanReceipt("receipt hash already in use"));
        }
        self.loans.insert(new_hash, LoanStatus::Active);

        // The collateral never leaves custody; only the delegation grant is
        // re-established if the new options name different delegates.
        delegation::grant(collaborators.delegation, self.address, old_receipt.collateral_token, old_receipt.collateral_token_id, &new_options)?;

        let net = new_principal as i128 - settlement.owed as i128;
        if net > 0 {
            collaborators.currency.transfer(caller, net as u128)?;
        } else if net < 0 {
            collaborators.currency.transfer_from(caller, self.address, (-net) as u128)?;
        }

        common_events::refinance(old_hash, new_hash, net);
        common_events::borrow(new_hash, caller, new_principal, quote.repayment, new_maturity);
        Ok((new_receipt, new_hash))
    }

    /// Sends an expired loan's collateral to the external liquidator. The
    /// loan stays pending lenders' final settlement until
    /// `on_collateral_liquidated` reports the sale proceeds.
    pub fn liquidate(&mut self, now: u64, receipt_bytes: &[u8], collaborators: &mut Collaborators) -> Result<B256, Error> {
        let _guard = self.reentrancy.acquire()?;
        let receipt = LoanReceipt::decode(receipt_bytes)?;
        let hash = receipt.hash();
        if !self.loans.get(&hash).copied().unwrap_or_default().is_active() {
            return Err(Error::InvalidLoanReceipt("loan is not active"));
        }
        if now <= receipt.maturity {
            return Err(Error::LoanNotExpired);
        }
        self.loans.insert(hash, LoanStatus::Liquidated);

        collaborators.liquidator.withdraw_collateral(self.address, receipt.collateral_token, receipt.collateral_token_id)?;
        collaborators.liquidator.liquidate_collateral(self.address, receipt.collateral_token, receipt.collateral_token_id)?;

        common_events::liquidate(hash);
        Ok(hash)
    }

    /// Settles the ledger once the liquidator reports `proceeds` for a
    /// liquidated loan's collateral. Three cases, widening from the spec's
    /// two literally-described ones to close the gap between them:
    ///
    /// - `proceeds > repayment`: lenders are made whole (`lender_due`), the
    ///   surplus above `repayment` splits between the borrower and the
    ///   lenders' residual by `borrower_surplus_split_bps`, and the admin
    ///   fee is credited in full.
    /// - `lender_due <= proceeds <= repayment`: lenders are made whole, and
    ///   whatever remains up to `admin_fee` credits the admin balance
    ///   (partially or in full) instead of the borrower — there is no
    ///   surplus to split since the sale didn't clear the full repayment.
    /// - `proceeds < lender_due`: a shortfall; lenders absorb it pro rata by
    ///   `node_receipt.pending` and the admin fee accrues nothing.
    pub fn on_collateral_liquidated(
        &mut self,
        receipt_bytes: &[u8],
        proceeds: u128,
        revoke_delegate_v1: Option<Address>,
        revoke_delegate_v2: Option<Address>,
        collaborators: &mut Collaborators,
    ) -> Result<(), Error> {
        let _guard = self.reentrancy.acquire()?;
        let receipt = LoanReceipt::decode(receipt_bytes)?;
        let hash = receipt.hash();
        if self.loans.get(&hash).copied().unwrap_or_default() != LoanStatus::Liquidated {
            return Err(Error::InvalidLoanReceipt("loan has not been sent to liquidation"));
        }

        let lender_due = math::sub(receipt.repayment, receipt.admin_fee)?;
        let (lenders_total, admin_credit, borrower_surplus) = if proceeds > receipt.repayment {
            let surplus = math::sub(proceeds, receipt.repayment)?;
            let borrower_surplus = math::bps_of(surplus, self.config.borrower_surplus_split_bps)?;
            let lender_residual = math::sub(surplus, borrower_surplus)?;
            (math::add(lender_due, lender_residual)?, receipt.admin_fee, borrower_surplus)
        } else if proceeds >= lender_due {
            (lender_due, math::sub(proceeds, lender_due)?, 0)
        } else {
            (proceeds, 0, 0)
        };

        let allocations = allocations_from_receipt(&receipt);
        let weights: Vec<u128> = allocations.iter().map(|a| a.pending).collect();
        let shares = distribute_proportionally(lenders_total, &weights, lender_due)?;
        self.ledger.apply_liquidation_settlement(&allocations, &shares, &self.config)?;

        if borrower_surplus > 0 {
            collaborators.currency.transfer(receipt.borrower, borrower_surplus)?;
        }
        self.admin_fee_balance = math::add(self.admin_fee_balance, admin_credit)?;

        let revoke_options = Options { delegate_v1: revoke_delegate_v1, delegate_v2: revoke_delegate_v2, ..Options::default() };
        delegation::revoke(collaborators.delegation, self.address, receipt.collateral_token, receipt.collateral_token_id, &revoke_options)?;

        self.loans.insert(hash, LoanStatus::CollateralLiquidated);
        common_events::collateral_liquidated(hash, proceeds, lenders_total, borrower_surplus);
        Ok(())
    }

    pub fn set_admin_fee(&mut self, rate_bps: u16, fee_share_recipient: Option<Address>, fee_share_split_bps: u16) -> Result<(), Error> {
        let new_config = AdminFeeConfig { rate_bps, fee_share_recipient, fee_share_split_bps };
        new_config.validate()?;
        self.config.admin_fee = new_config;
        Ok(())
    }

    pub fn withdraw_admin_fees(&mut self, amount: u128, recipient: Address, currency: &mut dyn CurrencyToken) -> Result<(), Error> {
        let _guard = self.reentrancy.acquire()?;
        if amount > self.admin_fee_balance {
            return Err(Error::InvalidParameters("amount exceeds admin fee balance"));
        }
        self.admin_fee_balance = math::sub(self.admin_fee_balance, amount)?;
        currency.transfer(recipient, amount)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common_math::FP;
    use common_structs::{CollateralFilter, UtilizationMultiplier};
    use std::cell::RefCell;
    use std::collections::HashMap as StdHashMap;

    fn config() -> PoolConfig {
        PoolConfig {
            currency_token: Address::ZERO,
            collateral_filter: CollateralFilter::SingleCollection { collection: Address::repeat_byte(9) },
            duration_table: vec![86_400],
            rate_table: vec![FP / 10],
            collateral_wrappers: vec![],
            utilization_multiplier: UtilizationMultiplier { min_utilization_bps: 0, max_utilization_bps: 10_000 },
            tick_limit_spacing_bps: 1_000,
            impairment_threshold_bps: 500,
            admin_fee: AdminFeeConfig { rate_bps: 1_000, fee_share_recipient: None, fee_share_split_bps: 0 },
            borrower_surplus_split_bps: 9_500,
        }
    }

    #[derive(Default)]
    struct MockCurrency {
        balances: RefCell<StdHashMap<Address, i128>>,
    }

    impl MockCurrency {
        fn credit(&self, account: Address, amount: u128) {
            *self.balances.borrow_mut().entry(account).or_default() += amount as i128;
        }
        fn balance(&self, account: Address) -> i128 {
            *self.balances.borrow().get(&account).unwrap_or(&0)
        }
    }

    impl CurrencyToken for MockCurrency {
        fn transfer_from(&mut self, from: Address, to: Address, amount: u128) -> Result<(), Error> {
            *self.balances.borrow_mut().entry(from).or_default() -= amount as i128;
            *self.balances.borrow_mut().entry(to).or_default() += amount as i128;
            Ok(())
        }
        fn transfer(&mut self, to: Address, amount: u128) -> Result<(), Error> {
            *self.balances.borrow_mut().entry(to).or_default() += amount as i128;
            Ok(())
        }
        fn balance_of(&self, account: Address) -> Result<u128, Error> {
            Ok(self.balance(account).max(0) as u128)
        }
    }

    #[derive(Default)]
    struct MockCollateral {
        owner: RefCell<StdHashMap<U256, Address>>,
    }

    impl CollateralToken for MockCollateral {
        fn transfer_from(&mut self, from: Address, to: Address, id: U256) -> Result<(), Error> {
            self.owner.borrow_mut().insert(id, to);
            let _ = from;
            Ok(())
        }
        fn batch_transfer_from(&mut self, from: Address, to: Address, ids: &[U256]) -> Result<(), Error> {
            for id in ids {
                self.transfer_from(from, to, *id)?;
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockLiquidator;
    impl CollateralLiquidator for MockLiquidator {
        fn withdraw_collateral(&mut self, _pool: Address, _token: Address, _id: U256) -> Result<(), Error> {
            Ok(())
        }
        fn liquidate_collateral(&mut self, _pool: Address, _token: Address, _id: U256) -> Result<(), Error> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockDelegation;
    impl DelegationRegistry for MockDelegation {
        fn set_delegate(&mut self, _pool: Address, _delegate: Address, _token: Address, _id: U256, _on: bool) -> Result<(), Error> {
            Ok(())
        }
    }

    struct Harness {
        pool: LendingPool,
        currency: MockCurrency,
        collateral: MockCollateral,
        liquidator: MockLiquidator,
        delegation: MockDelegation,
    }

    impl Harness {
        fn new() -> Harness {
            Harness {
                pool: LendingPool::new(Address::repeat_byte(0xA), config()).unwrap(),
                currency: MockCurrency::default(),
                collateral: MockCollateral::default(),
                liquidator: MockLiquidator,
                delegation: MockDelegation,
            }
        }

    }

    // `Harness::collaborators(&mut self)` would borrow the whole harness for
    // the guard's lifetime, which then conflicts with the `h.pool.*` call
    // sites need right after. A macro expands at the call site instead, so
    // the borrow checker sees disjoint field projections.
    macro_rules! collabs {
        ($h:expr) => {
            Collaborators {
                currency: &mut $h.currency,
                collateral: &mut $h.collateral,
                liquidator: &mut $h.liquidator,
                delegation: &mut $h.delegation,
            }
        };
    }

    #[test]
    fn borrow_then_repay_at_maturity_returns_collateral_and_clears_ledger() {
        let mut h = Harness::new();
        let lender = Address::repeat_byte(1);
        let borrower = Address::repeat_byte(2);
        let tick = Tick::encode(10_000 * FP, 0, 0, 0).unwrap();
        h.pool.ledger.deposit(lender, tick, 1_000, 0, &h.pool.config.clone()).unwrap();
        h.currency.credit(borrower, 10_000);

        let token_id = U256::from(7u64);
        let (receipt, hash) = {
            let mut collaborators = collabs!(h);
            h.pool
                .borrow(0, borrower, 1_000, 86_400, Address::repeat_byte(9), token_id, u128::MAX, &[tick], &[], &mut collaborators)
                .unwrap()
        };
        assert_eq!(h.pool.loans(hash), LoanStatus::Active);
        assert_eq!(h.collateral.owner.borrow().get(&token_id), Some(&h.pool.address));

        let bytes = receipt.encode();
        let owed = {
            let mut collaborators = collabs!(h);
            h.pool.repay(86_400, &bytes, borrower, None, None, &mut collaborators).unwrap()
        };
        assert_eq!(owed, receipt.repayment);
        assert_eq!(h.pool.loans(hash), LoanStatus::Repaid);
        assert_eq!(h.collateral.owner.borrow().get(&token_id), Some(&borrower));
        assert_eq!(h.currency.balance(borrower), 10_000 + 1_000 - owed as i128);

        let node = h.pool.liquidity_node(tick).unwrap();
        assert_eq!(node.pending, 0);
        assert_eq!(node.value, 1_000 + (receipt.repayment - receipt.admin_fee - 1_000));
    }

    #[test]
    fn repay_in_the_same_block_as_origination_is_rejected() {
        let mut h = Harness::new();
        let lender = Address::repeat_byte(1);
        let borrower = Address::repeat_byte(2);
        let tick = Tick::encode(10_000 * FP, 0, 0, 0).unwrap();
        h.pool.ledger.deposit(lender, tick, 1_000, 0, &h.pool.config.clone()).unwrap();
        h.currency.credit(borrower, 10_000);

        let (receipt, _) = {
            let mut collaborators = collabs!(h);
            h.pool
                .borrow(100, borrower, 1_000, 86_400, Address::repeat_byte(9), U256::from(1u64), u128::MAX, &[tick], &[], &mut collaborators)
                .unwrap()
        };
        let bytes = receipt.encode();
        let mut collaborators = collabs!(h);
        let result = h.pool.repay(100, &bytes, borrower, None, None, &mut collaborators);
        assert!(matches!(result, Err(Error::InvalidLoanReceipt(_))));
    }

    #[test]
    fn borrow_over_caller_max_repayment_is_rejected() {
        let mut h = Harness::new();
        let lender = Address::repeat_byte(1);
        let borrower = Address::repeat_byte(2);
        let tick = Tick::encode(10_000 * FP, 0, 0, 0).unwrap();
        h.pool.ledger.deposit(lender, tick, 1_000, 0, &h.pool.config.clone()).unwrap();

        let mut collaborators = collabs!(h);
        let result = h.pool.borrow(0, borrower, 1_000, 86_400, Address::repeat_byte(9), U256::from(1u64), 1_000, &[tick], &[], &mut collaborators);
        assert!(matches!(result, Err(Error::RepaymentTooHigh)));
    }

    #[test]
    fn liquidate_before_maturity_is_rejected() {
        let mut h = Harness::new();
        let lender = Address::repeat_byte(1);
        let borrower = Address::repeat_byte(2);
        let tick = Tick::encode(10_000 * FP, 0, 0, 0).unwrap();
        h.pool.ledger.deposit(lender, tick, 1_000, 0, &h.pool.config.clone()).unwrap();

        let (receipt, _) = {
            let mut collaborators = collabs!(h);
            h.pool
                .borrow(0, borrower, 1_000, 86_400, Address::repeat_byte(9), U256::from(1u64), u128::MAX, &[tick], &[], &mut collaborators)
                .unwrap()
        };
        let bytes = receipt.encode();
        let mut collaborators = collabs!(h);
        let result = h.pool.liquidate(86_000, &bytes, &mut collaborators);
        assert!(matches!(result, Err(Error::LoanNotExpired)));
    }

    #[test]
    fn liquidation_full_recovery_returns_lenders_to_principal_plus_interest() {
        let mut h = Harness::new();
        let lender = Address::repeat_byte(1);
        let borrower = Address::repeat_byte(2);
        let tick = Tick::encode(10_000 * FP, 0, 0, 0).unwrap();
        h.pool.ledger.deposit(lender, tick, 1_000, 0, &h.pool.config.clone()).unwrap();

        let (receipt, hash) = {
            let mut collaborators = collabs!(h);
            h.pool
                .borrow(0, borrower, 1_000, 86_400, Address::repeat_byte(9), U256::from(1u64), u128::MAX, &[tick], &[], &mut collaborators)
                .unwrap()
        };
        let bytes = receipt.encode();
        {
            let mut collaborators = collabs!(h);
            h.pool.liquidate(90_000, &bytes, &mut collaborators).unwrap();
        }

        let lender_due = receipt.repayment - receipt.admin_fee;
        let mut collaborators = collabs!(h);
        h.pool.on_collateral_liquidated(&bytes, receipt.repayment, None, None, &mut collaborators).unwrap();
        assert_eq!(h.pool.loans(hash), LoanStatus::CollateralLiquidated);
        let node = h.pool.liquidity_node(tick).unwrap();
        assert_eq!(node.value, 1_000 + (lender_due - 1_000));
        assert_eq!(h.pool.admin_fee_balance(), receipt.admin_fee);
    }

    #[test]
    fn liquidation_shortfall_below_principal_writes_down_lenders_value() {
        let mut h = Harness::new();
        let lender = Address::repeat_byte(1);
        let borrower = Address::repeat_byte(2);
        let tick = Tick::encode(10_000 * FP, 0, 0, 0).unwrap();
        h.pool.ledger.deposit(lender, tick, 1_000, 0, &h.pool.config.clone()).unwrap();

        let (receipt, hash) = {
            let mut collaborators = collabs!(h);
            h.pool
                .borrow(0, borrower, 1_000, 86_400, Address::repeat_byte(9), U256::from(1u64), u128::MAX, &[tick], &[], &mut collaborators)
                .unwrap()
        };
        let bytes = receipt.encode();
        {
            let mut collaborators = collabs!(h);
            h.pool.liquidate(90_000, &bytes, &mut collaborators).unwrap();
        }

        let mut collaborators = collabs!(h);
        h.pool.on_collateral_liquidated(&bytes, 400, None, None, &mut collaborators).unwrap();
        assert_eq!(h.pool.loans(hash), LoanStatus::CollateralLiquidated);
        let node = h.pool.liquidity_node(tick).unwrap();
        assert_eq!(node.value, 400);
        assert_eq!(h.pool.admin_fee_balance(), 0);
    }

    #[test]
    fn liquidation_surplus_above_repayment_splits_with_borrower() {
        let mut h = Harness::new();
        let lender = Address::repeat_byte(1);
        let borrower = Address::repeat_byte(2);
        let tick = Tick::encode(10_000 * FP, 0, 0, 0).unwrap();
        h.pool.ledger.deposit(lender, tick, 1_000, 0, &h.pool.config.clone()).unwrap();

        let (receipt, _) = {
            let mut collaborators = collabs!(h);
            h.pool
                .borrow(0, borrower, 1_000, 86_400, Address::repeat_byte(9), U256::from(1u64), u128::MAX, &[tick], &[], &mut collaborators)
                .unwrap()
        };
        let bytes = receipt.encode();
        {
            let mut collaborators = collabs!(h);
            h.pool.liquidate(90_000, &bytes, &mut collaborators).unwrap();
        }

        let proceeds = receipt.repayment + 1_000;
        let mut collaborators = collabs!(h);
        h.pool.on_collateral_liquidated(&bytes, proceeds, None, None, &mut collaborators).unwrap();
        assert!(h.currency.balance(borrower) > 0);
        assert_eq!(h.pool.admin_fee_balance(), receipt.admin_fee);
    }

    #[test]
    fn admin_fee_accrues_on_repay_and_can_be_withdrawn() {
        let mut h = Harness::new();
        let lender = Address::repeat_byte(1);
        let borrower = Address::repeat_byte(2);
        let recipient = Address::repeat_byte(3);
        let tick = Tick::encode(10_000 * FP, 0, 0, 0).unwrap();
        h.pool.ledger.deposit(lender, tick, 1_000, 0, &h.pool.config.clone()).unwrap();
        h.currency.credit(borrower, 10_000);

        let (receipt, _) = {
            let mut collaborators = collabs!(h);
            h.pool
                .borrow(0, borrower, 1_000, 86_400, Address::repeat_byte(9), U256::from(1u64), u128::MAX, &[tick], &[], &mut collaborators)
                .unwrap()
        };
        let bytes = receipt.encode();
        {
            let mut collaborators = collabs!(h);
            h.pool.repay(86_400, &bytes, borrower, None, None, &mut collaborators).unwrap();
        }
        assert_eq!(h.pool.admin_fee_balance(), receipt.admin_fee);

        let mut currency = MockCurrency::default();
        h.pool.withdraw_admin_fees(receipt.admin_fee, recipient, &mut currency).unwrap();
        assert_eq!(h.pool.admin_fee_balance(), 0);
        assert_eq!(currency.balance(recipient), receipt.admin_fee as i128);
    }

    #[test]
    fn refinance_nets_new_principal_against_owed_without_moving_collateral() {
        let mut h = Harness::new();
        let lender = Address::repeat_byte(1);
        let borrower = Address::repeat_byte(2);
        let tick = Tick::encode(10_000 * FP, 0, 0, 0).unwrap();
        h.pool.ledger.deposit(lender, tick, 10_000, 0, &h.pool.config.clone()).unwrap();
        h.currency.credit(borrower, 10_000);

        let token_id = U256::from(3u64);
        let (receipt, _) = {
            let mut collaborators = collabs!(h);
            h.pool
                .borrow(0, borrower, 1_000, 86_400, Address::repeat_byte(9), token_id, u128::MAX, &[tick], &[], &mut collaborators)
                .unwrap()
        };
        let bytes = receipt.encode();

        let (new_receipt, new_hash) = {
            let mut collaborators = collabs!(h);
            h.pool
                .refinance(43_200, &bytes, borrower, 2_000, 86_400, u128::MAX, &[tick], &[], &mut collaborators)
                .unwrap()
        };
        assert_eq!(h.pool.loans(new_hash), LoanStatus::Active);
        assert_eq!(new_receipt.principal, 2_000);
        // Collateral never left the pool's custody.
        assert_eq!(h.collateral.owner.borrow().get(&token_id), Some(&h.pool.address));
    }
}
