//! End-to-end scenarios driving `LendingPool` purely through its public
//! API, the way an embedding application would: deposit liquidity, quote
//! and take a loan against it, let depositors redeem while it's
//! outstanding, settle the loan, and withdraw. Mock collaborators stand in
//! for the currency/collateral/liquidator/delegation side of the world.

use std::cell::RefCell;
use std::collections::HashMap;

use alloy_primitives::{Address, U256};
use common_errors::Error;
use common_math::FP;
use common_structs::{AdminFeeConfig, CollateralFilter, LoanStatus, PoolConfig, Tick, UtilizationMultiplier};
use lending_pool::{CollateralLiquidator, CollateralToken, Collaborators, CurrencyToken, DelegationRegistry, LendingPool};

fn config() -> PoolConfig {
    PoolConfig {
        currency_token: Address::ZERO,
        collateral_filter: CollateralFilter::SingleCollection { collection: Address::repeat_byte(9) },
        duration_table: vec![86_400, 7 * 86_400],
        rate_table: vec![FP / 10, FP / 5],
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
    balances: RefCell<HashMap<Address, i128>>,
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
    owner: RefCell<HashMap<U256, Address>>,
}

impl CollateralToken for MockCollateral {
    fn transfer_from(&mut self, from: Address, to: Address, id: U256) -> Result<(), Error> {
        let _ = from;
        self.owner.borrow_mut().insert(id, to);
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

// See lending_pool::loan's test module for why this is a macro rather than
// a `&mut self` helper method: the method form would borrow the whole
// harness for the guard's lifetime and collide with sibling `h.pool.*`
// calls at the same call site.
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
fn deposit_borrow_redeem_while_active_then_repay_and_withdraw() {
    let mut h = Harness::new();
    let lender = Address::repeat_byte(1);
    let borrower = Address::repeat_byte(2);
    let tick = Tick::encode(10_000 * FP, 0, 0, 0).unwrap();
    h.currency.credit(lender, 5_000);
    h.currency.credit(borrower, 10_000);

    // Lender deposits into the pool through the public API (not the ledger
    // directly), exercising the currency pull.
    {
        let mut currency = MockCurrency::default();
        currency.credit(lender, 5_000);
        let shares = h.pool.deposit(lender, tick, 1_000, 0, &mut currency).unwrap();
        assert!(shares > 0);
    }

    let token_id = U256::from(42u64);
    let (receipt, hash) = {
        let mut collaborators = collabs!(h);
        h.pool
            .borrow(0, borrower, 1_000, 86_400, Address::repeat_byte(9), token_id, u128::MAX, &[tick], &[], &mut collaborators)
            .unwrap()
    };
    assert_eq!(h.pool.loans(hash), LoanStatus::Active);
    assert_eq!(h.collateral.owner.borrow().get(&token_id), Some(&h.pool.address));
    // The whole deposit was drawn on, so nothing is left liquid at the tick.
    assert_eq!(h.pool.liquidity_node(tick).unwrap().available, 0);

    // Lender redeems a slice of shares while the loan is active; this only
    // queues a redemption ticket, it does not require the loan to be
    // settled first.
    let redemption_id = h.pool.redeem(lender, tick, 100).unwrap();
    let available = h.pool.redemption_available(lender, tick, redemption_id);
    // Nothing has come back into this tick's `available` pool since the
    // draw, so the redemption is still pending.
    assert_eq!(available, 0);

    let bytes = receipt.encode();
    let owed = {
        let mut collaborators = collabs!(h);
        h.pool.repay(86_400, &bytes, borrower, None, None, &mut collaborators).unwrap()
    };
    assert_eq!(owed, receipt.repayment);
    assert_eq!(h.pool.loans(hash), LoanStatus::Repaid);
    assert_eq!(h.collateral.owner.borrow().get(&token_id), Some(&borrower));

    // Now that repayment landed back in the tick's `available`, the queued
    // redemption can be withdrawn.
    let withdrawable = h.pool.redemption_available(lender, tick, redemption_id);
    assert!(withdrawable > 0);
    let mut currency = MockCurrency::default();
    let withdrawn = h.pool.withdraw(lender, tick, redemption_id, &mut currency).unwrap();
    assert_eq!(withdrawn, withdrawable);
    assert_eq!(currency.balance(lender), withdrawn as i128);
}

#[test]
fn rebalance_moves_a_redemption_ticket_to_a_new_tick() {
    let mut h = Harness::new();
    let lender = Address::repeat_byte(1);
    let src = Tick::encode(10_000 * FP, 0, 0, 0).unwrap();
    let dst = Tick::encode(20_000 * FP, 0, 0, 0).unwrap();
    h.pool.ledger.deposit(lender, src, 1_000, 0, &h.pool.config.clone()).unwrap();
    h.pool.ledger.deposit(Address::repeat_byte(9), dst, 1_000, 0, &h.pool.config.clone()).unwrap();

    let redemption_id = h.pool.redeem(lender, src, 1_000).unwrap();
    // Nothing is drawn against `src`, so the full redemption settles
    // immediately and can be rebalanced into a fresh tick.
    let shares = h.pool.rebalance(lender, src, redemption_id, dst, 0).unwrap();
    assert!(shares > 0);
    assert_eq!(h.pool.deposits(lender, dst), shares);
}

#[test]
fn expired_loan_liquidates_with_shortfall_writing_down_lender_value() {
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
        let result = h.pool.liquidate(86_000, &bytes, &mut collaborators);
        assert!(matches!(result, Err(Error::LoanNotExpired)));
    }

    {
        let mut collaborators = collabs!(h);
        h.pool.liquidate(90_000, &bytes, &mut collaborators).unwrap();
    }
    assert_eq!(h.pool.loans(hash), LoanStatus::Liquidated);

    let mut collaborators = collabs!(h);
    h.pool.on_collateral_liquidated(&bytes, 600, None, None, &mut collaborators).unwrap();
    assert_eq!(h.pool.loans(hash), LoanStatus::CollateralLiquidated);

    let node = h.pool.liquidity_node(tick).unwrap();
    assert_eq!(node.value, 600);
    assert_eq!(h.pool.admin_fee_balance(), 0);
}

#[test]
fn admin_can_adjust_fee_config_and_withdraw_accrued_balance() {
    let mut h = Harness::new();
    let lender = Address::repeat_byte(1);
    let borrower = Address::repeat_byte(2);
    let recipient = Address::repeat_byte(5);
    let tick = Tick::encode(10_000 * FP, 0, 0, 0).unwrap();
    h.pool.ledger.deposit(lender, tick, 1_000, 0, &h.pool.config.clone()).unwrap();
    h.currency.credit(borrower, 10_000);

    h.pool.set_admin_fee(2_000, Some(recipient), 5_000).unwrap();

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

    // Half the accrued admin fee already went out to the fee-share
    // recipient immediately on repay.
    assert!(h.currency.balance(recipient) > 0);
    let remaining = h.pool.admin_fee_balance();
    assert!(remaining > 0);

    let mut currency = MockCurrency::default();
    let admin = Address::repeat_byte(0xFF);
    h.pool.withdraw_admin_fees(remaining, admin, &mut currency).unwrap();
    assert_eq!(h.pool.admin_fee_balance(), 0);
    assert_eq!(currency.balance(admin), remaining as i128);

    let over_withdraw = h.pool.withdraw_admin_fees(1, admin, &mut currency);
    assert!(matches!(over_withdraw, Err(Error::InvalidParameters(_))));
}
