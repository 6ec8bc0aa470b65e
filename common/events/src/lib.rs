//! Structured, tracing-based event emission. One function per economically
//! meaningful state transition, mirroring how the teacher's `common/events`
//! crate dedicates one on-chain event to each transition — here the event
//! sink is `tracing` instead of a chain log, so emission is purely
//! observational and never gates business logic.

use alloy_primitives::{Address, B256};
use common_structs::Tick;

pub fn deposit(tick: Tick, account: Address, amount: u128, shares_out: u128) {
    tracing::info!(tick = tick.0, %account, amount, shares_out, "deposit");
}

pub fn redeem(tick: Tick, account: Address, redemption_id: u64, shares_in: u128) {
    tracing::info!(tick = tick.0, %account, redemption_id, shares_in, "redeem");
}

pub fn withdraw(tick: Tick, account: Address, redemption_id: u64, shares_out: u128, amount_out: u128) {
    tracing::info!(tick = tick.0, %account, redemption_id, shares_out, amount_out, "withdraw");
}

pub fn rebalance(src: Tick, dst: Tick, account: Address, amount_out: u128, shares_out: u128) {
    tracing::info!(src_tick = src.0, dst_tick = dst.0, %account, amount_out, shares_out, "rebalance");
}

pub fn borrow(receipt_hash: B256, borrower: Address, principal: u128, repayment: u128, maturity: u64) {
    tracing::info!(%receipt_hash, %borrower, principal, repayment, maturity, "borrow");
}

pub fn repay(receipt_hash: B256, owed: u128, elapsed: u64) {
    tracing::info!(%receipt_hash, owed, elapsed, "repay");
}

pub fn refinance(old_hash: B256, new_hash: B256, net_difference: i128) {
    tracing::info!(old_hash = %old_hash, new_hash = %new_hash, net_difference, "refinance");
}

pub fn liquidate(receipt_hash: B256) {
    tracing::info!(%receipt_hash, "liquidate");
}

pub fn collateral_liquidated(receipt_hash: B256, proceeds: u128, lender_amount: u128, borrower_surplus: u128) {
    tracing::info!(%receipt_hash, proceeds, lender_amount, borrower_surplus, "collateral_liquidated");
}

pub fn admin_fee_accrued(receipt_hash: B256, amount: u128, recipient_share: u128) {
    tracing::info!(%receipt_hash, amount, recipient_share, "admin_fee_accrued");
}

pub fn tick_impaired(tick: Tick, value: u128, shares: u128) {
    tracing::warn!(tick = tick.0, value, shares, "tick_impaired");
}

pub fn tick_insolvent(tick: Tick, shares: u128) {
    tracing::warn!(tick = tick.0, shares, "tick_insolvent");
}

pub fn tick_garbage_collected(tick: Tick) {
    tracing::debug!(tick = tick.0, "tick_garbage_collected");
}
