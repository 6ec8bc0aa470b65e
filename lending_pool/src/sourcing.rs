//! Loan ingress (component E): turns a borrower's requested principal,
//! duration, collateral, and caller-supplied tick list into a quoted
//! repayment and the per-tick draw the liquidity ledger will apply.

use alloy_primitives::{Address, U256};
use common_errors::Error;
use common_math::{self as math, FP};
use common_structs::{PoolConfig, Tick};
use liquidity_pool::{DrawAllocation, Ledger};

use crate::collateral::{self, ResolvedCollateral};
use crate::options::Options;

pub struct Quote {
    /// Full amount the borrower owes at maturity: principal + gross interest.
    pub repayment: u128,
    /// The admin's cut of the gross interest, already split out of
    /// `repayment` so `allocations` sum to `repayment - admin_fee`.
    pub admin_fee: u128,
    /// One entry per tick actually drawn on, in ascending tick order. Each
    /// entry's `pending` is this tick's pro-rated share of `repayment -
    /// admin_fee`, the last entry absorbing whatever remainder integer
    /// division leaves behind.
    pub allocations: Vec<DrawAllocation>,
    pub resolved: ResolvedCollateral,
}

/// Walks the caller's ticks in order, consuming liquidity under each
/// tick's cumulative limit, and prices the draw at the used-weighted rate.
pub fn quote(
    ledger: &Ledger,
    config: &PoolConfig,
    principal: u128,
    duration: u64,
    collateral_token: Address,
    token_id: U256,
    ticks: &[Tick],
    options: &Options,
) -> Result<Quote, Error> {
    if principal == 0 {
        return Err(Error::InvalidParameters("principal must be positive"));
    }
    let resolved = collateral::resolve(config, collateral_token, token_id, options)?;
    collateral::validate(&config.collateral_filter, &resolved, options)?;

    let required_duration_class = config.duration_class_for(duration).ok_or(Error::UnsupportedLoanDuration)?;

    let mut used_per_tick = Vec::with_capacity(ticks.len());
    let mut total_used: u128 = 0;
    let mut min_duration_class = required_duration_class;
    let mut min_rate_class = 0u8;
    let mut prev_key: Option<u128> = None;

    for &tick in ticks {
        if let Some(prev) = prev_key {
            if tick.0 <= prev {
                return Err(Error::InvalidTick("tick list must strictly increase"));
            }
        }
        prev_key = Some(tick.0);
        tick.validate_classes(config.duration_table.len(), config.rate_table.len())?;

        if tick.duration_class() < min_duration_class {
            return Err(Error::UnsupportedLoanDuration);
        }
        min_duration_class = tick.duration_class();
        if tick.rate_class() < min_rate_class {
            return Err(Error::InvalidTick("rate class must be non-decreasing across the tick list"));
        }
        min_rate_class = tick.rate_class();

        if total_used == principal {
            break;
        }
        let node = ledger.node(tick).ok_or(Error::InvalidTick("tick does not exist"))?;

        let cap = tick.limit().saturating_mul(resolved.multiplier);
        let remaining_under_cap = cap.saturating_sub(total_used);
        let remaining_principal = principal - total_used;
        let used = remaining_under_cap.min(node.available).min(remaining_principal);

        if used > 0 {
            used_per_tick.push((tick, used));
            total_used = math::add(total_used, used)?;
        }
    }

    if total_used < principal {
        return Err(Error::InsufficientLiquidity);
    }

    let mut weighted_numerator = alloy_primitives::U256::ZERO;
    for (tick, used) in &used_per_tick {
        let rate = config.rate_for_class(tick.rate_class()).ok_or(Error::InvalidTick("rate_class out of table range"))?;
        weighted_numerator = weighted_numerator
            .checked_add(math::widen_mul(*used, rate)?)
            .ok_or(Error::overflow("weighted rate accumulation"))?;
    }
    let weighted_rate = if total_used == 0 {
        0
    } else {
        math::narrow_from(weighted_numerator / alloy_primitives::U256::from(total_used), "weighted rate narrow")?
    };

    let interest_numerator = math::widen_mul(principal, weighted_rate)?
        .checked_mul(alloy_primitives::U256::from(duration))
        .ok_or(Error::overflow("interest numerator"))?;
    let interest = math::narrow_from(interest_numerator / alloy_primitives::U256::from(FP), "interest narrow")?;
    let repayment = math::add(principal, interest)?;
    let admin_fee = math::bps_of(interest, config.admin_fee.rate_bps)?;
    let lender_pending_total = math::sub(repayment, admin_fee)?;

    // Distribute the lenders' due across the ticks actually drawn on, in
    // proportion to each tick's `used` share of `total_used`; the last tick
    // absorbs whatever integer-division remainder the others left behind,
    // so the allocations always sum to exactly `lender_pending_total`.
    let mut allocations = Vec::with_capacity(used_per_tick.len());
    let mut distributed = 0u128;
    let n = used_per_tick.len();
    for (i, (tick, used)) in used_per_tick.iter().enumerate() {
        let pending = if i + 1 == n {
            math::sub(lender_pending_total, distributed)?
        } else {
            math::widen_mul(lender_pending_total, *used)?
                .checked_div(alloy_primitives::U256::from(total_used))
                .ok_or(Error::overflow("pending distribution div by zero"))
                .and_then(|v| math::narrow_from(v, "pending distribution narrow"))?
        };
        distributed = math::add(distributed, pending)?;
        allocations.push(DrawAllocation { tick: *tick, used: *used, pending });
    }

    Ok(Quote { repayment, admin_fee, allocations, resolved })
}
