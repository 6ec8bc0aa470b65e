//! Delegation hook (component G): tags 3/4 of the `options` blob name an
//! address to delegate the locked collateral to. Grant happens once per
//! locked `(token, id)` on borrow; revoke happens on repay, refinance, and
//! collateral liquidation. Both are idempotent set/clear calls from the
//! core's point of view — it never observes an intermediate state.

use alloy_primitives::{Address, U256};
use common_errors::Error;

use crate::external::DelegationRegistry;
use crate::options::Options;

pub fn grant(
    registry: &mut dyn DelegationRegistry,
    pool: Address,
    token: Address,
    id: U256,
    options: &Options,
) -> Result<(), Error> {
    if let Some(delegate) = options.delegate_v1 {
        registry.set_delegate(pool, delegate, token, id, true)?;
    }
    if let Some(delegate) = options.delegate_v2 {
        registry.set_delegate(pool, delegate, token, id, true)?;
    }
    Ok(())
}

pub fn revoke(
    registry: &mut dyn DelegationRegistry,
    pool: Address,
    token: Address,
    id: U256,
    options: &Options,
) -> Result<(), Error> {
    if let Some(delegate) = options.delegate_v1 {
        registry.set_delegate(pool, delegate, token, id, false)?;
    }
    if let Some(delegate) = options.delegate_v2 {
        registry.set_delegate(pool, delegate, token, id, false)?;
    }
    Ok(())
}
