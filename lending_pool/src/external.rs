//! Contracts for the collaborators the spec keeps deliberately out of the
//! core: the currency token, the collateral NFT, the external collateral
//! liquidator, and the delegation registry (spec §6). The loan engine never
//! talks to a concrete chain; it talks to these traits, so tests supply
//! mock doubles and a real deployment supplies chain-backed adapters.

use alloy_primitives::{Address, U256};
use common_errors::Error;

pub trait CurrencyToken {
    fn transfer_from(&mut self, from: Address, to: Address, amount: u128) -> Result<(), Error>;
    fn transfer(&mut self, to: Address, amount: u128) -> Result<(), Error>;
    fn balance_of(&self, account: Address) -> Result<u128, Error>;
}

pub trait CollateralToken {
    fn transfer_from(&mut self, from: Address, to: Address, id: U256) -> Result<(), Error>;
    fn batch_transfer_from(&mut self, from: Address, to: Address, ids: &[U256]) -> Result<(), Error>;
}

pub trait CollateralLiquidator {
    fn withdraw_collateral(&mut self, pool: Address, token: Address, id: U256) -> Result<(), Error>;
    fn liquidate_collateral(&mut self, pool: Address, token: Address, id: U256) -> Result<(), Error>;
}

pub trait DelegationRegistry {
    fn set_delegate(
        &mut self,
        pool: Address,
        delegate: Address,
        token: Address,
        id: U256,
        on: bool,
    ) -> Result<(), Error>;
}
