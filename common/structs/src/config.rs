//! Immutable-after-init pool parameters (spec §3 "Pool parameters"), plus
//! the small set of fields that remain mutable post-init (admin fee rate and
//! recipient/split).

use alloy_primitives::{Address, U256};
use common_errors::Error;
use serde::{Deserialize, Serialize};

use crate::tick::MAX_CLASSES;

/// Which collateral a pool will accept, resolved from `(underlying_token,
/// ids[])` by the collateral-wrapper hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollateralFilter {
    SingleCollection { collection: Address },
    SetCollection { collection: Address, ids: Vec<U256> },
    MerkleCollection { collection: Address, root: [u8; 32], depth: u8 },
}

impl CollateralFilter {
    pub fn collection(&self) -> Address {
        match self {
            CollateralFilter::SingleCollection { collection }
            | CollateralFilter::SetCollection { collection, .. }
            | CollateralFilter::MerkleCollection { collection, .. } => *collection,
        }
    }
}

/// The admin fee's two-pocket ledger configuration: a rate applied to gross
/// interest, and an optional recipient that receives a basis-point split of
/// that fee immediately on repay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminFeeConfig {
    pub rate_bps: u16,
    pub fee_share_recipient: Option<Address>,
    pub fee_share_split_bps: u16,
}

impl AdminFeeConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.rate_bps > 10_000 {
            return Err(Error::InvalidParameters("admin fee rate exceeds 10000 bps"));
        }
        if self.fee_share_split_bps > 10_000 {
            return Err(Error::InvalidParameters("fee share split exceeds 10000 bps"));
        }
        Ok(())
    }
}

/// The pair of utilization thresholds that the sourcing/quoting rate model
/// references to cap a loan's draw against a single tick's limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtilizationMultiplier {
    pub min_utilization_bps: u16,
    pub max_utilization_bps: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub currency_token: Address,
    pub collateral_filter: CollateralFilter,
    /// Ascending, at most 8 entries; index is the tick's `duration_class`.
    pub duration_table: Vec<u64>,
    /// Ascending, at most 8 entries, already per-second normalized; index
    /// is the tick's `rate_class`.
    pub rate_table: Vec<u128>,
    /// At most 3 registered wrapper contracts.
    pub collateral_wrappers: Vec<Address>,
    pub utilization_multiplier: UtilizationMultiplier,
    pub tick_limit_spacing_bps: u16,
    /// Share-price ratio (scaled by FP) below which a tick is impaired;
    /// spec's default is one-twentieth of the tick's own limit, expressed
    /// here as a basis-point fraction of `limit` for a tick-independent
    /// constant.
    pub impairment_threshold_bps: u16,
    pub admin_fee: AdminFeeConfig,
    /// Surplus split paid to the borrower on collateral liquidation
    /// (default 9500 bps = 95%).
    pub borrower_surplus_split_bps: u16,
}

impl PoolConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.duration_table.is_empty() || self.duration_table.len() > MAX_CLASSES {
            return Err(Error::InvalidParameters("duration table must have 1..=8 entries"));
        }
        if !self.duration_table.windows(2).all(|w| w[0] < w[1]) {
            return Err(Error::InvalidParameters("duration table must be strictly ascending"));
        }
        if self.rate_table.is_empty() || self.rate_table.len() > MAX_CLASSES {
            return Err(Error::InvalidParameters("rate table must have 1..=8 entries"));
        }
        if !self.rate_table.windows(2).all(|w| w[0] < w[1]) {
            return Err(Error::InvalidParameters("rate table must be strictly ascending"));
        }
        if self.collateral_wrappers.len() > 3 {
            return Err(Error::InvalidParameters("at most 3 collateral wrapper contracts"));
        }
        if self.tick_limit_spacing_bps == 0 {
            return Err(Error::InvalidParameters("tick spacing must be positive"));
        }
        if self.borrower_surplus_split_bps > 10_000 {
            return Err(Error::InvalidParameters("borrower surplus split exceeds 10000 bps"));
        }
        self.admin_fee.validate()?;
        Ok(())
    }

    pub fn is_wrapper(&self, contract: Address) -> bool {
        self.collateral_wrappers.contains(&contract)
    }

    /// The smallest duration-class index whose table entry is `>= duration`,
    /// or `None` if no class fits.
    pub fn duration_class_for(&self, duration: u64) -> Option<u8> {
        if duration == 0 {
            return None;
        }
        self.duration_table
            .iter()
            .position(|&d| d >= duration)
            .map(|i| i as u8)
    }

    pub fn rate_for_class(&self, rate_class: u8) -> Option<u128> {
        self.rate_table.get(rate_class as usize).copied()
    }
}
