//! Types shared between the liquidity ledger and the loan engine: the tick
//! key, the collateral filter, the loan status enum and the immutable pool
//! parameter bundle.

pub mod config;
pub mod loan_status;
pub mod tick;

pub use config::{AdminFeeConfig, CollateralFilter, PoolConfig, UtilizationMultiplier};
pub use loan_status::LoanStatus;
pub use tick::Tick;
