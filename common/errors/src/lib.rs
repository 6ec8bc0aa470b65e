//! Stable, named error variants shared by every crate in the pool.
//!
//! Every public operation on the pool returns `Result<T, Error>`. Per the
//! error-handling design, failures are always atomic: a call that returns
//! `Err` must not have mutated any ledger state. The variant names below are
//! load-bearing — callers match on them by name, not by message text.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid tick: {0}")]
    InvalidTick(&'static str),

    #[error("insufficient tick spacing")]
    InsufficientTickSpacing,

    #[error("tick is impaired or insolvent: {0}")]
    InactiveLiquidity(&'static str),

    #[error("invalid parameters: {0}")]
    InvalidParameters(&'static str),

    #[error("insufficient shares minted")]
    InsufficientShares,

    #[error("insufficient liquidity to source the requested principal")]
    InsufficientLiquidity,

    #[error("collateral does not satisfy the pool's collateral filter")]
    UnsupportedCollateral,

    #[error("no duration class covers the requested duration")]
    UnsupportedLoanDuration,

    #[error("quoted repayment exceeds the caller's maximum")]
    RepaymentTooHigh,

    #[error("caller is not the loan's borrower")]
    InvalidCaller,

    #[error("loan receipt is not valid for this operation: {0}")]
    InvalidLoanReceipt(&'static str),

    #[error("receipt bytes do not decode to a well-formed receipt")]
    InvalidReceiptEncoding,

    #[error("receipt version is not supported by this pool")]
    UnsupportedReceiptVersion,

    #[error("loan has not yet reached maturity")]
    LoanNotExpired,

    #[error("redemption ticket does not exist or is already fully settled")]
    InvalidRedemptionStatus,

    #[error("reentrant call into a guarded operation")]
    Reentrancy,
}

impl Error {
    /// Arithmetic overflow is fatal per the spec and surfaces to callers as
    /// `InvalidParameters` — the core never partially computes a result.
    pub fn overflow(context: &'static str) -> Self {
        Error::InvalidParameters(context)
    }
}

pub type Result<T> = core::result::Result<T, Error>;
