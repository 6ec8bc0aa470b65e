//! Per-receipt-hash loan status, keyed externally by the caller on the
//! receipt hash produced by the receipt codec.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum LoanStatus {
    #[default]
    None = 0,
    Active = 1,
    Repaid = 2,
    Liquidated = 3,
    CollateralLiquidated = 4,
}

impl LoanStatus {
    /// Any status other than `None` implies the receipt was produced by
    /// this pool at some point.
    pub fn was_produced_by_pool(self) -> bool {
        !matches!(self, LoanStatus::None)
    }

    pub fn is_active(self) -> bool {
        matches!(self, LoanStatus::Active)
    }

    pub fn is_retired(self) -> bool {
        matches!(
            self,
            LoanStatus::Repaid | LoanStatus::Liquidated | LoanStatus::CollateralLiquidated
        )
    }
}
