//! The loan engine (spec components C, E, F, G, H): turns a liquidity
//! ledger and a set of external collaborators into the full borrow/repay/
//! refinance/liquidate lifecycle behind one [`LendingPool`] facade.

mod collateral;
mod delegation;
mod external;
mod loan;
mod options;
mod receipt;
mod reentrancy;
mod sourcing;

pub use external::{CollateralLiquidator, CollateralToken, CurrencyToken, DelegationRegistry};
pub use loan::{Collaborators, LendingPool};
pub use options::Options;
pub use receipt::{LoanReceipt, NodeReceipt, CURRENT_VERSION};
