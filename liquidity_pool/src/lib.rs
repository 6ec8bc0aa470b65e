//! The liquidity ledger (spec components A/D): an ordered map of ticks,
//! each a share-accounted pool of currency with its own FIFO redemption
//! queue, plus the node-level mutations that loan sourcing/repayment/
//! liquidation apply on top.

mod deposit;
mod node;
mod redemption;
mod sourcing;
mod storage;
mod ticket;
mod view;

pub use node::{Node, DEFAULT_IMPAIRMENT_THRESHOLD_BPS};
pub use sourcing::DrawAllocation;
pub use storage::Ledger;
pub use ticket::{DepositRecord, RedemptionTicket, TicketKey};
pub use view::{NodeView, RedemptionView};
