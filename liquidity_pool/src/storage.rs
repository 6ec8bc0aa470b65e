//! The ledger itself: an ordered map of ticks to nodes, plus the per-account
//! deposit and redemption-ticket tables.
//!
//! The teacher's liquidity pool keeps one `StorageMapper` per scalar; here
//! the whole thing is one in-memory `Ledger` value the embedding
//! application owns and persists, matching the re-architecting guidance in
//! the spec's design notes: an intrusive sorted linked list becomes an
//! ordered map keyed by the tick, with O(log n) splice instead of O(1), and
//! no sentinel pointers to manage by hand.

use std::collections::{BTreeMap, HashMap};

use alloy_primitives::Address;
use common_errors::Error;
use common_structs::{PoolConfig, Tick};

use crate::node::Node;
use crate::ticket::{DepositRecord, RedemptionTicket, TicketKey};

#[derive(Debug, Clone, Default)]
pub struct Ledger {
    pub(crate) nodes: BTreeMap<u128, Node>,
    pub(crate) deposits: HashMap<(Address, u128), DepositRecord>,
    pub(crate) tickets: HashMap<TicketKey, RedemptionTicket>,
}

impl Ledger {
    pub fn new() -> Ledger {
        let mut nodes = BTreeMap::new();
        nodes.insert(0, Node::sentinel());
        Ledger {
            nodes,
            deposits: HashMap::new(),
            tickets: HashMap::new(),
        }
    }

    pub fn node(&self, tick: Tick) -> Option<&Node> {
        self.nodes.get(&tick.0)
    }

    pub fn node_mut(&mut self, tick: Tick) -> Option<&mut Node> {
        self.nodes.get_mut(&tick.0)
    }

    /// All live nodes in ascending tick order, sentinel included — matches
    /// the `liquidity_nodes` operation in the spec's operation surface.
    pub fn nodes_ascending(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn deposit_record(&self, account: Address, tick: Tick) -> Option<&DepositRecord> {
        self.deposits.get(&(account, tick.0))
    }

    pub fn ticket(&self, account: Address, tick: Tick, redemption_id: u64) -> Option<&RedemptionTicket> {
        self.tickets.get(&(account, tick.0, redemption_id))
    }

    /// Finds the nearest existing nodes below and above `tick` that share
    /// its `(duration_class, rate_class)` pair — the neighbors the spacing
    /// predicate is checked against. Ticks of other class pairs interleave
    /// numerically but belong to unrelated tranches, so they are skipped.
    pub(crate) fn same_class_neighbors(&self, tick: Tick) -> (Option<&Node>, Option<&Node>) {
        let lower = self
            .nodes
            .range(..tick.0)
            .rev()
            .map(|(_, n)| n)
            .find(|n| n.tick.is_sentinel() || n.tick.same_class(tick));
        let lower = lower.filter(|n| !n.tick.is_sentinel());
        let upper = self
            .nodes
            .range((tick.0 + 1)..)
            .map(|(_, n)| n)
            .find(|n| n.tick.same_class(tick));
        (lower, upper)
    }

    /// Gets the node for `tick`, creating it (subject to spacing validation
    /// against same-class neighbors) if it does not yet exist.
    pub(crate) fn get_or_create_node(&mut self, tick: Tick, config: &PoolConfig) -> Result<(), Error> {
        if self.nodes.contains_key(&tick.0) {
            return Ok(());
        }
        let (lower, upper) = self.same_class_neighbors(tick);
        if let Some(lower) = lower {
            if !Tick::spacing_ok(lower.tick.limit(), tick.limit(), config.tick_limit_spacing_bps) {
                return Err(Error::InsufficientTickSpacing);
            }
        }
        if let Some(upper) = upper {
            if !Tick::spacing_ok(tick.limit(), upper.tick.limit(), config.tick_limit_spacing_bps) {
                return Err(Error::InsufficientTickSpacing);
            }
        }
        self.nodes.insert(tick.0, Node::new(tick));
        Ok(())
    }

    /// Unlinks `tick`'s node if it satisfies the GC predicate. The sentinel
    /// is never collected.
    pub(crate) fn try_gc(&mut self, tick: Tick) {
        if tick.is_sentinel() {
            return;
        }
        if let Some(node) = self.nodes.get(&tick.0) {
            if node.is_collectible() {
                self.nodes.remove(&tick.0);
                common_events::tick_garbage_collected(tick);
            }
        }
    }
}
