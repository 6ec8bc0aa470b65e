//! Tick codec (component A): packs `(limit, duration_class, rate_class,
//! reserved)` into a single ordered `u128` key.
//!
//! Bit layout, MSB to LSB: `limit(120) | duration_class(3) | rate_class(3) |
//! reserved(2)`. Natural numeric order of the packed key is the tick
//! ordering the ledger sorts on — `limit` dominates the comparison since it
//! occupies the high bits, so within one `(duration_class, rate_class)` pair
//! ticks sort exactly by `limit`.

use common_errors::Error;

const RESERVED_BITS: u32 = 2;
const RATE_CLASS_BITS: u32 = 3;
const DURATION_CLASS_BITS: u32 = 3;
const CLASS_MASK: u128 = 0b111;
const RESERVED_MASK: u128 = 0b11;

const RATE_CLASS_SHIFT: u32 = RESERVED_BITS;
const DURATION_CLASS_SHIFT: u32 = RESERVED_BITS + RATE_CLASS_BITS;
const LIMIT_SHIFT: u32 = RESERVED_BITS + RATE_CLASS_BITS + DURATION_CLASS_BITS;

/// Maximum number of entries in a pool's duration/rate table (3 bits of
/// class index).
pub const MAX_CLASSES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tick(pub u128);

impl Tick {
    /// Packs the four fields into a tick key. Rejects a zero `limit`, any
    /// class index that doesn't fit in 3 bits, and any nonzero `reserved`
    /// bits.
    pub fn encode(
        limit: u128,
        duration_class: u8,
        rate_class: u8,
        reserved: u8,
    ) -> Result<Tick, Error> {
        if limit == 0 {
            return Err(Error::InvalidTick("limit must be nonzero"));
        }
        if limit >> (128 - LIMIT_SHIFT) != 0 {
            return Err(Error::InvalidTick("limit exceeds 120 bits"));
        }
        if duration_class as u128 > CLASS_MASK {
            return Err(Error::InvalidTick("duration_class exceeds 3 bits"));
        }
        if rate_class as u128 > CLASS_MASK {
            return Err(Error::InvalidTick("rate_class exceeds 3 bits"));
        }
        if reserved as u128 > RESERVED_MASK || reserved != 0 {
            return Err(Error::InvalidTick("reserved bits must be zero"));
        }
        let packed = (limit << LIMIT_SHIFT)
            | ((duration_class as u128) << DURATION_CLASS_SHIFT)
            | ((rate_class as u128) << RATE_CLASS_SHIFT)
            | (reserved as u128);
        Ok(Tick(packed))
    }

    /// Pure unpack; does not validate against a pool's class tables.
    pub fn decode(self) -> (u128, u8, u8, u8) {
        let limit = self.0 >> LIMIT_SHIFT;
        let duration_class = ((self.0 >> DURATION_CLASS_SHIFT) & CLASS_MASK) as u8;
        let rate_class = ((self.0 >> RATE_CLASS_SHIFT) & CLASS_MASK) as u8;
        let reserved = (self.0 & RESERVED_MASK) as u8;
        (limit, duration_class, rate_class, reserved)
    }

    pub fn limit(self) -> u128 {
        self.decode().0
    }

    pub fn duration_class(self) -> u8 {
        self.decode().1
    }

    pub fn rate_class(self) -> u8 {
        self.decode().2
    }

    /// The always-present sentinel node at key zero. Not a valid tick for
    /// deposits (`encode` rejects a zero limit); it exists purely as the
    /// sorted list's head.
    pub fn sentinel() -> Tick {
        Tick(0)
    }

    pub fn is_sentinel(self) -> bool {
        self.0 == 0
    }

    /// Validates the tick's class indices against a pool's duration/rate
    /// table lengths. Pure pack/unpack validation (zero limit, reserved
    /// bits) already happened in `encode`; this is the pool-aware half of
    /// "Indices out of table range are invalid" from the spec.
    pub fn validate_classes(self, duration_table_len: usize, rate_table_len: usize) -> Result<(), Error> {
        let (_, duration_class, rate_class, _) = self.decode();
        if duration_class as usize >= duration_table_len {
            return Err(Error::InvalidTick("duration_class out of table range"));
        }
        if rate_class as usize >= rate_table_len {
            return Err(Error::InvalidTick("rate_class out of table range"));
        }
        Ok(())
    }

    /// Same `(duration_class, rate_class)` pair — the two ticks belong to
    /// the same tranche and are therefore subject to the minimum
    /// tick-spacing predicate against each other.
    pub fn same_class(self, other: Tick) -> bool {
        self.duration_class() == other.duration_class() && self.rate_class() == other.rate_class()
    }

    /// The minimum-spacing predicate from spec §4.A: a new tick's limit must
    /// differ from an existing same-class neighbor's limit by at least the
    /// configured spacing ratio. `spacing_bps` is basis points, e.g. `500`
    /// for 5%.
    pub fn spacing_ok(lower_limit: u128, higher_limit: u128, spacing_bps: u16) -> bool {
        if higher_limit <= lower_limit {
            return false;
        }
        // higher >= lower * (1 + spacing_bps / 10000)
        // <=> higher * 10000 >= lower * (10000 + spacing_bps)
        let lhs = higher_limit.saturating_mul(10_000);
        let rhs = lower_limit.saturating_mul(10_000u128 + spacing_bps as u128);
        lhs >= rhs
    }
}

impl From<Tick> for u128 {
    fn from(t: Tick) -> u128 {
        t.0
    }
}
