//! Loan receipt codec (component C): a deterministic binary encoding whose
//! hash is the loan's identity. Any bit flipped — including `maturity` —
//! hashes differently, which is what makes the hash double as the
//! replay-prevention key.
//!
//! Wire format, big-endian: `version(1) . principal(32) . repayment(32) .
//! admin_fee(32) . borrower(20) . maturity(8) . duration(8) .
//! collateral_token(20) . collateral_token_id(32) . ctx_len(2) .
//! ctx(ctx_len) . [tick(16) used(16) pending(16)]*n`. The fixed portion
//! ahead of `ctx` is 187 bytes; total length is `187 + ctx_len + 48*n`.

use alloy_primitives::{keccak256, Address, B256, U256};
use common_errors::Error;

pub const CURRENT_VERSION: u8 = 2;
const FIXED_HEADER: usize = 187;
const NODE_RECEIPT_WIDTH: usize = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeReceipt {
    pub tick: u128,
    pub used: u128,
    pub pending: u128,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanReceipt {
    pub version: u8,
    pub principal: u128,
    pub repayment: u128,
    pub admin_fee: u128,
    pub borrower: Address,
    pub maturity: u64,
    pub duration: u64,
    pub collateral_token: Address,
    pub collateral_token_id: U256,
    pub context: Vec<u8>,
    pub node_receipts: Vec<NodeReceipt>,
}

impl LoanReceipt {
    /// The loan's origination timestamp, derivable from `maturity` and
    /// `duration` rather than stored separately on the wire.
    pub fn origination_time(&self) -> u64 {
        self.maturity - self.duration
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(FIXED_HEADER + self.context.len() + NODE_RECEIPT_WIDTH * self.node_receipts.len());
        buf.push(self.version);
        buf.extend_from_slice(&U256::from(self.principal).to_be_bytes::<32>());
        buf.extend_from_slice(&U256::from(self.repayment).to_be_bytes::<32>());
        buf.extend_from_slice(&U256::from(self.admin_fee).to_be_bytes::<32>());
        buf.extend_from_slice(self.borrower.as_slice());
        buf.extend_from_slice(&self.maturity.to_be_bytes());
        buf.extend_from_slice(&self.duration.to_be_bytes());
        buf.extend_from_slice(self.collateral_token.as_slice());
        buf.extend_from_slice(&self.collateral_token_id.to_be_bytes::<32>());
        buf.extend_from_slice(&(self.context.len() as u16).to_be_bytes());
        buf.extend_from_slice(&self.context);
        for nr in &self.node_receipts {
            buf.extend_from_slice(&nr.tick.to_be_bytes());
            buf.extend_from_slice(&nr.used.to_be_bytes());
            buf.extend_from_slice(&nr.pending.to_be_bytes());
        }
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<LoanReceipt, Error> {
        if bytes.len() < FIXED_HEADER {
            return Err(Error::InvalidReceiptEncoding);
        }
        let version = bytes[0];
        if version != CURRENT_VERSION {
            return Err(Error::UnsupportedReceiptVersion);
        }
        let principal = u128::try_from(U256::from_be_slice(&bytes[1..33])).map_err(|_| Error::InvalidReceiptEncoding)?;
        let repayment = u128::try_from(U256::from_be_slice(&bytes[33..65])).map_err(|_| Error::InvalidReceiptEncoding)?;
        let admin_fee = u128::try_from(U256::from_be_slice(&bytes[65..97])).map_err(|_| Error::InvalidReceiptEncoding)?;
        let borrower = Address::from_slice(&bytes[97..117]);
        let maturity = u64::from_be_bytes(bytes[117..125].try_into().unwrap());
        let duration = u64::from_be_bytes(bytes[125..133].try_into().unwrap());
        let collateral_token = Address::from_slice(&bytes[133..153]);
        let collateral_token_id = U256::from_be_slice(&bytes[153..185]);
        let ctx_len = u16::from_be_bytes(bytes[185..187].try_into().unwrap()) as usize;

        if bytes.len() < FIXED_HEADER + ctx_len {
            return Err(Error::InvalidReceiptEncoding);
        }
        let context = bytes[FIXED_HEADER..FIXED_HEADER + ctx_len].to_vec();
        let rest = &bytes[FIXED_HEADER + ctx_len..];
        if rest.len() % NODE_RECEIPT_WIDTH != 0 {
            return Err(Error::InvalidReceiptEncoding);
        }
        let node_receipts = rest
            .chunks(NODE_RECEIPT_WIDTH)
            .map(|chunk| NodeReceipt {
                tick: u128::from_be_bytes(chunk[0..16].try_into().unwrap()),
                used: u128::from_be_bytes(chunk[16..32].try_into().unwrap()),
                pending: u128::from_be_bytes(chunk[32..48].try_into().unwrap()),
            })
            .collect();

        Ok(LoanReceipt {
            version,
            principal,
            repayment,
            admin_fee,
            borrower,
            maturity,
            duration,
            collateral_token,
            collateral_token_id,
            context,
            node_receipts,
        })
    }

    pub fn hash(&self) -> B256 {
        keccak256(self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LoanReceipt {
        LoanReceipt {
            version: CURRENT_VERSION,
            principal: 1_000,
            repayment: 1_050,
            admin_fee: 5,
            borrower: Address::repeat_byte(1),
            maturity: 1_000_000,
            duration: 86_400,
            collateral_token: Address::repeat_byte(2),
            collateral_token_id: U256::from(42u64),
            context: vec![1, 2, 3],
            node_receipts: vec![NodeReceipt { tick: 10, used: 900, pending: 945 }],
        }
    }

    #[test]
    fn encode_decode_roundtrip() {
        let receipt = sample();
        let bytes = receipt.encode();
        assert_eq!(bytes.len(), 187 + 3 + 48);
        let decoded = LoanReceipt::decode(&bytes).unwrap();
        assert_eq!(decoded, receipt);
    }

    #[test]
    fn unsupported_version_rejected() {
        let mut bytes = sample().encode();
        bytes[0] = 1;
        assert!(matches!(LoanReceipt::decode(&bytes), Err(Error::UnsupportedReceiptVersion)));
    }

    #[test]
    fn truncated_bytes_rejected() {
        let bytes = sample().encode();
        assert!(matches!(
            LoanReceipt::decode(&bytes[..bytes.len() - 10]),
            Err(Error::InvalidReceiptEncoding)
        ));
    }

    #[test]
    fn hash_changes_with_any_bit_including_maturity() {
        let a = sample();
        let mut b = sample();
        b.maturity += 1;
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn origination_time_derives_from_maturity_and_duration() {
        let r = sample();
        assert_eq!(r.origination_time(), 1_000_000 - 86_400);
    }
}
