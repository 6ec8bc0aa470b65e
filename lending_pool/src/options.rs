//! The `options` TLV blob (spec §4.G/§4.H): a sequence of `(tag u16, length
//! u16, value bytes)` records. Four tags are recognized; any other tag is
//! skipped rather than rejected — the spec defines no mandatory/optional
//! bit on the tag itself, so an unrecognized record is simply inert data a
//! future tag can occupy without breaking older callers.

use alloy_primitives::Address;
use common_errors::Error;

const TAG_WRAPPER_CONTEXT: u16 = 1;
const TAG_MERKLE_PROOF: u16 = 2;
const TAG_DELEGATE_V1: u16 = 3;
const TAG_DELEGATE_V2: u16 = 4;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    pub wrapper_context: Option<Vec<u8>>,
    pub merkle_proof: Option<Vec<u8>>,
    pub delegate_v1: Option<Address>,
    pub delegate_v2: Option<Address>,
}

impl Options {
    pub fn parse(bytes: &[u8]) -> Result<Options, Error> {
        let mut options = Options::default();
        let mut cursor = 0usize;
        while cursor < bytes.len() {
            if cursor + 4 > bytes.len() {
                return Err(Error::InvalidParameters("truncated TLV header"));
            }
            let tag = u16::from_be_bytes([bytes[cursor], bytes[cursor + 1]]);
            let len = u16::from_be_bytes([bytes[cursor + 2], bytes[cursor + 3]]) as usize;
            cursor += 4;
            if cursor + len > bytes.len() {
                return Err(Error::InvalidParameters("truncated TLV value"));
            }
            let value = &bytes[cursor..cursor + len];
            cursor += len;
            match tag {
                TAG_WRAPPER_CONTEXT => options.wrapper_context = Some(value.to_vec()),
                TAG_MERKLE_PROOF => options.merkle_proof = Some(value.to_vec()),
                TAG_DELEGATE_V1 => {
                    options.delegate_v1 = Some(parse_address(value)?);
                }
                TAG_DELEGATE_V2 => {
                    options.delegate_v2 = Some(parse_address(value)?);
                }
                _ => {}
            }
        }
        Ok(options)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        if let Some(ctx) = &self.wrapper_context {
            push_record(&mut buf, TAG_WRAPPER_CONTEXT, ctx);
        }
        if let Some(proof) = &self.merkle_proof {
            push_record(&mut buf, TAG_MERKLE_PROOF, proof);
        }
        if let Some(addr) = &self.delegate_v1 {
            push_record(&mut buf, TAG_DELEGATE_V1, addr.as_slice());
        }
        if let Some(addr) = &self.delegate_v2 {
            push_record(&mut buf, TAG_DELEGATE_V2, addr.as_slice());
        }
        buf
    }
}

fn parse_address(value: &[u8]) -> Result<Address, Error> {
    if value.len() != 20 {
        return Err(Error::InvalidParameters("delegate tag must carry a 20-byte address"));
    }
    Ok(Address::from_slice(value))
}

fn push_record(buf: &mut Vec<u8>, tag: u16, value: &[u8]) {
    buf.extend_from_slice(&tag.to_be_bytes());
    buf.extend_from_slice(&(value.len() as u16).to_be_bytes());
    buf.extend_from_slice(value);
}
