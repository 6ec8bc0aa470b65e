//! Collateral wrapper hook (component H): resolves whatever collateral
//! reference the caller supplied into the canonical `(underlying_token,
//! ids[])` pair the pool's filter actually checks, and reports the
//! multiplier that scales a loan's tick limits for a bundle of NFTs.

use alloy_primitives::{keccak256, Address, B256, U256};
use common_errors::Error;
use common_structs::CollateralFilter;

use crate::options::Options;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCollateral {
    pub underlying_token: Address,
    pub ids: Vec<U256>,
    pub multiplier: u128,
}

/// Decodes a wrapper's tag-1 context: `underlying_token(20) . ids_len(2) .
/// [id(32)]*ids_len`.
fn decode_wrapper_context(context: &[u8]) -> Result<(Address, Vec<U256>), Error> {
    if context.len() < 22 {
        return Err(Error::InvalidParameters("wrapper context too short"));
    }
    let underlying_token = Address::from_slice(&context[0..20]);
    let ids_len = u16::from_be_bytes(context[20..22].try_into().unwrap()) as usize;
    let expected_len = 22 + ids_len * 32;
    if context.len() != expected_len {
        return Err(Error::InvalidParameters("wrapper context length mismatch"));
    }
    let ids = context[22..]
        .chunks(32)
        .map(U256::from_be_slice)
        .collect();
    Ok((underlying_token, ids))
}

/// Resolves `(collateral_token, token_id, count)` to the canonical pair,
/// via the wrapper hook when `collateral_token` is a registered wrapper.
pub fn resolve(
    config: &common_structs::PoolConfig,
    collateral_token: Address,
    token_id: U256,
    options: &Options,
) -> Result<ResolvedCollateral, Error> {
    if config.is_wrapper(collateral_token) {
        let context = options
            .wrapper_context
            .as_deref()
            .ok_or(Error::InvalidParameters("wrapper collateral requires a tag-1 context"))?;
        let (underlying_token, ids) = decode_wrapper_context(context)?;
        let multiplier = ids.len() as u128;
        Ok(ResolvedCollateral { underlying_token, ids, multiplier })
    } else {
        Ok(ResolvedCollateral {
            underlying_token: collateral_token,
            ids: vec![token_id],
            multiplier: 1,
        })
    }
}

/// Validates a resolved collateral reference against the pool's filter.
pub fn validate(
    filter: &CollateralFilter,
    resolved: &ResolvedCollateral,
    options: &Options,
) -> Result<(), Error> {
    match filter {
        CollateralFilter::SingleCollection { collection } => {
            if resolved.underlying_token != *collection {
                return Err(Error::UnsupportedCollateral);
            }
            Ok(())
        }
        CollateralFilter::SetCollection { collection, ids } => {
            if resolved.underlying_token != *collection {
                return Err(Error::UnsupportedCollateral);
            }
            if !resolved.ids.iter().all(|id| ids.contains(id)) {
                return Err(Error::UnsupportedCollateral);
            }
            Ok(())
        }
        CollateralFilter::MerkleCollection { collection, root, depth } => {
            if resolved.underlying_token != *collection {
                return Err(Error::UnsupportedCollateral);
            }
            let proof_blob = options
                .merkle_proof
                .as_deref()
                .ok_or(Error::InvalidParameters("merkle collection requires a tag-2 proof"))?;
            let stride = (*depth as usize) * 32;
            if proof_blob.len() != stride * resolved.ids.len() {
                return Err(Error::InvalidParameters("merkle proof length mismatch"));
            }
            for (i, id) in resolved.ids.iter().enumerate() {
                let proof = &proof_blob[i * stride..(i + 1) * stride];
                if !verify_merkle_proof(B256::from(*root), *depth, *id, proof) {
                    return Err(Error::UnsupportedCollateral);
                }
            }
            Ok(())
        }
    }
}

/// Standard sorted-pair keccak256 merkle proof over uint256 leaves: each
/// step hashes the running value and the next proof element in whichever
/// order sorts lower first, so the verifier doesn't need a left/right bit
/// alongside each sibling.
fn verify_merkle_proof(root: B256, depth: u8, leaf_id: U256, proof: &[u8]) -> bool {
    if proof.len() != depth as usize * 32 {
        return false;
    }
    let mut computed = keccak256(leaf_id.to_be_bytes::<32>());
    for chunk in proof.chunks(32) {
        let sibling = B256::from_slice(chunk);
        computed = if computed.as_slice() <= sibling.as_slice() {
            keccak256([computed.as_slice(), sibling.as_slice()].concat())
        } else {
            keccak256([sibling.as_slice(), computed.as_slice()].concat())
        };
    }
    computed == root
}
