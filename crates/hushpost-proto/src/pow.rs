//! Hash-based proof of work for envelope admission
//!
//! A relay accepts an envelope only if `SHA-256(content_hash ‖ nonce)` starts
//! with enough zero bits. The sender pays the search cost once, before the
//! envelope exists; verification is a single hash. Difficulty 0 disables the
//! check entirely and is treated as an explicit operator choice.

use hushpost_crypto::digest;

/// Count leading zero bits of a digest
fn leading_zero_bits(hash: &[u8; 32]) -> u32 {
    let mut count = 0;
    for byte in hash {
        if *byte == 0 {
            count += 8;
        } else {
            count += byte.leading_zeros();
            break;
        }
    }
    count
}

/// Check a nonce against the difficulty target
pub fn verify(content_hash: &[u8; 32], difficulty: u8, nonce: u64) -> bool {
    if difficulty == 0 {
        return true;
    }

    let work = digest(&[content_hash, &nonce.to_be_bytes()]);
    leading_zero_bits(&work) >= u32::from(difficulty)
}

/// Search for the smallest nonce that satisfies the difficulty target
///
/// Deterministic for a given content hash. Expected cost is `2^difficulty`
/// hashes, so callers keep difficulty in the low twenties at most.
pub fn solve(content_hash: &[u8; 32], difficulty: u8) -> u64 {
    let mut nonce = 0u64;
    while !verify(content_hash, difficulty, nonce) {
        nonce += 1;
    }
    nonce
}
