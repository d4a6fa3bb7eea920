//! Password strengthening
//!
//! Client-side hardening of low-entropy passwords: `2^bits` rounds of
//! `SHA-256(state ‖ salt)`. The work factor is paid once per authentication
//! attempt, which is what makes offline guessing against a stolen vault
//! expensive. Deterministic for a given (password, salt, bits) triple.

use crate::hash::digest;

/// Iterate `2^bits` digest rounds over the password and salt
///
/// `bits` is clamped to 63 to keep the shift defined; configuration layers
/// bound it far lower in practice.
pub fn strengthen(password: &[u8], salt: &[u8], bits: u8) -> [u8; 32] {
    let rounds = 1u64 << u32::from(bits).min(63);

    let mut state = digest(&[password, salt]);
    for _ in 1..rounds {
        state = digest(&[&state, salt]);
    }
    state
}

/// Authentication verifier: a context-bound digest of the strengthened key
///
/// Stored instead of the key itself; recomputed on every login attempt.
pub fn verifier(strengthened: &[u8; 32], context: &[u8]) -> [u8; 32] {
    digest(&[strengthened, context])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strengthen_deterministic() {
        let a = strengthen(b"correct horse", b"salt", 8);
        let b = strengthen(b"correct horse", b"salt", 8);
        assert_eq!(a, b);
    }

    #[test]
    fn test_strengthen_salt_sensitive() {
        let a = strengthen(b"correct horse", b"salt-one", 8);
        let b = strengthen(b"correct horse", b"salt-two", 8);
        assert_ne!(a, b);
    }

    #[test]
    fn test_strengthen_bits_change_output() {
        let a = strengthen(b"correct horse", b"salt", 4);
        let b = strengthen(b"correct horse", b"salt", 5);
        assert_ne!(a, b);
    }

    #[test]
    fn test_strengthen_zero_bits_single_round() {
        // 2^0 = 1 round, which is exactly digest(password ‖ salt)
        let strengthened = strengthen(b"pw", b"salt", 0);
        assert_eq!(strengthened, digest(&[b"pw", b"salt"]));
    }

    #[test]
    fn test_verifier_context_bound() {
        let key = strengthen(b"pw", b"salt", 4);
        let a = verifier(&key, b"alice1");
        let b = verifier(&key, b"bob222");
        assert_ne!(a, b);
    }
}
