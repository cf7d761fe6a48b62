//! Commitment hashing for the commit-reveal protocol.
//!
//! The ledger verifies `keccak256(abi.encodePacked(address move, bytes32 secret))`
//! on reveal. The secret used by the current protocol generation is the fixed
//! label `"secret"`, so the hiding property is weak: anyone can brute-force the
//! handful of move addresses against a published commitment. Keep it as-is;
//! changing the secret breaks reveal verification on deployed ledgers.
use alloy_primitives::{B256, keccak256};

use crate::types::MoveRef;

/// Secret expected by deployed ledgers (`"secret"`, left-aligned, zero padded).
pub const COMMIT_SECRET: B256 = B256::new(label_to_bytes32(b"secret"));

/// Left-aligns a short label into a zero-padded 32 byte word.
///
/// Labels longer than 32 bytes are truncated.
pub const fn label_to_bytes32(label: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let mut i = 0;
    while i < label.len() && i < 32 {
        out[i] = label[i];
        i += 1;
    }
    out
}

/// Computes the commitment for `mv` under `secret`.
pub fn commitment(mv: MoveRef, secret: &B256) -> B256 {
    let mut packed = [0u8; 52];
    packed[..20].copy_from_slice(mv.address().as_slice());
    packed[20..].copy_from_slice(secret.as_slice());
    keccak256(packed)
}

/// True when `commit` binds `mv` under `secret`.
pub fn verify(commit: &B256, mv: MoveRef, secret: &B256) -> bool {
    commitment(mv, secret) == *commit
}

#[cfg(test)]
mod tests {
    use alloy_primitives::Address;

    use super::*;

    #[test]
    fn secret_is_left_aligned_label() {
        let bytes = COMMIT_SECRET.0;
        assert_eq!(&bytes[..6], b"secret");
        assert!(bytes[6..].iter().all(|b| *b == 0));
    }

    #[test]
    fn commitment_is_packed_keccak() {
        let mv = MoveRef(Address::repeat_byte(0xab));
        let mut packed = Vec::with_capacity(52);
        packed.extend_from_slice(mv.address().as_slice());
        packed.extend_from_slice(COMMIT_SECRET.as_slice());

        assert_eq!(commitment(mv, &COMMIT_SECRET), keccak256(&packed));
    }

    #[test]
    fn commitment_binds_move() {
        let a = MoveRef(Address::repeat_byte(0x01));
        let b = MoveRef(Address::repeat_byte(0x02));
        let commit = commitment(a, &COMMIT_SECRET);

        assert!(verify(&commit, a, &COMMIT_SECRET));
        assert!(!verify(&commit, b, &COMMIT_SECRET));
        assert_ne!(commit, B256::ZERO);
    }
}
