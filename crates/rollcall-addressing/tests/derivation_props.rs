//! Property tests for the address derivation.

use proptest::prelude::*;
use rollcall_addressing::{daily_record_address, derive, profile_address};

proptest! {
    /// Same inputs always yield byte-identical output.
    #[test]
    fn derivation_is_pure(ns in proptest::collection::vec(any::<u8>(), 0..64),
                          part in proptest::collection::vec(any::<u8>(), 0..128)) {
        let a = derive(&ns, &[&part]);
        let b = derive(&ns, &[&part]);
        prop_assert_eq!(a.as_bytes(), b.as_bytes());
    }

    /// Flipping any single byte of the owner key moves the address.
    #[test]
    fn owner_bytes_all_matter(owner in any::<[u8; 32]>(), index in 0usize..32) {
        let mut flipped = owner;
        flipped[index] ^= 0x01;
        prop_assert_ne!(profile_address(&owner), profile_address(&flipped));
    }

    /// Distinct day buckets for the same owner never share an address.
    #[test]
    fn days_never_collide(owner in any::<[u8; 32]>(), day in 0u64..1_000_000, offset in 1u64..1_000) {
        prop_assert_ne!(
            daily_record_address(&owner, day),
            daily_record_address(&owner, day + offset)
        );
    }

    /// The part framing keeps concatenations apart.
    #[test]
    fn split_point_matters(bytes in proptest::collection::vec(any::<u8>(), 2..64),
                           split in 1usize..63) {
        prop_assume!(split < bytes.len());
        let (left, right) = bytes.split_at(split);
        let joined = derive(b"ns", &[&bytes]);
        let parted = derive(b"ns", &[left, right]);
        prop_assert_ne!(joined, parted);
    }
}
