//! Membership Filter: a bit-array approximate set, one per Sorted Run
//! (§4.3).
//!
//! `h_i(key) = (H(stringify(key)) + i) mod B` for `i` in `[0, K)`, where `H`
//! is `hash::CityHasher`. Grounded on
//! `original_source/src/bloom_filter.cpp` (`(hash_fn(key) + seed) % size`,
//! `setBit`/`getBit` byte-packed bit array).

use crate::hash::CityHasher;

/// Default bit-array size in bits (§4.3, §6).
pub const DEFAULT_BITS: usize = 2400;
/// Default number of hash functions (§4.3, §6).
pub const DEFAULT_HASHES: usize = 3;

pub struct MembershipFilter {
    bits: Vec<u8>,
    num_bits: usize,
    num_hashes: usize,
}

impl MembershipFilter {
    pub fn new(num_bits: usize, num_hashes: usize) -> MembershipFilter {
        MembershipFilter {
            bits: vec![0u8; num_bits.div_ceil(8)],
            num_bits,
            num_hashes,
        }
    }

    pub fn with_defaults() -> MembershipFilter {
        MembershipFilter::new(DEFAULT_BITS, DEFAULT_HASHES)
    }

    /// Build from a raw byte array already on disk (§4.3 "Serialization is
    /// the raw byte array"). `B` and `K` are fixed by convention, not
    /// stored in the file, so the caller supplies them.
    pub fn from_bytes(bytes: Vec<u8>, num_hashes: usize) -> MembershipFilter {
        let num_bits = bytes.len() * 8;
        MembershipFilter {
            bits: bytes,
            num_bits,
            num_hashes,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    pub fn put(&mut self, key: i64) {
        let base = CityHasher::hash_key(key);
        for i in 0..self.num_hashes {
            let bit = self.slot(base, i);
            self.set_bit(bit);
        }
    }

    pub fn might_contain(&self, key: i64) -> bool {
        let base = CityHasher::hash_key(key);
        (0..self.num_hashes).all(|i| self.get_bit(self.slot(base, i)))
    }

    fn slot(&self, base: u64, i: usize) -> usize {
        ((base as u128 + i as u128) % self.num_bits as u128) as usize
    }

    fn set_bit(&mut self, index: usize) {
        self.bits[index / 8] |= 1 << (index % 8);
    }

    fn get_bit(&self, index: usize) -> bool {
        self.bits[index / 8] & (1 << (index % 8)) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserted_keys_are_found() {
        let mut filter = MembershipFilter::with_defaults();
        for k in 0..200i64 {
            filter.put(k);
        }
        for k in 0..200i64 {
            assert!(filter.might_contain(k));
        }
    }

    #[test]
    fn never_inserted_key_can_be_rejected() {
        let mut filter = MembershipFilter::with_defaults();
        for k in 0..50i64 {
            filter.put(k * 2);
        }
        // At least one odd key should be rejected; bloom filters cannot
        // guarantee all negatives are caught, but with this load factor
        // some must be.
        let rejected = (0..50i64).map(|k| k * 2 + 1).any(|k| !filter.might_contain(k));
        assert!(rejected);
    }

    #[test]
    fn roundtrips_through_bytes() {
        let mut filter = MembershipFilter::with_defaults();
        filter.put(7);
        let bytes = filter.as_bytes().to_vec();
        let reloaded = MembershipFilter::from_bytes(bytes, DEFAULT_HASHES);
        assert!(reloaded.might_contain(7));
    }
}
