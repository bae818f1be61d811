use std::hash::{BuildHasherDefault, Hasher};

const OFFSET_BASIS: u32 = 0x811c_9dc5;
const PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1 hasher used to route keys to shards.
///
/// Unlike the randomly seeded hashers of the standard library it produces the same value for the
/// same input in every process, so a key always lands on the same shard.
#[derive(Debug, Clone, Copy)]
pub struct Fnv32Hasher(u32);

impl Default for Fnv32Hasher {
    fn default() -> Self {
        Self(OFFSET_BASIS)
    }
}

impl Hasher for Fnv32Hasher {
    fn finish(&self) -> u64 {
        u64::from(self.0)
    }

    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.0 = self.0.wrapping_mul(PRIME) ^ u32::from(*byte);
        }
    }
}

/// Builds [`Fnv32Hasher`]s. This is the default routing hasher of
/// [`ProxyCache`](crate::ProxyCache).
pub type FnvBuildHasher = BuildHasherDefault<Fnv32Hasher>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::hash::BuildHasher;

    fn fnv32(bytes: &[u8]) -> u64 {
        let mut hasher = Fnv32Hasher::default();
        hasher.write(bytes);
        hasher.finish()
    }

    #[test]
    fn it_returns_offset_basis_for_empty_input() {
        assert_eq!(fnv32(b""), 0x811c_9dc5);
    }

    #[test]
    fn it_matches_reference_vectors() {
        assert_eq!(fnv32(b"a"), 0x050c_5d7e);
    }

    #[test]
    fn it_stays_within_32_bits() {
        // when
        let hash = fnv32(b"a considerably longer input that wraps the multiplication many times");

        // then
        assert!(hash <= u64::from(u32::MAX));
    }

    #[test]
    fn it_is_deterministic_across_builders() {
        // given
        let first = FnvBuildHasher::default();
        let second = FnvBuildHasher::default();

        // then
        assert_eq!(first.hash_one("hello"), second.hash_one("hello"));
        assert_ne!(first.hash_one("hello"), first.hash_one("jack"));
    }
}
