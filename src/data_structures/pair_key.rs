//! A unique key for a pair of identifiers.

/// A unique key for an unordered pair of identifiers.
///
/// This is used for efficient storage and lookup of shape pairs. The smaller
/// identifier is always stored in the high bits, so `PairKey::new(a, b) == PairKey::new(b, a)`
/// and keys sort by their first identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct PairKey(pub u64);

impl PairKey {
    /// Creates a new pair key from two IDs.
    #[inline]
    pub const fn new(id1: u32, id2: u32) -> Self {
        if id1 < id2 {
            Self(((id1 as u64) << 32) | id2 as u64)
        } else {
            Self(((id2 as u64) << 32) | id1 as u64)
        }
    }

    /// Gets the two IDs stored in the pair key in ascending order.
    #[inline]
    pub fn get(&self) -> (u32, u32) {
        (
            ((self.0 >> 32) & 0xFFFF_FFFF) as u32,
            (self.0 & 0xFFFF_FFFF) as u32,
        )
    }

    /// Returns `true` if either ID of the pair is `id`.
    #[inline]
    pub fn contains(&self, id: u32) -> bool {
        let (a, b) = self.get();
        a == id || b == id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_key_is_unordered() {
        let key = PairKey::new(7, 3);
        assert_eq!(key, PairKey::new(3, 7));
        assert_eq!(key.get(), (3, 7));
        assert!(key.contains(7));
        assert!(!key.contains(4));
    }
}
