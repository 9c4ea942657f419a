//! Fixed-width component masks.
//!
//! A mask records which component types an entity (or a query) involves.
//! Bit position `i` refers to the same component type for the lifetime of
//! the process; positions are handed out by
//! [`ComponentRegistry`](crate::ComponentRegistry), which guarantees they
//! stay below [`ComponentMask::WIDTH`].

use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Not};

use crate::component::ComponentTypeId;

/// A fixed 128-bit set of component types.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ComponentMask {
    words: [u64; 2],
}

impl ComponentMask {
    /// Number of distinct component types a mask can carry.
    pub const WIDTH: u32 = 128;

    /// The empty mask.
    pub const EMPTY: Self = Self { words: [0; 2] };

    /// Create an empty mask.
    #[must_use]
    pub const fn new() -> Self {
        Self::EMPTY
    }

    /// Create a mask with a single bit set.
    #[must_use]
    pub fn of(ty: ComponentTypeId) -> Self {
        Self::new().with(ty)
    }

    fn index(ty: ComponentTypeId) -> (usize, u64) {
        let pos = ty.as_raw();
        assert!(
            pos < Self::WIDTH,
            "component bit position {pos} out of mask width {}",
            Self::WIDTH
        );
        ((pos / 64) as usize, 1u64 << (pos % 64))
    }

    /// Set the bit for a component type.
    ///
    /// # Panics
    ///
    /// Panics if the position is past the fixed width. Positions produced by
    /// the registry never are.
    pub fn set(&mut self, ty: ComponentTypeId) {
        let (word, bit) = Self::index(ty);
        self.words[word] |= bit;
    }

    /// Clear the bit for a component type.
    pub fn clear(&mut self, ty: ComponentTypeId) {
        let (word, bit) = Self::index(ty);
        self.words[word] &= !bit;
    }

    /// Value-style [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, ty: ComponentTypeId) -> Self {
        self.set(ty);
        self
    }

    /// Value-style [`clear`](Self::clear).
    #[must_use]
    pub fn without(mut self, ty: ComponentTypeId) -> Self {
        self.clear(ty);
        self
    }

    /// Test the bit for a component type.
    #[must_use]
    pub fn test(self, ty: ComponentTypeId) -> bool {
        let (word, bit) = Self::index(ty);
        self.words[word] & bit != 0
    }

    /// Check whether any bit is set.
    #[must_use]
    pub const fn any(self) -> bool {
        self.words[0] != 0 || self.words[1] != 0
    }

    /// Check whether no bit is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        !self.any()
    }

    /// Number of set bits.
    #[must_use]
    pub const fn count(self) -> u32 {
        self.words[0].count_ones() + self.words[1].count_ones()
    }

    /// Check whether every bit of `other` is also set in `self`.
    #[must_use]
    pub const fn contains_all(self, other: Self) -> bool {
        (self.words[0] & other.words[0]) == other.words[0]
            && (self.words[1] & other.words[1]) == other.words[1]
    }

    /// Iterate over the set bit positions in ascending order.
    pub fn iter(self) -> impl Iterator<Item = ComponentTypeId> {
        (0..Self::WIDTH).filter_map(move |pos| {
            let ty = ComponentTypeId::from_raw(pos);
            self.test(ty).then_some(ty)
        })
    }
}

impl BitAnd for ComponentMask {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self {
            words: [self.words[0] & rhs.words[0], self.words[1] & rhs.words[1]],
        }
    }
}

impl BitOr for ComponentMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            words: [self.words[0] | rhs.words[0], self.words[1] | rhs.words[1]],
        }
    }
}

impl BitXor for ComponentMask {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self {
        Self {
            words: [self.words[0] ^ rhs.words[0], self.words[1] ^ rhs.words[1]],
        }
    }
}

impl Not for ComponentMask {
    type Output = Self;

    fn not(self) -> Self {
        Self {
            words: [!self.words[0], !self.words[1]],
        }
    }
}

impl fmt::Debug for ComponentMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentMask{{")?;
        let mut first = true;
        for ty in self.iter() {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}", ty.as_raw())?;
            first = false;
        }
        write!(f, "}}")
    }
}
