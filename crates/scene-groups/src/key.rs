//! Group identity: query keys and instance ids.

use std::fmt;

use scene_core::{ComponentMask, ComponentTypeId};

use crate::matcher::MaskMatcher;

/// Identifier of one live group instance.
///
/// Acquiring the same key twice yields the same id; tests and callers can
/// assert sharing without comparing addresses.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(u32);

impl GroupId {
    #[must_use]
    pub(crate) const fn from_raw(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw id value.
    #[must_use]
    pub const fn as_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupId({})", self.0)
    }
}

/// Memoization key for an entity group: query mask plus matcher policy.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct EntityGroupKey {
    /// Required component mask.
    pub mask: ComponentMask,
    /// How candidate masks are compared against `mask`.
    pub matcher: MaskMatcher,
}

/// Memoization key for a component group: the entity-level query plus the
/// tracked component type whose instances the group indexes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ComponentGroupKey {
    /// Required component mask (always includes `tracked`).
    pub mask: ComponentMask,
    /// How candidate masks are compared against `mask`.
    pub matcher: MaskMatcher,
    /// Component type this group collects instances of.
    pub tracked: ComponentTypeId,
}
