//! Mask matching policies.
//!
//! A matcher decides whether a candidate's component mask satisfies a
//! group's query mask. Matchers are pure values; a group's matcher is fixed
//! at creation (a different policy means a different group key).

use scene_core::ComponentMask;

/// Policy comparing a candidate mask against a query mask.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum MaskMatcher {
    /// Candidate must have every bit the query requires.
    AllOf,
    /// Candidate must share at least one bit with the query.
    AnyOf,
}

impl MaskMatcher {
    /// Check whether `candidate` satisfies `query` under this policy.
    #[must_use]
    pub fn matches(self, query: ComponentMask, candidate: ComponentMask) -> bool {
        match self {
            Self::AllOf => candidate.contains_all(query),
            Self::AnyOf => (query & candidate).any(),
        }
    }
}

#[cfg(test)]
mod tests {
    use scene_core::ComponentTypeId;

    use super::*;

    fn mask(bits: &[u32]) -> ComponentMask {
        let mut m = ComponentMask::new();
        for &b in bits {
            m.set(ComponentTypeId::from_raw(b));
        }
        m
    }

    #[test]
    fn test_all_of() {
        let query = mask(&[0, 1]);

        assert!(MaskMatcher::AllOf.matches(query, mask(&[0, 1])));
        assert!(MaskMatcher::AllOf.matches(query, mask(&[0, 1, 2])));
        assert!(!MaskMatcher::AllOf.matches(query, mask(&[0])));
        assert!(!MaskMatcher::AllOf.matches(query, mask(&[2])));
    }

    #[test]
    fn test_any_of() {
        let query = mask(&[0, 1]);

        assert!(MaskMatcher::AnyOf.matches(query, mask(&[0])));
        assert!(MaskMatcher::AnyOf.matches(query, mask(&[1, 5])));
        assert!(!MaskMatcher::AnyOf.matches(query, mask(&[2, 3])));
        assert!(!MaskMatcher::AnyOf.matches(query, ComponentMask::EMPTY));
    }

    #[test]
    fn test_empty_query() {
        // An empty AllOf query matches everything; an empty AnyOf query
        // matches nothing.
        assert!(MaskMatcher::AllOf.matches(ComponentMask::EMPTY, mask(&[0])));
        assert!(!MaskMatcher::AnyOf.matches(ComponentMask::EMPTY, mask(&[0])));
    }
}
