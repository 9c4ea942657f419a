//! Query masks from type lists.
//!
//! `acquire_*_group::<(A, B)>` needs a [`ComponentMask`] whose bits come
//! from the registry positions of `A` and `B`. The [`ComponentFilter`]
//! trait turns a tuple of component types into that mask, registering each
//! type on the way (registration is idempotent).

use scene_core::{ComponentMask, ComponentRegistry};

/// A compile-time list of component types convertible to a query mask.
pub trait ComponentFilter {
    /// Build the mask, registering every element type.
    fn mask(registry: &mut ComponentRegistry) -> ComponentMask;
}

/// The empty filter: no extra required types.
impl ComponentFilter for () {
    fn mask(_registry: &mut ComponentRegistry) -> ComponentMask {
        ComponentMask::EMPTY
    }
}

macro_rules! impl_component_filter {
    ($($ty:ident),+) => {
        impl<$($ty: 'static),+> ComponentFilter for ($($ty,)+) {
            fn mask(registry: &mut ComponentRegistry) -> ComponentMask {
                let mut mask = ComponentMask::new();
                $(mask.set(registry.register::<$ty>());)+
                mask
            }
        }
    };
}

impl_component_filter!(T1);
impl_component_filter!(T1, T2);
impl_component_filter!(T1, T2, T3);
impl_component_filter!(T1, T2, T3, T4);
impl_component_filter!(T1, T2, T3, T4, T5);
impl_component_filter!(T1, T2, T3, T4, T5, T6);
impl_component_filter!(T1, T2, T3, T4, T5, T6, T7);
impl_component_filter!(T1, T2, T3, T4, T5, T6, T7, T8);
