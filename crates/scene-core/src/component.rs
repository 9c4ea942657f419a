//! Component type identity and the bit-position registry.
//!
//! Every component type gets a stable small-integer id which doubles as its
//! bit position in a [`ComponentMask`]. Positions are assigned once, in
//! registration order, and never reused; masks built from two registries are
//! not comparable, so a scene owns exactly one registry.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use thiserror::Error;

use crate::entity::ComponentHandle;
use crate::mask::ComponentMask;

/// Stable small-integer id of a component type; also its mask bit position.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentTypeId(u32);

impl ComponentTypeId {
    /// Create a component type id from a raw bit position.
    #[must_use]
    pub const fn from_raw(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw bit position.
    #[must_use]
    pub const fn as_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ComponentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentTypeId({})", self.0)
    }
}

/// Registry error type.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Every one of the 128 mask positions is taken.
    #[error("component type table is full ({0} positions)")]
    CapacityExhausted(u32),
}

/// Table mapping Rust component types to stable bit positions.
///
/// Registration is idempotent: registering the same type twice returns the
/// same id. The table caps out at [`ComponentMask::WIDTH`] types.
#[derive(Default)]
pub struct ComponentRegistry {
    type_to_id: HashMap<TypeId, ComponentTypeId>,
    names: Vec<&'static str>,
}

impl ComponentRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component type and return its bit position.
    ///
    /// # Panics
    ///
    /// Panics when the table is full. Use [`try_register`](Self::try_register)
    /// to handle that case.
    pub fn register<T: 'static>(&mut self) -> ComponentTypeId {
        match self.try_register::<T>() {
            Ok(id) => id,
            Err(err) => panic!("{err}"),
        }
    }

    /// Register a component type, failing once the table is full.
    pub fn try_register<T: 'static>(&mut self) -> Result<ComponentTypeId, RegistryError> {
        let type_id = TypeId::of::<T>();

        if let Some(&id) = self.type_to_id.get(&type_id) {
            return Ok(id);
        }

        let next = self.names.len() as u32;
        if next >= ComponentMask::WIDTH {
            return Err(RegistryError::CapacityExhausted(ComponentMask::WIDTH));
        }

        let id = ComponentTypeId(next);
        self.type_to_id.insert(type_id, id);
        self.names.push(std::any::type_name::<T>());
        Ok(id)
    }

    /// Get the bit position of a type, if registered.
    #[must_use]
    pub fn get<T: 'static>(&self) -> Option<ComponentTypeId> {
        self.type_to_id.get(&TypeId::of::<T>()).copied()
    }

    /// Get the type name recorded for a bit position, for diagnostics.
    #[must_use]
    pub fn name_of(&self, id: ComponentTypeId) -> Option<&'static str> {
        self.names.get(id.as_raw() as usize).copied()
    }

    /// Number of registered component types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if no type is registered yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("count", &self.len())
            .field("names", &self.names)
            .finish()
    }
}

/// A [`ComponentHandle`] tagged with the component's Rust type.
///
/// Zero-cost wrapper used by typed component groups; identity and hashing
/// delegate to the handle.
pub struct ComponentRef<T> {
    handle: ComponentHandle,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ComponentRef<T> {
    /// Tag a raw handle with a component type.
    #[must_use]
    pub const fn new(handle: ComponentHandle) -> Self {
        Self {
            handle,
            _marker: PhantomData,
        }
    }

    /// Get the untyped handle back.
    #[must_use]
    pub const fn handle(self) -> ComponentHandle {
        self.handle
    }
}

// Manual impls: ComponentRef is Copy/Eq/Hash regardless of T.
impl<T> Clone for ComponentRef<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ComponentRef<T> {}

impl<T> PartialEq for ComponentRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl<T> Eq for ComponentRef<T> {}

impl<T> std::hash::Hash for ComponentRef<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.handle.hash(state);
    }
}

impl<T> fmt::Debug for ComponentRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ComponentRef<{}>({:#x})",
            std::any::type_name::<T>(),
            self.handle.to_bits()
        )
    }
}
