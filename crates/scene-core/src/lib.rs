//! Scene graph value types shared between the host scene and the group index.
//!
//! This crate defines the vocabulary the indexing layer speaks:
//!
//! - **Entity**: a generational handle to a node in the host scene graph
//! - **ComponentTypeId**: a stable small-integer id per component type,
//!   doubling as a bit position in a [`ComponentMask`]
//! - **ComponentMask**: a fixed 128-bit set of component types
//! - **SceneHost**: the read-only contract the host scene implements so the
//!   index can inspect masks, component counts and child lists
//!
//! The host owns entities and components; everything here is a handle or a
//! plain value. Nothing in this crate allocates per entity.

mod component;
mod entity;
mod host;
mod mask;

pub use component::{ComponentRef, ComponentRegistry, ComponentTypeId, RegistryError};
pub use entity::{ComponentHandle, Entity};
pub use host::SceneHost;
pub use mask::ComponentMask;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        ComponentHandle, ComponentMask, ComponentRef, ComponentRegistry, ComponentTypeId, Entity,
        SceneHost,
    };
}
