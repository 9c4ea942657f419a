//! Incremental group indexes over a scene graph.
//!
//! A *group* is a live, always-current list of the entities (or component
//! instances) matching a mask query. The host scene reports structural
//! changes to the [`EntitiesManager`]; matching groups fire their change
//! channels immediately and apply the actual membership mutation at the
//! next [`EntitiesManager::update_caches`] flush, so member lists stay
//! stable for a whole tick no matter how much churn happens mid-tick.
//!
//! ```
//! use scene_groups::prelude::*;
//! # use scene_core::{ComponentHandle, ComponentMask, ComponentTypeId, Entity, SceneHost};
//! # struct EmptyScene;
//! # impl SceneHost for EmptyScene {
//! #     fn component_mask(&self, _: Entity) -> ComponentMask { ComponentMask::EMPTY }
//! #     fn component_count(&self, _: Entity, _: ComponentTypeId) -> usize { 0 }
//! #     fn component_at(&self, _: Entity, _: ComponentTypeId, _: usize) -> ComponentHandle {
//! #         unreachable!()
//! #     }
//! #     fn children(&self, _: Entity) -> Vec<Entity> { Vec::new() }
//! # }
//! struct Renderable;
//!
//! let scene = EmptyScene;
//! let mut registry = ComponentRegistry::new();
//! let mut manager = EntitiesManager::new();
//! let root = Entity::new(0, 0);
//!
//! let group = manager.acquire_entity_group::<(Renderable,)>(
//!     &scene,
//!     &mut registry,
//!     MaskMatcher::AllOf,
//!     root,
//! );
//! assert!(group.members().is_empty());
//! ```

mod component_group;
mod entity_group;
mod filter;
mod hash_vector;
mod key;
mod manager;
mod matcher;
mod on_add;
mod signal;

pub use component_group::ComponentGroup;
pub use entity_group::EntityGroup;
pub use filter::ComponentFilter;
pub use hash_vector::{HashVector, HashVectorError};
pub use key::{ComponentGroupKey, EntityGroupKey, GroupId};
pub use manager::EntitiesManager;
pub use matcher::MaskMatcher;
pub use on_add::{ComponentGroupOnAdd, EntityGroupOnAdd, OnAddPolicy};
pub use signal::{Signal, SubscriptionToken};

pub mod prelude {
    //! Common imports for group consumers.
    pub use crate::{
        ComponentFilter, ComponentGroup, ComponentGroupKey, ComponentGroupOnAdd, EntitiesManager,
        EntityGroup, EntityGroupKey, EntityGroupOnAdd, MaskMatcher, OnAddPolicy,
    };
    pub use scene_core::{
        ComponentMask, ComponentRef, ComponentRegistry, Entity, SceneHost,
    };
}
