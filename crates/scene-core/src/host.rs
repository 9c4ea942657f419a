//! Contract the host scene graph implements for the group index.

use crate::component::ComponentTypeId;
use crate::entity::{ComponentHandle, Entity};
use crate::mask::ComponentMask;

/// Read access the group index needs into the host scene.
///
/// The host owns all entities and components; the index only inspects them
/// through this trait while processing registration events and while
/// populating a freshly created group.
///
/// # Call-ordering contract
///
/// The host must deliver registration events to the index in a fixed order
/// relative to its own mutations:
///
/// - an entity/component **add** event arrives *after* the host applied the
///   mutation, so the entity's mask already includes the new component and
///   `component_count` already counts it;
/// - a **remove** event arrives *while the data is still attached*, so the
///   mask still includes the component and `component_count` still counts it;
/// - an entity that was unregistered while the index was detached must stay
///   queryable through this trait until `restore_groups` returns.
pub trait SceneHost {
    /// The entity's current component mask.
    fn component_mask(&self, entity: Entity) -> ComponentMask;

    /// Number of components of one type attached to the entity.
    fn component_count(&self, entity: Entity, ty: ComponentTypeId) -> usize;

    /// Handle of the `index`-th component of one type on the entity.
    ///
    /// # Panics
    ///
    /// The host should treat `index >= component_count(entity, ty)` as a
    /// programmer error.
    fn component_at(&self, entity: Entity, ty: ComponentTypeId, index: usize) -> ComponentHandle;

    /// Direct children of the entity, for hierarchy walks.
    fn children(&self, entity: Entity) -> Vec<Entity>;
}
