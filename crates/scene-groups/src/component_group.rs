//! Typed component groups.
//!
//! A component group indexes every component of one type across the whole
//! hierarchy whose owning entity satisfies the group's query mask. The
//! typed [`ComponentGroup<T>`] is what systems hold; the manager stores the
//! same object type-erased behind [`ComponentGroupOps`] so groups of
//! different component types live in one registry.

use std::any::Any;

use smallvec::SmallVec;

use scene_core::{ComponentHandle, ComponentRef};

use crate::hash_vector::HashVector;
use crate::key::{ComponentGroupKey, GroupId};
use crate::signal::Signal;

/// A query-bound index of all components of type `T`.
pub struct ComponentGroup<T: 'static> {
    id: GroupId,
    key: ComponentGroupKey,
    members: HashVector<ComponentRef<T>>,
    on_added: Signal<ComponentRef<T>>,
    on_removed: Signal<ComponentRef<T>>,
    cached_added: SmallVec<[ComponentRef<T>; 8]>,
    cached_removed: SmallVec<[ComponentRef<T>; 8]>,
}

impl<T: 'static> ComponentGroup<T> {
    pub(crate) fn new(id: GroupId, key: ComponentGroupKey) -> Self {
        Self {
            id,
            key,
            members: HashVector::new(),
            on_added: Signal::new(),
            on_removed: Signal::new(),
            cached_added: SmallVec::new(),
            cached_removed: SmallVec::new(),
        }
    }

    /// Identity of this group instance.
    #[must_use]
    pub fn id(&self) -> GroupId {
        self.id
    }

    /// The query key this group was acquired under.
    #[must_use]
    pub fn key(&self) -> ComponentGroupKey {
        self.key
    }

    /// Current members. Stable between one cache flush and the next
    /// registration burst.
    #[must_use]
    pub fn members(&self) -> &HashVector<ComponentRef<T>> {
        &self.members
    }

    /// Channel fired when a component joins the group, before the member
    /// container reflects it.
    pub fn on_added(&mut self) -> &mut Signal<ComponentRef<T>> {
        &mut self.on_added
    }

    /// Channel fired when a component leaves the group, before the member
    /// container reflects it.
    pub fn on_removed(&mut self) -> &mut Signal<ComponentRef<T>> {
        &mut self.on_removed
    }
}

/// Type-erased face of [`ComponentGroup`], used by the manager.
pub(crate) trait ComponentGroupOps {
    /// Emit-then-buffer a pending addition; true when the buffer became
    /// non-empty.
    fn cache_added(&mut self, component: ComponentHandle, emit: bool) -> bool;

    /// Emit-then-buffer a pending removal; true when the buffer became
    /// non-empty.
    fn cache_removed(&mut self, component: ComponentHandle, emit: bool) -> bool;

    /// Drain pending additions into the member container.
    fn apply_cached_added(&mut self);

    /// Drain pending removals out of the member container.
    fn apply_cached_removed(&mut self);

    /// Direct insert during initial population; no signal, no cache.
    fn populate(&mut self, component: ComponentHandle);

    /// Whether the member container currently holds the component.
    fn contains(&self, component: ComponentHandle) -> bool;

    /// Move the membership out (detach support).
    fn take_members(&mut self) -> Vec<ComponentHandle>;

    /// Replace the membership wholesale (restore support).
    fn replace_members(&mut self, members: Vec<ComponentHandle>);

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: 'static> ComponentGroupOps for ComponentGroup<T> {
    fn cache_added(&mut self, component: ComponentHandle, emit: bool) -> bool {
        let r = ComponentRef::new(component);
        if emit {
            self.on_added.emit(r);
        }
        self.cached_added.push(r);
        self.cached_added.len() == 1
    }

    fn cache_removed(&mut self, component: ComponentHandle, emit: bool) -> bool {
        let r = ComponentRef::new(component);
        if emit {
            self.on_removed.emit(r);
        }
        self.cached_removed.push(r);
        self.cached_removed.len() == 1
    }

    fn apply_cached_added(&mut self) {
        for r in self.cached_added.drain(..) {
            self.members.add(r);
        }
    }

    fn apply_cached_removed(&mut self) {
        for r in self.cached_removed.drain(..) {
            self.members.remove(r);
        }
    }

    fn populate(&mut self, component: ComponentHandle) {
        self.members.add(ComponentRef::new(component));
    }

    fn contains(&self, component: ComponentHandle) -> bool {
        self.members.contains(ComponentRef::new(component))
    }

    fn take_members(&mut self) -> Vec<ComponentHandle> {
        self.members
            .take_all()
            .into_iter()
            .map(ComponentRef::handle)
            .collect()
    }

    fn replace_members(&mut self, members: Vec<ComponentHandle>) {
        self.members.clear();
        for handle in members {
            self.members.add(ComponentRef::new(handle));
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
