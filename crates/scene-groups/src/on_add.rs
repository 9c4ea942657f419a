//! Recently-added adaptors over group change channels.
//!
//! An on-add adaptor subscribes to a group's two channels and keeps a flat
//! list of members, available the instant the transition is announced rather
//! than after the cache flush. The manager retains the subscription; callers
//! hold a shared handle and read or drain the list from their systems.
//!
//! Two list policies exist because consumers use the list two ways:
//!
//! - [`OnAddPolicy::Running`]: the list mirrors "members alive since
//!   subscription" — removals erase their entry. Seeded with the group's
//!   current members at acquisition.
//! - [`OnAddPolicy::PerTickDiff`]: the list is a pure log of additions that
//!   the consumer drains once per tick with `take`; removals do not touch
//!   it, so an add-then-remove within one tick is still observed.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;

use scene_core::{ComponentHandle, ComponentRef, Entity};

use crate::key::{ComponentGroupKey, EntityGroupKey};

/// How an adaptor's flat list evolves over time.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OnAddPolicy {
    /// Running "alive since subscription" list; removals erase entries.
    Running,
    /// Per-tick additions log; consumer drains it, removals leave it alone.
    PerTickDiff,
}

/// Shared list state behind an adaptor.
pub(crate) struct OnAddList<V> {
    items: Vec<V>,
    policy: OnAddPolicy,
}

impl<V: Copy + PartialEq> OnAddList<V> {
    pub(crate) fn new(policy: OnAddPolicy) -> Self {
        Self {
            items: Vec::new(),
            policy,
        }
    }

    pub(crate) fn push(&mut self, value: V) {
        self.items.push(value);
    }

    pub(crate) fn extend(&mut self, values: impl IntoIterator<Item = V>) {
        self.items.extend(values);
    }

    /// React to a member leaving the group.
    pub(crate) fn on_member_removed(&mut self, value: V) {
        match self.policy {
            OnAddPolicy::Running => self.items.retain(|&v| v != value),
            OnAddPolicy::PerTickDiff => {}
        }
    }

    pub(crate) fn take(&mut self) -> Vec<V> {
        std::mem::take(&mut self.items)
    }

    /// Restore support: pre-detach content goes in front of anything
    /// gathered since.
    pub(crate) fn merge_front(&mut self, mut older: Vec<V>) {
        older.append(&mut self.items);
        self.items = older;
    }

    pub(crate) fn items(&self) -> &[V] {
        &self.items
    }

    pub(crate) fn policy(&self) -> OnAddPolicy {
        self.policy
    }
}

pub(crate) type SharedOnAddList<V> = Rc<RefCell<OnAddList<V>>>;

/// Flat "recently added" view over an entity group.
pub struct EntityGroupOnAdd {
    list: SharedOnAddList<Entity>,
    key: EntityGroupKey,
}

impl EntityGroupOnAdd {
    pub(crate) fn new(list: SharedOnAddList<Entity>, key: EntityGroupKey) -> Self {
        Self { list, key }
    }

    pub(crate) fn list(&self) -> &SharedOnAddList<Entity> {
        &self.list
    }

    /// The group key this adaptor watches.
    #[must_use]
    pub fn key(&self) -> EntityGroupKey {
        self.key
    }

    /// The list policy chosen at acquisition.
    #[must_use]
    pub fn policy(&self) -> OnAddPolicy {
        self.list.borrow().policy()
    }

    /// Copy of the current list.
    #[must_use]
    pub fn entities(&self) -> Vec<Entity> {
        self.list.borrow().items().to_vec()
    }

    /// Drain the list (the per-tick consumption pattern).
    pub fn take(&self) -> Vec<Entity> {
        self.list.borrow_mut().take()
    }

    /// Number of listed entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.list.borrow().items().len()
    }

    /// Check whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Flat "recently added" view over a component group.
///
/// The shared list stores raw handles; this wrapper re-tags them with `T`
/// on the way out.
pub struct ComponentGroupOnAdd<T: 'static> {
    list: SharedOnAddList<ComponentHandle>,
    key: ComponentGroupKey,
    _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> ComponentGroupOnAdd<T> {
    pub(crate) fn new(list: SharedOnAddList<ComponentHandle>, key: ComponentGroupKey) -> Self {
        Self {
            list,
            key,
            _marker: PhantomData,
        }
    }

    pub(crate) fn list(&self) -> &SharedOnAddList<ComponentHandle> {
        &self.list
    }

    /// The group key this adaptor watches.
    #[must_use]
    pub fn key(&self) -> ComponentGroupKey {
        self.key
    }

    /// The list policy chosen at acquisition.
    #[must_use]
    pub fn policy(&self) -> OnAddPolicy {
        self.list.borrow().policy()
    }

    /// Copy of the current list.
    #[must_use]
    pub fn components(&self) -> Vec<ComponentRef<T>> {
        self.list
            .borrow()
            .items()
            .iter()
            .map(|&h| ComponentRef::new(h))
            .collect()
    }

    /// Drain the list (the per-tick consumption pattern).
    pub fn take(&self) -> Vec<ComponentRef<T>> {
        self.list
            .borrow_mut()
            .take()
            .into_iter()
            .map(ComponentRef::new)
            .collect()
    }

    /// Number of listed components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.list.borrow().items().len()
    }

    /// Check whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
