//! Entity-level groups.
//!
//! An entity group is a live index of every entity whose component mask
//! satisfies the group's query. Membership changes are announced on the
//! change channels the moment the manager detects them, but the backing
//! container only mutates when the manager flushes caches, so readers see a
//! stable view for the whole tick.

use smallvec::SmallVec;

use scene_core::Entity;

use crate::hash_vector::HashVector;
use crate::key::{EntityGroupKey, GroupId};
use crate::signal::Signal;

/// A query-bound index of entities.
pub struct EntityGroup {
    id: GroupId,
    key: EntityGroupKey,
    entities: HashVector<Entity>,
    on_added: Signal<Entity>,
    on_removed: Signal<Entity>,
    cached_added: SmallVec<[Entity; 8]>,
    cached_removed: SmallVec<[Entity; 8]>,
}

impl EntityGroup {
    pub(crate) fn new(id: GroupId, key: EntityGroupKey) -> Self {
        Self {
            id,
            key,
            entities: HashVector::new(),
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
    pub fn key(&self) -> EntityGroupKey {
        self.key
    }

    /// Current members. Stable between one cache flush and the next
    /// registration burst.
    #[must_use]
    pub fn members(&self) -> &HashVector<Entity> {
        &self.entities
    }

    /// Channel fired when an entity starts matching the query, before the
    /// member container reflects it.
    pub fn on_added(&mut self) -> &mut Signal<Entity> {
        &mut self.on_added
    }

    /// Channel fired when an entity stops matching the query, before the
    /// member container reflects it.
    pub fn on_removed(&mut self) -> &mut Signal<Entity> {
        &mut self.on_removed
    }

    /// Direct insert during initial population; no signal, no cache.
    pub(crate) fn populate(&mut self, entity: Entity) {
        self.entities.add(entity);
    }

    /// Record a pending addition. Emits first, then buffers.
    ///
    /// Returns true when the pending buffer went from empty to non-empty,
    /// which is exactly when the manager must put this group on a worklist.
    pub(crate) fn cache_added(&mut self, entity: Entity, emit: bool) -> bool {
        if emit {
            self.on_added.emit(entity);
        }
        self.cached_added.push(entity);
        self.cached_added.len() == 1
    }

    /// Record a pending removal. Emits first, then buffers.
    pub(crate) fn cache_removed(&mut self, entity: Entity, emit: bool) -> bool {
        if emit {
            self.on_removed.emit(entity);
        }
        self.cached_removed.push(entity);
        self.cached_removed.len() == 1
    }

    /// Drain pending additions into the member container.
    pub(crate) fn apply_cached_added(&mut self) {
        for entity in self.cached_added.drain(..) {
            self.entities.add(entity);
        }
    }

    /// Drain pending removals out of the member container.
    pub(crate) fn apply_cached_removed(&mut self) {
        for entity in self.cached_removed.drain(..) {
            self.entities.remove(entity);
        }
    }

    /// Move the membership out (detach support).
    pub(crate) fn take_members(&mut self) -> Vec<Entity> {
        self.entities.take_all()
    }

    /// Replace the membership wholesale (restore support).
    pub(crate) fn replace_members(&mut self, members: Vec<Entity>) {
        self.entities.clear();
        for entity in members {
            self.entities.add(entity);
        }
    }
}
