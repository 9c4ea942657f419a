//! The central group registry and event fan-out.
//!
//! The manager owns every live group, keyed by its query. The host scene
//! reports structural changes through the four `register_*`/`unregister_*`
//! entry points; the manager fans each event out to the groups whose query
//! is affected, fires their change channels immediately, and buffers the
//! container mutation until [`EntitiesManager::update_caches`] — called once
//! per scene tick, after all registration churn and before systems read
//! group members.
//!
//! Registration can arrive in recursive bursts (attaching a subtree delivers
//! one event per entity and component), and channel listeners run in the
//! middle of such a burst. Deferring the container mutation keeps every
//! member list stable for the whole tick and makes listener re-entrancy
//! harmless.
//!
//! # Detached state
//!
//! Editors sometimes need to mutate the scene wholesale (say, swapping in a
//! preview hierarchy) without churning every system's group view.
//! [`detach_groups`](EntitiesManager::detach_groups) parks all memberships
//! aside; while detached, real-scene events are journaled instead of
//! applied, and preview content can be indexed explicitly through
//! [`register_detached_entity`](EntitiesManager::register_detached_entity).
//! [`restore_groups`](EntitiesManager::restore_groups) brings the parked
//! memberships back and reconciles the journal against the host's current
//! state, with signals suppressed.

use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;
use smallvec::SmallVec;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, trace};

use scene_core::{ComponentHandle, ComponentRegistry, ComponentTypeId, Entity, SceneHost};

use crate::component_group::{ComponentGroup, ComponentGroupOps};
use crate::entity_group::EntityGroup;
use crate::filter::ComponentFilter;
use crate::key::{ComponentGroupKey, EntityGroupKey, GroupId};
use crate::matcher::MaskMatcher;
use crate::on_add::{
    ComponentGroupOnAdd, EntityGroupOnAdd, OnAddList, OnAddPolicy, SharedOnAddList,
};
use crate::signal::SubscriptionToken;

/// Last reported scene membership of an entity touched while detached.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Presence {
    InScene,
    OutOfScene,
}

/// Journal and parked memberships for one detach span.
#[derive(Default)]
struct DetachedState {
    /// Entities whose registration state changed while detached.
    touched: HashMap<Entity, Presence, FxBuildHasher>,
    /// Components unregistered while detached; their handles can no longer
    /// be enumerated through the host, so they are remembered here.
    removed_components: Vec<ComponentHandle>,
    /// Pre-detach entity group memberships.
    entity_members: HashMap<EntityGroupKey, Vec<Entity>, FxBuildHasher>,
    /// Pre-detach component group memberships.
    component_members: HashMap<ComponentGroupKey, Vec<ComponentHandle>, FxBuildHasher>,
}

struct EntityOnAddEntry {
    list: SharedOnAddList<Entity>,
    key: EntityGroupKey,
    added_token: SubscriptionToken,
    removed_token: SubscriptionToken,
    detach_backup: Option<Vec<Entity>>,
}

struct ComponentOnAddEntry {
    list: SharedOnAddList<ComponentHandle>,
    key: ComponentGroupKey,
    added_token: SubscriptionToken,
    removed_token: SubscriptionToken,
    detach_backup: Option<Vec<ComponentHandle>>,
}

/// Central registry of live groups; receives scene change notifications and
/// applies deferred membership mutations at the tick flush.
#[derive(Default)]
pub struct EntitiesManager {
    entity_groups: HashMap<EntityGroupKey, EntityGroup, FxBuildHasher>,
    component_groups: HashMap<ComponentGroupKey, Box<dyn ComponentGroupOps>, FxBuildHasher>,

    // A key sits in a worklist iff the matching pending buffer is non-empty.
    entity_groups_with_added: Vec<EntityGroupKey>,
    entity_groups_with_removed: Vec<EntityGroupKey>,
    component_groups_with_added: Vec<ComponentGroupKey>,
    component_groups_with_removed: Vec<ComponentGroupKey>,

    entity_on_add: Vec<EntityOnAddEntry>,
    component_on_add: Vec<ComponentOnAddEntry>,

    next_group_id: u32,
    signals_suppressed: bool,
    detached: Option<DetachedState>,
}

impl EntitiesManager {
    /// Create a manager with no groups.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc_group_id(&mut self) -> GroupId {
        let id = GroupId::from_raw(self.next_group_id);
        self.next_group_id += 1;
        id
    }

    // ------------------------------------------------------------------
    // Registration entry points
    // ------------------------------------------------------------------

    /// Notify the index that an entity joined the scene.
    ///
    /// Must be called after the host attached the entity (mask and
    /// component access reflect its full state). The host delivers one call
    /// per entity, including each entity of an attached subtree.
    pub fn register_entity(&mut self, host: &impl SceneHost, entity: Entity) {
        if let Some(state) = &mut self.detached {
            state.touched.insert(entity, Presence::InScene);
            return;
        }
        self.index_entity(host, entity, true);
    }

    /// Notify the index that an entity is leaving the scene.
    ///
    /// Must be called while the entity is still fully queryable.
    pub fn unregister_entity(&mut self, host: &impl SceneHost, entity: Entity) {
        if let Some(state) = &mut self.detached {
            state.touched.insert(entity, Presence::OutOfScene);
            return;
        }
        self.index_entity(host, entity, false);
    }

    /// Fan one whole-entity event out to every matching group.
    fn index_entity(&mut self, host: &impl SceneHost, entity: Entity, add: bool) {
        let candidate = host.component_mask(entity);
        let emit = !self.signals_suppressed;

        for (key, group) in &mut self.component_groups {
            if !key.matcher.matches(key.mask, candidate) {
                continue;
            }
            for i in 0..host.component_count(entity, key.tracked) {
                let c = host.component_at(entity, key.tracked, i);
                let edge = if add {
                    group.cache_added(c, emit)
                } else {
                    group.cache_removed(c, emit)
                };
                if edge {
                    if add {
                        self.component_groups_with_added.push(*key);
                    } else {
                        self.component_groups_with_removed.push(*key);
                    }
                }
            }
        }

        for (key, group) in &mut self.entity_groups {
            if !key.matcher.matches(key.mask, candidate) {
                continue;
            }
            let edge = if add {
                group.cache_added(entity, emit)
            } else {
                group.cache_removed(entity, emit)
            };
            if edge {
                if add {
                    self.entity_groups_with_added.push(*key);
                } else {
                    self.entity_groups_with_removed.push(*key);
                }
            }
        }
    }

    /// Notify the index that a component was attached to a registered
    /// entity.
    ///
    /// Must be called after the host attached it: the entity's mask already
    /// has the bit for `ty` and `component_count` already counts it.
    pub fn register_component(
        &mut self,
        host: &impl SceneHost,
        entity: Entity,
        component: ComponentHandle,
        ty: ComponentTypeId,
    ) {
        if let Some(state) = &mut self.detached {
            state.touched.entry(entity).or_insert(Presence::InScene);
            return;
        }

        let cur = host.component_mask(entity);
        debug_assert!(
            cur.test(ty),
            "register_component must run after the host attached the component"
        );
        let first_of_type = host.component_count(entity, ty) == 1;
        // Mask the entity had before this component arrived; only a first
        // component of its type can flip a query from unmatched to matched.
        let prev = if first_of_type { cur.without(ty) } else { cur };
        let emit = !self.signals_suppressed;

        for (key, group) in &mut self.component_groups {
            if !key.matcher.matches(key.mask, cur) || !key.mask.test(ty) {
                continue;
            }
            let newly_matches = first_of_type && !key.matcher.matches(key.mask, prev);
            if newly_matches {
                // The entity just started satisfying this query: every
                // already-present component of the tracked type joins the
                // group, possibly none.
                for i in 0..host.component_count(entity, key.tracked) {
                    let c = host.component_at(entity, key.tracked, i);
                    if group.cache_added(c, emit) {
                        self.component_groups_with_added.push(*key);
                    }
                }
            } else if key.tracked == ty {
                // Extra component of the tracked type on an entity the
                // group already covers.
                if group.cache_added(component, emit) {
                    self.component_groups_with_added.push(*key);
                }
            }
        }

        for (key, group) in &mut self.entity_groups {
            if !key.matcher.matches(key.mask, cur) {
                continue;
            }
            // A second component of the same type cannot change the mask,
            // so `newly_matches` is false and no duplicate add is cached.
            let newly_matches = first_of_type && !key.matcher.matches(key.mask, prev);
            if newly_matches && group.cache_added(entity, emit) {
                self.entity_groups_with_added.push(*key);
            }
        }
    }

    /// Notify the index that a component is being detached from a
    /// registered entity.
    ///
    /// Must be called while the component is still attached: the entity's
    /// mask still has the bit for `ty` and `component_count` still counts
    /// it.
    pub fn unregister_component(
        &mut self,
        host: &impl SceneHost,
        entity: Entity,
        component: ComponentHandle,
        ty: ComponentTypeId,
    ) {
        if let Some(state) = &mut self.detached {
            state.touched.entry(entity).or_insert(Presence::InScene);
            state.removed_components.push(component);
            return;
        }

        let cur = host.component_mask(entity);
        debug_assert!(
            cur.test(ty),
            "unregister_component must run while the component is attached"
        );
        let last_of_type = host.component_count(entity, ty) == 1;
        let after = if last_of_type { cur.without(ty) } else { cur };
        let emit = !self.signals_suppressed;

        for (key, group) in &mut self.component_groups {
            if !key.matcher.matches(key.mask, cur) || !key.mask.test(ty) {
                continue;
            }
            let stops_matching = !key.matcher.matches(key.mask, after);
            if stops_matching {
                // The entity is falling out of this query: every component
                // of the tracked type leaves with it.
                for i in 0..host.component_count(entity, key.tracked) {
                    let c = host.component_at(entity, key.tracked, i);
                    if group.cache_removed(c, emit) {
                        self.component_groups_with_removed.push(*key);
                    }
                }
            } else if key.tracked == ty {
                if group.cache_removed(component, emit) {
                    self.component_groups_with_removed.push(*key);
                }
            }
        }

        for (key, group) in &mut self.entity_groups {
            if !key.matcher.matches(key.mask, cur) {
                continue;
            }
            let stops_matching = !key.matcher.matches(key.mask, after);
            if stops_matching && group.cache_removed(entity, emit) {
                self.entity_groups_with_removed.push(*key);
            }
        }
    }

    // ------------------------------------------------------------------
    // Flush
    // ------------------------------------------------------------------

    /// Apply every pending membership mutation.
    ///
    /// Call once per scene tick, after all registration churn for the tick
    /// and before systems read group members. Additions are applied before
    /// removals, entity groups before component groups.
    pub fn update_caches(&mut self) {
        let pending = self.entity_groups_with_added.len()
            + self.entity_groups_with_removed.len()
            + self.component_groups_with_added.len()
            + self.component_groups_with_removed.len();

        for key in self.entity_groups_with_added.drain(..) {
            self.entity_groups
                .get_mut(&key)
                .expect("worklist key must resolve to a live group")
                .apply_cached_added();
        }
        for key in self.entity_groups_with_removed.drain(..) {
            self.entity_groups
                .get_mut(&key)
                .expect("worklist key must resolve to a live group")
                .apply_cached_removed();
        }
        for key in self.component_groups_with_added.drain(..) {
            self.component_groups
                .get_mut(&key)
                .expect("worklist key must resolve to a live group")
                .apply_cached_added();
        }
        for key in self.component_groups_with_removed.drain(..) {
            self.component_groups
                .get_mut(&key)
                .expect("worklist key must resolve to a live group")
                .apply_cached_removed();
        }

        if pending > 0 {
            trace!(groups = pending, "applied cached group mutations");
        }
    }

    // ------------------------------------------------------------------
    // Group acquisition
    // ------------------------------------------------------------------

    /// Look up or create the entity group for `(filter, matcher)`.
    ///
    /// Equal queries share one group instance. On first creation the group
    /// is populated immediately (no signals, no caching) from `root` and
    /// all of its descendants.
    pub fn acquire_entity_group<F: ComponentFilter>(
        &mut self,
        host: &impl SceneHost,
        registry: &mut ComponentRegistry,
        matcher: MaskMatcher,
        root: Entity,
    ) -> &mut EntityGroup {
        assert!(
            self.detached.is_none(),
            "cannot acquire groups in detached state"
        );
        let key = EntityGroupKey {
            mask: F::mask(registry),
            matcher,
        };

        if !self.entity_groups.contains_key(&key) {
            let id = self.alloc_group_id();
            debug!(?key, group = id.as_raw(), "creating entity group");
            let mut group = EntityGroup::new(id, key);

            let mut stack: SmallVec<[Entity; 16]> = SmallVec::new();
            stack.push(root);
            while let Some(entity) = stack.pop() {
                if matcher.matches(key.mask, host.component_mask(entity)) {
                    group.populate(entity);
                }
                stack.extend(host.children(entity));
            }

            self.entity_groups.insert(key, group);
        }

        self.entity_groups
            .get_mut(&key)
            .expect("group was just ensured")
    }

    /// Look up or create the component group for `T` under
    /// `(T + filter, matcher)`.
    ///
    /// The query mask always includes `T` itself. Same sharing and initial
    /// population rules as [`acquire_entity_group`](Self::acquire_entity_group).
    pub fn acquire_component_group<T: 'static, F: ComponentFilter>(
        &mut self,
        host: &impl SceneHost,
        registry: &mut ComponentRegistry,
        matcher: MaskMatcher,
        root: Entity,
    ) -> &mut ComponentGroup<T> {
        assert!(
            self.detached.is_none(),
            "cannot acquire groups in detached state"
        );
        let tracked = registry.register::<T>();
        let key = ComponentGroupKey {
            mask: F::mask(registry).with(tracked),
            matcher,
            tracked,
        };

        if !self.component_groups.contains_key(&key) {
            let id = self.alloc_group_id();
            debug!(?key, group = id.as_raw(), "creating component group");
            let mut group = ComponentGroup::<T>::new(id, key);

            let mut stack: SmallVec<[Entity; 16]> = SmallVec::new();
            stack.push(root);
            while let Some(entity) = stack.pop() {
                if matcher.matches(key.mask, host.component_mask(entity)) {
                    for i in 0..host.component_count(entity, tracked) {
                        group.populate(host.component_at(entity, tracked, i));
                    }
                }
                stack.extend(host.children(entity));
            }

            self.component_groups.insert(key, Box::new(group));
        }

        self.component_groups
            .get_mut(&key)
            .expect("group was just ensured")
            .as_any_mut()
            .downcast_mut::<ComponentGroup<T>>()
            .expect("component group key resolved to a different component type")
    }

    /// Existing entity group for a key, if acquired before.
    #[must_use]
    pub fn entity_group(&self, key: EntityGroupKey) -> Option<&EntityGroup> {
        self.entity_groups.get(&key)
    }

    /// Mutable access to an existing entity group, for channel
    /// subscription.
    #[must_use]
    pub fn entity_group_mut(&mut self, key: EntityGroupKey) -> Option<&mut EntityGroup> {
        self.entity_groups.get_mut(&key)
    }

    /// Existing component group for a key, if acquired before.
    #[must_use]
    pub fn component_group<T: 'static>(&self, key: ComponentGroupKey) -> Option<&ComponentGroup<T>> {
        self.component_groups
            .get(&key)
            .and_then(|g| g.as_any().downcast_ref::<ComponentGroup<T>>())
    }

    /// Mutable access to an existing component group, for channel
    /// subscription.
    #[must_use]
    pub fn component_group_mut<T: 'static>(
        &mut self,
        key: ComponentGroupKey,
    ) -> Option<&mut ComponentGroup<T>> {
        self.component_groups
            .get_mut(&key)
            .and_then(|g| g.as_any_mut().downcast_mut::<ComponentGroup<T>>())
    }

    /// Number of live entity groups.
    #[must_use]
    pub fn entity_group_count(&self) -> usize {
        self.entity_groups.len()
    }

    /// Number of live component groups.
    #[must_use]
    pub fn component_group_count(&self) -> usize {
        self.component_groups.len()
    }

    // ------------------------------------------------------------------
    // On-add adaptors
    // ------------------------------------------------------------------

    /// Attach a recently-added adaptor to an already-acquired entity group.
    ///
    /// The list is seeded with the group's current members. The manager
    /// keeps the subscription alive until
    /// [`release_entity_group_on_add`](Self::release_entity_group_on_add).
    pub fn acquire_entity_group_on_add(
        &mut self,
        key: EntityGroupKey,
        policy: OnAddPolicy,
    ) -> EntityGroupOnAdd {
        assert!(
            self.detached.is_none(),
            "cannot acquire adaptors in detached state"
        );
        let group = self
            .entity_groups
            .get_mut(&key)
            .expect("entity group must be acquired before its on-add adaptor");

        let list = Rc::new(RefCell::new(OnAddList::new(policy)));
        list.borrow_mut().extend(group.members().iter().copied());

        let weak = Rc::downgrade(&list);
        let added_token = group.on_added().connect(move |entity| {
            if let Some(list) = weak.upgrade() {
                list.borrow_mut().push(entity);
            }
        });
        let weak = Rc::downgrade(&list);
        let removed_token = group.on_removed().connect(move |entity| {
            if let Some(list) = weak.upgrade() {
                list.borrow_mut().on_member_removed(entity);
            }
        });

        self.entity_on_add.push(EntityOnAddEntry {
            list: list.clone(),
            key,
            added_token,
            removed_token,
            detach_backup: None,
        });
        EntityGroupOnAdd::new(list, key)
    }

    /// Attach a recently-added adaptor to an already-acquired component
    /// group.
    pub fn acquire_component_group_on_add<T: 'static>(
        &mut self,
        key: ComponentGroupKey,
        policy: OnAddPolicy,
    ) -> ComponentGroupOnAdd<T> {
        assert!(
            self.detached.is_none(),
            "cannot acquire adaptors in detached state"
        );
        let group = self
            .component_groups
            .get_mut(&key)
            .expect("component group must be acquired before its on-add adaptor")
            .as_any_mut()
            .downcast_mut::<ComponentGroup<T>>()
            .expect("component group key resolved to a different component type");

        let list = Rc::new(RefCell::new(OnAddList::new(policy)));
        list.borrow_mut()
            .extend(group.members().iter().map(|r| r.handle()));

        let weak = Rc::downgrade(&list);
        let added_token = group.on_added().connect(move |r| {
            if let Some(list) = weak.upgrade() {
                list.borrow_mut().push(r.handle());
            }
        });
        let weak = Rc::downgrade(&list);
        let removed_token = group.on_removed().connect(move |r| {
            if let Some(list) = weak.upgrade() {
                list.borrow_mut().on_member_removed(r.handle());
            }
        });

        self.component_on_add.push(ComponentOnAddEntry {
            list: list.clone(),
            key,
            added_token,
            removed_token,
            detach_backup: None,
        });
        ComponentGroupOnAdd::new(list, key)
    }

    /// Drop the manager-side subscription of an entity on-add adaptor.
    pub fn release_entity_group_on_add(&mut self, adaptor: &EntityGroupOnAdd) {
        let Some(pos) = self
            .entity_on_add
            .iter()
            .position(|entry| Rc::ptr_eq(&entry.list, adaptor.list()))
        else {
            return;
        };
        let entry = self.entity_on_add.swap_remove(pos);
        if let Some(group) = self.entity_groups.get_mut(&entry.key) {
            group.on_added().disconnect(entry.added_token);
            group.on_removed().disconnect(entry.removed_token);
        }
    }

    /// Drop the manager-side subscription of a component on-add adaptor.
    pub fn release_component_group_on_add<T: 'static>(
        &mut self,
        adaptor: &ComponentGroupOnAdd<T>,
    ) {
        let Some(pos) = self
            .component_on_add
            .iter()
            .position(|entry| Rc::ptr_eq(&entry.list, adaptor.list()))
        else {
            return;
        };
        let entry = self.component_on_add.swap_remove(pos);
        if let Some(group) = self.component_groups.get_mut(&entry.key) {
            let typed = group
                .as_any_mut()
                .downcast_mut::<ComponentGroup<T>>()
                .expect("component group key resolved to a different component type");
            typed.on_added().disconnect(entry.added_token);
            typed.on_removed().disconnect(entry.removed_token);
        }
    }

    // ------------------------------------------------------------------
    // Signal suppression and detached state
    // ------------------------------------------------------------------

    /// Stop emitting on group change channels; caching still happens.
    pub fn suppress_signals(&mut self) {
        self.signals_suppressed = true;
    }

    /// Resume emitting on group change channels.
    pub fn allow_signals(&mut self) {
        self.signals_suppressed = false;
    }

    /// Whether groups are currently detached.
    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.detached.is_some()
    }

    /// Park every group's membership (and every adaptor's list) aside.
    ///
    /// While detached, real-scene registration events are journaled instead
    /// of applied; group members reflect only content indexed through
    /// [`register_detached_entity`](Self::register_detached_entity).
    ///
    /// # Panics
    ///
    /// Panics when already detached, or when pending mutations have not
    /// been flushed with [`update_caches`](Self::update_caches).
    pub fn detach_groups(&mut self) {
        assert!(
            self.detached.is_none(),
            "recursive detach is not supported"
        );
        assert!(
            self.entity_groups_with_added.is_empty()
                && self.entity_groups_with_removed.is_empty()
                && self.component_groups_with_added.is_empty()
                && self.component_groups_with_removed.is_empty(),
            "detach_groups requires update_caches first"
        );

        let mut state = DetachedState::default();
        for (key, group) in &mut self.entity_groups {
            state.entity_members.insert(*key, group.take_members());
        }
        for (key, group) in &mut self.component_groups {
            state.component_members.insert(*key, group.take_members());
        }
        for entry in &mut self.entity_on_add {
            entry.detach_backup = Some(entry.list.borrow_mut().take());
        }
        for entry in &mut self.component_on_add {
            entry.detach_backup = Some(entry.list.borrow_mut().take());
        }

        debug!(
            entity_groups = self.entity_groups.len(),
            component_groups = self.component_groups.len(),
            "detached groups"
        );
        self.detached = Some(state);
    }

    /// Index one entity into the detached (preview) groups, with signals
    /// suppressed. Only valid while detached.
    pub fn register_detached_entity(&mut self, host: &impl SceneHost, entity: Entity) {
        assert!(
            self.detached.is_some(),
            "register_detached_entity requires detached state"
        );
        let saved = self.signals_suppressed;
        self.signals_suppressed = true;
        self.index_entity(host, entity, true);
        self.signals_suppressed = saved;
    }

    /// Bring parked memberships back and reconcile the detach-span journal
    /// against the host's current state.
    ///
    /// Preview content indexed while detached is discarded. Entities whose
    /// registration changed while detached are re-evaluated against every
    /// group with signals suppressed; the host must still answer queries
    /// for entities that were unregistered during the detach span.
    ///
    /// # Panics
    ///
    /// Panics when not detached.
    pub fn restore_groups(&mut self, host: &impl SceneHost) {
        let Some(mut state) = self.detached.take() else {
            panic!("restore_groups requires detached state");
        };

        // Flush preview leftovers so the pending buffers are empty, then
        // throw the preview memberships away.
        self.update_caches();
        for (key, members) in state.entity_members.drain() {
            if let Some(group) = self.entity_groups.get_mut(&key) {
                group.replace_members(members);
            }
        }
        for (key, members) in state.component_members.drain() {
            if let Some(group) = self.component_groups.get_mut(&key) {
                group.replace_members(members);
            }
        }
        for entry in &mut self.entity_on_add {
            if let Some(backup) = entry.detach_backup.take() {
                entry.list.borrow_mut().merge_front(backup);
            }
        }
        for entry in &mut self.component_on_add {
            if let Some(backup) = entry.detach_backup.take() {
                entry.list.borrow_mut().merge_front(backup);
            }
        }

        let saved = self.signals_suppressed;
        self.signals_suppressed = true;

        // Components that left the host while detached can no longer be
        // enumerated; purge them from whichever groups still hold them.
        state.removed_components.sort_unstable();
        state.removed_components.dedup();
        for &component in &state.removed_components {
            for (key, group) in &mut self.component_groups {
                if group.contains(component) && group.cache_removed(component, false) {
                    self.component_groups_with_removed.push(*key);
                }
            }
        }

        // Re-evaluate every entity the journal touched against every group.
        for (&entity, &presence) in &state.touched {
            match presence {
                Presence::OutOfScene => {
                    for (key, group) in &mut self.entity_groups {
                        if group.members().contains(entity)
                            && group.cache_removed(entity, false)
                        {
                            self.entity_groups_with_removed.push(*key);
                        }
                    }
                    for (key, group) in &mut self.component_groups {
                        for i in 0..host.component_count(entity, key.tracked) {
                            let c = host.component_at(entity, key.tracked, i);
                            if group.contains(c) && group.cache_removed(c, false) {
                                self.component_groups_with_removed.push(*key);
                            }
                        }
                    }
                }
                Presence::InScene => {
                    let mask = host.component_mask(entity);
                    for (key, group) in &mut self.entity_groups {
                        let want = key.matcher.matches(key.mask, mask);
                        let present = group.members().contains(entity);
                        if want && !present {
                            if group.cache_added(entity, false) {
                                self.entity_groups_with_added.push(*key);
                            }
                        } else if !want && present && group.cache_removed(entity, false) {
                            self.entity_groups_with_removed.push(*key);
                        }
                    }
                    for (key, group) in &mut self.component_groups {
                        let want = key.matcher.matches(key.mask, mask);
                        for i in 0..host.component_count(entity, key.tracked) {
                            let c = host.component_at(entity, key.tracked, i);
                            let present = group.contains(c);
                            if want && !present {
                                if group.cache_added(c, false) {
                                    self.component_groups_with_added.push(*key);
                                }
                            } else if !want && present && group.cache_removed(c, false) {
                                self.component_groups_with_removed.push(*key);
                            }
                        }
                    }
                }
            }
        }

        self.update_caches();
        self.signals_suppressed = saved;
        debug!(
            touched = state.touched.len(),
            "restored groups"
        );
    }
}

impl std::fmt::Debug for EntitiesManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntitiesManager")
            .field("entity_groups", &self.entity_groups.len())
            .field("component_groups", &self.component_groups.len())
            .field("detached", &self.detached.is_some())
            .finish()
    }
}
