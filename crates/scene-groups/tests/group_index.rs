//! End-to-end coverage of the group index against a small in-memory scene.
//!
//! The fixture scene stores entities in a flat map with parent/child links
//! and hands out opaque component handles, which is all the index ever asks
//! of a host.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use scene_core::{ComponentHandle, ComponentMask, ComponentTypeId, Entity, SceneHost};
use scene_groups::prelude::*;

struct Position;
struct Velocity;
struct Light;
struct Camera;
struct Visible;

#[derive(Default)]
struct Node {
    children: Vec<Entity>,
    mask: ComponentMask,
    components: HashMap<ComponentTypeId, Vec<ComponentHandle>>,
}

/// Minimal host: a flat entity arena with parent/child links and
/// per-entity component handle lists.
struct TestScene {
    nodes: HashMap<Entity, Node>,
    next_id: u32,
    next_handle: u64,
}

impl TestScene {
    fn new() -> (Self, Entity) {
        let root = Entity::new(0, 0);
        let mut nodes = HashMap::new();
        nodes.insert(root, Node::default());
        let scene = Self {
            nodes,
            next_id: 1,
            next_handle: 1,
        };
        (scene, root)
    }

    fn spawn(&mut self, parent: Entity) -> Entity {
        let entity = Entity::new(self.next_id, 0);
        self.next_id += 1;
        self.nodes.insert(entity, Node::default());
        self.nodes
            .get_mut(&parent)
            .expect("spawn parent must exist")
            .children
            .push(entity);
        entity
    }

    fn add_component(&mut self, entity: Entity, ty: ComponentTypeId) -> ComponentHandle {
        let c = ComponentHandle::from_bits(self.next_handle);
        self.next_handle += 1;
        let node = self.nodes.get_mut(&entity).expect("entity must exist");
        node.components.entry(ty).or_default().push(c);
        node.mask.set(ty);
        c
    }

    fn remove_component(&mut self, entity: Entity, ty: ComponentTypeId, component: ComponentHandle) {
        let node = self.nodes.get_mut(&entity).expect("entity must exist");
        let list = node.components.get_mut(&ty).expect("type must be attached");
        list.retain(|&c| c != component);
        if list.is_empty() {
            node.components.remove(&ty);
            node.mask.clear(ty);
        }
    }
}

impl SceneHost for TestScene {
    fn component_mask(&self, entity: Entity) -> ComponentMask {
        self.nodes
            .get(&entity)
            .map_or(ComponentMask::EMPTY, |node| node.mask)
    }

    fn component_count(&self, entity: Entity, ty: ComponentTypeId) -> usize {
        self.nodes
            .get(&entity)
            .and_then(|node| node.components.get(&ty))
            .map_or(0, Vec::len)
    }

    fn component_at(&self, entity: Entity, ty: ComponentTypeId, index: usize) -> ComponentHandle {
        self.nodes[&entity].components[&ty][index]
    }

    fn children(&self, entity: Entity) -> Vec<Entity> {
        self.nodes
            .get(&entity)
            .map_or_else(Vec::new, |node| node.children.clone())
    }
}

struct Fixture {
    scene: TestScene,
    registry: ComponentRegistry,
    manager: EntitiesManager,
    root: Entity,
}

impl Fixture {
    fn new() -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let (scene, root) = TestScene::new();
        Self {
            scene,
            registry: ComponentRegistry::new(),
            manager: EntitiesManager::new(),
            root,
        }
    }

    /// Spawn under `parent` and report the registration to the index.
    fn spawn(&mut self, parent: Entity) -> Entity {
        let entity = self.scene.spawn(parent);
        self.manager.register_entity(&self.scene, entity);
        entity
    }

    /// Attach a component of type `T` and report it to the index.
    fn add<T: 'static>(&mut self, entity: Entity) -> ComponentHandle {
        let ty = self.registry.register::<T>();
        let c = self.scene.add_component(entity, ty);
        self.manager.register_component(&self.scene, entity, c, ty);
        c
    }

    /// Report removal to the index, then detach the component.
    fn remove<T: 'static>(&mut self, entity: Entity, component: ComponentHandle) {
        let ty = self.registry.register::<T>();
        self.manager
            .unregister_component(&self.scene, entity, component, ty);
        self.scene.remove_component(entity, ty, component);
    }

    fn flush(&mut self) {
        self.manager.update_caches();
    }

    fn acquire_entities<F: ComponentFilter>(&mut self, matcher: MaskMatcher) -> EntityGroupKey {
        self.manager
            .acquire_entity_group::<F>(&self.scene, &mut self.registry, matcher, self.root)
            .key()
    }

    fn acquire_components<T: 'static, F: ComponentFilter>(
        &mut self,
        matcher: MaskMatcher,
    ) -> ComponentGroupKey {
        self.manager
            .acquire_component_group::<T, F>(&self.scene, &mut self.registry, matcher, self.root)
            .key()
    }

    fn entity_members(&self, key: EntityGroupKey) -> Vec<Entity> {
        self.manager
            .entity_group(key)
            .expect("group must exist")
            .members()
            .iter()
            .copied()
            .collect()
    }

    fn component_members<T: 'static>(&self, key: ComponentGroupKey) -> Vec<ComponentHandle> {
        self.manager
            .component_group::<T>(key)
            .expect("group must exist")
            .members()
            .iter()
            .map(|r| r.handle())
            .collect()
    }

    /// Subscribe a collecting listener to an entity group's added channel.
    fn watch_entity_added(&mut self, key: EntityGroupKey) -> Rc<RefCell<Vec<Entity>>> {
        let sink = Rc::new(RefCell::new(Vec::new()));
        let out = sink.clone();
        self.manager
            .entity_group_mut(key)
            .expect("group must exist")
            .on_added()
            .connect(move |e| out.borrow_mut().push(e));
        sink
    }

    fn watch_entity_removed(&mut self, key: EntityGroupKey) -> Rc<RefCell<Vec<Entity>>> {
        let sink = Rc::new(RefCell::new(Vec::new()));
        let out = sink.clone();
        self.manager
            .entity_group_mut(key)
            .expect("group must exist")
            .on_removed()
            .connect(move |e| out.borrow_mut().push(e));
        sink
    }
}

fn sorted<T: Ord>(mut v: Vec<T>) -> Vec<T> {
    v.sort_unstable();
    v
}

#[test]
fn test_all_of_entity_group_membership() {
    let mut f = Fixture::new();
    let key = f.acquire_entities::<(Position, Velocity)>(MaskMatcher::AllOf);

    let both = f.spawn(f.root);
    f.add::<Position>(both);
    f.add::<Velocity>(both);

    let only_pos = f.spawn(f.root);
    f.add::<Position>(only_pos);

    f.flush();
    assert_eq!(f.entity_members(key), vec![both]);
}

#[test]
fn test_any_of_entity_group_membership() {
    let mut f = Fixture::new();
    let key = f.acquire_entities::<(Light, Camera)>(MaskMatcher::AnyOf);

    let lit = f.spawn(f.root);
    f.add::<Light>(lit);
    let seen = f.spawn(f.root);
    f.add::<Camera>(seen);
    let plain = f.spawn(f.root);
    f.add::<Position>(plain);

    f.flush();
    assert_eq!(sorted(f.entity_members(key)), sorted(vec![lit, seen]));
}

#[test]
fn test_position_velocity_lifecycle() {
    let mut f = Fixture::new();
    let key = f.acquire_entities::<(Position, Velocity)>(MaskMatcher::AllOf);

    let e1 = f.spawn(f.root);
    let position = f.add::<Position>(e1);
    f.flush();
    assert!(f.entity_members(key).is_empty());

    f.add::<Velocity>(e1);
    f.flush();
    assert_eq!(f.entity_members(key), vec![e1]);

    f.remove::<Position>(e1, position);
    f.flush();
    assert!(f.entity_members(key).is_empty());
}

#[test]
fn test_any_of_component_group_needs_actual_instances() {
    let mut f = Fixture::new();
    // Query matches entities holding Light or Camera, but the group only
    // ever indexes Light instances.
    let key = f.acquire_components::<Light, (Camera,)>(MaskMatcher::AnyOf);

    let e = f.spawn(f.root);
    f.add::<Camera>(e);
    f.flush();

    assert!(f.component_members::<Light>(key).is_empty());

    let light = f.add::<Light>(e);
    f.flush();
    assert_eq!(f.component_members::<Light>(key), vec![light]);
}

#[test]
fn test_acquire_is_memoized() {
    let mut f = Fixture::new();
    let a = f
        .manager
        .acquire_entity_group::<(Position,)>(&f.scene, &mut f.registry, MaskMatcher::AllOf, f.root)
        .id();
    let b = f
        .manager
        .acquire_entity_group::<(Position,)>(&f.scene, &mut f.registry, MaskMatcher::AllOf, f.root)
        .id();
    assert_eq!(a, b);

    let c = f
        .manager
        .acquire_component_group::<Light, ()>(&f.scene, &mut f.registry, MaskMatcher::AllOf, f.root)
        .id();
    let d = f
        .manager
        .acquire_component_group::<Light, ()>(&f.scene, &mut f.registry, MaskMatcher::AllOf, f.root)
        .id();
    assert_eq!(c, d);
    assert_ne!(a, c);
    assert_eq!(f.manager.entity_group_count(), 1);
    assert_eq!(f.manager.component_group_count(), 1);
}

#[test]
fn test_first_acquire_populates_existing_hierarchy() {
    let mut f = Fixture::new();

    // Build a small tree before any group exists.
    let parent = f.spawn(f.root);
    f.add::<Light>(parent);
    let child = f.spawn(parent);
    f.add::<Light>(child);
    let grandchild = f.spawn(child);
    let gc_light = f.add::<Light>(grandchild);
    let dark = f.spawn(parent);
    f.add::<Position>(dark);
    f.flush();

    let key = f.acquire_entities::<(Light,)>(MaskMatcher::AllOf);
    // Initial population is immediate, no flush needed.
    assert_eq!(
        sorted(f.entity_members(key)),
        sorted(vec![parent, child, grandchild])
    );

    let ckey = f.acquire_components::<Light, ()>(MaskMatcher::AllOf);
    assert!(f.component_members::<Light>(ckey).contains(&gc_light));
    assert_eq!(f.component_members::<Light>(ckey).len(), 3);
}

#[test]
fn test_change_is_deferred_until_flush() {
    let mut f = Fixture::new();
    let key = f.acquire_entities::<(Position,)>(MaskMatcher::AllOf);
    let added = f.watch_entity_added(key);

    let e = f.spawn(f.root);
    f.add::<Position>(e);

    // Channel fired immediately, container untouched until the flush.
    assert_eq!(*added.borrow(), vec![e]);
    assert!(f.entity_members(key).is_empty());

    f.flush();
    assert_eq!(f.entity_members(key), vec![e]);
}

#[test]
fn test_removal_signal_fires_while_member_is_still_present() {
    let mut f = Fixture::new();
    let key = f.acquire_entities::<(Position,)>(MaskMatcher::AllOf);
    let e = f.spawn(f.root);
    let position = f.add::<Position>(e);
    f.flush();

    let removed = f.watch_entity_removed(key);
    f.remove::<Position>(e, position);

    assert_eq!(*removed.borrow(), vec![e]);
    assert_eq!(f.entity_members(key), vec![e]);

    f.flush();
    assert!(f.entity_members(key).is_empty());
}

#[test]
fn test_second_component_of_same_type_is_not_a_duplicate_add() {
    let mut f = Fixture::new();
    let key = f.acquire_entities::<(Light,)>(MaskMatcher::AllOf);
    let added = f.watch_entity_added(key);

    let e = f.spawn(f.root);
    f.add::<Light>(e);
    f.flush();
    assert_eq!(added.borrow().len(), 1);

    f.add::<Light>(e);
    f.flush();
    assert_eq!(added.borrow().len(), 1);
    assert_eq!(f.entity_members(key), vec![e]);
}

#[test]
fn test_any_of_membership_survives_partial_component_loss() {
    let mut f = Fixture::new();
    let key = f.acquire_entities::<(Light, Camera)>(MaskMatcher::AnyOf);
    let added = f.watch_entity_added(key);

    let e = f.spawn(f.root);
    let light = f.add::<Light>(e);
    f.flush();
    assert_eq!(f.entity_members(key), vec![e]);

    // Second matching type arrives: still one membership, one add event.
    let camera = f.add::<Camera>(e);
    f.flush();
    assert_eq!(added.borrow().len(), 1);
    assert_eq!(f.entity_members(key), vec![e]);

    // Losing one of two matching types keeps the entity in the group.
    f.remove::<Light>(e, light);
    f.flush();
    assert_eq!(f.entity_members(key), vec![e]);

    // Losing the last matching type drops it.
    f.remove::<Camera>(e, camera);
    f.flush();
    assert!(f.entity_members(key).is_empty());
}

#[test]
fn test_component_group_tracks_every_instance() {
    let mut f = Fixture::new();
    let key = f.acquire_components::<Light, ()>(MaskMatcher::AllOf);

    let e = f.spawn(f.root);
    let first = f.add::<Light>(e);
    let second = f.add::<Light>(e);
    f.flush();
    assert_eq!(
        sorted(f.component_members::<Light>(key)),
        sorted(vec![first, second])
    );

    f.remove::<Light>(e, first);
    f.flush();
    assert_eq!(f.component_members::<Light>(key), vec![second]);
}

#[test]
fn test_component_group_follows_filter_transitions() {
    let mut f = Fixture::new();
    let key = f.acquire_components::<Light, (Visible,)>(MaskMatcher::AllOf);

    let e = f.spawn(f.root);
    let light = f.add::<Light>(e);
    f.flush();
    assert!(f.component_members::<Light>(key).is_empty());

    // Satisfying the filter pulls in the already-present tracked instances.
    let visible = f.add::<Visible>(e);
    f.flush();
    assert_eq!(f.component_members::<Light>(key), vec![light]);

    // Breaking the filter pushes them back out.
    f.remove::<Visible>(e, visible);
    f.flush();
    assert!(f.component_members::<Light>(key).is_empty());
}

#[test]
fn test_unregister_entity_removes_from_all_groups() {
    let mut f = Fixture::new();
    let ekey = f.acquire_entities::<(Light,)>(MaskMatcher::AllOf);
    let ckey = f.acquire_components::<Light, ()>(MaskMatcher::AllOf);

    let e = f.spawn(f.root);
    f.add::<Light>(e);
    f.flush();
    assert_eq!(f.entity_members(ekey).len(), 1);
    assert_eq!(f.component_members::<Light>(ckey).len(), 1);

    f.manager.unregister_entity(&f.scene, e);
    f.flush();
    assert!(f.entity_members(ekey).is_empty());
    assert!(f.component_members::<Light>(ckey).is_empty());
}

#[test]
fn test_signal_suppression_keeps_membership_current() {
    let mut f = Fixture::new();
    let key = f.acquire_entities::<(Position,)>(MaskMatcher::AllOf);
    let added = f.watch_entity_added(key);

    f.manager.suppress_signals();
    let e = f.spawn(f.root);
    f.add::<Position>(e);
    f.flush();
    f.manager.allow_signals();

    assert!(added.borrow().is_empty());
    assert_eq!(f.entity_members(key), vec![e]);

    // Signals come back once allowed again.
    let e2 = f.spawn(f.root);
    f.add::<Position>(e2);
    assert_eq!(*added.borrow(), vec![e2]);
}

#[test]
fn test_on_add_running_list_erases_removed_members() {
    let mut f = Fixture::new();
    let key = f.acquire_entities::<(Position,)>(MaskMatcher::AllOf);
    let adaptor = f
        .manager
        .acquire_entity_group_on_add(key, OnAddPolicy::Running);

    let e1 = f.spawn(f.root);
    let p1 = f.add::<Position>(e1);
    let e2 = f.spawn(f.root);
    f.add::<Position>(e2);
    f.flush();
    assert_eq!(sorted(adaptor.entities()), sorted(vec![e1, e2]));

    f.remove::<Position>(e1, p1);
    f.flush();
    assert_eq!(adaptor.entities(), vec![e2]);

    f.manager.release_entity_group_on_add(&adaptor);
}

#[test]
fn test_on_add_per_tick_diff_is_a_pure_add_log() {
    let mut f = Fixture::new();
    let key = f.acquire_entities::<(Position,)>(MaskMatcher::AllOf);

    // Seeded with the group's current members.
    let e0 = f.spawn(f.root);
    f.add::<Position>(e0);
    f.flush();
    let adaptor = f
        .manager
        .acquire_entity_group_on_add(key, OnAddPolicy::PerTickDiff);
    assert_eq!(adaptor.entities(), vec![e0]);
    assert_eq!(adaptor.take(), vec![e0]);
    assert!(adaptor.is_empty());

    let e1 = f.spawn(f.root);
    let p1 = f.add::<Position>(e1);
    // A removal in the same tick does not retract the logged add.
    f.remove::<Position>(e1, p1);
    f.flush();
    assert_eq!(adaptor.take(), vec![e1]);

    f.manager.release_entity_group_on_add(&adaptor);
}

#[test]
fn test_released_on_add_adaptor_stops_receiving() {
    let mut f = Fixture::new();
    let key = f.acquire_entities::<(Position,)>(MaskMatcher::AllOf);
    let adaptor = f
        .manager
        .acquire_entity_group_on_add(key, OnAddPolicy::Running);
    f.manager.release_entity_group_on_add(&adaptor);

    let e = f.spawn(f.root);
    f.add::<Position>(e);
    f.flush();
    assert!(adaptor.is_empty());
}

#[test]
fn test_component_on_add_adaptor() {
    let mut f = Fixture::new();
    let key = f.acquire_components::<Light, ()>(MaskMatcher::AllOf);
    let adaptor = f
        .manager
        .acquire_component_group_on_add::<Light>(key, OnAddPolicy::Running);

    let e = f.spawn(f.root);
    let light = f.add::<Light>(e);
    f.flush();
    let seen: Vec<ComponentHandle> = adaptor.components().iter().map(|r| r.handle()).collect();
    assert_eq!(seen, vec![light]);

    f.manager.release_component_group_on_add(&adaptor);
}

#[test]
fn test_detach_parks_members_and_restore_brings_them_back() {
    let mut f = Fixture::new();
    let key = f.acquire_entities::<(Position,)>(MaskMatcher::AllOf);
    let e1 = f.spawn(f.root);
    f.add::<Position>(e1);
    f.flush();

    f.manager.detach_groups();
    assert!(f.manager.is_detached());
    assert!(f.entity_members(key).is_empty());

    // Preview content: attached to the host directly, indexed explicitly.
    let preview = f.scene.spawn(f.root);
    let ty = f.registry.register::<Position>();
    f.scene.add_component(preview, ty);
    f.manager.register_detached_entity(&f.scene, preview);
    f.flush();
    assert_eq!(f.entity_members(key), vec![preview]);

    f.manager.restore_groups(&f.scene);
    assert!(!f.manager.is_detached());
    assert_eq!(f.entity_members(key), vec![e1]);
}

#[test]
fn test_restore_reconciles_changes_made_while_detached() {
    let mut f = Fixture::new();
    let key = f.acquire_entities::<(Position,)>(MaskMatcher::AllOf);
    let added = f.watch_entity_added(key);
    let removed = f.watch_entity_removed(key);

    let e1 = f.spawn(f.root);
    f.add::<Position>(e1);
    f.flush();
    added.borrow_mut().clear();

    f.manager.detach_groups();

    // While detached: e1 leaves the scene, e2 joins with a matching mask.
    // The host keeps answering queries for e1 until restore completes.
    f.manager.unregister_entity(&f.scene, e1);
    let e2 = f.scene.spawn(f.root);
    let ty = f.registry.register::<Position>();
    let c2 = f.scene.add_component(e2, ty);
    f.manager.register_entity(&f.scene, e2);
    f.manager.register_component(&f.scene, e2, c2, ty);

    f.manager.restore_groups(&f.scene);
    assert_eq!(f.entity_members(key), vec![e2]);
    // Reconciliation is silent.
    assert!(added.borrow().is_empty());
    assert!(removed.borrow().is_empty());
}

#[test]
fn test_restore_purges_components_removed_while_detached() {
    let mut f = Fixture::new();
    let ekey = f.acquire_entities::<(Light,)>(MaskMatcher::AllOf);
    let ckey = f.acquire_components::<Light, ()>(MaskMatcher::AllOf);

    let e = f.spawn(f.root);
    let light = f.add::<Light>(e);
    f.flush();

    f.manager.detach_groups();
    let ty = f.registry.register::<Light>();
    f.manager.unregister_component(&f.scene, e, light, ty);
    f.scene.remove_component(e, ty, light);
    f.manager.restore_groups(&f.scene);

    assert!(f.entity_members(ekey).is_empty());
    assert!(f.component_members::<Light>(ckey).is_empty());
}

#[test]
fn test_detach_preserves_on_add_lists() {
    let mut f = Fixture::new();
    let key = f.acquire_entities::<(Position,)>(MaskMatcher::AllOf);
    let adaptor = f
        .manager
        .acquire_entity_group_on_add(key, OnAddPolicy::PerTickDiff);

    let e1 = f.spawn(f.root);
    f.add::<Position>(e1);
    f.flush();
    assert_eq!(adaptor.len(), 1);

    f.manager.detach_groups();
    // The list is parked with the group memberships.
    assert!(adaptor.is_empty());
    f.manager.restore_groups(&f.scene);

    assert_eq!(adaptor.take(), vec![e1]);
    f.manager.release_entity_group_on_add(&adaptor);
}
