use super::input::InputSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

/// Ground-plane vector. Everything in the camp lives on the horizontal plane,
/// so `x`/`y` here are the two horizontal axes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length_sq(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn length(self) -> f32 {
        self.length_sq().sqrt()
    }

    pub fn distance(self, other: Self) -> f32 {
        Self::new(other.x - self.x, other.y - self.y).length()
    }

    pub fn offset(self, direction: Self, amount: f32) -> Self {
        Self::new(self.x + direction.x * amount, self.y + direction.y * amount)
    }

    /// Unit vector in the same direction, or `None` for a zero-length input.
    pub fn normalized(self) -> Option<Self> {
        let len_sq = self.length_sq();
        if len_sq <= f32::EPSILON || !len_sq.is_finite() {
            return None;
        }
        let inv_len = len_sq.sqrt().recip();
        Some(Self::new(self.x * inv_len, self.y * inv_len))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Transform {
    pub position: Vec2,
    pub rotation_radians: Option<f32>,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec2::default(),
            rotation_radians: None,
        }
    }
}

impl Transform {
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            rotation_radians: None,
        }
    }
}

/// Interaction category attached to an entity. The spatial query only reports
/// entities carrying one; an entity carries at most one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionTag {
    Interactable,
    Collectible,
    ChopTarget,
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub transform: Transform,
    pub debug_name: String,
    pub tag: Option<InteractionTag>,
    applied_spawn_order: u64,
}

impl Entity {
    pub fn applied_spawn_order(&self) -> u64 {
        self.applied_spawn_order
    }
}

#[derive(Debug, Default)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

#[derive(Debug, Default)]
pub struct SceneWorld {
    allocator: EntityIdAllocator,
    entities: Vec<Entity>,
    pending_spawns: Vec<Entity>,
    pending_despawns: Vec<EntityId>,
    next_applied_spawn_order: u64,
}

impl SceneWorld {
    /// Queues a spawn. The entity becomes visible to queries after the next
    /// `apply_pending`.
    pub fn spawn(
        &mut self,
        transform: Transform,
        debug_name: impl Into<String>,
        tag: Option<InteractionTag>,
    ) -> EntityId {
        let id = self.allocator.allocate();
        self.pending_spawns.push(Entity {
            id,
            transform,
            debug_name: debug_name.into(),
            tag,
            applied_spawn_order: 0,
        });
        id
    }

    pub fn despawn(&mut self, id: EntityId) -> bool {
        let exists_now = self.entities.iter().any(|entity| entity.id == id);
        let pending_spawn = self.pending_spawns.iter().any(|entity| entity.id == id);
        if !exists_now && !pending_spawn {
            return false;
        }
        self.pending_despawns.push(id);
        true
    }

    pub fn is_despawn_pending(&self, id: EntityId) -> bool {
        self.pending_despawns.contains(&id)
    }

    pub fn apply_pending(&mut self) {
        if !self.pending_spawns.is_empty() {
            for mut entity in self.pending_spawns.drain(..) {
                entity.applied_spawn_order = self.next_applied_spawn_order;
                self.next_applied_spawn_order = self.next_applied_spawn_order.saturating_add(1);
                self.entities.push(entity);
            }
        }

        if !self.pending_despawns.is_empty() {
            self.pending_despawns.sort_by_key(|id| id.0);
            self.pending_despawns.dedup();
            let pending = &self.pending_despawns;
            self.entities.retain(|entity| {
                pending
                    .binary_search_by_key(&entity.id.0, |id| id.0)
                    .is_err()
            });
            self.pending_despawns.clear();
        }
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.pending_spawns.clear();
        self.pending_despawns.clear();
        self.next_applied_spawn_order = 0;
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn find_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.id == id)
    }

    pub fn find_entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|entity| entity.id == id)
    }

    pub fn position_of(&self, id: EntityId) -> Option<Vec2> {
        self.find_entity(id).map(|entity| entity.transform.position)
    }

    /// Returns false when the entity is not live.
    pub fn set_tag(&mut self, id: EntityId, tag: Option<InteractionTag>) -> bool {
        let Some(entity) = self.find_entity_mut(id) else {
            return false;
        };
        entity.tag = tag;
        true
    }

    pub fn set_position(&mut self, id: EntityId, position: Vec2) -> bool {
        let Some(entity) = self.find_entity_mut(id) else {
            return false;
        };
        entity.transform.position = position;
        true
    }

    /// Tagged entities whose position lies within `radius` of `center`, in
    /// spawn order. Callers that break ties by first-seen inherit that order.
    pub fn query_radius(&self, center: Vec2, radius: f32) -> impl Iterator<Item = &Entity> + '_ {
        let radius_sq = radius * radius;
        self.entities.iter().filter(move |entity| {
            if entity.tag.is_none() {
                return false;
            }
            let dx = entity.transform.position.x - center.x;
            let dy = entity.transform.position.y - center.y;
            dx * dx + dy * dy <= radius_sq
        })
    }
}

pub trait Scene {
    fn load(&mut self, world: &mut SceneWorld);
    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand;
    fn unload(&mut self, world: &mut SceneWorld);
    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_tagged(world: &mut SceneWorld, x: f32, tag: Option<InteractionTag>) -> EntityId {
        world.spawn(Transform::at(Vec2::new(x, 0.0)), "probe", tag)
    }

    #[test]
    fn spawn_is_deferred_until_apply_pending() {
        let mut world = SceneWorld::default();
        let id = spawn_tagged(&mut world, 0.0, None);
        assert!(world.find_entity(id).is_none());

        world.apply_pending();
        assert!(world.find_entity(id).is_some());
    }

    #[test]
    fn despawn_is_deferred_and_unknown_ids_are_rejected() {
        let mut world = SceneWorld::default();
        let id = spawn_tagged(&mut world, 0.0, None);
        world.apply_pending();

        assert!(world.despawn(id));
        assert!(world.is_despawn_pending(id));
        assert!(world.find_entity(id).is_some());
        world.apply_pending();
        assert!(world.find_entity(id).is_none());
        assert!(!world.despawn(EntityId(999)));
    }

    #[test]
    fn spawn_then_despawn_in_same_tick_never_goes_live() {
        let mut world = SceneWorld::default();
        let id = spawn_tagged(&mut world, 0.0, None);
        assert!(world.despawn(id));
        world.apply_pending();
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn query_radius_skips_untagged_and_distant_entities() {
        let mut world = SceneWorld::default();
        let near = spawn_tagged(&mut world, 1.0, Some(InteractionTag::Collectible));
        let _untagged = spawn_tagged(&mut world, 0.5, None);
        let _far = spawn_tagged(&mut world, 2.5, Some(InteractionTag::ChopTarget));
        let edge = spawn_tagged(&mut world, 2.0, Some(InteractionTag::Interactable));
        world.apply_pending();

        let found = world
            .query_radius(Vec2::ZERO, 2.0)
            .map(|entity| entity.id)
            .collect::<Vec<_>>();
        assert_eq!(found, vec![near, edge]);
    }

    #[test]
    fn query_radius_preserves_spawn_order() {
        let mut world = SceneWorld::default();
        let first = spawn_tagged(&mut world, 1.0, Some(InteractionTag::Collectible));
        let second = spawn_tagged(&mut world, -1.0, Some(InteractionTag::Collectible));
        world.apply_pending();

        let found = world
            .query_radius(Vec2::ZERO, 5.0)
            .map(|entity| entity.id)
            .collect::<Vec<_>>();
        assert_eq!(found, vec![first, second]);
        let first_order = world.find_entity(first).expect("first").applied_spawn_order();
        let second_order = world.find_entity(second).expect("second").applied_spawn_order();
        assert!(first_order < second_order);
    }

    #[test]
    fn normalized_rejects_zero_vector() {
        assert!(Vec2::ZERO.normalized().is_none());
        let unit = Vec2::new(3.0, 4.0).normalized().expect("unit");
        assert!((unit.length() - 1.0).abs() < 1e-5);
    }
}
