use engine::{EntityId, InteractionTag, SceneWorld, Vec2};
use tracing::{debug, warn};

use super::types::CarriedKind;

/// What the interaction core needs from whatever holds the player's items.
pub(crate) trait Inventory {
    fn has_wood(&self) -> bool;
    fn has_axe(&self) -> bool;
    fn has_lantern(&self) -> bool;
    /// The concrete log entity currently carried, if any.
    fn carried_wood(&self) -> Option<EntityId>;
    /// Takes the item into its slot. False when that slot is already filled.
    fn pick_up(&mut self, kind: CarriedKind, item_id: EntityId, world: &mut SceneWorld) -> bool;
    /// Destroys the carried log.
    fn consume_wood(&mut self, world: &mut SceneWorld) -> Option<EntityId>;
    fn drop_wood(&mut self, position: Vec2, world: &mut SceneWorld) -> Option<EntityId>;
    fn drop_axe(&mut self, position: Vec2, world: &mut SceneWorld) -> Option<EntityId>;
    fn drop_lantern(&mut self, position: Vec2, world: &mut SceneWorld) -> Option<EntityId>;
}

/// At most one of each carried category. Carried entities stay in the world
/// untagged, so the spatial query cannot see them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PlayerInventory {
    wood: Option<EntityId>,
    axe: Option<EntityId>,
    lantern: Option<EntityId>,
}

impl PlayerInventory {
    fn slot_mut(&mut self, kind: CarriedKind) -> &mut Option<EntityId> {
        match kind {
            CarriedKind::Wood => &mut self.wood,
            CarriedKind::Axe => &mut self.axe,
            CarriedKind::Lantern => &mut self.lantern,
        }
    }

    fn drop_slot(
        &mut self,
        kind: CarriedKind,
        position: Vec2,
        world: &mut SceneWorld,
    ) -> Option<EntityId> {
        let item_id = self.slot_mut(kind).take()?;
        if !world.set_position(item_id, position) {
            warn!(item_id = item_id.0, kind = ?kind, "dropped_item_not_in_world");
            return Some(item_id);
        }
        world.set_tag(item_id, Some(InteractionTag::Collectible));
        debug!(item_id = item_id.0, kind = ?kind, x = position.x, y = position.y, "item_dropped");
        Some(item_id)
    }
}

impl Inventory for PlayerInventory {
    fn has_wood(&self) -> bool {
        self.wood.is_some()
    }

    fn has_axe(&self) -> bool {
        self.axe.is_some()
    }

    fn has_lantern(&self) -> bool {
        self.lantern.is_some()
    }

    fn carried_wood(&self) -> Option<EntityId> {
        self.wood
    }

    fn pick_up(&mut self, kind: CarriedKind, item_id: EntityId, world: &mut SceneWorld) -> bool {
        let slot = self.slot_mut(kind);
        if slot.is_some() {
            return false;
        }
        *slot = Some(item_id);
        world.set_tag(item_id, None);
        true
    }

    fn consume_wood(&mut self, world: &mut SceneWorld) -> Option<EntityId> {
        let log_id = self.wood.take()?;
        world.despawn(log_id);
        Some(log_id)
    }

    fn drop_wood(&mut self, position: Vec2, world: &mut SceneWorld) -> Option<EntityId> {
        self.drop_slot(CarriedKind::Wood, position, world)
    }

    fn drop_axe(&mut self, position: Vec2, world: &mut SceneWorld) -> Option<EntityId> {
        self.drop_slot(CarriedKind::Axe, position, world)
    }

    fn drop_lantern(&mut self, position: Vec2, world: &mut SceneWorld) -> Option<EntityId> {
        self.drop_slot(CarriedKind::Lantern, position, world)
    }
}

#[cfg(test)]
mod tests {
    use engine::Transform;

    use super::*;

    fn spawn_item(world: &mut SceneWorld) -> EntityId {
        let id = world.spawn(
            Transform::at(Vec2::ZERO),
            "item",
            Some(InteractionTag::Collectible),
        );
        world.apply_pending();
        id
    }

    #[test]
    fn pick_up_hides_item_from_queries() {
        let mut world = SceneWorld::default();
        let axe = spawn_item(&mut world);
        let mut inventory = PlayerInventory::default();

        assert!(inventory.pick_up(CarriedKind::Axe, axe, &mut world));
        assert!(inventory.has_axe());
        assert_eq!(world.query_radius(Vec2::ZERO, 1.0).count(), 0);
    }

    #[test]
    fn occupied_slot_rejects_second_item() {
        let mut world = SceneWorld::default();
        let first = spawn_item(&mut world);
        let second = spawn_item(&mut world);
        let mut inventory = PlayerInventory::default();

        assert!(inventory.pick_up(CarriedKind::Wood, first, &mut world));
        assert!(!inventory.pick_up(CarriedKind::Wood, second, &mut world));
        assert_eq!(inventory.carried_wood(), Some(first));
        assert_eq!(
            world.find_entity(second).expect("second").tag,
            Some(InteractionTag::Collectible)
        );
    }

    #[test]
    fn drop_places_item_and_restores_tag() {
        let mut world = SceneWorld::default();
        let lantern = spawn_item(&mut world);
        let mut inventory = PlayerInventory::default();
        inventory.pick_up(CarriedKind::Lantern, lantern, &mut world);

        let dropped = inventory.drop_lantern(Vec2::new(2.0, 1.0), &mut world);
        assert_eq!(dropped, Some(lantern));
        assert!(!inventory.has_lantern());
        let entity = world.find_entity(lantern).expect("lantern");
        assert_eq!(entity.transform.position, Vec2::new(2.0, 1.0));
        assert_eq!(entity.tag, Some(InteractionTag::Collectible));
        assert_eq!(inventory.drop_lantern(Vec2::ZERO, &mut world), None);
    }

    #[test]
    fn consume_wood_despawns_log() {
        let mut world = SceneWorld::default();
        let log = spawn_item(&mut world);
        let mut inventory = PlayerInventory::default();
        inventory.pick_up(CarriedKind::Wood, log, &mut world);

        assert_eq!(inventory.consume_wood(&mut world), Some(log));
        world.apply_pending();
        assert!(world.find_entity(log).is_none());
        assert!(!inventory.has_wood());
        assert_eq!(inventory.consume_wood(&mut world), None);
    }
}
