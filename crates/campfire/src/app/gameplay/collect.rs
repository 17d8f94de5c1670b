use std::collections::BTreeMap;

use engine::{EntityArchetype, EntityId, EntityKind};
use tracing::{error, info};

use super::types::{CarriedKind, GameplayEvent, InteractionContext, InteractionFailure};

pub(crate) const DEFAULT_LOG_FUEL_VALUE: f32 = 25.0;

/// Something the player can pick up in one press.
pub(crate) trait Collectible {
    fn prompt(&self) -> &str;
    /// Moves the item into the actor's inventory. Returns whether it was taken.
    fn collect(&self, ctx: &mut InteractionContext<'_>) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ItemKind {
    Axe,
    Lantern,
    Log { fuel_value: f32 },
}

impl ItemKind {
    pub(crate) fn carried_kind(self) -> CarriedKind {
        match self {
            Self::Axe => CarriedKind::Axe,
            Self::Lantern => CarriedKind::Lantern,
            Self::Log { .. } => CarriedKind::Wood,
        }
    }

    pub(crate) fn from_archetype(def: &EntityArchetype) -> Option<Self> {
        match def.kind {
            EntityKind::Axe => Some(Self::Axe),
            EntityKind::Lantern => Some(Self::Lantern),
            EntityKind::Log => Some(Self::Log {
                fuel_value: def.fuel_value.unwrap_or(DEFAULT_LOG_FUEL_VALUE),
            }),
            EntityKind::Player | EntityKind::Fire | EntityKind::TrashBox | EntityKind::Tree => {
                None
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CarriedItem {
    pub(crate) entity_id: EntityId,
    pub(crate) kind: ItemKind,
    pub(crate) prompt: String,
}

impl Collectible for CarriedItem {
    fn prompt(&self) -> &str {
        &self.prompt
    }

    fn collect(&self, ctx: &mut InteractionContext<'_>) -> bool {
        let Some(inventory) = ctx.inventory.as_deref_mut() else {
            error!(actor_id = ctx.actor_id.0, item_id = self.entity_id.0, "collect_without_inventory");
            ctx.events.fail(InteractionFailure::InventoryMissing);
            return false;
        };
        let kind = self.kind.carried_kind();
        if !inventory.pick_up(kind, self.entity_id, ctx.world) {
            info!(item_id = self.entity_id.0, kind = ?kind, "collect_slot_occupied");
            ctx.events.fail(InteractionFailure::SlotOccupied);
            return false;
        }
        info!(actor_id = ctx.actor_id.0, item_id = self.entity_id.0, kind = ?kind, "item_collected");
        ctx.events.emit(GameplayEvent::ItemCollected {
            item_id: self.entity_id,
            kind,
        });
        true
    }
}

/// Records for every item entity, carried or lying in the world.
#[derive(Debug, Default)]
pub(crate) struct ItemRegistry {
    items: BTreeMap<EntityId, CarriedItem>,
}

impl ItemRegistry {
    pub(crate) fn insert(&mut self, item: CarriedItem) {
        self.items.insert(item.entity_id, item);
    }

    pub(crate) fn get(&self, id: EntityId) -> Option<&CarriedItem> {
        self.items.get(&id)
    }

    pub(crate) fn remove(&mut self, id: EntityId) -> Option<CarriedItem> {
        self.items.remove(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    #[cfg(test)]
    pub(crate) fn count_logs(&self) -> usize {
        self.items
            .values()
            .filter(|item| matches!(item.kind, ItemKind::Log { .. }))
            .count()
    }

    /// Fuel carried by a log record; `None` for unknown ids and non-log items.
    pub(crate) fn fuel_value(&self, id: EntityId) -> Option<f32> {
        match self.items.get(&id)?.kind {
            ItemKind::Log { fuel_value } => Some(fuel_value),
            ItemKind::Axe | ItemKind::Lantern => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use engine::{InteractionTag, SceneWorld, Transform, Vec2};

    use super::super::inventory::{Inventory, PlayerInventory};
    use super::super::movement::PlayerMovement;
    use super::super::types::GameplayEventBus;
    use super::*;

    #[test]
    fn log_fuel_value_falls_back_to_default() {
        let def = EntityArchetype::new("camp.log", "Log", EntityKind::Log);
        assert_eq!(
            ItemKind::from_archetype(&def),
            Some(ItemKind::Log {
                fuel_value: DEFAULT_LOG_FUEL_VALUE
            })
        );
        let fire = EntityArchetype::new("camp.fire", "Fire", EntityKind::Fire);
        assert_eq!(ItemKind::from_archetype(&fire), None);
    }

    #[test]
    fn fuel_value_only_reported_for_logs() {
        let mut registry = ItemRegistry::default();
        registry.insert(CarriedItem {
            entity_id: EntityId(1),
            kind: ItemKind::Log { fuel_value: 40.0 },
            prompt: "Pick up Wood".to_string(),
        });
        registry.insert(CarriedItem {
            entity_id: EntityId(2),
            kind: ItemKind::Axe,
            prompt: "Pick up Axe".to_string(),
        });

        assert_eq!(registry.fuel_value(EntityId(1)), Some(40.0));
        assert_eq!(registry.fuel_value(EntityId(2)), None);
        assert_eq!(registry.fuel_value(EntityId(3)), None);
        assert_eq!(registry.count_logs(), 1);
    }

    #[test]
    fn collect_fills_slot_and_reports_occupied_slot() {
        let mut world = SceneWorld::default();
        let player = world.spawn(Transform::at(Vec2::ZERO), "player", None);
        let first = world.spawn(
            Transform::at(Vec2::ZERO),
            "axe",
            Some(InteractionTag::Collectible),
        );
        let second = world.spawn(
            Transform::at(Vec2::ZERO),
            "axe",
            Some(InteractionTag::Collectible),
        );
        world.apply_pending();

        let mut movement = PlayerMovement::new(player, 5.0, 1.6);
        let mut inventory = PlayerInventory::default();
        let mut items = ItemRegistry::default();
        let mut events = GameplayEventBus::default();
        let axe = |entity_id| CarriedItem {
            entity_id,
            kind: ItemKind::Axe,
            prompt: "Pick up Axe".to_string(),
        };

        let mut ctx = InteractionContext {
            actor_id: player,
            movement: &mut movement,
            inventory: Some(&mut inventory),
            items: &mut items,
            world: &mut world,
            events: &mut events,
        };
        assert!(axe(first).collect(&mut ctx));
        assert!(!axe(second).collect(&mut ctx));

        assert!(inventory.has_axe());
        assert_eq!(
            events.drain(),
            vec![
                GameplayEvent::ItemCollected {
                    item_id: first,
                    kind: CarriedKind::Axe,
                },
                GameplayEvent::InteractionFailed {
                    reason: InteractionFailure::SlotOccupied,
                },
            ]
        );
    }
}
