use engine::{EntityArchetype, EntityId};
use tracing::{debug, error, info, warn};

use super::types::{GameplayEvent, GameplayEventBus, InteractionContext, InteractionFailure};

pub(crate) const DEFAULT_FIRE_PROMPT: &str = "Add Wood to Fireplace";
pub(crate) const DEFAULT_TRASH_BOX_PROMPT: &str = "Trash box";
pub(crate) const DEFAULT_MAX_FUEL: f32 = 100.0;
pub(crate) const DEFAULT_DECAY_RATE: f32 = 1.0;

/// A prop the player uses in place. The resolver only dispatches here when
/// the actor carries wood.
pub(crate) trait Interactable {
    fn prompt(&self) -> &str;
    /// Returns false when the action did not happen; the caller unlocks the
    /// actor.
    fn interact(&mut self, ctx: &mut InteractionContext<'_>) -> bool;
}

/// Fuel entity. `current_fuel` stays within `[0, max_fuel]`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Fire {
    entity_id: EntityId,
    prompt: String,
    current_fuel: f32,
    max_fuel: f32,
    decay_rate: f32,
}

impl Fire {
    pub(crate) fn new(entity_id: EntityId, max_fuel: f32, decay_rate: f32) -> Self {
        let max_fuel = if max_fuel > 0.0 {
            max_fuel
        } else {
            DEFAULT_MAX_FUEL
        };
        Self {
            entity_id,
            prompt: DEFAULT_FIRE_PROMPT.to_string(),
            current_fuel: max_fuel,
            max_fuel,
            decay_rate: decay_rate.max(0.0),
        }
    }

    pub(crate) fn from_archetype(entity_id: EntityId, def: &EntityArchetype) -> Self {
        let mut fire = Self::new(
            entity_id,
            def.max_fuel.unwrap_or(DEFAULT_MAX_FUEL),
            def.decay_rate.unwrap_or(DEFAULT_DECAY_RATE),
        );
        if let Some(prompt) = &def.prompt {
            fire.prompt = prompt.clone();
        }
        fire
    }

    #[cfg(test)]
    pub(crate) fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    pub(crate) fn current_fuel(&self) -> f32 {
        self.current_fuel
    }

    pub(crate) fn max_fuel(&self) -> f32 {
        self.max_fuel
    }

    pub(crate) fn fuel_percent(&self) -> f32 {
        self.current_fuel / self.max_fuel * 100.0
    }

    #[cfg(test)]
    pub(crate) fn is_lit(&self) -> bool {
        self.current_fuel > 0.0
    }

    #[cfg(test)]
    pub(crate) fn set_current_fuel(&mut self, fuel: f32) {
        self.current_fuel = fuel.clamp(0.0, self.max_fuel);
    }

    pub(crate) fn on_spawn(&mut self, events: &mut GameplayEventBus) {
        self.current_fuel = self.max_fuel;
        self.emit_fuel_changed(events);
    }

    /// Decays fuel. An unlit fire is left alone, so the extinguished event
    /// fires once per crossing to zero.
    pub(crate) fn tick(&mut self, fixed_dt_seconds: f32, events: &mut GameplayEventBus) {
        if self.current_fuel <= 0.0 {
            return;
        }
        self.current_fuel = (self.current_fuel - self.decay_rate * fixed_dt_seconds).max(0.0);
        self.emit_fuel_changed(events);
        if self.current_fuel <= 0.0 {
            info!(fire_id = self.entity_id.0, "fire_extinguished");
            events.emit(GameplayEvent::FireExtinguished {
                fire_id: self.entity_id,
            });
        }
    }

    /// Burns the carried log. Every failure leaves both the fire and the
    /// inventory untouched.
    pub(crate) fn feed(&mut self, ctx: &mut InteractionContext<'_>) -> bool {
        let Some(inventory) = ctx.inventory.as_deref_mut() else {
            error!(fire_id = self.entity_id.0, actor_id = ctx.actor_id.0, "feed_without_inventory");
            ctx.events.fail(InteractionFailure::InventoryMissing);
            return false;
        };
        if !inventory.has_wood() {
            info!(fire_id = self.entity_id.0, "feed_without_wood");
            ctx.events.fail(InteractionFailure::FeedWithoutWood);
            return false;
        }
        let Some(log_id) = inventory.carried_wood() else {
            error!(fire_id = self.entity_id.0, "carried_wood_instance_missing");
            ctx.events.fail(InteractionFailure::CarriedWoodMissing);
            return false;
        };
        let fuel_value = ctx.items.fuel_value(log_id).unwrap_or(0.0);
        if fuel_value <= 0.0 {
            warn!(fire_id = self.entity_id.0, log_id = log_id.0, "carried_log_has_no_fuel");
            ctx.events.fail(InteractionFailure::CarriedLogHasNoFuel);
            return false;
        }

        self.current_fuel = (self.current_fuel + fuel_value).min(self.max_fuel);
        inventory.consume_wood(ctx.world);
        ctx.items.remove(log_id);
        info!(
            fire_id = self.entity_id.0,
            log_id = log_id.0,
            fuel_added = fuel_value,
            current_fuel = self.current_fuel,
            max_fuel = self.max_fuel,
            "wood_consumed"
        );
        ctx.events.emit(GameplayEvent::WoodConsumed {
            fire_id: self.entity_id,
            log_id,
            fuel_added: fuel_value,
        });
        self.emit_fuel_changed(ctx.events);
        true
    }

    fn emit_fuel_changed(&self, events: &mut GameplayEventBus) {
        events.emit(GameplayEvent::FuelChanged {
            fire_id: self.entity_id,
            current: self.current_fuel,
            max: self.max_fuel,
        });
    }
}

impl Interactable for Fire {
    fn prompt(&self) -> &str {
        &self.prompt
    }

    fn interact(&mut self, ctx: &mut InteractionContext<'_>) -> bool {
        self.feed(ctx)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TrashBox {
    entity_id: EntityId,
    prompt: String,
}

impl TrashBox {
    pub(crate) fn new(entity_id: EntityId) -> Self {
        Self {
            entity_id,
            prompt: DEFAULT_TRASH_BOX_PROMPT.to_string(),
        }
    }

    pub(crate) fn from_archetype(entity_id: EntityId, def: &EntityArchetype) -> Self {
        let mut trash_box = Self::new(entity_id);
        if let Some(prompt) = &def.prompt {
            trash_box.prompt = prompt.clone();
        }
        trash_box
    }
}

impl Interactable for TrashBox {
    fn prompt(&self) -> &str {
        &self.prompt
    }

    fn interact(&mut self, ctx: &mut InteractionContext<'_>) -> bool {
        info!(
            actor_id = ctx.actor_id.0,
            trash_box_id = self.entity_id.0,
            "trash_box_used"
        );
        true
    }
}

/// Records behind entities tagged `Interactable`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum InteractableProp {
    Fire(Fire),
    TrashBox(TrashBox),
}

impl InteractableProp {
    pub(crate) fn as_fire(&self) -> Option<&Fire> {
        match self {
            Self::Fire(fire) => Some(fire),
            Self::TrashBox(_) => None,
        }
    }

    pub(crate) fn as_fire_mut(&mut self) -> Option<&mut Fire> {
        match self {
            Self::Fire(fire) => Some(fire),
            Self::TrashBox(_) => None,
        }
    }
}

impl Interactable for InteractableProp {
    fn prompt(&self) -> &str {
        match self {
            Self::Fire(fire) => fire.prompt(),
            Self::TrashBox(trash_box) => trash_box.prompt(),
        }
    }

    fn interact(&mut self, ctx: &mut InteractionContext<'_>) -> bool {
        debug!(actor_id = ctx.actor_id.0, "interactable_dispatch");
        match self {
            Self::Fire(fire) => fire.interact(ctx),
            Self::TrashBox(trash_box) => trash_box.interact(ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use engine::{InteractionTag, SceneWorld, Transform, Vec2};

    use super::super::collect::{CarriedItem, ItemKind, ItemRegistry};
    use super::super::inventory::{Inventory, PlayerInventory};
    use super::super::movement::PlayerMovement;
    use super::super::types::{CarriedKind, GameplayEventKind};
    use super::*;

    struct Harness {
        world: SceneWorld,
        movement: PlayerMovement,
        inventory: PlayerInventory,
        items: ItemRegistry,
        events: GameplayEventBus,
    }

    impl Harness {
        fn new() -> Self {
            let mut world = SceneWorld::default();
            let player = world.spawn(Transform::at(Vec2::ZERO), "player", None);
            world.apply_pending();
            Self {
                world,
                movement: PlayerMovement::new(player, 5.0, 1.6),
                inventory: PlayerInventory::default(),
                items: ItemRegistry::default(),
                events: GameplayEventBus::default(),
            }
        }

        fn carry_log(&mut self, fuel_value: f32) -> EntityId {
            let log = self.world.spawn(
                Transform::at(Vec2::ZERO),
                "log",
                Some(InteractionTag::Collectible),
            );
            self.world.apply_pending();
            self.items.insert(CarriedItem {
                entity_id: log,
                kind: ItemKind::Log { fuel_value },
                prompt: "Pick up Wood".to_string(),
            });
            assert!(self.inventory.pick_up(CarriedKind::Wood, log, &mut self.world));
            log
        }

        fn feed(&mut self, fire: &mut Fire) -> bool {
            let actor_id = self.movement.entity_id();
            let mut ctx = InteractionContext {
                actor_id,
                movement: &mut self.movement,
                inventory: Some(&mut self.inventory),
                items: &mut self.items,
                world: &mut self.world,
                events: &mut self.events,
            };
            fire.feed(&mut ctx)
        }
    }

    #[test]
    fn decay_is_clamped_at_zero() {
        let mut events = GameplayEventBus::default();
        let mut fire = Fire::new(EntityId(1), 10.0, 4.0);
        fire.tick(2.0, &mut events);
        assert!((fire.current_fuel() - 2.0).abs() < 1e-5);
        fire.tick(2.0, &mut events);
        assert_eq!(fire.current_fuel(), 0.0);
    }

    #[test]
    fn extinguished_is_raised_once_per_crossing() {
        let mut events = GameplayEventBus::default();
        let mut fire = Fire::new(EntityId(1), 1.0, 1.0);
        for _ in 0..5 {
            fire.tick(0.5, &mut events);
        }
        assert_eq!(events.count_of(GameplayEventKind::FireExtinguished), 1);
        assert_eq!(events.count_of(GameplayEventKind::FuelChanged), 2);
        assert!(!fire.is_lit());
    }

    #[test]
    fn feeding_clamps_to_max_and_consumes_log() {
        let mut harness = Harness::new();
        let log = harness.carry_log(50.0);
        let mut fire = Fire::new(EntityId(9), 100.0, 1.0);
        fire.set_current_fuel(70.0);

        assert!(harness.feed(&mut fire));
        assert_eq!(fire.current_fuel(), 100.0);
        assert!(!harness.inventory.has_wood());
        assert!(harness.items.get(log).is_none());
        harness.world.apply_pending();
        assert!(harness.world.find_entity(log).is_none());
    }

    #[test]
    fn feeding_without_wood_changes_nothing() {
        let mut harness = Harness::new();
        let mut fire = Fire::new(EntityId(9), 100.0, 1.0);
        fire.set_current_fuel(40.0);

        assert!(!harness.feed(&mut fire));
        assert_eq!(fire.current_fuel(), 40.0);
        assert_eq!(
            harness.events.drain(),
            vec![GameplayEvent::InteractionFailed {
                reason: InteractionFailure::FeedWithoutWood,
            }]
        );
    }

    #[test]
    fn zero_fuel_log_leaves_inventory_untouched() {
        let mut harness = Harness::new();
        let log = harness.carry_log(0.0);
        let mut fire = Fire::new(EntityId(9), 100.0, 1.0);
        fire.set_current_fuel(40.0);

        assert!(!harness.feed(&mut fire));
        assert_eq!(fire.current_fuel(), 40.0);
        assert_eq!(harness.inventory.carried_wood(), Some(log));
    }

    #[test]
    fn missing_inventory_aborts_feed() {
        let mut harness = Harness::new();
        let mut fire = Fire::new(EntityId(9), 100.0, 1.0);
        fire.set_current_fuel(40.0);
        let actor_id = harness.movement.entity_id();
        let mut ctx = InteractionContext {
            actor_id,
            movement: &mut harness.movement,
            inventory: None,
            items: &mut harness.items,
            world: &mut harness.world,
            events: &mut harness.events,
        };

        assert!(!fire.feed(&mut ctx));
        assert_eq!(fire.current_fuel(), 40.0);
        assert_eq!(harness.events.count_of(GameplayEventKind::InteractionFailed), 1);
    }
}
