use engine::{EntityArchetype, EntityId, InputSnapshot, SceneWorld, Vec2};
use tracing::debug;

use super::types::{GameplayEvent, GameplayEventBus, PlayerState};

pub(crate) const DEFAULT_MOVE_SPEED: f32 = 5.0;
pub(crate) const DEFAULT_SPRINT_MULTIPLIER: f32 = 1.6;

/// Owns the player's interaction lock and locomotion. The resolver and the
/// action it started are the only writers of `state`.
#[derive(Debug, Clone)]
pub(crate) struct PlayerMovement {
    entity_id: EntityId,
    state: PlayerState,
    move_speed: f32,
    sprint_multiplier: f32,
    sprinting: bool,
    move_input: Vec2,
    facing: Vec2,
}

impl PlayerMovement {
    pub(crate) fn new(entity_id: EntityId, move_speed: f32, sprint_multiplier: f32) -> Self {
        Self {
            entity_id,
            state: PlayerState::Idle,
            move_speed,
            sprint_multiplier,
            sprinting: false,
            move_input: Vec2::ZERO,
            facing: Vec2::new(0.0, 1.0),
        }
    }

    pub(crate) fn from_archetype(entity_id: EntityId, def: &EntityArchetype) -> Self {
        Self::new(
            entity_id,
            def.move_speed.unwrap_or(DEFAULT_MOVE_SPEED),
            def.sprint_multiplier.unwrap_or(DEFAULT_SPRINT_MULTIPLIER),
        )
    }

    pub(crate) fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    pub(crate) fn state(&self) -> PlayerState {
        self.state
    }

    pub(crate) fn is_interacting(&self) -> bool {
        self.state == PlayerState::Interacting
    }

    #[cfg(test)]
    pub(crate) fn is_sprinting(&self) -> bool {
        self.sprinting
    }

    /// Unit vector the player last moved along.
    pub(crate) fn forward(&self) -> Vec2 {
        self.facing
    }

    /// Returns whether the state actually changed; only real changes are
    /// announced.
    pub(crate) fn set_state(&mut self, next: PlayerState, events: &mut GameplayEventBus) -> bool {
        if self.state == next {
            return false;
        }
        let from = self.state;
        self.state = next;
        debug!(from = ?from, to = ?next, "player_state_changed");
        events.emit(GameplayEvent::PlayerStateChanged { from, to: next });
        true
    }

    pub(crate) fn apply_input(&mut self, input: &InputSnapshot) {
        self.move_input = input.movement();
        if input.sprint_started() {
            self.sprinting = true;
        }
        if input.sprint_canceled() {
            self.sprinting = false;
        }
    }

    /// Moves the player entity. Locomotion is ignored while interacting.
    pub(crate) fn step(&mut self, fixed_dt_seconds: f32, world: &mut SceneWorld) {
        if self.is_interacting() {
            return;
        }
        let Some(direction) = self.move_input.normalized() else {
            return;
        };
        self.facing = direction;

        let speed = if self.sprinting {
            self.move_speed * self.sprint_multiplier
        } else {
            self.move_speed
        };
        if let Some(player) = world.find_entity_mut(self.entity_id) {
            player.transform.position = player
                .transform
                .position
                .offset(direction, speed * fixed_dt_seconds);
        }
    }
}

#[cfg(test)]
mod tests {
    use engine::Transform;

    use super::*;

    fn world_with_player() -> (SceneWorld, PlayerMovement) {
        let mut world = SceneWorld::default();
        let id = world.spawn(Transform::at(Vec2::ZERO), "player", None);
        world.apply_pending();
        (world, PlayerMovement::new(id, 4.0, 2.0))
    }

    #[test]
    fn movement_is_normalized_and_scaled_by_speed() {
        let (mut world, mut movement) = world_with_player();
        movement.apply_input(&InputSnapshot::empty().with_movement(Vec2::new(3.0, 4.0)));
        movement.step(0.5, &mut world);

        let position = world.position_of(movement.entity_id()).expect("player");
        assert!((position.x - 1.2).abs() < 1e-5);
        assert!((position.y - 1.6).abs() < 1e-5);
        assert!((movement.forward().x - 0.6).abs() < 1e-5);
    }

    #[test]
    fn sprint_multiplies_speed_until_canceled() {
        let (mut world, mut movement) = world_with_player();
        movement.apply_input(
            &InputSnapshot::empty()
                .with_movement(Vec2::new(1.0, 0.0))
                .with_sprint_started(true),
        );
        movement.step(1.0, &mut world);
        assert!(movement.is_sprinting());
        assert!((world.position_of(movement.entity_id()).expect("p").x - 8.0).abs() < 1e-5);

        movement.apply_input(
            &InputSnapshot::empty()
                .with_movement(Vec2::new(1.0, 0.0))
                .with_sprint_canceled(true),
        );
        movement.step(1.0, &mut world);
        assert!(!movement.is_sprinting());
        assert!((world.position_of(movement.entity_id()).expect("p").x - 12.0).abs() < 1e-5);
    }

    #[test]
    fn locomotion_is_ignored_while_interacting() {
        let (mut world, mut movement) = world_with_player();
        let mut events = GameplayEventBus::default();
        movement.set_state(PlayerState::Interacting, &mut events);
        movement.apply_input(&InputSnapshot::empty().with_movement(Vec2::new(1.0, 0.0)));
        movement.step(1.0, &mut world);

        assert_eq!(world.position_of(movement.entity_id()), Some(Vec2::ZERO));
        assert_eq!(movement.forward(), Vec2::new(0.0, 1.0));
    }

    #[test]
    fn set_state_announces_only_real_changes() {
        let (_world, mut movement) = world_with_player();
        let mut events = GameplayEventBus::default();

        assert!(!movement.set_state(PlayerState::Idle, &mut events));
        assert!(movement.set_state(PlayerState::Interacting, &mut events));
        assert!(!movement.set_state(PlayerState::Interacting, &mut events));

        let drained = events.drain();
        assert_eq!(
            drained,
            vec![GameplayEvent::PlayerStateChanged {
                from: PlayerState::Idle,
                to: PlayerState::Interacting,
            }]
        );
    }
}
