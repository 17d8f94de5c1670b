use std::f32::consts::TAU;

use engine::{EntityArchetype, EntityId, EntityKind, Vec2};
use rand::Rng;
use tracing::{debug, error, info};

use super::collect::DEFAULT_LOG_FUEL_VALUE;
use super::types::{
    GameplayEvent, GameplayEventBus, InteractionContext, InteractionFailure, PlayerState,
    PROMPT_NEED_AXE,
};

pub(crate) const DEFAULT_TREE_PROMPT: &str = "Chop Tree";
pub(crate) const DEFAULT_LOG_PROMPT: &str = "Pick up Wood";
pub(crate) const DEFAULT_CHOP_DURATION_SECONDS: f32 = 1.0;
pub(crate) const DEFAULT_NUMBER_OF_LOGS: u32 = 3;
pub(crate) const DEFAULT_SCATTER_RADIUS: f32 = 0.5;

/// Something that yields resources after a timed action.
pub(crate) trait ChopTarget {
    fn prompt(&self) -> &str;
    /// Starts the timed action for the actor.
    fn chop(&mut self, ctx: &mut InteractionContext<'_>);
    /// Plain use without a tool. Never starts the timer, only shows the hint.
    fn interact(&mut self, ctx: &mut InteractionContext<'_>);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ChopState {
    Idle,
    Chopping {
        requester: EntityId,
        remaining_seconds: f32,
    },
    Felled,
}

/// The resource a felled tree drops.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LogOutput {
    pub(crate) def_name: String,
    pub(crate) label: String,
    pub(crate) prompt: String,
    pub(crate) fuel_value: f32,
}

impl LogOutput {
    pub(crate) fn from_archetype(def: &EntityArchetype) -> Option<Self> {
        if def.kind != EntityKind::Log {
            return None;
        }
        Some(Self {
            def_name: def.def_name.clone(),
            label: def.label.clone(),
            prompt: def
                .prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_LOG_PROMPT.to_string()),
            fuel_value: def.fuel_value.unwrap_or(DEFAULT_LOG_FUEL_VALUE),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Tree {
    entity_id: EntityId,
    prompt: String,
    chop_duration_seconds: f32,
    output: Option<LogOutput>,
    number_of_logs: u32,
    scatter_radius: f32,
    state: ChopState,
}

impl Tree {
    pub(crate) fn new(entity_id: EntityId, output: Option<LogOutput>) -> Self {
        Self {
            entity_id,
            prompt: DEFAULT_TREE_PROMPT.to_string(),
            chop_duration_seconds: DEFAULT_CHOP_DURATION_SECONDS,
            output,
            number_of_logs: DEFAULT_NUMBER_OF_LOGS,
            scatter_radius: DEFAULT_SCATTER_RADIUS,
            state: ChopState::Idle,
        }
    }

    pub(crate) fn from_archetype(
        entity_id: EntityId,
        def: &EntityArchetype,
        output: Option<LogOutput>,
    ) -> Self {
        let mut tree = Self::new(entity_id, output)
            .with_chop_duration(def.chop_duration.unwrap_or(DEFAULT_CHOP_DURATION_SECONDS))
            .with_logs(
                def.number_of_logs.unwrap_or(DEFAULT_NUMBER_OF_LOGS),
                def.scatter_radius.unwrap_or(DEFAULT_SCATTER_RADIUS),
            );
        if let Some(prompt) = &def.prompt {
            tree.prompt = prompt.clone();
        }
        tree
    }

    pub(crate) fn with_chop_duration(mut self, seconds: f32) -> Self {
        self.chop_duration_seconds = seconds.max(0.0);
        self
    }

    pub(crate) fn with_logs(mut self, number_of_logs: u32, scatter_radius: f32) -> Self {
        self.number_of_logs = number_of_logs;
        self.scatter_radius = scatter_radius.max(0.0);
        self
    }

    pub(crate) fn state(&self) -> ChopState {
        self.state
    }

    pub(crate) fn is_chopping(&self) -> bool {
        matches!(self.state, ChopState::Chopping { .. })
    }

    pub(crate) fn output(&self) -> Option<&LogOutput> {
        self.output.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn number_of_logs(&self) -> u32 {
        self.number_of_logs
    }

    #[cfg(test)]
    pub(crate) fn scatter_radius(&self) -> f32 {
        self.scatter_radius
    }

    /// Stops an in-flight chop without felling the tree.
    pub(crate) fn cancel_chop(&mut self, events: &mut GameplayEventBus) -> bool {
        if !self.is_chopping() {
            return false;
        }
        self.state = ChopState::Idle;
        info!(tree_id = self.entity_id.0, "chop_cancelled");
        events.emit(GameplayEvent::ChopCancelled {
            tree_id: self.entity_id,
        });
        true
    }

    /// Advances the chop timer. Returns the requester on the tick the timer
    /// elapses; the tree is `Felled` from then on.
    pub(crate) fn tick(&mut self, fixed_dt_seconds: f32) -> Option<EntityId> {
        let ChopState::Chopping {
            requester,
            remaining_seconds,
        } = self.state
        else {
            return None;
        };
        let remaining_seconds = remaining_seconds - fixed_dt_seconds;
        if remaining_seconds > 0.0 {
            self.state = ChopState::Chopping {
                requester,
                remaining_seconds,
            };
            return None;
        }
        self.state = ChopState::Felled;
        debug!(tree_id = self.entity_id.0, requester = requester.0, "chop_timer_elapsed");
        Some(requester)
    }

    /// Uniform points on the disc of `scatter_radius` around `base`, one per
    /// log.
    pub(crate) fn scatter_positions<R: Rng + ?Sized>(&self, base: Vec2, rng: &mut R) -> Vec<Vec2> {
        (0..self.number_of_logs)
            .map(|_| {
                let radius = self.scatter_radius * rng.random_range(0.0f32..1.0).sqrt();
                let angle = rng.random_range(0.0..TAU);
                Vec2::new(
                    base.x + radius * angle.cos(),
                    base.y + radius * angle.sin(),
                )
            })
            .collect()
    }
}

impl ChopTarget for Tree {
    fn prompt(&self) -> &str {
        &self.prompt
    }

    fn chop(&mut self, ctx: &mut InteractionContext<'_>) {
        if self.state != ChopState::Idle {
            info!(tree_id = self.entity_id.0, state = ?self.state, "chop_already_in_progress");
            ctx.events.fail(InteractionFailure::ChopAlreadyInProgress);
            return;
        }
        if self.output.is_none() {
            error!(tree_id = self.entity_id.0, "chop_output_missing");
            ctx.movement.set_state(PlayerState::Idle, ctx.events);
            ctx.events.fail(InteractionFailure::ChopOutputMissing);
            return;
        }

        ctx.movement.set_state(PlayerState::Interacting, ctx.events);
        self.state = ChopState::Chopping {
            requester: ctx.actor_id,
            remaining_seconds: self.chop_duration_seconds,
        };
        info!(
            tree_id = self.entity_id.0,
            actor_id = ctx.actor_id.0,
            duration_seconds = self.chop_duration_seconds,
            "chop_started"
        );
        ctx.events.emit(GameplayEvent::ChopStarted {
            tree_id: self.entity_id,
            actor_id: ctx.actor_id,
        });
    }

    fn interact(&mut self, ctx: &mut InteractionContext<'_>) {
        info!(tree_id = self.entity_id.0, prompt = self.prompt.as_str(), "tree_needs_axe");
        ctx.movement.set_state(PlayerState::Idle, ctx.events);
        ctx.events.emit(GameplayEvent::PromptChanged {
            prompt: Some(PROMPT_NEED_AXE.to_string()),
        });
    }
}

#[cfg(test)]
mod tests {
    use engine::{SceneWorld, Transform};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    use super::super::collect::ItemRegistry;
    use super::super::inventory::PlayerInventory;
    use super::super::movement::PlayerMovement;
    use super::super::types::GameplayEventKind;
    use super::*;

    fn log_output() -> LogOutput {
        LogOutput {
            def_name: "camp.log".to_string(),
            label: "Firewood".to_string(),
            prompt: DEFAULT_LOG_PROMPT.to_string(),
            fuel_value: 25.0,
        }
    }

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

        fn with_ctx(&mut self, action: impl FnOnce(&mut InteractionContext<'_>)) {
            let actor_id = self.movement.entity_id();
            let mut ctx = InteractionContext {
                actor_id,
                movement: &mut self.movement,
                inventory: Some(&mut self.inventory),
                items: &mut self.items,
                world: &mut self.world,
                events: &mut self.events,
            };
            action(&mut ctx);
        }
    }

    #[test]
    fn second_chop_while_chopping_is_dropped() {
        let mut harness = Harness::new();
        let mut tree = Tree::new(EntityId(7), Some(log_output())).with_chop_duration(0.5);

        harness.with_ctx(|ctx| tree.chop(ctx));
        harness.with_ctx(|ctx| tree.chop(ctx));

        assert_eq!(harness.events.count_of(GameplayEventKind::ChopStarted), 1);
        assert_eq!(harness.events.count_of(GameplayEventKind::InteractionFailed), 1);
        assert_eq!(harness.movement.state(), PlayerState::Interacting);

        let completions = (0..10).filter_map(|_| tree.tick(0.1)).count();
        assert_eq!(completions, 1);
        assert_eq!(tree.state(), ChopState::Felled);
    }

    #[test]
    fn chop_without_output_resets_requester() {
        let mut harness = Harness::new();
        harness
            .movement
            .set_state(PlayerState::Interacting, &mut harness.events);
        let mut tree = Tree::new(EntityId(7), None);

        harness.with_ctx(|ctx| tree.chop(ctx));

        assert_eq!(harness.movement.state(), PlayerState::Idle);
        assert_eq!(tree.state(), ChopState::Idle);
        assert_eq!(harness.events.count_of(GameplayEventKind::ChopStarted), 0);
    }

    #[test]
    fn plain_interact_only_resets_requester() {
        let mut harness = Harness::new();
        harness
            .movement
            .set_state(PlayerState::Interacting, &mut harness.events);
        let mut tree = Tree::new(EntityId(7), Some(log_output()));

        harness.with_ctx(|ctx| tree.interact(ctx));

        assert_eq!(harness.movement.state(), PlayerState::Idle);
        assert!(!tree.is_chopping());
        assert!(harness.events.drain().contains(&GameplayEvent::PromptChanged {
            prompt: Some(PROMPT_NEED_AXE.to_string()),
        }));
    }

    #[test]
    fn cancel_returns_tree_to_idle() {
        let mut harness = Harness::new();
        let mut tree = Tree::new(EntityId(7), Some(log_output()));
        harness.with_ctx(|ctx| tree.chop(ctx));

        assert!(tree.cancel_chop(&mut harness.events));
        assert!(!tree.cancel_chop(&mut harness.events));
        assert_eq!(tree.tick(5.0), None);
        assert_eq!(harness.events.count_of(GameplayEventKind::ChopCancelled), 1);
    }

    #[test]
    fn timer_elapses_after_chop_duration() {
        let mut harness = Harness::new();
        let mut tree = Tree::new(EntityId(7), Some(log_output())).with_chop_duration(1.0);
        harness.with_ctx(|ctx| tree.chop(ctx));

        assert_eq!(tree.tick(0.6), None);
        assert_eq!(tree.tick(0.6), Some(harness.movement.entity_id()));
        assert_eq!(tree.tick(0.6), None);
    }

    #[test]
    fn scattered_logs_stay_within_radius() {
        let tree = Tree::new(EntityId(7), Some(log_output())).with_logs(3, 0.75);
        let base = Vec2::new(4.0, -2.0);
        let mut rng = SmallRng::seed_from_u64(17);

        for _ in 0..50 {
            let positions = tree.scatter_positions(base, &mut rng);
            assert_eq!(positions.len(), 3);
            for position in positions {
                assert!(position.distance(base) <= 0.75 + 1e-5);
            }
        }
    }

    #[test]
    fn log_output_requires_log_archetype() {
        let mut log = EntityArchetype::new("camp.log", "Firewood", EntityKind::Log);
        log.fuel_value = Some(30.0);
        let output = LogOutput::from_archetype(&log).expect("log output");
        assert_eq!(output.fuel_value, 30.0);
        assert_eq!(output.prompt, DEFAULT_LOG_PROMPT);

        let axe = EntityArchetype::new("camp.axe", "Axe", EntityKind::Axe);
        assert_eq!(LogOutput::from_archetype(&axe), None);
    }
}
