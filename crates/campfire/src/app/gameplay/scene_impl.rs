use std::collections::BTreeMap;

use engine::{
    DefDatabase, EntityArchetype, EntityId, EntityKind, InputSnapshot, InteractionTag, Scene,
    SceneCommand, SceneWorld, Transform, Vec2,
};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::{debug, error, info, warn};

use super::chop::{LogOutput, Tree, DEFAULT_LOG_PROMPT};
use super::collect::{CarriedItem, ItemKind, ItemRegistry};
use super::fire::{Fire, InteractableProp, TrashBox};
use super::inventory::{Inventory, PlayerInventory};
use super::movement::PlayerMovement;
use super::resolver::{InteractionResolver, ResolverCollaborators, ResolverConfig};
use super::score::{CampfireScoring, ScoreBoard, ScoreConfig};
use super::types::{GameplayEvent, GameplayEventBus, PlayerState};

pub(crate) const DEFAULT_RNG_SEED: u64 = 0x00C4_3F1E;

const DEFAULT_AXE_PROMPT: &str = "Pick up Axe";
const DEFAULT_LANTERN_PROMPT: &str = "Pick up Lantern";

/// Where the camp's entities start.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CampLayout {
    pub(crate) player: Vec2,
    pub(crate) axe: Vec2,
    pub(crate) lantern: Vec2,
    pub(crate) fire: Vec2,
    pub(crate) trash_box: Vec2,
    pub(crate) trees: Vec<Vec2>,
}

impl Default for CampLayout {
    fn default() -> Self {
        Self {
            player: Vec2::ZERO,
            axe: Vec2::new(0.0, 1.2),
            lantern: Vec2::new(-6.0, -6.0),
            fire: Vec2::new(4.0, 0.0),
            trash_box: Vec2::new(-4.0, 0.0),
            trees: vec![
                Vec2::new(0.0, 4.5),
                Vec2::new(3.0, 6.0),
                Vec2::new(-3.0, 6.0),
            ],
        }
    }
}

/// All gameplay records of one camp plus the collaborators the resolver is
/// handed each tick.
#[derive(Debug)]
pub(crate) struct CampState {
    resolver: InteractionResolver,
    movement: Option<PlayerMovement>,
    inventory: Option<PlayerInventory>,
    items: ItemRegistry,
    interactables: BTreeMap<EntityId, InteractableProp>,
    trees: BTreeMap<EntityId, Tree>,
    events: GameplayEventBus,
    score: ScoreBoard,
    campfire_scoring: CampfireScoring,
    day_length_seconds: f32,
    day_elapsed_seconds: f32,
    rng: SmallRng,
    trees_felled: u32,
}

impl CampState {
    pub(crate) fn new(resolver_config: ResolverConfig, score_config: ScoreConfig, seed: u64) -> Self {
        Self {
            resolver: InteractionResolver::new(resolver_config),
            movement: None,
            inventory: None,
            items: ItemRegistry::default(),
            interactables: BTreeMap::new(),
            trees: BTreeMap::new(),
            events: GameplayEventBus::default(),
            score: ScoreBoard::new(score_config.day_multiplier_growth),
            campfire_scoring: CampfireScoring::new(&score_config),
            day_length_seconds: score_config.day_length_seconds,
            day_elapsed_seconds: 0.0,
            rng: SmallRng::seed_from_u64(seed),
            trees_felled: 0,
        }
    }

    pub(crate) fn resolver(&self) -> &InteractionResolver {
        &self.resolver
    }

    #[cfg(test)]
    pub(crate) fn player_id(&self) -> Option<EntityId> {
        self.movement.as_ref().map(PlayerMovement::entity_id)
    }

    pub(crate) fn player_state(&self) -> PlayerState {
        self.movement
            .as_ref()
            .map_or(PlayerState::Idle, PlayerMovement::state)
    }

    pub(crate) fn inventory(&self) -> Option<&PlayerInventory> {
        self.inventory.as_ref()
    }

    /// Removes the player's inventory, leaving the player without the
    /// collaborator most actions need.
    #[cfg(test)]
    pub(crate) fn detach_inventory(&mut self) -> Option<PlayerInventory> {
        self.inventory.take()
    }

    /// Puts an existing item straight into the player's inventory.
    #[cfg(test)]
    pub(crate) fn give_item(&mut self, world: &mut SceneWorld, item_id: EntityId) -> bool {
        let (Some(inventory), Some(item)) = (self.inventory.as_mut(), self.items.get(item_id))
        else {
            return false;
        };
        inventory.pick_up(item.kind.carried_kind(), item_id, world)
    }

    pub(crate) fn items(&self) -> &ItemRegistry {
        &self.items
    }

    #[cfg(test)]
    pub(crate) fn fire(&self, id: EntityId) -> Option<&Fire> {
        self.interactables.get(&id).and_then(InteractableProp::as_fire)
    }

    pub(crate) fn fires(&self) -> impl Iterator<Item = &Fire> {
        self.interactables.values().filter_map(InteractableProp::as_fire)
    }

    #[cfg(test)]
    pub(crate) fn tree(&self, id: EntityId) -> Option<&Tree> {
        self.trees.get(&id)
    }

    pub(crate) fn tree_count(&self) -> usize {
        self.trees.len()
    }

    pub(crate) fn trees_felled(&self) -> u32 {
        self.trees_felled
    }

    pub(crate) fn score(&self) -> &ScoreBoard {
        &self.score
    }

    pub(crate) fn drain_events(&mut self) -> Vec<GameplayEvent> {
        self.events.drain()
    }

    pub(crate) fn spawn_player(
        &mut self,
        world: &mut SceneWorld,
        def: &EntityArchetype,
        position: Vec2,
    ) -> EntityId {
        let id = world.spawn(Transform::at(position), def.def_name.as_str(), None);
        self.movement = Some(PlayerMovement::from_archetype(id, def));
        self.inventory = Some(PlayerInventory::default());
        info!(player_id = id.0, x = position.x, y = position.y, "player_spawned");
        id
    }

    pub(crate) fn spawn_fire(
        &mut self,
        world: &mut SceneWorld,
        def: &EntityArchetype,
        position: Vec2,
    ) -> EntityId {
        let id = world.spawn(
            Transform::at(position),
            def.def_name.as_str(),
            Some(InteractionTag::Interactable),
        );
        let mut fire = Fire::from_archetype(id, def);
        fire.on_spawn(&mut self.events);
        self.interactables.insert(id, InteractableProp::Fire(fire));
        id
    }

    pub(crate) fn spawn_trash_box(
        &mut self,
        world: &mut SceneWorld,
        def: &EntityArchetype,
        position: Vec2,
    ) -> EntityId {
        let id = world.spawn(
            Transform::at(position),
            def.def_name.as_str(),
            Some(InteractionTag::Interactable),
        );
        self.interactables
            .insert(id, InteractableProp::TrashBox(TrashBox::from_archetype(id, def)));
        id
    }

    pub(crate) fn spawn_tree(
        &mut self,
        world: &mut SceneWorld,
        def: &EntityArchetype,
        position: Vec2,
        output: Option<LogOutput>,
    ) -> EntityId {
        let id = world.spawn(
            Transform::at(position),
            def.def_name.as_str(),
            Some(InteractionTag::ChopTarget),
        );
        if output.is_none() {
            warn!(tree_id = id.0, def_name = def.def_name.as_str(), "tree_without_log_output");
        }
        self.trees.insert(id, Tree::from_archetype(id, def, output));
        id
    }

    /// Spawns an axe, lantern or log. Other kinds are not items.
    pub(crate) fn spawn_item(
        &mut self,
        world: &mut SceneWorld,
        def: &EntityArchetype,
        position: Vec2,
    ) -> Option<EntityId> {
        let Some(kind) = ItemKind::from_archetype(def) else {
            warn!(def_name = def.def_name.as_str(), kind = ?def.kind, "archetype_is_not_an_item");
            return None;
        };
        let prompt = def.prompt.clone().unwrap_or_else(|| {
            match kind {
                ItemKind::Axe => DEFAULT_AXE_PROMPT,
                ItemKind::Lantern => DEFAULT_LANTERN_PROMPT,
                ItemKind::Log { .. } => DEFAULT_LOG_PROMPT,
            }
            .to_string()
        });
        Some(self.insert_item(world, def.def_name.as_str(), kind, prompt, position))
    }

    fn spawn_log(&mut self, world: &mut SceneWorld, output: &LogOutput, position: Vec2) -> EntityId {
        self.insert_item(
            world,
            output.def_name.as_str(),
            ItemKind::Log {
                fuel_value: output.fuel_value,
            },
            output.prompt.clone(),
            position,
        )
    }

    fn insert_item(
        &mut self,
        world: &mut SceneWorld,
        debug_name: &str,
        kind: ItemKind,
        prompt: String,
        position: Vec2,
    ) -> EntityId {
        let entity_id = world.spawn(
            Transform::at(position),
            debug_name,
            Some(InteractionTag::Collectible),
        );
        self.items.insert(CarriedItem {
            entity_id,
            kind,
            prompt,
        });
        entity_id
    }

    /// One fixed step of camp gameplay. Spawns and despawns queued here land
    /// when the caller applies the world's pending changes.
    pub(crate) fn tick(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot, world: &mut SceneWorld) {
        if let Some(device) = input.device_changed() {
            info!(device = ?device, "control_device_changed");
            self.events.emit(GameplayEvent::ControlDeviceChanged { device });
        }

        if let Some(movement) = self.movement.as_mut() {
            movement.apply_input(input);
            movement.step(fixed_dt_seconds, world);

            let mut collab = ResolverCollaborators {
                world: &mut *world,
                movement,
                inventory: self
                    .inventory
                    .as_mut()
                    .map(|inventory| inventory as &mut dyn Inventory),
                items: &mut self.items,
                interactables: &mut self.interactables,
                trees: &mut self.trees,
                events: &mut self.events,
            };
            self.resolver.update_candidate(false, &mut collab);
            if input.interact_pressed() {
                self.resolver.handle_interact_pressed(&mut collab);
            }
        }

        for prop in self.interactables.values_mut() {
            if let Some(fire) = prop.as_fire_mut() {
                fire.tick(fixed_dt_seconds, &mut self.events);
                self.campfire_scoring
                    .accrue(fire, fixed_dt_seconds, &mut self.score);
            }
        }
        self.advance_day(fixed_dt_seconds);

        let finished: Vec<(EntityId, EntityId)> = self
            .trees
            .iter_mut()
            .filter_map(|(tree_id, tree)| tree.tick(fixed_dt_seconds).map(|actor| (*tree_id, actor)))
            .collect();
        for (tree_id, requester) in finished {
            self.fell_tree(tree_id, requester, world);
        }
    }

    fn advance_day(&mut self, fixed_dt_seconds: f32) {
        if self.day_length_seconds <= 0.0 {
            return;
        }
        self.day_elapsed_seconds += fixed_dt_seconds;
        while self.day_elapsed_seconds >= self.day_length_seconds {
            self.day_elapsed_seconds -= self.day_length_seconds;
            self.score.next_day();
        }
    }

    fn fell_tree(&mut self, tree_id: EntityId, requester: EntityId, world: &mut SceneWorld) {
        let Some(tree) = self.trees.remove(&tree_id) else {
            return;
        };

        let mut logs_spawned = 0u32;
        match (world.position_of(tree_id), tree.output()) {
            (Some(base), Some(output)) => {
                for position in tree.scatter_positions(base, &mut self.rng) {
                    let log_id = self.spawn_log(world, output, position);
                    debug!(
                        tree_id = tree_id.0,
                        log_id = log_id.0,
                        label = output.label.as_str(),
                        x = position.x,
                        y = position.y,
                        "log_spawned"
                    );
                    logs_spawned += 1;
                }
            }
            (None, _) => error!(tree_id = tree_id.0, "felled_tree_not_in_world"),
            (Some(_), None) => error!(tree_id = tree_id.0, "felled_tree_without_output"),
        }

        let mut requester_unlocked = false;
        if let Some(movement) = self.movement.as_mut() {
            if movement.entity_id() == requester {
                movement.set_state(PlayerState::Idle, &mut self.events);
                requester_unlocked = true;
            }
        }
        self.resolver.on_chop_finished(tree_id, requester_unlocked);
        world.despawn(tree_id);
        self.trees_felled = self.trees_felled.saturating_add(1);
        info!(tree_id = tree_id.0, logs_spawned, "tree_felled");
        self.events.emit(GameplayEvent::TreeFelled {
            tree_id,
            logs_spawned,
        });
    }
}

/// Single consumer of gameplay notifications. Keeps what a HUD would show.
#[derive(Debug, Default)]
pub(crate) struct CampHud {
    prompt: Option<String>,
    fuel: BTreeMap<EntityId, (f32, f32)>,
    fires_extinguished: u32,
    failures: u32,
}

impl CampHud {
    pub(crate) fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    #[cfg(test)]
    pub(crate) fn fuel_of(&self, fire_id: EntityId) -> Option<(f32, f32)> {
        self.fuel.get(&fire_id).copied()
    }

    pub(crate) fn fires_extinguished(&self) -> u32 {
        self.fires_extinguished
    }

    pub(crate) fn failures(&self) -> u32 {
        self.failures
    }

    pub(crate) fn observe(&mut self, event: GameplayEvent) {
        match event {
            GameplayEvent::PromptChanged { prompt } => {
                info!(prompt = prompt.as_deref().unwrap_or(""), "hud_prompt");
                self.prompt = prompt;
            }
            GameplayEvent::FuelChanged {
                fire_id,
                current,
                max,
            } => {
                self.fuel.insert(fire_id, (current, max));
            }
            GameplayEvent::FireExtinguished { fire_id } => {
                warn!(fire_id = fire_id.0, "hud_fire_out");
                self.fires_extinguished = self.fires_extinguished.saturating_add(1);
            }
            GameplayEvent::PlayerStateChanged { from, to } => {
                debug!(from = ?from, to = ?to, "hud_player_state");
            }
            GameplayEvent::InteractionFailed { reason } => {
                debug!(reason = ?reason, "hud_interaction_failed");
                self.failures = self.failures.saturating_add(1);
            }
            other => debug!(event = ?other, "hud_event"),
        }
    }
}

/// The playable camp: builds its layout from content defs on load and runs
/// one `CampState` tick per fixed step.
pub(crate) struct CampScene {
    defs: DefDatabase,
    layout: CampLayout,
    resolver_config: ResolverConfig,
    score_config: ScoreConfig,
    seed: u64,
    state: CampState,
    hud: CampHud,
}

impl CampScene {
    pub(crate) fn new(defs: DefDatabase, seed: u64) -> Self {
        let resolver_config = ResolverConfig::default();
        let score_config = ScoreConfig::default();
        Self {
            defs,
            layout: CampLayout::default(),
            resolver_config,
            score_config,
            seed,
            state: CampState::new(resolver_config, score_config, seed),
            hud: CampHud::default(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_layout(mut self, layout: CampLayout) -> Self {
        self.layout = layout;
        self
    }

    pub(crate) fn state(&self) -> &CampState {
        &self.state
    }

    pub(crate) fn hud(&self) -> &CampHud {
        &self.hud
    }

    fn archetype(&self, kind: EntityKind) -> Option<&EntityArchetype> {
        let def = self.defs.first_of_kind(kind);
        if def.is_none() {
            warn!(kind = ?kind, "archetype_missing");
        }
        def
    }

    fn log_output_for(&self, tree_def: &EntityArchetype) -> Option<LogOutput> {
        let log_def = tree_def.log_def.as_deref()?;
        match self.defs.entity_def_by_name(log_def) {
            Some(def) => {
                let output = LogOutput::from_archetype(def);
                if output.is_none() {
                    warn!(tree = tree_def.def_name.as_str(), log_def, "tree_log_def_not_a_log");
                }
                output
            }
            None => {
                warn!(tree = tree_def.def_name.as_str(), log_def, "tree_log_def_unknown");
                None
            }
        }
    }

    fn populate(&mut self, world: &mut SceneWorld) {
        let mut state = CampState::new(self.resolver_config, self.score_config, self.seed);
        let layout = self.layout.clone();

        if let Some(def) = self.archetype(EntityKind::Player) {
            if let Some(distance) = def.interaction_distance {
                state.resolver = InteractionResolver::new(ResolverConfig {
                    interaction_distance: distance,
                    ..self.resolver_config
                });
            }
            state.spawn_player(world, def, layout.player);
        }
        if let Some(def) = self.archetype(EntityKind::Fire) {
            state.spawn_fire(world, def, layout.fire);
        }
        if let Some(def) = self.archetype(EntityKind::TrashBox) {
            state.spawn_trash_box(world, def, layout.trash_box);
        }
        if let Some(def) = self.archetype(EntityKind::Axe) {
            state.spawn_item(world, def, layout.axe);
        }
        if let Some(def) = self.archetype(EntityKind::Lantern) {
            state.spawn_item(world, def, layout.lantern);
        }
        if let Some(def) = self.archetype(EntityKind::Tree) {
            let output = self.log_output_for(def);
            for position in &layout.trees {
                state.spawn_tree(world, def, *position, output.clone());
            }
        }
        self.state = state;
    }
}

impl Scene for CampScene {
    fn load(&mut self, world: &mut SceneWorld) {
        self.hud = CampHud::default();
        self.populate(world);
        for event in self.state.drain_events() {
            self.hud.observe(event);
        }
        info!(
            fires = self.state.fires().count(),
            trees = self.state.tree_count(),
            items = self.state.items().len(),
            interaction_distance = self.state.resolver().config().interaction_distance,
            "camp_loaded"
        );
    }

    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand {
        self.state.tick(fixed_dt_seconds, input, world);
        for event in self.state.drain_events() {
            self.hud.observe(event);
        }
        SceneCommand::None
    }

    fn unload(&mut self, _world: &mut SceneWorld) {
        info!(
            score = self.state.score().score(),
            day_count = self.state.score().day_count(),
            trees_felled = self.state.trees_felled(),
            fires_extinguished = self.hud.fires_extinguished(),
            failures = self.hud.failures(),
            "camp_unloaded"
        );
    }

    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        let fuel = self
            .state
            .fires()
            .map(|fire| format!("{:.1}/{:.0}", fire.current_fuel(), fire.max_fuel()))
            .collect::<Vec<_>>()
            .join(",");
        Some(format!(
            "camp | state={:?} | prompt={} | fuel={} | score={:.1} | day={}",
            self.state.player_state(),
            self.hud.prompt().unwrap_or("-"),
            fuel,
            self.state.score().score(),
            self.state.score().day_count(),
        ))
    }
}
