use std::collections::BTreeMap;

use engine::{EntityId, InteractionTag, SceneWorld};
use tracing::{debug, error, info};

use super::chop::{ChopState, ChopTarget, Tree};
use super::collect::{Collectible, ItemRegistry};
use super::fire::{Interactable, InteractableProp};
use super::inventory::Inventory;
use super::movement::PlayerMovement;
use super::types::{
    ActiveAction, CarriedKind, GameplayEvent, GameplayEventBus, InteractionCandidate,
    InteractionContext, InteractionFailure, PlayerState, ScoredCandidate, PROMPT_CHOP_WOOD,
    PROMPT_DROP_AXE, PROMPT_DROP_LANTERN, PROMPT_DROP_WOOD, PROMPT_NEED_AXE,
};

pub(crate) const DEFAULT_INTERACTION_DISTANCE: f32 = 2.0;
pub(crate) const DEFAULT_DROP_OFFSET: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ResolverConfig {
    pub(crate) interaction_distance: f32,
    /// How far ahead of the player dropped items land.
    pub(crate) drop_offset: f32,
    /// When set, cancelling an in-flight chop also stops the tree's timer.
    pub(crate) cancel_aborts_chop: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            interaction_distance: DEFAULT_INTERACTION_DISTANCE,
            drop_offset: DEFAULT_DROP_OFFSET,
            cancel_aborts_chop: true,
        }
    }
}

/// Borrowed view of everything the resolver reads or mutates in one call.
pub(crate) struct ResolverCollaborators<'a> {
    pub(crate) world: &'a mut SceneWorld,
    pub(crate) movement: &'a mut PlayerMovement,
    pub(crate) inventory: Option<&'a mut dyn Inventory>,
    pub(crate) items: &'a mut ItemRegistry,
    pub(crate) interactables: &'a mut BTreeMap<EntityId, InteractableProp>,
    pub(crate) trees: &'a mut BTreeMap<EntityId, Tree>,
    pub(crate) events: &'a mut GameplayEventBus,
}

impl ResolverCollaborators<'_> {
    fn dispatch_parts(
        &mut self,
    ) -> (
        InteractionContext<'_>,
        &mut BTreeMap<EntityId, InteractableProp>,
        &mut BTreeMap<EntityId, Tree>,
    ) {
        let ctx = InteractionContext {
            actor_id: self.movement.entity_id(),
            movement: &mut *self.movement,
            inventory: match &mut self.inventory {
                Some(inventory) => Some(&mut **inventory),
                None => None,
            },
            items: &mut *self.items,
            world: &mut *self.world,
            events: &mut *self.events,
        };
        (ctx, &mut *self.interactables, &mut *self.trees)
    }

    fn inventory_flags(&self) -> InventoryFlags {
        match self.inventory.as_deref() {
            Some(inventory) => InventoryFlags {
                wood: inventory.has_wood(),
                axe: inventory.has_axe(),
                lantern: inventory.has_lantern(),
            },
            None => InventoryFlags::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct InventoryFlags {
    wood: bool,
    axe: bool,
    lantern: bool,
}

/// Picks what the player would act on, keeps the prompt for it and routes
/// interact presses to exactly one action.
#[derive(Debug)]
pub(crate) struct InteractionResolver {
    config: ResolverConfig,
    candidate: ScoredCandidate,
    prompt: Option<String>,
    prompt_flags: InventoryFlags,
    active_action: Option<ActiveAction>,
}

impl InteractionResolver {
    pub(crate) fn new(config: ResolverConfig) -> Self {
        Self {
            config,
            candidate: ScoredCandidate::default(),
            prompt: None,
            prompt_flags: InventoryFlags::default(),
            active_action: None,
        }
    }

    pub(crate) fn config(&self) -> &ResolverConfig {
        &self.config
    }

    #[cfg(test)]
    pub(crate) fn candidate(&self) -> InteractionCandidate {
        self.candidate.candidate
    }

    #[cfg(test)]
    pub(crate) fn candidate_distance(&self) -> Option<f32> {
        match self.candidate.candidate {
            InteractionCandidate::None => None,
            _ => Some(self.candidate.distance),
        }
    }

    #[cfg(test)]
    pub(crate) fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    #[cfg(test)]
    pub(crate) fn active_action(&self) -> Option<ActiveAction> {
        self.active_action
    }

    /// Re-selects the nearest tagged entity around the player. Frozen while
    /// the player is interacting unless `force_update` is set.
    ///
    /// Ties keep whichever entity the spatial query returned first, which is
    /// spawn order.
    pub(crate) fn update_candidate(
        &mut self,
        force_update: bool,
        collab: &mut ResolverCollaborators<'_>,
    ) {
        if collab.movement.is_interacting() && !force_update {
            return;
        }
        let Some(center) = collab.world.position_of(collab.movement.entity_id()) else {
            debug!(
                player_id = collab.movement.entity_id().0,
                "candidate_scan_without_player"
            );
            return;
        };

        let mut best = ScoredCandidate::default();
        for entity in collab
            .world
            .query_radius(center, self.config.interaction_distance)
        {
            let candidate = match entity.tag {
                Some(InteractionTag::Collectible) if collab.items.get(entity.id).is_some() => {
                    InteractionCandidate::Collectible(entity.id)
                }
                Some(InteractionTag::ChopTarget) if collab.trees.contains_key(&entity.id) => {
                    InteractionCandidate::ChopTarget(entity.id)
                }
                Some(InteractionTag::Interactable)
                    if collab.interactables.contains_key(&entity.id) =>
                {
                    InteractionCandidate::Interactable(entity.id)
                }
                _ => continue,
            };
            let distance = center.distance(entity.transform.position);
            if distance < best.distance {
                best = ScoredCandidate {
                    candidate,
                    distance,
                };
            }
        }

        let flags = collab.inventory_flags();
        let changed = best.candidate != self.candidate.candidate || flags != self.prompt_flags;
        self.candidate = best;
        if changed {
            self.prompt_flags = flags;
            let prompt = self.resolve_prompt(flags, collab);
            self.set_prompt(prompt, collab.events);
        }
    }

    /// First match wins: interactable, carried lantern, carried axe, carried
    /// wood, then the candidate's own prompt.
    fn resolve_prompt(
        &self,
        flags: InventoryFlags,
        collab: &ResolverCollaborators<'_>,
    ) -> Option<String> {
        let candidate = self.candidate.candidate;
        if let Some(prop) = candidate
            .interactable()
            .and_then(|id| collab.interactables.get(&id))
        {
            return Some(prop.prompt().to_string());
        }
        if flags.lantern {
            return Some(PROMPT_DROP_LANTERN.to_string());
        }
        if flags.axe {
            return Some(if candidate.chop_target().is_some() {
                PROMPT_CHOP_WOOD.to_string()
            } else {
                PROMPT_DROP_AXE.to_string()
            });
        }
        if flags.wood {
            return Some(PROMPT_DROP_WOOD.to_string());
        }
        match candidate {
            InteractionCandidate::Collectible(id) => {
                collab.items.get(id).map(|item| item.prompt().to_string())
            }
            InteractionCandidate::ChopTarget(_) => Some(PROMPT_NEED_AXE.to_string()),
            InteractionCandidate::Interactable(_) | InteractionCandidate::None => None,
        }
    }

    fn set_prompt(&mut self, prompt: Option<String>, events: &mut GameplayEventBus) {
        debug!(
            previous = self.prompt.as_deref().unwrap_or(""),
            prompt = prompt.as_deref().unwrap_or(""),
            "prompt_changed"
        );
        self.prompt = prompt.clone();
        events.emit(GameplayEvent::PromptChanged { prompt });
    }

    pub(crate) fn handle_interact_pressed(&mut self, collab: &mut ResolverCollaborators<'_>) {
        if collab.movement.is_interacting() {
            self.cancel_active_action(collab);
            return;
        }
        if collab.inventory.is_none() {
            error!(
                actor_id = collab.movement.entity_id().0,
                "interact_without_inventory"
            );
            collab.events.fail(InteractionFailure::InventoryMissing);
            return;
        }

        self.update_candidate(true, collab);
        let flags = collab.inventory_flags();
        let candidate = self.candidate.candidate;

        if let Some(target_id) = candidate.interactable() {
            self.interact_with(target_id, flags, collab);
            return;
        }
        if flags.lantern {
            self.drop_carried(CarriedKind::Lantern, collab);
            return;
        }
        if let (Some(tree_id), true) = (candidate.chop_target(), flags.axe) {
            self.start_chop(tree_id, collab);
            return;
        }
        if flags.axe {
            self.drop_carried(CarriedKind::Axe, collab);
            return;
        }
        if flags.wood {
            self.drop_carried(CarriedKind::Wood, collab);
            return;
        }
        if let Some(item_id) = candidate.collectible() {
            self.collect(item_id, collab);
            return;
        }
        if let Some(tree_id) = candidate.chop_target() {
            info!(tree_id = tree_id.0, "chop_requires_axe");
            collab.events.fail(InteractionFailure::NoAxeForChop);
            let (mut ctx, _, trees) = collab.dispatch_parts();
            if let Some(tree) = trees.get_mut(&tree_id) {
                tree.interact(&mut ctx);
            }
            return;
        }
        debug!("interact_without_target");
    }

    /// Clears the bookkeeping for a chop that ran to completion. When the
    /// completion unlocked the requester, whatever action it held is over too.
    pub(crate) fn on_chop_finished(&mut self, tree_id: EntityId, requester_unlocked: bool) {
        if requester_unlocked || self.active_action == Some(ActiveAction::Chop(tree_id)) {
            self.active_action = None;
        }
    }

    fn cancel_active_action(&mut self, collab: &mut ResolverCollaborators<'_>) {
        info!(action = ?self.active_action, "interaction_cancelled");
        collab.movement.set_state(PlayerState::Idle, collab.events);
        let Some(ActiveAction::Chop(tree_id)) = self.active_action.take() else {
            return;
        };
        let Some(tree) = collab.trees.get_mut(&tree_id) else {
            return;
        };
        if self.config.cancel_aborts_chop {
            tree.cancel_chop(collab.events);
        } else if tree.is_chopping() {
            info!(tree_id = tree_id.0, "chop_continues_after_cancel");
        }
    }

    fn interact_with(
        &mut self,
        target_id: EntityId,
        flags: InventoryFlags,
        collab: &mut ResolverCollaborators<'_>,
    ) {
        if !flags.wood {
            info!(target_id = target_id.0, "interact_requires_wood");
            collab.events.fail(InteractionFailure::NoWoodForInteractable);
            return;
        }
        collab
            .movement
            .set_state(PlayerState::Interacting, collab.events);
        self.active_action = Some(ActiveAction::Interact(target_id));

        let (mut ctx, interactables, _) = collab.dispatch_parts();
        let performed = match interactables.get_mut(&target_id) {
            Some(prop) => {
                info!(
                    target_id = target_id.0,
                    prompt = prop.prompt(),
                    "interaction_started"
                );
                prop.interact(&mut ctx)
            }
            None => false,
        };
        if !performed {
            info!(target_id = target_id.0, "interaction_aborted");
            collab.movement.set_state(PlayerState::Idle, collab.events);
            self.active_action = None;
        }
    }

    fn start_chop(&mut self, tree_id: EntityId, collab: &mut ResolverCollaborators<'_>) {
        let tree_idle = collab
            .trees
            .get(&tree_id)
            .is_some_and(|tree| tree.state() == ChopState::Idle);
        if tree_idle {
            collab
                .movement
                .set_state(PlayerState::Interacting, collab.events);
            self.active_action = Some(ActiveAction::Chop(tree_id));
        }

        let (mut ctx, _, trees) = collab.dispatch_parts();
        if let Some(tree) = trees.get_mut(&tree_id) {
            info!(tree_id = tree_id.0, prompt = tree.prompt(), "chop_requested");
            tree.chop(&mut ctx);
        }
        if !collab.movement.is_interacting() {
            self.active_action = None;
        }
    }

    fn drop_carried(&mut self, kind: CarriedKind, collab: &mut ResolverCollaborators<'_>) {
        let player_id = collab.movement.entity_id();
        let Some(origin) = collab.world.position_of(player_id) else {
            error!(player_id = player_id.0, "drop_without_player_entity");
            collab.events.fail(InteractionFailure::PlayerEntityMissing);
            return;
        };
        let position = origin.offset(collab.movement.forward(), self.config.drop_offset);
        let Some(inventory) = collab.inventory.as_deref_mut() else {
            return;
        };
        let dropped = match kind {
            CarriedKind::Wood => inventory.drop_wood(position, collab.world),
            CarriedKind::Axe => inventory.drop_axe(position, collab.world),
            CarriedKind::Lantern => inventory.drop_lantern(position, collab.world),
        };
        if let Some(item_id) = dropped {
            info!(item_id = item_id.0, kind = ?kind, "item_dropped");
            collab.events.emit(GameplayEvent::ItemDropped {
                item_id,
                kind,
                position,
            });
        }
        self.set_prompt(None, collab.events);
    }

    fn collect(&mut self, item_id: EntityId, collab: &mut ResolverCollaborators<'_>) {
        let Some(item) = collab.items.get(item_id).cloned() else {
            return;
        };
        let (mut ctx, _, _) = collab.dispatch_parts();
        item.collect(&mut ctx);
        self.candidate = ScoredCandidate::default();
        self.set_prompt(None, collab.events);
    }
}
