use engine::{ControlDevice, EntityId, SceneWorld, Vec2};

use super::collect::ItemRegistry;
use super::inventory::Inventory;
use super::movement::PlayerMovement;

pub(crate) const PROMPT_DROP_LANTERN: &str = "Drop Lantern";
pub(crate) const PROMPT_CHOP_WOOD: &str = "Chop Wood";
pub(crate) const PROMPT_DROP_AXE: &str = "Drop Axe";
pub(crate) const PROMPT_DROP_WOOD: &str = "Drop Wood";
pub(crate) const PROMPT_NEED_AXE: &str = "Need Axe to Chop";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum PlayerState {
    #[default]
    Idle,
    Interacting,
}

/// What the player would act on if interact were pressed now. Recomputed every
/// tick from the physical layout; never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum InteractionCandidate {
    #[default]
    None,
    Interactable(EntityId),
    Collectible(EntityId),
    ChopTarget(EntityId),
}

impl InteractionCandidate {
    #[cfg(test)]
    pub(crate) fn entity_id(self) -> Option<EntityId> {
        match self {
            Self::None => None,
            Self::Interactable(id) | Self::Collectible(id) | Self::ChopTarget(id) => Some(id),
        }
    }

    pub(crate) fn interactable(self) -> Option<EntityId> {
        match self {
            Self::Interactable(id) => Some(id),
            _ => None,
        }
    }

    pub(crate) fn collectible(self) -> Option<EntityId> {
        match self {
            Self::Collectible(id) => Some(id),
            _ => None,
        }
    }

    pub(crate) fn chop_target(self) -> Option<EntityId> {
        match self {
            Self::ChopTarget(id) => Some(id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ScoredCandidate {
    pub(crate) candidate: InteractionCandidate,
    pub(crate) distance: f32,
}

impl Default for ScoredCandidate {
    fn default() -> Self {
        Self {
            candidate: InteractionCandidate::None,
            distance: f32::MAX,
        }
    }
}

/// Everything an entity action may touch. Built by the resolver for a single
/// dispatch; `inventory` is `None` when the actor has no inventory attached.
pub(crate) struct InteractionContext<'a> {
    pub(crate) actor_id: EntityId,
    pub(crate) movement: &'a mut PlayerMovement,
    pub(crate) inventory: Option<&'a mut dyn Inventory>,
    pub(crate) items: &'a mut ItemRegistry,
    pub(crate) world: &'a mut SceneWorld,
    pub(crate) events: &'a mut GameplayEventBus,
}

/// The action the resolver locked the player into, kept so a cancel press
/// knows what it interrupts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ActiveAction {
    Interact(EntityId),
    Chop(EntityId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CarriedKind {
    Wood,
    Axe,
    Lantern,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InteractionFailure {
    InventoryMissing,
    PlayerEntityMissing,
    NoWoodForInteractable,
    NoAxeForChop,
    FeedWithoutWood,
    CarriedWoodMissing,
    CarriedLogHasNoFuel,
    ChopAlreadyInProgress,
    ChopOutputMissing,
    SlotOccupied,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum GameplayEvent {
    PromptChanged {
        prompt: Option<String>,
    },
    PlayerStateChanged {
        from: PlayerState,
        to: PlayerState,
    },
    ControlDeviceChanged {
        device: ControlDevice,
    },
    FuelChanged {
        fire_id: EntityId,
        current: f32,
        max: f32,
    },
    FireExtinguished {
        fire_id: EntityId,
    },
    WoodConsumed {
        fire_id: EntityId,
        log_id: EntityId,
        fuel_added: f32,
    },
    ChopStarted {
        tree_id: EntityId,
        actor_id: EntityId,
    },
    ChopCancelled {
        tree_id: EntityId,
    },
    TreeFelled {
        tree_id: EntityId,
        logs_spawned: u32,
    },
    ItemCollected {
        item_id: EntityId,
        kind: CarriedKind,
    },
    ItemDropped {
        item_id: EntityId,
        kind: CarriedKind,
        position: Vec2,
    },
    InteractionFailed {
        reason: InteractionFailure,
    },
}

#[cfg(test)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GameplayEventKind {
    PromptChanged,
    PlayerStateChanged,
    ControlDeviceChanged,
    FuelChanged,
    FireExtinguished,
    WoodConsumed,
    ChopStarted,
    ChopCancelled,
    TreeFelled,
    ItemCollected,
    ItemDropped,
    InteractionFailed,
}

#[cfg(test)]
impl GameplayEvent {
    pub(crate) fn kind(&self) -> GameplayEventKind {
        match self {
            Self::PromptChanged { .. } => GameplayEventKind::PromptChanged,
            Self::PlayerStateChanged { .. } => GameplayEventKind::PlayerStateChanged,
            Self::ControlDeviceChanged { .. } => GameplayEventKind::ControlDeviceChanged,
            Self::FuelChanged { .. } => GameplayEventKind::FuelChanged,
            Self::FireExtinguished { .. } => GameplayEventKind::FireExtinguished,
            Self::WoodConsumed { .. } => GameplayEventKind::WoodConsumed,
            Self::ChopStarted { .. } => GameplayEventKind::ChopStarted,
            Self::ChopCancelled { .. } => GameplayEventKind::ChopCancelled,
            Self::TreeFelled { .. } => GameplayEventKind::TreeFelled,
            Self::ItemCollected { .. } => GameplayEventKind::ItemCollected,
            Self::ItemDropped { .. } => GameplayEventKind::ItemDropped,
            Self::InteractionFailed { .. } => GameplayEventKind::InteractionFailed,
        }
    }
}

/// Notifications are queued in emission order and handed to a single
/// consumer with `drain`. Nothing is delivered re-entrantly while gameplay
/// code is still mutating state.
#[derive(Debug, Default)]
pub(crate) struct GameplayEventBus {
    pending: Vec<GameplayEvent>,
}

impl GameplayEventBus {
    pub(crate) fn emit(&mut self, event: GameplayEvent) {
        self.pending.push(event);
    }

    #[cfg(test)]
    pub(crate) fn count_of(&self, kind: GameplayEventKind) -> usize {
        self.pending.iter().filter(|event| event.kind() == kind).count()
    }

    pub(crate) fn drain(&mut self) -> Vec<GameplayEvent> {
        std::mem::take(&mut self.pending)
    }

    pub(crate) fn fail(&mut self, reason: InteractionFailure) {
        self.emit(GameplayEvent::InteractionFailed { reason });
    }
}
