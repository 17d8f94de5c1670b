use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityDefId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Player,
    Fire,
    TrashBox,
    Tree,
    Axe,
    Lantern,
    Log,
}

impl EntityKind {
    pub(crate) const ALLOWED: &'static str = "Player, Fire, TrashBox, Tree, Axe, Lantern, Log";

    pub(crate) fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Player" => Some(Self::Player),
            "Fire" => Some(Self::Fire),
            "TrashBox" => Some(Self::TrashBox),
            "Tree" => Some(Self::Tree),
            "Axe" => Some(Self::Axe),
            "Lantern" => Some(Self::Lantern),
            "Log" => Some(Self::Log),
            _ => None,
        }
    }
}

/// Tunables for one entity definition. Optional fields fall back to the
/// game's defaults when absent.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityArchetype {
    pub id: EntityDefId,
    pub def_name: String,
    pub label: String,
    pub kind: EntityKind,
    pub prompt: Option<String>,
    pub move_speed: Option<f32>,
    pub sprint_multiplier: Option<f32>,
    pub interaction_distance: Option<f32>,
    pub max_fuel: Option<f32>,
    pub decay_rate: Option<f32>,
    pub chop_duration: Option<f32>,
    pub log_def: Option<String>,
    pub number_of_logs: Option<u32>,
    pub scatter_radius: Option<f32>,
    pub fuel_value: Option<f32>,
}

impl EntityArchetype {
    pub fn new(def_name: impl Into<String>, label: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            id: EntityDefId(0),
            def_name: def_name.into(),
            label: label.into(),
            kind,
            prompt: None,
            move_speed: None,
            sprint_multiplier: None,
            interaction_distance: None,
            max_fuel: None,
            decay_rate: None,
            chop_duration: None,
            log_def: None,
            number_of_logs: None,
            scatter_radius: None,
            fuel_value: None,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct DefDatabase {
    entity_defs: Vec<EntityArchetype>,
    entity_ids_by_name: HashMap<String, EntityDefId>,
}

impl DefDatabase {
    /// Ids are assigned by position, so callers pass defs in a stable order.
    pub fn from_entity_defs(mut entity_defs: Vec<EntityArchetype>) -> Self {
        let mut entity_ids_by_name = HashMap::with_capacity(entity_defs.len());
        for (idx, def) in entity_defs.iter_mut().enumerate() {
            let id = EntityDefId(idx as u32);
            def.id = id;
            entity_ids_by_name.insert(def.def_name.clone(), id);
        }
        Self {
            entity_defs,
            entity_ids_by_name,
        }
    }

    pub fn entity_def_id_by_name(&self, name: &str) -> Option<EntityDefId> {
        self.entity_ids_by_name.get(name).copied()
    }

    pub fn entity_def(&self, id: EntityDefId) -> Option<&EntityArchetype> {
        self.entity_defs.get(id.0 as usize)
    }

    pub fn entity_def_by_name(&self, name: &str) -> Option<&EntityArchetype> {
        self.entity_def_id_by_name(name)
            .and_then(|id| self.entity_def(id))
    }

    pub fn entity_defs(&self) -> &[EntityArchetype] {
        &self.entity_defs
    }

    pub fn first_of_kind(&self, kind: EntityKind) -> Option<&EntityArchetype> {
        self.entity_defs.iter().find(|def| def.kind == kind)
    }
}
