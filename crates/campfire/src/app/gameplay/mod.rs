mod chop;
mod collect;
mod fire;
mod inventory;
mod movement;
mod resolver;
mod scene_impl;
mod score;
mod types;

pub(crate) use scene_impl::{CampScene, DEFAULT_RNG_SEED};
