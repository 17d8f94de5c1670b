mod input;
mod loop_runner;
mod scene;

pub use input::{ControlDevice, InputReader, InputSnapshot, RawInputEvent};
pub use loop_runner::{run_headless, InputSource, LoopConfig, LoopReport};
pub use scene::{
    Entity, EntityId, InteractionTag, Scene, SceneCommand, SceneWorld, Transform, Vec2,
};
