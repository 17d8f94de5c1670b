use std::fs;
use std::path::{Path, PathBuf};

use engine::{ControlDevice, InputSource, RawInputEvent, Vec2};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

const BUILTIN_SCRIPT: &str = include_str!("../../../../assets/scripts/camp_session.json");
const BUILTIN_ORIGIN: &str = "<builtin camp_session.json>";

#[derive(Debug, Error)]
pub(crate) enum ScriptError {
    #[error("failed to read input script {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode input script {origin} at {path}: {source}")]
    Decode {
        origin: String,
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("input script {origin} schedules an event at frame {frame} but only runs {frames} frames")]
    FrameOutOfRange {
        origin: String,
        frame: u64,
        frames: u64,
    },
}

/// A recorded session: how many frames to simulate and what the player
/// pressed along the way.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct InputScript {
    pub(crate) frames: u64,
    #[serde(default)]
    pub(crate) gamepad_connected: bool,
    #[serde(default)]
    pub(crate) events: Vec<ScriptedEvent>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ScriptedEvent {
    pub(crate) frame: u64,
    #[serde(default)]
    pub(crate) device: ScriptDevice,
    pub(crate) input: ScriptInput,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ScriptDevice {
    #[default]
    KeyboardMouse,
    Gamepad,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ScriptInput {
    Move { x: f32, y: f32 },
    SprintPressed,
    SprintReleased,
    Interact,
}

impl ScriptedEvent {
    fn to_raw(&self) -> RawInputEvent {
        let device = match self.device {
            ScriptDevice::KeyboardMouse => ControlDevice::KeyboardMouse,
            ScriptDevice::Gamepad => ControlDevice::Gamepad,
        };
        match self.input {
            ScriptInput::Move { x, y } => RawInputEvent::Move {
                device,
                vector: Vec2 { x, y },
            },
            ScriptInput::SprintPressed => RawInputEvent::SprintPressed { device },
            ScriptInput::SprintReleased => RawInputEvent::SprintReleased { device },
            ScriptInput::Interact => RawInputEvent::InteractPressed { device },
        }
    }
}

impl InputScript {
    pub(crate) fn builtin() -> Result<Self, ScriptError> {
        Self::parse(BUILTIN_SCRIPT, BUILTIN_ORIGIN)
    }

    pub(crate) fn load(path: &Path) -> Result<Self, ScriptError> {
        let raw = fs::read_to_string(path).map_err(|source| ScriptError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw, &path.display().to_string())
    }

    fn parse(raw: &str, origin: &str) -> Result<Self, ScriptError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let script = match serde_path_to_error::deserialize::<_, InputScript>(&mut deserializer) {
            Ok(script) => script,
            Err(error) => {
                let path = error.path().to_string();
                return Err(ScriptError::Decode {
                    origin: origin.to_string(),
                    path,
                    source: error.into_inner(),
                });
            }
        };

        if let Some(late) = script.events.iter().find(|event| event.frame >= script.frames) {
            return Err(ScriptError::FrameOutOfRange {
                origin: origin.to_string(),
                frame: late.frame,
                frames: script.frames,
            });
        }
        Ok(script)
    }
}

/// Replays an [`InputScript`] frame by frame. Events sharing a frame keep
/// their file order.
#[derive(Debug)]
pub(crate) struct ScriptedInput {
    events: Vec<ScriptedEvent>,
    cursor: usize,
}

impl ScriptedInput {
    pub(crate) fn new(script: &InputScript) -> Self {
        let mut events = script.events.clone();
        events.sort_by_key(|event| event.frame);
        Self { events, cursor: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.events.len() - self.cursor
    }
}

impl InputSource for ScriptedInput {
    fn events_for_frame(&mut self, frame_index: u64) -> Vec<RawInputEvent> {
        let mut out = Vec::new();
        while let Some(event) = self.events.get(self.cursor) {
            if event.frame > frame_index {
                break;
            }
            out.push(event.to_raw());
            self.cursor += 1;
        }
        if !out.is_empty() {
            debug!(frame_index, count = out.len(), "scripted_input_delivered");
        }
        out
    }
}
