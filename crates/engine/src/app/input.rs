use tracing::info;

use super::scene::Vec2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ControlDevice {
    KeyboardMouse,
    Gamepad,
    #[default]
    Unknown,
}

/// Device-level input already reduced to the abstract actions the game
/// understands. Producing these from real hardware is the platform layer's job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawInputEvent {
    Move {
        device: ControlDevice,
        vector: Vec2,
    },
    SprintPressed {
        device: ControlDevice,
    },
    SprintReleased {
        device: ControlDevice,
    },
    InteractPressed {
        device: ControlDevice,
    },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    movement: Vec2,
    sprint_started: bool,
    sprint_canceled: bool,
    interact_pressed: bool,
    device_changed: Option<ControlDevice>,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn movement(&self) -> Vec2 {
        self.movement
    }

    pub fn sprint_started(&self) -> bool {
        self.sprint_started
    }

    pub fn sprint_canceled(&self) -> bool {
        self.sprint_canceled
    }

    pub fn interact_pressed(&self) -> bool {
        self.interact_pressed
    }

    pub fn device_changed(&self) -> Option<ControlDevice> {
        self.device_changed
    }

    pub fn with_movement(mut self, movement: Vec2) -> Self {
        self.movement = movement;
        self
    }

    pub fn with_sprint_started(mut self, sprint_started: bool) -> Self {
        self.sprint_started = sprint_started;
        self
    }

    pub fn with_sprint_canceled(mut self, sprint_canceled: bool) -> Self {
        self.sprint_canceled = sprint_canceled;
        self
    }

    pub fn with_interact_pressed(mut self, interact_pressed: bool) -> Self {
        self.interact_pressed = interact_pressed;
        self
    }

    pub fn with_device_changed(mut self, device_changed: Option<ControlDevice>) -> Self {
        self.device_changed = device_changed;
        self
    }
}

/// Folds raw events into per-tick snapshots. Presses are edge-triggered and
/// visible for exactly one snapshot; the movement vector is held until the
/// next `Move` event.
#[derive(Debug, Default)]
pub struct InputReader {
    current_device: ControlDevice,
    last_reported_device: ControlDevice,
    pending_device_change: Option<ControlDevice>,
    movement: Vec2,
    sprint_is_down: bool,
    sprint_started_edge: bool,
    sprint_canceled_edge: bool,
    interact_pressed_edge: bool,
}

impl InputReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Picks the initial device class. This is not reported as a change.
    pub fn start(&mut self, gamepad_connected: bool) {
        self.current_device = if gamepad_connected {
            ControlDevice::Gamepad
        } else {
            ControlDevice::KeyboardMouse
        };
        self.last_reported_device = self.current_device;
        info!(device = ?self.current_device, "initial_device_state");
    }

    pub fn current_device(&self) -> ControlDevice {
        self.current_device
    }

    pub fn handle_event(&mut self, event: RawInputEvent) {
        match event {
            RawInputEvent::Move { device, vector } => {
                let started = self.movement.length_sq() <= f32::EPSILON
                    && vector.length_sq() > f32::EPSILON;
                if started {
                    self.check_and_report_device(device);
                }
                self.movement = vector;
            }
            RawInputEvent::SprintPressed { device } => {
                if !self.sprint_is_down {
                    self.check_and_report_device(device);
                    self.sprint_started_edge = true;
                }
                self.sprint_is_down = true;
            }
            RawInputEvent::SprintReleased { .. } => {
                if self.sprint_is_down {
                    self.sprint_canceled_edge = true;
                }
                self.sprint_is_down = false;
            }
            RawInputEvent::InteractPressed { device } => {
                self.interact_pressed_edge = true;
                self.check_and_report_device(device);
            }
        }
    }

    pub fn snapshot_for_tick(&mut self) -> InputSnapshot {
        let device_changed = self
            .pending_device_change
            .take()
            .filter(|device| *device != self.last_reported_device);
        if let Some(device) = device_changed {
            self.last_reported_device = device;
        }
        let snapshot = InputSnapshot {
            movement: self.movement,
            sprint_started: self.sprint_started_edge,
            sprint_canceled: self.sprint_canceled_edge,
            interact_pressed: self.interact_pressed_edge,
            device_changed,
        };
        self.sprint_started_edge = false;
        self.sprint_canceled_edge = false;
        self.interact_pressed_edge = false;
        snapshot
    }

    fn check_and_report_device(&mut self, device: ControlDevice) {
        if self.current_device == device {
            return;
        }
        self.current_device = device;
        self.pending_device_change = Some(device);
        info!(device = ?device, "control_scheme_switched");
    }
}
