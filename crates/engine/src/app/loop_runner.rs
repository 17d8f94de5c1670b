use std::time::Duration;

use tracing::{info, warn};

use super::input::{InputReader, RawInputEvent};
use super::scene::{Scene, SceneCommand, SceneWorld};

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub target_tps: u32,
    /// Wall time each simulated frame pretends to have taken.
    pub frame_delta: Duration,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub gamepad_connected: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            frame_delta: Duration::from_micros(16_667),
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            gamepad_connected: false,
        }
    }
}

/// Supplies the raw events that arrived during a frame.
pub trait InputSource {
    fn events_for_frame(&mut self, frame_index: u64) -> Vec<RawInputEvent>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopReport {
    pub frames: u64,
    pub ticks: u64,
    pub simulated_seconds: f32,
    pub dropped_backlog: Duration,
    pub quit_requested: bool,
    pub final_entity_count: usize,
}

/// Drives `scene` for up to `frames` simulated frames with a fixed simulation
/// step. Pending spawns and despawns are applied after every tick.
pub fn run_headless(
    config: &LoopConfig,
    scene: &mut dyn Scene,
    input_source: &mut dyn InputSource,
    frames: u64,
) -> LoopReport {
    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();
    let frame_delta = normalize_non_zero_duration(config.frame_delta, fixed_dt);

    info!(
        target_tps,
        frame_delta_us = frame_delta.as_micros() as u64,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        "loop_config"
    );

    let mut world = SceneWorld::default();
    let mut reader = InputReader::new();
    reader.start(config.gamepad_connected);
    scene.load(&mut world);
    world.apply_pending();
    info!(entity_count = world.entity_count(), "scene_loaded");

    let mut report = LoopReport::default();
    let mut accumulator = Duration::ZERO;

    'frames: for frame_index in 0..frames {
        for event in input_source.events_for_frame(frame_index) {
            reader.handle_event(event);
        }

        accumulator = accumulator.saturating_add(clamp_frame_delta(frame_delta, max_frame_delta));
        let plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
        accumulator = plan.remaining_accumulator;
        if !plan.dropped_backlog.is_zero() {
            warn!(
                dropped_backlog_ms = plan.dropped_backlog.as_millis() as u64,
                "sim_backlog_dropped"
            );
            report.dropped_backlog = report.dropped_backlog.saturating_add(plan.dropped_backlog);
        }

        report.frames = report.frames.saturating_add(1);
        for _ in 0..plan.ticks_to_run {
            let snapshot = reader.snapshot_for_tick();
            let command = scene.update(fixed_dt_seconds, &snapshot, &mut world);
            world.apply_pending();
            report.ticks = report.ticks.saturating_add(1);
            report.simulated_seconds += fixed_dt_seconds;
            if command == SceneCommand::Quit {
                info!(frame_index, reason = "scene_command", "shutdown_requested");
                report.quit_requested = true;
                break 'frames;
            }
        }
    }

    if let Some(title) = scene.debug_title(&world) {
        info!(title = title.as_str(), "scene_summary");
    }
    report.final_entity_count = world.entity_count();
    scene.unload(&mut world);
    world.clear();
    info!(
        frames = report.frames,
        ticks = report.ticks,
        simulated_seconds = report.simulated_seconds,
        "loop_finished"
    );
    report
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}
