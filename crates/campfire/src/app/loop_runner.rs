use std::process::ExitCode;

use engine::run_headless;
use tracing::{info, warn};

use super::bootstrap::AppWiring;
use super::script::ScriptedInput;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let AppWiring {
        config,
        mut scene,
        script,
    } = app;
    let mut input = ScriptedInput::new(&script);

    let report = run_headless(&config, &mut scene, &mut input, script.frames);
    if input.remaining() > 0 {
        warn!(remaining = input.remaining(), "scripted_input_unconsumed");
    }

    let state = scene.state();
    let hud = scene.hud();
    info!(
        frames = report.frames,
        ticks = report.ticks,
        simulated_seconds = report.simulated_seconds,
        entity_count = report.final_entity_count,
        score = state.score().score(),
        day_count = state.score().day_count(),
        trees_felled = state.trees_felled(),
        fires_extinguished = hud.fires_extinguished(),
        failures = hud.failures(),
        "session_finished"
    );

    ExitCode::SUCCESS
}
