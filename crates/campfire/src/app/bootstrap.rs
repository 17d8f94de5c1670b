use std::path::PathBuf;

use engine::{compile_def_database, resolve_app_paths, ContentCompileError, LoopConfig, StartupError};
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::gameplay::{CampScene, DEFAULT_RNG_SEED};
use super::script::{InputScript, ScriptError};

const RNG_SEED_ENV_VAR: &str = "CAMPFIRE_RNG_SEED";

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Content(#[from] ContentCompileError),
    #[error(transparent)]
    Script(#[from] ScriptError),
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: CampScene,
    pub(crate) script: InputScript,
}

pub(crate) fn build_app(script_path: Option<PathBuf>) -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Campfire Startup ===");

    let paths = resolve_app_paths()?;
    info!(root = %paths.root.display(), content_dir = %paths.content_dir.display(), "paths_resolved");

    let defs = compile_def_database(&paths.content_dir)?;
    info!(def_count = defs.entity_defs().len(), "content_compiled");

    let script = match script_path {
        Some(path) => {
            info!(path = %path.display(), "input_script_selected");
            InputScript::load(&path)?
        }
        None => InputScript::builtin()?,
    };

    let seed = parse_seed(std::env::var(RNG_SEED_ENV_VAR).ok().as_deref());
    let config = LoopConfig {
        gamepad_connected: script.gamepad_connected,
        ..LoopConfig::default()
    };

    Ok(AppWiring {
        config,
        scene: CampScene::new(defs, seed),
        script,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn parse_seed(raw: Option<&str>) -> u64 {
    let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return DEFAULT_RNG_SEED;
    };
    let parsed = match raw.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => raw.parse::<u64>(),
    };
    match parsed {
        Ok(seed) => seed,
        Err(error) => {
            warn!(value = raw, error = %error, fallback = DEFAULT_RNG_SEED, "rng_seed_invalid");
            DEFAULT_RNG_SEED
        }
    }
}
