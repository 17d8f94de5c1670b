mod app;

use std::path::PathBuf;
use std::process::ExitCode;

use tracing::error;

fn main() -> ExitCode {
    let script_path = std::env::args_os().nth(1).map(PathBuf::from);
    match app::bootstrap::build_app(script_path) {
        Ok(wiring) => app::loop_runner::run(wiring),
        Err(err) => {
            error!(error = %err, "startup_failed");
            ExitCode::FAILURE
        }
    }
}
