use fusion_slam::error::CoreError;
use fusion_slam::{logging, output, runtime};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    logging::init();

    match run() {
        Ok(path) => {
            log::info!("wrote {}", path.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<PathBuf, CoreError> {
    let mut args = env::args();
    let program = args.next().unwrap_or_else(|| "fusion-slam".to_string());
    let config_path = args
        .next()
        .ok_or_else(|| CoreError::MissingArgument(program.clone()))?;

    let report = runtime::run(&PathBuf::from(config_path))?;
    let cwd = env::current_dir().map_err(|source| CoreError::OutputWrite {
        path: PathBuf::from("."),
        source,
    })?;
    output::write_report(&cwd, &report).map_err(|source| CoreError::OutputWrite {
        path: cwd,
        source,
    })
}
