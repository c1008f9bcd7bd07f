//! # Logging
//!
//! A single entry point for bootstrapping process-wide logging before any
//! operator starts. Operators themselves log through the plain `log` facade
//! (`log::info!`, `log::warn!`, `log::error!`) rather than a hand-rolled
//! logger trait — `env_logger` reads `RUST_LOG` for verbosity.

pub fn init() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .is_test(cfg!(test))
        .try_init();
}
