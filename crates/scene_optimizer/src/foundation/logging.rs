//! Logging utilities
//!
//! Library code only ever emits through the `log` macros; these helpers give
//! binaries one place to initialize `env_logger` consistently.

pub use log::{debug, error, info, trace, warn, LevelFilter};

/// Initialize logging from the environment (`RUST_LOG`)
pub fn init() {
    env_logger::init();
}

/// Initialize logging with a default level
///
/// `RUST_LOG` still overrides the default, so a quieter or noisier run never
/// needs a rebuild.
pub fn init_with_level(level: LevelFilter) {
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}
