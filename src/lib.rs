//! OpenCAPI link triage over POWER SCOM registers.
//!
//! Registers are reached either through the kernel's
//! `/sys/kernel/debug/powerpc/scom` interface or, when it is installed, the
//! eCMD vendor library. The [`triage`] pass prints a fixed table of link
//! registers and the [`disable`] pass turns off cache inject on every SM
//! running in OpenCAPI mode.

#![deny(unsafe_code)]

/// Chip ids and debugfs discovery
pub mod chip;

/// Config file loading
pub mod config;

/// Cache inject disable pass
pub mod disable;

/// Error types
pub mod error;

/// Log collection after a triage pass
pub mod logs;

/// Register access backends
pub mod scom;

/// Register groups of the triage pass
pub mod targets;

/// Triage printing
pub mod triage;

pub use chip::ChipId;
pub use config::{Config, ConfigLoader};
pub use error::{Result, ScomError};
pub use scom::{Backend, FailurePolicy, ScomAdaptor};

/// Initialises `env_logger`; `RUST_LOG` overrides the level picked from `-v`.
pub fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env = env_logger::Env::default().default_filter_or(level);
    let _ignore = env_logger::Builder::from_env(env).try_init();
}
