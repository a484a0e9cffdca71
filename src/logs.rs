use std::{path::Path, process::Command};

use log::{debug, info, warn};

use crate::scom::Backend;

/// Runs the log collection script that copies dmesg and the firmware message
/// log next to the triage output.
///
/// Failures are only logged.
pub fn collect_logs(script: impl AsRef<Path>) -> bool {
    let script = script.as_ref();
    if !script.exists() {
        warn!("log collection script {} not found", script.display());
        return false;
    }
    match Command::new("bash").arg(script).status() {
        Ok(status) if status.success() => {
            info!("logs collected by {}", script.display());
            true
        }
        Ok(status) => {
            warn!("{} exited with {status}", script.display());
            false
        }
        Err(err) => {
            warn!("failed to run {}: {err}", script.display());
            false
        }
    }
}

/// Collects logs after a triage pass unless the vendor library was used.
///
/// Returns `None` when collection was skipped.
pub fn collect_after_triage(backend: &Backend, script: impl AsRef<Path>) -> Option<bool> {
    if backend.is_vendor() {
        debug!("vendor backend in use, skipping log collection");
        return None;
    }
    Some(collect_logs(script))
}
