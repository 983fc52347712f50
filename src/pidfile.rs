//! PID-file handling for server mode.
//!
//! A stale file left by a crashed instance is overwritten; a file naming a
//! live process refuses startup.

use std::fs;
use std::path::Path;

use nix::sys::signal::kill;
use nix::unistd::Pid;

use crate::error::RelayError;

/// Check for a previously running instance and write our own pid.
pub fn acquire(path: &Path) -> Result<(), RelayError> {
    if let Ok(content) = fs::read_to_string(path) {
        if let Ok(pid) = content.trim().parse::<i32>() {
            if pid > 0 && kill(Pid::from_raw(pid), None).is_ok() {
                return Err(RelayError::PidfileCollision(pid));
            }
        }
    }
    fs::write(path, format!("{}\n", std::process::id())).map_err(|source| RelayError::Pidfile {
        path: path.display().to_string(),
        source,
    })
}

/// Remove the pidfile on clean shutdown. Best effort.
pub fn release(path: &Path) {
    let _ = fs::remove_file(path);
}
