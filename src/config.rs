//! Runtime settings assembled from the command line.

use std::net::IpAddr;
use std::path::PathBuf;

use nix::unistd::{Group, User};
use serde_json::{Map, Value};

use crate::error::RelayError;
use crate::relay::pool::{WorkerCredentials, MAX_WORKERS};

pub const DEFAULT_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 67;
pub const DEFAULT_PIDFILE: &str = "/var/run/salur.pid";
pub const DEFAULT_WORKERS: usize = 1;
pub const DEFAULT_RETRIES: u32 = 3;

/// Everything the server and client modes need at runtime.
#[derive(Debug)]
pub struct Settings {
    pub address: IpAddr,
    pub port: u16,
    pub interface: Option<String>,
    /// Backend command argv; `Some` selects server mode.
    pub backend: Option<Vec<String>>,
    pub credentials: Option<WorkerCredentials>,
    pub workers: usize,
    pub retries: u32,
    /// Extra attributes merged into the client-mode DISCOVER.
    pub extra_request: Option<Map<String, Value>>,
    pub pidfile: Option<PathBuf>,
}

impl Settings {
    pub fn server_mode(&self) -> bool {
        self.backend.is_some()
    }
}

/// Split a backend command into an argv, honoring single and double quotes.
pub fn split_command(command: &str) -> Result<Vec<String>, RelayError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for c in command.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '\'' || c == '"' => quote = Some(c),
            None if c.is_whitespace() => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            None => current.push(c),
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    if words.is_empty() {
        return Err(RelayError::EmptyBackend);
    }
    Ok(words)
}

/// Resolve a `user[:group]` credentials spec through the name-service
/// database. The caller only applies the result when running as root.
pub fn resolve_credentials(spec: &str) -> Result<WorkerCredentials, RelayError> {
    let (user, group) = match spec.split_once(':') {
        Some((user, group)) => (user, Some(group)),
        None => (spec, None),
    };

    let uid = User::from_name(user)
        .ok()
        .flatten()
        .map(|entry| entry.uid.as_raw())
        .ok_or_else(|| RelayError::UnknownUser(user.to_string()))?;
    let gid = match group {
        Some(name) => Some(
            Group::from_name(name)
                .ok()
                .flatten()
                .map(|entry| entry.gid.as_raw())
                .ok_or_else(|| RelayError::UnknownGroup(name.to_string()))?,
        ),
        None => None,
    };
    Ok(WorkerCredentials { uid, gid })
}

/// Worker count is clamped to [1, 32].
pub fn clamp_workers(count: usize) -> usize {
    count.clamp(1, MAX_WORKERS)
}

/// Client retry count is clamped to [1, 5].
pub fn clamp_retries(count: u32) -> u32 {
    count.clamp(1, 5)
}

/// Parse the `--request` specification: a JSON object whose attributes are
/// merged into the client-mode DISCOVER.
pub fn parse_request_extra(spec: &str) -> anyhow::Result<Map<String, Value>> {
    match serde_json::from_str(spec)? {
        Value::Object(object) => Ok(object),
        _ => anyhow::bail!("request specification must be a JSON object"),
    }
}
