//! Backend worker pool.
//!
//! Maintains up to `workers` child processes running the operator-supplied
//! backend command, each with piped stdin/stdout/stderr. Workers read one
//! JSON request per line on stdin and answer with one JSON reply per line on
//! stdout; stderr lines surface in the operator log. The 1 Hz tick reaps
//! exited children and respawns to the configured count.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{error, info, warn};

/// Hard ceiling on the worker count.
pub const MAX_WORKERS: usize = 32;

/// A worker silent for longer than this is not considered for dispatch.
const IDLE_WINDOW: Duration = Duration::from_secs(5);

/// Upper bound on a stdin write before it is treated as a transport failure.
const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// Credentials applied to spawned workers when running as root.
#[derive(Debug, Clone, Copy)]
pub struct WorkerCredentials {
    pub uid: u32,
    pub gid: Option<u32>,
}

/// Events from worker stdout readers, delivered to the dispatcher task so
/// all pool and table state stays under single ownership.
#[derive(Debug)]
pub enum WorkerEvent {
    /// One complete line from a worker's stdout. Partial tails are buffered
    /// by the line reader until the newline arrives.
    Line { slot: usize, pid: u32, line: String },
    /// The worker's stdout reached end of file; the tick reaper cleans the
    /// slot up once the process exits.
    Eof { slot: usize, pid: u32 },
}

struct Worker {
    pid: u32,
    child: Child,
    stdin: ChildStdin,
    last_active: Instant,
    stdout_open: bool,
}

impl Worker {
    fn available(&self, now: Instant) -> bool {
        self.stdout_open && now.saturating_duration_since(self.last_active) <= IDLE_WINDOW
    }
}

/// Fixed-capacity set of backend workers.
pub struct WorkerPool {
    slots: Vec<Option<Worker>>,
    target: usize,
    argv: Vec<String>,
    credentials: Option<WorkerCredentials>,
    events: mpsc::Sender<WorkerEvent>,
}

impl WorkerPool {
    pub fn new(
        argv: Vec<String>,
        target: usize,
        credentials: Option<WorkerCredentials>,
        events: mpsc::Sender<WorkerEvent>,
    ) -> Self {
        let target = target.clamp(1, MAX_WORKERS);
        Self {
            slots: (0..MAX_WORKERS).map(|_| None).collect(),
            target,
            argv,
            credentials,
            events,
        }
    }

    /// Reap exited children and respawn until the live count matches the
    /// configured count. Called from the 1 Hz tick.
    pub fn maintain(&mut self) {
        for slot in self.slots.iter_mut() {
            if let Some(worker) = slot {
                if let Ok(Some(status)) = worker.child.try_wait() {
                    info!("backend worker {} exited ({})", worker.pid, status);
                    *slot = None;
                }
            }
        }

        let live = self.slots.iter().filter(|slot| slot.is_some()).count();
        for _ in live..self.target {
            let Some(index) = self.slots.iter().position(Option::is_none) else {
                break;
            };
            match self.spawn_worker(index) {
                Ok(worker) => {
                    info!("spawned backend worker {}", worker.pid);
                    self.slots[index] = Some(worker);
                }
                Err(e) => {
                    // the next tick retries, which bounds the respawn rate
                    error!("cannot spawn backend worker: {}", e);
                    break;
                }
            }
        }
    }

    fn spawn_worker(&self, slot: usize) -> std::io::Result<Worker> {
        let mut command = Command::new(&self.argv[0]);
        command
            .args(&self.argv[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(credentials) = self.credentials {
            if let Some(gid) = credentials.gid {
                command.gid(gid);
            }
            command.uid(credentials.uid);
        }

        let mut child = command.spawn()?;
        let pid = child.id().unwrap_or(0);
        let stdin = child.stdin.take().expect("worker stdin is piped");
        let stdout = child.stdout.take().expect("worker stdout is piped");
        let stderr = child.stderr.take().expect("worker stderr is piped");

        let events = self.events.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let line = line.trim_end_matches('\r').to_string();
                if line.is_empty() {
                    continue;
                }
                if events.send(WorkerEvent::Line { slot, pid, line }).await.is_err() {
                    return;
                }
            }
            let _ = events.send(WorkerEvent::Eof { slot, pid }).await;
        });

        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let line = line.trim_end();
                if !line.is_empty() {
                    warn!("worker {}: {}", pid, line);
                }
            }
        });

        Ok(Worker {
            pid,
            child,
            stdin,
            last_active: Instant::now(),
            stdout_open: true,
        })
    }

    /// Number of workers eligible for dispatch.
    pub fn available(&self, now: Instant) -> usize {
        self.slots
            .iter()
            .flatten()
            .filter(|worker| worker.available(now))
            .count()
    }

    /// Pick the `selector % available`-th live worker, a stable and cheap
    /// spread across the pool.
    pub fn select(&self, selector: u8, now: Instant) -> Option<usize> {
        let count = self.available(now);
        if count == 0 {
            return None;
        }
        let mut target = usize::from(selector) % count;
        for (index, slot) in self.slots.iter().enumerate() {
            if let Some(worker) = slot {
                if worker.available(now) {
                    if target == 0 {
                        return Some(index);
                    }
                    target -= 1;
                }
            }
        }
        None
    }

    /// The pid of the worker currently occupying a slot.
    pub fn pid_of(&self, slot: usize) -> Option<u32> {
        self.slots.get(slot)?.as_ref().map(|worker| worker.pid)
    }

    /// Write one JSON line to a worker's stdin. A stalled or short write is
    /// a transport failure; the pending entry simply expires.
    pub async fn dispatch(&mut self, slot: usize, line: &str) -> std::io::Result<()> {
        let worker = self.slots[slot]
            .as_mut()
            .ok_or_else(|| std::io::Error::other("worker slot is empty"))?;
        let mut payload = Vec::with_capacity(line.len() + 1);
        payload.extend_from_slice(line.as_bytes());
        payload.push(b'\n');
        match timeout(WRITE_TIMEOUT, worker.stdin.write_all(&payload)).await {
            Ok(result) => result,
            Err(_) => Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "worker stdin write timed out",
            )),
        }
    }

    /// Refresh a worker's liveness stamp after a successfully parsed stdout
    /// line. Returns false when the event is stale (the slot was reaped or
    /// respawned since).
    pub fn stamp(&mut self, slot: usize, pid: u32, now: Instant) -> bool {
        match self.slots.get_mut(slot).and_then(Option::as_mut) {
            Some(worker) if worker.pid == pid => {
                worker.last_active = now;
                true
            }
            _ => false,
        }
    }

    /// Mark a worker's stdout as closed; it is no longer dispatched to and
    /// the tick reaper collects it once the process exits.
    pub fn mark_eof(&mut self, slot: usize, pid: u32) {
        if let Some(worker) = self.slots.get_mut(slot).and_then(Option::as_mut) {
            if worker.pid == pid {
                worker.stdout_open = false;
            }
        }
    }
}
