//! The server side: request table, worker pool and the dispatcher loop.

pub mod pool;
pub mod server;
pub mod table;

pub use pool::{WorkerCredentials, WorkerPool, MAX_WORKERS};
pub use server::RelayServer;
pub use table::{PendingRequest, RequestTable, REQUEST_TTL};
