/// Probe engine module - probes every configured server concurrently
///
/// This module is responsible for:
/// - Probing single servers over a WebSocket head subscription
/// - Fanning one probe per registry entry out into a sweep
/// - Caching the latest snapshot behind a TTL with single-flight refresh
pub mod cache;
pub mod checker;
pub mod sweep;
pub mod types;

pub use cache::{DEFAULT_CACHE_TTL, StatusCache};
pub use checker::{DEFAULT_REQUEST_TIMEOUT, probe};
pub use sweep::{ProbeSweeper, Sweeper};
pub use types::{ProbeResult, ProbeStatus, Snapshot, SnapshotEntry};
