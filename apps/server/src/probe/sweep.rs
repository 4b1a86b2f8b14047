use std::time::Duration;

use futures::future;
use tracing::{error, warn};

use super::checker::probe;
use super::types::{ProbeResult, Snapshot};
use crate::registry::Registry;

/// Sentinel message returned when there is nothing to probe.
pub const NO_SERVERS_MESSAGE: &str = "No servers available for checking";

/// Seam for the sweep so the cache can be exercised without network probes.
#[async_trait::async_trait]
pub trait Sweeper: Send + Sync {
    /// Probe every registry entry and return one snapshot in registry order.
    async fn sweep(&self, registry: &Registry) -> Snapshot;
}

/// Production sweeper: one concurrent WebSocket probe per registry entry.
pub struct ProbeSweeper {
    request_timeout: Duration,
}

impl ProbeSweeper {
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }
}

#[async_trait::async_trait]
impl Sweeper for ProbeSweeper {
    async fn sweep(&self, registry: &Registry) -> Snapshot {
        if registry.is_empty() {
            warn!("sweep requested with no servers configured");
            return Snapshot::sentinel(NO_SERVERS_MESSAGE);
        }

        // One task per server; each carries its own timeout, so a slow or
        // hung server never blocks its siblings.
        let request_timeout = self.request_timeout;
        let handles: Vec<_> = registry
            .servers()
            .iter()
            .cloned()
            .map(|server| tokio::spawn(async move { probe(&server, request_timeout).await }))
            .collect();

        // Joining the handles in spawn order keeps registry order regardless
        // of which probe resolves first.
        let joined = future::join_all(handles).await;
        let results = registry
            .servers()
            .iter()
            .zip(joined)
            .map(|(server, joined)| match joined {
                Ok(result) => result,
                Err(join_error) => {
                    error!(server = server.as_str(), %join_error, "probe task failed");
                    ProbeResult::offline(server.clone())
                }
            })
            .collect();

        Snapshot::from_results(results)
    }
}
