use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome classification of a single probe attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    /// Connected and received the expected head response
    Online,
    /// Connected but the response was malformed or unexpected
    Error,
    /// Connection failed, closed early, or timed out
    Offline,
}

impl std::fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeStatus::Online => write!(f, "online"),
            ProbeStatus::Error => write!(f, "error"),
            ProbeStatus::Offline => write!(f, "offline"),
        }
    }
}

/// Result of probing one server, immutable once built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// Address that was probed
    pub server: String,

    /// Reported chain height; present exactly when status is `online`
    pub block_height: Option<u64>,

    /// Classification of this attempt
    pub status: ProbeStatus,

    /// When the probe resolved
    pub last_checked: DateTime<Utc>,
}

impl ProbeResult {
    /// Valid head response received
    pub fn online(server: impl Into<String>, block_height: u64) -> Self {
        Self {
            server: server.into(),
            block_height: Some(block_height),
            status: ProbeStatus::Online,
            last_checked: Utc::now(),
        }
    }

    /// Connected but the reply was not a usable head response
    pub fn protocol_error(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            block_height: None,
            status: ProbeStatus::Error,
            last_checked: Utc::now(),
        }
    }

    /// Could not connect, or the server went silent
    pub fn offline(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            block_height: None,
            status: ProbeStatus::Offline,
            last_checked: Utc::now(),
        }
    }
}

/// One element of a snapshot.
///
/// The sentinel variant only appears as the sole element of the snapshot
/// produced for an empty registry, and serializes as `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnapshotEntry {
    Result(ProbeResult),
    Sentinel { error: String },
}

/// Immutable ordered outcome of one sweep, one entry per registry server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    entries: Vec<SnapshotEntry>,
}

impl Snapshot {
    pub fn from_results(results: Vec<ProbeResult>) -> Self {
        Self { entries: results.into_iter().map(SnapshotEntry::Result).collect() }
    }

    /// Single-element marker snapshot for an empty registry
    pub fn sentinel(message: impl Into<String>) -> Self {
        Self { entries: vec![SnapshotEntry::Sentinel { error: message.into() }] }
    }

    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
