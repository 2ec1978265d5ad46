//! Posture query and response types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A compliance attestation request issued by the client engine.
///
/// `id` is the posture query id the response must be matched back to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PostureQuery {
    Domain { id: String },
    Process { id: String, path: PathBuf },
    Os { id: String },
    Mac { id: String },
}

impl PostureQuery {
    pub fn id(&self) -> &str {
        match self {
            PostureQuery::Domain { id }
            | PostureQuery::Process { id, .. }
            | PostureQuery::Os { id }
            | PostureQuery::Mac { id } => id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PostureQuery::Domain { .. } => "domain",
            PostureQuery::Process { .. } => "process",
            PostureQuery::Os { .. } => "os",
            PostureQuery::Mac { .. } => "mac",
        }
    }
}

/// Facts about a process the engine asked about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub is_running: bool,
    /// Hex digest of the executable, if it could be read
    pub hash: Option<String>,
    /// Signer certificate fingerprints
    #[serde(default)]
    pub signers: Vec<String>,
}

/// Operating system identification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsInfo {
    pub os_type: String,
    pub version: String,
    pub build: String,
}

/// Answer to a `PostureQuery`, carrying the query id back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PostureResponse {
    Domain { id: String, domain: String },
    Process { id: String, path: PathBuf, info: ProcessInfo },
    Os { id: String, info: OsInfo },
    Mac { id: String, addresses: Vec<String> },
}

impl PostureResponse {
    pub fn id(&self) -> &str {
        match self {
            PostureResponse::Domain { id, .. }
            | PostureResponse::Process { id, .. }
            | PostureResponse::Os { id, .. }
            | PostureResponse::Mac { id, .. } => id,
        }
    }
}
