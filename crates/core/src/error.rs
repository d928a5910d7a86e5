//! Fatal, start-up-only error type. Per spec.md §7, config corruption is the
//! *only* error class that aborts the process (exit code 1) — everything
//! else is captured as a structured [`crate::tool::ToolResult`] and handed
//! back to the LLM.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiqError {
    #[error("config file corrupted beyond salvage: {source}")]
    ConfigCorrupt {
        #[source]
        source: serde_yaml::Error,
    },
    #[error("session file corrupted beyond salvage: {source}")]
    SessionCorrupt {
        #[source]
        source: serde_json::Error,
    },
    #[error("filesystem error: {source}")]
    Io {
        #[source]
        source: std::io::Error,
    },
}
