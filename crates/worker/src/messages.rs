//! Message types crossing the worker boundary.
//!
//! Everything here is plain data: footprints and transforms are copied into
//! the request, so the worker never sees a live host object. The JSON helpers
//! serve hosts that run the worker behind a process or language boundary.

use bedplate_core::{Error, Result};
use bedplate_d2::{CollisionEntry, CollisionReport, Plate};
use serde::{Deserialize, Serialize};

/// A request to compute the collision matrix for one generation of the object set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartRequest {
    /// Host-supplied version tag; reports carry it back.
    pub generation: u64,

    /// Objects to test, already projected.
    pub objects: Vec<CollisionEntry>,

    /// Plate the objects sit on.
    pub plate: Plate,

    /// Time budget in milliseconds (0 = unlimited).
    #[serde(default)]
    pub budget_ms: u64,
}

/// Host-to-worker command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerCommand {
    /// Supersedes whatever the worker is doing.
    Start(StartRequest),

    /// Continues a partial run of `generation` with a fresh budget.
    Resume { generation: u64, budget_ms: u64 },

    /// Stops the worker thread.
    Shutdown,
}

impl WorkerCommand {
    /// Generation the command refers to, if any.
    pub fn generation(&self) -> Option<u64> {
        match self {
            WorkerCommand::Start(request) => Some(request.generation),
            WorkerCommand::Resume { generation, .. } => Some(*generation),
            WorkerCommand::Shutdown => None,
        }
    }
}

/// Encodes a command as JSON.
pub fn encode_command(command: &WorkerCommand) -> Result<String> {
    serde_json::to_string(command).map_err(|e| Error::Serialization(e.to_string()))
}

/// Decodes a command from JSON.
pub fn decode_command(json: &str) -> Result<WorkerCommand> {
    serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))
}

/// Encodes a report as JSON.
pub fn encode_report(report: &CollisionReport) -> Result<String> {
    serde_json::to_string(report).map_err(|e| Error::Serialization(e.to_string()))
}

/// Decodes a report from JSON.
pub fn decode_report(json: &str) -> Result<CollisionReport> {
    serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))
}
