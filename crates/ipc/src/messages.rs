//! Main IPC message enums for communication between the host and the tools.

use serde::{Deserialize, Serialize};

use crate::error::IpcError;
use crate::types::{CommandReport, ProgressUpdate};

/// Shape key operations the host can trigger.
///
/// Objects and shape keys are addressed by name; the host resolves its own
/// selection state before sending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ShapeKeyCommand {
    /// Split the selected shape key into left/right halves
    SplitActive { object: String, key: Option<String> },

    /// Split every non-Basis shape key that has not been split yet
    SplitAll { object: String },

    /// Merge the selected shape key with its left/right counterpart
    MergeActive { object: String, key: Option<String> },

    /// Merge every left/right pair on the object
    MergeAll { object: String },

    /// Rename suffixed halves of MMD canonical keys to their MMD names
    RenameForMmd { object: String },

    /// Make same-named shape keys on other meshes follow the selected key
    AddLinkages { object: String, key: Option<String> },

    /// Link every non-Basis shape key to same-named keys on other meshes
    AddAllLinkages { object: String },

    /// Remove linkages from same-named shape keys on other meshes
    RemoveLinkages { object: String, key: Option<String> },
}

impl ShapeKeyCommand {
    /// Wire names of every command, as used in the `type` tag
    pub const NAMES: [&'static str; 8] = [
        "SplitActive",
        "SplitAll",
        "MergeActive",
        "MergeAll",
        "RenameForMmd",
        "AddLinkages",
        "AddAllLinkages",
        "RemoveLinkages",
    ];

    /// Name of the object the command operates on
    pub fn object(&self) -> &str {
        match self {
            ShapeKeyCommand::SplitActive { object, .. }
            | ShapeKeyCommand::SplitAll { object }
            | ShapeKeyCommand::MergeActive { object, .. }
            | ShapeKeyCommand::MergeAll { object }
            | ShapeKeyCommand::RenameForMmd { object }
            | ShapeKeyCommand::AddLinkages { object, .. }
            | ShapeKeyCommand::AddAllLinkages { object }
            | ShapeKeyCommand::RemoveLinkages { object, .. } => object,
        }
    }

    /// Selected shape key name, for commands that act on one key
    pub fn key(&self) -> Option<&str> {
        match self {
            ShapeKeyCommand::SplitActive { key, .. }
            | ShapeKeyCommand::MergeActive { key, .. }
            | ShapeKeyCommand::AddLinkages { key, .. }
            | ShapeKeyCommand::RemoveLinkages { key, .. } => key.as_deref(),
            _ => None,
        }
    }
}

/// Messages from the host to the tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum HostToTools {
    /// Run a shape key operation
    Command(ShapeKeyCommand),
}

impl HostToTools {
    /// Parse a message from its JSON form.
    ///
    /// Unknown message or command tags are reported by name rather than as a
    /// generic decode failure.
    pub fn from_json(json: &str) -> Result<Self, IpcError> {
        if json.trim().is_empty() {
            return Err(IpcError::Empty);
        }
        let value: serde_json::Value = serde_json::from_str(json).map_err(IpcError::Decode)?;
        match value.get("type").and_then(|tag| tag.as_str()) {
            Some("Command") => {}
            Some(other) => return Err(IpcError::UnknownMessage(other.to_string())),
            None => {}
        }
        let unknown = value
            .pointer("/data/type")
            .and_then(|tag| tag.as_str())
            .filter(|tag| !ShapeKeyCommand::NAMES.iter().any(|name| name == tag));
        if let Some(command) = unknown {
            return Err(IpcError::UnknownCommand(command.to_string()));
        }
        serde_json::from_value(value).map_err(IpcError::Decode)
    }

    pub fn to_json(&self) -> Result<String, IpcError> {
        serde_json::to_string(self).map_err(IpcError::Encode)
    }
}

/// Messages from the tools back to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ToolsToHost {
    /// Batch progress (cosmetic)
    Progress(ProgressUpdate),

    /// Final result of a command
    Report(CommandReport),
}

impl ToolsToHost {
    pub fn to_json(&self) -> Result<String, IpcError> {
        serde_json::to_string(self).map_err(IpcError::Encode)
    }

    pub fn from_json(json: &str) -> Result<Self, IpcError> {
        if json.trim().is_empty() {
            return Err(IpcError::Empty);
        }
        serde_json::from_str(json).map_err(IpcError::Decode)
    }
}
