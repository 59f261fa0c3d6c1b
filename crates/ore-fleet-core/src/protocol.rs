// ABOUTME: Line-oriented message protocol embedded in worker stdout.
// ABOUTME: Decodes one JSON line into a ProtocolMessage, or None for free-form text.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// A message a worker reports on its stdout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProtocolMessage {
    /// The worker entered its mining loop.
    Started,
    /// A mine transaction was confirmed on chain.
    LandedMineTransaction,
    /// A submitted transaction failed.
    FailedTransaction { error: String },
}

impl ProtocolMessage {
    /// Encode as a single wire line (no trailing newline).
    pub fn to_line(&self) -> String {
        // Serializing a fieldless or string-only enum cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl fmt::Display for ProtocolMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolMessage::Started => write!(f, "started"),
            ProtocolMessage::LandedMineTransaction => write!(f, "landed mine transaction"),
            ProtocolMessage::FailedTransaction { error } => {
                write!(f, "failed transaction: {}", error)
            }
        }
    }
}

/// Decode a stdout line.
///
/// Workers interleave human-readable log output with protocol lines, so
/// anything that isn't a well-formed message is `None` rather than an error.
pub fn decode(line: &str) -> Option<ProtocolMessage> {
    let line = line.trim();
    // Cheap reject for the common case of plain log text.
    if !line.starts_with('{') {
        return None;
    }

    let json: Value = serde_json::from_str(line).ok()?;
    let object = json.as_object()?;

    // Workers built from the upstream miner emit `msg_type`.
    let kind = object
        .get("type")
        .or_else(|| object.get("msg_type"))?
        .as_str()?;

    match kind {
        "started" => Some(ProtocolMessage::Started),
        "landed_mine_transaction" => Some(ProtocolMessage::LandedMineTransaction),
        "failed_transaction" => {
            let error = object.get("error")?.as_str()?;
            Some(ProtocolMessage::FailedTransaction {
                error: error.to_string(),
            })
        }
        _ => None,
    }
}
