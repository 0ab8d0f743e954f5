//! JSON envelopes exchanged over the signaling channel.
//!
//! Every outbound message has the same shape:
//!
//! ```text
//! {"id": "<decimal id>", "op": "<operation>", "data": { ... }}
//! ```
//!
//! | `op`     | `data`                      | Sent when                         |
//! |----------|-----------------------------|-----------------------------------|
//! | `answer` | `{"sdp": "<local sdp>"}`    | after media negotiation           |
//! | `input`  | `{"cmd": "<code> <args>"}`  | per input command                 |
//! | `exit`   | `{"token": "<credential>"}` | during teardown, best-effort      |

use serde::Serialize;
use serde_json::{Value, json};

use crate::error::BridgeError;

/// Operation tag of an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    Answer,
    Input,
    Exit,
}

/// One outbound signaling message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    /// Identifiers travel as decimal strings.
    pub id: String,
    pub op: Op,
    pub data: Value,
}

impl Envelope {
    pub fn answer(id: u64, sdp: &str) -> Self {
        Self {
            id: id.to_string(),
            op: Op::Answer,
            data: json!({ "sdp": sdp }),
        }
    }

    pub fn input(id: u64, cmd: String) -> Self {
        Self {
            id: id.to_string(),
            op: Op::Input,
            data: json!({ "cmd": cmd }),
        }
    }

    pub fn exit(id: u64, token: &str) -> Self {
        Self {
            id: id.to_string(),
            op: Op::Exit,
            data: json!({ "token": token }),
        }
    }

    /// Serialize to the JSON text sent on the wire.
    pub fn to_json(&self) -> Result<String, BridgeError> {
        serde_json::to_string(self).map_err(BridgeError::from)
    }
}
