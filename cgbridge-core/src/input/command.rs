//! Input command values and their wire encoding.
//!
//! # Wire format
//!
//! Each command becomes one `input` envelope (see [`crate::message`]) whose
//! `cmd` field is a space-separated line:
//!
//! ```text
//! press       "1 <x> <y> <ptr>"     normalized
//! move        "2 <x> <y> <ptr>"     normalized
//! release     "3 <x> <y> <ptr>"     normalized
//! text        "5 <char>"
//! key         "6 <code>"
//! click       "8 <x> <y> <ptr>"     pixel
//! mouse-move  "102 <x> <y>"         pixel
//! ```

use crate::error::BridgeError;
use crate::input::coords::CoordinateSpace;
use crate::message::Envelope;

// ── Kind ──────────────────────────────────────────────────────────

/// Kind of input event understood by the remote host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKind {
    /// Touch contact down.
    Press,
    /// Touch contact moved.
    Move,
    /// Touch contact lifted.
    Release,
    /// One character of text.
    Text,
    /// One key code.
    Key,
    /// Single click at a pixel position.
    Click,
    /// Pointer moved to a pixel position.
    MouseMove,
}

impl InputKind {
    /// Numeric event code on the wire.
    pub const fn code(self) -> u16 {
        match self {
            InputKind::Press => 1,
            InputKind::Move => 2,
            InputKind::Release => 3,
            InputKind::Text => 5,
            InputKind::Key => 6,
            InputKind::Click => 8,
            InputKind::MouseMove => 102,
        }
    }

    /// Coordinate space for positional kinds, `None` otherwise.
    pub const fn space(self) -> Option<CoordinateSpace> {
        match self {
            InputKind::Press | InputKind::Move | InputKind::Release => {
                Some(CoordinateSpace::Normalized)
            }
            InputKind::Click | InputKind::MouseMove => Some(CoordinateSpace::Pixel),
            InputKind::Text | InputKind::Key => None,
        }
    }

    /// Whether the kind addresses a touch slot.
    pub const fn is_touch(self) -> bool {
        matches!(self, InputKind::Press | InputKind::Move | InputKind::Release)
    }
}

// ── Payload ───────────────────────────────────────────────────────

/// What the command carries, already in protocol space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputPayload {
    Point { x: u32, y: u32 },
    Char(char),
    KeyCode(u32),
}

// ── InputCommand ──────────────────────────────────────────────────

/// One immutable input command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputCommand {
    /// Strictly increasing identifier.
    pub id: u64,
    pub kind: InputKind,
    pub payload: InputPayload,
    /// Touch slot; 0 for single-touch gestures.
    pub pointer: u8,
}

impl InputCommand {
    /// Positional command. `x`/`y` must already be in `kind`'s space.
    pub fn at(id: u64, kind: InputKind, x: u32, y: u32, pointer: u8) -> Self {
        Self {
            id,
            kind,
            payload: InputPayload::Point { x, y },
            pointer,
        }
    }

    pub fn text(id: u64, ch: char) -> Self {
        Self {
            id,
            kind: InputKind::Text,
            payload: InputPayload::Char(ch),
            pointer: 0,
        }
    }

    pub fn key(id: u64, code: u32) -> Self {
        Self {
            id,
            kind: InputKind::Key,
            payload: InputPayload::KeyCode(code),
            pointer: 0,
        }
    }

    /// Position carried by the command, if any.
    pub fn point(&self) -> Option<(u32, u32)> {
        match self.payload {
            InputPayload::Point { x, y } => Some((x, y)),
            _ => None,
        }
    }

    /// The `cmd` line sent to the remote host.
    pub fn wire_cmd(&self) -> String {
        let code = self.kind.code();
        match (self.kind, self.payload) {
            (InputKind::MouseMove, InputPayload::Point { x, y }) => format!("{code} {x} {y}"),
            (_, InputPayload::Point { x, y }) => format!("{code} {x} {y} {}", self.pointer),
            (_, InputPayload::Char(ch)) => format!("{code} {ch}"),
            (_, InputPayload::KeyCode(k)) => format!("{code} {k}"),
        }
    }

    /// Full JSON message for the signaling channel.
    pub fn to_message(&self) -> Result<String, BridgeError> {
        Envelope::input(self.id, self.wire_cmd()).to_json()
    }
}
