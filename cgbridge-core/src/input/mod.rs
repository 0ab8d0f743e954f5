//! Input intents → wire commands.
//!
//! | Module     | Purpose                                              |
//! |------------|------------------------------------------------------|
//! | `coords`   | Pixel / normalized coordinate mapping                |
//! | `command`  | Immutable command values and their `cmd` wire lines  |
//! | `ids`      | Strictly increasing, time-based command identifiers  |
//! | `encoder`  | Click / swipe / text / key → paced command sequences |
//! | `writer`   | Serialized, cancellable transmission to the channel  |

pub mod command;
pub mod coords;
pub mod encoder;
pub mod ids;
pub mod writer;

pub use command::{InputCommand, InputKind, InputPayload};
pub use coords::{CoordinateSpace, NORMALIZED_MAX, ScreenSize, normalize};
pub use encoder::{InputEncoder, InputTiming, PacedCommand, SwipePath, SwipeSample};
pub use ids::CommandIds;
pub use writer::CommandWriter;
