//! Serialized, paced transmission over the session's message channel.
//!
//! The channel sits behind an async mutex; a whole command burst holds the
//! lock, so two concurrent swipes can never interleave their
//! press / move / release sequences.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::collab::MessageChannel;
use crate::error::BridgeError;
use crate::input::command::{InputCommand, InputKind};
use crate::input::encoder::PacedCommand;
use crate::input::ids::CommandIds;

/// Single writer for one session's outbound channel.
pub struct CommandWriter {
    channel: Mutex<Box<dyn MessageChannel>>,
    ids: Arc<CommandIds>,
    open: AtomicBool,
    release_on_cancel: bool,
}

impl CommandWriter {
    pub fn new(
        channel: Box<dyn MessageChannel>,
        ids: Arc<CommandIds>,
        release_on_cancel: bool,
    ) -> Self {
        Self {
            channel: Mutex::new(channel),
            ids,
            open: AtomicBool::new(true),
            release_on_cancel,
        }
    }

    /// Whether the channel is still usable.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Send one pre-encoded message (answer, exit notice).
    pub async fn send_message(&self, message: String) -> Result<(), BridgeError> {
        let mut channel = self.channel.lock().await;
        self.send_locked(&mut **channel, message).await
    }

    /// Send a command burst in order, sleeping `delay_after` between
    /// commands.
    ///
    /// Returns [`BridgeError::Cancelled`] if `cancel` fires mid-burst. The
    /// remaining commands are dropped; a pointer left down stays down
    /// unless `release_on_cancel` is set.
    pub async fn transmit(
        &self,
        plan: &[PacedCommand],
        cancel: &CancellationToken,
    ) -> Result<(), BridgeError> {
        if !self.is_open() {
            return Err(BridgeError::NoChannel);
        }
        let mut channel = self.channel.lock().await;
        let mut down: Option<InputCommand> = None;

        for step in plan {
            if cancel.is_cancelled() {
                return self.abandon(&mut **channel, down).await;
            }
            let cmd = step.command;
            self.send_locked(&mut **channel, cmd.to_message()?).await?;
            debug!(id = cmd.id, cmd = %cmd.wire_cmd(), "input sent");

            match cmd.kind {
                InputKind::Press => down = Some(cmd),
                InputKind::Move if down.is_some() => down = Some(cmd),
                InputKind::Release => down = None,
                _ => {}
            }

            if !step.delay_after.is_zero() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return self.abandon(&mut **channel, down).await,
                    _ = tokio::time::sleep(step.delay_after) => {}
                }
            }
        }
        Ok(())
    }

    /// Close the underlying channel. Idempotent.
    pub async fn close(&self) -> Result<(), BridgeError> {
        let mut channel = self.channel.lock().await;
        if self.open.swap(false, Ordering::AcqRel) {
            channel.close().await
        } else {
            Ok(())
        }
    }

    async fn send_locked(
        &self,
        channel: &mut dyn MessageChannel,
        message: String,
    ) -> Result<(), BridgeError> {
        if !self.is_open() {
            return Err(BridgeError::ChannelClosed);
        }
        match channel.send(message).await {
            Err(BridgeError::ChannelClosed) => {
                self.open.store(false, Ordering::Release);
                Err(BridgeError::ChannelClosed)
            }
            other => other,
        }
    }

    async fn abandon(
        &self,
        channel: &mut dyn MessageChannel,
        down: Option<InputCommand>,
    ) -> Result<(), BridgeError> {
        let Some(held) = down else {
            return Err(BridgeError::Cancelled);
        };
        if !self.release_on_cancel {
            warn!(pointer = held.pointer, "gesture cancelled with pointer still down");
            return Err(BridgeError::Cancelled);
        }
        let (x, y) = held.point().unwrap_or_default();
        let release = InputCommand::at(self.ids.next(), InputKind::Release, x, y, held.pointer);
        match release.to_message() {
            Ok(msg) => {
                if let Err(e) = self.send_locked(channel, msg).await {
                    warn!("synthetic release failed: {e}");
                } else {
                    debug!(id = release.id, "synthetic release sent after cancel");
                }
            }
            Err(e) => warn!("synthetic release not encoded: {e}"),
        }
        Err(BridgeError::Cancelled)
    }
}
