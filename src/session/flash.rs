//! One-shot flash messages.
//!
//! Messages queue up in the session, keyed by severity, and are shown on
//! exactly one rendered page before being cleared.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Severity level of a flash message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Error,
    Warning,
    Info,
}

impl FlashLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

/// Per-session flash queue: severity level to ordered message sequence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlashQueue {
    messages: BTreeMap<FlashLevel, Vec<String>>,
}

impl FlashQueue {
    /// Appends a message under `level` and returns the updated sequence for
    /// that level.
    ///
    /// An empty message is logged and dropped; the queue is unchanged.
    pub fn enqueue(&mut self, level: FlashLevel, message: impl Into<String>) -> &[String] {
        let message = message.into();
        if message.trim().is_empty() {
            warn!(level = level.as_str(), "Flash message requires a non-empty message");
            return self.messages.get(&level).map_or(&[], Vec::as_slice);
        }

        let entry = self.messages.entry(level).or_default();
        entry.push(message);
        entry.as_slice()
    }

    /// Moves the entire queue into a render snapshot, leaving it empty.
    pub fn drain(&mut self) -> RenderFlash {
        RenderFlash {
            messages: std::mem::take(&mut self.messages),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Snapshot of drained flash messages handed to the rendering layer.
///
/// Exposes both the first message per level (for simple template slots) and
/// the full ordered sequences (for aggregated listings such as validation
/// errors).
#[derive(Debug, Clone, Default)]
pub struct RenderFlash {
    messages: BTreeMap<FlashLevel, Vec<String>>,
}

impl RenderFlash {
    /// First message enqueued under `level`, if any.
    #[must_use]
    pub fn first(&self, level: FlashLevel) -> Option<&str> {
        self.messages
            .get(&level)
            .and_then(|msgs| msgs.first())
            .map(String::as_str)
    }

    /// All messages enqueued under `level`, in insertion order.
    #[must_use]
    pub fn all(&self, level: FlashLevel) -> &[String] {
        self.messages.get(&level).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Iterates over non-empty levels and their message sequences.
    pub fn iter(&self) -> impl Iterator<Item = (FlashLevel, &[String])> {
        self.messages
            .iter()
            .map(|(level, msgs)| (*level, msgs.as_slice()))
    }
}
