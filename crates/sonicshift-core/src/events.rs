//! Registry change events and the broadcast emitter that carries them.
//!
//! Observers (a UI, the CLI progress printer, tests) subscribe and re-render
//! from the registry whenever an event arrives.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::format::AudioFormat;
use crate::ids::FileId;
use crate::status::{FileStatus, Phase};

/// Default broadcast channel capacity.
const DEFAULT_CAPACITY: usize = 1024;

/// A single observable change to the registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FileEvent {
    /// A file was registered.
    Added {
        /// File id.
        id: FileId,
        /// Display name.
        name: String,
    },
    /// A file moved to a new status.
    StatusChanged {
        /// File id.
        id: FileId,
        /// Previous status.
        from: FileStatus,
        /// New status.
        to: FileStatus,
    },
    /// A phase progress value changed.
    Progress {
        /// File id.
        id: FileId,
        /// Which progress field.
        phase: Phase,
        /// New value (0–100).
        value: u8,
    },
    /// The target format changed.
    FormatChanged {
        /// File id.
        id: FileId,
        /// New format.
        format: AudioFormat,
    },
    /// The AI description arrived.
    DescriptionReady {
        /// File id.
        id: FileId,
        /// Description text.
        text: String,
    },
    /// A file was removed.
    Removed {
        /// File id.
        id: FileId,
    },
}

/// Broadcast-based event emitter.
///
/// Non-blocking: `emit` never awaits. Slow receivers are dropped (lagged)
/// rather than blocking the sender.
pub struct EventEmitter {
    tx: broadcast::Sender<FileEvent>,
}

impl EventEmitter {
    /// Create a new emitter with the default channel capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new emitter with a custom channel capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all subscribers. Returns the number of receivers.
    pub fn emit(&self, event: FileEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Subscribe to events emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<FileEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}
