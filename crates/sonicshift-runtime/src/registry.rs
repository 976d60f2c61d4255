//! File registry: the ordered list of tracked files and the sole mutation point.
//!
//! Every mutation takes a short-held write lock, computes the resulting
//! [`FileEvent`]s, releases the lock, and only then emits. No lock is ever
//! held across an `.await`, so concurrent pipelines see the same
//! linearized sequence of updates.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use sonicshift_core::{
    AudioFormat, BlobStore, EventEmitter, FileEvent, FileId, FileStatus, FileUpdate, Phase,
    RawFile, TrackedFile,
};

/// Outcome of [`FileRegistry::set_format`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatChange {
    /// The target format was updated.
    Applied,
    /// The file is past `Idle`; its format is fixed.
    Locked(FileStatus),
    /// No file with that id.
    Missing,
}

/// Authoritative store of tracked files, in insertion order.
pub struct FileRegistry {
    files: RwLock<Vec<TrackedFile>>,
    blobs: Arc<BlobStore>,
    events: EventEmitter,
}

impl FileRegistry {
    /// Create an empty registry with its own blob store.
    pub fn new() -> Self {
        Self::with_blob_store(Arc::new(BlobStore::new()))
    }

    /// Create an empty registry sharing an existing blob store.
    pub fn with_blob_store(blobs: Arc<BlobStore>) -> Self {
        Self {
            files: RwLock::new(Vec::new()),
            blobs,
            events: EventEmitter::new(),
        }
    }

    /// The blob store holding result payloads.
    pub fn blobs(&self) -> &Arc<BlobStore> {
        &self.blobs
    }

    /// Subscribe to change events emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<FileEvent> {
        self.events.subscribe()
    }

    /// Register new files as `Idle` with zero progress and the default format.
    ///
    /// No validation of type or size is performed.
    #[instrument(skip_all, fields(count = raw_files.len()))]
    pub fn add_files(&self, raw_files: Vec<RawFile>) -> Vec<FileId> {
        let added: Vec<TrackedFile> = raw_files.into_iter().map(TrackedFile::from_raw).collect();
        let events: Vec<FileEvent> = added
            .iter()
            .map(|f| FileEvent::Added {
                id: f.id.clone(),
                name: f.name.clone(),
            })
            .collect();
        let ids: Vec<FileId> = added.iter().map(|f| f.id.clone()).collect();

        self.files.write().extend(added);

        info!(count = ids.len(), "files added");
        self.emit_all(events);
        ids
    }

    /// Merge `update` into the file with `id`.
    ///
    /// Returns `false` (and changes nothing) when the id is unknown. A terminal
    /// status is never left. A result handle is only kept on a `Completed`
    /// file; otherwise it is detached and revoked.
    pub fn update_file(&self, id: &FileId, update: &FileUpdate) -> bool {
        let (events, detached) = {
            let mut files = self.files.write();
            let Some(file) = files.iter_mut().find(|f| &f.id == id) else {
                debug!(file_id = %id, "update for unknown file ignored");
                return false;
            };
            let before = file.clone();
            file.apply(update);
            if before.status.is_terminal() && file.status != before.status {
                warn!(file_id = %id, from = %before.status, to = %file.status, "transition out of terminal status refused");
                file.status = before.status;
            }
            let detached = if file.status == FileStatus::Completed {
                None
            } else {
                file.result.take()
            };
            (diff_events(&before, file), detached)
        };
        if let Some(url) = detached {
            warn!(file_id = %id, %url, "result handle on a file that is not completed, revoked");
            let _ = self.blobs.revoke(&url);
        }
        self.emit_all(events);
        true
    }

    /// Remove the file with `id`, revoking its result handle first.
    ///
    /// Returns `false` when the id is unknown.
    #[instrument(skip(self), fields(file_id = %id))]
    pub fn remove_file(&self, id: &FileId) -> bool {
        let removed = {
            let mut files = self.files.write();
            let Some(index) = files.iter().position(|f| &f.id == id) else {
                return false;
            };
            files.remove(index)
        };
        if let Some(url) = &removed.result {
            let _ = self.blobs.revoke(url);
        }
        info!(name = %removed.name, "file removed");
        let _ = self.events.emit(FileEvent::Removed { id: id.clone() });
        true
    }

    /// Change the target format. Accepted only while the file is `Idle`.
    pub fn set_format(&self, id: &FileId, format: AudioFormat) -> FormatChange {
        {
            let mut files = self.files.write();
            let Some(file) = files.iter_mut().find(|f| &f.id == id) else {
                return FormatChange::Missing;
            };
            if file.status != FileStatus::Idle {
                debug!(file_id = %id, status = %file.status, "format change refused");
                return FormatChange::Locked(file.status);
            }
            if file.target_format == format {
                return FormatChange::Applied;
            }
            file.target_format = format;
        }
        debug!(file_id = %id, %format, "format changed");
        let _ = self.events.emit(FileEvent::FormatChanged {
            id: id.clone(),
            format,
        });
        FormatChange::Applied
    }

    /// Atomically move an `Idle` file to `Uploading` with zero upload progress.
    ///
    /// Returns `false` for unknown or non-`Idle` files, leaving them untouched.
    pub fn begin_upload(&self, id: &FileId) -> bool {
        let events = {
            let mut files = self.files.write();
            let Some(file) = files.iter_mut().find(|f| &f.id == id) else {
                return false;
            };
            if file.status != FileStatus::Idle {
                return false;
            }
            let before = file.clone();
            file.apply(&FileUpdate {
                status: Some(FileStatus::Uploading),
                upload_progress: Some(0),
                ..FileUpdate::default()
            });
            diff_events(&before, file)
        };
        self.emit_all(events);
        true
    }

    /// A copy of the file with `id`.
    pub fn get(&self, id: &FileId) -> Option<TrackedFile> {
        self.files.read().iter().find(|f| &f.id == id).cloned()
    }

    /// Copies of all files in insertion order.
    pub fn snapshot(&self) -> Vec<TrackedFile> {
        self.files.read().clone()
    }

    /// Ids of all files in insertion order.
    pub fn ids(&self) -> Vec<FileId> {
        self.files.read().iter().map(|f| f.id.clone()).collect()
    }

    /// Completed files carrying a result handle, in insertion order.
    pub fn completed(&self) -> Vec<TrackedFile> {
        self.files
            .read()
            .iter()
            .filter(|f| f.status == FileStatus::Completed && f.result.is_some())
            .cloned()
            .collect()
    }

    /// Whether any file is ready for export.
    pub fn has_completed(&self) -> bool {
        self.files
            .read()
            .iter()
            .any(|f| f.status == FileStatus::Completed && f.result.is_some())
    }

    /// Number of files ready for export.
    pub fn completed_count(&self) -> usize {
        self.files
            .read()
            .iter()
            .filter(|f| f.status == FileStatus::Completed && f.result.is_some())
            .count()
    }

    /// Number of tracked files.
    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    /// Whether no files are tracked.
    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }

    fn emit_all(&self, events: Vec<FileEvent>) {
        for event in events {
            let _ = self.events.emit(event);
        }
    }
}

impl Default for FileRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Events describing the difference between two states of one file.
fn diff_events(before: &TrackedFile, after: &TrackedFile) -> Vec<FileEvent> {
    let id = &after.id;
    let mut events = Vec::new();
    if before.upload_progress != after.upload_progress {
        events.push(FileEvent::Progress {
            id: id.clone(),
            phase: Phase::Upload,
            value: after.upload_progress,
        });
    }
    if before.convert_progress != after.convert_progress {
        events.push(FileEvent::Progress {
            id: id.clone(),
            phase: Phase::Convert,
            value: after.convert_progress,
        });
    }
    if before.status != after.status {
        events.push(FileEvent::StatusChanged {
            id: id.clone(),
            from: before.status,
            to: after.status,
        });
    }
    if before.ai_description != after.ai_description
        && let Some(text) = &after.ai_description
    {
        events.push(FileEvent::DescriptionReady {
            id: id.clone(),
            text: text.clone(),
        });
    }
    events
}
