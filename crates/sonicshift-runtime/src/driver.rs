//! Conversion lifecycle driver.
//!
//! Advances one file through `Idle → Uploading → Uploaded → Converting →
//! Completed` (or `Error`). Each pipeline is its own tokio task; progress is
//! manufactured on a fixed tick from a [`StepSource`] and forced to exactly
//! 100 at the end of each phase. The description request is a side task
//! launched at the `Converting` transition that never gates the phases.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, instrument, warn};

use sonicshift_core::{FileId, FileStatus, FileUpdate, Phase, TrackedFile};
use sonicshift_describe::Describer;
use sonicshift_settings::{PhaseSettings, PipelineSettings};

use crate::progress::{RandomSteps, StepSource, next_progress};
use crate::registry::FileRegistry;
use crate::transcode::{PassthroughTranscoder, Transcoder};

/// Runs per-file conversion pipelines against a shared registry.
pub struct ConversionDriver {
    registry: Arc<FileRegistry>,
    pipeline: PipelineSettings,
    transcoder: Arc<dyn Transcoder>,
    describer: Option<Arc<dyn Describer>>,
    steps: Arc<dyn StepSource>,
    /// Cancellation tokens of running pipelines, keyed by file.
    active: Mutex<HashMap<FileId, CancellationToken>>,
    /// Outstanding description requests.
    side_tasks: TaskTracker,
}

impl ConversionDriver {
    /// Create a driver with pass-through conversion, random steps, and no
    /// description service.
    pub fn new(registry: Arc<FileRegistry>, pipeline: PipelineSettings) -> Self {
        Self {
            registry,
            pipeline,
            transcoder: Arc::new(PassthroughTranscoder),
            describer: None,
            steps: Arc::new(RandomSteps),
            active: Mutex::new(HashMap::new()),
            side_tasks: TaskTracker::new(),
        }
    }

    /// Use `transcoder` to synthesize results.
    #[must_use]
    pub fn with_transcoder(mut self, transcoder: Arc<dyn Transcoder>) -> Self {
        self.transcoder = transcoder;
        self
    }

    /// Request a description from `describer` for every converting file.
    #[must_use]
    pub fn with_describer(mut self, describer: Arc<dyn Describer>) -> Self {
        self.describer = Some(describer);
        self
    }

    /// Draw progress increments from `steps`.
    #[must_use]
    pub fn with_steps(mut self, steps: Arc<dyn StepSource>) -> Self {
        self.steps = steps;
        self
    }

    /// The registry this driver mutates.
    pub fn registry(&self) -> &Arc<FileRegistry> {
        &self.registry
    }

    /// Start the pipeline for `id`.
    ///
    /// Returns `None` without touching the registry when the file is unknown
    /// or not `Idle` (including when a pipeline is already running for it).
    #[instrument(skip(self), fields(file_id = %id))]
    pub fn start_conversion(self: &Arc<Self>, id: &FileId) -> Option<JoinHandle<()>> {
        if !self.registry.begin_upload(id) {
            debug!("start ignored, file missing or not idle");
            return None;
        }
        let cancel = CancellationToken::new();
        let _ = self.active.lock().insert(id.clone(), cancel.clone());

        let driver = Arc::clone(self);
        let id = id.clone();
        Some(tokio::spawn(async move { driver.run(id, cancel).await }))
    }

    /// Cancel the running pipeline for `id`. Returns `true` if one was running.
    ///
    /// A cancelled file that is still registered ends in `Error`.
    pub fn cancel(&self, id: &FileId) -> bool {
        match self.active.lock().remove(id) {
            Some(token) => {
                warn!(file_id = %id, "pipeline cancel requested");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every running pipeline. Returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let tokens: Vec<CancellationToken> = self.active.lock().drain().map(|(_, t)| t).collect();
        for token in &tokens {
            token.cancel();
        }
        tokens.len()
    }

    /// Whether a pipeline is running for `id`.
    pub fn is_running(&self, id: &FileId) -> bool {
        self.active.lock().contains_key(id)
    }

    /// Wait until every description request launched so far has resolved.
    pub async fn settle_descriptions(&self) {
        let _ = self.side_tasks.close();
        self.side_tasks.wait().await;
        let _ = self.side_tasks.reopen();
    }

    async fn run(self: Arc<Self>, id: FileId, cancel: CancellationToken) {
        tokio::select! {
            () = cancel.cancelled() => self.abandon(&id),
            () = self.drive(&id) => {}
        }
        let _ = self.active.lock().remove(&id);
    }

    /// Settle a cancelled pipeline: a file left mid-pipeline becomes `Error`.
    fn abandon(&self, id: &FileId) {
        let Some(file) = self.registry.get(id) else {
            debug!(file_id = %id, "pipeline cancelled, file already removed");
            return;
        };
        if !file.status.is_in_flight() {
            return;
        }
        if self
            .registry
            .update_file(id, &FileUpdate::status(FileStatus::Error))
        {
            warn!(file_id = %id, from = %file.status, "pipeline cancelled, file marked failed");
        }
    }

    async fn drive(&self, id: &FileId) {
        info!(file_id = %id, "conversion started");

        // Upload
        if !self.run_phase(id, Phase::Upload, self.pipeline.upload).await {
            return;
        }
        let uploaded = FileUpdate {
            status: Some(FileStatus::Uploaded),
            upload_progress: Some(100),
            ..FileUpdate::default()
        };
        if !self.registry.update_file(id, &uploaded) {
            return;
        }

        // Convert
        let converting = FileUpdate {
            status: Some(FileStatus::Converting),
            convert_progress: Some(0),
            ..FileUpdate::default()
        };
        if !self.registry.update_file(id, &converting) {
            return;
        }
        let Some(file) = self.registry.get(id) else {
            return;
        };
        self.spawn_description(&file);

        if !self.run_phase(id, Phase::Convert, self.pipeline.convert).await {
            return;
        }
        let converted = FileUpdate {
            convert_progress: Some(100),
            ..FileUpdate::default()
        };
        if !self.registry.update_file(id, &converted) {
            return;
        }

        self.complete(&file).await;
    }

    /// Tick through one phase. Returns `false` if the file disappeared.
    async fn run_phase(&self, id: &FileId, phase: Phase, timing: PhaseSettings) -> bool {
        let mut progress = 0u8;
        for _ in 0..timing.ticks {
            tokio::time::sleep(timing.tick()).await;
            progress = next_progress(progress, self.steps.next_step(timing.max_step));
            let update = match phase {
                Phase::Upload => FileUpdate {
                    upload_progress: Some(progress),
                    ..FileUpdate::default()
                },
                Phase::Convert => FileUpdate {
                    convert_progress: Some(progress),
                    ..FileUpdate::default()
                },
            };
            if !self.registry.update_file(id, &update) {
                debug!(file_id = %id, %phase, "file removed mid-phase, stopping");
                return false;
            }
        }
        true
    }

    fn spawn_description(&self, file: &TrackedFile) {
        let Some(describer) = &self.describer else {
            return;
        };
        let describer = Arc::clone(describer);
        let registry = Arc::clone(&self.registry);
        let id = file.id.clone();
        let data = file.data.clone();
        let mime_type = file.effective_mime_type().to_string();

        let _ = self.side_tasks.spawn(async move {
            let text = describer.describe(data, &mime_type).await;
            if registry.update_file(&id, &FileUpdate::description(text)) {
                debug!(file_id = %id, "description attached");
            } else {
                debug!(file_id = %id, "description arrived after removal, dropped");
            }
        });
    }

    async fn complete(&self, file: &TrackedFile) {
        let id = &file.id;
        let result = self
            .transcoder
            .transcode(
                file.data.clone(),
                file.effective_mime_type(),
                file.target_format,
            )
            .await;

        match result {
            Ok(blob) => {
                let url = self.registry.blobs().create(blob);
                let done = FileUpdate {
                    status: Some(FileStatus::Completed),
                    result: Some(url.clone()),
                    ..FileUpdate::default()
                };
                if self.registry.update_file(id, &done) {
                    info!(file_id = %id, format = %file.target_format, "conversion completed");
                } else {
                    // removed while the result was being produced
                    let _ = self.registry.blobs().revoke(&url);
                }
            }
            Err(e) => {
                error!(file_id = %id, format = %file.target_format, error = %e, "conversion failed");
                let _ = self
                    .registry
                    .update_file(id, &FileUpdate::status(FileStatus::Error));
            }
        }
    }
}
