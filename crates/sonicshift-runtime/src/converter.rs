//! Top-level facade wiring registry, driver, and export together.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::info;

use sonicshift_core::{AudioFormat, FileEvent, FileId, RawFile};
use sonicshift_describe::{Describer, GeminiDescriber};
use sonicshift_settings::SonicShiftSettings;

use crate::driver::ConversionDriver;
use crate::errors::ExportError;
use crate::export::{ExportAssembler, ExportOutcome};
use crate::progress::StepSource;
use crate::registry::{FileRegistry, FormatChange};
use crate::sink::DownloadSink;
use crate::transcode::Transcoder;

/// One conversion session: the user intents of the front end, as methods.
pub struct Converter {
    registry: Arc<FileRegistry>,
    driver: Arc<ConversionDriver>,
    exporter: ExportAssembler,
}

impl Converter {
    /// Build a session from settings: random progress, pass-through
    /// conversion, and Gemini descriptions when enabled.
    pub fn new(settings: &SonicShiftSettings) -> Self {
        let describer: Option<Arc<dyn Describer>> = if settings.describe.enabled {
            Some(Arc::new(GeminiDescriber::new(settings.describe.clone())))
        } else {
            None
        };
        Self::with_parts(settings, describer, None, None)
    }

    /// Build a session with explicit collaborators. `None` keeps the default
    /// for that slot (no description, pass-through, random steps).
    pub fn with_parts(
        settings: &SonicShiftSettings,
        describer: Option<Arc<dyn Describer>>,
        transcoder: Option<Arc<dyn Transcoder>>,
        steps: Option<Arc<dyn StepSource>>,
    ) -> Self {
        let registry = Arc::new(FileRegistry::new());
        let mut driver = ConversionDriver::new(Arc::clone(&registry), settings.pipeline.clone());
        if let Some(describer) = describer {
            driver = driver.with_describer(describer);
        }
        if let Some(transcoder) = transcoder {
            driver = driver.with_transcoder(transcoder);
        }
        if let Some(steps) = steps {
            driver = driver.with_steps(steps);
        }
        let exporter = ExportAssembler::new(Arc::clone(&registry), &settings.export);
        Self {
            registry,
            driver: Arc::new(driver),
            exporter,
        }
    }

    /// The underlying registry.
    pub fn registry(&self) -> &Arc<FileRegistry> {
        &self.registry
    }

    /// The underlying driver.
    pub fn driver(&self) -> &Arc<ConversionDriver> {
        &self.driver
    }

    /// Subscribe to registry change events.
    pub fn subscribe(&self) -> broadcast::Receiver<FileEvent> {
        self.registry.subscribe()
    }

    /// Register new files.
    pub fn add_files(&self, files: Vec<RawFile>) -> Vec<FileId> {
        self.registry.add_files(files)
    }

    /// Change a file's target format (only while `Idle`).
    pub fn set_format(&self, id: &FileId, format: AudioFormat) -> FormatChange {
        self.registry.set_format(id, format)
    }

    /// Start converting one file.
    pub fn start_conversion(&self, id: &FileId) -> Option<JoinHandle<()>> {
        self.driver.start_conversion(id)
    }

    /// Start every `Idle` file. Returns the handles of the started pipelines.
    pub fn start_all(&self) -> Vec<JoinHandle<()>> {
        let handles: Vec<JoinHandle<()>> = self
            .registry
            .ids()
            .iter()
            .filter_map(|id| self.driver.start_conversion(id))
            .collect();
        info!(started = handles.len(), "conversions started");
        handles
    }

    /// Remove a file, cancelling its pipeline and releasing its result.
    pub fn remove_file(&self, id: &FileId) -> bool {
        let _ = self.driver.cancel(id);
        self.registry.remove_file(id)
    }

    /// Wait for outstanding description requests.
    pub async fn settle_descriptions(&self) {
        self.driver.settle_descriptions().await;
    }

    /// Export every completed file.
    pub async fn export_all(&self, sink: &dyn DownloadSink) -> Result<ExportOutcome, ExportError> {
        self.exporter.export_all(sink).await
    }
}
