//! Intake records, tracked files, and partial updates.

use bytes::Bytes;
use serde::Serialize;

use crate::blob::BlobUrl;
use crate::format::AudioFormat;
use crate::ids::FileId;
use crate::status::FileStatus;

/// Media type assumed when a file arrives without one.
pub const DEFAULT_MIME_TYPE: &str = "audio/mpeg";

/// A user-supplied file as it arrives at intake.
#[derive(Clone, Debug)]
pub struct RawFile {
    /// Display name, including extension.
    pub name: String,
    /// Declared media type (may be empty).
    pub mime_type: String,
    /// Original payload.
    pub data: Bytes,
}

impl RawFile {
    /// Build an intake record with an explicit media type.
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Build an intake record, inferring the media type from the extension.
    pub fn from_name(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let name = name.into();
        let mime_type = mime_for_name(&name).unwrap_or_default().to_string();
        Self {
            name,
            mime_type,
            data: data.into(),
        }
    }

    /// Whether the file matches the intake picker filter (`audio/*`, `video/mp4`).
    ///
    /// Informational only: intake never rejects a file.
    #[must_use]
    pub fn matches_picker_filter(&self) -> bool {
        self.mime_type.starts_with("audio/") || self.mime_type == "video/mp4"
    }
}

/// Infer a media type from a file name's extension.
pub fn mime_for_name(name: &str) -> Option<&'static str> {
    let (_, ext) = name.rsplit_once('.')?;
    let mime = match ext.to_ascii_lowercase().as_str() {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "m4a" | "m4r" => "audio/mp4",
        "mp4" => "video/mp4",
        "ogg" | "oga" => "audio/ogg",
        "aac" => "audio/aac",
        "flac" => "audio/flac",
        "opus" => "audio/opus",
        "webm" => "audio/webm",
        _ => return None,
    };
    Some(mime)
}

/// The system's record for one registered file.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedFile {
    /// Stable identifier.
    pub id: FileId,
    /// Display name.
    pub name: String,
    /// Payload size in bytes.
    pub size: u64,
    /// Declared media type of the original payload.
    pub mime_type: String,
    /// Original payload.
    #[serde(skip)]
    pub data: Bytes,
    /// Lifecycle status.
    pub status: FileStatus,
    /// Upload phase progress (0–100).
    pub upload_progress: u8,
    /// Convert phase progress (0–100).
    pub convert_progress: u8,
    /// Requested output format.
    pub target_format: AudioFormat,
    /// Result handle, present only once `status == Completed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<BlobUrl>,
    /// Short AI description, independent of `status`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_description: Option<String>,
}

impl TrackedFile {
    /// Create an `Idle` record from an intake file.
    pub fn from_raw(raw: RawFile) -> Self {
        Self {
            id: FileId::new(),
            size: raw.data.len() as u64,
            name: raw.name,
            mime_type: raw.mime_type,
            data: raw.data,
            status: FileStatus::Idle,
            upload_progress: 0,
            convert_progress: 0,
            target_format: AudioFormat::default(),
            result: None,
            ai_description: None,
        }
    }

    /// Media type to declare when sending the payload elsewhere.
    #[must_use]
    pub fn effective_mime_type(&self) -> &str {
        if self.mime_type.is_empty() {
            DEFAULT_MIME_TYPE
        } else {
            &self.mime_type
        }
    }

    /// Name the converted output is offered under.
    #[must_use]
    pub fn output_name(&self) -> String {
        output_file_name(&self.name, self.target_format)
    }

    /// Merge a partial update. Fields left `None` are untouched.
    pub fn apply(&mut self, update: &FileUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(p) = update.upload_progress {
            self.upload_progress = p.min(100);
        }
        if let Some(p) = update.convert_progress {
            self.convert_progress = p.min(100);
        }
        if let Some(ref url) = update.result {
            self.result = Some(url.clone());
        }
        if let Some(ref desc) = update.ai_description {
            self.ai_description = Some(desc.clone());
        }
    }
}

/// Partial update merged into a [`TrackedFile`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileUpdate {
    /// New status.
    pub status: Option<FileStatus>,
    /// New upload progress.
    pub upload_progress: Option<u8>,
    /// New convert progress.
    pub convert_progress: Option<u8>,
    /// Result handle to attach.
    pub result: Option<BlobUrl>,
    /// AI description to attach.
    pub ai_description: Option<String>,
}

impl FileUpdate {
    /// Update that only changes the status.
    #[must_use]
    pub fn status(status: FileStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Update that only attaches a description.
    #[must_use]
    pub fn description(text: impl Into<String>) -> Self {
        Self {
            ai_description: Some(text.into()),
            ..Self::default()
        }
    }
}

/// Derive `<name without its last extension>.<format>`.
///
/// A name with no extension (or only a leading dot) keeps its full text as
/// the base.
pub fn output_file_name(name: &str, format: AudioFormat) -> String {
    let base = match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    };
    format!("{base}.{}", format.extension())
}

/// Human-readable size (`"0 Bytes"`, `"1.5 KB"`, `"3.25 MB"`).
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", UNITS[unit])
}
