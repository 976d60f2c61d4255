//! Export of completed files.
//!
//! - No completed files: nothing happens.
//! - Exactly one: its result is delivered directly under its output name.
//! - Several: one zip archive, entries in registry order, offered as
//!   `<prefix><unix-millis>.zip`. Entries sharing an output name keep the
//!   payload of the last one.
//!
//! The archive gets a temporary blob handle for the duration of delivery;
//! that handle is revoked right after, whether delivery succeeded or not.

use std::io::{Cursor, Write};
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, instrument, warn};
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use sonicshift_core::{Blob, TrackedFile};
use sonicshift_settings::ExportSettings;

use crate::errors::ExportError;
use crate::registry::FileRegistry;
use crate::sink::DownloadSink;

/// Media type of the combined archive.
const ARCHIVE_MIME_TYPE: &str = "application/zip";

/// What an export produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportOutcome {
    /// No completed files; no download was triggered.
    Nothing,
    /// One file delivered directly.
    Single {
        /// Name the file was offered under.
        file_name: String,
    },
    /// Several files delivered as one archive.
    Archive {
        /// Archive file name.
        file_name: String,
        /// Entry names in archive order.
        entries: Vec<String>,
    },
}

/// Collects completed files and hands them to a [`DownloadSink`].
pub struct ExportAssembler {
    registry: Arc<FileRegistry>,
    archive_prefix: String,
}

impl ExportAssembler {
    /// Create an assembler over `registry`.
    pub fn new(registry: Arc<FileRegistry>, settings: &ExportSettings) -> Self {
        Self {
            registry,
            archive_prefix: settings.archive_prefix.clone(),
        }
    }

    /// Archive file name for a given timestamp.
    pub fn archive_name(&self, unix_millis: i64) -> String {
        format!("{}{unix_millis}.zip", self.archive_prefix)
    }

    /// Export every completed file through `sink`.
    #[instrument(skip_all)]
    pub async fn export_all(&self, sink: &dyn DownloadSink) -> Result<ExportOutcome, ExportError> {
        let completed = self.registry.completed();
        match completed.as_slice() {
            [] => {
                debug!("nothing to export");
                Ok(ExportOutcome::Nothing)
            }
            [file] => self.export_single(file, sink).await,
            files => self.export_archive(files, sink).await,
        }
    }

    async fn export_single(
        &self,
        file: &TrackedFile,
        sink: &dyn DownloadSink,
    ) -> Result<ExportOutcome, ExportError> {
        let file_name = file.output_name();
        let Some(blob) = self.result_blob(file) else {
            warn!(file_id = %file.id, "result no longer available, skipping");
            return Ok(ExportOutcome::Nothing);
        };
        sink.deliver(&file_name, &blob).await?;
        info!(file_name = %file_name, "exported single file");
        Ok(ExportOutcome::Single { file_name })
    }

    async fn export_archive(
        &self,
        files: &[TrackedFile],
        sink: &dyn DownloadSink,
    ) -> Result<ExportOutcome, ExportError> {
        let mut entries: Vec<(String, Bytes)> = Vec::with_capacity(files.len());
        for file in files {
            let Some(blob) = self.result_blob(file) else {
                warn!(file_id = %file.id, name = %file.name, "result no longer available, skipping entry");
                continue;
            };
            let name = file.output_name();
            let data = blob.data().clone();
            match entries.iter_mut().find(|(existing, _)| *existing == name) {
                Some(slot) => {
                    debug!(name = %name, "duplicate entry name, keeping last");
                    slot.1 = data;
                }
                None => entries.push((name, data)),
            }
        }
        if entries.is_empty() {
            warn!("every archive entry was skipped, nothing to export");
            return Ok(ExportOutcome::Nothing);
        }

        let (archive, names) = tokio::task::spawn_blocking(move || build_archive(&entries))
            .await
            .map_err(|e| ExportError::Archive(e.to_string()))??;

        let file_name = self.archive_name(chrono::Utc::now().timestamp_millis());
        let blobs = self.registry.blobs();
        let url = blobs.create(Blob::new(archive, ARCHIVE_MIME_TYPE));
        let delivered = match blobs.get(&url) {
            Some(blob) => sink.deliver(&file_name, &blob).await,
            None => Err(ExportError::Delivery("archive handle vanished".into())),
        };
        let _ = blobs.revoke(&url);
        delivered?;

        info!(file_name = %file_name, entries = names.len(), "exported archive");
        Ok(ExportOutcome::Archive {
            file_name,
            entries: names,
        })
    }

    fn result_blob(&self, file: &TrackedFile) -> Option<Blob> {
        file.result.as_ref().and_then(|url| self.registry.blobs().get(url))
    }
}

/// Pack `entries` into a deflated zip. Entries that fail to pack are logged
/// and left out; the names actually written are returned alongside the bytes.
pub fn build_archive(entries: &[(String, Bytes)]) -> Result<(Vec<u8>, Vec<String>), ExportError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut written = Vec::with_capacity(entries.len());

    for (name, data) in entries {
        // a refused header writes nothing, so only a failed body needs aborting
        if let Err(e) = writer.start_file(name.as_str(), options) {
            warn!(name = %name, error = %e, "failed to pack entry, skipping");
            continue;
        }
        if let Err(e) = writer.write_all(data) {
            warn!(name = %name, error = %e, "failed to pack entry, skipping");
            writer.abort_file()?;
            continue;
        }
        written.push(name.clone());
    }

    let cursor = writer.finish()?;
    Ok((cursor.into_inner(), written))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use sonicshift_core::{AudioFormat, FileStatus, FileUpdate, RawFile};

    use crate::sink::MemoryDownloadSink;

    struct FailingSink;

    #[async_trait]
    impl DownloadSink for FailingSink {
        async fn deliver(&self, _file_name: &str, _blob: &Blob) -> Result<(), ExportError> {
            Err(ExportError::Delivery("disk full".into()))
        }
    }

    fn complete(registry: &FileRegistry, name: &str, data: &'static [u8], format: AudioFormat) {
        let ids = registry.add_files(vec![RawFile::from_name(name, data)]);
        let _ = registry.set_format(&ids[0], format);
        let url = registry
            .blobs()
            .create(Blob::new(Bytes::from_static(data), format.mime_type()));
        assert!(registry.update_file(
            &ids[0],
            &FileUpdate {
                status: Some(FileStatus::Completed),
                result: Some(url),
                ..FileUpdate::default()
            }
        ));
    }

    fn assembler(registry: &Arc<FileRegistry>) -> ExportAssembler {
        ExportAssembler::new(Arc::clone(registry), &ExportSettings::default())
    }

    fn read_archive(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut entry = archive.by_index(i).unwrap();
                let mut data = Vec::new();
                let _ = entry.read_to_end(&mut data).unwrap();
                (entry.name().to_string(), data)
            })
            .collect()
    }

    #[tokio::test]
    async fn nothing_completed_means_no_download() {
        let registry = Arc::new(FileRegistry::new());
        let _ = registry.add_files(vec![RawFile::from_name("idle.wav", b"x".to_vec())]);
        let sink = MemoryDownloadSink::new();

        let outcome = assembler(&registry).export_all(&sink).await.unwrap();
        assert_eq!(outcome, ExportOutcome::Nothing);
        assert!(sink.downloads().is_empty());
    }

    #[tokio::test]
    async fn single_file_is_delivered_directly() {
        let registry = Arc::new(FileRegistry::new());
        complete(&registry, "song.wav", b"wave", AudioFormat::Mp3);
        let sink = MemoryDownloadSink::new();

        let outcome = assembler(&registry).export_all(&sink).await.unwrap();
        assert_eq!(
            outcome,
            ExportOutcome::Single {
                file_name: "song.mp3".into()
            }
        );
        let downloads = sink.downloads();
        assert_eq!(downloads.len(), 1);
        assert_eq!(downloads[0].file_name, "song.mp3");
        assert_eq!(downloads[0].blob.data().as_ref(), b"wave");
        // the result handle stays owned by the file
        assert_eq!(registry.blobs().len(), 1);
    }

    #[tokio::test]
    async fn several_files_become_one_archive() {
        let registry = Arc::new(FileRegistry::new());
        complete(&registry, "a.wav", b"aaa", AudioFormat::Mp3);
        complete(&registry, "b.m4a", b"bbb", AudioFormat::Ogg);
        let sink = MemoryDownloadSink::new();

        let outcome = assembler(&registry).export_all(&sink).await.unwrap();
        let ExportOutcome::Archive { file_name, entries } = outcome else {
            panic!("expected an archive export");
        };
        assert!(file_name.starts_with("sonicshift_converted_"));
        assert!(file_name.ends_with(".zip"));
        assert_eq!(entries, ["a.mp3", "b.ogg"]);

        let downloads = sink.downloads();
        assert_eq!(downloads.len(), 1);
        assert_eq!(downloads[0].blob.mime_type(), "application/zip");
        let contents = read_archive(downloads[0].blob.data());
        assert_eq!(
            contents,
            [
                ("a.mp3".to_string(), b"aaa".to_vec()),
                ("b.ogg".to_string(), b"bbb".to_vec()),
            ]
        );
        // temporary archive handle released; only the two results remain
        assert_eq!(registry.blobs().len(), 2);
    }

    #[tokio::test]
    async fn colliding_names_keep_last_payload() {
        let registry = Arc::new(FileRegistry::new());
        complete(&registry, "take.wav", b"first", AudioFormat::Mp3);
        complete(&registry, "other.wav", b"other", AudioFormat::Wav);
        complete(&registry, "take.m4a", b"second", AudioFormat::Mp3);
        let sink = MemoryDownloadSink::new();

        let outcome = assembler(&registry).export_all(&sink).await.unwrap();
        assert_matches!(outcome, ExportOutcome::Archive { ref entries, .. } if entries == &["take.mp3", "other.wav"]);

        let contents = read_archive(sink.downloads()[0].blob.data());
        assert_eq!(contents[0], ("take.mp3".to_string(), b"second".to_vec()));
    }

    #[tokio::test]
    async fn revoked_results_are_skipped() {
        let registry = Arc::new(FileRegistry::new());
        complete(&registry, "a.wav", b"aaa", AudioFormat::Mp3);
        complete(&registry, "b.wav", b"bbb", AudioFormat::Mp3);
        complete(&registry, "c.wav", b"ccc", AudioFormat::Mp3);
        let gone = registry.completed()[1].result.clone().unwrap();
        assert!(registry.blobs().revoke(&gone));
        let sink = MemoryDownloadSink::new();

        let outcome = assembler(&registry).export_all(&sink).await.unwrap();
        assert_matches!(outcome, ExportOutcome::Archive { ref entries, .. } if entries == &["a.mp3", "c.mp3"]);
    }

    #[tokio::test]
    async fn failed_delivery_still_revokes_archive_handle() {
        let registry = Arc::new(FileRegistry::new());
        complete(&registry, "a.wav", b"aaa", AudioFormat::Mp3);
        complete(&registry, "b.wav", b"bbb", AudioFormat::Ogg);

        let err = assembler(&registry).export_all(&FailingSink).await.unwrap_err();
        assert_matches!(err, ExportError::Delivery(_));
        assert_eq!(registry.blobs().len(), 2);
    }

    #[test]
    fn archive_name_uses_prefix_and_millis() {
        let registry = Arc::new(FileRegistry::new());
        let a = ExportAssembler::new(
            registry,
            &ExportSettings {
                archive_prefix: "batch_".into(),
            },
        );
        assert_eq!(a.archive_name(1_700_000_000_123), "batch_1700000000123.zip");
    }

    #[test]
    fn build_archive_writes_all_entries() {
        let entries = vec![
            ("one.mp3".to_string(), Bytes::from_static(b"1")),
            ("two.ogg".to_string(), Bytes::from_static(b"22")),
        ];
        let (bytes, names) = build_archive(&entries).unwrap();
        assert_eq!(names, ["one.mp3", "two.ogg"]);
        assert_eq!(read_archive(&bytes).len(), 2);
    }

    #[test]
    fn build_archive_skips_entries_that_fail_to_pack() {
        // the writer refuses a second entry with the same name
        let entries = vec![
            ("one.mp3".to_string(), Bytes::from_static(b"first")),
            ("one.mp3".to_string(), Bytes::from_static(b"second")),
            ("two.ogg".to_string(), Bytes::from_static(b"22")),
        ];
        let (bytes, names) = build_archive(&entries).unwrap();
        assert_eq!(names, ["one.mp3", "two.ogg"]);
        assert_eq!(
            read_archive(&bytes),
            [
                ("one.mp3".to_string(), b"first".to_vec()),
                ("two.ogg".to_string(), b"22".to_vec()),
            ]
        );
    }
}
