//! Plain-text rendering of registry change events.

use std::collections::HashMap;

use sonicshift_core::{FileEvent, FileId, Phase, TrackedFile, format_size};

/// Progress is printed once per quarter to keep output readable.
const PROGRESS_BUCKET: u8 = 25;

/// Turns change events into printable lines.
#[derive(Debug, Default)]
pub struct ProgressRenderer {
    names: HashMap<FileId, String>,
    buckets: HashMap<(FileId, Phase), u8>,
}

impl ProgressRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The line to print for `event`, if any.
    pub fn render(&mut self, event: &FileEvent) -> Option<String> {
        match event {
            FileEvent::Added { id, name } => {
                let _ = self.names.insert(id.clone(), name.clone());
                Some(format!("{name}: added"))
            }
            FileEvent::StatusChanged { id, to, .. } => {
                Some(format!("{}: {}", self.name(id), to.label()))
            }
            FileEvent::Progress { id, phase, value } => {
                let bucket = value / PROGRESS_BUCKET;
                let last = self.buckets.entry((id.clone(), *phase)).or_insert(0);
                if bucket <= *last {
                    return None;
                }
                *last = bucket;
                Some(format!("{}: {phase} {value}%", self.name(id)))
            }
            FileEvent::FormatChanged { id, format } => {
                Some(format!("{}: target format {format}", self.name(id)))
            }
            FileEvent::DescriptionReady { id, text } => {
                Some(format!("{}: \"{text}\"", self.name(id)))
            }
            FileEvent::Removed { id } => {
                let name = self.names.remove(id).unwrap_or_else(|| id.to_string());
                Some(format!("{name}: removed"))
            }
        }
    }

    fn name<'a>(&'a self, id: &'a FileId) -> &'a str {
        self.names.get(id).map_or(id.as_str(), String::as_str)
    }
}

/// One summary row for a file after the run.
pub fn summary_line(file: &TrackedFile) -> String {
    let mut line = format!(
        "{} ({}) -> {} [{}]",
        file.name,
        format_size(file.size),
        file.output_name(),
        file.status.label()
    );
    if let Some(desc) = &file.ai_description {
        line.push_str(" - ");
        line.push_str(desc);
    }
    line
}
