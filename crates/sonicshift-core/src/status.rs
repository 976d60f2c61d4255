//! Lifecycle status and phase enums.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a tracked file.
///
/// The main flow is strictly forward:
/// `Idle → Uploading → Uploaded → Converting → Completed`.
/// `Error` is a terminal state reached only when the result cannot be
/// produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Registered, waiting for a conversion request.
    #[default]
    Idle,
    /// Simulated upload in progress.
    Uploading,
    /// Upload finished, conversion not yet started.
    Uploaded,
    /// Simulated conversion in progress.
    Converting,
    /// Result available for export.
    Completed,
    /// Conversion failed; no result.
    Error,
}

impl FileStatus {
    /// Whether the main lifecycle has ended for this file.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Whether a conversion pipeline is running for this file.
    #[must_use]
    pub fn is_in_flight(self) -> bool {
        matches!(self, Self::Uploading | Self::Uploaded | Self::Converting)
    }

    /// Wire string (snake_case).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Uploading => "uploading",
            Self::Uploaded => "uploaded",
            Self::Converting => "converting",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    /// Short label for status badges.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "Ready",
            Self::Uploading => "Uploading",
            Self::Uploaded => "Ready for conversion",
            Self::Converting => "Processing",
            Self::Completed => "Converted",
            Self::Error => "Failed",
        }
    }
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A timed, simulated period of progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Drives `upload_progress`.
    Upload,
    /// Drives `convert_progress`.
    Convert,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Upload => f.write_str("upload"),
            Self::Convert => f.write_str("convert"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(FileStatus::Completed.is_terminal());
        assert!(FileStatus::Error.is_terminal());
        assert!(!FileStatus::Idle.is_terminal());
        assert!(!FileStatus::Converting.is_terminal());
    }

    #[test]
    fn in_flight_states() {
        assert!(FileStatus::Uploading.is_in_flight());
        assert!(FileStatus::Uploaded.is_in_flight());
        assert!(FileStatus::Converting.is_in_flight());
        assert!(!FileStatus::Idle.is_in_flight());
        assert!(!FileStatus::Completed.is_in_flight());
    }

    #[test]
    fn serde_snake_case() {
        assert_eq!(
            serde_json::to_string(&FileStatus::Converting).unwrap(),
            "\"converting\""
        );
        assert_eq!(serde_json::to_string(&Phase::Upload).unwrap(), "\"upload\"");
    }

    #[test]
    fn display_matches_wire() {
        assert_eq!(FileStatus::Uploaded.to_string(), "uploaded");
        assert_eq!(Phase::Convert.to_string(), "convert");
    }
}
