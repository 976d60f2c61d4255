//! Target output formats.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Output format tag a file can be converted to.
///
/// The set is closed and ordered; [`AudioFormat::ALL`] lists the tags in the
/// order they are offered, and the first entry is the intake default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// MPEG-1 Layer III.
    #[default]
    Mp3,
    /// RIFF WAVE.
    Wav,
    /// MPEG-4 audio.
    M4a,
    /// MPEG-4 container (audio track).
    Mp4,
    /// iPhone ringtone (MPEG-4 audio).
    M4r,
    /// Ogg Vorbis.
    Ogg,
    /// Raw AAC.
    Aac,
}

impl AudioFormat {
    /// All supported formats, in offer order.
    pub const ALL: [Self; 7] = [
        Self::Mp3,
        Self::Wav,
        Self::M4a,
        Self::Mp4,
        Self::M4r,
        Self::Ogg,
        Self::Aac,
    ];

    /// File extension (without the dot), identical to the wire tag.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::M4a => "m4a",
            Self::Mp4 => "mp4",
            Self::M4r => "m4r",
            Self::Ogg => "ogg",
            Self::Aac => "aac",
        }
    }

    /// Declared media type of a converted result (`audio/<tag>`).
    #[must_use]
    pub fn mime_type(self) -> String {
        format!("audio/{}", self.extension())
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Error returned when parsing a tag outside the supported set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported format '{0}' (expected one of: mp3, wav, m4a, mp4, m4r, ogg, aac)")]
pub struct UnknownFormat(pub String);

impl FromStr for AudioFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().trim_start_matches('.').to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.extension() == tag)
            .ok_or_else(|| UnknownFormat(s.to_string()))
    }
}
