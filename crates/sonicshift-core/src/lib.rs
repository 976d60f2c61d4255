//! # sonicshift-core
//!
//! Foundation types shared by every SonicShift crate:
//!
//! - **Branded IDs**: [`ids::FileId`] as a newtype over a UUID v7 string
//! - **Formats**: [`format::AudioFormat`], the closed set of output tags
//! - **Status**: [`status::FileStatus`] lifecycle states and [`status::Phase`]
//! - **Files**: [`file::RawFile`] intake records, [`file::TrackedFile`], [`file::FileUpdate`]
//! - **Blobs**: [`blob::BlobStore`], the object-URL table behind result handles
//! - **Events**: [`events::FileEvent`] and the broadcast [`events::EventEmitter`]
//! - **Logging**: [`logging::init_subscriber`] for the `tracing` subscriber
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other sonicshift crates.

#![deny(unsafe_code)]

pub mod blob;
pub mod events;
pub mod file;
pub mod format;
pub mod ids;
pub mod logging;
pub mod status;

pub use blob::{Blob, BlobStore, BlobUrl};
pub use events::{EventEmitter, FileEvent};
pub use file::{FileUpdate, RawFile, TrackedFile, format_size, output_file_name};
pub use format::{AudioFormat, UnknownFormat};
pub use ids::FileId;
pub use status::{FileStatus, Phase};
