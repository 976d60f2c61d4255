//! # sonicshift-runtime
//!
//! File registry, conversion lifecycle, and export.
//!
//! - **Registry**: ordered tracked files, the only place state changes, with a
//!   change-event stream for observers
//! - **Driver**: one tokio task per file stepping through the simulated upload
//!   and convert phases, plus the description side task
//! - **Export**: direct download for one completed file, a zip for several
//! - **Converter**: facade bundling the three for a front end
//!
//! ## Crate Position
//!
//! Aggregation layer. Depends on: sonicshift-core, sonicshift-settings,
//! sonicshift-describe.
//! Depended on by: sonicshift-cli.

#![deny(unsafe_code)]

pub mod converter;
pub mod driver;
pub mod errors;
pub mod export;
pub mod progress;
pub mod registry;
pub mod sink;
pub mod transcode;

pub use converter::Converter;
pub use driver::ConversionDriver;
pub use errors::{ConvertError, ExportError};
pub use export::{ExportAssembler, ExportOutcome};
pub use progress::{FixedSteps, RandomSteps, StepSource, next_progress};
pub use registry::{FileRegistry, FormatChange};
pub use sink::{Download, DownloadSink, FsDownloadSink, MemoryDownloadSink};
pub use transcode::{PassthroughTranscoder, Transcoder};
