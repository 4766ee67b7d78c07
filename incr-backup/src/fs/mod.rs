//! Filesystem side of the pipeline: scanning, ignore patterns, fresh
//! metadata and destination layout.

pub mod destination;
pub mod metadata;
pub mod pattern;
pub mod walker;

pub use destination::destination_path;
pub use metadata::FileMetadata;
pub use pattern::{IgnorePattern, PatternMatcher};
pub use walker::{FileDescriptor, Scanner};
