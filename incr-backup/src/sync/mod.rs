//! Incremental sync decisions.

pub mod detector;

pub use detector::{ChangeDetector, SizeDetector};
