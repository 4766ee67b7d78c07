//! Moving bytes to the destination and reporting on it.

pub mod copier;
pub mod progress;

pub use copier::{Copier, LocalCopier};
pub use progress::RunProgress;
