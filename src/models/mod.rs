//! Model selection.

pub mod choice;

pub use choice::ModelChoice;
