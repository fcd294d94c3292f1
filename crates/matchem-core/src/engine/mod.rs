//! Turns answered truth queries into knowledge and belief updates,
//! propagating forced deductions until the cascade settles.

mod inference;

pub use inference::{EngineError, InferenceReport, process_answer};
