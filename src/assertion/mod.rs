pub mod engine;
pub mod types;

pub use engine::evaluate;
pub use types::{AssertionKind, AssertionResult, AssertionRule};
