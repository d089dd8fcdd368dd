pub mod model;
pub mod storage;

pub use model::HistoryRecord;
pub use storage::{JsonlStore, RecordStore};
