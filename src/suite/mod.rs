pub mod orchestrator;
pub mod types;

pub use orchestrator::SuiteOrchestrator;
pub use types::{
    CancelToken, ExecutionStatus, RequestReport, StepResult, SuiteExecutionRecord, SuiteReport,
    SuiteStep, TestSuite,
};
