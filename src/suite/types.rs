use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::assertion::{AssertionResult, AssertionRule};
use crate::request::RequestDefinition;

/// 测试套件: 按 order 排序执行的一组请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuite {
    pub name: String,
    #[serde(default)]
    pub steps: Vec<SuiteStep>,
}

/// 套件中的一步
///
/// `assertions` 是步骤级覆盖规则，与请求自带的规则一起求值；
/// 其中的 status_code 规则参与步骤通过判定。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteStep {
    pub request: RequestDefinition,
    #[serde(default)]
    pub order: i64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub assertions: Vec<AssertionRule>,
}

fn default_enabled() -> bool {
    true
}

/// 套件运行状态机
///
/// PENDING -> RUNNING -> {COMPLETED | FAILED | CANCELLED}，
/// 离开 RUNNING 即终态，不再变化。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed | ExecutionStatus::Failed | ExecutionStatus::Cancelled
        )
    }
}

/// 单步执行结果摘要
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub name: String,
    pub method: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// 耗时（毫秒）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time: Option<f64>,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub assertions_results: Vec<AssertionResult>,
}

/// 一次套件运行的完整记录
///
/// 终态下恒有 `total == passed + failed`；被取消的运行只统计
/// 已执行的步骤，`total` 随之缩减。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteExecutionRecord {
    pub id: Uuid,
    pub suite_name: String,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    #[serde(default)]
    pub results: Vec<StepResult>,
}

impl SuiteExecutionRecord {
    pub fn new(suite_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            suite_name: suite_name.into(),
            status: ExecutionStatus::Pending,
            start_time: None,
            end_time: None,
            total: 0,
            passed: 0,
            failed: 0,
            results: Vec::new(),
        }
    }
}

/// 套件执行的对外输出
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub success: bool,
    pub execution_id: String,
    pub passed_count: usize,
    pub failed_count: usize,
    pub total_count: usize,
    pub results: Vec<StepResult>,
}

/// 单请求执行的对外输出
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestReport {
    pub success: bool,
    pub history_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time: Option<f64>,
    #[serde(default)]
    pub assertions_results: Vec<AssertionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 协作式取消令牌
///
/// 编排器只在步骤之间检查，不打断进行中的 HTTP 调用。
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_serde_uppercase() {
        assert_eq!(
            serde_json::to_string(&ExecutionStatus::Cancelled).unwrap(),
            "\"CANCELLED\""
        );
        let status: ExecutionStatus = serde_json::from_str("\"RUNNING\"").unwrap();
        assert_eq!(status, ExecutionStatus::Running);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!ExecutionStatus::Pending.is_terminal());
        assert!(!ExecutionStatus::Running.is_terminal());
        assert!(ExecutionStatus::Completed.is_terminal());
        assert!(ExecutionStatus::Failed.is_terminal());
        assert!(ExecutionStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_step_enabled_defaults_true() {
        let step: SuiteStep = serde_json::from_value(json!({
            "request": {
                "name": "ping",
                "method": "GET",
                "url": "http://localhost/ping"
            }
        }))
        .unwrap();
        assert!(step.enabled);
        assert_eq!(step.order, 0);
        assert!(step.assertions.is_empty());
    }

    #[test]
    fn test_cancel_token_shared_across_clones() {
        let token = CancelToken::new();
        let observer = token.clone();
        assert!(!observer.is_cancelled());
        token.cancel();
        assert!(observer.is_cancelled());
    }
}
