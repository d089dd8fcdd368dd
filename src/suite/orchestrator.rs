//! 套件编排器
//!
//! 顺序执行启用的步骤，单步失败记录为数据后继续，
//! 只有存储写入失败才中止整次运行。运行记录在 RUNNING 时
//! 落盘一次，终态再落盘一次，返回前必定离开 RUNNING。

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Value, json};
use tracing::{error, info};

use crate::assertion::{self, AssertionKind, AssertionResult, AssertionRule};
use crate::expression::FunctionRegistry;
use crate::history::{HistoryRecord, RecordStore};
use crate::http::Client;
use crate::request::{RequestBuilder, RequestDefinition, ResolvedCall};
use crate::suite::types::{
    CancelToken, ExecutionStatus, RequestReport, StepResult, SuiteExecutionRecord, SuiteReport,
    SuiteStep, TestSuite,
};
use crate::variable::Environment;
use crate::Result;

pub struct SuiteOrchestrator {
    registry: FunctionRegistry,
    client: Client,
    store: Arc<dyn RecordStore>,
    executed_by: String,
}

impl SuiteOrchestrator {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            registry: FunctionRegistry::with_builtins(),
            client: Client::new(),
            store,
            executed_by: "rusuite".to_string(),
        }
    }

    pub fn with_executed_by(mut self, executed_by: impl Into<String>) -> Self {
        self.executed_by = executed_by.into();
        self
    }

    /// 执行整个套件
    ///
    /// 取消令牌只在步骤之间检查，进行中的请求不会被打断。
    pub async fn execute_suite(
        &self,
        suite: &TestSuite,
        environment: Option<&Environment>,
        cancel: &CancelToken,
    ) -> Result<SuiteReport> {
        let mut record = SuiteExecutionRecord::new(&suite.name);

        let mut steps: Vec<&SuiteStep> = suite.steps.iter().filter(|s| s.enabled).collect();
        steps.sort_by_key(|s| s.order);

        record.status = ExecutionStatus::Running;
        record.start_time = Some(Utc::now());
        record.total = steps.len();
        if let Err(e) = self.store.append_execution(&record) {
            self.finalize(&mut record, ExecutionStatus::Failed);
            return Err(e);
        }

        info!(
            suite = %suite.name,
            execution_id = %record.id,
            steps = steps.len(),
            "套件开始执行"
        );

        let mut cancelled = false;
        for step in &steps {
            if cancel.is_cancelled() {
                info!(execution_id = %record.id, "收到取消请求，停止剩余步骤");
                cancelled = true;
                break;
            }

            let (result, history) = self.run_step(&step.request, &step.assertions, environment).await;
            if result.passed {
                record.passed += 1;
            } else {
                record.failed += 1;
            }
            record.results.push(result);

            if let Err(e) = self.store.append_history(&history) {
                error!(error = %e, execution_id = %record.id, "历史记录写入失败，中止剩余步骤");
                // 未执行的步骤计入失败，保持 total == passed + failed
                record.failed = record.total - record.passed;
                self.finalize(&mut record, ExecutionStatus::Failed);
                return Err(e);
            }
        }

        let status = if cancelled {
            // 取消的运行只统计已执行的步骤
            record.total = record.passed + record.failed;
            ExecutionStatus::Cancelled
        } else if record.failed == 0 {
            ExecutionStatus::Completed
        } else {
            ExecutionStatus::Failed
        };
        self.finalize(&mut record, status);

        info!(
            execution_id = %record.id,
            status = ?record.status,
            passed = record.passed,
            failed = record.failed,
            "套件执行结束"
        );

        Ok(SuiteReport {
            success: record.status == ExecutionStatus::Completed,
            execution_id: record.id.to_string(),
            passed_count: record.passed,
            failed_count: record.failed,
            total_count: record.total,
            results: record.results,
        })
    }

    /// 执行单个请求，不走套件状态机，恰好落一条历史记录
    pub async fn execute_request(
        &self,
        definition: &RequestDefinition,
        environment: Option<&Environment>,
    ) -> Result<RequestReport> {
        let (result, history) = self.run_step(definition, &[], environment).await;
        self.store.append_history(&history)?;

        Ok(RequestReport {
            success: result.passed,
            history_id: history.id,
            status_code: result.status_code,
            response_time: result.response_time,
            assertions_results: result.assertions_results,
            response_data: history.response_data,
            error: result.error,
        })
    }

    /// 构建 -> 发送 -> 断言，任何失败都折叠进返回值
    async fn run_step(
        &self,
        definition: &RequestDefinition,
        overrides: &[AssertionRule],
        environment: Option<&Environment>,
    ) -> (StepResult, HistoryRecord) {
        let mut history = HistoryRecord::new(&definition.name, &self.executed_by);
        history.environment = environment.map(|e| e.name.clone());

        let builder = RequestBuilder::new(&self.registry);
        let call = match builder.build(definition, environment) {
            Ok(call) => call,
            Err(e) => {
                let message = format!("构建请求失败: {}", e);
                history.request_data = json!({
                    "method": definition.method.as_str(),
                    "url": definition.url,
                });
                history.error_message = Some(message.clone());
                return (
                    failed_step(definition, &definition.url, message),
                    history,
                );
            }
        };

        history.request_data = request_snapshot(&call);

        let response = match self.client.execute(&call).await {
            Ok(response) => response,
            Err(e) => {
                let message = format!("请求发送失败: {}", e);
                history.error_message = Some(message.clone());
                return (failed_step(definition, &call.url, message), history);
            }
        };

        history.status_code = Some(response.status);
        history.response_time = Some(response.response_time_ms);
        history.response_data = Some(json!({
            "status": response.status,
            "body": response.body,
        }));

        // 步骤级覆盖规则在前，请求自带规则在后，一起求值
        let mut rules: Vec<AssertionRule> =
            Vec::with_capacity(overrides.len() + definition.assertions.len());
        rules.extend_from_slice(overrides);
        rules.extend_from_slice(&definition.assertions);
        for rule in &mut rules {
            if rule.kind == AssertionKind::ResponseTime {
                rule.actual_time = Some(response.response_time_ms);
            }
        }

        let results = assertion::evaluate(&response, &rules);
        let override_results = &results[..overrides.len()];
        let request_results = &results[overrides.len()..];

        // 通过判定: 步骤级 status_code 覆盖（若有）命中，且请求级断言全过
        let override_ok = override_results
            .iter()
            .filter(|r| r.kind == AssertionKind::StatusCode)
            .all(|r| r.passed);
        let passed = override_ok && request_results.iter().all(|r| r.passed);
        let error = first_failure(&results);

        history.assertions_results = results.clone();

        let result = StepResult {
            name: definition.name.clone(),
            method: definition.method.as_str().to_string(),
            url: call.url,
            status_code: Some(response.status),
            response_time: Some(response.response_time_ms),
            passed,
            error,
            assertions_results: results,
        };
        (result, history)
    }

    /// 写终态，end_time 必定落上；终态落盘失败只记日志
    fn finalize(&self, record: &mut SuiteExecutionRecord, status: ExecutionStatus) {
        record.status = status;
        record.end_time = Some(Utc::now());
        if let Err(e) = self.store.append_execution(record) {
            error!(error = %e, execution_id = %record.id, "执行记录终态写入失败");
        }
    }
}

fn failed_step(definition: &RequestDefinition, url: &str, error: String) -> StepResult {
    StepResult {
        name: definition.name.clone(),
        method: definition.method.as_str().to_string(),
        url: url.to_string(),
        status_code: None,
        response_time: None,
        passed: false,
        error: Some(error),
        assertions_results: Vec::new(),
    }
}

fn first_failure(results: &[AssertionResult]) -> Option<String> {
    results.iter().find(|r| !r.passed).map(|r| {
        r.error
            .clone()
            .unwrap_or_else(|| format!("断言未通过: {}", r.name))
    })
}

fn request_snapshot(call: &ResolvedCall) -> Value {
    json!({
        "method": call.method.as_str(),
        "url": call.url,
        "headers": call.headers,
        "params": call.params,
        "body": call.body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use crate::request::types::{BodySpec, HeaderSpec};

    #[derive(Default)]
    struct MemoryStore {
        history: Mutex<Vec<HistoryRecord>>,
        executions: Mutex<Vec<SuiteExecutionRecord>>,
    }

    impl RecordStore for MemoryStore {
        fn append_history(&self, record: &HistoryRecord) -> Result<()> {
            self.history.lock().unwrap().push(record.clone());
            Ok(())
        }

        fn list_history(&self) -> Result<Vec<HistoryRecord>> {
            Ok(self.history.lock().unwrap().clone())
        }

        fn tail_history(&self, n: usize) -> Result<Vec<HistoryRecord>> {
            let records = self.history.lock().unwrap();
            let skip = records.len().saturating_sub(n);
            Ok(records[skip..].to_vec())
        }

        fn append_execution(&self, record: &SuiteExecutionRecord) -> Result<()> {
            self.executions.lock().unwrap().push(record.clone());
            Ok(())
        }

        fn list_executions(&self) -> Result<Vec<SuiteExecutionRecord>> {
            Ok(self.executions.lock().unwrap().clone())
        }
    }

    fn definition(name: &str, url: &str) -> RequestDefinition {
        RequestDefinition {
            name: name.to_string(),
            method: crate::http::Method::Get,
            url: url.to_string(),
            headers: HeaderSpec::default(),
            params: HashMap::new(),
            body: BodySpec::default(),
            assertions: Vec::new(),
            order: 0,
        }
    }

    fn step(name: &str, url: &str, order: i64) -> SuiteStep {
        SuiteStep {
            request: definition(name, url),
            order,
            enabled: true,
            assertions: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_empty_suite_completes() {
        let store = Arc::new(MemoryStore::default());
        let orchestrator = SuiteOrchestrator::new(store.clone());
        let suite = TestSuite {
            name: "空套件".to_string(),
            steps: Vec::new(),
        };

        let report = orchestrator
            .execute_suite(&suite, None, &CancelToken::new())
            .await
            .unwrap();
        assert!(report.success);
        assert_eq!(report.total_count, 0);

        let executions = store.list_executions().unwrap();
        assert_eq!(executions.len(), 2);
        assert_eq!(executions[0].status, ExecutionStatus::Running);
        assert_eq!(executions[1].status, ExecutionStatus::Completed);
        assert!(executions[1].end_time.is_some());
    }

    #[tokio::test]
    async fn test_cancel_before_first_step() {
        let store = Arc::new(MemoryStore::default());
        let orchestrator = SuiteOrchestrator::new(store.clone());
        let suite = TestSuite {
            name: "s".to_string(),
            steps: vec![step("a", "http://localhost:1/x", 1)],
        };

        let token = CancelToken::new();
        token.cancel();

        let report = orchestrator.execute_suite(&suite, None, &token).await.unwrap();
        assert!(!report.success);
        assert_eq!(report.total_count, 0);
        assert_eq!(report.passed_count + report.failed_count, report.total_count);

        let executions = store.list_executions().unwrap();
        assert_eq!(executions.last().unwrap().status, ExecutionStatus::Cancelled);
        assert!(store.list_history().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_build_failure_recorded_as_failed_step() {
        let store = Arc::new(MemoryStore::default());
        let orchestrator = SuiteOrchestrator::new(store.clone());
        let suite = TestSuite {
            name: "s".to_string(),
            steps: vec![step("坏地址", "/relative/only", 1)],
        };

        let report = orchestrator
            .execute_suite(&suite, None, &CancelToken::new())
            .await
            .unwrap();
        assert!(!report.success);
        assert_eq!(report.total_count, 1);
        assert_eq!(report.failed_count, 1);
        assert!(report.results[0].error.as_deref().unwrap().contains("构建请求失败"));
        assert!(report.results[0].status_code.is_none());

        // 失败步骤同样落历史
        let history = store.list_history().unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].error_message.is_some());
        assert!(history[0].status_code.is_none());
    }

    #[tokio::test]
    async fn test_disabled_steps_excluded() {
        let store = Arc::new(MemoryStore::default());
        let orchestrator = SuiteOrchestrator::new(store.clone());
        let mut disabled = step("跳过", "/bad", 1);
        disabled.enabled = false;
        let suite = TestSuite {
            name: "s".to_string(),
            steps: vec![disabled],
        };

        let report = orchestrator
            .execute_suite(&suite, None, &CancelToken::new())
            .await
            .unwrap();
        assert!(report.success);
        assert_eq!(report.total_count, 0);
        assert!(store.list_history().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_single_request_error_path() {
        let store = Arc::new(MemoryStore::default());
        let orchestrator = SuiteOrchestrator::new(store.clone());

        let report = orchestrator
            .execute_request(&definition("坏地址", "not-a-url"), None)
            .await
            .unwrap();
        assert!(!report.success);
        assert!(report.error.is_some());
        assert!(report.status_code.is_none());

        let history = store.list_history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, report.history_id);
    }
}
