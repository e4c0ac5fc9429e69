//! 委派工具：把一个 Worker 智能体包装成监督者可调用的工具
//!
//! 参数 {task}；Worker 用临时会话（角色提示词 + 任务）跑到完成，返回最终文本。

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::react::Agent;
use crate::tools::schema::schema_of;
use crate::tools::{parse_args, Tool, ToolError};

#[derive(Debug, Deserialize, JsonSchema)]
struct DelegateArgs {
    /// 交给专家智能体的完整任务描述
    task: String,
}

pub struct DelegateTool {
    name: String,
    description: String,
    worker: Arc<Agent>,
}

impl DelegateTool {
    pub fn new(name: impl Into<String>, description: impl Into<String>, worker: Arc<Agent>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            worker,
        }
    }
}

#[async_trait]
impl Tool for DelegateTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Value {
        schema_of::<DelegateArgs>()
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: DelegateArgs = parse_args(args)?;
        if args.task.trim().is_empty() {
            return Err(ToolError::InvalidArgs("task must not be empty".to_string()));
        }
        tracing::info!(tool = %self.name, worker = %self.worker.name(), "delegating task");
        let text = self
            .worker
            .run_task(&args.task)
            .await
            .map_err(|e| ToolError::Failed(format!("{} failed: {}", self.worker.name(), e)))?;
        Ok(Value::String(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::tools::{ToolExecutor, ToolRegistry};
    use serde_json::json;

    #[tokio::test]
    async fn test_delegate_runs_worker_to_completion() {
        let llm = Arc::new(MockLlmClient::new());
        llm.push_text("summary: done");
        let worker = Arc::new(Agent::new(
            "research",
            "You research.",
            llm.clone(),
            ToolExecutor::new(ToolRegistry::new(), 5),
        ));
        let tool = DelegateTool::new("research_web", "Delegate research", worker);
        let out = tool.execute(json!({"task": "find rust docs"})).await.unwrap();
        assert_eq!(out, json!("summary: done"));

        let history = &llm.seen_histories()[0];
        assert_eq!(history[0].content, "You research.");
        assert_eq!(history[1].content, "find rust docs");
    }

    #[tokio::test]
    async fn test_delegate_requires_task() {
        let worker = Arc::new(Agent::new(
            "ops",
            "ops",
            Arc::new(MockLlmClient::new()),
            ToolExecutor::new(ToolRegistry::new(), 5),
        ));
        let tool = DelegateTool::new("ops_files", "Delegate", worker);
        assert!(matches!(tool.execute(json!({})).await, Err(ToolError::InvalidArgs(_))));
        assert!(matches!(tool.execute(json!({"task": " "})).await, Err(ToolError::InvalidArgs(_))));
    }
}
