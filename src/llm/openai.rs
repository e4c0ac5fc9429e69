//! OpenAI 兼容 API 客户端
//!
//! 直接以 JSON 调用任意 OpenAI 兼容的 `/chat/completions` 端点（OpenAI、DeepSeek、Mistral、Gemini 兼容层等），
//! 以便完整保留 `tool_calls`、`reasoning_content` 与分片 content 等结构。
//! 非流式请求，响应作为单个增量批次交付（与流式接口同形）。

use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream;
use reqwest::{Client, StatusCode};
use serde_json::{json, Map, Value};

use crate::llm::{Delta, DeltaStream, LlmClient, LlmError, Segment};
use crate::memory::{Message, Role};
use crate::tools::ToolSpec;

/// OpenAI 兼容客户端：持有 HTTP Client、端点、模型名与 API Key
pub struct OpenAiCompatClient {
    client: Client,
    provider: String,
    base_url: String,
    model: String,
    api_key: String,
}

impl OpenAiCompatClient {
    pub fn new(
        provider: &str,
        base_url: &str,
        model: &str,
        api_key: &str,
        timeout_secs: u64,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LlmError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            provider: provider.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn build_body(&self, history: &[Message], tools: &[ToolSpec]) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": to_wire_messages(history),
        });
        if !tools.is_empty() {
            body["tools"] = Value::Array(tools.iter().map(to_wire_tool).collect());
        }
        body
    }
}

/// 历史转为 OpenAI 线格式；assistant 的 tool_calls 参数序列化为 JSON 字符串
pub fn to_wire_messages(history: &[Message]) -> Vec<Value> {
    history
        .iter()
        .map(|m| match m.role {
            Role::System | Role::User => json!({"role": m.role.as_str(), "content": m.content}),
            Role::Assistant if m.has_tool_calls() => {
                let calls: Vec<Value> = m
                    .tool_calls
                    .iter()
                    .map(|c| {
                        json!({
                            "id": c.id,
                            "type": "function",
                            "function": {
                                "name": c.name,
                                "arguments": Value::Object(c.args.clone()).to_string(),
                            }
                        })
                    })
                    .collect();
                let content = if m.content.is_empty() {
                    Value::Null
                } else {
                    Value::String(m.content.clone())
                };
                json!({"role": "assistant", "content": content, "tool_calls": calls})
            }
            Role::Assistant => json!({"role": "assistant", "content": m.content}),
            Role::Tool => json!({
                "role": "tool",
                "tool_call_id": m.tool_call_id.clone().unwrap_or_default(),
                "content": m.content,
            }),
        })
        .collect()
}

fn to_wire_tool(spec: &ToolSpec) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": spec.name,
            "description": spec.description,
            "parameters": spec.parameters,
        }
    })
}

/// 解析 choices[0].message 为增量序列
///
/// content 为字符串且无推理、无工具调用时得到单个纯文本增量；否则得到片段列表。
pub fn parse_response_message(message: &Value) -> Result<Vec<Delta>, LlmError> {
    let mut segments: Vec<Segment> = Vec::new();

    if let Some(reasoning) = message.get("reasoning_content").and_then(Value::as_str) {
        if !reasoning.is_empty() {
            segments.push(Segment::reasoning(reasoning));
        }
    }

    let mut plain: Option<String> = None;
    match message.get("content") {
        None | Some(Value::Null) => {}
        Some(Value::String(s)) => plain = Some(s.clone()),
        Some(Value::Array(parts)) => {
            for part in parts {
                let seg = match part {
                    Value::String(s) => Segment::text(s.clone()),
                    other => serde_json::from_value::<Segment>(other.clone())
                        .map_err(|e| LlmError::InvalidResponse(format!("content part: {e}")))?,
                };
                segments.push(seg);
            }
        }
        Some(other) => {
            return Err(LlmError::InvalidResponse(format!(
                "unexpected content shape: {other}"
            )))
        }
    }

    let mut calls = Vec::new();
    if let Some(raw_calls) = message.get("tool_calls").and_then(Value::as_array) {
        for raw in raw_calls {
            let id = raw.get("id").and_then(Value::as_str).unwrap_or_default();
            let function = raw
                .get("function")
                .ok_or_else(|| LlmError::InvalidResponse("tool call without function".into()))?;
            let name = function
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| LlmError::InvalidResponse("tool call without name".into()))?;
            let args = match function.get("arguments") {
                Some(Value::String(s)) if s.trim().is_empty() => Value::Object(Map::new()),
                Some(Value::String(s)) => serde_json::from_str::<Value>(s).map_err(|e| {
                    LlmError::InvalidResponse(format!("arguments for {name}: {e}"))
                })?,
                Some(v @ Value::Object(_)) => v.clone(),
                _ => Value::Object(Map::new()),
            };
            calls.push(Segment::tool_call(id, name, args));
        }
    }

    if segments.is_empty() && calls.is_empty() {
        return Ok(vec![Delta::Text(plain.unwrap_or_default())]);
    }
    if let Some(text) = plain {
        segments.push(Segment::text(text));
    }
    segments.extend(calls);
    Ok(segments.into_iter().map(Delta::Segment).collect())
}

fn map_status(status: StatusCode, retry_after: Option<u64>, body: String) -> LlmError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::Auth(body),
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited {
            retry_after_ms: retry_after.unwrap_or(1) * 1000,
        },
        s => LlmError::Api {
            status: s.as_u16(),
            message: body,
        },
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatClient {
    fn provider(&self) -> &str {
        &self.provider
    }

    async fn generate(&self, history: &[Message], tools: &[ToolSpec]) -> Result<DeltaStream, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_body(history, tools);
        tracing::debug!(provider = %self.provider, model = %self.model, messages = history.len(), "chat completion request");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::Unavailable(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let retry_after = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            let text = resp.text().await.unwrap_or_default();
            return Err(map_status(status, retry_after, text));
        }

        let value: Value = resp
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        let message = value
            .pointer("/choices/0/message")
            .ok_or_else(|| LlmError::InvalidResponse("no choices[0].message".into()))?;
        let deltas = parse_response_message(message)?;
        Ok(Box::pin(stream::iter(deltas.into_iter().map(Ok))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::ToolCallRequest;

    #[test]
    fn test_plain_content_is_single_text_delta() {
        let deltas = parse_response_message(&json!({"content": "hello"})).unwrap();
        assert_eq!(deltas, vec![Delta::text("hello")]);
    }

    #[test]
    fn test_tool_calls_and_reasoning_become_segments() {
        let msg = json!({
            "content": null,
            "reasoning_content": "need to write",
            "tool_calls": [{
                "id": "call_1",
                "type": "function",
                "function": {"name": "files_write", "arguments": "{\"rel_path\":\"a.txt\",\"content\":\"x\"}"}
            }]
        });
        let deltas = parse_response_message(&msg).unwrap();
        assert_eq!(deltas.len(), 2);
        assert_eq!(deltas[0], Delta::Segment(Segment::reasoning("need to write")));
        match &deltas[1] {
            Delta::Segment(Segment::ToolCall { id, name, args }) => {
                assert_eq!(id, "call_1");
                assert_eq!(name, "files_write");
                assert_eq!(args["rel_path"], "a.txt");
            }
            other => panic!("unexpected delta {other:?}"),
        }
    }

    #[test]
    fn test_content_parts_are_parsed() {
        let msg = json!({"content": [
            {"type": "thinking", "thinking": "hmm"},
            {"type": "text", "text": "answer"}
        ]});
        let deltas = parse_response_message(&msg).unwrap();
        assert_eq!(
            deltas,
            vec![
                Delta::Segment(Segment::reasoning("hmm")),
                Delta::Segment(Segment::text("answer")),
            ]
        );
    }

    #[test]
    fn test_bad_arguments_are_invalid_response() {
        let msg = json!({"tool_calls": [{"id": "c", "function": {"name": "x", "arguments": "{oops"}}]});
        assert!(matches!(
            parse_response_message(&msg),
            Err(LlmError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_wire_messages_carry_tool_links() {
        let mut args = Map::new();
        args.insert("expression".into(), json!("2*3"));
        let history = vec![
            Message::user("compute"),
            Message::assistant_with_calls("", vec![ToolCallRequest::new("c1", "calc_evaluate", args)]),
            Message::tool("c1", "6"),
        ];
        let wire = to_wire_messages(&history);
        assert_eq!(wire[1]["content"], Value::Null);
        assert_eq!(wire[1]["tool_calls"][0]["function"]["arguments"], "{\"expression\":\"2*3\"}");
        assert_eq!(wire[2]["tool_call_id"], "c1");
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            map_status(StatusCode::UNAUTHORIZED, None, "no".into()),
            LlmError::Auth(_)
        ));
        assert_eq!(
            map_status(StatusCode::TOO_MANY_REQUESTS, Some(3), String::new()),
            LlmError::RateLimited { retry_after_ms: 3000 }
        );
    }
}
