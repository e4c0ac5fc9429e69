//! 内容规范化：把任意后端输出变成「一段规范文本 + 工具调用列表」
//!
//! - 纯字符串原样通过（幂等：已规范化的文本再规范化一次不变）
//! - 片段列表：reasoning 丢弃；text 按顺序拼接后去掉首尾空白；tool_call 按源顺序提取
//! - 缺少 id 的工具调用补一个生成的 id

use serde_json::Value;

use crate::llm::{RawOutput, Segment};
use crate::memory::ToolCallRequest;

/// 文本片段的拼接方式（按后端选择，见 ProviderProfile）
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NormalizerVariant {
    /// 原样相连
    #[default]
    Concat,
    /// 非空片段以换行相连
    Lines,
}

/// 规范化结果
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Normalized {
    pub text: String,
    pub tool_calls: Vec<ToolCallRequest>,
}

pub fn normalize(raw: &RawOutput) -> Normalized {
    normalize_with(raw, NormalizerVariant::Concat)
}

pub fn normalize_with(raw: &RawOutput, variant: NormalizerVariant) -> Normalized {
    let segments = match raw {
        RawOutput::PlainText(text) => {
            return Normalized {
                text: text.clone(),
                tool_calls: Vec::new(),
            }
        }
        RawOutput::Segments(segments) => segments,
    };

    let mut texts: Vec<&str> = Vec::new();
    let mut tool_calls = Vec::new();
    for seg in segments {
        match seg {
            Segment::Text { text } => texts.push(text),
            Segment::Reasoning { .. } => {}
            Segment::ToolCall { id, name, args } => {
                let id = if id.trim().is_empty() {
                    format!("call_{}", uuid::Uuid::new_v4().simple())
                } else {
                    id.clone()
                };
                tool_calls.push(ToolCallRequest::new(id, name.clone(), args.clone()));
            }
            Segment::Unknown => {
                tracing::debug!("dropping unknown content segment");
            }
        }
    }

    let joined = match variant {
        NormalizerVariant::Concat => texts.concat(),
        NormalizerVariant::Lines => texts
            .iter()
            .filter(|t| !t.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("\n"),
    };

    Normalized {
        text: joined.trim().to_string(),
        tool_calls,
    }
}

/// 同一轮内工具调用 id 必须唯一；重复视为后端输出畸形
pub fn find_duplicate_id(calls: &[ToolCallRequest]) -> Option<&str> {
    let mut seen = std::collections::HashSet::new();
    calls
        .iter()
        .map(|c| c.id.as_str())
        .find(|id| !seen.insert(*id))
}

/// 把工具结果压成纯文本（仅接受字符串工具结果的后端使用）
///
/// 字符串原样；列表取各项文本后以换行相连；`{"content": x}` 解包为 x；其余对象序列化为 JSON。
pub fn flatten_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Object(map) if map.get("type").and_then(Value::as_str) == Some("text") => map
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                Value::Object(_) => item.to_string(),
                other => flatten_to_text(other),
            })
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string(),
        Value::Object(map) if map.len() == 1 && map.contains_key("content") => {
            flatten_to_text(&map["content"])
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_text_passes_through_unchanged() {
        let raw = RawOutput::PlainText("  hello \n".to_string());
        let out = normalize(&raw);
        assert_eq!(out.text, "  hello \n");
        assert!(out.tool_calls.is_empty());
    }

    #[test]
    fn test_normalize_is_idempotent_on_plain_text() {
        let raw = RawOutput::Segments(vec![
            Segment::reasoning("think first"),
            Segment::text("  The answer "),
            Segment::text("is 4.  "),
        ]);
        let once = normalize(&raw);
        let twice = normalize(&RawOutput::PlainText(once.text.clone()));
        assert_eq!(once.text, "The answer is 4.");
        assert_eq!(twice.text, once.text);
        let thrice = normalize(&RawOutput::PlainText(twice.text.clone()));
        assert_eq!(thrice, twice);
    }

    #[test]
    fn test_reasoning_dropped_but_tool_calls_kept_in_order() {
        let raw = RawOutput::Segments(vec![
            Segment::reasoning("I should check the time"),
            Segment::tool_call("c1", "time_now", json!({})),
            Segment::text("Checking."),
            Segment::reasoning("and compute"),
            Segment::tool_call("c2", "calc_evaluate", json!({"expression": "1+1"})),
        ]);
        let out = normalize(&raw);
        assert_eq!(out.text, "Checking.");
        let names: Vec<_> = out.tool_calls.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["time_now", "calc_evaluate"]);
        assert_eq!(out.tool_calls[1].args["expression"], "1+1");
    }

    #[test]
    fn test_lines_variant_joins_with_newline() {
        let raw = RawOutput::Segments(vec![
            Segment::text("first"),
            Segment::text(""),
            Segment::text("second"),
        ]);
        assert_eq!(normalize_with(&raw, NormalizerVariant::Lines).text, "first\nsecond");
    }

    #[test]
    fn test_missing_id_is_generated() {
        let raw = RawOutput::Segments(vec![Segment::tool_call("", "time_now", json!({}))]);
        let out = normalize(&raw);
        assert!(out.tool_calls[0].id.starts_with("call_"));
    }

    #[test]
    fn test_find_duplicate_id() {
        let raw = RawOutput::Segments(vec![
            Segment::tool_call("x", "time_now", json!({})),
            Segment::tool_call("x", "time_now", json!({})),
        ]);
        let out = normalize(&raw);
        assert_eq!(find_duplicate_id(&out.tool_calls), Some("x"));
    }

    #[test]
    fn test_flatten_to_text() {
        assert_eq!(flatten_to_text(&json!("plain")), "plain");
        assert_eq!(flatten_to_text(&json!({"content": "inner"})), "inner");
        assert_eq!(flatten_to_text(&json!(["a", "", "b"])), "a\nb");
        assert_eq!(
            flatten_to_text(&json!([{"type": "text", "text": "t"}, {"k": 1}])),
            "t\n{\"k\":1}"
        );
        assert_eq!(flatten_to_text(&json!({"a": 1})), "{\"a\":1}");
    }
}
