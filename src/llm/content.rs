//! 后端输出形态
//!
//! 不同后端返回结构不同：纯字符串，或按类型标记的片段序列（reasoning / text / tool_call）。
//! 草拟阶段的流式增量（Delta）先累积在 DraftAccumulator 中，进入规范化之前不写入历史。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 类型化片段
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Segment {
    Text {
        text: String,
    },
    /// 内部推理，不进入最终文本
    #[serde(alias = "thinking", alias = "thought")]
    Reasoning {
        #[serde(alias = "thinking", default)]
        text: String,
    },
    ToolCall {
        #[serde(default)]
        id: String,
        name: String,
        #[serde(default)]
        args: Map<String, Value>,
    },
    /// 不认识的片段类型（图片、引用等），规范化时丢弃
    #[serde(other)]
    Unknown,
}

impl Segment {
    pub fn text(text: impl Into<String>) -> Self {
        Segment::Text { text: text.into() }
    }

    pub fn reasoning(text: impl Into<String>) -> Self {
        Segment::Reasoning { text: text.into() }
    }

    pub fn tool_call(id: impl Into<String>, name: impl Into<String>, args: Value) -> Self {
        let args = match args {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Segment::ToolCall {
            id: id.into(),
            name: name.into(),
            args,
        }
    }
}

/// 后端原始输出：纯文本 | 片段列表
#[derive(Clone, Debug, PartialEq)]
pub enum RawOutput {
    PlainText(String),
    Segments(Vec<Segment>),
}

/// 流式增量：纯文本 token，或一个完整片段
#[derive(Clone, Debug, PartialEq)]
pub enum Delta {
    Text(String),
    Segment(Segment),
}

impl Delta {
    pub fn text(text: impl Into<String>) -> Self {
        Delta::Text(text.into())
    }
}

/// 草拟阶段的增量累积器
///
/// 只收到纯文本 token 时结果为 PlainText（原样拼接）；只要出现过片段就转为 Segments，
/// 相邻的文本 token 合并为一个 Text 片段。
#[derive(Debug, Default)]
pub struct DraftAccumulator {
    plain: String,
    segments: Vec<Segment>,
    segmented: bool,
}

impl DraftAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, delta: Delta) {
        match delta {
            Delta::Text(t) if !self.segmented => self.plain.push_str(&t),
            Delta::Text(t) => self.push_text_segment(t),
            Delta::Segment(seg) => {
                if !self.segmented {
                    self.segmented = true;
                    if !self.plain.is_empty() {
                        let text = std::mem::take(&mut self.plain);
                        self.segments.push(Segment::Text { text });
                    }
                }
                match seg {
                    Segment::Text { text } => self.push_text_segment(text),
                    other => self.segments.push(other),
                }
            }
        }
    }

    fn push_text_segment(&mut self, more: String) {
        if let Some(Segment::Text { text }) = self.segments.last_mut() {
            text.push_str(&more);
            return;
        }
        self.segments.push(Segment::Text { text: more });
    }

    pub fn finish(self) -> RawOutput {
        if self.segmented {
            RawOutput::Segments(self.segments)
        } else {
            RawOutput::PlainText(self.plain)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_tokens_stay_plain() {
        let mut acc = DraftAccumulator::new();
        acc.push(Delta::text("Hel"));
        acc.push(Delta::text("lo "));
        assert_eq!(acc.finish(), RawOutput::PlainText("Hello ".to_string()));
    }

    #[test]
    fn test_segment_switches_to_segment_list() {
        let mut acc = DraftAccumulator::new();
        acc.push(Delta::text("a"));
        acc.push(Delta::Segment(Segment::reasoning("hmm")));
        acc.push(Delta::text("b"));
        acc.push(Delta::text("c"));
        assert_eq!(
            acc.finish(),
            RawOutput::Segments(vec![
                Segment::text("a"),
                Segment::reasoning("hmm"),
                Segment::text("bc"),
            ])
        );
    }

    #[test]
    fn test_segment_deserialize_aliases() {
        let segs: Vec<Segment> = serde_json::from_value(serde_json::json!([
            {"type": "thinking", "thinking": "plan"},
            {"type": "text", "text": "hi"},
            {"type": "tool_call", "id": "c1", "name": "time_now", "args": {}},
            {"type": "image_url", "image_url": "x"}
        ]))
        .unwrap();
        assert_eq!(segs[0], Segment::reasoning("plan"));
        assert_eq!(segs[1], Segment::text("hi"));
        assert!(matches!(&segs[2], Segment::ToolCall { name, .. } if name == "time_now"));
        assert_eq!(segs[3], Segment::Unknown);
    }
}
