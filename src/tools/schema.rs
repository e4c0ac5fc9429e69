//! 工具参数 JSON Schema 生成（schemars 自动生成）
//!
//! 各工具用带 JsonSchema 派生的参数结构体，目录里的 parameters 与实际反序列化保持一致。

use schemars::{schema_for, JsonSchema};
use serde_json::Value;

/// 返回类型 T 的 JSON Schema（object 形式）
pub fn schema_of<T: JsonSchema>() -> Value {
    let schema = schema_for!(T);
    serde_json::to_value(schema).unwrap_or_else(|_| {
        serde_json::json!({"type": "object", "properties": {}})
    })
}
