//! 监督者原生工具：四则运算与当前时间

use async_trait::async_trait;
use chrono::{FixedOffset, Utc};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::tools::schema::schema_of;
use crate::tools::{parse_args, Tool, ToolError};

const ALLOWED: &str = "0123456789+-*/(). ";

/// 递归下降求值：expr := term (('+'|'-') term)*, term := factor (('*'|'/') factor)*,
/// factor := ('+'|'-') factor | number | '(' expr ')'
struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src: src.as_bytes(), pos: 0 }
    }

    fn peek(&mut self) -> Option<u8> {
        while self.src.get(self.pos) == Some(&b' ') {
            self.pos += 1;
        }
        self.src.get(self.pos).copied()
    }

    fn expr(&mut self) -> Result<f64, String> {
        let mut value = self.term()?;
        while let Some(op @ (b'+' | b'-')) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == b'+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, String> {
        let mut value = self.factor()?;
        while let Some(op @ (b'*' | b'/')) = self.peek() {
            self.pos += 1;
            let rhs = self.factor()?;
            if op == b'*' {
                value *= rhs;
            } else {
                if rhs == 0.0 {
                    return Err("division by zero".to_string());
                }
                value /= rhs;
            }
        }
        Ok(value)
    }

    fn factor(&mut self) -> Result<f64, String> {
        match self.peek() {
            Some(b'-') => {
                self.pos += 1;
                Ok(-self.factor()?)
            }
            Some(b'+') => {
                self.pos += 1;
                self.factor()
            }
            Some(b'(') => {
                self.pos += 1;
                let value = self.expr()?;
                if self.peek() != Some(b')') {
                    return Err("expected ')'".to_string());
                }
                self.pos += 1;
                Ok(value)
            }
            Some(c) if c.is_ascii_digit() || c == b'.' => self.number(),
            Some(c) => Err(format!("unexpected '{}'", c as char)),
            None => Err("unexpected end of expression".to_string()),
        }
    }

    fn number(&mut self) -> Result<f64, String> {
        let start = self.pos;
        while matches!(self.src.get(self.pos), Some(c) if c.is_ascii_digit() || *c == b'.') {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).map_err(|e| e.to_string())?;
        text.parse::<f64>().map_err(|_| format!("invalid number '{}'", text))
    }
}

/// 求值算术表达式；只允许数字、+ - * / ( ) . 与空格
pub fn evaluate(expression: &str) -> Result<f64, String> {
    if expression.chars().any(|c| !ALLOWED.contains(c)) {
        return Err("expression contains disallowed characters".to_string());
    }
    let mut parser = Parser::new(expression);
    let value = parser.expr()?;
    if parser.peek().is_some() {
        return Err(format!("unexpected trailing input at {}", parser.pos));
    }
    Ok(value)
}

/// 整数结果不带小数点
fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct CalcArgs {
    /// 算术表达式，如 "(2 + 3) * 4"
    expression: String,
}

pub struct CalcTool;

#[async_trait]
impl Tool for CalcTool {
    fn name(&self) -> &str {
        "calc_evaluate"
    }

    fn description(&self) -> &str {
        "Evaluate a basic arithmetic expression. Supports numbers and + - * / ( ) . and spaces."
    }

    fn parameters_schema(&self) -> Value {
        schema_of::<CalcArgs>()
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: CalcArgs = parse_args(args)?;
        let value = evaluate(&args.expression).map_err(ToolError::Failed)?;
        Ok(Value::String(format_number(value)))
    }
}

/// time_now：当前 UTC 时间（ISO-8601）
pub struct TimeNowTool;

#[async_trait]
impl Tool for TimeNowTool {
    fn name(&self) -> &str {
        "time_now"
    }

    fn description(&self) -> &str {
        "Return the current UTC time in ISO-8601 format."
    }

    async fn execute(&self, _args: Value) -> Result<Value, ToolError> {
        Ok(Value::String(Utc::now().to_rfc3339()))
    }
}

/// time_now_riyadh：当前利雅得时间（UTC+3）
pub struct TimeNowRiyadhTool;

#[async_trait]
impl Tool for TimeNowRiyadhTool {
    fn name(&self) -> &str {
        "time_now_riyadh"
    }

    fn description(&self) -> &str {
        "Return the current Riyadh time (UTC+03:00) in ISO-8601 format."
    }

    async fn execute(&self, _args: Value) -> Result<Value, ToolError> {
        let tz = FixedOffset::east_opt(3 * 3600)
            .ok_or_else(|| ToolError::Failed("invalid offset".to_string()))?;
        Ok(Value::String(Utc::now().with_timezone(&tz).to_rfc3339()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_precedence_and_parens() {
        assert_eq!(evaluate("2 + 3 * 4").unwrap(), 14.0);
        assert_eq!(evaluate("(2 + 3) * 4").unwrap(), 20.0);
        assert_eq!(evaluate("-3 + 10 / 4").unwrap(), -0.5);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(evaluate("__import__('os')").is_err());
        assert!(evaluate("1 / 0").is_err());
        assert!(evaluate("(1 + 2").is_err());
        assert!(evaluate("1 2").is_err());
    }

    #[tokio::test]
    async fn test_calc_tool_formats_integers() {
        assert_eq!(CalcTool.execute(json!({"expression": "6 * 7"})).await.unwrap(), json!("42"));
        assert_eq!(CalcTool.execute(json!({"expression": "7 / 2"})).await.unwrap(), json!("3.5"));
    }

    #[tokio::test]
    async fn test_riyadh_offset() {
        let out = TimeNowRiyadhTool.execute(Value::Null).await.unwrap();
        assert!(out.as_str().unwrap().ends_with("+03:00"));
    }
}
