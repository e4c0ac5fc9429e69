//! Web 工具：DuckDuckGo HTML 搜索与网页正文抓取
//!
//! GET 请求带超时与 User-Agent；HTML 使用 html2text 提取可读文本，连续空行压缩为一个空行，
//! 结果按 max_chars 截断。

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use html2text::from_read;
use regex::Regex;
use reqwest::Client;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::WebSection;
use crate::tools::schema::schema_of;
use crate::tools::{parse_args, Tool, ToolError};

const SEARCH_URL: &str = "https://duckduckgo.com/html/";

/// 按 [tools.web] 构建 HTTP 客户端；超时或 User-Agent 无效时报错而不是静默回退
fn build_client(cfg: &WebSection) -> Result<Client, ToolError> {
    Client::builder()
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .user_agent(cfg.user_agent.clone())
        .build()
        .map_err(|e| ToolError::Failed(format!("HTTP client setup failed: {}", e)))
}

static ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<a([^>]*class="result__a"[^>]*)>(.*?)</a>"#).expect("static regex")
});
static HREF_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"href="([^"]*)""#).expect("static regex"));
static SNIPPET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)class="result__snippet"[^>]*>(.*?)</(?:a|div|span)>"#).expect("static regex")
});
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("static regex"));
static BLANK_LINES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*(\n[ \t]*){2,}").expect("static regex"));

/// 去标签、解码常见实体、压缩空白
fn fragment_text(html: &str) -> String {
    let text = TAG_RE.replace_all(html, " ");
    let text = text
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// 解析 DuckDuckGo HTML 结果页；snippet 按出现顺序对应
pub fn parse_search_results(html: &str, max_results: usize) -> Vec<SearchHit> {
    let mut hits: Vec<SearchHit> = ANCHOR_RE
        .captures_iter(html)
        .take(max_results)
        .map(|cap| {
            let attrs = cap.get(1).map(|m| m.as_str()).unwrap_or("");
            let mut url = HREF_RE
                .captures(attrs)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().replace("&amp;", "&"))
                .unwrap_or_default();
            if url.starts_with("//") {
                url = format!("https:{}", url);
            }
            SearchHit {
                title: fragment_text(cap.get(2).map(|m| m.as_str()).unwrap_or("")),
                url,
                snippet: String::new(),
            }
        })
        .collect();
    for (hit, cap) in hits.iter_mut().zip(SNIPPET_RE.captures_iter(html)) {
        hit.snippet = fragment_text(cap.get(1).map(|m| m.as_str()).unwrap_or(""));
    }
    hits
}

/// HTML 转文本并压缩连续空行
pub fn clean_page_text(html: &str) -> String {
    let text = match from_read(html.as_bytes(), 120) {
        Ok(text) if !text.trim().is_empty() => text,
        _ => fragment_text(html),
    };
    BLANK_LINES_RE.replace_all(text.trim(), "\n\n").to_string()
}

fn default_max_results() -> usize {
    5
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SearchArgs {
    /// 搜索关键词
    query: String,
    /// 返回条数（1-10）
    #[serde(default = "default_max_results")]
    max_results: usize,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct OpenArgs {
    /// 要抓取的 URL
    url: String,
    /// 最多返回的字符数（1000-100000）
    max_chars: Option<usize>,
}

/// web_search：DuckDuckGo 轻量搜索，返回 [{title,url,snippet}]
pub struct WebSearchTool {
    client: Client,
}

impl WebSearchTool {
    pub fn new(cfg: &WebSection) -> Result<Self, ToolError> {
        Ok(Self {
            client: build_client(cfg)?,
        })
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Lightweight web search. Returns JSON list of {title, url, snippet}."
    }

    fn parameters_schema(&self) -> Value {
        schema_of::<SearchArgs>()
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: SearchArgs = parse_args(args)?;
        let max_results = args.max_results.clamp(1, 10);
        tracing::info!(query = %args.query, max_results, "web_search");
        let resp = self
            .client
            .get(SEARCH_URL)
            .query(&[("q", args.query.as_str())])
            .send()
            .await
            .map_err(|e| ToolError::Failed(format!("Request failed: {}", e)))?;
        if !resp.status().is_success() {
            return Err(ToolError::Failed(format!("HTTP {}", resp.status())));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| ToolError::Failed(format!("Read body: {}", e)))?;
        let hits = parse_search_results(&body, max_results);
        serde_json::to_value(hits).map_err(|e| ToolError::Failed(e.to_string()))
    }
}

/// web_open：抓取页面并返回清洗后的正文
pub struct WebOpenTool {
    client: Client,
    default_max_chars: usize,
}

impl WebOpenTool {
    pub fn new(cfg: &WebSection) -> Result<Self, ToolError> {
        Ok(Self {
            client: build_client(cfg)?,
            default_max_chars: cfg.max_chars,
        })
    }
}

#[async_trait]
impl Tool for WebOpenTool {
    fn name(&self) -> &str {
        "web_open"
    }

    fn description(&self) -> &str {
        "Fetch a URL and return cleaned text content."
    }

    fn parameters_schema(&self) -> Value {
        schema_of::<OpenArgs>()
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: OpenArgs = parse_args(args)?;
        let url = args.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ToolError::InvalidArgs(format!("not an http(s) url: {}", url)));
        }
        let max_chars = args.max_chars.unwrap_or(self.default_max_chars).clamp(1000, 100_000);
        tracing::info!(url = %url, max_chars, "web_open");
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ToolError::Failed(format!("Request failed: {}", e)))?;
        if !resp.status().is_success() {
            return Err(ToolError::Failed(format!("HTTP {}", resp.status())));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| ToolError::Failed(format!("Read body: {}", e)))?;
        let body = body.trim_start_matches('\u{FEFF}');
        let text = clean_page_text(body);
        Ok(Value::String(text.chars().take(max_chars).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<div class="result results_links">
  <h2 class="result__title"><a rel="nofollow" class="result__a" href="//example.com/a?x=1&amp;y=2">Rust <b>Book</b></a></h2>
  <a class="result__snippet" href="//example.com/a">The Rust &amp; Cargo guide</a>
</div>
<div class="result results_links">
  <h2 class="result__title"><a rel="nofollow" class="result__a" href="https://docs.rs/">Docs.rs</a></h2>
  <a class="result__snippet" href="https://docs.rs/">Crate docs</a>
</div>"#;

    #[test]
    fn test_parse_search_results() {
        let hits = parse_search_results(PAGE, 5);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "Rust Book");
        assert_eq!(hits[0].url, "https://example.com/a?x=1&y=2");
        assert_eq!(hits[0].snippet, "The Rust & Cargo guide");
        assert_eq!(hits[1].url, "https://docs.rs/");
    }

    #[test]
    fn test_parse_respects_max_results() {
        assert_eq!(parse_search_results(PAGE, 1).len(), 1);
    }

    #[test]
    fn test_blank_lines_collapsed() {
        let out = BLANK_LINES_RE.replace_all("a\n\n\n\nb", "\n\n");
        assert_eq!(out, "a\n\nb");
    }

    #[tokio::test]
    async fn test_web_open_rejects_non_http() {
        let tool = WebOpenTool::new(&WebSection::default()).unwrap();
        let err = tool.execute(serde_json::json!({"url": "file:///etc/passwd"})).await;
        assert!(matches!(err, Err(ToolError::InvalidArgs(_))));
    }

    #[test]
    fn test_invalid_user_agent_is_reported() {
        let cfg = WebSection {
            user_agent: "bad\nagent".to_string(),
            ..WebSection::default()
        };
        assert!(matches!(WebSearchTool::new(&cfg), Err(ToolError::Failed(_))));
        assert!(WebOpenTool::new(&cfg).is_err());
    }
}
