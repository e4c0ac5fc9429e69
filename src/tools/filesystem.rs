//! 沙箱文件系统工具
//!
//! SafeFs 绑定工作区根目录，所有相对路径先做词法归一化（禁止绝对路径与 ../ 逃逸），
//! 已存在的路径再 canonicalize 校验（防符号链接逃逸）；
//! files_list / files_read / files_write 基于 SafeFs 提供列目录、读、写能力。

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::tools::schema::schema_of;
use crate::tools::{parse_args, Tool, ToolError};

/// 沙箱文件系统：绑定根目录，resolve 校验路径在根下，防止路径逃逸
#[derive(Debug, Clone)]
pub struct SafeFs {
    root_dir: PathBuf,
}

impl SafeFs {
    /// 根目录不存在时创建
    pub fn new(root_dir: impl AsRef<Path>) -> Self {
        let root = root_dir.as_ref().to_path_buf();
        if let Err(e) = std::fs::create_dir_all(&root) {
            tracing::warn!(root = %root.display(), error = %e, "failed to create workspace root");
        }
        let root_dir = root.canonicalize().unwrap_or(root);
        Self { root_dir }
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    /// 解析相对路径；路径可以尚不存在（写文件时）
    pub fn resolve(&self, rel: &str) -> Result<PathBuf, ToolError> {
        let mut clean = PathBuf::new();
        for comp in Path::new(rel.trim()).components() {
            match comp {
                Component::CurDir => {}
                Component::Normal(part) => clean.push(part),
                Component::ParentDir => {
                    if !clean.pop() {
                        return Err(ToolError::PathEscape(rel.to_string())); // 如 ../../etc/passwd
                    }
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(ToolError::PathEscape(rel.to_string()));
                }
            }
        }
        let full = self.root_dir.join(&clean);

        // 最近的已存在祖先必须仍在根下（符号链接）
        let mut probe = full.as_path();
        loop {
            if probe.exists() {
                let canonical = probe
                    .canonicalize()
                    .map_err(|e| ToolError::Failed(format!("Resolve failed: {}", e)))?;
                if !canonical.starts_with(&self.root_dir) {
                    return Err(ToolError::PathEscape(rel.to_string()));
                }
                break;
            }
            match probe.parent() {
                Some(parent) => probe = parent,
                None => break,
            }
        }
        Ok(full)
    }

    /// 相对根目录的显示路径
    pub fn display_rel(&self, path: &Path) -> String {
        path.strip_prefix(&self.root_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .to_string()
    }

    /// 非递归列目录；目录不存在时返回空列表
    pub fn list_dir(&self, rel: &str) -> Result<Vec<String>, ToolError> {
        let base = self.resolve(rel)?;
        if !base.is_dir() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for e in std::fs::read_dir(&base)
            .map_err(|e| ToolError::Failed(format!("List failed: {}", e)))?
        {
            let e = e.map_err(|e| ToolError::Failed(e.to_string()))?;
            entries.push(e.file_name().to_string_lossy().to_string());
        }
        entries.sort();
        Ok(entries)
    }

    pub fn read_file(&self, rel: &str, max_chars: usize) -> Result<String, ToolError> {
        let path = self.resolve(rel)?;
        if !path.is_file() {
            return Err(ToolError::Failed("file does not exist".to_string()));
        }
        let bytes = std::fs::read(&path).map_err(|e| ToolError::Failed(format!("Read failed: {}", e)))?;
        let data = String::from_utf8_lossy(&bytes);
        Ok(data.chars().take(max_chars).collect())
    }

    /// 写文本文件（自动创建父目录）；返回写入字符数与相对路径
    pub fn write_file(&self, rel: &str, content: &str, overwrite: bool) -> Result<String, ToolError> {
        let path = self.resolve(rel)?;
        if path == self.root_dir || path.is_dir() {
            return Err(ToolError::InvalidArgs(format!("not a file path: {}", rel)));
        }
        if path.exists() && !overwrite {
            return Err(ToolError::Failed("file exists and overwrite=false".to_string()));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ToolError::Failed(format!("Create dir failed: {}", e)))?;
        }
        std::fs::write(&path, content).map_err(|e| ToolError::Failed(format!("Write failed: {}", e)))?;
        Ok(format!(
            "OK: wrote {} chars to {}",
            content.chars().count(),
            self.display_rel(&path)
        ))
    }
}

fn default_dir() -> String {
    ".".to_string()
}

fn default_max_chars() -> usize {
    20_000
}

fn default_overwrite() -> bool {
    true
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ListArgs {
    /// 工作区内的相对目录，默认 "."
    #[serde(default = "default_dir")]
    rel_dir: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ReadArgs {
    /// 工作区内的相对文件路径
    rel_path: String,
    /// 最多返回的字符数
    #[serde(default = "default_max_chars")]
    max_chars: usize,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct WriteArgs {
    /// 工作区内的相对文件路径
    rel_path: String,
    /// 写入的文本内容
    content: String,
    /// 文件已存在时是否覆盖
    #[serde(default = "default_overwrite")]
    overwrite: bool,
}

/// files_list：列出工作区目录（非递归）
pub struct FilesListTool {
    fs: SafeFs,
}

impl FilesListTool {
    pub fn new(fs: SafeFs) -> Self {
        Self { fs }
    }
}

#[async_trait]
impl Tool for FilesListTool {
    fn name(&self) -> &str {
        "files_list"
    }

    fn description(&self) -> &str {
        "List files in a workspace directory (non-recursive)."
    }

    fn parameters_schema(&self) -> Value {
        schema_of::<ListArgs>()
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: ListArgs = parse_args(args)?;
        tracing::info!(rel_dir = %args.rel_dir, "files_list");
        let entries = self.fs.list_dir(&args.rel_dir)?;
        Ok(Value::from(entries))
    }
}

/// files_read：读取工作区文本文件
pub struct FilesReadTool {
    fs: SafeFs,
}

impl FilesReadTool {
    pub fn new(fs: SafeFs) -> Self {
        Self { fs }
    }
}

#[async_trait]
impl Tool for FilesReadTool {
    fn name(&self) -> &str {
        "files_read"
    }

    fn description(&self) -> &str {
        "Read a text file from the workspace, truncated to max_chars."
    }

    fn parameters_schema(&self) -> Value {
        schema_of::<ReadArgs>()
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: ReadArgs = parse_args(args)?;
        tracing::info!(rel_path = %args.rel_path, "files_read");
        let text = self.fs.read_file(&args.rel_path, args.max_chars)?;
        Ok(Value::String(text))
    }
}

/// files_write：写入工作区文本文件（通常需要审批）
pub struct FilesWriteTool {
    fs: SafeFs,
}

impl FilesWriteTool {
    pub fn new(fs: SafeFs) -> Self {
        Self { fs }
    }
}

#[async_trait]
impl Tool for FilesWriteTool {
    fn name(&self) -> &str {
        "files_write"
    }

    fn description(&self) -> &str {
        "Write a text file into the workspace. Creates parent directories."
    }

    fn parameters_schema(&self) -> Value {
        schema_of::<WriteArgs>()
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: WriteArgs = parse_args(args)?;
        tracing::info!(rel_path = %args.rel_path, chars = args.content.len(), "files_write");
        let msg = self.fs.write_file(&args.rel_path, &args.content, args.overwrite)?;
        Ok(Value::String(msg))
    }
}
