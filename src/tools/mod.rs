//! 工具层：注册表、执行器（超时 + 审计）、内置工具与委派

pub mod calc;
pub mod delegate;
pub mod executor;
pub mod filesystem;
pub mod registry;
pub mod schema;
pub mod web;

pub use calc::{CalcTool, TimeNowRiyadhTool, TimeNowTool};
pub use delegate::DelegateTool;
pub use executor::ToolExecutor;
pub use filesystem::{FilesListTool, FilesReadTool, FilesWriteTool, SafeFs};
pub use registry::{parse_args, Tool, ToolError, ToolRegistry, ToolSpec};
pub use schema::schema_of;
pub use web::{WebOpenTool, WebSearchTool};
