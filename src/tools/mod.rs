//! 工具层：工具 trait、注册表、带超时与审计的执行器，以及产物工具

pub mod artifact_tools;
pub mod executor;
pub mod registry;

pub use artifact_tools::{CreateComponentTool, CreatePageTool, FixErrorTool, UpdatePageTool};
pub use executor::ToolExecutor;
pub use registry::{Tool, ToolOutput, ToolRegistry};
