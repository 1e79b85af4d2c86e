pub mod protocol;
pub mod tools;
pub mod format;
pub mod server;
pub mod stdio;

pub use protocol::{Request, Response, ToolResult};
pub use server::{NadfunTools, ToolContext};
pub use tools::ToolName;
