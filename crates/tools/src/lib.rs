pub mod builtins;
pub mod registry;

pub use builtins::builtin_definitions;
pub use registry::{Mode, ToolHandler, ToolRegistry};
