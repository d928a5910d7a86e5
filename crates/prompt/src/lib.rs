//! Prompt Assembler (spec.md §4.6).

pub mod assembler;
pub mod compression;
pub mod system;

pub use assembler::{AssembledPrompt, PromptAssembler};
pub use compression::{CompressionCache, Compressor, LlmCompressor};
pub use system::build_system_message;
