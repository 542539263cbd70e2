// Application Layer - Use Cases

pub mod constants;
pub mod orchestrator;

// Re-exports
pub use orchestrator::{BatchOrchestrator, ExecutionMode};
